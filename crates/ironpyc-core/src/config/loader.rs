//! 统一环境变量加载逻辑
//!
//! 集中维护 fallback 链，避免在业务代码中重复 `or_else` 调用。

use std::env;
use std::path::{Path, PathBuf};

/// 加载当前目录下的 `.env` 到环境变量（不覆盖已存在的变量）
pub fn load_dotenv() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        load_dotenv_from_dir(&dir);
    });
}

/// 加载指定目录下的 `.env`（不覆盖已存在的变量）
pub fn load_dotenv_from_dir(dir: &Path) {
    let Ok(content) = std::fs::read_to_string(dir.join(".env")) else {
        return;
    };
    for (key, value) in parse_dotenv(&content) {
        if env::var(&key).is_err() {
            #[allow(unsafe_code)]
            unsafe {
                env::set_var(&key, &value);
            }
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(eq_pos) = line.find('=') else {
            continue;
        };
        let key = line[..eq_pos].trim();
        let mut value = line[eq_pos + 1..].trim();
        // Strip inline comment (# not inside quotes)
        if let Some(hash_pos) = value.find('#') {
            let before_hash = value[..hash_pos].trim_end();
            if !before_hash.contains('"') && !before_hash.contains('\'') {
                value = before_hash;
            }
        }
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        if !key.is_empty() {
            pairs.push((key.to_string(), value.to_string()));
        }
    }
    pairs
}

/// 从主变量或别名链读取环境变量，失败时使用默认值
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default)
}

/// 从主变量或别名链读取，返回 Option（空值视为未设置）
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
        .and_then(|s| {
            let s = s.trim().to_string();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        })
}

/// 解析布尔型环境变量：0/false/no/off 为 false，其余非空值为 true
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    let v = env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()));
    match v.as_deref() {
        Some(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        None => default,
    }
}

/// 读取分号分隔的列表（空项忽略）
pub fn env_list(primary: &str, aliases: &[&str]) -> Option<Vec<String>> {
    env_optional(primary, aliases).map(|s| {
        s.split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect()
    })
}

/// 读取正整数秒数；0 或无法解析视为未设置
pub fn env_secs(primary: &str, aliases: &[&str]) -> Option<u64> {
    env_optional(primary, aliases)
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotenv_strips_quotes_and_comments() {
        let pairs = parse_dotenv(
            "# comment\nIRONPYC_A=1\nIRONPYC_B = \"two words\"\nIRONPYC_C=x # trailing\n\nbroken\n",
        );
        assert_eq!(
            pairs,
            vec![
                ("IRONPYC_A".to_string(), "1".to_string()),
                ("IRONPYC_B".to_string(), "two words".to_string()),
                ("IRONPYC_C".to_string(), "x".to_string()),
            ]
        );
    }

    #[test]
    fn test_env_list_splits_on_semicolon() {
        #[allow(unsafe_code)]
        unsafe {
            env::set_var("IRONPYC_TEST_LIST", r"SOFTWARE\A; SOFTWARE\B;;");
        }
        let list = env_list("IRONPYC_TEST_LIST", &[]).unwrap();
        assert_eq!(list, vec![r"SOFTWARE\A".to_string(), r"SOFTWARE\B".to_string()]);
    }

    #[test]
    fn test_env_bool_and_secs_defaults() {
        assert!(env_bool("IRONPYC_TEST_UNSET_BOOL", &[], true));
        assert!(!env_bool("IRONPYC_TEST_UNSET_BOOL", &[], false));
        assert_eq!(env_secs("IRONPYC_TEST_UNSET_SECS", &[]), None);
    }
}
