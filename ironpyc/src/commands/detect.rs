//! `ironpyc detect`

use std::path::Path;

use anyhow::Result;
use ironpyc_core::config::BuildConfig;
use ironpyc_detect::{match_tier, select_optimum, RuntimeLocator, RuntimeMap};

pub fn cmd_detect(
    ipy_dir: Option<&Path>,
    host_version: Option<&str>,
    json_output: bool,
) -> Result<()> {
    let detect = super::detect_config(ipy_dir, host_version);
    let build = BuildConfig::from_env();
    let host = super::host_version(&detect, &build)?;
    let locator = RuntimeLocator::new(detect);

    let runtimes: RuntimeMap = match locator.config().install_dir.clone() {
        Some(dir) => {
            let version = locator.validate_dir(&dir)?;
            [(version, dir)].into_iter().collect()
        }
        None => locator.discover()?,
    };
    let selected = select_optimum(&host, &runtimes);

    if json_output {
        let selected_json = match &selected {
            Ok((version, dir)) => serde_json::json!({
                "version": version,
                "install_dir": dir,
                "match": match_tier(&host, version),
            }),
            Err(_) => serde_json::Value::Null,
        };
        let out = serde_json::json!({
            "host_version": host,
            "runtimes": runtimes,
            "selected": selected_json,
            "error": selected.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Host Python: {}", host);
    println!("IronPython runtimes ({}):", runtimes.len());
    for (version, dir) in runtimes.iter() {
        let marker = match &selected {
            Ok((v, _)) if v == version => "*",
            _ => " ",
        };
        println!(" {} {:<12} {}", marker, version.to_string(), dir.display());
    }
    match selected {
        Ok((version, _)) => {
            eprintln!(
                "✓ Selected IronPython {} ({} match)",
                version,
                match_tier(&host, &version)
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
