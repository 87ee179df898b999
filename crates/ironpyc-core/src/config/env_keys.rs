//! 环境变量 key 常量与别名定义
//!
//! 主变量使用 `IRONPYC_*`，部分兼容 `IPY_*`。

/// 可观测性与日志
pub mod observability {
    pub const IRONPYC_QUIET: &str = "IRONPYC_QUIET";

    pub const IRONPYC_LOG_LEVEL: &str = "IRONPYC_LOG_LEVEL";

    pub const IRONPYC_LOG_JSON: &str = "IRONPYC_LOG_JSON";
}

/// 运行时探测
pub mod detect {
    /// 显式指定 IronPython 安装目录，跳过探测
    pub const IRONPYC_IPY_DIR: &str = "IRONPYC_IPY_DIR";
    pub const IPY_DIR_ALIASES: &[&str] = &["IPY_DIR"];

    /// 可执行文件名（默认 Windows 为 `ipy.exe`，其他平台为 `ipy`）
    pub const IRONPYC_EXECUTABLE: &str = "IRONPYC_EXECUTABLE";

    /// 注册表根键列表，分号分隔
    pub const IRONPYC_REGISTRY_KEYS: &str = "IRONPYC_REGISTRY_KEYS";

    /// 宿主 Python 版本（用于版本匹配）
    pub const IRONPYC_HOST_VERSION: &str = "IRONPYC_HOST_VERSION";

    /// 探测进程超时（秒），未设置表示不限时
    pub const IRONPYC_PROBE_TIMEOUT_SECS: &str = "IRONPYC_PROBE_TIMEOUT_SECS";

    /// 注册表与 PATH 结果冲突时的优先级：`registry`（默认）或 `path`
    pub const IRONPYC_DISCOVERY_PRECEDENCE: &str = "IRONPYC_DISCOVERY_PRECEDENCE";
}

/// 编译
pub mod build {
    /// 运行 modulefinder 的宿主 Python 解释器
    pub const IRONPYC_HOST_PYTHON: &str = "IRONPYC_HOST_PYTHON";
    pub const HOST_PYTHON_ALIASES: &[&str] = &["PYTHON"];

    /// pyc.py 路径（默认 `<ipy_dir>/Tools/Scripts/pyc.py`）
    pub const IRONPYC_PYC_PATH: &str = "IRONPYC_PYC_PATH";

    /// 保留响应文件用于排查
    pub const IRONPYC_KEEP_RESPONSE_FILE: &str = "IRONPYC_KEEP_RESPONSE_FILE";

    /// 编译进程超时（秒），未设置表示不限时
    pub const IRONPYC_COMPILE_TIMEOUT_SECS: &str = "IRONPYC_COMPILE_TIMEOUT_SECS";
}
