//! `ironpyc analyze`

use std::path::{Path, PathBuf};

use anyhow::Result;
use ironpyc_core::config::BuildConfig;

pub fn cmd_analyze(
    scripts: &[PathBuf],
    ipy_dir: Option<&Path>,
    module_dirs: &[PathBuf],
    host_version: Option<&str>,
    json_output: bool,
) -> Result<()> {
    let build = BuildConfig::from_env();
    let detect = super::detect_config(ipy_dir, host_version);
    let (_, install_dir) = super::select_runtime(detect, &build)?;
    let (analyzer, search_dirs) = super::analyzer_for(&build, &install_dir, module_dirs)?;

    let report = analyzer.analyze(scripts, &search_dirs)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Builtin modules ({}):", report.builtin.len());
    for name in &report.builtin {
        println!("  {}", name);
    }
    println!("Compilable modules ({}):", report.compilable.len());
    for path in &report.compilable {
        println!("  {}", path.display());
    }
    println!("Uncompilable modules ({}):", report.uncompilable.len());
    for name in &report.uncompilable {
        println!("  {}", name);
    }
    Ok(())
}
