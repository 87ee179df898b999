//! `ironpyc compile`

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ironpyc_build::{
    copy_runtime_libraries, CompileOptions, CompileRequest, Compiler, CompilerInvocation,
    Platform, TargetKind,
};
use ironpyc_core::config::BuildConfig;

/// Options of one `compile` invocation, borrowed from the parsed command line.
pub struct CompileArgs<'a> {
    pub scripts: &'a [PathBuf],
    pub out: Option<&'a Path>,
    pub target: TargetKind,
    pub main: Option<&'a Path>,
    pub platform: Option<Platform>,
    pub embed: bool,
    pub standalone: bool,
    pub mta: bool,
    pub keep_response_file: bool,
    pub ipy_dir: Option<&'a Path>,
    pub pyc_path: Option<&'a Path>,
    pub module_dirs: &'a [PathBuf],
    pub copy_runtime_libs: bool,
    pub host_version: Option<&'a str>,
    pub timeout: Option<u64>,
}

pub fn cmd_compile(args: CompileArgs<'_>) -> Result<()> {
    let build = BuildConfig::from_env();
    let detect = super::detect_config(args.ipy_dir, args.host_version);
    let executable = detect.executable.clone();
    let (version, install_dir) = super::select_runtime(detect, &build)?;
    tracing::info!("using IronPython {} at {}", version, install_dir.display());

    let mut request = CompileRequest::new(args.scripts)?
        .target(args.target)
        .platform(args.platform)
        .embed(args.embed)
        .standalone(args.standalone)
        .mta(args.mta);
    if let Some(out) = args.out {
        request = request.output(out);
    }
    if let Some(main) = args.main {
        if args.target.is_executable() {
            request = request.main_script(main);
        } else {
            tracing::warn!("--main is ignored for {} targets", args.target);
        }
    }

    let pyc_path = args.pyc_path.or(build.pyc_path.as_deref());
    let invocation = CompilerInvocation::for_runtime(&install_dir, &executable, pyc_path);
    let options = CompileOptions {
        keep_response_file: args.keep_response_file || build.keep_response_file,
        timeout: args
            .timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .or(build.compile_timeout),
        base_dir: None,
    };
    let compiler = Compiler::new(invocation, options);

    let (analyzer, search_dirs) = super::analyzer_for(&build, &install_dir, args.module_dirs)?;
    let outcome = compiler.compile_scripts(request, &analyzer, &search_dirs)?;

    print!("{}", outcome.output);
    if let Some(ref kept) = outcome.response_file {
        eprintln!("Response file kept: {}", kept.display());
    }

    if args.copy_runtime_libs {
        let dest = outcome
            .artifact
            .parent()
            .context("Output assembly has no parent directory")?;
        let copied = copy_runtime_libraries(dest, &install_dir)?;
        eprintln!("✓ Copied {} IronPython DLL(s) to {}", copied.len(), dest.display());
    }
    eprintln!("✓ Compiled {}", outcome.artifact.display());
    Ok(())
}
