use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ironpyc_build::{Platform, TargetKind};

/// ironpyc - compile IronPython scripts into .NET assemblies
#[derive(Parser, Debug)]
#[command(name = "ironpyc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile scripts and their pure-Python dependencies into one assembly
    Compile {
        /// Scripts to compile; the first is the entry point of an executable
        #[arg(value_name = "SCRIPT", required = true)]
        scripts: Vec<PathBuf>,

        /// Output assembly (default: <first script name>.dll/.exe in the current directory)
        #[arg(long, short, value_name = "PATH")]
        out: Option<PathBuf>,

        /// Output kind: dll, exe or winexe
        #[arg(long, short, default_value = "dll")]
        target: TargetKind,

        /// Entry-point script for exe/winexe (moved to the front of the script list)
        #[arg(long, short, value_name = "SCRIPT")]
        main: Option<PathBuf>,

        /// Target platform for exe/winexe: x86 or x64
        #[arg(long, short)]
        platform: Option<Platform>,

        /// Embed the generated library into the executable
        #[arg(long, short, default_value = "false")]
        embed: bool,

        /// Embed the IronPython assemblies into the executable
        #[arg(long, short, default_value = "false")]
        standalone: bool,

        /// Use the multi-threaded apartment model (winexe only)
        #[arg(long, short = 'M', default_value = "false")]
        mta: bool,

        /// Keep the response file passed to the compiler
        #[arg(long, default_value = "false")]
        keep_response_file: bool,

        /// IronPython install directory (default: auto-detect)
        #[arg(long, value_name = "DIR")]
        ipy_dir: Option<PathBuf>,

        /// Path to pyc.py (default: <ipy-dir>/Tools/Scripts/pyc.py)
        #[arg(long, value_name = "PATH")]
        pyc_path: Option<PathBuf>,

        /// Directory to search for dependencies (repeatable; default: IronPython Lib + site-packages)
        #[arg(long = "module-dir", value_name = "DIR")]
        module_dirs: Vec<PathBuf>,

        /// Copy the IronPython DLLs next to the output assembly
        #[arg(long, default_value = "false")]
        copy_runtime_libs: bool,

        /// Host Python version used to pick an IronPython install (default: ask the host interpreter)
        #[arg(long, value_name = "VERSION")]
        host_version: Option<String>,

        /// Compiler timeout in seconds (default: from env, or none)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// List installed IronPython runtimes and the one that would be used
    Detect {
        /// Validate this install directory instead of searching
        #[arg(long, value_name = "DIR")]
        ipy_dir: Option<PathBuf>,

        #[arg(long, value_name = "VERSION")]
        host_version: Option<String>,

        /// Output as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Show which modules the scripts depend on and whether they can be compiled
    Analyze {
        #[arg(value_name = "SCRIPT", required = true)]
        scripts: Vec<PathBuf>,

        #[arg(long, value_name = "DIR")]
        ipy_dir: Option<PathBuf>,

        #[arg(long = "module-dir", value_name = "DIR")]
        module_dirs: Vec<PathBuf>,

        #[arg(long, value_name = "VERSION")]
        host_version: Option<String>,

        /// Output as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
}

impl Commands {
    /// Subcommand name as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Compile { .. } => "compile",
            Self::Detect { .. } => "detect",
            Self::Analyze { .. } => "analyze",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_args() {
        let cli = Cli::try_parse_from([
            "ironpyc",
            "compile",
            "main.py",
            "util.py",
            "--target",
            "winexe",
            "--platform",
            "x64",
            "--embed",
            "--mta",
            "--module-dir",
            "lib",
            "--module-dir",
            "vendor",
            "-o",
            "dist/app.exe",
        ])
        .unwrap();
        match cli.command {
            Commands::Compile {
                scripts,
                out,
                target,
                platform,
                embed,
                standalone,
                mta,
                module_dirs,
                ..
            } => {
                assert_eq!(scripts, vec![PathBuf::from("main.py"), PathBuf::from("util.py")]);
                assert_eq!(out, Some(PathBuf::from("dist/app.exe")));
                assert_eq!(target, TargetKind::WinExe);
                assert_eq!(platform, Some(Platform::X64));
                assert!(embed && mta && !standalone);
                assert_eq!(module_dirs, vec![PathBuf::from("lib"), PathBuf::from("vendor")]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_compile_defaults_to_dll() {
        let cli = Cli::try_parse_from(["ironpyc", "compile", "lib.py"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Compile {
                target: TargetKind::Dll,
                platform: None,
                embed: false,
                ..
            }
        ));
    }

    #[test]
    fn test_compile_requires_scripts_and_valid_target() {
        assert!(Cli::try_parse_from(["ironpyc", "compile"]).is_err());
        assert!(Cli::try_parse_from(["ironpyc", "compile", "a.py", "--target", "so"]).is_err());
        assert!(Cli::try_parse_from(["ironpyc", "compile", "a.py", "--platform", "arm"]).is_err());
    }

    #[test]
    fn test_detect_json() {
        let cli = Cli::try_parse_from(["ironpyc", "detect", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Detect { json: true, .. }));
    }

    #[test]
    fn test_compile_short_flags() {
        let cli = Cli::try_parse_from([
            "ironpyc", "compile", "util.py", "app.py", "-t", "winexe", "-m", "app.py", "-p", "x86",
            "-e", "-s", "-M",
        ])
        .unwrap();
        assert_eq!(cli.command.name(), "compile");
        match cli.command {
            Commands::Compile {
                main,
                platform,
                embed,
                standalone,
                mta,
                ..
            } => {
                assert_eq!(main, Some(PathBuf::from("app.py")));
                assert_eq!(platform, Some(Platform::X86));
                assert!(embed && standalone && mta);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
