//! Import-graph walking, delegated to a host interpreter.
//!
//! This crate never parses scripts itself. [`InterpreterModuleFinder`] runs
//! the host Python's standard `modulefinder` over one script and reads back a
//! JSON report; tests plug in their own [`ModuleFinder`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ironpyc_core::{ProcessRunner, RunOptions, SystemProcessRunner};
use serde::Deserialize;

use crate::error::BuildError;

/// Prefix of the report line, so interpreter warnings around it are ignored.
const REPORT_MARKER: &str = "IRONPYC-REPORT ";

/// argv: `-c <driver> <script> [search dir ...]`
const MODULEFINDER_DRIVER: &str = r#"import json, modulefinder, sys
mf = modulefinder.ModuleFinder(path=sys.argv[2:])
mf.run_script(sys.argv[1])
mods = [{"name": n, "file": getattr(m, "__file__", None)} for n, m in mf.modules.items()]
print("IRONPYC-REPORT " + json.dumps({"modules": mods, "bad_modules": sorted(mf.badmodules)}))
"#;

const SYS_PATH_DRIVER: &str = r#"import json, sys
print("IRONPYC-REPORT " + json.dumps([p for p in sys.path if p]))
"#;

/// A module reached from a script; `file` is `None` for modules built into the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FoundModule {
    pub name: String,
    pub file: Option<PathBuf>,
}

/// Result of walking one script's imports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModuleGraph {
    pub modules: Vec<FoundModule>,
    /// Imports that could not be resolved from the search directories.
    #[serde(default)]
    pub bad_modules: Vec<String>,
}

pub trait ModuleFinder: Send + Sync {
    /// Walk the imports of `script`, resolving modules only from `search_dirs`.
    /// An empty list resolves nothing beyond builtins; every other import is reported bad.
    fn find(&self, script: &Path, search_dirs: &[PathBuf]) -> Result<ModuleGraph, BuildError>;
}

/// Runs `modulefinder` inside a host Python interpreter.
pub struct InterpreterModuleFinder {
    python: PathBuf,
    runner: Arc<dyn ProcessRunner>,
    timeout: Option<Duration>,
}

impl InterpreterModuleFinder {
    pub fn new(python: impl Into<PathBuf>) -> Self {
        Self::with_runner(python, Arc::new(SystemProcessRunner))
    }

    pub fn with_runner(python: impl Into<PathBuf>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            python: python.into(),
            runner,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn python(&self) -> &Path {
        &self.python
    }

    /// The host interpreter's module search path (`sys.path`).
    pub fn host_module_path(&self) -> Result<Vec<PathBuf>, BuildError> {
        let args = vec!["-c".to_string(), SYS_PATH_DRIVER.to_string()];
        let output = self.run_driver(&args).map_err(|reason| BuildError::Analysis {
            script: self.python.clone(),
            reason,
        })?;
        serde_json::from_str(&output).map_err(|e| BuildError::Analysis {
            script: self.python.clone(),
            reason: format!("unreadable sys.path report: {}", e),
        })
    }

    /// Run a driver and return the JSON payload of its report line.
    fn run_driver(&self, args: &[String]) -> Result<String, String> {
        let out = self
            .runner
            .run(
                &self.python,
                args,
                None,
                RunOptions::with_timeout(self.timeout),
            )
            .map_err(|e| e.to_string())?;
        if !out.success() {
            return Err(format!(
                "{} exited with status {}: {}",
                self.python.display(),
                out.exit_code,
                out.output.trim()
            ));
        }
        extract_report(&out.output)
            .map(str::to_string)
            .ok_or_else(|| format!("no module report in output: {}", out.output.trim()))
    }
}

impl ModuleFinder for InterpreterModuleFinder {
    fn find(&self, script: &Path, search_dirs: &[PathBuf]) -> Result<ModuleGraph, BuildError> {
        let analysis_error = |reason: String| BuildError::Analysis {
            script: script.to_path_buf(),
            reason,
        };
        let mut args = vec![
            "-c".to_string(),
            MODULEFINDER_DRIVER.to_string(),
            script.to_string_lossy().into_owned(),
        ];
        args.extend(search_dirs.iter().map(|d| d.to_string_lossy().into_owned()));

        tracing::debug!(script = %script.display(), dirs = search_dirs.len(), "walking imports");
        let report = self.run_driver(&args).map_err(analysis_error)?;
        serde_json::from_str(&report)
            .map_err(|e| analysis_error(format!("unreadable module report: {}", e)))
    }
}

fn extract_report(output: &str) -> Option<&str> {
    output
        .lines()
        .find_map(|line| line.trim_end_matches('\r').strip_prefix(REPORT_MARKER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironpyc_core::{LaunchError, ProcessOutput};
    use std::sync::Mutex;

    struct CannedRunner {
        output: String,
        exit_code: i32,
        seen_args: Mutex<Vec<String>>,
    }

    impl CannedRunner {
        fn new(output: &str, exit_code: i32) -> Arc<Self> {
            Arc::new(Self {
                output: output.to_string(),
                exit_code,
                seen_args: Mutex::new(Vec::new()),
            })
        }
    }

    impl ProcessRunner for CannedRunner {
        fn run(
            &self,
            _program: &Path,
            args: &[String],
            _cwd: Option<&Path>,
            _options: RunOptions,
        ) -> Result<ProcessOutput, LaunchError> {
            *self.seen_args.lock().unwrap() = args.to_vec();
            Ok(ProcessOutput {
                output: self.output.clone(),
                exit_code: self.exit_code,
            })
        }
    }

    #[test]
    fn test_report_is_parsed_and_noise_ignored() {
        let output = concat!(
            "some warning\n",
            "IRONPYC-REPORT {\"modules\": [",
            "{\"name\": \"sys\", \"file\": null}, ",
            "{\"name\": \"os\", \"file\": \"/ipy/Lib/os.py\"}], ",
            "\"bad_modules\": [\"clr\"]}\n",
            "DeprecationWarning: the imp module is deprecated\n",
        );
        let runner = CannedRunner::new(output, 0);
        let finder = InterpreterModuleFinder::with_runner("python3", runner.clone());
        let graph = finder
            .find(Path::new("/src/app.py"), &[PathBuf::from("/ipy/Lib")])
            .unwrap();

        assert_eq!(graph.modules.len(), 2);
        assert_eq!(graph.modules[0].file, None);
        assert_eq!(graph.modules[1].file, Some(PathBuf::from("/ipy/Lib/os.py")));
        assert_eq!(graph.bad_modules, vec!["clr".to_string()]);

        let args = runner.seen_args.lock().unwrap().clone();
        assert_eq!(args[0], "-c");
        assert_eq!(&args[2..], &["/src/app.py".to_string(), "/ipy/Lib".to_string()]);
    }

    #[test]
    fn test_failed_walk_is_analysis_error() {
        let runner = CannedRunner::new("SyntaxError: invalid syntax\n", 1);
        let finder = InterpreterModuleFinder::with_runner("python3", runner);
        let err = finder.find(Path::new("/src/bad.py"), &[]).unwrap_err();
        assert!(matches!(err, BuildError::Analysis { .. }));
        assert!(err.to_string().contains("SyntaxError"));
    }

    #[test]
    fn test_missing_report_is_analysis_error() {
        let runner = CannedRunner::new("nothing useful\n", 0);
        let finder = InterpreterModuleFinder::with_runner("python3", runner);
        assert!(finder.find(Path::new("/src/app.py"), &[]).is_err());
    }

    #[test]
    fn test_host_module_path() {
        let runner = CannedRunner::new(
            "IRONPYC-REPORT [\"/usr/lib/python3.11\", \"/usr/lib/python3/site-packages\"]\r\n",
            0,
        );
        let finder = InterpreterModuleFinder::with_runner("python3", runner);
        assert_eq!(
            finder.host_module_path().unwrap(),
            vec![
                PathBuf::from("/usr/lib/python3.11"),
                PathBuf::from("/usr/lib/python3/site-packages"),
            ]
        );
    }

    #[test]
    fn test_empty_search_dirs_do_not_widen_to_host_path() {
        let runner = CannedRunner::new("IRONPYC-REPORT {\"modules\": [], \"bad_modules\": [\"os\"]}\n", 0);
        let finder = InterpreterModuleFinder::with_runner("python3", runner.clone());
        let graph = finder.find(Path::new("/src/app.py"), &[]).unwrap();
        assert_eq!(graph.bad_modules, vec!["os".to_string()]);

        let args = runner.seen_args.lock().unwrap().clone();
        assert_eq!(args.len(), 3);
        assert!(MODULEFINDER_DRIVER.contains("ModuleFinder(path=sys.argv[2:])"));
    }
}
