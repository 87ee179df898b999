//! Turn a [`CompileRequest`] into one compiler run.
//!
//! Sequence per request: derive the artifact path, build the argument list,
//! write it to a fresh response file, run `<compiler> @<response file>` in the
//! artifact's directory, inspect the exit code, and only then delete the
//! response file (unless it is kept for inspection).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ironpyc_core::{ProcessRunner, RunOptions, SystemProcessRunner};
use serde::Serialize;

use crate::analyzer::DependencyAnalyzer;
use crate::error::BuildError;
use crate::request::CompileRequest;
use crate::response_file::ResponseFile;

/// How the compiler is launched: an executable, optionally running a compiler script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerInvocation {
    pub executable: PathBuf,
    pub script: Option<PathBuf>,
}

impl CompilerInvocation {
    /// `<install>/<executable> <pyc.py>`; `pyc.py` defaults to `<install>/Tools/Scripts/pyc.py`.
    pub fn for_runtime(install_dir: &Path, executable: &str, pyc_path: Option<&Path>) -> Self {
        let script = match pyc_path {
            Some(p) => crate::request::absolute(p),
            None => install_dir.join("Tools").join("Scripts").join("pyc.py"),
        };
        Self {
            executable: install_dir.join(executable),
            script: Some(script),
        }
    }

    /// A compiler that takes the response file directly.
    pub fn direct(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            script: None,
        }
    }

    fn args(&self, response: &ResponseFile) -> Vec<String> {
        let mut args = Vec::with_capacity(2);
        if let Some(ref script) = self.script {
            args.push(script.display().to_string());
        }
        args.push(response.indirection_arg());
        args
    }

    fn name(&self) -> String {
        self.executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.executable.display().to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Keep the response file after the run, whatever the outcome.
    pub keep_response_file: bool,
    pub timeout: Option<Duration>,
    /// Directory for derived artifact names; the current directory when `None`.
    pub base_dir: Option<PathBuf>,
}

/// A successful compilation.
#[derive(Debug, Clone, Serialize)]
pub struct CompileOutcome {
    pub artifact: PathBuf,
    /// Combined compiler output.
    pub output: String,
    /// Set when the response file was kept.
    pub response_file: Option<PathBuf>,
}

/// One orchestrator per concurrent compilation; nothing is shared between runs.
pub struct Compiler {
    runner: Arc<dyn ProcessRunner>,
    invocation: CompilerInvocation,
    options: CompileOptions,
}

impl Compiler {
    pub fn new(invocation: CompilerInvocation, options: CompileOptions) -> Self {
        Self::with_runner(Arc::new(SystemProcessRunner), invocation, options)
    }

    pub fn with_runner(
        runner: Arc<dyn ProcessRunner>,
        invocation: CompilerInvocation,
        options: CompileOptions,
    ) -> Self {
        Self {
            runner,
            invocation,
            options,
        }
    }

    pub fn invocation(&self) -> &CompilerInvocation {
        &self.invocation
    }

    fn base_dir(&self) -> Result<PathBuf, BuildError> {
        match self.options.base_dir {
            Some(ref dir) => Ok(crate::request::absolute(dir)),
            None => std::env::current_dir()
                .map_err(|e| BuildError::io("cannot determine current directory", e)),
        }
    }

    pub fn compile(&self, request: &CompileRequest) -> Result<CompileOutcome, BuildError> {
        let artifact = request.output_path(&self.base_dir()?);
        let work_dir = artifact
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&work_dir)
            .map_err(|e| BuildError::io(format!("cannot create {}", work_dir.display()), e))?;

        let response = ResponseFile::write(&request.build_args(&artifact))?;
        let args = self.invocation.args(&response);
        tracing::info!(
            "compiling {} script(s) and {} module(s) into {}",
            request.scripts().len(),
            request.compilable.len(),
            artifact.display()
        );
        tracing::debug!(response_file = %response.path().display(), ?args, "invoking compiler");

        let run = self.runner.run(
            &self.invocation.executable,
            &args,
            Some(&work_dir),
            RunOptions::with_timeout(self.options.timeout),
        );
        let result = match run {
            Ok(out) if out.success() => Ok(out.output),
            Ok(out) => Err(BuildError::Compilation {
                executable: self.invocation.name(),
                code: out.exit_code,
                output: out.output,
            }),
            Err(e) => Err(BuildError::Launch(e)),
        };

        // Exit status has been read; the response file can go now.
        let kept = match response.finish(self.options.keep_response_file) {
            Ok(kept) => kept,
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        };
        if let Some(ref path) = kept {
            tracing::info!("response file kept at {}", path.display());
        }

        let output = result?;
        tracing::info!("compiled {}", artifact.display());
        Ok(CompileOutcome {
            artifact,
            output,
            response_file: kept,
        })
    }

    /// Like [`Compiler::compile`], but analyzes dependencies first when the
    /// request carries no compilable modules.
    pub fn compile_scripts(
        &self,
        mut request: CompileRequest,
        analyzer: &DependencyAnalyzer,
        search_dirs: &[PathBuf],
    ) -> Result<CompileOutcome, BuildError> {
        if request.compilable.is_empty() {
            let report = analyzer.analyze(request.scripts(), search_dirs)?;
            if !report.uncompilable.is_empty() {
                tracing::warn!(
                    "modules that cannot be bundled: {}",
                    report
                        .uncompilable
                        .iter()
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            request.compilable = report.compilable;
        }
        self.compile(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::{FoundModule, ModuleFinder, ModuleGraph};
    use crate::request::{Platform, TargetKind};
    use crate::response_file::read_lines;
    use ironpyc_core::{LaunchError, ProcessOutput};
    use std::sync::Mutex;

    /// Captures the response file contents while the "compiler" runs.
    struct MockCompiler {
        exit_code: i32,
        output: String,
        calls: Mutex<Vec<Call>>,
    }

    #[derive(Debug, Clone)]
    struct Call {
        program: PathBuf,
        args: Vec<String>,
        cwd: Option<PathBuf>,
        response_path: PathBuf,
        response_lines: Vec<String>,
    }

    impl MockCompiler {
        fn new(exit_code: i32, output: &str) -> Arc<Self> {
            Arc::new(Self {
                exit_code,
                output: output.to_string(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn last_call(&self) -> Call {
            self.calls.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl ProcessRunner for MockCompiler {
        fn run(
            &self,
            program: &Path,
            args: &[String],
            cwd: Option<&Path>,
            _options: RunOptions,
        ) -> Result<ProcessOutput, LaunchError> {
            let response_path = PathBuf::from(args.last().unwrap().trim_start_matches('@'));
            let response_lines = read_lines(&response_path).unwrap();
            self.calls.lock().unwrap().push(Call {
                program: program.to_path_buf(),
                args: args.to_vec(),
                cwd: cwd.map(Path::to_path_buf),
                response_path,
                response_lines,
            });
            Ok(ProcessOutput {
                output: self.output.clone(),
                exit_code: self.exit_code,
            })
        }
    }

    struct NotFoundRunner;

    impl ProcessRunner for NotFoundRunner {
        fn run(
            &self,
            program: &Path,
            _args: &[String],
            _cwd: Option<&Path>,
            _options: RunOptions,
        ) -> Result<ProcessOutput, LaunchError> {
            Err(LaunchError::NotFound {
                program: program.to_path_buf(),
            })
        }
    }

    fn compiler(runner: Arc<dyn ProcessRunner>, base: &Path, keep: bool) -> Compiler {
        Compiler::with_runner(
            runner,
            CompilerInvocation::for_runtime(Path::new("/opt/ipy"), "ipy.exe", None),
            CompileOptions {
                keep_response_file: keep,
                timeout: None,
                base_dir: Some(base.to_path_buf()),
            },
        )
    }

    #[test]
    fn test_exe_request_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        let main = base.join("main.ipy");
        let module = base.join("lib").join("helper.py");
        let runner = MockCompiler::new(0, "Saved to main.exe\n");

        let request = CompileRequest::new([&main])
            .unwrap()
            .target(TargetKind::Exe)
            .platform(Some(Platform::X86))
            .embed(true)
            .standalone(false)
            .compilable([module.clone()]);
        let outcome = compiler(runner.clone(), base, false).compile(&request).unwrap();

        assert_eq!(outcome.artifact, base.join("main.exe"));
        assert_eq!(outcome.output, "Saved to main.exe\n");
        assert_eq!(outcome.response_file, None);

        let call = runner.last_call();
        assert_eq!(
            call.response_lines,
            vec![
                format!("/out:{}", base.join("main").display()),
                "/target:exe".to_string(),
                format!("/main:{}", main.display()),
                "/platform:x86".to_string(),
                "/embed".to_string(),
                main.display().to_string(),
                module.display().to_string(),
            ]
        );
        assert_eq!(call.program, Path::new("/opt/ipy").join("ipy.exe"));
        assert_eq!(
            call.args[0],
            Path::new("/opt/ipy/Tools/Scripts/pyc.py").display().to_string()
        );
        assert!(call.args[1].starts_with('@'));
        assert_eq!(call.cwd.as_deref(), Some(base));
        assert!(!call.response_path.exists());
    }

    #[test]
    fn test_nonzero_exit_is_compilation_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockCompiler::new(1, "error: cannot import name spam\n");
        let request = CompileRequest::new([dir.path().join("main.ipy")]).unwrap();

        let err = compiler(runner.clone(), dir.path(), false)
            .compile(&request)
            .unwrap_err();
        match &err {
            BuildError::Compilation {
                executable,
                code,
                output,
            } => {
                assert_eq!(executable, "ipy.exe");
                assert_eq!(*code, 1);
                assert!(output.contains("cannot import name spam"));
            }
            other => panic!("unexpected {:?}", other),
        }
        let message = err.to_string();
        assert!(message.contains('1'));
        assert!(message.contains("cannot import name spam"));
        assert!(!runner.last_call().response_path.exists());
    }

    #[test]
    fn test_failed_run_keeps_response_file_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockCompiler::new(2, "boom\n");
        let request = CompileRequest::new([dir.path().join("main.ipy")]).unwrap();

        let err = compiler(runner.clone(), dir.path(), true)
            .compile(&request)
            .unwrap_err();
        assert!(matches!(err, BuildError::Compilation { code: 2, .. }));

        let call = runner.last_call();
        assert!(call.response_path.exists());
        assert_eq!(read_lines(&call.response_path).unwrap(), call.response_lines);
        fs::remove_file(&call.response_path).unwrap();
    }

    #[test]
    fn test_successful_run_reports_kept_file() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockCompiler::new(0, "");
        let request = CompileRequest::new([dir.path().join("lib.py")]).unwrap();

        let outcome = compiler(runner, dir.path(), true).compile(&request).unwrap();
        let kept = outcome.response_file.unwrap();
        assert!(kept.exists());
        fs::remove_file(kept).unwrap();
    }

    #[test]
    fn test_launch_failure_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let request = CompileRequest::new([dir.path().join("main.ipy")]).unwrap();
        let err = compiler(Arc::new(NotFoundRunner), dir.path(), false)
            .compile(&request)
            .unwrap_err();
        assert!(matches!(err, BuildError::Launch(LaunchError::NotFound { .. })));
    }

    #[test]
    fn test_direct_invocation_passes_only_indirection() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockCompiler::new(0, "");
        let compiler = Compiler::with_runner(
            runner.clone(),
            CompilerInvocation::direct("/usr/bin/ipyc"),
            CompileOptions {
                base_dir: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
        );
        compiler
            .compile(&CompileRequest::new([dir.path().join("a.py")]).unwrap())
            .unwrap();
        let call = runner.last_call();
        assert_eq!(call.args.len(), 1);
        assert!(call.args[0].starts_with('@'));
    }

    struct OneModuleFinder(PathBuf);

    impl ModuleFinder for OneModuleFinder {
        fn find(&self, script: &Path, _dirs: &[PathBuf]) -> Result<ModuleGraph, BuildError> {
            Ok(ModuleGraph {
                modules: vec![
                    FoundModule {
                        name: "__main__".to_string(),
                        file: Some(script.to_path_buf()),
                    },
                    FoundModule {
                        name: "helper".to_string(),
                        file: Some(self.0.clone()),
                    },
                ],
                bad_modules: vec![],
            })
        }
    }

    #[test]
    fn test_compile_scripts_analyzes_when_no_modules_given() {
        let dir = tempfile::tempdir().unwrap();
        let helper = dir.path().join("helper.py");
        let runner = MockCompiler::new(0, "");
        let analyzer = DependencyAnalyzer::new(Box::new(OneModuleFinder(helper.clone())));
        let request = CompileRequest::new([dir.path().join("app.py")]).unwrap();

        compiler(runner.clone(), dir.path(), false)
            .compile_scripts(request, &analyzer, &[])
            .unwrap();
        let lines = runner.last_call().response_lines;
        assert_eq!(lines.last(), Some(&helper.display().to_string()));
        assert_eq!(lines.len(), 3);
    }
}
