//! Classify the modules a set of scripts depends on.
//!
//! Every module reached from a script is `builtin` (no file), `native` (a
//! binary extension that cannot be bundled) or `compilable` (a source file that
//! can be compiled into the artifact). Unresolvable imports count as
//! uncompilable. The scripts themselves are never their own dependencies.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::BuildError;
use crate::finder::ModuleFinder;
use crate::request::absolute;

/// File extensions of native extension modules, compared case-insensitively.
pub const NATIVE_EXTENSIONS: &[&str] = &["pyd", "so", "dylib"];

/// Marker for third-party package directories on the host module path.
const SITE_PACKAGES: &str = "site-packages";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleKind {
    Builtin,
    Native,
    Compilable(PathBuf),
}

/// Classify a module by the file it resolved to.
pub fn classify(file: Option<&Path>) -> ModuleKind {
    let Some(file) = file else {
        return ModuleKind::Builtin;
    };
    let native = file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| NATIVE_EXTENSIONS.iter().any(|n| n.eq_ignore_ascii_case(ext)));
    if native {
        ModuleKind::Native
    } else {
        ModuleKind::Compilable(absolute(file))
    }
}

/// Accumulated classification over all analyzed scripts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
    pub builtin: BTreeSet<String>,
    pub compilable: BTreeSet<PathBuf>,
    pub uncompilable: BTreeSet<String>,
}

impl DependencyReport {
    pub fn is_empty(&self) -> bool {
        self.builtin.is_empty() && self.compilable.is_empty() && self.uncompilable.is_empty()
    }
}

pub struct DependencyAnalyzer {
    finder: Box<dyn ModuleFinder>,
}

impl DependencyAnalyzer {
    pub fn new(finder: Box<dyn ModuleFinder>) -> Self {
        Self { finder }
    }

    /// Walk every script and merge the classifications.
    pub fn analyze(
        &self,
        scripts: &[PathBuf],
        search_dirs: &[PathBuf],
    ) -> Result<DependencyReport, BuildError> {
        let scripts: Vec<PathBuf> = scripts.iter().map(|s| absolute(s)).collect();
        let mut report = DependencyReport::default();

        for script in &scripts {
            let graph = self.finder.find(script, search_dirs)?;
            report.uncompilable.extend(graph.bad_modules);
            for module in graph.modules {
                match classify(module.file.as_deref()) {
                    ModuleKind::Builtin => {
                        report.builtin.insert(module.name);
                    }
                    ModuleKind::Native => {
                        report.uncompilable.insert(module.name);
                    }
                    ModuleKind::Compilable(path) => {
                        report.compilable.insert(path);
                    }
                }
            }
        }

        for script in &scripts {
            report.compilable.remove(script);
        }
        tracing::debug!(
            builtin = report.builtin.len(),
            compilable = report.compilable.len(),
            uncompilable = report.uncompilable.len(),
            "dependency analysis finished"
        );
        Ok(report)
    }
}

/// The runtime's `Lib` directory plus the host's third-party package directories.
pub fn default_search_dirs(install_dir: &Path, host_module_path: &[PathBuf]) -> Vec<PathBuf> {
    let mut dirs = vec![install_dir.join("Lib")];
    dirs.extend(
        host_module_path
            .iter()
            .filter(|p| p.to_string_lossy().contains(SITE_PACKAGES))
            .cloned(),
    );
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::{FoundModule, ModuleGraph};
    use std::collections::HashMap;

    /// Returns a fixed graph per script.
    #[derive(Default)]
    struct TableFinder(HashMap<PathBuf, ModuleGraph>);

    impl TableFinder {
        fn script(mut self, script: &str, modules: &[(&str, Option<&str>)], bad: &[&str]) -> Self {
            let graph = ModuleGraph {
                modules: modules
                    .iter()
                    .map(|(name, file)| FoundModule {
                        name: name.to_string(),
                        file: file.map(PathBuf::from),
                    })
                    .collect(),
                bad_modules: bad.iter().map(|s| s.to_string()).collect(),
            };
            self.0.insert(PathBuf::from(script), graph);
            self
        }
    }

    impl ModuleFinder for TableFinder {
        fn find(&self, script: &Path, _dirs: &[PathBuf]) -> Result<ModuleGraph, BuildError> {
            self.0.get(script).cloned().ok_or_else(|| BuildError::Analysis {
                script: script.to_path_buf(),
                reason: "unknown script".to_string(),
            })
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_classify() {
        assert_eq!(classify(None), ModuleKind::Builtin);
        assert_eq!(classify(Some(Path::new("/lib/_speedups.pyd"))), ModuleKind::Native);
        assert_eq!(classify(Some(Path::new("/lib/_ssl.SO"))), ModuleKind::Native);
        assert_eq!(
            classify(Some(Path::new("/ipy/Lib/os.py"))),
            ModuleKind::Compilable(PathBuf::from("/ipy/Lib/os.py"))
        );
    }

    #[test]
    fn test_relative_module_path_made_absolute() {
        match classify(Some(Path::new("lib/helper.py"))) {
            ModuleKind::Compilable(path) => {
                assert!(path.is_absolute());
                assert!(path.ends_with("lib/helper.py"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_analyze_merges_scripts_and_excludes_inputs() {
        let finder = TableFinder::default()
            .script(
                "/src/main.py",
                &[
                    ("__main__", Some("/src/main.py")),
                    ("sys", None),
                    ("os", Some("/ipy/Lib/os.py")),
                    ("util", Some("/src/util.py")),
                    ("_native", Some("/site-packages/_native.pyd")),
                ],
                &["clr"],
            )
            .script(
                "/src/util.py",
                &[
                    ("__main__", Some("/src/util.py")),
                    // Self-import must not make the script its own dependency.
                    ("main", Some("/src/main.py")),
                    ("re", Some("/ipy/Lib/re.py")),
                ],
                &[],
            );
        let analyzer = DependencyAnalyzer::new(Box::new(finder));
        let report = analyzer
            .analyze(
                &[PathBuf::from("/src/main.py"), PathBuf::from("/src/util.py")],
                &[],
            )
            .unwrap();

        assert_eq!(report.builtin, BTreeSet::from(["sys".to_string()]));
        assert_eq!(
            report.compilable,
            BTreeSet::from([PathBuf::from("/ipy/Lib/os.py"), PathBuf::from("/ipy/Lib/re.py")])
        );
        assert_eq!(
            report.uncompilable,
            BTreeSet::from(["_native".to_string(), "clr".to_string()])
        );
    }

    #[test]
    fn test_finder_failure_propagates() {
        let analyzer = DependencyAnalyzer::new(Box::new(TableFinder::default()));
        let err = analyzer
            .analyze(&[PathBuf::from("/src/missing.py")], &[])
            .unwrap_err();
        assert!(matches!(err, BuildError::Analysis { .. }));
    }

    #[test]
    fn test_default_search_dirs() {
        let host = vec![
            PathBuf::from("/usr/lib/python3.11"),
            PathBuf::from("/usr/lib/python3.11/site-packages"),
            PathBuf::from("/home/u/.local/lib/python3.11/site-packages"),
        ];
        assert_eq!(
            default_search_dirs(Path::new("/opt/ipy"), &host),
            vec![
                PathBuf::from("/opt/ipy/Lib"),
                PathBuf::from("/usr/lib/python3.11/site-packages"),
                PathBuf::from("/home/u/.local/lib/python3.11/site-packages"),
            ]
        );
    }
}
