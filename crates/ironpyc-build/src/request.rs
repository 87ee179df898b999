//! What to compile and how: the compiler-facing argument list.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::error::BuildError;

/// Kind of artifact the compiler produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    #[default]
    Dll,
    Exe,
    WinExe,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dll => "dll",
            Self::Exe => "exe",
            Self::WinExe => "winexe",
        }
    }

    /// Both console and windowed executables end in `.exe`.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Dll => "dll",
            Self::Exe | Self::WinExe => "exe",
        }
    }

    pub fn is_executable(self) -> bool {
        !matches!(self, Self::Dll)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dll" => Ok(Self::Dll),
            "exe" => Ok(Self::Exe),
            "winexe" => Ok(Self::WinExe),
            other => Err(format!(
                "unknown target '{}' (expected dll, exe or winexe)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    X86,
    X64,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x86" => Ok(Self::X86),
            "x64" => Ok(Self::X64),
            other => Err(format!("unknown platform '{}' (expected x86 or x64)", other)),
        }
    }
}

/// Make `path` absolute against the current directory without touching the filesystem.
pub(crate) fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// One compilation: built per invocation, consumed by [`crate::Compiler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    /// Explicit artifact path; derived from the first script when `None`.
    pub output: Option<PathBuf>,
    pub target: TargetKind,
    pub platform: Option<Platform>,
    pub embed: bool,
    pub standalone: bool,
    pub mta: bool,
    /// Absolute paths, never empty. The first one is the entry point of an executable.
    scripts: Vec<PathBuf>,
    pub compilable: BTreeSet<PathBuf>,
}

impl CompileRequest {
    pub fn new<I, P>(scripts: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let scripts: Vec<PathBuf> = scripts.into_iter().map(|s| absolute(s.as_ref())).collect();
        if scripts.is_empty() {
            return Err(BuildError::EmptyScriptList);
        }
        Ok(Self {
            output: None,
            target: TargetKind::default(),
            platform: None,
            embed: false,
            standalone: false,
            mta: false,
            scripts,
            compilable: BTreeSet::new(),
        })
    }

    pub fn output(mut self, output: impl AsRef<Path>) -> Self {
        self.output = Some(absolute(output.as_ref()));
        self
    }

    pub fn target(mut self, target: TargetKind) -> Self {
        self.target = target;
        self
    }

    pub fn platform(mut self, platform: Option<Platform>) -> Self {
        self.platform = platform;
        self
    }

    pub fn embed(mut self, embed: bool) -> Self {
        self.embed = embed;
        self
    }

    pub fn standalone(mut self, standalone: bool) -> Self {
        self.standalone = standalone;
        self
    }

    pub fn mta(mut self, mta: bool) -> Self {
        self.mta = mta;
        self
    }

    pub fn compilable(mut self, modules: impl IntoIterator<Item = PathBuf>) -> Self {
        self.compilable = modules.into_iter().collect();
        self
    }

    /// Move `main` to the front of the script list, adding it if absent.
    pub fn main_script(mut self, main: impl AsRef<Path>) -> Self {
        let main = absolute(main.as_ref());
        self.scripts.retain(|s| *s != main);
        self.scripts.insert(0, main);
        self
    }

    pub fn scripts(&self) -> &[PathBuf] {
        &self.scripts
    }

    pub fn main(&self) -> &Path {
        &self.scripts[0]
    }

    /// Artifact path: the explicit output, or `<base_dir>/<first script stem>.<dll|exe>`.
    pub fn output_path(&self, base_dir: &Path) -> PathBuf {
        if let Some(ref out) = self.output {
            return out.clone();
        }
        let stem = self
            .main()
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| "out".into());
        let mut path = base_dir.join(stem);
        path.set_extension(self.target.extension());
        path
    }

    /// Compiler arguments, in the order the compiler expects them.
    pub fn build_args(&self, output: &Path) -> Vec<String> {
        let mut args = vec![format!("/out:{}", output.with_extension("").display())];

        if self.target.is_executable() {
            args.push(format!("/target:{}", self.target));
            args.push(format!("/main:{}", self.main().display()));
            if let Some(platform) = self.platform {
                args.push(format!("/platform:{}", platform));
            }
            if self.embed {
                args.push("/embed".to_string());
            }
            if self.standalone {
                args.push("/standalone".to_string());
            }
        }
        if self.target == TargetKind::WinExe && self.mta {
            args.push("/mta".to_string());
        }

        args.extend(self.scripts.iter().map(|s| s.display().to_string()));
        // BTreeSet iterates sorted
        args.extend(self.compilable.iter().map(|m| m.display().to_string()));
        args
    }
}
