//! Dependency classification and compiler invocation.
//!
//! [`DependencyAnalyzer`] sorts the modules scripts import into builtin,
//! compilable and uncompilable sets. [`Compiler`] turns a [`CompileRequest`]
//! into a response file and a single external compiler run.

pub mod analyzer;
pub mod compiler;
pub mod error;
pub mod finder;
pub mod request;
pub mod response_file;
pub mod runtime_libs;

pub use analyzer::{classify, default_search_dirs, DependencyAnalyzer, DependencyReport, ModuleKind};
pub use compiler::{CompileOptions, CompileOutcome, Compiler, CompilerInvocation};
pub use error::BuildError;
pub use finder::{FoundModule, InterpreterModuleFinder, ModuleFinder, ModuleGraph};
pub use request::{CompileRequest, Platform, TargetKind};
pub use response_file::ResponseFile;
pub use runtime_libs::copy_runtime_libraries;
