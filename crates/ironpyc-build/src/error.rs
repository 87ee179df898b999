use std::io;
use std::path::PathBuf;

use ironpyc_core::LaunchError;
use thiserror::Error;

/// Errors from dependency analysis and compiler invocation.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// The compiler ran and exited non-zero. `output` is its combined stdout/stderr.
    #[error("{executable} returned exit status {code}\n{output}")]
    Compilation {
        executable: String,
        code: i32,
        output: String,
    },

    #[error("module analysis of {} failed: {reason}", .script.display())]
    Analysis { script: PathBuf, reason: String },

    #[error("argument contains a line break and cannot be written to a response file: {0:?}")]
    InvalidArgument(String),

    #[error("no scripts to compile")]
    EmptyScriptList,

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
