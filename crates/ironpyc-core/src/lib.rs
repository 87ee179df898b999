pub mod config;
pub mod observability;
pub mod process;
pub mod version;

pub use process::{LaunchError, ProcessOutput, ProcessRunner, RunOptions, SystemProcessRunner};
pub use version::{Version, VersionParseError};
