//! Copy the runtime's own assemblies next to a compiled artifact.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BuildError;

const LIBRARY_EXTENSION: &str = "dll";

/// Copy every `*.dll` directly inside `install_dir` into `dest_dir`.
/// Returns the copied destination paths, sorted.
pub fn copy_runtime_libraries(dest_dir: &Path, install_dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let entries = fs::read_dir(install_dir)
        .map_err(|e| BuildError::io(format!("cannot read {}", install_dir.display()), e))?;
    fs::create_dir_all(dest_dir)
        .map_err(|e| BuildError::io(format!("cannot create {}", dest_dir.display()), e))?;

    let mut sources: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(LIBRARY_EXTENSION))
        })
        .collect();
    sources.sort();

    let mut copied = Vec::with_capacity(sources.len());
    for src in sources {
        let Some(name) = src.file_name() else { continue };
        let dest = dest_dir.join(name);
        fs::copy(&src, &dest).map_err(|e| {
            BuildError::io(format!("cannot copy {} to {}", src.display(), dest.display()), e)
        })?;
        tracing::debug!(from = %src.display(), to = %dest.display(), "copied runtime library");
        copied.push(dest);
    }
    tracing::info!("copied {} runtime libraries to {}", copied.len(), dest_dir.display());
    Ok(copied)
}
