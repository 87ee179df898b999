//! Line-oriented argument files passed to the compiler as `@<path>`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::error::BuildError;

const PREFIX: &str = "IPC";
const SUFFIX: &str = ".txt";

/// Text-mode line ending of the host.
#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

/// A written and closed response file, removed on drop unless kept.
#[derive(Debug)]
pub struct ResponseFile {
    path: TempPath,
}

impl ResponseFile {
    /// Write `args` to a fresh uniquely named file in the system temp directory.
    pub fn write(args: &[String]) -> Result<Self, BuildError> {
        Self::write_in(&std::env::temp_dir(), args)
    }

    pub fn write_in(dir: &Path, args: &[String]) -> Result<Self, BuildError> {
        if let Some(bad) = args.iter().find(|a| a.contains(['\n', '\r'])) {
            return Err(BuildError::InvalidArgument(bad.clone()));
        }
        let mut file = tempfile::Builder::new()
            .prefix(PREFIX)
            .suffix(SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| BuildError::io("cannot create response file", e))?;
        let mut text = String::new();
        for arg in args {
            text.push_str(arg);
            text.push_str(LINE_ENDING);
        }
        file.write_all(text.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| BuildError::io("cannot write response file", e))?;
        // Closes the handle; the compiler reads a complete file, not a stream.
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `@<path>`, the single compiler argument referencing this file.
    pub fn indirection_arg(&self) -> String {
        format!("@{}", self.path.display())
    }

    /// Delete the file, or keep it and return where it is.
    pub fn finish(self, keep: bool) -> Result<Option<PathBuf>, BuildError> {
        if keep {
            let path = self
                .path
                .keep()
                .map_err(|e| BuildError::io("cannot keep response file", e.error))?;
            return Ok(Some(path));
        }
        let display = self.path.display().to_string();
        self.path
            .close()
            .map_err(|e| BuildError::io(format!("cannot delete response file {}", display), e))?;
        Ok(None)
    }
}

/// Read a response file back into its argument list.
pub fn read_lines(path: &Path) -> Result<Vec<String>, BuildError> {
    let text = fs::read_to_string(path)
        .map_err(|e| BuildError::io(format!("cannot read {}", path.display()), e))?;
    Ok(text.lines().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_args() -> Vec<String> {
        vec![
            "/out:C:\\My Projects\\app".to_string(),
            "/target:exe".to_string(),
            "/main:/home/user/my scripts/app.py".to_string(),
            "/embed".to_string(),
            "/home/user/my scripts/app.py".to_string(),
            "  leading and trailing spaces  ".to_string(),
            "@not-an-indirection".to_string(),
        ]
    }

    #[test]
    fn test_round_trip_preserves_order_and_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let args = sample_args();
        let rf = ResponseFile::write_in(dir.path(), &args).unwrap();
        assert_eq!(read_lines(rf.path()).unwrap(), args);
    }

    #[test]
    fn test_every_line_terminated() {
        let dir = tempfile::tempdir().unwrap();
        let rf = ResponseFile::write_in(dir.path(), &["/embed".to_string()]).unwrap();
        let raw = fs::read_to_string(rf.path()).unwrap();
        assert_eq!(raw, format!("/embed{}", LINE_ENDING));
    }

    #[test]
    fn test_unique_names_and_indirection() {
        let dir = tempfile::tempdir().unwrap();
        let a = ResponseFile::write_in(dir.path(), &[]).unwrap();
        let b = ResponseFile::write_in(dir.path(), &[]).unwrap();
        assert_ne!(a.path(), b.path());

        let name = a.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("IPC") && name.ends_with(".txt"));
        assert_eq!(a.indirection_arg(), format!("@{}", a.path().display()));
    }

    #[test]
    fn test_finish_deletes_or_keeps() {
        let dir = tempfile::tempdir().unwrap();
        let deleted = ResponseFile::write_in(dir.path(), &sample_args()).unwrap();
        let path = deleted.path().to_path_buf();
        assert_eq!(deleted.finish(false).unwrap(), None);
        assert!(!path.exists());

        let kept = ResponseFile::write_in(dir.path(), &sample_args()).unwrap();
        let path = kept.finish(true).unwrap().unwrap();
        assert!(path.exists());
        assert_eq!(read_lines(&path).unwrap(), sample_args());
    }

    #[test]
    fn test_multiline_argument_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = ResponseFile::write_in(dir.path(), &["a\nb".to_string()]).unwrap_err();
        assert!(matches!(err, BuildError::InvalidArgument(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
