//! Barcode scanner fed through a drop file.
//!
//! The scanner daemon writes decoded codes, one per line, into a file. Each
//! poll takes the first non-blank line and writes the rest back.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use cart_traits::{BoxError, Scanner};

use crate::error::Result;

pub const DEFAULT_PATH: &str = "/tmp/barcode.txt";

#[derive(Debug, Clone)]
pub struct FileScanner {
    path: PathBuf,
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new(DEFAULT_PATH)
    }
}

impl FileScanner {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn take_line(&self) -> Result<Option<String>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut lines = text.lines().map(str::trim).skip_while(|l| l.is_empty());
        let Some(code) = lines.next().map(str::to_owned) else {
            if !text.is_empty() {
                fs::write(&self.path, "")?;
            }
            return Ok(None);
        };
        let rest: Vec<&str> = lines.filter(|l| !l.is_empty()).collect();
        let mut remainder = rest.join("\n");
        if !remainder.is_empty() {
            remainder.push('\n');
        }
        fs::write(&self.path, remainder)?;
        tracing::debug!(code = %code, path = %self.path.display(), "scanned");
        Ok(Some(code))
    }
}

impl Scanner for FileScanner {
    fn poll(&mut self) -> std::result::Result<Option<String>, BoxError> {
        Ok(self.take_line()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = FileScanner::new(dir.path().join("none.txt"));
        assert_eq!(s.poll().unwrap(), None);
    }

    #[test]
    fn codes_are_consumed_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("barcode.txt");
        fs::write(&path, "\n 760557824961 \n\n941047822994\n").unwrap();
        let mut s = FileScanner::new(&path);
        assert_eq!(s.poll().unwrap().as_deref(), Some("760557824961"));
        assert_eq!(s.poll().unwrap().as_deref(), Some("941047822994"));
        assert_eq!(s.poll().unwrap(), None);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
