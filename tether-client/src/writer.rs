//! Atomic target-file replacement.
//!
//! Write flow: payload → `<path>.tether.tmp` sibling → `rename`. A reader
//! never observes a half-written target, and a failed attempt leaves any
//! previous mirror intact.

use std::path::{Path, PathBuf};

use crate::error::{io_err, ClientError};

/// Replace `path` wholesale with `data`.
pub(crate) fn replace_file(path: &Path, data: &[u8]) -> Result<(), ClientError> {
    let tmp = PathBuf::from(format!("{}.tether.tmp", path.display()));

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }

    std::fs::write(&tmp, data).map_err(|e| io_err(&tmp, e))?;
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, err));
    }

    tracing::debug!(path = %path.display(), bytes = data.len(), "target replaced");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_fresh_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mirror.txt");
        replace_file(&path, b"first").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"first");
    }

    #[test]
    fn replaces_existing_content_wholesale() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mirror.txt");
        replace_file(&path, b"a much longer original payload").unwrap();
        replace_file(&path, b"short").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"short");
    }

    #[test]
    fn tmp_sibling_is_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mirror.txt");
        replace_file(&path, b"data").unwrap();
        assert!(!dir.path().join("mirror.txt.tether.tmp").exists());
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deep").join("mirror.txt");
        replace_file(&path, b"data").unwrap();
        assert!(path.exists());
    }

    #[test]
    #[cfg(unix)]
    fn failed_rename_keeps_original_and_cleans_tmp() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let readonly = dir.path().join("readonly");
        std::fs::create_dir_all(&readonly).unwrap();
        let path = readonly.join("mirror.txt");
        std::fs::write(&path, b"original").unwrap();

        let mut perms = std::fs::metadata(&readonly).unwrap().permissions();
        perms.set_mode(0o555);
        std::fs::set_permissions(&readonly, perms).unwrap();

        let err = replace_file(&path, b"new").expect_err("write into readonly dir");
        assert!(matches!(err, ClientError::Io { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), b"original");

        let mut perms = std::fs::metadata(&readonly).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&readonly, perms).unwrap();
    }
}
