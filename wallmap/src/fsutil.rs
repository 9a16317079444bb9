//! Filesystem helpers shared by every writer.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Sibling path used while a file is being written.
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `bytes` to a temp file next to `path`, then renames it into place.
///
/// The parent directory is created when missing.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let temp = temp_path(path);
    fs::write(&temp, bytes)?;
    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_parent_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/out.geojson");

        write_atomic(&path, b"{}").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"{}");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_temp_path_keeps_extension() {
        let p = temp_path(Path::new("/x/map.png"));
        assert_eq!(p, Path::new("/x/map.png.tmp"));
    }
}
