//! Send-file loading
//!
//! Reads the files the `transfer` test case uploads from `<www_root>/<endpoint>/`.

use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

use crate::models::FileSet;

/// Default root holding one directory per endpoint
pub const DEFAULT_WWW_ROOT: &str = "/www";

/// Load every regular file directly under `<www_root>/<endpoint>`.
///
/// A missing directory yields an empty set. Subdirectories and dangling
/// links are skipped, other symlinks are followed.
pub fn load_files(www_root: &Path, endpoint: &str) -> io::Result<FileSet> {
    let dir = www_root.join(endpoint);
    let mut files = FileSet::new();

    if !dir.is_dir() {
        debug!("No send directory at {}", dir.display());
        return Ok(files);
    }

    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!("Skipping non UTF-8 filename in {}", dir.display());
            continue;
        };

        let content = fs::read(&path)?;
        debug!("Loaded {} ({} bytes)", name, content.len());
        files.insert(name, content);
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_directory_is_empty() {
        let root = tempdir().unwrap();
        let files = load_files(root.path(), "nope").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_loads_regular_files_only() {
        let root = tempdir().unwrap();
        let dir = root.path().join("files");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("x.txt"), b"hello").unwrap();
        fs::write(dir.join("y.bin"), [0u8, 1, 254, 255]).unwrap();
        fs::write(dir.join("nested").join("z.txt"), b"deep").unwrap();

        let files = load_files(root.path(), "files").unwrap();

        let names: Vec<_> = files.filenames().collect();
        assert_eq!(names, vec!["x.txt", "y.bin"]);
        assert_eq!(files.get("x.txt"), Some(&b"hello"[..]));
        assert_eq!(files.get("y.bin"), Some(&[0u8, 1, 254, 255][..]));
    }

    #[test]
    fn test_empty_directory() {
        let root = tempdir().unwrap();
        fs::create_dir(root.path().join("files")).unwrap();
        assert!(load_files(root.path(), "files").unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks() {
        let root = tempdir().unwrap();
        let dir = root.path().join("files");
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(root.path().join("target.bin"), [7u8; 3]).unwrap();
        std::os::unix::fs::symlink(root.path().join("target.bin"), dir.join("link.bin")).unwrap();
        std::os::unix::fs::symlink(dir.join("sub"), dir.join("dirlink")).unwrap();

        let files = load_files(root.path(), "files").unwrap();
        assert_eq!(files.filenames().collect::<Vec<_>>(), vec!["link.bin"]);
        assert_eq!(files.get("link.bin"), Some(&[7u8, 7, 7][..]));
    }
}
