//! Abstraction over file system operations for testability.

mod mock;
mod real;

pub use mock::MockFileSystem;
pub use real::RealFileSystem;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Type of file system entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

/// A directory entry returned by read_dir
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub path: PathBuf,
    pub name: String,
    pub file_type: FileType,
}

impl DirEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.name
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }
}

/// File system operations the synchronizer needs: text I/O, timestamps,
/// artifact copying, and enumeration by extension.
pub trait FileSystem: Send + Sync {
    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Check if path is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Read file contents as string
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Write string contents, overwriting the file in full
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Last-modified time, `None` when the path does not exist
    fn modified(&self, path: &Path) -> Option<SystemTime>;

    /// Copy a file, overwriting the destination
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// Create a directory and all missing parents
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// List directory contents
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Files under `root` with the given extension (no leading dot), sorted
    /// by path. A missing `root` yields an empty list.
    fn find_files(&self, root: &Path, extension: &str, recursive: bool) -> Result<Vec<PathBuf>> {
        if !self.is_dir(root) {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in self.read_dir(&dir)? {
                match entry.file_type {
                    FileType::File => {
                        let matches = entry
                            .path
                            .extension()
                            .and_then(|e| e.to_str())
                            .map(|e| e == extension)
                            .unwrap_or(false);
                        if matches {
                            found.push(entry.path);
                        }
                    }
                    FileType::Directory if recursive => pending.push(entry.path),
                    _ => {}
                }
            }
        }

        found.sort();
        Ok(found)
    }
}
