use super::{DirEntry, FileSystem, FileType};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
struct MockEntry {
    content: Option<String>,
    file_type: FileType,
    modified: SystemTime,
}

/// In-memory file system with settable per-file modification times, for
/// staleness and synchronization tests.
pub struct MockFileSystem {
    files: RwLock<HashMap<PathBuf, MockEntry>>,
    root: PathBuf,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            root: PathBuf::from("/mock"),
        }
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            root,
        }
    }

    /// Seconds-since-epoch timestamps keep test tables readable.
    pub fn time(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) {
        self.add_file_at(path, content, SystemTime::now());
    }

    pub fn add_file_at(&self, path: impl AsRef<Path>, content: &str, modified: SystemTime) {
        let path = self.normalize_path(path.as_ref());
        let mut files = self.files.write().unwrap();

        if let Some(parent) = path.parent() {
            Self::ensure_parents(&mut files, parent);
        }

        files.insert(
            path,
            MockEntry {
                content: Some(content.to_string()),
                file_type: FileType::File,
                modified,
            },
        );
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = self.normalize_path(path.as_ref());
        let mut files = self.files.write().unwrap();

        Self::ensure_parents(&mut files, &path);

        files.insert(
            path,
            MockEntry {
                content: None,
                file_type: FileType::Directory,
                modified: SystemTime::now(),
            },
        );
    }

    pub fn set_modified(&self, path: impl AsRef<Path>, modified: SystemTime) {
        let path = self.normalize_path(path.as_ref());
        if let Some(entry) = self.files.write().unwrap().get_mut(&path) {
            entry.modified = modified;
        }
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = self.normalize_path(path.as_ref());
        self.files.write().unwrap().remove(&path);
    }

    fn normalize_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn ensure_parents(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            if !files.contains_key(&current) {
                files.insert(
                    current.clone(),
                    MockEntry {
                        content: None,
                        file_type: FileType::Directory,
                        modified: SystemTime::now(),
                    },
                );
            }
        }
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.files.read().unwrap().contains_key(&path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.files
            .read()
            .unwrap()
            .get(&path)
            .map(|e| e.file_type == FileType::Directory)
            .unwrap_or(false)
    }

    fn is_file(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.files
            .read()
            .unwrap()
            .get(&path)
            .map(|e| e.file_type == FileType::File)
            .unwrap_or(false)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let path = self.normalize_path(path);
        let files = self.files.read().unwrap();
        let entry = files
            .get(&path)
            .ok_or_else(|| anyhow!("File not found: {:?}", path))?;

        entry
            .content
            .clone()
            .ok_or_else(|| anyhow!("Not a file: {:?}", path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.add_file_at(path, contents, SystemTime::now());
        Ok(())
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        let path = self.normalize_path(path);
        self.files.read().unwrap().get(&path).map(|e| e.modified)
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let content = self.read_to_string(from)?;
        self.add_file_at(to, &content, SystemTime::now());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.add_dir(path);
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let path = self.normalize_path(path);
        let files = self.files.read().unwrap();

        if !files.contains_key(&path) {
            return Err(anyhow!("Directory not found: {:?}", path));
        }

        let mut entries = Vec::new();
        for (file_path, entry) in files.iter() {
            if let Some(parent) = file_path.parent() {
                if parent == path && file_path != &path {
                    let name = file_path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("")
                        .to_string();

                    entries.push(DirEntry {
                        path: file_path.clone(),
                        name,
                        file_type: entry.file_type,
                    });
                }
            }
        }

        Ok(entries)
    }
}
