use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::DbError;

/// The document source-of-truth filesystem. The engine indexes what the
/// bridge holds; the bridge never sees index keys.
pub trait Bridge {
    fn get(&self, path: &str) -> Result<String, DbError>;

    fn put(&self, path: &str, contents: &str) -> Result<(), DbError>;

    fn delete(&self, path: &str) -> Result<(), DbError>;

    /// Enumerate files under `root` with the given extension, as
    /// forward-slashed paths relative to the bridge root.
    fn glob(&self, root: &str, extension: &str) -> Result<Vec<String>, DbError>;

    /// Variant of `put` used only for generated config records. A no-op
    /// when [`supports_building`](Bridge::supports_building) is false.
    fn put_config(&self, path: &str, contents: &str) -> Result<(), DbError>;

    fn supports_building(&self) -> bool;
}

/// In-memory bridge. Sorted map so `glob` enumerates deterministically.
#[derive(Default)]
pub struct MemoryBridge {
    files: RwLock<BTreeMap<String, String>>,
}

impl MemoryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().unwrap().is_empty()
    }
}

impl Bridge for MemoryBridge {
    fn get(&self, path: &str) -> Result<String, DbError> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| DbError::Bridge(format!("no such file: {path}")))
    }

    fn put(&self, path: &str, contents: &str) -> Result<(), DbError> {
        self.files
            .write()
            .unwrap()
            .insert(path.to_string(), contents.to_string());
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), DbError> {
        self.files.write().unwrap().remove(path);
        Ok(())
    }

    fn glob(&self, root: &str, extension: &str) -> Result<Vec<String>, DbError> {
        let prefix = format!("{root}/");
        let suffix = format!(".{extension}");
        Ok(self
            .files
            .read()
            .unwrap()
            .keys()
            .filter(|path| path.starts_with(&prefix) && path.ends_with(&suffix))
            .cloned()
            .collect())
    }

    fn put_config(&self, path: &str, contents: &str) -> Result<(), DbError> {
        self.put(path, contents)
    }

    fn supports_building(&self) -> bool {
        true
    }
}

/// Bridge over a real directory tree. Paths are relative to `root`,
/// forward-slashed. Config building is disabled: generated records stay
/// in the store only.
pub struct FilesystemBridge {
    root: PathBuf,
}

impl FilesystemBridge {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl Bridge for FilesystemBridge {
    fn get(&self, path: &str) -> Result<String, DbError> {
        Ok(std::fs::read_to_string(self.resolve(path))?)
    }

    fn put(&self, path: &str, contents: &str) -> Result<(), DbError> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full, contents)?;
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), DbError> {
        std::fs::remove_file(self.resolve(path))?;
        Ok(())
    }

    fn glob(&self, root: &str, extension: &str) -> Result<Vec<String>, DbError> {
        let base = self.resolve(root);
        let mut paths = Vec::new();
        if base.is_dir() {
            walk(&base, &mut |file| {
                if file.extension().and_then(|e| e.to_str()) == Some(extension)
                    && let Ok(rel) = file.strip_prefix(&self.root)
                {
                    paths.push(rel.to_string_lossy().replace('\\', "/"));
                }
            })?;
        }
        paths.sort();
        Ok(paths)
    }

    fn put_config(&self, _path: &str, _contents: &str) -> Result<(), DbError> {
        Ok(())
    }

    fn supports_building(&self) -> bool {
        false
    }
}

fn walk(dir: &Path, visit: &mut impl FnMut(&Path)) -> Result<(), DbError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, visit)?;
        } else {
            visit(&path);
        }
    }
    Ok(())
}
