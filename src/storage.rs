//! Durable key-value storage for client state.
//!
//! The only entry written today is the admin bearer token. The file holds a
//! flat JSON object of string keys to string values.

use anyhow::{Context as _, Result};
use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Key under which the admin bearer token is persisted
pub const TOKEN_KEY: &str = "admin_token";

/// Trait for durable storage backends to allow swapping the file store out in tests
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// JSON-object file store. Every write replaces the whole file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Default location: ~/.bookdesk/storage.json, falling back to the working directory
    pub fn default_path() -> PathBuf {
        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join(".bookdesk").join("storage.json")
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        let entries = serde_json::from_slice(&content)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(entries)
    }

    /// Entries to build the next write on, and whether an unparsable file was
    /// discarded to get them
    fn read_for_update(&self) -> Result<(BTreeMap<String, String>, bool)> {
        match self.read_all() {
            Ok(entries) => Ok((entries, false)),
            Err(e) if e.is::<serde_json::Error>() => {
                eprintln!(
                    "Warning: replacing unreadable storage file {}: {:#}",
                    self.path.display(),
                    e
                );
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Write to a sibling temp file, then rename over the real one.
    /// On unix the file is readable by its owner only.
    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.tmp_path();

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&tmp_path)
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        #[cfg(unix)]
        {
            // mode() only applies when the file is created
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("writing {}", tmp_path.display()))?;
        }
        file.write_all(content.as_bytes())
            .and_then(|_| file.sync_all())
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        drop(file);

        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (mut entries, _) = self.read_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let (mut entries, discarded) = self.read_for_update()?;
        if entries.remove(key).is_some() || discarded {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// In-process store, used by tests
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

#[cfg(test)]
impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_storage_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(&dir.path().join("storage.json"));
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_storage_set_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("storage.json");
        let mut storage = FileStorage::new(&path);

        storage.set(TOKEN_KEY, "abc").unwrap();

        assert!(path.exists());
        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get(TOKEN_KEY).unwrap(), Some("abc".to_string()));
    }

    #[test]
    fn test_file_storage_remove_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        let mut storage = FileStorage::new(&path);
        storage.set(TOKEN_KEY, "abc").unwrap();
        storage.set("theme", "dark").unwrap();

        storage.remove(TOKEN_KEY).unwrap();

        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get("theme").unwrap(), Some("dark".to_string()));
    }

    #[test]
    fn test_file_storage_remove_last_key_leaves_empty_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        let mut storage = FileStorage::new(&path);
        storage.set(TOKEN_KEY, "abc").unwrap();

        storage.remove(TOKEN_KEY).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), "{}");
    }

    #[test]
    fn test_file_storage_get_reports_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(storage.get(TOKEN_KEY).is_err());
    }

    #[test]
    fn test_file_storage_set_replaces_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, r#"{"admin_tok"#).unwrap();
        let mut storage = FileStorage::new(&path);

        storage.set(TOKEN_KEY, "abc").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get(TOKEN_KEY).unwrap(), Some("abc".to_string()));
        assert!(!storage.tmp_path().exists());
    }

    #[test]
    fn test_file_storage_remove_clears_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, [0xff, 0xfe, b'{']).unwrap();
        let mut storage = FileStorage::new(&path);

        storage.remove(TOKEN_KEY).unwrap();

        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "{}");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        let mut storage = FileStorage::new(&path);

        storage.set(TOKEN_KEY, "abc").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
