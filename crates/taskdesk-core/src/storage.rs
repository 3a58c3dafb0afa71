use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const USERS_KEY: &str = "users";
pub const SESSION_KEY: &str = "user";
pub const TASKS_KEY: &str = "tasks";
pub const COMMENTS_KEY: &str = "comments";
pub const SUBTASKS_KEY: &str = "subtasks";
pub const SETTINGS_KEY: &str = "settings";

/// Key/value store of JSON documents, one `<key>.json` file per key.
///
/// Every write replaces the whole document; there is no patching and no
/// conflict detection.
#[derive(Debug)]
pub struct LocalStorage {
    pub data_dir: PathBuf,
}

impl LocalStorage {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened local storage");
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }

    #[tracing::instrument(skip(self))]
    pub fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(raw))
    }

    #[tracing::instrument(skip(self, value))]
    pub fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        debug!(file = %path.display(), bytes = value.len(), "writing item atomically");

        let mut temp = NamedTempFile::new_in(&self.data_dir)?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn remove_item(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed removing {}", path.display()))?;
            debug!(file = %path.display(), "removed item");
        }
        Ok(())
    }

    /// Reads and decodes `key`, returning `None` when the key was never written.
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let Some(raw) = self.get_item(key)? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.path_for(key).display()))?;
        Ok(Some(value))
    }

    pub fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let serialized = serde_json::to_string_pretty(value)?;
        self.set_item(key, &serialized)
            .with_context(|| format!("failed to save {key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_and_blank_items_read_as_none() {
        let temp = tempdir().expect("tempdir");
        let storage = LocalStorage::open(temp.path()).expect("open storage");

        assert!(storage.get_item("users").expect("get").is_none());

        fs::write(storage.path_for("users"), "  \n").expect("write blank");
        assert!(storage.get_item("users").expect("get").is_none());
    }

    #[test]
    fn set_overwrites_and_remove_deletes() {
        let temp = tempdir().expect("tempdir");
        let storage = LocalStorage::open(temp.path()).expect("open storage");

        storage.set_item("user", "{\"a\":1}").expect("first write");
        storage.set_item("user", "{\"a\":2}").expect("second write");
        assert_eq!(
            storage.get_item("user").expect("get").as_deref(),
            Some("{\"a\":2}")
        );

        storage.remove_item("user").expect("remove");
        assert!(!storage.path_for("user").exists());
        storage.remove_item("user").expect("removing twice is fine");
    }

    #[test]
    fn corrupt_json_is_reported_with_the_file_name() {
        let temp = tempdir().expect("tempdir");
        let storage = LocalStorage::open(temp.path()).expect("open storage");
        storage.set_item("tasks", "[not json").expect("write");

        let err = storage
            .load_json::<Vec<String>>("tasks")
            .expect_err("should fail");
        assert!(format!("{err:#}").contains("tasks.json"));
    }
}
