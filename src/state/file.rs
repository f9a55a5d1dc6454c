//! File-backed state storage — one pretty-printed JSON document per key.
//!
//! Keys contain `/` and arbitrary channel ids, so each key is escaped into a
//! single flat file name: `[A-Za-z0-9._-]` pass through, everything else
//! becomes `%XX` per UTF-8 byte.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::trace;

use crate::error::AppError;

const EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create the storage directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| AppError::State(format!("cannot create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{EXTENSION}", escape_key(key)))
    }

    pub async fn read(&self, key: &str) -> Result<Option<Value>, AppError> {
        let path = self.path_for(key);
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::State(format!("cannot read {}: {e}", path.display())));
            }
        };
        trace!(path = %path.display(), "state read");
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|e| AppError::State(format!("malformed {}: {e}", path.display())))
    }

    pub async fn write(&self, key: &str, value: &Value) -> Result<(), AppError> {
        let path = self.path_for(key);
        let data = serde_json::to_string_pretty(value)
            .map_err(|e| AppError::State(format!("serialise state: {e}")))?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::State(format!("cannot write {}: {e}", path.display())))
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::State(format!("cannot delete {}: {e}", path.display()))),
        }
    }
}

fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_flattens_separators() {
        assert_eq!(escape_key("pty/users/u-1"), "pty%2Fusers%2Fu-1");
        assert_eq!(escape_key("a b"), "a%20b");
        assert_ne!(escape_key("a/b"), escape_key("a_b"));
    }

    #[tokio::test]
    async fn write_read_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStorage::open(tmp.path().join("state")).unwrap();

        assert!(store.read("pty/users/u").await.unwrap().is_none());

        let value = serde_json::json!({ "userInfo": { "name": "Ada" } });
        store.write("pty/users/u", &value).await.unwrap();
        assert_eq!(store.read("pty/users/u").await.unwrap(), Some(value));

        store.delete("pty/users/u").await.unwrap();
        assert!(store.read("pty/users/u").await.unwrap().is_none());
        // Deleting twice is fine.
        store.delete("pty/users/u").await.unwrap();
    }

    #[tokio::test]
    async fn malformed_file_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStorage::open(tmp.path()).unwrap();
        std::fs::write(store.path_for("k"), "{ not json").unwrap();
        assert!(store.read("k").await.is_err());
    }
}
