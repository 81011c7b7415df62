// On-disk cache of server responses, one JSON file per key

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct Entry<T> {
    fetched_at: DateTime<Utc>,
    value: T,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> io::Result<Option<T>> {
        Ok(self.read_entry(key)?.map(|entry| entry.value))
    }

    /// Like `get`, but entries older than `max_age` count as missing
    pub fn get_fresh<T: DeserializeOwned>(&self, key: &str, max_age: Duration) -> io::Result<Option<T>> {
        Ok(self
            .read_entry(key)?
            .filter(|entry| Utc::now() - entry.fetched_at <= max_age)
            .map(|entry| entry.value))
    }

    fn read_entry<T: DeserializeOwned>(&self, key: &str) -> io::Result<Option<Entry<T>>> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        match serde_json::from_str(&content) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                // Unreadable entries are a miss; the next put replaces them
                debug!(key, error = %e, "Discarding unreadable cache entry");
                Ok(None)
            }
        }
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let entry = Entry {
            fetched_at: Utc::now(),
            value,
        };
        let json = serde_json::to_string(&entry)?;
        fs::write(self.entry_path(key), json)
    }

    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
