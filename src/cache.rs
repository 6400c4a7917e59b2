use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use crate::error::{FeedError, Result};
use crate::models::FeedPost;

pub const FEED_CACHE_KEY: &str = "feed_posts";
pub const SNAPSHOT_VERSION: u32 = 1;

/// Key/value persistence for raw snapshot strings.
pub trait SnapshotStore {
    fn read(&self, key: &str) -> io::Result<Option<String>>;
    fn write(&mut self, key: &str, raw: &str) -> io::Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SnapshotStore for FileStore {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write(&mut self, key: &str, raw: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(key), raw)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl SnapshotStore for MemoryStore {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, raw: &str) -> io::Result<()> {
        self.entries.insert(key.to_string(), raw.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub posts: Vec<FeedPost>,
}

impl CacheSnapshot {
    pub fn new(posts: Vec<FeedPost>) -> Self {
        CacheSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            posts,
        }
    }

    pub fn decode(raw: &str) -> Result<CacheSnapshot> {
        let snapshot: CacheSnapshot = serde_json::from_str(raw)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(FeedError::parse(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// The most recent page-1 result, kept for offline viewing.
///
/// Every save overwrites the previous snapshot; there is no expiry.
#[derive(Debug)]
pub struct FeedCache<S> {
    store: S,
}

impl<S: SnapshotStore> FeedCache<S> {
    pub fn new(store: S) -> Self {
        FeedCache { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn save(&mut self, posts: &[FeedPost]) -> Result<()> {
        let raw = CacheSnapshot::new(posts.to_vec()).encode()?;
        self.store.write(FEED_CACHE_KEY, &raw)?;
        Ok(())
    }

    pub fn snapshot(&self) -> Result<Option<CacheSnapshot>> {
        match self.store.read(FEED_CACHE_KEY)? {
            Some(raw) => CacheSnapshot::decode(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Cached posts, or nothing when the snapshot is absent or unreadable.
    pub fn load(&self) -> Vec<FeedPost> {
        match self.snapshot() {
            Ok(Some(snapshot)) => snapshot.posts,
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("Discarding cached feed: {err}");
                Vec::new()
            }
        }
    }
}
