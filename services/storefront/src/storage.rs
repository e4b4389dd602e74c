//! Local device storage: a string key/value store, optionally persisted to a
//! JSON file, shared by any number of handles ("tabs").
//!
//! A write made through one handle is announced to watchers on every *other*
//! handle of the same backing store, mirroring the browser's cross-tab
//! storage-change notification. Same-handle observers are expected to be
//! notified by whoever performed the write.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::warn;

use crate::error::Result;
use crate::events::{lock, Subscribers, Subscription};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const CART_KEY: &str = "cart";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
    origin: u64,
}

struct Backing {
    values: Mutex<BTreeMap<String, String>>,
    changes: Subscribers<StorageEvent>,
    path: Option<PathBuf>,
    next_handle: AtomicU64,
}

#[derive(Clone)]
pub struct LocalStorage {
    backing: Arc<Backing>,
    handle: u64,
}

impl LocalStorage {
    pub fn in_memory() -> Self {
        Self::with_values(BTreeMap::new(), None)
    }

    /// Opens the file-backed store at `path`. A missing file starts an
    /// empty store and is created on first write. A file that exists but
    /// cannot be read is left untouched and the store runs in memory only.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        match fs::read_to_string(&path) {
            Ok(raw) => {
                let values = serde_json::from_str(&raw).unwrap_or_else(|e| {
                    warn!("storage file {} is corrupt, starting empty: {}", path.display(), e);
                    BTreeMap::new()
                });
                Self::with_values(values, Some(path))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::with_values(BTreeMap::new(), Some(path)),
            Err(e) => {
                warn!(
                    "storage file {} is unreadable, keeping data in memory only: {}",
                    path.display(),
                    e
                );
                Self::with_values(BTreeMap::new(), None)
            }
        }
    }

    fn with_values(values: BTreeMap<String, String>, path: Option<PathBuf>) -> Self {
        LocalStorage {
            backing: Arc::new(Backing {
                values: Mutex::new(values),
                changes: Subscribers::new(),
                path,
                next_handle: AtomicU64::new(1),
            }),
            handle: 0,
        }
    }

    /// Another handle on the same backing store.
    pub fn tab(&self) -> Self {
        LocalStorage {
            backing: Arc::clone(&self.backing),
            handle: self.backing.next_handle.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        lock(&self.backing.values).get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write(key, Some(value.to_string()))
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.write(key, None)
    }

    /// Calls `callback` for writes made through other handles.
    pub fn watch<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static,
    {
        let me = self.handle;
        self.backing.changes.subscribe(move |event| {
            if event.origin != me {
                callback(event);
            }
        })
    }

    fn write(&self, key: &str, value: Option<String>) -> Result<()> {
        {
            let mut values = lock(&self.backing.values);
            let mut next = values.clone();
            match &value {
                Some(v) => {
                    next.insert(key.to_string(), v.clone());
                }
                None => {
                    next.remove(key);
                }
            }
            // The map only changes once the file has been written.
            if let Some(path) = &self.backing.path {
                persist(path, &next)?;
            }
            *values = next;
        }

        self.backing.changes.publish(&StorageEvent {
            key: key.to_string(),
            new_value: value,
            origin: self.handle,
        });
        Ok(())
    }
}

fn persist(path: &Path, values: &BTreeMap<String, String>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl std::fmt::Debug for LocalStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStorage")
            .field("path", &self.backing.path)
            .field("handle", &self.handle)
            .finish()
    }
}
