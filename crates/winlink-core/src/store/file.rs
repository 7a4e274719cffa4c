//! Directory-backed shared store.
//!
//! Each key is one JSON file under the store directory, visible to every
//! process that opens the same directory. Writes go to a temp file that is
//! renamed into place while holding an exclusive `flock`, so readers never
//! observe a torn value and concurrent writers never share a temp file.
//! The lock covers a single write only: a read-modify-write across `get`
//! and `set` is not isolated, and the last writer wins.
//!
//! Change notification uses filesystem watching. Every handle remembers the
//! last value it wrote or observed for each key and drops events that carry
//! that value, so a writer is never notified of its own change.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nix::fcntl::{Flock, FlockArg};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use super::errors::StoreError;
use super::types::{StoreChange, Subscription};
use super::{KeyValueStore, SharedStore};

const VALUE_EXTENSION: &str = "json";
const LOCK_FILE: &str = ".lock";
const MAX_KEY_LEN: usize = 128;

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Validate a store key before it is turned into a file name.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let reason = if key.is_empty() {
        Some("key cannot be empty")
    } else if key.len() > MAX_KEY_LEN {
        Some("key is longer than 128 characters")
    } else if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Some("only alphanumeric characters, '-' and '_' are allowed")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidKey {
            key: key.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn key_from_path(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let key = file_name.strip_suffix(".json")?;
    validate_key(key).ok()?;
    Some(key.to_string())
}

fn read_value(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

fn cleanup_temp_file(temp_file: &Path, original_error: &std::io::Error) {
    if let Err(cleanup_err) = fs::remove_file(temp_file) {
        warn!(
            event = "core.store.temp_file_cleanup_failed",
            temp_file = %temp_file.display(),
            original_error = %original_error,
            cleanup_error = %cleanup_err,
        );
    }
}

/// State shared between a store handle and its watcher callback.
#[derive(Debug)]
struct WatchState {
    root: PathBuf,
    seen: Mutex<HashMap<String, Option<String>>>,
    subscribers: Mutex<Vec<Sender<StoreChange>>>,
}

impl WatchState {
    fn record(&self, key: &str, value: Option<String>) {
        lock_ignoring_poison(&self.seen).insert(key.to_string(), value);
    }

    fn forget(&self, key: &str) {
        lock_ignoring_poison(&self.seen).remove(key);
    }

    fn handle_event(&self, event: &Event) {
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return;
        }

        for path in &event.paths {
            if let Some(key) = key_from_path(path) {
                self.observe(&key);
            }
        }
    }

    /// Re-read `key` and publish it if it differs from what this handle
    /// last wrote or observed.
    fn observe(&self, key: &str) {
        let path = self.root.join(format!("{}.{}", key, VALUE_EXTENSION));
        let value = match read_value(&path) {
            Ok(value) => value,
            Err(e) => {
                warn!(event = "core.store.observe_failed", key = key, error = %e);
                return;
            }
        };

        let previous = {
            let mut seen = lock_ignoring_poison(&self.seen);
            let previous = seen.insert(key.to_string(), value.clone());
            if previous.as_ref() == Some(&value) {
                return;
            }
            previous
        };

        let old_value = previous.flatten();
        if old_value.is_none() && value.is_none() {
            return;
        }

        debug!(event = "core.store.change_observed", key = key);
        let change = StoreChange {
            key: Some(key.to_string()),
            old_value,
            new_value: value,
        };
        lock_ignoring_poison(&self.subscribers).retain(|tx| tx.send(change.clone()).is_ok());
    }
}

pub struct FileStore {
    state: Arc<WatchState>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl FileStore {
    /// Open (creating if needed) the store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            StoreError::unavailable(format!(
                "failed to create store directory {}: {}",
                root.display(),
                e
            ))
        })?;

        debug!(event = "core.store.opened", root = %root.display());

        Ok(Self {
            state: Arc::new(WatchState {
                root,
                seen: Mutex::new(HashMap::new()),
                subscribers: Mutex::new(Vec::new()),
            }),
            watcher: Mutex::new(None),
        })
    }

    pub fn root(&self) -> &Path {
        &self.state.root
    }

    fn value_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root().join(format!("{}.{}", key, VALUE_EXTENSION)))
    }

    /// Acquire the exclusive write lock for this store directory.
    ///
    /// Released when the returned handle is dropped.
    fn acquire_lock(&self) -> Result<Flock<fs::File>, StoreError> {
        let lock = self.root().join(LOCK_FILE);
        let lock_file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock)
            .map_err(|e| StoreError::LockFailed {
                message: format!("failed to open lock file {}: {}", lock.display(), e),
            })?;

        Flock::lock(lock_file, FlockArg::LockExclusive).map_err(|(_, e)| StoreError::LockFailed {
            message: format!("failed to acquire lock: {}", e),
        })
    }

    fn start_watcher(&self) -> Result<RecommendedWatcher, StoreError> {
        let state = Arc::clone(&self.state);
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => state.handle_event(&event),
                Err(e) => warn!(event = "core.store.watch_error", error = %e),
            }
        })
        .map_err(|e| StoreError::WatchFailed {
            message: format!("failed to create watcher: {}", e),
        })?;

        watcher
            .watch(self.root(), RecursiveMode::NonRecursive)
            .map_err(|e| StoreError::WatchFailed {
                message: format!("failed to watch {}: {}", self.root().display(), e),
            })?;

        debug!(event = "core.store.watch_started", root = %self.root().display());
        Ok(watcher)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        read_value(&self.value_path(key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let value_file = self.value_path(key)?;
        let temp_file = value_file.with_extension("json.tmp");
        let _lock = self.acquire_lock()?;

        let write_result = fs::File::create(&temp_file).and_then(|mut file| {
            file.write_all(value.as_bytes())?;
            file.flush()
        });
        if let Err(e) = write_result {
            cleanup_temp_file(&temp_file, &e);
            return Err(StoreError::io(&temp_file, e));
        }

        // Record before the rename so the watcher sees this as our own write
        self.state.record(key, Some(value.to_string()));

        if let Err(e) = fs::rename(&temp_file, &value_file) {
            self.state.forget(key);
            cleanup_temp_file(&temp_file, &e);
            return Err(StoreError::io(&value_file, e));
        }

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let value_file = self.value_path(key)?;
        let _lock = self.acquire_lock()?;

        self.state.record(key, None);
        match fs::remove_file(&value_file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                self.state.forget(key);
                Err(StoreError::io(&value_file, e))
            }
        }
    }
}

impl SharedStore for FileStore {
    fn subscribe(&self) -> Result<Subscription, StoreError> {
        let mut watcher = lock_ignoring_poison(&self.watcher);
        if watcher.is_none() {
            *watcher = Some(self.start_watcher()?);
        }

        let (sender, subscription) = Subscription::channel();
        lock_ignoring_poison(&self.state.subscribers).push(sender);
        Ok(subscription)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _lock = self.acquire_lock()?;
        let entries =
            fs::read_dir(self.root()).map_err(|e| StoreError::io(self.root(), e))?;

        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(self.root(), e))?.path();
            let Some(key) = key_from_path(&path) else {
                continue;
            };
            self.state.record(&key, None);
            if let Err(e) = fs::remove_file(&path)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                return Err(StoreError::io(&path, e));
            }
        }

        Ok(())
    }
}
