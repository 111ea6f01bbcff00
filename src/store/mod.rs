//! Flat-file persistence: one pretty-printed JSON array per collection.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use crate::config::PlannerConfig;
use crate::core::notification::Notification;
use crate::core::scan::ScanHistory;
use crate::core::task::Task;
use crate::core::user::User;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// A JSON array on disk. Every read-modify-write holds the collection lock.
pub struct JsonCollection<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonCollection<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<T>, StoreError> {
        let _guard = self.guard();
        self.read_unlocked()
    }

    /// Load, mutate, and write back. The file is rewritten even if the
    /// closure changed nothing.
    pub fn update<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> Result<R, StoreError> {
        let _guard = self.guard();
        let mut items = self.read_unlocked()?;
        let out = f(&mut items);
        self.write_unlocked(&items)?;
        Ok(out)
    }

    /// Like [`update`](Self::update), but the closure decides whether anything
    /// needs writing, and may fail without touching the file.
    pub fn try_update<R, E>(
        &self,
        f: impl FnOnce(&mut Vec<T>) -> Result<(R, bool), E>,
    ) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let _guard = self.guard();
        let mut items = self.read_unlocked()?;
        let (out, dirty) = f(&mut items)?;
        if dirty {
            self.write_unlocked(&items)?;
        }
        Ok(out)
    }

    /// Load and write back, persisting anything filled in while reading,
    /// such as ids generated for records stored without one.
    pub fn settle(&self) -> Result<usize, StoreError> {
        self.update(|items| items.len())
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The mutex guards no data, so a poisoned lock is still usable.
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_unlocked(&self) -> Result<Vec<T>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str(&content) {
            Ok(items) => Ok(items),
            Err(e) => {
                let aside = sibling(&self.path, "corrupt");
                log::warn!(
                    "Unreadable {} ({}), moving it to {} and starting empty",
                    self.path.display(),
                    e,
                    aside.display()
                );
                if let Err(e) = std::fs::rename(&self.path, &aside) {
                    log::error!("Failed to move aside {}: {}", self.path.display(), e);
                }
                Ok(Vec::new())
            }
        }
    }

    fn write_unlocked(&self, items: &[T]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(items).map_err(|source| StoreError::Serialize {
            path: self.path.clone(),
            source,
        })?;
        let tmp = sibling(&self.path, "tmp");
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        std::fs::write(&tmp, json).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)
    }
}

/// `tasks.json` -> `tasks.json.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// All collections backing the planner.
pub struct Store {
    pub tasks: JsonCollection<Task>,
    pub users: JsonCollection<User>,
    pub notifications: JsonCollection<Notification>,
    pub scans: JsonCollection<ScanHistory>,
}

impl Store {
    pub fn open(config: &PlannerConfig) -> Result<Self, StoreError> {
        config.ensure_files().map_err(|source| StoreError::Write {
            path: config.data_dir.clone(),
            source,
        })?;
        let store = Self {
            tasks: JsonCollection::new(config.tasks_path()),
            users: JsonCollection::new(config.users_path()),
            notifications: JsonCollection::new(config.notifications_path()),
            scans: JsonCollection::new(config.scans_path()),
        };

        // Generated ids and timestamps must be stable across reads
        let tasks = store.tasks.settle()?;
        let users = store.users.settle()?;
        let notifications = store.notifications.settle()?;
        let scans = store.scans.settle()?;
        log::info!(
            "Loaded {} tasks, {} users, {} notifications, {} scan histories",
            tasks,
            users,
            notifications,
            scans
        );
        Ok(store)
    }
}
