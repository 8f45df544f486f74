//!
//! account storage module
//! -----------------------
//! Narrow persistence contract for identity records plus two implementations:
//! an in-memory store and a JSON document store rooted at a data folder
//! (`<root>/users.json`).
//!
//! Handle uniqueness is a storage-level constraint: `insert` checks and writes
//! under one lock and reports `StoreError::Duplicate` to the losing writer. Callers
//! may pre-check with `exists_by_handle`, but only the insert result is authoritative.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::identity::{handle_key, Identity};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("handle already registered: {handle}")]
    Duplicate { handle: String },
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage document corrupt: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Load/save/exists contract consumed by the identity registry.
pub trait CredentialStore: Send + Sync {
    fn find_by_handle(&self, handle: &str) -> StoreResult<Option<Identity>>;
    fn find_by_id(&self, id: &str) -> StoreResult<Option<Identity>>;
    fn exists_by_handle(&self, handle: &str) -> StoreResult<bool>;
    /// Persist a new identity. Fails with `Duplicate` if the handle is taken.
    fn insert(&self, identity: Identity) -> StoreResult<()>;
}

pub type SharedCredentialStore = Arc<dyn CredentialStore>;

/// Identity table with a unique index on the normalized handle.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Table {
    by_id: HashMap<String, Identity>,
    #[serde(skip)]
    handle_index: HashMap<String, String>,
}

impl Table {
    fn reindex(&mut self) -> StoreResult<()> {
        self.handle_index.clear();
        for (id, ident) in self.by_id.iter() {
            if self.handle_index.insert(handle_key(&ident.handle), id.clone()).is_some() {
                return Err(StoreError::Corrupt(format!("duplicate handle in document: {}", ident.handle)));
            }
        }
        Ok(())
    }

    fn get_by_handle(&self, handle: &str) -> Option<&Identity> {
        self.handle_index.get(&handle_key(handle)).and_then(|id| self.by_id.get(id))
    }

    fn try_insert(&mut self, identity: Identity) -> StoreResult<()> {
        let key = handle_key(&identity.handle);
        if self.handle_index.contains_key(&key) || self.by_id.contains_key(&identity.id) {
            return Err(StoreError::Duplicate { handle: identity.handle });
        }
        self.handle_index.insert(key, identity.id.clone());
        self.by_id.insert(identity.id.clone(), identity);
        Ok(())
    }

    fn remove(&mut self, id: &str) {
        if let Some(ident) = self.by_id.remove(id) {
            self.handle_index.remove(&handle_key(&ident.handle));
        }
    }
}

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    table: RwLock<Table>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.table.read().by_id.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl CredentialStore for MemoryStore {
    fn find_by_handle(&self, handle: &str) -> StoreResult<Option<Identity>> {
        Ok(self.table.read().get_by_handle(handle).cloned())
    }

    fn find_by_id(&self, id: &str) -> StoreResult<Option<Identity>> {
        Ok(self.table.read().by_id.get(id).cloned())
    }

    fn exists_by_handle(&self, handle: &str) -> StoreResult<bool> {
        Ok(self.table.read().get_by_handle(handle).is_some())
    }

    fn insert(&self, identity: Identity) -> StoreResult<()> {
        self.table.write().try_insert(identity)
    }
}

/// JSON document store: the whole table lives in `<root>/users.json` and is
/// rewritten atomically (temp file + rename) on every insert.
pub struct FileStore {
    path: PathBuf,
    table: RwLock<Table>,
}

impl FileStore {
    pub const FILE_NAME: &'static str = "users.json";

    /// Open (or create) the store under `root`. A missing document is an empty store.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        let path = root.join(Self::FILE_NAME);
        let mut table = if path.exists() {
            let bytes = fs::read(&path)?;
            if bytes.iter().all(|b| b.is_ascii_whitespace()) {
                Table::default()
            } else {
                serde_json::from_slice::<Table>(&bytes).map_err(|e| StoreError::Corrupt(e.to_string()))?
            }
        } else {
            Table::default()
        };
        table.reindex()?;
        debug!(target: "account::storage", path = %path.display(), identities = table.by_id.len(), "file store opened");
        Ok(Self { path, table: RwLock::new(table) })
    }

    pub fn path(&self) -> &Path { &self.path }

    fn persist(&self, table: &Table) -> StoreResult<()> {
        let body = serde_json::to_vec_pretty(table).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(&body)?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn find_by_handle(&self, handle: &str) -> StoreResult<Option<Identity>> {
        Ok(self.table.read().get_by_handle(handle).cloned())
    }

    fn find_by_id(&self, id: &str) -> StoreResult<Option<Identity>> {
        Ok(self.table.read().by_id.get(id).cloned())
    }

    fn exists_by_handle(&self, handle: &str) -> StoreResult<bool> {
        Ok(self.table.read().get_by_handle(handle).is_some())
    }

    fn insert(&self, identity: Identity) -> StoreResult<()> {
        let mut guard = self.table.write();
        let id = identity.id.clone();
        guard.try_insert(identity)?;
        if let Err(e) = self.persist(&guard) {
            // keep memory consistent with disk
            guard.remove(&id);
            return Err(e);
        }
        Ok(())
    }
}
