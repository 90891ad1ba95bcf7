use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{error, info};

use crate::{Database, Result, StoreError};

/// Path that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub readers: usize,
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from(IN_MEMORY),
            readers: 0,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == IN_MEMORY
    }
}

/// Owns the database handle and opens it on first use.
///
/// Opening happens under the slot lock, so concurrent first requests open
/// the database exactly once. A failed open leaves the slot empty and the
/// next `acquire` tries again.
pub struct Store {
    config: StoreConfig,
    slot: Mutex<Option<Arc<Database>>>,
}

impl Store {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(None),
        }
    }

    /// Wrap an already opened database.
    pub fn from_database(db: Database) -> Self {
        Self {
            config: StoreConfig::in_memory(),
            slot: Mutex::new(Some(Arc::new(db))),
        }
    }

    pub fn acquire(&self) -> Result<Arc<Database>> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("store lock poisoned: {}", e)))?;

        if let Some(db) = slot.as_ref() {
            return Ok(db.clone());
        }

        let opened = if self.config.is_in_memory() {
            Database::open_in_memory()
        } else {
            Database::open(&self.config.path, self.config.readers)
        };

        match opened {
            Ok(db) => {
                let db = Arc::new(db);
                *slot = Some(db.clone());
                info!("Store connected ({})", self.config.path.display());
                Ok(db)
            }
            Err(e) => {
                error!("Failed to open store at {}: {}", self.config.path.display(), e);
                Err(match e {
                    StoreError::Unavailable(_) => e,
                    other => StoreError::Unavailable(other.to_string()),
                })
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}
