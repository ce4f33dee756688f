//! In-memory storage backend.
//!
//! Used by tests and by `STORAGE_BACKEND=memory` deployments. Nothing is
//! persisted across restarts.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::{KvBackend, WriteOp};

type Table = BTreeMap<Vec<u8>, Vec<u8>>;

/// Column families held in ordered maps behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<String, Table>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Database("memory store lock poisoned".into())
}

impl KvBackend for MemoryStore {
    fn get(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.get(cf).and_then(|table| table.get(key)).cloned())
    }

    fn scan_prefix(&self, cf: &str, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let tables = self.tables.read().map_err(poisoned)?;
        let Some(table) = tables.get(cf) else {
            return Ok(Vec::new());
        };

        Ok(table
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn write_batch(&self, batch: Vec<WriteOp>) -> Result<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        for op in batch {
            match op {
                WriteOp::Put { cf, key, value } => {
                    tables.entry(cf.to_string()).or_default().insert(key, value);
                }
                WriteOp::Delete { cf, key } => {
                    if let Some(table) = tables.get_mut(cf) {
                        table.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }
}
