//! Write staging for transactions.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::{KvBackend, Tx, WriteOp};

/// A transaction in progress: reads fall through to the backend, writes are
/// buffered until commit. `None` marks a staged delete.
pub(crate) struct StagedTx<'a> {
    backend: &'a dyn KvBackend,
    writes: BTreeMap<(&'static str, Vec<u8>), Option<Vec<u8>>>,
}

impl<'a> StagedTx<'a> {
    pub(crate) fn new(backend: &'a dyn KvBackend) -> Self {
        Self {
            backend,
            writes: BTreeMap::new(),
        }
    }

    /// Consume the staged writes as a batch, in key order.
    pub(crate) fn into_batch(self) -> Vec<WriteOp> {
        self.writes
            .into_iter()
            .map(|((cf, key), value)| match value {
                Some(value) => WriteOp::Put { cf, key, value },
                None => WriteOp::Delete { cf, key },
            })
            .collect()
    }
}

impl Tx for StagedTx<'_> {
    fn get(&self, cf: &'static str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(staged) = self.writes.get(&(cf, key.to_vec())) {
            return Ok(staged.clone());
        }
        self.backend.get(cf, key)
    }

    fn scan_prefix(&self, cf: &'static str, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.backend.scan_prefix(cf, prefix)?.into_iter().collect();

        for ((staged_cf, key), value) in self.writes.range((cf, prefix.to_vec())..) {
            if *staged_cf != cf || !key.starts_with(prefix) {
                break;
            }
            if let Some(value) = value {
                merged.insert(key.clone(), value.clone());
            } else {
                merged.remove(key);
            }
        }

        Ok(merged.into_iter().collect())
    }

    fn put(&mut self, cf: &'static str, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.writes.insert((cf, key), Some(value));
        Ok(())
    }

    fn delete(&mut self, cf: &'static str, key: Vec<u8>) -> Result<()> {
        self.writes.insert((cf, key), None);
        Ok(())
    }
}
