//! Transactional storage layer for rendezvous.
//!
//! Every service operation runs inside one [`Database::transaction`]. The
//! closure receives a [`Tx`] context: reads see the transaction's own earlier
//! writes, and all writes are committed as one atomic batch when the closure
//! succeeds or dropped when it fails. Transactions are serialized by a
//! database-wide write lock.
//!
//! # Architecture
//!
//! - [`KvBackend`]: raw column-family key/value storage ([`MemoryStore`],
//!   `RocksStore`)
//! - [`Tx`]: the transactional context handed to domain code
//! - [`Records`]: typed accessors for every record kind, layered over any `Tx`
//!
//! # Example
//!
//! ```
//! use rendezvous_core::{CreditAccount, UserId};
//! use rendezvous_store::{Database, Records, StoreError};
//!
//! let db = Database::in_memory();
//! let user_id = UserId::generate();
//!
//! db.transaction(|tx| -> Result<(), StoreError> {
//!     tx.put_account(&CreditAccount::new(user_id))
//! })
//! .unwrap();
//!
//! let account = db
//!     .transaction(|tx| -> Result<_, StoreError> { tx.account(&user_id) })
//!     .unwrap();
//! assert!(account.is_some());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
pub mod records;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;
mod staged;

use std::sync::{Arc, Mutex, PoisonError};

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use records::Records;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use staged::StagedTx;

/// A single write in an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert or overwrite a value.
    Put {
        /// Column family.
        cf: &'static str,
        /// Key.
        key: Vec<u8>,
        /// Encoded value.
        value: Vec<u8>,
    },
    /// Remove a key.
    Delete {
        /// Column family.
        cf: &'static str,
        /// Key.
        key: Vec<u8>,
    },
}

/// Raw key/value storage organised in column families.
///
/// Implementations must apply a batch all-or-nothing.
pub trait KvBackend: Send + Sync {
    /// Read one value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Read every entry whose key starts with `prefix`, in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn scan_prefix(&self, cf: &str, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Apply all writes atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be written; nothing is applied then.
    fn write_batch(&self, batch: Vec<WriteOp>) -> Result<()>;
}

/// The transactional context handed to domain operations.
///
/// This is the storage boundary of the services: get, put, delete and
/// query-by-prefix over column families. [`Records`] adds typed access.
pub trait Tx {
    /// Read one value, including writes staged earlier in this transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get(&self, cf: &'static str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Read every entry whose key starts with `prefix`, in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn scan_prefix(&self, cf: &'static str, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Stage a write.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be staged.
    fn put(&mut self, cf: &'static str, key: Vec<u8>, value: Vec<u8>) -> Result<()>;

    /// Stage a delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete cannot be staged.
    fn delete(&mut self, cf: &'static str, key: Vec<u8>) -> Result<()>;
}

/// A database whose operations run as serialized, atomic transactions.
pub struct Database {
    backend: Arc<dyn KvBackend>,
    write_lock: Mutex<()>,
}

impl Database {
    /// Wrap a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// A database backed by a fresh [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Run `f` as one transaction.
    ///
    /// Writes staged by `f` are committed together if it returns `Ok` and
    /// discarded if it returns `Err`. No other transaction runs concurrently.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a storage error if the commit fails.
    pub fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut dyn Tx) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        // A panic inside an earlier closure never reached the commit, so the
        // backend is still consistent.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut staged = StagedTx::new(self.backend.as_ref());
        let value = f(&mut staged)?;

        let batch = staged.into_batch();
        if !batch.is_empty() {
            tracing::trace!(writes = batch.len(), "Committing transaction");
            self.backend.write_batch(batch)?;
        }

        Ok(value)
    }
}
