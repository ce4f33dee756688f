//! `RocksDB` storage backend.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use crate::error::{Result, StoreError};
use crate::schema::all_column_families;
use crate::{KvBackend, WriteOp};

/// RocksDB-backed storage, one column family per record kind and index.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }
}

impl KvBackend for RocksStore {
    fn get(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let handle = self.cf(cf)?;
        self.db
            .get_cf(&handle, key)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn scan_prefix(&self, cf: &str, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let handle = self.cf(cf)?;
        let iter = self
            .db
            .iterator_cf(&handle, IteratorMode::From(prefix, Direction::Forward));

        let mut entries = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.to_vec(), value.to_vec()));
        }

        Ok(entries)
    }

    fn write_batch(&self, batch: Vec<WriteOp>) -> Result<()> {
        let mut write = WriteBatch::default();
        for op in &batch {
            match op {
                WriteOp::Put { cf, key, value } => {
                    let handle = self.cf(cf)?;
                    write.put_cf(&handle, key, value);
                }
                WriteOp::Delete { cf, key } => {
                    let handle = self.cf(cf)?;
                    write.delete_cf(&handle, key);
                }
            }
        }

        self.db
            .write(write)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, Records};
    use rendezvous_core::{CreditAccount, CreditTransaction, UserId};
    use tempfile::TempDir;

    fn create_test_db() -> (Database, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (Database::new(Arc::new(store)), dir)
    }

    #[test]
    fn account_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let user_id = UserId::generate();

        {
            let db = Database::new(Arc::new(RocksStore::open(dir.path()).unwrap()));
            db.transaction(|tx| -> Result<()> {
                let mut account = CreditAccount::new(user_id);
                account.available_credits = 4;
                tx.put_account(&account)
            })
            .unwrap();
        }

        let db = Database::new(Arc::new(RocksStore::open(dir.path()).unwrap()));
        let account = db
            .transaction(|tx| -> Result<_> { tx.account(&user_id) })
            .unwrap()
            .unwrap();
        assert_eq!(account.available_credits, 4);
    }

    #[test]
    fn transactions_listed_newest_first() {
        let (db, _dir) = create_test_db();
        let user_id = UserId::generate();
        let account = CreditAccount::new(user_id);

        db.transaction(|tx| -> Result<()> {
            tx.append_transaction(&CreditTransaction::initial_grant(&account, 4))
        })
        .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(2)); // Ensure different ULIDs

        db.transaction(|tx| -> Result<()> {
            tx.append_transaction(&CreditTransaction::purchase(
                &account,
                10,
                "pi_1".into(),
                "Purchase".into(),
            ))
        })
        .unwrap();

        let listed = db
            .transaction(|tx| -> Result<_> { tx.transactions_for_user(&user_id, 10, 0) })
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].description, "Purchase");

        let page2 = db
            .transaction(|tx| -> Result<_> { tx.transactions_for_user(&user_id, 1, 1) })
            .unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].amount, 4);
    }
}
