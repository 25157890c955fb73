use crate::domain::ports::{Page, PaymentStore, RedeemedPage, paginate};
use crate::domain::student::{PaymentRecord, StudentId, StudentRecord, ValidationState};
use crate::error::{Result, ScanPassError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, TransactionDB,
    TransactionDBOptions,
};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding one joined student record per identifier.
pub const CF_STUDENTS: &str = "students";

/// How long a transaction waits for a contended key lock, in milliseconds.
const LOCK_TIMEOUT_MS: i64 = 5_000;

/// A persistent store implementation using RocksDB.
///
/// Records are JSON values keyed by identifier. The conditional redeem runs
/// inside a pessimistic transaction: `get_for_update` locks the key, so a
/// concurrent redeem of the same identifier waits and then sees the
/// committed `Redeemed` state.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<TransactionDB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<TransactionDB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the "students" column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let mut txn_opts = TransactionDBOptions::default();
        txn_opts.set_txn_lock_timeout(LOCK_TIMEOUT_MS);

        let cf_students = ColumnFamilyDescriptor::new(CF_STUDENTS, Options::default());
        let db = TransactionDB::open_cf_descriptors(
            &opts,
            &txn_opts,
            path,
            vec![cf_students],
        )?;

        Ok(Self { db: Arc::new(db) })
    }

    fn students(&self) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(CF_STUDENTS)
            .ok_or_else(|| ScanPassError::internal("Students column family not found"))
    }
}

fn encode(record: &StudentRecord) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(|e| {
        ScanPassError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })
}

fn decode(bytes: &[u8]) -> Result<StudentRecord> {
    serde_json::from_slice(bytes).map_err(|e| {
        ScanPassError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn insert(&self, record: PaymentRecord) -> Result<bool> {
        let cf = self.students()?;
        let key = record.id.as_str().as_bytes().to_vec();

        let txn = self.db.transaction();
        if txn.get_for_update_cf(cf, &key, true)?.is_some() {
            return Ok(false);
        }
        txn.put_cf(cf, &key, encode(&StudentRecord::unredeemed(record))?)?;
        txn.commit()?;
        Ok(true)
    }

    async fn fetch(&self, id: &StudentId) -> Result<Option<StudentRecord>> {
        let cf = self.students()?;
        match self.db.get_cf(cf, id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn redeem_if_unredeemed(&self, id: &StudentId, at: DateTime<Utc>) -> Result<u64> {
        let cf = self.students()?;
        let key = id.as_str().as_bytes();

        // Dropping the transaction without commit rolls it back
        let txn = self.db.transaction();
        let Some(bytes) = txn.get_for_update_cf(cf, key, true)? else {
            return Ok(0);
        };
        let mut record = decode(&bytes)?;
        if record.is_redeemed() {
            return Ok(0);
        }
        record.state = ValidationState::Redeemed { at };
        txn.put_cf(cf, key, encode(&record)?)?;
        txn.commit()?;
        Ok(1)
    }

    async fn list_redeemed(&self, page: Page) -> Result<RedeemedPage> {
        let cf = self.students()?;
        let mut redeemed = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let record = decode(&value)?;
            if record.is_redeemed() {
                redeemed.push(record);
            }
        }
        Ok(paginate(redeemed, page))
    }
}
