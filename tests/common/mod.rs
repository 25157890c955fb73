#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use scanpass::application::engine::RedemptionEngine;
use scanpass::config::ServiceConfig;
use scanpass::domain::ports::{PaymentStoreBox, PaymentStoreFactory};
use scanpass::domain::student::{Amount, PaymentRecord, StudentId};
use scanpass::infrastructure::in_memory::InMemoryPaymentStore;
use scanpass::infrastructure::sqlite::SqlitePaymentStore;
use std::fs::File;
use std::io::Error;
use std::path::{Path, PathBuf};

pub const THRESHOLD: u64 = 60_000;

pub fn created_at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 8, minute, 0).unwrap()
}

pub fn payment(id: &str, amount: u64, minute: u32) -> PaymentRecord {
    PaymentRecord::new(
        StudentId::new(id).unwrap(),
        "Rakoto",
        "Jean",
        Amount::new(amount),
        created_at(minute),
    )
}

pub fn id(value: &str) -> StudentId {
    StudentId::new(value).unwrap()
}

/// One factory per backend. Every handle a factory yields sees the same
/// records; the persistent ones keep their files under `dir`.
pub fn backends(dir: &Path) -> Vec<(&'static str, PaymentStoreFactory)> {
    let db_path: PathBuf = dir.join("scanpass.db");
    let shared = InMemoryPaymentStore::new();
    let in_memory: PaymentStoreFactory =
        Box::new(move || Box::new(shared.clone()) as PaymentStoreBox);
    let sqlite: PaymentStoreFactory = Box::new(move || {
        Box::new(SqlitePaymentStore::open(&db_path).unwrap()) as PaymentStoreBox
    });
    #[allow(unused_mut)]
    let mut factories = vec![("in_memory", in_memory), ("sqlite", sqlite)];
    #[cfg(feature = "storage-rocksdb")]
    factories.push(("rocksdb", rocksdb_factory(dir)));
    factories
}

/// RocksDB allows one open handle per path, so every store the factory
/// yields is a clone of the same instance.
#[cfg(feature = "storage-rocksdb")]
fn rocksdb_factory(dir: &Path) -> PaymentStoreFactory {
    use scanpass::infrastructure::rocksdb::RocksDBStore;
    let shared = RocksDBStore::open(dir.join("rocksdb")).unwrap();
    Box::new(move || Box::new(shared.clone()) as PaymentStoreBox)
}

pub fn engine(store: PaymentStoreBox) -> RedemptionEngine {
    RedemptionEngine::new(store, ServiceConfig::new(Amount::new(THRESHOLD)))
}

/// Writes an intake CSV with the given `(id, amount, minute)` rows.
pub fn write_payments_csv(path: &Path, rows: &[(&str, u64, u32)]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["id", "first_name", "last_name", "amount", "created_at"])?;
    for (id, amount, minute) in rows {
        wtr.write_record([
            id.to_string(),
            "Rakoto".to_string(),
            "Jean".to_string(),
            amount.to_string(),
            created_at(*minute).to_rfc3339(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
