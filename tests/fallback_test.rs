use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_backend_requires_feature() {
    let dir = tempfile::tempdir().unwrap();

    Command::new(cargo_bin!("scanpass"))
        .args(["status", "A1", "--backend", "rocksdb", "--db-path"])
        .arg(dir.path().join("db"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("storage-rocksdb"));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_backend_persists() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("db");
    let csv = dir.path().join("payments.csv");
    std::fs::write(&csv, "id, first_name, last_name, amount\nA1, Rakoto, Jean, 60000\n").unwrap();

    Command::new(cargo_bin!("scanpass"))
        .args(["redeem", "A1", "--backend", "rocksdb", "--seed"])
        .arg(&csv)
        .arg("--db-path")
        .arg(&db_path)
        .assert()
        .success();

    Command::new(cargo_bin!("scanpass"))
        .args(["redeem", "A1", "--backend", "rocksdb", "--db-path"])
        .arg(&db_path)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("already_redeemed"));
}
