mod common;

use common::{backends, engine, id, payment};
use rand::Rng;
use scanpass::domain::ports::PaymentStore;
use scanpass::domain::rejection::Rejection;
use std::sync::Arc;
use tempfile::tempdir;

const CONTENDERS: usize = 12;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_simultaneous_scans_have_one_winner() {
    let dir = tempdir().unwrap();
    for (name, factory) in backends(dir.path()) {
        let store = factory();
        store.insert(payment("A1", 60_000, 0)).await.unwrap();
        let engine = Arc::new(engine(factory()));

        let barrier = Arc::new(tokio::sync::Barrier::new(CONTENDERS));
        let handles: Vec<_> = (0..CONTENDERS)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    engine.redeem(&id("A1")).await
                })
            })
            .collect();

        let mut winners = Vec::new();
        let mut losers = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(record) => winners.push(record),
                Err(Rejection::AlreadyRedeemed { .. }) => losers += 1,
                Err(other) => panic!("{name}: unexpected rejection {other:?}"),
            }
        }

        assert_eq!(winners.len(), 1, "{name}: exactly one scan must win");
        assert_eq!(losers, CONTENDERS - 1, "{name}");

        // The stored timestamp is the winner's
        let stored = store.fetch(&id("A1")).await.unwrap().unwrap();
        assert_eq!(stored.state, winners[0].state, "{name}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_racing_scans_across_many_students() {
    let dir = tempdir().unwrap();
    let mut rng = rand::thread_rng();
    let students: Vec<(String, u64)> = (0..20)
        .map(|i| (format!("S{i:03}"), rng.gen_range(0..=120_000u64)))
        .collect();

    for (name, factory) in backends(dir.path()) {
        let store = factory();
        for (i, (student, amount)) in students.iter().enumerate() {
            store
                .insert(payment(student, *amount, i as u32))
                .await
                .unwrap();
        }
        let engine = Arc::new(engine(factory()));

        let mut handles = Vec::new();
        for (student, _) in &students {
            for _ in 0..4 {
                let engine = Arc::clone(&engine);
                let student = student.clone();
                handles.push(tokio::spawn(async move {
                    let result = engine.redeem(&id(&student)).await;
                    (student, result)
                }));
            }
        }

        let mut wins = std::collections::HashMap::new();
        for handle in handles {
            let (student, result) = handle.await.unwrap();
            match result {
                Ok(_) => *wins.entry(student).or_insert(0) += 1,
                Err(Rejection::AlreadyRedeemed { .. }) | Err(Rejection::InsufficientAmount { .. }) => {}
                Err(other) => panic!("{name}: unexpected rejection {other:?}"),
            }
        }

        for (student, amount) in &students {
            let stored = store.fetch(&id(student)).await.unwrap().unwrap();
            let expected_wins = if *amount >= common::THRESHOLD { 1 } else { 0 };
            assert_eq!(
                wins.get(student).copied().unwrap_or(0),
                expected_wins,
                "{name}: {student} paid {amount}"
            );
            assert_eq!(stored.is_redeemed(), expected_wins == 1, "{name}: {student}");
        }
    }
}
