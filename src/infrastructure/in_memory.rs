use crate::domain::ports::{Page, PaymentStore, RedeemedPage, paginate};
use crate::domain::student::{PaymentRecord, StudentId, StudentRecord, ValidationState};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory payment store.
///
/// Uses `Arc<RwLock<HashMap<StudentId, StudentRecord>>>`; clones share the
/// same map, so a test can keep a handle while the engine owns another.
/// The conditional redeem checks and writes under a single write guard,
/// which is what makes it a compare-and-set.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    records: Arc<RwLock<HashMap<StudentId, StudentRecord>>>,
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with records in any state. Existing entries are replaced.
    pub async fn with_records(records: impl IntoIterator<Item = StudentRecord>) -> Self {
        let store = Self::new();
        {
            let mut map = store.records.write().await;
            for record in records {
                map.insert(record.id().clone(), record);
            }
        }
        store
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, record: PaymentRecord) -> Result<bool> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Ok(false);
        }
        records.insert(record.id.clone(), StudentRecord::unredeemed(record));
        Ok(true)
    }

    async fn fetch(&self, id: &StudentId) -> Result<Option<StudentRecord>> {
        let records = self.records.read().await;
        Ok(records.get(id).cloned())
    }

    async fn redeem_if_unredeemed(&self, id: &StudentId, at: DateTime<Utc>) -> Result<u64> {
        let mut records = self.records.write().await;
        match records.get_mut(id) {
            Some(record) if record.state == ValidationState::Unredeemed => {
                record.state = ValidationState::Redeemed { at };
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn list_redeemed(&self, page: Page) -> Result<RedeemedPage> {
        let records = self.records.read().await;
        let redeemed = records
            .values()
            .filter(|record| record.is_redeemed())
            .cloned()
            .collect();
        Ok(paginate(redeemed, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::student::Amount;
    use chrono::{Duration, TimeZone};

    fn payment(id: &str, amount: u64, minute: u32) -> PaymentRecord {
        PaymentRecord::new(
            StudentId::new(id).unwrap(),
            "Rakoto",
            "Jean",
            Amount::new(amount),
            Utc.with_ymd_and_hms(2024, 1, 1, 8, minute, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_in_memory_insert_and_fetch() {
        let store = InMemoryPaymentStore::new();
        assert!(store.insert(payment("A1", 60_000, 0)).await.unwrap());

        let fetched = store
            .fetch(&StudentId::new("A1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.amount(), Amount::new(60_000));
        assert_eq!(fetched.state, ValidationState::Unredeemed);

        assert!(
            store
                .fetch(&StudentId::new("A2").unwrap())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_in_memory_insert_keeps_existing_record() {
        let store = InMemoryPaymentStore::new();
        assert!(store.insert(payment("A1", 60_000, 0)).await.unwrap());
        // Duplicate ID with a different amount
        assert!(!store.insert(payment("A1", 10, 0)).await.unwrap());

        let fetched = store
            .fetch(&StudentId::new("A1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.amount(), Amount::new(60_000));
    }

    #[tokio::test]
    async fn test_in_memory_conditional_redeem() {
        let store = InMemoryPaymentStore::new();
        store.insert(payment("A1", 60_000, 0)).await.unwrap();
        let id = StudentId::new("A1").unwrap();
        let first = Utc::now();

        assert_eq!(store.redeem_if_unredeemed(&id, first).await.unwrap(), 1);
        assert_eq!(
            store
                .redeem_if_unredeemed(&id, first + Duration::seconds(5))
                .await
                .unwrap(),
            0
        );

        // The first timestamp survives the losing attempt
        let fetched = store.fetch(&id).await.unwrap().unwrap();
        assert_eq!(fetched.state.redeemed_at(), Some(first));

        let unknown = StudentId::new("nobody").unwrap();
        assert_eq!(store.redeem_if_unredeemed(&unknown, first).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_in_memory_list_redeemed_order_and_total() {
        let store = InMemoryPaymentStore::new();
        for (id, minute) in [("A", 1), ("B", 2), ("C", 3), ("D", 3)] {
            store.insert(payment(id, 60_000, minute)).await.unwrap();
        }
        store.insert(payment("E", 60_000, 4)).await.unwrap();
        for id in ["A", "B", "C", "D"] {
            store
                .redeem_if_unredeemed(&StudentId::new(id).unwrap(), Utc::now())
                .await
                .unwrap();
        }

        let page = store.list_redeemed(Page::new(3, 0)).await.unwrap();
        assert_eq!(page.total, 4);
        let ids: Vec<&str> = page.records.iter().map(|r| r.id().as_str()).collect();
        // C and D share a creation time; D wins the identifier tie-break
        assert_eq!(ids, vec!["D", "C", "B"]);

        let rest = store.list_redeemed(Page::new(3, 3)).await.unwrap();
        assert_eq!(rest.total, 4);
        assert_eq!(rest.records.len(), 1);
        assert_eq!(rest.records[0].id().as_str(), "A");
    }
}
