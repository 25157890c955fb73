use super::student::{PaymentRecord, StudentId, StudentRecord};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A clamped pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Page {
    pub const DEFAULT_LIMIT: u64 = 50;

    /// Negative inputs clamp to zero.
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.max(0).unsigned_abs(),
            offset: offset.max(0).unsigned_abs(),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// One window of redeemed records plus the count of all redeemed records.
#[derive(Debug, Clone, PartialEq)]
pub struct RedeemedPage {
    pub records: Vec<StudentRecord>,
    pub total: u64,
}

/// Persistent home of payment records and their validation state.
///
/// Implementations are the single source of truth: callers never cache what
/// they read, and `redeem_if_unredeemed` must be one atomic compare-and-set
/// against the stored row.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Stores a new, unredeemed record. Returns `false` without touching the
    /// existing row when the identifier is already known.
    async fn insert(&self, record: PaymentRecord) -> Result<bool>;

    /// Reads the joined holder + payment + validation row.
    async fn fetch(&self, id: &StudentId) -> Result<Option<StudentRecord>>;

    /// Marks the record redeemed at `at` only if it is still unredeemed.
    ///
    /// Returns the number of rows actually changed: `1` for the caller that
    /// won, `0` for everyone else (including unknown identifiers).
    async fn redeem_if_unredeemed(&self, id: &StudentId, at: DateTime<Utc>) -> Result<u64>;

    /// Redeemed records, most recently created first, ties broken by
    /// identifier descending.
    async fn list_redeemed(&self, page: Page) -> Result<RedeemedPage>;
}

pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type PaymentStoreFactory = Box<dyn Fn() -> PaymentStoreBox + Send + Sync>;

/// Sort order shared by the stores that cannot push ordering into a query.
pub fn roster_order(a: &StudentRecord, b: &StudentRecord) -> std::cmp::Ordering {
    b.payment
        .created_at
        .cmp(&a.payment.created_at)
        .then_with(|| b.payment.id.cmp(&a.payment.id))
}

/// Sorts with [`roster_order`] and cuts out the `page` window.
pub fn paginate(mut records: Vec<StudentRecord>, page: Page) -> RedeemedPage {
    records.sort_by(roster_order);
    let total = records.len() as u64;
    let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
    let records = records.into_iter().skip(offset).take(limit).collect();
    RedeemedPage { records, total }
}
