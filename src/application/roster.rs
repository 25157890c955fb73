use super::status::RecordStatus;
use crate::domain::ports::{Page, RedeemedPage};
use crate::domain::student::Amount;
use serde::Serialize;

/// One page of the validated-students roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Roster {
    pub records: Vec<RecordStatus>,
    /// All redeemed records, independent of the window.
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

impl Roster {
    pub fn from_page(page: RedeemedPage, window: Page, threshold: Amount) -> Self {
        Self {
            records: page
                .records
                .iter()
                .map(|record| RecordStatus::project(record, threshold))
                .collect(),
            total: page.total,
            limit: window.limit,
            offset: window.offset,
        }
    }
}
