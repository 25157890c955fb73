use crate::domain::student::{Amount, StudentId, StudentRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Read-only view of a record handed to the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordStatus {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub amount: Amount,
    pub is_redeemed: bool,
    pub can_be_redeemed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl RecordStatus {
    pub fn project(record: &StudentRecord, threshold: Amount) -> Self {
        Self {
            id: record.id().clone(),
            first_name: record.payment.first_name.clone(),
            last_name: record.payment.last_name.clone(),
            amount: record.amount(),
            is_redeemed: record.is_redeemed(),
            can_be_redeemed: record.can_be_redeemed(threshold),
            redeemed_at: record.state.redeemed_at(),
        }
    }
}
