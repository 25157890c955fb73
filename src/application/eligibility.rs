use crate::domain::rejection::{Decision, Rejection};
use crate::domain::student::{Amount, StudentRecord};

/// Applies the business rules to a freshly read record.
///
/// An already redeemed record is rejected before the amount is looked at,
/// so a redeemed record that is also underpaid reports `AlreadyRedeemed`.
pub fn assess(record: StudentRecord, threshold: Amount) -> Decision<StudentRecord> {
    if record.is_redeemed() {
        let id = record.id().clone();
        return Err(Rejection::already_redeemed(id, Some(record)));
    }
    if record.amount() < threshold {
        return Err(Rejection::insufficient(record, threshold));
    }
    Ok(record)
}
