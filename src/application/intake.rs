use super::engine::RedemptionEngine;
use crate::domain::student::PaymentRecord;
use crate::error::{Result, ScanPassError};
use serde::Serialize;

/// Counts from one intake run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    /// Identifiers already present; their stored record is kept as is.
    pub duplicates: usize,
    /// Rows that could not be parsed.
    pub rejected: usize,
}

/// Registers every parsed payment, skipping duplicates and malformed rows.
///
/// A store failure stops the run and is returned; row-level problems,
/// including values a store refuses to hold, only bump `rejected`.
pub async fn import<I>(engine: &RedemptionEngine, rows: I) -> Result<ImportSummary>
where
    I: IntoIterator<Item = Result<PaymentRecord>>,
{
    let mut summary = ImportSummary::default();
    for (line, row) in rows.into_iter().enumerate() {
        match row {
            Ok(record) => match engine.register(record).await {
                Ok(true) => summary.inserted += 1,
                Ok(false) => summary.duplicates += 1,
                Err(ScanPassError::ValidationError(reason)) => {
                    tracing::warn!(row = line + 1, %reason, "Store refused payment row");
                    summary.rejected += 1;
                }
                Err(e) => return Err(e),
            },
            Err(e) => {
                tracing::warn!(row = line + 1, error = %e, "Skipping malformed payment row");
                summary.rejected += 1;
            }
        }
    }
    tracing::info!(
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        rejected = summary.rejected,
        "Payment intake finished"
    );
    Ok(summary)
}
