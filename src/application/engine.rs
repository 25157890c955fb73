use super::eligibility::assess;
use super::roster::Roster;
use super::status::RecordStatus;
use crate::config::ServiceConfig;
use crate::domain::ports::{Page, PaymentStoreBox};
use crate::domain::rejection::{Decision, Rejection};
use crate::domain::student::{
    Amount, PaymentRecord, StudentId, StudentRecord, ValidationState, stored_instant,
};
use crate::error::{Result, ScanPassError};
use crate::observability::operation_span;
use chrono::Utc;
use tracing::Instrument;

/// Decides whether a scanned identifier may be validated and validates it at
/// most once.
///
/// `RedemptionEngine` keeps no state of its own beyond configuration: every
/// decision re-reads the store, and the store's conditional update is the
/// only arbiter between concurrent redemptions. It is `Send + Sync`, so one
/// instance behind an `Arc` can serve every request.
pub struct RedemptionEngine {
    store: PaymentStoreBox,
    config: ServiceConfig,
}

impl RedemptionEngine {
    /// Creates a new `RedemptionEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `store` - The store holding payment records and validation state.
    /// * `config` - Threshold and paging defaults.
    pub fn new(store: PaymentStoreBox, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    pub fn threshold(&self) -> Amount {
        self.config.threshold
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Records a new payment as unredeemed. Returns `false` if the identifier
    /// already exists; the stored record is left untouched.
    pub async fn register(&self, record: PaymentRecord) -> Result<bool> {
        let id = record.id.clone();
        let inserted = self.store.insert(record).await?;
        if inserted {
            tracing::debug!(identifier = %id, "Payment registered");
        } else {
            tracing::debug!(identifier = %id, "Payment already registered, skipped");
        }
        Ok(inserted)
    }

    /// Checks eligibility without writing anything.
    pub async fn evaluate(&self, id: &StudentId) -> Decision<StudentRecord> {
        let result = self.check(id).await;
        log_outcome("evaluate", id, &result);
        result
    }

    /// Validates the student if, and only if, this call wins the store's
    /// conditional update.
    pub async fn redeem(&self, id: &StudentId) -> Decision<StudentRecord> {
        let result = self
            .transition(id)
            .instrument(operation_span("redeem", id.as_str()))
            .await;
        log_outcome("redeem", id, &result);
        result
    }

    /// Current state of a record plus derived flags. Never writes.
    pub async fn status(&self, id: &StudentId) -> Decision<RecordStatus> {
        let result = match self.store.fetch(id).await {
            Ok(Some(record)) => Ok(RecordStatus::project(&record, self.config.threshold)),
            Ok(None) => Err(Rejection::NotFound { id: id.clone() }),
            Err(e) => Err(Rejection::from(e)),
        };
        log_outcome("status", id, &result);
        result
    }

    /// One page of validated students plus the overall count.
    pub async fn list_redeemed(&self, page: Page) -> Decision<Roster> {
        match self.store.list_redeemed(page).await {
            Ok(redeemed) => {
                tracing::info!(
                    limit = page.limit,
                    offset = page.offset,
                    returned = redeemed.records.len(),
                    total = redeemed.total,
                    "Validated roster read"
                );
                Ok(Roster::from_page(redeemed, page, self.config.threshold))
            }
            Err(e) => {
                tracing::error!(error = %e, "Validated roster read failed");
                Err(Rejection::from(e))
            }
        }
    }

    async fn check(&self, id: &StudentId) -> Decision<StudentRecord> {
        let record = self
            .store
            .fetch(id)
            .await?
            .ok_or_else(|| Rejection::NotFound { id: id.clone() })?;
        assess(record, self.config.threshold)
    }

    async fn transition(&self, id: &StudentId) -> Decision<StudentRecord> {
        // Advisory only: another caller may pass the same checks before either writes
        let record = self.check(id).await?;

        let at = stored_instant(Utc::now());
        let rows = self.store.redeem_if_unredeemed(id, at).await?;
        match rows {
            1 => Ok(StudentRecord {
                state: ValidationState::Redeemed { at },
                ..record
            }),
            0 => {
                tracing::warn!(
                    identifier = %id,
                    "Conditional update changed no rows, a concurrent scan validated first"
                );
                // Re-read only to show who was validated; never to retry
                let current = match self.store.fetch(id).await {
                    Ok(current) => current,
                    Err(e) => {
                        tracing::warn!(identifier = %id, error = %e, "Re-read after lost race failed");
                        None
                    }
                };
                Err(Rejection::already_redeemed(id.clone(), current))
            }
            n => Err(Rejection::from(ScanPassError::internal(format!(
                "Conditional update changed {n} rows for student {id}"
            )))),
        }
    }
}

fn log_outcome<T>(operation: &'static str, id: &StudentId, result: &Decision<T>) {
    match result {
        Ok(_) => tracing::info!(op = operation, identifier = %id, outcome = "success", "Request accepted"),
        Err(Rejection::Internal(e)) => tracing::error!(
            op = operation,
            identifier = %id,
            outcome = "internal_error",
            error = %e,
            "Request failed"
        ),
        Err(rejection) => tracing::info!(
            op = operation,
            identifier = %id,
            outcome = rejection.kind(),
            reason = %rejection,
            "Request rejected"
        ),
    }
}
