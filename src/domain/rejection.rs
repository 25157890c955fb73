use super::student::{Amount, StudentId, StudentRecord};
use crate::error::ScanPassError;
use thiserror::Error;

/// Why a check, redemption or lookup did not succeed.
///
/// Every variant is a local, typed outcome handed back to the front end;
/// none of them should crash a request handler.
#[derive(Error, Debug)]
pub enum Rejection {
    #[error("Student {id} not found or no payment recorded")]
    NotFound { id: StudentId },

    #[error("Insufficient amount: expected {threshold}, found {}", .record.amount())]
    InsufficientAmount {
        record: Box<StudentRecord>,
        threshold: Amount,
        shortfall: Amount,
    },

    /// Either redeemed before the request arrived, or a concurrent request
    /// won the conditional update.
    #[error("QR code already used, student {id} already validated")]
    AlreadyRedeemed {
        id: StudentId,
        record: Option<Box<StudentRecord>>,
    },

    #[error("Internal error: {0}")]
    Internal(#[from] ScanPassError),
}

impl Rejection {
    pub fn insufficient(record: StudentRecord, threshold: Amount) -> Self {
        let shortfall = threshold - record.amount();
        Self::InsufficientAmount {
            record: Box::new(record),
            threshold,
            shortfall,
        }
    }

    pub fn already_redeemed(id: StudentId, record: Option<StudentRecord>) -> Self {
        Self::AlreadyRedeemed {
            id,
            record: record.map(Box::new),
        }
    }

    /// HTTP status the front end maps this outcome to.
    pub fn status_code(&self) -> u16 {
        match self {
            Rejection::NotFound { .. } => 404,
            Rejection::InsufficientAmount { .. } => 400,
            Rejection::AlreadyRedeemed { .. } => 409,
            Rejection::Internal(ScanPassError::ValidationError(_)) => 400,
            Rejection::Internal(_) => 500,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::NotFound { .. } => "not_found",
            Rejection::InsufficientAmount { .. } => "insufficient_amount",
            Rejection::AlreadyRedeemed { .. } => "already_redeemed",
            Rejection::Internal(ScanPassError::ValidationError(_)) => "invalid_request",
            Rejection::Internal(_) => "internal_error",
        }
    }

    /// The non-sensitive record carried for display, if any.
    pub fn record(&self) -> Option<&StudentRecord> {
        match self {
            Rejection::InsufficientAmount { record, .. } => Some(&**record),
            Rejection::AlreadyRedeemed { record, .. } => record.as_deref(),
            Rejection::NotFound { .. } | Rejection::Internal(_) => None,
        }
    }
}

pub type Decision<T> = std::result::Result<T, Rejection>;
