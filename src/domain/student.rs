use crate::error::ScanPassError;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Sub;

/// Externally assigned key of a payment record, usually read from a scanned
/// QR code.
///
/// Surrounding whitespace is dropped; an identifier is never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StudentId(String);

impl StudentId {
    pub fn new(value: impl AsRef<str>) -> Result<Self, ScanPassError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ScanPassError::ValidationError(
                "Student identifier is required".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StudentId {
    type Error = ScanPassError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StudentId> for String {
    fn from(id: StudentId) -> Self {
        id.0
    }
}

/// A paid amount in whole currency units (Ariary in the deployed system).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Amount {
    type Error = ScanPassError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value).map(Self).map_err(|_| {
            ScanPassError::ValidationError(format!("Amount must be non-negative, got {value}"))
        })
    }
}

/// Saturates at zero: a surplus is not a shortfall.
impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

/// Truncates to microseconds, the finest precision every store keeps. Any
/// instant written to a store passes through here first.
pub fn stored_instant(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}

/// Proof of payment as recorded by the intake process. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new(
        id: StudentId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        amount: Amount,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            amount,
            created_at: stored_instant(created_at),
        }
    }
}

/// Whether the proof of payment has been consumed.
///
/// Only moves forward: `Unredeemed` to `Redeemed`, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ValidationState {
    #[default]
    Unredeemed,
    Redeemed {
        at: DateTime<Utc>,
    },
}

impl ValidationState {
    pub fn is_redeemed(&self) -> bool {
        matches!(self, ValidationState::Redeemed { .. })
    }

    pub fn redeemed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ValidationState::Unredeemed => None,
            ValidationState::Redeemed { at } => Some(*at),
        }
    }
}

/// The joined student + payment + validation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub payment: PaymentRecord,
    pub state: ValidationState,
}

impl StudentRecord {
    pub fn unredeemed(payment: PaymentRecord) -> Self {
        Self {
            payment,
            state: ValidationState::Unredeemed,
        }
    }

    pub fn id(&self) -> &StudentId {
        &self.payment.id
    }

    pub fn amount(&self) -> Amount {
        self.payment.amount
    }

    pub fn is_redeemed(&self) -> bool {
        self.state.is_redeemed()
    }

    /// `true` when a redemption attempt right now would pass every pre-write
    /// check.
    pub fn can_be_redeemed(&self, threshold: Amount) -> bool {
        !self.is_redeemed() && self.amount() >= threshold
    }
}
