use crate::domain::ports::Page;
use crate::domain::student::Amount;

/// Amount (in Ariary) a student must have paid before a scan may validate them.
pub const DEFAULT_THRESHOLD: Amount = Amount::new(60_000);

/// Process-wide settings, fixed once the engine is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Minimum paid amount; met or exceeded means eligible.
    pub threshold: Amount,
    /// Page size used when a roster request does not name one.
    pub default_limit: u64,
}

impl ServiceConfig {
    pub fn new(threshold: Amount) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            default_limit: Page::DEFAULT_LIMIT,
        }
    }
}
