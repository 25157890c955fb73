//! Application layer containing the core business logic orchestration.
//!
//! `RedemptionEngine` is the entry point for every scan: eligibility checks,
//! the one-way validation transition, status lookups and the validated
//! roster. `intake` loads payment records produced by the payment process.

pub mod eligibility;
pub mod engine;
pub mod intake;
pub mod roster;
pub mod status;
