//! Domain model: payment records, their validation state, the outcome
//! taxonomy, and the store port.

pub mod ports;
pub mod rejection;
pub mod student;
