//! Adapters between the engine and the outside world: CSV payment intake and
//! the JSON result envelope.

pub mod csv;
pub mod response;
