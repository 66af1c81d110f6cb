//! Wire and document types.

pub mod envelope;
pub mod report;
pub mod service_account;
pub mod token;
