//! Quota module
//!
//! Ceilings for a session and the outcome of checking usage against them.

pub mod config;
pub mod violation;

pub use config::QuotaConfig;
pub use violation::{QuotaDimension, QuotaStatus, QuotaViolation};
