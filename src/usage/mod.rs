//! Usage tracking module
//!
//! Accumulates per-session consumption and checks it against quota ceilings.

pub mod clock;
pub mod report;
pub mod shared;
pub mod tracker;

#[cfg(any(test, feature = "test-utils"))]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use report::{RemainingBudget, UsageReport};
pub use shared::SharedUsageTracker;
pub use tracker::{UsageDelta, UsageState, UsageTracker};
