//! The solvency-guarded issuance engine and its external interfaces.

pub mod error;
pub mod external;
pub mod issuance;
pub mod solvency;

pub use error::EngineError;
pub use issuance::{AccountInfo, IssuanceEngine, LiquidationOutcome};
pub use solvency::{calculate_health_factor, HealthFactor};
