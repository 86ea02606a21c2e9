//! In-memory external interfaces, scenario execution, and risk
//! simulation tooling.

pub mod harness;
pub mod price_shock;
pub mod scenario;
