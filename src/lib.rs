//! # issuance-engine
//!
//! Overcollateralized synthetic-dollar issuance and liquidation engine.
//!
//! Users deposit volatile collateral, mint a unit-pegged debt token
//! against it, and the engine enforces — transaction by transaction —
//! that every account stays solvent under a 200% overcollateralization
//! requirement priced by live oracle data.
//!
//! ## Architecture
//!
//! - **core** — Foundational types: accounts, assets, fixed-point math,
//!   the position ledger, events
//! - **oracle** — Price quotes, feed bindings, staleness policy
//! - **engine** — Solvency math, the issuance engine, external
//!   ledger/authority interfaces
//! - **simulation** — In-memory interfaces, scenario execution, stress
//!   and price-shock tooling

pub mod core;
pub mod engine;
pub mod oracle;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::account::AccountId;
    pub use crate::core::asset::{AssetConfig, AssetId, AssetRegistry};
    pub use crate::core::event::Event;
    pub use crate::engine::error::EngineError;
    pub use crate::engine::issuance::{IssuanceEngine, LiquidationOutcome};
    pub use crate::engine::solvency::HealthFactor;
    pub use crate::oracle::{FeedId, PriceQuote, PriceSource};
}
