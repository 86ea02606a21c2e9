//! Foundational types: accounts, assets, fixed-point math, balances, events.

pub mod account;
pub mod asset;
pub mod event;
pub mod fixed;
pub mod positions;
