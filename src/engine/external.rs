//! Interfaces to the external token ledgers and the debt-token
//! issuance authority.
//!
//! All transfer-shaped calls signal failure with a `false` return, not
//! a panic. The engine treats any `false` as a hard abort of the
//! in-progress operation; it never proceeds on an unchecked status.

use crate::core::account::AccountId;
use crate::core::asset::AssetId;

/// Balance-transfer ledger for the accepted collateral assets.
///
/// `transfer_in` moves tokens from an account into system custody;
/// `transfer_out` releases custody back to an account.
pub trait CollateralLedger {
    fn transfer_in(&mut self, asset: &AssetId, from: &AccountId, amount: u128) -> bool;
    fn transfer_out(&mut self, asset: &AssetId, to: &AccountId, amount: u128) -> bool;
}

/// The synthetic-dollar token: standard transfer semantics plus the
/// capability-gated issue/destroy surface.
///
/// `destroy` is irreversible and is only ever called on tokens already
/// pulled into custody via `transfer_in`.
pub trait DebtToken {
    fn transfer_in(&mut self, from: &AccountId, amount: u128) -> bool;
    fn transfer_out(&mut self, to: &AccountId, amount: u128) -> bool;
    fn issue(&mut self, account: &AccountId, amount: u128) -> bool;
    fn destroy(&mut self, amount: u128);
}
