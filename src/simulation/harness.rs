//! In-memory implementations of the external interfaces.
//!
//! These back the CLI, the demo programs, the benchmarks, and the test
//! suites. Each supports failure injection so the abort paths of the
//! engine can be exercised deterministically.

use crate::core::account::AccountId;
use crate::core::asset::AssetId;
use crate::engine::external::{CollateralLedger, DebtToken};
use crate::oracle::{FeedId, PriceQuote, PriceSource};
use chrono::Utc;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// In-memory balance-transfer ledger for collateral assets.
///
/// Tracks external wallet balances per `(account, asset)` and the
/// engine's custody per asset. Transfers refuse (return `false`) when
/// the source balance is short or when the asset has been marked as
/// refusing via [`InMemoryCollateralLedger::refuse`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryCollateralLedger {
    balances: HashMap<(AccountId, AssetId), u128>,
    custody: HashMap<AssetId, u128>,
    refusing: HashSet<AssetId>,
}

impl InMemoryCollateralLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an external wallet balance.
    pub fn fund(&mut self, account: &AccountId, asset: &AssetId, amount: u128) {
        *self
            .balances
            .entry((account.clone(), asset.clone()))
            .or_insert(0) += amount;
    }

    pub fn balance_of(&self, account: &AccountId, asset: &AssetId) -> u128 {
        self.balances
            .get(&(account.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Tokens held in engine custody for one asset.
    pub fn custody_of(&self, asset: &AssetId) -> u128 {
        self.custody.get(asset).copied().unwrap_or(0)
    }

    /// Make every transfer of `asset` report failure.
    pub fn refuse(&mut self, asset: &AssetId) {
        self.refusing.insert(asset.clone());
    }

    pub fn allow(&mut self, asset: &AssetId) {
        self.refusing.remove(asset);
    }
}

impl CollateralLedger for InMemoryCollateralLedger {
    fn transfer_in(&mut self, asset: &AssetId, from: &AccountId, amount: u128) -> bool {
        if self.refusing.contains(asset) {
            return false;
        }
        let key = (from.clone(), asset.clone());
        let balance = self.balances.get(&key).copied().unwrap_or(0);
        if balance < amount {
            return false;
        }
        self.balances.insert(key, balance - amount);
        *self.custody.entry(asset.clone()).or_insert(0) += amount;
        true
    }

    fn transfer_out(&mut self, asset: &AssetId, to: &AccountId, amount: u128) -> bool {
        if self.refusing.contains(asset) {
            return false;
        }
        let held = self.custody.get(asset).copied().unwrap_or(0);
        if held < amount {
            return false;
        }
        self.custody.insert(asset.clone(), held - amount);
        *self
            .balances
            .entry((to.clone(), asset.clone()))
            .or_insert(0) += amount;
        true
    }
}

/// In-memory synthetic dollar: wallet balances, custody, and the
/// issue/destroy bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDebtToken {
    balances: HashMap<AccountId, u128>,
    custody: u128,
    total_supply: u128,
    destroyed_total: u128,
    refuse_issue: bool,
    refuse_transfers: bool,
}

impl InMemoryDebtToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn destroyed_total(&self) -> u128 {
        self.destroyed_total
    }

    /// Make `issue` decline.
    pub fn refuse_issuance(&mut self, refuse: bool) {
        self.refuse_issue = refuse;
    }

    /// Make transfers report failure.
    pub fn refuse_transfers(&mut self, refuse: bool) {
        self.refuse_transfers = refuse;
    }
}

impl DebtToken for InMemoryDebtToken {
    fn transfer_in(&mut self, from: &AccountId, amount: u128) -> bool {
        if self.refuse_transfers {
            return false;
        }
        let balance = self.balance_of(from);
        if balance < amount {
            return false;
        }
        self.balances.insert(from.clone(), balance - amount);
        self.custody += amount;
        true
    }

    fn transfer_out(&mut self, to: &AccountId, amount: u128) -> bool {
        if self.refuse_transfers {
            return false;
        }
        if self.custody < amount {
            return false;
        }
        self.custody -= amount;
        *self.balances.entry(to.clone()).or_insert(0) += amount;
        true
    }

    fn issue(&mut self, account: &AccountId, amount: u128) -> bool {
        if self.refuse_issue {
            return false;
        }
        *self.balances.entry(account.clone()).or_insert(0) += amount;
        self.total_supply += amount;
        true
    }

    fn destroy(&mut self, amount: u128) {
        // Only custody tokens are ever destroyed.
        self.custody = self.custody.saturating_sub(amount);
        self.total_supply = self.total_supply.saturating_sub(amount);
        self.destroyed_total += amount;
    }
}

/// Settable price feeds for simulation and tests.
#[derive(Debug, Clone, Default)]
pub struct FeedBoard {
    quotes: HashMap<FeedId, PriceQuote>,
}

impl FeedBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post a fresh quote (`as_of` = now) for a feed.
    pub fn set_price(&mut self, feed: &FeedId, price: i64, decimals: u32) {
        self.quotes
            .insert(feed.clone(), PriceQuote::new(price, decimals, Utc::now()));
    }

    /// Post an arbitrary quote, e.g. a back-dated one for staleness
    /// tests.
    pub fn set_quote(&mut self, feed: &FeedId, quote: PriceQuote) {
        self.quotes.insert(feed.clone(), quote);
    }

    pub fn quote(&self, feed: &FeedId) -> Option<PriceQuote> {
        self.quotes.get(feed).copied()
    }
}

impl PriceSource for FeedBoard {
    fn latest_quote(&self, feed: &FeedId) -> Option<PriceQuote> {
        self.quotes.get(feed).copied()
    }
}

// Shared-handle impls: the engine takes ownership of boxed interfaces,
// so drivers that need to keep funding wallets or moving prices hand it
// an `Rc<RefCell<...>>` clone and keep the other.

impl CollateralLedger for Rc<RefCell<InMemoryCollateralLedger>> {
    fn transfer_in(&mut self, asset: &AssetId, from: &AccountId, amount: u128) -> bool {
        self.borrow_mut().transfer_in(asset, from, amount)
    }

    fn transfer_out(&mut self, asset: &AssetId, to: &AccountId, amount: u128) -> bool {
        self.borrow_mut().transfer_out(asset, to, amount)
    }
}

impl DebtToken for Rc<RefCell<InMemoryDebtToken>> {
    fn transfer_in(&mut self, from: &AccountId, amount: u128) -> bool {
        self.borrow_mut().transfer_in(from, amount)
    }

    fn transfer_out(&mut self, to: &AccountId, amount: u128) -> bool {
        self.borrow_mut().transfer_out(to, amount)
    }

    fn issue(&mut self, account: &AccountId, amount: u128) -> bool {
        self.borrow_mut().issue(account, amount)
    }

    fn destroy(&mut self, amount: u128) {
        self.borrow_mut().destroy(amount)
    }
}

impl PriceSource for Rc<RefCell<FeedBoard>> {
    fn latest_quote(&self, feed: &FeedId) -> Option<PriceQuote> {
        self.borrow().latest_quote(feed)
    }
}
