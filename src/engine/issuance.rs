use crate::core::account::AccountId;
use crate::core::asset::{AssetId, AssetRegistry};
use crate::core::event::Event;
use crate::core::fixed::{mul_div, LIQUIDATION_BONUS_PERCENT, LIQUIDATION_PRECISION};
use crate::core::positions::Positions;
use crate::engine::error::EngineError;
use crate::engine::external::{CollateralLedger, DebtToken};
use crate::engine::solvency::{HealthFactor, SolvencyView};
use crate::oracle::{default_staleness_bound, PriceSource};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// An account's aggregate position: minted debt and the USD value of
/// its collateral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub debt_minted: u128,
    pub collateral_value_usd: u128,
}

/// Result of a successful liquidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationOutcome {
    /// Debt repaid on the target's behalf, in debt-token units.
    pub debt_covered: u128,
    /// Collateral transferred to the liquidator, principal plus bonus.
    pub collateral_seized: u128,
    /// The bonus portion of the seizure.
    pub bonus: u128,
    /// The target's health factor after the liquidation committed.
    pub target_health_after: HealthFactor,
}

/// The issuance engine: the position ledger plus the solvency guard
/// wrapped around every mutating operation.
///
/// Each public mutating operation is a single atomic step: balances are
/// mutated optimistically, the affected account's health factor is
/// re-derived, and on any violation every prior mutation of the
/// operation — internal balance changes and external transfers alike —
/// is compensated before the error returns. Operations are strictly
/// serialized (`&mut self`) and protected by a reentrancy guard;
/// read-only queries take `&self` and no lock, observing only committed
/// state.
///
/// # Examples
///
/// ```
/// use issuance_engine::core::account::AccountId;
/// use issuance_engine::core::asset::{AssetConfig, AssetId, AssetRegistry};
/// use issuance_engine::core::fixed::WAD;
/// use issuance_engine::engine::issuance::IssuanceEngine;
/// use issuance_engine::oracle::FeedId;
/// use issuance_engine::simulation::harness::{
///     FeedBoard, InMemoryCollateralLedger, InMemoryDebtToken,
/// };
/// use std::sync::Arc;
///
/// let weth = AssetId::new("WETH");
/// let alice = AccountId::new("alice");
/// let registry = Arc::new(
///     AssetRegistry::new(vec![(weth.clone(), AssetConfig::new(FeedId::new("ETH/USD")))])
///         .unwrap(),
/// );
///
/// let mut board = FeedBoard::new();
/// board.set_price(&FeedId::new("ETH/USD"), 2_000_0000_0000, 8);
/// let mut bank = InMemoryCollateralLedger::new();
/// bank.fund(&alice, &weth, 15 * WAD);
///
/// let mut engine = IssuanceEngine::new(
///     registry,
///     Box::new(bank),
///     Box::new(InMemoryDebtToken::new()),
///     Box::new(board),
///     AssetId::new("USDz"),
/// );
///
/// engine.deposit_collateral(&alice, &weth, 15 * WAD).unwrap();
/// engine.mint_debt(&alice, 10_000 * WAD).unwrap();
/// assert!(engine.health_factor(&alice).unwrap().is_solvent());
/// ```
pub struct IssuanceEngine {
    registry: Arc<AssetRegistry>,
    positions: Positions,
    collateral: Box<dyn CollateralLedger>,
    debt_token: Box<dyn DebtToken>,
    oracle: Box<dyn PriceSource>,
    /// Symbol of the synthetic dollar, for events and diagnostics.
    debt_symbol: AssetId,
    staleness_bound: Duration,
    /// Reentrancy flag: set for the duration of every mutating
    /// operation, released on every exit path.
    entered: bool,
    events: Vec<Event>,
}

fn require_positive(amount: u128) -> Result<(), EngineError> {
    if amount == 0 {
        Err(EngineError::ZeroAmount)
    } else {
        Ok(())
    }
}

impl IssuanceEngine {
    pub fn new(
        registry: Arc<AssetRegistry>,
        collateral: Box<dyn CollateralLedger>,
        debt_token: Box<dyn DebtToken>,
        oracle: Box<dyn PriceSource>,
        debt_symbol: AssetId,
    ) -> Self {
        Self {
            registry,
            positions: Positions::new(),
            collateral,
            debt_token,
            oracle,
            debt_symbol,
            staleness_bound: default_staleness_bound(),
            entered: false,
            events: Vec::new(),
        }
    }

    /// Override the oracle staleness bound (default: three hours).
    pub fn with_staleness_bound(mut self, bound: Duration) -> Self {
        self.staleness_bound = bound;
        self
    }

    // --- Mutating operations ---

    /// Deposit collateral into the caller's position.
    ///
    /// Depositing can only improve solvency, so there is no post-hoc
    /// health check.
    pub fn deposit_collateral(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        amount: u128,
    ) -> Result<(), EngineError> {
        self.guarded(|eng| {
            eng.do_deposit(account, asset, amount)?;
            eng.record(Event::CollateralDeposited {
                id: Uuid::new_v4(),
                at: Utc::now(),
                account: account.clone(),
                asset: asset.clone(),
                amount,
            });
            Ok(())
        })
    }

    /// Withdraw collateral from the caller's position.
    ///
    /// The balance is decremented and the outbound transfer executed
    /// before the solvency check; a violating health factor unwinds
    /// both.
    pub fn redeem_collateral(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        amount: u128,
    ) -> Result<(), EngineError> {
        self.guarded(|eng| {
            eng.do_redeem(account, asset, amount)?;
            eng.record(Event::CollateralRedeemed {
                id: Uuid::new_v4(),
                at: Utc::now(),
                account: account.clone(),
                asset: asset.clone(),
                amount,
            });
            Ok(())
        })
    }

    /// Mint synthetic dollars against the caller's collateral.
    ///
    /// The debt balance is raised first; a violating health factor
    /// rolls it back before any token is issued. A declined issuance is
    /// surfaced as [`EngineError::IssuanceFailure`], distinct from the
    /// solvency error.
    pub fn mint_debt(&mut self, account: &AccountId, amount: u128) -> Result<(), EngineError> {
        self.guarded(|eng| {
            eng.do_mint(account, amount)?;
            eng.record(Event::DebtMinted {
                id: Uuid::new_v4(),
                at: Utc::now(),
                account: account.clone(),
                amount,
            });
            Ok(())
        })
    }

    /// Burn synthetic dollars from the caller's own debt position.
    pub fn burn_debt(&mut self, account: &AccountId, amount: u128) -> Result<(), EngineError> {
        self.guarded(|eng| {
            require_positive(amount)?;
            eng.burn_from(amount, account, account)?;
            // Burning debt cannot lower the health factor; the check is
            // defensive.
            let now = Utc::now();
            match eng.health_of(now, account) {
                Ok(hf) if hf.is_solvent() => {}
                Ok(hf) => {
                    eng.unwind_burn(account, account, amount);
                    return Err(EngineError::SolvencyViolation { health_factor: hf });
                }
                Err(err) => {
                    eng.unwind_burn(account, account, amount);
                    return Err(err);
                }
            }
            eng.debt_token.destroy(amount);
            eng.record(Event::DebtBurned {
                id: Uuid::new_v4(),
                at: Utc::now(),
                account: account.clone(),
                amount,
            });
            Ok(())
        })
    }

    /// Repay `debt_to_cover` on behalf of an undercollateralized
    /// `target` and seize the debt-equivalent collateral plus a 10%
    /// bonus.
    ///
    /// The seized collateral goes directly to the liquidator's external
    /// balance, not into their deposit. The target's health factor must
    /// end strictly above the minimum or the whole operation unwinds.
    /// When system-wide collateralization is at or below 100% the seize
    /// amount can exceed what the target holds; the operation then
    /// fails with `InsufficientBalance` or `TransferFailure` — this is
    /// an accepted limitation, not clamped away.
    pub fn liquidate(
        &mut self,
        asset: &AssetId,
        target: &AccountId,
        liquidator: &AccountId,
        debt_to_cover: u128,
    ) -> Result<LiquidationOutcome, EngineError> {
        self.guarded(|eng| {
            let outcome = eng.do_liquidate(asset, target, liquidator, debt_to_cover)?;
            eng.record(Event::Liquidated {
                id: Uuid::new_v4(),
                at: Utc::now(),
                target: target.clone(),
                liquidator: liquidator.clone(),
                asset: asset.clone(),
                debt_covered: outcome.debt_covered,
                collateral_seized: outcome.collateral_seized,
            });
            Ok(outcome)
        })
    }

    /// Deposit collateral and mint against it in one atomic step.
    pub fn deposit_and_mint(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        deposit_amount: u128,
        mint_amount: u128,
    ) -> Result<(), EngineError> {
        self.guarded(|eng| {
            eng.do_deposit(account, asset, deposit_amount)?;
            if let Err(err) = eng.do_mint(account, mint_amount) {
                eng.unwind_deposit(account, asset, deposit_amount);
                return Err(err);
            }
            let at = Utc::now();
            eng.record(Event::CollateralDeposited {
                id: Uuid::new_v4(),
                at,
                account: account.clone(),
                asset: asset.clone(),
                amount: deposit_amount,
            });
            eng.record(Event::DebtMinted {
                id: Uuid::new_v4(),
                at,
                account: account.clone(),
                amount: mint_amount,
            });
            Ok(())
        })
    }

    /// Burn debt and withdraw collateral in one atomic step.
    ///
    /// The burn happens first so the redemption's solvency check runs
    /// against the reduced debt.
    pub fn redeem_for_debt(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        redeem_amount: u128,
        burn_amount: u128,
    ) -> Result<(), EngineError> {
        self.guarded(|eng| {
            require_positive(burn_amount)?;
            eng.burn_from(burn_amount, account, account)?;
            if let Err(err) = eng.do_redeem(account, asset, redeem_amount) {
                eng.unwind_burn(account, account, burn_amount);
                return Err(err);
            }
            eng.debt_token.destroy(burn_amount);
            let at = Utc::now();
            eng.record(Event::DebtBurned {
                id: Uuid::new_v4(),
                at,
                account: account.clone(),
                amount: burn_amount,
            });
            eng.record(Event::CollateralRedeemed {
                id: Uuid::new_v4(),
                at,
                account: account.clone(),
                asset: asset.clone(),
                amount: redeem_amount,
            });
            Ok(())
        })
    }

    // --- Read-only queries ---

    /// Current health factor of an account.
    pub fn health_factor(&self, account: &AccountId) -> Result<HealthFactor, EngineError> {
        self.health_of(Utc::now(), account)
    }

    /// Total USD value (WAD-scaled) of an account's collateral.
    pub fn collateral_value_usd(&self, account: &AccountId) -> Result<u128, EngineError> {
        self.view_at(Utc::now())
            .collateral_value_usd(&self.positions, account)
    }

    /// Minted debt and collateral value of an account.
    pub fn account_info(&self, account: &AccountId) -> Result<AccountInfo, EngineError> {
        Ok(AccountInfo {
            debt_minted: self.positions.debt_of(account),
            collateral_value_usd: self.collateral_value_usd(account)?,
        })
    }

    /// USD value (WAD-scaled) of an arbitrary amount of an asset.
    pub fn usd_value(&self, asset: &AssetId, amount: u128) -> Result<u128, EngineError> {
        self.view_at(Utc::now()).usd_value(asset, amount)
    }

    /// Asset quantity worth a WAD-scaled USD amount at the current
    /// price.
    pub fn token_amount_from_usd(&self, asset: &AssetId, usd: u128) -> Result<u128, EngineError> {
        self.view_at(Utc::now()).token_amount_from_usd(asset, usd)
    }

    /// Recorded collateral balance of an account in an asset.
    pub fn collateral_balance(&self, account: &AccountId, asset: &AssetId) -> u128 {
        self.positions.collateral_of(account, asset)
    }

    /// Recorded minted debt of an account.
    pub fn debt_of(&self, account: &AccountId) -> u128 {
        self.positions.debt_of(account)
    }

    /// The accepted-asset registry.
    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// The authoritative position ledger.
    pub fn positions(&self) -> &Positions {
        &self.positions
    }

    /// Configured oracle staleness bound.
    pub fn staleness_bound(&self) -> Duration {
        self.staleness_bound
    }

    /// Symbol of the synthetic dollar.
    pub fn debt_symbol(&self) -> &AssetId {
        &self.debt_symbol
    }

    /// Events recorded by committed operations, oldest first.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Drain the recorded events.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // --- Internals ---

    /// Run `f` under the reentrancy guard. The flag is released on
    /// every exit path; a nested acquisition fails immediately.
    fn guarded<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        if self.entered {
            return Err(EngineError::ReentrantCall);
        }
        self.entered = true;
        let result = f(self);
        self.entered = false;
        result
    }

    fn view_at(&self, now: DateTime<Utc>) -> SolvencyView<'_> {
        SolvencyView::new(
            &self.registry,
            self.oracle.as_ref(),
            now,
            self.staleness_bound,
        )
    }

    fn health_of(&self, now: DateTime<Utc>, account: &AccountId) -> Result<HealthFactor, EngineError> {
        self.view_at(now).health_factor(&self.positions, account)
    }

    fn require_registered(&self, asset: &AssetId) -> Result<(), EngineError> {
        if self.registry.is_registered(asset) {
            Ok(())
        } else {
            Err(EngineError::UnregisteredAsset(asset.clone()))
        }
    }

    fn do_deposit(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        amount: u128,
    ) -> Result<(), EngineError> {
        require_positive(amount)?;
        self.require_registered(asset)?;
        if !self.collateral.transfer_in(asset, account, amount) {
            return Err(EngineError::TransferFailure {
                asset: asset.clone(),
                amount,
            });
        }
        if let Err(err) = self.positions.credit_collateral(account, asset, amount) {
            // Hand the tokens back before surfacing the failure.
            if !self.collateral.transfer_out(asset, account, amount) {
                log::error!("unwind: could not return {amount} {asset} to {account}");
            }
            return Err(err.into());
        }
        Ok(())
    }

    fn unwind_deposit(&mut self, account: &AccountId, asset: &AssetId, amount: u128) {
        if self
            .positions
            .debit_collateral(account, asset, amount)
            .is_err()
        {
            log::error!("unwind: could not debit {amount} {asset} from {account}");
        }
        if !self.collateral.transfer_out(asset, account, amount) {
            log::error!("unwind: could not return {amount} {asset} to {account}");
        }
    }

    fn do_redeem(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        amount: u128,
    ) -> Result<(), EngineError> {
        require_positive(amount)?;
        self.require_registered(asset)?;
        self.positions.debit_collateral(account, asset, amount)?;
        if !self.collateral.transfer_out(asset, account, amount) {
            if self
                .positions
                .credit_collateral(account, asset, amount)
                .is_err()
            {
                log::error!("unwind: could not restore {amount} {asset} to {account}");
            }
            return Err(EngineError::TransferFailure {
                asset: asset.clone(),
                amount,
            });
        }
        let now = Utc::now();
        match self.health_of(now, account) {
            Ok(hf) if hf.is_solvent() => Ok(()),
            Ok(hf) => {
                self.unwind_redeem(account, asset, amount);
                Err(EngineError::SolvencyViolation { health_factor: hf })
            }
            Err(err) => {
                self.unwind_redeem(account, asset, amount);
                Err(err)
            }
        }
    }

    fn unwind_redeem(&mut self, account: &AccountId, asset: &AssetId, amount: u128) {
        if !self.collateral.transfer_in(asset, account, amount) {
            log::error!("unwind: could not pull {amount} {asset} back from {account}");
        }
        if self
            .positions
            .credit_collateral(account, asset, amount)
            .is_err()
        {
            log::error!("unwind: could not restore {amount} {asset} to {account}");
        }
    }

    fn do_mint(&mut self, account: &AccountId, amount: u128) -> Result<(), EngineError> {
        require_positive(amount)?;
        self.positions.raise_debt(account, amount)?;
        let now = Utc::now();
        match self.health_of(now, account) {
            Ok(hf) if hf.is_solvent() => {}
            Ok(hf) => {
                self.restore_lower_debt(account, amount);
                return Err(EngineError::SolvencyViolation { health_factor: hf });
            }
            Err(err) => {
                self.restore_lower_debt(account, amount);
                return Err(err);
            }
        }
        if !self.debt_token.issue(account, amount) {
            self.restore_lower_debt(account, amount);
            return Err(EngineError::IssuanceFailure { amount });
        }
        Ok(())
    }

    /// Low-level burn primitive: lowers `on_behalf_of`'s debt and pulls
    /// the tokens from `debt_from` into custody. Embeds no solvency
    /// check; the caller destroys the pulled tokens at its commit
    /// point.
    fn burn_from(
        &mut self,
        amount: u128,
        on_behalf_of: &AccountId,
        debt_from: &AccountId,
    ) -> Result<(), EngineError> {
        self.positions.lower_debt(on_behalf_of, amount)?;
        if !self.debt_token.transfer_in(debt_from, amount) {
            self.restore_raise_debt(on_behalf_of, amount);
            return Err(EngineError::TransferFailure {
                asset: self.debt_symbol.clone(),
                amount,
            });
        }
        Ok(())
    }

    fn unwind_burn(&mut self, on_behalf_of: &AccountId, debt_from: &AccountId, amount: u128) {
        if !self.debt_token.transfer_out(debt_from, amount) {
            log::error!("unwind: could not return {amount} debt tokens to {debt_from}");
        }
        self.restore_raise_debt(on_behalf_of, amount);
    }

    fn do_liquidate(
        &mut self,
        asset: &AssetId,
        target: &AccountId,
        liquidator: &AccountId,
        debt_to_cover: u128,
    ) -> Result<LiquidationOutcome, EngineError> {
        require_positive(debt_to_cover)?;
        self.require_registered(asset)?;

        let now = Utc::now();
        let starting = self.health_of(now, target)?;
        if starting.is_solvent() {
            return Err(EngineError::LiquidationNotEligible {
                health_factor: starting,
            });
        }

        let principal = self
            .view_at(now)
            .token_amount_from_usd(asset, debt_to_cover)?;
        // The bonus percent never exceeds its denominator, so the
        // quotient fits.
        let bonus = mul_div(principal, LIQUIDATION_BONUS_PERCENT, LIQUIDATION_PRECISION).unwrap_or(0);
        let seized = principal
            .checked_add(bonus)
            .ok_or(EngineError::ArithmeticOverflow)?;

        // Seize: the collateral leaves the target's position straight
        // into the liquidator's external balance, a cross-account
        // redemption rather than a deposit credit.
        self.positions.debit_collateral(target, asset, seized)?;
        if !self.collateral.transfer_out(asset, liquidator, seized) {
            self.restore_credit_collateral(target, asset, seized);
            return Err(EngineError::TransferFailure {
                asset: asset.clone(),
                amount: seized,
            });
        }

        // Burn the covered debt on the target's behalf, paid from the
        // liquidator's token balance.
        if let Err(err) = self.burn_from(debt_to_cover, target, liquidator) {
            if !self.collateral.transfer_in(asset, liquidator, seized) {
                log::error!("unwind: could not pull {seized} {asset} back from {liquidator}");
            }
            self.restore_credit_collateral(target, asset, seized);
            return Err(err);
        }

        // Post-conditions: the target must end strictly above the
        // minimum, and the liquidator's own position is re-checked.
        let ending = match self.health_of(now, target) {
            Ok(hf) => hf,
            Err(err) => {
                self.unwind_liquidation(asset, target, liquidator, seized, debt_to_cover);
                return Err(err);
            }
        };
        if ending <= HealthFactor::MIN {
            self.unwind_liquidation(asset, target, liquidator, seized, debt_to_cover);
            return Err(EngineError::LiquidationIneffective {
                health_factor: ending,
            });
        }
        let liquidator_health = match self.health_of(now, liquidator) {
            Ok(hf) => hf,
            Err(err) => {
                self.unwind_liquidation(asset, target, liquidator, seized, debt_to_cover);
                return Err(err);
            }
        };
        if !liquidator_health.is_solvent() {
            self.unwind_liquidation(asset, target, liquidator, seized, debt_to_cover);
            return Err(EngineError::SolvencyViolation {
                health_factor: liquidator_health,
            });
        }

        // Commit: destruction is the one irreversible step, so it runs
        // only after every check has passed.
        self.debt_token.destroy(debt_to_cover);
        Ok(LiquidationOutcome {
            debt_covered: debt_to_cover,
            collateral_seized: seized,
            bonus,
            target_health_after: ending,
        })
    }

    fn unwind_liquidation(
        &mut self,
        asset: &AssetId,
        target: &AccountId,
        liquidator: &AccountId,
        seized: u128,
        debt_to_cover: u128,
    ) {
        self.unwind_burn(target, liquidator, debt_to_cover);
        if !self.collateral.transfer_in(asset, liquidator, seized) {
            log::error!("unwind: could not pull {seized} {asset} back from {liquidator}");
        }
        self.restore_credit_collateral(target, asset, seized);
    }

    fn restore_credit_collateral(&mut self, account: &AccountId, asset: &AssetId, amount: u128) {
        if self
            .positions
            .credit_collateral(account, asset, amount)
            .is_err()
        {
            log::error!("unwind: could not restore {amount} {asset} to {account}");
        }
    }

    fn restore_raise_debt(&mut self, account: &AccountId, amount: u128) {
        if self.positions.raise_debt(account, amount).is_err() {
            log::error!("unwind: could not restore {amount} debt to {account}");
        }
    }

    fn restore_lower_debt(&mut self, account: &AccountId, amount: u128) {
        if self.positions.lower_debt(account, amount).is_err() {
            log::error!("unwind: could not roll back {amount} debt from {account}");
        }
    }

    fn record(&mut self, event: Event) {
        log::info!(target: "issuance_engine", "{event}");
        self.events.push(event);
    }
}
