//! USD valuation and health-factor computation.
//!
//! Everything here is a pure/derived view over the position ledger and
//! the oracle: no state is mutated and no price is ever cached. A
//! [`SolvencyView`] pins a single `now` so that every asset valued
//! within one operation is checked against the same instant.

use crate::core::account::AccountId;
use crate::core::asset::{AssetConfig, AssetId, AssetRegistry};
use crate::core::fixed::{
    mul_div, pow10, to_decimal, LIQUIDATION_PRECISION, LIQUIDATION_THRESHOLD_PERCENT,
    MIN_HEALTH_FACTOR, WAD, WAD_DECIMALS,
};
use crate::core::positions::Positions;
use crate::engine::error::EngineError;
use crate::oracle::{PriceError, PriceSource};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An account's solvency signal, WAD-scaled.
///
/// `1.0` (WAD) is the minimum for a solvent account; below it the
/// account is eligible for liquidation. An account with no debt reads
/// as [`HealthFactor::MAX`]: it can never be liquidated, regardless of
/// collateral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HealthFactor(pub u128);

impl HealthFactor {
    /// The maximum representable health factor (no debt).
    pub const MAX: HealthFactor = HealthFactor(u128::MAX);
    /// The minimum solvent health factor, 1.0 in WAD terms.
    pub const MIN: HealthFactor = HealthFactor(MIN_HEALTH_FACTOR);

    /// Whether this health factor satisfies the solvency invariant.
    /// The minimum is inclusive.
    pub fn is_solvent(self) -> bool {
        self.0 >= MIN_HEALTH_FACTOR
    }

    /// Whether an account at this health factor may be liquidated.
    pub fn is_liquidatable(self) -> bool {
        !self.is_solvent()
    }

    /// Raw WAD-scaled value.
    pub fn raw(self) -> u128 {
        self.0
    }

    /// Lossy float rendering, for display and rough comparisons only.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / WAD as f64
    }
}

impl fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::MAX {
            return write!(f, "max");
        }
        match to_decimal(self.0, WAD_DECIMALS) {
            Some(d) => write!(f, "{}", d.normalize()),
            None => write!(f, "{}e-18", self.0),
        }
    }
}

/// Health factor from the two per-account aggregates.
///
/// With no debt the factor is maximal. Otherwise only the
/// risk-adjusted half of the collateral counts:
/// `(collateral * threshold / 100) * WAD / debt`. Values beyond `u128`
/// saturate at [`HealthFactor::MAX`].
pub fn calculate_health_factor(debt_minted: u128, collateral_value_usd: u128) -> HealthFactor {
    if debt_minted == 0 {
        return HealthFactor::MAX;
    }
    // Threshold never exceeds its denominator, so the quotient fits.
    let adjusted = mul_div(
        collateral_value_usd,
        LIQUIDATION_THRESHOLD_PERCENT,
        LIQUIDATION_PRECISION,
    )
    .unwrap_or(0);
    mul_div(adjusted, WAD, debt_minted)
        .map(HealthFactor)
        .unwrap_or(HealthFactor::MAX)
}

/// A point-in-time valuation view over the registry and oracle.
pub struct SolvencyView<'a> {
    registry: &'a AssetRegistry,
    oracle: &'a dyn PriceSource,
    now: DateTime<Utc>,
    staleness_bound: Duration,
}

impl<'a> SolvencyView<'a> {
    pub fn new(
        registry: &'a AssetRegistry,
        oracle: &'a dyn PriceSource,
        now: DateTime<Utc>,
        staleness_bound: Duration,
    ) -> Self {
        Self {
            registry,
            oracle,
            now,
            staleness_bound,
        }
    }

    fn config(&self, asset: &AssetId) -> Result<&AssetConfig, EngineError> {
        self.registry
            .config(asset)
            .ok_or_else(|| EngineError::UnregisteredAsset(asset.clone()))
    }

    /// Current fresh price of `asset`, scaled to WAD.
    fn price_wad(&self, asset: &AssetId) -> Result<u128, EngineError> {
        let config = self.config(asset)?;
        let quote = self
            .oracle
            .latest_quote(&config.feed)
            .ok_or_else(|| PriceError::FeedNotFound {
                feed: config.feed.clone(),
            })?;
        Ok(quote.price_wad(&config.feed, self.now, self.staleness_bound)?)
    }

    /// USD value (WAD-scaled) of `amount` smallest units of `asset`.
    ///
    /// The price is scaled to WAD before multiplying; division by the
    /// token unit comes last.
    pub fn usd_value(&self, asset: &AssetId, amount: u128) -> Result<u128, EngineError> {
        let unit = pow10(self.config(asset)?.decimals).ok_or(EngineError::ArithmeticOverflow)?;
        let price = self.price_wad(asset)?;
        mul_div(price, amount, unit).ok_or(EngineError::ArithmeticOverflow)
    }

    /// Inverse conversion: smallest units of `asset` worth `usd`
    /// (WAD-scaled), truncated toward zero.
    pub fn token_amount_from_usd(&self, asset: &AssetId, usd: u128) -> Result<u128, EngineError> {
        let unit = pow10(self.config(asset)?.decimals).ok_or(EngineError::ArithmeticOverflow)?;
        let price = self.price_wad(asset)?;
        mul_div(usd, unit, price).ok_or(EngineError::ArithmeticOverflow)
    }

    /// Total USD value of an account's collateral, summed over the
    /// registry in its stable order.
    pub fn collateral_value_usd(
        &self,
        positions: &Positions,
        account: &AccountId,
    ) -> Result<u128, EngineError> {
        let mut total: u128 = 0;
        for asset in self.registry.assets() {
            let amount = positions.collateral_of(account, asset);
            let value = self.usd_value(asset, amount)?;
            total = total
                .checked_add(value)
                .ok_or(EngineError::ArithmeticOverflow)?;
        }
        Ok(total)
    }

    /// Current health factor of an account.
    pub fn health_factor(
        &self,
        positions: &Positions,
        account: &AccountId,
    ) -> Result<HealthFactor, EngineError> {
        let debt = positions.debt_of(account);
        if debt == 0 {
            return Ok(HealthFactor::MAX);
        }
        let collateral_value = self.collateral_value_usd(positions, account)?;
        Ok(calculate_health_factor(debt, collateral_value))
    }
}
