//! Price-shock analysis for liquidation risk.
//!
//! Models the impact of a sudden move in one asset's price on account
//! solvency: which positions fall below the minimum health factor and
//! become liquidatable.

use crate::core::account::AccountId;
use crate::core::asset::AssetId;
use crate::core::fixed::{to_decimal, WAD_DECIMALS};
use crate::engine::error::EngineError;
use crate::engine::issuance::IssuanceEngine;
use crate::engine::solvency::HealthFactor;
use crate::simulation::scenario::{ScenarioError, ScenarioRuntime};
use rust_decimal::Decimal;
use serde::Serialize;

/// An account pushed below the minimum health factor by a shock.
#[derive(Debug, Clone, Serialize)]
pub struct ShockedAccount {
    pub account: String,
    pub debt: String,
    pub health_factor_before: String,
    pub health_factor_after: String,
}

/// Result of a price-shock scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ShockReport {
    /// Description of the shock applied.
    pub scenario: String,
    pub asset: String,
    pub shock_percent: i64,
    pub price_before: Decimal,
    pub price_after: Decimal,
    /// Accounts that became liquidatable under the shock.
    pub liquidatable: Vec<ShockedAccount>,
}

impl std::fmt::Display for ShockReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Price Shock: {} ===", self.scenario)?;
        writeln!(f, "Price before:  {}", self.price_before)?;
        writeln!(f, "Price after:   {}", self.price_after)?;
        if self.liquidatable.is_empty() {
            writeln!(f, "No accounts became liquidatable.")?;
        } else {
            writeln!(f, "\nLiquidatable accounts:")?;
            for account in &self.liquidatable {
                writeln!(
                    f,
                    "  {:<16} debt {:<16} health {} -> {}",
                    account.account,
                    account.debt,
                    account.health_factor_before,
                    account.health_factor_after
                )?;
            }
        }
        Ok(())
    }
}

/// Every account with outstanding debt currently below the minimum
/// health factor.
pub fn liquidatable_accounts(
    engine: &IssuanceEngine,
) -> Result<Vec<(AccountId, HealthFactor)>, EngineError> {
    let mut out = Vec::new();
    for account in engine.positions().accounts() {
        if engine.debt_of(&account) == 0 {
            continue;
        }
        let hf = engine.health_factor(&account)?;
        if hf.is_liquidatable() {
            out.push((account, hf));
        }
    }
    Ok(out)
}

/// Apply a percentage shock to one asset's price and report which
/// accounts become liquidatable.
///
/// `percent` is signed: `-30` drops the price by 30%.
pub fn apply_price_shock(
    runtime: &mut ScenarioRuntime,
    asset: &AssetId,
    percent: i64,
) -> Result<ShockReport, ScenarioError> {
    let before = runtime
        .price_of(asset)
        .ok_or_else(|| ScenarioError::UnknownAsset(asset.to_string()))?;
    let after = before * (Decimal::from(100 + percent) / Decimal::from(100));
    if after <= Decimal::ZERO {
        return Err(ScenarioError::BadPrice(after));
    }

    // Health factors before the move, for accounts carrying debt.
    let mut before_health = Vec::new();
    for account in runtime.engine.positions().accounts() {
        if runtime.engine.debt_of(&account) > 0 {
            if let Ok(hf) = runtime.engine.health_factor(&account) {
                before_health.push((account, hf));
            }
        }
    }

    runtime.set_price(asset, after)?;

    let mut liquidatable = Vec::new();
    for (account, hf_before) in before_health {
        let hf_after = match runtime.engine.health_factor(&account) {
            Ok(hf) => hf,
            Err(_) => continue,
        };
        if hf_after.is_liquidatable() {
            let debt = to_decimal(runtime.engine.debt_of(&account), WAD_DECIMALS)
                .map(|d| d.normalize().to_string())
                .unwrap_or_else(|| "?".to_string());
            liquidatable.push(ShockedAccount {
                account: account.to_string(),
                debt,
                health_factor_before: hf_before.to_string(),
                health_factor_after: hf_after.to_string(),
            });
        }
    }

    Ok(ShockReport {
        scenario: format!("{asset} {percent:+}%"),
        asset: asset.to_string(),
        shock_percent: percent,
        price_before: before,
        price_after: after,
        liquidatable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::scenario::{ScenarioAsset, ScenarioOp};
    use rust_decimal_macros::dec;

    fn runtime_with_positions() -> ScenarioRuntime {
        let assets = vec![ScenarioAsset {
            asset: "WETH".to_string(),
            price: dec!(2000),
            decimals: 18,
        }];
        let mut runtime = ScenarioRuntime::new(&assets).unwrap();
        let steps = runtime.execute(&[
            ScenarioOp::Deposit {
                account: "leveraged".to_string(),
                asset: "WETH".to_string(),
                amount: dec!(10),
            },
            ScenarioOp::Mint {
                account: "leveraged".to_string(),
                amount: dec!(10000),
            },
            ScenarioOp::Deposit {
                account: "cautious".to_string(),
                asset: "WETH".to_string(),
                amount: dec!(10),
            },
            ScenarioOp::Mint {
                account: "cautious".to_string(),
                amount: dec!(2000),
            },
        ]);
        assert!(steps.iter().all(|s| s.ok));
        runtime
    }

    #[test]
    fn test_shock_flags_only_overleveraged() {
        let mut runtime = runtime_with_positions();
        // -40%: $2000 -> $1200. Leveraged account: $12000 * 0.5 / $10000 = 0.6.
        // Cautious account: $12000 * 0.5 / $2000 = 3.0.
        let report = apply_price_shock(&mut runtime, &AssetId::new("WETH"), -40).unwrap();
        assert_eq!(report.price_after, dec!(1200));
        assert_eq!(report.liquidatable.len(), 1);
        assert_eq!(report.liquidatable[0].account, "leveraged");
        assert_eq!(report.liquidatable[0].health_factor_after, "0.6");
    }

    #[test]
    fn test_no_shock_no_liquidations() {
        let mut runtime = runtime_with_positions();
        let report = apply_price_shock(&mut runtime, &AssetId::new("WETH"), 10).unwrap();
        assert!(report.liquidatable.is_empty());
    }

    #[test]
    fn test_shock_to_zero_rejected() {
        let mut runtime = runtime_with_positions();
        let err = apply_price_shock(&mut runtime, &AssetId::new("WETH"), -100).unwrap_err();
        assert!(matches!(err, ScenarioError::BadPrice(_)));
    }

    #[test]
    fn test_liquidatable_accounts_scan() {
        let mut runtime = runtime_with_positions();
        assert!(liquidatable_accounts(&runtime.engine).unwrap().is_empty());
        runtime
            .set_price(&AssetId::new("WETH"), dec!(1200))
            .unwrap();
        let hits = liquidatable_accounts(&runtime.engine).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.as_str(), "leveraged");
    }
}
