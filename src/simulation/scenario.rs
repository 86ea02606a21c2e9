//! Declarative scenarios: a JSON-serializable asset universe plus a
//! sequence of operations to drive through the engine.
//!
//! Scenarios are the CLI's input format and the substrate for stress
//! generation and shock analysis. Each operation executes as its own
//! transaction: a failing step is reported and the run continues, the
//! way independent callers would retry against a live system.

use crate::core::account::AccountId;
use crate::core::asset::{AssetConfig, AssetId, AssetRegistry, RegistryError};
use crate::core::event::Event;
use crate::core::fixed::{from_decimal, to_decimal, WAD_DECIMALS};
use crate::engine::issuance::IssuanceEngine;
use crate::oracle::FeedId;
use crate::simulation::harness::{FeedBoard, InMemoryCollateralLedger, InMemoryDebtToken};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;

/// Feed decimals used for all scenario price quotes.
const FEED_DECIMALS: u32 = 8;

fn default_token_decimals() -> u32 {
    18
}

/// An accepted asset in a scenario: its symbol, its starting USD price
/// per whole token, and its token decimals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioAsset {
    pub asset: String,
    pub price: Decimal,
    #[serde(default = "default_token_decimals")]
    pub decimals: u32,
}

/// One operation in a scenario. Amounts are whole-token decimals; debt
/// amounts are in synthetic dollars.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScenarioOp {
    Deposit {
        account: String,
        asset: String,
        amount: Decimal,
    },
    Mint {
        account: String,
        amount: Decimal,
    },
    Redeem {
        account: String,
        asset: String,
        amount: Decimal,
    },
    Burn {
        account: String,
        amount: Decimal,
    },
    Liquidate {
        target: String,
        liquidator: String,
        asset: String,
        debt_to_cover: Decimal,
    },
    SetPrice {
        asset: String,
        price: Decimal,
    },
}

impl fmt::Display for ScenarioOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioOp::Deposit {
                account,
                asset,
                amount,
            } => write!(f, "deposit {amount} {asset} by {account}"),
            ScenarioOp::Mint { account, amount } => write!(f, "mint {amount} by {account}"),
            ScenarioOp::Redeem {
                account,
                asset,
                amount,
            } => write!(f, "redeem {amount} {asset} by {account}"),
            ScenarioOp::Burn { account, amount } => write!(f, "burn {amount} by {account}"),
            ScenarioOp::Liquidate {
                target,
                liquidator,
                asset,
                debt_to_cover,
            } => write!(
                f,
                "liquidate {target} by {liquidator}: cover {debt_to_cover} via {asset}"
            ),
            ScenarioOp::SetPrice { asset, price } => write!(f, "set price {asset} = {price}"),
        }
    }
}

/// A complete scenario: the asset universe and the operation sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub assets: Vec<ScenarioAsset>,
    pub operations: Vec<ScenarioOp>,
}

/// Errors building a scenario runtime.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario references unknown asset {0}")]
    UnknownAsset(String),
    #[error("price {0} is not representable")]
    BadPrice(Decimal),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Outcome of one executed operation.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub description: String,
    pub ok: bool,
    /// Error text when the step aborted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Final state of one account after a run.
#[derive(Debug, Clone, Serialize)]
pub struct AccountReport {
    pub account: String,
    pub debt: String,
    pub collateral_value_usd: String,
    pub health_factor: String,
}

/// Full report of a scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub steps: Vec<StepReport>,
    pub accounts: Vec<AccountReport>,
    pub events: Vec<Event>,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Scenario Run ===")?;
        for step in &self.steps {
            let status = if step.ok { "ok" } else { "FAIL" };
            match &step.detail {
                Some(detail) => {
                    writeln!(f, "  [{:>4}] {:<50} {} ({})", step.step, step.description, status, detail)?
                }
                None => writeln!(f, "  [{:>4}] {:<50} {}", step.step, step.description, status)?,
            }
        }
        writeln!(f, "\n--- Accounts ---")?;
        for account in &self.accounts {
            writeln!(
                f,
                "  {:<16} debt {:<16} collateral ${:<16} health {}",
                account.account, account.debt, account.collateral_value_usd, account.health_factor
            )?;
        }
        Ok(())
    }
}

/// An engine wired to in-memory interfaces the runtime can keep
/// driving: prices move, deposit funding appears, steps execute.
pub struct ScenarioRuntime {
    pub engine: IssuanceEngine,
    ledger: Rc<RefCell<InMemoryCollateralLedger>>,
    feeds: Rc<RefCell<FeedBoard>>,
    decimals: HashMap<AssetId, u32>,
}

impl ScenarioRuntime {
    /// Build a runtime over the given asset universe.
    pub fn new(assets: &[ScenarioAsset]) -> Result<Self, ScenarioError> {
        let mut entries = Vec::with_capacity(assets.len());
        let mut decimals = HashMap::new();
        let feeds = Rc::new(RefCell::new(FeedBoard::new()));
        for spec in assets {
            let asset = AssetId::new(&spec.asset);
            let feed = feed_for(&asset);
            let price = quote_price(spec.price)?;
            feeds.borrow_mut().set_price(&feed, price, FEED_DECIMALS);
            decimals.insert(asset.clone(), spec.decimals);
            entries.push((
                asset,
                AssetConfig::new(feed).with_decimals(spec.decimals),
            ));
        }
        let registry = Arc::new(AssetRegistry::new(entries)?);
        let ledger = Rc::new(RefCell::new(InMemoryCollateralLedger::new()));
        let debt_token = Rc::new(RefCell::new(InMemoryDebtToken::new()));
        let engine = IssuanceEngine::new(
            registry,
            Box::new(Rc::clone(&ledger)),
            Box::new(Rc::clone(&debt_token)),
            Box::new(Rc::clone(&feeds)),
            AssetId::new("USDz"),
        );
        Ok(Self {
            engine,
            ledger,
            feeds,
            decimals,
        })
    }

    /// Execute operations in order. Each step runs as its own
    /// transaction; failures are reported, not propagated.
    ///
    /// Deposits are funded into the depositor's external wallet just
    /// before execution — the scenario models money entering the
    /// system from outside.
    pub fn execute(&mut self, operations: &[ScenarioOp]) -> Vec<StepReport> {
        operations
            .iter()
            .enumerate()
            .map(|(index, op)| {
                let outcome = self.execute_one(op);
                StepReport {
                    step: index,
                    description: op.to_string(),
                    ok: outcome.is_ok(),
                    detail: outcome.err(),
                }
            })
            .collect()
    }

    fn execute_one(&mut self, op: &ScenarioOp) -> Result<(), String> {
        match op {
            ScenarioOp::Deposit {
                account,
                asset,
                amount,
            } => {
                let account = AccountId::new(account);
                let asset = AssetId::new(asset);
                let units = self.token_units(&asset, *amount)?;
                self.ledger.borrow_mut().fund(&account, &asset, units);
                self.engine
                    .deposit_collateral(&account, &asset, units)
                    .map_err(|e| e.to_string())
            }
            ScenarioOp::Mint { account, amount } => {
                let units = debt_units(*amount)?;
                self.engine
                    .mint_debt(&AccountId::new(account), units)
                    .map_err(|e| e.to_string())
            }
            ScenarioOp::Redeem {
                account,
                asset,
                amount,
            } => {
                let asset = AssetId::new(asset);
                let units = self.token_units(&asset, *amount)?;
                self.engine
                    .redeem_collateral(&AccountId::new(account), &asset, units)
                    .map_err(|e| e.to_string())
            }
            ScenarioOp::Burn { account, amount } => {
                let units = debt_units(*amount)?;
                self.engine
                    .burn_debt(&AccountId::new(account), units)
                    .map_err(|e| e.to_string())
            }
            ScenarioOp::Liquidate {
                target,
                liquidator,
                asset,
                debt_to_cover,
            } => {
                let units = debt_units(*debt_to_cover)?;
                self.engine
                    .liquidate(
                        &AssetId::new(asset),
                        &AccountId::new(target),
                        &AccountId::new(liquidator),
                        units,
                    )
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            }
            ScenarioOp::SetPrice { asset, price } => self
                .set_price(&AssetId::new(asset), *price)
                .map_err(|e| e.to_string()),
        }
    }

    /// Move a feed to a new USD price.
    pub fn set_price(&mut self, asset: &AssetId, price: Decimal) -> Result<(), ScenarioError> {
        if !self.decimals.contains_key(asset) {
            return Err(ScenarioError::UnknownAsset(asset.to_string()));
        }
        let quote = quote_price(price)?;
        self.feeds
            .borrow_mut()
            .set_price(&feed_for(asset), quote, FEED_DECIMALS);
        Ok(())
    }

    /// Current USD price of an asset, if its feed has a quote.
    pub fn price_of(&self, asset: &AssetId) -> Option<Decimal> {
        let quote = self.feeds.borrow().quote(&feed_for(asset))?;
        to_decimal(u128::try_from(quote.price).ok()?, quote.decimals)
    }

    /// Final per-account summary, sorted by account id.
    pub fn account_reports(&self) -> Vec<AccountReport> {
        self.engine
            .positions()
            .accounts()
            .into_iter()
            .map(|account| {
                let debt = to_decimal(self.engine.debt_of(&account), WAD_DECIMALS)
                    .map(|d| d.normalize().to_string())
                    .unwrap_or_else(|| "?".to_string());
                let collateral_value_usd = match self.engine.collateral_value_usd(&account) {
                    Ok(value) => to_decimal(value, WAD_DECIMALS)
                        .map(|d| d.normalize().to_string())
                        .unwrap_or_else(|| "?".to_string()),
                    Err(err) => err.to_string(),
                };
                let health_factor = match self.engine.health_factor(&account) {
                    Ok(hf) => hf.to_string(),
                    Err(err) => err.to_string(),
                };
                AccountReport {
                    account: account.to_string(),
                    debt,
                    collateral_value_usd,
                    health_factor,
                }
            })
            .collect()
    }

    fn token_units(&self, asset: &AssetId, amount: Decimal) -> Result<u128, String> {
        let decimals = self
            .decimals
            .get(asset)
            .copied()
            .unwrap_or(default_token_decimals());
        from_decimal(amount, decimals).ok_or_else(|| format!("amount {amount} is not representable"))
    }
}

fn feed_for(asset: &AssetId) -> FeedId {
    FeedId::new(format!("{asset}/USD"))
}

fn quote_price(price: Decimal) -> Result<i64, ScenarioError> {
    let units = from_decimal(price, FEED_DECIMALS).ok_or(ScenarioError::BadPrice(price))?;
    i64::try_from(units).map_err(|_| ScenarioError::BadPrice(price))
}

fn debt_units(amount: Decimal) -> Result<u128, String> {
    from_decimal(amount, WAD_DECIMALS)
        .ok_or_else(|| format!("amount {amount} is not representable"))
}

/// Run a scenario end to end and summarize.
pub fn run_scenario(scenario: &Scenario) -> Result<ScenarioReport, ScenarioError> {
    let mut runtime = ScenarioRuntime::new(&scenario.assets)?;
    let steps = runtime.execute(&scenario.operations);
    let accounts = runtime.account_reports();
    let events = runtime.engine.take_events();
    Ok(ScenarioReport {
        steps,
        accounts,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_scenario() -> Scenario {
        Scenario {
            assets: vec![ScenarioAsset {
                asset: "WETH".to_string(),
                price: dec!(2000),
                decimals: 18,
            }],
            operations: vec![
                ScenarioOp::Deposit {
                    account: "alice".to_string(),
                    asset: "WETH".to_string(),
                    amount: dec!(15),
                },
                ScenarioOp::Mint {
                    account: "alice".to_string(),
                    amount: dec!(10000),
                },
            ],
        }
    }

    #[test]
    fn test_run_simple_scenario() {
        let report = run_scenario(&sample_scenario()).unwrap();
        assert!(report.steps.iter().all(|s| s.ok));
        assert_eq!(report.accounts.len(), 1);
        assert_eq!(report.accounts[0].debt, "10000");
        assert_eq!(report.accounts[0].collateral_value_usd, "30000");
        assert_eq!(report.events.len(), 2);
    }

    #[test]
    fn test_failed_step_is_reported_not_fatal() {
        let mut scenario = sample_scenario();
        scenario.operations.push(ScenarioOp::Mint {
            account: "alice".to_string(),
            amount: dec!(999999),
        });
        scenario.operations.push(ScenarioOp::Burn {
            account: "alice".to_string(),
            amount: dec!(1000),
        });
        let report = run_scenario(&scenario).unwrap();
        assert!(!report.steps[2].ok);
        assert!(report.steps[3].ok, "run continues past a failed step");
    }

    #[test]
    fn test_set_price_moves_health_factor() {
        let mut scenario = sample_scenario();
        scenario.operations.push(ScenarioOp::SetPrice {
            asset: "WETH".to_string(),
            price: dec!(1000),
        });
        let report = run_scenario(&scenario).unwrap();
        // 15 ETH at $1000 = $15000, adjusted $7500 against $10000 debt.
        assert_eq!(report.accounts[0].health_factor, "0.75");
    }

    #[test]
    fn test_scenario_json_round_trip() {
        let scenario = sample_scenario();
        let json = serde_json::to_string_pretty(&scenario).unwrap();
        let restored: Scenario = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.assets.len(), 1);
        assert_eq!(restored.operations.len(), 2);
    }

    #[test]
    fn test_unknown_price_target_rejected() {
        let mut runtime = ScenarioRuntime::new(&sample_scenario().assets).unwrap();
        let err = runtime
            .set_price(&AssetId::new("DOGE"), dec!(1))
            .unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownAsset(_)));
    }
}
