use crate::core::account::AccountId;
use crate::core::asset::AssetId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Record of a committed state-mutating operation.
///
/// Events are appended only after an operation commits; an aborted
/// operation leaves no trace. Each carries a unique id and the UTC
/// instant it was recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CollateralDeposited {
        id: Uuid,
        at: DateTime<Utc>,
        account: AccountId,
        asset: AssetId,
        amount: u128,
    },
    CollateralRedeemed {
        id: Uuid,
        at: DateTime<Utc>,
        account: AccountId,
        asset: AssetId,
        amount: u128,
    },
    DebtMinted {
        id: Uuid,
        at: DateTime<Utc>,
        account: AccountId,
        amount: u128,
    },
    DebtBurned {
        id: Uuid,
        at: DateTime<Utc>,
        account: AccountId,
        amount: u128,
    },
    Liquidated {
        id: Uuid,
        at: DateTime<Utc>,
        target: AccountId,
        liquidator: AccountId,
        asset: AssetId,
        debt_covered: u128,
        collateral_seized: u128,
    },
}

impl Event {
    pub fn id(&self) -> Uuid {
        match self {
            Event::CollateralDeposited { id, .. }
            | Event::CollateralRedeemed { id, .. }
            | Event::DebtMinted { id, .. }
            | Event::DebtBurned { id, .. }
            | Event::Liquidated { id, .. } => *id,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::CollateralDeposited { at, .. }
            | Event::CollateralRedeemed { at, .. }
            | Event::DebtMinted { at, .. }
            | Event::DebtBurned { at, .. }
            | Event::Liquidated { at, .. } => *at,
        }
    }

    /// Short operation label, for logs and CLI listings.
    pub fn label(&self) -> &'static str {
        match self {
            Event::CollateralDeposited { .. } => "deposit",
            Event::CollateralRedeemed { .. } => "redeem",
            Event::DebtMinted { .. } => "mint",
            Event::DebtBurned { .. } => "burn",
            Event::Liquidated { .. } => "liquidate",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::CollateralDeposited {
                account,
                asset,
                amount,
                ..
            } => write!(f, "deposit {} {} by {}", amount, asset, account),
            Event::CollateralRedeemed {
                account,
                asset,
                amount,
                ..
            } => write!(f, "redeem {} {} by {}", amount, asset, account),
            Event::DebtMinted {
                account, amount, ..
            } => write!(f, "mint {} debt to {}", amount, account),
            Event::DebtBurned {
                account, amount, ..
            } => write!(f, "burn {} debt from {}", amount, account),
            Event::Liquidated {
                target,
                liquidator,
                asset,
                debt_covered,
                collateral_seized,
                ..
            } => write!(
                f,
                "liquidate {}: {} covered {} debt, seized {} {}",
                target, liquidator, debt_covered, collateral_seized, asset
            ),
        }
    }
}
