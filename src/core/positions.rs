use crate::core::account::AccountId;
use crate::core::asset::AssetId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Errors arising from balance mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BalanceError {
    #[error("insufficient balance: have {available}, requested {requested}")]
    Insufficient { available: u128, requested: u128 },
    #[error("balance overflow")]
    Overflow,
}

/// The authoritative per-account balances of the engine.
///
/// Two independently-mutable maps: collateral deposited per asset, and
/// aggregate minted debt. Accounts that have never been touched read as
/// zero; entries decay back to zero through redemption, burn, or
/// liquidation and are never explicitly destroyed.
///
/// Debits are checked: reducing a balance below zero is an error, never
/// a wrap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Positions {
    /// (AccountId, AssetId) -> collateral amount in smallest units.
    #[serde(with = "collateral_serde")]
    collateral: HashMap<(AccountId, AssetId), u128>,
    /// AccountId -> minted debt in smallest units (18 decimals).
    debt: HashMap<AccountId, u128>,
}

mod collateral_serde {
    use super::*;
    use serde::de::{self, MapAccess, Visitor};
    use serde::ser::SerializeMap;

    pub fn serialize<S: serde::Serializer>(
        collateral: &HashMap<(AccountId, AssetId), u128>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(collateral.len()))?;
        for ((account, asset), amount) in collateral {
            map.serialize_entry(&format!("{}:{}", account, asset), amount)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<(AccountId, AssetId), u128>, D::Error> {
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = HashMap<(AccountId, AssetId), u128>;
            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map with \"account:asset\" keys")
            }
            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
                let mut map = HashMap::new();
                while let Some((key, value)) = access.next_entry::<String, u128>()? {
                    let (account, asset) = key
                        .split_once(':')
                        .ok_or_else(|| de::Error::custom(format!("invalid key: {key}")))?;
                    map.insert((AccountId::new(account), AssetId::new(asset)), value);
                }
                Ok(map)
            }
        }
        deserializer.deserialize_map(V)
    }
}

impl Positions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collateral balance of an account in a specific asset (zero if
    /// never touched).
    pub fn collateral_of(&self, account: &AccountId, asset: &AssetId) -> u128 {
        self.collateral
            .get(&(account.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Minted debt of an account (zero if never touched).
    pub fn debt_of(&self, account: &AccountId) -> u128 {
        self.debt.get(account).copied().unwrap_or(0)
    }

    /// Increase an account's collateral balance.
    pub fn credit_collateral(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        amount: u128,
    ) -> Result<(), BalanceError> {
        let entry = self
            .collateral
            .entry((account.clone(), asset.clone()))
            .or_insert(0);
        *entry = entry.checked_add(amount).ok_or(BalanceError::Overflow)?;
        Ok(())
    }

    /// Decrease an account's collateral balance. Fails if `amount`
    /// exceeds the recorded balance.
    pub fn debit_collateral(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        amount: u128,
    ) -> Result<(), BalanceError> {
        let available = self.collateral_of(account, asset);
        let remaining = available
            .checked_sub(amount)
            .ok_or(BalanceError::Insufficient {
                available,
                requested: amount,
            })?;
        self.collateral
            .insert((account.clone(), asset.clone()), remaining);
        Ok(())
    }

    /// Increase an account's minted debt.
    pub fn raise_debt(&mut self, account: &AccountId, amount: u128) -> Result<(), BalanceError> {
        let entry = self.debt.entry(account.clone()).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(BalanceError::Overflow)?;
        Ok(())
    }

    /// Decrease an account's minted debt. Fails if `amount` exceeds the
    /// recorded debt.
    pub fn lower_debt(&mut self, account: &AccountId, amount: u128) -> Result<(), BalanceError> {
        let available = self.debt_of(account);
        let remaining = available
            .checked_sub(amount)
            .ok_or(BalanceError::Insufficient {
                available,
                requested: amount,
            })?;
        self.debt.insert(account.clone(), remaining);
        Ok(())
    }

    /// Every account with any recorded entry, in sorted order.
    pub fn accounts(&self) -> Vec<AccountId> {
        let mut seen: BTreeSet<AccountId> = self.debt.keys().cloned().collect();
        seen.extend(self.collateral.keys().map(|(account, _)| account.clone()));
        seen.into_iter().collect()
    }

    /// Total collateral recorded across all accounts for one asset.
    pub fn total_collateral(&self, asset: &AssetId) -> u128 {
        self.collateral
            .iter()
            .filter(|((_, a), _)| a == asset)
            .map(|(_, amount)| amount)
            .sum()
    }

    /// Total minted debt across all accounts.
    pub fn total_debt(&self) -> u128 {
        self.debt.values().sum()
    }
}
