use crate::oracle::FeedId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Identifier of a collateral asset accepted by the engine, or of the
/// synthetic dollar itself on the external token ledger.
///
/// # Examples
///
/// ```
/// use issuance_engine::core::asset::AssetId;
///
/// let weth = AssetId::new("WETH");
/// let wbtc = AssetId::new("WBTC");
/// assert_ne!(weth, wbtc);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Errors arising from registry construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("asset {0} is bound to a feed more than once")]
    DuplicateAsset(AssetId),
}

/// Per-asset configuration: the feed that prices it and the token's
/// native decimal precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Feed that prices this asset in USD.
    pub feed: FeedId,
    /// Decimals of the token's smallest unit.
    pub decimals: u32,
}

impl AssetConfig {
    /// Configuration with the conventional 18 token decimals.
    pub fn new(feed: FeedId) -> Self {
        Self { feed, decimals: 18 }
    }

    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }
}

/// The set of accepted collateral assets and their oracle bindings.
///
/// Built once at engine construction and immutable thereafter: no asset
/// is ever added, removed, or rebound. The ordered asset list exists
/// only for deterministic iteration when summing collateral value; it
/// carries no ranking. List and map cannot drift apart because both are
/// populated from the same entries in [`AssetRegistry::new`].
///
/// # Examples
///
/// ```
/// use issuance_engine::core::asset::{AssetConfig, AssetId, AssetRegistry};
/// use issuance_engine::oracle::FeedId;
///
/// let registry = AssetRegistry::new(vec![
///     (AssetId::new("WETH"), AssetConfig::new(FeedId::new("ETH/USD"))),
///     (AssetId::new("WBTC"), AssetConfig::new(FeedId::new("BTC/USD")).with_decimals(8)),
/// ])
/// .unwrap();
///
/// assert!(registry.is_registered(&AssetId::new("WETH")));
/// assert_eq!(registry.assets().len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRegistry {
    /// Accepted assets in registration order.
    assets: Vec<AssetId>,
    /// Asset -> feed binding and decimals.
    configs: HashMap<AssetId, AssetConfig>,
}

impl AssetRegistry {
    /// Build a registry from `(asset, config)` pairs.
    ///
    /// Registering the same asset twice is a construction error rather
    /// than a silent rebind.
    pub fn new(entries: Vec<(AssetId, AssetConfig)>) -> Result<Self, RegistryError> {
        let mut assets = Vec::with_capacity(entries.len());
        let mut configs = HashMap::with_capacity(entries.len());
        for (asset, config) in entries {
            if configs.insert(asset.clone(), config).is_some() {
                return Err(RegistryError::DuplicateAsset(asset));
            }
            assets.push(asset);
        }
        Ok(Self { assets, configs })
    }

    /// Whether `asset` is accepted as collateral.
    pub fn is_registered(&self, asset: &AssetId) -> bool {
        self.configs.contains_key(asset)
    }

    /// Feed binding and decimals for `asset`, if registered.
    pub fn config(&self, asset: &AssetId) -> Option<&AssetConfig> {
        self.configs.get(asset)
    }

    /// Accepted assets in stable registration order.
    pub fn assets(&self) -> &[AssetId] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weth() -> AssetId {
        AssetId::new("WETH")
    }

    #[test]
    fn test_registry_lookup() {
        let registry = AssetRegistry::new(vec![(
            weth(),
            AssetConfig::new(FeedId::new("ETH/USD")),
        )])
        .unwrap();

        assert!(registry.is_registered(&weth()));
        assert!(!registry.is_registered(&AssetId::new("DOGE")));
        assert_eq!(registry.config(&weth()).unwrap().decimals, 18);
    }

    #[test]
    fn test_registry_preserves_order() {
        let registry = AssetRegistry::new(vec![
            (AssetId::new("WBTC"), AssetConfig::new(FeedId::new("BTC/USD"))),
            (AssetId::new("WETH"), AssetConfig::new(FeedId::new("ETH/USD"))),
        ])
        .unwrap();

        let order: Vec<&str> = registry.assets().iter().map(|a| a.as_str()).collect();
        assert_eq!(order, vec!["WBTC", "WETH"]);
    }

    #[test]
    fn test_registry_rejects_duplicate() {
        let result = AssetRegistry::new(vec![
            (weth(), AssetConfig::new(FeedId::new("ETH/USD"))),
            (weth(), AssetConfig::new(FeedId::new("ETH/USD-alt"))),
        ]);
        assert_eq!(result.unwrap_err(), RegistryError::DuplicateAsset(weth()));
    }

    #[test]
    fn test_custom_decimals() {
        let config = AssetConfig::new(FeedId::new("BTC/USD")).with_decimals(8);
        assert_eq!(config.decimals, 8);
    }
}
