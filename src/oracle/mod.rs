//! Price oracle interface and freshness policy.
//!
//! The engine never persists a price: every valuation re-fetches a
//! [`PriceQuote`] from the configured [`PriceSource`] and rejects it
//! outright if it is non-positive or older than the staleness bound.
//! A stale price is a hard error, never a stale-but-usable value.

use crate::core::fixed::{pow10, WAD_DECIMALS};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default maximum tolerated quote age: three hours.
pub const DEFAULT_STALENESS_SECS: i64 = 3 * 60 * 60;

/// Identifier of a price feed backing an accepted collateral asset.
///
/// # Examples
///
/// ```
/// use issuance_engine::oracle::FeedId;
///
/// let eth_usd = FeedId::new("ETH/USD");
/// let btc_usd = FeedId::new("BTC/USD");
/// assert_ne!(eth_usd, btc_usd);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedId(String);

impl FeedId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FeedId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Errors arising from oracle reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("no price feed found for {feed}")]
    FeedNotFound { feed: FeedId },
    #[error("feed {feed} returned a non-positive price {price}")]
    InvalidPrice { feed: FeedId, price: i64 },
    #[error("feed {feed} is stale: quote is {age_secs}s old, bound is {bound_secs}s")]
    StalePrice {
        feed: FeedId,
        age_secs: i64,
        bound_secs: i64,
    },
}

/// A point-in-time price observation from a feed.
///
/// `price` carries `decimals` fractional digits (Chainlink-style feeds
/// report 8). Quotes are ephemeral: fetched per valuation, checked for
/// freshness, scaled, and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Signed fixed-point price with `decimals` fractional digits.
    pub price: i64,
    /// Number of fractional digits in `price`.
    pub decimals: u32,
    /// When the feed last updated this quote.
    pub as_of: DateTime<Utc>,
}

impl PriceQuote {
    pub fn new(price: i64, decimals: u32, as_of: DateTime<Utc>) -> Self {
        Self {
            price,
            decimals,
            as_of,
        }
    }

    /// Age of this quote relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.as_of
    }

    /// Validate the quote against `now` and `bound`, then scale the
    /// price to the shared 18-decimal precision.
    ///
    /// Feeds reporting more than 18 decimals are truncated down to 18.
    pub fn price_wad(
        &self,
        feed: &FeedId,
        now: DateTime<Utc>,
        bound: Duration,
    ) -> Result<u128, PriceError> {
        if self.price <= 0 {
            return Err(PriceError::InvalidPrice {
                feed: feed.clone(),
                price: self.price,
            });
        }
        let age = self.age(now);
        if age > bound {
            return Err(PriceError::StalePrice {
                feed: feed.clone(),
                age_secs: age.num_seconds(),
                bound_secs: bound.num_seconds(),
            });
        }
        let raw = self.price as u128;
        let scaled = if self.decimals <= WAD_DECIMALS {
            let factor = pow10(WAD_DECIMALS - self.decimals).ok_or_else(|| {
                PriceError::InvalidPrice {
                    feed: feed.clone(),
                    price: self.price,
                }
            })?;
            raw.checked_mul(factor)
        } else {
            pow10(self.decimals - WAD_DECIMALS).map(|factor| raw / factor)
        };
        scaled.ok_or_else(|| PriceError::InvalidPrice {
            feed: feed.clone(),
            price: self.price,
        })
    }
}

/// Read-only source of price quotes, one feed per accepted asset.
///
/// Implementations return `None` for unknown feeds; the caller maps
/// that to [`PriceError::FeedNotFound`]. Freshness and sign checks are
/// the caller's responsibility via [`PriceQuote::price_wad`].
pub trait PriceSource {
    fn latest_quote(&self, feed: &FeedId) -> Option<PriceQuote>;
}

/// Default staleness bound as a [`Duration`].
pub fn default_staleness_bound() -> Duration {
    Duration::seconds(DEFAULT_STALENESS_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::WAD;

    fn eth_feed() -> FeedId {
        FeedId::new("ETH/USD")
    }

    #[test]
    fn test_fresh_quote_scales_to_wad() {
        let now = Utc::now();
        // $2000 with 8 feed decimals.
        let quote = PriceQuote::new(2_000_0000_0000, 8, now);
        let wad = quote
            .price_wad(&eth_feed(), now, default_staleness_bound())
            .unwrap();
        assert_eq!(wad, 2_000 * WAD);
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let now = Utc::now();
        for price in [0, -1] {
            let quote = PriceQuote::new(price, 8, now);
            let err = quote
                .price_wad(&eth_feed(), now, default_staleness_bound())
                .unwrap_err();
            assert!(matches!(err, PriceError::InvalidPrice { .. }));
        }
    }

    #[test]
    fn test_stale_quote_rejected() {
        let now = Utc::now();
        let quote = PriceQuote::new(2_000_0000_0000, 8, now - Duration::hours(4));
        let err = quote
            .price_wad(&eth_feed(), now, default_staleness_bound())
            .unwrap_err();
        assert!(matches!(err, PriceError::StalePrice { .. }));
    }

    #[test]
    fn test_quote_at_exact_bound_is_fresh() {
        let now = Utc::now();
        let bound = default_staleness_bound();
        let quote = PriceQuote::new(100_0000_0000, 8, now - bound);
        assert!(quote.price_wad(&eth_feed(), now, bound).is_ok());
    }

    #[test]
    fn test_high_precision_feed_truncates() {
        let now = Utc::now();
        // 20 feed decimals get truncated down to 18.
        let quote = PriceQuote::new(1_234_567, 20, now);
        let wad = quote
            .price_wad(&eth_feed(), now, default_staleness_bound())
            .unwrap();
        assert_eq!(wad, 12_345);
    }
}
