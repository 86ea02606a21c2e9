use crate::core::asset::AssetId;
use crate::core::positions::BalanceError;
use crate::engine::solvency::HealthFactor;
use crate::oracle::PriceError;
use thiserror::Error;

/// Errors aborting an engine operation.
///
/// Every variant is a hard abort: the whole operation unwinds, no
/// partial state change survives, and nothing is retried internally.
/// The caller corrects the condition (more collateral, smaller amount,
/// fresher price data) and submits a fresh operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A positive amount was required.
    #[error("amount must be positive")]
    ZeroAmount,

    /// The referenced asset is not in the collateral registry.
    #[error("asset {0} is not accepted as collateral")]
    UnregisteredAsset(AssetId),

    /// The external token ledger reported a failed transfer.
    #[error("token transfer of {amount} {asset} reported failure")]
    TransferFailure { asset: AssetId, amount: u128 },

    /// The debt-token issuance authority declined to mint.
    #[error("debt token issuance of {amount} declined")]
    IssuanceFailure { amount: u128 },

    /// Redemption or burn amount exceeds the recorded balance.
    #[error("insufficient balance: have {available}, requested {requested}")]
    InsufficientBalance { available: u128, requested: u128 },

    /// The operation would leave the account undercollateralized.
    #[error("health factor {health_factor} is below the minimum")]
    SolvencyViolation { health_factor: HealthFactor },

    /// Liquidation target is not below the minimum health factor.
    #[error("target health factor {health_factor} is not below the minimum")]
    LiquidationNotEligible { health_factor: HealthFactor },

    /// Liquidation completed without restoring the target strictly
    /// above the minimum health factor.
    #[error("liquidation left target at health factor {health_factor}")]
    LiquidationIneffective { health_factor: HealthFactor },

    /// Oracle data was missing, non-positive, or stale.
    #[error(transparent)]
    Price(#[from] PriceError),

    /// A fixed-point computation left the representable range.
    #[error("fixed-point arithmetic overflow")]
    ArithmeticOverflow,

    /// A mutating entry point was re-entered while an operation was in
    /// progress.
    #[error("reentrant call into a mutating operation")]
    ReentrantCall,
}

impl From<BalanceError> for EngineError {
    fn from(err: BalanceError) -> Self {
        match err {
            BalanceError::Insufficient {
                available,
                requested,
            } => EngineError::InsufficientBalance {
                available,
                requested,
            },
            BalanceError::Overflow => EngineError::ArithmeticOverflow,
        }
    }
}
