//! Asset amounts and exchange rates.

use crate::ids::AssetId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ledger amount in the smallest unit of its asset.
pub type Share = i64;

/// Upper bound on the supply of any asset.
pub const MAX_SHARE_SUPPLY: Share = 1_000_000_000_000_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("asset {amount} is neither side of price {base}/{quote}")]
    AssetMismatch {
        amount: AssetId,
        base: AssetId,
        quote: AssetId,
    },

    #[error("price has a zero side")]
    ZeroPrice,

    #[error("conversion result exceeds maximum share supply")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetAmount {
    pub amount: Share,
    pub asset_id: AssetId,
}

impl AssetAmount {
    pub const fn new(amount: Share, asset_id: AssetId) -> Self {
        Self { amount, asset_id }
    }
}

/// `base.amount` units of `base.asset_id` trade for `quote.amount` units of
/// `quote.asset_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub base: AssetAmount,
    pub quote: AssetAmount,
}

impl Price {
    pub const fn new(base: AssetAmount, quote: AssetAmount) -> Self {
        Self { base, quote }
    }

    /// One-to-one self price, the default rate of the core asset.
    pub const fn unit(asset_id: AssetId) -> Self {
        Self {
            base: AssetAmount::new(1, asset_id),
            quote: AssetAmount::new(1, asset_id),
        }
    }

    pub fn is_null(&self) -> bool {
        self.base.amount == 0 || self.quote.amount == 0
    }

    /// Convert `amount` to the other side of this price, truncating.
    pub fn convert(&self, amount: AssetAmount) -> Result<AssetAmount, PriceError> {
        if self.is_null() {
            return Err(PriceError::ZeroPrice);
        }
        let (num, den, out_asset) = if amount.asset_id == self.base.asset_id {
            (self.quote.amount, self.base.amount, self.quote.asset_id)
        } else if amount.asset_id == self.quote.asset_id {
            (self.base.amount, self.quote.amount, self.base.asset_id)
        } else {
            return Err(PriceError::AssetMismatch {
                amount: amount.asset_id,
                base: self.base.asset_id,
                quote: self.quote.asset_id,
            });
        };
        let result = (amount.amount as i128) * (num as i128) / (den as i128);
        if result > MAX_SHARE_SUPPLY as i128 || result < -(MAX_SHARE_SUPPLY as i128) {
            return Err(PriceError::Overflow);
        }
        Ok(AssetAmount::new(result as Share, out_asset))
    }
}

impl std::ops::Mul<Price> for AssetAmount {
    type Output = Result<AssetAmount, PriceError>;

    fn mul(self, rhs: Price) -> Self::Output {
        rhs.convert(self)
    }
}
