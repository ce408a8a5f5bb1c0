//! # DPoS Common Crate
//!
//! Primitives shared by every crate of the chain.
//!
//! ## Modules
//! - `ids`: typed object identifiers and reserved accounts
//! - `time`: block timestamps
//! - `price`: amounts, exchange rates and conversion
//! - `config`: TOML config loading

pub mod config;
pub mod ids;
pub mod price;
pub mod time;

pub use ids::{
    AccountId, AssetId, CommitteeMemberId, FbaAccumulatorId, SonId, SonWalletId, VestingBalanceId,
    VoteSlot, WitnessId, WorkerId,
};
pub use price::{AssetAmount, Price, PriceError, Share, MAX_SHARE_SUPPLY};
pub use time::{Timestamp, SECONDS_PER_DAY};
