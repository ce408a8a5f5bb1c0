//! Fatal maintenance errors.
//!
//! Any of these aborts the whole pass and, with it, the block that triggered
//! it. Per-asset conditions that only skip work for one interval are not
//! errors; see [`crate::maintenance::dividend::SkipReason`].

use crate::maintenance::election::Role;
use dpos_common::{AccountId, AssetId, Share};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MaintenanceError {
    /// Consensus parameters that can never produce a valid pass.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("insufficient {role} candidates: {available} registered, at least {required} required")]
    InsufficientCandidates {
        role: Role,
        available: usize,
        required: usize,
    },

    /// Consensus bug. Two independent computations disagree.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("unknown {kind} {id}")]
    UnknownObject { kind: &'static str, id: String },

    #[error("account {account} holds {available} of asset {asset}, cannot debit {requested}")]
    InsufficientBalance {
        account: AccountId,
        asset: AssetId,
        available: Share,
        requested: Share,
    },

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
}

impl MaintenanceError {
    pub fn unknown(kind: &'static str, id: impl std::fmt::Display) -> Self {
        MaintenanceError::UnknownObject {
            kind,
            id: id.to_string(),
        }
    }
}

pub type MaintenanceResult<T> = Result<T, MaintenanceError>;
