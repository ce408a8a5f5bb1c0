//! Object identifiers.
//!
//! Every ledger object is addressed by a typed numeric id. Ids render in the
//! `space.type.instance` form used by block explorers, e.g. `1.2.17` for an
//! account.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident, $space:expr, $kind:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn new(instance: u64) -> Self {
                $name(instance)
            }

            pub const fn instance(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{}.{}", $space, $kind, self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                $name(v)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

object_id!(
    /// Account id (`1.2.x`).
    AccountId, 1, 2
);
object_id!(
    /// Asset id (`1.3.x`).
    AssetId, 1, 3
);
object_id!(
    /// Witness (block producer) id (`1.6.x`).
    WitnessId, 1, 6
);
object_id!(CommitteeMemberId, 1, 5);
object_id!(WorkerId, 1, 14);
object_id!(VestingBalanceId, 1, 13);
object_id!(
    /// Sidechain operator node id.
    SonId, 1, 33
);
object_id!(SonWalletId, 1, 35);
object_id!(
    /// Fee-backed-asset accumulator (`2.16.x`).
    FbaAccumulatorId, 2, 16
);

/// Global vote identifier. Every votable object owns one (or two, for
/// workers). Slots are allocated from a single counter and never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteSlot(pub u32);

impl VoteSlot {
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VoteSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vote:{}", self.0)
    }
}

impl fmt::Debug for VoteSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VoteSlot({})", self.0)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// RESERVED ACCOUNTS
// ════════════════════════════════════════════════════════════════════════════

/// Multisig account controlled by the active committee.
pub const COMMITTEE_ACCOUNT: AccountId = AccountId(0);
/// Multisig account controlled by the active witnesses.
pub const WITNESS_ACCOUNT: AccountId = AccountId(1);
/// Same authority as the committee account, fewer restrictions on proposals.
pub const RELAXED_COMMITTEE_ACCOUNT: AccountId = AccountId(2);
/// Funds sent here are unrecoverable.
pub const NULL_ACCOUNT: AccountId = AccountId(3);
pub const TEMP_ACCOUNT: AccountId = AccountId(4);
/// Sentinel `voting_account` meaning "my own votes are my opinion".
pub const PROXY_TO_SELF_ACCOUNT: AccountId = AccountId(5);
/// Multisig account controlled by the active SONs.
pub const SON_ACCOUNT: AccountId = AccountId(7);

/// The native asset.
pub const CORE_ASSET: AssetId = AssetId(0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_dotted_form() {
        assert_eq!(AccountId(17).to_string(), "1.2.17");
        assert_eq!(CORE_ASSET.to_string(), "1.3.0");
        assert_eq!(format!("{:?}", WitnessId(4)), "WitnessId(1.6.4)");
    }

    #[test]
    fn test_ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&AccountId(42)).expect("serialize");
        assert_eq!(json, "42");
        let back: VoteSlot = serde_json::from_str("9").expect("deserialize");
        assert_eq!(back, VoteSlot(9));
    }

    #[test]
    fn test_ordering_follows_instance() {
        let mut ids = vec![SonId(3), SonId(1), SonId(2)];
        ids.sort();
        assert_eq!(ids, vec![SonId(1), SonId(2), SonId(3)]);
    }
}
