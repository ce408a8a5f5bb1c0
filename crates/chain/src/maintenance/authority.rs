//! Threshold multisig authorities and the two weight-normalization schemes
//! used to build them from vote totals.
//!
//! Authorities store 16-bit weights, so raw stake is shifted down until the
//! largest value fits. Which scheme applies is decided once per pass from
//! the head block time, see [`AuthorityWeighting::for_time`].

use crate::params::ProtocolSchedule;
use dpos_common::{AccountId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of significant bits kept when scaling vote totals into weights.
const WEIGHT_BITS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Authority {
    pub weight_threshold: u32,
    pub account_auths: BTreeMap<AccountId, u16>,
}

impl Authority {
    pub fn total_weight(&self) -> u64 {
        self.account_auths.values().map(|w| *w as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.account_auths.is_empty()
    }

    pub fn weight_of(&self, account: AccountId) -> u16 {
        self.account_auths.get(&account).copied().unwrap_or(0)
    }
}

/// Bits to drop so that `total` fits in [`WEIGHT_BITS`] bits.
fn bits_to_drop(total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let msb = 63 - total.leading_zeros();
    msb.saturating_sub(WEIGHT_BITS - 1)
}

fn scaled_weight(votes: u64, shift: u32) -> u16 {
    (votes >> shift).clamp(1, u16::MAX as u64) as u16
}

/// How a role's authority is derived from its members' votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorityWeighting {
    /// Shift every weight by the bit length of the vote sum.
    LegacyBitShift,
    /// Shift every weight by the bit length of the largest entry.
    NormalizedVoteCounter,
}

impl AuthorityWeighting {
    pub fn for_time(now: Timestamp, schedule: &ProtocolSchedule) -> Self {
        if now < schedule.normalized_authority_time {
            AuthorityWeighting::LegacyBitShift
        } else {
            AuthorityWeighting::NormalizedVoteCounter
        }
    }

    /// Rewrite `authority` from `(account, votes)` entries given in rank
    /// order (votes non-increasing).
    pub fn apply(self, authority: &mut Authority, members: &[(AccountId, u64)]) {
        match self {
            AuthorityWeighting::LegacyBitShift => {
                *authority = legacy_authority(members);
            }
            AuthorityWeighting::NormalizedVoteCounter => {
                let mut vc = VoteCounter::new();
                for (account, votes) in members {
                    vc.add(*account, (*votes).max(1));
                }
                vc.finish(authority);
            }
        }
    }
}

/// Legacy scheme. The first entry for an account wins, but the shift is
/// computed over every entry including duplicates.
pub fn legacy_authority(members: &[(AccountId, u64)]) -> Authority {
    let mut weights: BTreeMap<AccountId, u64> = BTreeMap::new();
    let mut total: u64 = 0;
    for (account, votes) in members {
        weights.entry(*account).or_insert(*votes);
        total = total.saturating_add(*votes);
    }

    let shift = bits_to_drop(total);
    let mut out = Authority::default();
    let mut threshold: u32 = 0;
    for (account, votes) in weights {
        let w = scaled_weight(votes, shift);
        *out.account_auths.entry(account).or_insert(0) += w;
        threshold += w as u32;
    }
    out.weight_threshold = threshold / 2 + 1;
    out
}

/// Authority requiring strictly more than two thirds of the total weight.
/// Weights are scaled like [`legacy_authority`] but duplicate accounts
/// accumulate.
pub fn two_thirds_authority(members: &[(AccountId, u64)]) -> Authority {
    let total: u64 = members.iter().fold(0u64, |acc, (_, v)| acc.saturating_add(*v));
    let shift = bits_to_drop(total);

    let mut out = Authority::default();
    let mut threshold: u32 = 0;
    for (account, votes) in members {
        let w = scaled_weight(*votes, shift);
        let entry = out.account_auths.entry(*account).or_insert(0);
        *entry = entry.saturating_add(w);
        threshold += w as u32;
    }
    out.weight_threshold = threshold * 2 / 3 + 1;
    out
}

/// Accumulates weights from entries fed in non-increasing order. The shift
/// is fixed by the first (largest) entry, so the top weight always keeps
/// full 16-bit resolution.
#[derive(Debug, Clone, Default)]
pub struct VoteCounter {
    last_votes: u64,
    total_votes: u64,
    bitshift: Option<u32>,
    auth: Authority,
}

impl VoteCounter {
    pub fn new() -> Self {
        Self {
            last_votes: u64::MAX,
            ..Default::default()
        }
    }

    pub fn add(&mut self, who: AccountId, votes: u64) {
        if votes == 0 {
            return;
        }
        debug_assert!(votes <= self.last_votes, "vote counter fed out of order");
        self.last_votes = votes;

        let shift = *self.bitshift.get_or_insert_with(|| bits_to_drop(votes));
        let scaled = scaled_weight(votes, shift);
        self.total_votes += scaled as u64;
        let weight = self.auth.account_auths.entry(who).or_insert(0);
        *weight = weight.saturating_add(scaled);
    }

    pub fn is_empty(&self) -> bool {
        self.total_votes == 0
    }

    /// Replace `out` with the accumulated authority. Leaves `out` untouched
    /// when nothing was added.
    pub fn finish(&self, out: &mut Authority) {
        if self.total_votes == 0 {
            return;
        }
        let total = self.total_votes.min(u32::MAX as u64) as u32;
        let mut auth = self.auth.clone();
        auth.weight_threshold = (total >> 1) + 1;
        *out = auth;
    }
}
