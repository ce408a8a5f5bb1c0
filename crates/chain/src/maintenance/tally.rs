//! Stake-weighted vote tally.
//!
//! A [`VoteTally`] is built from scratch at the start of each pass, owned by
//! the pass, and dropped when it ends. Nothing in it survives to the next
//! interval.

use super::election::Role;
use super::stake::{core_vesting_by_owner, counts_toward_tally, opinion_holder, voting_stake};
use crate::state::ChainState;
use dpos_common::VoteSlot;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTally {
    votes: Vec<u64>,
    witness_histogram: Vec<u64>,
    committee_histogram: Vec<u64>,
    son_histogram: Vec<u64>,
    total_voting_stake: u64,
}

/// Bucket `i` collects stake preferring `2i` or `2i + 1` members.
fn add_to_histogram(histogram: &mut [u64], preferred: u16, max_count: u16, stake: u64) {
    let pref = preferred.min(max_count) as usize;
    let bucket = (pref / 2).min(histogram.len() - 1);
    histogram[bucket] = histogram[bucket].saturating_add(stake);
}

impl VoteTally {
    /// Empty tally sized for the current vote slot counter and role limits.
    pub fn empty(state: &ChainState) -> Self {
        let params = state.parameters();
        Self {
            votes: vec![0; state.global.next_available_vote_slot as usize],
            witness_histogram: vec![0; params.max_witness_count as usize / 2 + 1],
            committee_histogram: vec![0; params.max_committee_count as usize / 2 + 1],
            son_histogram: vec![0; params.max_son_count as usize / 2 + 1],
            total_voting_stake: 0,
        }
    }

    pub fn build(state: &ChainState) -> Self {
        let mut tally = Self::empty(state);
        let params = state.parameters();
        let now = state.head_block_time();
        let core_vesting = core_vesting_by_owner(state);

        let mut counted = 0usize;
        let mut abstained = 0usize;
        for account in state.accounts() {
            if !counts_toward_tally(params, account, now) {
                continue;
            }
            let Some(opinion) = opinion_holder(state, account) else {
                abstained += 1;
                continue;
            };
            let stake = voting_stake(state, account, &core_vesting);

            for slot in &opinion.options.votes {
                if let Some(v) = tally.votes.get_mut(slot.index()) {
                    *v = v.saturating_add(stake);
                }
            }
            add_to_histogram(
                &mut tally.witness_histogram,
                opinion.options.num_witness,
                params.max_witness_count,
                stake,
            );
            add_to_histogram(
                &mut tally.committee_histogram,
                opinion.options.num_committee,
                params.max_committee_count,
                stake,
            );
            add_to_histogram(
                &mut tally.son_histogram,
                opinion.options.num_son,
                params.max_son_count,
                stake,
            );
            tally.total_voting_stake = tally.total_voting_stake.saturating_add(stake);
            counted += 1;
        }

        debug!(
            counted,
            abstained,
            total_voting_stake = tally.total_voting_stake,
            slots = tally.votes.len(),
            "Vote tally built"
        );
        tally
    }

    /// Stake voting for `slot`. Zero for slots outside the tally.
    pub fn votes_for(&self, slot: VoteSlot) -> u64 {
        self.votes.get(slot.index()).copied().unwrap_or(0)
    }

    pub fn histogram(&self, role: Role) -> &[u64] {
        match role {
            Role::Witness => &self.witness_histogram,
            Role::Committee => &self.committee_histogram,
            Role::Son => &self.son_histogram,
        }
    }

    pub fn total_voting_stake(&self) -> u64 {
        self.total_voting_stake
    }

    pub fn slot_count(&self) -> usize {
        self.votes.len()
    }
}
