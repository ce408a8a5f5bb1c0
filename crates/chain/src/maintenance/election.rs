//! Set-size derivation and top-K candidate selection, shared by every
//! elected role.
//!
//! Roles differ only in how their size is chosen and which authority they
//! rewrite; [`RoleConfig`] carries those differences and [`elect`] does the
//! rest. Witness and committee updates live here. SONs need wallet and
//! status handling on top and live in `son.rs`.

use super::authority::AuthorityWeighting;
use super::tally::VoteTally;
use crate::error::{MaintenanceError, MaintenanceResult};
use crate::state::{ChainState, CommitteeMember, Witness};
use dpos_common::ids::{COMMITTEE_ACCOUNT, RELAXED_COMMITTEE_ACCOUNT, WITNESS_ACCOUNT};
use dpos_common::{AccountId, CommitteeMemberId, VoteSlot, WitnessId};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Witness,
    Committee,
    Son,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Witness => "witness",
            Role::Committee => "committee",
            Role::Son => "SON",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePolicy {
    /// Stake-weighted median of voter preferences, never below `min_count`.
    Histogram { min_count: usize },
    Fixed(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleConfig {
    pub role: Role,
    pub size: SizePolicy,
    pub weighting: AuthorityWeighting,
}

impl RoleConfig {
    pub fn witness(state: &ChainState, weighting: AuthorityWeighting) -> Self {
        Self {
            role: Role::Witness,
            size: SizePolicy::Histogram {
                min_count: state.parameters().min_witness_count as usize,
            },
            weighting,
        }
    }

    pub fn committee(state: &ChainState, weighting: AuthorityWeighting) -> Self {
        Self {
            role: Role::Committee,
            size: SizePolicy::Histogram {
                min_count: state.parameters().min_committee_count as usize,
            },
            weighting,
        }
    }

    pub fn son(state: &ChainState, weighting: AuthorityWeighting) -> Self {
        Self {
            role: Role::Son,
            size: SizePolicy::Fixed(state.parameters().max_son_count as usize),
            weighting,
        }
    }

    /// Number of seats to fill this interval.
    pub fn seats(&self, tally: &VoteTally) -> usize {
        match self.size {
            SizePolicy::Histogram { min_count } => {
                let target = target_count(tally.histogram(self.role), tally.total_voting_stake());
                (target * 2 + 1).max(min_count)
            }
            SizePolicy::Fixed(n) => n,
        }
    }
}

/// Histogram bucket at which the cumulative stake first exceeds half of the
/// stake that expressed a preference. Bucket 0 voters abstain.
pub fn target_count(histogram: &[u64], total_voting_stake: u64) -> usize {
    let Some(abstained) = histogram.first() else {
        return 0;
    };
    let stake_target = total_voting_stake.saturating_sub(*abstained) / 2;
    let mut count = 0usize;
    if stake_target > 0 {
        let mut stake_tally: u64 = 0;
        while count < histogram.len() - 1 && stake_tally <= stake_target {
            count += 1;
            stake_tally = stake_tally.saturating_add(histogram[count]);
        }
    }
    count
}

/// Anything that can be voted into a role.
pub trait Candidate {
    type Id: Copy + Ord + fmt::Display;

    fn id(&self) -> Self::Id;
    fn account(&self) -> AccountId;
    fn vote_slot(&self) -> VoteSlot;
}

impl Candidate for Witness {
    type Id = WitnessId;
    fn id(&self) -> WitnessId {
        self.id
    }
    fn account(&self) -> AccountId {
        self.account
    }
    fn vote_slot(&self) -> VoteSlot {
        self.vote_slot
    }
}

impl Candidate for CommitteeMember {
    type Id = CommitteeMemberId;
    fn id(&self) -> CommitteeMemberId {
        self.id
    }
    fn account(&self) -> AccountId {
        self.account
    }
    fn vote_slot(&self) -> VoteSlot {
        self.vote_slot
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ranked<I> {
    pub id: I,
    pub account: AccountId,
    pub votes: u64,
}

/// The `k` best candidates by `(votes desc, id asc)`. Returns fewer when
/// fewer candidates exist.
pub fn elect_top_k<'a, C, It>(candidates: It, tally: &VoteTally, k: usize) -> Vec<Ranked<C::Id>>
where
    C: Candidate + 'a,
    It: IntoIterator<Item = &'a C>,
{
    let mut ranked: Vec<Ranked<C::Id>> = candidates
        .into_iter()
        .map(|c| Ranked {
            id: c.id(),
            account: c.account(),
            votes: tally.votes_for(c.vote_slot()),
        })
        .collect();
    let k = k.min(ranked.len());
    if k < ranked.len() {
        ranked.select_nth_unstable_by_key(k, |r| (Reverse(r.votes), r.id));
        ranked.truncate(k);
    }
    ranked.sort_by_key(|r| (Reverse(r.votes), r.id));
    ranked
}

/// Size the role and pick its members.
pub fn elect<'a, C, It>(config: &RoleConfig, candidates: It, tally: &VoteTally) -> Vec<Ranked<C::Id>>
where
    C: Candidate + 'a,
    It: IntoIterator<Item = &'a C>,
{
    let seats = config.seats(tally);
    let selected = elect_top_k(candidates, tally, seats);
    debug!(
        role = %config.role,
        seats,
        selected = selected.len(),
        "Role elected"
    );
    selected
}

pub(crate) fn authority_members<I>(selected: &[Ranked<I>]) -> Vec<(AccountId, u64)> {
    selected.iter().map(|r| (r.account, r.votes)).collect()
}

/// What an election pass changed for one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionSummary {
    pub role: Role,
    pub seats: usize,
    pub selected: usize,
    pub changed: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// WITNESSES
// ════════════════════════════════════════════════════════════════════════════

pub fn update_active_witnesses(
    state: &mut ChainState,
    tally: &VoteTally,
    weighting: AuthorityWeighting,
) -> MaintenanceResult<ElectionSummary> {
    let config = RoleConfig::witness(state, weighting);
    let required = state.parameters().min_witness_count as usize;
    if state.witnesses.len() < required {
        return Err(MaintenanceError::InsufficientCandidates {
            role: Role::Witness,
            available: state.witnesses.len(),
            required,
        });
    }

    let selected = elect(&config, state.witnesses.values(), tally);

    for w in state.witnesses.values_mut() {
        w.total_votes = tally.votes_for(w.vote_slot);
    }

    let account = state
        .accounts
        .get_mut(&WITNESS_ACCOUNT)
        .ok_or_else(|| MaintenanceError::unknown("account", WITNESS_ACCOUNT))?;
    weighting.apply(&mut account.active, &authority_members(&selected));

    let mut active: Vec<WitnessId> = selected.iter().map(|r| r.id).collect();
    active.sort();
    let changed = active != state.global.active_witnesses;
    state.global.active_witnesses = active.clone();
    state.global.witness_schedule = active;

    info!(
        seats = config.seats(tally),
        active = state.global.active_witnesses.len(),
        changed,
        "Active witnesses updated"
    );
    Ok(ElectionSummary {
        role: Role::Witness,
        seats: config.seats(tally),
        selected: selected.len(),
        changed,
    })
}

// ════════════════════════════════════════════════════════════════════════════
// COMMITTEE
// ════════════════════════════════════════════════════════════════════════════

/// Only selected members get their totals refreshed. The committee authority
/// is left alone when nobody is selected, and the relaxed committee account
/// mirrors whatever the committee account ends up with.
pub fn update_active_committee_members(
    state: &mut ChainState,
    tally: &VoteTally,
    weighting: AuthorityWeighting,
) -> MaintenanceResult<ElectionSummary> {
    let config = RoleConfig::committee(state, weighting);
    let selected = elect(&config, state.committee_members.values(), tally);

    for r in &selected {
        if let Some(cm) = state.committee_members.get_mut(&r.id) {
            cm.total_votes = r.votes;
        }
    }

    if !selected.is_empty() {
        let committee = state
            .accounts
            .get_mut(&COMMITTEE_ACCOUNT)
            .ok_or_else(|| MaintenanceError::unknown("account", COMMITTEE_ACCOUNT))?;
        weighting.apply(&mut committee.active, &authority_members(&selected));
        let mirrored = committee.active.clone();

        let relaxed = state
            .accounts
            .get_mut(&RELAXED_COMMITTEE_ACCOUNT)
            .ok_or_else(|| MaintenanceError::unknown("account", RELAXED_COMMITTEE_ACCOUNT))?;
        relaxed.active = mirrored;
    }

    let active: Vec<CommitteeMemberId> = selected.iter().map(|r| r.id).collect();
    let changed = active != state.global.active_committee_members;
    state.global.active_committee_members = active;

    info!(
        active = selected.len(),
        changed,
        "Active committee updated"
    );
    Ok(ElectionSummary {
        role: Role::Committee,
        seats: config.seats(tally),
        selected: selected.len(),
        changed,
    })
}
