//! # Chain Maintenance
//!
//! The once-per-interval pass that turns a block's state into the next
//! interval's governance.
//!
//! ```text
//!   Idle
//!    │  block_time >= next_maintenance_time
//!    ▼
//!   Distributing   fba split, dividend scheduling and payouts
//!    ▼
//!   Tallying       stake-weighted votes and size histograms
//!    ▼
//!   Electing       top holders, witnesses, committee, SONs, worker votes
//!    ▼
//!   Scheduling     fee scale, pending parameters, next maintenance time
//!    ▼
//!   Budgeting      treasury allocation and supply change
//!    ▼
//!   Complete
//! ```
//!
//! The pass runs on a scratch copy of the state. An error in any phase
//! leaves the caller's state exactly as it was.

pub mod authority;
pub mod budget;
pub mod dividend;
pub mod election;
pub mod fba;
pub mod son;
pub mod special_authority;
pub mod stake;
pub mod tally;
pub mod worker;

use crate::error::MaintenanceResult;
use crate::state::{BudgetRecord, ChainState};
use authority::AuthorityWeighting;
use dividend::DividendPass;
use election::ElectionSummary;
use fba::FbaOutcome;
use son::SonSetChange;
use tally::VoteTally;

use dpos_common::{Share, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

// ════════════════════════════════════════════════════════════════════════════
// PHASES
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MaintenancePhase {
    Idle,
    Distributing,
    Tallying,
    Electing,
    Scheduling,
    Budgeting,
    Complete,
}

impl MaintenancePhase {
    pub fn next(self) -> Self {
        match self {
            MaintenancePhase::Idle => MaintenancePhase::Distributing,
            MaintenancePhase::Distributing => MaintenancePhase::Tallying,
            MaintenancePhase::Tallying => MaintenancePhase::Electing,
            MaintenancePhase::Electing => MaintenancePhase::Scheduling,
            MaintenancePhase::Scheduling => MaintenancePhase::Budgeting,
            MaintenancePhase::Budgeting | MaintenancePhase::Complete => MaintenancePhase::Complete,
        }
    }
}

impl fmt::Display for MaintenancePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MaintenancePhase::Idle => "idle",
            MaintenancePhase::Distributing => "distributing",
            MaintenancePhase::Tallying => "tallying",
            MaintenancePhase::Electing => "electing",
            MaintenancePhase::Scheduling => "scheduling",
            MaintenancePhase::Budgeting => "budgeting",
            MaintenancePhase::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// Everything one pass did, for logging and block-level events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub block_num: u32,
    pub block_time: Timestamp,
    /// Phases in the order they ran, ending with `Complete`.
    pub phases: Vec<MaintenancePhase>,
    pub weighting: AuthorityWeighting,
    pub fba: Vec<FbaOutcome>,
    pub dividends: DividendPass,
    pub total_voting_stake: u64,
    pub top_holder_authorities: usize,
    pub elections: Vec<ElectionSummary>,
    pub sons: SonSetChange,
    pub parameters_activated: bool,
    pub account_create_basic_fee: Share,
    pub next_maintenance_time: Timestamp,
    pub budget: BudgetRecord,
}

// ════════════════════════════════════════════════════════════════════════════
// SCHEDULE ARITHMETIC
// ════════════════════════════════════════════════════════════════════════════

/// Smallest `base + k * interval` with `k >= 1` that lies strictly after
/// `now`. Saturates at `Timestamp::MAX`.
pub fn next_boundary_after(base: Timestamp, interval: u32, now: Timestamp) -> Timestamp {
    let interval = interval.max(1) as u64;
    let elapsed = now.secs().saturating_sub(base.secs()) as u64;
    let k = elapsed / interval + 1;
    let next = base.secs() as u64 + k * interval;
    Timestamp(next.min(Timestamp::MAX.secs() as u64) as u32)
}

/// Time of the pass after the one running at `block_time`.
///
/// The first block aligns to the next multiple of the interval. Later passes
/// step from the previous schedule, skipping whole intervals that passed
/// without blocks.
pub fn next_maintenance_time(
    current_next: Timestamp,
    block_num: u32,
    block_time: Timestamp,
    interval: u32,
) -> Timestamp {
    if current_next > block_time {
        return current_next;
    }
    if block_num == 1 {
        next_boundary_after(Timestamp::ZERO, interval, block_time)
    } else {
        next_boundary_after(current_next, interval, block_time)
    }
}

/// `basic_fee` with the per-registration scaling of the closing interval
/// removed.
pub fn unscaled_account_fee(
    basic_fee: Share,
    bitshifts: u8,
    accounts_registered: u32,
    accounts_per_fee_scale: u16,
) -> Share {
    let steps = accounts_registered / accounts_per_fee_scale.max(1) as u32;
    let shift = bitshifts as u64 * steps as u64;
    if shift >= Share::BITS as u64 {
        return 0;
    }
    basic_fee >> shift
}

// ════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ════════════════════════════════════════════════════════════════════════════

/// Record the head block and run a pass if it is due.
pub fn maybe_perform_maintenance(
    state: &mut ChainState,
    block_num: u32,
    block_time: Timestamp,
) -> MaintenanceResult<Option<MaintenanceReport>> {
    state.dynamic.head_block_number = block_num;
    state.dynamic.head_block_time = block_time;
    if block_time < state.dynamic.next_maintenance_time {
        return Ok(None);
    }
    perform_chain_maintenance(state, block_num, block_time).map(Some)
}

/// Run one full pass at `block_num`/`block_time`. On error `state` is left
/// untouched.
pub fn perform_chain_maintenance(
    state: &mut ChainState,
    block_num: u32,
    block_time: Timestamp,
) -> MaintenanceResult<MaintenanceReport> {
    state.parameters().validate()?;

    let mut scratch = state.clone();
    scratch.dynamic.head_block_number = block_num;
    scratch.dynamic.head_block_time = block_time;

    let report = run_phases(&mut scratch, block_num, block_time)?;
    *state = scratch;
    Ok(report)
}

fn enter(phases: &mut Vec<MaintenancePhase>, block_num: u32) {
    let phase = phases.last().copied().unwrap_or(MaintenancePhase::Idle).next();
    debug!(block_num, phase = %phase, "Maintenance phase");
    phases.push(phase);
}

fn run_phases(
    state: &mut ChainState,
    block_num: u32,
    block_time: Timestamp,
) -> MaintenanceResult<MaintenanceReport> {
    info!(block_num, block_time = %block_time, "Chain maintenance started");
    let weighting = AuthorityWeighting::for_time(block_time, &state.schedule);
    let mut phases = Vec::with_capacity(6);

    // ─────────────────────────────────────────────────────────────
    enter(&mut phases, block_num);
    let fba = fba::distribute_fba_balances(state)?;
    let dividends = dividend::process_dividend_assets(state)?;

    // ─────────────────────────────────────────────────────────────
    enter(&mut phases, block_num);
    let tally = VoteTally::build(state);
    let total_voting_stake = tally.total_voting_stake();

    // ─────────────────────────────────────────────────────────────
    enter(&mut phases, block_num);
    let top_holder_authorities = special_authority::update_top_holder_authorities(state);
    let elections = vec![
        election::update_active_witnesses(state, &tally, weighting)?,
        election::update_active_committee_members(state, &tally, weighting)?,
    ];
    let sons = son::update_active_sons(state, &tally, weighting)?;
    worker::update_worker_votes(state, &tally);
    drop(tally);

    // ─────────────────────────────────────────────────────────────
    enter(&mut phases, block_num);
    let registered = state.dynamic.accounts_registered_this_interval;
    let params = &mut state.global.parameters;
    params.account_create_basic_fee = unscaled_account_fee(
        params.account_create_basic_fee,
        params.account_fee_scale_bitshifts,
        registered,
        params.accounts_per_fee_scale,
    );
    let account_create_basic_fee = params.account_create_basic_fee;

    let parameters_activated = match state.global.pending_parameters.take() {
        Some(pending) => {
            pending.validate()?;
            state.global.parameters = pending;
            info!("Pending parameters activated");
            true
        }
        None => false,
    };

    let next = next_maintenance_time(
        state.dynamic.next_maintenance_time,
        block_num,
        block_time,
        state.parameters().maintenance_interval,
    );
    state.dynamic.next_maintenance_time = next;
    state.dynamic.accounts_registered_this_interval = 0;

    // ─────────────────────────────────────────────────────────────
    enter(&mut phases, block_num);
    let budget = budget::process_budget(state)?;

    enter(&mut phases, block_num);
    info!(
        block_num,
        witnesses = state.global.active_witnesses.len(),
        committee = state.global.active_committee_members.len(),
        sons = state.global.active_sons.len(),
        total_budget = budget.total_budget,
        next_maintenance_time = %next,
        "Chain maintenance complete"
    );

    Ok(MaintenanceReport {
        block_num,
        block_time,
        phases,
        weighting,
        fba,
        dividends,
        total_voting_stake,
        top_holder_authorities,
        elections,
        sons,
        parameters_activated,
        account_create_basic_fee,
        next_maintenance_time: next,
        budget,
    })
}
