//! Worker proposals: vote refresh and daily pay.

use super::tally::VoteTally;
use crate::error::MaintenanceResult;
use crate::state::{ChainState, WorkerKind};
use dpos_common::ids::{CORE_ASSET, NULL_ACCOUNT};
use dpos_common::{Share, WorkerId, SECONDS_PER_DAY};
use std::cmp::Reverse;
use tracing::debug;

/// Copy tallied approval into every worker. Votes against only count before
/// the protocol stopped honoring them.
pub fn update_worker_votes(state: &mut ChainState, tally: &VoteTally) {
    let count_against = state.schedule.counts_votes_against_workers(state.head_block_time());
    for w in state.workers.values_mut() {
        w.total_votes_for = tally.votes_for(w.vote_for);
        w.total_votes_against = if count_against {
            tally.votes_for(w.vote_against)
        } else {
            0
        };
    }
}

/// Pay active, approved workers from `budget` in `(approval desc, id asc)`
/// order until it runs out. `budget` is reduced by what was paid.
pub fn pay_workers(state: &mut ChainState, budget: &mut Share) -> MaintenanceResult<Vec<(WorkerId, Share)>> {
    let now = state.head_block_time();
    let elapsed = now.saturating_elapsed_since(state.dynamic.last_budget_time);

    let mut payable: Vec<(i128, WorkerId)> = state
        .workers
        .values()
        .filter(|w| w.is_active(now) && w.approving_stake() > 0)
        .map(|w| (w.approving_stake(), w.id))
        .collect();
    payable.sort_by_key(|(approval, id)| (Reverse(*approval), *id));

    let mut paid = Vec::new();
    for (_, id) in payable {
        if *budget <= 0 {
            break;
        }
        let Some(worker) = state.workers.get(&id) else {
            continue;
        };
        let mut requested = worker.daily_pay;
        if elapsed != SECONDS_PER_DAY {
            requested = (requested as u128 * elapsed as u128 / SECONDS_PER_DAY as u128) as Share;
        }
        let pay = requested.min(*budget);
        let (kind, account) = (worker.kind, worker.account);

        match kind {
            WorkerKind::Refund => {
                state.apply_supply_delta(CORE_ASSET, -pay)?;
                if let Some(w) = state.workers.get_mut(&id) {
                    w.total_burned += pay;
                }
            }
            WorkerKind::Vesting(vb) => {
                state.deposit_vesting(vb, pay)?;
            }
            WorkerKind::Burn => {
                state.credit_balance(NULL_ACCOUNT, CORE_ASSET, pay)?;
                if let Some(w) = state.workers.get_mut(&id) {
                    w.total_burned += pay;
                }
            }
        }
        debug!(worker = %id, account = %account, pay, "Worker paid");
        *budget -= pay;
        paid.push((id, pay));
    }
    Ok(paid)
}
