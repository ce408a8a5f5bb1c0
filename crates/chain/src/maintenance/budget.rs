//! Per-interval treasury budget.
//!
//! The spendable budget is a fraction of the reserve (unissued core supply
//! plus fees and unspent witness pay, all considered returned to the
//! reserve at the start of the interval) that decays exponentially:
//! `total = ceil(reserve * dt * rate / 2^bits)`, capped at the reserve.
//! It is spent on witnesses, SONs and workers in that order; anything left
//! evaporates back into the reserve.

use super::son::pay_sons;
use super::worker::pay_workers;
use crate::error::{MaintenanceError, MaintenanceResult};
use crate::state::{AuditRecord, BudgetRecord, ChainState};
use dpos_common::ids::CORE_ASSET;
use dpos_common::{Share, Timestamp, SECONDS_PER_DAY};
use tracing::{debug, info};

fn to_share(v: u128, what: &'static str) -> MaintenanceResult<Share> {
    Share::try_from(v).map_err(|_| MaintenanceError::Overflow(what))
}

/// Opening balances and total budget for the interval ending at `now`.
/// The first budget, or one at a non-advancing time, spends nothing.
pub fn initialize_budget_record(state: &ChainState, now: Timestamp) -> MaintenanceResult<BudgetRecord> {
    let core = state.core_asset()?;
    let params = state.parameters();
    let mut rec = BudgetRecord {
        time: now,
        from_initial_reserve: core.reserved(),
        from_accumulated_fees: core.accumulated_fees,
        from_unused_witness_budget: state.dynamic.witness_budget,
        ..Default::default()
    };

    let last = state.dynamic.last_budget_time;
    if last.is_zero() || now <= last {
        return Ok(rec);
    }
    let dt = now.saturating_elapsed_since(last);
    rec.time_since_last_budget = dt as u64;

    let reserve = rec.from_initial_reserve as i128
        + rec.from_accumulated_fees as i128
        + rec.from_unused_witness_budget as i128;
    let reserve = reserve.max(0) as u128;

    let bits = params.core_asset_cycle_rate_bits as u32;
    let budget = reserve
        .checked_mul(dt as u128)
        .and_then(|v| v.checked_mul(params.core_asset_cycle_rate as u128))
        .and_then(|v| v.checked_add((1u128 << bits) - 1))
        .ok_or(MaintenanceError::Overflow("total_budget"))?
        >> bits;

    rec.total_budget = to_share(budget.min(reserve), "total_budget")?;
    Ok(rec)
}

/// Allocate this interval's budget and apply the resulting supply change.
pub fn process_budget(state: &mut ChainState) -> MaintenanceResult<BudgetRecord> {
    let now = state.head_block_time();
    let params = state.parameters().clone();

    let time_to_maint = state.dynamic.next_maintenance_time.secs() as i64 - now.secs() as i64;
    if time_to_maint <= 0 {
        return Err(MaintenanceError::InvariantViolation(format!(
            "next maintenance time {} is not after head block time {}",
            state.dynamic.next_maintenance_time, now
        )));
    }
    let time_to_maint = time_to_maint as u64;
    let block_interval = params.block_interval as u64;
    let blocks_to_maint = (time_to_maint + block_interval - 1) / block_interval;

    let mut rec = initialize_budget_record(state, now)?;
    let mut available = rec.total_budget;

    // witnesses
    rec.requested_witness_budget = to_share(
        params.witness_pay_per_block.max(0) as u128 * blocks_to_maint as u128,
        "requested_witness_budget",
    )?;
    rec.witness_budget = rec.requested_witness_budget.min(available);
    available -= rec.witness_budget;

    // SONs
    if state.schedule.sons_active(now) {
        pay_sons(state)?;
        rec.leftover_son_funds = state.dynamic.son_budget;
        available += rec.leftover_son_funds;
        rec.son_budget = params.son_pay_daily_max.min(available);
        available -= rec.son_budget;
    }

    // workers
    let worker_cap = params.worker_budget_per_day.max(0) as u128 * time_to_maint as u128
        / SECONDS_PER_DAY as u128;
    rec.worker_budget = if worker_cap >= available.max(0) as u128 {
        available
    } else {
        to_share(worker_cap, "worker_budget")?
    };
    available -= rec.worker_budget;

    let mut leftover_worker_funds = rec.worker_budget;
    let paid = pay_workers(state, &mut leftover_worker_funds)?;
    rec.leftover_worker_funds = leftover_worker_funds;
    available += leftover_worker_funds;

    rec.supply_delta = rec.witness_budget + rec.worker_budget + rec.son_budget
        - rec.leftover_worker_funds
        - rec.from_accumulated_fees
        - rec.from_unused_witness_budget
        - rec.leftover_son_funds;

    check_budget(state, &rec, &paid)?;

    state.apply_supply_delta(CORE_ASSET, rec.supply_delta)?;
    state.asset_mut(CORE_ASSET)?.accumulated_fees = 0;
    state.dynamic.witness_budget = rec.witness_budget;
    state.dynamic.son_budget = rec.son_budget;
    state.dynamic.last_budget_time = now;

    info!(
        total_budget = rec.total_budget,
        witness_budget = rec.witness_budget,
        son_budget = rec.son_budget,
        worker_budget = rec.worker_budget,
        leftover_worker_funds = rec.leftover_worker_funds,
        supply_delta = rec.supply_delta,
        unallocated = available,
        "Budget processed"
    );
    state.budget_records.push(rec.clone());
    state.emit_audit_record(AuditRecord::BudgetRecorded(rec.clone()));
    Ok(rec)
}

/// Cross-check the record against what actually moved on the ledger.
fn check_budget(state: &ChainState, rec: &BudgetRecord, paid: &[(dpos_common::WorkerId, Share)]) -> MaintenanceResult<()> {
    let worker_paid: Share = paid.iter().map(|(_, p)| *p).sum();
    if worker_paid != rec.worker_budget - rec.leftover_worker_funds {
        return Err(MaintenanceError::InvariantViolation(format!(
            "workers received {} but budget shows {} spent",
            worker_paid,
            rec.worker_budget - rec.leftover_worker_funds
        )));
    }

    let spent = rec.witness_budget as i128 + rec.son_budget as i128 + worker_paid as i128;
    if spent > rec.total_budget as i128 + rec.leftover_son_funds as i128 {
        return Err(MaintenanceError::InvariantViolation(format!(
            "allocated {} exceeds total budget {} plus carried SON funds {}",
            spent, rec.total_budget, rec.leftover_son_funds
        )));
    }

    let recomputed = rec.witness_budget as i128 + rec.worker_budget as i128 + rec.son_budget as i128
        - rec.leftover_worker_funds as i128
        - state.core_asset()?.accumulated_fees as i128
        - state.dynamic.witness_budget as i128
        - state.dynamic.son_budget as i128;
    if recomputed != rec.supply_delta as i128 {
        return Err(MaintenanceError::InvariantViolation(format!(
            "supply delta {} disagrees with ledger recomputation {}",
            rec.supply_delta, recomputed
        )));
    }
    debug!(supply_delta = rec.supply_delta, worker_paid, "Budget invariants hold");
    Ok(())
}
