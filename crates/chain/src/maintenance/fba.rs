//! Fee-backed asset accumulators.
//!
//! Fees of blinded transfers collect in three accumulators. Each pass splits
//! them between the network (burned), the buyback account of the designated
//! asset and that asset's issuer.

use crate::error::{MaintenanceError, MaintenanceResult};
use crate::params::{ONE_HUNDRED_PERCENT, ONE_PERCENT};
use crate::state::{AuditRecord, ChainState};
use dpos_common::ids::CORE_ASSET;
use dpos_common::{AccountId, FbaAccumulatorId, Share};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FbaSplit {
    pub network: u32,
    pub buyback: u32,
    pub issuer: u32,
}

pub const DEFAULT_FBA_SPLIT: FbaSplit = FbaSplit {
    network: 20 * ONE_PERCENT,
    buyback: 60 * ONE_PERCENT,
    issuer: 20 * ONE_PERCENT,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FbaOutcome {
    pub fba: FbaAccumulatorId,
    pub burned: Share,
    pub buyback: Share,
    pub issuer: Share,
}

/// Recipients of a configured accumulator.
fn recipients(state: &ChainState, fba: FbaAccumulatorId) -> Option<(AccountId, AccountId)> {
    let designated = state.fba_accumulators.get(&fba)?.designated_asset?;
    let asset = state.assets.get(&designated)?;
    Some((asset.buyback_account?, asset.issuer))
}

/// Split every accumulator with [`DEFAULT_FBA_SPLIT`].
pub fn distribute_fba_balances(state: &mut ChainState) -> MaintenanceResult<Vec<FbaOutcome>> {
    let ids: Vec<FbaAccumulatorId> = state.fba_accumulators.keys().copied().collect();
    let mut out = Vec::new();
    for id in ids {
        if let Some(outcome) = split_fba_balance(state, id, DEFAULT_FBA_SPLIT)? {
            out.push(outcome);
        }
    }
    Ok(out)
}

/// Split one accumulator. `None` when it holds nothing.
pub fn split_fba_balance(
    state: &mut ChainState,
    fba: FbaAccumulatorId,
    split: FbaSplit,
) -> MaintenanceResult<Option<FbaOutcome>> {
    let total_pct = split.network + split.buyback + split.issuer;
    if total_pct != ONE_HUNDRED_PERCENT {
        return Err(MaintenanceError::InvalidParameters(format!(
            "fba split sums to {} basis points",
            total_pct
        )));
    }
    let accumulated = state
        .fba_accumulators
        .get(&fba)
        .ok_or_else(|| MaintenanceError::unknown("fba accumulator", fba))?
        .accumulated_fba_fees;
    if accumulated == 0 {
        return Ok(None);
    }

    let mut outcome = FbaOutcome {
        fba,
        ..Default::default()
    };
    match recipients(state, fba) {
        None => {
            warn!(fba = %fba, amount = accumulated, "Unconfigured fba, fees burned");
            state.apply_supply_delta(CORE_ASSET, -accumulated)?;
            outcome.burned = accumulated;
        }
        Some((buyback_account, issuer)) => {
            let part = |pct: u32| (accumulated as u128 * pct as u128 / ONE_HUNDRED_PERCENT as u128) as Share;
            let buyback = part(split.buyback);
            let to_issuer = part(split.issuer);
            let network = accumulated - (buyback + to_issuer);

            if network != 0 {
                state.apply_supply_delta(CORE_ASSET, -network)?;
            }
            for (account, amount) in [(buyback_account, buyback), (issuer, to_issuer)] {
                if amount == 0 {
                    continue;
                }
                state.credit_balance(account, CORE_ASSET, amount)?;
                state.emit_audit_record(AuditRecord::FbaDistribution { fba, account, amount });
            }
            debug!(fba = %fba, network, buyback, issuer = to_issuer, "Fba fees split");
            outcome.burned = network;
            outcome.buyback = buyback;
            outcome.issuer = to_issuer;
        }
    }

    if let Some(acc) = state.fba_accumulators.get_mut(&fba) {
        acc.accumulated_fba_fees = 0;
    }
    Ok(Some(outcome))
}
