//! Dividend distribution.
//!
//! Each dividend-paying asset names a distribution account. Whatever arrives
//! in that account between passes is shared out to holders of the asset:
//!
//! ```text
//!   delta = balance now - balance recorded at the last pass (snapshot)
//!
//!   delta > 0   charge the distribution fee, credit each holder
//!               delta * holding / total_holdings into a pending payout,
//!               snapshot += amount credited
//!   delta < 0   funds were pulled out, shrink pending payouts of that
//!               payout asset proportionally, snapshot += delta
//! ```
//!
//! Pending payouts become real balances at the asset's payout time. Any
//! rounding remainder stays in the distribution account and shows up in the
//! next pass's delta.

use super::next_boundary_after;
use crate::error::{MaintenanceError, MaintenanceResult};
use crate::params::ONE_HUNDRED_PERCENT;
use crate::state::{AuditRecord, ChainState, DividendData};
use dpos_common::ids::CORE_ASSET;
use dpos_common::{AccountId, AssetAmount, AssetId, PriceError, Share, Timestamp};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Why a positive delta was not distributed this pass. The funds stay in the
/// distribution account and are retried next pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    BelowMinimum { delta: Share, minimum: Share },
    InsufficientFeePool { need: Share, have: Share },
    /// Nobody but the distribution account holds the asset.
    NoEligibleHolders,
    FeeExceedsDelta { delta: Share, fee: Share },
    UnknownPayoutAsset,
    FeeConversion(PriceError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributionOutcome {
    Distributed {
        delta: Share,
        fee: Share,
        credited: Share,
        holders: usize,
    },
    Clawback {
        delta: Share,
        recovered: Share,
    },
    Unchanged,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionReport {
    pub holder_asset: AssetId,
    pub payout_asset: AssetId,
    pub outcome: DistributionOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutReport {
    pub holder_asset: AssetId,
    pub holders_paid: usize,
    pub paid_by_asset: BTreeMap<AssetId, Share>,
    pub next_payout_time: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DividendPass {
    pub distributions: Vec<DistributionReport>,
    pub payouts: Vec<PayoutReport>,
}

/// Schedule and, when due, pay out dividends of every dividend-paying asset.
pub fn process_dividend_assets(state: &mut ChainState) -> MaintenanceResult<DividendPass> {
    let now = state.head_block_time();
    let holder_assets: Vec<AssetId> = state
        .assets
        .values()
        .filter(|a| a.dividend.is_some())
        .map(|a| a.id)
        .collect();

    let mut pass = DividendPass::default();
    for holder_asset in holder_assets {
        pass.distributions
            .extend(schedule_pending_dividend_balances(state, holder_asset)?);

        let due = dividend_data(state, holder_asset)?
            .options
            .next_payout_time
            .map_or(false, |t| now >= t);
        if due {
            pass.payouts.push(pay_out_dividends(state, holder_asset)?);
        }
    }
    Ok(pass)
}

fn dividend_data(state: &ChainState, holder_asset: AssetId) -> MaintenanceResult<&DividendData> {
    state
        .asset(holder_asset)?
        .dividend
        .as_ref()
        .ok_or_else(|| MaintenanceError::unknown("dividend data of asset", holder_asset))
}

fn dividend_data_mut(state: &mut ChainState, holder_asset: AssetId) -> MaintenanceResult<&mut DividendData> {
    state
        .asset_mut(holder_asset)?
        .dividend
        .as_mut()
        .ok_or_else(|| MaintenanceError::unknown("dividend data of asset", holder_asset))
}

/// Holders of the dividend asset other than the distribution account, with
/// liquid and vesting holdings combined. Owners holding only vesting
/// balances are included.
struct Holders {
    entries: Vec<(AccountId, Share)>,
    total: i128,
    /// Non-zero liquid holders including the distribution account.
    count: usize,
}

fn collect_holders(state: &ChainState, holder_asset: AssetId, distribution_account: AccountId) -> Holders {
    let mut holdings = state.vesting_by_owner(holder_asset);
    let mut count = 0usize;
    for (owner, balance) in state.holders_of(holder_asset) {
        if balance == 0 {
            continue;
        }
        count += 1;
        *holdings.entry(owner).or_insert(0) += balance;
    }
    holdings.remove(&distribution_account);

    let total = holdings.values().map(|h| *h as i128).sum();
    Holders {
        entries: holdings.into_iter().collect(),
        total,
        count,
    }
}

/// Compare the distribution account against its snapshot for every payout
/// asset it holds or held, and schedule or claw back pending payouts.
pub fn schedule_pending_dividend_balances(
    state: &mut ChainState,
    holder_asset: AssetId,
) -> MaintenanceResult<Vec<DistributionReport>> {
    let now = state.head_block_time();
    let data = dividend_data(state, holder_asset)?.clone();
    let distribution_account = data.distribution_account;
    let holders = collect_holders(state, holder_asset, distribution_account);

    let params = state.parameters();
    let fee_core = params.distribution_base_fee as i128
        + params.distribution_fee_per_holder as i128 * holders.count as i128;
    let fee_core = Share::try_from(fee_core).map_err(|_| MaintenanceError::Overflow("distribution fee"))?;

    let current = state.balances_of(distribution_account);
    let previous: BTreeMap<AssetId, Share> = state
        .distributed_snapshots
        .range((holder_asset, AssetId(0))..=(holder_asset, AssetId(u64::MAX)))
        .map(|((_, payout), bal)| (*payout, *bal))
        .collect();
    let payout_assets: BTreeSet<AssetId> = current.keys().chain(previous.keys()).copied().collect();

    debug!(
        holder_asset = %holder_asset,
        holders = holders.count,
        total_holdings = %holders.total,
        payout_assets = payout_assets.len(),
        "Scheduling dividends"
    );

    let mut reports = Vec::with_capacity(payout_assets.len());
    for payout_asset in payout_assets {
        let current_balance = current.get(&payout_asset).copied().unwrap_or(0);
        let previous_balance = previous.get(&payout_asset).copied().unwrap_or(0);
        let delta = current_balance - previous_balance;

        let outcome = if delta > 0 {
            distribute(state, &data, holder_asset, payout_asset, delta, fee_core, &holders)?
        } else if delta < 0 {
            claw_back(state, holder_asset, payout_asset, delta, current_balance)?
        } else {
            DistributionOutcome::Unchanged
        };

        if let DistributionOutcome::Skipped(reason) = &outcome {
            warn!(
                holder_asset = %holder_asset,
                payout_asset = %payout_asset,
                delta,
                reason = ?reason,
                "Dividend distribution skipped"
            );
        }
        reports.push(DistributionReport {
            holder_asset,
            payout_asset,
            outcome,
        });
    }

    let data = dividend_data_mut(state, holder_asset)?;
    data.last_scheduled_distribution_time = Some(now);
    data.last_distribution_time = Some(now);
    Ok(reports)
}

fn distribute(
    state: &mut ChainState,
    data: &DividendData,
    holder_asset: AssetId,
    payout_asset: AssetId,
    delta: Share,
    fee_core: Share,
    holders: &Holders,
) -> MaintenanceResult<DistributionOutcome> {
    let skip = |r| Ok(DistributionOutcome::Skipped(r));

    let Ok(payout) = state.asset(payout_asset) else {
        return skip(SkipReason::UnknownPayoutAsset);
    };
    let fee = if payout_asset == CORE_ASSET {
        fee_core
    } else {
        match AssetAmount::new(fee_core, CORE_ASSET) * payout.core_exchange_rate {
            Ok(converted) if converted.asset_id == payout_asset => converted.amount,
            Ok(converted) => {
                return skip(SkipReason::FeeConversion(PriceError::AssetMismatch {
                    amount: CORE_ASSET,
                    base: converted.asset_id,
                    quote: payout_asset,
                }))
            }
            Err(e) => return skip(SkipReason::FeeConversion(e)),
        }
    };

    let pct = data.options.minimum_fee_percentage;
    if pct != 0 {
        let minimum = fee as i128 * ONE_HUNDRED_PERCENT as i128 / pct as i128;
        if (delta as i128) < minimum {
            return skip(SkipReason::BelowMinimum {
                delta,
                minimum: minimum.min(Share::MAX as i128) as Share,
            });
        }
    }
    if holders.total <= 0 {
        return skip(SkipReason::NoEligibleHolders);
    }
    if delta <= fee {
        return skip(SkipReason::FeeExceedsDelta { delta, fee });
    }
    if payout_asset != CORE_ASSET && payout.fee_pool < fee_core {
        return skip(SkipReason::InsufficientFeePool {
            need: fee_core,
            have: payout.fee_pool,
        });
    }

    // fee
    let distribution_account = data.distribution_account;
    if payout_asset == CORE_ASSET {
        state.debit_balance(distribution_account, CORE_ASSET, fee_core)?;
        state.add_accumulated_fees(CORE_ASSET, fee_core)?;
    } else {
        state.debit_balance(distribution_account, payout_asset, fee)?;
        let payout = state.asset_mut(payout_asset)?;
        payout.fee_pool -= fee_core;
        payout.accumulated_fees += fee;
        state.add_accumulated_fees(CORE_ASSET, fee_core)?;
    }

    let distributable = (delta - fee) as u128;
    let total = holders.total as u128;
    let mut credited: Share = 0;
    let mut credited_holders = 0usize;
    for (owner, holding) in &holders.entries {
        if *holding <= 0 {
            continue;
        }
        let share = (distributable * *holding as u128 / total) as Share;
        if share == 0 {
            continue;
        }
        *state
            .pending_payouts
            .entry((holder_asset, payout_asset, *owner))
            .or_insert(0) += share;
        credited += share;
        credited_holders += 1;
    }
    *state
        .distributed_snapshots
        .entry((holder_asset, payout_asset))
        .or_insert(0) += credited;

    debug!(
        holder_asset = %holder_asset,
        payout_asset = %payout_asset,
        delta,
        fee,
        credited,
        remainder = delta - fee - credited,
        "Dividends scheduled"
    );
    Ok(DistributionOutcome::Distributed {
        delta,
        fee,
        credited,
        holders: credited_holders,
    })
}

/// Shrink pending payouts of `(holder_asset, payout_asset)` by `-delta` in
/// total, proportionally, truncating each step against the running
/// remainder so the last entry absorbs the rounding.
fn claw_back(
    state: &mut ChainState,
    holder_asset: AssetId,
    payout_asset: AssetId,
    delta: Share,
    current_balance: Share,
) -> MaintenanceResult<DistributionOutcome> {
    let lo = (holder_asset, payout_asset, AccountId(0));
    let hi = (holder_asset, payout_asset, AccountId(u64::MAX));
    let total_pending: i128 = state
        .pending_payouts
        .range(lo..=hi)
        .map(|(_, v)| *v as i128)
        .sum();

    let mut remaining_to_recover = -(delta as i128);
    let mut remaining_pending = total_pending;
    let mut recovered: Share = 0;
    for (_, pending) in state.pending_payouts.range_mut(lo..=hi) {
        if remaining_pending <= 0 {
            break;
        }
        let debit = remaining_to_recover * *pending as i128 / remaining_pending;
        remaining_to_recover -= debit;
        remaining_pending -= *pending as i128;
        *pending -= debit as Share;
        recovered += debit as Share;
    }

    let snapshot = state
        .distributed_snapshots
        .entry((holder_asset, payout_asset))
        .or_insert(0);
    *snapshot += delta;
    if *snapshot != current_balance {
        return Err(MaintenanceError::InvariantViolation(format!(
            "dividend snapshot {}/{} is {} after clawback, distribution account holds {}",
            holder_asset, payout_asset, snapshot, current_balance
        )));
    }
    info!(
        holder_asset = %holder_asset,
        payout_asset = %payout_asset,
        delta,
        recovered,
        "Pending dividends reduced after withdrawal"
    );
    Ok(DistributionOutcome::Clawback { delta, recovered })
}

/// Turn every pending payout of `holder_asset` into a balance credit and
/// schedule the next payout.
pub fn pay_out_dividends(state: &mut ChainState, holder_asset: AssetId) -> MaintenanceResult<PayoutReport> {
    let now = state.head_block_time();
    let data = dividend_data(state, holder_asset)?.clone();

    let due: Vec<((AssetId, AssetId, AccountId), Share)> = state
        .pending_payouts
        .range((holder_asset, AssetId(0), AccountId(0))..=(holder_asset, AssetId(u64::MAX), AccountId(u64::MAX)))
        .filter(|(_, v)| **v > 0)
        .map(|(k, v)| (*k, *v))
        .collect();

    // grouped per holder for one audit record each
    let mut per_holder: BTreeMap<AccountId, Vec<(AssetId, Share)>> = BTreeMap::new();
    let mut paid_by_asset: BTreeMap<AssetId, Share> = BTreeMap::new();
    for ((_, payout_asset, owner), amount) in &due {
        state.credit_balance(*owner, *payout_asset, *amount)?;
        per_holder.entry(*owner).or_default().push((*payout_asset, *amount));
        *paid_by_asset.entry(*payout_asset).or_insert(0) += *amount;
        state.pending_payouts.insert((holder_asset, *payout_asset, *owner), 0);
    }
    let holders_paid = per_holder.len();
    for (account, amounts) in per_holder {
        state.emit_audit_record(AuditRecord::DividendPayout {
            holder_asset,
            account,
            amounts,
        });
    }

    for (payout_asset, amount) in &paid_by_asset {
        state.debit_balance(data.distribution_account, *payout_asset, *amount)?;
        *state
            .distributed_snapshots
            .entry((holder_asset, *payout_asset))
            .or_insert(0) -= *amount;
    }

    let dd = dividend_data_mut(state, holder_asset)?;
    dd.last_scheduled_payout_time = dd.options.next_payout_time;
    dd.last_payout_time = Some(now);
    let next = match (dd.options.payout_interval, dd.last_scheduled_payout_time) {
        (Some(interval), Some(last)) if interval > 0 => Some(next_boundary_after(last, interval, now)),
        _ => None,
    };
    dd.options.next_payout_time = next;

    info!(
        holder_asset = %holder_asset,
        holders_paid,
        next_payout_time = ?next,
        "Dividends paid out"
    );
    Ok(PayoutReport {
        holder_asset,
        holders_paid,
        paid_by_asset,
        next_payout_time: next,
    })
}
