//! Dividend distribution integration tests
//! Run with: cargo test --test dividend_tests

use dpos_chain::maintenance::dividend::{
    pay_out_dividends, process_dividend_assets, schedule_pending_dividend_balances,
    DistributionOutcome, SkipReason,
};
use dpos_chain::state::{AuditRecord, DividendData, DividendOptions};
use dpos_chain::*;
use dpos_common::ids::CORE_ASSET;
use dpos_common::{AccountId, AssetAmount, AssetId, Price, Share, Timestamp, SECONDS_PER_DAY};
use proptest::prelude::*;

const NOW: Timestamp = Timestamp(100 * SECONDS_PER_DAY);

// ============================================================
// HELPERS
// ============================================================

struct DividendChain {
    state: ChainState,
    holder_asset: AssetId,
    distribution: AccountId,
    holders: Vec<AccountId>,
}

impl DividendChain {
    fn new(balances: &[Share], base_fee: Share, per_holder: Share) -> Self {
        let params = GlobalParameters {
            distribution_base_fee: base_fee,
            distribution_fee_per_holder: per_holder,
            min_witness_count: 1,
            min_committee_count: 1,
            ..Default::default()
        };
        let mut state = ChainState::new(params, ProtocolSchedule::default(), 1_000_000_000_000);
        state.dynamic.head_block_time = NOW;

        let issuer = state.create_account("issuer");
        let distribution = state.create_account("dividend-distribution");
        let holder_asset = state.create_asset("DIVIDEND", issuer, 1_000_000_000_000);
        state.asset_mut(holder_asset).unwrap().dividend =
            Some(DividendData::new(distribution, DividendOptions::default()));

        let holders = balances
            .iter()
            .map(|b| {
                let h = state.create_account("holder");
                if *b > 0 {
                    state.issue(h, holder_asset, *b).unwrap();
                }
                h
            })
            .collect();
        Self {
            state,
            holder_asset,
            distribution,
            holders,
        }
    }

    fn fund(&mut self, asset: AssetId, amount: Share) {
        self.state.issue(self.distribution, asset, amount).unwrap();
    }

    fn pending(&self, payout: AssetId, holder: AccountId) -> Share {
        self.state
            .pending_payouts
            .get(&(self.holder_asset, payout, holder))
            .copied()
            .unwrap_or(0)
    }

    fn total_pending(&self, payout: AssetId) -> Share {
        self.holders.iter().map(|h| self.pending(payout, *h)).sum()
    }

    fn options(&mut self) -> &mut DividendOptions {
        &mut self
            .state
            .asset_mut(self.holder_asset)
            .unwrap()
            .dividend
            .as_mut()
            .unwrap()
            .options
    }
}

// ============================================================
// SCENARIO C: POSITIVE DELTA
// ============================================================

#[test]
fn test_scenario_c_equal_split_after_fee() {
    let mut c = DividendChain::new(&[500; 10], 100, 10);
    c.fund(CORE_ASSET, 1_000);

    let reports = schedule_pending_dividend_balances(&mut c.state, c.holder_asset).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0].outcome,
        DistributionOutcome::Distributed {
            delta: 1_000,
            fee: 200,
            credited: 800,
            holders: 10,
        }
    );
    for h in &c.holders {
        assert_eq!(c.pending(CORE_ASSET, *h), 80);
    }
    assert_eq!(c.state.core_asset().unwrap().accumulated_fees, 200);
    assert_eq!(c.state.get_balance(c.distribution, CORE_ASSET), 800);
    assert_eq!(c.state.distributed_snapshots[&(c.holder_asset, CORE_ASSET)], 800);

    // nothing new arrived
    let again = schedule_pending_dividend_balances(&mut c.state, c.holder_asset).unwrap();
    assert_eq!(again[0].outcome, DistributionOutcome::Unchanged);
}

#[test]
fn test_distribution_account_holding_asset_counts_toward_fee_only() {
    let mut c = DividendChain::new(&[100, 100], 0, 10);
    let (dist, holder_asset) = (c.distribution, c.holder_asset);
    c.state.issue(dist, holder_asset, 1_000_000).unwrap();
    c.fund(CORE_ASSET, 230);

    schedule_pending_dividend_balances(&mut c.state, c.holder_asset).unwrap();
    // three non-zero holders for the fee, two receiving
    assert_eq!(c.pending(CORE_ASSET, c.holders[0]), 100);
    assert_eq!(c.pending(CORE_ASSET, c.holders[1]), 100);
}

// ============================================================
// SCENARIO D: NEGATIVE DELTA
// ============================================================

#[test]
fn test_scenario_d_override_transfer_shrinks_pending() {
    let mut c = DividendChain::new(&[100, 150, 250], 0, 0);
    c.fund(CORE_ASSET, 500);
    schedule_pending_dividend_balances(&mut c.state, c.holder_asset).unwrap();
    assert_eq!(c.total_pending(CORE_ASSET), 500);

    c.state.debit_balance(c.distribution, CORE_ASSET, 300).unwrap();
    let reports = schedule_pending_dividend_balances(&mut c.state, c.holder_asset).unwrap();
    assert_eq!(
        reports[0].outcome,
        DistributionOutcome::Clawback {
            delta: -300,
            recovered: 300,
        }
    );
    assert_eq!(c.pending(CORE_ASSET, c.holders[0]), 40);
    assert_eq!(c.pending(CORE_ASSET, c.holders[1]), 60);
    assert_eq!(c.pending(CORE_ASSET, c.holders[2]), 100);
    assert_eq!(c.state.distributed_snapshots[&(c.holder_asset, CORE_ASSET)], 200);
}

#[test]
fn test_clawback_remainder_absorbed_by_last_holder() {
    let mut c = DividendChain::new(&[1, 1, 1], 0, 0);
    c.fund(CORE_ASSET, 300);
    schedule_pending_dividend_balances(&mut c.state, c.holder_asset).unwrap();

    c.state.debit_balance(c.distribution, CORE_ASSET, 100).unwrap();
    schedule_pending_dividend_balances(&mut c.state, c.holder_asset).unwrap();

    let shrunk: Vec<Share> = c.holders.iter().map(|h| 100 - c.pending(CORE_ASSET, *h)).collect();
    assert_eq!(shrunk, vec![33, 33, 34]);
}

// ============================================================
// FEES IN FOREIGN PAYOUT ASSETS
// ============================================================

#[test]
fn test_short_fee_pool_retried_next_pass() {
    let mut c = DividendChain::new(&[10, 30], 40, 0);
    let usd = c.state.create_asset("USD", AccountId(6), 1_000_000_000);
    {
        let a = c.state.asset_mut(usd).unwrap();
        // 4 CORE buy 1 USD
        a.core_exchange_rate = Price::new(AssetAmount::new(1, usd), AssetAmount::new(4, CORE_ASSET));
        a.fee_pool = 39;
    }
    c.fund(usd, 1_010);

    let pass = process_dividend_assets(&mut c.state).unwrap();
    assert_eq!(
        pass.distributions[0].outcome,
        DistributionOutcome::Skipped(SkipReason::InsufficientFeePool { need: 40, have: 39 })
    );
    assert_eq!(c.total_pending(usd), 0);

    c.state.asset_mut(usd).unwrap().fee_pool = 40;
    let pass = process_dividend_assets(&mut c.state).unwrap();
    assert_eq!(
        pass.distributions[0].outcome,
        DistributionOutcome::Distributed {
            delta: 1_010,
            fee: 10,
            credited: 1_000,
            holders: 2,
        }
    );
    assert_eq!(c.pending(usd, c.holders[0]), 250);
    assert_eq!(c.pending(usd, c.holders[1]), 750);
    assert_eq!(c.state.asset(usd).unwrap().fee_pool, 0);
}

#[test]
fn test_missing_exchange_rate_skips() {
    let mut c = DividendChain::new(&[10], 40, 0);
    let usd = c.state.create_asset("USD", AccountId(6), 1_000_000_000);
    c.fund(usd, 1_000);
    let reports = schedule_pending_dividend_balances(&mut c.state, c.holder_asset).unwrap();
    assert!(matches!(
        reports[0].outcome,
        DistributionOutcome::Skipped(SkipReason::FeeConversion(_))
    ));
}

#[test]
fn test_fee_not_below_delta() {
    let mut c = DividendChain::new(&[10], 50, 0);
    c.fund(CORE_ASSET, 50);
    let reports = schedule_pending_dividend_balances(&mut c.state, c.holder_asset).unwrap();
    assert_eq!(
        reports[0].outcome,
        DistributionOutcome::Skipped(SkipReason::FeeExceedsDelta { delta: 50, fee: 50 })
    );
    assert_eq!(c.state.get_balance(c.distribution, CORE_ASSET), 50);
}

// ============================================================
// PAYOUTS
// ============================================================

#[test]
fn test_payout_after_downtime_reschedules_in_closed_form() {
    let mut c = DividendChain::new(&[1, 1], 0, 0);
    let first = NOW - 10 * SECONDS_PER_DAY - SECONDS_PER_DAY / 2;
    c.options().next_payout_time = Some(first);
    c.options().payout_interval = Some(SECONDS_PER_DAY);
    c.fund(CORE_ASSET, 10);

    let pass = process_dividend_assets(&mut c.state).unwrap();
    assert_eq!(pass.payouts.len(), 1);
    assert_eq!(pass.payouts[0].next_payout_time, Some(first + 11 * SECONDS_PER_DAY));
    assert_eq!(c.state.get_balance(c.holders[0], CORE_ASSET), 5);
    assert_eq!(c.state.get_balance(c.holders[1], CORE_ASSET), 5);
    assert_eq!(c.total_pending(CORE_ASSET), 0);

    let dd = c.state.asset(c.holder_asset).unwrap().dividend.clone().unwrap();
    assert_eq!(dd.last_scheduled_payout_time, Some(first));
    assert_eq!(dd.last_payout_time, Some(NOW));
    assert_eq!(dd.last_distribution_time, Some(NOW));
}

#[test]
fn test_payout_not_due_keeps_pending() {
    let mut c = DividendChain::new(&[1], 0, 0);
    c.options().next_payout_time = Some(NOW + 1);
    c.fund(CORE_ASSET, 10);
    let pass = process_dividend_assets(&mut c.state).unwrap();
    assert!(pass.payouts.is_empty());
    assert_eq!(c.total_pending(CORE_ASSET), 10);
}

#[test]
fn test_payout_emits_one_record_per_holder() {
    let mut c = DividendChain::new(&[1, 3], 0, 0);
    let usd = c.state.create_asset("USD", AccountId(6), 1_000_000_000);
    c.state.asset_mut(usd).unwrap().core_exchange_rate =
        Price::new(AssetAmount::new(1, usd), AssetAmount::new(1, CORE_ASSET));
    c.fund(CORE_ASSET, 40);
    c.fund(usd, 400);
    schedule_pending_dividend_balances(&mut c.state, c.holder_asset).unwrap();

    c.options().next_payout_time = Some(NOW);
    let report = pay_out_dividends(&mut c.state, c.holder_asset).unwrap();
    assert_eq!(report.holders_paid, 2);
    assert_eq!(report.paid_by_asset[&CORE_ASSET], 40);
    assert_eq!(report.paid_by_asset[&usd], 400);

    let records: Vec<&AuditRecord> = c
        .state
        .audit_log
        .iter()
        .filter(|r| matches!(r, AuditRecord::DividendPayout { .. }))
        .collect();
    assert_eq!(records.len(), 2);
    match records[1] {
        AuditRecord::DividendPayout { account, amounts, .. } => {
            assert_eq!(*account, c.holders[1]);
            assert_eq!(amounts, &vec![(CORE_ASSET, 30), (usd, 300)]);
        }
        _ => unreachable!(),
    }
    assert_eq!(c.state.get_balance(c.distribution, usd), 0);
}

#[test]
fn test_full_pass_distributes_before_budget() {
    let mut c = DividendChain::new(&[1, 1], 0, 0);
    let w = c.state.create_account("witness");
    c.state.register_witness(w);
    c.options().next_payout_time = Some(NOW);
    c.fund(CORE_ASSET, 100);

    let report = maybe_perform_maintenance(&mut c.state, 2, NOW).unwrap().unwrap();
    assert_eq!(report.dividends.payouts.len(), 1);
    assert_eq!(c.state.get_balance(c.holders[0], CORE_ASSET), 50);
}

// ============================================================
// CONSERVATION PROPERTY
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_pending_plus_fee_matches_delta(
        balances in prop::collection::vec(0i64..1_000_000, 1..12),
        vesting in prop::collection::vec(0i64..1_000_000, 0..4),
        base_fee in 0i64..1_000,
        per_holder in 0i64..100,
        delta in 1i64..10_000_000,
    ) {
        let mut c = DividendChain::new(&balances, base_fee, per_holder);
        for (i, amount) in vesting.iter().enumerate() {
            let owner = c.holders[i % c.holders.len()];
            let holder_asset = c.holder_asset;
            c.state.create_vesting_balance(owner, holder_asset, *amount);
        }
        c.fund(CORE_ASSET, delta);

        let reports = schedule_pending_dividend_balances(&mut c.state, c.holder_asset).unwrap();
        match &reports[0].outcome {
            DistributionOutcome::Distributed { delta: d, fee, credited, .. } => {
                prop_assert_eq!(*d, delta);
                prop_assert_eq!(c.total_pending(CORE_ASSET), *credited);
                let slack = delta - fee - credited;
                prop_assert!(slack >= 0);
                prop_assert!(slack <= c.holders.len() as i64 - 1);
                prop_assert_eq!(
                    c.state.get_balance(c.distribution, CORE_ASSET),
                    c.state.distributed_snapshots[&(c.holder_asset, CORE_ASSET)] + slack
                );
            }
            DistributionOutcome::Skipped(_) => {
                prop_assert_eq!(c.total_pending(CORE_ASSET), 0);
                prop_assert_eq!(c.state.get_balance(c.distribution, CORE_ASSET), delta);
            }
            other => prop_assert!(false, "unexpected outcome {:?}", other),
        }
    }
}
