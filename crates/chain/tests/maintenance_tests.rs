//! Full maintenance pass integration tests
//! Run with: cargo test --test maintenance_tests

use dpos_chain::state::{AuditRecord, DividendData, DividendOptions, SonStatus, WorkerKind};
use dpos_chain::*;
use dpos_common::ids::{CORE_ASSET, WITNESS_ACCOUNT};
use dpos_common::{AccountId, FbaAccumulatorId, Share, SonId, Timestamp, VoteSlot};
use std::io::Write;

const INTERVAL: u32 = 3_600;
const T0: Timestamp = Timestamp(1_000_000 * 3_600);

// ============================================================
// HELPERS
// ============================================================

fn params() -> GlobalParameters {
    GlobalParameters {
        min_witness_count: 1,
        min_committee_count: 1,
        max_son_count: 2,
        maintenance_interval: INTERVAL,
        ..Default::default()
    }
}

fn voter(s: &mut ChainState, stake: Share, slots: &[VoteSlot]) -> AccountId {
    let a = s.create_account("voter");
    s.issue(a, CORE_ASSET, stake).unwrap();
    s.accounts
        .get_mut(&a)
        .unwrap()
        .options
        .votes
        .extend(slots.iter().copied());
    a
}

fn son(s: &mut ChainState, stake: Share) -> (SonId, AccountId) {
    let a = s.create_account("son");
    let id = s.register_son(a, format!("son-key-{}", a));
    let slot = s.sons[&id].vote_slot;
    (id, voter(s, stake, &[slot]))
}

/// One voted witness and committee member, due for maintenance at `T0`.
fn chain(schedule: ProtocolSchedule) -> ChainState {
    let mut s = ChainState::new(params(), schedule, 1_000_000_000_000_000);
    let w = s.create_account("witness");
    let wid = s.register_witness(w);
    let c = s.create_account("committee");
    let cid = s.register_committee_member(c);
    let slots = [s.witnesses[&wid].vote_slot, s.committee_members[&cid].vote_slot];
    voter(&mut s, 1_000_000, &slots);
    s.dynamic.last_budget_time = T0 - INTERVAL;
    s.dynamic.next_maintenance_time = T0;
    s
}

fn run(s: &mut ChainState, block_num: u32, at: Timestamp) -> MaintenanceReport {
    maybe_perform_maintenance(s, block_num, at)
        .expect("maintenance succeeds")
        .expect("maintenance due")
}

// ============================================================
// SCHEDULING
// ============================================================

#[test]
fn test_not_due_only_records_head_block() {
    let mut s = chain(ProtocolSchedule::default());
    let before = s.clone();
    assert!(maybe_perform_maintenance(&mut s, 7, T0 - 1).unwrap().is_none());
    assert_eq!(s.dynamic.head_block_number, 7);
    assert_eq!(s.dynamic.head_block_time, T0 - 1);
    assert_eq!(s.witnesses, before.witnesses);
    assert_eq!(s.budget_records.len(), 0);
}

#[test]
fn test_first_block_aligns_to_interval() {
    let mut s = chain(ProtocolSchedule::default());
    s.dynamic.next_maintenance_time = Timestamp::ZERO;
    s.dynamic.last_budget_time = Timestamp::ZERO;
    let report = run(&mut s, 1, Timestamp(1_000));
    assert_eq!(report.next_maintenance_time, Timestamp(3_600));
}

#[test]
fn test_downtime_skips_missed_intervals() {
    let mut s = chain(ProtocolSchedule::default());
    let late = T0 + 5 * INTERVAL + INTERVAL / 2;
    let report = run(&mut s, 50, late);
    assert_eq!(report.next_maintenance_time, T0 + 6 * INTERVAL);
    assert_eq!(s.dynamic.next_maintenance_time, T0 + 6 * INTERVAL);

    // the next block before the boundary does nothing
    assert!(maybe_perform_maintenance(&mut s, 51, late + 3).unwrap().is_none());
}

#[test]
fn test_registrations_reset_each_pass() {
    let mut s = chain(ProtocolSchedule::default());
    s.dynamic.accounts_registered_this_interval = 2_500;
    let report = run(&mut s, 2, T0);
    // two full scale steps of 4 bits each
    assert_eq!(report.account_create_basic_fee, params().account_create_basic_fee >> 8);
    assert_eq!(s.dynamic.accounts_registered_this_interval, 0);
}

#[test]
fn test_first_son_election_leaves_fee_scale_alone() {
    let mut s = chain(ProtocolSchedule::default());
    son(&mut s, 300);
    // one registration short of a scale step
    s.dynamic.accounts_registered_this_interval = 999;
    let report = run(&mut s, 2, T0);
    assert!(s.global.son_sidechain_account.is_some());
    assert_eq!(report.account_create_basic_fee, params().account_create_basic_fee);
}

// ============================================================
// DETERMINISM
// ============================================================

fn busy_chain() -> ChainState {
    let mut s = chain(ProtocolSchedule {
        normalized_authority_time: T0 + INTERVAL,
        ..Default::default()
    });
    son(&mut s, 300);
    son(&mut s, 200);
    son(&mut s, 100);

    let wa = s.create_account("worker");
    let worker = s.register_worker(wa, Timestamp::ZERO, Timestamp::MAX, 5_000, WorkerKind::Burn);
    let slot = s.workers[&worker].vote_for;
    voter(&mut s, 40_000, &[slot]);

    let issuer = s.create_account("issuer");
    let dist = s.create_account("distribution");
    let token = s.create_asset("TOKEN", issuer, 1_000_000);
    s.asset_mut(token).unwrap().dividend = Some(DividendData::new(
        dist,
        DividendOptions {
            next_payout_time: Some(T0),
            payout_interval: Some(INTERVAL),
            ..Default::default()
        },
    ));
    for amount in [7, 11, 13] {
        let h = s.create_account("holder");
        s.issue(h, token, amount).unwrap();
    }
    s.issue(dist, CORE_ASSET, 9_999).unwrap();
    s
}

#[test]
fn test_replayed_passes_are_identical() {
    let mut a = busy_chain();
    let mut b = a.clone();

    for (i, at) in [T0, T0 + INTERVAL, T0 + 3 * INTERVAL].into_iter().enumerate() {
        let block = 2 + i as u32 * 1_000;
        let ra = run(&mut a, block, at);
        let rb = run(&mut b, block, at);
        assert_eq!(ra, rb);
    }
    assert_eq!(a, b);
}

#[test]
fn test_weighting_switches_at_upgrade_time() {
    let mut s = busy_chain();
    let first = run(&mut s, 2, T0);
    assert_eq!(first.weighting, AuthorityWeighting::LegacyBitShift);
    let second = run(&mut s, 3, T0 + INTERVAL);
    assert_eq!(second.weighting, AuthorityWeighting::NormalizedVoteCounter);

    let witness_auth = &s.accounts[&WITNESS_ACCOUNT].active;
    assert_eq!(witness_auth.account_auths.len(), 1);
}

#[test]
fn test_failed_pass_commits_nothing() {
    let mut s = busy_chain();
    // the only witness is gone, so the witness election cannot be filled
    s.witnesses.clear();
    let before = s.clone();
    let err = maybe_perform_maintenance(&mut s, 2, T0).unwrap_err();
    assert!(matches!(err, MaintenanceError::InsufficientCandidates { .. }));
    // apart from the head block, nothing moved
    let mut expected = before;
    expected.dynamic.head_block_number = 2;
    expected.dynamic.head_block_time = T0;
    assert_eq!(s, expected);
}

// ============================================================
// SONS
// ============================================================

#[test]
fn test_son_set_rotates_wallet_when_ranking_changes() {
    let mut s = chain(ProtocolSchedule::default());
    let (a, _) = son(&mut s, 300);
    let (b, _) = son(&mut s, 200);
    let (c, c_voter) = son(&mut s, 100);

    let first = run(&mut s, 2, T0);
    assert!(first.sons.wallet_created);
    assert_eq!(first.sons.activated, vec![a, b]);
    assert_eq!(s.son_wallets.len(), 1);

    s.issue(c_voter, CORE_ASSET, 500).unwrap();
    let second = run(&mut s, 3, T0 + INTERVAL);
    assert!(second.sons.changed && second.sons.wallet_created);
    assert_eq!(second.sons.activated, vec![c]);
    assert_eq!(second.sons.deactivated, vec![b]);
    assert_eq!(s.sons[&b].status, SonStatus::Inactive);
    assert_eq!(s.global.son_schedule, vec![a, c]);

    let wallets: Vec<_> = s.son_wallets.values().collect();
    assert_eq!(wallets.len(), 2);
    assert_eq!(wallets[0].expires, T0 + INTERVAL);
    assert_eq!(wallets[1].valid_from, T0 + INTERVAL);
    assert_eq!(wallets[1].expires, Timestamp::MAX);
    assert_eq!(
        wallets[1].sons.iter().map(|si| si.son_id).collect::<Vec<_>>(),
        vec![c, a]
    );
}

// ============================================================
// FEE-BACKED ASSETS
// ============================================================

#[test]
fn test_fba_fees_split_during_pass() {
    let mut s = chain(ProtocolSchedule::default());
    let issuer = s.create_account("fba issuer");
    let buyback = s.create_account("buyback");
    let asset = s.create_asset("FBA", issuer, 1_000_000);
    s.asset_mut(asset).unwrap().buyback_account = Some(buyback);
    let fba = FbaAccumulatorId(1);
    {
        let acc = s.fba_accumulators.get_mut(&fba).unwrap();
        acc.accumulated_fba_fees = 1_000;
        acc.designated_asset = Some(asset);
    }
    // fees were collected out of circulating supply
    s.asset_mut(CORE_ASSET).unwrap().current_supply += 1_000;

    let report = run(&mut s, 2, T0);
    assert_eq!(report.fba.len(), 1);
    assert_eq!((report.fba[0].burned, report.fba[0].buyback, report.fba[0].issuer), (200, 600, 200));
    assert_eq!(s.get_balance(buyback, CORE_ASSET), 600);
    assert_eq!(s.get_balance(issuer, CORE_ASSET), 200);
    assert_eq!(s.fba_accumulators[&fba].accumulated_fba_fees, 0);
}

// ============================================================
// CONFIG & HISTORY
// ============================================================

#[test]
fn test_chain_config_from_toml() {
    let mut tmp = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        tmp,
        "[parameters]\nmaintenance_interval = 3600\nmin_witness_count = 5\nmax_son_count = 7\n\n\
         [schedule]\nnormalized_authority_time = 1700000000"
    )
    .unwrap();

    let cfg = ChainConfig::load(tmp.path()).expect("config loads");
    assert_eq!(cfg.parameters.maintenance_interval, 3_600);
    assert_eq!(cfg.parameters.min_witness_count, 5);
    assert_eq!(cfg.parameters.max_son_count, 7);
    assert_eq!(cfg.parameters.block_interval, 3);
    assert_eq!(cfg.schedule.normalized_authority_time, Timestamp(1_700_000_000));
    assert_eq!(cfg.schedule.son_activation_time, Timestamp::ZERO);

    let mut s = ChainState::new(cfg.parameters, cfg.schedule, 1_000_000);
    assert_eq!(s.parameters().maintenance_interval, 3_600);
    s.dynamic.head_block_time = Timestamp(1_699_999_999);
    assert_eq!(
        AuthorityWeighting::for_time(s.head_block_time(), &s.schedule),
        AuthorityWeighting::LegacyBitShift
    );
}

#[test]
fn test_chain_config_rejects_invalid_parameters() {
    let mut tmp = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(tmp, "[parameters]\nmin_witness_count = 4").unwrap();
    let err = ChainConfig::load(tmp.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("odd"));
}

#[test]
fn test_audit_log_serializes_for_history() {
    let mut s = busy_chain();
    run(&mut s, 2, T0);

    assert!(s
        .audit_log
        .iter()
        .any(|r| matches!(r, AuditRecord::BudgetRecorded(_))));
    assert!(s
        .audit_log
        .iter()
        .any(|r| matches!(r, AuditRecord::DividendPayout { .. })));

    let json = serde_json::to_string(&s.audit_log).unwrap();
    let back: Vec<AuditRecord> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, s.audit_log);
}
