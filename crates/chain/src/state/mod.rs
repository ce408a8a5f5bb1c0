//! # Chain State
//!
//! Facade over every ledger object the maintenance pass reads or writes.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     mod.rs (FACADE)                        │
//! │  ChainState definition, constructor, re-exports            │
//! └────────────────────────────────────────────────────────────┘
//!            │                    │                    │
//!            ▼                    ▼                    ▼
//!   ┌────────────────┐   ┌────────────────┐   ┌────────────────┐
//!   │ internal_model │   │internal_account│   │ internal_asset │
//!   │  object types  │   │ balances, vest │   │ supply, fees   │
//!   └────────────────┘   └────────────────┘   └────────────────┘
//!                                 │
//!                                 ▼
//!                        ┌────────────────┐
//!                        │ internal_misc  │
//!                        │ ids, audit log │
//!                        └────────────────┘
//! ```
//!
//! All collections are `BTreeMap`s keyed by object id, so every iteration
//! order is the id order on every node.

mod internal_account;
mod internal_asset;
mod internal_misc;
mod internal_model;


pub use internal_model::{
    Account, AccountOptions, Asset, AuditRecord, BudgetRecord, CommitteeMember, DividendData,
    DividendOptions, DynamicGlobalProperties, FbaAccumulator, GlobalProperties, Son, SonInfo,
    SonStatistics, SonStatus, SonWallet, TopHoldersAuthority, VestingBalance, Witness, Worker,
    WorkerKind, TOP_N_CONTROL_ACTIVE, TOP_N_CONTROL_OWNER,
};

use crate::params::{GlobalParameters, ProtocolSchedule};
use dpos_common::{
    AccountId, AssetId, CommitteeMemberId, FbaAccumulatorId, Share, SonId, SonWalletId, Timestamp,
    VestingBalanceId, WitnessId, WorkerId,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChainState {
    // ════════════════════════════════════════════════════════════════════
    // ACCOUNTS & BALANCES
    // ════════════════════════════════════════════════════════════════════
    pub accounts: BTreeMap<AccountId, Account>,

    /// Liquid balance per (owner, asset). Absent means zero.
    pub balances: BTreeMap<(AccountId, AssetId), Share>,

    pub vesting_balances: BTreeMap<VestingBalanceId, VestingBalance>,

    // ════════════════════════════════════════════════════════════════════
    // ASSETS
    // ════════════════════════════════════════════════════════════════════
    pub assets: BTreeMap<AssetId, Asset>,

    pub fba_accumulators: BTreeMap<FbaAccumulatorId, FbaAccumulator>,

    /// Payout-asset balance of each distribution account at the previous
    /// pass, keyed by (holder asset, payout asset).
    pub distributed_snapshots: BTreeMap<(AssetId, AssetId), Share>,

    /// Scheduled but unpaid dividends, keyed by
    /// (holder asset, payout asset, holder).
    pub pending_payouts: BTreeMap<(AssetId, AssetId, AccountId), Share>,

    // ════════════════════════════════════════════════════════════════════
    // CANDIDATES
    // ════════════════════════════════════════════════════════════════════
    pub witnesses: BTreeMap<WitnessId, Witness>,
    pub committee_members: BTreeMap<CommitteeMemberId, CommitteeMember>,
    pub sons: BTreeMap<SonId, Son>,
    pub son_wallets: BTreeMap<SonWalletId, SonWallet>,
    pub workers: BTreeMap<WorkerId, Worker>,

    // ════════════════════════════════════════════════════════════════════
    // GLOBALS
    // ════════════════════════════════════════════════════════════════════
    pub global: GlobalProperties,
    pub dynamic: DynamicGlobalProperties,
    pub schedule: ProtocolSchedule,

    // ════════════════════════════════════════════════════════════════════
    // AUDIT
    // ════════════════════════════════════════════════════════════════════
    pub budget_records: Vec<BudgetRecord>,
    pub audit_log: Vec<AuditRecord>,
}

impl ChainState {
    /// Empty ledger with the core asset and reserved accounts in place.
    pub fn new(parameters: GlobalParameters, schedule: ProtocolSchedule, max_core_supply: Share) -> Self {
        use dpos_common::ids::*;

        let mut state = ChainState {
            schedule,
            ..Default::default()
        };
        state.global.parameters = parameters;

        for (id, name) in [
            (COMMITTEE_ACCOUNT, "committee-account"),
            (WITNESS_ACCOUNT, "witness-account"),
            (RELAXED_COMMITTEE_ACCOUNT, "relaxed-committee-account"),
            (NULL_ACCOUNT, "null-account"),
            (TEMP_ACCOUNT, "temp-account"),
            (PROXY_TO_SELF_ACCOUNT, "proxy-to-self"),
            (AccountId(6), "default"),
            (SON_ACCOUNT, "son-account"),
        ] {
            state.accounts.insert(id, Account::new(id, name));
        }

        state
            .assets
            .insert(CORE_ASSET, Asset::new(CORE_ASSET, "CORE", COMMITTEE_ACCOUNT, max_core_supply));

        // transfer-to-blind, blind-transfer, transfer-from-blind
        for id in (0..3).map(FbaAccumulatorId) {
            state.fba_accumulators.insert(
                id,
                FbaAccumulator {
                    id,
                    accumulated_fba_fees: 0,
                    designated_asset: None,
                },
            );
        }
        state
    }

    pub fn parameters(&self) -> &GlobalParameters {
        &self.global.parameters
    }

    pub fn head_block_time(&self) -> Timestamp {
        self.dynamic.head_block_time
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn witnesses(&self) -> impl Iterator<Item = &Witness> {
        self.witnesses.values()
    }

    pub fn committee_members(&self) -> impl Iterator<Item = &CommitteeMember> {
        self.committee_members.values()
    }

    pub fn sons(&self) -> impl Iterator<Item = &Son> {
        self.sons.values()
    }

    pub fn latest_budget_record(&self) -> Option<&BudgetRecord> {
        self.budget_records.last()
    }
}
