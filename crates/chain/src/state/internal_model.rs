//! Ledger object definitions.
//!
//! Plain data only. Behavior lives in the sibling `internal_*` modules as
//! `impl ChainState` blocks and in `crate::maintenance`.

use crate::maintenance::authority::Authority;
use crate::params::GlobalParameters;
use dpos_common::{
    AccountId, AssetId, CommitteeMemberId, FbaAccumulatorId, Price, Share, SonId, SonWalletId,
    Timestamp, VestingBalanceId, VoteSlot, WitnessId, WorkerId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ════════════════════════════════════════════════════════════════════════════
// ACCOUNTS
// ════════════════════════════════════════════════════════════════════════════

/// Governance choices an account publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountOptions {
    /// `PROXY_TO_SELF_ACCOUNT` or the account whose opinion counts for us.
    pub voting_account: AccountId,
    /// Desired size of the witness set.
    pub num_witness: u16,
    /// Desired size of the committee.
    pub num_committee: u16,
    /// Desired size of the SON set.
    pub num_son: u16,
    pub votes: BTreeSet<VoteSlot>,
}

impl Default for AccountOptions {
    fn default() -> Self {
        Self {
            voting_account: dpos_common::ids::PROXY_TO_SELF_ACCOUNT,
            num_witness: 0,
            num_committee: 0,
            num_son: 0,
            votes: BTreeSet::new(),
        }
    }
}

/// Authority derived from the largest holders of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopHoldersAuthority {
    pub asset: AssetId,
    pub num_top_holders: u8,
}

pub const TOP_N_CONTROL_OWNER: u8 = 1;
pub const TOP_N_CONTROL_ACTIVE: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    /// Lifetime members carry `Timestamp::MAX`.
    pub membership_expiration: Timestamp,
    pub options: AccountOptions,
    /// Core locked as collateral in open orders.
    pub total_core_in_orders: Share,
    pub cashback_vb: Option<VestingBalanceId>,
    pub owner: Authority,
    pub active: Authority,
    pub owner_special_authority: Option<TopHoldersAuthority>,
    pub active_special_authority: Option<TopHoldersAuthority>,
    pub top_n_control_flags: u8,
}

impl Account {
    pub fn new(id: AccountId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            membership_expiration: Timestamp::ZERO,
            options: AccountOptions::default(),
            total_core_in_orders: 0,
            cashback_vb: None,
            owner: Authority::default(),
            active: Authority::default(),
            owner_special_authority: None,
            active_special_authority: None,
            top_n_control_flags: 0,
        }
    }

    pub fn is_member(&self, now: Timestamp) -> bool {
        self.membership_expiration > now
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingBalance {
    pub id: VestingBalanceId,
    pub owner: AccountId,
    pub asset_id: AssetId,
    pub amount: Share,
}

// ════════════════════════════════════════════════════════════════════════════
// ASSETS
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DividendOptions {
    pub next_payout_time: Option<Timestamp>,
    /// Seconds between payouts. `None` means a single payout.
    pub payout_interval: Option<u32>,
    /// Advisory for issuers. Distribution itself runs every pass.
    pub minimum_distribution_interval: Option<u32>,
    /// Basis points. A distribution is skipped unless the fee is at most this
    /// share of the amount distributed. Zero disables the check.
    pub minimum_fee_percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendData {
    pub options: DividendOptions,
    pub distribution_account: AccountId,
    pub last_scheduled_payout_time: Option<Timestamp>,
    pub last_payout_time: Option<Timestamp>,
    pub last_scheduled_distribution_time: Option<Timestamp>,
    pub last_distribution_time: Option<Timestamp>,
}

impl DividendData {
    pub fn new(distribution_account: AccountId, options: DividendOptions) -> Self {
        Self {
            options,
            distribution_account,
            last_scheduled_payout_time: None,
            last_payout_time: None,
            last_scheduled_distribution_time: None,
            last_distribution_time: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub symbol: String,
    pub issuer: AccountId,
    pub max_supply: Share,
    pub current_supply: Share,
    /// Fees collected in this asset, not yet claimed by the issuer.
    pub accumulated_fees: Share,
    /// Core reserved to pay fees on behalf of holders of this asset.
    pub fee_pool: Share,
    pub core_exchange_rate: Price,
    pub buyback_account: Option<AccountId>,
    pub dividend: Option<DividendData>,
}

impl Asset {
    pub fn new(id: AssetId, symbol: impl Into<String>, issuer: AccountId, max_supply: Share) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            issuer,
            max_supply,
            current_supply: 0,
            accumulated_fees: 0,
            fee_pool: 0,
            core_exchange_rate: Price::unit(id),
            buyback_account: None,
            dividend: None,
        }
    }

    /// Unissued supply.
    pub fn reserved(&self) -> Share {
        self.max_supply - self.current_supply
    }
}

/// Fees from confidential transfers, split between network and an asset's
/// buyback program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FbaAccumulator {
    pub id: FbaAccumulatorId,
    pub accumulated_fba_fees: Share,
    pub designated_asset: Option<AssetId>,
}

// ════════════════════════════════════════════════════════════════════════════
// CANDIDATES
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub id: WitnessId,
    pub account: AccountId,
    pub vote_slot: VoteSlot,
    pub total_votes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeMember {
    pub id: CommitteeMemberId,
    pub account: AccountId,
    pub vote_slot: VoteSlot,
    pub total_votes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SonStatus {
    Inactive,
    Active,
    RequestMaintenance,
    InMaintenance,
    Deregistered,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SonStatistics {
    /// Sidechain transactions signed since the last payout.
    pub txs_signed: u64,
    pub total_downtime: u64,
    pub current_interval_downtime: u64,
    pub last_down_timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Son {
    pub id: SonId,
    pub account: AccountId,
    pub vote_slot: VoteSlot,
    pub total_votes: u64,
    pub signing_key: String,
    /// Sidechain name -> public key on that chain.
    pub sidechain_public_keys: std::collections::BTreeMap<String, String>,
    pub status: SonStatus,
    pub statistics: SonStatistics,
}

/// Entry of the active SON list, as recorded in global properties and wallets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SonInfo {
    pub son_id: SonId,
    pub total_votes: u64,
    pub signing_key: String,
    pub sidechain_public_keys: std::collections::BTreeMap<String, String>,
}

/// Sidechain wallet controlled by one SON set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SonWallet {
    pub id: SonWalletId,
    pub valid_from: Timestamp,
    pub expires: Timestamp,
    pub sons: Vec<SonInfo>,
}

// ════════════════════════════════════════════════════════════════════════════
// WORKERS
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerKind {
    /// Pay is returned to the reserve.
    Refund,
    /// Pay is deposited into a vesting balance.
    Vesting(VestingBalanceId),
    /// Pay is sent to the null account.
    Burn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub account: AccountId,
    pub work_begin_date: Timestamp,
    pub work_end_date: Timestamp,
    pub daily_pay: Share,
    pub kind: WorkerKind,
    pub vote_for: VoteSlot,
    pub vote_against: VoteSlot,
    pub total_votes_for: u64,
    pub total_votes_against: u64,
    /// Refunded or burned so far.
    pub total_burned: Share,
}

impl Worker {
    pub fn is_active(&self, now: Timestamp) -> bool {
        now >= self.work_begin_date && now <= self.work_end_date
    }

    pub fn approving_stake(&self) -> i128 {
        self.total_votes_for as i128 - self.total_votes_against as i128
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GLOBAL PROPERTIES
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GlobalProperties {
    pub parameters: GlobalParameters,
    /// Committee-approved parameters, activated at the next pass.
    pub pending_parameters: Option<GlobalParameters>,
    /// Sorted by id.
    pub active_witnesses: Vec<WitnessId>,
    /// In election rank order.
    pub active_committee_members: Vec<CommitteeMemberId>,
    pub active_sons: Vec<SonInfo>,
    pub next_available_vote_slot: u32,
    /// Multisig account on the sidechain side of the SON bridge.
    pub son_sidechain_account: Option<AccountId>,
    /// Block production order for the coming interval.
    pub witness_schedule: Vec<WitnessId>,
    pub son_schedule: Vec<SonId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DynamicGlobalProperties {
    pub head_block_number: u32,
    pub head_block_time: Timestamp,
    pub next_maintenance_time: Timestamp,
    pub last_budget_time: Timestamp,
    /// Unspent witness pay from the previous interval.
    pub witness_budget: Share,
    /// Unspent SON pay from the previous interval.
    pub son_budget: Share,
    pub last_son_payout_time: Timestamp,
    pub accounts_registered_this_interval: u32,
}

// ════════════════════════════════════════════════════════════════════════════
// AUDIT
// ════════════════════════════════════════════════════════════════════════════

/// Treasury allocation for one interval. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub time: Timestamp,
    pub time_since_last_budget: u64,
    pub from_initial_reserve: Share,
    pub from_accumulated_fees: Share,
    pub from_unused_witness_budget: Share,
    pub requested_witness_budget: Share,
    pub total_budget: Share,
    pub witness_budget: Share,
    pub worker_budget: Share,
    pub leftover_worker_funds: Share,
    pub son_budget: Share,
    pub leftover_son_funds: Share,
    pub supply_delta: Share,
}

/// Virtual operations visible to history APIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditRecord {
    DividendPayout {
        holder_asset: AssetId,
        account: AccountId,
        amounts: Vec<(AssetId, Share)>,
    },
    FbaDistribution {
        fba: FbaAccumulatorId,
        account: AccountId,
        amount: Share,
    },
    BudgetRecorded(BudgetRecord),
}
