//! Object creation and audit helpers.
//!
//! The registration functions here stand in for the transaction evaluators
//! that create objects on a live chain: they allocate ids and vote slots the
//! same way and are what genesis loading and tests build state with.

use super::{
    Account, Asset, AuditRecord, ChainState, CommitteeMember, Son, SonStatistics, SonStatus,
    VestingBalance, Witness, Worker, WorkerKind,
};
use crate::error::MaintenanceResult;
use dpos_common::{
    AccountId, AssetId, CommitteeMemberId, Share, SonId, SonWalletId, Timestamp, VestingBalanceId,
    VoteSlot, WitnessId, WorkerId,
};
use std::collections::BTreeMap;

fn next_key<K: Copy, V>(map: &BTreeMap<K, V>) -> u64
where
    u64: From<K>,
{
    map.keys().next_back().map(|k| u64::from(*k) + 1).unwrap_or(0)
}

impl ChainState {
    pub fn emit_audit_record(&mut self, record: AuditRecord) {
        self.audit_log.push(record);
    }

    pub fn allocate_vote_slot(&mut self) -> VoteSlot {
        let slot = VoteSlot(self.global.next_available_vote_slot);
        self.global.next_available_vote_slot += 1;
        slot
    }

    pub fn create_account(&mut self, name: impl Into<String>) -> AccountId {
        let id = self.create_system_account(name);
        self.dynamic.accounts_registered_this_interval += 1;
        id
    }

    /// Account created by the chain itself. Does not count toward the
    /// registration fee scale.
    pub(crate) fn create_system_account(&mut self, name: impl Into<String>) -> AccountId {
        let id = AccountId(next_key(&self.accounts));
        self.accounts.insert(id, Account::new(id, name));
        id
    }

    pub fn create_asset(&mut self, symbol: impl Into<String>, issuer: AccountId, max_supply: Share) -> AssetId {
        let id = AssetId(next_key(&self.assets));
        self.assets.insert(id, Asset::new(id, symbol, issuer, max_supply));
        id
    }

    /// Credit newly issued units of `asset` to `account`.
    pub fn issue(&mut self, account: AccountId, asset: AssetId, amount: Share) -> MaintenanceResult<()> {
        self.apply_supply_delta(asset, amount)?;
        self.credit_balance(account, asset, amount)
    }

    pub fn create_vesting_balance(&mut self, owner: AccountId, asset_id: AssetId, amount: Share) -> VestingBalanceId {
        let id = VestingBalanceId(next_key(&self.vesting_balances));
        self.vesting_balances
            .insert(id, VestingBalance { id, owner, asset_id, amount });
        id
    }

    pub fn register_witness(&mut self, account: AccountId) -> WitnessId {
        let id = WitnessId(next_key(&self.witnesses));
        let vote_slot = self.allocate_vote_slot();
        self.witnesses
            .insert(id, Witness { id, account, vote_slot, total_votes: 0 });
        id
    }

    pub fn register_committee_member(&mut self, account: AccountId) -> CommitteeMemberId {
        let id = CommitteeMemberId(next_key(&self.committee_members));
        let vote_slot = self.allocate_vote_slot();
        self.committee_members
            .insert(id, CommitteeMember { id, account, vote_slot, total_votes: 0 });
        id
    }

    pub fn register_son(&mut self, account: AccountId, signing_key: impl Into<String>) -> SonId {
        let id = SonId(next_key(&self.sons));
        let vote_slot = self.allocate_vote_slot();
        self.sons.insert(
            id,
            Son {
                id,
                account,
                vote_slot,
                total_votes: 0,
                signing_key: signing_key.into(),
                sidechain_public_keys: BTreeMap::new(),
                status: SonStatus::Inactive,
                statistics: SonStatistics::default(),
            },
        );
        id
    }

    pub fn register_worker(
        &mut self,
        account: AccountId,
        work_begin_date: Timestamp,
        work_end_date: Timestamp,
        daily_pay: Share,
        kind: WorkerKind,
    ) -> WorkerId {
        let id = WorkerId(next_key(&self.workers));
        let vote_for = self.allocate_vote_slot();
        let vote_against = self.allocate_vote_slot();
        self.workers.insert(
            id,
            Worker {
                id,
                account,
                work_begin_date,
                work_end_date,
                daily_pay,
                kind,
                vote_for,
                vote_against,
                total_votes_for: 0,
                total_votes_against: 0,
                total_burned: 0,
            },
        );
        id
    }

    pub(crate) fn next_son_wallet_id(&self) -> SonWalletId {
        SonWalletId(next_key(&self.son_wallets))
    }
}
