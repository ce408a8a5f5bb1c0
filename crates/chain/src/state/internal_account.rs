//! Balance and vesting bookkeeping.

use super::{ChainState, VestingBalance};
use crate::error::{MaintenanceError, MaintenanceResult};
use dpos_common::{AccountId, AssetId, Share, VestingBalanceId};
use std::collections::BTreeMap;

impl ChainState {
    pub fn get_balance(&self, account: AccountId, asset: AssetId) -> Share {
        self.balances.get(&(account, asset)).copied().unwrap_or(0)
    }

    pub fn credit_balance(&mut self, account: AccountId, asset: AssetId, amount: Share) -> MaintenanceResult<()> {
        if amount < 0 {
            return self.debit_balance(account, asset, -amount);
        }
        let bal = self.balances.entry((account, asset)).or_insert(0);
        *bal = bal
            .checked_add(amount)
            .ok_or(MaintenanceError::Overflow("credit_balance"))?;
        Ok(())
    }

    pub fn debit_balance(&mut self, account: AccountId, asset: AssetId, amount: Share) -> MaintenanceResult<()> {
        let available = self.get_balance(account, asset);
        if available < amount {
            return Err(MaintenanceError::InsufficientBalance {
                account,
                asset,
                available,
                requested: amount,
            });
        }
        self.balances.insert((account, asset), available - amount);
        Ok(())
    }

    /// Liquid balances of one asset, in holder id order. Includes explicit
    /// zero entries.
    pub fn holders_of(&self, asset: AssetId) -> impl Iterator<Item = (AccountId, Share)> + '_ {
        self.balances
            .iter()
            .filter(move |((_, a), _)| *a == asset)
            .map(|((owner, _), bal)| (*owner, *bal))
    }

    /// All non-zero balances held by `account`, in asset id order.
    pub fn balances_of(&self, account: AccountId) -> BTreeMap<AssetId, Share> {
        self.balances
            .range((account, AssetId(0))..=(account, AssetId(u64::MAX)))
            .filter(|(_, bal)| **bal != 0)
            .map(|((_, asset), bal)| (*asset, *bal))
            .collect()
    }

    pub fn vesting_balance(&self, id: VestingBalanceId) -> Option<&VestingBalance> {
        self.vesting_balances.get(&id)
    }

    /// Vesting amounts of `asset` summed per owner.
    pub fn vesting_by_owner(&self, asset: AssetId) -> BTreeMap<AccountId, Share> {
        let mut out: BTreeMap<AccountId, Share> = BTreeMap::new();
        for vb in self.vesting_balances.values() {
            if vb.asset_id == asset && vb.amount != 0 {
                *out.entry(vb.owner).or_insert(0) += vb.amount;
            }
        }
        out
    }

    pub fn deposit_vesting(&mut self, id: VestingBalanceId, amount: Share) -> MaintenanceResult<()> {
        let vb = self
            .vesting_balances
            .get_mut(&id)
            .ok_or_else(|| MaintenanceError::unknown("vesting balance", id))?;
        vb.amount = vb
            .amount
            .checked_add(amount)
            .ok_or(MaintenanceError::Overflow("deposit_vesting"))?;
        Ok(())
    }
}
