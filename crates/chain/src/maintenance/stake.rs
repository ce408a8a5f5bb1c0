//! Voting stake of an account and resolution of who holds its opinion.

use crate::params::GlobalParameters;
use crate::state::{Account, ChainState};
use dpos_common::ids::{CORE_ASSET, PROXY_TO_SELF_ACCOUNT};
use dpos_common::{AccountId, Share, Timestamp};
use std::collections::BTreeMap;

/// Core held in vesting balances, summed per owner. Built once per pass.
pub type CoreVesting = BTreeMap<AccountId, Share>;

pub fn core_vesting_by_owner(state: &ChainState) -> CoreVesting {
    state.vesting_by_owner(CORE_ASSET)
}

/// Core balance + core locked in open orders + cashback vesting balance +
/// every core vesting balance the account owns.
///
/// A cashback vesting balance is also among the owned vesting balances, so
/// it counts twice. Tallies recorded on chain depend on this.
pub fn voting_stake(state: &ChainState, account: &Account, core_vesting: &CoreVesting) -> u64 {
    let mut stake: i128 = state.get_balance(account.id, CORE_ASSET) as i128;
    stake += account.total_core_in_orders as i128;
    if let Some(vb) = account.cashback_vb.and_then(|id| state.vesting_balance(id)) {
        if vb.asset_id == CORE_ASSET {
            stake += vb.amount as i128;
        }
    }
    stake += core_vesting.get(&account.id).copied().unwrap_or(0) as i128;
    stake.clamp(0, u64::MAX as i128) as u64
}

/// Account whose published options decide how `account`'s stake is voted.
/// Proxies do not chain. `None` when the named proxy does not exist.
pub fn opinion_holder<'a>(state: &'a ChainState, account: &'a Account) -> Option<&'a Account> {
    if account.options.voting_account == PROXY_TO_SELF_ACCOUNT {
        Some(account)
    } else {
        state.accounts.get(&account.options.voting_account)
    }
}

pub fn counts_toward_tally(params: &GlobalParameters, account: &Account, now: Timestamp) -> bool {
    params.count_non_member_votes || account.is_member(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ProtocolSchedule;

    fn setup() -> (ChainState, AccountId) {
        let mut s = ChainState::new(GlobalParameters::default(), ProtocolSchedule::default(), 1_000_000_000);
        let alice = s.create_account("alice");
        (s, alice)
    }

    #[test]
    fn test_stake_sums_all_sources() {
        let (mut s, alice) = setup();
        s.issue(alice, CORE_ASSET, 1_000).unwrap();
        let cashback = s.create_vesting_balance(alice, CORE_ASSET, 50);
        s.create_vesting_balance(alice, CORE_ASSET, 7);
        {
            let acct = s.accounts.get_mut(&alice).unwrap();
            acct.total_core_in_orders = 200;
            acct.cashback_vb = Some(cashback);
        }
        let cv = core_vesting_by_owner(&s);
        let acct = &s.accounts[&alice];
        // cashback counted both directly and as an owned vesting balance
        assert_eq!(voting_stake(&s, acct, &cv), 1_000 + 200 + 50 + 57);
    }

    #[test]
    fn test_foreign_asset_vesting_ignored() {
        let (mut s, alice) = setup();
        let other = s.create_asset("OTHER", alice, 1_000);
        s.create_vesting_balance(alice, other, 99);
        let cv = core_vesting_by_owner(&s);
        assert_eq!(voting_stake(&s, &s.accounts[&alice], &cv), 0);
    }

    #[test]
    fn test_opinion_holder_resolution() {
        let (mut s, alice) = setup();
        let bob = s.create_account("bob");
        let carol = s.create_account("carol");
        s.accounts.get_mut(&alice).unwrap().options.voting_account = bob;
        // bob proxies to carol, which must not chain for alice
        s.accounts.get_mut(&bob).unwrap().options.voting_account = carol;

        assert_eq!(opinion_holder(&s, &s.accounts[&alice]).map(|a| a.id), Some(bob));
        assert_eq!(opinion_holder(&s, &s.accounts[&carol]).map(|a| a.id), Some(carol));

        s.accounts.get_mut(&alice).unwrap().options.voting_account = AccountId(999);
        assert!(opinion_holder(&s, &s.accounts[&alice]).is_none());
    }

    #[test]
    fn test_member_policy() {
        let (mut s, alice) = setup();
        let now = Timestamp(1_000);
        let mut params = GlobalParameters::default();
        params.count_non_member_votes = false;
        assert!(!counts_toward_tally(&params, &s.accounts[&alice], now));
        s.accounts.get_mut(&alice).unwrap().membership_expiration = Timestamp::MAX;
        assert!(counts_toward_tally(&params, &s.accounts[&alice], now));
    }
}
