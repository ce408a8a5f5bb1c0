//! Top-holder special authorities.
//!
//! An account may hand its owner or active authority to the largest holders
//! of an asset. Each pass rebuilds such authorities from current balances.

use super::authority::VoteCounter;
use crate::state::{ChainState, TopHoldersAuthority, TOP_N_CONTROL_ACTIVE, TOP_N_CONTROL_OWNER};
use dpos_common::{AccountId, Share};
use std::cmp::Reverse;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Owner,
    Active,
}

/// Rewrite every top-holder authority. Returns the number rewritten.
pub fn update_top_holder_authorities(state: &mut ChainState) -> usize {
    let targets: Vec<(AccountId, Slot, TopHoldersAuthority)> = state
        .accounts
        .values()
        .flat_map(|a| {
            let owner = a.owner_special_authority.map(|t| (a.id, Slot::Owner, t));
            let active = a.active_special_authority.map(|t| (a.id, Slot::Active, t));
            owner.into_iter().chain(active)
        })
        .collect();

    let mut rewritten = 0;
    for (account, slot, tha) in targets {
        if tha.num_top_holders == 0 {
            continue;
        }
        let counter = top_holders(state, account, tha);

        let Some(acct) = state.accounts.get_mut(&account) else {
            continue;
        };
        let (authority, flag) = match slot {
            Slot::Owner => (&mut acct.owner, TOP_N_CONTROL_OWNER),
            Slot::Active => (&mut acct.active, TOP_N_CONTROL_ACTIVE),
        };
        counter.finish(authority);
        if !counter.is_empty() {
            acct.top_n_control_flags |= flag;
            rewritten += 1;
        }
        debug!(account = %account, asset = %tha.asset, slot = ?slot, holders = tha.num_top_holders, "Top holder authority");
    }
    rewritten
}

/// Weights of the `num_top_holders` largest holders of `tha.asset`, the
/// controlled account excluded. Zero balances use up a seat but carry no
/// weight.
fn top_holders(state: &ChainState, account: AccountId, tha: TopHoldersAuthority) -> VoteCounter {
    let mut holders: Vec<(AccountId, Share)> = state
        .holders_of(tha.asset)
        .filter(|(owner, _)| *owner != account)
        .collect();
    holders.sort_by_key(|(owner, balance)| (Reverse(*balance), *owner));

    let mut vc = VoteCounter::new();
    for (owner, balance) in holders.into_iter().take(tha.num_top_holders as usize) {
        vc.add(owner, balance.max(0) as u64);
    }
    vc
}
