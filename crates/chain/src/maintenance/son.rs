//! SON set maintenance: election, status transitions, sidechain wallet
//! rotation, metrics roll-up and daily pay.

use super::authority::{two_thirds_authority, AuthorityWeighting};
use super::election::{authority_members, elect, Candidate, RoleConfig};
use super::tally::VoteTally;
use crate::error::{MaintenanceError, MaintenanceResult};
use crate::state::{Account, ChainState, Son, SonInfo, SonStatus, SonWallet};
use dpos_common::ids::{CORE_ASSET, SON_ACCOUNT};
use dpos_common::{AccountId, Share, SonId, Timestamp, VoteSlot, SECONDS_PER_DAY};
use tracing::{debug, info};

impl Candidate for Son {
    type Id = SonId;
    fn id(&self) -> SonId {
        self.id
    }
    fn account(&self) -> AccountId {
        self.account
    }
    fn vote_slot(&self) -> VoteSlot {
        self.vote_slot
    }
}

impl SonInfo {
    fn from_son(son: &Son) -> Self {
        SonInfo {
            son_id: son.id,
            total_votes: son.total_votes,
            signing_key: son.signing_key.clone(),
            sidechain_public_keys: son.sidechain_public_keys.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SonSetChange {
    pub changed: bool,
    pub wallet_created: bool,
    pub deactivated: Vec<SonId>,
    pub activated: Vec<SonId>,
}

pub fn update_active_sons(
    state: &mut ChainState,
    tally: &VoteTally,
    weighting: AuthorityWeighting,
) -> MaintenanceResult<SonSetChange> {
    let config = RoleConfig::son(state, weighting);
    let selected = elect(&config, state.sons.values(), tally);
    let now = state.head_block_time();

    for son in state.sons.values_mut() {
        if son.status == SonStatus::RequestMaintenance {
            son.statistics.last_down_timestamp = now;
            son.status = SonStatus::InMaintenance;
        }
        son.total_votes = tally.votes_for(son.vote_slot);
    }

    let son_account = state
        .accounts
        .get_mut(&SON_ACCOUNT)
        .ok_or_else(|| MaintenanceError::unknown("account", SON_ACCOUNT))?;
    weighting.apply(&mut son_account.active, &authority_members(&selected));

    let new_active: Vec<SonInfo> = selected
        .iter()
        .filter_map(|r| state.sons.get(&r.id))
        .map(SonInfo::from_son)
        .collect();

    let mut change = SonSetChange::default();
    if new_active != state.global.active_sons {
        change.changed = true;
        change.wallet_created = rotate_wallet(state, &new_active, now);

        let previous = std::mem::take(&mut state.global.active_sons);
        for si in previous.iter().filter(|si| !new_active.contains(si)) {
            // A SON deleted since the last pass has nothing to update.
            if let Some(son) = state.sons.get_mut(&si.son_id) {
                if son.status == SonStatus::Active {
                    son.status = SonStatus::Inactive;
                    change.deactivated.push(son.id);
                }
            }
        }
        for si in new_active.iter().filter(|si| !previous.contains(si)) {
            let son = state
                .sons
                .get_mut(&si.son_id)
                .ok_or_else(|| MaintenanceError::unknown("SON", si.son_id))?;
            if son.status == SonStatus::Inactive {
                son.status = SonStatus::Active;
                change.activated.push(son.id);
            }
        }
        info!(
            active = new_active.len(),
            activated = change.activated.len(),
            deactivated = change.deactivated.len(),
            wallet_created = change.wallet_created,
            "Active SON set changed"
        );
    } else {
        debug!(active = new_active.len(), "Active SON set unchanged");
    }

    let mut schedule: Vec<SonId> = new_active.iter().map(|si| si.son_id).collect();
    schedule.sort();
    state.global.son_schedule = schedule;
    state.global.active_sons = new_active;

    update_son_metrics(state);

    if !state.global.active_sons.is_empty() {
        update_sidechain_account(state, tally)?;
    }
    Ok(change)
}

/// Expire the newest wallet if its members differ from `new_active` and open
/// a replacement. Returns whether a wallet was created.
fn rotate_wallet(state: &mut ChainState, new_active: &[SonInfo], now: Timestamp) -> bool {
    let mut recreate = true;
    if let Some(latest) = state.son_wallets.values_mut().next_back() {
        recreate = latest.sons.as_slice() != new_active;
        if recreate {
            latest.expires = now;
        }
    }
    if recreate {
        let id = state.next_son_wallet_id();
        state.son_wallets.insert(
            id,
            SonWallet {
                id,
                valid_from: now,
                expires: Timestamp::MAX,
                sons: new_active.to_vec(),
            },
        );
    }
    recreate
}

/// Fold this interval's downtime into the running total.
pub fn update_son_metrics(state: &mut ChainState) {
    for son in state.sons.values_mut() {
        let stats = &mut son.statistics;
        stats.total_downtime = stats.total_downtime.saturating_add(stats.current_interval_downtime);
        stats.current_interval_downtime = 0;
    }
}

/// Create or refresh the multisig that signs on the sidechain side.
fn update_sidechain_account(state: &mut ChainState, tally: &VoteTally) -> MaintenanceResult<()> {
    let mut members = Vec::with_capacity(state.global.active_sons.len());
    for si in &state.global.active_sons {
        let son = state
            .sons
            .get(&si.son_id)
            .ok_or_else(|| MaintenanceError::unknown("SON", si.son_id))?;
        members.push((son.account, tally.votes_for(son.vote_slot)));
    }
    let authority = two_thirds_authority(&members);

    let id = match state.global.son_sidechain_account {
        Some(id) => id,
        None => {
            let id = state.create_system_account("son-sidechain-account");
            state.global.son_sidechain_account = Some(id);
            id
        }
    };
    let account: &mut Account = state
        .accounts
        .get_mut(&id)
        .ok_or_else(|| MaintenanceError::unknown("account", id))?;
    account.membership_expiration = Timestamp::MAX;
    account.owner = authority.clone();
    account.active = authority;
    Ok(())
}

/// Pay SONs from last interval's SON budget, proportional to transactions
/// signed, at most once a day. Returns the total paid.
pub fn pay_sons(state: &mut ChainState) -> MaintenanceResult<Share> {
    let now = state.head_block_time();
    let budget = state.dynamic.son_budget;
    if budget <= 0 || now.saturating_elapsed_since(state.dynamic.last_son_payout_time) < SECONDS_PER_DAY {
        return Ok(0);
    }

    let total_txs: u128 = state.sons.values().map(|s| s.statistics.txs_signed as u128).sum();
    let mut payments: Vec<(AccountId, Share)> = Vec::new();
    for son in state.sons.values_mut() {
        if son.statistics.txs_signed == 0 {
            continue;
        }
        let pay = (son.statistics.txs_signed as u128 * budget as u128 / total_txs) as Share;
        payments.push((son.account, pay));
        son.statistics.txs_signed = 0;
    }

    let mut paid: Share = 0;
    for (account, pay) in payments {
        state.credit_balance(account, CORE_ASSET, pay)?;
        paid += pay;
    }
    state.dynamic.son_budget -= paid;
    state.dynamic.last_son_payout_time = now;
    debug!(paid, remaining = state.dynamic.son_budget, "SONs paid");
    Ok(paid)
}
