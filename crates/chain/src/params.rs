//! Consensus parameters and protocol-upgrade schedule.
//!
//! Both structs are plain serde types with defaults matching the chain's
//! launch values, loadable from TOML through [`ChainConfig::load`].

use crate::error::{MaintenanceError, MaintenanceResult};
use dpos_common::{Share, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest units per whole core token.
pub const CORE_PRECISION: Share = 100_000;

/// Basis-point denominator (100%).
pub const ONE_HUNDRED_PERCENT: u32 = 10_000;
pub const ONE_PERCENT: u32 = ONE_HUNDRED_PERCENT / 100;

pub const DEFAULT_BLOCK_INTERVAL: u32 = 3;
pub const DEFAULT_MAINTENANCE_INTERVAL: u32 = 86_400;
pub const DEFAULT_MIN_WITNESS_COUNT: u16 = 11;
pub const DEFAULT_MIN_COMMITTEE_COUNT: u16 = 11;
pub const DEFAULT_MAX_WITNESS_COUNT: u16 = 1001;
pub const DEFAULT_MAX_COMMITTEE_COUNT: u16 = 1001;
pub const DEFAULT_MAX_SON_COUNT: u16 = 15;
pub const DEFAULT_CORE_ASSET_CYCLE_RATE: u32 = 17;
pub const DEFAULT_CORE_ASSET_CYCLE_RATE_BITS: u8 = 32;
pub const DEFAULT_WITNESS_PAY_PER_BLOCK: Share = 10 * CORE_PRECISION;
pub const DEFAULT_WORKER_BUDGET_PER_DAY: Share = 500_000 * CORE_PRECISION;
pub const DEFAULT_SON_PAY_DAILY_MAX: Share = 200 * CORE_PRECISION;
pub const DEFAULT_ACCOUNT_FEE_SCALE_BITSHIFTS: u8 = 4;
pub const DEFAULT_ACCOUNTS_PER_FEE_SCALE: u16 = 1000;
pub const DEFAULT_ACCOUNT_CREATE_BASIC_FEE: Share = 5 * CORE_PRECISION;

/// Chain-wide parameters, changed only by committee proposals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalParameters {
    /// Seconds between blocks.
    pub block_interval: u32,
    /// Seconds between maintenance passes.
    pub maintenance_interval: u32,
    pub min_witness_count: u16,
    pub max_witness_count: u16,
    pub min_committee_count: u16,
    pub max_committee_count: u16,
    /// Fixed size of the active SON set.
    pub max_son_count: u16,
    pub witness_pay_per_block: Share,
    pub worker_budget_per_day: Share,
    pub son_pay_daily_max: Share,
    /// Reserve decay numerator. Budget per second is
    /// `reserve * rate / 2^bits`.
    pub core_asset_cycle_rate: u32,
    pub core_asset_cycle_rate_bits: u8,
    /// When false only accounts with live membership have their votes counted.
    pub count_non_member_votes: bool,
    pub account_fee_scale_bitshifts: u8,
    pub accounts_per_fee_scale: u16,
    /// Base fee of account creation, rescaled at every pass.
    pub account_create_basic_fee: Share,
    /// Dividend distribution fee, charged per payout asset in core.
    pub distribution_base_fee: Share,
    pub distribution_fee_per_holder: Share,
}

impl Default for GlobalParameters {
    fn default() -> Self {
        Self {
            block_interval: DEFAULT_BLOCK_INTERVAL,
            maintenance_interval: DEFAULT_MAINTENANCE_INTERVAL,
            min_witness_count: DEFAULT_MIN_WITNESS_COUNT,
            max_witness_count: DEFAULT_MAX_WITNESS_COUNT,
            min_committee_count: DEFAULT_MIN_COMMITTEE_COUNT,
            max_committee_count: DEFAULT_MAX_COMMITTEE_COUNT,
            max_son_count: DEFAULT_MAX_SON_COUNT,
            witness_pay_per_block: DEFAULT_WITNESS_PAY_PER_BLOCK,
            worker_budget_per_day: DEFAULT_WORKER_BUDGET_PER_DAY,
            son_pay_daily_max: DEFAULT_SON_PAY_DAILY_MAX,
            core_asset_cycle_rate: DEFAULT_CORE_ASSET_CYCLE_RATE,
            core_asset_cycle_rate_bits: DEFAULT_CORE_ASSET_CYCLE_RATE_BITS,
            count_non_member_votes: true,
            account_fee_scale_bitshifts: DEFAULT_ACCOUNT_FEE_SCALE_BITSHIFTS,
            accounts_per_fee_scale: DEFAULT_ACCOUNTS_PER_FEE_SCALE,
            account_create_basic_fee: DEFAULT_ACCOUNT_CREATE_BASIC_FEE,
            distribution_base_fee: 0,
            distribution_fee_per_holder: 0,
        }
    }
}

impl GlobalParameters {
    /// Reject parameter sets that no maintenance pass can honor.
    pub fn validate(&self) -> MaintenanceResult<()> {
        fn invalid(msg: String) -> MaintenanceResult<()> {
            Err(MaintenanceError::InvalidParameters(msg))
        }

        if self.block_interval == 0 {
            return invalid("block_interval must be positive".into());
        }
        if self.maintenance_interval == 0 {
            return invalid("maintenance_interval must be positive".into());
        }
        if self.maintenance_interval % self.block_interval != 0 {
            return invalid(format!(
                "maintenance_interval {} is not a multiple of block_interval {}",
                self.maintenance_interval, self.block_interval
            ));
        }
        for (name, min, max) in [
            ("witness", self.min_witness_count, self.max_witness_count),
            ("committee", self.min_committee_count, self.max_committee_count),
        ] {
            if min % 2 == 0 {
                return invalid(format!("min_{}_count must be odd, got {}", name, min));
            }
            if min > max {
                return invalid(format!(
                    "min_{}_count {} exceeds max_{}_count {}",
                    name, min, name, max
                ));
            }
        }
        if self.max_son_count == 0 {
            return invalid("max_son_count must be at least 1".into());
        }
        if self.accounts_per_fee_scale == 0 {
            return invalid("accounts_per_fee_scale must be positive".into());
        }
        if self.core_asset_cycle_rate_bits >= 64 {
            return invalid(format!(
                "core_asset_cycle_rate_bits {} out of range",
                self.core_asset_cycle_rate_bits
            ));
        }
        if self.witness_pay_per_block < 0
            || self.worker_budget_per_day < 0
            || self.son_pay_daily_max < 0
            || self.distribution_base_fee < 0
            || self.distribution_fee_per_holder < 0
        {
            return invalid("pay and fee parameters must be non-negative".into());
        }
        Ok(())
    }
}

/// Activation times of protocol upgrades that change maintenance behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSchedule {
    /// From this time role authorities are built with the normalizing vote
    /// counter instead of the legacy bit-shift weighting.
    pub normalized_authority_time: Timestamp,
    /// Before this time votes against a worker subtract from its approval.
    pub negative_worker_votes_until: Timestamp,
    /// From this time SONs are paid and budgeted.
    pub son_activation_time: Timestamp,
}

impl Default for ProtocolSchedule {
    fn default() -> Self {
        Self {
            normalized_authority_time: Timestamp::ZERO,
            negative_worker_votes_until: Timestamp::ZERO,
            son_activation_time: Timestamp::ZERO,
        }
    }
}

impl ProtocolSchedule {
    pub fn sons_active(&self, now: Timestamp) -> bool {
        now >= self.son_activation_time
    }

    pub fn counts_votes_against_workers(&self, now: Timestamp) -> bool {
        now < self.negative_worker_votes_until
    }
}

/// Node-level maintenance configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub parameters: GlobalParameters,
    pub schedule: ProtocolSchedule,
}

impl ChainConfig {
    /// Load and validate a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let cfg: ChainConfig = dpos_common::config::load_toml(path)?;
        cfg.parameters.validate()?;
        Ok(cfg)
    }
}
