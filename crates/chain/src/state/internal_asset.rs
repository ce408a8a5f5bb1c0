//! Asset supply and fee bookkeeping.

use super::{Asset, ChainState};
use crate::error::{MaintenanceError, MaintenanceResult};
use dpos_common::ids::CORE_ASSET;
use dpos_common::{AssetId, Share};

impl ChainState {
    pub fn asset(&self, id: AssetId) -> MaintenanceResult<&Asset> {
        self.assets.get(&id).ok_or_else(|| MaintenanceError::unknown("asset", id))
    }

    pub fn asset_mut(&mut self, id: AssetId) -> MaintenanceResult<&mut Asset> {
        self.assets.get_mut(&id).ok_or_else(|| MaintenanceError::unknown("asset", id))
    }

    pub fn core_asset(&self) -> MaintenanceResult<&Asset> {
        self.asset(CORE_ASSET)
    }

    /// Mint (positive) or burn (negative) supply of `asset`.
    pub fn apply_supply_delta(&mut self, asset: AssetId, delta: Share) -> MaintenanceResult<()> {
        let a = self.asset_mut(asset)?;
        let next = a
            .current_supply
            .checked_add(delta)
            .ok_or(MaintenanceError::Overflow("apply_supply_delta"))?;
        if next < 0 || next > a.max_supply {
            return Err(MaintenanceError::InvariantViolation(format!(
                "supply of {} would become {} (max {})",
                asset, next, a.max_supply
            )));
        }
        a.current_supply = next;
        Ok(())
    }

    pub fn add_accumulated_fees(&mut self, asset: AssetId, amount: Share) -> MaintenanceResult<()> {
        let a = self.asset_mut(asset)?;
        a.accumulated_fees = a
            .accumulated_fees
            .checked_add(amount)
            .ok_or(MaintenanceError::Overflow("add_accumulated_fees"))?;
        Ok(())
    }
}
