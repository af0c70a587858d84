//! Platform-wide configuration record and its admin operations.
//!
//! The registry owns the single `PlatformConfig` slot. It is created once by
//! `initialize`, mutated only by admin-authorized `update`/`pause`/`resume`
//! (and by the controller's aggregate bookkeeping), and never destroyed.

use serde::{Deserialize, Serialize};

use crate::address::{platform_address, RecordAddress};
use crate::errors::LaunchpadError;
use crate::types::{Address, Balance, Timestamp, BPS_DENOM, MAX_PLATFORM_FEE_BPS};
use crate::vesting::mul_div;

/// Global platform configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub admin: Address,
    /// Destination of collected platform fees.
    pub treasury: Address,
    pub fee_bps: u16,
    /// Seconds.
    pub min_launch_duration: i64,
    /// Seconds.
    pub max_launch_duration: i64,
    pub min_soft_cap: Balance,
    pub is_paused: bool,
    pub total_launches: u64,
    pub total_raised: Balance,
    /// Lifetime fees taken on successful finalizations.
    pub total_fees_collected: Balance,
    /// Fees taken but not yet collected by the admin.
    pub fee_balance: Balance,
    pub address: RecordAddress,
}

/// Arguments of `initialize`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformInit {
    pub admin: Address,
    pub treasury: Address,
    pub fee_bps: u16,
    pub min_launch_duration: i64,
    pub max_launch_duration: i64,
    pub min_soft_cap: Balance,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformPatch {
    pub treasury: Option<Address>,
    pub fee_bps: Option<u16>,
    pub min_launch_duration: Option<i64>,
    pub max_launch_duration: Option<i64>,
    pub min_soft_cap: Option<Balance>,
}

/// Checks shared by `initialize`, `update` and loaded settings.
pub fn validate_platform_params(
    fee_bps: u16,
    min_launch_duration: i64,
    max_launch_duration: i64,
    min_soft_cap: Balance,
) -> Result<(), LaunchpadError> {
    if fee_bps > MAX_PLATFORM_FEE_BPS {
        return Err(LaunchpadError::InvalidPlatformFee);
    }
    if min_launch_duration <= 0 || max_launch_duration <= 0 {
        return Err(LaunchpadError::InvalidLaunchDuration);
    }
    if min_launch_duration >= max_launch_duration {
        return Err(LaunchpadError::InvalidLaunchDuration);
    }
    if min_soft_cap == 0 {
        return Err(LaunchpadError::InvalidSoftCap);
    }
    Ok(())
}

impl PlatformConfig {
    fn from_init(init: &PlatformInit) -> Self {
        Self {
            admin: init.admin,
            treasury: init.treasury,
            fee_bps: init.fee_bps,
            min_launch_duration: init.min_launch_duration,
            max_launch_duration: init.max_launch_duration,
            min_soft_cap: init.min_soft_cap,
            is_paused: false,
            total_launches: 0,
            total_raised: 0,
            total_fees_collected: 0,
            fee_balance: 0,
            address: platform_address(),
        }
    }

    pub fn require_admin(&self, caller: &Address) -> Result<(), LaunchpadError> {
        if &self.admin != caller {
            return Err(LaunchpadError::Unauthorized);
        }
        Ok(())
    }

    pub fn is_operational(&self) -> bool {
        !self.is_paused
    }

    /// Fee owed on `amount` (floored).
    pub fn platform_fee(&self, amount: Balance) -> Result<Balance, LaunchpadError> {
        mul_div(amount, u64::from(self.fee_bps), BPS_DENOM)
    }

    pub fn validate_launch_duration(&self, start: Timestamp, end: Timestamp) -> Result<(), LaunchpadError> {
        let duration = end
            .checked_sub(start)
            .ok_or(LaunchpadError::ArithmeticOverflow)?;
        if duration < self.min_launch_duration {
            return Err(LaunchpadError::LaunchDurationTooShort);
        }
        if duration > self.max_launch_duration {
            return Err(LaunchpadError::LaunchDurationTooLong);
        }
        Ok(())
    }

    pub fn validate_soft_cap(&self, soft_cap: Balance) -> Result<(), LaunchpadError> {
        if soft_cap < self.min_soft_cap {
            return Err(LaunchpadError::SoftCapTooLow);
        }
        Ok(())
    }

    /// Apply `patch` to a copy and validate the result as a whole.
    fn patched(&self, patch: &PlatformPatch) -> Result<Self, LaunchpadError> {
        let next = Self {
            treasury: patch.treasury.unwrap_or(self.treasury),
            fee_bps: patch.fee_bps.unwrap_or(self.fee_bps),
            min_launch_duration: patch.min_launch_duration.unwrap_or(self.min_launch_duration),
            max_launch_duration: patch.max_launch_duration.unwrap_or(self.max_launch_duration),
            min_soft_cap: patch.min_soft_cap.unwrap_or(self.min_soft_cap),
            ..self.clone()
        };
        validate_platform_params(
            next.fee_bps,
            next.min_launch_duration,
            next.max_launch_duration,
            next.min_soft_cap,
        )?;
        Ok(next)
    }
}

/// Holder of the single platform record.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlatformRegistry {
    config: Option<PlatformConfig>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    pub fn initialize(&mut self, init: PlatformInit) -> Result<&PlatformConfig, LaunchpadError> {
        if self.config.is_some() {
            return Err(LaunchpadError::AlreadyInitialized);
        }
        validate_platform_params(
            init.fee_bps,
            init.min_launch_duration,
            init.max_launch_duration,
            init.min_soft_cap,
        )?;
        Ok(&*self.config.insert(PlatformConfig::from_init(&init)))
    }

    pub fn get(&self) -> Result<&PlatformConfig, LaunchpadError> {
        self.config.as_ref().ok_or(LaunchpadError::PlatformNotInitialized)
    }

    pub(crate) fn get_mut(&mut self) -> Result<&mut PlatformConfig, LaunchpadError> {
        self.config.as_mut().ok_or(LaunchpadError::PlatformNotInitialized)
    }

    /// Admin-only partial update. Nothing changes unless the patched record is valid.
    pub fn update(&mut self, caller: &Address, patch: &PlatformPatch) -> Result<&PlatformConfig, LaunchpadError> {
        let current = self.get_mut()?;
        current.require_admin(caller)?;
        let next = current.patched(patch)?;
        *current = next;
        Ok(&*current)
    }

    /// Admin-only. Returns whether the flag changed.
    pub fn pause(&mut self, caller: &Address) -> Result<bool, LaunchpadError> {
        self.set_paused(caller, true)
    }

    /// Admin-only. Returns whether the flag changed.
    pub fn resume(&mut self, caller: &Address) -> Result<bool, LaunchpadError> {
        self.set_paused(caller, false)
    }

    fn set_paused(&mut self, caller: &Address, paused: bool) -> Result<bool, LaunchpadError> {
        let cfg = self.get_mut()?;
        cfg.require_admin(caller)?;
        if cfg.is_paused == paused {
            return Ok(false);
        }
        cfg.is_paused = paused;
        Ok(true)
    }
}
