//! Token vesting math for successful launches.
//!
//! Schedule, relative to the finalization time `t0`:
//! - Before `t0`: nothing is vested.
//! - Initial unlock (bps of the allocation) is granted at `t0`, regardless of cliff.
//! - Before `t0 + cliff`: only the initial unlock is vested.
//! - From `t0 + cliff` to `t0 + cliff + duration`: linear schedules accrue the
//!   remainder pro rata; step schedules hold at the initial unlock.
//! - At or after `t0 + cliff + duration`: the whole allocation is vested.
//!
//! All products go through a `u128` intermediate; results that do not fit
//! back into `Balance` fail with `ArithmeticOverflow`. Nothing saturates or wraps.

use serde::{Deserialize, Serialize};

use crate::errors::LaunchpadError;
use crate::types::{Balance, Timestamp, BPS_DENOM};

/// Vesting parameters of a launch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingConfig {
    /// Seconds after finalization before the remainder starts to vest.
    pub cliff_duration: i64,
    /// Seconds over which the remainder vests once the cliff has passed.
    pub vesting_duration: i64,
    /// Share unlocked at finalization, in basis points (0..=10_000).
    pub initial_unlock_bps: u16,
    /// Linear accrual (true) or a single step at the end (false).
    pub is_linear: bool,
}

impl Default for VestingConfig {
    fn default() -> Self {
        Self {
            cliff_duration: 0,
            vesting_duration: 0,
            initial_unlock_bps: BPS_DENOM as u16,
            is_linear: true,
        }
    }
}

impl VestingConfig {
    pub fn validate(&self) -> Result<(), LaunchpadError> {
        if u64::from(self.initial_unlock_bps) > BPS_DENOM {
            return Err(LaunchpadError::InvalidVestingConfig);
        }
        if self.cliff_duration < 0 || self.vesting_duration < 0 {
            return Err(LaunchpadError::InvalidVestingConfig);
        }
        // a remainder needs a positive window to vest over
        if !self.is_immediate_unlock() && self.vesting_duration == 0 {
            return Err(LaunchpadError::InvalidVestingConfig);
        }
        Ok(())
    }

    pub fn is_immediate_unlock(&self) -> bool {
        u64::from(self.initial_unlock_bps) == BPS_DENOM
    }

    /// Amount unlocked at finalization.
    pub fn immediate_amount(&self, allocation: Balance) -> Result<Balance, LaunchpadError> {
        mul_div(allocation, u64::from(self.initial_unlock_bps), BPS_DENOM)
    }

    /// Moment at which the allocation is fully vested.
    pub fn fully_vested_at(&self, t0: Timestamp) -> Result<Timestamp, LaunchpadError> {
        t0.checked_add(self.cliff_duration)
            .and_then(|t| t.checked_add(self.vesting_duration))
            .ok_or(LaunchpadError::ArithmeticOverflow)
    }
}

/// Total vested amount of `allocation` at `now`, for a launch finalized at `t0`.
///
/// Queries before `t0` see nothing vested.
pub fn vested_amount(
    allocation: Balance,
    cfg: &VestingConfig,
    t0: Timestamp,
    now: Timestamp,
) -> Result<Balance, LaunchpadError> {
    if now < t0 {
        return Ok(0);
    }
    let immediate = cfg.immediate_amount(allocation)?;

    let cliff_end = t0
        .checked_add(cfg.cliff_duration)
        .ok_or(LaunchpadError::ArithmeticOverflow)?;
    if now < cliff_end {
        return Ok(immediate);
    }

    let vest_end = cfg.fully_vested_at(t0)?;
    if now >= vest_end {
        return Ok(allocation);
    }

    if !cfg.is_linear {
        return Ok(immediate);
    }

    // cliff_end <= now < vest_end implies vesting_duration > 0
    let remainder = allocation
        .checked_sub(immediate)
        .ok_or(LaunchpadError::ArithmeticOverflow)?;
    let elapsed = now
        .checked_sub(cliff_end)
        .ok_or(LaunchpadError::ArithmeticOverflow)? as u64;
    let linear = mul_div(remainder, elapsed, cfg.vesting_duration as u64)?;

    immediate
        .checked_add(linear)
        .ok_or(LaunchpadError::ArithmeticOverflow)
}

/// Amount an investor may claim now: vested minus already claimed.
pub fn claimable_amount(
    allocation: Balance,
    claimed: Balance,
    cfg: &VestingConfig,
    t0: Timestamp,
    now: Timestamp,
) -> Result<Balance, LaunchpadError> {
    let vested = vested_amount(allocation, cfg, t0, now)?;
    Ok(vested.saturating_sub(claimed))
}

/// floor(a * b / d) through a widened intermediate.
pub fn mul_div(a: Balance, b: u64, d: u64) -> Result<Balance, LaunchpadError> {
    if d == 0 {
        return Err(LaunchpadError::ArithmeticOverflow);
    }
    let wide = u128::from(a)
        .checked_mul(u128::from(b))
        .ok_or(LaunchpadError::ArithmeticOverflow)?
        / u128::from(d);
    Balance::try_from(wide).map_err(|_| LaunchpadError::ArithmeticOverflow)
}

/* ---------------------------------- TESTS ---------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SECONDS_PER_DAY;

    const T0: Timestamp = 1_700_000_000;

    fn linear(cliff: i64, dur: i64, bps: u16) -> VestingConfig {
        VestingConfig { cliff_duration: cliff, vesting_duration: dur, initial_unlock_bps: bps, is_linear: true }
    }

    #[test]
    fn ten_percent_unlock_thirty_day_linear() {
        let cfg = linear(0, 30 * SECONDS_PER_DAY, 1_000);
        assert_eq!(vested_amount(1_000, &cfg, T0, T0).unwrap(), 100);
        assert_eq!(vested_amount(1_000, &cfg, T0, T0 + 15 * SECONDS_PER_DAY).unwrap(), 550);
        assert_eq!(vested_amount(1_000, &cfg, T0, T0 + 30 * SECONDS_PER_DAY).unwrap(), 1_000);
        assert_eq!(vested_amount(1_000, &cfg, T0, T0 + 365 * SECONDS_PER_DAY).unwrap(), 1_000);
    }

    #[test]
    fn initial_unlock_is_granted_during_cliff() {
        let cfg = linear(7 * SECONDS_PER_DAY, 10 * SECONDS_PER_DAY, 2_500);
        assert_eq!(vested_amount(1_000, &cfg, T0, T0 - 1).unwrap(), 0);
        assert_eq!(vested_amount(1_000, &cfg, T0, T0).unwrap(), 250);
        assert_eq!(vested_amount(1_000, &cfg, T0, T0 + 7 * SECONDS_PER_DAY - 1).unwrap(), 250);
        // linear part starts at the cliff
        assert_eq!(vested_amount(1_000, &cfg, T0, T0 + 7 * SECONDS_PER_DAY).unwrap(), 250);
        assert_eq!(vested_amount(1_000, &cfg, T0, T0 + 12 * SECONDS_PER_DAY).unwrap(), 625);
        assert_eq!(vested_amount(1_000, &cfg, T0, T0 + 17 * SECONDS_PER_DAY).unwrap(), 1_000);
    }

    #[test]
    fn step_schedule_jumps_at_end() {
        let cfg = VestingConfig { is_linear: false, ..linear(100, 1_000, 1_000) };
        assert_eq!(vested_amount(1_000, &cfg, T0, T0 + 500).unwrap(), 100);
        assert_eq!(vested_amount(1_000, &cfg, T0, T0 + 1_099).unwrap(), 100);
        assert_eq!(vested_amount(1_000, &cfg, T0, T0 + 1_100).unwrap(), 1_000);
    }

    #[test]
    fn linear_floors() {
        let cfg = linear(0, 3, 0);
        assert_eq!(vested_amount(10, &cfg, T0, T0 + 1).unwrap(), 3);
        assert_eq!(vested_amount(10, &cfg, T0, T0 + 2).unwrap(), 6);
    }

    #[test]
    fn full_immediate_unlock() {
        let cfg = VestingConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(vested_amount(777, &cfg, T0, T0).unwrap(), 777);
    }

    #[test]
    fn large_allocations_do_not_overflow_intermediate() {
        let cfg = linear(0, 2, 5_000);
        let a = u64::MAX;
        let half = vested_amount(a, &cfg, T0, T0).unwrap();
        assert_eq!(half, a / 2);
        assert_eq!(vested_amount(a, &cfg, T0, T0 + 2).unwrap(), a);
    }

    #[test]
    fn timeline_overflow_is_reported() {
        let cfg = linear(i64::MAX - 10, 10, 0);
        assert_eq!(vested_amount(1, &cfg, 10, 20), Ok(0));
        let cfg = linear(i64::MAX, 10, 0);
        assert_eq!(vested_amount(1, &cfg, 10, 20), Err(LaunchpadError::ArithmeticOverflow));
        let cfg = linear(1, i64::MAX, 0);
        assert_eq!(vested_amount(1, &cfg, 10, 20), Err(LaunchpadError::ArithmeticOverflow));
    }

    #[test]
    fn claimable_subtracts_claimed() {
        let cfg = linear(0, 30 * SECONDS_PER_DAY, 1_000);
        assert_eq!(claimable_amount(1_000, 100, &cfg, T0, T0).unwrap(), 0);
        assert_eq!(claimable_amount(1_000, 100, &cfg, T0, T0 + 15 * SECONDS_PER_DAY).unwrap(), 450);
    }

    #[test]
    fn validation_rules() {
        assert!(linear(0, 10, 10_001).validate().is_err());
        assert!(linear(-1, 10, 0).validate().is_err());
        assert!(linear(0, 0, 9_999).validate().is_err());
        assert!(linear(0, 0, 10_000).validate().is_ok());
        assert!(linear(50, 10, 0).validate().is_ok());
    }

    #[test]
    fn mul_div_checks() {
        assert_eq!(mul_div(10, 3, 4), Ok(7));
        assert_eq!(mul_div(1, 1, 0), Err(LaunchpadError::ArithmeticOverflow));
        assert_eq!(mul_div(u64::MAX, 2, 1), Err(LaunchpadError::ArithmeticOverflow));
    }
}
