//! Launch records: parameters, status machine and aggregates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::address::{launch_address, RecordAddress};
use crate::errors::LaunchpadError;
use crate::registry::PlatformConfig;
use crate::types::{
    Address, Balance, LaunchId, Timestamp, MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH,
    MAX_SOCIAL_LENGTH, MAX_SYMBOL_LENGTH, MAX_TOKEN_DECIMALS, MAX_URL_LENGTH,
};
use crate::vesting::{mul_div, VestingConfig};

// ---------- Status machine ----------

/// Launch lifecycle status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaunchStatus {
    /// Awaiting admin approval.
    #[default]
    Pending,
    /// Accepting contributions inside the presale window.
    Active,
    /// Soft cap reached; tokens vest and are claimable.
    Successful,
    /// Ended below soft cap; refunds available.
    Failed,
    /// Rejected or cancelled by the admin; refunds available.
    Cancelled,
    /// Emergency-paused by the admin.
    Paused,
}

impl LaunchStatus {
    /// Every allowed (from, to) pair. Anything not listed is rejected.
    pub const TRANSITIONS: &'static [(LaunchStatus, LaunchStatus)] = &[
        (LaunchStatus::Pending, LaunchStatus::Active),
        (LaunchStatus::Pending, LaunchStatus::Cancelled),
        (LaunchStatus::Active, LaunchStatus::Successful),
        (LaunchStatus::Active, LaunchStatus::Failed),
        (LaunchStatus::Active, LaunchStatus::Paused),
        (LaunchStatus::Paused, LaunchStatus::Active),
        (LaunchStatus::Paused, LaunchStatus::Cancelled),
    ];

    pub fn can_transition(self, to: LaunchStatus) -> bool {
        Self::TRANSITIONS.contains(&(self, to))
    }

    /// Validate a move and return the target status, or `rejection`.
    pub fn transition(self, to: LaunchStatus, rejection: LaunchpadError) -> Result<LaunchStatus, LaunchpadError> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(rejection)
        }
    }

    pub fn is_terminal(self) -> bool {
        !Self::TRANSITIONS.iter().any(|(from, _)| *from == self)
    }

    /// Refunds are open in these states.
    pub fn is_refundable(self) -> bool {
        matches!(self, LaunchStatus::Failed | LaunchStatus::Cancelled)
    }
}

// ---------- Parameters ----------

/// Descriptor of the token being sold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// In smallest token units.
    pub total_supply: Balance,
}

/// Free-form project metadata with bounded lengths (bytes).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchMetadata {
    pub description: String,
    pub website: String,
    pub twitter: String,
    pub telegram: String,
    pub discord: String,
    pub logo_uri: String,
    pub documentation: String,
}

impl LaunchMetadata {
    pub fn validate(&self) -> Result<(), LaunchpadError> {
        let bounded = [
            (&self.description, MAX_DESCRIPTION_LENGTH),
            (&self.website, MAX_URL_LENGTH),
            (&self.twitter, MAX_SOCIAL_LENGTH),
            (&self.telegram, MAX_SOCIAL_LENGTH),
            (&self.discord, MAX_SOCIAL_LENGTH),
            (&self.logo_uri, MAX_URL_LENGTH),
            (&self.documentation, MAX_URL_LENGTH),
        ];
        if bounded.iter().any(|(s, max)| s.len() > *max) {
            return Err(LaunchpadError::MetadataTooLong);
        }
        Ok(())
    }
}

/// Creator-supplied launch parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchParams {
    pub launch_id: LaunchId,
    pub token: TokenInfo,
    /// Funds (smallest units) per whole token.
    pub presale_price: Balance,
    pub min_contribution: Balance,
    pub max_contribution: Balance,
    pub soft_cap: Balance,
    pub hard_cap: Balance,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub vesting: VestingConfig,
    pub metadata: LaunchMetadata,
}

impl LaunchParams {
    /// Full validation against the platform record at `now`.
    ///
    /// Checks run in a fixed order and the first failure is returned.
    pub fn validate(&self, platform: &PlatformConfig, now: Timestamp) -> Result<(), LaunchpadError> {
        if self.token.name.len() > MAX_NAME_LENGTH || self.token.symbol.len() > MAX_SYMBOL_LENGTH {
            return Err(LaunchpadError::MetadataTooLong);
        }
        self.metadata.validate()?;

        if self.token.decimals > MAX_TOKEN_DECIMALS
            || self.token.total_supply == 0
            || self.presale_price == 0
            || self.min_contribution == 0
        {
            return Err(LaunchpadError::InvalidTokenParameters);
        }

        if self.soft_cap == 0 || self.hard_cap <= self.soft_cap {
            return Err(LaunchpadError::InvalidCapConfiguration);
        }
        platform.validate_soft_cap(self.soft_cap)?;

        if self.min_contribution > self.max_contribution {
            return Err(LaunchpadError::InvalidSoftCap);
        }
        if self.max_contribution > self.hard_cap {
            return Err(LaunchpadError::InvalidCapConfiguration);
        }

        if self.end_time <= now {
            return Err(LaunchpadError::EndTimeInPast);
        }
        if self.start_time >= self.end_time {
            return Err(LaunchpadError::StartTimeAfterEndTime);
        }
        platform.validate_launch_duration(self.start_time, self.end_time)?;

        self.vesting.validate()?;

        // the supply must cover a sold-out hard cap
        let needed = token_amount(self.hard_cap, self.token.decimals, self.presale_price)?;
        if needed > self.token.total_supply {
            return Err(LaunchpadError::InvalidTokenParameters);
        }
        Ok(())
    }
}

/// Tokens (smallest units) bought by `funds` at `price` per whole token.
pub fn token_amount(funds: Balance, decimals: u8, price: Balance) -> Result<Balance, LaunchpadError> {
    let scale = 10u64
        .checked_pow(u32::from(decimals))
        .ok_or(LaunchpadError::ArithmeticOverflow)?;
    mul_div(funds, scale, price)
}

// ---------- Record ----------

/// Persisted launch record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Launch {
    pub id: LaunchId,
    pub creator: Address,
    pub token: TokenInfo,
    pub presale_price: Balance,
    pub min_contribution: Balance,
    pub max_contribution: Balance,
    pub soft_cap: Balance,
    pub hard_cap: Balance,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub vesting: VestingConfig,
    pub metadata: LaunchMetadata,
    pub status: LaunchStatus,
    pub total_raised: Balance,
    pub contributor_count: u32,
    /// Funds currently held for this launch.
    pub escrow_balance: Balance,
    pub created_at: Timestamp,
    /// Vesting reference time; set when the launch resolves.
    pub finalized_at: Option<Timestamp>,
    pub address: RecordAddress,
}

impl Launch {
    pub fn new(params: LaunchParams, creator: Address, now: Timestamp) -> Self {
        Self {
            id: params.launch_id,
            creator,
            token: params.token,
            presale_price: params.presale_price,
            min_contribution: params.min_contribution,
            max_contribution: params.max_contribution,
            soft_cap: params.soft_cap,
            hard_cap: params.hard_cap,
            start_time: params.start_time,
            end_time: params.end_time,
            vesting: params.vesting,
            metadata: params.metadata,
            status: LaunchStatus::Pending,
            total_raised: 0,
            contributor_count: 0,
            escrow_balance: 0,
            created_at: now,
            finalized_at: None,
            address: launch_address(params.launch_id),
        }
    }

    pub fn is_window_open(&self, now: Timestamp) -> bool {
        now >= self.start_time && now <= self.end_time
    }

    pub fn has_reached_soft_cap(&self) -> bool {
        self.total_raised >= self.soft_cap
    }

    pub fn has_reached_hard_cap(&self) -> bool {
        self.total_raised >= self.hard_cap
    }

    pub fn token_allocation(&self, contribution: Balance) -> Result<Balance, LaunchpadError> {
        token_amount(contribution, self.token.decimals, self.presale_price)
    }
}

// ---------- Ledger ----------

/// All launches, keyed by id. Records are never removed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LaunchLedger {
    launches: BTreeMap<LaunchId, Launch>,
}

impl LaunchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: LaunchId) -> bool {
        self.launches.contains_key(&id)
    }

    pub fn get(&self, id: LaunchId) -> Result<&Launch, LaunchpadError> {
        self.launches.get(&id).ok_or(LaunchpadError::LaunchNotFound)
    }

    pub(crate) fn get_mut(&mut self, id: LaunchId) -> Result<&mut Launch, LaunchpadError> {
        self.launches.get_mut(&id).ok_or(LaunchpadError::LaunchNotFound)
    }

    pub(crate) fn insert(&mut self, launch: Launch) -> Result<&Launch, LaunchpadError> {
        if self.launches.contains_key(&launch.id) {
            return Err(LaunchpadError::LaunchAlreadyExists);
        }
        let id = launch.id;
        Ok(self.launches.entry(id).or_insert(launch))
    }

    pub fn len(&self) -> usize {
        self.launches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.launches.is_empty()
    }

    pub fn by_status(&self, status: LaunchStatus) -> impl Iterator<Item = &Launch> {
        self.launches.values().filter(move |l| l.status == status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{PlatformInit, PlatformRegistry};
    use crate::types::{SECONDS_PER_DAY, SECONDS_PER_HOUR, UNIT};

    const NOW: Timestamp = 1_700_000_000;

    fn platform() -> PlatformConfig {
        let mut reg = PlatformRegistry::new();
        reg.initialize(PlatformInit {
            admin: Address([0xAA; 20]),
            treasury: Address([0xFE; 20]),
            fee_bps: 250,
            min_launch_duration: 24 * SECONDS_PER_HOUR,
            max_launch_duration: 30 * SECONDS_PER_DAY,
            min_soft_cap: UNIT,
        })
        .unwrap()
        .clone()
    }

    fn params() -> LaunchParams {
        LaunchParams {
            launch_id: LaunchId(1),
            token: TokenInfo {
                name: "Krav Token".into(),
                symbol: "KRAV".into(),
                decimals: 9,
                total_supply: 1_000_000 * 1_000_000_000,
            },
            presale_price: UNIT / 1_000,
            min_contribution: UNIT / 100,
            max_contribution: 10 * UNIT,
            soft_cap: UNIT,
            hard_cap: 10 * UNIT,
            start_time: NOW + SECONDS_PER_HOUR,
            end_time: NOW + SECONDS_PER_HOUR + 7 * SECONDS_PER_DAY,
            vesting: VestingConfig {
                cliff_duration: 0,
                vesting_duration: 30 * SECONDS_PER_DAY,
                initial_unlock_bps: 1_000,
                is_linear: true,
            },
            metadata: LaunchMetadata::default(),
        }
    }

    #[test]
    fn transition_table() {
        use LaunchStatus::*;
        assert_eq!(LaunchStatus::default(), Pending);
        assert!(Pending.can_transition(Active));
        assert!(Pending.can_transition(Cancelled));
        assert!(Active.can_transition(Paused));
        assert!(Paused.can_transition(Active));
        assert!(Paused.can_transition(Cancelled));
        assert!(!Paused.can_transition(Successful));
        assert!(!Pending.can_transition(Successful));
        assert!(!Successful.can_transition(Active));
        for s in [Successful, Failed, Cancelled] {
            assert!(s.is_terminal());
        }
        for s in [Pending, Active, Paused] {
            assert!(!s.is_terminal());
        }
        assert_eq!(
            Failed.transition(Active, LaunchpadError::LaunchAlreadyFinalized),
            Err(LaunchpadError::LaunchAlreadyFinalized)
        );
    }

    #[test]
    fn valid_params_pass() {
        assert_eq!(params().validate(&platform(), NOW), Ok(()));
    }

    #[test]
    fn validation_order_and_codes() {
        let p = platform();
        let check = |f: fn(&mut LaunchParams)| {
            let mut lp = params();
            f(&mut lp);
            lp.validate(&p, NOW).unwrap_err()
        };

        assert_eq!(check(|lp| lp.token.name = "x".repeat(51)), LaunchpadError::MetadataTooLong);
        assert_eq!(check(|lp| lp.token.symbol = "TOOLONGSYMB".into()), LaunchpadError::MetadataTooLong);
        assert_eq!(check(|lp| lp.metadata.website = "w".repeat(201)), LaunchpadError::MetadataTooLong);
        assert_eq!(check(|lp| lp.token.decimals = 19), LaunchpadError::InvalidTokenParameters);
        assert_eq!(check(|lp| lp.presale_price = 0), LaunchpadError::InvalidTokenParameters);
        assert_eq!(check(|lp| lp.hard_cap = UNIT), LaunchpadError::InvalidCapConfiguration);
        assert_eq!(
            check(|lp| {
                lp.soft_cap = UNIT / 2;
                lp.max_contribution = UNIT / 2;
            }),
            LaunchpadError::SoftCapTooLow
        );
        assert_eq!(check(|lp| lp.min_contribution = 11 * UNIT), LaunchpadError::InvalidSoftCap);
        assert_eq!(check(|lp| lp.max_contribution = 11 * UNIT), LaunchpadError::InvalidCapConfiguration);
        assert_eq!(
            check(|lp| {
                lp.start_time = NOW - 2 * SECONDS_PER_DAY;
                lp.end_time = NOW;
            }),
            LaunchpadError::EndTimeInPast
        );
        assert_eq!(check(|lp| lp.start_time = lp.end_time), LaunchpadError::StartTimeAfterEndTime);
        assert_eq!(
            check(|lp| lp.end_time = lp.start_time + SECONDS_PER_HOUR),
            LaunchpadError::LaunchDurationTooShort
        );
        assert_eq!(
            check(|lp| lp.end_time = lp.start_time + 31 * SECONDS_PER_DAY),
            LaunchpadError::LaunchDurationTooLong
        );
        assert_eq!(check(|lp| lp.vesting.initial_unlock_bps = 10_001), LaunchpadError::InvalidVestingConfig);
        assert_eq!(check(|lp| lp.token.total_supply = 1), LaunchpadError::InvalidTokenParameters);
    }

    #[test]
    fn first_failure_wins() {
        let mut lp = params();
        lp.token.name = "x".repeat(60);
        lp.presale_price = 0;
        lp.hard_cap = 0;
        assert_eq!(lp.validate(&platform(), NOW), Err(LaunchpadError::MetadataTooLong));
    }

    #[test]
    fn allocation_at_fixed_price() {
        let launch = Launch::new(params(), Address([1; 20]), NOW);
        assert_eq!(launch.status, LaunchStatus::Pending);
        assert_eq!(launch.address, launch_address(LaunchId(1)));
        // 0.5 unit at 0.001 unit per token = 500 whole tokens
        assert_eq!(launch.token_allocation(UNIT / 2).unwrap(), 500 * 1_000_000_000);
    }

    #[test]
    fn ledger_rejects_duplicate_ids() {
        let mut ledger = LaunchLedger::new();
        ledger.insert(Launch::new(params(), Address([1; 20]), NOW)).unwrap();
        assert_eq!(
            ledger.insert(Launch::new(params(), Address([2; 20]), NOW)).unwrap_err(),
            LaunchpadError::LaunchAlreadyExists
        );
        assert_eq!(ledger.get(LaunchId(2)).unwrap_err(), LaunchpadError::LaunchNotFound);
        assert_eq!(ledger.by_status(LaunchStatus::Pending).count(), 1);
    }
}
