//! Shared primitives: identities, amounts, time and protocol limits.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------- Primitives ----------

/// 20-byte account identity (creator, investor, admin, treasury).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:?}", self)
    }
}

/// Launch identifier chosen by the creator; unique across the platform.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct LaunchId(pub u64);

impl fmt::Display for LaunchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Smallest fund (or token) unit.
pub type Balance = u64;

/// Seconds since Unix epoch, as read from the trusted clock.
pub type Timestamp = i64;

// ---------- Units & limits ----------

/// Smallest fund units per whole fund unit (9 decimals).
pub const UNIT: Balance = 1_000_000_000;

/// Basis points denominator (100% == 10_000 bps).
pub const BPS_DENOM: u64 = 10_000;

/// Platform fee ceiling (50%).
pub const MAX_PLATFORM_FEE_BPS: u16 = 5_000;

pub const SECONDS_PER_HOUR: i64 = 3_600;
pub const SECONDS_PER_DAY: i64 = 86_400;

pub const MAX_NAME_LENGTH: usize = 50;
pub const MAX_SYMBOL_LENGTH: usize = 10;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;
pub const MAX_URL_LENGTH: usize = 200;
pub const MAX_SOCIAL_LENGTH: usize = 100;

pub const MAX_TOKEN_DECIMALS: u8 = 18;
