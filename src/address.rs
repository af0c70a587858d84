//! Deterministic record addressing.
//!
//! Collaborators (SDKs, monitors) locate persisted records by re-deriving
//! these addresses: SHA-256 over the concatenation of namespace seeds and
//! key material. Launch ids are encoded little-endian.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::types::{Address, LaunchId};

pub const PLATFORM_SEED: &[u8] = b"platform";
pub const CONFIG_SEED: &[u8] = b"config";
pub const LAUNCH_SEED: &[u8] = b"launch";
pub const INVESTOR_SEED: &[u8] = b"investor";

/// 32-byte record address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordAddress(pub [u8; 32]);

impl RecordAddress {
    pub fn hex(&self) -> String {
        let mut s = String::with_capacity(2 + 64);
        s.push_str("0x");
        for b in &self.0 {
            s.push_str(&format!("{:02x}", b));
        }
        s
    }
}

impl fmt::Debug for RecordAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

impl fmt::Display for RecordAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

/// Hash an ordered list of seeds into an address.
pub fn derive(seeds: &[&[u8]]) -> RecordAddress {
    let mut h = Sha256::new();
    for s in seeds {
        h.update(s);
    }
    RecordAddress(h.finalize().into())
}

/// The single well-known platform config address.
pub fn platform_address() -> RecordAddress {
    derive(&[PLATFORM_SEED, CONFIG_SEED])
}

pub fn launch_address(id: LaunchId) -> RecordAddress {
    derive(&[LAUNCH_SEED, &id.0.to_le_bytes()])
}

pub fn contribution_address(id: LaunchId, investor: &Address) -> RecordAddress {
    derive(&[INVESTOR_SEED, &id.0.to_le_bytes(), investor.as_bytes()])
}
