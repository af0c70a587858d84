//! KravTrade launchpad core
//! Features:
//! - Platform registry: admin, treasury, fee bps, launch duration bounds, minimum soft cap, pause switch
//! - Launch lifecycle: create -> approve -> contribute -> finalize(successful/failed) -> claim or refund
//! - Caps and limits: soft/hard cap, per-investor min/max, presale window
//! - Fixed-price allocation scaled by token decimals
//! - Vesting: initial unlock (bps) + cliff + linear or step schedule
//! - Safety: checked arithmetic with u128 intermediates, validate-then-commit operations
//! - Concurrency: parking_lot RwLock around the pure controller
//! - Events: append-only log + tokio::broadcast fan-out
//! - Deterministic SHA-256 record addresses
//!
//! The controller takes the caller and the trusted time on every call;
//! `Launchpad` supplies both from a `Clock` for embedded use.

#![forbid(unsafe_code)]
#![allow(clippy::too_many_arguments)]

pub mod address;
pub mod book;
pub mod controller;
pub mod errors;
pub mod events;
pub mod launchpad;
pub mod ledger;
pub mod registry;
pub mod settings;
pub mod telemetry;
pub mod types;
pub mod vesting;

pub use book::{Contribution, ContributionBook};
pub use controller::{FinalizeOutcome, LifecycleController};
pub use errors::{ErrorCategory, LaunchpadError};
pub use events::{EventLog, EventRecord, LaunchpadEvent};
pub use launchpad::{Clock, Launchpad, SystemClock};
pub use ledger::{Launch, LaunchLedger, LaunchMetadata, LaunchParams, LaunchStatus, TokenInfo};
pub use registry::{PlatformConfig, PlatformInit, PlatformPatch, PlatformRegistry};
pub use settings::{Settings, SettingsError};
pub use types::{Address, Balance, LaunchId, Timestamp, UNIT};
pub use vesting::{claimable_amount, vested_amount, VestingConfig};
