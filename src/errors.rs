//! Launchpad error taxonomy.
//!
//! Codes are stable: external callers match on `code()` (not on the
//! variant name or message). New variants are appended, never inserted.

use thiserror::Error;

/// Coarse grouping of errors, used by callers to pick a UX path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Authorization,
    StateConflict,
    FundConstraint,
    Arithmetic,
}

/// Errors returned by every core operation.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum LaunchpadError {
    #[error("launch not found")]
    LaunchNotFound = 6000,
    #[error("presale is not currently active")]
    PresaleNotActive,
    #[error("contribution amount is below minimum")]
    ContributionTooLow,
    #[error("contribution amount exceeds maximum")]
    ContributionTooHigh,
    #[error("hard cap would be exceeded")]
    HardCapExceeded,
    #[error("insufficient funds for operation")]
    InsufficientFunds,
    #[error("vesting period has not started")]
    VestingNotStarted,
    #[error("tokens already claimed")]
    AlreadyClaimed,
    #[error("launch has not been approved")]
    LaunchNotApproved,
    #[error("unauthorized access")]
    Unauthorized,
    #[error("launch has already been finalized")]
    LaunchAlreadyFinalized,
    #[error("soft cap has not been reached")]
    SoftCapNotReached,
    #[error("presale time window is invalid")]
    InvalidPresaleTime,
    #[error("launch duration is too short")]
    LaunchDurationTooShort,
    #[error("launch duration is too long")]
    LaunchDurationTooLong,
    #[error("soft cap is below platform minimum")]
    SoftCapTooLow,
    #[error("hard cap must be greater than soft cap")]
    InvalidCapConfiguration,
    #[error("platform fee is invalid")]
    InvalidPlatformFee,
    #[error("launch duration configuration is invalid")]
    InvalidLaunchDuration,
    #[error("soft cap configuration is invalid")]
    InvalidSoftCap,
    #[error("vesting configuration is invalid")]
    InvalidVestingConfig,
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
    #[error("platform is paused")]
    PlatformPaused,
    #[error("launch is paused")]
    LaunchPaused,
    #[error("no tokens available for claiming")]
    NoTokensAvailable,
    #[error("refund not available for this launch")]
    RefundNotAvailable,
    #[error("already refunded")]
    AlreadyRefunded,
    #[error("launch cannot be cancelled in its current state")]
    CannotCancelLaunch,
    #[error("invalid token parameters")]
    InvalidTokenParameters,
    #[error("metadata string too long")]
    MetadataTooLong,
    #[error("launch end time must be in the future")]
    EndTimeInPast,
    #[error("launch start time must be before end time")]
    StartTimeAfterEndTime,
    #[error("platform already initialized")]
    AlreadyInitialized,
    #[error("platform not initialized")]
    PlatformNotInitialized,
    #[error("launch id already in use")]
    LaunchAlreadyExists,
}

impl LaunchpadError {
    /// Stable numeric code.
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn category(self) -> ErrorCategory {
        use LaunchpadError::*;
        match self {
            InvalidPlatformFee | InvalidLaunchDuration | InvalidSoftCap | InvalidCapConfiguration
            | InvalidPresaleTime | MetadataTooLong | InvalidTokenParameters | EndTimeInPast
            | StartTimeAfterEndTime | LaunchDurationTooShort | LaunchDurationTooLong
            | SoftCapTooLow | InvalidVestingConfig => ErrorCategory::Validation,
            Unauthorized => ErrorCategory::Authorization,
            LaunchNotFound | LaunchNotApproved | LaunchAlreadyFinalized | AlreadyClaimed
            | AlreadyRefunded | CannotCancelLaunch | PresaleNotActive | PlatformPaused
            | LaunchPaused | VestingNotStarted | AlreadyInitialized | PlatformNotInitialized
            | LaunchAlreadyExists => ErrorCategory::StateConflict,
            ContributionTooLow | ContributionTooHigh | HardCapExceeded | InsufficientFunds
            | SoftCapNotReached | NoTokensAvailable | RefundNotAvailable => {
                ErrorCategory::FundConstraint
            }
            ArithmeticOverflow => ErrorCategory::Arithmetic,
        }
    }
}
