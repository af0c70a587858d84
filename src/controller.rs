//! Lifecycle controller: every state transition of the launchpad.
//!
//! The controller is a pure state machine. Each operation receives the
//! caller identity and the trusted time reading, validates every
//! precondition first and only then mutates. A returned error means no
//! record changed and no event was written.
//!
//! Fund movement is expressed through balances (`Launch::escrow_balance`,
//! `PlatformConfig::fee_balance`) and events; actual transfers are the
//! job of whoever executes the operation.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::book::{Contribution, ContributionBook};
use crate::errors::LaunchpadError;
use crate::events::{EventLog, LaunchpadEvent};
use crate::ledger::{Launch, LaunchLedger, LaunchParams, LaunchStatus};
use crate::registry::{PlatformConfig, PlatformInit, PlatformPatch, PlatformRegistry};
use crate::types::{Address, Balance, LaunchId, Timestamp};
use crate::vesting::claimable_amount;

/// Result of a `finalize` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeOutcome {
    pub status: LaunchStatus,
    pub total_raised: Balance,
    /// Taken into the platform fee balance. Zero when the launch failed.
    pub platform_fee: Balance,
    /// Released to the creator. Zero when the launch failed.
    pub creator_amount: Balance,
}

fn rejected(op: &'static str, err: LaunchpadError) -> LaunchpadError {
    debug!(target: "launchpad", op, code = err.code(), error = %err, "request rejected");
    err
}

/// Owner of all launchpad state.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LifecycleController {
    platform: PlatformRegistry,
    launches: LaunchLedger,
    book: ContributionBook,
    events: EventLog,
}

impl LifecycleController {
    pub fn new() -> Self {
        Self::default()
    }

    /* ------------------------------ Reads ------------------------------ */

    pub fn platform(&self) -> Result<&PlatformConfig, LaunchpadError> {
        self.platform.get()
    }

    pub fn launch(&self, launch_id: LaunchId) -> Result<&Launch, LaunchpadError> {
        self.launches.get(launch_id)
    }

    pub fn launches(&self) -> &LaunchLedger {
        &self.launches
    }

    pub fn contribution(&self, launch_id: LaunchId, investor: &Address) -> Option<&Contribution> {
        self.book.get(launch_id, investor)
    }

    pub fn contributions_of(&self, launch_id: LaunchId) -> Vec<&Contribution> {
        self.book.for_launch(launch_id).collect()
    }

    /// What `claim_tokens` would pay out at `now`, without claiming.
    pub fn claimable(&self, launch_id: LaunchId, investor: &Address, now: Timestamp) -> Result<Balance, LaunchpadError> {
        let launch = self.launches.get(launch_id)?;
        if launch.status != LaunchStatus::Successful {
            return Err(LaunchpadError::LaunchNotApproved);
        }
        let t0 = launch.finalized_at.ok_or(LaunchpadError::LaunchNotApproved)?;
        match self.book.get(launch_id, investor) {
            Some(c) if !c.is_refunded => {
                claimable_amount(c.token_allocation, c.claimed_amount, &launch.vesting, t0, now)
            }
            _ => Ok(0),
        }
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /* ----------------------------- Platform ---------------------------- */

    pub fn initialize(&mut self, init: PlatformInit, now: Timestamp) -> Result<&PlatformConfig, LaunchpadError> {
        let (admin, treasury, fee_bps) = (init.admin, init.treasury, init.fee_bps);
        self.platform.initialize(init).map_err(|e| rejected("initialize", e))?;
        self.events.push(now, LaunchpadEvent::PlatformInitialized { admin, treasury, fee_bps });
        info!(target: "launchpad", %admin, fee_bps, "platform initialized");
        self.platform.get()
    }

    pub fn update_platform(
        &mut self,
        caller: Address,
        patch: &PlatformPatch,
        now: Timestamp,
    ) -> Result<&PlatformConfig, LaunchpadError> {
        let cfg = self
            .platform
            .update(&caller, patch)
            .map_err(|e| rejected("update_platform", e))?
            .clone();
        self.events.push(
            now,
            LaunchpadEvent::PlatformConfigUpdated {
                admin: caller,
                fee_bps: cfg.fee_bps,
                min_launch_duration: cfg.min_launch_duration,
                max_launch_duration: cfg.max_launch_duration,
                min_soft_cap: cfg.min_soft_cap,
            },
        );
        info!(target: "launchpad", fee_bps = cfg.fee_bps, "platform config updated");
        self.platform.get()
    }

    /// Blocks `create_launch` and `contribute` platform-wide. Pausing an
    /// already paused platform succeeds without an event.
    pub fn pause_platform(&mut self, caller: Address, now: Timestamp) -> Result<(), LaunchpadError> {
        if self.platform.pause(&caller).map_err(|e| rejected("pause_platform", e))? {
            self.events.push(now, LaunchpadEvent::PlatformPaused { admin: caller });
            info!(target: "launchpad", "platform paused");
        }
        Ok(())
    }

    pub fn resume_platform(&mut self, caller: Address, now: Timestamp) -> Result<(), LaunchpadError> {
        if self.platform.resume(&caller).map_err(|e| rejected("resume_platform", e))? {
            self.events.push(now, LaunchpadEvent::PlatformResumed { admin: caller });
            info!(target: "launchpad", "platform resumed");
        }
        Ok(())
    }

    /// Withdraw uncollected fees. Returns the amount paid to the admin.
    pub fn collect_fees(&mut self, amount: Balance, caller: Address, now: Timestamp) -> Result<Balance, LaunchpadError> {
        self.do_collect_fees(amount, caller, now).map_err(|e| rejected("collect_fees", e))
    }

    fn do_collect_fees(&mut self, amount: Balance, caller: Address, now: Timestamp) -> Result<Balance, LaunchpadError> {
        let cfg = self.platform.get_mut()?;
        cfg.require_admin(&caller)?;
        if amount > cfg.fee_balance {
            return Err(LaunchpadError::InsufficientFunds);
        }
        cfg.fee_balance -= amount;
        self.events.push(now, LaunchpadEvent::FeesCollected { admin: caller, amount });
        info!(target: "launchpad", amount, "fees collected");
        Ok(amount)
    }

    /* ------------------------------ Launches --------------------------- */

    pub fn create_launch(&mut self, params: LaunchParams, creator: Address, now: Timestamp) -> Result<&Launch, LaunchpadError> {
        let id = params.launch_id;
        self.do_create_launch(params, creator, now).map_err(|e| rejected("create_launch", e))?;
        self.launches.get(id)
    }

    fn do_create_launch(&mut self, params: LaunchParams, creator: Address, now: Timestamp) -> Result<(), LaunchpadError> {
        let platform = self.platform.get()?;
        if !platform.is_operational() {
            return Err(LaunchpadError::PlatformPaused);
        }
        if self.launches.contains(params.launch_id) {
            return Err(LaunchpadError::LaunchAlreadyExists);
        }
        params.validate(platform, now)?;
        let total_launches = platform
            .total_launches
            .checked_add(1)
            .ok_or(LaunchpadError::ArithmeticOverflow)?;

        let launch = self.launches.insert(Launch::new(params, creator, now))?;
        let event = LaunchpadEvent::LaunchCreated {
            launch_id: launch.id,
            creator,
            soft_cap: launch.soft_cap,
            hard_cap: launch.hard_cap,
            start_time: launch.start_time,
            end_time: launch.end_time,
        };
        info!(target: "launchpad", launch_id = %launch.id, %creator, "launch created");
        self.platform.get_mut()?.total_launches = total_launches;
        self.events.push(now, event);
        Ok(())
    }

    /// Pending -> Active.
    pub fn approve(&mut self, launch_id: LaunchId, caller: Address, now: Timestamp) -> Result<(), LaunchpadError> {
        self.do_approve(launch_id, caller, now).map_err(|e| rejected("approve", e))
    }

    fn do_approve(&mut self, launch_id: LaunchId, caller: Address, now: Timestamp) -> Result<(), LaunchpadError> {
        let launch = self.admin_launch_mut(launch_id, &caller)?;
        let next = launch
            .status
            .transition(LaunchStatus::Active, LaunchpadError::LaunchAlreadyFinalized)?;
        // start_time may already have passed (create_launch allows it); only a
        // closed window blocks going live
        if now >= launch.end_time {
            return Err(LaunchpadError::InvalidPresaleTime);
        }
        launch.status = next;
        self.events.push(now, LaunchpadEvent::LaunchApproved { launch_id, admin: caller });
        info!(target: "launchpad", %launch_id, "launch approved");
        Ok(())
    }

    /// Pending -> Cancelled.
    pub fn reject(&mut self, launch_id: LaunchId, caller: Address, now: Timestamp) -> Result<(), LaunchpadError> {
        self.do_reject(launch_id, caller, now).map_err(|e| rejected("reject", e))
    }

    fn do_reject(&mut self, launch_id: LaunchId, caller: Address, now: Timestamp) -> Result<(), LaunchpadError> {
        let launch = self.admin_launch_mut(launch_id, &caller)?;
        if launch.status != LaunchStatus::Pending {
            return Err(LaunchpadError::CannotCancelLaunch);
        }
        launch.status = launch
            .status
            .transition(LaunchStatus::Cancelled, LaunchpadError::CannotCancelLaunch)?;
        self.events.push(now, LaunchpadEvent::LaunchRejected { launch_id, admin: caller });
        info!(target: "launchpad", %launch_id, "launch rejected");
        Ok(())
    }

    /// Paused -> Cancelled. Contributors can then claim refunds.
    pub fn cancel(&mut self, launch_id: LaunchId, caller: Address, now: Timestamp) -> Result<(), LaunchpadError> {
        self.do_cancel(launch_id, caller, now).map_err(|e| rejected("cancel", e))
    }

    fn do_cancel(&mut self, launch_id: LaunchId, caller: Address, now: Timestamp) -> Result<(), LaunchpadError> {
        let launch = self.admin_launch_mut(launch_id, &caller)?;
        if launch.status != LaunchStatus::Paused {
            return Err(LaunchpadError::CannotCancelLaunch);
        }
        launch.status = launch
            .status
            .transition(LaunchStatus::Cancelled, LaunchpadError::CannotCancelLaunch)?;
        self.events.push(now, LaunchpadEvent::LaunchCancelled { launch_id, admin: caller });
        info!(target: "launchpad", %launch_id, "launch cancelled");
        Ok(())
    }

    /// Active -> Paused.
    pub fn emergency_pause(&mut self, launch_id: LaunchId, caller: Address, now: Timestamp) -> Result<(), LaunchpadError> {
        self.do_emergency(launch_id, caller, now, true).map_err(|e| rejected("emergency_pause", e))
    }

    /// Paused -> Active.
    pub fn emergency_resume(&mut self, launch_id: LaunchId, caller: Address, now: Timestamp) -> Result<(), LaunchpadError> {
        self.do_emergency(launch_id, caller, now, false).map_err(|e| rejected("emergency_resume", e))
    }

    fn do_emergency(&mut self, launch_id: LaunchId, caller: Address, now: Timestamp, pause: bool) -> Result<(), LaunchpadError> {
        let launch = self.admin_launch_mut(launch_id, &caller)?;
        let (from, to) = if pause {
            (LaunchStatus::Active, LaunchStatus::Paused)
        } else {
            (LaunchStatus::Paused, LaunchStatus::Active)
        };
        if launch.status != from {
            return Err(LaunchpadError::PresaleNotActive);
        }
        launch.status = launch.status.transition(to, LaunchpadError::PresaleNotActive)?;
        let event = if pause {
            LaunchpadEvent::EmergencyPaused { launch_id, admin: caller }
        } else {
            LaunchpadEvent::EmergencyResumed { launch_id, admin: caller }
        };
        self.events.push(now, event);
        info!(target: "launchpad", %launch_id, paused = pause, "launch emergency state changed");
        Ok(())
    }

    /// Platform lookup, launch lookup, then admin check, in that order.
    fn admin_launch_mut(&mut self, launch_id: LaunchId, caller: &Address) -> Result<&mut Launch, LaunchpadError> {
        let platform = self.platform.get()?;
        let launch = self.launches.get_mut(launch_id)?;
        platform.require_admin(caller)?;
        Ok(launch)
    }

    /* ---------------------------- Contributions ------------------------- */

    /// Add `amount` to the investor's position. Returns the updated record.
    pub fn contribute(
        &mut self,
        launch_id: LaunchId,
        investor: Address,
        amount: Balance,
        now: Timestamp,
    ) -> Result<&Contribution, LaunchpadError> {
        self.do_contribute(launch_id, investor, amount, now)
            .map_err(|e| rejected("contribute", e))?;
        self.book
            .get(launch_id, &investor)
            .ok_or(LaunchpadError::NoTokensAvailable)
    }

    fn do_contribute(&mut self, launch_id: LaunchId, investor: Address, amount: Balance, now: Timestamp) -> Result<(), LaunchpadError> {
        let platform = self.platform.get()?;
        if !platform.is_operational() {
            return Err(LaunchpadError::PlatformPaused);
        }
        let launch = self.launches.get(launch_id)?;
        match launch.status {
            LaunchStatus::Active => {}
            LaunchStatus::Paused => return Err(LaunchpadError::LaunchPaused),
            _ => return Err(LaunchpadError::PresaleNotActive),
        }
        if !launch.is_window_open(now) {
            return Err(LaunchpadError::InvalidPresaleTime);
        }
        if amount < launch.min_contribution {
            return Err(LaunchpadError::ContributionTooLow);
        }

        let existing = self.book.get(launch_id, &investor);
        let prior = existing.map_or(0, |c| c.contribution_amount);
        let cumulative = prior.checked_add(amount).ok_or(LaunchpadError::ArithmeticOverflow)?;
        if cumulative > launch.max_contribution {
            return Err(LaunchpadError::ContributionTooHigh);
        }
        let total_raised = launch
            .total_raised
            .checked_add(amount)
            .ok_or(LaunchpadError::ArithmeticOverflow)?;
        if total_raised > launch.hard_cap {
            return Err(LaunchpadError::HardCapExceeded);
        }
        let escrow = launch
            .escrow_balance
            .checked_add(amount)
            .ok_or(LaunchpadError::ArithmeticOverflow)?;
        let platform_raised = platform
            .total_raised
            .checked_add(amount)
            .ok_or(LaunchpadError::ArithmeticOverflow)?;
        let first = prior == 0;
        let contributors = if first {
            launch
                .contributor_count
                .checked_add(1)
                .ok_or(LaunchpadError::ArithmeticOverflow)?
        } else {
            launch.contributor_count
        };

        // all checks passed; commit
        self.book.record(launch_id, investor, amount)?;
        let launch = self.launches.get_mut(launch_id)?;
        launch.total_raised = total_raised;
        launch.escrow_balance = escrow;
        launch.contributor_count = contributors;
        self.platform.get_mut()?.total_raised = platform_raised;

        self.events.push(
            now,
            LaunchpadEvent::ContributionReceived {
                launch_id,
                investor,
                amount,
                total_contribution: cumulative,
                total_raised,
            },
        );
        info!(target: "launchpad", %launch_id, %investor, amount, total_raised, "contribution received");
        Ok(())
    }

    /* ------------------------------ Finalize ---------------------------- */

    /// Resolve an Active launch once its window closed or the hard cap filled.
    ///
    /// Reaching the soft cap selects Successful: allocations are fixed from
    /// each investor's cumulative contribution, the platform fee moves to the
    /// fee balance and the rest is released to the creator. Otherwise the
    /// launch is Failed and escrow stays in place for refunds.
    pub fn finalize(&mut self, launch_id: LaunchId, caller: Address, now: Timestamp) -> Result<FinalizeOutcome, LaunchpadError> {
        self.do_finalize(launch_id, caller, now).map_err(|e| rejected("finalize", e))
    }

    fn do_finalize(&mut self, launch_id: LaunchId, caller: Address, now: Timestamp) -> Result<FinalizeOutcome, LaunchpadError> {
        let platform = self.platform.get()?;
        let launch = self.launches.get(launch_id)?;
        if caller != launch.creator && caller != platform.admin {
            return Err(LaunchpadError::Unauthorized);
        }
        if launch.status != LaunchStatus::Active {
            return Err(LaunchpadError::LaunchAlreadyFinalized);
        }
        if now < launch.end_time && !launch.has_reached_hard_cap() {
            return Err(LaunchpadError::PresaleNotActive);
        }

        let success = launch.has_reached_soft_cap();
        let target = if success { LaunchStatus::Successful } else { LaunchStatus::Failed };
        let status = launch
            .status
            .transition(target, LaunchpadError::LaunchAlreadyFinalized)?;
        let total_raised = launch.total_raised;

        if !success {
            let launch = self.launches.get_mut(launch_id)?;
            launch.status = status;
            launch.finalized_at = Some(now);
            let outcome = FinalizeOutcome { status, total_raised, platform_fee: 0, creator_amount: 0 };
            self.push_finalized(launch_id, &outcome, now);
            return Ok(outcome);
        }

        let platform_fee = platform.platform_fee(total_raised)?;
        let creator_amount = total_raised
            .checked_sub(platform_fee)
            .ok_or(LaunchpadError::ArithmeticOverflow)?;
        let fee_balance = platform
            .fee_balance
            .checked_add(platform_fee)
            .ok_or(LaunchpadError::ArithmeticOverflow)?;
        let fees_total = platform
            .total_fees_collected
            .checked_add(platform_fee)
            .ok_or(LaunchpadError::ArithmeticOverflow)?;
        let allocations = self
            .book
            .for_launch(launch_id)
            .map(|c| launch.token_allocation(c.contribution_amount).map(|a| (c.investor, a)))
            .collect::<Result<Vec<_>, _>>()?;

        // commit
        for (c, (investor, allocation)) in self.book.for_launch_mut(launch_id).zip(allocations) {
            debug_assert_eq!(c.investor, investor);
            c.token_allocation = allocation;
        }
        let launch = self.launches.get_mut(launch_id)?;
        launch.status = status;
        launch.finalized_at = Some(now);
        launch.escrow_balance = 0;
        let cfg = self.platform.get_mut()?;
        cfg.fee_balance = fee_balance;
        cfg.total_fees_collected = fees_total;

        let outcome = FinalizeOutcome { status, total_raised, platform_fee, creator_amount };
        self.push_finalized(launch_id, &outcome, now);
        Ok(outcome)
    }

    fn push_finalized(&mut self, launch_id: LaunchId, outcome: &FinalizeOutcome, now: Timestamp) {
        let success = outcome.status == LaunchStatus::Successful;
        self.events.push(
            now,
            LaunchpadEvent::LaunchFinalized {
                launch_id,
                success,
                total_raised: outcome.total_raised,
                platform_fee: outcome.platform_fee,
                creator_amount: outcome.creator_amount,
            },
        );
        info!(
            target: "launchpad",
            %launch_id,
            success,
            total_raised = outcome.total_raised,
            platform_fee = outcome.platform_fee,
            "launch finalized"
        );
    }

    /* ------------------------- Claims and refunds ----------------------- */

    /// Pay out whatever has vested since the last claim.
    pub fn claim_tokens(&mut self, launch_id: LaunchId, investor: Address, now: Timestamp) -> Result<Balance, LaunchpadError> {
        self.do_claim_tokens(launch_id, investor, now).map_err(|e| rejected("claim_tokens", e))
    }

    fn do_claim_tokens(&mut self, launch_id: LaunchId, investor: Address, now: Timestamp) -> Result<Balance, LaunchpadError> {
        let launch = self.launches.get(launch_id)?;
        if launch.status != LaunchStatus::Successful {
            return Err(LaunchpadError::LaunchNotApproved);
        }
        let t0 = launch.finalized_at.ok_or(LaunchpadError::LaunchNotApproved)?;
        let record = self
            .book
            .get_mut(launch_id, &investor)
            .ok_or(LaunchpadError::NoTokensAvailable)?;
        if record.is_refunded {
            return Err(LaunchpadError::AlreadyRefunded);
        }
        if record.token_allocation == 0 {
            return Err(LaunchpadError::NoTokensAvailable);
        }
        if record.is_fully_claimed() {
            return Err(LaunchpadError::AlreadyClaimed);
        }
        let amount = claimable_amount(record.token_allocation, record.claimed_amount, &launch.vesting, t0, now)?;
        if amount == 0 {
            return Err(LaunchpadError::NoTokensAvailable);
        }
        let claimed = record
            .claimed_amount
            .checked_add(amount)
            .ok_or(LaunchpadError::ArithmeticOverflow)?;

        record.claimed_amount = claimed;
        record.last_claim_time = Some(now);
        self.events.push(
            now,
            LaunchpadEvent::TokensClaimed { launch_id, investor, amount, total_claimed: claimed },
        );
        info!(target: "launchpad", %launch_id, %investor, amount, "tokens claimed");
        Ok(amount)
    }

    /// Return the full contribution of a Failed or Cancelled launch.
    pub fn claim_refund(&mut self, launch_id: LaunchId, investor: Address, now: Timestamp) -> Result<Balance, LaunchpadError> {
        self.do_claim_refund(launch_id, investor, now).map_err(|e| rejected("claim_refund", e))
    }

    fn do_claim_refund(&mut self, launch_id: LaunchId, investor: Address, now: Timestamp) -> Result<Balance, LaunchpadError> {
        let launch = self.launches.get_mut(launch_id)?;
        if !launch.status.is_refundable() {
            return Err(LaunchpadError::RefundNotAvailable);
        }
        let record = self
            .book
            .get_mut(launch_id, &investor)
            .ok_or(LaunchpadError::RefundNotAvailable)?;
        if record.is_refunded {
            return Err(LaunchpadError::AlreadyRefunded);
        }
        let amount = record.contribution_amount;
        if amount == 0 {
            return Err(LaunchpadError::RefundNotAvailable);
        }
        let escrow = launch
            .escrow_balance
            .checked_sub(amount)
            .ok_or(LaunchpadError::InsufficientFunds)?;

        record.is_refunded = true;
        launch.escrow_balance = escrow;
        self.events.push(now, LaunchpadEvent::RefundClaimed { launch_id, investor, amount });
        info!(target: "launchpad", %launch_id, %investor, amount, "refund claimed");
        Ok(amount)
    }
}

/* ---------------------------------- TESTS ---------------------------------- */
