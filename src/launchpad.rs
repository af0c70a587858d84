//! Thread-safe launchpad service.
//!
//! Wraps the `LifecycleController` in a `parking_lot::RwLock` so concurrent
//! requests apply one at a time, reads the trusted time from a `Clock`, and
//! fans every newly written event out over a `tokio::sync::broadcast` channel.
//! Subscribers that fall behind see `RecvError::Lagged` and can catch up
//! through `events_since`.

use parking_lot::RwLock;
use std::{
    fmt,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::sync::broadcast;
use tracing::instrument;

use crate::book::Contribution;
use crate::controller::{FinalizeOutcome, LifecycleController};
use crate::errors::LaunchpadError;
use crate::events::EventRecord;
use crate::ledger::{Launch, LaunchParams};
use crate::registry::{PlatformConfig, PlatformInit, PlatformPatch};
use crate::settings::Settings;
use crate::types::{Address, Balance, LaunchId, Timestamp};

/// Source of the trusted time reading.
pub trait Clock: Send + Sync + 'static {
    /// Current UNIX time (seconds).
    fn now_unix(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

pub struct Launchpad<C: Clock> {
    clock: Arc<C>,
    state: RwLock<LifecycleController>,
    events_tx: broadcast::Sender<EventRecord>,
}

impl<C: Clock> fmt::Debug for Launchpad<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.read();
        f.debug_struct("Launchpad")
            .field("launches", &st.launches().len())
            .field("last_event", &st.events().last_seq())
            .finish()
    }
}

impl<C: Clock> Launchpad<C> {
    pub fn new(clock: Arc<C>, event_capacity: usize) -> Arc<Self> {
        Self::with_state(clock, event_capacity, LifecycleController::new())
    }

    /// Resume from previously persisted state.
    pub fn with_state(clock: Arc<C>, event_capacity: usize, state: LifecycleController) -> Arc<Self> {
        let (tx, _) = broadcast::channel(event_capacity.max(1));
        Arc::new(Self { clock, state: RwLock::new(state), events_tx: tx })
    }

    pub fn from_settings(clock: Arc<C>, settings: &Settings) -> Arc<Self> {
        Self::new(clock, settings.events.broadcast_capacity)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events_tx.subscribe()
    }

    fn now(&self) -> Timestamp {
        self.clock.now_unix()
    }

    /// Run one mutating operation under the write lock and publish the
    /// events it appended. Records are sent while the lock is held so
    /// subscribers observe them in sequence order.
    fn apply<T>(
        &self,
        op: impl FnOnce(&mut LifecycleController, Timestamp) -> Result<T, LaunchpadError>,
    ) -> Result<T, LaunchpadError> {
        let now = self.now();
        let mut st = self.state.write();
        let from = st.events().last_seq();
        let out = op(&mut *st, now)?;
        for rec in st.events().events_since(from) {
            // no subscribers is fine
            let _ = self.events_tx.send(rec.clone());
        }
        Ok(out)
    }

    /* ----------------------------- Platform ---------------------------- */

    #[instrument(level = "debug", skip(self))]
    pub fn initialize(&self, init: PlatformInit) -> Result<PlatformConfig, LaunchpadError> {
        self.apply(|c, now| c.initialize(init, now).cloned())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn update_platform(&self, caller: Address, patch: PlatformPatch) -> Result<PlatformConfig, LaunchpadError> {
        self.apply(|c, now| c.update_platform(caller, &patch, now).cloned())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn pause_platform(&self, caller: Address) -> Result<(), LaunchpadError> {
        self.apply(|c, now| c.pause_platform(caller, now))
    }

    #[instrument(level = "debug", skip(self))]
    pub fn resume_platform(&self, caller: Address) -> Result<(), LaunchpadError> {
        self.apply(|c, now| c.resume_platform(caller, now))
    }

    #[instrument(level = "debug", skip(self))]
    pub fn collect_fees(&self, amount: Balance, caller: Address) -> Result<Balance, LaunchpadError> {
        self.apply(|c, now| c.collect_fees(amount, caller, now))
    }

    /* ------------------------------ Launches --------------------------- */

    #[instrument(level = "debug", skip(self, params), fields(launch_id = %params.launch_id))]
    pub fn create_launch(&self, params: LaunchParams, creator: Address) -> Result<Launch, LaunchpadError> {
        self.apply(|c, now| c.create_launch(params, creator, now).cloned())
    }

    #[instrument(level = "debug", skip(self), fields(launch_id = %launch_id))]
    pub fn approve(&self, launch_id: LaunchId, caller: Address) -> Result<(), LaunchpadError> {
        self.apply(|c, now| c.approve(launch_id, caller, now))
    }

    #[instrument(level = "debug", skip(self), fields(launch_id = %launch_id))]
    pub fn reject(&self, launch_id: LaunchId, caller: Address) -> Result<(), LaunchpadError> {
        self.apply(|c, now| c.reject(launch_id, caller, now))
    }

    #[instrument(level = "debug", skip(self), fields(launch_id = %launch_id))]
    pub fn cancel(&self, launch_id: LaunchId, caller: Address) -> Result<(), LaunchpadError> {
        self.apply(|c, now| c.cancel(launch_id, caller, now))
    }

    #[instrument(level = "debug", skip(self), fields(launch_id = %launch_id))]
    pub fn emergency_pause(&self, launch_id: LaunchId, caller: Address) -> Result<(), LaunchpadError> {
        self.apply(|c, now| c.emergency_pause(launch_id, caller, now))
    }

    #[instrument(level = "debug", skip(self), fields(launch_id = %launch_id))]
    pub fn emergency_resume(&self, launch_id: LaunchId, caller: Address) -> Result<(), LaunchpadError> {
        self.apply(|c, now| c.emergency_resume(launch_id, caller, now))
    }

    #[instrument(level = "debug", skip(self), fields(launch_id = %launch_id))]
    pub fn contribute(&self, launch_id: LaunchId, investor: Address, amount: Balance) -> Result<Contribution, LaunchpadError> {
        self.apply(|c, now| c.contribute(launch_id, investor, amount, now).cloned())
    }

    #[instrument(level = "debug", skip(self), fields(launch_id = %launch_id))]
    pub fn finalize(&self, launch_id: LaunchId, caller: Address) -> Result<FinalizeOutcome, LaunchpadError> {
        self.apply(|c, now| c.finalize(launch_id, caller, now))
    }

    #[instrument(level = "debug", skip(self), fields(launch_id = %launch_id))]
    pub fn claim_tokens(&self, launch_id: LaunchId, investor: Address) -> Result<Balance, LaunchpadError> {
        self.apply(|c, now| c.claim_tokens(launch_id, investor, now))
    }

    #[instrument(level = "debug", skip(self), fields(launch_id = %launch_id))]
    pub fn claim_refund(&self, launch_id: LaunchId, investor: Address) -> Result<Balance, LaunchpadError> {
        self.apply(|c, now| c.claim_refund(launch_id, investor, now))
    }

    /* ------------------------------- Reads ----------------------------- */

    pub fn platform(&self) -> Result<PlatformConfig, LaunchpadError> {
        self.state.read().platform().cloned()
    }

    pub fn launch(&self, launch_id: LaunchId) -> Result<Launch, LaunchpadError> {
        self.state.read().launch(launch_id).cloned()
    }

    pub fn contribution(&self, launch_id: LaunchId, investor: &Address) -> Option<Contribution> {
        self.state.read().contribution(launch_id, investor).cloned()
    }

    pub fn contributions_of(&self, launch_id: LaunchId) -> Vec<Contribution> {
        self.state
            .read()
            .contributions_of(launch_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Claimable amount at the current clock reading.
    pub fn claimable(&self, launch_id: LaunchId, investor: &Address) -> Result<Balance, LaunchpadError> {
        let now = self.now();
        self.state.read().claimable(launch_id, investor, now)
    }

    pub fn events_since(&self, after: u64) -> Vec<EventRecord> {
        self.state.read().events().events_since(after).to_vec()
    }

    /// Consistent copy of the whole state, e.g. for persistence.
    pub fn snapshot(&self) -> LifecycleController {
        self.state.read().clone()
    }
}

/* ---------------------------------- TESTS ---------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LaunchpadEvent;
    use crate::ledger::{LaunchMetadata, LaunchStatus, TokenInfo};
    use crate::types::{SECONDS_PER_DAY, SECONDS_PER_HOUR, UNIT};
    use crate::vesting::VestingConfig;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::thread;

    const T0: Timestamp = 1_700_000_000;

    fn addr(x: u8) -> Address {
        let mut a = [0u8; 20];
        a[0] = x;
        Address(a)
    }

    #[derive(Default)]
    struct MockClock {
        now: AtomicI64,
    }

    impl MockClock {
        fn at(t: Timestamp) -> Arc<Self> {
            let c = Self::default();
            c.set(t);
            Arc::new(c)
        }
        fn set(&self, t: Timestamp) {
            self.now.store(t, Ordering::SeqCst);
        }
    }

    impl Clock for MockClock {
        fn now_unix(&self) -> Timestamp {
            self.now.load(Ordering::SeqCst)
        }
    }

    fn params(id: u64) -> LaunchParams {
        LaunchParams {
            launch_id: LaunchId(id),
            token: TokenInfo { name: "Test".into(), symbol: "TST".into(), decimals: 6, total_supply: u64::MAX / 2 },
            presale_price: UNIT,
            min_contribution: UNIT / 100,
            max_contribution: 5 * UNIT,
            soft_cap: 2 * UNIT,
            hard_cap: 20 * UNIT,
            start_time: T0 + SECONDS_PER_HOUR,
            end_time: T0 + SECONDS_PER_HOUR + 3 * SECONDS_PER_DAY,
            vesting: VestingConfig {
                cliff_duration: SECONDS_PER_DAY,
                vesting_duration: 10 * SECONDS_PER_DAY,
                initial_unlock_bps: 2_000,
                is_linear: true,
            },
            metadata: LaunchMetadata { website: "https://example.org".into(), ..Default::default() },
        }
    }

    fn setup() -> (Arc<MockClock>, Arc<Launchpad<MockClock>>) {
        let clock = MockClock::at(T0);
        let lp = Launchpad::new(clock.clone(), 64);
        lp.initialize(Settings::default().platform.to_init(addr(0xAA), addr(0xFE)).unwrap())
            .unwrap();
        lp.create_launch(params(1), addr(0xC0)).unwrap();
        lp.approve(LaunchId(1), addr(0xAA)).unwrap();
        (clock, lp)
    }

    #[test]
    fn end_to_end_successful_sale() {
        let (clock, lp) = setup();
        let id = LaunchId(1);
        clock.set(T0 + SECONDS_PER_HOUR);
        lp.contribute(id, addr(1), 2 * UNIT).unwrap();
        lp.contribute(id, addr(2), UNIT).unwrap();

        clock.set(T0 + SECONDS_PER_HOUR + 3 * SECONDS_PER_DAY);
        let out = lp.finalize(id, addr(0xC0)).unwrap();
        assert_eq!(out.status, LaunchStatus::Successful);
        assert_eq!(out.platform_fee, 3 * UNIT * 250 / 10_000);

        // 2 units at 1 unit per token, 6 decimals
        let alloc = 2_000_000;
        assert_eq!(lp.contribution(id, &addr(1)).unwrap().token_allocation, alloc);
        assert_eq!(lp.claimable(id, &addr(1)).unwrap(), alloc / 5);
        assert_eq!(lp.claim_tokens(id, addr(1)).unwrap(), alloc / 5);

        clock.set(T0 + SECONDS_PER_HOUR + 14 * SECONDS_PER_DAY);
        assert_eq!(lp.claim_tokens(id, addr(1)).unwrap(), alloc - alloc / 5);
        assert_eq!(lp.contribution(id, &addr(1)).unwrap().claimed_amount, alloc);
        assert_eq!(lp.contributions_of(id).len(), 2);
    }

    #[test]
    fn subscribers_receive_records_in_order() {
        let clock = MockClock::at(T0);
        let lp = Launchpad::new(clock, 16);
        let mut rx = lp.subscribe();
        lp.initialize(Settings::default().platform.to_init(addr(0xAA), addr(0xFE)).unwrap())
            .unwrap();
        lp.create_launch(params(7), addr(0xC0)).unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.seq, 1);
        assert!(matches!(first.event, LaunchpadEvent::PlatformInitialized { .. }));
        let second = rx.try_recv().unwrap();
        assert_eq!(second.seq, 2);
        assert!(matches!(second.event, LaunchpadEvent::LaunchCreated { launch_id: LaunchId(7), .. }));
        assert!(rx.try_recv().is_err());

        // rejected requests publish nothing
        assert!(lp.create_launch(params(7), addr(0xC0)).is_err());
        assert!(rx.try_recv().is_err());
        assert_eq!(lp.events_since(1).len(), 1);
    }

    #[test]
    fn concurrent_contributions_respect_hard_cap() {
        let (clock, lp) = setup();
        clock.set(T0 + 2 * SECONDS_PER_HOUR);

        // 8 investors x 5 units against a 20 unit hard cap
        let handles: Vec<_> = (1..=8u8)
            .map(|i| {
                let lp = Arc::clone(&lp);
                thread::spawn(move || lp.contribute(LaunchId(1), addr(i), 5 * UNIT).is_ok())
            })
            .collect();
        let accepted = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();

        assert_eq!(accepted, 4);
        let launch = lp.launch(LaunchId(1)).unwrap();
        assert_eq!(launch.total_raised, 20 * UNIT);
        assert_eq!(launch.contributor_count, 4);
        assert_eq!(launch.escrow_balance, 20 * UNIT);
    }

    #[test]
    fn failed_sale_refunds_through_facade() {
        let (clock, lp) = setup();
        clock.set(T0 + 2 * SECONDS_PER_HOUR);
        lp.contribute(LaunchId(1), addr(1), UNIT).unwrap();
        clock.set(T0 + 10 * SECONDS_PER_DAY);
        assert_eq!(lp.finalize(LaunchId(1), addr(0xAA)).unwrap().status, LaunchStatus::Failed);
        assert_eq!(lp.claim_refund(LaunchId(1), addr(1)).unwrap(), UNIT);
        assert_eq!(lp.claim_refund(LaunchId(1), addr(1)).unwrap_err(), LaunchpadError::AlreadyRefunded);
    }

    #[test]
    fn snapshot_restores() {
        let (clock, lp) = setup();
        clock.set(T0 + 2 * SECONDS_PER_HOUR);
        lp.contribute(LaunchId(1), addr(1), UNIT).unwrap();

        let restored = Launchpad::with_state(clock, 8, lp.snapshot());
        assert_eq!(restored.launch(LaunchId(1)).unwrap().total_raised, UNIT);
        assert_eq!(restored.events_since(0).len(), lp.events_since(0).len());
    }

    #[test]
    fn system_clock_is_recent() {
        assert!(SystemClock.now_unix() > T0);
    }
}
