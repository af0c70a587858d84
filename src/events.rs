//! Domain events and the append-only log the controller writes to.
//!
//! Observers only read the log (or a broadcast of it); nothing in here
//! feeds back into core state.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Balance, LaunchId, Timestamp};

/// One event per successful state-changing operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaunchpadEvent {
    PlatformInitialized { admin: Address, treasury: Address, fee_bps: u16 },
    PlatformConfigUpdated { admin: Address, fee_bps: u16, min_launch_duration: i64, max_launch_duration: i64, min_soft_cap: Balance },
    PlatformPaused { admin: Address },
    PlatformResumed { admin: Address },
    LaunchCreated { launch_id: LaunchId, creator: Address, soft_cap: Balance, hard_cap: Balance, start_time: Timestamp, end_time: Timestamp },
    LaunchApproved { launch_id: LaunchId, admin: Address },
    LaunchRejected { launch_id: LaunchId, admin: Address },
    LaunchCancelled { launch_id: LaunchId, admin: Address },
    ContributionReceived { launch_id: LaunchId, investor: Address, amount: Balance, total_contribution: Balance, total_raised: Balance },
    LaunchFinalized {
        launch_id: LaunchId,
        success: bool,
        total_raised: Balance,
        /// Zero on the failed branch.
        platform_fee: Balance,
        /// Amount routed to the creator; zero on the failed branch.
        creator_amount: Balance,
    },
    TokensClaimed { launch_id: LaunchId, investor: Address, amount: Balance, total_claimed: Balance },
    RefundClaimed { launch_id: LaunchId, investor: Address, amount: Balance },
    EmergencyPaused { launch_id: LaunchId, admin: Address },
    EmergencyResumed { launch_id: LaunchId, admin: Address },
    FeesCollected { admin: Address, amount: Balance },
}

impl LaunchpadEvent {
    /// Launch the event concerns, if any.
    pub fn launch_id(&self) -> Option<LaunchId> {
        use LaunchpadEvent::*;
        match self {
            LaunchCreated { launch_id, .. }
            | LaunchApproved { launch_id, .. }
            | LaunchRejected { launch_id, .. }
            | LaunchCancelled { launch_id, .. }
            | ContributionReceived { launch_id, .. }
            | LaunchFinalized { launch_id, .. }
            | TokensClaimed { launch_id, .. }
            | RefundClaimed { launch_id, .. }
            | EmergencyPaused { launch_id, .. }
            | EmergencyResumed { launch_id, .. } => Some(*launch_id),
            PlatformInitialized { .. }
            | PlatformConfigUpdated { .. }
            | PlatformPaused { .. }
            | PlatformResumed { .. }
            | FeesCollected { .. } => None,
        }
    }

    /// Short stable name, used as a log field.
    pub fn kind(&self) -> &'static str {
        use LaunchpadEvent::*;
        match self {
            PlatformInitialized { .. } => "platform_initialized",
            PlatformConfigUpdated { .. } => "platform_config_updated",
            PlatformPaused { .. } => "platform_paused",
            PlatformResumed { .. } => "platform_resumed",
            LaunchCreated { .. } => "launch_created",
            LaunchApproved { .. } => "launch_approved",
            LaunchRejected { .. } => "launch_rejected",
            LaunchCancelled { .. } => "launch_cancelled",
            ContributionReceived { .. } => "contribution_received",
            LaunchFinalized { .. } => "launch_finalized",
            TokensClaimed { .. } => "tokens_claimed",
            RefundClaimed { .. } => "refund_claimed",
            EmergencyPaused { .. } => "emergency_paused",
            EmergencyResumed { .. } => "emergency_resumed",
            FeesCollected { .. } => "fees_collected",
        }
    }
}

/// Log entry. `seq` starts at 1 and increases by one per entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub at: Timestamp,
    pub event: LaunchpadEvent,
}

/// Append-only event log.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, at: Timestamp, event: LaunchpadEvent) -> &EventRecord {
        let seq = self.last_seq() + 1;
        let idx = self.records.len();
        self.records.push(EventRecord { seq, at, event });
        &self.records[idx]
    }

    /// Sequence number of the newest entry, 0 when empty.
    pub fn last_seq(&self) -> u64 {
        self.records.last().map_or(0, |r| r.seq)
    }

    /// Entries with `seq > after`, oldest first.
    pub fn events_since(&self, after: u64) -> &[EventRecord] {
        let start = self.records.partition_point(|r| r.seq <= after);
        &self.records[start..]
    }

    /// Up to `limit` newest entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<EventRecord> {
        self.records.iter().rev().take(limit).cloned().collect()
    }

    pub fn for_launch(&self, launch_id: LaunchId) -> impl Iterator<Item = &EventRecord> {
        self.records.iter().filter(move |r| r.event.launch_id() == Some(launch_id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approved(id: u64) -> LaunchpadEvent {
        LaunchpadEvent::LaunchApproved { launch_id: LaunchId(id), admin: Address([1; 20]) }
    }

    #[test]
    fn seq_starts_at_one_and_is_dense() {
        let mut log = EventLog::new();
        assert_eq!(log.last_seq(), 0);
        assert_eq!(log.push(10, approved(1)).seq, 1);
        assert_eq!(log.push(11, approved(2)).seq, 2);
        assert_eq!(log.push(11, LaunchpadEvent::PlatformPaused { admin: Address([1; 20]) }).seq, 3);
        assert_eq!(log.last_seq(), 3);
    }

    #[test]
    fn events_since_and_recent() {
        let mut log = EventLog::new();
        for i in 0..5 {
            log.push(i, approved(i as u64));
        }
        assert_eq!(log.events_since(0).len(), 5);
        let tail = log.events_since(3);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].seq, 4);
        assert!(log.events_since(99).is_empty());

        let recent = log.recent(2);
        assert_eq!(recent.iter().map(|r| r.seq).collect::<Vec<_>>(), vec![5, 4]);
    }

    #[test]
    fn events_since_tolerates_gaps_in_restored_logs() {
        let log = EventLog {
            records: [1, 4, 9]
                .into_iter()
                .map(|seq| EventRecord { seq, at: 0, event: approved(seq) })
                .collect(),
        };
        assert_eq!(log.events_since(0).len(), 3);
        assert_eq!(log.events_since(1)[0].seq, 4);
        assert_eq!(log.events_since(4)[0].seq, 9);
        assert_eq!(log.events_since(5)[0].seq, 9);
        assert!(log.events_since(9).is_empty());
    }

    #[test]
    fn launch_filter_and_kind() {
        let mut log = EventLog::new();
        log.push(0, approved(1));
        log.push(0, LaunchpadEvent::PlatformResumed { admin: Address([1; 20]) });
        log.push(0, approved(2));
        assert_eq!(log.for_launch(LaunchId(2)).count(), 1);
        assert_eq!(log.recent(1)[0].event.kind(), "launch_approved");
    }

    #[test]
    fn records_serialize() {
        let mut log = EventLog::new();
        log.push(42, approved(7));
        let json = serde_json::to_value(&log.events_since(0)[0]).unwrap();
        assert_eq!(json["seq"], 1);
        assert_eq!(json["at"], 42);
        assert_eq!(json["event"]["LaunchApproved"]["launch_id"], 7);
    }
}
