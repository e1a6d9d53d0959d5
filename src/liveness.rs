/// Per-source liveness tracking
///
/// Every recognized datagram refreshes the record of its source address.
/// Online status is derived at query time from how long ago a source was last
/// seen, so no timer is needed to mark devices offline.
///
/// The table is shared between receive workers and status queries through an
/// `RwLock`. An update merges the new sighting into the stored record under the
/// write lock, so a snapshot sees either the previous or the merged state of an
/// entry, never a mix. Every timestamp only moves forward: a worker that
/// reaches the lock late with an older `Instant` cannot roll a record back.
/// Records are never evicted.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Silence after which a source is reported offline
pub const OFFLINE_THRESHOLD: Duration = Duration::from_secs(10);

/// Last classified type of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    TemperatureSensor,
    Heartbeat,
    Registration,
}

impl ClientKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientKind::TemperatureSensor => "temperature_sensor",
            ClientKind::Heartbeat => "heartbeat",
            ClientKind::Registration => "registration",
        }
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored state for one source address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientRecord {
    pub last_seen: Instant,
    pub kind: ClientKind,
    pub last_heartbeat: Option<Instant>,
    pub last_registration: Option<Instant>,
}

impl ClientRecord {
    fn first_seen(kind: ClientKind, at: Instant) -> Self {
        let mut record = Self {
            last_seen: at,
            kind,
            last_heartbeat: None,
            last_registration: None,
        };
        record.stamp(kind, at);
        record
    }

    /// Merge a sighting of `kind` at `at` into the record
    ///
    /// `kind` follows the newest sighting; a stale one only fills its stamp.
    fn merge(&mut self, kind: ClientKind, at: Instant) {
        if at >= self.last_seen {
            self.last_seen = at;
            self.kind = kind;
        }
        self.stamp(kind, at);
    }

    fn stamp(&mut self, kind: ClientKind, at: Instant) {
        let slot = match kind {
            ClientKind::Heartbeat => &mut self.last_heartbeat,
            ClientKind::Registration => &mut self.last_registration,
            ClientKind::TemperatureSensor => return,
        };
        *slot = Some(slot.map_or(at, |previous| previous.max(at)));
    }
}

/// Derived status of one source at query time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientStatus {
    pub kind: ClientKind,
    pub last_seen: Instant,
    pub online: bool,
    pub offline_duration: Duration,
}

/// Thread-safe table of known sources
#[derive(Debug)]
pub struct LivenessTracker {
    clients: RwLock<HashMap<String, ClientRecord>>,
    threshold: Duration,
}

impl Default for LivenessTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::with_threshold(OFFLINE_THRESHOLD)
    }

    pub fn with_threshold(threshold: Duration) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            threshold,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Note that `source_address` sent a datagram of `kind` at `at`
    pub fn record(&self, source_address: &str, kind: ClientKind, at: Instant) {
        // A panic elsewhere cannot leave a half-written record, so a poisoned
        // table is still consistent.
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        match clients.get_mut(source_address) {
            Some(existing) => existing.merge(kind, at),
            None => {
                clients.insert(source_address.to_string(), ClientRecord::first_seen(kind, at));
            }
        }
    }

    /// Status of every known source as of `now`
    pub fn snapshot(&self, now: Instant) -> BTreeMap<String, ClientStatus> {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients
            .iter()
            .map(|(address, record)| (address.clone(), self.status_of(record, now)))
            .collect()
    }

    /// Stored record for one source
    pub fn get(&self, source_address: &str) -> Option<ClientRecord> {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients.get(source_address).copied()
    }

    pub fn len(&self) -> usize {
        self.clients.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn status_of(&self, record: &ClientRecord, now: Instant) -> ClientStatus {
        let offline_duration = now.saturating_duration_since(record.last_seen);
        ClientStatus {
            kind: record.kind,
            last_seen: record.last_seen,
            online: offline_duration < self.threshold,
            offline_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const ADDR: &str = "10.0.0.7:5000";

    #[test]
    fn test_online_transition() {
        let tracker = LivenessTracker::new();
        let t0 = Instant::now();
        tracker.record(ADDR, ClientKind::TemperatureSensor, t0);

        let status = tracker.snapshot(t0 + Duration::from_millis(9_900))[ADDR];
        assert!(status.online);

        let status = tracker.snapshot(t0 + Duration::from_millis(10_100))[ADDR];
        assert!(!status.online);
        assert_eq!(status.offline_duration, Duration::from_millis(10_100));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let tracker = LivenessTracker::new();
        let t0 = Instant::now();
        tracker.record(ADDR, ClientKind::Heartbeat, t0);
        assert!(!tracker.snapshot(t0 + OFFLINE_THRESHOLD)[ADDR].online);
    }

    #[test]
    fn test_auxiliary_stamps_ratchet() {
        let tracker = LivenessTracker::new();
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(1);
        let t2 = t0 + Duration::from_secs(2);
        let t3 = t0 + Duration::from_secs(3);

        tracker.record(ADDR, ClientKind::Registration, t0);
        tracker.record(ADDR, ClientKind::Heartbeat, t1);
        tracker.record(ADDR, ClientKind::TemperatureSensor, t2);

        let record = tracker.get(ADDR).unwrap();
        assert_eq!(record.kind, ClientKind::TemperatureSensor);
        assert_eq!(record.last_seen, t2);
        assert_eq!(record.last_registration, Some(t0));
        assert_eq!(record.last_heartbeat, Some(t1));

        tracker.record(ADDR, ClientKind::Heartbeat, t3);
        let record = tracker.get(ADDR).unwrap();
        assert_eq!(record.last_heartbeat, Some(t3));
        assert_eq!(record.last_registration, Some(t0));
    }

    #[test]
    fn test_out_of_order_records_never_regress() {
        let tracker = LivenessTracker::new();
        let t0 = Instant::now();
        let later = t0 + Duration::from_secs(5);

        tracker.record(ADDR, ClientKind::Heartbeat, later);
        tracker.record(ADDR, ClientKind::Heartbeat, t0);
        let record = tracker.get(ADDR).unwrap();
        assert_eq!(record.last_heartbeat, Some(later));
        assert_eq!(record.last_seen, later);

        tracker.record(ADDR, ClientKind::Registration, t0);
        let record = tracker.get(ADDR).unwrap();
        assert_eq!(record.kind, ClientKind::Heartbeat);
        assert_eq!(record.last_seen, later);
        assert_eq!(record.last_registration, Some(t0));

        let status = tracker.snapshot(t0 + Duration::from_secs(12))[ADDR];
        assert!(status.online);
        assert_eq!(status.offline_duration, Duration::from_secs(7));
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let tracker = LivenessTracker::new();
        let t0 = Instant::now();
        tracker.record(ADDR, ClientKind::Heartbeat, t0);
        tracker.record("10.0.0.8:5000", ClientKind::TemperatureSensor, t0);

        let first = tracker.snapshot(t0 + Duration::from_secs(1));
        let second = tracker.snapshot(t0 + Duration::from_secs(2));
        assert_eq!(first.len(), second.len());
        for (address, before) in &first {
            let after = &second[address];
            assert_eq!(before.kind, after.kind);
            assert_eq!(before.last_seen, after.last_seen);
            assert_eq!(before.online, after.online);
            assert!(after.offline_duration >= before.offline_duration);
        }
    }

    #[test]
    fn test_query_before_record_time() {
        let tracker = LivenessTracker::new();
        let t0 = Instant::now();
        tracker.record(ADDR, ClientKind::Heartbeat, t0 + Duration::from_secs(5));
        let status = tracker.snapshot(t0)[ADDR];
        assert_eq!(status.offline_duration, Duration::ZERO);
        assert!(status.online);
    }

    #[test]
    fn test_concurrent_records() {
        let tracker = Arc::new(LivenessTracker::new());
        let t0 = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for i in 0..100u64 {
                        let address = format!("10.0.{}.{}:9000", worker, i % 10);
                        tracker.record(&address, ClientKind::Heartbeat, t0 + Duration::from_millis(i));
                        let _ = tracker.snapshot(t0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.len(), 80);
        for status in tracker.snapshot(t0).values() {
            assert_eq!(status.kind, ClientKind::Heartbeat);
        }
    }
}
