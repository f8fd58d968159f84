//! Remote mirroring of daily records.
//!
//! The remote side is a document store holding one JSON document per date. Writes are stamped
//! with the store's own clock, and a subscription delivers every new version of a date's
//! document, including the echo of this client's own writes.
//!
//! Conflict handling is last-writer-wins with echo suppression (see [`resolve_incoming`]). Two
//! clients editing the same date inside the echo window can still overwrite each other; the
//! scheme is best-effort, not a consistency guarantee.

use crate::clock::{Clock, SystemClock};
use crate::constants::NURSE_SLOTS;
use crate::record::{date_key, DailyRecord};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Optional slot fields written as explicit `null` so that removals replace older values.
const NULLABLE_SLOT_KEYS: [&str; 6] = [
    "clinicalCrib",
    "insurance",
    "admissionOrigin",
    "origin",
    "deviceDetails",
    "cudyr",
];

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("remote store is unavailable")]
    Unavailable,
    #[error("failed to encode remote document: {0}")]
    Encode(serde_json::Error),
    #[error("failed to decode remote document: {0}")]
    Decode(serde_json::Error),
    #[error("remote store lock poisoned: {0}")]
    LockPoisoned(String),
}

/// User-visible state of the last save.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

/// A new version of one date's document.
#[derive(Clone, Debug)]
pub struct RemoteEvent {
    pub key: String,
    pub document: Value,
}

pub trait RemoteStore: Send + Sync {
    /// Write the record; returns the timestamp the store assigned.
    fn save(&self, record: &DailyRecord) -> Result<DateTime<Utc>, SyncError>;

    fn fetch(&self, date: NaiveDate) -> Result<Option<DailyRecord>, SyncError>;

    /// Listen for new versions of `date`. Dropping the subscription ends it.
    fn subscribe(&self, date: NaiveDate) -> Subscription;
}

/// Stream of remote versions of one date.
pub struct Subscription {
    date: NaiveDate,
    key: String,
    rx: broadcast::Receiver<RemoteEvent>,
}

impl Subscription {
    pub fn new(date: NaiveDate, rx: broadcast::Receiver<RemoteEvent>) -> Self {
        Self {
            date,
            key: date_key(date),
            rx,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Next pending version without waiting, or `None` when nothing is queued.
    pub fn try_next(&mut self) -> Option<Result<DailyRecord, SyncError>> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.key == self.key => return Some(from_document(event.document)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("subscription for {} skipped {} updates", self.key, skipped);
                    continue;
                }
                Err(_) => return None,
            }
        }
    }

    /// Wait for the next version. Returns `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Result<DailyRecord, SyncError>> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.key == self.key => return Some(from_document(event.document)),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("subscription for {} skipped {} updates", self.key, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Encode a record as a remote document stamped with `stamp`.
///
/// Absent optional slot fields become `null`.
pub fn to_document(record: &DailyRecord, stamp: DateTime<Utc>) -> Result<Value, SyncError> {
    let mut doc = serde_json::to_value(record).map_err(SyncError::Encode)?;
    if let Some(obj) = doc.as_object_mut() {
        obj.insert(
            "lastUpdated".into(),
            Value::String(stamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        if !obj.contains_key("nurseName") {
            obj.insert("nurseName".into(), Value::Null);
        }
        if let Some(beds) = obj.get_mut("beds").and_then(Value::as_object_mut) {
            for slot in beds.values_mut().filter_map(Value::as_object_mut) {
                for key in NULLABLE_SLOT_KEYS {
                    slot.entry(key).or_insert(Value::Null);
                }
            }
        }
    }
    Ok(doc)
}

/// Decode a remote document. `null` fields are read as absent.
pub fn from_document(document: Value) -> Result<DailyRecord, SyncError> {
    let mut record: DailyRecord =
        serde_json::from_value(strip_nulls(document)).map_err(SyncError::Decode)?;
    if record.nurses.is_empty() {
        record.nurses = vec![String::new(); NURSE_SLOTS];
    }
    Ok(record)
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

/// Most recent local write per date, for echo suppression.
///
/// One window is shared by every caller committing through the same service.
#[derive(Debug)]
pub struct EchoWindow {
    window: Duration,
    writes: Mutex<BTreeMap<NaiveDate, Instant>>,
}

impl EchoWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            writes: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn mark_local_write(&self, date: NaiveDate, at: Instant) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(date, at);
    }

    pub fn is_open(&self, date: NaiveDate, now: Instant) -> bool {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&date)
            .is_some_and(|at| now.saturating_duration_since(*at) < self.window)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncomingDecision {
    Accept,
    /// Older than the stored record: a late copy of a version already superseded locally.
    IgnoreStale,
    IgnoreEcho,
}

/// Decide whether an incoming remote version replaces the stored record.
///
/// 1. No stored record: accept.
/// 2. Remote `last_updated` later than stored by more than `newer_threshold`: accept, it came
///    from another client.
/// 3. Remote `last_updated` earlier than stored: ignore, it is stale.
/// 4. A local write to that date happened inside the echo window: ignore, it is our own write
///    coming back.
/// 5. Otherwise accept.
pub fn resolve_incoming(
    local: Option<&DailyRecord>,
    remote: &DailyRecord,
    echo: &EchoWindow,
    newer_threshold: Duration,
    now: Instant,
) -> IncomingDecision {
    let Some(local) = local else {
        return IncomingDecision::Accept;
    };
    let threshold = chrono::Duration::from_std(newer_threshold).unwrap_or(chrono::Duration::zero());
    if remote.last_updated > local.last_updated + threshold {
        return IncomingDecision::Accept;
    }
    if remote.last_updated < local.last_updated {
        return IncomingDecision::IgnoreStale;
    }
    if echo.is_open(remote.date, now) {
        return IncomingDecision::IgnoreEcho;
    }
    IncomingDecision::Accept
}

/// In-process document store with live subscriptions.
pub struct InMemoryRemote {
    documents: Mutex<BTreeMap<String, Value>>,
    tx: broadcast::Sender<RemoteEvent>,
    offline: AtomicBool,
    clock: Arc<dyn Clock>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            documents: Mutex::new(BTreeMap::new()),
            tx,
            offline: AtomicBool::new(false),
            clock,
        }
    }

    /// Simulate losing (or regaining) the connection.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Raw stored document, as another client would see it.
    pub fn document(&self, date: NaiveDate) -> Option<Value> {
        self.documents
            .lock()
            .ok()
            .and_then(|docs| docs.get(&date_key(date)).cloned())
    }

    fn ensure_online(&self) -> Result<(), SyncError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Unavailable);
        }
        Ok(())
    }
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for InMemoryRemote {
    fn save(&self, record: &DailyRecord) -> Result<DateTime<Utc>, SyncError> {
        self.ensure_online()?;
        let stamp = self.clock.now();
        let document = to_document(record, stamp)?;
        let key = record.key();
        self.documents
            .lock()
            .map_err(|e| SyncError::LockPoisoned(e.to_string()))?
            .insert(key.clone(), document.clone());
        // No receivers is fine: nobody has the date open.
        let _ = self.tx.send(RemoteEvent { key, document });
        Ok(stamp)
    }

    fn fetch(&self, date: NaiveDate) -> Result<Option<DailyRecord>, SyncError> {
        self.ensure_online()?;
        let document = self
            .documents
            .lock()
            .map_err(|e| SyncError::LockPoisoned(e.to_string()))?
            .get(&date_key(date))
            .cloned();
        document.map(from_document).transpose()
    }

    fn subscribe(&self, date: NaiveDate) -> Subscription {
        Subscription::new(date, self.tx.subscribe())
    }
}
