//! Per-date client session.
//!
//! A [`DaySession`] tracks the date a client has open: the loaded record, the sync status of the
//! last save, and the single remote subscription for that date. Opening another date drops the
//! old subscription before the new one is created.

use crate::mutations::CensusAction;
use crate::record::DailyRecord;
use crate::service::{CensusService, Commit, Notification};
use crate::sync::{IncomingDecision, Subscription, SyncStatus};
use crate::{CensusError, CensusResult};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DayState {
    NotLoaded,
    /// Read from storage. The record may still be absent if the day was never initialised.
    Loaded,
}

pub struct DaySession {
    service: Arc<CensusService>,
    date: NaiveDate,
    state: DayState,
    record: Option<DailyRecord>,
    subscription: Option<Subscription>,
    status: SyncStatus,
    notifications: Vec<Notification>,
}

impl DaySession {
    pub fn new(service: Arc<CensusService>, date: NaiveDate) -> Self {
        Self {
            service,
            date,
            state: DayState::NotLoaded,
            record: None,
            subscription: None,
            status: SyncStatus::Idle,
            notifications: Vec::new(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn state(&self) -> DayState {
        self.state
    }

    pub fn record(&self) -> Option<&DailyRecord> {
        self.record.as_ref()
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Notifications raised since the last call.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Load the current date and start listening for its remote versions.
    pub fn load(&mut self) -> CensusResult<Option<&DailyRecord>> {
        self.open(self.date)
    }

    /// Switch to `date`: tear down the old subscription, load the record, subscribe again.
    pub fn open(&mut self, date: NaiveDate) -> CensusResult<Option<&DailyRecord>> {
        self.subscription = None;
        self.date = date;
        self.state = DayState::NotLoaded;
        self.record = None;
        self.status = SyncStatus::Idle;

        self.record = self.service.record(date)?;
        self.state = DayState::Loaded;
        self.subscription = self.service.subscribe(date);
        tracing::debug!("opened {} (subscribed: {})", date, self.is_subscribed());
        Ok(self.record())
    }

    /// Initialise the open date, blank or copied from the nearest earlier day.
    pub fn initialise(&mut self, copy_previous: bool) -> CensusResult<&DailyRecord> {
        let commit = match self.service.initialise_day(self.date, copy_previous) {
            Ok(commit) => commit,
            Err(CensusError::NoPreviousRecord(date)) => {
                self.notifications.push(Notification::no_previous_record());
                return Err(CensusError::NoPreviousRecord(date));
            }
            Err(e) => return Err(e),
        };
        Ok(self.adopt(commit))
    }

    /// Apply one action to the open date and commit it.
    ///
    /// The action runs against the stored record, so writes made through the same service
    /// since this session loaded are kept.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` when nothing is loaded, `Rejected` when the action is refused,
    /// and storage errors from the local write.
    pub fn apply(&mut self, action: &CensusAction) -> CensusResult<&DailyRecord> {
        if self.record.is_none() {
            return Err(CensusError::RecordNotFound(self.date));
        }
        let commit = self.service.mutate(self.date, action)?;
        Ok(self.adopt(commit))
    }

    fn adopt(&mut self, commit: Commit) -> &DailyRecord {
        self.status = commit.sync;
        self.notifications.extend(commit.notification);
        self.state = DayState::Loaded;
        self.record.insert(commit.record)
    }

    /// Decide on one incoming remote version and refresh the open record.
    ///
    /// The decision is made against the stored record, not this session's copy.
    pub fn handle_remote(
        &mut self,
        remote: DailyRecord,
        now: Instant,
    ) -> CensusResult<IncomingDecision> {
        if remote.date != self.date {
            return Ok(IncomingDecision::IgnoreEcho);
        }
        let decision = self.service.receive_remote(&remote, now)?;
        if decision == IncomingDecision::Accept {
            self.status = SyncStatus::Saved;
        }
        self.record = self.service.record(self.date)?;
        self.state = DayState::Loaded;
        Ok(decision)
    }

    /// Process every queued remote version without waiting.
    ///
    /// # Returns
    ///
    /// How many versions were accepted.
    pub fn poll_remote(&mut self) -> CensusResult<usize> {
        let mut accepted = 0;
        while let Some(incoming) = self.subscription.as_mut().and_then(Subscription::try_next) {
            match incoming {
                Ok(remote) => {
                    if self.handle_remote(remote, Instant::now())? == IncomingDecision::Accept {
                        accepted += 1;
                    }
                }
                Err(e) => tracing::warn!("skipping undecodable remote version: {}", e),
            }
        }
        Ok(accepted)
    }

    /// Wait for the next remote version and handle it.
    ///
    /// Returns `None` when there is no subscription or the remote store is gone.
    pub async fn next_remote(&mut self) -> Option<CensusResult<IncomingDecision>> {
        loop {
            let incoming = self.subscription.as_mut()?.next().await?;
            match incoming {
                Ok(remote) => return Some(self.handle_remote(remote, Instant::now())),
                Err(e) => tracing::warn!("skipping undecodable remote version: {}", e),
            }
        }
    }
}
