//! Census service: I/O around the pure mutation layer.
//!
//! A [`CensusService`] owns one repository (production or demo) and, for production, an optional
//! remote mirror. Every commit is written to the local repository first; failures there are
//! errors. The remote write follows and its failure only downgrades the sync status and raises a
//! notification. The local write is never rolled back.

use crate::backup::parse_backup;
use crate::catalog::BedCatalog;
use crate::config::{CensusConfig, StorageNamespace};
use crate::constants::{REMOTE_NEWER_THRESHOLD, SYNC_DEBOUNCE};
use crate::cudyr::Categorization;
use crate::demo::DemoGenerator;
use crate::export::{export_csv, export_json};
use crate::mutations::{CensusAction, CensusEditor};
use crate::record::DailyRecord;
use crate::statistics::{compute_statistics, Statistics};
use crate::store::{build_day, days_with_patients, RecordRepository};
use crate::sync::{
    resolve_incoming, EchoWindow, IncomingDecision, RemoteStore, Subscription, SyncStatus,
};
use crate::{CensusError, CensusResult};
use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
}

/// User-facing message raised by a service operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

impl Notification {
    fn new(level: NotificationLevel, title: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.to_string(),
            message: message.into(),
        }
    }

    pub fn sync_failed() -> Self {
        Self::new(
            NotificationLevel::Error,
            "Error al guardar",
            "Guardado localmente; la sincronización falló. Verifique su conexión o intente nuevamente.",
        )
    }

    pub fn no_previous_record() -> Self {
        Self::new(
            NotificationLevel::Warning,
            "No se encontró registro anterior",
            "No hay datos del día previo para copiar.",
        )
    }
}

/// Result of writing a record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub record: DailyRecord,
    pub sync: SyncStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

/// CUDYR categorisation of one occupant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CudyrRow {
    pub bed_id: String,
    pub bed_name: String,
    pub patient_name: String,
    pub is_crib: bool,
    #[serde(flatten)]
    pub categorization: Categorization,
}

/// Span of demo data to generate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "period", rename_all = "camelCase")]
pub enum DemoPeriod {
    Day { date: NaiveDate },
    Week { start: NaiveDate },
    Month { year: i32, month: u32 },
}

#[derive(Clone)]
pub struct CensusService {
    repo: Arc<dyn RecordRepository>,
    remote: Option<Arc<dyn RemoteStore>>,
    editor: CensusEditor,
    echo: Arc<EchoWindow>,
    remote_newer_threshold: Duration,
    /// Serialises read-modify-write cycles on the local repository.
    write_lock: Arc<Mutex<()>>,
}

impl CensusService {
    pub fn new(repo: Arc<dyn RecordRepository>, editor: CensusEditor) -> Self {
        Self {
            repo,
            remote: None,
            editor,
            echo: Arc::new(EchoWindow::new(SYNC_DEBOUNCE)),
            remote_newer_threshold: REMOTE_NEWER_THRESHOLD,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Mirror commits to `remote`. Ignored for the demo namespace.
    pub fn with_remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        if self.repo.namespace() == StorageNamespace::Demo {
            tracing::debug!("demo namespace: remote mirroring disabled");
            return self;
        }
        self.remote = Some(remote);
        self
    }

    pub fn with_config(mut self, cfg: &CensusConfig) -> Self {
        self.echo = Arc::new(EchoWindow::new(cfg.echo_window()));
        self.remote_newer_threshold = cfg.remote_newer_threshold();
        self
    }

    pub fn namespace(&self) -> StorageNamespace {
        self.repo.namespace()
    }

    pub fn is_demo(&self) -> bool {
        self.namespace() == StorageNamespace::Demo
    }

    pub fn editor(&self) -> &CensusEditor {
        &self.editor
    }

    pub fn catalog(&self) -> &BedCatalog {
        self.editor.catalog()
    }

    pub fn repository(&self) -> &dyn RecordRepository {
        self.repo.as_ref()
    }

    pub fn echo_window(&self) -> Duration {
        self.echo.window()
    }

    pub fn remote_newer_threshold(&self) -> Duration {
        self.remote_newer_threshold
    }

    pub fn record(&self, date: NaiveDate) -> CensusResult<Option<DailyRecord>> {
        self.repo.get(date)
    }

    /// The stored record for `date`.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if the day was never initialised.
    pub fn require(&self, date: NaiveDate) -> CensusResult<DailyRecord> {
        self.repo.get(date)?.ok_or(CensusError::RecordNotFound(date))
    }

    pub fn dates(&self) -> CensusResult<Vec<NaiveDate>> {
        self.repo.dates()
    }

    pub fn days_with_patients(&self, year: i32, month: u32) -> CensusResult<Vec<NaiveDate>> {
        days_with_patients(self.repo.as_ref(), year, month)
    }

    /// Live remote versions of `date`, when mirroring is enabled.
    pub fn subscribe(&self, date: NaiveDate) -> Option<Subscription> {
        self.remote.as_ref().map(|remote| remote.subscribe(date))
    }

    fn lock_writes(&self) -> CensusResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| CensusError::LockPoisoned(e.to_string()))
    }

    /// Write `record` locally, then to the remote mirror.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local write fails. Remote failures are reported through the
    /// returned [`Commit`].
    pub fn commit(&self, record: DailyRecord) -> CensusResult<Commit> {
        let _guard = self.lock_writes()?;
        self.commit_locked(record)
    }

    fn commit_locked(&self, record: DailyRecord) -> CensusResult<Commit> {
        self.repo.save(&record)?;

        let Some(remote) = &self.remote else {
            return Ok(Commit {
                record,
                sync: SyncStatus::Saved,
                notification: None,
            });
        };

        self.echo.mark_local_write(record.date, Instant::now());
        match remote.save(&record) {
            Ok(stamp) => {
                tracing::debug!("record {} mirrored at {}", record.key(), stamp);
                Ok(Commit {
                    record,
                    sync: SyncStatus::Saved,
                    notification: None,
                })
            }
            Err(e) => {
                tracing::error!("remote save of {} failed: {}", record.key(), e);
                Ok(Commit {
                    record,
                    sync: SyncStatus::Error,
                    notification: Some(Notification::sync_failed()),
                })
            }
        }
    }

    /// Decide on an incoming remote version against the stored record and keep it if accepted.
    ///
    /// Accepted versions are stored locally without being mirrored back.
    pub fn receive_remote(
        &self,
        remote: &DailyRecord,
        now: Instant,
    ) -> CensusResult<IncomingDecision> {
        let _guard = self.lock_writes()?;
        let local = self.repo.get(remote.date)?;
        let decision = resolve_incoming(
            local.as_ref(),
            remote,
            &self.echo,
            self.remote_newer_threshold,
            now,
        );
        match decision {
            IncomingDecision::Accept => self.repo.save(remote)?,
            IncomingDecision::IgnoreStale => {
                tracing::debug!("ignored stale remote version of {}", remote.key())
            }
            IncomingDecision::IgnoreEcho => tracing::debug!("ignored echo of {}", remote.key()),
        }
        Ok(decision)
    }

    /// Apply `action` to the stored record of `date` and commit the result.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` for an uninitialised day and `Rejected` when the action is
    /// refused; the stored record is unchanged in both cases.
    pub fn mutate(&self, date: NaiveDate, action: &CensusAction) -> CensusResult<Commit> {
        let _guard = self.lock_writes()?;
        let current = self.require(date)?;
        let next = self.editor.apply(&current, action)?;
        self.commit_locked(next)
    }

    /// Create the record of `date`, blank or carried over from the nearest earlier day.
    ///
    /// An existing record is returned untouched.
    ///
    /// # Errors
    ///
    /// Returns `NoPreviousRecord` when `copy_previous` is set and no earlier day exists.
    pub fn initialise_day(&self, date: NaiveDate, copy_previous: bool) -> CensusResult<Commit> {
        let _guard = self.lock_writes()?;
        if let Some(existing) = self.repo.get(date)? {
            return Ok(Commit {
                record: existing,
                sync: SyncStatus::Idle,
                notification: None,
            });
        }

        let source = if copy_previous {
            let previous = self.repo.previous(date)?;
            if previous.is_none() {
                tracing::warn!("no record before {} to copy from", date);
                return Err(CensusError::NoPreviousRecord(date));
            }
            previous
        } else {
            None
        };

        let record = build_day(
            self.catalog(),
            date,
            source.as_ref(),
            self.editor.clock().now(),
        );
        tracing::info!(
            "initialised {} ({})",
            record.key(),
            source
                .as_ref()
                .map(|s| format!("copied from {}", s.key()))
                .unwrap_or_else(|| "blank".into())
        );

        let mut commit = self.commit_locked(record)?;
        if commit.notification.is_none() {
            commit.notification = Some(Notification::new(
                NotificationLevel::Success,
                "Día creado",
                format!("Se ha inicializado el registro para {}.", date),
            ));
        }
        Ok(commit)
    }

    pub fn statistics(&self, record: &DailyRecord) -> Statistics {
        compute_statistics(self.catalog(), &record.beds)
    }

    /// Categorisation of every occupant of the day, in catalog order.
    pub fn cudyr_report(&self, record: &DailyRecord) -> Vec<CudyrRow> {
        let mut rows = Vec::new();
        for bed in self.catalog().all() {
            let Some(slot) = record.beds.get(&bed.id) else {
                continue;
            };
            if slot.main.is_occupied() && !slot.main.is_blocked {
                rows.push(CudyrRow {
                    bed_id: bed.id.clone(),
                    bed_name: bed.name.clone(),
                    patient_name: slot.main.patient_name.clone(),
                    is_crib: false,
                    categorization: Categorization::of(slot.main.cudyr.as_ref()),
                });
            }
            if let Some(crib) = slot.occupied_crib() {
                rows.push(CudyrRow {
                    bed_id: bed.id.clone(),
                    bed_name: format!("{} (Cuna)", bed.name),
                    patient_name: crib.patient_name.clone(),
                    is_crib: true,
                    categorization: Categorization::of(crib.cudyr.as_ref()),
                });
            }
        }
        rows
    }

    pub fn export_csv(&self, date: NaiveDate) -> CensusResult<String> {
        let record = self.require(date)?;
        Ok(export_csv(self.catalog(), &record))
    }

    pub fn export_json(&self) -> CensusResult<String> {
        export_json(&self.repo.load_all()?)
    }

    /// Validate a JSON backup and merge it into the repository.
    ///
    /// Imported dates replace stored ones; other stored dates are kept. Nothing is written if
    /// validation fails.
    ///
    /// # Returns
    ///
    /// The number of imported days.
    pub fn import_json(&self, raw: &str) -> CensusResult<usize> {
        let records = parse_backup(raw)?;
        let _guard = self.lock_writes()?;
        let count = self.repo.merge(records)?;
        tracing::info!("imported {} days into {:?}", count, self.namespace());
        Ok(count)
    }

    /// Generate demo records for `period` and store them.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` outside the demo namespace.
    pub fn generate_demo<R: Rng>(&self, period: DemoPeriod, rng: R) -> CensusResult<Vec<NaiveDate>> {
        if !self.is_demo() {
            return Err(CensusError::InvalidInput(
                "demo data can only be generated in the demo namespace".into(),
            ));
        }
        let mut generator = DemoGenerator::new(self.catalog(), rng, self.editor.clock().now());
        let records = match period {
            DemoPeriod::Day { date } => vec![generator.generate_day(date)],
            DemoPeriod::Week { start } => generator.generate_week(start),
            DemoPeriod::Month { year, month } => generator.generate_month(year, month)?,
        };

        let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
        let _guard = self.lock_writes()?;
        self.repo
            .merge(records.into_iter().map(|r| (r.key(), r)).collect())?;
        tracing::info!("generated {} demo days", dates.len());
        Ok(dates)
    }

    /// Delete every record of this namespace.
    pub fn wipe(&self) -> CensusResult<()> {
        tracing::warn!("wiping all records in {:?}", self.namespace());
        let _guard = self.lock_writes()?;
        self.repo.clear()
    }
}
