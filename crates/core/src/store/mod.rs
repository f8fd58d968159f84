//! Local persistence of daily records.
//!
//! All records of one namespace live in a single JSON object keyed by date (`YYYY-MM-DD`),
//! mirroring the original browser storage layout. The production and demo namespaces are
//! separate [`RecordRepository`] instances chosen when a service is built.
//!
//! - [`JsonFileRepository`]: one JSON file per storage key under the data directory
//! - [`MemoryRepository`]: in-process map for tests and demo sessions
//! - [`NurseRosterStore`]: the nurse roster under its own key

mod json_file;
mod memory;
mod nurses;

pub use json_file::JsonFileRepository;
pub use memory::MemoryRepository;
pub use nurses::NurseRosterStore;

use crate::catalog::BedCatalog;
use crate::config::StorageNamespace;
use crate::patient::PatientData;
use crate::record::{date_key, parse_date_key, DailyRecord, RecordMap};
use crate::CensusResult;
use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Storage of the date → record map for one namespace.
///
/// Implementors provide whole-map load and an atomic read-modify-write; the per-date
/// operations are derived from those two.
pub trait RecordRepository: Send + Sync {
    fn namespace(&self) -> StorageNamespace;

    /// Read the whole map. A namespace that was never written is an empty map.
    fn load_all(&self) -> CensusResult<RecordMap>;

    /// Load, modify and write back the map while holding the store's lock.
    fn update(&self, apply: &mut dyn FnMut(&mut RecordMap)) -> CensusResult<()>;

    fn get(&self, date: NaiveDate) -> CensusResult<Option<DailyRecord>> {
        Ok(self.load_all()?.remove(&date_key(date)))
    }

    /// Insert or replace the record under its date.
    fn save(&self, record: &DailyRecord) -> CensusResult<()> {
        self.update(&mut |records| {
            records.insert(record.key(), record.clone());
        })
    }

    /// The record of the nearest earlier date that has one.
    fn previous(&self, date: NaiveDate) -> CensusResult<Option<DailyRecord>> {
        let key = date_key(date);
        Ok(self
            .load_all()?
            .into_iter()
            .rev()
            .find(|(k, _)| *k < key)
            .map(|(_, record)| record))
    }

    /// Stored dates, ascending. Keys that are not dates are skipped.
    fn dates(&self) -> CensusResult<Vec<NaiveDate>> {
        Ok(self
            .load_all()?
            .keys()
            .filter_map(|k| parse_date_key(k))
            .collect())
    }

    /// Shallow merge: imported dates overwrite, other stored dates are kept.
    fn merge(&self, imported: RecordMap) -> CensusResult<usize> {
        let count = imported.len();
        self.update(&mut |records| {
            records.extend(imported.clone());
        })?;
        Ok(count)
    }

    /// Drop every record in the namespace.
    fn clear(&self) -> CensusResult<()> {
        self.update(&mut |records| records.clear())
    }
}

/// Days of the given month whose record holds at least one patient.
pub fn days_with_patients(
    repo: &dyn RecordRepository,
    year: i32,
    month: u32,
) -> CensusResult<Vec<NaiveDate>> {
    Ok(repo
        .load_all()?
        .values()
        .filter(|r| r.date.year() == year && r.date.month() == month && r.has_patients())
        .map(|r| r.date)
        .collect())
}

/// Build a new day's record, blank or carried over from `source`.
///
/// Carried over:
/// - occupied or blocked beds, cloned with every CUDYR item reset to zero (crib included)
/// - furniture of empty beds (`bed_mode`, `has_companion_crib`)
/// - the location override of extra beds
/// - the set of active extra beds
///
/// Logs and nurse slots always start empty.
pub fn build_day(
    catalog: &BedCatalog,
    date: NaiveDate,
    source: Option<&DailyRecord>,
    now: DateTime<Utc>,
) -> DailyRecord {
    let mut record = DailyRecord::blank(catalog, date, now);
    let Some(source) = source else {
        return record;
    };

    record.active_extra_beds = source.active_extra_beds.clone();
    for bed in catalog.all() {
        let Some(previous) = source.beds.get(&bed.id) else {
            continue;
        };
        let Some(slot) = record.beds.get_mut(&bed.id) else {
            continue;
        };

        if previous.main.is_occupied() || previous.main.is_blocked {
            *slot = reset_cudyr(previous.clone());
        } else {
            slot.main.bed_mode = previous.main.bed_mode;
            slot.main.has_companion_crib = previous.main.has_companion_crib;
        }

        if bed.is_extra && !previous.main.location.is_empty() {
            slot.main.location = previous.main.location.clone();
        }
    }
    record
}

fn reset_cudyr(mut slot: PatientData) -> PatientData {
    if let Some(score) = slot.main.cudyr.as_mut() {
        *score = Default::default();
    }
    if let Some(score) = slot.clinical_crib.as_mut().and_then(|c| c.cudyr.as_mut()) {
        *score = Default::default();
    }
    slot
}
