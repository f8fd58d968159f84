//! Bed and patient mutation operations.
//!
//! Every operation is a pure function of the current [`DailyRecord`]: it either returns a new
//! record or a [`Rejection`] explaining why the action is a no-op. The input record is never
//! modified, and persisting the result is the caller's job (see [`crate::service`]).
//!
//! Applied operations stamp `last_updated` with the editor's clock. Rejected ones leave the
//! record, including `last_updated`, untouched.
//!
//! Operations are grouped by concern:
//! - [`beds`]: field edits, CUDYR, clear, move/copy, block and extra beds
//! - [`crib`]: the nested clinical crib lifecycle
//! - [`discharges`] and [`transfers`]: snapshot events with undo
//! - [`cma`]: ambulatory procedure log
//! - [`nurses`]: the two nurse slots

pub mod beds;
pub mod cma;
pub mod crib;
pub mod discharges;
pub mod nurses;
pub mod transfers;

pub use beds::MoveMode;
pub use cma::{CmaUpdate, NewCmaEntry};
pub use transfers::{TransferRequest, TransferUpdate};

use crate::catalog::BedCatalog;
use crate::clock::{Clock, SystemClock};
use crate::cudyr::{CudyrItem, CudyrScore};
use crate::patient::{
    AdmissionOrigin, BedMode, BiologicalSex, DeviceDetails, DocumentType, Insurance, Occupant,
    PatientData, PatientStatus, ResidencyCondition, Specialty,
};
use crate::record::{parse_date_key, DailyRecord, DischargeStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Why a mutation had no effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("bed {0} is not in the catalog")]
    UnknownBed(String),
    #[error("bed {0} has no patient")]
    VacantBed(String),
    #[error("admission date {0} is in the future")]
    FutureAdmissionDate(NaiveDate),
    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("bed {0} has no clinical crib")]
    NoClinicalCrib(String),
    #[error("cannot enable a companion crib while bed {0} holds a clinical crib patient")]
    CribPatientPresent(String),
    #[error("cannot undo for {patient}: bed {bed} is already occupied")]
    BedOccupied { patient: String, bed: String },
    #[error("cannot restore the clinical crib of {bed}: the main bed must be occupied first")]
    MainSlotVacant { bed: String },
    #[error("cannot undo for {patient}: bed {bed} already has an occupied clinical crib")]
    CribOccupied { patient: String, bed: String },
    #[error("source and target are the same bed ({0})")]
    SameBed(String),
    #[error("bed {0} is not an extra bed")]
    NotExtraBed(String),
    #[error("no entry with id {0}")]
    UnknownEntry(String),
    #[error("entry {0} has no snapshot to restore")]
    MissingSnapshot(String),
    #[error("CUDYR value {0} is out of range (0-3)")]
    CudyrOutOfRange(u8),
    #[error("nurse slot {0} does not exist")]
    NurseSlot(usize),
    #[error("no field updates to apply")]
    NothingToApply,
}

pub type Outcome = Result<DailyRecord, Rejection>;

/// A single field assignment on an [`Occupant`].
///
/// Serialised as `{"field": "<camelCase name>", "value": ...}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum FieldUpdate {
    IsBlocked(bool),
    BlockedReason(String),
    BedMode(BedMode),
    HasCompanionCrib(bool),
    PatientName(String),
    Rut(String),
    DocumentType(DocumentType),
    Age(String),
    BirthDate(String),
    BiologicalSex(BiologicalSex),
    Insurance(Option<Insurance>),
    AdmissionOrigin(Option<AdmissionOrigin>),
    AdmissionOriginDetails(String),
    Origin(Option<ResidencyCondition>),
    IsRapanui(bool),
    Pathology(String),
    DiagnosisComments(String),
    Specialty(Specialty),
    Status(PatientStatus),
    AdmissionDate(String),
    HasWristband(bool),
    IsBedridden(bool),
    Devices(Vec<String>),
    DeviceDetails(Option<DeviceDetails>),
    SurgicalComplication(bool),
    #[serde(rename = "isUPC")]
    IsUpc(bool),
    Location(String),
    Cudyr(Option<CudyrScore>),
    HandoffNote(String),
}

impl FieldUpdate {
    pub fn apply_to(&self, o: &mut Occupant) {
        match self.clone() {
            FieldUpdate::IsBlocked(v) => o.is_blocked = v,
            FieldUpdate::BlockedReason(v) => o.blocked_reason = v,
            FieldUpdate::BedMode(v) => o.bed_mode = v,
            FieldUpdate::HasCompanionCrib(v) => o.has_companion_crib = v,
            FieldUpdate::PatientName(v) => o.patient_name = v,
            FieldUpdate::Rut(v) => o.rut = v,
            FieldUpdate::DocumentType(v) => o.document_type = v,
            FieldUpdate::Age(v) => o.age = v,
            FieldUpdate::BirthDate(v) => o.birth_date = v,
            FieldUpdate::BiologicalSex(v) => o.biological_sex = v,
            FieldUpdate::Insurance(v) => o.insurance = v,
            FieldUpdate::AdmissionOrigin(v) => o.admission_origin = v,
            FieldUpdate::AdmissionOriginDetails(v) => o.admission_origin_details = v,
            FieldUpdate::Origin(v) => o.origin = v,
            FieldUpdate::IsRapanui(v) => o.is_rapanui = v,
            FieldUpdate::Pathology(v) => o.pathology = v,
            FieldUpdate::DiagnosisComments(v) => o.diagnosis_comments = v,
            FieldUpdate::Specialty(v) => o.specialty = v,
            FieldUpdate::Status(v) => o.status = v,
            FieldUpdate::AdmissionDate(v) => o.admission_date = v,
            FieldUpdate::HasWristband(v) => o.has_wristband = v,
            FieldUpdate::IsBedridden(v) => o.is_bedridden = v,
            FieldUpdate::Devices(v) => o.devices = v,
            FieldUpdate::DeviceDetails(v) => o.device_details = v,
            FieldUpdate::SurgicalComplication(v) => o.surgical_complication = v,
            FieldUpdate::IsUpc(v) => o.is_upc = v,
            FieldUpdate::Location(v) => o.location = v,
            FieldUpdate::Cudyr(v) => o.cudyr = v,
            FieldUpdate::HandoffNote(v) => o.handoff_note = v,
        }
    }
}

/// Every mutation as a serialisable command, tagged by `action`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CensusAction {
    UpdateField {
        bed_id: String,
        update: FieldUpdate,
    },
    UpdateFields {
        bed_id: String,
        updates: Vec<FieldUpdate>,
    },
    UpdateCudyr {
        bed_id: String,
        item: CudyrItem,
        value: u8,
    },
    CreateCrib {
        bed_id: String,
    },
    RemoveCrib {
        bed_id: String,
    },
    UpdateCribField {
        bed_id: String,
        update: FieldUpdate,
    },
    UpdateCribFields {
        bed_id: String,
        updates: Vec<FieldUpdate>,
    },
    ClearPatient {
        bed_id: String,
    },
    ClearAllBeds,
    MoveOrCopyPatient {
        mode: MoveMode,
        source_bed_id: String,
        target_bed_id: String,
    },
    ToggleBlockBed {
        bed_id: String,
        #[serde(default)]
        reason: Option<String>,
    },
    ToggleExtraBed {
        bed_id: String,
    },
    AddDischarge {
        bed_id: String,
        status: DischargeStatus,
        #[serde(default)]
        crib_status: Option<DischargeStatus>,
    },
    UndoDischarge {
        id: String,
    },
    UpdateDischarge {
        id: String,
        status: DischargeStatus,
    },
    DeleteDischarge {
        id: String,
    },
    AddTransfer {
        bed_id: String,
        transfer: TransferRequest,
    },
    UndoTransfer {
        id: String,
    },
    UpdateTransfer {
        id: String,
        update: TransferUpdate,
    },
    DeleteTransfer {
        id: String,
    },
    AddCma {
        entry: NewCmaEntry,
    },
    UpdateCma {
        id: String,
        update: CmaUpdate,
    },
    DeleteCma {
        id: String,
    },
    UpdateNurse {
        index: usize,
        name: String,
    },
}

/// Applies mutations against a bed catalog and a clock.
#[derive(Clone)]
pub struct CensusEditor {
    catalog: Arc<BedCatalog>,
    clock: Arc<dyn Clock>,
}

impl CensusEditor {
    pub fn new(catalog: Arc<BedCatalog>, clock: Arc<dyn Clock>) -> Self {
        Self { catalog, clock }
    }

    pub fn with_system_clock(catalog: Arc<BedCatalog>) -> Self {
        Self::new(catalog, Arc::new(SystemClock))
    }

    pub fn catalog(&self) -> &BedCatalog {
        &self.catalog
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Apply one action, logging the reason when it is rejected.
    pub fn apply(&self, record: &DailyRecord, action: &CensusAction) -> Outcome {
        let outcome = self.dispatch(record, action);
        if let Err(rejection) = &outcome {
            tracing::warn!("census action on {} rejected: {}", record.date, rejection);
        }
        outcome
    }

    fn dispatch(&self, record: &DailyRecord, action: &CensusAction) -> Outcome {
        match action {
            CensusAction::UpdateField { bed_id, update } => {
                self.update_field(record, bed_id, update.clone())
            }
            CensusAction::UpdateFields { bed_id, updates } => {
                self.update_fields_atomic(record, bed_id, updates)
            }
            CensusAction::UpdateCudyr {
                bed_id,
                item,
                value,
            } => self.update_cudyr_field(record, bed_id, *item, *value),
            CensusAction::CreateCrib { bed_id } => self.create_crib(record, bed_id),
            CensusAction::RemoveCrib { bed_id } => self.remove_crib(record, bed_id),
            CensusAction::UpdateCribField { bed_id, update } => {
                self.update_crib_field(record, bed_id, update.clone())
            }
            CensusAction::UpdateCribFields { bed_id, updates } => {
                self.update_crib_fields_atomic(record, bed_id, updates)
            }
            CensusAction::ClearPatient { bed_id } => self.clear_patient(record, bed_id),
            CensusAction::ClearAllBeds => Ok(self.clear_all_beds(record)),
            CensusAction::MoveOrCopyPatient {
                mode,
                source_bed_id,
                target_bed_id,
            } => self.move_or_copy_patient(record, *mode, source_bed_id, target_bed_id),
            CensusAction::ToggleBlockBed { bed_id, reason } => {
                self.toggle_block_bed(record, bed_id, reason.as_deref())
            }
            CensusAction::ToggleExtraBed { bed_id } => self.toggle_extra_bed(record, bed_id),
            CensusAction::AddDischarge {
                bed_id,
                status,
                crib_status,
            } => self.add_discharge(record, bed_id, *status, *crib_status),
            CensusAction::UndoDischarge { id } => self.undo_discharge(record, id),
            CensusAction::UpdateDischarge { id, status } => {
                self.update_discharge(record, id, *status)
            }
            CensusAction::DeleteDischarge { id } => self.delete_discharge(record, id),
            CensusAction::AddTransfer { bed_id, transfer } => {
                self.add_transfer(record, bed_id, transfer.clone())
            }
            CensusAction::UndoTransfer { id } => self.undo_transfer(record, id),
            CensusAction::UpdateTransfer { id, update } => {
                self.update_transfer(record, id, update.clone())
            }
            CensusAction::DeleteTransfer { id } => self.delete_transfer(record, id),
            CensusAction::AddCma { entry } => Ok(self.add_cma(record, entry.clone())),
            CensusAction::UpdateCma { id, update } => self.update_cma(record, id, update.clone()),
            CensusAction::DeleteCma { id } => self.delete_cma(record, id),
            CensusAction::UpdateNurse { index, name } => self.update_nurse(record, *index, name),
        }
    }

    /// Current slot for a catalog bed, or a fresh vacant one if the record lacks the entry.
    pub(crate) fn slot(
        &self,
        record: &DailyRecord,
        bed_id: &str,
    ) -> Result<PatientData, Rejection> {
        if !self.catalog.contains(bed_id) {
            return Err(Rejection::UnknownBed(bed_id.to_string()));
        }
        Ok(record
            .beds
            .get(bed_id)
            .cloned()
            .unwrap_or_else(|| PatientData::empty(&self.catalog, bed_id)))
    }

    /// Copy of `record` with `bed_id` replaced and `last_updated` stamped.
    pub(crate) fn with_slot(
        &self,
        record: &DailyRecord,
        bed_id: &str,
        slot: PatientData,
    ) -> DailyRecord {
        let mut next = record.clone();
        next.beds.insert(bed_id.to_string(), slot);
        self.touch(next)
    }

    pub(crate) fn touch(&self, mut record: DailyRecord) -> DailyRecord {
        record.last_updated = self.clock.now();
        record
    }

    /// Admission dates may not be after today. An empty value clears the date.
    pub(crate) fn check_field(&self, update: &FieldUpdate) -> Result<(), Rejection> {
        let FieldUpdate::AdmissionDate(raw) = update else {
            return Ok(());
        };
        if raw.trim().is_empty() {
            return Ok(());
        }
        let date = parse_date_key(raw).ok_or_else(|| Rejection::InvalidDate(raw.clone()))?;
        if date > self.clock.today() {
            return Err(Rejection::FutureAdmissionDate(date));
        }
        Ok(())
    }

    /// Keep the updates that pass [`Self::check_field`], logging the ones dropped.
    pub(crate) fn admissible(
        &self,
        bed_id: &str,
        updates: &[FieldUpdate],
    ) -> Result<Vec<FieldUpdate>, Rejection> {
        let mut kept = Vec::with_capacity(updates.len());
        let mut first_drop = None;
        for update in updates {
            match self.check_field(update) {
                Ok(()) => kept.push(update.clone()),
                Err(rejection) => {
                    tracing::warn!("dropping field update on bed {}: {}", bed_id, rejection);
                    first_drop.get_or_insert(rejection);
                }
            }
        }
        if kept.is_empty() {
            return Err(first_drop.unwrap_or(Rejection::NothingToApply));
        }
        Ok(kept)
    }

    pub(crate) fn new_event_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Restore a discharge/transfer snapshot into its bed.
    ///
    /// A main-patient snapshot needs a vacant main slot; a crib snapshot needs an occupied main
    /// slot and no occupied crib.
    pub(crate) fn restore_snapshot(
        &self,
        record: &DailyRecord,
        bed_id: &str,
        patient_name: &str,
        snapshot: &PatientData,
        is_nested: bool,
    ) -> Result<DailyRecord, Rejection> {
        let current = self.slot(record, bed_id)?;
        let bed_name = self
            .catalog
            .get(bed_id)
            .map(|b| b.name.clone())
            .unwrap_or_else(|| bed_id.to_string());

        let restored = if !is_nested {
            if current.main.is_occupied() {
                return Err(Rejection::BedOccupied {
                    patient: patient_name.to_string(),
                    bed: bed_name,
                });
            }
            let mut restored = snapshot.clone();
            restored.main.bed_id = bed_id.to_string();
            restored.main.location = current.main.location.clone();
            restored
        } else {
            if current.main.is_vacant() {
                return Err(Rejection::MainSlotVacant { bed: bed_name });
            }
            if current.occupied_crib().is_some() {
                return Err(Rejection::CribOccupied {
                    patient: patient_name.to_string(),
                    bed: bed_name,
                });
            }
            let mut restored = current;
            restored.clinical_crib = Some(snapshot.main.clone());
            restored
        };

        Ok(self.with_slot(record, bed_id, restored))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_action_json_shape() {
        let raw = r#"{"action":"updateField","bedId":"R1","update":{"field":"patientName","value":"Juan"}}"#;
        let action: CensusAction = serde_json::from_str(raw).expect("action parses");
        assert_eq!(
            action,
            CensusAction::UpdateField {
                bed_id: "R1".into(),
                update: FieldUpdate::PatientName("Juan".into()),
            }
        );

        let raw = r#"{"action":"toggleBlockBed","bedId":"R2","reason":"Aislamiento"}"#;
        assert!(serde_json::from_str::<CensusAction>(raw).is_ok());

        let raw = r#"{"action":"clearAllBeds"}"#;
        assert_eq!(
            serde_json::from_str::<CensusAction>(raw).expect("unit action"),
            CensusAction::ClearAllBeds
        );

        let raw = r#"{"field":"isUPC","value":true}"#;
        assert_eq!(
            serde_json::from_str::<FieldUpdate>(raw).expect("isUPC update"),
            FieldUpdate::IsUpc(true)
        );
    }

    #[test]
    fn test_apply_dispatches_and_rejects() {
        let editor = editor();
        let record = blank(&editor);

        let next = editor
            .apply(
                &record,
                &CensusAction::UpdateField {
                    bed_id: "R1".into(),
                    update: FieldUpdate::PatientName("Juan".into()),
                },
            )
            .expect("applies");
        assert_eq!(next.beds["R1"].main.patient_name, "Juan");

        let err = editor
            .apply(
                &record,
                &CensusAction::AddDischarge {
                    bed_id: "R1".into(),
                    status: DischargeStatus::Alive,
                    crib_status: None,
                },
            )
            .expect_err("vacant bed");
        assert_eq!(err, Rejection::VacantBed("R1".into()));
    }

    #[test]
    fn test_unknown_bed_is_rejected() {
        let editor = editor();
        let record = blank(&editor);
        let err = editor
            .update_field(&record, "Z9", FieldUpdate::PatientName("X".into()))
            .expect_err("unknown bed");
        assert_eq!(err, Rejection::UnknownBed("Z9".into()));
    }

    #[test]
    fn test_missing_catalog_entry_is_created() {
        let editor = editor();
        let mut record = blank(&editor);
        record.beds.remove("H1C1");
        let next = editor
            .update_field(&record, "H1C1", FieldUpdate::PatientName("Ana".into()))
            .expect("applies");
        assert_eq!(next.beds["H1C1"].main.bed_id, "H1C1");
        assert_eq!(next.beds["H1C1"].main.patient_name, "Ana");
    }
}
