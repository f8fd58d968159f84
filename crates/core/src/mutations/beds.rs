//! Main-slot edits and bed management.

use super::{CensusEditor, FieldUpdate, Outcome, Rejection};
use crate::constants::DEFAULT_BLOCKED_REASON;
use crate::cudyr::{CudyrItem, MAX_ITEM_SCORE};
use crate::patient::PatientData;
use crate::record::DailyRecord;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveMode {
    /// Target receives the patient and the source is cleared.
    Move,
    /// Target receives a copy and the source is untouched.
    Copy,
}

impl CensusEditor {
    /// Set one field on the main occupant of `bed_id`.
    ///
    /// # Errors
    /// Rejects unknown beds, malformed admission dates and admission dates after today.
    pub fn update_field(&self, record: &DailyRecord, bed_id: &str, update: FieldUpdate) -> Outcome {
        self.check_field(&update)?;
        let mut slot = self.slot(record, bed_id)?;
        apply_main(&mut slot, &update, bed_id)?;
        Ok(self.with_slot(record, bed_id, slot))
    }

    /// Apply several field updates in a single commit.
    ///
    /// An inadmissible admission date is dropped on its own; the remaining updates still apply.
    /// The action is rejected only if nothing is left to apply.
    pub fn update_fields_atomic(
        &self,
        record: &DailyRecord,
        bed_id: &str,
        updates: &[FieldUpdate],
    ) -> Outcome {
        let mut slot = self.slot(record, bed_id)?;
        let updates = self.admissible(bed_id, updates)?;
        for update in &updates {
            apply_main(&mut slot, update, bed_id)?;
        }
        Ok(self.with_slot(record, bed_id, slot))
    }

    /// Set one CUDYR item on the main occupant, starting from a zeroed score if none exists.
    pub fn update_cudyr_field(
        &self,
        record: &DailyRecord,
        bed_id: &str,
        item: CudyrItem,
        value: u8,
    ) -> Outcome {
        if value > MAX_ITEM_SCORE {
            return Err(Rejection::CudyrOutOfRange(value));
        }
        let mut slot = self.slot(record, bed_id)?;
        slot.main.cudyr.get_or_insert_with(Default::default).set(item, value);
        Ok(self.with_slot(record, bed_id, slot))
    }

    /// Reset the bed to vacant, keeping only its location override.
    pub fn clear_patient(&self, record: &DailyRecord, bed_id: &str) -> Outcome {
        let slot = self.slot(record, bed_id)?;
        Ok(self.with_slot(record, bed_id, slot.cleared(self.catalog())))
    }

    /// Clear every catalog bed and wipe the discharge and transfer logs.
    pub fn clear_all_beds(&self, record: &DailyRecord) -> DailyRecord {
        let mut next = record.clone();
        for bed in self.catalog().all() {
            let cleared = match record.beds.get(&bed.id) {
                Some(slot) => slot.cleared(self.catalog()),
                None => PatientData::empty(self.catalog(), &bed.id),
            };
            next.beds.insert(bed.id.clone(), cleared);
        }
        next.discharges.clear();
        next.transfers.clear();
        self.touch(next)
    }

    /// Move or copy the patient in `source_bed_id` onto `target_bed_id`.
    ///
    /// The target keeps its own bed id and location. Any clinical crib travels with the patient.
    /// An occupied target is overwritten.
    pub fn move_or_copy_patient(
        &self,
        record: &DailyRecord,
        mode: MoveMode,
        source_bed_id: &str,
        target_bed_id: &str,
    ) -> Outcome {
        if source_bed_id == target_bed_id {
            return Err(Rejection::SameBed(source_bed_id.to_string()));
        }
        let source = self.slot(record, source_bed_id)?;
        let target = self.slot(record, target_bed_id)?;
        if source.main.is_vacant() {
            return Err(Rejection::VacantBed(source_bed_id.to_string()));
        }

        let mut moved = source.clone();
        moved.main.bed_id = target_bed_id.to_string();
        moved.main.location = target.main.location;
        if let Some(crib) = moved.clinical_crib.as_mut() {
            crib.bed_id = target_bed_id.to_string();
        }

        let mut next = record.clone();
        next.beds.insert(target_bed_id.to_string(), moved);
        if mode == MoveMode::Move {
            next.beds
                .insert(source_bed_id.to_string(), source.cleared(self.catalog()));
        }
        Ok(self.touch(next))
    }

    /// Flip the blocked flag. Blocking records `reason` (or a default); unblocking clears it.
    pub fn toggle_block_bed(
        &self,
        record: &DailyRecord,
        bed_id: &str,
        reason: Option<&str>,
    ) -> Outcome {
        let mut slot = self.slot(record, bed_id)?;
        slot.main.is_blocked = !slot.main.is_blocked;
        slot.main.blocked_reason = if slot.main.is_blocked {
            reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_BLOCKED_REASON)
                .to_string()
        } else {
            String::new()
        };
        Ok(self.with_slot(record, bed_id, slot))
    }

    /// Add or remove an extra bed from the day's active set.
    pub fn toggle_extra_bed(&self, record: &DailyRecord, bed_id: &str) -> Outcome {
        let def = self
            .catalog()
            .get(bed_id)
            .ok_or_else(|| Rejection::UnknownBed(bed_id.to_string()))?;
        if !def.is_extra {
            return Err(Rejection::NotExtraBed(bed_id.to_string()));
        }

        let mut next = record.clone();
        if next.is_extra_active(bed_id) {
            next.active_extra_beds.retain(|id| id != bed_id);
        } else {
            next.active_extra_beds.push(bed_id.to_string());
        }
        Ok(self.touch(next))
    }
}

/// Companion and clinical cribs are exclusive: enabling the companion crib drops an unnamed
/// clinical crib, and is refused while the crib holds a patient.
fn apply_main(slot: &mut PatientData, update: &FieldUpdate, bed_id: &str) -> Result<(), Rejection> {
    if let FieldUpdate::HasCompanionCrib(true) = update {
        if slot.occupied_crib().is_some() {
            return Err(Rejection::CribPatientPresent(bed_id.to_string()));
        }
        slot.clinical_crib = None;
    }
    update.apply_to(&mut slot.main);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::cudyr::CudyrItem;
    use crate::patient::{BedMode, Occupant, PatientStatus};
    use crate::statistics::compute_statistics;

    #[test]
    fn test_future_admission_date_leaves_record_unchanged() {
        let editor = editor();
        let record = admit(&editor, &blank(&editor), "R1", "Juan");

        let err = editor
            .update_field(&record, "R1", FieldUpdate::AdmissionDate("2025-06-16".into()))
            .expect_err("tomorrow is rejected");
        assert!(matches!(err, Rejection::FutureAdmissionDate(_)));
        assert_eq!(record.beds["R1"].main.admission_date, "2025-06-10");
    }

    #[test]
    fn test_today_admission_date_is_accepted() {
        let editor = editor();
        let record = blank(&editor);
        let next = editor
            .update_field(&record, "R1", FieldUpdate::AdmissionDate("2025-06-15".into()))
            .expect("today is allowed");
        assert_eq!(next.beds["R1"].main.admission_date, "2025-06-15");
        assert_eq!(next.last_updated, editor.clock().now());
        assert_ne!(next.last_updated, record.last_updated);
    }

    #[test]
    fn test_malformed_admission_date_is_rejected() {
        let editor = editor();
        let record = blank(&editor);
        let err = editor
            .update_field(&record, "R1", FieldUpdate::AdmissionDate("15/06/2025".into()))
            .expect_err("malformed");
        assert!(matches!(err, Rejection::InvalidDate(_)));
    }

    #[test]
    fn test_atomic_update_drops_only_future_date() {
        let editor = editor();
        let record = blank(&editor);
        let next = editor
            .update_fields_atomic(
                &record,
                "H1C2",
                &[
                    FieldUpdate::PatientName("Rosa".into()),
                    FieldUpdate::AdmissionDate("2030-01-01".into()),
                    FieldUpdate::Status(PatientStatus::Critical),
                ],
            )
            .expect("remaining fields apply");
        let bed = &next.beds["H1C2"].main;
        assert_eq!(bed.patient_name, "Rosa");
        assert_eq!(bed.status, PatientStatus::Critical);
        assert_eq!(bed.admission_date, "");
    }

    #[test]
    fn test_atomic_update_with_only_future_date_is_rejected() {
        let editor = editor();
        let record = blank(&editor);
        let err = editor
            .update_fields_atomic(
                &record,
                "H1C2",
                &[FieldUpdate::AdmissionDate("2030-01-01".into())],
            )
            .expect_err("nothing left");
        assert!(matches!(err, Rejection::FutureAdmissionDate(_)));
    }

    #[test]
    fn test_update_cudyr_creates_zeroed_score() {
        let editor = editor();
        let record = blank(&editor);
        let next = editor
            .update_cudyr_field(&record, "R3", CudyrItem::Feeding, 2)
            .expect("applies");
        let score = next.beds["R3"].main.cudyr.expect("score created");
        assert_eq!(score.feeding, 2);
        assert_eq!(score.dependency_score(), 2);
        assert_eq!(score.risk_score(), 0);

        let err = editor
            .update_cudyr_field(&record, "R3", CudyrItem::Feeding, 4)
            .expect_err("out of range");
        assert_eq!(err, Rejection::CudyrOutOfRange(4));
    }

    #[test]
    fn test_clear_patient_keeps_location_and_drops_cribs() {
        let editor = editor();
        let mut record = admit(&editor, &blank(&editor), "E1", "Ana");
        if let Some(bed) = record.beds.get_mut("E1") {
            bed.main.location = "Box 3".into();
            bed.clinical_crib = Some(Occupant::vacant("E1", BedMode::Crib));
        }

        let next = editor.clear_patient(&record, "E1").expect("applies");
        let bed = &next.beds["E1"];
        assert!(bed.main.is_vacant());
        assert_eq!(bed.main.location, "Box 3");
        assert!(bed.clinical_crib.is_none());
    }

    #[test]
    fn test_clear_all_beds_wipes_logs() {
        let editor = editor();
        let record = admit(&editor, &blank(&editor), "R1", "Juan");
        let record = admit(&editor, &record, "R2", "Pedro");
        let record = editor
            .add_discharge(&record, "R2", crate::record::DischargeStatus::Alive, None)
            .expect("discharge");
        assert_eq!(record.discharges.len(), 1);

        let next = editor.clear_all_beds(&record);
        assert!(!next.has_patients());
        assert!(next.discharges.is_empty());
        assert!(next.transfers.is_empty());
        assert_eq!(next.beds.len(), editor.catalog().all().len());
    }

    #[test]
    fn test_move_patient() {
        let editor = editor();
        let mut record = admit(&editor, &blank(&editor), "E1", "Juan");
        if let Some(bed) = record.beds.get_mut("E1") {
            bed.main.location = "Pasillo".into();
        }
        if let Some(bed) = record.beds.get_mut("E2") {
            bed.main.location = "Box 2".into();
        }
        let before = record.beds["E1"].clone();

        let next = editor
            .move_or_copy_patient(&record, MoveMode::Move, "E1", "E2")
            .expect("move applies");

        let source = &next.beds["E1"];
        assert!(source.main.is_vacant());
        assert_eq!(source.main.location, "Pasillo");

        let target = &next.beds["E2"];
        assert_eq!(target.main.bed_id, "E2");
        assert_eq!(target.main.location, "Box 2");
        assert_eq!(target.main.patient_name, before.main.patient_name);
        assert_eq!(target.main.pathology, before.main.pathology);
        assert_eq!(target.main.admission_date, before.main.admission_date);
    }

    #[test]
    fn test_copy_patient_leaves_source() {
        let editor = editor();
        let record = admit(&editor, &blank(&editor), "R1", "Juan");
        let next = editor
            .move_or_copy_patient(&record, MoveMode::Copy, "R1", "R4")
            .expect("copy applies");
        assert_eq!(next.beds["R1"], record.beds["R1"]);
        assert_eq!(next.beds["R4"].main.patient_name, "Juan");
        assert_eq!(next.beds["R4"].main.bed_id, "R4");
    }

    #[test]
    fn test_move_rejections() {
        let editor = editor();
        let record = admit(&editor, &blank(&editor), "R1", "Juan");
        assert_eq!(
            editor.move_or_copy_patient(&record, MoveMode::Move, "R2", "R3"),
            Err(Rejection::VacantBed("R2".into()))
        );
        assert_eq!(
            editor.move_or_copy_patient(&record, MoveMode::Move, "R1", "R1"),
            Err(Rejection::SameBed("R1".into()))
        );
    }

    #[test]
    fn test_block_scenario() {
        let editor = editor();
        let record = admit(&editor, &blank(&editor), "R1", "Juan");
        let next = editor
            .toggle_block_bed(&record, "R2", Some("Aislamiento"))
            .expect("block applies");

        assert!(next.beds["R2"].main.is_blocked);
        assert_eq!(next.beds["R2"].main.blocked_reason, "Aislamiento");
        let stats = compute_statistics(editor.catalog(), &next.beds);
        assert_eq!(stats.blocked_beds, 1);
        assert_eq!(stats.occupied_beds, 1);

        let unblocked = editor
            .toggle_block_bed(&next, "R2", None)
            .expect("unblock applies");
        assert!(!unblocked.beds["R2"].main.is_blocked);
        assert_eq!(unblocked.beds["R2"].main.blocked_reason, "");
    }

    #[test]
    fn test_block_without_reason_uses_default() {
        let editor = editor();
        let next = editor
            .toggle_block_bed(&blank(&editor), "H5C1", Some("  "))
            .expect("applies");
        assert_eq!(next.beds["H5C1"].main.blocked_reason, DEFAULT_BLOCKED_REASON);
    }

    #[test]
    fn test_toggle_extra_bed() {
        let editor = editor();
        let record = blank(&editor);
        let on = editor.toggle_extra_bed(&record, "E3").expect("enable");
        assert_eq!(on.active_extra_beds, vec!["E3".to_string()]);
        let off = editor.toggle_extra_bed(&on, "E3").expect("disable");
        assert!(off.active_extra_beds.is_empty());

        assert_eq!(
            editor.toggle_extra_bed(&record, "R1"),
            Err(Rejection::NotExtraBed("R1".into()))
        );
    }

    #[test]
    fn test_companion_crib_replaces_unnamed_clinical_crib() {
        let editor = editor();
        let record = admit(&editor, &blank(&editor), "H2C1", "Maria");
        let record = editor.create_crib(&record, "H2C1").expect("crib");

        let next = editor
            .update_field(&record, "H2C1", FieldUpdate::HasCompanionCrib(true))
            .expect("applies");
        assert!(next.beds["H2C1"].main.has_companion_crib);
        assert!(next.beds["H2C1"].clinical_crib.is_none());

        let named = editor
            .update_crib_field(&record, "H2C1", FieldUpdate::PatientName("RN".into()))
            .expect("crib named");
        assert_eq!(
            editor.update_field(&named, "H2C1", FieldUpdate::HasCompanionCrib(true)),
            Err(Rejection::CribPatientPresent("H2C1".into()))
        );
    }

    #[test]
    fn test_input_record_is_not_mutated() {
        let editor = editor();
        let record = admit(&editor, &blank(&editor), "R1", "Juan");
        let snapshot = record.clone();
        let _ = editor.move_or_copy_patient(&record, MoveMode::Move, "R1", "R2");
        let _ = editor.clear_all_beds(&record);
        assert_eq!(record, snapshot);
    }
}
