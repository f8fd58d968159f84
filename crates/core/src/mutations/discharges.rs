//! Discharge events.
//!
//! A discharge stores a full snapshot of the patient so it can be undone. When the mother has a
//! named clinical crib and a crib status is given, the newborn gets its own nested event.

use super::{CensusEditor, Outcome, Rejection};
use crate::patient::{Occupant, PatientData};
use crate::record::{DailyRecord, DischargeData, DischargeStatus};

/// Bed name and type labels for an event on `bed_id`.
pub(crate) fn event_labels(editor: &CensusEditor, bed_id: &str, nested: bool) -> (String, String) {
    let def = editor.catalog().get(bed_id);
    let name = def.map(|b| b.name.clone()).unwrap_or_else(|| bed_id.to_string());
    if nested {
        (format!("{name} (Cuna)"), "Cuna".to_string())
    } else {
        let bed_type = def.map(|b| b.bed_type.to_string()).unwrap_or_default();
        (name, bed_type)
    }
}

/// Snapshot of a crib occupant in the shape of a slot.
pub(crate) fn crib_snapshot(crib: &Occupant) -> PatientData {
    PatientData {
        main: crib.clone(),
        clinical_crib: None,
    }
}

impl CensusEditor {
    /// Discharge the patient in `bed_id` and clear the bed.
    ///
    /// # Errors
    /// Rejects unknown beds and vacant beds.
    pub fn add_discharge(
        &self,
        record: &DailyRecord,
        bed_id: &str,
        status: DischargeStatus,
        crib_status: Option<DischargeStatus>,
    ) -> Outcome {
        let slot = self.slot(record, bed_id)?;
        if slot.main.is_vacant() {
            return Err(Rejection::VacantBed(bed_id.to_string()));
        }
        let mother = &slot.main;

        let (bed_name, bed_type) = event_labels(self, bed_id, false);
        let mut events = vec![DischargeData {
            id: Self::new_event_id(),
            bed_name,
            bed_id: bed_id.to_string(),
            bed_type,
            patient_name: mother.patient_name.clone(),
            rut: mother.rut.clone(),
            diagnosis: mother.pathology.clone(),
            status,
            age: mother.age.clone(),
            insurance: mother.insurance,
            origin: mother.origin,
            is_rapanui: mother.is_rapanui,
            original_data: Some(slot.clone()),
            is_nested: false,
        }];

        if let (Some(crib), Some(crib_status)) = (slot.occupied_crib(), crib_status) {
            let (bed_name, bed_type) = event_labels(self, bed_id, true);
            events.push(DischargeData {
                id: Self::new_event_id(),
                bed_name,
                bed_id: bed_id.to_string(),
                bed_type,
                patient_name: crib.patient_name.clone(),
                rut: crib.rut.clone(),
                diagnosis: crib.pathology.clone(),
                status: crib_status,
                age: crib.age.clone(),
                insurance: mother.insurance,
                origin: mother.origin,
                is_rapanui: mother.is_rapanui,
                original_data: Some(crib_snapshot(crib)),
                is_nested: true,
            });
        }

        let mut next = self.with_slot(record, bed_id, slot.cleared(self.catalog()));
        next.discharges.extend(events);
        Ok(next)
    }

    /// Put a discharged patient back into the bed (or crib) and drop the event.
    pub fn undo_discharge(&self, record: &DailyRecord, id: &str) -> Outcome {
        let event = record
            .discharges
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| Rejection::UnknownEntry(id.to_string()))?;
        let snapshot = event
            .original_data
            .as_ref()
            .ok_or_else(|| Rejection::MissingSnapshot(id.to_string()))?;

        let mut next = self.restore_snapshot(
            record,
            &event.bed_id,
            &event.patient_name,
            snapshot,
            event.is_nested,
        )?;
        next.discharges.retain(|d| d.id != id);
        Ok(next)
    }

    pub fn update_discharge(
        &self,
        record: &DailyRecord,
        id: &str,
        status: DischargeStatus,
    ) -> Outcome {
        let mut next = record.clone();
        let event = next
            .discharges
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| Rejection::UnknownEntry(id.to_string()))?;
        event.status = status;
        Ok(self.touch(next))
    }

    /// Remove an event from the log without touching any bed.
    pub fn delete_discharge(&self, record: &DailyRecord, id: &str) -> Outcome {
        if !record.discharges.iter().any(|d| d.id == id) {
            return Err(Rejection::UnknownEntry(id.to_string()));
        }
        let mut next = record.clone();
        next.discharges.retain(|d| d.id != id);
        Ok(self.touch(next))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::FieldUpdate;
    use super::*;
    use crate::patient::Insurance;

    fn mother_with_crib(editor: &CensusEditor) -> DailyRecord {
        let record = admit(editor, &blank(editor), "H3C1", "Maria");
        let record = editor
            .update_field(&record, "H3C1", FieldUpdate::Insurance(Some(Insurance::Fonasa)))
            .expect("insurance");
        let record = editor.create_crib(&record, "H3C1").expect("crib");
        editor
            .update_crib_fields_atomic(
                &record,
                "H3C1",
                &[
                    FieldUpdate::PatientName("RN Maria".into()),
                    FieldUpdate::Pathology("Ictericia".into()),
                ],
            )
            .expect("crib named")
    }

    #[test]
    fn test_discharge_vacant_bed_is_noop() {
        let editor = editor();
        let record = blank(&editor);
        assert_eq!(
            editor.add_discharge(&record, "R1", DischargeStatus::Alive, None),
            Err(Rejection::VacantBed("R1".into()))
        );
    }

    #[test]
    fn test_discharge_clears_bed_and_logs_one_event() {
        let editor = editor();
        let record = admit(&editor, &blank(&editor), "R1", "Juan");
        let next = editor
            .add_discharge(&record, "R1", DischargeStatus::Deceased, None)
            .expect("discharge");

        assert!(next.beds["R1"].main.is_vacant());
        assert_eq!(next.discharges.len(), 1);
        let event = &next.discharges[0];
        assert_eq!(event.patient_name, "Juan");
        assert_eq!(event.bed_name, "R1");
        assert_eq!(event.bed_type, "UTI");
        assert_eq!(event.status, DischargeStatus::Deceased);
        assert!(!event.is_nested);
    }

    #[test]
    fn test_discharge_with_crib_status_logs_nested_event() {
        let editor = editor();
        let record = mother_with_crib(&editor);
        let next = editor
            .add_discharge(
                &record,
                "H3C1",
                DischargeStatus::Alive,
                Some(DischargeStatus::Alive),
            )
            .expect("discharge");

        assert_eq!(next.discharges.len(), 2);
        let crib = &next.discharges[1];
        assert!(crib.is_nested);
        assert_eq!(crib.bed_name, "H3C1 (Cuna)");
        assert_eq!(crib.bed_type, "Cuna");
        assert_eq!(crib.patient_name, "RN Maria");
        assert_eq!(crib.insurance, Some(Insurance::Fonasa));
        assert!(next.beds["H3C1"].clinical_crib.is_none());
    }

    #[test]
    fn test_discharge_without_crib_status_drops_crib() {
        let editor = editor();
        let record = mother_with_crib(&editor);
        let next = editor
            .add_discharge(&record, "H3C1", DischargeStatus::Alive, None)
            .expect("discharge");
        assert_eq!(next.discharges.len(), 1);
        assert!(next.beds["H3C1"].clinical_crib.is_none());
    }

    #[test]
    fn test_undo_then_discharge_reproduces_event() {
        let editor = editor();
        let record = admit(&editor, &blank(&editor), "R2", "Pedro");
        let discharged = editor
            .add_discharge(&record, "R2", DischargeStatus::Alive, None)
            .expect("discharge");
        let original = discharged.discharges[0].clone();

        let restored = editor
            .undo_discharge(&discharged, &original.id)
            .expect("undo");
        assert!(restored.discharges.is_empty());
        assert_eq!(restored.beds["R2"], record.beds["R2"]);

        let again = editor
            .add_discharge(&restored, "R2", DischargeStatus::Alive, None)
            .expect("discharge again");
        let event = &again.discharges[0];
        assert_eq!(event.patient_name, original.patient_name);
        assert_eq!(event.rut, original.rut);
        assert_eq!(event.diagnosis, original.diagnosis);
        assert_eq!(event.age, original.age);
        assert_eq!(event.original_data, original.original_data);
    }

    #[test]
    fn test_undo_onto_occupied_bed_is_rejected() {
        let editor = editor();
        let record = admit(&editor, &blank(&editor), "R2", "Pedro");
        let discharged = editor
            .add_discharge(&record, "R2", DischargeStatus::Alive, None)
            .expect("discharge");
        let id = discharged.discharges[0].id.clone();
        let reoccupied = admit(&editor, &discharged, "R2", "Luis");

        let err = editor.undo_discharge(&reoccupied, &id).expect_err("occupied");
        assert!(matches!(err, Rejection::BedOccupied { .. }));
    }

    #[test]
    fn test_undo_nested_requires_mother_and_free_crib() {
        let editor = editor();
        let record = mother_with_crib(&editor);
        let discharged = editor
            .add_discharge(
                &record,
                "H3C1",
                DischargeStatus::Alive,
                Some(DischargeStatus::Alive),
            )
            .expect("discharge");
        let crib_id = discharged.discharges[1].id.clone();

        let err = editor
            .undo_discharge(&discharged, &crib_id)
            .expect_err("mother slot vacant");
        assert!(matches!(err, Rejection::MainSlotVacant { .. }));

        let readmitted = admit(&editor, &discharged, "H3C1", "Maria");
        let restored = editor
            .undo_discharge(&readmitted, &crib_id)
            .expect("crib restored");
        let crib = restored.beds["H3C1"].clinical_crib.as_ref().expect("crib");
        assert_eq!(crib.patient_name, "RN Maria");
        assert_eq!(restored.discharges.len(), 1);

        let err = editor
            .undo_discharge(&readmitted, "missing")
            .expect_err("unknown id");
        assert_eq!(err, Rejection::UnknownEntry("missing".into()));
    }

    #[test]
    fn test_update_and_delete_discharge() {
        let editor = editor();
        let record = admit(&editor, &blank(&editor), "R1", "Juan");
        let record = editor
            .add_discharge(&record, "R1", DischargeStatus::Alive, None)
            .expect("discharge");
        let id = record.discharges[0].id.clone();

        let updated = editor
            .update_discharge(&record, &id, DischargeStatus::Deceased)
            .expect("update");
        assert_eq!(updated.discharges[0].status, DischargeStatus::Deceased);

        let deleted = editor.delete_discharge(&updated, &id).expect("delete");
        assert!(deleted.discharges.is_empty());
        assert!(deleted.beds["R1"].main.is_vacant());
    }
}
