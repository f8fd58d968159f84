//! Clinical crib lifecycle.

use super::{CensusEditor, FieldUpdate, Outcome, Rejection};
use crate::patient::{BedMode, Occupant};
use crate::record::DailyRecord;

impl CensusEditor {
    /// Attach a fresh, empty clinical crib to an occupied bed.
    ///
    /// An existing crib is replaced. The companion-crib flag is cleared.
    pub fn create_crib(&self, record: &DailyRecord, bed_id: &str) -> Outcome {
        let mut slot = self.slot(record, bed_id)?;
        if slot.main.is_vacant() {
            return Err(Rejection::VacantBed(bed_id.to_string()));
        }
        slot.clinical_crib = Some(Occupant::vacant(bed_id, BedMode::Crib));
        slot.main.has_companion_crib = false;
        Ok(self.with_slot(record, bed_id, slot))
    }

    pub fn remove_crib(&self, record: &DailyRecord, bed_id: &str) -> Outcome {
        let mut slot = self.slot(record, bed_id)?;
        slot.clinical_crib = None;
        Ok(self.with_slot(record, bed_id, slot))
    }

    pub fn update_crib_field(
        &self,
        record: &DailyRecord,
        bed_id: &str,
        update: FieldUpdate,
    ) -> Outcome {
        self.check_field(&update)?;
        let mut slot = self.slot(record, bed_id)?;
        let crib = slot
            .clinical_crib
            .as_mut()
            .ok_or_else(|| Rejection::NoClinicalCrib(bed_id.to_string()))?;
        update.apply_to(crib);
        Ok(self.with_slot(record, bed_id, slot))
    }

    /// Crib counterpart of [`CensusEditor::update_fields_atomic`].
    pub fn update_crib_fields_atomic(
        &self,
        record: &DailyRecord,
        bed_id: &str,
        updates: &[FieldUpdate],
    ) -> Outcome {
        let mut slot = self.slot(record, bed_id)?;
        let Some(crib) = slot.clinical_crib.as_mut() else {
            return Err(Rejection::NoClinicalCrib(bed_id.to_string()));
        };
        for update in self.admissible(bed_id, updates)? {
            update.apply_to(crib);
        }
        Ok(self.with_slot(record, bed_id, slot))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::patient::Specialty;

    #[test]
    fn test_create_crib_requires_occupied_bed() {
        let editor = editor();
        let record = blank(&editor);
        assert_eq!(
            editor.create_crib(&record, "H1C1"),
            Err(Rejection::VacantBed("H1C1".into()))
        );
    }

    #[test]
    fn test_create_crib_overwrites_existing() {
        let editor = editor();
        let record = admit(&editor, &blank(&editor), "H1C1", "Maria");
        let record = editor.create_crib(&record, "H1C1").expect("crib");
        let record = editor
            .update_crib_field(&record, "H1C1", FieldUpdate::PatientName("RN Maria".into()))
            .expect("name crib");

        let next = editor.create_crib(&record, "H1C1").expect("recreate");
        let crib = next.beds["H1C1"].clinical_crib.as_ref().expect("crib");
        assert!(crib.is_vacant());
        assert_eq!(crib.bed_mode, BedMode::Crib);
        assert_eq!(crib.bed_id, "H1C1");
    }

    #[test]
    fn test_create_crib_clears_companion_flag() {
        let editor = editor();
        let record = admit(&editor, &blank(&editor), "H1C1", "Maria");
        let record = editor
            .update_field(&record, "H1C1", FieldUpdate::HasCompanionCrib(true))
            .expect("companion");
        let next = editor.create_crib(&record, "H1C1").expect("crib");
        assert!(!next.beds["H1C1"].main.has_companion_crib);
        assert!(next.beds["H1C1"].clinical_crib.is_some());
    }

    #[test]
    fn test_remove_crib() {
        let editor = editor();
        let record = admit(&editor, &blank(&editor), "H1C1", "Maria");
        let record = editor.create_crib(&record, "H1C1").expect("crib");
        let next = editor.remove_crib(&record, "H1C1").expect("remove");
        assert!(next.beds["H1C1"].clinical_crib.is_none());
    }

    #[test]
    fn test_crib_updates_require_crib() {
        let editor = editor();
        let record = admit(&editor, &blank(&editor), "H1C1", "Maria");
        assert_eq!(
            editor.update_crib_field(&record, "H1C1", FieldUpdate::PatientName("RN".into())),
            Err(Rejection::NoClinicalCrib("H1C1".into()))
        );
        assert_eq!(
            editor.update_crib_fields_atomic(
                &record,
                "H1C1",
                &[FieldUpdate::PatientName("RN".into())]
            ),
            Err(Rejection::NoClinicalCrib("H1C1".into()))
        );
    }

    #[test]
    fn test_crib_future_date_rules() {
        let editor = editor();
        let record = admit(&editor, &blank(&editor), "H1C1", "Maria");
        let record = editor.create_crib(&record, "H1C1").expect("crib");

        assert!(matches!(
            editor.update_crib_field(&record, "H1C1", FieldUpdate::AdmissionDate("2025-07-01".into())),
            Err(Rejection::FutureAdmissionDate(_))
        ));

        let next = editor
            .update_crib_fields_atomic(
                &record,
                "H1C1",
                &[
                    FieldUpdate::PatientName("RN Maria".into()),
                    FieldUpdate::Specialty(Specialty::Pediatrics),
                    FieldUpdate::AdmissionDate("2025-07-01".into()),
                ],
            )
            .expect("atomic crib update");
        let crib = next.beds["H1C1"].clinical_crib.as_ref().expect("crib");
        assert_eq!(crib.patient_name, "RN Maria");
        assert_eq!(crib.specialty, Specialty::Pediatrics);
        assert_eq!(crib.admission_date, "");
        assert_eq!(next.beds["H1C1"].main.patient_name, "Maria");
    }
}
