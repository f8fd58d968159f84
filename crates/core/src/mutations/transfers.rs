//! Transfer events.
//!
//! Symmetric to discharges, plus evacuation details. A named clinical crib always travels with
//! the mother and gets its own nested event.

use super::discharges::{crib_snapshot, event_labels};
use super::{CensusEditor, Outcome, Rejection};
use crate::constants::COMMERCIAL_FLIGHT;
use crate::record::{DailyRecord, TransferData};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub evacuation_method: String,
    pub receiving_center: String,
    #[serde(default)]
    pub receiving_center_other: String,
    /// Only kept for commercial-flight evacuations.
    #[serde(default)]
    pub transfer_escort: Option<String>,
}

impl TransferRequest {
    fn escort(&self) -> Option<String> {
        if self.evacuation_method == COMMERCIAL_FLIGHT {
            self.transfer_escort
                .clone()
                .filter(|e| !e.trim().is_empty())
        } else {
            None
        }
    }
}

/// Partial edit of a logged transfer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferUpdate {
    pub evacuation_method: Option<String>,
    pub receiving_center: Option<String>,
    pub receiving_center_other: Option<String>,
    pub transfer_escort: Option<String>,
    pub diagnosis: Option<String>,
}

impl CensusEditor {
    /// Transfer the patient in `bed_id` out of the ward and clear the bed.
    pub fn add_transfer(
        &self,
        record: &DailyRecord,
        bed_id: &str,
        request: TransferRequest,
    ) -> Outcome {
        let slot = self.slot(record, bed_id)?;
        if slot.main.is_vacant() {
            return Err(Rejection::VacantBed(bed_id.to_string()));
        }
        let mother = &slot.main;
        let escort = request.escort();

        let (bed_name, bed_type) = event_labels(self, bed_id, false);
        let mut events = vec![TransferData {
            id: Self::new_event_id(),
            bed_name,
            bed_id: bed_id.to_string(),
            bed_type,
            patient_name: mother.patient_name.clone(),
            rut: mother.rut.clone(),
            diagnosis: mother.pathology.clone(),
            evacuation_method: request.evacuation_method.clone(),
            receiving_center: request.receiving_center.clone(),
            receiving_center_other: request.receiving_center_other.clone(),
            transfer_escort: escort.clone(),
            age: mother.age.clone(),
            insurance: mother.insurance,
            origin: mother.origin,
            is_rapanui: mother.is_rapanui,
            original_data: Some(slot.clone()),
            is_nested: false,
        }];

        if let Some(crib) = slot.occupied_crib() {
            let (bed_name, bed_type) = event_labels(self, bed_id, true);
            events.push(TransferData {
                id: Self::new_event_id(),
                bed_name,
                bed_id: bed_id.to_string(),
                bed_type,
                patient_name: crib.patient_name.clone(),
                rut: crib.rut.clone(),
                diagnosis: crib.pathology.clone(),
                evacuation_method: request.evacuation_method.clone(),
                receiving_center: request.receiving_center.clone(),
                receiving_center_other: request.receiving_center_other.clone(),
                transfer_escort: escort,
                age: crib.age.clone(),
                insurance: mother.insurance,
                origin: mother.origin,
                is_rapanui: mother.is_rapanui,
                original_data: Some(crib_snapshot(crib)),
                is_nested: true,
            });
        }

        let mut next = self.with_slot(record, bed_id, slot.cleared(self.catalog()));
        next.transfers.extend(events);
        Ok(next)
    }

    pub fn undo_transfer(&self, record: &DailyRecord, id: &str) -> Outcome {
        let event = record
            .transfers
            .iter()
            .find(|t| t.id == id)
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
        next.transfers.retain(|t| t.id != id);
        Ok(next)
    }

    pub fn update_transfer(
        &self,
        record: &DailyRecord,
        id: &str,
        update: TransferUpdate,
    ) -> Outcome {
        let mut next = record.clone();
        let event = next
            .transfers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Rejection::UnknownEntry(id.to_string()))?;

        if let Some(method) = update.evacuation_method {
            event.evacuation_method = method;
        }
        if let Some(center) = update.receiving_center {
            event.receiving_center = center;
        }
        if let Some(other) = update.receiving_center_other {
            event.receiving_center_other = other;
        }
        if let Some(escort) = update.transfer_escort {
            event.transfer_escort = Some(escort);
        }
        if let Some(diagnosis) = update.diagnosis {
            event.diagnosis = diagnosis;
        }
        if event.evacuation_method != COMMERCIAL_FLIGHT {
            event.transfer_escort = None;
        }
        Ok(self.touch(next))
    }

    pub fn delete_transfer(&self, record: &DailyRecord, id: &str) -> Outcome {
        if !record.transfers.iter().any(|t| t.id == id) {
            return Err(Rejection::UnknownEntry(id.to_string()));
        }
        let mut next = record.clone();
        next.transfers.retain(|t| t.id != id);
        Ok(self.touch(next))
    }
}
