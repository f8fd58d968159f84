//! Ambulatory procedure (CMA) log.

use super::{CensusEditor, Outcome, Rejection};
use crate::record::{CmaEntry, DailyRecord, InterventionType};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewCmaEntry {
    pub bed_name: String,
    pub patient_name: String,
    pub rut: String,
    pub age: String,
    pub diagnosis: String,
    pub specialty: String,
    pub intervention_type: InterventionType,
    pub entered_by: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CmaUpdate {
    pub bed_name: Option<String>,
    pub patient_name: Option<String>,
    pub rut: Option<String>,
    pub age: Option<String>,
    pub diagnosis: Option<String>,
    pub specialty: Option<String>,
    pub intervention_type: Option<InterventionType>,
}

impl CensusEditor {
    /// Append an entry with a fresh id and the current timestamp.
    pub fn add_cma(&self, record: &DailyRecord, entry: NewCmaEntry) -> DailyRecord {
        let mut next = record.clone();
        next.cma.push(CmaEntry {
            id: Self::new_event_id(),
            bed_name: entry.bed_name,
            patient_name: entry.patient_name,
            rut: entry.rut,
            age: entry.age,
            diagnosis: entry.diagnosis,
            specialty: entry.specialty,
            intervention_type: entry.intervention_type,
            entered_by: entry.entered_by,
            timestamp: Some(self.clock().now()),
        });
        self.touch(next)
    }

    pub fn update_cma(&self, record: &DailyRecord, id: &str, update: CmaUpdate) -> Outcome {
        let mut next = record.clone();
        let entry = next
            .cma
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Rejection::UnknownEntry(id.to_string()))?;

        if let Some(v) = update.bed_name {
            entry.bed_name = v;
        }
        if let Some(v) = update.patient_name {
            entry.patient_name = v;
        }
        if let Some(v) = update.rut {
            entry.rut = v;
        }
        if let Some(v) = update.age {
            entry.age = v;
        }
        if let Some(v) = update.diagnosis {
            entry.diagnosis = v;
        }
        if let Some(v) = update.specialty {
            entry.specialty = v;
        }
        if let Some(v) = update.intervention_type {
            entry.intervention_type = v;
        }
        Ok(self.touch(next))
    }

    pub fn delete_cma(&self, record: &DailyRecord, id: &str) -> Outcome {
        if !record.cma.iter().any(|e| e.id == id) {
            return Err(Rejection::UnknownEntry(id.to_string()));
        }
        let mut next = record.clone();
        next.cma.retain(|e| e.id != id);
        Ok(self.touch(next))
    }
}
