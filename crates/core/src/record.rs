//! Per-day census record and its event logs.

use crate::catalog::BedCatalog;
use crate::constants::NURSE_SLOTS;
use crate::patient::{Insurance, PatientData, ResidencyCondition};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Date format used for record keys and document dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Stored date → record map, keyed by `YYYY-MM-DD`.
pub type RecordMap = BTreeMap<String, DailyRecord>;

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date_key(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// Condition of a patient at discharge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DischargeStatus {
    #[serde(rename = "Vivo")]
    Alive,
    #[serde(rename = "Fallecido")]
    Deceased,
}

impl DischargeStatus {
    pub fn label(self) -> &'static str {
        match self {
            DischargeStatus::Alive => "Vivo",
            DischargeStatus::Deceased => "Fallecido",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DischargeData {
    pub id: String,
    pub bed_name: String,
    pub bed_id: String,
    /// Bed type label, or `"Cuna"` for a clinical crib event.
    pub bed_type: String,
    pub patient_name: String,
    pub rut: String,
    pub diagnosis: String,
    pub status: DischargeStatus,
    #[serde(default)]
    pub age: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance: Option<Insurance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<ResidencyCondition>,
    #[serde(default)]
    pub is_rapanui: bool,
    /// Snapshot restored on undo. For a crib event the crib occupant is the main slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_data: Option<PatientData>,
    #[serde(default)]
    pub is_nested: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferData {
    pub id: String,
    pub bed_name: String,
    pub bed_id: String,
    pub bed_type: String,
    pub patient_name: String,
    pub rut: String,
    pub diagnosis: String,
    pub evacuation_method: String,
    pub receiving_center: String,
    /// Free text used when `receiving_center` is "Otro".
    #[serde(default)]
    pub receiving_center_other: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_escort: Option<String>,
    #[serde(default)]
    pub age: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance: Option<Insurance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<ResidencyCondition>,
    #[serde(default)]
    pub is_rapanui: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_data: Option<PatientData>,
    #[serde(default)]
    pub is_nested: bool,
}

impl TransferData {
    /// Receiving center as shown in reports, resolving "Otro" to the free text.
    pub fn center_label(&self) -> &str {
        if self.receiving_center == crate::constants::OTHER_CENTER
            && !self.receiving_center_other.trim().is_empty()
        {
            &self.receiving_center_other
        } else {
            &self.receiving_center
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterventionType {
    #[default]
    #[serde(rename = "Cirugía Mayor Ambulatoria")]
    MajorAmbulatorySurgery,
    #[serde(rename = "Procedimiento Médico Ambulatorio")]
    AmbulatoryMedicalProcedure,
}

/// Ambulatory procedure log entry; not part of bed occupancy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmaEntry {
    pub id: String,
    /// Generic location label.
    pub bed_name: String,
    pub patient_name: String,
    pub rut: String,
    pub age: String,
    pub diagnosis: String,
    pub specialty: String,
    #[serde(default)]
    pub intervention_type: InterventionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entered_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Aggregate root for one calendar day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub beds: BTreeMap<String, PatientData>,
    #[serde(default)]
    pub discharges: Vec<DischargeData>,
    #[serde(default)]
    pub transfers: Vec<TransferData>,
    #[serde(default)]
    pub cma: Vec<CmaEntry>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub nurses: Vec<String>,
    /// Single-nurse field of older documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nurse_name: Option<String>,
    #[serde(default)]
    pub active_extra_beds: Vec<String>,
}

impl DailyRecord {
    /// A record with one vacant entry per catalog bed and empty logs.
    pub fn blank(catalog: &BedCatalog, date: NaiveDate, now: DateTime<Utc>) -> Self {
        let beds = catalog
            .all()
            .iter()
            .map(|b| (b.id.clone(), PatientData::empty(catalog, &b.id)))
            .collect();
        Self {
            date,
            beds,
            discharges: Vec::new(),
            transfers: Vec::new(),
            cma: Vec::new(),
            last_updated: now,
            nurses: vec![String::new(); NURSE_SLOTS],
            nurse_name: None,
            active_extra_beds: Vec::new(),
        }
    }

    pub fn key(&self) -> String {
        date_key(self.date)
    }

    /// Whether any main slot or clinical crib holds a patient.
    pub fn has_patients(&self) -> bool {
        self.beds
            .values()
            .any(|b| b.main.is_occupied() || b.occupied_crib().is_some())
    }

    pub fn is_extra_active(&self, bed_id: &str) -> bool {
        self.active_extra_beds.iter().any(|id| id == bed_id)
    }
}
