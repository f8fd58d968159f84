//! Patient record model.
//!
//! A bed slot ([`PatientData`]) holds one main occupant and, optionally, one nested
//! "clinical crib" occupant: a sick newborn sharing the mother's slot. Both are represented by
//! the same leaf type, [`Occupant`], which has no crib field of its own, so a crib can never hold
//! a further crib.
//!
//! The JSON shape matches the stored census documents: camelCase keys, Spanish enum values, and
//! the crib serialised as an optional `clinicalCrib` object next to the flattened main fields.

use crate::catalog::BedCatalog;
use crate::cudyr::CudyrScore;
use serde::{Deserialize, Serialize};

/// Whether the physical slot is furnished as an adult bed or an infant crib.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BedMode {
    #[default]
    #[serde(rename = "Cama")]
    Bed,
    #[serde(rename = "Cuna")]
    Crib,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    #[default]
    #[serde(rename = "RUT")]
    Rut,
    #[serde(rename = "Pasaporte")]
    Passport,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BiologicalSex {
    #[serde(rename = "Masculino")]
    Male,
    #[serde(rename = "Femenino")]
    Female,
    #[default]
    #[serde(rename = "Indeterminado")]
    Undetermined,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Insurance {
    Fonasa,
    Isapre,
    Particular,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdmissionOrigin {
    #[serde(rename = "CAE")]
    Cae,
    #[serde(rename = "APS")]
    Aps,
    #[serde(rename = "Urgencias")]
    Emergency,
    #[serde(rename = "Pabellón")]
    OperatingRoom,
    #[serde(rename = "Otro")]
    Other,
}

/// Residency condition of the patient on the island.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResidencyCondition {
    #[serde(rename = "Residente")]
    Resident,
    #[serde(rename = "Turista Nacional")]
    NationalTourist,
    #[serde(rename = "Turista Extranjero")]
    ForeignTourist,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Specialty {
    #[serde(rename = "Medicina Interna")]
    InternalMedicine,
    #[serde(rename = "Cirugía")]
    Surgery,
    #[serde(rename = "Traumatología")]
    Traumatology,
    #[serde(rename = "Ginecología")]
    Gynecology,
    #[serde(rename = "Psiquiatría")]
    Psychiatry,
    #[serde(rename = "Pediatría")]
    Pediatrics,
    #[serde(rename = "Obstetricia")]
    Obstetrics,
    #[serde(rename = "Otro")]
    Other,
    #[default]
    #[serde(rename = "")]
    Unset,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatientStatus {
    #[serde(rename = "Grave")]
    Critical,
    #[serde(rename = "De cuidado")]
    Guarded,
    #[serde(rename = "Estable")]
    Stable,
    #[default]
    #[serde(rename = "")]
    Unset,
}

macro_rules! wire_labels {
    ($ty:ty { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            /// Label as stored in census documents and shown in reports.
            pub fn label(self) -> &'static str {
                match self {
                    $(<$ty>::$variant => $label),+
                }
            }
        }
    };
}

wire_labels!(BedMode { Bed => "Cama", Crib => "Cuna" });
wire_labels!(DocumentType { Rut => "RUT", Passport => "Pasaporte" });
wire_labels!(BiologicalSex {
    Male => "Masculino",
    Female => "Femenino",
    Undetermined => "Indeterminado",
});
wire_labels!(Insurance { Fonasa => "Fonasa", Isapre => "Isapre", Particular => "Particular" });
wire_labels!(AdmissionOrigin {
    Cae => "CAE",
    Aps => "APS",
    Emergency => "Urgencias",
    OperatingRoom => "Pabellón",
    Other => "Otro",
});
wire_labels!(ResidencyCondition {
    Resident => "Residente",
    NationalTourist => "Turista Nacional",
    ForeignTourist => "Turista Extranjero",
});
wire_labels!(Specialty {
    InternalMedicine => "Medicina Interna",
    Surgery => "Cirugía",
    Traumatology => "Traumatología",
    Gynecology => "Ginecología",
    Psychiatry => "Psiquiatría",
    Pediatrics => "Pediatría",
    Obstetrics => "Obstetricia",
    Other => "Otro",
    Unset => "",
});
wire_labels!(PatientStatus {
    Critical => "Grave",
    Guarded => "De cuidado",
    Stable => "Estable",
    Unset => "",
});

/// Installation and removal dates of one invasive device (`YYYY-MM-DD`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removal_date: Option<String>,
}

/// Per-device date tracking for infection surveillance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDetails {
    /// Urinary catheter.
    #[serde(rename = "CUP", default, skip_serializing_if = "Option::is_none")]
    pub cup: Option<DeviceInfo>,
    /// Central venous catheter.
    #[serde(rename = "CVC", default, skip_serializing_if = "Option::is_none")]
    pub cvc: Option<DeviceInfo>,
    /// Invasive mechanical ventilation.
    #[serde(rename = "VMI", default, skip_serializing_if = "Option::is_none")]
    pub vmi: Option<DeviceInfo>,
}

/// One occupant of a bed slot: a main patient or a clinical-crib newborn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Occupant {
    pub bed_id: String,
    pub is_blocked: bool,
    pub blocked_reason: String,
    pub bed_mode: BedMode,
    /// Extra crib resource for a healthy newborn; not a separate patient.
    pub has_companion_crib: bool,

    pub patient_name: String,
    /// Document number (national id or passport, see `document_type`).
    pub rut: String,
    pub document_type: DocumentType,
    /// Display label, e.g. `"45a"` or `"3m"`.
    pub age: String,
    pub birth_date: String,
    pub biological_sex: BiologicalSex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance: Option<Insurance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admission_origin: Option<AdmissionOrigin>,
    pub admission_origin_details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<ResidencyCondition>,
    pub is_rapanui: bool,

    /// Free-text diagnosis.
    pub pathology: String,
    pub diagnosis_comments: String,
    pub specialty: Specialty,
    pub status: PatientStatus,
    /// `YYYY-MM-DD`, never after today.
    pub admission_date: String,
    pub has_wristband: bool,
    pub is_bedridden: bool,
    pub devices: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_details: Option<DeviceDetails>,
    pub surgical_complication: bool,
    #[serde(rename = "isUPC")]
    pub is_upc: bool,
    /// Free-text location override, used for extra beds.
    pub location: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cudyr: Option<CudyrScore>,
    pub handoff_note: String,
}

impl Occupant {
    /// A vacant occupant for `bed_id` with the given furniture mode.
    pub fn vacant(bed_id: &str, bed_mode: BedMode) -> Self {
        Self {
            bed_id: bed_id.to_string(),
            bed_mode,
            ..Self::default()
        }
    }

    /// A slot is vacant when no patient name is recorded.
    pub fn is_vacant(&self) -> bool {
        self.patient_name.trim().is_empty()
    }

    pub fn is_occupied(&self) -> bool {
        !self.is_vacant()
    }
}

/// A bed slot: the main occupant plus an optional clinical crib.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientData {
    #[serde(flatten)]
    pub main: Occupant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_crib: Option<Occupant>,
}

impl PatientData {
    /// Fresh vacant slot for a catalog bed.
    ///
    /// The furniture mode follows the bed's `is_crib_default`; unknown bed ids get an adult bed.
    pub fn empty(catalog: &BedCatalog, bed_id: &str) -> Self {
        let bed_mode = match catalog.get(bed_id) {
            Some(def) if def.is_crib_default => BedMode::Crib,
            _ => BedMode::Bed,
        };
        Self {
            main: Occupant::vacant(bed_id, bed_mode),
            clinical_crib: None,
        }
    }

    /// Vacant slot that keeps only the location override of `self`.
    ///
    /// Any crib and the companion-crib flag are dropped.
    pub fn cleared(&self, catalog: &BedCatalog) -> Self {
        let mut clean = Self::empty(catalog, &self.main.bed_id);
        clean.main.location = self.main.location.clone();
        clean
    }

    /// The named clinical crib occupant, if any.
    pub fn occupied_crib(&self) -> Option<&Occupant> {
        self.clinical_crib.as_ref().filter(|c| c.is_occupied())
    }
}
