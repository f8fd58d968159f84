//! Static bed catalog.
//!
//! The catalog is the fixed, ordered list of physical bed slots of the ward. It is built once at
//! startup and only read afterwards; the one "management" action on beds (activating an overflow
//! bed for a day) lives on the daily record, not here.

use crate::record::DailyRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("bed catalog must define at least one bed")]
    Empty,
    #[error("duplicate bed id in catalog: {0}")]
    DuplicateBedId(String),
    #[error("bed id cannot be empty")]
    EmptyBedId,
    #[error("failed to parse bed catalog YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Care level of a bed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BedType {
    /// Intensive/intermediate care unit.
    #[serde(rename = "UTI")]
    Uti,
    /// General ward bed.
    #[serde(rename = "MEDIA")]
    Media,
}

impl BedType {
    pub fn as_str(self) -> &'static str {
        match self {
            BedType::Uti => "UTI",
            BedType::Media => "MEDIA",
        }
    }
}

impl std::fmt::Display for BedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical bed slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedDefinition {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub bed_type: BedType,
    /// Whether the slot is furnished as a crib by default.
    #[serde(default)]
    pub is_crib_default: bool,
    /// Overflow bed, only in service when activated on the day's record.
    #[serde(default)]
    pub is_extra: bool,
}

impl BedDefinition {
    fn new(id: &str, name: &str, bed_type: BedType, is_extra: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            bed_type,
            is_crib_default: false,
            is_extra,
        }
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    beds: Vec<BedDefinition>,
}

/// Ordered, immutable list of beds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BedCatalog {
    beds: Vec<BedDefinition>,
}

impl BedCatalog {
    /// Build a catalog, rejecting empty lists and duplicate ids.
    pub fn new(beds: Vec<BedDefinition>) -> Result<Self, CatalogError> {
        if beds.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for bed in &beds {
            if bed.id.trim().is_empty() {
                return Err(CatalogError::EmptyBedId);
            }
            if !seen.insert(bed.id.as_str()) {
                return Err(CatalogError::DuplicateBedId(bed.id.clone()));
            }
        }
        Ok(Self { beds })
    }

    /// The ward's standard layout: 4 UTI beds, 2 neonatology beds, 12 general beds and 5
    /// overflow beds.
    pub fn standard() -> Self {
        let mut beds = Vec::with_capacity(23);
        for id in ["R1", "R2", "R3", "R4"] {
            beds.push(BedDefinition::new(id, id, BedType::Uti, false));
        }
        beds.push(BedDefinition::new("NEO1", "NEO 1", BedType::Media, false));
        beds.push(BedDefinition::new("NEO2", "NEO 2", BedType::Media, false));
        for room in 1..=6 {
            for slot in 1..=2 {
                let id = format!("H{room}C{slot}");
                beds.push(BedDefinition::new(&id, &id, BedType::Media, false));
            }
        }
        for n in 1..=5 {
            let id = format!("E{n}");
            beds.push(BedDefinition::new(&id, &id, BedType::Media, true));
        }
        Self { beds }
    }

    /// Parse a catalog from YAML (`beds:` list of bed definitions).
    pub fn from_yaml_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(raw)?;
        Self::new(file.beds)
    }

    pub fn all(&self) -> &[BedDefinition] {
        &self.beds
    }

    pub fn get(&self, bed_id: &str) -> Option<&BedDefinition> {
        self.beds.iter().find(|b| b.id == bed_id)
    }

    pub fn contains(&self, bed_id: &str) -> bool {
        self.get(bed_id).is_some()
    }

    /// Beds that are always in service.
    pub fn regular(&self) -> impl Iterator<Item = &BedDefinition> {
        self.beds.iter().filter(|b| !b.is_extra)
    }

    pub fn extras(&self) -> impl Iterator<Item = &BedDefinition> {
        self.beds.iter().filter(|b| b.is_extra)
    }

    pub fn of_type(&self, bed_type: BedType) -> impl Iterator<Item = &BedDefinition> {
        self.beds.iter().filter(move |b| b.bed_type == bed_type)
    }

    /// Beds in service on the given day: every regular bed plus the activated extras.
    pub fn active<'a>(
        &'a self,
        record: &'a DailyRecord,
    ) -> impl Iterator<Item = &'a BedDefinition> + 'a {
        self.beds
            .iter()
            .filter(move |b| !b.is_extra || record.active_extra_beds.contains(&b.id))
    }

    /// Base capacity of the ward: the number of regular beds.
    pub fn capacity(&self) -> usize {
        self.regular().count()
    }
}

impl Default for BedCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
