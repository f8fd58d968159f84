//! Occupancy statistics.
//!
//! [`compute_statistics`] is a pure function of the catalog and the bed map: it never mutates
//! its input and returns the same result for the same input.

use crate::catalog::BedCatalog;
use crate::patient::{BedMode, PatientData};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// Main slots with a patient, in bed or crib mode.
    pub occupied_beds: u32,
    /// Named clinical cribs only.
    pub occupied_cribs: u32,
    /// Main slots in crib mode and occupied, plus named clinical cribs.
    pub clinical_cribs_count: u32,
    /// Healthy-newborn cribs attached to a mother's slot.
    pub companion_cribs: u32,
    /// Physical crib furniture in use, occupied or not.
    pub total_cribs_used: u32,
    pub total_hospitalized: u32,
    pub blocked_beds: u32,
    pub service_capacity: i32,
    /// Negative when the ward is over capacity.
    pub available_capacity: i32,
}

/// Derive the census counts for one day's bed map.
///
/// Catalog beds without an entry are skipped. A blocked bed only adds to `blocked_beds`.
///
/// A main slot in crib mode that is occupied and also holds a named clinical crib adds two to
/// `clinical_cribs_count`; each counts as separate crib furniture.
///
/// `occupied_cribs` needs a non-blank clinical crib name, while the crib furniture counts only
/// need the name to be non-empty.
pub fn compute_statistics(
    catalog: &BedCatalog,
    beds: &BTreeMap<String, PatientData>,
) -> Statistics {
    let mut stats = Statistics::default();

    for bed in catalog.all() {
        let Some(data) = beds.get(&bed.id) else {
            continue;
        };

        if data.main.is_blocked {
            stats.blocked_beds += 1;
            continue;
        }

        let main_occupied = data.main.is_occupied();
        let crib_mode = data.main.bed_mode == BedMode::Crib;

        if main_occupied {
            stats.occupied_beds += 1;
        }
        if data.occupied_crib().is_some() {
            stats.occupied_cribs += 1;
        }
        // Crib furniture counts any recorded name, even whitespace.
        if data
            .clinical_crib
            .as_ref()
            .is_some_and(|crib| !crib.patient_name.is_empty())
        {
            stats.clinical_cribs_count += 1;
            stats.total_cribs_used += 1;
        }

        if crib_mode {
            stats.total_cribs_used += 1;
            if main_occupied {
                stats.clinical_cribs_count += 1;
            }
        }

        if data.main.has_companion_crib {
            stats.companion_cribs += 1;
            stats.total_cribs_used += 1;
        }
    }

    stats.total_hospitalized = stats.occupied_beds + stats.occupied_cribs;
    stats.service_capacity = catalog.capacity() as i32 - stats.blocked_beds as i32;
    stats.available_capacity = stats.service_capacity - stats.total_hospitalized as i32;
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::Occupant;

    fn full_map(catalog: &BedCatalog) -> BTreeMap<String, PatientData> {
        catalog
            .all()
            .iter()
            .map(|b| (b.id.clone(), PatientData::empty(catalog, &b.id)))
            .collect()
    }

    fn admit(beds: &mut BTreeMap<String, PatientData>, id: &str, name: &str) {
        if let Some(bed) = beds.get_mut(id) {
            bed.main.patient_name = name.to_string();
        }
    }

    #[test]
    fn test_empty_ward() {
        let catalog = BedCatalog::standard();
        let stats = compute_statistics(&catalog, &full_map(&catalog));
        assert_eq!(stats.occupied_beds, 0);
        assert_eq!(stats.service_capacity, 18);
        assert_eq!(stats.available_capacity, 18);
    }

    #[test]
    fn test_block_scenario_counts() {
        let catalog = BedCatalog::standard();
        let mut beds = full_map(&catalog);
        admit(&mut beds, "R1", "Juan");
        if let Some(r2) = beds.get_mut("R2") {
            r2.main.is_blocked = true;
            r2.main.blocked_reason = "Aislamiento".into();
        }

        let stats = compute_statistics(&catalog, &beds);
        assert_eq!(stats.blocked_beds, 1);
        assert_eq!(stats.occupied_beds, 1);
        assert_eq!(stats.service_capacity, 17);
        assert_eq!(stats.available_capacity, 16);
    }

    #[test]
    fn test_blocked_bed_contributes_no_occupancy() {
        let catalog = BedCatalog::standard();
        let mut beds = full_map(&catalog);
        admit(&mut beds, "H1C1", "Ana");
        if let Some(bed) = beds.get_mut("H1C1") {
            bed.main.is_blocked = true;
            bed.main.has_companion_crib = true;
        }
        let stats = compute_statistics(&catalog, &beds);
        assert_eq!(stats.blocked_beds, 1);
        assert_eq!(stats.occupied_beds, 0);
        assert_eq!(stats.companion_cribs, 0);
    }

    #[test]
    fn test_crib_paths() {
        let catalog = BedCatalog::standard();
        let mut beds = full_map(&catalog);

        // Occupied crib-mode main slot with its own named clinical crib.
        admit(&mut beds, "NEO1", "RN Soto");
        if let Some(bed) = beds.get_mut("NEO1") {
            bed.main.bed_mode = BedMode::Crib;
            let mut crib = Occupant::vacant("NEO1", BedMode::Crib);
            crib.patient_name = "RN Soto 2".into();
            bed.clinical_crib = Some(crib);
        }
        // Empty crib-mode slot.
        if let Some(bed) = beds.get_mut("NEO2") {
            bed.main.bed_mode = BedMode::Crib;
        }
        // Mother with a companion crib.
        admit(&mut beds, "H3C1", "Maria");
        if let Some(bed) = beds.get_mut("H3C1") {
            bed.main.has_companion_crib = true;
        }

        let stats = compute_statistics(&catalog, &beds);
        assert_eq!(stats.occupied_beds, 2);
        assert_eq!(stats.occupied_cribs, 1);
        assert_eq!(stats.clinical_cribs_count, 2);
        assert_eq!(stats.companion_cribs, 1);
        assert_eq!(stats.total_cribs_used, 4);
        assert_eq!(stats.total_hospitalized, 3);
    }

    #[test]
    fn test_whitespace_crib_name_uses_furniture_but_is_not_a_patient() {
        let catalog = BedCatalog::standard();
        let mut beds = full_map(&catalog);
        if let Some(bed) = beds.get_mut("NEO1") {
            let mut crib = Occupant::vacant("NEO1", BedMode::Crib);
            crib.patient_name = "  ".into();
            bed.clinical_crib = Some(crib);
        }
        if let Some(bed) = beds.get_mut("NEO2") {
            bed.clinical_crib = Some(Occupant::vacant("NEO2", BedMode::Crib));
        }

        let stats = compute_statistics(&catalog, &beds);
        assert_eq!(stats.occupied_cribs, 0);
        assert_eq!(stats.clinical_cribs_count, 1);
        assert_eq!(stats.total_cribs_used, 1);
        assert_eq!(stats.total_hospitalized, 0);
    }

    #[test]
    fn test_missing_entries_are_skipped() {
        let catalog = BedCatalog::standard();
        let mut beds = BTreeMap::new();
        let mut r1 = PatientData::empty(&catalog, "R1");
        r1.main.patient_name = "Juan".into();
        beds.insert("R1".to_string(), r1);

        let stats = compute_statistics(&catalog, &beds);
        assert_eq!(stats.occupied_beds, 1);
        assert_eq!(stats.available_capacity, 17);
    }

    #[test]
    fn test_capacity_partitions_and_is_pure() {
        let catalog = BedCatalog::standard();
        let mut beds = full_map(&catalog);
        admit(&mut beds, "R1", "A");
        admit(&mut beds, "R3", "B");
        admit(&mut beds, "H2C2", "C");
        if let Some(bed) = beds.get_mut("H4C1") {
            bed.main.is_blocked = true;
        }
        let before = beds.clone();

        let first = compute_statistics(&catalog, &beds);
        let second = compute_statistics(&catalog, &beds);
        assert_eq!(first, second);
        assert_eq!(beds, before);
        assert_eq!(
            first.available_capacity + first.total_hospitalized as i32 + first.blocked_beds as i32,
            catalog.capacity() as i32
        );
    }

    #[test]
    fn test_active_extra_bed_can_exceed_capacity() {
        let catalog = BedCatalog::standard();
        let mut beds = full_map(&catalog);
        for bed in catalog.regular() {
            admit(&mut beds, &bed.id, "X");
        }
        admit(&mut beds, "E1", "Overflow");
        let stats = compute_statistics(&catalog, &beds);
        assert_eq!(stats.occupied_beds, 19);
        assert_eq!(stats.available_capacity, -1);
    }
}
