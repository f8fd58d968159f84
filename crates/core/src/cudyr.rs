//! CUDYR acuity scoring.
//!
//! Fourteen nursing items scored 0-3: six "dependency" items and eight "risk" items. The sums
//! map to a dependency category (`1` highest dependency, `3` lowest) and a risk category (`A`
//! highest risk, `D` lowest); the combined label is risk followed by dependency, e.g. `"B2"`.

use serde::{Deserialize, Serialize};

/// Highest value an item may take through the editing operations.
pub const MAX_ITEM_SCORE: u8 = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CudyrScore {
    // Dependency
    pub change_clothes: u8,
    pub mobilization: u8,
    pub feeding: u8,
    pub elimination: u8,
    pub psychosocial: u8,
    pub surveillance: u8,

    // Risk
    pub vital_signs: u8,
    pub fluid_balance: u8,
    pub oxygen_therapy: u8,
    pub airway: u8,
    pub pro_interventions: u8,
    pub skin_care: u8,
    pub pharmacology: u8,
    pub invasive_elements: u8,
}

/// One CUDYR item, used to address a single sub-score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CudyrItem {
    ChangeClothes,
    Mobilization,
    Feeding,
    Elimination,
    Psychosocial,
    Surveillance,
    VitalSigns,
    FluidBalance,
    OxygenTherapy,
    Airway,
    ProInterventions,
    SkinCare,
    Pharmacology,
    InvasiveElements,
}

impl CudyrItem {
    pub const ALL: [CudyrItem; 14] = [
        CudyrItem::ChangeClothes,
        CudyrItem::Mobilization,
        CudyrItem::Feeding,
        CudyrItem::Elimination,
        CudyrItem::Psychosocial,
        CudyrItem::Surveillance,
        CudyrItem::VitalSigns,
        CudyrItem::FluidBalance,
        CudyrItem::OxygenTherapy,
        CudyrItem::Airway,
        CudyrItem::ProInterventions,
        CudyrItem::SkinCare,
        CudyrItem::Pharmacology,
        CudyrItem::InvasiveElements,
    ];

    /// Document key of the item (`"changeClothes"`, ...).
    pub fn key(self) -> &'static str {
        match self {
            CudyrItem::ChangeClothes => "changeClothes",
            CudyrItem::Mobilization => "mobilization",
            CudyrItem::Feeding => "feeding",
            CudyrItem::Elimination => "elimination",
            CudyrItem::Psychosocial => "psychosocial",
            CudyrItem::Surveillance => "surveillance",
            CudyrItem::VitalSigns => "vitalSigns",
            CudyrItem::FluidBalance => "fluidBalance",
            CudyrItem::OxygenTherapy => "oxygenTherapy",
            CudyrItem::Airway => "airway",
            CudyrItem::ProInterventions => "proInterventions",
            CudyrItem::SkinCare => "skinCare",
            CudyrItem::Pharmacology => "pharmacology",
            CudyrItem::InvasiveElements => "invasiveElements",
        }
    }
}

impl CudyrScore {
    pub fn get(&self, item: CudyrItem) -> u8 {
        match item {
            CudyrItem::ChangeClothes => self.change_clothes,
            CudyrItem::Mobilization => self.mobilization,
            CudyrItem::Feeding => self.feeding,
            CudyrItem::Elimination => self.elimination,
            CudyrItem::Psychosocial => self.psychosocial,
            CudyrItem::Surveillance => self.surveillance,
            CudyrItem::VitalSigns => self.vital_signs,
            CudyrItem::FluidBalance => self.fluid_balance,
            CudyrItem::OxygenTherapy => self.oxygen_therapy,
            CudyrItem::Airway => self.airway,
            CudyrItem::ProInterventions => self.pro_interventions,
            CudyrItem::SkinCare => self.skin_care,
            CudyrItem::Pharmacology => self.pharmacology,
            CudyrItem::InvasiveElements => self.invasive_elements,
        }
    }

    pub fn set(&mut self, item: CudyrItem, value: u8) {
        let slot = match item {
            CudyrItem::ChangeClothes => &mut self.change_clothes,
            CudyrItem::Mobilization => &mut self.mobilization,
            CudyrItem::Feeding => &mut self.feeding,
            CudyrItem::Elimination => &mut self.elimination,
            CudyrItem::Psychosocial => &mut self.psychosocial,
            CudyrItem::Surveillance => &mut self.surveillance,
            CudyrItem::VitalSigns => &mut self.vital_signs,
            CudyrItem::FluidBalance => &mut self.fluid_balance,
            CudyrItem::OxygenTherapy => &mut self.oxygen_therapy,
            CudyrItem::Airway => &mut self.airway,
            CudyrItem::ProInterventions => &mut self.pro_interventions,
            CudyrItem::SkinCare => &mut self.skin_care,
            CudyrItem::Pharmacology => &mut self.pharmacology,
            CudyrItem::InvasiveElements => &mut self.invasive_elements,
        };
        *slot = value;
    }

    /// Sum of the six dependency items (0-18).
    pub fn dependency_score(&self) -> u32 {
        [
            self.change_clothes,
            self.mobilization,
            self.feeding,
            self.elimination,
            self.psychosocial,
            self.surveillance,
        ]
        .iter()
        .map(|v| u32::from(*v))
        .sum()
    }

    /// Sum of the eight risk items (0-24).
    pub fn risk_score(&self) -> u32 {
        [
            self.vital_signs,
            self.fluid_balance,
            self.oxygen_therapy,
            self.airway,
            self.pro_interventions,
            self.skin_care,
            self.pharmacology,
            self.invasive_elements,
        ]
        .iter()
        .map(|v| u32::from(*v))
        .sum()
    }

    pub fn categorize(&self) -> Categorization {
        Categorization::from_scores(self.dependency_score(), self.risk_score())
    }
}

/// Dependency band: `1` total dependency (13-18), `2` partial (7-12), `3` partial self-care (0-6).
pub fn dependency_category(score: u32) -> char {
    if score >= 13 {
        '1'
    } else if score >= 7 {
        '2'
    } else {
        '3'
    }
}

/// Risk band: `A` maximum (19-24), `B` high (12-18), `C` medium (6-11), `D` low (0-5).
pub fn risk_category(score: u32) -> char {
    if score >= 19 {
        'A'
    } else if score >= 12 {
        'B'
    } else if score >= 6 {
        'C'
    } else {
        'D'
    }
}

/// Derived CUDYR categorisation of one patient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Categorization {
    pub dependency_score: u32,
    pub risk_score: u32,
    pub dependency_category: char,
    pub risk_category: char,
    /// Risk letter followed by dependency digit, e.g. `"B2"`.
    pub label: String,
    /// False while every item is still zero.
    pub is_categorized: bool,
}

impl Categorization {
    pub fn from_scores(dependency_score: u32, risk_score: u32) -> Self {
        let dependency_category = dependency_category(dependency_score);
        let risk_category = risk_category(risk_score);
        Self {
            dependency_score,
            risk_score,
            dependency_category,
            risk_category,
            label: format!("{risk_category}{dependency_category}"),
            is_categorized: dependency_score > 0 || risk_score > 0,
        }
    }

    /// Categorisation of an optional score; an absent score counts as all zeros.
    pub fn of(score: Option<&CudyrScore>) -> Self {
        score.copied().unwrap_or_default().categorize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(value: u8) -> CudyrScore {
        let mut score = CudyrScore::default();
        for item in CudyrItem::ALL {
            score.set(item, value);
        }
        score
    }

    #[test]
    fn test_all_twos_is_b2() {
        let cat = all(2).categorize();
        assert_eq!(cat.dependency_score, 12);
        assert_eq!(cat.dependency_category, '2');
        assert_eq!(cat.risk_score, 16);
        assert_eq!(cat.risk_category, 'B');
        assert_eq!(cat.label, "B2");
        assert!(cat.is_categorized);
    }

    #[test]
    fn test_zero_score_is_uncategorised_d3() {
        let cat = Categorization::of(None);
        assert_eq!(cat.label, "D3");
        assert!(!cat.is_categorized);
    }

    #[test]
    fn test_all_threes_is_a1() {
        let cat = all(3).categorize();
        assert_eq!(cat.dependency_score, 18);
        assert_eq!(cat.risk_score, 24);
        assert_eq!(cat.label, "A1");
    }

    #[test]
    fn test_category_boundaries() {
        assert_eq!(dependency_category(6), '3');
        assert_eq!(dependency_category(7), '2');
        assert_eq!(dependency_category(12), '2');
        assert_eq!(dependency_category(13), '1');

        assert_eq!(risk_category(5), 'D');
        assert_eq!(risk_category(6), 'C');
        assert_eq!(risk_category(11), 'C');
        assert_eq!(risk_category(12), 'B');
        assert_eq!(risk_category(18), 'B');
        assert_eq!(risk_category(19), 'A');
    }

    #[test]
    fn test_set_and_get_each_item() {
        let mut score = CudyrScore::default();
        for (i, item) in CudyrItem::ALL.into_iter().enumerate() {
            score.set(item, (i % 4) as u8);
        }
        for (i, item) in CudyrItem::ALL.into_iter().enumerate() {
            assert_eq!(score.get(item), (i % 4) as u8);
        }
    }

    #[test]
    fn test_json_keys() {
        let mut score = CudyrScore::default();
        score.set(CudyrItem::InvasiveElements, 3);
        let value = serde_json::to_value(score).expect("serialise");
        assert_eq!(value["invasiveElements"], 3);
        assert_eq!(value["changeClothes"], 0);
        assert_eq!(CudyrItem::InvasiveElements.key(), "invasiveElements");
    }
}
