//! Rule-based fertilizer selection, used when the ML backend is unavailable.
//!
//! The decision tree is data: an ordered list of [`CropRule`]s. The first
//! rule whose crop group contains the crop is used, and inside it the first
//! branch whose [`Condition`] holds wins. Crops that match no group, and
//! unknown crop ids, go through [`GENERIC_RULE`].

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_FALLBACK_CONFIDENCE;
use crate::models::{FertilizerChoice, Nutrient};

use Condition::{Above, AllBelow, Below};
use Nutrient::{Nitrogen as N, Phosphorus as P, Potassium as K};

// ---

/// Crops offered by the dashboard, keyed by their form id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum CropType {
    Rice,
    Wheat,
    Sugarcane,
    Bajra,
    Moong,
    Onion,
    Barley,
    Cotton,
    Maize,
    Groundnut,
    Potato,
    Tomato,
}

impl CropType {
    const BY_ID: [CropType; 12] = [
        CropType::Rice,
        CropType::Wheat,
        CropType::Sugarcane,
        CropType::Bajra,
        CropType::Moong,
        CropType::Onion,
        CropType::Barley,
        CropType::Cotton,
        CropType::Maize,
        CropType::Groundnut,
        CropType::Potato,
        CropType::Tomato,
    ];

    pub fn from_id(id: i64) -> Option<CropType> {
        usize::try_from(id)
            .ok()
            .and_then(|i| Self::BY_ID.get(i).copied())
    }

    pub fn id(self) -> i64 {
        self as i64
    }

    pub fn label(self) -> &'static str {
        // ---
        match self {
            CropType::Rice => "Rice",
            CropType::Wheat => "Wheat",
            CropType::Sugarcane => "Sugarcane",
            CropType::Bajra => "Bajra",
            CropType::Moong => "Moong",
            CropType::Onion => "Onion",
            CropType::Barley => "Barley",
            CropType::Cotton => "Cotton",
            CropType::Maize => "Maize",
            CropType::Groundnut => "Groundnut",
            CropType::Potato => "Potato",
            CropType::Tomato => "Tomato",
        }
    }

    /// Case-insensitive lookup, including common local names.
    pub fn from_name(name: &str) -> Option<CropType> {
        // ---
        let crop = match name.trim().to_ascii_lowercase().as_str() {
            "rice" | "paddy" => CropType::Rice,
            "wheat" => CropType::Wheat,
            "sugarcane" => CropType::Sugarcane,
            "bajra" | "pearl millet" => CropType::Bajra,
            "moong" | "green gram" | "mung bean" => CropType::Moong,
            "onion" => CropType::Onion,
            "barley" => CropType::Barley,
            "cotton" => CropType::Cotton,
            "maize" | "corn" => CropType::Maize,
            "groundnut" | "ground nuts" | "peanut" => CropType::Groundnut,
            "potato" => CropType::Potato,
            "tomato" => CropType::Tomato,
            _ => return None,
        };
        Some(crop)
    }
}

/// Crop as posted by the dashboard: a form id or a crop name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CropInput {
    Id(i64),
    Name(String),
}

impl CropInput {
    /// Known crop (if any) and a label for responses. Unknown crops are not
    /// an error; they are scored by the generic rule.
    pub fn resolve(&self) -> (Option<CropType>, String) {
        // ---
        match self {
            CropInput::Id(id) => match CropType::from_id(*id) {
                Some(crop) => (Some(crop), crop.label().to_string()),
                None => (None, format!("Crop #{}", id)),
            },
            CropInput::Name(name) => {
                let crop = CropType::from_name(name).or_else(|| {
                    name.trim().parse::<i64>().ok().and_then(CropType::from_id)
                });
                match crop {
                    Some(crop) => (Some(crop), crop.label().to_string()),
                    None if name.trim().is_empty() => (None, "Unknown crop".to_string()),
                    None => (None, name.trim().to_string()),
                }
            }
        }
    }
}

/// Every fertilizer name the advisor can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Fertilizer {
    Urea,
    Dap,
    Tsp,
    Npk2828,
    Npk2020,
    PotassiumSulfate,
    Npk143514,
    Npk141414,
    Npk102626,
    Npk151515,
    Npk171717,
    OrganicCompost,
}

/// Catalog entry for one fertilizer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FertilizerInfo {
    pub name: &'static str,
    pub npk_ratio: &'static str,
    pub description: &'static str,
    pub application_method: &'static str,
}

impl Fertilizer {
    pub const CATALOG: [Fertilizer; 12] = [
        Fertilizer::Urea,
        Fertilizer::Dap,
        Fertilizer::Tsp,
        Fertilizer::Npk2828,
        Fertilizer::Npk2020,
        Fertilizer::PotassiumSulfate,
        Fertilizer::Npk143514,
        Fertilizer::Npk141414,
        Fertilizer::Npk102626,
        Fertilizer::Npk151515,
        Fertilizer::Npk171717,
        Fertilizer::OrganicCompost,
    ];

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn info(self) -> FertilizerInfo {
        // ---
        let (name, npk_ratio, description, application_method) = match self {
            Fertilizer::Urea => (
                "Urea",
                "46-0-0",
                "High-nitrogen fertilizer for rapid vegetative growth",
                "Split into 2-3 top dressings; incorporate into moist soil",
            ),
            Fertilizer::Dap => (
                "DAP",
                "18-46-0",
                "Diammonium phosphate for root development and early vigour",
                "Apply as basal dose and mix into the root zone before sowing",
            ),
            Fertilizer::Tsp => (
                "TSP",
                "0-46-0",
                "Triple superphosphate for phosphorus-hungry soils",
                "Broadcast and incorporate before sowing",
            ),
            Fertilizer::Npk2828 => (
                "28-28",
                "28-28-0",
                "Balanced nitrogen and phosphorus complex",
                "Apply at sowing in bands near the seed row",
            ),
            Fertilizer::Npk2020 => (
                "20-20",
                "20-20-0",
                "Ammonium phosphate sulfate for moderate N and P needs",
                "Apply as basal dose; follow with light irrigation",
            ),
            Fertilizer::PotassiumSulfate => (
                "Potassium-Sulfate",
                "0-0-50",
                "Sulfate of potash for potassium and sulfur supply",
                "Broadcast before planting or side-dress during growth",
            ),
            Fertilizer::Npk143514 => (
                "14-35-14",
                "14-35-14",
                "Phosphorus-rich complex for establishment",
                "Apply as basal dose at planting",
            ),
            Fertilizer::Npk141414 => (
                "14-14-14",
                "14-14-14",
                "Balanced complex for general maintenance",
                "Broadcast evenly and water in",
            ),
            Fertilizer::Npk102626 => (
                "10-26-26",
                "10-26-26",
                "Complex for flowering and fruiting stages",
                "Apply at planting and again before flowering",
            ),
            Fertilizer::Npk151515 => (
                "15-15-15",
                "15-15-15",
                "Balanced complex suited to cereals",
                "Apply as basal dose and incorporate into soil",
            ),
            Fertilizer::Npk171717 => (
                "17-17-17",
                "17-17-17",
                "Balanced complex for soils low in all three macronutrients",
                "Split between basal dose and first top dressing",
            ),
            Fertilizer::OrganicCompost => (
                "Organic compost",
                "variable",
                "Well-rotted compost to build organic matter and structure",
                "Spread and mix into the top 15 cm before sowing",
            ),
        };

        FertilizerInfo {
            name,
            npk_ratio,
            description,
            application_method,
        }
    }

    /// Catalog lookup by display name, ignoring case.
    pub fn from_name(name: &str) -> Option<Fertilizer> {
        let name = name.trim();
        Self::CATALOG
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

// ---

/// N, P and K in mg/kg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Npk {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
}

impl Npk {
    fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Nitrogen => self.nitrogen,
            Nutrient::Phosphorus => self.phosphorus,
            Nutrient::Potassium => self.potassium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    Below(Nutrient, f64),
    Above(Nutrient, f64),
    /// All three nutrients strictly below the limit.
    AllBelow(f64),
}

impl Condition {
    pub fn holds(self, npk: &Npk) -> bool {
        // ---
        match self {
            Condition::Below(n, limit) => npk.get(n) < limit,
            Condition::Above(n, limit) => npk.get(n) > limit,
            Condition::AllBelow(limit) => {
                npk.nitrogen < limit && npk.phosphorus < limit && npk.potassium < limit
            }
        }
    }
}

#[derive(Debug)]
pub struct CropRule {
    pub label: &'static str,
    pub crops: &'static [CropType],
    pub branches: &'static [(Condition, Fertilizer)],
    pub otherwise: Fertilizer,
}

impl CropRule {
    pub fn decide(&self, npk: &Npk) -> Fertilizer {
        self.branches
            .iter()
            .find(|(condition, _)| condition.holds(npk))
            .map_or(self.otherwise, |&(_, fertilizer)| fertilizer)
    }
}

/// Crop-group rules in evaluation order.
pub const CROP_RULES: &[CropRule] = &[
    CropRule {
        label: "rice-bajra",
        crops: &[CropType::Rice, CropType::Bajra],
        branches: &[(Below(N, 50.0), Fertilizer::Urea), (Below(P, 30.0), Fertilizer::Dap)],
        otherwise: Fertilizer::Tsp,
    },
    CropRule {
        label: "wheat",
        crops: &[CropType::Wheat],
        branches: &[(Below(P, 20.0), Fertilizer::Dap), (Below(N, 30.0), Fertilizer::Npk2828)],
        otherwise: Fertilizer::Npk2020,
    },
    CropRule {
        label: "sugarcane",
        crops: &[CropType::Sugarcane],
        branches: &[
            (Below(K, 30.0), Fertilizer::PotassiumSulfate),
            (Above(N, 100.0), Fertilizer::Dap),
        ],
        otherwise: Fertilizer::Npk143514,
    },
    // Bajra never reaches this group; the rice-bajra rule claims it first.
    CropRule {
        label: "bajra-moong-onion",
        crops: &[CropType::Bajra, CropType::Moong, CropType::Onion],
        branches: &[
            (Above(P, 30.0), Fertilizer::Npk141414),
            (Below(K, 20.0), Fertilizer::Npk102626),
        ],
        otherwise: Fertilizer::Tsp,
    },
    CropRule {
        label: "barley",
        crops: &[CropType::Barley],
        branches: &[],
        otherwise: Fertilizer::Npk151515,
    },
    CropRule {
        label: "cotton",
        crops: &[CropType::Cotton],
        branches: &[(Above(N, 80.0), Fertilizer::Urea)],
        otherwise: Fertilizer::Dap,
    },
];

pub static GENERIC_RULE: CropRule = CropRule {
    label: "generic",
    crops: &[],
    branches: &[
        (AllBelow(20.0), Fertilizer::Npk171717),
        (Below(N, 15.0), Fertilizer::Urea),
        (Below(P, 15.0), Fertilizer::Dap),
        (Below(K, 15.0), Fertilizer::PotassiumSulfate),
    ],
    otherwise: Fertilizer::Npk141414,
};

/// The rule that governs `crop`.
pub fn rule_for(crop: Option<CropType>) -> &'static CropRule {
    crop.and_then(|c| CROP_RULES.iter().find(|rule| rule.crops.contains(&c)))
        .unwrap_or(&GENERIC_RULE)
}

/// Pick a fertilizer for a crop id with the default confidence.
#[allow(dead_code)]
pub fn select_fertilizer(
    crop_type_id: i64,
    nitrogen: f64,
    phosphorus: f64,
    potassium: f64,
) -> FertilizerChoice {
    // ---
    let npk = Npk {
        nitrogen,
        phosphorus,
        potassium,
    };
    select_for_crop(CropType::from_id(crop_type_id), &npk, DEFAULT_FALLBACK_CONFIDENCE)
}

/// Pick a fertilizer; `confidence` is reported as-is.
pub fn select_for_crop(crop: Option<CropType>, npk: &Npk, confidence: f64) -> FertilizerChoice {
    // ---
    let rule = rule_for(crop);
    let fertilizer = rule.decide(npk);

    tracing::debug!(
        crop = ?crop,
        rule = rule.label,
        fertilizer = fertilizer.name(),
        "Fallback selector decision"
    );

    FertilizerChoice {
        fertilizer: fertilizer.name().to_string(),
        confidence,
    }
}
