//! Recommendation composer.
//!
//! Turns a field description, a sensor reading and a primary fertilizer
//! choice (from the model or the fallback selector) into the farmer-facing
//! recommendation: secondary and organic inputs, quantities scaled to the
//! field, a cost breakdown, timing and a soil diagnosis.

use serde::{Deserialize, Serialize};

use crate::config::AdvisorConstants;
use crate::error::AdvisorError;
use crate::fallback::Fertilizer;
use crate::models::{
    FertilizerChoice, Nutrient, Parameter, ParameterStatus, SensorReading, SoilHealthResult,
};
use crate::scoring;

// ---

pub const ACRES_TO_HECTARES: f64 = 0.404686;
pub const BIGHA_TO_HECTARES: f64 = 0.1338;

/// Largest field accepted, in hectares.
pub const MAX_FIELD_HECTARES: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaUnit {
    #[default]
    #[serde(alias = "acre", alias = "ac")]
    Acres,
    Bigha,
    #[serde(alias = "hectare", alias = "ha")]
    Hectares,
}

impl AreaUnit {
    fn factor(self) -> f64 {
        match self {
            AreaUnit::Acres => ACRES_TO_HECTARES,
            AreaUnit::Bigha => BIGHA_TO_HECTARES,
            AreaUnit::Hectares => 1.0,
        }
    }

    pub fn to_hectares(self, size: f64) -> f64 {
        size * self.factor()
    }

    #[allow(dead_code)]
    pub fn from_hectares(self, hectares: f64) -> f64 {
        hectares / self.factor()
    }
}

/// Field metadata needed to size a recommendation.
#[derive(Debug, Clone, PartialEq)]
pub struct Farm {
    pub farm_id: Option<String>,
    pub crop: String,
    pub field_size: f64,
    pub field_unit: AreaUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FertilizerRecommendation {
    // ---
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub npk_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_method: Option<String>,
    pub quantity_kg: u64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganicAlternative {
    pub name: String,
    pub kg_per_hectare: f64,
    pub quantity_kg: u64,
    pub benefits: String,
    pub timing: String,
}

/// Cost breakdown in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub primary: i64,
    pub secondary: i64,
    pub organic: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationTiming {
    pub primary: String,
    pub secondary: String,
    pub organic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilCondition {
    pub ph_status: String,
    pub moisture_status: String,
    pub nutrient_deficiencies: Vec<Nutrient>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    // ---
    pub crop: String,
    pub field_size_hectares: f64,
    pub soil_health: SoilHealthResult,
    pub primary_fertilizer: FertilizerRecommendation,
    pub secondary_fertilizer: FertilizerRecommendation,
    pub organic_alternatives: Vec<OrganicAlternative>,
    pub cost_estimate: CostEstimate,
    pub application_timing: ApplicationTiming,
    pub soil_condition: SoilCondition,
}

/// `(name, kg per hectare, benefits, timing)`
const ORGANIC_ALTERNATIVES: [(&str, f64, &str, &str); 3] = [
    (
        "Vermicompost",
        1000.0,
        "Improves soil structure, water retention and microbial activity",
        "Apply 2-3 weeks before sowing",
    ),
    (
        "Neem Cake",
        200.0,
        "Slow-release nitrogen with natural pest and nematode control",
        "Apply at land preparation",
    ),
    (
        "Bone Meal",
        150.0,
        "Slow-release phosphorus and calcium for root development",
        "Apply at planting, mixed into the root zone",
    ),
];

const PRIMARY_TIMING: &str = "Apply as basal dose at sowing or transplanting";
const SECONDARY_TIMING: &str = "Top dress 30-45 days after sowing";
const ORGANIC_TIMING: &str = "Incorporate 2-3 weeks before sowing";

// ---

/// Secondary input, decided only from the deficiency flags.
pub fn secondary_fertilizer(soil: &SoilHealthResult) -> Fertilizer {
    // ---
    if soil.is_deficient(Nutrient::Phosphorus) {
        Fertilizer::Dap
    } else if soil.is_deficient(Nutrient::Potassium) {
        Fertilizer::PotassiumSulfate
    } else {
        Fertilizer::OrganicCompost
    }
}

fn secondary_reason(fertilizer: Fertilizer) -> &'static str {
    match fertilizer {
        Fertilizer::Dap => "Phosphorus is below 15 mg/kg",
        Fertilizer::PotassiumSulfate => "Potassium is below 120 mg/kg",
        _ => "No secondary nutrient deficiency; build organic matter",
    }
}

fn round_kg(kg: f64) -> u64 {
    kg.round().max(0.0) as u64
}

fn round_cost(field: &'static str, amount: f64) -> Result<i64, AdvisorError> {
    // ---
    let rounded = amount.round();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if !rounded.is_finite() || rounded.abs() >= i64::MAX as f64 {
        return Err(AdvisorError::validation(field, "cost is out of range"));
    }
    Ok(rounded as i64)
}

fn require_finite(field: &'static str, value: f64) -> Result<(), AdvisorError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AdvisorError::validation(field, "must be a finite number"))
    }
}

fn validate_inputs(
    farm: &Farm,
    reading: &SensorReading,
    choice: &FertilizerChoice,
    constants: &AdvisorConstants,
) -> Result<(), AdvisorError> {
    // ---
    require_finite("fieldSize", farm.field_size)?;
    if farm.field_size <= 0.0 {
        return Err(AdvisorError::validation("fieldSize", "must be greater than zero"));
    }
    if farm.field_unit.to_hectares(farm.field_size) > MAX_FIELD_HECTARES {
        return Err(AdvisorError::validation(
            "fieldSize",
            format!("must not exceed {} hectares", MAX_FIELD_HECTARES),
        ));
    }
    reading.validate()?;

    if choice.fertilizer.trim().is_empty() {
        return Err(AdvisorError::validation("fertilizer", "is required"));
    }
    require_finite("confidence", choice.confidence)?;

    for (field, value) in [
        ("primaryKgPerHa", constants.primary_kg_per_ha),
        ("secondaryKgPerHa", constants.secondary_kg_per_ha),
        ("primaryCostPerHa", constants.primary_cost_per_ha),
        ("secondaryCostPerHa", constants.secondary_cost_per_ha),
        ("organicCostPerHa", constants.organic_cost_per_ha),
    ] {
        require_finite(field, value)?;
    }
    Ok(())
}

/// Build the full recommendation for one request.
pub fn compose(
    farm: &Farm,
    reading: &SensorReading,
    choice: &FertilizerChoice,
    constants: &AdvisorConstants,
) -> Result<Recommendation, AdvisorError> {
    // ---
    validate_inputs(farm, reading, choice, constants)?;

    let hectares = farm.field_unit.to_hectares(farm.field_size);
    let soil_health = scoring::score(reading);

    let primary_info = Fertilizer::from_name(&choice.fertilizer).map(Fertilizer::info);
    let primary_fertilizer = FertilizerRecommendation {
        name: choice.fertilizer.clone(),
        confidence: Some(choice.confidence),
        npk_ratio: primary_info.as_ref().map(|i| i.npk_ratio.to_string()),
        description: primary_info.as_ref().map(|i| i.description.to_string()),
        application_method: primary_info.as_ref().map(|i| i.application_method.to_string()),
        quantity_kg: round_kg(constants.primary_kg_per_ha * hectares),
        reason: format!("Best match for {} at the measured N-P-K levels", farm.crop),
    };

    let secondary = secondary_fertilizer(&soil_health);
    let secondary_info = secondary.info();
    let secondary_fertilizer = FertilizerRecommendation {
        name: secondary_info.name.to_string(),
        confidence: None,
        npk_ratio: Some(secondary_info.npk_ratio.to_string()),
        description: Some(secondary_info.description.to_string()),
        application_method: Some(secondary_info.application_method.to_string()),
        quantity_kg: round_kg(constants.secondary_kg_per_ha * hectares),
        reason: secondary_reason(secondary).to_string(),
    };

    let organic_alternatives = ORGANIC_ALTERNATIVES
        .iter()
        .map(|&(name, kg_per_hectare, benefits, timing)| OrganicAlternative {
            name: name.to_string(),
            kg_per_hectare,
            quantity_kg: round_kg(kg_per_hectare * hectares),
            benefits: benefits.to_string(),
            timing: timing.to_string(),
        })
        .collect();

    let cost_estimate = cost_estimate(hectares, constants)?;

    let application_timing = ApplicationTiming {
        primary: PRIMARY_TIMING.to_string(),
        secondary: SECONDARY_TIMING.to_string(),
        organic: ORGANIC_TIMING.to_string(),
    };

    let soil_condition = soil_condition(reading, &soil_health);

    tracing::info!(
        crop = %farm.crop,
        hectares,
        primary = %primary_fertilizer.name,
        secondary = %secondary_fertilizer.name,
        total_cost = cost_estimate.total,
        "Composed recommendation"
    );

    Ok(Recommendation {
        crop: farm.crop.clone(),
        field_size_hectares: hectares,
        soil_health,
        primary_fertilizer,
        secondary_fertilizer,
        organic_alternatives,
        cost_estimate,
        application_timing,
        soil_condition,
    })
}

/// Per-line costs are rounded first so the total is their exact sum.
pub fn cost_estimate(
    hectares: f64,
    constants: &AdvisorConstants,
) -> Result<CostEstimate, AdvisorError> {
    // ---
    let primary = round_cost("primaryCost", hectares * constants.primary_cost_per_ha)?;
    let secondary = round_cost("secondaryCost", hectares * constants.secondary_cost_per_ha)?;
    let organic = round_cost("organicCost", hectares * constants.organic_cost_per_ha)?;

    let total = primary
        .checked_add(secondary)
        .and_then(|sum| sum.checked_add(organic))
        .ok_or_else(|| AdvisorError::validation("totalCost", "cost is out of range"))?;

    Ok(CostEstimate {
        primary,
        secondary,
        organic,
        total,
    })
}

/// Free-text diagnosis from the scorer's status labels and deficiency flags.
pub fn soil_condition(reading: &SensorReading, soil: &SoilHealthResult) -> SoilCondition {
    // ---
    let mut recommendations = Vec::new();

    let ph_status = match soil.status_of(Parameter::Ph) {
        ParameterStatus::Low => {
            recommendations.push("Apply agricultural lime to raise soil pH".to_string());
            format!("Acidic (pH {:.1})", reading.ph)
        }
        ParameterStatus::High => {
            recommendations.push("Apply elemental sulfur or gypsum to lower soil pH".to_string());
            format!("Alkaline (pH {:.1})", reading.ph)
        }
        ParameterStatus::Optimal => format!("Optimal (pH {:.1})", reading.ph),
    };

    let moisture_status = match soil.status_of(Parameter::SoilMoisture) {
        ParameterStatus::Low => {
            recommendations
                .push("Irrigate before application; dry soil limits nutrient uptake".to_string());
            format!("Low ({:.0}%)", reading.soil_moisture)
        }
        ParameterStatus::High => {
            recommendations
                .push("Improve drainage and delay application to avoid leaching".to_string());
            format!("High ({:.0}%)", reading.soil_moisture)
        }
        ParameterStatus::Optimal => format!("Optimal ({:.0}%)", reading.soil_moisture),
    };

    for nutrient in &soil.nutrient_deficiencies {
        let line = match nutrient {
            Nutrient::Nitrogen => format!(
                "Nitrogen is deficient (below {} mg/kg): split nitrogen into top dressings",
                scoring::NITROGEN_DEFICIENT_BELOW
            ),
            Nutrient::Phosphorus => format!(
                "Phosphorus is deficient (below {} mg/kg): place phosphate near the root zone",
                scoring::PHOSPHORUS_DEFICIENT_BELOW
            ),
            Nutrient::Potassium => format!(
                "Potassium is deficient (below {} mg/kg): add potash before flowering",
                scoring::POTASSIUM_DEFICIENT_BELOW
            ),
        };
        recommendations.push(line);
    }

    if recommendations.is_empty() {
        recommendations
            .push("Soil conditions suit the recommended fertilizer program".to_string());
    }

    SoilCondition {
        ph_status,
        moisture_status,
        nutrient_deficiencies: soil.nutrient_deficiencies.clone(),
        recommendations,
    }
}
