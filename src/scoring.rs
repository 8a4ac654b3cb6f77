//! Soil health index and per-parameter status labels.
//!
//! Two independent layers live here: the weighted 0–100 index built from
//! the normalizer, and the discrete mg/kg deficiency flags. They are kept as
//! separate outputs on [`SoilHealthResult`].

use std::collections::BTreeMap;

use crate::models::{
    Nutrient, Parameter, ParameterStatus, SensorReading, SoilCategory, SoilHealthResult,
};
use crate::normalize::{clamp01, normalize};

// ---

/// Index weights; they sum to 1.
const WEIGHTS: [(Parameter, f64); 7] = [
    (Parameter::Nitrogen, 0.20),
    (Parameter::Phosphorus, 0.15),
    (Parameter::Potassium, 0.15),
    (Parameter::Ph, 0.15),
    (Parameter::SoilMoisture, 0.15),
    (Parameter::Temperature, 0.10),
    (Parameter::Humidity, 0.10),
];

/// `(low_below, high_above)` bounds for the status labels.
fn status_bounds(parameter: Parameter) -> (f64, f64) {
    // ---
    match parameter {
        Parameter::Nitrogen => (NITROGEN_DEFICIENT_BELOW, 180.0),
        Parameter::Phosphorus => (PHOSPHORUS_DEFICIENT_BELOW, 350.0),
        Parameter::Potassium => (POTASSIUM_DEFICIENT_BELOW, 350.0),
        Parameter::Ph => (6.0, 7.5),
        Parameter::SoilMoisture => (40.0, 80.0),
        Parameter::Temperature => (15.0, 35.0),
        Parameter::Humidity => (40.0, 80.0),
    }
}

pub const NITROGEN_DEFICIENT_BELOW: f64 = 30.0;
pub const PHOSPHORUS_DEFICIENT_BELOW: f64 = 15.0;
pub const POTASSIUM_DEFICIENT_BELOW: f64 = 120.0;

/// Score a reading.
pub fn score(reading: &SensorReading) -> SoilHealthResult {
    // ---
    let overall_score = overall_index(reading);

    let parameter_status: BTreeMap<Parameter, ParameterStatus> = Parameter::ALL
        .iter()
        .map(|&p| (p, parameter_status(p, p.value_in(reading))))
        .collect();

    let result = SoilHealthResult {
        overall_score,
        category: category_for(overall_score),
        display_category: display_category_for(overall_score),
        parameter_status,
        nutrient_deficiencies: nutrient_deficiencies(reading),
    };

    tracing::debug!(
        score = result.overall_score,
        category = %result.category,
        deficiencies = ?result.nutrient_deficiencies,
        "Scored soil reading"
    );

    result
}

/// Weighted sum of normalized scores, as an integer in `[0, 100]`.
pub fn overall_index(reading: &SensorReading) -> u8 {
    // ---
    let weighted: f64 = WEIGHTS
        .iter()
        .map(|&(p, w)| w * normalize(p, p.value_in(reading)))
        .sum();

    (100.0 * clamp01(weighted)).round().clamp(0.0, 100.0) as u8
}

/// Scoring-contract category; never returns `VeryPoor`.
pub fn category_for(score: u8) -> SoilCategory {
    // ---
    match score {
        80.. => SoilCategory::Excellent,
        60..=79 => SoilCategory::Good,
        40..=59 => SoilCategory::Moderate,
        _ => SoilCategory::Poor,
    }
}

/// Category for farmer-facing text, with the extra tier under 20.
pub fn display_category_for(score: u8) -> SoilCategory {
    if score < 20 {
        SoilCategory::VeryPoor
    } else {
        category_for(score)
    }
}

pub fn parameter_status(parameter: Parameter, raw: f64) -> ParameterStatus {
    // ---
    let (low_below, high_above) = status_bounds(parameter);
    if raw < low_below {
        ParameterStatus::Low
    } else if raw > high_above {
        ParameterStatus::High
    } else {
        ParameterStatus::Optimal
    }
}

/// Fixed mg/kg deficiency flags, regardless of the overall index.
pub fn nutrient_deficiencies(reading: &SensorReading) -> Vec<Nutrient> {
    // ---
    let mut deficient = Vec::new();
    if reading.nitrogen < NITROGEN_DEFICIENT_BELOW {
        deficient.push(Nutrient::Nitrogen);
    }
    if reading.phosphorus < PHOSPHORUS_DEFICIENT_BELOW {
        deficient.push(Nutrient::Phosphorus);
    }
    if reading.potassium < POTASSIUM_DEFICIENT_BELOW {
        deficient.push(Nutrient::Potassium);
    }
    deficient
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn reading(n: f64, p: f64, k: f64, ph: f64, moisture: f64, temp: f64, hum: f64) -> SensorReading {
        // ---
        SensorReading {
            nitrogen: n,
            phosphorus: p,
            potassium: k,
            ph,
            soil_moisture: moisture,
            soil_temperature: temp,
            ambient_temperature: temp + 3.0,
            humidity: hum,
            electrical_conductivity: 1.2,
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = WEIGHTS.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_worked_example() {
        // ---
        let r = reading(85.0, 65.0, 58.0, 5.2, 28.0, 24.0, 58.0);

        let expected: f64 = 0.20 * 1.0
            + 0.15 * (65.0 / 110.0)
            + 0.15 * (58.0 / 110.0)
            + 0.15 * (1.0 - 1.55 / 1.75)
            + 0.15 * 0.9
            + 0.10 * 0.9
            + 0.10 * 0.9;

        let result = score(&r);
        assert_eq!(result.overall_score, (expected * 100.0).round() as u8);
        assert_eq!(result.overall_score, 70);
        assert_eq!(result.category, SoilCategory::Good);
        assert_eq!(result.status_of(Parameter::Ph), ParameterStatus::Low);
        assert_eq!(result.status_of(Parameter::SoilMoisture), ParameterStatus::Low);
        assert_eq!(result.nutrient_deficiencies, vec![Nutrient::Potassium]);
    }

    #[test]
    fn test_ideal_reading_is_excellent() {
        // ---
        let result = score(&reading(120.0, 200.0, 200.0, 6.75, 30.0, 25.0, 60.0));
        assert_eq!(result.overall_score, 100);
        assert_eq!(result.category, SoilCategory::Excellent);
        assert!(result.nutrient_deficiencies.is_empty());
    }

    #[test]
    fn test_extreme_readings_stay_in_range() {
        // ---
        let zero = score(&reading(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0));
        assert_eq!(zero.overall_score, 0);
        assert_eq!(zero.category, SoilCategory::Poor);
        assert_eq!(zero.display_category, SoilCategory::VeryPoor);

        let huge = score(&reading(1e9, 1e9, 1e9, 1e9, 1e9, 1e9, 1e9));
        assert!(huge.overall_score <= 100);

        let negative = score(&reading(-50.0, -5.0, -1.0, -7.0, -30.0, -40.0, -10.0));
        assert_eq!(negative.overall_score, 0);
    }

    #[test]
    fn test_category_boundaries() {
        // ---
        assert_eq!(category_for(100), SoilCategory::Excellent);
        assert_eq!(category_for(80), SoilCategory::Excellent);
        assert_eq!(category_for(79), SoilCategory::Good);
        assert_eq!(category_for(60), SoilCategory::Good);
        assert_eq!(category_for(59), SoilCategory::Moderate);
        assert_eq!(category_for(40), SoilCategory::Moderate);
        assert_eq!(category_for(39), SoilCategory::Poor);
        assert_eq!(category_for(0), SoilCategory::Poor);

        assert_eq!(display_category_for(20), SoilCategory::Poor);
        assert_eq!(display_category_for(19), SoilCategory::VeryPoor);
        assert_eq!(display_category_for(85), SoilCategory::Excellent);
    }

    #[test]
    fn test_status_thresholds() {
        // ---
        assert_eq!(parameter_status(Parameter::Ph, 5.9), ParameterStatus::Low);
        assert_eq!(parameter_status(Parameter::Ph, 6.0), ParameterStatus::Optimal);
        assert_eq!(parameter_status(Parameter::Ph, 7.5), ParameterStatus::Optimal);
        assert_eq!(parameter_status(Parameter::Ph, 7.6), ParameterStatus::High);
        assert_eq!(parameter_status(Parameter::SoilMoisture, 39.0), ParameterStatus::Low);
        assert_eq!(parameter_status(Parameter::SoilMoisture, 81.0), ParameterStatus::High);
        assert_eq!(parameter_status(Parameter::Potassium, 119.0), ParameterStatus::Low);
        assert_eq!(parameter_status(Parameter::Potassium, 120.0), ParameterStatus::Optimal);
    }

    #[test]
    fn test_high_index_can_still_carry_deficiency() {
        // ---
        // phosphorus and potassium weigh little enough that the index stays high
        let r = reading(120.0, 14.0, 119.0, 6.75, 30.0, 25.0, 60.0);
        let result = score(&r);

        assert!(result.overall_score >= 60, "score {}", result.overall_score);
        assert!(result.is_deficient(Nutrient::Phosphorus));
        assert!(result.is_deficient(Nutrient::Potassium));
        assert!(!result.is_deficient(Nutrient::Nitrogen));
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let r = reading(33.3, 71.1, 140.0, 7.1, 44.0, 19.5, 71.0);
        assert_eq!(score(&r), score(&r));
    }
}
