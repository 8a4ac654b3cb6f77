//! Data models shared by the scoring core and the HTTP layer.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AdvisorError;

// ---

/// One sensor snapshot for a field, as supplied by the ingestion side.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    // ---
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    #[serde(rename = "pH", alias = "ph")]
    pub ph: f64,
    pub soil_moisture: f64,
    pub soil_temperature: f64,
    pub ambient_temperature: f64,
    pub humidity: f64,
    #[serde(default)]
    pub electrical_conductivity: f64,
}

impl SensorReading {
    // ---
    fn fields(&self) -> [(&'static str, f64); 9] {
        [
            ("nitrogen", self.nitrogen),
            ("phosphorus", self.phosphorus),
            ("potassium", self.potassium),
            ("pH", self.ph),
            ("soilMoisture", self.soil_moisture),
            ("soilTemperature", self.soil_temperature),
            ("ambientTemperature", self.ambient_temperature),
            ("humidity", self.humidity),
            ("electricalConductivity", self.electrical_conductivity),
        ]
    }

    /// Reject NaN and infinite values before they reach cost or quantity math.
    pub fn validate(&self) -> Result<(), AdvisorError> {
        // ---
        for (field, value) in self.fields() {
            if !value.is_finite() {
                return Err(AdvisorError::validation(field, "must be a finite number"));
            }
        }
        Ok(())
    }
}

/// The seven parameters that feed the soil health index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Parameter {
    Nitrogen,
    Phosphorus,
    Potassium,
    Ph,
    SoilMoisture,
    Temperature,
    Humidity,
}

impl Parameter {
    pub const ALL: [Parameter; 7] = [
        Parameter::Nitrogen,
        Parameter::Phosphorus,
        Parameter::Potassium,
        Parameter::Ph,
        Parameter::SoilMoisture,
        Parameter::Temperature,
        Parameter::Humidity,
    ];

    /// Raw value of this parameter in a reading. Temperature is the soil probe.
    pub fn value_in(self, reading: &SensorReading) -> f64 {
        // ---
        match self {
            Parameter::Nitrogen => reading.nitrogen,
            Parameter::Phosphorus => reading.phosphorus,
            Parameter::Potassium => reading.potassium,
            Parameter::Ph => reading.ph,
            Parameter::SoilMoisture => reading.soil_moisture,
            Parameter::Temperature => reading.soil_temperature,
            Parameter::Humidity => reading.humidity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ParameterStatus {
    Low,
    Optimal,
    High,
}

/// Macronutrients that can be flagged deficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Nutrient {
    Nitrogen,
    Phosphorus,
    Potassium,
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Nutrient::Nitrogen => "Nitrogen",
            Nutrient::Phosphorus => "Phosphorus",
            Nutrient::Potassium => "Potassium",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SoilCategory {
    Excellent,
    Good,
    Moderate,
    Poor,
    VeryPoor,
}

impl fmt::Display for SoilCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SoilCategory::Excellent => "Excellent",
            SoilCategory::Good => "Good",
            SoilCategory::Moderate => "Moderate",
            SoilCategory::Poor => "Poor",
            SoilCategory::VeryPoor => "Very Poor",
        };
        f.write_str(label)
    }
}

/// Output of the soil health scorer.
///
/// `overall_score` and `nutrient_deficiencies` are computed independently:
/// a field can score Excellent and still carry a deficiency flag.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilHealthResult {
    // ---
    pub overall_score: u8,
    pub category: SoilCategory,
    /// Same as `category` except scores under 20 read `VeryPoor`.
    pub display_category: SoilCategory,
    pub parameter_status: BTreeMap<Parameter, ParameterStatus>,
    pub nutrient_deficiencies: Vec<Nutrient>,
}

impl SoilHealthResult {
    pub fn status_of(&self, parameter: Parameter) -> ParameterStatus {
        self.parameter_status
            .get(&parameter)
            .copied()
            .unwrap_or(ParameterStatus::Optimal)
    }

    pub fn is_deficient(&self, nutrient: Nutrient) -> bool {
        self.nutrient_deficiencies.contains(&nutrient)
    }
}

/// A fertilizer pick, in the same shape the ML backend answers with.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FertilizerChoice {
    pub fertilizer: String,
    pub confidence: f64,
}

/// Where a fertilizer choice came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionSource {
    Model,
    Fallback,
}

// ---

/// A numeric form field; dashboards post either JSON numbers or the raw text box.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FormValue {
    Number(f64),
    Text(String),
}

impl FormValue {
    /// Parse into a finite `f64`, never defaulting.
    pub fn to_number(&self, field: &'static str) -> Result<f64, AdvisorError> {
        // ---
        let value = match self {
            FormValue::Number(n) => *n,
            FormValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| AdvisorError::validation(field, "is not a number"))?,
        };

        if !value.is_finite() {
            return Err(AdvisorError::validation(field, "must be a finite number"));
        }
        Ok(value)
    }
}

/// Require a present, numeric form field.
pub fn require_number(field: &'static str, value: Option<&FormValue>) -> Result<f64, AdvisorError> {
    // ---
    value
        .ok_or_else(|| AdvisorError::validation(field, "is required"))?
        .to_number(field)
}

/// Sensor values as they arrive from the recommendation form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingForm {
    // ---
    pub nitrogen: Option<FormValue>,
    pub phosphorus: Option<FormValue>,
    pub potassium: Option<FormValue>,
    #[serde(rename = "pH", alias = "ph")]
    pub ph: Option<FormValue>,
    pub soil_moisture: Option<FormValue>,
    pub soil_temperature: Option<FormValue>,
    pub ambient_temperature: Option<FormValue>,
    pub humidity: Option<FormValue>,
    pub electrical_conductivity: Option<FormValue>,
}

impl ReadingForm {
    /// Convert to a [`SensorReading`]; electrical conductivity is optional.
    pub fn to_reading(&self) -> Result<SensorReading, AdvisorError> {
        // ---
        let electrical_conductivity = match &self.electrical_conductivity {
            Some(v) => v.to_number("electricalConductivity")?,
            None => 0.0,
        };

        Ok(SensorReading {
            nitrogen: require_number("nitrogen", self.nitrogen.as_ref())?,
            phosphorus: require_number("phosphorus", self.phosphorus.as_ref())?,
            potassium: require_number("potassium", self.potassium.as_ref())?,
            ph: require_number("pH", self.ph.as_ref())?,
            soil_moisture: require_number("soilMoisture", self.soil_moisture.as_ref())?,
            soil_temperature: require_number("soilTemperature", self.soil_temperature.as_ref())?,
            ambient_temperature: require_number(
                "ambientTemperature",
                self.ambient_temperature.as_ref(),
            )?,
            humidity: require_number("humidity", self.humidity.as_ref())?,
            electrical_conductivity,
        })
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn num(v: f64) -> Option<FormValue> {
        Some(FormValue::Number(v))
    }

    fn complete_form() -> ReadingForm {
        // ---
        ReadingForm {
            nitrogen: num(85.0),
            phosphorus: Some(FormValue::Text(" 65 ".to_string())),
            potassium: num(58.0),
            ph: Some(FormValue::Text("5.2".to_string())),
            soil_moisture: num(28.0),
            soil_temperature: num(24.0),
            ambient_temperature: num(27.0),
            humidity: num(58.0),
            electrical_conductivity: None,
        }
    }

    #[test]
    fn test_form_text_values_parse() {
        // ---
        let reading = complete_form().to_reading().unwrap();
        assert_eq!(reading.phosphorus, 65.0);
        assert_eq!(reading.ph, 5.2);
        assert_eq!(reading.electrical_conductivity, 0.0);
    }

    #[test]
    fn test_form_rejects_garbage_instead_of_zero() {
        // ---
        let mut form = complete_form();
        form.potassium = Some(FormValue::Text("lots".to_string()));

        let err = form.to_reading().unwrap_err();
        assert!(err.to_string().contains("potassium"));
    }

    #[test]
    fn test_form_rejects_missing_field() {
        // ---
        let mut form = complete_form();
        form.humidity = None;

        let err = form.to_reading().unwrap_err();
        assert!(err.to_string().contains("humidity"));
    }

    #[test]
    fn test_form_rejects_non_finite_text() {
        // ---
        let mut form = complete_form();
        form.nitrogen = Some(FormValue::Text("NaN".to_string()));
        assert!(form.to_reading().is_err());

        form.nitrogen = Some(FormValue::Text("inf".to_string()));
        assert!(form.to_reading().is_err());
    }

    #[test]
    fn test_reading_validate_flags_nan() {
        // ---
        let mut reading = complete_form().to_reading().unwrap();
        assert!(reading.validate().is_ok());

        reading.soil_moisture = f64::NAN;
        let err = reading.validate().unwrap_err();
        assert!(err.to_string().contains("soilMoisture"));
    }

    #[test]
    fn test_reading_json_shape() {
        // ---
        let json = r#"{
            "nitrogen": 40, "phosphorus": 20, "potassium": 150, "pH": 6.5,
            "soilMoisture": 45, "soilTemperature": 22, "ambientTemperature": 28,
            "humidity": 60
        }"#;
        let reading: SensorReading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.ph, 6.5);
        assert_eq!(reading.electrical_conductivity, 0.0);
    }
}
