//! Per-parameter desirability curves.
//!
//! Every curve maps a raw sensor value to `[0, 1]`, where 1 is agronomically
//! ideal. Nutrients use a ramp/plateau/decay shape; pH and the climate
//! parameters use a triangle around their optimum. Results are always
//! clamped, so negative or absurd readings simply score 0.

use crate::models::Parameter;

// ---

/// Ramp from 0 at zero up to 1 at `full`, flat until `plateau_end`,
/// then linear back to 0 at `zero_at`.
fn ramp_plateau_decay(value: f64, full: f64, plateau_end: f64, zero_at: f64) -> f64 {
    // ---
    let score = if value <= full {
        value / full
    } else if value <= plateau_end {
        1.0
    } else {
        (zero_at - value) / (zero_at - plateau_end)
    };
    clamp01(score)
}

/// Peak of 1 at `optimum`, falling to 0 at `optimum ± half_width`.
fn triangle(value: f64, optimum: f64, half_width: f64) -> f64 {
    clamp01(1.0 - (value - optimum).abs() / half_width)
}

pub fn clamp01(value: f64) -> f64 {
    // NaN compares false everywhere; treat it as worst case
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Normalize one raw reading to a `[0, 1]` score.
pub fn normalize(parameter: Parameter, raw: f64) -> f64 {
    // ---
    if !raw.is_finite() {
        return 0.0;
    }

    match parameter {
        Parameter::Nitrogen => ramp_plateau_decay(raw, 80.0, 180.0, 240.0),
        Parameter::Phosphorus => ramp_plateau_decay(raw, 110.0, 350.0, 400.0),
        Parameter::Potassium => ramp_plateau_decay(raw, 110.0, 350.0, 400.0),
        Parameter::Ph => triangle(raw, 6.75, 1.75),
        Parameter::SoilMoisture => triangle(raw, 30.0, 20.0),
        Parameter::Temperature => triangle(raw, 25.0, 10.0),
        Parameter::Humidity => triangle(raw, 60.0, 20.0),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_nitrogen_curve() {
        // ---
        assert!(approx(normalize(Parameter::Nitrogen, 0.0), 0.0));
        assert!(approx(normalize(Parameter::Nitrogen, 40.0), 0.5));
        assert!(approx(normalize(Parameter::Nitrogen, 80.0), 1.0));
        assert!(approx(normalize(Parameter::Nitrogen, 180.0), 1.0));
        assert!(approx(normalize(Parameter::Nitrogen, 210.0), 0.5));
        assert!(approx(normalize(Parameter::Nitrogen, 240.0), 0.0));
        assert!(approx(normalize(Parameter::Nitrogen, 500.0), 0.0));
    }

    #[test]
    fn test_phosphorus_and_potassium_curves() {
        // ---
        for p in [Parameter::Phosphorus, Parameter::Potassium] {
            assert!(approx(normalize(p, 55.0), 0.5));
            assert!(approx(normalize(p, 110.0), 1.0));
            assert!(approx(normalize(p, 350.0), 1.0));
            assert!(approx(normalize(p, 375.0), 0.5));
            assert!(approx(normalize(p, 400.0), 0.0));
            assert!(approx(normalize(p, 1_000.0), 0.0));
        }
    }

    #[test]
    fn test_ph_triangle() {
        // ---
        assert!(approx(normalize(Parameter::Ph, 6.75), 1.0));
        assert!(approx(normalize(Parameter::Ph, 5.0), 0.0));
        assert!(approx(normalize(Parameter::Ph, 8.5), 0.0));
        assert!(approx(normalize(Parameter::Ph, 4.0), 0.0));
        assert!(approx(normalize(Parameter::Ph, 14.0), 0.0));

        // 1 - 1.55 / 1.75
        let acidic = normalize(Parameter::Ph, 5.2);
        assert!((acidic - 0.114_285_7).abs() < 1e-6, "got {}", acidic);
    }

    #[test]
    fn test_climate_triangles() {
        // ---
        assert!(approx(normalize(Parameter::SoilMoisture, 30.0), 1.0));
        assert!(approx(normalize(Parameter::SoilMoisture, 40.0), 0.5));
        assert!(approx(normalize(Parameter::SoilMoisture, 55.0), 0.0));
        assert!(approx(normalize(Parameter::Temperature, 25.0), 1.0));
        assert!(approx(normalize(Parameter::Temperature, 20.0), 0.5));
        assert!(approx(normalize(Parameter::Temperature, 40.0), 0.0));
        assert!(approx(normalize(Parameter::Humidity, 60.0), 1.0));
        assert!(approx(normalize(Parameter::Humidity, 70.0), 0.5));
        assert!(approx(normalize(Parameter::Humidity, 0.0), 0.0));
    }

    #[test]
    fn test_always_in_unit_interval() {
        // ---
        let samples = [
            -1.0e12, -500.0, -1.0, -0.0, 0.0, 0.5, 7.0, 30.0, 81.0, 199.0, 351.0, 399.9, 1.0e6,
            f64::MAX, f64::MIN,
        ];
        for parameter in Parameter::ALL {
            for raw in samples {
                let score = normalize(parameter, raw);
                assert!(
                    (0.0..=1.0).contains(&score),
                    "{:?}({}) = {} out of range",
                    parameter,
                    raw,
                    score
                );
            }
        }
    }

    #[test]
    fn test_non_finite_scores_zero() {
        // ---
        for parameter in Parameter::ALL {
            assert_eq!(normalize(parameter, f64::NAN), 0.0);
            assert_eq!(normalize(parameter, f64::INFINITY), 0.0);
            assert_eq!(normalize(parameter, f64::NEG_INFINITY), 0.0);
        }
    }
}
