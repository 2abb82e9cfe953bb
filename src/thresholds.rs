//! Phototherapy and exchange-transfusion thresholds
//!
//! Thresholds follow the AAP 2022 hyperbilirubinemia curves, approximated as
//! piecewise-linear segments over six age bands. Each curve is shifted down
//! for preterm gestation and for neurotoxicity risk factors, then floored.
//!
//! All values are in mg/dL and rounded to one decimal place.

use serde::{Deserialize, Serialize};

/// Gestational age at birth, as offered by the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GestationBucket {
    #[serde(rename = "35 to 36 weeks")]
    Weeks35To36,
    #[serde(rename = "37 to 38 weeks")]
    Weeks37To38,
    #[serde(rename = "38 to 39 weeks")]
    #[default]
    Weeks38To39,
    #[serde(rename = "39+ weeks")]
    Weeks39Plus,
}

impl GestationBucket {
    /// All buckets in the order the form lists them
    pub fn all() -> [GestationBucket; 4] {
        [
            GestationBucket::Weeks35To36,
            GestationBucket::Weeks37To38,
            GestationBucket::Weeks38To39,
            GestationBucket::Weeks39Plus,
        ]
    }

    /// Option label as shown in the gestation selector
    pub fn label(self) -> &'static str {
        match self {
            GestationBucket::Weeks35To36 => "35 to 36 weeks",
            GestationBucket::Weeks37To38 => "37 to 38 weeks",
            GestationBucket::Weeks38To39 => "38 to 39 weeks",
            GestationBucket::Weeks39Plus => "39+ weeks",
        }
    }

    /// Match a label by its week range, so "39+" and "39+ weeks" both resolve
    pub fn from_label(label: &str) -> Option<Self> {
        if label.contains("35 to 36") {
            Some(GestationBucket::Weeks35To36)
        } else if label.contains("37 to 38") {
            Some(GestationBucket::Weeks37To38)
        } else if label.contains("38 to 39") {
            Some(GestationBucket::Weeks38To39)
        } else if label.contains("39+") {
            Some(GestationBucket::Weeks39Plus)
        } else {
            None
        }
    }

    /// Completed weeks used by the offset rules
    pub fn weeks(self) -> u8 {
        match self {
            GestationBucket::Weeks35To36 => 36,
            GestationBucket::Weeks37To38 => 37,
            GestationBucket::Weeks38To39 => 38,
            GestationBucket::Weeks39Plus => 39,
        }
    }
}

/// Neurotoxicity risk selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Neurotoxicity {
    #[default]
    NoRisk,
    AnyRisk,
    ShowBoth,
}

impl Neurotoxicity {
    pub fn all() -> [Neurotoxicity; 3] {
        [Neurotoxicity::NoRisk, Neurotoxicity::AnyRisk, Neurotoxicity::ShowBoth]
    }

    /// Form value (`no-risk`, `any-risk`, `show-both`)
    pub fn value(self) -> &'static str {
        match self {
            Neurotoxicity::NoRisk => "no-risk",
            Neurotoxicity::AnyRisk => "any-risk",
            Neurotoxicity::ShowBoth => "show-both",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        match value.trim() {
            "no-risk" => Some(Neurotoxicity::NoRisk),
            "any-risk" => Some(Neurotoxicity::AnyRisk),
            "show-both" => Some(Neurotoxicity::ShowBoth),
            _ => None,
        }
    }

    /// Radio button label
    pub fn label(self) -> &'static str {
        match self {
            Neurotoxicity::NoRisk => "No risk factors",
            Neurotoxicity::AnyRisk => "ANY risk factors",
            Neurotoxicity::ShowBoth => "Show both",
        }
    }

    /// "Show both" computes against the lower, risk-adjusted curve
    pub fn has_risk_factors(self) -> bool {
        matches!(self, Neurotoxicity::AnyRisk | Neurotoxicity::ShowBoth)
    }
}

/// Treatment thresholds for one age/gestation/risk combination
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Phototherapy threshold in mg/dL
    pub phototherapy: f64,
    /// Exchange transfusion threshold in mg/dL
    pub exchange: f64,
}

impl Thresholds {
    /// Lowest phototherapy threshold ever reported
    pub const PHOTOTHERAPY_FLOOR: f64 = 8.0;
    /// Lowest exchange threshold ever reported
    pub const EXCHANGE_FLOOR: f64 = 12.0;

    pub fn format_phototherapy(&self) -> String {
        format!("{} mg/dL", format_mgdl(self.phototherapy))
    }

    pub fn format_exchange(&self) -> String {
        format!("{} mg/dL", format_mgdl(self.exchange))
    }
}

/// Format a bilirubin value the way the results panel shows it: no trailing ".0"
pub fn format_mgdl(value: f64) -> String {
    format!("{}", value)
}

/// Round half away from zero to one decimal place
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Compute both thresholds for an age in hours
///
/// The age is not clamped: values outside 1-336 hours are extrapolated on the
/// first band or held flat on the last one.
pub fn calculate_thresholds(age_hours: i64, gestation: GestationBucket, has_risk_factors: bool) -> Thresholds {
    let age = age_hours as f64;
    let weeks = gestation.weeks();

    Thresholds {
        phototherapy: round_tenth(phototherapy_threshold(age, weeks, has_risk_factors)),
        exchange: round_tenth(exchange_threshold(age, weeks, has_risk_factors)),
    }
}

fn phototherapy_threshold(age: f64, weeks: u8, has_risk_factors: bool) -> f64 {
    let mut threshold = if age <= 24.0 {
        12.0 + (age - 12.0) * 0.2
    } else if age <= 48.0 {
        15.0 + ((age - 24.0) / 24.0) * 2.0
    } else if age <= 72.0 {
        17.0 + ((age - 48.0) / 24.0) * 1.0
    } else if age <= 96.0 {
        18.0 + ((age - 72.0) / 24.0) * 1.0
    } else if age <= 120.0 {
        19.0 + ((age - 96.0) / 24.0) * 1.0
    } else {
        20.0
    };

    if weeks <= 36 {
        threshold -= 2.5;
    } else if weeks == 37 {
        threshold -= 1.5;
    }

    if has_risk_factors {
        threshold -= 2.0;
    }

    threshold.max(Thresholds::PHOTOTHERAPY_FLOOR)
}

fn exchange_threshold(age: f64, weeks: u8, has_risk_factors: bool) -> f64 {
    let mut threshold = if age <= 24.0 {
        15.0 + (age - 12.0) * 0.25
    } else if age <= 48.0 {
        18.0 + ((age - 24.0) / 24.0) * 2.0
    } else if age <= 72.0 {
        20.0 + ((age - 48.0) / 24.0) * 1.5
    } else if age <= 96.0 {
        21.5 + ((age - 72.0) / 24.0) * 1.5
    } else if age <= 120.0 {
        23.0 + ((age - 96.0) / 24.0) * 2.0
    } else {
        25.0
    };

    if weeks <= 36 {
        threshold -= 3.0;
    } else if weeks == 37 {
        threshold -= 2.0;
    }

    if has_risk_factors {
        threshold -= 3.0;
    }

    threshold.max(Thresholds::EXCHANGE_FLOOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {}, got {}", expected, actual);
    }

    #[test]
    fn test_sample_48h_term_no_risk() {
        let t = calculate_thresholds(48, GestationBucket::Weeks38To39, false);
        assert_close(t.phototherapy, 17.0);
        assert_close(t.exchange, 20.0);
    }

    #[test]
    fn test_band_endpoints() {
        let cases = [
            (12, 12.0, 15.0),
            (24, 14.4, 18.0),
            (48, 17.0, 20.0),
            (72, 18.0, 21.5),
            (96, 19.0, 23.0),
            (120, 20.0, 25.0),
            (200, 20.0, 25.0),
            (336, 20.0, 25.0),
        ];
        for (age, photo, exchange) in cases {
            let t = calculate_thresholds(age, GestationBucket::Weeks39Plus, false);
            assert_close(t.phototherapy, photo);
            assert_close(t.exchange, exchange);
        }
    }

    #[test]
    fn test_interpolation_is_rounded() {
        let t = calculate_thresholds(25, GestationBucket::Weeks38To39, false);
        assert_close(t.phototherapy, 15.1);
        assert_close(t.exchange, 18.1);

        let t = calculate_thresholds(60, GestationBucket::Weeks38To39, false);
        assert_close(t.phototherapy, 17.5);
        assert_close(t.exchange, 20.8);
    }

    #[test]
    fn test_ties_round_up() {
        // 15 + 1 * 0.25 = 15.25 exactly
        let t = calculate_thresholds(13, GestationBucket::Weeks38To39, false);
        assert_close(t.exchange, 15.3);
        assert_close(t.phototherapy, 12.2);
    }

    #[test]
    fn test_gestation_offsets() {
        let t = calculate_thresholds(48, GestationBucket::Weeks35To36, false);
        assert_close(t.phototherapy, 14.5);
        assert_close(t.exchange, 17.0);

        let t = calculate_thresholds(48, GestationBucket::Weeks37To38, false);
        assert_close(t.phototherapy, 15.5);
        assert_close(t.exchange, 18.0);
    }

    #[test]
    fn test_risk_offsets() {
        let t = calculate_thresholds(48, GestationBucket::Weeks38To39, true);
        assert_close(t.phototherapy, 15.0);
        assert_close(t.exchange, 17.0);

        let t = calculate_thresholds(48, GestationBucket::Weeks35To36, true);
        assert_close(t.phototherapy, 12.5);
        assert_close(t.exchange, 14.0);
    }

    #[test]
    fn test_floors() {
        let t = calculate_thresholds(1, GestationBucket::Weeks35To36, true);
        assert_close(t.phototherapy, Thresholds::PHOTOTHERAPY_FLOOR);
        assert_close(t.exchange, Thresholds::EXCHANGE_FLOOR);

        // Negative ages are extrapolated, then floored
        let t = calculate_thresholds(-100, GestationBucket::Weeks39Plus, false);
        assert_close(t.phototherapy, 8.0);
        assert_close(t.exchange, 12.0);
    }

    #[test]
    fn test_non_decreasing_within_bands() {
        let bands = [(1, 24), (25, 48), (49, 72), (73, 96), (97, 120), (121, 336)];
        for bucket in GestationBucket::all() {
            for risk in [false, true] {
                for (start, end) in bands {
                    let mut prev = calculate_thresholds(start, bucket, risk);
                    for age in start + 1..=end {
                        let t = calculate_thresholds(age, bucket, risk);
                        assert!(t.phototherapy >= prev.phototherapy, "photo drop at {}h", age);
                        assert!(t.exchange >= prev.exchange, "exchange drop at {}h", age);
                        prev = t;
                    }
                }
            }
        }
    }

    #[test]
    fn test_phototherapy_below_exchange_in_range() {
        for bucket in GestationBucket::all() {
            for risk in [false, true] {
                for age in 1..=336 {
                    let t = calculate_thresholds(age, bucket, risk);
                    assert!(t.phototherapy <= t.exchange, "{:?} {} {}h", bucket, risk, age);
                }
            }
        }
    }

    #[test]
    fn test_gestation_labels() {
        for bucket in GestationBucket::all() {
            assert_eq!(GestationBucket::from_label(bucket.label()), Some(bucket));
        }
        assert_eq!(GestationBucket::from_label("39+"), Some(GestationBucket::Weeks39Plus));
        assert_eq!(GestationBucket::from_label("40 weeks"), None);
        assert_eq!(GestationBucket::default().weeks(), 38);
    }

    #[test]
    fn test_neurotoxicity_flag() {
        assert!(!Neurotoxicity::NoRisk.has_risk_factors());
        assert!(Neurotoxicity::AnyRisk.has_risk_factors());
        assert!(Neurotoxicity::ShowBoth.has_risk_factors());
        assert_eq!(Neurotoxicity::from_value("show-both"), Some(Neurotoxicity::ShowBoth));
        assert_eq!(Neurotoxicity::from_value("maybe"), None);
    }

    #[test]
    fn test_threshold_display() {
        let t = calculate_thresholds(48, GestationBucket::Weeks38To39, false);
        assert_eq!(t.format_phototherapy(), "17 mg/dL");
        assert_eq!(t.format_exchange(), "20 mg/dL");
        let t = calculate_thresholds(60, GestationBucket::Weeks38To39, false);
        assert_eq!(t.format_exchange(), "20.8 mg/dL");
    }
}
