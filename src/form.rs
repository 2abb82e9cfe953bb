//! Calculator form state
//!
//! Field values are kept as the user typed them and only interpreted on
//! submit. Numeric parsing is lenient in the same way browser number inputs
//! are read: a valid numeric prefix wins and trailing junk is ignored.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::age::{calculate_age_hours, describe_age};
use crate::chart::{PlotChoice, PlotScale};
use crate::error::BiliError;
use crate::risk::{assess, classify, Assessment, RiskTier};
use crate::thresholds::{calculate_thresholds, format_mgdl, GestationBucket, Neurotoxicity, Thresholds};

/// Initial values for the selectors, restored on reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormDefaults {
    pub gestation: GestationBucket,
    pub neurotoxicity: Neurotoxicity,
    pub plot_scale: PlotScale,
    pub plot_choice: PlotChoice,
}

/// Raw form fields
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormState {
    pub gestation: GestationBucket,
    pub age: String,
    pub bilirubin: String,
    pub neurotoxicity: Neurotoxicity,
    pub plot_scale: PlotScale,
    pub plot_choice: PlotChoice,
    pub date_of_birth: String,
    pub date_of_measurement: String,
}

impl FormState {
    pub fn from_defaults(defaults: &FormDefaults) -> Self {
        Self {
            gestation: defaults.gestation,
            neurotoxicity: defaults.neurotoxicity,
            plot_scale: defaults.plot_scale,
            plot_choice: defaults.plot_choice,
            ..Default::default()
        }
    }
}

/// Everything the results panel shows for one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub age: i64,
    pub age_description: String,
    /// Exactly as entered; `None` when left blank
    pub bilirubin: Option<f64>,
    pub gestation: GestationBucket,
    pub neurotoxicity: Neurotoxicity,
    pub has_risk_factors: bool,
    pub thresholds: Thresholds,
    pub risk_level: RiskTier,
    #[serde(flatten)]
    pub assessment: Assessment,
}

impl CalculationResult {
    /// Plain-text rendering of the results panel
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("Calculation Results\n");
        out.push_str(&format!("  Age:                {}\n", self.age_description));
        out.push_str(&format!("  Gestation:          {}\n", self.gestation.label()));
        out.push_str(&format!(
            "  Neurotoxicity Risk: {}\n",
            if self.has_risk_factors { "Present" } else { "Absent" }
        ));
        if let Some(bili) = self.bilirubin {
            out.push_str(&format!("  Bilirubin Level:    {} mg/dL\n", format_mgdl(bili)));
        }
        out.push_str("\nTreatment Thresholds:\n");
        out.push_str(&format!("  Phototherapy:       {}\n", self.thresholds.format_phototherapy()));
        out.push_str(&format!("  Exchange:           {}\n", self.thresholds.format_exchange()));

        out.push('\n');
        if self.bilirubin.is_some() {
            out.push_str(&format!("Risk Assessment: {} Risk\n", self.risk_level.label()));
            out.push_str(&format!("  {}\n", self.assessment.recommendation));
            out.push_str(&format!("  Confirmatory TSB:      {}\n", self.assessment.confirmatory));
            out.push_str(&format!("  Phototherapy:          {}\n", self.assessment.phototherapy));
            out.push_str(&format!("  Escalation of Care:    {}\n", self.assessment.escalation));
            if !self.assessment.exchange.is_empty() {
                out.push_str(&format!("  Exchange Transfusion:  {}\n", self.assessment.exchange));
            }
            out.push_str(&format!("  {}\n", self.assessment.discontinuation));
        } else {
            out.push_str(&format!("{}\n", self.assessment.recommendation));
        }

        out.push_str("\nFollow-up Actions:\n");
        for action in crate::risk::follow_up_actions(self.risk_level) {
            out.push_str(&format!("  - {}\n", action));
        }

        out.push_str("\nClinical Notes:\n");
        for note in crate::risk::clinical_notes(self.has_risk_factors) {
            out.push_str(&format!("  - {}\n", note));
        }
        out
    }
}

/// Read an integer the way `parseInt` does: leading digits, anything after ignored
pub fn parse_int_prefix(value: &str) -> Option<i64> {
    let s = value.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    s[..end].parse().ok()
}

/// Read a decimal the way `parseFloat` does
pub fn parse_float_prefix(value: &str) -> Option<f64> {
    let s = value.trim_start();
    let bytes = s.as_bytes();
    let digits = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let int_end = digits(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits(end + 1);
        mantissa_digits += frac_end - (end + 1);
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+') | Some(b'-')) {
            exp += 1;
        }
        let exp_end = digits(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

/// Age field: missing, unparseable or zero all count as "not entered"
pub fn parse_age(value: &str) -> Option<i64> {
    parse_int_prefix(value).filter(|&age| age != 0)
}

/// Bilirubin field: zero is treated as blank and shows thresholds only
pub fn parse_bilirubin(value: &str) -> Option<f64> {
    parse_float_prefix(value).filter(|&bili| bili != 0.0 && !bili.is_nan())
}

/// Run the full calculation for a form
pub fn evaluate(form: &FormState) -> Result<CalculationResult, BiliError> {
    let age = parse_age(&form.age).ok_or(BiliError::MissingAge)?;
    let bilirubin = parse_bilirubin(&form.bilirubin);
    let has_risk_factors = form.neurotoxicity.has_risk_factors();

    let thresholds = calculate_thresholds(age, form.gestation, has_risk_factors);
    let risk_level = classify(bilirubin, &thresholds);
    let assessment = assess(risk_level, bilirubin, &thresholds);

    debug!(
        "age={}h gestation={} risk={} -> phototherapy={} exchange={}",
        age,
        form.gestation.label(),
        has_risk_factors,
        thresholds.phototherapy,
        thresholds.exchange
    );

    Ok(CalculationResult {
        age,
        age_description: describe_age(age),
        bilirubin,
        gestation: form.gestation,
        neurotoxicity: form.neurotoxicity,
        has_risk_factors,
        thresholds,
        risk_level,
        assessment,
    })
}

/// The calculator component: form fields plus the last result
#[derive(Debug, Clone, Default)]
pub struct BiliCalculator {
    defaults: FormDefaults,
    pub form: FormState,
    calculated_age: Option<i64>,
    result: Option<CalculationResult>,
}

impl BiliCalculator {
    pub fn new(defaults: FormDefaults) -> Self {
        Self {
            defaults,
            form: FormState::from_defaults(&defaults),
            calculated_age: None,
            result: None,
        }
    }

    pub fn result(&self) -> Option<&CalculationResult> {
        self.result.as_ref()
    }

    pub fn calculated_age(&self) -> Option<i64> {
        self.calculated_age
    }

    /// Compute and replace the displayed result
    ///
    /// A missing age leaves the previous result in place.
    pub fn submit(&mut self) -> Result<&CalculationResult, BiliError> {
        let result = evaluate(&self.form).map_err(|e| {
            warn!("Submit rejected: {}", e);
            e
        })?;
        info!(
            "Calculated {} at {}h: {}",
            result.gestation.label(),
            result.age,
            result.risk_level.label()
        );
        Ok(&*self.result.insert(result))
    }

    /// Restore default fields and clear any result
    pub fn reset(&mut self) {
        self.form = FormState::from_defaults(&self.defaults);
        self.result = None;
        self.calculated_age = None;
        info!("Form reset");
    }

    /// Fill the age field from the two dates, if both are set
    pub fn calculate_age(&mut self) -> Result<Option<i64>, BiliError> {
        if self.form.date_of_birth.is_empty() || self.form.date_of_measurement.is_empty() {
            return Ok(None);
        }
        let hours = calculate_age_hours(&self.form.date_of_birth, &self.form.date_of_measurement)?;
        self.calculated_age = Some(hours);
        self.form.age = hours.to_string();
        info!("Calculated age: {} hours", hours);
        Ok(Some(hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator_with(age: &str, bilirubin: &str) -> BiliCalculator {
        let mut calc = BiliCalculator::new(FormDefaults::default());
        calc.form.age = age.to_string();
        calc.form.bilirubin = bilirubin.to_string();
        calc
    }

    #[test]
    fn test_int_prefix_parsing() {
        assert_eq!(parse_int_prefix("48"), Some(48));
        assert_eq!(parse_int_prefix("  48h"), Some(48));
        assert_eq!(parse_int_prefix("48.9"), Some(48));
        assert_eq!(parse_int_prefix("-5"), Some(-5));
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix("-"), None);
    }

    #[test]
    fn test_float_prefix_parsing() {
        assert_eq!(parse_float_prefix("12.5"), Some(12.5));
        assert_eq!(parse_float_prefix("12.5mg"), Some(12.5));
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("5."), Some(5.0));
        assert_eq!(parse_float_prefix("1e1"), Some(10.0));
        assert_eq!(parse_float_prefix("1e"), Some(1.0));
        assert_eq!(parse_float_prefix("-2"), Some(-2.0));
        assert_eq!(parse_float_prefix("."), None);
        assert_eq!(parse_float_prefix(""), None);
    }

    #[test]
    fn test_zero_counts_as_blank() {
        assert_eq!(parse_age("0"), None);
        assert_eq!(parse_bilirubin("0"), None);
        assert_eq!(parse_bilirubin("0.0"), None);
        assert_eq!(parse_bilirubin("-1.5"), Some(-1.5));
    }

    #[test]
    fn test_empty_age_blocks_submit() {
        let mut calc = calculator_with("", "12");
        let err = calc.submit().unwrap_err();
        assert!(matches!(err, BiliError::MissingAge));
        assert!(calc.result().is_none());
    }

    #[test]
    fn test_failed_submit_keeps_previous_result() {
        let mut calc = calculator_with("48", "12");
        calc.submit().unwrap();
        calc.form.age = "soon".to_string();
        assert!(calc.submit().is_err());
        assert_eq!(calc.result().unwrap().age, 48);
    }

    #[test]
    fn test_submit_sample() {
        let mut calc = calculator_with("48", "");
        let result = calc.submit().unwrap();
        assert!((result.thresholds.phototherapy - 17.0).abs() < 1e-9);
        assert!((result.thresholds.exchange - 20.0).abs() < 1e-9);
        assert_eq!(result.risk_level, RiskTier::ThresholdView);
        assert_eq!(result.age_description, "48 hours (2 days 0 hours)");
        assert_eq!(result.bilirubin, None);
    }

    #[test]
    fn test_submit_replaces_result() {
        let mut calc = calculator_with("48", "21");
        assert_eq!(calc.submit().unwrap().risk_level, RiskTier::Critical);
        calc.form.bilirubin = "5".to_string();
        assert_eq!(calc.submit().unwrap().risk_level, RiskTier::Low);
        assert_eq!(calc.result().unwrap().bilirubin, Some(5.0));
    }

    #[test]
    fn test_show_both_uses_risk_curve() {
        let mut calc = calculator_with("48", "");
        calc.form.neurotoxicity = Neurotoxicity::ShowBoth;
        let result = calc.submit().unwrap();
        assert!(result.has_risk_factors);
        assert!((result.thresholds.phototherapy - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_display_preferences_do_not_change_thresholds() {
        let mut calc = calculator_with("60", "16");
        let first = calc.submit().unwrap().clone();
        calc.form.plot_scale = PlotScale::FullSized;
        calc.form.plot_choice = PlotChoice::Original;
        let second = calc.submit().unwrap();
        assert_eq!(&first, second);
    }

    #[test]
    fn test_reset_clears_fields_and_result() {
        let defaults = FormDefaults {
            gestation: GestationBucket::Weeks37To38,
            ..Default::default()
        };
        let mut calc = BiliCalculator::new(defaults);
        calc.form.age = "48".to_string();
        calc.form.bilirubin = "14".to_string();
        calc.form.gestation = GestationBucket::Weeks35To36;
        calc.form.neurotoxicity = Neurotoxicity::AnyRisk;
        calc.form.date_of_birth = "2024-03-01T08:00".to_string();
        calc.form.date_of_measurement = "2024-03-03T08:00".to_string();
        calc.calculate_age().unwrap();
        calc.submit().unwrap();

        calc.reset();

        assert!(calc.result().is_none());
        assert!(calc.calculated_age().is_none());
        assert_eq!(calc.form, FormState::from_defaults(&defaults));
        assert_eq!(calc.form.gestation, GestationBucket::Weeks37To38);
    }

    #[test]
    fn test_calculate_age_fills_field() {
        let mut calc = BiliCalculator::new(FormDefaults::default());
        calc.form.date_of_birth = "2024-03-01T08:00".to_string();
        assert_eq!(calc.calculate_age().unwrap(), None);

        calc.form.date_of_measurement = "2024-03-03T10:30".to_string();
        assert_eq!(calc.calculate_age().unwrap(), Some(51));
        assert_eq!(calc.form.age, "51");
        assert_eq!(calc.calculated_age(), Some(51));
    }

    #[test]
    fn test_text_report() {
        let mut calc = calculator_with("48", "18");
        let text = calc.submit().unwrap().to_text();
        assert!(text.contains("Phototherapy:       17 mg/dL"));
        assert!(text.contains("Risk Assessment: Very High Risk"));
        assert!(text.contains("Neurotoxicity Risk: Absent"));
        assert!(text.contains("less than 13.0 mg/dL"));
    }

    #[test]
    fn test_json_shape() {
        let mut calc = calculator_with("48", "18");
        let json = serde_json::to_value(calc.submit().unwrap()).unwrap();
        assert_eq!(json["risk_level"], "Very High");
        assert_eq!(json["gestation"], "38 to 39 weeks");
        assert_eq!(json["neurotoxicity"], "no-risk");
        assert_eq!(json["recommendation"], "Intensive phototherapy + prepare for exchange");
    }
}
