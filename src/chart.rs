//! Bilirubin nomogram
//!
//! Renders the result chart as a standalone SVG document. The "original"
//! plot is the fixed illustrative figure; the custom plot draws the curves
//! produced by the threshold function for the selected gestation.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::form::CalculationResult;
use crate::thresholds::{calculate_thresholds, GestationBucket, Neurotoxicity};

/// Horizontal extent of the custom plot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlotScale {
    #[default]
    Automatic,
    FullSized,
}

impl PlotScale {
    pub fn all() -> [PlotScale; 2] {
        [PlotScale::Automatic, PlotScale::FullSized]
    }

    pub fn value(self) -> &'static str {
        match self {
            PlotScale::Automatic => "automatic",
            PlotScale::FullSized => "full-sized",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        match value.trim() {
            "automatic" => Some(PlotScale::Automatic),
            "full-sized" => Some(PlotScale::FullSized),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlotScale::Automatic => "Automatic",
            PlotScale::FullSized => "Full-sized",
        }
    }

    /// Hours covered by the x axis
    ///
    /// Automatic shows the first week, widened to whole days when the patient
    /// is older than that.
    pub fn span_hours(self, age: Option<i64>) -> i64 {
        match self {
            PlotScale::FullSized => FULL_SPAN_HOURS,
            PlotScale::Automatic => {
                let age = age.unwrap_or(0).max(0);
                let days = (age + 23) / 24;
                (days * 24).max(AUTOMATIC_SPAN_HOURS)
            }
        }
    }
}

/// Which figure to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlotChoice {
    #[default]
    #[serde(rename = "peditools")]
    PediTools,
    Original,
}

impl PlotChoice {
    pub fn all() -> [PlotChoice; 2] {
        [PlotChoice::PediTools, PlotChoice::Original]
    }

    pub fn value(self) -> &'static str {
        match self {
            PlotChoice::PediTools => "peditools",
            PlotChoice::Original => "original",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        match value.trim() {
            "peditools" => Some(PlotChoice::PediTools),
            "original" => Some(PlotChoice::Original),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlotChoice::PediTools => "PediTools custom",
            PlotChoice::Original => "Original publication",
        }
    }
}

pub const AUTOMATIC_SPAN_HOURS: i64 = 168;
pub const FULL_SPAN_HOURS: i64 = 336;

// SVG frame, shared by both figures
const VIEW_WIDTH: f64 = 400.0;
const VIEW_HEIGHT: f64 = 200.0;
const AXIS_LEFT: f64 = 40.0;
const AXIS_RIGHT: f64 = 360.0;
const AXIS_BOTTOM: f64 = 160.0;
const AXIS_TOP: f64 = 20.0;
const PX_PER_MGDL: f64 = 4.0;

// Hand-placed curves of the original figure, in SVG coordinates
const ORIGINAL_PHOTOTHERAPY: [(f64, f64); 6] =
    [(60.0, 140.0), (100.0, 120.0), (140.0, 110.0), (180.0, 100.0), (220.0, 95.0), (300.0, 90.0)];
const ORIGINAL_EXCHANGE: [(f64, f64); 6] =
    [(60.0, 120.0), (100.0, 100.0), (140.0, 90.0), (180.0, 80.0), (220.0, 75.0), (300.0, 70.0)];
const ORIGINAL_PX_PER_HOUR: f64 = 1.5;

const PHOTOTHERAPY_COLOR: &str = "#f59e0b";
const EXCHANGE_COLOR: &str = "#dc2626";
const PATIENT_COLOR: &str = "#059669";
const AXIS_COLOR: &str = "#374151";

/// One sample of both threshold curves
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub age: i64,
    pub phototherapy: f64,
    pub exchange: f64,
}

/// Sample the threshold curves hourly from 1 h up to `max_hours`
pub fn sample_curves(gestation: GestationBucket, has_risk_factors: bool, max_hours: i64) -> Vec<CurvePoint> {
    (1..=max_hours.max(1))
        .map(|age| {
            let t = calculate_thresholds(age, gestation, has_risk_factors);
            CurvePoint { age, phototherapy: t.phototherapy, exchange: t.exchange }
        })
        .collect()
}

/// The original figure's curves as `[hours, mg/dL]` pairs, for the GUI plot
///
/// Uses the same scaling as the figure's patient marker.
pub fn original_curves() -> (Vec<[f64; 2]>, Vec<[f64; 2]>) {
    let to_data = |&(x, y): &(f64, f64)| [(x - AXIS_LEFT) / ORIGINAL_PX_PER_HOUR, (AXIS_BOTTOM - y) / PX_PER_MGDL];
    (
        ORIGINAL_PHOTOTHERAPY.iter().map(to_data).collect(),
        ORIGINAL_EXCHANGE.iter().map(to_data).collect(),
    )
}

/// Curve sets to draw: `(label suffix, has_risk_factors)`
pub fn curve_variants(neurotoxicity: Neurotoxicity) -> Vec<(&'static str, bool)> {
    match neurotoxicity {
        Neurotoxicity::NoRisk => vec![("", false)],
        Neurotoxicity::AnyRisk => vec![("", true)],
        Neurotoxicity::ShowBoth => vec![(" (no risk)", false), (" (risk)", true)],
    }
}

/// Patient marker is only drawn for a positive measurement
pub fn plotted_bilirubin(result: &CalculationResult) -> Option<f64> {
    result.bilirubin.filter(|&b| b > 0.0)
}

/// Caption shown under the chart
pub fn caption(result: &CalculationResult) -> String {
    let mut caption = format!(
        "Age-specific bilirubin thresholds for {} gestation",
        result.gestation.label()
    );
    if result.has_risk_factors {
        caption.push_str(" with neurotoxicity risk factors");
    }
    caption
}

/// Render the nomogram for a result
pub fn render_svg(result: &CalculationResult, scale: PlotScale, choice: PlotChoice) -> String {
    let body = match choice {
        PlotChoice::Original => original_body(result),
        PlotChoice::PediTools => custom_body(result, scale),
    };

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}" font-family="sans-serif" font-size="10">
<title>{title}</title>
<defs>
<pattern id="grid" width="20" height="20" patternUnits="userSpaceOnUse">
<path d="M 20 0 L 0 0 0 20" fill="none" stroke="#e5e7eb" stroke-width="1"/>
</pattern>
</defs>
<rect width="{w}" height="{h}" fill="url(#grid)"/>
<line x1="{l}" y1="{b}" x2="{r}" y2="{b}" stroke="{axis}" stroke-width="2"/>
<line x1="{l}" y1="{b}" x2="{l}" y2="{t}" stroke="{axis}" stroke-width="2"/>
{body}</svg>
"##,
        w = VIEW_WIDTH,
        h = VIEW_HEIGHT,
        l = AXIS_LEFT,
        r = AXIS_RIGHT,
        b = AXIS_BOTTOM,
        t = AXIS_TOP,
        axis = AXIS_COLOR,
        title = caption(result),
        body = body,
    )
}

fn bilirubin_labels(out: &mut String) {
    for mg_dl in [5, 10, 15, 20, 25, 30] {
        let y = AXIS_BOTTOM - mg_dl as f64 * PX_PER_MGDL + 5.0;
        let _ = writeln!(
            out,
            r#"<text x="35" y="{}" text-anchor="end" fill="{}">{}</text>"#,
            y, AXIS_COLOR, mg_dl
        );
    }
}

fn legend(out: &mut String, entries: &[(String, &str, bool)], show_patient: bool) {
    out.push_str("<g transform=\"translate(250, 30)\">\n");
    let mut y = 0.0;
    for (label, color, dashed) in entries {
        let dash = if *dashed { r#" stroke-dasharray="5,5""# } else { "" };
        let _ = writeln!(
            out,
            r#"<line x1="0" y1="{y}" x2="20" y2="{y}" stroke="{color}" stroke-width="3"{dash}/>"#,
        );
        let _ = writeln!(out, r#"<text x="25" y="{}" fill="{}">{}</text>"#, y + 4.0, color, label);
        y += 15.0;
    }
    if show_patient {
        let _ = writeln!(out, r#"<circle cx="10" cy="{}" r="4" fill="{}"/>"#, y, PATIENT_COLOR);
        let _ = writeln!(out, r#"<text x="25" y="{}" fill="{}">Patient</text>"#, y + 4.0, PATIENT_COLOR);
    }
    out.push_str("</g>\n");
}

fn patient_marker(out: &mut String, cx: f64, cy: f64) {
    let _ = writeln!(
        out,
        r##"<circle cx="{}" cy="{}" r="5" fill="{}" stroke="#ffffff" stroke-width="2"/>"##,
        cx, cy, PATIENT_COLOR
    );
}

/// The fixed figure: hand-placed curves and a loosely scaled patient marker
fn original_body(result: &CalculationResult) -> String {
    let mut out = String::new();

    for (x, label) in [(80, "24h"), (120, "48h"), (160, "72h"), (200, "96h"), (240, "120h"), (320, "168h")] {
        let _ = writeln!(
            out,
            r#"<text x="{}" y="175" text-anchor="middle" fill="{}">{}</text>"#,
            x, AXIS_COLOR, label
        );
    }
    bilirubin_labels(&mut out);

    let _ = writeln!(
        out,
        r#"<path d="{}" fill="none" stroke="{}" stroke-width="3" stroke-dasharray="5,5"/>"#,
        polyline(ORIGINAL_PHOTOTHERAPY.iter().copied()),
        PHOTOTHERAPY_COLOR
    );
    let _ = writeln!(
        out,
        r#"<path d="{}" fill="none" stroke="{}" stroke-width="3"/>"#,
        polyline(ORIGINAL_EXCHANGE.iter().copied()),
        EXCHANGE_COLOR
    );

    let bili = plotted_bilirubin(result);
    if let Some(bili) = bili {
        patient_marker(
            &mut out,
            AXIS_LEFT + result.age as f64 * ORIGINAL_PX_PER_HOUR,
            AXIS_BOTTOM - bili * PX_PER_MGDL,
        );
    }

    let entries = [
        ("Phototherapy".to_string(), PHOTOTHERAPY_COLOR, true),
        ("Exchange".to_string(), EXCHANGE_COLOR, false),
    ];
    legend(&mut out, &entries, bili.is_some());
    out
}

fn x_for_age(age: f64, span: i64) -> f64 {
    AXIS_LEFT + age * (AXIS_RIGHT - AXIS_LEFT) / span as f64
}

fn y_for_bilirubin(bili: f64) -> f64 {
    (AXIS_BOTTOM - bili * PX_PER_MGDL).max(AXIS_TOP - 10.0)
}

fn polyline(points: impl Iterator<Item = (f64, f64)>) -> String {
    let mut d = String::new();
    for (i, (x, y)) in points.enumerate() {
        let cmd = if i == 0 { "M" } else { " L" };
        let _ = write!(d, "{} {} {}", cmd, round_px(x), round_px(y));
    }
    d
}

fn round_px(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Curves computed from the threshold function, scaled to the plot span
fn custom_body(result: &CalculationResult, scale: PlotScale) -> String {
    let mut out = String::new();
    let span = scale.span_hours(Some(result.age));
    let tick = 24 * ((span + AUTOMATIC_SPAN_HOURS - 1) / AUTOMATIC_SPAN_HOURS);

    let mut hour = tick;
    while hour <= span {
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="175" text-anchor="middle" fill="{}">{}h</text>"#,
            x_for_age(hour as f64, span),
            AXIS_COLOR,
            hour
        );
        hour += tick;
    }
    bilirubin_labels(&mut out);

    let variants = curve_variants(result.neurotoxicity);
    let mut entries = Vec::new();
    for (suffix, has_risk) in &variants {
        let points = sample_curves(result.gestation, *has_risk, span);
        // Risk curves are drawn thinner so both sets stay readable
        let width = if *has_risk && variants.len() > 1 { 2 } else { 3 };

        let photo = polyline(points.iter().map(|p| (x_for_age(p.age as f64, span), y_for_bilirubin(p.phototherapy))));
        let exchange = polyline(points.iter().map(|p| (x_for_age(p.age as f64, span), y_for_bilirubin(p.exchange))));
        let _ = writeln!(
            out,
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="{}" stroke-dasharray="5,5"/>"#,
            photo, PHOTOTHERAPY_COLOR, width
        );
        let _ = writeln!(
            out,
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
            exchange, EXCHANGE_COLOR, width
        );
        entries.push((format!("Phototherapy{}", suffix), PHOTOTHERAPY_COLOR, true));
        entries.push((format!("Exchange{}", suffix), EXCHANGE_COLOR, false));
    }

    let bili = plotted_bilirubin(result);
    if let Some(bili) = bili {
        patient_marker(&mut out, x_for_age(result.age as f64, span), y_for_bilirubin(bili));
    }

    legend(&mut out, &entries, bili.is_some());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{evaluate, FormState};

    fn result_for(age: &str, bili: &str, neurotoxicity: Neurotoxicity) -> CalculationResult {
        let form = FormState {
            age: age.to_string(),
            bilirubin: bili.to_string(),
            neurotoxicity,
            ..Default::default()
        };
        evaluate(&form).unwrap()
    }

    #[test]
    fn test_span_hours() {
        assert_eq!(PlotScale::Automatic.span_hours(None), 168);
        assert_eq!(PlotScale::Automatic.span_hours(Some(48)), 168);
        assert_eq!(PlotScale::Automatic.span_hours(Some(200)), 216);
        assert_eq!(PlotScale::FullSized.span_hours(Some(48)), 336);
    }

    #[test]
    fn test_sample_curves() {
        let points = sample_curves(GestationBucket::Weeks38To39, false, 168);
        assert_eq!(points.len(), 168);
        assert_eq!(points[0].age, 1);
        let at_48 = points[47];
        assert_eq!(at_48.age, 48);
        assert!((at_48.phototherapy - 17.0).abs() < 1e-9);
        assert!((at_48.exchange - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_original_figure_patient_point() {
        let result = result_for("48", "12", Neurotoxicity::NoRisk);
        let svg = render_svg(&result, PlotScale::Automatic, PlotChoice::Original);
        assert!(svg.contains(r#"<circle cx="112" cy="112" r="5""#));
        assert!(svg.contains("M 60 140 L 100 120"));
        assert!(svg.contains(">Patient</text>"));
    }

    #[test]
    fn test_no_patient_point_without_bilirubin() {
        let result = result_for("48", "", Neurotoxicity::NoRisk);
        for choice in PlotChoice::all() {
            let svg = render_svg(&result, PlotScale::Automatic, choice);
            assert!(!svg.contains("Patient"));
            assert!(!svg.contains(r#"r="5""#));
        }
    }

    #[test]
    fn test_custom_figure_show_both() {
        let result = result_for("48", "14", Neurotoxicity::ShowBoth);
        let svg = render_svg(&result, PlotScale::FullSized, PlotChoice::PediTools);
        assert!(svg.contains("Phototherapy (no risk)"));
        assert!(svg.contains("Exchange (risk)"));
        assert!(svg.contains(">336h</text>"));
        assert_eq!(svg.matches("<path d=\"M").count(), 5);
    }

    #[test]
    fn test_custom_figure_axis_ticks() {
        let result = result_for("48", "14", Neurotoxicity::NoRisk);
        let svg = render_svg(&result, PlotScale::Automatic, PlotChoice::PediTools);
        assert!(svg.contains(">24h</text>"));
        assert!(svg.contains(">168h</text>"));
        assert!(!svg.contains(">192h</text>"));
    }

    #[test]
    fn test_original_curves_in_data_space() {
        let (photo, exchange) = original_curves();
        assert_eq!(photo.len(), 6);
        assert_eq!(photo[0], [40.0 / 3.0, 5.0]);
        assert_eq!(exchange[5], [520.0 / 3.0, 22.5]);
    }

    #[test]
    fn test_caption() {
        let result = result_for("48", "", Neurotoxicity::AnyRisk);
        assert_eq!(
            caption(&result),
            "Age-specific bilirubin thresholds for 38 to 39 weeks gestation with neurotoxicity risk factors"
        );
    }

    #[test]
    fn test_option_values() {
        for scale in PlotScale::all() {
            assert_eq!(PlotScale::from_value(scale.value()), Some(scale));
        }
        for choice in PlotChoice::all() {
            assert_eq!(PlotChoice::from_value(choice.value()), Some(choice));
        }
    }
}
