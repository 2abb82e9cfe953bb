//! Export of a calculation result: SVG nomogram and one-page PDF report

use printpdf::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use log::info;

use crate::chart::{self, curve_variants, sample_curves, PlotChoice, PlotScale};
use crate::error::BiliError;
use crate::form::CalculationResult;
use crate::risk::{clinical_notes, follow_up_actions};
use crate::thresholds::format_mgdl;

/// PDF document dimensions (A4)
const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;

/// Characters per line for 9pt body text
const WRAP_CHARS: usize = 95;

/// Upper end of the chart's bilirubin axis
const CHART_MAX_MGDL: f32 = 35.0;

/// Colors
const COLOR_BLACK: Color = Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None });
const COLOR_GRAY: Color = Color::Rgb(Rgb { r: 0.5, g: 0.5, b: 0.5, icc_profile: None });
const COLOR_LIGHT_GRAY: Color = Color::Rgb(Rgb { r: 0.95, g: 0.95, b: 0.95, icc_profile: None });
const COLOR_TEAL: Color = Color::Rgb(Rgb { r: 0.07, g: 0.37, b: 0.35, icc_profile: None });
const COLOR_AMBER: Color = Color::Rgb(Rgb { r: 0.96, g: 0.62, b: 0.04, icc_profile: None });
const COLOR_RED: Color = Color::Rgb(Rgb { r: 0.86, g: 0.15, b: 0.15, icc_profile: None });
const COLOR_GREEN: Color = Color::Rgb(Rgb { r: 0.02, g: 0.59, b: 0.41, icc_profile: None });

fn color_rgb8((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb {
        r: r as f32 / 255.0,
        g: g as f32 / 255.0,
        b: b as f32 / 255.0,
        icc_profile: None,
    })
}

/// Write the nomogram as an SVG file
pub fn export_svg<P: AsRef<Path>>(
    path: P,
    result: &CalculationResult,
    scale: PlotScale,
    choice: PlotChoice,
) -> Result<(), BiliError> {
    fs::write(path.as_ref(), chart::render_svg(result, scale, choice))?;
    info!("Exported chart to {}", path.as_ref().display());
    Ok(())
}

/// Export a result as a single-page PDF report
pub fn export_to_pdf<P: AsRef<Path>>(path: P, result: &CalculationResult, scale: PlotScale) -> Result<(), BiliError> {
    let mut doc = PdfDocument::new("Bilirubin Threshold Report");

    let ops = build_report_page(result, scale);
    let page = PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), ops);
    doc.with_pages(vec![page]);

    let mut warnings = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);

    let mut file = File::create(path.as_ref())
        .map_err(|e| BiliError::Export(format!("Failed to create file: {}", e)))?;
    file.write_all(&bytes)
        .map_err(|e| BiliError::Export(format!("Failed to write PDF: {}", e)))?;

    info!("Exported report to {}", path.as_ref().display());
    Ok(())
}

// Helper to create text operations
fn text_ops(text: &str, size: f32, x: f32, y: f32, font: BuiltinFont, color: Color) -> Vec<Op> {
    vec![
        Op::SetFillColor { col: color },
        Op::StartTextSection,
        Op::SetFontSizeBuiltinFont { size: Pt(size), font },
        Op::SetTextCursor { pos: Point::new(Mm(x), Mm(y)) },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text.to_string())],
            font,
        },
        Op::EndTextSection,
    ]
}

fn polyline_ops(points: &[(f32, f32)], color: Color, width: f32) -> Vec<Op> {
    vec![
        Op::SetOutlineColor { col: color },
        Op::SetOutlineThickness { pt: Pt(width) },
        Op::DrawLine {
            line: Line {
                points: points
                    .iter()
                    .map(|&(x, y)| LinePoint { p: Point::new(Mm(x), Mm(y)), bezier: false })
                    .collect(),
                is_closed: false,
            },
        },
    ]
}

fn line_ops(x1: f32, y1: f32, x2: f32, y2: f32, color: Color, width: f32) -> Vec<Op> {
    polyline_ops(&[(x1, y1), (x2, y2)], color, width)
}

fn rect_points(x: f32, y: f32, width: f32, height: f32) -> Vec<LinePoint> {
    vec![
        LinePoint { p: Point::new(Mm(x), Mm(y)), bezier: false },
        LinePoint { p: Point::new(Mm(x + width), Mm(y)), bezier: false },
        LinePoint { p: Point::new(Mm(x + width), Mm(y + height)), bezier: false },
        LinePoint { p: Point::new(Mm(x), Mm(y + height)), bezier: false },
    ]
}

fn rect_fill_ops(x: f32, y: f32, width: f32, height: f32, color: Color) -> Vec<Op> {
    vec![
        Op::SetFillColor { col: color },
        Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing { points: rect_points(x, y, width, height) }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        },
    ]
}

fn rect_stroke_ops(x: f32, y: f32, width: f32, height: f32, color: Color, stroke_width: f32) -> Vec<Op> {
    vec![
        Op::SetOutlineColor { col: color },
        Op::SetOutlineThickness { pt: Pt(stroke_width) },
        Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing { points: rect_points(x, y, width, height) }],
                mode: PaintMode::Stroke,
                winding_order: WindingOrder::NonZero,
            },
        },
    ]
}

fn point_ops(x: f32, y: f32, radius: f32, color: Color) -> Vec<Op> {
    rect_fill_ops(x - radius, y - radius, radius * 2.0, radius * 2.0, color)
}

/// Greedy word wrap for builtin-font text, which printpdf does not wrap
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Wrapped body text; returns the y position below it
fn paragraph_ops(ops: &mut Vec<Op>, text: &str, x: f32, mut y: f32, color: Color) -> f32 {
    for line in wrap_text(text, WRAP_CHARS) {
        ops.extend(text_ops(&line, 9.0, x, y, BuiltinFont::Helvetica, color.clone()));
        y -= 5.0;
    }
    y
}

fn section_heading(ops: &mut Vec<Op>, title: &str, y: f32) -> f32 {
    ops.extend(text_ops(title, 12.0, MARGIN_MM, y, BuiltinFont::HelveticaBold, COLOR_TEAL));
    y - 7.0
}

fn build_report_page(result: &CalculationResult, scale: PlotScale) -> Vec<Op> {
    let mut ops = Vec::new();
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;

    // Title
    ops.extend(text_ops("Bilirubin Threshold Report", 20.0, MARGIN_MM, y, BuiltinFont::HelveticaBold, COLOR_BLACK));
    y -= 8.0;

    let date_str = chrono::Local::now().format("%Y-%m-%d %H:%M").to_string();
    ops.extend(text_ops(
        &format!("AAP 2022 hyperbilirubinemia guideline - generated {}", date_str),
        9.0, MARGIN_MM, y, BuiltinFont::Helvetica, COLOR_GRAY,
    ));
    y -= 6.0;
    ops.extend(line_ops(MARGIN_MM, y, PAGE_WIDTH_MM - MARGIN_MM, y, COLOR_GRAY, 0.5));
    y -= 9.0;

    // Patient info
    let right_col = MARGIN_MM + 90.0;
    ops.extend(text_ops(&format!("Age: {}", result.age_description), 10.0, MARGIN_MM, y, BuiltinFont::Helvetica, COLOR_BLACK));
    ops.extend(text_ops(
        &format!("Neurotoxicity Risk: {}", if result.has_risk_factors { "Present" } else { "Absent" }),
        10.0, right_col, y, BuiltinFont::Helvetica, COLOR_BLACK,
    ));
    y -= 6.0;
    ops.extend(text_ops(&format!("Gestation: {}", result.gestation.label()), 10.0, MARGIN_MM, y, BuiltinFont::Helvetica, COLOR_BLACK));
    if let Some(bili) = result.bilirubin {
        ops.extend(text_ops(
            &format!("Bilirubin Level: {} mg/dL", format_mgdl(bili)),
            10.0, right_col, y, BuiltinFont::Helvetica, COLOR_BLACK,
        ));
    }
    y -= 10.0;

    // Thresholds
    y = section_heading(&mut ops, "Treatment Thresholds", y);
    let box_width = 80.0;
    let box_height = 14.0;
    ops.extend(rect_fill_ops(MARGIN_MM, y - box_height + 4.0, box_width, box_height, COLOR_LIGHT_GRAY));
    ops.extend(rect_fill_ops(MARGIN_MM, y - box_height + 4.0, 1.5, box_height, COLOR_AMBER));
    ops.extend(text_ops("Phototherapy Threshold", 9.0, MARGIN_MM + 4.0, y, BuiltinFont::Helvetica, COLOR_BLACK));
    ops.extend(text_ops(&result.thresholds.format_phototherapy(), 13.0, MARGIN_MM + 4.0, y - 7.0, BuiltinFont::HelveticaBold, COLOR_BLACK));

    ops.extend(rect_fill_ops(right_col, y - box_height + 4.0, box_width, box_height, COLOR_LIGHT_GRAY));
    ops.extend(rect_fill_ops(right_col, y - box_height + 4.0, 1.5, box_height, COLOR_RED));
    ops.extend(text_ops("Exchange Threshold", 9.0, right_col + 4.0, y, BuiltinFont::Helvetica, COLOR_BLACK));
    ops.extend(text_ops(&result.thresholds.format_exchange(), 13.0, right_col + 4.0, y - 7.0, BuiltinFont::HelveticaBold, COLOR_BLACK));
    y -= box_height + 6.0;

    // Risk assessment and clinical actions
    if result.bilirubin.is_some() {
        let tier = result.risk_level;
        ops.extend(rect_fill_ops(MARGIN_MM, y - 10.0, PAGE_WIDTH_MM - 2.0 * MARGIN_MM, 15.0, color_rgb8(tier.panel_rgb())));
        ops.extend(text_ops(
            &format!("{} Risk", tier.label()),
            13.0, MARGIN_MM + 3.0, y, BuiltinFont::HelveticaBold, color_rgb8(tier.text_rgb()),
        ));
        ops.extend(text_ops(&result.assessment.recommendation, 9.0, MARGIN_MM + 3.0, y - 6.0, BuiltinFont::Helvetica, COLOR_BLACK));
        y -= 18.0;

        let a = &result.assessment;
        let mut actions = vec![
            ("Confirmatory TSB:", a.confirmatory.as_str()),
            ("Phototherapy:", a.phototherapy.as_str()),
            ("Escalation of Care:", a.escalation.as_str()),
        ];
        if !a.exchange.is_empty() {
            actions.push(("Exchange Transfusion:", a.exchange.as_str()));
        }
        for (label, text) in actions {
            ops.extend(text_ops(label, 9.0, MARGIN_MM, y, BuiltinFont::HelveticaBold, COLOR_BLACK));
            ops.extend(text_ops(text, 9.0, MARGIN_MM + 38.0, y, BuiltinFont::Helvetica, COLOR_BLACK));
            y -= 5.5;
        }
        y -= 1.0;
        y = paragraph_ops(&mut ops, &a.discontinuation, MARGIN_MM, y, COLOR_GRAY);
        y -= 4.0;
    } else {
        y = paragraph_ops(&mut ops, &result.assessment.recommendation, MARGIN_MM, y, COLOR_GRAY);
        y -= 4.0;
    }

    // Follow-up
    y = section_heading(&mut ops, "Follow-up Actions", y);
    for action in follow_up_actions(result.risk_level) {
        y = paragraph_ops(&mut ops, &format!("- {}", action), MARGIN_MM + 3.0, y, COLOR_BLACK);
    }
    y -= 4.0;

    // Nomogram
    y = section_heading(&mut ops, "Bilirubin Nomogram", y);
    let chart_height = 65.0;
    let chart_bottom = (y - chart_height - 2.0).max(MARGIN_MM + 40.0);
    ops.extend(build_chart_ops(result, scale, MARGIN_MM + 10.0, chart_bottom, PAGE_WIDTH_MM - 2.0 * MARGIN_MM - 10.0, chart_height));
    y = chart_bottom - 10.0;
    y = paragraph_ops(&mut ops, &chart::caption(result), MARGIN_MM, y, COLOR_GRAY);
    y -= 3.0;

    // Clinical notes
    for note in clinical_notes(result.has_risk_factors) {
        ops.extend(text_ops(&format!("- {}", note), 8.0, MARGIN_MM, y, BuiltinFont::Helvetica, COLOR_GRAY));
        y -= 4.5;
    }

    // Footer
    ops.extend(text_ops(
        "Clinical decision support only - confirm against the published guideline.",
        8.0, MARGIN_MM, MARGIN_MM - 8.0, BuiltinFont::Helvetica, COLOR_GRAY,
    ));

    ops
}

/// Threshold curves over the plot span, with the patient marker
fn build_chart_ops(result: &CalculationResult, scale: PlotScale, chart_x: f32, chart_y: f32, chart_width: f32, chart_height: f32) -> Vec<Op> {
    let mut ops = Vec::new();
    let span = scale.span_hours(Some(result.age));
    let to_x = |age: f32| chart_x + (age / span as f32) * chart_width;
    let to_y = |mg_dl: f32| chart_y + (mg_dl.clamp(0.0, CHART_MAX_MGDL) / CHART_MAX_MGDL) * chart_height;

    ops.extend(rect_fill_ops(chart_x, chart_y, chart_width, chart_height, COLOR_LIGHT_GRAY));
    ops.extend(rect_stroke_ops(chart_x, chart_y, chart_width, chart_height, COLOR_BLACK, 0.5));

    // Y-axis labels and grid
    for mg_dl in [5, 10, 15, 20, 25, 30] {
        let y_pos = to_y(mg_dl as f32);
        ops.extend(line_ops(chart_x, y_pos, chart_x + chart_width, y_pos, color_rgb8((0xd1, 0xd5, 0xdb)), 0.3));
        ops.extend(text_ops(&mg_dl.to_string(), 7.0, chart_x - 6.0, y_pos - 1.0, BuiltinFont::Helvetica, COLOR_GRAY));
    }

    // X-axis labels, one per day on the automatic scale
    let tick = 24 * ((span + chart::AUTOMATIC_SPAN_HOURS - 1) / chart::AUTOMATIC_SPAN_HOURS);
    let mut hour = tick;
    while hour <= span {
        let x_pos = to_x(hour as f32);
        ops.extend(text_ops(&format!("{}h", hour), 7.0, x_pos - 3.0, chart_y - 5.0, BuiltinFont::Helvetica, COLOR_GRAY));
        hour += tick;
    }

    for (_, has_risk) in curve_variants(result.neurotoxicity) {
        let points = sample_curves(result.gestation, has_risk, span);
        let photo: Vec<(f32, f32)> = points.iter().map(|p| (to_x(p.age as f32), to_y(p.phototherapy as f32))).collect();
        let exchange: Vec<(f32, f32)> = points.iter().map(|p| (to_x(p.age as f32), to_y(p.exchange as f32))).collect();
        let width = if has_risk { 0.8 } else { 1.2 };
        ops.extend(polyline_ops(&photo, COLOR_AMBER, width));
        ops.extend(polyline_ops(&exchange, COLOR_RED, width));
    }

    if let Some(bili) = chart::plotted_bilirubin(result) {
        let x = to_x(result.age as f32).min(chart_x + chart_width);
        ops.extend(point_ops(x, to_y(bili as f32), 1.5, COLOR_GREEN));
    }

    // Legend
    let legend_y = chart_y + chart_height + 3.0;
    let legend_x = chart_x + chart_width - 90.0;
    ops.extend(line_ops(legend_x, legend_y + 1.0, legend_x + 8.0, legend_y + 1.0, COLOR_AMBER, 1.2));
    ops.extend(text_ops("Phototherapy", 8.0, legend_x + 10.0, legend_y, BuiltinFont::Helvetica, COLOR_BLACK));
    ops.extend(line_ops(legend_x + 35.0, legend_y + 1.0, legend_x + 43.0, legend_y + 1.0, COLOR_RED, 1.2));
    ops.extend(text_ops("Exchange", 8.0, legend_x + 45.0, legend_y, BuiltinFont::Helvetica, COLOR_BLACK));
    if chart::plotted_bilirubin(result).is_some() {
        ops.extend(point_ops(legend_x + 68.0, legend_y + 1.0, 1.2, COLOR_GREEN));
        ops.extend(text_ops("Patient", 8.0, legend_x + 71.0, legend_y, BuiltinFont::Helvetica, COLOR_BLACK));
    }

    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{evaluate, FormState};

    fn sample_result() -> CalculationResult {
        let form = FormState {
            age: "48".to_string(),
            bilirubin: "18".to_string(),
            ..Default::default()
        };
        evaluate(&form).unwrap()
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);
        assert!(wrap_text("", 10).is_empty());
        assert_eq!(wrap_text("unbreakableword", 4), vec!["unbreakableword"]);
    }

    #[test]
    fn test_export_svg_writes_file() {
        let path = std::env::temp_dir().join(format!("bilicalc-chart-{}.svg", std::process::id()));
        export_svg(&path, &sample_result(), PlotScale::Automatic, PlotChoice::Original).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert!(contents.starts_with("<svg"));
        assert!(contents.contains("Patient"));
    }

    #[test]
    fn test_export_pdf_writes_file() {
        let path = std::env::temp_dir().join(format!("bilicalc-report-{}.pdf", std::process::id()));
        export_to_pdf(&path, &sample_result(), PlotScale::FullSized).unwrap();
        let bytes = fs::read(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert!(bytes.starts_with(b"%PDF"));
    }
}
