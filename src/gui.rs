//! GUI for the bilirubin calculator using egui

use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints, Points};
use log::{error, info};

use crate::chart::{self, curve_variants, original_curves, sample_curves, PlotChoice, PlotScale};
use crate::config::Config;
use crate::error::BiliError;
use crate::export::{export_svg, export_to_pdf};
use crate::form::{BiliCalculator, CalculationResult};
use crate::risk::{clinical_notes, follow_up_actions, RiskTier};
use crate::thresholds::{format_mgdl, GestationBucket, Neurotoxicity};

const TEAL: egui::Color32 = egui::Color32::from_rgb(0x11, 0x5e, 0x59);
const AMBER: egui::Color32 = egui::Color32::from_rgb(0xf5, 0x9e, 0x0b);
const RED: egui::Color32 = egui::Color32::from_rgb(0xdc, 0x26, 0x26);
const GREEN: egui::Color32 = egui::Color32::from_rgb(0x05, 0x96, 0x69);
const LINK_RED: egui::Color32 = egui::Color32::from_rgb(0xdc, 0x26, 0x26);

/// Main application state
pub struct BiliApp {
    calculator: BiliCalculator,
    config: Config,

    // Blocking alert
    alert_message: Option<String>,

    // Export state
    export_message: String,
    export_status: ExportStatus,
}

#[derive(PartialEq, Clone, Copy)]
enum ExportStatus {
    Idle,
    Success,
    Error,
}

fn rgb(color: (u8, u8, u8)) -> egui::Color32 {
    egui::Color32::from_rgb(color.0, color.1, color.2)
}

impl BiliApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::light());

        Self {
            calculator: BiliCalculator::new(config.defaults),
            config,
            alert_message: None,
            export_message: String::new(),
            export_status: ExportStatus::Idle,
        }
    }

    fn submit(&mut self) {
        if let Err(e) = self.calculator.submit() {
            self.alert_message = Some(e.to_string());
        }
    }

    fn reset(&mut self) {
        self.calculator.reset();
        self.export_message.clear();
        self.export_status = ExportStatus::Idle;
    }

    fn calculate_age(&mut self) {
        if let Err(e) = self.calculator.calculate_age() {
            self.alert_message = Some(e.to_string());
        }
    }

    fn export(&mut self, kind: ExportKind) {
        let Some(result) = self.calculator.result().cloned() else {
            return;
        };
        let form = &self.calculator.form;
        let (filter, ext) = match kind {
            ExportKind::Svg => ("SVG", "svg"),
            ExportKind::Pdf => ("PDF", "pdf"),
        };
        let default_name = format!(
            "bilirubin_{}h_{}.{}",
            result.age,
            chrono::Local::now().format("%Y%m%d_%H%M"),
            ext
        );

        let Some(path) = rfd::FileDialog::new()
            .add_filter(filter, &[ext])
            .set_directory(self.config.export_dir())
            .set_file_name(&default_name)
            .save_file()
        else {
            return;
        };

        let outcome: Result<(), BiliError> = match kind {
            ExportKind::Svg => export_svg(&path, &result, form.plot_scale, form.plot_choice),
            ExportKind::Pdf => export_to_pdf(&path, &result, form.plot_scale),
        };

        match outcome {
            Ok(()) => {
                self.export_status = ExportStatus::Success;
                self.export_message = format!("Exported to {}", path.display());
            }
            Err(e) => {
                error!("Export failed: {}", e);
                self.export_status = ExportStatus::Error;
                self.export_message = format!("Export failed: {}", e);
            }
        }
    }
}

#[derive(Clone, Copy)]
enum ExportKind {
    Svg,
    Pdf,
}

impl eframe::App for BiliApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Header
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(egui::RichText::new("PediTools").color(TEAL).strong());
                ui.label(egui::RichText::new("clinical tools for pediatric providers").small());

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if !self.export_message.is_empty() {
                        let color = match self.export_status {
                            ExportStatus::Success => GREEN,
                            ExportStatus::Error => RED,
                            ExportStatus::Idle => egui::Color32::GRAY,
                        };
                        ui.colored_label(color, &self.export_message);
                    }
                });
            });
        });

        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.small("PediTools  •  Bilirubin 2022");
            });
        });

        // Blocking alert: the form is disabled until dismissed
        if let Some(message) = self.alert_message.clone() {
            egui::Window::new("Alert")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.label(&message);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        self.alert_message = None;
                    }
                });
        }
        let enabled = self.alert_message.is_none();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(enabled, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.columns(2, |columns| {
                        self.show_calculator(&mut columns[0]);
                        show_information(&mut columns[1]);
                    });
                });
            });
        });
    }
}

impl BiliApp {
    fn show_calculator(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.heading(egui::RichText::new("Age and Bilirubin").color(TEAL));
            ui.add_space(5.0);
            self.show_form(ui);
        });

        ui.add_space(10.0);

        ui.group(|ui| {
            ui.label(egui::RichText::new("Optional age calculator").color(TEAL).strong());
            let form = &mut self.calculator.form;
            egui::Grid::new("age_calculator_grid")
                .num_columns(2)
                .spacing([10.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Date of birth");
                    ui.add(egui::TextEdit::singleline(&mut form.date_of_birth).hint_text("YYYY-MM-DDTHH:MM"));
                    ui.end_row();

                    ui.label("Date of measurement");
                    ui.add(egui::TextEdit::singleline(&mut form.date_of_measurement).hint_text("YYYY-MM-DDTHH:MM"));
                    ui.end_row();
                });
            if ui.button("Calculate age").clicked() {
                self.calculate_age();
            }
            if let Some(hours) = self.calculator.calculated_age().filter(|&h| h != 0) {
                ui.horizontal(|ui| {
                    ui.label("Calculated age:");
                    ui.strong(format!("{} hours", hours));
                });
            }
        });

        if let Some(result) = self.calculator.result().cloned() {
            ui.add_space(10.0);
            self.show_results(ui, &result);
        }
    }

    fn show_form(&mut self, ui: &mut egui::Ui) {
        let mut submit = false;
        let mut reset = false;
        let form = &mut self.calculator.form;

        ui.label("Gestation at birth");
        egui::ComboBox::from_id_salt("gestation")
            .selected_text(form.gestation.label())
            .show_ui(ui, |ui| {
                for bucket in GestationBucket::all() {
                    ui.selectable_value(&mut form.gestation, bucket, bucket.label());
                }
            });
        ui.add_space(5.0);

        ui.horizontal(|ui| {
            ui.label("Age (hours)");
            ui.small("(1 to 336 hours)");
        });
        let age_edit = ui.add(egui::TextEdit::singleline(&mut form.age).hint_text("Enter age in hours"));
        ui.add_space(5.0);

        ui.horizontal(|ui| {
            ui.label("Bilirubin (mg/dL)");
            ui.small("(optional)");
        });
        let bili_edit = ui.add(egui::TextEdit::singleline(&mut form.bilirubin).hint_text("Enter bilirubin level"));
        ui.add_space(5.0);

        // Enter in either numeric field submits, like a browser form
        let enter = ui.input(|i| i.key_pressed(egui::Key::Enter));
        if enter && (age_edit.lost_focus() || bili_edit.lost_focus()) {
            submit = true;
        }

        ui.horizontal(|ui| {
            ui.label("Neurotoxicity risks");
            ui.small("(required)");
        });
        for option in Neurotoxicity::all() {
            ui.radio_value(&mut form.neurotoxicity, option, option.label());
        }
        ui.add_space(5.0);

        ui.label("Plot scale");
        for option in PlotScale::all() {
            ui.radio_value(&mut form.plot_scale, option, option.label());
        }
        ui.add_space(5.0);

        ui.label("Plot choice");
        for option in PlotChoice::all() {
            ui.radio_value(&mut form.plot_choice, option, option.label());
        }
        ui.add_space(10.0);

        ui.horizontal(|ui| {
            if ui.button("Submit").clicked() {
                submit = true;
            }
            if ui.link(egui::RichText::new("Reset form").color(RED)).clicked() {
                reset = true;
            }
        });

        if submit {
            self.submit();
        }
        if reset {
            self.reset();
        }
    }

    fn show_results(&mut self, ui: &mut egui::Ui, result: &CalculationResult) {
        ui.group(|ui| {
            ui.heading(egui::RichText::new("Calculation Results").color(TEAL));
            ui.separator();

            egui::Grid::new("patient_info")
                .num_columns(2)
                .spacing([20.0, 4.0])
                .show(ui, |ui| {
                    ui.label(format!("Age: {}", result.age_description));
                    ui.label(format!(
                        "Neurotoxicity Risk: {}",
                        if result.has_risk_factors { "Present" } else { "Absent" }
                    ));
                    ui.end_row();

                    ui.label(format!("Gestation: {}", result.gestation.label()));
                    if let Some(bili) = result.bilirubin {
                        ui.label(format!("Bilirubin Level: {} mg/dL", format_mgdl(bili)));
                    }
                    ui.end_row();
                });

            ui.add_space(8.0);
            ui.strong("Treatment Thresholds:");
            ui.columns(2, |columns| {
                columns[0].colored_label(AMBER, "Phototherapy Threshold");
                columns[0].heading(result.thresholds.format_phototherapy());
                columns[1].colored_label(RED, "Exchange Threshold");
                columns[1].heading(result.thresholds.format_exchange());
            });

            if result.bilirubin.is_some() {
                ui.add_space(8.0);
                show_risk_assessment(ui, result);
            }

            ui.add_space(8.0);
            ui.small("Clinical Notes:");
            for note in clinical_notes(result.has_risk_factors) {
                ui.small(format!("• {}", note));
            }
        });

        ui.add_space(10.0);

        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.heading(egui::RichText::new("Bilirubin Nomogram").color(TEAL));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Export PDF").clicked() {
                        self.export(ExportKind::Pdf);
                    }
                    if ui.button("Save chart (SVG)").clicked() {
                        self.export(ExportKind::Svg);
                    }
                });
            });
            self.show_chart(ui, result);
            ui.small(format!("Graph: {}", chart::caption(result)));
        });

        ui.add_space(10.0);

        ui.group(|ui| {
            ui.heading(egui::RichText::new("Clinical Recommendations").color(TEAL));
            ui.strong("Follow-up Actions:");
            for action in follow_up_actions(result.risk_level) {
                ui.label(format!("• {}", action));
            }
        });
    }

    fn show_chart(&self, ui: &mut egui::Ui, result: &CalculationResult) {
        let form = &self.calculator.form;
        let mut lines = Vec::new();

        match form.plot_choice {
            PlotChoice::Original => {
                let (photo, exchange) = original_curves();
                lines.push(
                    Line::new("Phototherapy", PlotPoints::from(photo))
                        .color(AMBER)
                        .style(egui_plot::LineStyle::dashed_dense()),
                );
                lines.push(Line::new("Exchange", PlotPoints::from(exchange)).color(RED));
            }
            PlotChoice::PediTools => {
                let span = form.plot_scale.span_hours(Some(result.age));
                for (suffix, has_risk) in curve_variants(result.neurotoxicity) {
                    let points = sample_curves(result.gestation, has_risk, span);
                    let photo: PlotPoints = points.iter().map(|p| [p.age as f64, p.phototherapy]).collect();
                    let exchange: PlotPoints = points.iter().map(|p| [p.age as f64, p.exchange]).collect();
                    let width = if has_risk { 1.5 } else { 2.5 };
                    lines.push(
                        Line::new(format!("Phototherapy{}", suffix), photo)
                            .color(AMBER)
                            .width(width)
                            .style(egui_plot::LineStyle::dashed_dense()),
                    );
                    lines.push(Line::new(format!("Exchange{}", suffix), exchange).color(RED).width(width));
                }
            }
        }

        let patient = chart::plotted_bilirubin(result)
            .map(|bili| Points::new("Patient", vec![[result.age as f64, bili]]).radius(5.0).color(GREEN));

        Plot::new("bilirubin_nomogram")
            .height(260.0)
            .show_axes(true)
            .include_y(0.0)
            .include_y(30.0)
            .legend(egui_plot::Legend::default())
            .show(ui, |plot_ui| {
                for line in lines {
                    plot_ui.line(line);
                }
                if let Some(points) = patient {
                    plot_ui.points(points);
                }
            });
    }
}

fn show_risk_assessment(ui: &mut egui::Ui, result: &CalculationResult) {
    let tier: RiskTier = result.risk_level;
    egui::Frame::new()
        .fill(rgb(tier.panel_rgb()))
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.strong("Risk Assessment:");
            ui.label(
                egui::RichText::new(format!("{} Risk", tier.label()))
                    .color(rgb(tier.text_rgb()))
                    .size(18.0)
                    .strong(),
            );
            ui.label(&result.assessment.recommendation);
        });

    let a = &result.assessment;
    let mut actions = vec![
        ("Confirmatory TSB:", &a.confirmatory, egui::Color32::from_rgb(0x1e, 0x40, 0xaf)),
        ("Phototherapy:", &a.phototherapy, egui::Color32::from_rgb(0x15, 0x80, 0x3d)),
        ("Escalation of Care:", &a.escalation, egui::Color32::from_rgb(0x6b, 0x21, 0xa8)),
    ];
    if !a.exchange.is_empty() {
        actions.push(("Exchange Transfusion:", &a.exchange, RED));
    }
    ui.add_space(5.0);
    for (label, text, color) in actions {
        ui.horizontal_wrapped(|ui| {
            ui.colored_label(color, egui::RichText::new(label).strong());
            ui.label(text);
        });
    }
    ui.add_space(5.0);
    ui.label(egui::RichText::new(&a.discontinuation).italics());
}

/// Static guideline information shown beside the calculator
fn show_information(ui: &mut egui::Ui) {
    ui.group(|ui| {
        ui.heading(egui::RichText::new("AAP 2022 Hyperbilirubinemia management guidelines").color(TEAL));
        ui.label(
            "Calculator and clinical decision support for the AAP 2022 guidelines for the \
             management of hyperbilirubinemia in newborns 35 or more weeks of gestation.",
        );
        ui.add_space(5.0);
        ui.strong("Features");
        for feature in [
            "Neurotoxicity risk factors absent, present, or both",
            "Original and easier to interpret custom plots",
            "Zoomed in and full 0-336 hour plots",
            "Original AAP recommendations plus enhanced report",
            "Calculate age from times of birth and measurement",
        ] {
            ui.label(format!("• {}", feature));
        }
    });

    ui.add_space(10.0);

    ui.group(|ui| {
        ui.strong(egui::RichText::new("Usage Notes").color(TEAL));
        ui.label("• Can leave bilirubin blank to view thresholds");
    });

    ui.add_space(10.0);

    ui.group(|ui| {
        ui.strong(egui::RichText::new("Neurotoxicity Risk Factors").color(TEAL));
        for factor in [
            "albumin < 3 g/dL",
            "isoimmune hemolytic disease",
            "G6PD deficiency",
            "other hemolytic conditions",
            "sepsis",
            "clinical instability in previous 24 hours",
            "(prematurity accounted for by distinct threshold curves)",
        ] {
            ui.label(format!("• {}", factor));
        }
    });

    ui.add_space(10.0);

    ui.group(|ui| {
        ui.strong(egui::RichText::new("Based on").color(TEAL));
        ui.label(
            egui::RichText::new(
                "Clinical Practice Guideline Revision: Management of Hyperbilirubinemia in the Newborn \
                 Infant 35 or More Weeks of Gestation. Pediatrics 2022;150(3):e2022058859",
            )
            .color(LINK_RED),
        );
        ui.label("Selected Tables and Figures:");
        for item in [
            "Risk factors for hyperbilirubinemia",
            "Hyperbilirubinemia neurotoxicity risk factors",
            "Approach to escalation of care",
            "Post-discharge follow-up for infants who have not received phototherapy",
        ] {
            ui.label(egui::RichText::new(format!("  • {}", item)).color(LINK_RED));
        }
    });
}

/// Run the GUI application
pub fn run_gui(config: Config) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 860.0])
            .with_min_inner_size([900.0, 600.0]),
        vsync: true,
        multisampling: 0,
        depth_buffer: 0,
        ..Default::default()
    };

    info!("Launching GUI");
    eframe::run_native(
        "Bilirubin Calculator",
        options,
        Box::new(|cc| Ok(Box::new(BiliApp::new(cc, config)))),
    )
}
