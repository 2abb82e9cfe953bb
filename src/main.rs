//! Newborn Bilirubin Threshold Calculator
//!
//! Phototherapy and exchange-transfusion thresholds for newborns of 35 or
//! more weeks of gestation, following the AAP 2022 hyperbilirubinemia
//! guideline.
//!
//! Usage:
//!   bilicalc                         - Launch GUI
//!   bilicalc calc 48 14.2            - Thresholds and risk tier (CLI mode)
//!   bilicalc --help                  - Show help
//!   BILICALC_DBG=1 bilicalc calc 48  - Enable debug output

mod age;
mod chart;
mod config;
mod error;
mod export;
mod form;
mod gui;
mod risk;
mod thresholds;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use log::{info, warn};

use crate::age::{calculate_age_hours, describe_age};
use crate::chart::{PlotChoice, PlotScale};
use crate::config::{config_file_path, default_export_dir, ensure_data_dir, get_data_dir, load_config, Config};
use crate::error::BiliError;
use crate::form::{evaluate, FormDefaults, FormState};
use crate::thresholds::{GestationBucket, Neurotoxicity};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    // Check for debug mode
    let debug_mode = env::var("BILICALC_DBG").is_ok();

    // Initialize logger
    if debug_mode {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp(None)
            .init();
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), BiliError> {
    // Ensure data directory exists
    if let Err(e) = ensure_data_dir() {
        warn!("Could not create data directory: {}", e);
    }

    // Create default config if it doesn't exist
    let cfg_path = config_file_path();
    if !cfg_path.exists() {
        if let Err(e) = Config::create_default(&cfg_path) {
            warn!("Could not create default config: {}", e);
        }
    }

    let config = load_config();
    let rest = args.get(2..).unwrap_or(&[]);

    match args.get(1).map(|s| s.as_str()) {
        Some("calc") | Some("calculate") => cmd_calc(&config, rest),
        Some("chart") => cmd_chart(&config, rest),
        Some("report") => cmd_report(&config, rest),
        Some("age") => cmd_age(rest),
        Some("--help") | Some("-h") | Some("help") => {
            print_help();
            Ok(())
        }
        Some("--version") | Some("-V") => {
            println!("bilicalc {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some("path") | Some("paths") => {
            cmd_show_paths(&config);
            Ok(())
        }
        Some(other) => Err(BiliError::UnknownOption { field: "command", value: other.to_string() }),
        None => gui::run_gui(config).map_err(|e| BiliError::Gui(e.to_string())),
    }
}

/// Form fields and output flags taken from the command line
#[derive(Debug, Default)]
struct CliRequest {
    form: FormState,
    json: bool,
    out: Option<PathBuf>,
}

/// Parse `<age> [bilirubin] [--gestation L] [--risk V] [--scale V] [--plot V] [--out FILE] [--json]`
fn parse_request(args: &[String], defaults: &FormDefaults) -> Result<CliRequest, BiliError> {
    let mut request = CliRequest {
        form: FormState::from_defaults(defaults),
        ..Default::default()
    };
    let mut positional = 0;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value_for = |name: &str| {
            iter.next()
                .map(|v| v.as_str())
                .ok_or_else(|| BiliError::MissingArgument(name.to_string()))
        };
        match arg.as_str() {
            "--gestation" | "-g" => {
                let value = value_for("--gestation")?;
                request.form.gestation = GestationBucket::from_label(value)
                    .ok_or_else(|| BiliError::UnknownOption { field: "gestation", value: value.to_string() })?;
            }
            "--risk" | "-r" => {
                let value = value_for("--risk")?;
                request.form.neurotoxicity = Neurotoxicity::from_value(value)
                    .ok_or_else(|| BiliError::UnknownOption { field: "risk", value: value.to_string() })?;
            }
            "--scale" => {
                let value = value_for("--scale")?;
                request.form.plot_scale = PlotScale::from_value(value)
                    .ok_or_else(|| BiliError::UnknownOption { field: "scale", value: value.to_string() })?;
            }
            "--plot" => {
                let value = value_for("--plot")?;
                request.form.plot_choice = PlotChoice::from_value(value)
                    .ok_or_else(|| BiliError::UnknownOption { field: "plot", value: value.to_string() })?;
            }
            "--out" | "-o" => {
                request.out = Some(PathBuf::from(value_for("--out")?));
            }
            "--json" => request.json = true,
            value => {
                match positional {
                    0 => request.form.age = value.to_string(),
                    1 => request.form.bilirubin = value.to_string(),
                    _ => return Err(BiliError::UnknownOption { field: "argument", value: value.to_string() }),
                }
                positional += 1;
            }
        }
    }

    Ok(request)
}

/// Thresholds and recommendations (CLI mode)
fn cmd_calc(config: &Config, args: &[String]) -> Result<(), BiliError> {
    let request = parse_request(args, &config.defaults)?;
    let result = evaluate(&request.form)?;
    info!("Computed result for {}h", result.age);

    if request.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", result.to_text());
    }
    Ok(())
}

/// Write the nomogram as SVG, to a file or stdout
fn cmd_chart(config: &Config, args: &[String]) -> Result<(), BiliError> {
    let request = parse_request(args, &config.defaults)?;
    let result = evaluate(&request.form)?;

    match request.out {
        Some(path) => {
            export::export_svg(&path, &result, request.form.plot_scale, request.form.plot_choice)?;
            eprintln!("Saved chart to: {}", path.display());
        }
        None => print!("{}", chart::render_svg(&result, request.form.plot_scale, request.form.plot_choice)),
    }
    Ok(())
}

/// Write a PDF report
fn cmd_report(config: &Config, args: &[String]) -> Result<(), BiliError> {
    let request = parse_request(args, &config.defaults)?;
    let result = evaluate(&request.form)?;

    let path = request.out.unwrap_or_else(|| {
        config.export_dir().join(format!(
            "bilirubin_{}h_{}.pdf",
            result.age,
            chrono::Local::now().format("%Y%m%d_%H%M")
        ))
    });
    export::export_to_pdf(&path, &result, request.form.plot_scale)?;
    eprintln!("Saved report to: {}", path.display());
    Ok(())
}

/// Age in hours from birth and measurement times
fn cmd_age(args: &[String]) -> Result<(), BiliError> {
    let birth = args.first().ok_or_else(|| BiliError::MissingArgument("date of birth".to_string()))?;
    let measurement = args.get(1).ok_or_else(|| BiliError::MissingArgument("date of measurement".to_string()))?;

    let hours = calculate_age_hours(birth, measurement)?;
    println!("{}", describe_age(hours));
    Ok(())
}

/// Show data paths
fn cmd_show_paths(config: &Config) {
    println!("Bilirubin Calculator Paths:");
    println!("  Data directory:  {}", get_data_dir().display());
    println!("  Config file:     {}", config_file_path().display());
    println!("  Export default:  {}", config.export_dir().display());
}

fn print_help() {
    eprintln!("Bilirubin Threshold Calculator v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  bilicalc                              Launch GUI application");
    eprintln!("  bilicalc calc <age> [bilirubin]       Thresholds and recommendations");
    eprintln!("  bilicalc chart <age> [bilirubin]      Nomogram as SVG (stdout or --out)");
    eprintln!("  bilicalc report <age> [bilirubin]     One-page PDF report");
    eprintln!("  bilicalc age <birth> <measurement>    Age in hours (YYYY-MM-DDTHH:MM)");
    eprintln!("  bilicalc path                         Show data file locations");
    eprintln!("  bilicalc help                         Show this help");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("  -g, --gestation <label>   35 to 36 weeks | 37 to 38 weeks | 38 to 39 weeks | 39+ weeks");
    eprintln!("  -r, --risk <value>        no-risk | any-risk | show-both");
    eprintln!("      --scale <value>       automatic | full-sized");
    eprintln!("      --plot <value>        peditools | original");
    eprintln!("  -o, --out <file>          Output file for chart/report");
    eprintln!("      --json                JSON output for calc");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("  BILICALC_DBG=1            Enable debug output");
    eprintln!();
    eprintln!("DATA LOCATIONS:");
    eprintln!("  Config:    {}", config_file_path().display());
    eprintln!("  Exports:   {}", default_export_dir().display());
}
