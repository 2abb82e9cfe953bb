//! Configuration file parsing and data locations

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use log::warn;

use crate::chart::{PlotChoice, PlotScale};
use crate::error::BiliError;
use crate::form::FormDefaults;
use crate::thresholds::{GestationBucket, Neurotoxicity};

const APP_DIR_NAME: &str = "bilicalc";
const CONFIG_FILE_NAME: &str = "config.txt";

const DEFAULT_CONFIG: &str = "\
# bilicalc configuration
#
# Form defaults, restored on every reset:
#   gestation      35 to 36 weeks | 37 to 38 weeks | 38 to 39 weeks | 39+ weeks
#   neurotoxicity  no-risk | any-risk | show-both
#   plot_scale     automatic | full-sized
#   plot_choice    peditools | original
#
# export_dir       default folder for SVG/PDF exports

gestation 38 to 39 weeks
neurotoxicity no-risk
plot_scale automatic
plot_choice peditools
";

/// Configuration loaded from config.txt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub defaults: FormDefaults,
    pub export_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BiliError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut config = Config::default();

        for line in reader.lines() {
            let line = line?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Parse "key value" or "key value # comment"
            if let Some((key, rest)) = Self::parse_line(line) {
                let value = rest.split('#').next().unwrap_or("").trim();
                if let Err(e) = config.apply(key, value) {
                    warn!("Ignoring config entry: {}", e);
                }
            }
        }

        Ok(config)
    }

    /// Parse a single config line, returning (key, value)
    fn parse_line(line: &str) -> Option<(&str, &str)> {
        // Find first whitespace to separate key from value
        let mut parts = line.splitn(2, |c: char| c.is_whitespace());
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();

        if key.is_empty() || value.is_empty() {
            return None;
        }

        Some((key, value))
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), BiliError> {
        let unknown = |field: &'static str| BiliError::UnknownOption { field, value: value.to_string() };
        match key {
            "gestation" => {
                self.defaults.gestation = GestationBucket::from_label(value).ok_or_else(|| unknown("gestation"))?;
            }
            "neurotoxicity" => {
                self.defaults.neurotoxicity = Neurotoxicity::from_value(value).ok_or_else(|| unknown("neurotoxicity"))?;
            }
            "plot_scale" => {
                self.defaults.plot_scale = PlotScale::from_value(value).ok_or_else(|| unknown("plot_scale"))?;
            }
            "plot_choice" => {
                self.defaults.plot_choice = PlotChoice::from_value(value).ok_or_else(|| unknown("plot_choice"))?;
            }
            "export_dir" => {
                self.export_dir = Some(PathBuf::from(value));
            }
            _ => return Err(unknown("config key")),
        }
        Ok(())
    }

    /// Write the commented default configuration
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<(), BiliError> {
        fs::write(path, DEFAULT_CONFIG)?;
        Ok(())
    }

    /// Configured export folder, or the OS documents folder
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(default_export_dir)
    }
}

/// OS-specific application data directory
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

pub fn ensure_data_dir() -> Result<PathBuf, BiliError> {
    let dir = get_data_dir();
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn config_file_path() -> PathBuf {
    get_data_dir().join(CONFIG_FILE_NAME)
}

pub fn default_export_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Load config from the data directory, then the current directory, else defaults
pub fn load_config() -> Config {
    Config::load(config_file_path())
        .or_else(|_| Config::load(CONFIG_FILE_NAME))
        .unwrap_or_else(|e| {
            warn!("Could not load config: {}. Using defaults.", e);
            Config::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("bilicalc-{}-{}.txt", name, std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(Config::parse_line("gestation 39+ weeks"), Some(("gestation", "39+ weeks")));
        assert_eq!(Config::parse_line("gestation"), None);
    }

    #[test]
    fn test_load_values() {
        let path = temp_config(
            "values",
            "# comment\n\ngestation 35 to 36 weeks  # preterm unit\nneurotoxicity show-both\nplot_scale full-sized\nplot_choice original\nexport_dir /tmp/exports\n",
        );
        let config = Config::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config.defaults.gestation, GestationBucket::Weeks35To36);
        assert_eq!(config.defaults.neurotoxicity, Neurotoxicity::ShowBoth);
        assert_eq!(config.defaults.plot_scale, PlotScale::FullSized);
        assert_eq!(config.defaults.plot_choice, PlotChoice::Original);
        assert_eq!(config.export_dir(), PathBuf::from("/tmp/exports"));
    }

    #[test]
    fn test_bad_values_are_ignored() {
        let path = temp_config("bad", "gestation 41 weeks\nneurotoxicity any-risk\ncolour teal\n");
        let config = Config::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config.defaults.gestation, GestationBucket::Weeks38To39);
        assert_eq!(config.defaults.neurotoxicity, Neurotoxicity::AnyRisk);
    }

    #[test]
    fn test_default_file_round_trips_to_defaults() {
        let path = std::env::temp_dir().join(format!("bilicalc-default-{}.txt", std::process::id()));
        Config::create_default(&path).unwrap();
        let config = Config::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_missing_file() {
        assert!(Config::load("/nonexistent/bilicalc/config.txt").is_err());
    }
}
