//! Error types for the bilirubin calculator

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BiliError {
    #[error("Please enter the age in hours")]
    MissingAge,

    #[error("Invalid date/time: {0}")]
    InvalidDateTime(String),

    #[error("Unknown value '{value}' for {field}")]
    UnknownOption { field: &'static str, value: String },

    #[error("Missing value for {0}")]
    MissingArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("GUI error: {0}")]
    Gui(String),
}
