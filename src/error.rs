use std::path::PathBuf;

use thiserror::Error;

/// Validation and CSV failures raised while turning an input table into a
/// logo plot.
#[derive(Error, Debug)]
pub enum LogoError {
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} is missing required column(s): {}", columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    #[error("{path} has unexpected column(s): {} (use --ignore_extracols yes to drop them)", columns.join(", "))]
    ExtraColumns { path: PathBuf, columns: Vec<String> },

    #[error("{path}, row {row}, column '{column}': '{value}' is not a number")]
    NotANumber {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },

    #[error("invalid site set: {0}")]
    Sites(String),

    #[error("invalid symbol '{symbol}' at site {site}")]
    Symbol { site: String, symbol: String },

    #[error("inconsistent values at site {site}: {message}")]
    SiteValues { site: String, message: String },

    #[error("inconsistent range: {0}")]
    Range(String),

    #[error("invalid option {name} = {value}: {message}")]
    InvalidOption {
        name: String,
        value: String,
        message: String,
    },

    #[error("overlay {name}: {message}")]
    Overlay { name: String, message: String },
}

pub type Result<T> = std::result::Result<T, LogoError>;

impl LogoError {
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        LogoError::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn site_values(site: impl Into<String>, message: impl Into<String>) -> Self {
        LogoError::SiteValues {
            site: site.into(),
            message: message.into(),
        }
    }

    pub fn invalid_option(
        name: impl Into<String>,
        value: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        LogoError::InvalidOption {
            name: name.into(),
            value: value.to_string(),
            message: message.into(),
        }
    }

    pub fn overlay(name: impl Into<String>, message: impl Into<String>) -> Self {
        LogoError::Overlay {
            name: name.into(),
            message: message.into(),
        }
    }
}
