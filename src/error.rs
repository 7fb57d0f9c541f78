//! Custom error types for the analysis gateway
//!
//! Provides structured, typed errors instead of generic Box<dyn Error>

use thiserror::Error;

/// Coarse error taxonomy shared by every failure the gateway can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing client data (400)
    Input,
    /// Engine crash, bad exit code, malformed output or launch failure (502)
    Engine,
    /// Engine did not finish within the configured timeout (504)
    Timeout,
}

impl ErrorKind {
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Input => 400,
            ErrorKind::Engine => 502,
            ErrorKind::Timeout => 504,
        }
    }
}

/// Errors raised while decoding delimited OHLCV text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("CSV must contain a header row and at least one data row")]
    MissingHeader,

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },
}

/// Errors raised while turning an inbound request into an analysis request
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("No market data provided")]
    NoData,

    #[error("Unsupported content type: {0}")]
    UnsupportedEncoding(String),

    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("Invalid market data record {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("Column '{column}' has {actual} values, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Market data is empty")]
    EmptySeries,

    #[error("Failed to read upload: {0}")]
    Upload(String),

    #[error("Failed to read request body: {0}")]
    Body(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl NormalizeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Input
    }
}

impl From<serde_json::Error> for NormalizeError {
    fn from(err: serde_json::Error) -> Self {
        NormalizeError::InvalidJson(err.to_string())
    }
}

/// Startup and infrastructure errors (configuration, sockets, files)
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<String> for GatewayError {
    fn from(err: String) -> Self {
        GatewayError::Config(err)
    }
}

impl From<&str> for GatewayError {
    fn from(err: &str) -> Self {
        GatewayError::Config(err.to_string())
    }
}
