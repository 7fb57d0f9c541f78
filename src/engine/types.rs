use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

use crate::data::bar::ColumnarSeries;
use crate::data::request::AnalysisRequest;
use crate::error::ErrorKind;

/// How the canonical payload is handed to the engine process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transport {
    /// Serialized into a single environment variable with this name
    EnvVariable(String),
    /// Written to the process's stdin, which is then closed
    StdinPipe,
}

#[derive(Clone, Debug)]
pub struct InvokerConfig {
    pub command: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub transport: Transport,
}

/// Wire schema sent to the engine: columnar OHLCV arrays plus options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnginePayload {
    #[serde(flatten)]
    pub data: ColumnarSeries,
    pub analysis_type: String,
    #[serde(default)]
    pub raw_options: Map<String, Value>,
}

impl EnginePayload {
    pub fn from_request(request: &AnalysisRequest) -> Self {
        Self {
            data: request.series.to_columnar(),
            analysis_type: request.analysis_type.clone(),
            raw_options: request.raw_options.clone(),
        }
    }

    /// Rebuild the request; fails with the name of a ragged column.
    pub fn into_request(self) -> Result<AnalysisRequest, String> {
        let series = self.data.into_series()?;
        Ok(AnalysisRequest {
            series,
            analysis_type: self.analysis_type,
            raw_options: self.raw_options,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Result of one engine invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum AnalysisOutcome {
    Success(Value),
    EngineFailure { exit_code: i32, stderr: String },
    MalformedOutput(String),
    Timeout,
}

impl AnalysisOutcome {
    /// `None` for success.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            AnalysisOutcome::Success(_) => None,
            AnalysisOutcome::EngineFailure { .. } | AnalysisOutcome::MalformedOutput(_) => {
                Some(ErrorKind::Engine)
            }
            AnalysisOutcome::Timeout => Some(ErrorKind::Timeout),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnalysisOutcome::Success(_) => "success",
            AnalysisOutcome::EngineFailure { .. } => "engine_failure",
            AnalysisOutcome::MalformedOutput(_) => "malformed_output",
            AnalysisOutcome::Timeout => "timeout",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisOutcome::Success(_))
    }
}
