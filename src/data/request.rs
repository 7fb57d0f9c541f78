use serde_json::{Map, Value};

use super::bar::MarketSeries;
use crate::constants::schema::DEFAULT_ANALYSIS_TYPE;

/// A normalized analysis request, owned by a single request lifecycle.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisRequest {
    pub series: MarketSeries,
    pub analysis_type: String,
    /// Caller options forwarded to the engine untouched
    pub raw_options: Map<String, Value>,
}

impl AnalysisRequest {
    pub fn new(series: MarketSeries) -> Self {
        Self {
            series,
            analysis_type: DEFAULT_ANALYSIS_TYPE.to_string(),
            raw_options: Map::new(),
        }
    }

    /// Set the analysis type; blank values keep the default.
    pub fn with_analysis_type(mut self, analysis_type: Option<&str>) -> Self {
        if let Some(t) = analysis_type.map(str::trim).filter(|t| !t.is_empty()) {
            self.analysis_type = t.to_string();
        }
        self
    }

    pub fn with_options(mut self, raw_options: Map<String, Value>) -> Self {
        self.raw_options = raw_options;
        self
    }
}
