use async_trait::async_trait;

use super::types::AnalysisOutcome;
use crate::data::request::AnalysisRequest;

/// Runs one analysis for one request.
///
/// Implementations never fail with an error: every failure mode is a variant
/// of `AnalysisOutcome`.
#[async_trait]
pub trait AnalysisInvoker: Send + Sync {
    fn name(&self) -> &'static str;

    async fn invoke(&self, request: &AnalysisRequest) -> AnalysisOutcome;
}
