//! In-process invoker returning scripted outcomes. Used in place of a real
//! engine when exercising the HTTP surface.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::traits::AnalysisInvoker;
use super::types::{AnalysisOutcome, EnginePayload};
use crate::data::request::AnalysisRequest;

#[derive(Clone)]
pub struct StubInvoker {
    /// `None` echoes the engine payload back as the success body
    fallback: Option<AnalysisOutcome>,
    scripted: Arc<Mutex<VecDeque<AnalysisOutcome>>>,
    received: Arc<Mutex<Vec<EnginePayload>>>,
    delay: Option<Duration>,
}

impl StubInvoker {
    /// Always answer with `outcome` unless something was queued with `push`.
    pub fn new(outcome: AnalysisOutcome) -> Self {
        Self {
            fallback: Some(outcome),
            scripted: Arc::new(Mutex::new(VecDeque::new())),
            received: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Echo the engine payload back as the success body.
    pub fn echo() -> Self {
        Self {
            fallback: None,
            ..Self::new(AnalysisOutcome::Timeout)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a one-shot outcome, consumed in FIFO order before the fallback.
    pub fn push(&self, outcome: AnalysisOutcome) {
        self.scripted.lock().unwrap_or_else(|e| e.into_inner()).push_back(outcome);
    }

    /// Payloads seen so far, in call order.
    pub fn received(&self) -> Vec<EnginePayload> {
        self.received.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl AnalysisInvoker for StubInvoker {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn invoke(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        let payload = EnginePayload::from_request(request);
        self.received.lock().unwrap_or_else(|e| e.into_inner()).push(payload.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.scripted.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        match next.or_else(|| self.fallback.clone()) {
            Some(outcome) => outcome,
            None => AnalysisOutcome::Success(serde_json::to_value(&payload).unwrap_or_default()),
        }
    }
}
