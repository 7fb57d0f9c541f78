use std::sync::Arc;
use tracing::info;

use super::{gate::ConcurrencyGate, process::ProcessInvoker, traits::AnalysisInvoker};
use crate::config::AppConfig;

pub fn build_invoker(config: &AppConfig) -> Arc<dyn AnalysisInvoker> {
    let invoker_config = config.engine.invoker_config();
    info!(
        "⚙️ Engine: {} {:?} (timeout {:?}, transport {:?})",
        invoker_config.command.display(),
        invoker_config.args,
        invoker_config.timeout,
        invoker_config.transport
    );

    let mut invoker = ProcessInvoker::new(invoker_config);
    if config.engine.max_concurrent > 0 {
        info!("🚦 Engine concurrency limited to {}", config.engine.max_concurrent);
        invoker = invoker.with_gate(ConcurrencyGate::new(config.engine.max_concurrent));
    }
    Arc::new(invoker)
}
