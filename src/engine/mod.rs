pub mod factory;
pub mod gate;
pub mod process;
pub mod stub;
pub mod traits;
pub mod types;

pub use gate::ConcurrencyGate;
pub use process::ProcessInvoker;
pub use stub::StubInvoker;
pub use traits::AnalysisInvoker;
pub use types::{AnalysisOutcome, EnginePayload, InvokerConfig, Transport};

#[cfg(test)]
mod types_tests;
