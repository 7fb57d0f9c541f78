//! Market Gateway - OHLCV analysis request gateway
//!
//! This library accepts market data in several encodings, normalizes it into
//! one canonical series, runs an external analysis engine per request, and
//! maps every outcome onto a fixed HTTP response contract.

pub mod api;
pub mod config;
pub mod constants;
pub mod data;
pub mod engine;
pub mod error;
pub mod response;

// Re-export commonly used types
pub use config::AppConfig;
pub use data::{AnalysisRequest, MarketSeries, OhlcvBar};
pub use engine::{AnalysisInvoker, AnalysisOutcome};
pub use response::{HttpResult, ToHttpResult};
