pub mod bar;
pub mod decoder;
pub mod normalizer;
pub mod request;
pub mod upload;

pub use bar::{ColumnarSeries, MarketSeries, OhlcvBar};
pub use decoder::{decode, decode_ohlcv};
pub use normalizer::{normalize, Encoding, InboundRequest};
pub use request::AnalysisRequest;
pub use upload::{spool_multipart, SpooledFile, UploadForm};

#[cfg(test)]
mod decoder_tests;
