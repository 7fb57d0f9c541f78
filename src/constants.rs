//! Application-wide constants and magic numbers
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make the gateway easier to tune.

/// Market data schema constants
pub mod schema {
    /// Columns every OHLCV data set must provide, in canonical order
    pub const REQUIRED_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

    /// Analysis type used when the request does not name one
    pub const DEFAULT_ANALYSIS_TYPE: &str = "standard";

    /// Request field carrying delimited text
    pub const CSV_CONTENT_FIELD: &str = "csv_content";

    /// Request field carrying structured market data
    pub const DATA_FIELD: &str = "data";

    /// Request field naming the analysis type
    pub const TYPE_FIELD: &str = "type";

    /// Multipart part carrying the uploaded file
    pub const FILE_PART: &str = "file";
}

/// HTTP response constants
pub mod http {
    pub const CORS_ALLOW_ORIGIN: &str = "*";
    pub const CORS_ALLOW_HEADERS: &str = "Content-Type";
    pub const CORS_ALLOW_METHODS: &str = "POST, GET, OPTIONS";

    pub const CONTENT_TYPE_JSON: &str = "application/json";
    pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

    pub const MSG_MALFORMED_OUTPUT: &str = "invalid response from analysis engine";
    pub const MSG_ENGINE_FAILED: &str = "analysis engine failed";
    pub const MSG_TIMEOUT: &str = "analysis engine timed out";
    pub const MSG_METHOD_NOT_ALLOWED: &str = "Method not allowed";
    pub const MSG_NOT_FOUND: &str = "Not found";

    /// Only the tail of engine stderr is echoed back to clients
    pub const STDERR_TAIL_LINES: usize = 100;
}

/// Engine process defaults
pub mod engine {
    /// Default wall-clock budget for a single engine run
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Environment variable used by the env transport unless configured otherwise
    pub const DEFAULT_ENV_VAR: &str = "MARKET_DATA";

    /// Exit code reported when the engine was killed by a signal or never started
    pub const UNKNOWN_EXIT_CODE: i32 = -1;

    /// How long output pipes may stay open after the engine has exited
    pub const DRAIN_GRACE_MS: u64 = 500;
}

/// Server defaults
pub mod server {
    pub const DEFAULT_HOST: &str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 8080;

    /// Maximum accepted request body (10 MiB)
    pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

    /// Maximum accepted size of a single uploaded file (5 MiB)
    pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

    pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
}
