//! Response mapper: the single place where HTTP results are built.
//!
//! Every result, success or failure, carries the same CORS header set.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use crate::constants::http::*;
use crate::constants::schema::REQUIRED_COLUMNS;
use crate::engine::types::AnalysisOutcome;
use crate::error::{DecodeError, NormalizeError};

/// Body format negotiated from the request's `Accept` header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Json,
    PlainText,
}

impl ResponseFormat {
    /// Plain text only when the caller lists `text/plain` and neither JSON
    /// nor a wildcard.
    pub fn from_accept(accept: Option<&str>) -> Self {
        let Some(accept) = accept else {
            return ResponseFormat::Json;
        };
        let media: Vec<String> = accept
            .split(',')
            .map(|part| part.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .collect();

        let wants_text = media.iter().any(|m| m == "text/plain");
        let accepts_json = media
            .iter()
            .any(|m| m == CONTENT_TYPE_JSON || m == "*/*" || m == "application/*");

        if wants_text && !accepts_json {
            ResponseFormat::PlainText
        } else {
            ResponseFormat::Json
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HttpResult {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

fn cors_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("Access-Control-Allow-Origin".to_string(), CORS_ALLOW_ORIGIN.to_string());
    headers.insert("Access-Control-Allow-Headers".to_string(), CORS_ALLOW_HEADERS.to_string());
    headers.insert("Access-Control-Allow-Methods".to_string(), CORS_ALLOW_METHODS.to_string());
    headers.insert("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string());
    headers
}

impl HttpResult {
    fn with_body(status_code: u16, body: String) -> Self {
        Self {
            status_code,
            headers: cors_headers(),
            body,
        }
    }

    pub fn json(status_code: u16, body: &Value) -> Self {
        Self::with_body(status_code, body.to_string())
    }

    /// `{ "error": message, ...extra }`
    pub fn error(status_code: u16, message: &str, extra: Map<String, Value>) -> Self {
        let mut body = Map::new();
        body.insert("error".to_string(), Value::String(message.to_string()));
        body.extend(extra);
        Self::json(status_code, &Value::Object(body))
    }

    /// CORS pre-flight: 200 with an empty body.
    pub fn preflight() -> Self {
        Self::with_body(200, String::new())
    }

    pub fn health(version: &str, timestamp: &str) -> Self {
        Self::json(
            200,
            &json!({
                "status": "healthy",
                "version": version,
                "timestamp": timestamp,
            }),
        )
    }

    pub fn method_not_allowed() -> Self {
        Self::error(405, MSG_METHOD_NOT_ALLOWED, Map::new())
    }

    pub fn not_found() -> Self {
        Self::error(404, MSG_NOT_FOUND, Map::new())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Apply the negotiated format. Plain-text error bodies carry just the
    /// error message; other bodies are left as they are.
    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        if format == ResponseFormat::PlainText {
            self.headers
                .insert("Content-Type".to_string(), CONTENT_TYPE_TEXT.to_string());
            if self.status_code >= 400 {
                if let Ok(Value::Object(body)) = serde_json::from_str::<Value>(&self.body) {
                    if let Some(Value::String(message)) = body.get("error") {
                        self.body = message.clone();
                    }
                }
            }
        }
        self
    }
}

impl IntoResponse for HttpResult {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, self.body).into_response();

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("Dropping invalid response header {}: {}", name, value),
            }
        }
        response
    }
}

/// Anything the mapper knows how to turn into an `HttpResult`.
pub trait ToHttpResult {
    fn to_http_result(&self) -> HttpResult;
}

impl ToHttpResult for AnalysisOutcome {
    fn to_http_result(&self) -> HttpResult {
        match self {
            AnalysisOutcome::Success(payload) => HttpResult::json(200, payload),
            AnalysisOutcome::MalformedOutput(_) => HttpResult::error(502, MSG_MALFORMED_OUTPUT, Map::new()),
            AnalysisOutcome::EngineFailure { exit_code, stderr } => {
                let mut extra = Map::new();
                extra.insert("exitCode".to_string(), json!(exit_code));
                extra.insert("stderr".to_string(), json!(stderr_tail(stderr, STDERR_TAIL_LINES)));
                HttpResult::error(502, MSG_ENGINE_FAILED, extra)
            }
            AnalysisOutcome::Timeout => HttpResult::error(504, MSG_TIMEOUT, Map::new()),
        }
    }
}

impl ToHttpResult for DecodeError {
    fn to_http_result(&self) -> HttpResult {
        input_error(&self.to_string(), decode_details(self))
    }
}

impl ToHttpResult for NormalizeError {
    fn to_http_result(&self) -> HttpResult {
        let details = match self {
            NormalizeError::Decode(e) => decode_details(e),
            NormalizeError::InvalidRecord { index, reason } => Some(json!({
                "index": index,
                "reason": reason,
            })),
            NormalizeError::ColumnLengthMismatch {
                column,
                expected,
                actual,
            } => Some(json!({
                "column": column,
                "expected": expected,
                "actual": actual,
            })),
            NormalizeError::UnsupportedEncoding(content_type) => Some(json!({
                "contentType": content_type,
                "supported": ["application/json", "multipart/form-data", "text/csv"],
            })),
            _ => None,
        };
        input_error(&self.to_string(), details)
    }
}

fn input_error(message: &str, details: Option<Value>) -> HttpResult {
    let mut extra = Map::new();
    if let Some(details) = details {
        extra.insert("details".to_string(), details);
    }
    HttpResult::error(400, message, extra)
}

fn decode_details(error: &DecodeError) -> Option<Value> {
    match error {
        DecodeError::MissingHeader => None,
        DecodeError::MissingColumns(missing) => Some(json!({
            "missingColumns": missing,
            "requiredColumns": REQUIRED_COLUMNS,
        })),
        DecodeError::MalformedRow { line, reason } => Some(json!({
            "line": line,
            "reason": reason,
        })),
    }
}

/// Last `max_lines` lines of `text`.
pub fn stderr_tail(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= max_lines {
        return text.to_string();
    }
    lines[lines.len() - max_lines..].join("\n")
}
