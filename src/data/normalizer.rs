//! Payload normalizer: every supported request encoding into one
//! `AnalysisRequest`.
//!
//! The encoding is chosen from the declared content type, never by probing the
//! body. Inside a file upload the content itself decides between delimited
//! text and pre-serialized JSON, since the upload encoding is already fixed.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use super::bar::{float_to_volume, parse_price, parse_volume, MarketSeries, OhlcvBar};
use super::decoder::decode_ohlcv;
use super::request::AnalysisRequest;
use super::upload::UploadForm;
use crate::constants::schema::{CSV_CONTENT_FIELD, DATA_FIELD, REQUIRED_COLUMNS, TYPE_FIELD};
use crate::error::{DecodeError, NormalizeError};

/// Request body encodings the gateway understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Text,
    Multipart,
}

impl Encoding {
    /// Classify a `Content-Type` header value by its media type.
    pub fn from_content_type(content_type: Option<&str>) -> Result<Self, NormalizeError> {
        let raw = content_type.unwrap_or("").trim();
        let essence = raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase();

        match essence.as_str() {
            "application/json" => Ok(Encoding::Json),
            e if e.starts_with("application/") && e.ends_with("+json") => Ok(Encoding::Json),
            "text/csv" | "application/csv" | "text/plain" => Ok(Encoding::Text),
            "multipart/form-data" => Ok(Encoding::Multipart),
            "" => Err(NormalizeError::UnsupportedEncoding("<missing>".to_string())),
            _ => Err(NormalizeError::UnsupportedEncoding(raw.to_string())),
        }
    }
}

/// One inbound request, already split by encoding.
#[derive(Debug)]
pub enum InboundRequest {
    /// Parsed `application/json` body
    Json(Value),
    /// Delimited text body; `params` are the query parameters
    Text {
        body: String,
        params: BTreeMap<String, String>,
    },
    /// Multipart form with its file part spooled to temporary storage
    Upload(UploadForm),
}

impl InboundRequest {
    /// Build a request from a non-multipart body.
    pub fn from_body(
        encoding: Encoding,
        body: &[u8],
        params: BTreeMap<String, String>,
    ) -> Result<Self, NormalizeError> {
        match encoding {
            Encoding::Json => {
                if body.iter().all(u8::is_ascii_whitespace) {
                    return Err(NormalizeError::NoData);
                }
                Ok(InboundRequest::Json(serde_json::from_slice(body)?))
            }
            Encoding::Text => {
                let body = String::from_utf8(body.to_vec())
                    .map_err(|_| NormalizeError::Body("body is not valid UTF-8 text".to_string()))?;
                Ok(InboundRequest::Text { body, params })
            }
            Encoding::Multipart => Err(NormalizeError::UnsupportedEncoding(
                "multipart/form-data must be read as a stream".to_string(),
            )),
        }
    }
}

/// Normalize any inbound encoding into an analysis request.
pub fn normalize(request: InboundRequest) -> Result<AnalysisRequest, NormalizeError> {
    match request {
        InboundRequest::Json(value) => normalize_json(value),
        InboundRequest::Text { body, mut params } => {
            if body.trim().is_empty() {
                return Err(NormalizeError::NoData);
            }
            let series = decode_ohlcv(&body)?;
            let analysis_type = params.remove(TYPE_FIELD);
            Ok(AnalysisRequest::new(series)
                .with_analysis_type(analysis_type.as_deref())
                .with_options(strings_to_options(params)))
        }
        InboundRequest::Upload(form) => normalize_upload(form),
    }
}

fn normalize_json(value: Value) -> Result<AnalysisRequest, NormalizeError> {
    let Value::Object(mut body) = value else {
        return Err(NormalizeError::InvalidJson("request body must be a JSON object".to_string()));
    };

    let analysis_type = take_type(&mut body)?;
    let series = take_series(&mut body)?;

    // Whatever is left is forwarded to the engine as-is
    Ok(AnalysisRequest::new(series)
        .with_analysis_type(analysis_type.as_deref())
        .with_options(body))
}

fn normalize_upload(mut form: UploadForm) -> Result<AnalysisRequest, NormalizeError> {
    let file = form.file.take().ok_or(NormalizeError::NoData)?;
    let content = file.read_to_string()?;
    let analysis_type = form.fields.remove(TYPE_FIELD);
    let options = strings_to_options(form.fields);

    let trimmed = content.trim_start_matches('\u{feff}').trim_start();
    if trimmed.is_empty() {
        return Err(NormalizeError::NoData);
    }

    let series = if trimmed.starts_with('[') || trimmed.starts_with('{') {
        match serde_json::from_str::<Value>(trimmed)? {
            Value::Object(mut body) if body.contains_key(DATA_FIELD) || body.contains_key(CSV_CONTENT_FIELD) => {
                take_series(&mut body)?
            }
            other => series_from_structured(&other)?,
        }
    } else {
        decode_ohlcv(&content)?
    };

    Ok(AnalysisRequest::new(series)
        .with_analysis_type(analysis_type.as_deref())
        .with_options(options))
}

fn take_type(body: &mut Map<String, Value>) -> Result<Option<String>, NormalizeError> {
    match body.shift_remove(TYPE_FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(NormalizeError::InvalidJson("'type' must be a string".to_string())),
    }
}

/// Remove and decode the payload field. `csv_content` wins when both are sent.
fn take_series(body: &mut Map<String, Value>) -> Result<MarketSeries, NormalizeError> {
    if let Some(csv) = body.shift_remove(CSV_CONTENT_FIELD) {
        body.shift_remove(DATA_FIELD);
        return match csv {
            Value::String(text) if text.trim().is_empty() => Err(NormalizeError::NoData),
            Value::String(text) => Ok(decode_ohlcv(&text)?),
            Value::Null => Err(NormalizeError::NoData),
            _ => Err(NormalizeError::InvalidJson("'csv_content' must be a string".to_string())),
        };
    }

    match body.shift_remove(DATA_FIELD) {
        None | Some(Value::Null) => Err(NormalizeError::NoData),
        Some(data) => series_from_structured(&data),
    }
}

fn strings_to_options(fields: BTreeMap<String, String>) -> Map<String, Value> {
    fields.into_iter().map(|(k, v)| (k, Value::String(v))).collect()
}

/// Validate structured market data: an array of row objects or an object of
/// equally long column arrays. Keys match ASCII case-insensitively.
pub fn series_from_structured(data: &Value) -> Result<MarketSeries, NormalizeError> {
    match data {
        Value::Array(rows) => series_from_rows(rows),
        Value::Object(columns) => series_from_columns(columns),
        _ => Err(NormalizeError::InvalidJson(
            "'data' must be an array of records or an object of columns".to_string(),
        )),
    }
}

fn series_from_rows(rows: &[Value]) -> Result<MarketSeries, NormalizeError> {
    let mut bars = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let invalid = |reason: String| NormalizeError::InvalidRecord { index, reason };
        let Value::Object(record) = row else {
            return Err(invalid("record must be a JSON object".to_string()));
        };

        let keys = lowercase_keys(record);
        let get = |name: &str| {
            keys.get(name)
                .copied()
                .ok_or_else(|| invalid(format!("missing field '{}'", name)))
        };

        bars.push(OhlcvBar {
            date: json_date(get("date")?).map_err(invalid)?,
            open: json_price(get("open")?).map_err(|e| invalid(format!("open: {}", e)))?,
            high: json_price(get("high")?).map_err(|e| invalid(format!("high: {}", e)))?,
            low: json_price(get("low")?).map_err(|e| invalid(format!("low: {}", e)))?,
            close: json_price(get("close")?).map_err(|e| invalid(format!("close: {}", e)))?,
            volume: json_volume(get("volume")?).map_err(|e| invalid(format!("volume: {}", e)))?,
        });
    }
    MarketSeries::new(bars).ok_or(NormalizeError::EmptySeries)
}

fn series_from_columns(columns: &Map<String, Value>) -> Result<MarketSeries, NormalizeError> {
    let keys = lowercase_keys(columns);

    let mut resolved: Vec<&Vec<Value>> = Vec::with_capacity(REQUIRED_COLUMNS.len());
    let mut missing = Vec::new();
    for name in REQUIRED_COLUMNS {
        let value = keys
            .get(name)
            .or_else(|| if name == "date" { keys.get("dates") } else { None });
        match value {
            Some(Value::Array(values)) => resolved.push(values),
            Some(_) => {
                return Err(NormalizeError::InvalidJson(format!("column '{}' must be an array", name)));
            }
            None => missing.push(name.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(DecodeError::MissingColumns(missing).into());
    }

    let expected = resolved[0].len();
    for (name, values) in REQUIRED_COLUMNS.iter().zip(&resolved) {
        if values.len() != expected {
            return Err(NormalizeError::ColumnLengthMismatch {
                column: name.to_string(),
                expected,
                actual: values.len(),
            });
        }
    }

    let &[dates, open, high, low, close, volume] = resolved.as_slice() else {
        unreachable!("one entry per required column")
    };

    let mut bars = Vec::with_capacity(expected);
    for index in 0..expected {
        let invalid = |column: &str, reason: String| NormalizeError::InvalidRecord {
            index,
            reason: format!("{}: {}", column, reason),
        };
        bars.push(OhlcvBar {
            date: json_date(&dates[index]).map_err(|e| invalid("date", e))?,
            open: json_price(&open[index]).map_err(|e| invalid("open", e))?,
            high: json_price(&high[index]).map_err(|e| invalid("high", e))?,
            low: json_price(&low[index]).map_err(|e| invalid("low", e))?,
            close: json_price(&close[index]).map_err(|e| invalid("close", e))?,
            volume: json_volume(&volume[index]).map_err(|e| invalid("volume", e))?,
        });
    }
    MarketSeries::new(bars).ok_or(NormalizeError::EmptySeries)
}

fn lowercase_keys(map: &Map<String, Value>) -> HashMap<String, &Value> {
    let mut keys = HashMap::with_capacity(map.len());
    for (k, v) in map {
        keys.entry(k.trim().to_ascii_lowercase()).or_insert(v);
    }
    keys
}

fn json_date(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err("date must be a non-empty string".to_string()),
    }
}

fn json_price(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("{} is not a finite number", n)),
        Value::String(s) => parse_price(s),
        other => Err(format!("{} is not a number", other)),
    }
}

fn json_volume(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(float_to_volume))
            .ok_or_else(|| format!("{} is not an integer volume", n)),
        Value::String(s) => parse_volume(s),
        other => Err(format!("{} is not a number", other)),
    }
}
