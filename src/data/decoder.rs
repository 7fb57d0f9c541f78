//! Tabular decoder: delimited OHLCV text into a `MarketSeries`.

use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;

use super::bar::{parse_price, parse_volume, MarketSeries, OhlcvBar};
use crate::constants::schema::REQUIRED_COLUMNS;
use crate::error::DecodeError;

/// Decode CSV text with the canonical OHLCV column set.
pub fn decode_ohlcv(text: &str) -> Result<MarketSeries, DecodeError> {
    decode(text, &REQUIRED_COLUMNS)
}

/// Decode comma-delimited text into a series.
///
/// Column names are matched ASCII case-insensitively. `required_columns` is
/// checked in addition to the six OHLCV columns, which a bar always needs.
/// Line numbers in errors are 1-based physical lines of `text`.
pub fn decode(text: &str, required_columns: &[&str]) -> Result<MarketSeries, DecodeError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rows = read_rows(text)?;

    if rows.len() < 2 {
        return Err(DecodeError::MissingHeader);
    }

    let (_, header) = &rows[0];
    let index = HeaderIndex::new(header);

    let mut wanted: Vec<String> = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
    for column in required_columns {
        let column = column.trim().to_ascii_lowercase();
        if !wanted.contains(&column) {
            wanted.push(column);
        }
    }
    let missing: Vec<String> = wanted
        .into_iter()
        .filter(|c| index.get(c).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(DecodeError::MissingColumns(missing));
    }

    let mut bars = Vec::with_capacity(rows.len() - 1);
    for (line, record) in &rows[1..] {
        bars.push(decode_row(&index, *line, record)?);
    }

    MarketSeries::new(bars).ok_or(DecodeError::MissingHeader)
}

/// Read all non-blank lines as records, paired with their 1-based line number.
fn read_rows(text: &str) -> Result<Vec<(usize, StringRecord)>, DecodeError> {
    let mut rows = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let record = parse_line(line).map_err(|reason| DecodeError::MalformedRow { line: i + 1, reason })?;
        rows.push((i + 1, record));
    }
    Ok(rows)
}

/// Parse one line as a comma-delimited record (double quotes allowed).
fn parse_line(line: &str) -> Result<StringRecord, String> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes());

    let mut record = StringRecord::new();
    reader.read_record(&mut record).map_err(|e| e.to_string())?;
    Ok(record)
}

struct HeaderIndex {
    width: usize,
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    fn new(header: &StringRecord) -> Self {
        let mut positions = HashMap::new();
        for (i, name) in header.iter().enumerate() {
            // First occurrence wins on duplicate names
            positions.entry(name.trim().to_ascii_lowercase()).or_insert(i);
        }
        Self {
            width: header.len(),
            positions,
        }
    }

    fn get(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }
}

fn decode_row(index: &HeaderIndex, line: usize, record: &StringRecord) -> Result<OhlcvBar, DecodeError> {
    let malformed = |reason: String| DecodeError::MalformedRow { line, reason };

    if record.len() < index.width {
        return Err(malformed(format!(
            "expected {} fields, found {}",
            index.width,
            record.len()
        )));
    }

    let date = field(index, record, "date");
    if date.is_empty() {
        return Err(malformed("date is empty".to_string()));
    }

    let price = |name: &str| parse_price(field(index, record, name)).map_err(|e| malformed(format!("{}: {}", name, e)));

    Ok(OhlcvBar {
        date: date.to_string(),
        open: price("open")?,
        high: price("high")?,
        low: price("low")?,
        close: price("close")?,
        volume: parse_volume(field(index, record, "volume")).map_err(|e| malformed(format!("volume: {}", e)))?,
    })
}

fn field<'a>(index: &HeaderIndex, record: &'a StringRecord, name: &str) -> &'a str {
    index.get(name).and_then(|i| record.get(i)).unwrap_or("")
}
