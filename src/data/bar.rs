use serde::{Deserialize, Serialize};

/// One bar of market data for a time interval.
///
/// `date` is kept exactly as the caller supplied it; it is never reparsed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Ordered, non-empty sequence of bars in the order they were supplied.
#[derive(Clone, Debug, PartialEq)]
pub struct MarketSeries {
    bars: Vec<OhlcvBar>,
}

impl MarketSeries {
    /// Returns `None` for an empty bar list.
    pub fn new(bars: Vec<OhlcvBar>) -> Option<Self> {
        if bars.is_empty() {
            None
        } else {
            Some(Self { bars })
        }
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a constructed series.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> &OhlcvBar {
        &self.bars[0]
    }

    pub fn last(&self) -> &OhlcvBar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn to_columnar(&self) -> ColumnarSeries {
        let n = self.bars.len();
        let mut columns = ColumnarSeries {
            dates: Vec::with_capacity(n),
            open: Vec::with_capacity(n),
            high: Vec::with_capacity(n),
            low: Vec::with_capacity(n),
            close: Vec::with_capacity(n),
            volume: Vec::with_capacity(n),
        };
        for bar in &self.bars {
            columns.dates.push(bar.date.clone());
            columns.open.push(bar.open);
            columns.high.push(bar.high);
            columns.low.push(bar.low);
            columns.close.push(bar.close);
            columns.volume.push(bar.volume);
        }
        columns
    }
}

/// Columnar view of a `MarketSeries`, the shape the engine consumes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnarSeries {
    pub dates: Vec<String>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<i64>,
}

impl ColumnarSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Zip the columns back into bars. Fails with the name of the first column
    /// whose length disagrees with `dates`.
    pub fn into_series(self) -> Result<MarketSeries, String> {
        let n = self.dates.len();
        let lengths = [
            ("open", self.open.len()),
            ("high", self.high.len()),
            ("low", self.low.len()),
            ("close", self.close.len()),
            ("volume", self.volume.len()),
        ];
        if let Some((name, _)) = lengths.iter().find(|(_, len)| *len != n) {
            return Err(name.to_string());
        }

        let bars = self
            .dates
            .into_iter()
            .enumerate()
            .map(|(i, date)| OhlcvBar {
                date,
                open: self.open[i],
                high: self.high[i],
                low: self.low[i],
                close: self.close[i],
                volume: self.volume[i],
            })
            .collect();

        MarketSeries::new(bars).ok_or_else(|| "dates".to_string())
    }
}

/// Parse a price field: must be a finite number.
pub fn parse_price(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", raw))?;
    if !value.is_finite() {
        return Err(format!("'{}' is not a finite number", raw));
    }
    Ok(value)
}

/// Parse a volume field: an integer, or a decimal with no fractional part
/// (spreadsheet exports write `1000.0`).
pub fn parse_volume(raw: &str) -> Result<i64, String> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(v);
    }
    let value = parse_price(raw)?;
    float_to_volume(value).ok_or_else(|| format!("'{}' is not an integer volume", raw))
}

pub(crate) fn float_to_volume(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}
