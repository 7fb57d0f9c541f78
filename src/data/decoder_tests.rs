//! Unit tests for the tabular OHLCV decoder.

#[cfg(test)]
mod decoder_tests {
    use crate::data::decoder::{decode, decode_ohlcv};
    use crate::error::DecodeError;

    const HEADER: &str = "date,open,high,low,close,volume";

    // ============= Happy Path Tests =============

    #[test]
    fn test_decode_single_row() {
        let series = decode_ohlcv("date,open,high,low,close,volume\n2024-01-01,100,105,99,104,1000\n").unwrap();

        assert_eq!(series.len(), 1);
        let bar = series.first();
        assert_eq!(bar.date, "2024-01-01");
        assert_eq!(bar.open, 100.0);
        assert_eq!(bar.high, 105.0);
        assert_eq!(bar.low, 99.0);
        assert_eq!(bar.close, 104.0);
        assert_eq!(bar.volume, 1000);
    }

    #[test]
    fn test_decode_length_matches_row_count() {
        let mut text = String::from(HEADER);
        for i in 0..25 {
            text.push_str(&format!("\n2024-01-{:02},{}.5,{},{},{},{}", i + 1, 100 + i, 110 + i, 90 + i, 105 + i, 1000 * i));
        }

        let series = decode_ohlcv(&text).unwrap();
        assert_eq!(series.len(), 25);
    }

    #[test]
    fn test_decode_preserves_supplied_order() {
        let text = format!(
            "{}\n2024-01-03,3,3,3,3,3\n2024-01-01,1,1,1,1,1\n2024-01-02,2,2,2,2,2",
            HEADER
        );
        let series = decode_ohlcv(&text).unwrap();

        let dates: Vec<&str> = series.bars().iter().map(|b| b.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-03", "2024-01-01", "2024-01-02"]);
    }

    #[test]
    fn test_decode_skips_blank_lines_and_trims() {
        let text = "\n\n  date , open , high , low , close , volume  \n\n   \n 2024-01-01 , 1.5 , 2 , 1 , 1.75 , 10 \n\n";
        let series = decode_ohlcv(text).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series.first().date, "2024-01-01");
        assert_eq!(series.first().close, 1.75);
    }

    #[test]
    fn test_decode_reordered_and_extra_columns() {
        let text = "ticker,volume,close,low,high,open,date\nCOMI,500,10,9,11,9.5,2024-02-01\n";
        let series = decode_ohlcv(text).unwrap();

        let bar = series.first();
        assert_eq!(bar.open, 9.5);
        assert_eq!(bar.high, 11.0);
        assert_eq!(bar.volume, 500);
    }

    #[test]
    fn test_decode_header_is_case_insensitive() {
        let text = "Date,Open,High,Low,Close,Volume\n2024-01-01,1,2,0.5,1.5,100\n";
        let series = decode_ohlcv(text).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_decode_crlf_and_bom() {
        let text = "\u{feff}date,open,high,low,close,volume\r\n2024-01-01,1,2,0.5,1.5,100\r\n";
        let series = decode_ohlcv(text).unwrap();
        assert_eq!(series.first().volume, 100);
    }

    #[test]
    fn test_decode_integral_float_volume() {
        let text = format!("{}\n2024-01-01,1,2,0.5,1.5,1000.0", HEADER);
        let series = decode_ohlcv(&text).unwrap();
        assert_eq!(series.first().volume, 1000);
    }

    #[test]
    fn test_decode_quoted_fields() {
        let text = format!("{}\n\"Jan 1, 2024\",1,2,0.5,1.5,100", HEADER);
        let series = decode_ohlcv(&text).unwrap();
        assert_eq!(series.first().date, "Jan 1, 2024");
    }

    // ============= Error Tests =============

    #[test]
    fn test_decode_header_only_is_missing_header() {
        assert_eq!(decode_ohlcv(HEADER), Err(DecodeError::MissingHeader));
        assert_eq!(decode_ohlcv(""), Err(DecodeError::MissingHeader));
        assert_eq!(decode_ohlcv("\n  \n\n"), Err(DecodeError::MissingHeader));
    }

    #[test]
    fn test_decode_missing_columns_named_exactly() {
        let text = "date,open,close\n2024-01-01,1,2\n";
        match decode_ohlcv(text) {
            Err(DecodeError::MissingColumns(missing)) => {
                assert_eq!(missing, vec!["high", "low", "volume"]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_extra_required_columns() {
        let text = format!("{}\n2024-01-01,1,2,0.5,1.5,100", HEADER);
        match decode(&text, &["date", "Ticker"]) {
            Err(DecodeError::MissingColumns(missing)) => assert_eq!(missing, vec!["ticker"]),
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_non_numeric_open_cites_line() {
        let text = format!(
            "{}\n2024-01-01,1,2,0.5,1.5,100\n2024-01-02,abc,2,0.5,1.5,100\n",
            HEADER
        );
        match decode_ohlcv(&text) {
            Err(DecodeError::MalformedRow { line, reason }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("open"), "reason was: {}", reason);
            }
            other => panic!("expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_line_numbers_count_blank_lines() {
        let text = format!("{}\n\n\n2024-01-01,1,2,0.5,x,100\n", HEADER);
        match decode_ohlcv(&text) {
            Err(DecodeError::MalformedRow { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_short_row_rejected() {
        let text = format!("{}\n2024-01-01,1,2,0.5\n", HEADER);
        match decode_ohlcv(&text) {
            Err(DecodeError::MalformedRow { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("expected 6 fields"));
            }
            other => panic!("expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_non_finite_and_fractional_volume() {
        let inf = format!("{}\n2024-01-01,inf,2,0.5,1.5,100", HEADER);
        assert!(matches!(decode_ohlcv(&inf), Err(DecodeError::MalformedRow { line: 2, .. })));

        let nan = format!("{}\n2024-01-01,1,NaN,0.5,1.5,100", HEADER);
        assert!(matches!(decode_ohlcv(&nan), Err(DecodeError::MalformedRow { line: 2, .. })));

        let fractional = format!("{}\n2024-01-01,1,2,0.5,1.5,100.5", HEADER);
        match decode_ohlcv(&fractional) {
            Err(DecodeError::MalformedRow { reason, .. }) => assert!(reason.contains("volume")),
            other => panic!("expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_empty_date_rejected() {
        let text = format!("{}\n,1,2,0.5,1.5,100", HEADER);
        assert!(matches!(decode_ohlcv(&text), Err(DecodeError::MalformedRow { line: 2, .. })));
    }
}
