//! Unit tests for the engine wire schema and outcome classification.

#[cfg(test)]
mod types_tests {
    use crate::data::bar::{ColumnarSeries, MarketSeries, OhlcvBar};
    use crate::data::request::AnalysisRequest;
    use crate::engine::process::classify_exit;
    use crate::engine::types::{AnalysisOutcome, EnginePayload};
    use crate::error::ErrorKind;
    use serde_json::json;

    fn bar(date: &str, close: f64, volume: i64) -> OhlcvBar {
        OhlcvBar {
            date: date.to_string(),
            open: close - 1.0,
            high: close + 2.0,
            low: close - 2.5,
            close,
            volume,
        }
    }

    // ============= Wire Schema Tests =============

    #[test]
    fn test_payload_is_columnar() {
        let series = MarketSeries::new(vec![bar("2024-01-01", 104.0, 1000), bar("2024-01-02", 0.1 + 0.2, 7)]).unwrap();
        let payload = EnginePayload::from_request(&AnalysisRequest::new(series));
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["dates"], json!(["2024-01-01", "2024-01-02"]));
        assert_eq!(value["close"][0], json!(104.0));
        assert_eq!(value["volume"], json!([1000, 7]));
        assert_eq!(value["analysisType"], json!("standard"));
        assert_eq!(value["rawOptions"], json!({}));
    }

    #[test]
    fn test_payload_json_round_trip() {
        let series = MarketSeries::new(vec![
            bar("2024-01-01", 104.0, 1000),
            bar("2024-01-02", 0.1 + 0.2, 7),
            bar("2024-01-03", 1e-9, i64::MAX),
        ])
        .unwrap();
        let request = AnalysisRequest::new(series.clone()).with_analysis_type(Some("custom"));

        let text = EnginePayload::from_request(&request).to_json().unwrap();
        let decoded: EnginePayload = serde_json::from_str(&text).unwrap();
        let back = decoded.into_request().unwrap();

        assert_eq!(back.analysis_type, "custom");
        assert_eq!(back.series.len(), series.len());
        for (a, b) in back.series.bars().iter().zip(series.bars()) {
            assert_eq!(a.date, b.date);
            assert!((a.close - b.close).abs() < 1e-12);
            assert!((a.open - b.open).abs() < 1e-12);
            assert_eq!(a.volume, b.volume);
        }
    }

    #[test]
    fn test_payload_missing_raw_options_defaults() {
        let value = json!({
            "dates": ["2024-01-01"],
            "open": [1.0], "high": [2.0], "low": [0.5], "close": [1.5], "volume": [10],
            "analysisType": "standard"
        });
        let payload: EnginePayload = serde_json::from_value(value).unwrap();
        assert!(payload.raw_options.is_empty());
    }

    #[test]
    fn test_columnar_ragged_and_empty() {
        let ragged = ColumnarSeries {
            dates: vec!["a".into(), "b".into()],
            open: vec![1.0, 2.0],
            high: vec![1.0, 2.0],
            low: vec![1.0, 2.0],
            close: vec![1.0],
            volume: vec![1, 2],
        };
        assert_eq!(ragged.into_series().unwrap_err(), "close");

        let empty = ColumnarSeries {
            dates: vec![],
            open: vec![],
            high: vec![],
            low: vec![],
            close: vec![],
            volume: vec![],
        };
        assert!(empty.is_empty());
        assert!(empty.into_series().is_err());
    }

    // ============= Outcome Tests =============

    #[test]
    fn test_outcome_error_kinds() {
        assert_eq!(AnalysisOutcome::Success(json!({})).error_kind(), None);
        assert_eq!(
            AnalysisOutcome::EngineFailure { exit_code: 1, stderr: String::new() }.error_kind(),
            Some(ErrorKind::Engine)
        );
        assert_eq!(
            AnalysisOutcome::MalformedOutput("x".into()).error_kind(),
            Some(ErrorKind::Engine)
        );
        assert_eq!(AnalysisOutcome::Timeout.error_kind(), Some(ErrorKind::Timeout));
        assert_eq!(ErrorKind::Timeout.status_code(), 504);
    }

    #[test]
    fn test_classify_wait_error() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "interrupted");
        match classify_exit(Err(err), b"", b"") {
            AnalysisOutcome::EngineFailure { exit_code, stderr } => {
                assert_eq!(exit_code, -1);
                assert!(stderr.contains("interrupted"));
            }
            other => panic!("expected EngineFailure, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_classify_exit_statuses() {
        use std::os::unix::process::ExitStatusExt;
        use std::process::ExitStatus;

        let ok = || Ok(ExitStatus::from_raw(0));
        assert_eq!(
            classify_exit(ok(), b"  {\"trend\": \"Bearish\"}\n", b"warning"),
            AnalysisOutcome::Success(json!({ "trend": "Bearish" }))
        );
        assert_eq!(
            classify_exit(ok(), b"Traceback", b""),
            AnalysisOutcome::MalformedOutput("Traceback".to_string())
        );

        // Raw wait status: exit code lives in the high byte
        assert_eq!(
            classify_exit(Ok(ExitStatus::from_raw(2 << 8)), b"{}", b"boom"),
            AnalysisOutcome::EngineFailure { exit_code: 2, stderr: "boom".to_string() }
        );

        // Killed by SIGKILL: no exit code
        assert_eq!(
            classify_exit(Ok(ExitStatus::from_raw(9)), b"", b""),
            AnalysisOutcome::EngineFailure { exit_code: -1, stderr: String::new() }
        );
    }
}
