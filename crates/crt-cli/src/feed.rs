//! 재생용 입력 파일 리더.
//!
//! - CSV: `timestamp,open,high,low,close` (심볼 없음, `--symbol`로 지정)
//! - JSONL: 줄마다 `{symbol, epoch, open?, high?, low?, close, price?}` 와이어 레코드

use crate::error::{FeedError, Result};
use chrono::NaiveDateTime;
use crt_core::RawRecord;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// 입력 파일 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FeedFormat {
    /// timestamp,open,high,low,close
    Csv,
    /// 줄 단위 JSON 와이어 레코드
    Jsonl,
}

impl FeedFormat {
    /// 파일 확장자로 형식을 추정합니다.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(FeedFormat::Csv),
            "jsonl" | "ndjson" | "json" => Some(FeedFormat::Jsonl),
            _ => None,
        }
    }
}

/// 레코드 스트림.
pub type RecordIter = Box<dyn Iterator<Item = Result<RawRecord>> + Send>;

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

/// epoch 초 또는 `%Y-%m-%d %H:%M:%S`(UTC) 타임스탬프를 해석합니다.
pub fn parse_timestamp(value: &str) -> Result<i64> {
    let value = value.trim();
    if let Ok(epoch) = value.parse::<i64>() {
        return Ok(epoch);
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|_| FeedError::Timestamp(value.to_string()))
}

/// CSV 캔들을 레코드 스트림으로 읽습니다.
pub fn read_csv<R: Read + Send + 'static>(reader: R, symbol: String) -> RecordIter {
    let rows = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
        .into_deserialize::<CsvRow>();

    Box::new(rows.map(move |row| {
        let row = row?;
        Ok(RawRecord {
            symbol: Some(symbol.clone()),
            epoch: Some(parse_timestamp(&row.timestamp)?),
            open: Some(row.open),
            high: Some(row.high),
            low: Some(row.low),
            close: Some(row.close),
            price: None,
        })
    }))
}

/// JSONL 와이어 레코드를 레코드 스트림으로 읽습니다. 빈 줄은 건너뜁니다.
pub fn read_jsonl<R: Read + Send + 'static>(reader: R) -> RecordIter {
    let lines = BufReader::new(reader).lines().enumerate();

    Box::new(lines.filter_map(|(index, line)| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(
            serde_json::from_str::<RawRecord>(&line).map_err(|source| FeedError::Json {
                line: index + 1,
                source,
            }),
        ),
        Err(e) => Some(Err(e.into())),
    }))
}

/// 파일을 열어 형식에 맞는 레코드 스트림을 반환합니다.
pub fn open(path: &Path, format: Option<FeedFormat>, symbol: &str) -> Result<RecordIter> {
    let format = format
        .or_else(|| FeedFormat::from_path(path))
        .ok_or_else(|| FeedError::UnknownFormat(path.display().to_string()))?;
    let file = File::open(path)?;

    Ok(match format {
        FeedFormat::Csv => read_csv(file, symbol.to_string()),
        FeedFormat::Jsonl => read_jsonl(file),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("1704067200").unwrap(), 1_704_067_200);
        assert_eq!(
            parse_timestamp("2024-01-01 01:00:00").unwrap(),
            1_704_067_200 + 3_600
        );
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(FeedError::Timestamp(_))
        ));
    }

    #[test]
    fn test_read_csv() {
        let data = "timestamp,open,high,low,close\n\
                    2024-01-01 00:00:00, 10.0, 11.0, 9.5, 10.5\n\
                    1704067260,10.5,12.0,10.0,11.5\n";
        let records: Vec<RawRecord> = read_csv(Cursor::new(data), "R_75".to_string())
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].symbol.as_deref(), Some("R_75"));
        assert_eq!(records[0].epoch, Some(1_704_067_200));
        assert_eq!(records[1].high, Some(12.0));
        assert!(records[1].validate().is_ok());
    }

    #[test]
    fn test_read_csv_bad_timestamp() {
        let data = "timestamp,open,high,low,close\nnope,1,1,1,1\n";
        let mut records = read_csv(Cursor::new(data), "R_75".to_string());
        assert!(matches!(records.next(), Some(Err(FeedError::Timestamp(_)))));
    }

    #[test]
    fn test_read_jsonl_skips_blank_lines() {
        let data = r#"{"symbol":"R_75","epoch":60,"price":1.5}

{"symbol":"R_75","epoch":61,"close":1.6}
not json
"#;
        let records: Vec<Result<RawRecord>> = read_jsonl(Cursor::new(data)).collect();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].as_ref().unwrap().price, Some(1.5));
        assert_eq!(records[1].as_ref().unwrap().close, Some(1.6));
        assert!(matches!(records[2], Err(FeedError::Json { line: 4, .. })));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            FeedFormat::from_path(Path::new("data/r75.CSV")),
            Some(FeedFormat::Csv)
        );
        assert_eq!(
            FeedFormat::from_path(Path::new("ticks.jsonl")),
            Some(FeedFormat::Jsonl)
        );
        assert_eq!(FeedFormat::from_path(Path::new("ticks.bin")), None);
    }
}
