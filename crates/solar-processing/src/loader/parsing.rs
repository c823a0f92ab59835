//! Raw file parsing with encoding and units-row fallbacks.

use crate::error::{Result, SolarError};
use crate::utils::{self, parse_timestamp};
use encoding_rs::WINDOWS_1252;
use polars::prelude::*;
use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Text encodings a raw export may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// Legacy single-byte encoding (ISO-8859-1 / Windows-1252).
    Latin1,
}

impl TextEncoding {
    /// Decode raw bytes. UTF-8 decoding is strict; Latin-1 always succeeds.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            Self::Latin1 => {
                let (text, _, _) = WINDOWS_1252.decode(bytes);
                Some(text)
            }
        }
    }
}

/// One way of reading a raw file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseStrategy {
    pub encoding: TextEncoding,
    pub skip_units_row: bool,
}

/// Strategies in the order they are attempted.
pub const STRATEGIES: [ParseStrategy; 4] = [
    ParseStrategy {
        encoding: TextEncoding::Utf8,
        skip_units_row: true,
    },
    ParseStrategy {
        encoding: TextEncoding::Utf8,
        skip_units_row: false,
    },
    ParseStrategy {
        encoding: TextEncoding::Latin1,
        skip_units_row: true,
    },
    ParseStrategy {
        encoding: TextEncoding::Latin1,
        skip_units_row: false,
    },
];

fn is_timestamp_name(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case("timestamp")
}

/// Name of the column recognized as the time axis, if any.
pub fn find_timestamp_column(df: &DataFrame) -> Option<String> {
    df.get_column_names()
        .iter()
        .find(|name| is_timestamp_name(name.as_str()))
        .map(|name| name.to_string())
}

/// Remove the row below the header when it is a units row.
///
/// Returns `None` when the second row is absent, when its timestamp cell
/// parses as a date-time, or when any other cell parses as a number. Such a
/// row holds data, possibly with a damaged timestamp.
pub fn strip_units_row(text: &str) -> Option<String> {
    let header_end = text.find('\n')?;
    let header = text[..header_end].trim_end_matches('\r');
    let ts_index = header
        .split(',')
        .position(|cell| is_timestamp_name(cell.trim_matches('"')))?;

    let rest = &text[header_end + 1..];
    let (second_row, remainder) = match rest.find('\n') {
        Some(end) => (&rest[..end], &rest[end + 1..]),
        None => (rest, ""),
    };
    let second_row = second_row.trim_end_matches('\r');
    if second_row.trim().is_empty() {
        return None;
    }

    let ts_cell = second_row.split(',').nth(ts_index).unwrap_or("");
    if parse_timestamp(ts_cell.trim_matches('"')).is_some() {
        return None;
    }
    let holds_numbers = second_row
        .split(',')
        .enumerate()
        .any(|(i, cell)| i != ts_index && utils::parse_numeric_cell(cell.trim_matches('"')).is_some());
    if holds_numbers {
        return None;
    }

    let mut stripped = String::with_capacity(text.len());
    stripped.push_str(&text[..=header_end]);
    stripped.push_str(remainder);
    Some(stripped)
}

fn read_csv_text(text: &str) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(text.as_bytes().to_vec()))
        .finish()
}

/// Parse the timestamp column into date-times and rename it to `target`.
///
/// Unparsable cells become null.
pub fn standardize_timestamp(mut df: DataFrame, source: &str, target: &str) -> Result<DataFrame> {
    let raw = df
        .column(source)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let millis: Vec<Option<i64>> = raw
        .str()?
        .into_iter()
        .map(|cell| {
            cell.and_then(parse_timestamp)
                .map(|dt| dt.and_utc().timestamp_millis())
        })
        .collect();

    let parsed = Series::new(source.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    df.replace(source, parsed)?;

    if source != target {
        df.rename(source, target.into())?;
    }
    Ok(df)
}

fn normalize_missing_floats(df: DataFrame) -> Result<DataFrame> {
    let columns = df
        .get_columns()
        .iter()
        .map(|col| utils::nan_to_null(col.as_materialized_series()).map(Column::from))
        .collect::<Result<Vec<_>>>()?;
    Ok(DataFrame::new(columns)?)
}

/// Parse raw file bytes, trying each strategy in [`STRATEGIES`] order.
///
/// The first strategy that yields a table with a timestamp column wins.
pub fn parse_table(bytes: &[u8], path: &Path, timestamp_column: &str) -> Result<DataFrame> {
    for strategy in STRATEGIES {
        let Some(text) = strategy.encoding.decode(bytes) else {
            debug!(?strategy, "Decoding failed");
            continue;
        };

        let text = if strategy.skip_units_row {
            match strip_units_row(&text) {
                Some(stripped) => Cow::Owned(stripped),
                None => {
                    debug!(?strategy, "No units row below header");
                    continue;
                }
            }
        } else {
            text
        };

        let df = match read_csv_text(&text) {
            Ok(df) => df,
            Err(e) => {
                debug!(?strategy, error = %e, "CSV parsing failed");
                continue;
            }
        };

        let Some(source) = find_timestamp_column(&df) else {
            debug!(?strategy, "No timestamp column");
            continue;
        };

        debug!(?strategy, rows = df.height(), "Parsing strategy succeeded");
        let df = standardize_timestamp(df, &source, timestamp_column)?;
        return normalize_missing_floats(df);
    }

    Err(SolarError::UnparsableFile {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WITH_UNITS: &str = "Timestamp,GHI,Tamb\n,W/m2,C\n2021-08-09 00:01,1.5,25\n2021-08-09 00:02,2.5,26\n";
    const WITHOUT_UNITS: &str = "Timestamp,GHI,Tamb\n2021-08-09 00:01,1.5,25\n2021-08-09 00:02,2.5,26\n";

    #[test]
    fn test_strip_units_row() {
        let stripped = strip_units_row(WITH_UNITS).unwrap();
        assert_eq!(stripped, WITHOUT_UNITS);
        assert!(strip_units_row(WITHOUT_UNITS).is_none());
    }

    #[test]
    fn test_strip_units_row_crlf() {
        let text = "Timestamp,GHI\r\nyyyy-mm-dd,W/m2\r\n2021-08-09 00:01,1\r\n";
        assert_eq!(
            strip_units_row(text).unwrap(),
            "Timestamp,GHI\r\n2021-08-09 00:01,1\r\n"
        );
    }

    #[test]
    fn test_row_with_bad_timestamp_is_data() {
        assert!(strip_units_row("Timestamp,GHI\nN/A,5\n2021-08-09 00:02,6\n").is_none());
    }

    #[test]
    fn test_parse_table_keeps_row_with_bad_timestamp() {
        let text = "Timestamp,GHI\nN/A,5\n2021-08-09 00:02,6\n2021-08-09 00:03,7";
        let df = parse_table(text.as_bytes(), Path::new("x.csv"), "Timestamp").unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(
            utils::column_f64(&df, "GHI").unwrap(),
            vec![Some(5.0), Some(6.0), Some(7.0)]
        );
        assert_eq!(df.column("Timestamp").unwrap().null_count(), 1);
    }

    #[test]
    fn test_utf8_decoding_is_strict() {
        assert!(TextEncoding::Utf8.decode(&[0x43, 0xe9]).is_none());
        assert_eq!(TextEncoding::Latin1.decode(&[0x43, 0xe9]).unwrap(), "Cé");
    }

    #[test]
    fn test_parse_table_with_units_row() {
        let df = parse_table(WITH_UNITS.as_bytes(), Path::new("x.csv"), "Timestamp").unwrap();
        assert_eq!(df.height(), 2);
        assert!(matches!(
            df.column("Timestamp").unwrap().dtype(),
            DataType::Datetime(_, _)
        ));
        assert_eq!(
            utils::column_f64(&df, "GHI").unwrap(),
            vec![Some(1.5), Some(2.5)]
        );
    }

    #[test]
    fn test_parse_table_renames_timestamp_and_nulls_bad_dates() {
        let text = " timestamp ,GHI\n2021-08-09 00:01,1\nnot a date,2\n";
        let df = parse_table(text.as_bytes(), Path::new("x.csv"), "Timestamp").unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("Timestamp").unwrap().null_count(), 1);
    }

    #[test]
    fn test_parse_table_latin1() {
        let mut bytes = b"Timestamp,GHI,Comments\n2021-08-09 00:01,1,caf".to_vec();
        bytes.push(0xe9);
        bytes.push(b'\n');
        let df = parse_table(&bytes, Path::new("x.csv"), "Timestamp").unwrap();
        assert_eq!(df.height(), 1);
        let comment = df.column("Comments").unwrap().as_materialized_series().str().unwrap().get(0);
        assert_eq!(comment, Some("café"));
    }

    #[test]
    fn test_parse_table_without_timestamp_fails() {
        let err = parse_table(b"a,b\n1,2\n", Path::new("x.csv"), "Timestamp").unwrap_err();
        assert_eq!(err.error_code(), "UNPARSABLE_FILE");
    }
}
