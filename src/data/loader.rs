use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray, TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use chrono::{NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::model::{Dataset, FieldValue, Record};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a tabular dataset from a flat file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one record per line (the cleaned exports)
/// * `.json`    – records-oriented array `[{ "col": value, ... }, ...]`
/// * `.parquet` – flat table with scalar columns
///
/// Loading is side-effect free and idempotent: the files are static, so
/// re-loading the same path yields the same dataset.
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

/// Timestamp layouts seen across the consultation and inventory exports.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DAY_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

fn parse_date(s: &str) -> Option<NaiveDateTime> {
    for fmt in DATE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DAY_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Coerce one text cell: empty → null, then integer, float, date, string.
fn coerce_value(s: &str) -> FieldValue {
    if s.is_empty() {
        return FieldValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return FieldValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return FieldValue::Float(f);
    }
    if let Some(dt) = parse_date(s) {
        return FieldValue::Date(dt);
    }
    FieldValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(col, cell)| (col.clone(), coerce_value(cell.trim())))
            .collect();
        records.push(record);
    }

    Ok(Dataset::from_records(records))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default
/// `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "SAVSNET MPC": "vaccination", "Consult_date": "2018-03-01 09:30:00" },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        let record: Record = obj
            .iter()
            .map(|(col, val)| (col.clone(), json_to_value(val)))
            .collect();
        records.push(record);
    }

    Ok(Dataset::from_records(records))
}

fn json_to_value(val: &JsonValue) -> FieldValue {
    match val {
        // Strings go through the same coercion ladder as CSV cells so date
        // columns come out typed regardless of source format.
        JsonValue::String(s) => coerce_value(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                FieldValue::Float(f)
            } else {
                FieldValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => FieldValue::String(b.to_string()),
        JsonValue::Null => FieldValue::Null,
        other => FieldValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet table. Every column is scalar; list columns are not
/// supported. Works with files written by `df.to_parquet()`.
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let columns: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, f)| (i, f.name().clone()))
            .collect();

        for row in 0..batch.num_rows() {
            let record: Record = columns
                .iter()
                .map(|(col_idx, col_name)| {
                    let value = extract_value(batch.column(*col_idx), row);
                    (col_name.clone(), value)
                })
                .collect();
            records.push(record);
        }
    }

    Ok(Dataset::from_records(records))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &Arc<dyn Array>, row: usize) -> FieldValue {
    if col.is_null(row) {
        return FieldValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            let text = if let Some(s) = col.as_any().downcast_ref::<StringArray>() {
                s.value(row).to_string()
            } else {
                // LargeStringArray
                col.as_string::<i64>().value(row).to_string()
            };
            coerce_value(text.trim())
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().unwrap();
            FieldValue::Integer(i64::from(arr.value(row)))
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().unwrap();
            FieldValue::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col.as_any().downcast_ref::<Float32Array>().unwrap();
            FieldValue::Float(f64::from(arr.value(row)))
        }
        DataType::Float64 => {
            let arr = col.as_any().downcast_ref::<Float64Array>().unwrap();
            FieldValue::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col.as_any().downcast_ref::<BooleanArray>().unwrap();
            FieldValue::String(arr.value(row).to_string())
        }
        DataType::Date32 => {
            let arr = col.as_any().downcast_ref::<Date32Array>().unwrap();
            arr.value_as_date(row)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(FieldValue::Date)
                .unwrap_or(FieldValue::Null)
        }
        DataType::Timestamp(unit, _) => {
            let dt = match unit {
                TimeUnit::Second => col
                    .as_any()
                    .downcast_ref::<TimestampSecondArray>()
                    .and_then(|a| a.value_as_datetime(row)),
                TimeUnit::Millisecond => col
                    .as_any()
                    .downcast_ref::<TimestampMillisecondArray>()
                    .and_then(|a| a.value_as_datetime(row)),
                TimeUnit::Microsecond => col
                    .as_any()
                    .downcast_ref::<TimestampMicrosecondArray>()
                    .and_then(|a| a.value_as_datetime(row)),
                TimeUnit::Nanosecond => col
                    .as_any()
                    .downcast_ref::<TimestampNanosecondArray>()
                    .and_then(|a| a.value_as_datetime(row)),
            };
            dt.map(FieldValue::Date).unwrap_or(FieldValue::Null)
        }
        _ => FieldValue::Null,
    }
}

// ---------------------------------------------------------------------------
// Abbreviation config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AbbrevEntry {
    #[serde(rename = "Abbreviation")]
    abbreviation: String,
    #[serde(rename = "Meaning")]
    meaning: String,
}

/// Load the abbreviation → definition mapping used to annotate consultation
/// notes. Keys are uppercased so lookups are case-insensitive.
pub fn load_abbreviations(path: &Path) -> Result<BTreeMap<String, String>> {
    let text = std::fs::read_to_string(path).context("reading abbreviations file")?;
    let entries: Vec<AbbrevEntry> =
        serde_json::from_str(&text).context("parsing abbreviations JSON")?;
    Ok(entries
        .into_iter()
        .map(|e| (e.abbreviation.to_uppercase(), e.meaning))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn coercion_ladder_types_each_cell() {
        assert_eq!(coerce_value(""), FieldValue::Null);
        assert_eq!(coerce_value("3"), FieldValue::Integer(3));
        assert_eq!(coerce_value("3.5"), FieldValue::Float(3.5));
        assert!(matches!(
            coerce_value("2018-03-01 09:30:00"),
            FieldValue::Date(_)
        ));
        assert!(matches!(coerce_value("2018-03-01"), FieldValue::Date(_)));
        assert!(matches!(coerce_value("14/07/1995"), FieldValue::Date(_)));
        assert_eq!(
            coerce_value("vaccination"),
            FieldValue::String("vaccination".to_string())
        );
    }

    #[test]
    fn csv_loads_typed_records() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "SAVSNET MPC,Consult_date,Weight").unwrap();
        writeln!(file, "vaccination,2018-03-01 09:30:00,4.2").unwrap();
        writeln!(file, "gastroenteric,2018-03-02 14:00:00,").unwrap();
        file.flush().unwrap();

        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(
            ds.column_names,
            vec![
                "Consult_date".to_string(),
                "SAVSNET MPC".to_string(),
                "Weight".to_string()
            ]
        );
        assert!(matches!(
            ds.records[0].get("Consult_date"),
            Some(FieldValue::Date(_))
        ));
        assert_eq!(ds.records[1].get("Weight"), Some(&FieldValue::Null));
    }

    #[test]
    fn json_records_load_with_same_coercion() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"SAVSNET MPC": "trauma", "Consult_date": "2018-03-01 09:30:00", "Count": 2}}]"#
        )
        .unwrap();
        file.flush().unwrap();

        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.len(), 1);
        assert!(matches!(
            ds.records[0].get("Consult_date"),
            Some(FieldValue::Date(_))
        ));
        assert_eq!(ds.records[0].get("Count"), Some(&FieldValue::Integer(2)));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        assert!(load_file(Path::new("records.xlsx")).is_err());
    }

    #[test]
    fn abbreviations_parse_into_uppercased_map() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"Abbreviation": "rta", "Meaning": "road traffic accident"}},
                {{"Abbreviation": "BAR", "Meaning": "bright, alert, responsive"}}]"#
        )
        .unwrap();
        file.flush().unwrap();

        let map = load_abbreviations(file.path()).unwrap();
        assert_eq!(map["RTA"], "road traffic accident");
        assert_eq!(map["BAR"], "bright, alert, responsive");
    }
}
