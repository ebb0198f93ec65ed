use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, ArrayRef, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::model::{EntityCode, Indicator, RawRecord};

/// World Bank codes for regional and income aggregates. Codes containing a
/// digit are aggregates as well.
const AGGREGATE_CODES: &[&str] = &[
    "EU", "OE", "XC", "XD", "XE", "XF", "XG", "XH", "XI", "XJ", "XL", "XM", "XN", "XO", "XP", "XQ",
    "XT", "XU", "XY", "ZB", "ZF", "ZG", "ZH", "ZI", "ZJ", "ZQ", "ZT",
];

/// Whether `code` names an aggregate rather than a country.
pub fn is_aggregate_code(code: &str) -> bool {
    AGGREGATE_CODES.contains(&code) || code.chars().any(|c| c.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a long-format databank export. Dispatch by extension.
///
/// Every format carries the columns
/// `date, indicator_id, country_id, country_name, region, value`;
/// `region` and `value` may be empty. Rows for indicators the explorer does
/// not chart and rows for aggregate codes are dropped.
///
/// Supported formats:
/// * `.parquet` – Parquet file (recommended)
/// * `.json`    – `[{ "date": 2000, "indicator_id": "...", ... }, ...]`
/// * `.csv`     – header row with the column names above
pub fn load_databank(path: &Path) -> Result<Vec<RawRecord>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let rows = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        "csv" => load_csv(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    let total = rows.len();
    let records: Vec<RawRecord> = rows.into_iter().filter_map(DatabankRow::into_record).collect();
    log::debug!(
        "{}: kept {} of {total} databank rows",
        path.display(),
        records.len()
    );
    Ok(records)
}

/// One row of the databank, before indicator and aggregate filtering.
#[derive(Debug, Clone, PartialEq, Deserialize)]
struct DatabankRow {
    date: i32,
    indicator_id: String,
    country_id: String,
    country_name: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    value: Option<f64>,
}

impl DatabankRow {
    fn into_record(self) -> Option<RawRecord> {
        if is_aggregate_code(&self.country_id) {
            return None;
        }
        let indicator = Indicator::from_code(&self.indicator_id)?;
        Some(RawRecord {
            entity: EntityCode(self.country_id),
            name: self.country_name,
            region: self.region.filter(|r| !r.is_empty()),
            indicator,
            year: self.date,
            value: self.value.filter(|v| v.is_finite()),
        })
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> Result<Vec<DatabankRow>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    serde_json::from_str(&text).context("parsing JSON databank (expected an array of rows)")
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Vec<DatabankRow>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    reader
        .deserialize()
        .enumerate()
        .map(|(row_no, result)| result.with_context(|| format!("CSV row {row_no}")))
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet databank. `date` may be Int32 or Int64, `value` Float32
/// or Float64; string columns are Utf8 or LargeUtf8.
fn load_parquet(path: &Path) -> Result<Vec<DatabankRow>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let date = column(&batch, "date")?;
        let indicator = column(&batch, "indicator_id")?;
        let country = column(&batch, "country_id")?;
        let name = column(&batch, "country_name")?;
        let region = batch.schema().index_of("region").ok().map(|i| batch.column(i));
        let value = column(&batch, "value")?;

        for row in 0..batch.num_rows() {
            let context = || format!("Row {row}");
            rows.push(DatabankRow {
                date: extract_i32(date, row).with_context(context)?,
                indicator_id: extract_string(indicator, row).with_context(context)?,
                country_id: extract_string(country, row).with_context(context)?,
                country_name: extract_string(name, row).with_context(context)?,
                region: region.and_then(|col| extract_string(col, row).ok()),
                value: extract_f64(value, row),
            });
        }
    }

    Ok(rows)
}

// -- Parquet / Arrow helpers --

fn column<'b>(batch: &'b RecordBatch, name: &str) -> Result<&'b ArrayRef> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))?;
    Ok(batch.column(idx))
}

fn extract_i32(col: &ArrayRef, row: usize) -> Result<i32> {
    if col.is_null(row) {
        bail!("null year");
    }
    match col.data_type() {
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            Ok(arr.value(row))
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            i32::try_from(arr.value(row)).context("year out of range")
        }
        other => bail!("Expected integer year column, got {other:?}"),
    }
}

fn extract_string(col: &ArrayRef, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null string");
    }
    match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Ok(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        other => bail!("Expected string column, got {other:?}"),
    }
}

fn extract_f64(col: &ArrayRef, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
        Some(arr.value(row))
    } else {
        col.as_any()
            .downcast_ref::<Float32Array>()
            .map(|arr| f64::from(arr.value(row)))
    }
}
