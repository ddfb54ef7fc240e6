use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int32Type, Int64Type, UInt32Type, UInt64Type,
};
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{
    CellValue, CustomerRecord, CustomerTable, SubScores, CLUSTER, FREQUENCY, METRIC_COLUMNS,
    MONETARY, RECENCY, RFM_SCORE, SUB_SCORE_COLUMNS,
};
use crate::error::{Result, RfmError};

/// One parsed row before typing: column name → cell.
type RawRow = BTreeMap<String, CellValue>;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a customer table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one customer per line (the usual export)
/// * `.json`    – `[{ "Recency": 10, "Frequency": 5, ... }, ...]`
/// * `.parquet` – flat columns, e.g. written by `df.to_parquet()`
///
/// Either the whole file loads or an error is returned; a partial table is
/// never produced.
pub fn load_file(path: &Path) -> Result<CustomerTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => read_csv(std::fs::File::open(path)?)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(RfmError::UnsupportedFormat(other.to_string())),
    };

    log::info!(
        "Loaded {} customers from {} with columns {:?}",
        table.len(),
        path.display(),
        table.columns
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Parse a CSV table with a header row from any reader.
///
/// Used for files on disk and for reloading an exported byte buffer.
pub fn read_csv<R: Read>(source: R) -> Result<CustomerTable> {
    let mut reader = csv::Reader::from_reader(source);
    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| RfmError::malformed(format!("reading CSV header: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if columns.iter().all(|c| c.is_empty()) {
        return Err(RfmError::MalformedFile("CSV has no header row".into()));
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| RfmError::malformed(format!("CSV row {}: {e}", row_no + 1)))?;
        let cells: RawRow = columns
            .iter()
            .zip(record.iter())
            .map(|(col, value)| (col.clone(), CellValue::parse(value)))
            .collect();
        rows.push(cells);
    }

    log::debug!("Parsed {} CSV rows", rows.len());
    build_table(columns, rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "CustomerID": 17850, "Recency": 10, "Frequency": 5, "Monetary": 2000.0,
///     "R_Score": 5, "F_Score": 4, "M_Score": 3 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<CustomerTable> {
    let text = std::fs::read_to_string(path)?;
    let root: JsonValue =
        serde_json::from_str(&text).map_err(|e| RfmError::malformed(format!("parsing JSON: {e}")))?;

    let records = root
        .as_array()
        .ok_or_else(|| RfmError::MalformedFile("expected top-level JSON array".into()))?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| RfmError::MalformedFile(format!("row {} is not a JSON object", i + 1)))?;

        let mut cells = RawRow::new();
        for (key, val) in obj {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
            cells.insert(key.clone(), json_to_cell(val));
        }
        rows.push(cells);
    }

    build_table(columns, rows)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one flat column per field.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Nested columns are read as their
/// display text.
fn load_parquet(path: &Path) -> Result<CustomerTable> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| RfmError::malformed(format!("reading parquet metadata: {e}")))?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder
        .build()
        .map_err(|e| RfmError::malformed(format!("building parquet reader: {e}")))?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch =
            batch_result.map_err(|e| RfmError::malformed(format!("reading parquet batch: {e}")))?;
        for row in 0..batch.num_rows() {
            let mut cells = RawRow::new();
            for (col_idx, col_name) in columns.iter().enumerate() {
                cells.insert(col_name.clone(), extract_cell(batch.column(col_idx), row)?);
            }
            rows.push(cells);
        }
    }

    build_table(columns, rows)
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &ArrayRef, row: usize) -> Result<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let cell = match col.data_type() {
        DataType::Utf8 => CellValue::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt32 => CellValue::Integer(col.as_primitive::<UInt32Type>().value(row) as i64),
        DataType::UInt64 => {
            let v = col.as_primitive::<UInt64Type>().value(row);
            i64::try_from(v)
                .map(CellValue::Integer)
                .unwrap_or(CellValue::Float(v as f64))
        }
        DataType::Float32 => CellValue::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => CellValue::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        _ => {
            let text = array_value_to_string(col, row).map_err(RfmError::malformed)?;
            CellValue::parse(&text)
        }
    };
    Ok(cell)
}

// ---------------------------------------------------------------------------
// Typing: raw rows → CustomerTable
// ---------------------------------------------------------------------------

/// Which optional column groups the header carries.
struct Layout {
    scores: bool,
    rfm_score: bool,
    cluster: bool,
}

impl Layout {
    fn of(columns: &[String]) -> Self {
        let has = |name: &str| columns.iter().any(|c| c == name);
        Layout {
            scores: SUB_SCORE_COLUMNS.iter().all(|c| has(*c)),
            rfm_score: has(RFM_SCORE),
            cluster: has(CLUSTER),
        }
    }
}

fn build_table(columns: Vec<String>, rows: Vec<RawRow>) -> Result<CustomerTable> {
    if let Some(missing) = METRIC_COLUMNS
        .iter()
        .find(|req| !columns.iter().any(|c| c == *req))
    {
        return Err(RfmError::MissingColumn(missing.to_string()));
    }

    let layout = Layout::of(&columns);
    let records = rows
        .into_iter()
        .enumerate()
        .map(|(i, cells)| record_from_cells(i + 1, cells, &layout))
        .collect::<Result<Vec<_>>>()?;

    Ok(CustomerTable::from_records(columns, records))
}

fn record_from_cells(row: usize, cells: RawRow, layout: &Layout) -> Result<CustomerRecord> {
    let scores = if layout.scores {
        Some(SubScores {
            r: numeric(&cells, SUB_SCORE_COLUMNS[0], row)?,
            f: numeric(&cells, SUB_SCORE_COLUMNS[1], row)?,
            m: numeric(&cells, SUB_SCORE_COLUMNS[2], row)?,
        })
    } else {
        None
    };
    let rfm_score = if layout.rfm_score {
        Some(numeric(&cells, RFM_SCORE, row)?)
    } else {
        None
    };
    let cluster = if layout.cluster {
        Some(cells.get(CLUSTER).cloned().unwrap_or(CellValue::Null))
    } else {
        None
    };

    Ok(CustomerRecord {
        recency: numeric(&cells, RECENCY, row)?,
        frequency: numeric(&cells, FREQUENCY, row)?,
        monetary: numeric(&cells, MONETARY, row)?,
        scores,
        rfm_score,
        cluster,
        segment: None,
        cells,
    })
}

fn numeric(cells: &RawRow, column: &str, row: usize) -> Result<f64> {
    let cell = cells.get(column).unwrap_or(&CellValue::Null);
    cell.as_f64().filter(|v| v.is_finite()).ok_or_else(|| {
        RfmError::MalformedFile(format!(
            "row {row}: column '{column}' is not a finite number ('{cell}')"
        ))
    })
}
