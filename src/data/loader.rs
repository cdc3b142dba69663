use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, Float32Array, Float64Array, StringArray};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::RawGrid;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load excitation–emission grids from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – delimited numeric grid (first row = excitation axis,
///   first column = emission axis, cell [0][0] ignored)
/// * `.json`    – a bare 2D array, or `{ "name": "...", "grid": [[...]] }`
/// * `.parquet` – long format: `excitation`, `emission`, `intensity`
///   columns, optional `name` column holding one spectrum name per row
///
/// Whatever the format, the grids returned here are rectangular: ragged CSV
/// rows and absent long-format cells are padded with NaN before the data
/// reaches [`crate::Spectrum::from_grid`].
pub fn load_file(path: &Path) -> Result<Vec<RawGrid>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "txt" => Ok(vec![load_csv(path)?]),
        "json" => Ok(vec![load_json(path)?]),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// Default grid name: the file stem.
fn stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("spectrum")
        .to_string()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Comma-delimited grid, no header row. Rows shorter than the widest row
/// are padded with NaN; empty cells also read as NaN.
fn load_csv(path: &Path) -> Result<RawGrid> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;

    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let mut row = Vec::with_capacity(record.len());
        for (col, tok) in record.iter().enumerate() {
            row.push(
                parse_cell(tok)
                    .with_context(|| format!("Row {row_no}, column {col}: '{tok}'"))?,
            );
        }
        rows.push(row);
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let ragged = rows.iter().filter(|r| r.len() < width).count();
    if ragged > 0 {
        log::debug!("{}: padded {ragged} ragged rows to {width} columns", path.display());
    }
    for row in &mut rows {
        row.resize(width, f64::NAN);
    }

    if rows.len() < 2 || width < 2 {
        bail!("Grid needs at least 2 rows and 2 columns, got {}x{width}", rows.len());
    }
    Ok(RawGrid::new(stem(path), rows))
}

fn parse_cell(tok: &str) -> Result<f64> {
    let tok = tok.trim();
    if tok.is_empty() {
        return Ok(f64::NAN);
    }
    tok.parse::<f64>().map_err(|_| anyhow::anyhow!("not a number"))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Either a bare grid:
///
/// ```json
/// [[0, 400, 450], [500, 1.0, 2.0], [550, 3.0, 4.0]]
/// ```
///
/// or an object carrying a name:
///
/// ```json
/// { "name": "dilution 1:10", "grid": [[0, 400, 450], ...] }
/// ```
fn load_json(path: &Path) -> Result<RawGrid> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let (name, grid_value) = match &root {
        JsonValue::Array(_) => (stem(path), &root),
        JsonValue::Object(obj) => {
            let name = obj
                .get("name")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| stem(path));
            let grid = obj.get("grid").context("Expected a 'grid' key")?;
            (name, grid)
        }
        _ => bail!("Expected a top-level JSON array or object"),
    };

    let rows_json = grid_value.as_array().context("'grid' is not an array")?;
    let mut rows = Vec::with_capacity(rows_json.len());
    for (i, row_value) in rows_json.iter().enumerate() {
        let cells = row_value
            .as_array()
            .with_context(|| format!("Grid row {i} is not an array"))?;
        let row: Vec<f64> = cells
            .iter()
            .map(|v| v.as_f64().unwrap_or(f64::NAN))
            .collect();
        rows.push(row);
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(width, f64::NAN);
    }
    if rows.len() < 2 || width < 2 {
        bail!("Grid needs at least 2 rows and 2 columns, got {}x{width}", rows.len());
    }
    Ok(RawGrid::new(name, rows))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Long-format Parquet: one row per (excitation, emission) pair.
///
/// Expected schema:
/// - `excitation`: Float64 (or Float32)
/// - `emission`:   Float64 (or Float32)
/// - `intensity`:  Float64 (or Float32)
/// - `name`:       Utf8, optional – groups rows into separate spectra
///
/// Rows are pivoted into grids; (excitation, emission) combinations absent
/// from the file become NaN cells.
fn load_parquet(path: &Path) -> Result<Vec<RawGrid>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    // name → long-format cells, insertion-ordered.
    let mut series: Vec<(String, Vec<(f64, f64, f64)>)> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let ex = f64_column(&batch, "excitation")?;
        let em = f64_column(&batch, "emission")?;
        let intensity = f64_column(&batch, "intensity")?;

        let names: Option<&StringArray> = match schema.index_of("name") {
            Ok(idx) => Some(
                batch
                    .column(idx)
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .context("'name' column is not Utf8")?,
            ),
            Err(_) => None,
        };

        for row in 0..batch.num_rows() {
            let name = match names {
                Some(arr) if !arr.is_null(row) => arr.value(row).to_string(),
                _ => stem(path),
            };
            let cell = (ex[row], em[row], intensity[row]);
            match series.iter_mut().find(|(n, _)| *n == name) {
                Some((_, cells)) => cells.push(cell),
                None => series.push((name, vec![cell])),
            }
        }
    }

    if series.is_empty() {
        bail!("Parquet file holds no rows");
    }
    series
        .into_iter()
        .map(|(name, cells)| pivot(name, &cells))
        .collect()
}

/// Extract a Float64 (or Float32) column as `Vec<f64>`.
fn f64_column(batch: &arrow::record_batch::RecordBatch, column: &str) -> Result<Vec<f64>> {
    let idx = batch
        .schema()
        .index_of(column)
        .map_err(|_| anyhow::anyhow!("Parquet file missing '{column}' column"))?;
    let col: &Arc<dyn Array> = batch.column(idx);

    if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
        Ok((0..arr.len())
            .map(|i| if arr.is_null(i) { f64::NAN } else { arr.value(i) })
            .collect())
    } else if let Some(arr) = col.as_any().downcast_ref::<Float32Array>() {
        Ok((0..arr.len())
            .map(|i| if arr.is_null(i) { f64::NAN } else { f64::from(arr.value(i)) })
            .collect())
    } else {
        bail!("Column '{column}' is {:?}, expected Float64 or Float32", col.data_type())
    }
}

/// Pivot long-format cells into the first-row/first-column grid layout.
fn pivot(name: String, cells: &[(f64, f64, f64)]) -> Result<RawGrid> {
    let mut ex_axis: Vec<f64> = cells.iter().map(|c| c.0).collect();
    ex_axis.sort_by(f64::total_cmp);
    ex_axis.dedup();
    let mut em_axis: Vec<f64> = cells.iter().map(|c| c.1).collect();
    em_axis.sort_by(f64::total_cmp);
    em_axis.dedup();

    let mut values = vec![vec![f64::NAN; ex_axis.len() + 1]; em_axis.len() + 1];
    values[0][0] = 0.0;
    for (j, &ex) in ex_axis.iter().enumerate() {
        values[0][j + 1] = ex;
    }
    for (i, &em) in em_axis.iter().enumerate() {
        values[i + 1][0] = em;
    }
    for &(ex, em, intensity) in cells {
        let col = ex_axis.binary_search_by(|v| v.total_cmp(&ex));
        let row = em_axis.binary_search_by(|v| v.total_cmp(&em));
        if let (Ok(col), Ok(row)) = (col, row) {
            values[row + 1][col + 1] = intensity;
        }
    }

    log::info!(
        "pivoted '{name}': {} excitation x {} emission samples from {} rows",
        ex_axis.len(),
        em_axis.len(),
        cells.len()
    );
    Ok(RawGrid::new(name, values))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
