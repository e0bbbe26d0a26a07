use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use arrow::array::Array;
use calamine::{Data, Reader, open_workbook_auto};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{Dataset, PositionTable};
use super::reshape;

// ---------------------------------------------------------------------------
// RawTable – a source file read as text cells
// ---------------------------------------------------------------------------

/// A source file with every cell kept as text, before any reshaping.
/// Empty cells are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Cell at (`row`, `col`); short rows read as null.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }

    /// Index of the first column whose trimmed header equals one of
    /// `aliases`, ignoring ASCII case. Aliases are tried in order.
    pub fn find_column(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|alias| {
            self.columns
                .iter()
                .position(|c| c.trim().eq_ignore_ascii_case(alias))
        })
    }
}

fn header_name(index: usize, raw: &str) -> String {
    if raw.trim().is_empty() {
        format!("Unnamed: {index}")
    } else {
        raw.to_string()
    }
}

// ---------------------------------------------------------------------------
// Sources – where the dataset comes from
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRole {
    Inventory,
    Recharges,
    Locations,
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRole::Inventory => write!(f, "inventory"),
            SourceRole::Recharges => write!(f, "recharges"),
            SourceRole::Locations => write!(f, "locations"),
        }
    }
}

/// Required input files that do not exist.
#[derive(Debug, Error, PartialEq)]
#[error("missing input file(s): {}", describe_missing(.0))]
pub struct MissingSources(pub Vec<(SourceRole, PathBuf)>);

fn describe_missing(missing: &[(SourceRole, PathBuf)]) -> String {
    missing
        .iter()
        .map(|(role, path)| format!("{role} '{}'", path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Paths of the input files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sources {
    pub inventory: PathBuf,
    pub recharges: PathBuf,
    /// Optional meter coordinates; its absence is not an error.
    pub locations: Option<PathBuf>,
}

impl Sources {
    /// Check that both required files exist.
    pub fn check_exists(&self) -> std::result::Result<(), MissingSources> {
        let missing: Vec<_> = [
            (SourceRole::Inventory, &self.inventory),
            (SourceRole::Recharges, &self.recharges),
        ]
        .into_iter()
        .filter(|(_, path)| !path.exists())
        .map(|(role, path)| (role, path.clone()))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MissingSources(missing))
        }
    }
}

/// Format knobs shared by all readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Field delimiter for CSV sources.
    pub delimiter: u8,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Read and reshape all sources into a fresh [`Dataset`].
pub fn load_dataset(sources: &Sources, options: &ReadOptions) -> Result<Dataset> {
    sources.check_exists()?;

    let inventory = read_table(&sources.inventory, options)
        .with_context(|| format!("reading inventory {}", sources.inventory.display()))?;
    let meters = reshape::melt_inventory(&inventory);

    let journal = read_table(&sources.recharges, options)
        .with_context(|| format!("reading recharges {}", sources.recharges.display()))?;
    let recharges = reshape::clean_recharges(&journal)
        .with_context(|| format!("cleaning recharges {}", sources.recharges.display()))?;

    let (positions, positions_error) = match &sources.locations {
        Some(path) if path.exists() => match load_positions(path, options) {
            Ok(table) => (Some(table), None),
            Err(e) => {
                log::warn!("Ignoring locations file {}: {e:#}", path.display());
                (None, Some(format!("{e:#}")))
            }
        },
        Some(path) => {
            log::warn!("Locations file {} not found, map disabled", path.display());
            (None, Some(format!("locations file {} not found", path.display())))
        }
        None => (None, None),
    };

    log::info!(
        "Loaded {} meters in {} localities, {} recharges (dates: {}), {} positions",
        meters.len(),
        meters.localities().len(),
        recharges.len(),
        recharges.has_dates,
        positions.as_ref().map_or(0, |p| p.len())
    );

    Ok(Dataset {
        meters,
        recharges,
        positions,
        positions_error,
    })
}

/// The locations file only feeds the map, so its errors stay out of
/// [`load_dataset`]'s result.
fn load_positions(path: &Path, options: &ReadOptions) -> Result<PositionTable> {
    let raw = read_table(path, options)
        .with_context(|| format!("reading locations {}", path.display()))?;
    Ok(reshape::positions(&raw)?)
}

/// Read a tabular file as text cells.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, delimiter from [`ReadOptions`]
/// * `.json`    – `[{ "column": value, ... }, ...]`
/// * `.parquet` – any scalar columns, rendered to text
/// * `.xlsx`    – first worksheet, header row first (also `.xlsm`, `.xls`, `.ods`)
pub fn read_table(path: &Path, options: &ReadOptions) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "txt" => read_csv(path, options.delimiter),
        "json" => read_json(path),
        "parquet" | "pq" => read_parquet(path),
        "xlsx" | "xlsm" | "xls" | "ods" => read_workbook(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path, delimiter: u8) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;

    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .enumerate()
        .map(|(i, h)| header_name(i, h))
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row = (0..columns.len())
            .map(|i| match record.get(i) {
                Some(v) if !v.is_empty() => Some(v.to_string()),
                _ => None,
            })
            .collect();
        rows.push(row);
    }

    Ok(RawTable { columns, rows })
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`). Columns are the
/// union of keys, in the order they are first met.
fn read_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            columns
                .iter()
                .map(|col| obj.get(col).and_then(json_to_cell))
                .collect()
        })
        .collect();

    Ok(RawTable { columns, rows })
}

fn json_to_cell(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::Null => None,
        JsonValue::String(s) if s.is_empty() => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Numbers, dates and timestamps are
/// rendered with Arrow's display formatting.
fn read_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .enumerate()
        .map(|(i, f)| header_name(i, f.name()))
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let options = FormatOptions::default();
    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let formatters = batch
            .columns()
            .iter()
            .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("formatting parquet columns")?;

        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .zip(&formatters)
                .map(|(col, formatter)| {
                    if col.is_null(row) {
                        None
                    } else {
                        Some(formatter.value(row).to_string()).filter(|s| !s.is_empty())
                    }
                })
                .collect();
            rows.push(cells);
        }
    }

    Ok(RawTable { columns, rows })
}

// ---------------------------------------------------------------------------
// Workbook reader
// ---------------------------------------------------------------------------

/// First worksheet of a spreadsheet workbook. The first row of the used
/// range is the header.
fn read_workbook(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).context("opening workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .context("workbook has no worksheet")?
        .context("reading first worksheet")?;
    Ok(sheet_to_table(range.rows()))
}

fn sheet_to_table<'a>(mut sheet: impl Iterator<Item = &'a [Data]>) -> RawTable {
    let columns: Vec<String> = sheet
        .next()
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, cell)| header_name(i, &sheet_cell(cell).unwrap_or_default()))
        .collect();

    let rows = sheet
        .map(|row| {
            (0..columns.len())
                .map(|i| row.get(i).and_then(sheet_cell))
                .collect()
        })
        .collect();

    RawTable { columns, rows }
}

/// Text of one worksheet cell. Whole numbers lose their `.0` so numeric
/// serials read the same as text ones.
fn sheet_cell(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(at) => at.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
    };
    Some(text).filter(|s| !s.is_empty())
}
