//! Export of result tables.
//!
//! Supported targets:
//! - TXT: tab separated, with a leading 1-based row number column
//! - XLS: the TXT layout saved under a spreadsheet extension
//! - CSV: every field quoted, quotes doubled
//! - XLSX: one worksheet, header row of column labels
//!
//! The column list is always [`Field::ALL`], whatever the service returned.
//! Missing and `"N/A"` values are written as empty cells.
//!
//! The workbook backend is optional. It is reached through a
//! [`WorkbookHandle`] that loads it on first use; when it is missing or
//! fails, XLSX requests are answered with a CSV artifact and a warning.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use thiserror::Error;

use crate::model::{Field, FieldRef, Record};

/// Header of the row number column in delimited text.
const INDEX_HEADER: &str = "#";

/// Default worksheet name.
pub const DEFAULT_SHEET: &str = "Aptamers";

/// Errors that can occur while exporting.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write file: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Export produced invalid text: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Refusing to write an empty file: {0}")]
    EmptyArtifact(String),

    #[error("Failed to copy to clipboard: {0}")]
    Clipboard(String),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Export target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Txt,
    Csv,
    Xls,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Csv => "csv",
            ExportFormat::Xls => "xls",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    /// Guesses the format from a file name's extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<ExportFormat> {
        let ext = path.as_ref().extension()?.to_str()?;
        ext.parse().ok()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension().to_uppercase())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" | "tsv" => Ok(ExportFormat::Txt),
            "csv" => Ok(ExportFormat::Csv),
            "xls" => Ok(ExportFormat::Xls),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(format!("unknown export format '{}' (expected txt, csv, xls or xlsx)", other)),
        }
    }
}

/// Serialized export, ready to be written or copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// The format actually produced (CSV after a workbook fallback)
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
    /// User-facing warning, set when the requested format could not be produced
    pub warning: Option<String>,
}

impl Artifact {
    fn new(format: ExportFormat, bytes: Vec<u8>) -> Self {
        Self {
            format,
            bytes,
            warning: None,
        }
    }

    /// Where to write this artifact.
    ///
    /// A requested path is kept as is, except after a fallback where its
    /// extension is swapped for the produced format's. Without one,
    /// `<stem>.<ext>` is used.
    pub fn target_path(&self, requested: Option<&str>, stem: &str) -> PathBuf {
        match requested {
            Some(path) if self.warning.is_some() => {
                PathBuf::from(path).with_extension(self.format.extension())
            }
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(format!("{}.{}", stem, self.format.extension())),
        }
    }
}

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    fn from_field(record: &Record, field: Field) -> Cell {
        match record.get(field) {
            FieldRef::Missing => Cell::Empty,
            FieldRef::Number(n) => Cell::Number(n),
            FieldRef::Text(t) => Cell::Text(t.to_string()),
        }
    }
}

/// A spreadsheet serializer.
pub trait WorkbookWriter: Send + Sync {
    /// Short backend name, for logs.
    fn name(&self) -> &str;

    /// Writes one worksheet and returns the workbook file bytes.
    fn write(&self, sheet: &str, header: &[&str], rows: &[Vec<Cell>]) -> ExportResult<Vec<u8>>;
}

/// Loader for the workbook backend.
pub type WorkbookLoader = fn() -> Option<Box<dyn WorkbookWriter>>;

/// Lazily loaded workbook backend.
///
/// The loader runs at most once, on first use, even with several threads
/// asking at the same time.
pub struct WorkbookHandle {
    loader: WorkbookLoader,
    backend: OnceLock<Option<Box<dyn WorkbookWriter>>>,
}

impl WorkbookHandle {
    /// Handle for the backend compiled into this build.
    pub fn new() -> Self {
        Self::with_loader(default_backend)
    }

    pub fn with_loader(loader: WorkbookLoader) -> Self {
        Self {
            loader,
            backend: OnceLock::new(),
        }
    }

    /// A handle whose backend never loads.
    pub fn unavailable() -> Self {
        Self::with_loader(|| None)
    }

    /// The backend, loading it on first call.
    pub fn get(&self) -> Option<&dyn WorkbookWriter> {
        self.backend
            .get_or_init(|| {
                let backend = (self.loader)();
                match &backend {
                    Some(b) => log::debug!("workbook backend '{}' loaded", b.name()),
                    None => log::warn!("no workbook backend available"),
                }
                backend
            })
            .as_deref()
    }
}

impl Default for WorkbookHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WorkbookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.backend.get() {
            None => "unloaded",
            Some(None) => "unavailable",
            Some(Some(b)) => b.name(),
        };
        f.debug_struct("WorkbookHandle").field("backend", &state).finish()
    }
}

#[cfg(feature = "xlsx")]
fn default_backend() -> Option<Box<dyn WorkbookWriter>> {
    Some(Box::new(XlsxWorkbook))
}

#[cfg(not(feature = "xlsx"))]
fn default_backend() -> Option<Box<dyn WorkbookWriter>> {
    None
}

/// XLSX writer backed by `rust_xlsxwriter`.
#[cfg(feature = "xlsx")]
pub struct XlsxWorkbook;

#[cfg(feature = "xlsx")]
impl XlsxWorkbook {
    fn build(
        sheet: &str,
        header: &[&str],
        rows: &[Vec<Cell>],
    ) -> Result<Vec<u8>, rust_xlsxwriter::XlsxError> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet)?;
        for (col, label) in header.iter().enumerate() {
            worksheet.write_string(0, col as u16, *label)?;
        }
        for (i, row) in rows.iter().enumerate() {
            let row_num = (i + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                match cell {
                    Cell::Empty => {}
                    Cell::Number(n) => {
                        worksheet.write_number(row_num, col as u16, *n)?;
                    }
                    Cell::Text(t) => {
                        worksheet.write_string(row_num, col as u16, t.as_str())?;
                    }
                }
            }
        }
        workbook.save_to_buffer()
    }
}

#[cfg(feature = "xlsx")]
impl WorkbookWriter for XlsxWorkbook {
    fn name(&self) -> &str {
        "rust_xlsxwriter"
    }

    fn write(&self, sheet: &str, header: &[&str], rows: &[Vec<Cell>]) -> ExportResult<Vec<u8>> {
        Self::build(sheet, header, rows).map_err(|e| ExportError::Workbook(e.to_string()))
    }
}

/// Makes a title usable as a worksheet name (max 31 chars, no `[]:*?/\`).
pub fn sheet_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').to_string();
    if cleaned.is_empty() {
        DEFAULT_SHEET.to_string()
    } else {
        cleaned
    }
}

fn header_labels() -> Vec<&'static str> {
    Field::ALL.iter().map(|f| f.label()).collect()
}

fn clean_cell(text: String) -> String {
    if text.contains(['\t', '\n', '\r']) {
        text.replace(['\t', '\n', '\r'], " ")
    } else {
        text
    }
}

/// Tab-separated text with a row number column. Also used for the clipboard.
pub fn to_delimited_text(records: &[Record]) -> String {
    let mut header = vec![INDEX_HEADER];
    header.extend(header_labels());
    let mut lines = vec![header.join("\t")];
    for (i, record) in records.iter().enumerate() {
        let mut cells = vec![(i + 1).to_string()];
        cells.extend(Field::ALL.iter().map(|&f| clean_cell(record.export_text(f))));
        lines.push(cells.join("\t"));
    }
    lines.join("\n")
}

/// Comma-separated values, every field quoted.
pub fn to_csv(records: &[Record]) -> ExportResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(header_labels())?;
    for record in records {
        writer.write_record(Field::ALL.iter().map(|&f| record.export_text(f)))?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn workbook_rows(records: &[Record]) -> Vec<Vec<Cell>> {
    records
        .iter()
        .map(|r| Field::ALL.iter().map(|&f| Cell::from_field(r, f)).collect())
        .collect()
}

/// Serializes records, already in display order, to the requested format.
///
/// `title` names the worksheet for XLSX output.
pub fn export(
    records: &[Record],
    format: ExportFormat,
    title: &str,
    workbook: &WorkbookHandle,
) -> ExportResult<Artifact> {
    match format {
        ExportFormat::Txt | ExportFormat::Xls => {
            Ok(Artifact::new(format, to_delimited_text(records).into_bytes()))
        }
        ExportFormat::Csv => Ok(Artifact::new(format, to_csv(records)?.into_bytes())),
        ExportFormat::Xlsx => {
            let warning = match workbook.get() {
                Some(backend) => {
                    match backend.write(&sheet_name(title), &header_labels(), &workbook_rows(records)) {
                        Ok(bytes) if !bytes.is_empty() => {
                            return Ok(Artifact::new(format, bytes));
                        }
                        Ok(_) => "XLSX export produced no data. Using CSV instead.".to_string(),
                        Err(e) => format!("XLSX export failed ({}). Using CSV instead.", e),
                    }
                }
                None => "XLSX export is not available in this build. Using CSV instead.".to_string(),
            };
            log::warn!("{}", warning);
            let mut artifact = Artifact::new(ExportFormat::Csv, to_csv(records)?.into_bytes());
            artifact.warning = Some(warning);
            Ok(artifact)
        }
    }
}

/// Writes an artifact to disk.
pub fn write_artifact<P: AsRef<Path>>(artifact: &Artifact, path: P) -> ExportResult<()> {
    let path = path.as_ref();
    if artifact.bytes.is_empty() {
        return Err(ExportError::EmptyArtifact(path.display().to_string()));
    }
    fs::write(path, &artifact.bytes)?;
    log::info!(
        "wrote {} export ({} bytes) to {}",
        artifact.format,
        artifact.bytes.len(),
        path.display()
    );
    Ok(())
}
