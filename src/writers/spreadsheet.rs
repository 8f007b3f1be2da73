//! Regenerate-on-write spreadsheet writer
//!
//! XLSX has no append operation, so the writer keeps every row in memory,
//! rebuilds the whole workbook after each write and overwrites the blob. Rows
//! are loaded from the existing workbook when the writer attaches.
//!
//! Two processes writing the same workbook each hold their own row list; the
//! later upload wins.

use super::{content_or_sentinel, BlobTarget, FileStats, LogWriter, WriterContext};
use crate::core::{FileType, LogFileConfig, LoggerError, Result};
use crate::formatters::{cell_text, escape_field};
use crate::storage::{BlobLocation, BlobPermission};
use async_trait::async_trait;
use bytes::Bytes;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use chrono::Utc;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Cursor;

pub const SHEET_NAME: &str = "Logs";

const PERMISSIONS: [BlobPermission; 3] = [
    BlobPermission::Read,
    BlobPermission::Write,
    BlobPermission::Create,
];

pub type Row = Map<String, Value>;

/// Writer for the XLSX representation
///
/// Every write regenerates and re-uploads the whole workbook, so each write
/// counts as one backend write call.
pub struct SpreadsheetWriter {
    ctx: WriterContext,
    target: Option<BlobTarget>,
    /// Ordered union of every row's keys
    headers: Vec<String>,
    rows: Vec<Row>,
    metadata: HashMap<String, String>,
}

impl SpreadsheetWriter {
    /// Unattached writer; rows are loaded when it attaches
    pub fn new(ctx: WriterContext) -> Self {
        Self {
            ctx,
            target: None,
            headers: Vec::new(),
            rows: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Rows currently held in memory
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn target_mut(&mut self) -> Result<&mut BlobTarget> {
        self.target
            .as_mut()
            .ok_or_else(|| LoggerError::config("SpreadsheetWriter", "writer not initialized"))
    }

    async fn open(&mut self, logical_name: &str, file_name: &str, config: &LogFileConfig) -> Result<bool> {
        let (target, props) = BlobTarget::open(
            &self.ctx,
            logical_name,
            file_name,
            config,
            FileType::Xlsx,
            &PERMISSIONS,
        )
        .await?;

        let (headers, rows) = match props {
            Some(ref props) => {
                let data = self.ctx.store.download(&target.grant).await?;
                self.metadata = props.metadata.clone();
                decode_workbook(&data)?
            }
            None => {
                self.metadata = target.creation_metadata();
                (Vec::new(), Vec::new())
            }
        };

        tracing::debug!(path = %target.location, rows = rows.len(), "loaded workbook rows");
        let exists = target.exists;
        self.headers = headers;
        self.rows = rows;
        self.target = Some(target);
        Ok(exists)
    }

    fn push_row(&mut self, row: Row) {
        for key in row.keys() {
            if !self.headers.contains(key) {
                self.headers.push(key.clone());
            }
        }
        self.rows.push(row);
    }

    /// Rebuild the workbook from memory and replace the blob
    async fn upload(&mut self) -> Result<()> {
        let data = Bytes::from(encode_workbook(&self.headers, &self.rows)?);
        let len = data.len();
        let metadata = self.metadata.clone();
        let ctx = self.ctx.clone();
        let target = self.target_mut()?;
        let grant = target.fresh_grant(&ctx).await?.clone();

        ctx.store
            .upload(&grant, data, FileType::Xlsx.content_type(), metadata)
            .await?;
        target.exists = true;
        target.size_bytes = len as u64;
        ctx.metrics.record_write_call(len as u64);
        Ok(())
    }

    async fn write_rows(&mut self, content: &str) -> Result<()> {
        self.target_mut()?;
        let parsed = parse_rows(content)?;
        if parsed.is_empty() {
            return Ok(());
        }

        let (header_len, row_len) = (self.headers.len(), self.rows.len());
        for row in parsed {
            self.push_row(row);
        }

        if let Err(e) = self.upload().await {
            // The blob still holds the previous workbook
            self.headers.truncate(header_len);
            self.rows.truncate(row_len);
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl LogWriter for SpreadsheetWriter {
    fn name(&self) -> &str {
        "spreadsheet"
    }

    async fn attach(&mut self, file_name: &str, config: &LogFileConfig) -> Result<bool> {
        self.open(file_name, file_name, config).await
    }

    async fn ensure_exists(&mut self) -> Result<()> {
        let ctx = self.ctx.clone();
        let target = self.target_mut()?;
        if target.exists {
            return Ok(());
        }
        // Attached for reading earlier; load the rows if it was created since
        if let Some(props) = target.probe(&ctx).await? {
            let data = ctx.store.download(&target.grant).await?;
            let (headers, rows) = decode_workbook(&data)?;
            self.metadata = props.metadata;
            self.headers = headers;
            self.rows = rows;
            return Ok(());
        }
        self.upload().await?;

        if let Some(target) = self.target.as_ref() {
            tracing::info!(
                container = %target.location.container,
                path = %target.location.blob_path(),
                "created workbook blob"
            );
        }
        Ok(())
    }

    async fn write_entry(&mut self, content: &str) -> Result<()> {
        self.write_rows(content).await
    }

    async fn write_bulk(&mut self, content: &str) -> Result<()> {
        self.write_rows(content).await
    }

    async fn needs_rotation(&mut self) -> bool {
        let ctx = self.ctx.clone();
        let Some(target) = self.target.as_mut() else {
            return false;
        };
        match target.probe(&ctx).await {
            Ok(Some(props)) => props.size_bytes >= target.max_bytes(),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(path = %target.location, error = %e, "size probe failed, skipping rotation check");
                false
            }
        }
    }

    async fn rotate(&mut self) -> Result<String> {
        let target = self.target_mut()?;
        let logical_name = target.logical_name.clone();
        let config = target.config.clone();
        let previous = target.location.to_string();
        let new_name = target.rotated_file_name(Utc::now());

        self.open(&logical_name, &new_name, &config).await?;
        self.ensure_exists().await?;
        self.ctx.metrics.record_rotation();

        tracing::info!(from = %previous, to = %new_name, "rotated workbook blob");
        Ok(new_name)
    }

    async fn stats(&mut self) -> FileStats {
        let ctx = self.ctx.clone();
        let Some(target) = self.target.as_mut() else {
            return FileStats::missing();
        };
        match target.probe(&ctx).await {
            Ok(Some(props)) => FileStats::from_properties(&props),
            _ => FileStats::missing(),
        }
    }

    async fn read_content(&mut self) -> Result<String> {
        let ctx = self.ctx.clone();
        let target = self.target_mut()?;
        if target.probe(&ctx).await?.is_none() {
            return Err(LoggerError::not_found(target.location.to_string()));
        }

        let data = ctx.store.download(&target.grant).await?;
        let (headers, rows) = decode_workbook(&data)?;
        Ok(content_or_sentinel(render_delimited(&headers, &rows)))
    }

    fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn location(&self) -> Option<&BlobLocation> {
        self.target.as_ref().map(|t| &t.location)
    }
}

/// Parse newline-delimited JSON row objects
fn parse_rows(content: &str) -> Result<Vec<Row>> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str::<Row>(line)
                .map_err(|e| LoggerError::formatter("XLSX", format!("invalid row object: {}", e)))
        })
        .collect()
}

/// Encode a single-sheet workbook: bold header row, then one row per entry.
///
/// Numbers and booleans become numeric and boolean cells; everything else is
/// written as text.
pub fn encode_workbook(headers: &[String], rows: &[Row]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME).map_err(LoggerError::spreadsheet)?;

    for (col, header) in headers.iter().enumerate() {
        let col = column_index(col)?;
        worksheet
            .write_string_with_format(0, col, header.as_str(), &bold)
            .map_err(LoggerError::spreadsheet)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let row_num = u32::try_from(idx + 1)
            .map_err(|_| LoggerError::spreadsheet("row count exceeds worksheet limits"))?;
        for (col, header) in headers.iter().enumerate() {
            if let Some(value) = row.get(header) {
                write_cell(worksheet, row_num, column_index(col)?, value)?;
            }
        }
    }

    workbook.save_to_buffer().map_err(LoggerError::spreadsheet)
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<()> {
    let written = match value {
        Value::Number(n) => match n.as_f64() {
            Some(number) => worksheet.write_number(row, col, number),
            None => worksheet.write_string(row, col, n.to_string()),
        },
        Value::Bool(b) => worksheet.write_boolean(row, col, *b),
        other => {
            let text = cell_text(other);
            if text.is_empty() {
                return Ok(());
            }
            worksheet.write_string(row, col, text)
        }
    };
    written.map(|_| ()).map_err(LoggerError::spreadsheet)
}

fn column_index(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| LoggerError::spreadsheet("column count exceeds worksheet limits"))
}

/// Decode the first sheet into its header row and keyed data rows
pub fn decode_workbook(data: &[u8]) -> Result<(Vec<String>, Vec<Row>)> {
    if data.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(Cursor::new(data.to_vec())).map_err(LoggerError::spreadsheet)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(LoggerError::spreadsheet)?,
        None => return Ok((Vec::new(), Vec::new())),
    };

    let mut lines = range.rows();
    let headers: Vec<String> = match lines.next() {
        Some(cells) => cells.iter().map(|cell| cell.to_string()).collect(),
        None => return Ok((Vec::new(), Vec::new())),
    };

    let rows: Vec<Row> = lines
        .map(|cells| {
            headers
                .iter()
                .zip(cells)
                .filter(|(header, cell)| !header.is_empty() && !matches!(cell, Data::Empty))
                .map(|(header, cell)| (header.clone(), cell_value(cell)))
                .collect::<Row>()
        })
        .collect();

    Ok((headers, rows))
}

// Whole floats come back as integers so `250` does not read as `250.0`
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::from(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => Value::from(*f as i64),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(cell.to_string())),
        Data::Bool(b) => Value::Bool(*b),
        other => Value::String(other.to_string()),
    }
}

/// Render rows as delimited text with a header line
fn render_delimited(headers: &[String], rows: &[Row]) -> String {
    if headers.is_empty() {
        return String::new();
    }

    let line = |cells: Vec<String>| {
        let mut line = cells
            .iter()
            .map(|cell| escape_field(cell))
            .collect::<Vec<_>>()
            .join(",");
        line.push('\n');
        line
    };

    let mut out = line(headers.to_vec());
    for row in rows {
        out.push_str(&line(
            headers
                .iter()
                .map(|h| row.get(h).map(cell_text).unwrap_or_default())
                .collect(),
        ));
    }
    out
}
