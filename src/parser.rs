//! Raw CSV table reader.
//!
//! Source spreadsheets carry title and note rows above the real header, have
//! ragged rows, and mix blank lines in. [`read_table`] skips the preamble,
//! normalizes the header, and keeps every non-blank row as plain strings for
//! the dataset cleaners to interpret.

use crate::cleaning::normalize::{is_missing, normalize_headers};
use crate::error::{PipelineError, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A raw table with normalized column names.
#[derive(Debug)]
pub struct RawTable {
    pub source: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// One non-blank data row, with the 1-based line it started on.
#[derive(Debug)]
pub struct RawRow {
    pub line: u64,
    fields: Vec<String>,
}

impl RawRow {
    /// Trimmed cell value. `None` when the column is absent or the cell holds a
    /// missing-value token.
    pub fn get(&self, column: Option<usize>) -> Option<&str> {
        let cell = self.fields.get(column?)?;
        if is_missing(cell) {
            None
        } else {
            Some(cell.trim())
        }
    }
}

impl RawTable {
    /// Index of the first column whose normalized name appears in `aliases`,
    /// trying aliases in order.
    pub fn column(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.headers.iter().position(|h| h == alias))
    }

    /// Like [`RawTable::column`] but fails with the canonical column name.
    pub fn require(&self, canonical: &'static str, aliases: &[&str]) -> Result<usize> {
        self.column(aliases)
            .ok_or_else(|| PipelineError::MissingColumn {
                path: self.source.clone(),
                column: canonical,
            })
    }

    /// Index and name of the first column (left to right) matching `pred`.
    pub fn find_column(&self, pred: impl Fn(&str) -> bool) -> Option<(usize, &str)> {
        self.headers
            .iter()
            .enumerate()
            .find(|(_, h)| pred(h))
            .map(|(i, h)| (i, h.as_str()))
    }
}

/// Reads the CSV file at `path`, skipping `skip_rows` preamble records.
///
/// # Errors
///
/// [`PipelineError::MissingInput`] when the file does not exist,
/// [`PipelineError::MalformedInput`] when it cannot be decoded or has no header.
pub fn read_table(path: &Path, skip_rows: usize) -> Result<RawTable> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }
    let file = File::open(path)?;
    parse_table(path, file, skip_rows)
}

/// Parses CSV from any reader. `source` is only used for error messages.
pub fn parse_table<R: Read>(source: &Path, reader: R, skip_rows: usize) -> Result<RawTable> {
    let malformed = |message: String| PipelineError::MalformedInput {
        path: source.to_path_buf(),
        message,
    };

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    let mut blank = 0usize;

    for (i, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| malformed(e.to_string()))?;
        if i < skip_rows {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let fields: Vec<String> = record.iter().map(str::to_string).collect();

        if headers.is_none() {
            headers = Some(normalize_headers(&fields));
            continue;
        }
        if fields.iter().all(|f| is_missing(f)) {
            blank += 1;
            continue;
        }
        rows.push(RawRow { line, fields });
    }

    let headers = headers
        .ok_or_else(|| malformed(format!("no header row after {} skipped rows", skip_rows)))?;
    debug!(
        source = %source.display(),
        columns = headers.len(),
        rows = rows.len(),
        blank,
        "Raw table parsed"
    );

    Ok(RawTable {
        source: source.to_path_buf(),
        headers,
        rows,
    })
}
