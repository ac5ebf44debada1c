//! Delimited-file storage for lead tables.

use crate::core::error::{AppError, Result};
use crate::core::models::EnrichedRecord;
use crate::utils::domain::Domain;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A header row plus string rows, as read from a CSV file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Reads a CSV file with a header row.
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD rather than
    /// failing the read. Short rows are padded with empty cells and long rows
    /// are cut to the header width, so every row lines up with the headers.
    pub fn read_csv(path: &Path) -> Result<Self> {
        tracing::debug!("Reading table from {}", path.display());
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| {
                String::from_utf8_lossy(h)
                    .trim_start_matches('\u{feff}')
                    .trim()
                    .to_string()
            })
            .collect();

        let mut rows = Vec::new();
        let mut lossy_rows = 0usize;
        for (line, record) in reader.byte_records().enumerate() {
            let record = record?;
            let mut row: Vec<String> = record
                .iter()
                .map(|v| String::from_utf8_lossy(v).into_owned())
                .collect();
            if std::str::from_utf8(record.as_slice()).is_err() {
                lossy_rows += 1;
            }
            if row.len() > headers.len() {
                tracing::warn!(
                    "Row {}: {} cells for {} columns; dropping the extra cells",
                    line + 1,
                    row.len(),
                    headers.len()
                );
            }
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        if lossy_rows > 0 {
            tracing::warn!(
                "{} row(s) in {} contained invalid UTF-8; replaced with U+FFFD",
                lossy_rows,
                path.display()
            );
        }
        tracing::debug!("Read {} rows ({} columns) from {}", rows.len(), headers.len(), path.display());
        Ok(Self { headers, rows })
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Case-insensitive header lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.headers
            .iter()
            .position(|h| h.trim().to_lowercase() == wanted)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Splits `table` into `parts` contiguous chunks of `len / parts` rows; the
/// last chunk also takes the remainder. Every chunk keeps the headers.
pub fn split_table(table: &Table, parts: usize) -> Result<Vec<Table>> {
    if parts == 0 {
        return Err(AppError::Config(
            "Cannot split a table into zero parts.".to_string(),
        ));
    }

    let total = table.rows.len();
    let per_part = total / parts;
    let mut chunks = Vec::with_capacity(parts);
    for i in 0..parts {
        let start = i * per_part;
        let end = if i == parts - 1 { total } else { start + per_part };
        chunks.push(Table::new(
            table.headers.clone(),
            table.rows[start..end].to_vec(),
        ));
    }
    Ok(chunks)
}

/// Writes each chunk as `part_{n}.csv` (1-based) under `dir`.
pub fn write_chunks(chunks: &[Table], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        let path = dir.join(format!("part_{}.csv", i + 1));
        chunk.write_csv(&path)?;
        written.push(path);
    }
    Ok(written)
}

/// Writes one domain per line.
pub fn write_domain_list(path: &Path, domains: &[Domain]) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    for domain in domains {
        writeln!(writer, "{}", domain)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes enriched records: the original columns followed by
/// `email_1 … email_{max_emails}`. Absent slots are written as empty cells.
pub fn write_enriched(
    path: &Path,
    headers: &[String],
    records: &[EnrichedRecord],
    max_emails: usize,
) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;

    let mut header_row: Vec<String> = headers.to_vec();
    header_row.extend(email_columns(max_emails));
    writer.write_record(&header_row)?;

    for enriched in records {
        let mut row = enriched.record.fields.clone();
        row.resize(headers.len(), String::new());
        row.extend(
            (0..max_emails).map(|i| enriched.emails.get(i).cloned().flatten().unwrap_or_default()),
        );
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// `email_1 … email_n`.
pub fn email_columns(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("email_{}", i)).collect()
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            tracing::debug!("Creating output directory: {}", parent.display());
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
