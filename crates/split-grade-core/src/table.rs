use csv::{ReaderBuilder, Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};

pub type Row = Vec<String>;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text encoding of one input sheet. Moodle exports and spreadsheet exports
/// disagree on the byte-order mark, so each sheet carries its own setting.
/// A leading BOM is accepted on read with either setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Encoding {
    /// Plain UTF-8. A BOM is written back only if the file had one.
    #[serde(rename = "utf-8")]
    Utf8,
    /// UTF-8 with a leading byte-order mark, always written on save.
    #[serde(rename = "utf-8-sig")]
    Utf8Sig,
}

impl Encoding {
    pub fn roster_default() -> Self {
        Encoding::Utf8
    }

    pub fn group_sheet_default() -> Self {
        Encoding::Utf8Sig
    }

    /// Whether a file saved with this encoding starts with a BOM, given
    /// whether the file it was read from did.
    pub fn writes_bom(self, source_had_bom: bool) -> bool {
        self == Encoding::Utf8Sig || source_had_bom
    }
}

/// Rows of a CSV file, header included. Blank lines are kept as empty rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Row>,
    /// The file started with a UTF-8 byte-order mark.
    pub bom: bool,
}

/// Read every row of a CSV file. Rows may have different lengths.
pub fn read_table(path: &Path) -> Result<Table> {
    if !path.is_file() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = fs::read(path)?;
    let (content, bom) = match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => (rest, true),
        None => (&bytes[..], false),
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content);
    let mut records = reader.records();

    // The reader skips blank lines, so they are put back from a scan of
    // the raw bytes.
    let mut rows = Vec::new();
    for line in scan_lines(content) {
        match line {
            Line::Blank => rows.push(Row::new()),
            Line::Record => match records.next() {
                Some(record) => rows.push(record?.iter().map(str::to_string).collect()),
                None => break,
            },
        }
    }
    for record in records {
        rows.push(record?.iter().map(str::to_string).collect());
    }

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(Table { rows, bom })
}

/// Write `rows` with CRLF terminators, preceded by a BOM if `bom` is set.
/// Empty rows become blank lines.
pub fn write_table(path: &Path, rows: &[Row], bom: bool) -> Result<()> {
    let mut out = Vec::new();
    if bom {
        out.extend_from_slice(UTF8_BOM);
    }

    let builder = {
        let mut builder = WriterBuilder::new();
        builder.flexible(true).terminator(Terminator::CRLF);
        builder
    };
    // csv writes a record with no fields as `""`, so each blank line is
    // emitted by hand between runs of non-empty rows.
    for (index, run) in rows.split(|row| row.is_empty()).enumerate() {
        if index > 0 {
            out.extend_from_slice(b"\r\n");
        }
        let mut writer = builder.from_writer(&mut out);
        for row in run {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }

    fs::write(path, &out)?;
    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    Blank,
    Record,
}

#[derive(Clone, Copy)]
enum ScanState {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Split raw CSV bytes into blank lines and records, with the same quoting
/// rules as the reader: a quote only opens a field at its start, and line
/// breaks inside quotes belong to the record.
fn scan_lines(content: &[u8]) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut state = ScanState::FieldStart;
    let mut at_line_start = true;
    let mut index = 0;

    while index < content.len() {
        let byte = content[index];
        let is_break = byte == b'\n' || byte == b'\r';
        let quoted = matches!(state, ScanState::Quoted);

        if is_break && !quoted {
            if at_line_start {
                lines.push(Line::Blank);
            } else {
                lines.push(Line::Record);
            }
            // CRLF is a single terminator
            if byte == b'\r' && content.get(index + 1) == Some(&b'\n') {
                index += 1;
            }
            state = ScanState::FieldStart;
            at_line_start = true;
            index += 1;
            continue;
        }

        at_line_start = false;
        state = match (state, byte) {
            (ScanState::FieldStart, b'"') => ScanState::Quoted,
            (ScanState::Quoted, b'"') => ScanState::QuoteInQuoted,
            (ScanState::Quoted, _) => ScanState::Quoted,
            (ScanState::QuoteInQuoted, b'"') => ScanState::Quoted,
            (_, b',') => ScanState::FieldStart,
            _ => ScanState::Unquoted,
        };
        index += 1;
    }

    if !at_line_start {
        lines.push(Line::Record);
    }
    lines
}

/// Index of the first header cell equal to `name`.
pub fn resolve_column(header: &[String], name: &str, file: &str) -> Result<usize> {
    header
        .iter()
        .position(|cell| cell == name)
        .ok_or_else(|| Error::MissingHeader {
            file: file.to_string(),
            header: name.to_string(),
        })
}

/// Cell at `index`, or the empty string when the row is shorter.
pub(crate) fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}
