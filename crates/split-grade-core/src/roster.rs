use std::path::Path;
use tracing::debug;

use crate::config::RosterConfig;
use crate::error::{Error, Result};
use crate::table::{self, cell, resolve_column, Encoding, Row};

/// Column indices of the roster, resolved once from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterColumns {
    pub moodle_id: usize,
    pub mail: usize,
    pub grade: usize,
    pub full_name: usize,
}

impl RosterColumns {
    pub fn resolve(header: &[String], config: &RosterConfig, file: &str) -> Result<Self> {
        Ok(Self {
            moodle_id: resolve_column(header, &config.id_column, file)?,
            mail: resolve_column(header, &config.mail_column, file)?,
            grade: resolve_column(header, &config.grade_column, file)?,
            full_name: resolve_column(header, &config.full_name_column, file)?,
        })
    }
}

/// The per-student gradesheet, kept whole so it can be written back with
/// only the grade cells changed. Blank lines are kept as empty rows and
/// never match a mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    rows: Vec<Row>,
    columns: RosterColumns,
    bom: bool,
}

impl Roster {
    /// `rows` must include the header as its first row.
    pub fn parse(rows: Vec<Row>, config: &RosterConfig, file: &str) -> Result<Self> {
        let header = rows.first().ok_or_else(|| Error::EmptyTable {
            file: file.to_string(),
        })?;
        let columns = RosterColumns::resolve(header, config, file)?;
        let roster = Self {
            rows,
            columns,
            bom: false,
        };
        debug!("{}: {} students", file, roster.len());
        Ok(roster)
    }

    pub fn columns(&self) -> &RosterColumns {
        &self.columns
    }

    pub fn header(&self) -> &[String] {
        &self.rows[0]
    }

    pub fn data_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().skip(1).filter(|row| !row.is_empty())
    }

    pub fn len(&self) -> usize {
        self.data_rows().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mail_of<'a>(&self, row: &'a [String]) -> &'a str {
        cell(row, self.columns.mail)
    }

    pub fn identifier_of<'a>(&self, row: &'a [String]) -> &'a str {
        cell(row, self.columns.moodle_id)
    }

    pub fn full_name_of<'a>(&self, row: &'a [String]) -> &'a str {
        cell(row, self.columns.full_name)
    }

    pub fn grade_of<'a>(&self, row: &'a [String]) -> &'a str {
        cell(row, self.columns.grade)
    }

    pub fn lookup(&self, mail: &str) -> Option<&Row> {
        self.data_rows().find(|row| self.mail_of(row) == mail)
    }

    /// Overwrite the grade of every row with this mail. Unknown mails are
    /// ignored.
    pub fn write_grade(&mut self, mail: &str, grade: &str) {
        let columns = self.columns;
        for row in self.rows.iter_mut().skip(1) {
            if row.is_empty() || cell(row, columns.mail) != mail {
                continue;
            }
            if row.len() <= columns.grade {
                row.resize(columns.grade + 1, String::new());
            }
            row[columns.grade] = grade.to_string();
        }
    }

    /// All rows, header first, in their original order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn serialize(&self) -> Vec<Row> {
        self.rows.clone()
    }

    /// Whether the file this roster was read from started with a BOM.
    pub fn had_bom(&self) -> bool {
        self.bom
    }

    /// Save every row. A BOM is written when `encoding` asks for one or the
    /// source file had one, so an ungraded roster is rewritten unchanged.
    pub fn write(&self, path: &Path, encoding: Encoding) -> Result<()> {
        table::write_table(path, &self.rows, encoding.writes_bom(self.bom))
    }
}

pub fn read_roster(config: &RosterConfig) -> Result<Roster> {
    let table = table::read_table(Path::new(&config.file_name))?;
    let mut roster = Roster::parse(table.rows, config, &config.file_name)?;
    roster.bom = table.bom;
    Ok(roster)
}
