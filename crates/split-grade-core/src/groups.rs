use indexmap::IndexMap;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

use crate::config::GroupSheetConfig;
use crate::error::{Error, Result};
use crate::table::{self, cell, resolve_column, Row};

/// A student as known from the group sheet. Identity fields stay `None`
/// until the roster is reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub group_id: String,
    pub mail: String,
    pub grade: String,
    pub start_page: usize,
    pub num_pages: usize,
    pub moodle_id: Option<String>,
    pub full_name: Option<String>,
}

impl StudentRecord {
    pub fn page_range(&self) -> Range<usize> {
        self.start_page..self.start_page + self.num_pages
    }

    pub fn is_reconciled(&self) -> bool {
        self.moodle_id.is_some()
    }
}

/// Students that submitted one assignment together. They share the grade
/// and a contiguous run of pages in the main document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub group_id: String,
    pub grade: String,
    pub start_page: usize,
    pub num_pages: usize,
    pub members: Vec<StudentRecord>,
}

impl GroupRecord {
    pub fn page_range(&self) -> Range<usize> {
        self.start_page..self.start_page + self.num_pages
    }
}

/// Column indices of the group sheet, resolved once from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupColumns {
    pub group_id: usize,
    pub grade: usize,
    pub num_pages: usize,
    pub mail: usize,
}

impl GroupColumns {
    pub fn resolve(header: &[String], config: &GroupSheetConfig, file: &str) -> Result<Self> {
        Ok(Self {
            group_id: resolve_column(header, &config.group_id_column, file)?,
            grade: resolve_column(header, &config.grade_column, file)?,
            num_pages: resolve_column(header, &config.num_pages_column, file)?,
            mail: resolve_column(header, &config.mail_column, file)?,
        })
    }
}

pub fn read_groups(config: &GroupSheetConfig) -> Result<Vec<GroupRecord>> {
    let rows = table::read_table(Path::new(&config.file_name))?.rows;
    let header = rows.first().ok_or_else(|| Error::EmptyTable {
        file: config.file_name.clone(),
    })?;
    let columns = GroupColumns::resolve(header, config, &config.file_name)?;
    parse_groups(&rows[1..], &columns, &config.file_name)
}

/// Build one group per non-blank data row. Page ranges come from a running
/// total of the page counts, in row order, starting at page 0.
pub fn parse_groups(data_rows: &[Row], columns: &GroupColumns, file: &str) -> Result<Vec<GroupRecord>> {
    let (groups, total_pages) = data_rows
        .iter()
        .enumerate()
        .filter(|(_, row)| !row.is_empty())
        .try_fold(
            (Vec::with_capacity(data_rows.len()), 0usize),
            |(mut groups, next_page), (index, row)| {
                // +2: one for the header, one for 1-based line numbers
                let line = index + 2;
                let group = parse_group_row(row, columns, next_page, file, line)?;
                let next_page = next_page.checked_add(group.num_pages).ok_or_else(|| {
                    Error::PageCountOverflow {
                        file: file.to_string(),
                        line,
                    }
                })?;
                groups.push(group);
                Ok::<_, Error>((groups, next_page))
            },
        )?;

    debug!(
        "{}: {} groups, {} pages in total",
        file,
        groups.len(),
        total_pages
    );
    Ok(groups)
}

fn parse_group_row(
    row: &[String],
    columns: &GroupColumns,
    start_page: usize,
    file: &str,
    line: usize,
) -> Result<GroupRecord> {
    let raw_pages = cell(row, columns.num_pages);
    let num_pages = raw_pages
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::InvalidPageCount {
            file: file.to_string(),
            line,
            value: raw_pages.to_string(),
        })?;

    let group_id = cell(row, columns.group_id).to_string();
    let grade = cell(row, columns.grade).to_string();

    let members = row
        .iter()
        .skip(columns.mail)
        .filter(|mail| !mail.is_empty())
        .map(|mail| StudentRecord {
            group_id: group_id.clone(),
            mail: mail.clone(),
            grade: grade.clone(),
            start_page,
            num_pages,
            moodle_id: None,
            full_name: None,
        })
        .collect();

    Ok(GroupRecord {
        group_id,
        grade,
        start_page,
        num_pages,
        members,
    })
}

/// Flatten all members into a map keyed by mail. A mail listed in several
/// groups keeps the entry of the last of them.
pub fn build_students_map(groups: &[GroupRecord]) -> IndexMap<String, StudentRecord> {
    let mut students = IndexMap::new();
    for member in groups.iter().flat_map(|group| group.members.iter()) {
        students.insert(member.mail.clone(), member.clone());
    }
    students
}
