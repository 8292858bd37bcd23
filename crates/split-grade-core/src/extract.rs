use indexmap::IndexMap;
use lopdf::Document;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::groups::StudentRecord;
use crate::progress::ProgressReporter;

/// A paginated document pages can be copied out of. Page indices are
/// zero-based.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Write pages `[start, start + count)` as a new document at `destination`.
    fn write_range(&self, start: usize, count: usize, destination: &Path) -> Result<()>;
}

/// The main PDF, loaded once and cloned for every extraction.
pub struct PdfSource {
    document: Document,
    page_count: usize,
}

impl PdfSource {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let document = Document::load(path)?;
        let page_count = document.get_pages().len();
        debug!("{} has {} pages", path.display(), page_count);
        Ok(Self {
            document,
            page_count,
        })
    }
}

impl PageSource for PdfSource {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn write_range(&self, start: usize, count: usize, destination: &Path) -> Result<()> {
        check_range(start, count, self.page_count)?;

        // lopdf numbers pages from 1
        let keep = (start + 1) as u32..=(start + count) as u32;
        let mut document = self.document.clone();
        let to_delete: Vec<u32> = document
            .get_pages()
            .keys()
            .copied()
            .filter(|page| !keep.contains(page))
            .collect();
        document.delete_pages(&to_delete);
        document.prune_objects();
        document.save(destination)?;
        Ok(())
    }
}

pub(crate) fn check_range(start: usize, count: usize, page_count: usize) -> Result<()> {
    match start.checked_add(count) {
        Some(end) if end <= page_count => Ok(()),
        _ => Err(Error::PageRangeOutOfBounds {
            start,
            count,
            page_count,
        }),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub written: Vec<PathBuf>,
    /// Students without roster identity. They have no output directory name.
    pub skipped_unreconciled: usize,
    /// Students whose group owns no pages; nothing is written for them.
    pub empty_ranges: Vec<StudentRecord>,
}

/// `<root>/<full name>_<moodle id>_assignsubmission_file_/<group id>.pdf`,
/// the layout Moodle expects when feedback files are uploaded in bulk.
/// `None` for students not found in the roster.
pub fn student_output_path(output_root: &Path, student: &StudentRecord) -> Option<PathBuf> {
    let full_name = student.full_name.as_deref()?;
    let moodle_id = student.moodle_id.as_deref()?;
    Some(
        output_root
            .join(format!("{}_{}_assignsubmission_file_", full_name, moodle_id))
            .join(format!("{}.pdf", student.group_id)),
    )
}

/// Write one document per reconciled student with the pages of their
/// group. Stops at the first failure; documents already written stay.
pub fn extract_all(
    students: &IndexMap<String, StudentRecord>,
    source: &dyn PageSource,
    output_root: &Path,
    reporter: &dyn ProgressReporter,
) -> Result<ExtractionSummary> {
    let mut summary = ExtractionSummary::default();
    let mut pending: Vec<(&StudentRecord, PathBuf)> = Vec::new();

    for student in students.values() {
        match student_output_path(output_root, student) {
            None => summary.skipped_unreconciled += 1,
            Some(_) if student.num_pages == 0 => summary.empty_ranges.push(student.clone()),
            Some(path) => pending.push((student, path)),
        }
    }

    let total = pending.len();
    reporter.on_extract_start(total);
    let started = Instant::now();

    for (student, path) in pending {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        info!("Creating file {}", path.display());
        source.write_range(student.start_page, student.num_pages, &path)?;
        let current = path.to_string_lossy().into_owned();
        summary.written.push(path);
        reporter.on_extract_progress(summary.written.len(), total, &current);
    }

    reporter.on_extract_complete(summary.written.len(), started.elapsed().as_secs_f64());
    Ok(summary)
}
