use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::Error;
use crate::extract::{self, PageSource, PdfSource};
use crate::groups::{self, StudentRecord};
use crate::progress::ProgressReporter;
use crate::reconcile::{self, Reconciliation};
use crate::roster::{self, Roster};

pub struct SplitEngine {
    config: AppConfig,
}

/// Anomalies found during a run. None of them stops the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunWarning {
    RosterMailNotInGroups { mail: String, group_file: String },
    StudentNotInRoster { mail: String, roster_file: String },
    EmptyPageRange { mail: String, group_id: String },
    PageCountMismatch {
        sheet_pages: usize,
        document_pages: usize,
        document: String,
    },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::RosterMailNotInGroups { mail, group_file } => {
                write!(f, "{} does not appear in {}", mail, group_file)
            }
            RunWarning::StudentNotInRoster { mail, roster_file } => {
                write!(f, "{} does not appear in {}", mail, roster_file)
            }
            RunWarning::EmptyPageRange { mail, group_id } => {
                write!(f, "group {} has no pages, nothing written for {}", group_id, mail)
            }
            RunWarning::PageCountMismatch {
                sheet_pages,
                document_pages,
                document,
            } => write!(
                f,
                "the group sheet accounts for {} pages but {} has {}",
                sheet_pages, document, document_pages
            ),
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub groups: usize,
    pub students: usize,
    pub documents_written: usize,
    pub sheet_pages: usize,
    pub document_pages: usize,
    pub unmatched_roster_mails: Vec<String>,
    pub unmatched_students: Vec<StudentRecord>,
    pub empty_ranges: Vec<StudentRecord>,
    pub parse_duration: Duration,
    pub extraction_duration: Duration,
    group_file: String,
    roster_file: String,
    document_file: String,
}

impl RunReport {
    /// Warnings in reporting order: roster rows without group, group members
    /// without roster row, groups without pages, page total mismatch.
    pub fn warnings(&self) -> Vec<RunWarning> {
        let mut warnings: Vec<RunWarning> = self
            .unmatched_roster_mails
            .iter()
            .map(|mail| RunWarning::RosterMailNotInGroups {
                mail: mail.clone(),
                group_file: self.group_file.clone(),
            })
            .collect();

        warnings.extend(self.unmatched_students.iter().map(|student| {
            RunWarning::StudentNotInRoster {
                mail: student.mail.clone(),
                roster_file: self.roster_file.clone(),
            }
        }));

        warnings.extend(self.empty_ranges.iter().map(|student| RunWarning::EmptyPageRange {
            mail: student.mail.clone(),
            group_id: student.group_id.clone(),
        }));

        if self.sheet_pages != self.document_pages {
            warnings.push(RunWarning::PageCountMismatch {
                sheet_pages: self.sheet_pages,
                document_pages: self.document_pages,
                document: self.document_file.clone(),
            });
        }

        warnings
    }
}

impl SplitEngine {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run the whole pipeline:
    /// 1. Read the group sheet and the roster
    /// 2. Reconcile them by mail, grading the roster
    /// 3. Extract each student's pages from the main PDF
    /// 4. Write the graded roster back to its file
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<RunReport, Error> {
        let prepared = self.prepare(reporter)?;
        let source = PdfSource::open(Path::new(&self.config.main_pdf.file_name))?;
        self.finish(prepared, &source, reporter)
    }

    /// Same as `run`, reading pages from `source` instead of the configured PDF.
    pub fn run_with_source(
        &self,
        source: &dyn PageSource,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunReport, Error> {
        let prepared = self.prepare(reporter)?;
        self.finish(prepared, source, reporter)
    }

    fn prepare(&self, reporter: &dyn ProgressReporter) -> Result<Prepared, Error> {
        let config = &self.config;

        // Phase 1: Parse
        let parse_start = Instant::now();
        info!("Reading groups from {}", config.group_sheet.file_name);
        let groups = groups::read_groups(&config.group_sheet)?;
        reporter.on_groups_loaded(
            groups.len(),
            groups.iter().map(|g| g.members.len()).sum(),
        );

        info!("Reading roster from {}", config.roster.file_name);
        let mut roster = roster::read_roster(&config.roster)?;
        reporter.on_roster_loaded(roster.len());

        // Phase 2: Reconcile
        let reconciliation =
            reconcile::reconcile(&groups, &mut roster, &config.roster.identifier_prefix);
        let parse_duration = parse_start.elapsed();
        let sheet_pages: usize = groups.iter().map(|g| g.num_pages).sum();
        debug!(
            "Parsed and reconciled in {:.2}s: {} groups, {} students, {} sheet pages",
            parse_duration.as_secs_f64(),
            groups.len(),
            reconciliation.students_by_mail.len(),
            sheet_pages,
        );

        Ok(Prepared {
            group_count: groups.len(),
            sheet_pages,
            roster,
            reconciliation,
            parse_duration,
        })
    }

    fn finish(
        &self,
        prepared: Prepared,
        source: &dyn PageSource,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunReport, Error> {
        let config = &self.config;
        let Prepared {
            group_count,
            sheet_pages,
            roster,
            reconciliation,
            parse_duration,
        } = prepared;

        // Phase 3: Extract
        info!("Splitting {}", config.main_pdf.file_name);
        let extraction_start = Instant::now();
        let summary = extract::extract_all(
            &reconciliation.students_by_mail,
            source,
            Path::new(&config.output.attachments_dir),
            reporter,
        )?;
        let extraction_duration = extraction_start.elapsed();

        // Phase 4: Write back
        info!("Writing grades in {}", config.roster.file_name);
        roster.write(Path::new(&config.roster.file_name), config.roster.encoding)?;
        reporter.on_roster_written(&config.roster.file_name);

        Ok(RunReport {
            groups: group_count,
            students: reconciliation.students_by_mail.len(),
            documents_written: summary.written.len(),
            sheet_pages,
            document_pages: source.page_count(),
            unmatched_students: reconciliation.unmatched_students().cloned().collect(),
            unmatched_roster_mails: reconciliation.unmatched_roster_mails,
            empty_ranges: summary.empty_ranges,
            parse_duration,
            extraction_duration,
            group_file: config.group_sheet.file_name.clone(),
            roster_file: config.roster.file_name.clone(),
            document_file: config.main_pdf.file_name.clone(),
        })
    }
}

struct Prepared {
    group_count: usize,
    sheet_pages: usize,
    roster: Roster,
    reconciliation: Reconciliation,
    parse_duration: Duration,
}
