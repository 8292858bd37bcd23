/// Trait for reporting pipeline progress.
///
/// The CLI implements it with indicatif bars, tests use `SilentReporter`.
/// All methods have default no-op implementations.
pub trait ProgressReporter {
    fn on_groups_loaded(&self, _groups: usize, _students: usize) {}
    fn on_roster_loaded(&self, _rows: usize) {}
    fn on_extract_start(&self, _total: usize) {}
    fn on_extract_progress(&self, _written: usize, _total: usize, _current_path: &str) {}
    fn on_extract_complete(&self, _written: usize, _duration_secs: f64) {}
    fn on_roster_written(&self, _path: &str) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
