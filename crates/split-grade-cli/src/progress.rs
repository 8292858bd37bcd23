use indicatif::{ProgressBar, ProgressStyle};
use split_grade_core::ProgressReporter;
use std::sync::Mutex;

/// CLI progress reporter: a bar over the students being written.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_groups_loaded(&self, groups: usize, students: usize) {
        eprintln!(
            "  \x1b[32m✓\x1b[0m Group sheet: {} groups, {} students",
            groups, students
        );
    }

    fn on_roster_loaded(&self, rows: usize) {
        eprintln!("  \x1b[32m✓\x1b[0m Roster: {} students", rows);
    }

    fn on_extract_start(&self, total: usize) {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Splitting [{bar:30.cyan/dim}] {pos}/{len} files {wide_msg}",
            )
            .unwrap()
            .progress_chars("━╸─")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        *self.bar.lock().unwrap() = Some(pb);
    }

    fn on_extract_progress(&self, written: usize, _total: usize, current_path: &str) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            pb.set_position(written as u64);
            pb.set_message(current_path.to_string());
        }
    }

    fn on_extract_complete(&self, written: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Split complete: {} files in {:.2}s",
            written, duration_secs
        );
    }

    fn on_roster_written(&self, path: &str) {
        eprintln!("  \x1b[32m✓\x1b[0m Grades written to {}", path);
    }
}
