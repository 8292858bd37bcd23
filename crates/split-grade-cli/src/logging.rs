use std::env;
use std::ffi::OsStr;
use std::path::Path;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "split_and_grade";

/// Filter used when `TRACING_LEVEL` is unset. Each `-v` shows more of what
/// the core library does with the sheets and the PDF.
fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "info,split_grade_core=debug",
        _ => "debug,split_grade_core=trace",
    }
}

/// `LOG_FILE_PATH` names one file that every run appends to. Without it,
/// runs go to `logs/split_and_grade.<date>.log`, one file per day, so the
/// log of a grading session is easy to find next to the sheets it touched.
fn file_appender() -> Result<RollingFileAppender, InitError> {
    match env::var("LOG_FILE_PATH") {
        Ok(path) => {
            let path = Path::new(&path);
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .unwrap_or(OsStr::new(LOG_FILE_PREFIX))
                .to_string_lossy()
                .into_owned();
            RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(file_name)
                .build(dir)
        }
        Err(_) => RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix("log")
            .build(LOG_DIR),
    }
}

/// Terminal output stays close to a plain message list; the file keeps
/// timestamps and targets for later inspection.
pub fn init_logger(verbosity: u8) -> Result<WorkerGuard, InitError> {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| default_filter(verbosity).to_string());
    let filter_layer = EnvFilter::new(filter);

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender()?);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(verbosity > 0)
                .with_level(verbosity > 0)
                .without_time()
                .with_ansi(true),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .with(filter_layer)
        .init();

    debug!(
        "split-and-grade {} logging at verbosity {}",
        env!("CARGO_PKG_VERSION"),
        verbosity
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_widens_the_default_filter() {
        assert_eq!(default_filter(0), "info");
        assert!(default_filter(1).contains("split_grade_core=debug"));
        assert_eq!(default_filter(2), default_filter(5));
        assert!(EnvFilter::try_new(default_filter(2)).is_ok());
    }
}
