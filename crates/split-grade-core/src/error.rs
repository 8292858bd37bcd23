use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("{} not found", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("File {file} is empty, a header row is required")]
    EmptyTable { file: String },

    #[error("File {file} does not contain a header called {header}")]
    MissingHeader { file: String, header: String },

    #[error("File {file}, line {line}: '{value}' is not a valid number of pages")]
    InvalidPageCount {
        file: String,
        line: usize,
        value: String,
    },

    #[error("File {file}, line {line}: the page counts add up to more pages than can be numbered")]
    PageCountOverflow { file: String, line: usize },

    #[error("{count} pages starting at page {start} requested but the document has {page_count} pages")]
    PageRangeOutOfBounds {
        start: usize,
        count: usize,
        page_count: usize,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
