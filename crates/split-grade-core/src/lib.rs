pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod groups;
pub mod progress;
pub mod reconcile;
pub mod roster;
pub mod table;

pub use config::AppConfig;
pub use engine::{RunReport, RunWarning, SplitEngine};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
