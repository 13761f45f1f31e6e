//! Log setup
//!
//! The TUI owns the terminal, so logs go to a file. The filter comes from
//! `ZYPSEL_LOG` (same syntax as `RUST_LOG`) and defaults to `info`.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;
use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "ZYPSEL_LOG";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("cannot open log file {0}: {1}")]
    OpenFile(String, std::io::Error),
    #[error("init logging error: `{0}`")]
    TryInitError(String),
}

pub fn init(log_file: &Path) -> Result<(), LoggingError> {
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| LoggingError::OpenFile(log_file.display().to_string(), e))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| LoggingError::OpenFile(log_file.display().to_string(), e))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var(LOG_ENV)
                .from_env_lossy(),
        )
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|_| LoggingError::TryInitError("unable to set global logging subscriber".to_string()))
}
