use crate::config::Config;
use crate::storage;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "calendario.log";

/// Sends tracing output to the log file so the terminal UI stays clean.
/// Falls back to stderr when the file cannot be opened.
pub fn init(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(config.log_filter.as_deref().unwrap_or("info"))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    });

    let file = log_path(config).and_then(|path| {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok()?;
        }
        OpenOptions::new().create(true).append(true).open(path).ok()
    });

    let result = match file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };
    if let Err(err) = result {
        eprintln!("calendario: logging disabled: {}", err);
    }
}

fn log_path(config: &Config) -> Option<PathBuf> {
    match &config.log_file {
        Some(path) => Some(path.clone()),
        None => storage::data_dir().ok().map(|dir| dir.join(LOG_FILE)),
    }
}
