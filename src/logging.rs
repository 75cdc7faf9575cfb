use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use std::fs::{self, OpenOptions};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "todostack.log";

pub enum LogSink {
    Stderr,
    /// The terminal UI owns the screen, so its logs go to a file.
    File,
}

pub fn init_tracing(verbose: u8, sink: LogSink) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true);

    let init_result = match sink {
        LogSink::Stderr => builder
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .try_init(),
        LogSink::File => {
            let path = log_file_path()?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening log file {:?}", path))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
    };

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }
    Ok(())
}

fn log_file_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "todostack").context("locating data directory")?;
    let dir = dirs.data_local_dir();
    fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
    Ok(dir.join(LOG_FILE_NAME))
}
