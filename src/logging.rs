use crate::common::error::AppError;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::panic;
use std::path::{Path, PathBuf};

pub const LOG_FILE_NAME: &str = "netscope.log";
const CRASH_FILE_NAME: &str = "crash.log";

pub fn level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    }
}

/// Install the terminal logger, plus a file logger under `log_dir` if given.
///
/// Returns the log file path when one was opened.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Result<Option<PathBuf>, AppError> {
    let filter = level(verbose);

    // Only records from this crate are emitted
    let config = ConfigBuilder::new()
        .add_filter_allow_str("netscope")
        .set_time_format_rfc3339()
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        filter,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ));

    let mut log_path = None;
    if let Some(dir) = log_dir {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
        let path = dir.join(LOG_FILE_NAME);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        loggers.push(WriteLogger::new(filter, config, file));
        log_path = Some(path);
    }

    CombinedLogger::init(loggers)
        .map_err(|e| AppError::Config(format!("Logger already initialized: {}", e)))?;

    log::debug!(
        "[Logging] Initialized at {} (file: {:?})",
        filter,
        log_path
    );
    Ok(log_path)
}

/// Append panics to `crash.log` in `log_dir`.
///
/// The hook writes the file directly, so it works even if the logger itself
/// is what panicked.
pub fn setup_panic_hook(log_dir: PathBuf) {
    panic::set_hook(Box::new(move |info| {
        let msg = format!(
            "{}\nBacktrace: {:?}\n",
            info,
            std::backtrace::Backtrace::capture()
        );
        eprintln!("{}", msg);

        let _ = write_crash(&log_dir, &msg);
    }));
}

fn write_crash(log_dir: &Path, msg: &str) -> std::io::Result<()> {
    fs::create_dir_all(log_dir)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(CRASH_FILE_NAME))?;
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    writeln!(file, "[{}] {}", timestamp, msg)
}
