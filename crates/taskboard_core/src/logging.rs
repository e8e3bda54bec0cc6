//! Process-wide log setup for the task-board core.
//!
//! # Responsibility
//! - Route `log` records either to size-rotated files or to stderr.
//! - Record panics as one `event=panic` line before the default hook runs.
//!
//! # Invariants
//! - One sink per process: repeating the active setup is a no-op, any other
//!   setup is a [`LoggingError::Conflict`].
//! - Setup never panics.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, LogSpecification, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

const FILE_BASENAME: &str = "taskboard";
const ROTATE_AT_BYTES: u64 = 8 * 1024 * 1024;
const KEEP_FILES: usize = 4;
const PANIC_LINE_MAX_CHARS: usize = 200;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Rotated files under this absolute directory.
    Directory(PathBuf),
    Stderr,
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory(dir) => write!(f, "{}", dir.display()),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Level plus target of a logger setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSetup {
    pub level: LevelFilter,
    pub target: LogTarget,
}

impl Display for LogSetup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.level.to_string().to_ascii_lowercase(), self.target)
    }
}

#[derive(Debug)]
pub enum LoggingError {
    UnsupportedLevel(String),
    RelativeLogDir(String),
    EmptyLogDir,
    CreateDir { dir: PathBuf, source: io::Error },
    Backend(String),
    Conflict { active: LogSetup, requested: LogSetup },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error|off"
            ),
            Self::RelativeLogDir(dir) => write!(f, "log directory must be absolute, got `{dir}`"),
            Self::EmptyLogDir => f.write_str("log directory is empty"),
            Self::CreateDir { dir, source } => {
                write!(f, "cannot create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(message) => write!(f, "logger backend failed: {message}"),
            Self::Conflict { active, requested } => write!(
                f,
                "logging already runs as `{active}`; cannot switch to `{requested}`"
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            _ => None,
        }
    }
}

struct ActiveLogger {
    setup: LogSetup,
    _handle: LoggerHandle,
}

/// Sends logs to rotated files under the absolute directory `log_dir`.
///
/// # Errors
/// - [`LoggingError::UnsupportedLevel`], [`LoggingError::EmptyLogDir`] or
///   [`LoggingError::RelativeLogDir`] for bad arguments.
/// - [`LoggingError::CreateDir`] / [`LoggingError::Backend`] when the sink
///   cannot be opened.
/// - [`LoggingError::Conflict`] when another setup is already active.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), LoggingError> {
    install(LogSetup {
        level: parse_level(level)?,
        target: LogTarget::Directory(parse_log_dir(log_dir)?),
    })
}

/// Sends logs to stderr; used by the command-line binary.
pub fn init_stderr_logging(level: &str) -> Result<(), LoggingError> {
    install(LogSetup {
        level: parse_level(level)?,
        target: LogTarget::Stderr,
    })
}

/// The active setup, if logging was initialized.
pub fn logging_status() -> Option<LogSetup> {
    ACTIVE.get().map(|active| active.setup.clone())
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn install(requested: LogSetup) -> Result<(), LoggingError> {
    let active = ACTIVE.get_or_try_init(|| -> Result<ActiveLogger, LoggingError> {
        let handle = open_sink(&requested)?;
        install_panic_hook();
        info!(
            "event=logging_ready module=logging status=ok setup={} version={}",
            requested,
            env!("CARGO_PKG_VERSION")
        );
        Ok(ActiveLogger {
            setup: requested.clone(),
            _handle: handle,
        })
    })?;

    if active.setup == requested {
        Ok(())
    } else {
        Err(LoggingError::Conflict {
            active: active.setup.clone(),
            requested,
        })
    }
}

fn open_sink(setup: &LogSetup) -> Result<LoggerHandle, LoggingError> {
    let spec = LogSpecification::builder().default(setup.level).build();
    let logger = Logger::with(spec);

    let logger = match &setup.target {
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
                dir: dir.clone(),
                source,
            })?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(FILE_BASENAME))
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
        LogTarget::Stderr => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::default_format),
    };

    logger
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))
}

fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    let trimmed = level.trim();
    if trimmed.eq_ignore_ascii_case("warning") {
        return Ok(LevelFilter::Warn);
    }
    trimmed
        .parse::<LevelFilter>()
        .map_err(|_| LoggingError::UnsupportedLevel(trimmed.to_string()))
}

fn parse_log_dir(log_dir: &str) -> Result<PathBuf, LoggingError> {
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return Err(LoggingError::EmptyLogDir);
    }
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return Err(LoggingError::RelativeLogDir(trimmed.to_string()));
    }
    Ok(path.to_path_buf())
}

// Runs inside the `ACTIVE` initializer, so at most once per process.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("<non-string payload>");
        // Payload may carry record attribute values; keep it to one capped line.
        error!(
            "event=panic module=logging status=error at={} payload={}",
            location,
            one_line(payload, PANIC_LINE_MAX_CHARS)
        );
        previous(info);
    }));
}

fn one_line(text: &str, max_chars: usize) -> String {
    let mut line: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .take(max_chars)
        .collect();
    if text.chars().count() > max_chars {
        line.push_str("...");
    }
    line
}
