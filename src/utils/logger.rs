use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, fmt::time::UtcTime, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::error::{AppError, AppResult};

/// Keeps the file writer flushing for the life of the process.
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

const PLANNER_DIRECTIVES: &str = "info,app::planner=debug";
const LOG_FILE_PREFIX: &str = "smart-schedule.log";

/// Where planner logs go. `RUST_LOG` wins over `directives` when set.
#[derive(Debug, Clone)]
pub struct LogOptions {
    pub log_dir: PathBuf,
    pub directives: String,
    pub echo_to_stderr: bool,
}

impl LogOptions {
    pub fn in_dir(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            directives: PLANNER_DIRECTIVES.to_string(),
            echo_to_stderr: true,
        }
    }
}

/// Installs the global subscriber with a daily rolling file. Later calls are no-ops.
pub fn init_logging(options: &LogOptions) -> AppResult<()> {
    if FILE_GUARD.get().is_some() {
        return Ok(());
    }

    std::fs::create_dir_all(&options.log_dir)?;
    let appender = tracing_appender::rolling::daily(&options.log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    if FILE_GUARD.set(guard).is_err() {
        return Ok(());
    }

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(UtcTime::rfc_3339());
    let stderr_layer = options.echo_to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .boxed()
    });

    tracing_subscriber::registry()
        .with(planner_filter(&options.directives)?)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|err| AppError::other(format!("tracing subscriber already set: {err}")))
}

fn planner_filter(directives: &str) -> AppResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives))
        .map_err(|err| AppError::other(format!("invalid log directives '{directives}': {err}")))
}
