use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Request spans from `TraceLayer` are emitted at debug.
const DEFAULT_DIRECTIVES: &str = "info,tower_http=debug";
const KEPT_LOG_FILES: usize = 7;

fn file_appender(log_dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("ragline")
        .filename_suffix("log")
        .max_log_files(KEPT_LOG_FILES)
        .build(log_dir)
}

/// Console plus daily files under `log_dir`. `RUST_LOG` replaces the
/// default filter. Dropping the returned guard flushes the file writer.
pub fn init(log_dir: &Path) -> Result<WorkerGuard, InitError> {
    let (writer, guard) = tracing_appender::non_blocking(file_appender(log_dir)?);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    // A subscriber installed earlier (tests, embedding hosts) stays in place.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .try_init();

    Ok(guard)
}
