use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Keeps the non-blocking file writer alive; dropping it flushes and stops
/// the background worker, so hold it for the life of the process.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Install the global subscriber: stdout always, plus a daily-rolling file
/// layer when `config.log_dir` is set.
pub fn init_tracing(config: &Config) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    if let Some(log_dir) = config.log_dir.as_deref() {
        match std::fs::create_dir_all(log_dir) {
            Ok(()) => {
                let file_appender =
                    RollingFileAppender::new(Rotation::DAILY, log_dir, "adaptiq.log");
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                let file_layer = fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_target(true);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(stdout_layer)
                    .with(file_layer)
                    .init();

                return Some(FileLogGuard { _guard: guard });
            }
            Err(err) => {
                eprintln!("failed to create log directory {log_dir}: {err}");
            }
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();

    None
}
