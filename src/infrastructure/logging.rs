use std::io;

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{config::AppConfig, infrastructure::directories::ResolvedPaths};

const LOG_FILE: &str = "scamsense.log";

/// The HTML parser stack logs every tree-builder step at debug level.
const QUIET_DEPENDENCIES: &[&str] = &["html5ever=warn", "selectors=warn", "hyper_util=info"];

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Installs the global subscriber once. Console output goes to stderr so
/// stdout stays free for scan reports; the daily file keeps everything the
/// filter lets through.
pub fn init_tracing(config: &AppConfig, paths: &ResolvedPaths) -> Result<()> {
    if FILE_GUARD.get().is_some() {
        return Ok(());
    }

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&paths.logs_dir, LOG_FILE));

    tracing_subscriber::registry()
        .with(build_filter(&config.logging.level))
        .with(
            fmt::layer()
                .compact()
                .with_writer(io::stderr)
                .with_target(true),
        )
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .try_init()?;

    let _ = FILE_GUARD.set(guard);
    tracing::debug!(logs = %paths.logs_dir.display(), file = LOG_FILE, "tracing initialized");
    Ok(())
}

/// `RUST_LOG` wins outright; otherwise the configured level applies with the
/// parser crates held back.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(level)))
        .unwrap_or_else(|_| EnvFilter::new(default_directives("info")))
}

fn default_directives(level: &str) -> String {
    std::iter::once(level.trim())
        .chain(QUIET_DEPENDENCIES.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}
