use std::io;
use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const CONSOLE_FILTER: &str = "warn,extract=info,store=info,sqlx=off";
const FILE_FILTER: &str = "info,text=debug,index=debug,entity=debug,extract=debug,match=debug,store=debug,sqlx=warn";

/// Installs the global subscriber: stderr (filtered by `RUST_LOG` when set)
/// plus a daily-rolling file under `log_dir`.
///
/// Console output goes to stderr so that stdout only carries results.
pub fn configure_logging(log_dir: &str) {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(CONSOLE_FILTER));
    let console_log = fmt::layer()
        .with_writer(io::stderr)
        .with_filter(console_filter);

    let file_appender = rolling::daily(log_dir, "searchterm.log");
    let file_log = fmt::layer()
        .with_ansi(false)
        .with_writer(file_appender)
        .with_filter(EnvFilter::new(FILE_FILTER));

    tracing_subscriber::Registry::default()
        .with(console_log)
        .with(file_log)
        .init();
}
