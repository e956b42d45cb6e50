use tracing_subscriber::fmt::time::uptime;
use tracing_subscriber::EnvFilter;

/// Install the process-wide tracing subscriber.
///
/// Filter directives come from `RUST_LOG` when set, otherwise from the
/// `--log-level` flag. Events go to stderr so the fares CSV can be sent to
/// stdout (`--output /dev/stdout`) without log lines corrupting it, and the
/// timer counts seconds since startup, the same clock as the elapsed-time
/// figure in the run summary.
pub fn init(log_level: &str) {
    let directives =
        std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| log_level.to_owned());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .with_timer(uptime())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
