use tracing_subscriber::EnvFilter;

/// Initialise the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects `debug` for this
/// crate and `info` everywhere else. Safe to call more than once.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "info,fundtransfer=debug"
    } else {
        "warn,fundtransfer=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
