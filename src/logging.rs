use tracing_subscriber::EnvFilter;

/// Initialize tracing for the diagnostic run. The status report itself goes
/// to stdout; tracing carries request-level detail on stderr so the two can
/// be separated with shell redirection. Default filter is `warn`, raise it
/// with RUST_LOG (e.g. RUST_LOG=conncheck=debug).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .init();
}
