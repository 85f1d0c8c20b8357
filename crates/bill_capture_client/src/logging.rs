use tracing_subscriber::EnvFilter;

/// Compact human-readable logs on stderr so stdout stays clean for command
/// output. `RUST_LOG` overrides the `warn` default.
pub fn init_cli_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
