use tracing_subscriber::EnvFilter;

/// JSON logs on stdout for CloudWatch. `RUST_LOG` overrides the `info`
/// default.
pub fn init_lambda_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .try_init();
}
