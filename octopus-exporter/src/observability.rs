use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` replaces the defaults
/// entirely when set.
pub fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(debug)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn default_directives(debug: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    format!("warn,octopus_exporter={level},octopus_client={level}")
}
