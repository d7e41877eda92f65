use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "witness_collation=info";

/// Installs the global subscriber for binaries. `RUST_LOG` overrides the
/// default filter; `RUST_LOG_FORMAT=json` switches to JSON lines. Later
/// calls are no-ops.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let json = wants_json(std::env::var("RUST_LOG_FORMAT").ok().as_deref());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false);

    if json {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}

fn wants_json(format: Option<&str>) -> bool {
    format.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}
