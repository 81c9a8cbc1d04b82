use env_logger::Builder;

/// Filter used when `RUST_LOG` is unset: the crate's own level is `info`
/// with `verbose`, `warn` otherwise. HTTP client internals stay at `warn`.
fn default_filter(verbose: bool) -> String {
    let level = if verbose { "info" } else { "warn" };
    format!("warn,trinkbrunnen={},reqwest=warn", level)
}

fn logger_builder(verbose: bool, env_filter: Option<&str>) -> Builder {
    let mut builder = Builder::new();
    match env_filter {
        Some(filters) if !filters.trim().is_empty() => builder.parse_filters(filters),
        _ => builder.parse_filters(&default_filter(verbose)),
    };
    builder.format_timestamp(None);
    builder
}

/// Initialize `env_logger`.
///
/// A non-empty `RUST_LOG` replaces the default filters entirely, so
/// `RUST_LOG=trinkbrunnen=debug` turns on debug output regardless of
/// `verbose`.
pub fn init_logger(verbose: bool) {
    let env_filter = std::env::var("RUST_LOG").ok();

    // Already-initialized is fine (tests, repeated calls)
    let _ = logger_builder(verbose, env_filter.as_deref()).try_init();
}
