use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter directives, overridden by `RUST_LOG`.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "equide=debug,info"
    } else {
        "equide=info"
    }
}

/// Installs the global `tracing` subscriber for the daemon and the CLI.
///
/// Calling it twice is harmless: the second registration is ignored.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_crate_level() {
        assert_eq!(default_directives(false), "equide=info");
        assert!(default_directives(true).starts_with("equide=debug"));
    }

    #[test]
    fn init_twice() {
        init_logging(false);
        init_logging(true);
    }
}
