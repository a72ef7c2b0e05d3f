use tracing_subscriber::EnvFilter;

/// Log to stderr; `verbose` turns on per-row and per-call progress.
pub(crate) fn init_logging(verbose: bool) {
    let directives = if verbose { "enrich_core=debug,enrich_cli=debug,info" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
