use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "recordedit_core=info,recordedit_client=info";

/// Installs the process-wide fmt subscriber for the editor crates.
///
/// `RUST_LOG` wins when it parses; otherwise both crates log at `info`.
/// Only the first call installs anything.
pub fn init_tracing() {
    let filter = editor_filter(std::env::var("RUST_LOG").ok().as_deref());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

fn editor_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}
