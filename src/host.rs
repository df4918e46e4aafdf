use std::sync::OnceLock;

static HOSTNAME: OnceLock<String> = OnceLock::new();

/// Local hostname as used in metric tags. Resolved on first call and cached
/// for the life of the process.
pub fn hostname() -> &'static str {
    HOSTNAME.get_or_init(resolve)
}

fn resolve() -> String {
    let name = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    tracing::debug!(hostname = %name, "resolved hostname for metric tags");
    name
}
