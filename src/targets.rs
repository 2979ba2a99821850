//! Target list generation.

use crate::probe::Target;

/// Default number of targets per run.
pub const DEFAULT_COUNT: usize = 100_000;

/// Default probed path.
pub const DEFAULT_PATH: &str = "/health";

/// Build `count` targets that all point at `base_url` + `path`.
///
/// Ids are `target-1` through `target-{count}`.
pub fn generate(base_url: &str, path: &str, count: usize) -> Vec<Target> {
    let destination = join_url(base_url, path);
    (1..=count)
        .map(|i| Target::new(format!("target-{i}"), destination.clone()))
        .collect()
}

fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
