//! Environment-driven configuration with warn-level logging for invalid values.

use std::time::Duration;

/// Parse an environment variable with a default fallback.
///
/// - Not set: returns `default` silently.
/// - Set but unparsable: logs a warning and returns `default`.
pub fn env_parse_with_default<T: std::str::FromStr + std::fmt::Display>(
    var: &str,
    default: T,
) -> T {
    match std::env::var(var) {
        Ok(v) => match v.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                tracing::warn!(
                    var,
                    value = %v,
                    default = %default,
                    "invalid env var value, using default"
                );
                default
            },
        },
        Err(_) => default,
    }
}

/// Read a whole-second duration from the environment.
///
/// Zero is rejected (a zero timer would spin) and replaced by the default.
pub fn env_secs_with_default(var: &str, default_secs: u64) -> Duration {
    let secs = env_parse_with_default(var, default_secs);
    if secs == 0 {
        tracing::warn!(var, default = default_secs, "zero duration not allowed, using default");
        return Duration::from_secs(default_secs);
    }
    Duration::from_secs(secs)
}

/// Read a non-empty string from the environment.
#[must_use]
pub fn env_string(var: &str) -> Option<String> {
    std::env::var(var).ok().map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}
