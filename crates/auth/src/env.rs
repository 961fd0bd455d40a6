//! Environment lookup seam for provider configuration.
//!
//! Provider secrets (client ids, redirect uris, scope overrides) are read
//! from the environment at resolution time. The lookup is a trait so tests
//! can inject a map instead of mutating process state.

use std::collections::HashMap;

/// Read-only source of configuration values.
pub trait EnvSource: Send + Sync {
    /// Look up a key, returning a sanitized value or `None` when absent.
    fn get(&self, key: &str) -> Option<String>;
}

/// Production source backed by `std::env`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().and_then(sanitize)
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned().and_then(sanitize)
    }
}

/// Trim and drop empty or placeholder values injected by build tooling.
fn sanitize(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "undefined" {
        return None;
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    //! Unit tests for environment sanitization.
    use super::*;

    /// Validates empty and placeholder values read as absent.
    #[test]
    fn sanitize_drops_blank_and_placeholder() {
        let mut env = HashMap::new();
        env.insert("A".to_string(), "  value  ".to_string());
        env.insert("B".to_string(), "   ".to_string());
        env.insert("C".to_string(), "undefined".to_string());

        assert_eq!(EnvSource::get(&env, "A").as_deref(), Some("value"));
        assert_eq!(EnvSource::get(&env, "B"), None);
        assert_eq!(EnvSource::get(&env, "C"), None);
        assert_eq!(EnvSource::get(&env, "missing"), None);
    }
}
