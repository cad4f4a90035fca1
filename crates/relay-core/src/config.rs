//! Environment-derived configuration.
//!
//! API keys are read once at startup. A missing key never prevents a server
//! from starting: the tools that need it are registered as
//! [`DisabledTool`](crate::tools::DisabledTool)s instead.

/// Environment variable holding the Perplexity API key.
pub const PERPLEXITY_API_KEY: &str = "PERPLEXITY_API_KEY";
/// Environment variable holding the Google (Gemini) API key.
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "RELAY_LOG";

/// Provider API keys. Empty or whitespace-only values count as absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderKeys {
    pub perplexity: Option<String>,
    pub google: Option<String>,
}

impl std::fmt::Debug for ProviderKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderKeys")
            .field("perplexity", &self.perplexity.as_ref().map(|_| "<set>"))
            .field("google", &self.google.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl ProviderKeys {
    /// Read keys from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read keys through an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            perplexity: read(PERPLEXITY_API_KEY),
            google: read(GOOGLE_API_KEY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_values_are_absent() {
        let env: HashMap<&str, &str> =
            HashMap::from([(PERPLEXITY_API_KEY, "pplx-123"), (GOOGLE_API_KEY, "  ")]);
        let keys = ProviderKeys::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(keys.perplexity.as_deref(), Some("pplx-123"));
        assert_eq!(keys.google, None);
    }

    #[test]
    fn debug_redacts_keys() {
        let keys = ProviderKeys {
            perplexity: Some("secret".into()),
            google: None,
        };
        let shown = format!("{keys:?}");
        assert!(!shown.contains("secret"));
        assert!(shown.contains("<set>"));
    }
}
