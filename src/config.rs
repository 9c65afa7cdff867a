// File: src/config.rs
//
// Transport backend selection.
// Exactly two backends exist; the active one is chosen per call via
// `run_function`, or globally through the NONLOCAL_TRANSPORT environment
// variable (read once and cached) with a feature-flag fallback.

use once_cell::sync::Lazy;
use std::env;
use std::fmt;

/// Which mechanism carries signals from raiser to resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Structured stack unwinding: raising throws a transportable packet
    /// and every scope boundary is an unwind handler.
    Unwinding,
    /// Explicit continuation chaining: frames live in an arena with
    /// parent handles, and signals travel slot-to-slot without unwinding.
    Chaining,
}

static CONFIGURED: Lazy<Backend> = Lazy::new(|| match env::var("NONLOCAL_TRANSPORT") {
    Ok(value) => match Backend::parse(&value) {
        Some(backend) => backend,
        None => {
            tracing::warn!(
                %value,
                "unrecognized NONLOCAL_TRANSPORT value, falling back to default"
            );
            Backend::default()
        }
    },
    Err(_) => Backend::default(),
});

impl Backend {
    /// Parse a configuration value. Only `"unwinding"` and `"chaining"`
    /// are recognized.
    pub fn parse(value: &str) -> Option<Backend> {
        match value {
            "unwinding" => Some(Backend::Unwinding),
            "chaining" => Some(Backend::Chaining),
            _ => None,
        }
    }

    /// The configured backend: NONLOCAL_TRANSPORT if set and valid,
    /// otherwise the feature-flag default. Cached after the first read.
    pub fn from_env() -> Backend {
        *CONFIGURED
    }
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(feature = "chaining") && !cfg!(feature = "unwinding") {
            Backend::Chaining
        } else {
            Backend::Unwinding
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Backend::Unwinding => write!(f, "unwinding"),
            Backend::Chaining => write!(f, "chaining"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recognizes_exactly_two_values() {
        assert_eq!(Backend::parse("unwinding"), Some(Backend::Unwinding));
        assert_eq!(Backend::parse("chaining"), Some(Backend::Chaining));
        assert_eq!(Backend::parse("setjmp"), None);
        assert_eq!(Backend::parse(""), None);
    }

    #[test]
    fn test_default_backend_follows_feature_flags() {
        let expected = if cfg!(feature = "chaining") && !cfg!(feature = "unwinding") {
            Backend::Chaining
        } else {
            Backend::Unwinding
        };
        assert_eq!(Backend::default(), expected);
    }
}
