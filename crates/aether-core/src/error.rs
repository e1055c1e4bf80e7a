//! Error types and handling for aether-core operations.
//!
//! Every failure crossing a component boundary is an [`Error`] value with
//! a stable kind tag: `config`, `http`, `robots`, `parsing`, `unknown`,
//! plus `cancelled` for aborted contexts. Auxiliary subsystems
//! (cache tiers, robots fetches) are fail-open and never surface their
//! errors here; they log and move on.

use thiserror::Error;

/// The main error type for aether-core operations.
///
/// Underlying causes are preserved for `source()` unwrapping; `Display`
/// carries the operation label the failure occurred under.
#[derive(Error, Debug)]
pub enum Error {
    /// A required dependency or setting was missing or uninitialized.
    #[error("configuration error: {0}")]
    Config(String),

    /// URL parsing, transport failure after exhausted retries, or a body
    /// read failure.
    #[error("http error: {message}")]
    Http {
        /// Human-readable operation label.
        message: String,
        /// Underlying transport cause, when one exists.
        #[source]
        source: Option<reqwest::Error>,
    },

    /// robots.txt rules disallow fetching this URL. Never retried.
    #[error("blocked by robots.txt: {url}")]
    Robots {
        /// The URL that was denied.
        url: String,
    },

    /// Feed detection, HTML handling, or JSON decoding failed.
    #[error("parse error: {0}")]
    Parsing(String),

    /// The operation's cancellation handle fired.
    #[error("operation cancelled")]
    Cancelled,

    /// Catch-all for failures without a more specific kind.
    #[error("{0}")]
    Unknown(String),
}

impl Error {
    /// Builds an `http`-kind error with an operation label and no transport
    /// cause.
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an `http`-kind error wrapping the transport failure that
    /// caused it.
    pub fn http_with_source(message: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Stable kind tag for logging and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Http { .. } => "http",
            Self::Robots { .. } => "robots",
            Self::Parsing(_) => "parsing",
            Self::Cancelled => "cancelled",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Whether retrying the operation could plausibly succeed.
    ///
    /// Only transient transport failures qualify; robots denials and parse
    /// failures are permanent for a given input.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http {
                source: Some(e), ..
            } => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Convenience alias used throughout aether-core.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(Error::Config("x".into()).kind(), "config");
        assert_eq!(Error::http("x").kind(), "http");
        assert_eq!(Error::Robots { url: "u".into() }.kind(), "robots");
        assert_eq!(Error::Parsing("x".into()).kind(), "parsing");
        assert_eq!(Error::Cancelled.kind(), "cancelled");
        assert_eq!(Error::Unknown("x".into()).kind(), "unknown");
    }

    #[test]
    fn robots_and_parsing_are_not_retryable() {
        assert!(!Error::Robots { url: "u".into() }.is_retryable());
        assert!(!Error::Parsing("bad feed".into()).is_retryable());
        assert!(!Error::Config("missing".into()).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
        // An http error without a transport cause (e.g. URL parse) is final.
        assert!(!Error::http("invalid url").is_retryable());
    }

    #[test]
    fn display_carries_operation_label() {
        let err = Error::http("GET https://example.com failed");
        assert!(err.to_string().contains("GET https://example.com"));

        let err = Error::Robots {
            url: "https://h/private".into(),
        };
        assert!(err.to_string().contains("robots.txt"));
        assert!(err.to_string().contains("https://h/private"));
    }
}
