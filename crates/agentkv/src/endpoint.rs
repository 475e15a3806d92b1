//! Endpoint strings that select a backend.
//!
//! | endpoint          | backend                               |
//! |-------------------|---------------------------------------|
//! | `mem://<label>`   | in-memory, private to the provider    |
//! | `memory://<label>`| same as `mem://`                      |
//! | `file://<path>`   | embedded WAL engine rooted at `<path>`|

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Message for a blank endpoint.
pub const BLANK_ENDPOINT_MSG: &str = "endpoint for new provider can't be blank";

/// A parsed endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Memory { label: String },
    File { root: PathBuf },
}

impl Endpoint {
    /// Parse `raw`.
    ///
    /// A blank string is a configuration error; anything that is not
    /// `<known scheme>://<non-empty location>` is a connection error, the
    /// same way an unreachable host would be.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::Configuration(BLANK_ENDPOINT_MSG.to_string()));
        }

        let (scheme, location) = trimmed
            .split_once("://")
            .ok_or_else(|| Error::connection(trimmed, "malformed endpoint, expected <scheme>://<location>"))?;

        if location.is_empty() {
            return Err(Error::connection(trimmed, "endpoint location is empty"));
        }

        match scheme.to_ascii_lowercase().as_str() {
            "mem" | "memory" => Ok(Endpoint::Memory { label: location.to_string() }),
            "file" => Ok(Endpoint::File { root: PathBuf::from(location) }),
            other => Err(Error::connection(trimmed, format!("unsupported scheme '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_is_configuration_error() {
        for raw in ["", "   ", "\t\n"] {
            match Endpoint::parse(raw) {
                Err(Error::Configuration(msg)) => assert!(msg.contains(BLANK_ENDPOINT_MSG)),
                other => panic!("expected configuration error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_missing_scheme_is_connection_error() {
        assert!(matches!(Endpoint::parse("wrongURL"), Err(Error::Connection { .. })));
        assert!(matches!(Endpoint::parse("localhost:5984"), Err(Error::Connection { .. })));
    }

    #[test]
    fn test_unknown_scheme_is_connection_error() {
        assert!(matches!(Endpoint::parse("http://localhost:5984"), Err(Error::Connection { .. })));
    }

    #[test]
    fn test_empty_location_is_connection_error() {
        assert!(matches!(Endpoint::parse("file://"), Err(Error::Connection { .. })));
    }

    #[test]
    fn test_memory_endpoints() {
        assert_eq!(
            Endpoint::parse("mem://scratch").unwrap(),
            Endpoint::Memory { label: "scratch".into() }
        );
        assert_eq!(
            Endpoint::parse(" MEMORY://x ").unwrap(),
            Endpoint::Memory { label: "x".into() }
        );
    }

    #[test]
    fn test_file_endpoint() {
        assert_eq!(
            Endpoint::parse("file:///var/lib/agent").unwrap(),
            Endpoint::File { root: PathBuf::from("/var/lib/agent") }
        );
    }
}
