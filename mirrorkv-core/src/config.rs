//! Mirror configuration
//!
//! The mirror is built from three values: the document-store connection
//! string, the list of cache nodes and the primary designation. They are
//! loaded from environment variables with development defaults.

use crate::{ConfigError, MirrorError, MirrorResult, Primary};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ENV_DOCUMENT_URI: &str = "MIRRORKV_DOCUMENT_URI";
pub const ENV_CACHE_NODES: &str = "MIRRORKV_CACHE_NODES";
pub const ENV_PRIMARY: &str = "MIRRORKV_PRIMARY";

pub const DEFAULT_DOCUMENT_URI: &str = "couchbase://localhost";

/// Address of one cache node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheNode {
    pub host: String,
    pub port: u16,
}

impl CacheNode {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse a `host:port` pair.
    pub fn parse(addr: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidValue {
            field: "cache_nodes".to_string(),
            value: addr.to_string(),
            reason: reason.to_string(),
        };

        let (host, port) = addr
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected host:port"))?;
        if host.is_empty() {
            return Err(invalid("host must not be empty"));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| invalid("port must be a number between 1 and 65535"))?;
        if port == 0 {
            return Err(invalid("port must be a number between 1 and 65535"));
        }

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for CacheNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for CacheNode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Construction parameters for a mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Connection string for the document store.
    pub document_uri: String,
    /// Cache nodes keys are distributed over.
    pub cache_nodes: Vec<CacheNode>,
    /// Which store is authoritative.
    pub primary: Primary,
}

impl MirrorConfig {
    pub fn new(
        document_uri: impl Into<String>,
        cache_nodes: Vec<CacheNode>,
        primary: Primary,
    ) -> Self {
        Self {
            document_uri: document_uri.into(),
            cache_nodes,
            primary,
        }
    }

    /// Create a MirrorConfig from environment variables.
    ///
    /// Environment variables:
    /// - `MIRRORKV_DOCUMENT_URI`: document store connection string (default: couchbase://localhost)
    /// - `MIRRORKV_CACHE_NODES`: comma-separated `host:port` list (default: empty)
    /// - `MIRRORKV_PRIMARY`: "document" or "cache" (default: document)
    pub fn from_env() -> MirrorResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> MirrorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let document_uri = lookup(ENV_DOCUMENT_URI)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_DOCUMENT_URI.to_string());

        let cache_nodes = lookup(ENV_CACHE_NODES)
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(CacheNode::parse)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let primary = lookup(ENV_PRIMARY)
            .map(|s| s.parse::<Primary>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            document_uri,
            cache_nodes,
            primary,
        })
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - document_uri is not empty
    /// - at least one cache node is configured
    /// - every cache node has a non-empty host and a non-zero port
    pub fn validate(&self) -> MirrorResult<()> {
        if self.document_uri.trim().is_empty() {
            return Err(MirrorError::Config(ConfigError::MissingRequired {
                field: "document_uri".to_string(),
            }));
        }

        if self.cache_nodes.is_empty() {
            return Err(MirrorError::Config(ConfigError::MissingRequired {
                field: "cache_nodes".to_string(),
            }));
        }

        for node in &self.cache_nodes {
            if node.host.trim().is_empty() || node.port == 0 {
                return Err(MirrorError::Config(ConfigError::InvalidValue {
                    field: "cache_nodes".to_string(),
                    value: node.to_string(),
                    reason: "cache node needs a host and a non-zero port".to_string(),
                }));
            }
        }

        Ok(())
    }
}
