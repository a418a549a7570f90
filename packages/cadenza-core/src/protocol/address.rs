//! Server address parsing and resolution.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CadenzaError, CadenzaResult};
use crate::protocol_constants::DEFAULT_PORT;

/// Where the music server listens.
///
/// Parsed from `host`, `host:port`, `[v6addr]:port`, a bare IPv6 address,
/// or an absolute socket path starting with `/`. Abstract socket names
/// (`@name`) are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ServerAddress {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

impl ServerAddress {
    /// Creates a TCP address.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Resolves a TCP address to the first socket address the resolver yields.
    ///
    /// Returns `None` for socket paths, which need no resolution.
    pub async fn resolve(&self) -> CadenzaResult<Option<SocketAddr>> {
        match self {
            Self::Tcp { host, port } => {
                let mut addrs = tokio::net::lookup_host((host.as_str(), *port))
                    .await
                    .map_err(|e| CadenzaError::Network(format!("cannot resolve {host}: {e}")))?;
                addrs
                    .next()
                    .map(Some)
                    .ok_or_else(|| CadenzaError::Network(format!("{host} resolved to nothing")))
            }
            Self::Unix(_) => Ok(None),
        }
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::tcp("localhost", DEFAULT_PORT)
    }
}

impl FromStr for ServerAddress {
    type Err = CadenzaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CadenzaError::Configuration("empty server address".into()));
        }

        if s.starts_with('@') {
            return Err(CadenzaError::Configuration(format!(
                "abstract socket {s} is not supported"
            )));
        }
        if s.starts_with('/') {
            return Ok(Self::Unix(PathBuf::from(s)));
        }

        let parse_port = |port: &str| {
            port.parse::<u16>()
                .map_err(|_| CadenzaError::Configuration(format!("invalid port in {s}")))
        };

        // Bracketed IPv6, with or without port
        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| CadenzaError::Configuration(format!("unterminated [ in {s}")))?;
            let port = match tail.strip_prefix(':') {
                Some(port) => parse_port(port)?,
                None if tail.is_empty() => DEFAULT_PORT,
                None => {
                    return Err(CadenzaError::Configuration(format!(
                        "unexpected text after ] in {s}"
                    )))
                }
            };
            return Ok(Self::tcp(host, port));
        }

        match s.matches(':').count() {
            0 => Ok(Self::tcp(s, DEFAULT_PORT)),
            1 => {
                let (host, port) = s.split_once(':').unwrap_or((s, ""));
                if host.is_empty() {
                    return Err(CadenzaError::Configuration(format!("missing host in {s}")));
                }
                Ok(Self::tcp(host, parse_port(port)?))
            }
            // Bare IPv6 address without brackets cannot carry a port
            _ => Ok(Self::tcp(s, DEFAULT_PORT)),
        }
    }
}

impl TryFrom<String> for ServerAddress {
    type Error = CadenzaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServerAddress> for String {
    fn from(address: ServerAddress) -> Self {
        address.to_string()
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } if host.contains(':') => write!(f, "[{host}]:{port}"),
            Self::Tcp { host, port } => write!(f, "{host}:{port}"),
            Self::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}
