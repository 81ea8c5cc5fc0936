use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Address the WebSocket server listens on and clients connect to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct ServerEndpoint {
    /// Host name or IP literal.
    pub host: String,
    /// TCP port; `0` asks the operating system for an ephemeral port.
    pub port: u16,
}

impl ServerEndpoint {
    /// Builds an endpoint from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns a copy of the endpoint listening on a different port.
    #[must_use]
    pub fn with_port(&self, port: u16) -> Self {
        Self::new(self.host.clone(), port)
    }

    /// Host and port in the form accepted by socket address resolution.
    #[must_use]
    pub fn authority(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(formatter, "ws://[{}]:{}", self.host, self.port)
        } else {
            write!(formatter, "ws://{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for ServerEndpoint {
    type Err = SocketParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        if url.scheme() != "ws" {
            return Err(SocketParseError::UnsupportedScheme(url.scheme().to_owned()));
        }
        let host = url
            .host_str()
            .ok_or_else(|| SocketParseError::MissingHost(input.to_owned()))?;
        let port = url
            .port()
            .ok_or_else(|| SocketParseError::MissingPort(input.to_owned()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        Ok(Self::new(host, port))
    }
}

/// Errors encountered while parsing a [`ServerEndpoint`] from text.
#[derive(Debug, Error)]
pub enum SocketParseError {
    /// Scheme was not `ws`.
    #[error("unsupported endpoint scheme '{0}'")]
    UnsupportedScheme(String),
    /// Host name was missing.
    #[error("missing host in '{0}'")]
    MissingHost(String),
    /// Port was missing from the address.
    #[error("missing port in '{0}'")]
    MissingPort(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
