//! Endpoint parsing
//!
//! Connection ids name a TCP endpoint in one of these forms:
//! - `host:port`
//! - `tcp://host:port[/service]`
//! - `//host:port/service` (registry-style service URL)

use std::fmt;

use url::Url;

use crate::error::TransportError;

/// A parsed TCP endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Service name from the URL path, if any
    pub service: Option<String>,
}

impl Endpoint {
    /// Parse a connection id into an endpoint
    pub fn parse(id: &str) -> Result<Self, TransportError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(TransportError::InvalidEndpoint {
                id: id.to_string(),
                reason: "empty".to_string(),
            });
        }

        let normalized = if id.contains("://") {
            id.to_string()
        } else if id.starts_with("//") {
            format!("tcp:{}", id)
        } else {
            format!("tcp://{}", id)
        };

        let url = Url::parse(&normalized).map_err(|e| TransportError::InvalidEndpoint {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "tcp" {
            return Err(TransportError::UnsupportedScheme(url.scheme().to_string()));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| TransportError::InvalidEndpoint {
                id: id.to_string(),
                reason: "missing host".to_string(),
            })?;
        // IPv6 literals come back bracketed
        let host = host.trim_start_matches('[').trim_end_matches(']').to_string();

        let port = url.port().ok_or_else(|| TransportError::InvalidEndpoint {
            id: id.to_string(),
            reason: "missing port".to_string(),
        })?;

        let service = Some(url.path().trim_matches('/'))
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            host,
            port,
            service,
        })
    }

    /// `host:port` form accepted by `TcpStream::connect`
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.service {
            Some(service) => write!(f, "tcp://{}/{}", self.authority(), service),
            None => write!(f, "tcp://{}", self.authority()),
        }
    }
}
