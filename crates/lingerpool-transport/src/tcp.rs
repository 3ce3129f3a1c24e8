//! TCP transport
//!
//! Opens one TCP stream per connection id. The stream sits behind an async
//! mutex so every borrower of a pooled [`TcpConnection`] can use it; requests
//! from concurrent borrowers are serialized on that mutex.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lingerpool_core::ConnectionFactory;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::endpoint::Endpoint;
use crate::error::TransportError;

/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings applied to every stream the factory opens
#[derive(Debug, Clone)]
pub struct TcpFactoryConfig {
    pub connect_timeout: Duration,
    pub nodelay: bool,
}

impl Default for TcpFactoryConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            nodelay: true,
        }
    }
}

/// A connected TCP stream
pub struct TcpConnection {
    endpoint: Endpoint,
    peer_addr: SocketAddr,
    stream: Mutex<BufStream<TcpStream>>,
}

impl std::fmt::Debug for TcpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpConnection")
            .field("endpoint", &self.endpoint)
            .field("peer_addr", &self.peer_addr)
            .finish()
    }
}

impl TcpConnection {
    /// Connect to `endpoint`
    pub async fn connect(
        endpoint: Endpoint,
        config: &TcpFactoryConfig,
    ) -> Result<Self, TransportError> {
        let authority = endpoint.authority();
        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&authority))
            .await
            .map_err(|_| TransportError::ConnectTimeout {
                endpoint: endpoint.to_string(),
                timeout: config.connect_timeout,
            })??;

        stream.set_nodelay(config.nodelay)?;
        let peer_addr = stream.peer_addr()?;

        info!(
            endpoint = %endpoint,
            peer = %peer_addr,
            "[TcpFactory] Connected"
        );

        Ok(Self {
            endpoint,
            peer_addr,
            stream: Mutex::new(BufStream::new(stream)),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Write raw bytes and flush
    pub async fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut stream = self.stream.lock().await;
        stream.write_all(bytes).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Send one line and wait for one line back
    ///
    /// The trailing newline is added to the request and stripped from the reply.
    pub async fn request(&self, line: &str) -> Result<String, TransportError> {
        let mut stream = self.stream.lock().await;

        stream.write_all(line.as_bytes()).await?;
        stream.write_all(b"\n").await?;
        stream.flush().await?;

        let mut reply = String::new();
        let read = stream.read_line(&mut reply).await?;
        if read == 0 {
            return Err(TransportError::ConnectionClosed(self.endpoint.to_string()));
        }

        let reply = reply.trim_end_matches(['\r', '\n']).to_string();
        debug!(endpoint = %self.endpoint, bytes = read, "[TcpFactory] Request completed");
        Ok(reply)
    }
}

/// Creates [`TcpConnection`]s for ids like `host:port` or `tcp://host:port/service`
#[derive(Debug, Clone, Default)]
pub struct TcpConnectionFactory {
    config: TcpFactoryConfig,
}

impl TcpConnectionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TcpFactoryConfig) -> Self {
        Self { config }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.config.nodelay = nodelay;
        self
    }

    pub fn config(&self) -> &TcpFactoryConfig {
        &self.config
    }
}

#[async_trait]
impl ConnectionFactory<TcpConnection> for TcpConnectionFactory {
    async fn create_connection(&self, id: &str) -> Result<Option<TcpConnection>> {
        let endpoint = Endpoint::parse(id)?;
        debug!(id = %id, endpoint = %endpoint, "[TcpFactory] Connecting");

        let connection = TcpConnection::connect(endpoint, &self.config)
            .await
            .with_context(|| format!("Failed to connect to {}", id))?;

        Ok(Some(connection))
    }
}
