//! Concrete connection over TCP or a local socket.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::address::ServerAddress;
use super::command::Command;
use super::response::{read_line, read_response, Response};
use super::traits::{Connection, Connector};
use crate::error::{CadenzaError, CadenzaResult};
use crate::protocol_constants::{CMD_CLOSE, CMD_PASSWORD, GREETING_PREFIX};

/// Byte stream a connection runs over.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// A connection speaking the line protocol over any [`Transport`].
pub struct MpdConnection {
    stream: BufReader<Box<dyn Transport>>,
    server_version: String,
    broken: bool,
}

impl MpdConnection {
    /// Opens a connection to `address` and authenticates with `password`.
    ///
    /// # Arguments
    /// * `address` - TCP host/port or local socket path
    /// * `password` - Credential sent with the `password` command, if any
    /// * `connect_timeout` - Upper bound for the transport connect and greeting
    pub async fn open(
        address: &ServerAddress,
        password: Option<&str>,
        connect_timeout: Duration,
    ) -> CadenzaResult<Self> {
        let transport: Box<dyn Transport> = match address {
            ServerAddress::Tcp { .. } => {
                let target = address
                    .resolve()
                    .await?
                    .ok_or_else(|| CadenzaError::Network(format!("cannot resolve {address}")))?;
                let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(target))
                    .await??;
                stream.set_nodelay(true)?;
                Box::new(stream)
            }
            #[cfg(unix)]
            ServerAddress::Unix(path) => {
                let stream =
                    tokio::time::timeout(connect_timeout, tokio::net::UnixStream::connect(path))
                        .await??;
                Box::new(stream)
            }
            #[cfg(not(unix))]
            ServerAddress::Unix(path) => {
                return Err(CadenzaError::Configuration(format!(
                    "local sockets are not supported on this platform: {}",
                    path.display()
                )));
            }
        };

        tokio::time::timeout(connect_timeout, Self::handshake(transport, password)).await?
    }

    /// Reads the greeting and authenticates over an already-open transport.
    pub async fn handshake(
        transport: Box<dyn Transport>,
        password: Option<&str>,
    ) -> CadenzaResult<Self> {
        let mut stream = BufReader::new(transport);

        let greeting = read_line(&mut stream).await?;
        let server_version = greeting
            .strip_prefix(GREETING_PREFIX)
            .ok_or_else(|| CadenzaError::Protocol(format!("unexpected greeting: {greeting}")))?
            .trim()
            .to_string();

        let mut connection = Self {
            stream,
            server_version,
            broken: false,
        };

        if let Some(password) = password.filter(|p| !p.is_empty()) {
            match connection
                .send(&Command::new(CMD_PASSWORD).arg(password))
                .await
            {
                Ok(_) => {}
                Err(CadenzaError::Command(ack)) => {
                    return Err(CadenzaError::Auth(ack.message));
                }
                Err(e) => return Err(e),
            }
        }

        log::debug!(
            "[Connection] Connected to server protocol {}",
            connection.server_version
        );
        Ok(connection)
    }

    /// Returns the protocol version announced in the greeting.
    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    async fn exchange(&mut self, command: &Command) -> CadenzaResult<Response> {
        self.stream.write_all(command.to_line().as_bytes()).await?;
        self.stream.flush().await?;
        read_response(&mut self.stream).await
    }
}

#[async_trait]
impl Connection for MpdConnection {
    async fn send(&mut self, command: &Command) -> CadenzaResult<Response> {
        if self.broken {
            return Err(CadenzaError::Network("connection is broken".into()));
        }

        log::trace!("[Connection] -> {}", command);
        let result = self.exchange(command).await;
        match &result {
            Ok(response) => log::trace!("[Connection] <- {}", response),
            Err(CadenzaError::Command(ack)) => {
                log::debug!("[Connection] {} failed: {}", command.name(), ack)
            }
            Err(e) => {
                log::warn!("[Connection] {} failed: {}", command.name(), e);
                self.broken = true;
            }
        }
        result
    }

    async fn close(&mut self) {
        if !self.broken {
            let line = Command::new(CMD_CLOSE).to_line();
            let _ = self.stream.write_all(line.as_bytes()).await;
            let _ = self.stream.flush().await;
        }
        let _ = self.stream.shutdown().await;
        self.broken = true;
    }

    fn is_broken(&self) -> bool {
        self.broken
    }
}

/// Connector opening [`MpdConnection`]s to a fixed address.
#[derive(Debug, Clone)]
pub struct MpdConnector {
    address: ServerAddress,
    password: Option<String>,
    connect_timeout: Duration,
}

impl MpdConnector {
    /// Creates a connector for the given target.
    pub fn new(address: ServerAddress, password: Option<String>, connect_timeout: Duration) -> Self {
        Self {
            address,
            password,
            connect_timeout,
        }
    }

    /// Returns the target address.
    pub fn address(&self) -> &ServerAddress {
        &self.address
    }
}

#[async_trait]
impl Connector for MpdConnector {
    async fn open(&self) -> CadenzaResult<Box<dyn Connection>> {
        let connection =
            MpdConnection::open(&self.address, self.password.as_deref(), self.connect_timeout)
                .await?;
        Ok(Box::new(connection))
    }
}
