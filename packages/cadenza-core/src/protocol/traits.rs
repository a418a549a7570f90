//! Trait abstractions for server connections.
//!
//! These traits enable dependency injection for testability. The pool and
//! the session manager depend on [`Connector`] and [`Connection`] rather
//! than on the concrete TCP implementation.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio_util::sync::CancellationToken;

use super::command::Command;
use super::response::Response;
use crate::error::{CadenzaError, CadenzaResult};
use crate::protocol_constants::{BINARY_SIZE_KEY, MAX_BINARY_BYTES};

/// A single authenticated session with the server.
///
/// One command is in flight at a time; callers needing concurrency lease
/// separate connections from the pool.
#[async_trait]
pub trait Connection: Send {
    /// Sends one command and reads its complete reply.
    ///
    /// A server ACK is returned as [`CadenzaError::Command`] and leaves the
    /// connection usable. Any other error marks it broken.
    async fn send(&mut self, command: &Command) -> CadenzaResult<Response>;

    /// Closes the connection. Errors are ignored.
    async fn close(&mut self);

    /// Returns true once an I/O or protocol failure made the connection unusable.
    fn is_broken(&self) -> bool;

    /// Retrieves a binary resource using the chunked reply mode.
    ///
    /// Re-issues `<command> <uri> <offset>` with an increasing offset until
    /// the declared total size is reached or the server returns an empty
    /// chunk. A reply without a binary payload (no resource) yields empty
    /// bytes.
    ///
    /// # Arguments
    /// * `command` - Binary-bearing command name (`albumart` or `readpicture`)
    /// * `uri` - Song file path the resource belongs to
    /// * `cancel` - Checked before each chunk request
    async fn read_binary(
        &mut self,
        command: &str,
        uri: &str,
        cancel: &CancellationToken,
    ) -> CadenzaResult<Bytes> {
        let mut data = BytesMut::new();
        let mut total: Option<usize> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(CadenzaError::Cancelled);
            }

            let request = Command::new(command)
                .arg(uri)
                .arg(data.len().to_string());
            let response = self.send(&request).await?;

            if total.is_none() {
                total = response.parse::<usize>(BINARY_SIZE_KEY);
            }

            let chunk = match response.binary {
                Some(chunk) if !chunk.is_empty() => chunk,
                _ => break,
            };

            data.extend_from_slice(&chunk);
            if data.len() > MAX_BINARY_BYTES {
                return Err(CadenzaError::Protocol(format!(
                    "{command} for {uri} exceeds {MAX_BINARY_BYTES} bytes"
                )));
            }

            match total {
                Some(total) if data.len() >= total => break,
                Some(_) => {}
                // Without a declared size a single chunk is the whole resource
                None => break,
            }
        }

        Ok(data.freeze())
    }
}

/// Opens new connections to one server.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens and authenticates a new connection.
    ///
    /// # Errors
    /// `Network` for connect/I/O failures, `Auth` for a rejected credential,
    /// `Protocol` for an unexpected greeting.
    async fn open(&self) -> CadenzaResult<Box<dyn Connection>>;
}
