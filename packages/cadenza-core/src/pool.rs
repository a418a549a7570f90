//! Bounded pool of command connections.
//!
//! A lease holds one semaphore permit and one connection. Idle connections
//! live in a plain vector; a permit guarantees a slot, and a slot without an
//! idle connection is filled by opening a new one. This keeps a connection
//! in the hands of at most one caller at a time.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::{CadenzaError, CadenzaResult};
use crate::protocol::{Command, Connection, Connector, Response};
use crate::state::SessionFlags;

/// Fixed-capacity set of connections leased to concurrent callers.
pub struct ConnectionPool {
    connector: Arc<dyn Connector>,
    flags: Arc<SessionFlags>,
    semaphore: Arc<Semaphore>,
    idle: Mutex<Vec<Box<dyn Connection>>>,
    capacity: usize,
}

impl ConnectionPool {
    /// Opens `capacity` connections eagerly.
    ///
    /// If any connection fails to open, the ones already opened are closed
    /// and the first error is returned.
    pub async fn open(
        connector: Arc<dyn Connector>,
        capacity: usize,
        flags: Arc<SessionFlags>,
    ) -> CadenzaResult<Arc<Self>> {
        let results = join_all((0..capacity).map(|_| connector.open())).await;

        let mut opened = Vec::with_capacity(capacity);
        let mut first_error = None;
        for result in results {
            match result {
                Ok(connection) => opened.push(connection),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            for mut connection in opened {
                connection.close().await;
            }
            return Err(e);
        }

        log::debug!("[Pool] Opened {} connection(s)", capacity);
        Ok(Arc::new(Self {
            connector,
            flags,
            semaphore: Arc::new(Semaphore::new(capacity)),
            idle: Mutex::new(opened),
            capacity,
        }))
    }

    /// Leases a connection, waiting until one is free.
    ///
    /// # Errors
    /// - `Cancelled` if `cancel` fires first
    /// - `NotConnected` if the pool has been cleared or the session is gone
    /// - any error from re-opening a retired slot
    pub async fn lease(self: &Arc<Self>, cancel: &CancellationToken) -> CadenzaResult<PooledConnection> {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CadenzaError::Cancelled),
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                permit.map_err(|_| CadenzaError::NotConnected)?
            }
        };

        if !self.flags.accepts_returns() {
            return Err(CadenzaError::NotConnected);
        }

        let existing = self.idle.lock().pop();
        let connection = match existing {
            Some(connection) => connection,
            None => {
                log::debug!("[Pool] Re-opening retired slot");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(CadenzaError::Cancelled),
                    opened = self.connector.open() => opened?,
                }
            }
        };

        Ok(PooledConnection {
            connection,
            pool: Arc::clone(self),
            _permit: permit,
        })
    }

    /// Closes the pool.
    ///
    /// Pending and future leases fail with `NotConnected`; idle connections
    /// are closed now and leased ones are retired when returned.
    pub async fn clear(&self) {
        self.semaphore.close();
        let drained: Vec<_> = std::mem::take(&mut *self.idle.lock());
        let count = drained.len();
        for mut connection in drained {
            connection.close().await;
        }
        log::debug!("[Pool] Cleared, closed {} idle connection(s)", count);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of leases that could be granted right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    fn give_back(&self, connection: Box<dyn Connection>) {
        if connection.is_broken() || self.is_closed() || !self.flags.accepts_returns() {
            log::debug!("[Pool] Retiring connection");
            return;
        }
        self.idle.lock().push(connection);
    }
}

/// A leased connection. Dropping it returns the connection to the pool.
pub struct PooledConnection {
    connection: Box<dyn Connection>,
    pool: Arc<ConnectionPool>,
    // Released after `Drop::drop` has returned the connection
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref()
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection.as_mut()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let connection = std::mem::replace(&mut self.connection, Box::new(Detached));
        self.pool.give_back(connection);
    }
}

/// Placeholder left inside a lease while it is being dropped.
struct Detached;

#[async_trait]
impl Connection for Detached {
    async fn send(&mut self, _command: &Command) -> CadenzaResult<Response> {
        Err(CadenzaError::NotConnected)
    }

    async fn close(&mut self) {}

    fn is_broken(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ConnectionState;
    use crate::test_support::FakeServer;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn connected_flags() -> Arc<SessionFlags> {
        let flags = Arc::new(SessionFlags::new());
        flags.set_state(ConnectionState::Connected);
        flags
    }

    #[tokio::test]
    async fn opens_capacity_connections_eagerly() {
        let server = FakeServer::accepting();
        let pool = ConnectionPool::open(server.connector(), 3, connected_flags())
            .await
            .unwrap();
        assert_eq!(server.opens(), 3);
        assert_eq!(pool.idle_count(), 3);
        assert_eq!(pool.available(), 3);
    }

    #[tokio::test]
    async fn failed_open_is_reported() {
        let server = FakeServer::accepting();
        server.refuse.store(true, Ordering::SeqCst);
        let result = ConnectionPool::open(server.connector(), 2, connected_flags()).await;
        assert!(matches!(result, Err(CadenzaError::Network(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn at_most_capacity_leases_are_outstanding() {
        let server = FakeServer::accepting();
        let pool = ConnectionPool::open(server.connector(), 2, connected_flags())
            .await
            .unwrap();

        let outstanding = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let outstanding = Arc::clone(&outstanding);
                let peak = Arc::clone(&peak);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    let mut lease = pool.lease(&cancel).await.unwrap();
                    let now = outstanding.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    lease.send(&Command::new("ping")).await.unwrap();
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    outstanding.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(server.count("ping"), 6);
        // Every lease reused one of the two eager connections
        assert_eq!(server.opens(), 2);
        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn excess_lease_waits_for_release() {
        let server = FakeServer::accepting();
        let pool = ConnectionPool::open(server.connector(), 1, connected_flags())
            .await
            .unwrap();
        let cancel = CancellationToken::new();

        let held = pool.lease(&cancel).await.unwrap();
        let waiter = {
            let pool = Arc::clone(&pool);
            let cancel = cancel.clone();
            tokio::spawn(async move { pool.lease(&cancel).await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn cancelled_lease_returns_cancelled() {
        let server = FakeServer::accepting();
        let pool = ConnectionPool::open(server.connector(), 1, connected_flags())
            .await
            .unwrap();
        let _held = pool.lease(&CancellationToken::new()).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            pool.lease(&cancel).await,
            Err(CadenzaError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn broken_connection_is_retired_and_reopened() {
        let server = FakeServer::new(|command| match command.name() {
            "explode" => Err(CadenzaError::Network("reset".into())),
            _ => Ok(Response::default()),
        });
        let pool = ConnectionPool::open(server.connector(), 1, connected_flags())
            .await
            .unwrap();
        let cancel = CancellationToken::new();

        {
            let mut lease = pool.lease(&cancel).await.unwrap();
            assert!(lease.send(&Command::new("explode")).await.is_err());
        }
        assert_eq!(pool.idle_count(), 0);

        let mut lease = pool.lease(&cancel).await.unwrap();
        lease.send(&Command::new("ping")).await.unwrap();
        assert_eq!(server.opens(), 2);
    }

    #[tokio::test]
    async fn connection_is_retired_when_session_ends() {
        let server = FakeServer::accepting();
        let flags = connected_flags();
        let pool = ConnectionPool::open(server.connector(), 1, Arc::clone(&flags))
            .await
            .unwrap();

        let lease = pool.lease(&CancellationToken::new()).await.unwrap();
        flags.set_state(ConnectionState::Disconnecting);
        drop(lease);

        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn clear_closes_idle_and_rejects_leases() {
        let server = FakeServer::accepting();
        let pool = ConnectionPool::open(server.connector(), 3, connected_flags())
            .await
            .unwrap();

        pool.clear().await;
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(server.closes.load(Ordering::SeqCst), 3);
        assert!(matches!(
            pool.lease(&CancellationToken::new()).await,
            Err(CadenzaError::NotConnected)
        ));

        // Clearing twice is harmless
        pool.clear().await;
    }
}
