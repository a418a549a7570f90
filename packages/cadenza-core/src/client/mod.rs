//! Session manager.
//!
//! A connected session owns three kinds of connections: one for the status
//! poll, one blocked in `idle` waiting for change notifications, and a
//! [`ConnectionPool`] for everything callers send. All of them share one
//! cancellation token that is replaced on every connect.
//!
//! State machine:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnecting -> Disconnected
//!                      |             |
//!                      +-- failure --+--> Disconnected (then bounded reconnect)
//! ```

mod loops;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::{CadenzaError, CadenzaResult};
use crate::events::{
    now_millis, BroadcastEventBridge, ClientEvent, ConnectionEvent, EventEmitter,
    LoggingEventEmitter,
};
use crate::library::ArtistAliasTable;
use crate::pool::ConnectionPool;
use crate::protocol::{Command, Connection, Connector, MpdConnector, Response};
use crate::protocol_constants::CMD_STATUS;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::CommandExecutor;
use crate::state::{ClientConfig, ConnectionState, PlayerStatus, SessionFlags};

/// Which connection of the session a command is routed to.
///
/// The event-wait connection is internal and cannot be addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    /// The dedicated status-poll connection.
    Status,
    /// Any free pooled connection.
    Pool,
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status => f.write_str("status"),
            Self::Pool => f.write_str("pool"),
        }
    }
}

/// Resources of one connected session.
pub(crate) struct Session {
    generation: u64,
    cancel: CancellationToken,
    status: tokio::sync::Mutex<Box<dyn Connection>>,
    pool: Arc<ConnectionPool>,
    status_in_flight: AtomicBool,
}

impl Session {
    /// Sends `command` on the connection `kind` resolves to.
    async fn execute(&self, kind: ConnectionKind, command: &Command) -> CadenzaResult<Response> {
        match kind {
            ConnectionKind::Status => {
                let mut connection = self.status.lock().await;
                self.cancellable(connection.send(command)).await
            }
            ConnectionKind::Pool => {
                let mut lease = self.pool.lease(&self.cancel).await?;
                let result = self.cancellable(lease.send(command)).await;
                if matches!(result, Err(CadenzaError::Cancelled)) {
                    lease.close().await;
                }
                result
            }
        }
    }

    async fn cancellable<T, F>(&self, future: F) -> CadenzaResult<T>
    where
        F: Future<Output = CadenzaResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CadenzaError::Cancelled),
            result = future => result,
        }
    }
}

struct ClientInner {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    emitter: Arc<dyn EventEmitter>,
    spawner: Arc<dyn TaskSpawner>,
    flags: Arc<SessionFlags>,
    session: Mutex<Option<Arc<Session>>>,
    generation: AtomicU64,
    /// Serializes connect, disconnect and failure recovery
    lifecycle: tokio::sync::Mutex<()>,
    /// Aborts a running reconnect sequence
    reconnect: Mutex<Option<CancellationToken>>,
    last_status: RwLock<Option<PlayerStatus>>,
    aliases: Arc<ArtistAliasTable>,
}

/// Client for one music server.
///
/// # Example
///
/// ```ignore
/// let client = MpdClient::from_config(ClientConfig::default())?;
/// let mut events = client.subscribe().unwrap();
/// client.connect().await?;
/// let status = client.status().await?;
/// client.disconnect().await;
/// ```
pub struct MpdClient {
    inner: Arc<ClientInner>,
    events: Option<BroadcastEventBridge>,
}

impl MpdClient {
    /// Creates a client with explicit collaborators.
    ///
    /// # Errors
    /// `Configuration` if `config` fails validation.
    pub fn new(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        emitter: Arc<dyn EventEmitter>,
        spawner: Arc<dyn TaskSpawner>,
    ) -> CadenzaResult<Self> {
        config.validate().map_err(CadenzaError::Configuration)?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                connector,
                emitter,
                spawner,
                flags: Arc::new(SessionFlags::new()),
                session: Mutex::new(None),
                generation: AtomicU64::new(0),
                lifecycle: tokio::sync::Mutex::new(()),
                reconnect: Mutex::new(None),
                last_status: RwLock::new(None),
                aliases: Arc::new(ArtistAliasTable::new()),
            }),
            events: None,
        })
    }

    /// Creates a TCP/socket client whose events are broadcast to
    /// [`subscribe`](Self::subscribe) receivers and logged at debug level.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn from_config(config: ClientConfig) -> CadenzaResult<Self> {
        let connector = Arc::new(MpdConnector::new(
            config.address.clone(),
            config.password.clone(),
            config.connect_timeout(),
        ));
        let bridge = BroadcastEventBridge::new(config.event_channel_capacity.max(1));
        bridge.set_external_emitter(Arc::new(LoggingEventEmitter));

        let mut client = Self::new(
            config,
            connector,
            Arc::new(bridge.clone()),
            Arc::new(TokioSpawner::current()),
        )?;
        client.events = Some(bridge);
        Ok(client)
    }

    /// Returns a receiver for client events, if this client owns a broadcast bridge.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<ClientEvent>> {
        self.events.as_ref().map(BroadcastEventBridge::subscribe)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Connects, tearing down any previous session first.
    ///
    /// Aborts a running reconnect sequence. On failure the state is left
    /// `Disconnected` and the error returned.
    pub async fn connect(&self) -> CadenzaResult<()> {
        self.inner.abort_reconnect();
        self.inner.connect_session(None).await
    }

    /// Disconnects. Calling it while already disconnected does nothing.
    pub async fn disconnect(&self) {
        self.inner.abort_reconnect();
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.inner.teardown(None).await;
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.flags.state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.flags.is_connected()
    }

    /// Sends one command on the connection `kind` resolves to.
    ///
    /// # Errors
    /// `NotConnected` without a session, `Cancelled` if the session ends
    /// while the command is in flight, otherwise the command's own error.
    pub async fn execute(&self, kind: ConnectionKind, command: &Command) -> CadenzaResult<Response> {
        let session = self
            .inner
            .current_session()
            .ok_or(CadenzaError::NotConnected)?;
        session.execute(kind, command).await
    }

    /// Queries the current playback status on the status connection.
    pub async fn status(&self) -> CadenzaResult<PlayerStatus> {
        let response = self
            .execute(ConnectionKind::Status, &Command::new(CMD_STATUS))
            .await?;
        Ok(PlayerStatus::from_response(&response))
    }

    /// Most recent snapshot from the status poll.
    pub fn last_status(&self) -> Option<PlayerStatus> {
        self.inner.last_status.read().clone()
    }

    /// Artist spellings seen during the current session.
    ///
    /// Cleared whenever a session ends.
    pub fn aliases(&self) -> Arc<ArtistAliasTable> {
        Arc::clone(&self.inner.aliases)
    }

    /// Idle connections currently held by the pool (0 without a session).
    pub fn pooled_connections(&self) -> usize {
        self.inner
            .current_session()
            .map(|s| s.pool.idle_count())
            .unwrap_or(0)
    }
}

impl Drop for MpdClient {
    fn drop(&mut self) {
        self.inner.abort_reconnect();
        let session = self.inner.session.lock().take();
        if let Some(session) = session {
            self.inner.flags.set_state(ConnectionState::Disconnected);
            session.cancel.cancel();
        }
    }
}

#[async_trait]
impl CommandExecutor for MpdClient {
    async fn send(&self, command: Command) -> CadenzaResult<Response> {
        self.execute(ConnectionKind::Pool, &command).await
    }

    async fn read_binary(
        &self,
        command: &str,
        uri: &str,
        cancel: &CancellationToken,
    ) -> CadenzaResult<Bytes> {
        let session = self
            .inner
            .current_session()
            .ok_or(CadenzaError::NotConnected)?;
        let mut lease = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CadenzaError::Cancelled),
            lease = session.pool.lease(&session.cancel) => lease?,
        };
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            _ = session.cancel.cancelled() => None,
            result = lease.read_binary(command, uri, &session.cancel) => Some(result),
        };
        match outcome {
            Some(result) => result,
            None => {
                // A chunk may still be in flight; the connection cannot be reused
                lease.close().await;
                Err(CadenzaError::Cancelled)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

impl ClientInner {
    fn current_session(&self) -> Option<Arc<Session>> {
        self.session.lock().clone()
    }

    /// Stores `state` and emits a change event if it differs from the old one.
    fn set_state(&self, state: ConnectionState, reason: Option<String>) {
        let previous = self.flags.set_state(state);
        if previous != state {
            log::debug!("[Client] {:?} -> {:?}", previous, state);
            self.emitter.emit_connection(ConnectionEvent::StateChanged {
                state,
                reason,
                timestamp: now_millis(),
            });
        }
    }

    fn abort_reconnect(&self) {
        if let Some(token) = self.reconnect.lock().take() {
            token.cancel();
        }
    }

    /// Runs the full connect sequence under the lifecycle lock.
    ///
    /// `abort` is the reconnect token when called from the retry sequence; a
    /// cancelled token makes the attempt a no-op.
    async fn connect_session(
        self: &Arc<Self>,
        abort: Option<&CancellationToken>,
    ) -> CadenzaResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        if abort.is_some_and(CancellationToken::is_cancelled) {
            return Err(CadenzaError::Cancelled);
        }

        self.teardown(None).await;
        self.set_state(ConnectionState::Connecting, None);
        log::info!("[Client] Connecting to {}", self.config.address);

        match self.open_session().await {
            Ok((session, idle)) => {
                *self.session.lock() = Some(Arc::clone(&session));
                loops::start(self, &session, idle);
                self.set_state(ConnectionState::Connected, None);
                log::info!(
                    "[Client] Connected to {} (session {})",
                    self.config.address,
                    session.generation
                );
                Ok(())
            }
            Err(e) => {
                log::warn!("[Client] Connect to {} failed: {}", self.config.address, e);
                self.set_state(ConnectionState::Disconnected, Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Opens the status connection, the pool and the event-wait connection.
    ///
    /// Anything opened before a failing step is closed again.
    async fn open_session(&self) -> CadenzaResult<(Arc<Session>, Box<dyn Connection>)> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut status = self.connector.open().await?;

        let pool = match ConnectionPool::open(
            Arc::clone(&self.connector),
            self.config.pool_size,
            Arc::clone(&self.flags),
        )
        .await
        {
            Ok(pool) => pool,
            Err(e) => {
                status.close().await;
                return Err(e);
            }
        };

        let idle = match self.connector.open().await {
            Ok(idle) => idle,
            Err(e) => {
                status.close().await;
                pool.clear().await;
                return Err(e);
            }
        };

        let session = Arc::new(Session {
            generation,
            cancel: CancellationToken::new(),
            status: tokio::sync::Mutex::new(status),
            pool,
            status_in_flight: AtomicBool::new(false),
        });
        Ok((session, idle))
    }

    /// Tears the current session down. Caller holds the lifecycle lock.
    ///
    /// The event wait and the timer stop first, then the status connection
    /// closes, and only then is the pool cleared.
    async fn teardown(&self, reason: Option<String>) {
        let session = self.session.lock().take();
        let Some(session) = session else {
            if self.flags.state() != ConnectionState::Disconnected {
                self.set_state(ConnectionState::Disconnected, reason);
            }
            return;
        };

        self.set_state(ConnectionState::Disconnecting, None);
        session.cancel.cancel();
        session.status.lock().await.close().await;
        session.pool.clear().await;
        *self.last_status.write() = None;
        self.aliases.clear();
        self.set_state(ConnectionState::Disconnected, reason);
        log::info!("[Client] Session {} closed", session.generation);
    }

    /// Called by a background loop whose connection failed.
    ///
    /// Failures from an earlier session are ignored.
    fn on_session_failure(self: &Arc<Self>, generation: u64, error: CadenzaError) {
        match self.current_session() {
            Some(session) if session.generation == generation => session.cancel.cancel(),
            _ => {
                log::debug!(
                    "[Client] Ignoring failure from stale session {}: {}",
                    generation,
                    error
                );
                return;
            }
        }

        log::warn!("[Client] Session {} lost: {}", generation, error);
        let inner = Arc::clone(self);
        self.spawner.spawn(async move {
            inner.recover(generation, error).await;
        });
    }

    async fn recover(self: Arc<Self>, generation: u64, error: CadenzaError) {
        {
            let _lifecycle = self.lifecycle.lock().await;
            match self.current_session() {
                Some(session) if session.generation == generation => {}
                _ => return,
            }
            self.teardown(Some(error.to_string())).await;
        }
        self.reconnect_with_policy().await;
    }

    /// Retries the connect sequence per the configured policy.
    async fn reconnect_with_policy(self: &Arc<Self>) {
        let policy = &self.config.reconnect;
        if !policy.is_enabled() {
            log::info!("[Client] Automatic reconnect disabled");
            return;
        }

        let token = CancellationToken::new();
        if let Some(previous) = self.reconnect.lock().replace(token.clone()) {
            previous.cancel();
        }

        for attempt in 0..policy.max_attempts {
            let delay = policy.delay_for(attempt);
            self.emitter
                .emit_connection(ConnectionEvent::ReconnectScheduled {
                    attempt: attempt + 1,
                    max_attempts: policy.max_attempts,
                    delay_ms: delay.as_millis() as u64,
                    timestamp: now_millis(),
                });

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    log::debug!("[Client] Reconnect aborted");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            match self.connect_session(Some(&token)).await {
                Ok(()) => {
                    log::info!("[Client] Reconnected after {} attempt(s)", attempt + 1);
                    return;
                }
                Err(CadenzaError::Cancelled) => return,
                Err(e) => log::warn!(
                    "[Client] Reconnect attempt {}/{} failed: {}",
                    attempt + 1,
                    policy.max_attempts,
                    e
                ),
            }
        }

        log::warn!(
            "[Client] Giving up after {} reconnect attempt(s)",
            policy.max_attempts
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Subsystem, SubsystemEvent};
    use crate::state::ReconnectPolicy;
    use crate::test_support::FakeServer;
    use std::time::Duration;

    struct Harness {
        server: Arc<FakeServer>,
        client: MpdClient,
        events: broadcast::Receiver<ClientEvent>,
    }

    fn harness(server: Arc<FakeServer>) -> Harness {
        let config = ClientConfig {
            pool_size: 2,
            event_channel_capacity: 256,
            ..Default::default()
        };
        let bridge = BroadcastEventBridge::new(config.event_channel_capacity);
        let events = bridge.subscribe();
        let client = MpdClient::new(
            config,
            server.connector(),
            Arc::new(bridge),
            Arc::new(TokioSpawner::current()),
        )
        .unwrap();
        Harness {
            server,
            client,
            events,
        }
    }

    fn drain(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn states(events: &[ClientEvent]) -> Vec<ConnectionState> {
        events
            .iter()
            .filter_map(|e| match e {
                ClientEvent::Connection(ConnectionEvent::StateChanged { state, .. }) => Some(*state),
                _ => None,
            })
            .collect()
    }

    fn reconnect_attempts(events: &[ClientEvent]) -> Vec<u32> {
        events
            .iter()
            .filter_map(|e| match e {
                ClientEvent::Connection(ConnectionEvent::ReconnectScheduled { attempt, .. }) => {
                    Some(*attempt)
                }
                _ => None,
            })
            .collect()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let server = FakeServer::accepting();
        let config = ClientConfig {
            pool_size: 0,
            ..Default::default()
        };
        let result = MpdClient::new(
            config,
            server.connector(),
            Arc::new(crate::events::NoopEventEmitter),
            Arc::new(TokioSpawner::current()),
        );
        assert!(matches!(result, Err(CadenzaError::Configuration(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn connect_opens_every_connection_and_reports_states() {
        let mut h = harness(FakeServer::accepting());

        h.client.connect().await.unwrap();
        settle().await;

        assert!(h.client.is_connected());
        // status + two pooled + event wait
        assert_eq!(h.server.opens(), 4);
        assert_eq!(h.client.pooled_connections(), 2);
        assert_eq!(
            states(&drain(&mut h.events)),
            vec![ConnectionState::Connecting, ConnectionState::Connected]
        );
        assert_eq!(h.server.count("idle"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connect_returns_to_disconnected() {
        let mut h = harness(FakeServer::accepting());
        h.server.refuse.store(true, std::sync::atomic::Ordering::SeqCst);

        let result = h.client.connect().await;
        assert!(matches!(result, Err(CadenzaError::Network(_))));
        assert_eq!(h.client.state(), ConnectionState::Disconnected);

        let events = drain(&mut h.events);
        assert_eq!(
            states(&events),
            vec![ConnectionState::Connecting, ConnectionState::Disconnected]
        );
        // Explicit connect failures are not retried
        assert!(reconnect_attempts(&events).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_is_idempotent() {
        let h = harness(FakeServer::accepting());
        h.client.connect().await.unwrap();
        settle().await;

        h.client.disconnect().await;
        h.client.disconnect().await;
        settle().await;

        assert_eq!(h.client.state(), ConnectionState::Disconnected);
        assert_eq!(h.client.pooled_connections(), 0);
        assert!(h.client.last_status().is_none());
        assert_eq!(h.server.closes.load(std::sync::atomic::Ordering::SeqCst), 4);
        assert!(matches!(
            h.client
                .execute(ConnectionKind::Pool, &Command::new("ping"))
                .await,
            Err(CadenzaError::NotConnected)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn commands_are_routed_by_kind() {
        let h = harness(FakeServer::accepting());
        h.client.connect().await.unwrap();

        h.client
            .execute(ConnectionKind::Pool, &Command::new("ping"))
            .await
            .unwrap();
        let status = h.client.status().await.unwrap();
        assert_eq!(status.volume, Some(50));
        assert_eq!(h.server.count("ping"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn executor_sends_on_pooled_connections() {
        let h = harness(FakeServer::accepting());
        h.client.connect().await.unwrap();

        CommandExecutor::send(&h.client, Command::new("ping"))
            .await
            .unwrap();
        assert_eq!(h.server.count("ping"), 1);
        assert_eq!(h.client.pooled_connections(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_binary_read_stops_waiting_for_a_connection() {
        let h = harness(FakeServer::accepting());
        h.client.connect().await.unwrap();
        let session = h.client.inner.current_session().unwrap();
        let _first = session.pool.lease(&session.cancel).await.unwrap();
        let _second = session.pool.lease(&session.cancel).await.unwrap();

        let cancel = CancellationToken::new();
        let (result, ()) = tokio::join!(
            CommandExecutor::read_binary(&h.client, "albumart", "a/1.flac", &cancel),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            },
        );

        assert!(matches!(result, Err(CadenzaError::Cancelled)));
        assert_eq!(h.server.count("albumart"), 0);
        assert!(h.client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn session_end_clears_aliases() {
        let h = harness(FakeServer::accepting());
        h.client.connect().await.unwrap();
        let artist = crate::library::Identity::artist("Miles Davis");
        h.client.aliases().record(&artist, "Miles Davis");

        h.client.disconnect().await;
        assert!(h.client.aliases().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn status_is_polled_periodically() {
        let mut h = harness(FakeServer::accepting());
        h.client.connect().await.unwrap();

        tokio::time::sleep(Duration::from_millis(3500)).await;

        // Ticks at 0, 1000, 2000 and 3000 ms
        assert_eq!(h.server.count("status"), 4);
        assert!(h.client.last_status().is_some());
        let status_events = drain(&mut h.events)
            .into_iter()
            .filter(|e| matches!(e, ClientEvent::Status(_)))
            .count();
        assert_eq!(status_events, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn player_change_triggers_status_refresh() {
        let mut h = harness(FakeServer::accepting());
        h.client.connect().await.unwrap();
        settle().await;
        let polled = h.server.count("status");
        drain(&mut h.events);

        h.server.notify(&["player"]);
        settle().await;

        assert_eq!(h.server.count("status"), polled + 1);
        assert_eq!(h.server.count("idle"), 2);
        let events = drain(&mut h.events);
        assert!(events.iter().any(|e| matches!(
            e,
            ClientEvent::Subsystem(SubsystemEvent::Changed { subsystems, .. })
                if subsystems == &vec![Subsystem::Player]
        )));
        assert!(events.iter().any(|e| matches!(e, ClientEvent::Status(_))));
        assert!(!events.iter().any(|e| matches!(e, ClientEvent::Library(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn update_change_emits_library_event() {
        let mut h = harness(FakeServer::accepting());
        h.client.connect().await.unwrap();
        settle().await;
        let polled = h.server.count("status");
        drain(&mut h.events);

        h.server.notify(&["update"]);
        settle().await;

        let events = drain(&mut h.events);
        assert!(events.iter().any(|e| matches!(e, ClientEvent::Library(_))));
        // Database updates alone do not touch playback status
        assert_eq!(h.server.count("status"), polled);
    }

    #[tokio::test(start_paused = true)]
    async fn lost_session_retries_then_gives_up() {
        let mut h = harness(FakeServer::accepting());
        h.client.connect().await.unwrap();
        settle().await;
        drain(&mut h.events);

        h.server.refuse.store(true, std::sync::atomic::Ordering::SeqCst);
        h.server.drop_idle();
        tokio::time::sleep(Duration::from_secs(30)).await;

        let events = drain(&mut h.events);
        assert_eq!(reconnect_attempts(&events), vec![1, 2, 3]);
        assert_eq!(h.client.state(), ConnectionState::Disconnected);
        assert_eq!(states(&events).last(), Some(&ConnectionState::Disconnected));
    }

    #[tokio::test(start_paused = true)]
    async fn lost_session_reconnects_when_server_returns() {
        let mut h = harness(FakeServer::accepting());
        h.client.connect().await.unwrap();
        settle().await;
        drain(&mut h.events);

        h.server.drop_idle();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(h.client.is_connected());
        assert_eq!(h.server.opens(), 8);
        let events = drain(&mut h.events);
        assert_eq!(reconnect_attempts(&events), vec![1]);
        assert_eq!(states(&events).last(), Some(&ConnectionState::Connected));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_aborts_pending_reconnect() {
        let mut h = harness(FakeServer::accepting());
        h.client.connect().await.unwrap();
        settle().await;

        h.server.refuse.store(true, std::sync::atomic::Ordering::SeqCst);
        h.server.drop_idle();
        settle().await;
        h.client.disconnect().await;
        tokio::time::sleep(Duration::from_secs(30)).await;

        let events = drain(&mut h.events);
        assert_eq!(reconnect_attempts(&events), vec![1]);
        assert_eq!(h.client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_policy_does_not_reconnect() {
        let server = FakeServer::accepting();
        let config = ClientConfig {
            pool_size: 1,
            reconnect: ReconnectPolicy::disabled(),
            ..Default::default()
        };
        let bridge = BroadcastEventBridge::new(64);
        let mut events = bridge.subscribe();
        let client = MpdClient::new(
            config,
            server.connector(),
            Arc::new(bridge),
            Arc::new(TokioSpawner::current()),
        )
        .unwrap();

        client.connect().await.unwrap();
        settle().await;
        server.drop_idle();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(reconnect_attempts(&drain(&mut events)).is_empty());
        assert_eq!(server.opens(), 3);
    }
}
