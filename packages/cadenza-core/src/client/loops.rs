//! Background loops of a connected session.
//!
//! Both loops exit when the session token is cancelled. A fatal error in
//! either one reports the session as lost, which starts recovery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::{interval, MissedTickBehavior};

use super::{ClientInner, ConnectionKind, Session};
use crate::error::{CadenzaError, CadenzaResult};
use crate::events::{now_millis, LibraryEvent, StatusEvent, Subsystem, SubsystemEvent};
use crate::protocol::{Command, Connection};
use crate::protocol_constants::{CMD_IDLE, CMD_STATUS, IDLE_CHANGED_KEY, IDLE_SUBSYSTEMS};
use crate::state::PlayerStatus;

pub(super) fn start(inner: &Arc<ClientInner>, session: &Arc<Session>, idle: Box<dyn Connection>) {
    inner
        .spawner
        .spawn(status_loop(Arc::clone(inner), Arc::clone(session)));
    inner
        .spawner
        .spawn(idle_loop(Arc::clone(inner), Arc::clone(session), idle));
}

// ─────────────────────────────────────────────────────────────────────────────
// Status poll
// ─────────────────────────────────────────────────────────────────────────────

async fn status_loop(inner: Arc<ClientInner>, session: Arc<Session>) {
    let mut ticker = interval(inner.config.status_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = session.cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if let Err(e) = refresh_status(&inner, &session).await {
            inner.on_session_failure(session.generation, e);
            break;
        }
    }
    log::debug!("[Client] Status loop for session {} stopped", session.generation);
}

/// Clears the in-flight flag when a refresh finishes.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Polls status once and publishes the snapshot.
///
/// A trigger that arrives while a refresh is already running is dropped.
/// Only connection-fatal errors are returned; an ACK is logged and skipped.
pub(super) async fn refresh_status(inner: &ClientInner, session: &Session) -> CadenzaResult<()> {
    let Some(_guard) = InFlight::acquire(&session.status_in_flight) else {
        log::trace!("[Client] Status refresh already running");
        return Ok(());
    };

    match session
        .execute(ConnectionKind::Status, &Command::new(CMD_STATUS))
        .await
    {
        Ok(response) => {
            let status = PlayerStatus::from_response(&response);
            *inner.last_status.write() = Some(status.clone());
            inner.emitter.emit_status(StatusEvent::Changed {
                status,
                timestamp: now_millis(),
            });
            Ok(())
        }
        Err(CadenzaError::Cancelled) => Ok(()),
        Err(e) if !e.is_fatal_for_connection() => {
            log::warn!("[Client] Status poll failed: {}", e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event wait
// ─────────────────────────────────────────────────────────────────────────────

async fn idle_loop(inner: Arc<ClientInner>, session: Arc<Session>, mut connection: Box<dyn Connection>) {
    let command = Command::new(CMD_IDLE).args(IDLE_SUBSYSTEMS);

    loop {
        let outcome = tokio::select! {
            biased;
            _ = session.cancel.cancelled() => None,
            result = connection.send(&command) => Some(result),
        };

        let response = match outcome {
            None => break,
            Some(Ok(response)) => response,
            Some(Err(e)) => {
                // An ACK to idle would repeat forever, so every error ends the session
                connection.close().await;
                inner.on_session_failure(session.generation, e);
                log::debug!("[Client] Idle loop for session {} failed", session.generation);
                return;
            }
        };

        let subsystems: Vec<Subsystem> = response
            .values(IDLE_CHANGED_KEY)
            .map(Subsystem::parse)
            .collect();
        if subsystems.is_empty() {
            continue;
        }
        log::debug!("[Client] Changed: {:?}", subsystems);
        dispatch(&inner, &session, subsystems);
    }

    connection.close().await;
    log::debug!("[Client] Idle loop for session {} stopped", session.generation);
}

fn dispatch(inner: &Arc<ClientInner>, session: &Arc<Session>, subsystems: Vec<Subsystem>) {
    let timestamp = now_millis();

    if subsystems.contains(&Subsystem::Update) {
        inner.emitter.emit_library(LibraryEvent::Updated { timestamp });
    }

    if subsystems.iter().any(Subsystem::affects_status) {
        let spawner = Arc::clone(&inner.spawner);
        let inner = Arc::clone(inner);
        let session = Arc::clone(session);
        spawner.spawn(async move {
            if let Err(e) = refresh_status(&inner, &session).await {
                inner.on_session_failure(session.generation, e);
            }
        });
    }

    inner.emitter.emit_subsystem(SubsystemEvent::Changed {
        subsystems,
        timestamp,
    });
}
