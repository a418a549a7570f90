//! Shared test doubles for connections and servers.
//!
//! [`FakeServer`] answers commands through a handler closure and records
//! every request line. `idle` is served from a queue the test pushes to;
//! with nothing queued it blocks until the caller gives up.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{CadenzaError, CadenzaResult};
use crate::protocol::{Command, Connection, Connector, Response, Tag};

type Handler = Box<dyn Fn(&Command) -> CadenzaResult<Response> + Send + Sync>;

pub(crate) struct FakeServer {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub refuse: AtomicBool,
    commands: Mutex<Vec<String>>,
    handler: Handler,
    idle_tx: mpsc::UnboundedSender<CadenzaResult<Vec<String>>>,
    idle_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<CadenzaResult<Vec<String>>>>,
}

impl FakeServer {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&Command) -> CadenzaResult<Response> + Send + Sync + 'static,
    {
        let (idle_tx, idle_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            refuse: AtomicBool::new(false),
            commands: Mutex::new(Vec::new()),
            handler: Box::new(handler),
            idle_tx,
            idle_rx: tokio::sync::Mutex::new(idle_rx),
        })
    }

    /// A server answering `status` with a stopped player and `OK` to anything else.
    pub fn accepting() -> Arc<Self> {
        Self::new(|command| match command.name() {
            "status" => Ok(reply(&[("state", "stop"), ("volume", "50")])),
            _ => Ok(Response::default()),
        })
    }

    pub fn connector(self: &Arc<Self>) -> Arc<dyn Connector> {
        Arc::new(FakeConnector(Arc::clone(self)))
    }

    /// Completes the next pending `idle` with the given subsystems.
    pub fn notify(&self, subsystems: &[&str]) {
        let _ = self
            .idle_tx
            .send(Ok(subsystems.iter().map(|s| s.to_string()).collect()));
    }

    /// Fails the next pending `idle` with a network error.
    pub fn drop_idle(&self) {
        let _ = self
            .idle_tx
            .send(Err(CadenzaError::Network("connection reset".into())));
    }

    /// Request lines received so far, without newlines.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.commands
            .lock()
            .iter()
            .filter(|line| line.split(' ').next() == Some(name))
            .count()
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

/// Builds a reply from name/value pairs.
pub(crate) fn reply(pairs: &[(&str, &str)]) -> Response {
    Response {
        tags: pairs.iter().map(|&(n, v)| Tag::new(n, v)).collect(),
        binary: None,
    }
}

/// Builds an ACK error as the server would send it.
pub(crate) fn ack(code: u32, command: &str, message: &str) -> CadenzaError {
    CadenzaError::Command(crate::protocol::AckError {
        code,
        index: 0,
        command: command.to_string(),
        message: message.to_string(),
    })
}

struct FakeConnector(Arc<FakeServer>);

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self) -> CadenzaResult<Box<dyn Connection>> {
        if self.0.refuse.load(Ordering::SeqCst) {
            return Err(CadenzaError::Network("connection refused".into()));
        }
        self.0.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection {
            server: Arc::clone(&self.0),
            broken: false,
        }))
    }
}

pub(crate) struct FakeConnection {
    server: Arc<FakeServer>,
    broken: bool,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn send(&mut self, command: &Command) -> CadenzaResult<Response> {
        if self.broken {
            return Err(CadenzaError::Network("connection is broken".into()));
        }
        self.server
            .commands
            .lock()
            .push(command.to_line().trim_end().to_string());

        let result = if command.name() == "idle" {
            let mut rx = self.server.idle_rx.lock().await;
            match rx.recv().await {
                Some(Ok(changed)) => Ok(Response {
                    tags: changed.into_iter().map(|s| Tag::new("changed", s)).collect(),
                    binary: None,
                }),
                Some(Err(e)) => Err(e),
                None => std::future::pending().await,
            }
        } else {
            (self.server.handler)(command)
        };

        if let Err(e) = &result {
            if e.is_fatal_for_connection() {
                self.broken = true;
            }
        }
        result
    }

    async fn close(&mut self) {
        self.server.closes.fetch_add(1, Ordering::SeqCst);
        self.broken = true;
    }

    fn is_broken(&self) -> bool {
        self.broken
    }
}
