//! Transport-agnostic duplex connection with an explicit state machine

use crate::errors::{LoadError, Result};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

/// Lifecycle of a connection. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConnectionState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            2 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(label)
    }
}

#[derive(Debug)]
struct StateInner {
    state: AtomicU8,
    closed_locally: AtomicBool,
}

/// Shared, monotonic connection state
#[derive(Debug, Clone)]
pub struct StateCell(Arc<StateInner>);

impl StateCell {
    pub fn new(initial: ConnectionState) -> Self {
        Self(Arc::new(StateInner {
            state: AtomicU8::new(initial as u8),
            closed_locally: AtomicBool::new(false),
        }))
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.state.load(Ordering::Acquire))
    }

    /// Move forward to `next`; never moves backwards. Returns the previous state.
    pub fn advance(&self, next: ConnectionState) -> ConnectionState {
        ConnectionState::from_u8(self.0.state.fetch_max(next as u8, Ordering::AcqRel))
    }

    /// Our side asked for the close, as opposed to the peer
    pub fn mark_closed_locally(&self) {
        self.0.closed_locally.store(true, Ordering::Release);
    }

    pub fn closed_locally(&self) -> bool {
        self.0.closed_locally.load(Ordering::Acquire)
    }
}

/// Frames handed to the transport writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close,
}

/// A transport failure reported on the event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFault {
    pub message: String,
    /// The fault surfaced after our side initiated the close
    pub after_local_close: bool,
}

/// Events delivered in transport order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Open,
    Message(String),
    Close,
    Error(TransportFault),
}

/// Outcome of the opening handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// HTTP status of the handshake response, if one arrived
    pub status: Option<u16>,
    /// Why the handshake failed, if it did
    pub failure: Option<String>,
}

impl Handshake {
    pub fn switched(status: u16) -> Self {
        Self {
            status: Some(status),
            failure: None,
        }
    }

    pub fn failed(status: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            status,
            failure: Some(reason.into()),
        }
    }

    /// The server answered 101 Switching Protocols
    pub fn succeeded(&self) -> bool {
        self.status == Some(crate::constants::SWITCHING_PROTOCOLS)
    }

    pub fn to_error(&self) -> Option<LoadError> {
        if self.succeeded() {
            return None;
        }
        Some(LoadError::Connection {
            status: self.status,
            reason: self
                .failure
                .clone()
                .unwrap_or_else(|| "unexpected handshake status".to_string()),
        })
    }
}

/// Inbound side of a connection
#[derive(Debug)]
pub struct EventStream {
    events: mpsc::Receiver<ConnectionEvent>,
}

impl EventStream {
    pub fn new(events: mpsc::Receiver<ConnectionEvent>) -> Self {
        Self { events }
    }

    /// A stream that has already ended
    pub fn ended() -> Self {
        let (_, events) = mpsc::channel(1);
        Self { events }
    }

    /// Next event, `None` once the transport is gone
    pub async fn next(&mut self) -> Option<ConnectionEvent> {
        self.events.recv().await
    }
}

/// Outbound side of a connection.
///
/// Dropping it aborts the transport tasks, which force-closes the socket.
#[derive(Debug)]
pub struct Connection {
    state: StateCell,
    outbound: Option<mpsc::Sender<Frame>>,
    io_tasks: Vec<AbortHandle>,
}

impl Connection {
    pub fn new(state: StateCell, outbound: mpsc::Sender<Frame>, io_tasks: Vec<AbortHandle>) -> Self {
        Self {
            state,
            outbound: Some(outbound),
            io_tasks,
        }
    }

    /// A connection whose handshake never completed
    pub fn refused() -> Self {
        Self {
            state: StateCell::new(ConnectionState::Closed),
            outbound: None,
            io_tasks: Vec::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Enqueue a text frame. Only valid while the connection is open.
    pub async fn send(&self, text: String) -> Result<()> {
        let state = self.state.get();
        if state != ConnectionState::Open {
            return Err(LoadError::SendOnClosed(state));
        }
        let outbound = self
            .outbound
            .as_ref()
            .ok_or(LoadError::SendOnClosed(state))?;
        outbound
            .send(Frame::Text(text))
            .await
            .map_err(|_| LoadError::transport("transport writer has stopped"))
    }

    /// Start the close handshake. Calling it again is a no-op.
    pub async fn close(&self) {
        self.state.mark_closed_locally();
        let previous = self.state.advance(ConnectionState::Closing);
        if previous >= ConnectionState::Closing {
            return;
        }
        match &self.outbound {
            Some(outbound) if previous == ConnectionState::Open => {
                if outbound.send(Frame::Close).await.is_err() {
                    // Writer already gone, nothing left to hand-shake with
                    self.state.advance(ConnectionState::Closed);
                }
            }
            _ => {
                self.state.advance(ConnectionState::Closed);
            }
        }
    }

    /// Tear the transport down without a close handshake
    pub fn force_close(&mut self) {
        self.state.mark_closed_locally();
        let previous = self.state.advance(ConnectionState::Closed);
        if previous != ConnectionState::Closed {
            debug!("Force-closing connection in state {}", previous);
        }
        self.outbound = None;
        for task in self.io_tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        for task in &self.io_tasks {
            task.abort();
        }
    }
}
