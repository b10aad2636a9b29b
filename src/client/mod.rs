//! Protocol client for the card-room service
//!
//! - Transport-agnostic connection state machine and event stream
//! - `Connector` trait at the transport seam
//! - WebSocket implementation over tokio-tungstenite

pub mod connection;
pub mod websocket;

#[cfg(test)]
pub(crate) mod testing;

// Re-export public types for easier access
pub use connection::{
    Connection, ConnectionEvent, ConnectionState, EventStream, Frame, Handshake, StateCell,
    TransportFault,
};
pub use websocket::WebSocketConnector;

use async_trait::async_trait;
use url::Url;

/// A freshly opened (or refused) connection and its inbound events
#[derive(Debug)]
pub struct Session {
    pub handshake: Handshake,
    pub connection: Connection,
    pub events: EventStream,
}

impl Session {
    /// Session for a handshake that did not succeed
    pub fn refused(handshake: Handshake) -> Self {
        Self {
            handshake,
            connection: Connection::refused(),
            events: EventStream::ended(),
        }
    }
}

/// Opens duplex message channels to a URL
#[async_trait]
pub trait Connector: Send + Sync {
    /// Perform the opening handshake.
    ///
    /// Never fails outright: a refused handshake yields a closed connection
    /// and an ended event stream, with the reason in `Session::handshake`.
    async fn connect(&self, url: &Url) -> Session;
}
