//! WebSocket transport built on tokio-tungstenite

use crate::client::Connector;
use crate::client::connection::{
    Connection, ConnectionEvent, ConnectionState, EventStream, Frame, Handshake, StateCell,
    TransportFault,
};
use crate::client::Session;
use crate::constants::*;
use crate::errors::{ErrorContext, Result};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use http::{HeaderName, HeaderValue};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async_with_config,
    tungstenite::client::IntoClientRequest, tungstenite::error::ProtocolError,
    tungstenite::protocol::WebSocketConfig, tungstenite::{Error as WsError, Message},
};
use tracing::{debug, warn};
use url::Url;

/// Opens websocket connections against the card-room service
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    headers: Vec<(HeaderName, HeaderValue)>,
    connect_timeout: Duration,
}

impl WebSocketConnector {
    /// Build a connector from `(name, value)` header pairs
    pub fn new(headers: &[(String, String)], connect_timeout: Duration) -> Result<Self> {
        let mut parsed = Vec::with_capacity(headers.len());
        for (key, value) in headers {
            let header_name: HeaderName = key
                .parse()
                .with_config_context(&format!("Invalid header name: {}", key))?;
            let header_value: HeaderValue = value
                .parse()
                .with_config_context(&format!("Invalid header value: {}", value))?;
            parsed.push((header_name, header_value));
        }
        Ok(Self {
            headers: parsed,
            connect_timeout,
        })
    }

    async fn establish(
        &self,
        url: &Url,
    ) -> std::result::Result<(WebSocketStream<MaybeTlsStream<TcpStream>>, u16), Handshake> {
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| Handshake::failed(None, format!("invalid request for {}: {}", url, e)))?;
        for (name, value) in &self.headers {
            request.headers_mut().insert(name.clone(), value.clone());
        }

        let ws_config = WebSocketConfig::default();
        match timeout(
            self.connect_timeout,
            connect_async_with_config(request, Some(ws_config), false),
        )
        .await
        {
            Ok(Ok((stream, response))) => Ok((stream, response.status().as_u16())),
            Ok(Err(WsError::Http(response))) => {
                let status = response.status();
                Err(Handshake::failed(
                    Some(status.as_u16()),
                    status.canonical_reason().unwrap_or("unexpected status"),
                ))
            }
            Ok(Err(e)) => Err(Handshake::failed(None, e.to_string())),
            Err(_) => Err(Handshake::failed(
                None,
                format!("timed out after {:?}", self.connect_timeout),
            )),
        }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &Url) -> Session {
        match self.establish(url).await {
            Ok((stream, status)) => {
                debug!("Connected to {} (status {})", url, status);
                let (connection, events) = spawn_transport(stream);
                Session {
                    handshake: Handshake::switched(status),
                    connection,
                    events,
                }
            }
            Err(handshake) => Session::refused(handshake),
        }
    }
}

/// Split the socket into a reader and a writer task bridged by channels
fn spawn_transport(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> (Connection, EventStream) {
    let (mut ws_sink, mut ws_stream) = stream.split();
    let state = StateCell::new(ConnectionState::Open);

    let (tx_send, mut rx_send) = mpsc::channel::<Frame>(CHANNEL_BUFFER_SIZE);
    let (tx_events, rx_events) = mpsc::channel::<ConnectionEvent>(CHANNEL_BUFFER_SIZE);

    // Open is queued before either task can report anything
    let _ = tx_events.try_send(ConnectionEvent::Open);
    let reader_events = tx_events.clone();

    let writer_state = state.clone();
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx_send.recv().await {
            let (message, closing) = match frame {
                Frame::Text(text) => (Message::Text(text.into()), false),
                Frame::Close => (Message::Close(None), true),
            };
            if let Err(e) = ws_sink.send(message).await {
                let fault = fault_from(&e, writer_state.closed_locally());
                if !fault.after_local_close {
                    warn!("Failed to send websocket frame: {}", e);
                }
                let _ = tx_events.send(ConnectionEvent::Error(fault)).await;
                break;
            }
            if closing {
                break;
            }
        }
    });

    let reader_state = state.clone();
    let writer_handle = writer.abort_handle();
    let reader = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if reader_events
                        .send(ConnectionEvent::Message(text.to_string()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Ok(Message::Close(frame)) => {
                    debug!("Received close frame: {:?}", frame);
                    reader_state.advance(ConnectionState::Closing);
                }
                Ok(_) => {
                    // Binary, ping and pong frames carry no protocol meaning here
                }
                Err(e) => {
                    let fault = fault_from(&e, reader_state.closed_locally());
                    let _ = reader_events.send(ConnectionEvent::Error(fault)).await;
                    break;
                }
            }
        }
        // The socket is gone, so a writer still waiting for frames only
        // keeps the event stream open
        writer_handle.abort();
        reader_state.advance(ConnectionState::Closed);
        let _ = reader_events.send(ConnectionEvent::Close).await;
    });

    let connection = Connection::new(state, tx_send, vec![reader.abort_handle(), writer.abort_handle()]);
    (connection, EventStream::new(rx_events))
}

fn fault_from(err: &WsError, closed_locally: bool) -> TransportFault {
    TransportFault {
        message: err.to_string(),
        after_local_close: closed_locally && is_close_already_sent(err),
    }
}

/// Errors tungstenite raises when the peer or we already started closing
fn is_close_already_sent(err: &WsError) -> bool {
    matches!(
        err,
        WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Protocol(ProtocolError::SendAfterClosing)
            | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_errors_are_benign_only_after_local_close() {
        assert!(fault_from(&WsError::AlreadyClosed, true).after_local_close);
        assert!(!fault_from(&WsError::AlreadyClosed, false).after_local_close);
        assert!(
            !fault_from(&WsError::Io(std::io::Error::other("broken pipe")), true).after_local_close
        );
    }

    #[tokio::test]
    async fn test_server_close_ends_event_stream() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.close(None).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let connector = WebSocketConnector::new(&[], Duration::from_secs(2)).unwrap();
        let url = Url::parse(&format!("ws://{}/ws/games", addr)).unwrap();
        let mut session = connector.connect(&url).await;
        assert!(session.handshake.succeeded());

        let mut seen = Vec::new();
        timeout(Duration::from_secs(1), async {
            while let Some(event) = session.events.next().await {
                seen.push(event);
            }
        })
        .await
        .expect("event stream stayed open after the server closed");

        assert_eq!(seen.first(), Some(&ConnectionEvent::Open));
        assert_eq!(seen.last(), Some(&ConnectionEvent::Close));
        assert_eq!(session.connection.state(), ConnectionState::Closed);
        for event in &seen {
            if let ConnectionEvent::Error(fault) = event {
                assert!(!fault.after_local_close);
            }
        }
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let headers = vec![("Bad Header".to_string(), "value".to_string())];
        assert!(WebSocketConnector::new(&headers, Duration::from_secs(1)).is_err());

        let headers = vec![("X-Test".to_string(), "ok".to_string())];
        assert!(WebSocketConnector::new(&headers, Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn test_refused_port_reports_failed_handshake() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let connector = WebSocketConnector::new(&[], Duration::from_secs(2)).unwrap();
        let url = Url::parse(&format!("ws://127.0.0.1:{}/ws/games", port)).unwrap();
        let mut session = connector.connect(&url).await;

        assert!(!session.handshake.succeeded());
        assert_eq!(session.handshake.status, None);
        assert_eq!(session.connection.state(), ConnectionState::Closed);
        assert_eq!(session.events.next().await, None);
    }
}
