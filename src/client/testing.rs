//! In-memory stand-in for the card-room service

use crate::client::{
    Connection, ConnectionEvent, ConnectionState, Connector, EventStream, Frame, Handshake,
    Session, StateCell,
};
use crate::constants::{CHANNEL_BUFFER_SIZE, SWITCHING_PROTOCOLS};

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

/// One frame the fake service received
#[derive(Debug, Clone)]
pub(crate) struct Received {
    pub conn: usize,
    pub at: Instant,
    pub frame: Frame,
}

#[derive(Debug, Default)]
struct Shared {
    received: Mutex<Vec<Received>>,
    connects: AtomicUsize,
    live: AtomicUsize,
    clean_closes: AtomicUsize,
}

/// Decrements the live connection count however the session task ends
struct LiveGuard(Arc<Shared>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Connector double answering like the real service
#[derive(Debug, Clone)]
pub(crate) struct FakeService {
    status: u16,
    greeting: Vec<String>,
    reply: bool,
    close_first: bool,
    shared: Arc<Shared>,
}

impl FakeService {
    pub fn new() -> Self {
        Self {
            status: SWITCHING_PROTOCOLS,
            greeting: Vec::new(),
            reply: true,
            close_first: false,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Answer every handshake with `status`
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Push these payloads right after the connection opens
    pub fn with_greeting(mut self, payloads: &[&str]) -> Self {
        self.greeting = payloads.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Never answer commands
    pub fn silent(mut self) -> Self {
        self.reply = false;
        self
    }

    /// Close every connection from the server side right after it opens.
    ///
    /// The session task keeps its event sender alive until the client's
    /// close frame arrives, like a transport writer that is still running.
    pub fn closes_first(mut self) -> Self {
        self.close_first = true;
        self
    }

    pub fn received(&self) -> Vec<Received> {
        self.shared.received.lock().unwrap().clone()
    }

    /// Text frames received on one connection, in arrival order
    pub fn texts(&self, conn: usize) -> Vec<(Instant, String)> {
        self.received()
            .into_iter()
            .filter(|r| r.conn == conn)
            .filter_map(|r| match r.frame {
                Frame::Text(text) => Some((r.at, text)),
                Frame::Close => None,
            })
            .collect()
    }

    pub fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    pub fn live_connections(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    pub fn clean_closes(&self) -> usize {
        self.shared.clean_closes.load(Ordering::SeqCst)
    }
}

/// What the service handler answers to a command
pub(crate) fn service_reply(text: &str) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(text) else {
        return r#"{"error":"Malformed request"}"#.to_string();
    };
    let room_id = json["roomId"].as_str().unwrap_or_default();
    match json["command"].as_str() {
        Some("CREATE_ROOM") => format!(r#"{{"status":"CREATED", "roomId":"{}"}}"#, room_id),
        Some("SELECT_CARD") => format!(r#"{{"status":"SELECTED", "roomId":"{}"}}"#, room_id),
        Some("GET_ROOM") => format!(r#"{{"roomId":"{}","selections":{{}}}}"#, room_id),
        _ => r#"{"error":"Unknown command"}"#.to_string(),
    }
}

#[async_trait]
impl Connector for FakeService {
    async fn connect(&self, _url: &Url) -> Session {
        let conn = self.shared.connects.fetch_add(1, Ordering::SeqCst);
        if self.status != SWITCHING_PROTOCOLS {
            return Session::refused(Handshake::failed(Some(self.status), "Internal Server Error"));
        }

        let state = StateCell::new(ConnectionState::Open);
        let (tx_send, mut rx_send) = mpsc::channel::<Frame>(CHANNEL_BUFFER_SIZE);
        let (tx_events, rx_events) = mpsc::channel::<ConnectionEvent>(CHANNEL_BUFFER_SIZE);
        let _ = tx_events.try_send(ConnectionEvent::Open);
        for payload in &self.greeting {
            let _ = tx_events.try_send(ConnectionEvent::Message(payload.clone()));
        }
        if self.close_first {
            state.advance(ConnectionState::Closed);
            let _ = tx_events.try_send(ConnectionEvent::Close);
        }

        self.shared.live.fetch_add(1, Ordering::SeqCst);
        let guard = LiveGuard(Arc::clone(&self.shared));
        let shared = Arc::clone(&self.shared);
        let task_state = state.clone();
        let reply = self.reply;
        let task = tokio::spawn(async move {
            let _guard = guard;
            while let Some(frame) = rx_send.recv().await {
                shared.received.lock().unwrap().push(Received {
                    conn,
                    at: Instant::now(),
                    frame: frame.clone(),
                });
                match frame {
                    Frame::Text(text) => {
                        if reply
                            && tx_events
                                .send(ConnectionEvent::Message(service_reply(&text)))
                                .await
                                .is_err()
                        {
                            break;
                        }
                    }
                    Frame::Close => {
                        shared.clean_closes.fetch_add(1, Ordering::SeqCst);
                        task_state.advance(ConnectionState::Closed);
                        let _ = tx_events.send(ConnectionEvent::Close).await;
                        break;
                    }
                }
            }
        });

        Session {
            handshake: Handshake::switched(SWITCHING_PROTOCOLS),
            connection: Connection::new(state, tx_send, vec![task.abort_handle()]),
            events: EventStream::new(rx_events),
        }
    }
}
