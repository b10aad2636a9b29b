//! Turns connection events into metric samples and diagnostics

use crate::client::ConnectionEvent;
use crate::common::VuId;
use crate::errors::LoadError;
use crate::message::InboundMessage;
use crate::metrics::{AggregateMetrics, MetricName};

use tracing::{debug, error, warn};

/// Per-connection inbound event handler
pub struct InboundHandler<'a> {
    vu: VuId,
    metrics: &'a AggregateMetrics,
}

impl<'a> InboundHandler<'a> {
    pub fn new(vu: VuId, metrics: &'a AggregateMetrics) -> Self {
        Self { vu, metrics }
    }

    /// Record the event; returns the diagnostic that was logged, if any
    pub fn handle(&self, event: ConnectionEvent) -> Option<LoadError> {
        match event {
            ConnectionEvent::Open => {
                self.metrics.record_session_opened();
                debug!("VU {} connection open", self.vu);
                None
            }
            ConnectionEvent::Message(payload) => {
                self.metrics.record_message_received();
                self.handle_payload(&payload)
            }
            ConnectionEvent::Close => {
                debug!("VU {} connection closed", self.vu);
                None
            }
            ConnectionEvent::Error(fault) => {
                if fault.after_local_close {
                    debug!("VU {} ignoring error after close: {}", self.vu, fault.message);
                    return None;
                }
                let err = LoadError::Transport(fault.message);
                self.metrics.record(MetricName::Error, true);
                warn!("VU {} an unexpected error occurred: {}", self.vu, err);
                Some(err)
            }
        }
    }

    fn handle_payload(&self, payload: &str) -> Option<LoadError> {
        match InboundMessage::classify(payload) {
            Ok(InboundMessage::RoomCreated) => {
                self.metrics.record(MetricName::RoomCreated, true);
                None
            }
            Ok(InboundMessage::CardSelected) => {
                self.metrics.record(MetricName::CardSelected, true);
                None
            }
            Ok(InboundMessage::RoomRead { room_id }) => {
                self.metrics.record(MetricName::RoomRead, true);
                debug!("VU {} read room {}", self.vu, room_id);
                None
            }
            Ok(InboundMessage::ServerError { message }) => {
                let err = LoadError::Application(message);
                self.metrics.record(MetricName::Error, true);
                error!("VU {} {}", self.vu, err);
                Some(err)
            }
            Ok(InboundMessage::Unrecognized(value)) => {
                debug!("VU {} ignoring unrecognized payload: {}", self.vu, value);
                None
            }
            Err(err) => {
                self.metrics.record(MetricName::Error, true);
                error!("VU {} {}", self.vu, err);
                Some(err)
            }
        }
    }
}
