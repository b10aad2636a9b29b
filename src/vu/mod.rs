//! Virtual users: one connection running the card-room script
//!
//! Each iteration of a VU slot builds a fresh [`VirtualUser`] with new room
//! and user identifiers, connects, runs the script and handles inbound
//! events concurrently, then closes.

pub mod handler;
pub mod pacer;
mod runner;

pub use handler::InboundHandler;
pub use pacer::{Pacer, TokioPacer};

use crate::client::Connector;
use crate::common::{Strategy, VuId};
use crate::config::ScriptConfig;
use crate::metrics::AggregateMetrics;
use crate::patterns;

use std::sync::Arc;
use url::Url;

/// Everything a VU iteration shares with the rest of its scenario
#[derive(Clone)]
pub struct VuContext {
    pub url: Url,
    pub script: Arc<ScriptConfig>,
    pub metrics: Arc<AggregateMetrics>,
    pub connector: Arc<dyn Connector>,
    pub pacer: Arc<dyn Pacer>,
}

/// One iteration's identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualUser {
    pub id: VuId,
    pub strategy: Strategy,
    pub room_id: String,
    pub user_id: String,
}

impl VirtualUser {
    /// Fresh identifiers for a new iteration
    pub fn new(id: VuId, strategy: Strategy) -> Self {
        Self {
            id,
            strategy,
            room_id: patterns::room_id(),
            user_id: patterns::user_id(),
        }
    }
}
