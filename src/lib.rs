//! Scenario-driven websocket load generator for the card-room service
//!
//! Three scenarios, one per persistence strategy, each keep a fixed pool
//! of virtual users cycling through a create-room / select-card script.
//! Outcomes are aggregated into rate metrics shared by every VU.

pub mod client;
pub mod common;
pub mod config;
pub mod constants;
pub mod errors;
pub mod message;
pub mod metrics;
pub mod patterns;
pub mod scheduler;
pub mod vu;

pub use client::{Connector, WebSocketConnector};
pub use common::{Strategy, VuId};
pub use config::RunConfig;
pub use errors::{LoadError, Result};
pub use metrics::reporting::{RunReport, ScenarioReport};
pub use metrics::{AggregateMetrics, MetricName};
pub use scheduler::Scheduler;
pub use vu::{Pacer, TokioPacer, VirtualUser};
