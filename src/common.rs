//! Shared identifiers and tags used across the codebase

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::LoadError;

/// Type-safe wrapper for a virtual user slot number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct VuId(pub u32);

impl VuId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for VuId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-side storage backend a scenario exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Relational database
    Rdbms,
    /// Shared cache in front of the database
    Global,
    /// Per-node in-process cache
    Local,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Rdbms, Strategy::Global, Strategy::Local];

    /// Wire tag sent in the `strategy` field
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Rdbms => "rdbms",
            Strategy::Global => "global",
            Strategy::Local => "local",
        }
    }

    /// Name of the built-in scenario that drives this strategy
    pub fn scenario_name(&self) -> &'static str {
        match self {
            Strategy::Rdbms => "rdbms_test",
            Strategy::Global => "global_cache_test",
            Strategy::Local => "local_cache_test",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rdbms" => Ok(Strategy::Rdbms),
            "global" => Ok(Strategy::Global),
            "local" => Ok(Strategy::Local),
            other => Err(LoadError::config(format!("Unknown strategy: {}", other))),
        }
    }
}
