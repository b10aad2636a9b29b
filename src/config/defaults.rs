//! Default values and configuration presets

use super::{OutputConfig, RunConfig, ScriptConfig, TargetConfig};
use crate::common::Strategy;
use crate::constants::*;
use std::time::Duration;

/// Default configuration values
pub struct Defaults;

impl Defaults {
    pub const VUS: u32 = 1000;
    pub const DURATION: Duration = Duration::from_secs(120);
    pub const GAP: Duration = Duration::from_secs(5);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECONDS);
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            create_settle: CREATE_SETTLE_DELAY,
            select_count: SELECT_CARD_COUNT,
            select_interval: SELECT_CARD_INTERVAL,
            close_delay: CLOSE_DELAY,
            card_value: CARD_VALUE.to_string(),
            read_room: false,
        }
    }
}

impl RunConfig {
    /// Three strategies, 1000 VUs each for 120s, 5s apart
    pub fn standard(target_url: String) -> Self {
        Self {
            target: TargetConfig {
                url: target_url,
                headers: vec![],
                connect_timeout: Defaults::CONNECT_TIMEOUT,
            },
            scenarios: Self::sequential_scenarios(
                &Strategy::ALL,
                Defaults::VUS,
                Defaults::DURATION,
                Defaults::GAP,
            ),
            script: ScriptConfig::default(),
            output: OutputConfig { verbose: false },
        }
    }
}
