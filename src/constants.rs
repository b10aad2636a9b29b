//! Application-wide constants and configuration values

use std::time::Duration;

// Target service
pub const DEFAULT_TARGET_URL: &str = "ws://localhost:8080/ws/games";
pub const SWITCHING_PROTOCOLS: u16 = 101;

// Virtual user limits
pub const MAX_VUS_LIMIT: u32 = 10_000;

// Protocol script (seconds are the script's time unit)
pub const CREATE_SETTLE_DELAY: Duration = Duration::from_secs(3);
pub const SELECT_CARD_COUNT: u32 = 10;
pub const SELECT_CARD_INTERVAL: Duration = Duration::from_millis(100);
pub const CLOSE_DELAY: Duration = Duration::from_secs(5);
pub const CARD_VALUE: &str = "Ace";

// Identifiers
pub const ID_SUFFIX_LEN: usize = 5;
pub const ROOM_ID_PREFIX: &str = "room-";
pub const USER_ID_PREFIX: &str = "user-";

// Channel and buffer constants
pub const CHANNEL_BUFFER_SIZE: usize = 100;

// Timeout constants
pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 30;
pub const CLOSE_GRACE: Duration = Duration::from_secs(2);
pub const SCENARIO_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);
