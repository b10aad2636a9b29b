//! Command-line argument parsing for the load generator

use clap::{Parser, ValueEnum};
use std::time::Duration;

use super::{OutputConfig, RunConfig, ScriptConfig, TargetConfig};
use crate::common::Strategy;
use crate::constants::*;
use crate::errors::{LoadError, Result};

/// Persistence strategy for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Relational database
    Rdbms,
    /// Shared cache
    Global,
    /// In-process cache
    Local,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Rdbms => Strategy::Rdbms,
            StrategyArg::Global => Strategy::Global,
            StrategyArg::Local => Strategy::Local,
        }
    }
}

/// Raw configuration from command line arguments
#[derive(Parser, Debug, Clone)]
#[command(
    name = "cardroom-load",
    version = "0.1.0",
    about = "Drives virtual users against a card-room WebSocket service, one scenario per persistence strategy",
    long_about = None
)]
pub struct RawConfig {
    /// Service endpoint
    #[arg(
        short = 't',
        long = "target",
        value_name = "URL",
        default_value = DEFAULT_TARGET_URL,
        help = "WebSocket endpoint of the card-room service"
    )]
    pub target: String,

    /// Virtual users per scenario
    #[arg(
        short = 'u',
        long = "vus",
        value_name = "COUNT",
        default_value = "1000",
        help = "Concurrent virtual users in each scenario"
    )]
    pub vus: u32,

    /// Active window of each scenario
    #[arg(
        short = 'd',
        long = "duration",
        value_name = "DURATION",
        default_value = "120s",
        help = "Duration of each scenario (e.g., '500ms', '30s', '2m')"
    )]
    pub duration: String,

    /// Idle time between scenario windows
    #[arg(
        long = "gap",
        value_name = "DURATION",
        default_value = "5s",
        help = "Pause between the end of one scenario and the start of the next"
    )]
    pub gap: String,

    /// Strategies to exercise, in order
    #[arg(
        short = 's',
        long = "strategies",
        value_enum,
        value_delimiter = ',',
        default_value = "rdbms,global,local",
        help = "Comma-separated strategies, one scenario each"
    )]
    pub strategies: Vec<StrategyArg>,

    /// Connection timeout in seconds
    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        default_value = "30",
        help = "Handshake timeout in seconds"
    )]
    pub timeout: u64,

    /// Custom headers
    #[arg(
        short = 'H',
        long = "header",
        value_name = "HEADER",
        action = clap::ArgAction::Append,
        help = "Custom handshake headers in 'Key: Value' format (can be used multiple times)"
    )]
    pub headers: Vec<String>,

    #[arg(
        long = "create-delay",
        value_name = "DURATION",
        default_value = "3s",
        help = "Pause after CREATE_ROOM before selecting cards"
    )]
    pub create_delay: String,

    #[arg(
        long = "select-count",
        value_name = "COUNT",
        default_value = "10",
        help = "SELECT_CARD commands per virtual user"
    )]
    pub select_count: u32,

    #[arg(
        long = "select-interval",
        value_name = "DURATION",
        default_value = "100ms",
        help = "Pause after each SELECT_CARD"
    )]
    pub select_interval: String,

    #[arg(
        long = "close-delay",
        value_name = "DURATION",
        default_value = "5s",
        help = "Pause after the last command before closing"
    )]
    pub close_delay: String,

    #[arg(
        long = "card-value",
        value_name = "CARD",
        default_value = CARD_VALUE,
        help = "Card value carried by SELECT_CARD"
    )]
    pub card_value: String,

    /// Read the room back after selecting
    #[arg(long = "read-room", help = "Send GET_ROOM after the selections")]
    pub read_room: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose", help = "Enable verbose logging")]
    pub verbose: bool,
}

impl RawConfig {
    /// Parse from command line arguments
    pub fn parse_from_args() -> Result<Self> {
        Ok(Self::parse())
    }

    /// Parse duration string with time suffixes (ms/s/m/h)
    pub(crate) fn parse_duration(duration_str: &str) -> Result<Duration> {
        let duration_str = duration_str.trim();

        if duration_str.is_empty() {
            return Err(LoadError::config("Duration cannot be empty"));
        }

        let (number_part, unit_millis) = if let Some(number) = duration_str
            .strip_suffix("ms")
            .or_else(|| duration_str.strip_suffix("MS"))
        {
            (number, 1)
        } else {
            match duration_str.chars().last() {
                Some('s' | 'S') => (&duration_str[..duration_str.len() - 1], 1_000),
                Some('m' | 'M') => (&duration_str[..duration_str.len() - 1], 60_000),
                Some('h' | 'H') => (&duration_str[..duration_str.len() - 1], 3_600_000),
                // No suffix, assume seconds
                _ => (duration_str, 1_000),
            }
        };

        let value = number_part.parse::<u64>().map_err(|_| {
            LoadError::config(format!(
                "Invalid duration format: '{}' - expected a number with an optional ms/s/m/h suffix",
                duration_str
            ))
        })?;
        let millis = value.checked_mul(unit_millis).ok_or_else(|| {
            LoadError::config(format!("Duration '{}' is too large", duration_str))
        })?;
        Ok(Duration::from_millis(millis))
    }
}

impl TryFrom<RawConfig> for RunConfig {
    type Error = LoadError;

    fn try_from(raw: RawConfig) -> Result<Self> {
        let duration = RawConfig::parse_duration(&raw.duration)?;
        let gap = RawConfig::parse_duration(&raw.gap)?;

        let strategies: Vec<Strategy> = raw.strategies.into_iter().map(Strategy::from).collect();

        Ok(RunConfig {
            target: TargetConfig {
                url: raw.target,
                headers: raw.headers,
                connect_timeout: Duration::from_secs(raw.timeout),
            },
            scenarios: RunConfig::sequential_scenarios(&strategies, raw.vus, duration, gap),
            script: ScriptConfig {
                create_settle: RawConfig::parse_duration(&raw.create_delay)?,
                select_count: raw.select_count,
                select_interval: RawConfig::parse_duration(&raw.select_interval)?,
                close_delay: RawConfig::parse_duration(&raw.close_delay)?,
                card_value: raw.card_value,
                read_room: raw.read_room,
            },
            output: OutputConfig {
                verbose: raw.verbose,
            },
        })
    }
}
