//! Configuration management for the card-room load generator
//!
//! This module provides a layered approach to configuration:
//! - Core structures
//! - CLI argument parsing
//! - Configuration validation
//! - Default value management

pub mod defaults;
pub mod parser;
pub mod validation;

use crate::common::Strategy;
use crate::errors::{LoadError, Result};
use std::fmt::Write;
use std::time::Duration;
use url::Url;

/// Target configuration
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub url: String,
    pub headers: Vec<String>,
    pub connect_timeout: Duration,
}

/// One load pattern: a fixed number of VUs against one strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioConfig {
    pub name: String,
    pub strategy: Strategy,
    pub vus: u32,
    pub duration: Duration,
    pub start_offset: Duration,
}

impl ScenarioConfig {
    /// Offset at which the active window closes
    pub fn end_offset(&self) -> Duration {
        self.start_offset + self.duration
    }
}

/// Timing and content of the per-VU protocol script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptConfig {
    /// Pause after CREATE_ROOM so the room exists before cards are selected
    pub create_settle: Duration,
    pub select_count: u32,
    pub select_interval: Duration,
    /// Pause before closing so trailing replies arrive
    pub close_delay: Duration,
    pub card_value: String,
    /// Send GET_ROOM after the selections
    pub read_room: bool,
}

impl ScriptConfig {
    /// Wall-clock time one iteration spends pausing
    pub fn paced_duration(&self) -> Duration {
        self.create_settle + self.select_interval * self.select_count + self.close_delay
    }
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub verbose: bool,
}

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub target: TargetConfig,
    pub scenarios: Vec<ScenarioConfig>,
    pub script: ScriptConfig,
    pub output: OutputConfig,
}

impl RunConfig {
    /// Parse and validate configuration from command line arguments
    pub fn from_args() -> Result<Self> {
        let raw_config = parser::RawConfig::parse_from_args()?;
        let config = raw_config.try_into()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Lay out one scenario per strategy, back to back with `gap` between windows
    pub fn sequential_scenarios(
        strategies: &[Strategy],
        vus: u32,
        duration: Duration,
        gap: Duration,
    ) -> Vec<ScenarioConfig> {
        strategies
            .iter()
            .enumerate()
            .map(|(idx, strategy)| ScenarioConfig {
                name: strategy.scenario_name().to_string(),
                strategy: *strategy,
                vus,
                duration,
                start_offset: (duration + gap) * idx as u32,
            })
            .collect()
    }

    /// Scenarios ordered by start offset
    pub fn ordered_scenarios(&self) -> Vec<ScenarioConfig> {
        let mut scenarios = self.scenarios.clone();
        scenarios.sort_by_key(|s| s.start_offset);
        scenarios
    }

    pub fn target_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.target.url)?)
    }

    /// Get custom headers as key-value pairs
    pub fn custom_headers(&self) -> Result<Vec<(String, String)>> {
        let mut headers = Vec::new();
        for header in &self.target.headers {
            if let Some((key, value)) = header.split_once(':') {
                headers.push((key.trim().to_string(), value.trim().to_string()));
            } else {
                return Err(LoadError::config(format!(
                    "Invalid header format '{}'. Use 'Key: Value' format",
                    header
                )));
            }
        }
        Ok(headers)
    }

    /// Offset at which the last scenario window closes
    pub fn planned_duration(&self) -> Duration {
        self.scenarios
            .iter()
            .map(ScenarioConfig::end_offset)
            .max()
            .unwrap_or_default()
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("{}", self.render_summary());
    }

    /// Format the configuration summary
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_summary(&mut out);
        out
    }

    fn write_summary(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "🃏 Card-Room Load Test Configuration:")?;
        writeln!(out, "   Target:           {}", self.target.url)?;
        writeln!(out, "   Connect Timeout:  {}s", self.target.connect_timeout.as_secs())?;
        writeln!(out, "   Scenarios:        {}", self.scenarios.len())?;
        for scenario in self.ordered_scenarios() {
            writeln!(
                out,
                "     {:<18} {:>5} VUs  strategy={:<6} start={:?} duration={:?}",
                scenario.name,
                scenario.vus,
                scenario.strategy,
                scenario.start_offset,
                scenario.duration
            )?;
        }
        writeln!(
            out,
            "   Script:           settle {:?}, {} x {} every {:?}, close after {:?}",
            self.script.create_settle,
            self.script.select_count,
            self.script.card_value,
            self.script.select_interval,
            self.script.close_delay
        )?;
        writeln!(
            out,
            "   Iteration Pause:  {:?} per VU iteration",
            self.script.paced_duration()
        )?;
        if self.script.read_room {
            writeln!(out, "   Room Read-Back:   enabled")?;
        }
        writeln!(out, "   Planned Span:     {:?}", self.planned_duration())?;

        if !self.target.headers.is_empty() {
            writeln!(out, "   Custom Headers:   {}", self.target.headers.len())?;
            for header in &self.target.headers {
                writeln!(out, "                     {}", header)?;
            }
        }
        Ok(())
    }
}
