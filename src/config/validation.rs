//! Configuration validation logic

use super::RunConfig;
use crate::constants::MAX_VUS_LIMIT;
use crate::errors::{LoadError, Result};
use std::collections::HashSet;
use url::Url;

/// Validate the configuration
pub fn validate(config: &RunConfig) -> Result<()> {
    validate_target(config)?;
    validate_scenarios(config)?;
    validate_schedule(config)?;
    validate_script(config)?;
    validate_headers(config)?;
    Ok(())
}

/// Validate target configuration
fn validate_target(config: &RunConfig) -> Result<()> {
    let url = Url::parse(&config.target.url).map_err(|e| {
        LoadError::config(format!("Invalid target URL '{}': {}", config.target.url, e))
    })?;

    // The transport is built without TLS support
    if url.scheme() != "ws" {
        return Err(LoadError::config(format!(
            "Invalid URL scheme '{}'. Only 'ws' is supported",
            url.scheme()
        )));
    }

    if config.target.connect_timeout.is_zero() {
        return Err(LoadError::config("Timeout must be greater than 0"));
    }

    Ok(())
}

/// Validate per-scenario settings
fn validate_scenarios(config: &RunConfig) -> Result<()> {
    if config.scenarios.is_empty() {
        return Err(LoadError::config("At least one scenario is required"));
    }

    let mut names = HashSet::new();
    for scenario in &config.scenarios {
        if scenario.vus == 0 {
            return Err(LoadError::config(format!(
                "Scenario '{}': number of VUs must be greater than 0",
                scenario.name
            )));
        }

        if scenario.vus > MAX_VUS_LIMIT {
            return Err(LoadError::config(format!(
                "Scenario '{}': number of VUs cannot exceed {}",
                scenario.name, MAX_VUS_LIMIT
            )));
        }

        if scenario.duration.is_zero() {
            return Err(LoadError::config(format!(
                "Scenario '{}': duration must be greater than 0",
                scenario.name
            )));
        }

        if !names.insert(scenario.name.as_str()) {
            return Err(LoadError::config(format!(
                "Scenario name '{}' is used more than once",
                scenario.name
            )));
        }
    }

    Ok(())
}

/// Scenario windows must not overlap
fn validate_schedule(config: &RunConfig) -> Result<()> {
    let ordered = config.ordered_scenarios();
    for pair in ordered.windows(2) {
        let (earlier, later) = (&pair[0], &pair[1]);
        if later.start_offset < earlier.end_offset() {
            return Err(LoadError::config(format!(
                "Scenario '{}' starts at {:?}, before '{}' ends at {:?}",
                later.name,
                later.start_offset,
                earlier.name,
                earlier.end_offset()
            )));
        }
    }
    Ok(())
}

/// Validate the per-VU script
fn validate_script(config: &RunConfig) -> Result<()> {
    if config.script.select_count == 0 {
        return Err(LoadError::config("Select count must be greater than 0"));
    }

    if config.script.card_value.trim().is_empty() {
        return Err(LoadError::config("Card value cannot be empty"));
    }

    Ok(())
}

/// Validate custom headers format
fn validate_headers(config: &RunConfig) -> Result<()> {
    for header in &config.target.headers {
        if !header.contains(':') {
            return Err(LoadError::config(format!(
                "Invalid header format '{}'. Use 'Key: Value' format",
                header
            )));
        }
    }
    Ok(())
}
