//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BrassConfig, CommandsConfig, LinksConfig, ScheduleConfig, TransportConfig};
use brass_adapter_irc::IrcConfig;
use std::collections::HashSet;

/// Validates the entire configuration.
pub fn validate_config(config: &BrassConfig) -> ConfigResult<()> {
    validate_transports(&config.transports)?;
    validate_commands(&config.commands)?;
    validate_links(&config.links)?;
    validate_schedule(&config.schedule)?;

    if config.database.path.trim().is_empty() {
        return Err(ConfigError::missing_field("database.path"));
    }

    Ok(())
}

/// Validates all transport configurations.
fn validate_transports(transports: &[TransportConfig]) -> ConfigResult<()> {
    if transports.is_empty() {
        return Err(ConfigError::validation("At least one transport must be configured"));
    }

    let mut seen = HashSet::new();
    for transport in transports {
        let name = transport.name();
        if name.is_empty() {
            return Err(ConfigError::missing_field("transports.name"));
        }
        if name.contains(char::is_whitespace) {
            return Err(ConfigError::validation("Transport name cannot contain spaces"));
        }
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateTransport(name.to_string()));
        }

        match transport {
            TransportConfig::Irc(irc) => validate_irc(irc)?,
        }
    }

    Ok(())
}

/// Validates one IRC transport.
fn validate_irc(irc: &IrcConfig) -> ConfigResult<()> {
    if irc.server.is_empty() {
        return Err(ConfigError::missing_field(format!("transports.{}.server", irc.name)));
    }
    if irc.port == 0 {
        return Err(ConfigError::InvalidPort(irc.port));
    }
    if irc.nick.is_empty() {
        return Err(ConfigError::missing_field(format!("transports.{}.nick", irc.name)));
    }
    if irc.nick.contains(char::is_whitespace) {
        return Err(ConfigError::validation(format!(
            "Nickname '{}' cannot contain spaces",
            irc.nick
        )));
    }
    for channel in &irc.channels {
        if !channel.starts_with(['#', '&', '+', '!']) {
            return Err(ConfigError::validation(format!(
                "Channel '{channel}' must start with one of # & + !"
            )));
        }
    }
    if irc.flood_capacity == 0 {
        return Err(ConfigError::validation("Flood capacity must be greater than 0"));
    }
    if irc.antiflood_delay_secs == 0 {
        return Err(ConfigError::validation("Anti-flood delay must be greater than 0"));
    }
    if irc.idle_timeout_secs == 0 {
        return Err(ConfigError::validation("Idle timeout must be greater than 0"));
    }
    Ok(())
}

fn validate_commands(commands: &CommandsConfig) -> ConfigResult<()> {
    if commands.ceiling == 0 {
        return Err(ConfigError::validation("Command ceiling must be greater than 0"));
    }
    if commands.window_secs == 0 {
        return Err(ConfigError::validation("Command window must be greater than 0"));
    }
    if !(0.0..=1.0).contains(&commands.wrong_command_probability) {
        return Err(ConfigError::validation(
            "Wrong command probability must be between 0.0 and 1.0",
        ));
    }
    Ok(())
}

fn validate_links(links: &LinksConfig) -> ConfigResult<()> {
    if links.line_horizon == 0 {
        return Err(ConfigError::validation("Link line horizon must be greater than 0"));
    }
    if links.fetch_timeout_secs == 0 {
        return Err(ConfigError::validation("Fetch timeout must be greater than 0"));
    }
    if links.max_body_size == 0 {
        return Err(ConfigError::validation("Max body size must be greater than 0"));
    }
    Ok(())
}

fn validate_schedule(schedule: &ScheduleConfig) -> ConfigResult<()> {
    if schedule.daily_hour > 23 {
        return Err(ConfigError::validation(format!(
            "Daily hour {} is out of range 0-23",
            schedule.daily_hour
        )));
    }
    if schedule.daily_minute > 59 {
        return Err(ConfigError::validation(format!(
            "Daily minute {} is out of range 0-59",
            schedule.daily_minute
        )));
    }
    Ok(())
}
