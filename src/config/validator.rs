//! Config validation: listen address and table names.

use crate::config::ServerConfig;
use crate::error::ConfigError;
use regex::Regex;

/// Plain or schema-qualified SQL identifier.
const TABLE_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$";

pub fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.host.trim().is_empty() {
        return Err(ConfigError::Validation("Host must not be empty".into()));
    }
    config.port.parse::<u16>().map_err(|_| {
        ConfigError::Validation(format!("Port must be a number, got '{}'", config.port))
    })?;
    if config.database.max_connections == 0 {
        return Err(ConfigError::Validation("MaxConnections must be at least 1".into()));
    }
    let re = Regex::new(TABLE_NAME_PATTERN)
        .map_err(|_| ConfigError::Validation("invalid table name pattern".into()))?;
    for (kind, pair) in &config.tables {
        for name in [&pair.record, &pair.content] {
            if !re.is_match(name) {
                return Err(ConfigError::Validation(format!(
                    "{}: invalid table name '{}'",
                    kind, name
                )));
            }
        }
        if pair.record == pair.content {
            return Err(ConfigError::Validation(format!(
                "{}: record and content tables must differ",
                kind
            )));
        }
    }
    Ok(())
}
