//! Load server config from a JSON file, then apply environment overrides.

use crate::config::{validate, ServerConfig};
use crate::error::ConfigError;
use crate::table::{TableRegistry, Tables};
use std::path::Path;

/// Read and validate config. `None` means no file was given: defaults are used with a warning.
/// Environment (`DATABASE_URL`, `FOLIO_HOST`, `FOLIO_PORT`) overrides file values.
pub fn load(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            parse(&text)?
        }
        None => {
            tracing::warn!("no configuration file given, using defaults");
            ServerConfig::default()
        }
    };
    let config = apply_overrides(config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

pub fn parse(text: &str) -> Result<ServerConfig, ConfigError> {
    Ok(serde_json::from_str(text)?)
}

/// Apply overrides from `lookup` (the process environment in [`load`]). Empty values are ignored.
pub fn apply_overrides<F>(mut config: ServerConfig, lookup: F) -> ServerConfig
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    if let Some(url) = get("DATABASE_URL") {
        config.database.url = Some(url);
    }
    if let Some(host) = get("FOLIO_HOST") {
        config.host = host;
    }
    if let Some(port) = get("FOLIO_PORT") {
        config.port = port;
    }
    config
}

/// Registry with the built-in kinds, re-pointed at any configured table pairs.
pub fn table_registry(config: &ServerConfig) -> Result<TableRegistry, ConfigError> {
    let mut registry = TableRegistry::with_defaults();
    for (kind, pair) in &config.tables {
        registry.set_tables(kind, Tables::new(pair.record.clone(), pair.content.clone()))?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Page, Paste};
    use std::collections::HashMap;

    const FILE: &str = r#"{
        "Database": {
            "UnixSocket": "/var/run/postgresql",
            "Username": "web",
            "Password": "pw",
            "Database": "site"
        },
        "Host": "0.0.0.0",
        "Port": "9000",
        "Tables": { "blogs": { "Record": "posts", "Content": "post_bodies" } }
    }"#;

    #[test]
    fn parses_server_config_file() {
        let config = parse(FILE).unwrap();
        assert_eq!(config.database.unix_socket, "/var/run/postgresql");
        assert_eq!(config.database.username, "web");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.listen_addr(), "0.0.0.0:9000");
        let registry = table_registry(&config).unwrap();
        assert_eq!(registry.tables_for::<Page>().record_table(), "posts");
        assert_eq!(registry.tables_for::<Paste>().record_table(), "paste_pages");
    }

    #[test]
    fn environment_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("DATABASE_URL", "postgres://x/y"),
            ("FOLIO_PORT", "7000"),
            ("FOLIO_HOST", " "),
        ]
        .into_iter()
        .collect();
        let config = apply_overrides(parse(FILE).unwrap(), |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.database.url.as_deref(), Some("postgres://x/y"));
        assert_eq!(config.port, "7000");
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn unknown_table_kind_is_an_error() {
        let config = parse(r#"{"Tables": {"wiki": {"Record": "a", "Content": "b"}}}"#).unwrap();
        assert!(matches!(table_registry(&config), Err(ConfigError::UnknownKind(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load(Some(Path::new("/nonexistent/folio.json"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/folio.json"));
    }
}
