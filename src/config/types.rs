//! Server configuration types. Keys follow the server's JSON config file (PascalCase).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServerConfig {
    pub database: DatabaseConfig,
    pub host: String,
    /// Kept as text: the config file writes it as a string (`"Port": "8080"`).
    pub port: String,
    /// Table pair overrides keyed by resource kind (`blogs`, `pastes`, `static`).
    pub tables: BTreeMap<String, TablePair>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            database: DatabaseConfig::default(),
            host: "127.0.0.1".into(),
            port: "8080".into(),
            tables: BTreeMap::new(),
        }
    }
}

impl ServerConfig {
    /// `host:port` listen address.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DatabaseConfig {
    /// Full connection URL; when set, the individual fields below are ignored.
    pub url: Option<String>,
    /// Directory of the server's Unix socket. Takes precedence over host/port.
    pub unix_socket: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: None,
            unix_socket: String::new(),
            host: "localhost".into(),
            port: 5432,
            username: "postgres".into(),
            password: String::new(),
            database: "folio".into(),
            max_connections: 5,
            acquire_timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TablePair {
    pub record: String,
    pub content: String,
}
