use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientConfig {
    pub database: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5984
}

fn default_database() -> String {
    "testdb".to_string()
}

impl ClientConfig {
    /// Config for `database` on the default host and port
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            host: default_host(),
            port: default_port(),
        }
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&contents)?;
        tracing::debug!(path, db = %config.database, "Loaded client config");
        Ok(config)
    }

    /// Scheme, host and port, without a trailing slash
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Path of the bound database, always `/<db>/`
    pub fn base_path(&self) -> String {
        format!("/{}/", self.database)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(default_database())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("albums");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5984);
        assert_eq!(config.base_url(), "http://127.0.0.1:5984");
        assert_eq!(config.base_path(), "/albums/");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"database": "notes"}"#).unwrap();
        assert_eq!(config, ClientConfig::new("notes"));

        let config: ClientConfig =
            serde_json::from_str(r#"{"database": "notes", "host": "couch.local", "port": 6984}"#)
                .unwrap();
        assert_eq!(config.base_url(), "http://couch.local:6984");
    }

    #[test]
    fn test_database_is_required() {
        assert!(serde_json::from_str::<ClientConfig>(r#"{"host": "couch.local"}"#).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(ClientConfig::load("./does-not-exist/couchlite.json").is_err());
    }
}
