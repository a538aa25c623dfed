use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CountdownBotError, Result};

pub const DEFAULT_DATA_PATH: &str = "./data/schedules.json";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 7878;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub data_path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| CountdownBotError::Config(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| CountdownBotError::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn data_path(&self) -> &str {
        self.data_path.as_deref().unwrap_or(DEFAULT_DATA_PATH)
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_fields_absent() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.data_path(), DEFAULT_DATA_PATH);
        assert_eq!(config.host(), DEFAULT_HOST);
        assert_eq!(config.port(), DEFAULT_PORT);
    }

    #[test]
    fn explicit_fields_win() {
        let config: Config =
            serde_json::from_str(r#"{"data_path": "./x.json", "port": 9000}"#).unwrap();
        assert_eq!(config.data_path(), "./x.json");
        assert_eq!(config.port(), 9000);
    }
}
