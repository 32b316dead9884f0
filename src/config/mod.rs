use crate::stream::StreamOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the generation service.
    pub base_url: String,
    /// Service path segment selecting the backend, e.g. `ollama` or `openai`.
    pub provider: String,
    /// Model identifier passed through to the backend.
    pub model: String,
    /// Where session records live.
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|d| d.join("ragline"))
            .unwrap_or_else(|| PathBuf::from(".ragline"));

        Self {
            base_url: "http://localhost:8090".to_string(),
            provider: "ollama".to_string(),
            model: "deepseek-r1:1.5b".to_string(),
            data_dir,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = dirs::config_dir()
            .map(|d| d.join("ragline").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".ragline/config.toml"));

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Directory backing the session key-value store.
    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }

    /// Stream options for the configured backend, with no tag selected.
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            provider: self.provider.clone(),
            model: self.model.clone(),
            rag_tag: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:8090");
        assert_eq!(config.provider, "ollama");
        assert!(config.sessions_dir().ends_with("sessions"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(r#"base_url = "http://example:9000""#).unwrap();
        assert_eq!(config.base_url, "http://example:9000");
        assert_eq!(config.provider, "ollama");
    }
}
