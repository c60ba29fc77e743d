//! Service configuration: YAML file plus environment overrides.
//!
//! Lookup order for the file is `GITA_CONFIG`, then `./config.yaml`. A
//! missing file means defaults. Environment variables always win.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gita_corpus::{GeneratorConfig, OPENAI_BASE_URL, OPENROUTER_BASE_URL};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("CONFIG/IO: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CONFIG/PARSE: {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("CONFIG/INVALID: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub corpus: CorpusConfig,
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `openai` or `openrouter`.
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Overrides the provider's default endpoint.
    pub base_url: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.3,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    pub fn is_openrouter(&self) -> bool {
        self.provider.eq_ignore_ascii_case("openrouter")
    }

    pub fn effective_base_url(&self) -> &str {
        match &self.base_url {
            Some(url) => url.as_str(),
            None if self.is_openrouter() => OPENROUTER_BASE_URL,
            None => OPENAI_BASE_URL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub path: PathBuf,
    pub search_limit: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/verses.json"),
            search_limit: gita_stages::SEARCH_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub poll_interval_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: gita_core::stream::DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load with an injected environment lookup.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let path = env("GITA_CONFIG")
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(env)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes as unit, not as an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(port) = env("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a port number: {}", port)))?;
            let host = self
                .server
                .addr
                .rsplit_once(':')
                .map(|(host, _)| host)
                .unwrap_or("0.0.0.0");
            self.server.addr = format!("{}:{}", host, port);
        }
        if let Some(addr) = env("GITA_ADDR") {
            self.server.addr = addr;
        }

        let key_var = if self.llm.is_openrouter() {
            "OPENROUTER_API_KEY"
        } else {
            "OPENAI_API_KEY"
        };
        if let Some(key) = env(key_var).filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = env("GITA_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(path) = env("CORPUS_PATH") {
            self.corpus.path = PathBuf::from(path);
        }
        Ok(())
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            base_url: self.llm.effective_base_url().to_string(),
            api_key: self.llm.api_key.clone(),
            model: self.llm.model.clone(),
            temperature: self.llm.temperature,
            timeout: Duration::from_secs(self.llm.timeout_secs),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.stream.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_yaml("").unwrap();

        assert_eq!(config.server.addr, "0.0.0.0:8000");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.effective_base_url(), OPENAI_BASE_URL);
        assert_eq!(config.corpus.search_limit, 5);
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config = AppConfig::from_yaml(
            "llm:\n  provider: openrouter\n  model: anthropic/claude-3.5-sonnet\nstream:\n  poll_interval_ms: 250\n",
        )
        .unwrap();

        assert_eq!(config.llm.effective_base_url(), OPENROUTER_BASE_URL);
        assert_eq!(config.llm.temperature, 0.3);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("PORT", "9000"),
                ("OPENAI_API_KEY", "sk-env"),
                ("OPENROUTER_API_KEY", "or-env"),
                ("GITA_LLM_MODEL", "gpt-4o"),
                ("CORPUS_PATH", "/srv/verses.json"),
            ]))
            .unwrap();

        assert_eq!(config.server.addr, "0.0.0.0:9000");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.corpus.path, PathBuf::from("/srv/verses.json"));
    }

    #[test]
    fn test_openrouter_reads_its_own_key() {
        let mut config = AppConfig::from_yaml("llm:\n  provider: openrouter\n").unwrap();
        config
            .apply_env(env(&[("OPENAI_API_KEY", "sk-env"), ("OPENROUTER_API_KEY", "or-env")]))
            .unwrap();

        assert_eq!(config.generator_config().api_key.as_deref(), Some("or-env"));
        assert_eq!(config.generator_config().base_url, OPENROUTER_BASE_URL);
    }

    #[test]
    fn test_gita_addr_beats_port() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[("PORT", "9000"), ("GITA_ADDR", "127.0.0.1:7000")]))
            .unwrap();

        assert_eq!(config.server.addr, "127.0.0.1:7000");
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().starts_with("CONFIG/INVALID"));
    }

    #[test]
    fn test_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "server:\n  addr: 127.0.0.1:8100\ncorpus:\n  search_limit: 3\n").unwrap();

        let config = AppConfig::load_with(env(&[("GITA_CONFIG", path.to_str().unwrap())])).unwrap();

        assert_eq!(config.server.addr, "127.0.0.1:8100");
        assert_eq!(config.corpus.search_limit, 3);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = AppConfig::load_with(env(&[("GITA_CONFIG", "/nonexistent/gita.yaml")])).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
