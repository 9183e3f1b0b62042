//! Server configuration loading from file and environment variables.

use crate::events::OffsetUnit;
use callpilot_capability::LlmSettings;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Orchestration graph settings.
    #[serde(default)]
    pub graph: GraphConfig,

    /// Per-connection session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Knowledge retrieval settings.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Optional generative backend.
    #[serde(default)]
    pub llm: LlmSettings,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "callpilot_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Bounded wait per node run, in milliseconds. `0` disables it.
    #[serde(default = "default_node_timeout_ms")]
    pub node_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Capacity of the per-connection inbound and outbound queues.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    /// Longest accepted transcript fragment, in bytes.
    #[serde(default = "default_max_text_len")]
    pub max_text_len: usize,

    /// Unit of inbound `offset` values: `ticks` (100 ns) or `seconds`.
    #[serde(default)]
    pub offset_unit: OffsetUnit,

    /// Bounded wait for the post-call evaluation. `0` disables it.
    #[serde(default = "default_evaluation_timeout_ms")]
    pub evaluation_timeout_ms: u64,

    /// Bounded wait for the fast-path member lookup. `0` disables it.
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeConfig {
    /// Articles returned per search.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_node_timeout_ms() -> u64 {
    15_000
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_max_text_len() -> usize {
    4_096
}

fn default_evaluation_timeout_ms() -> u64 {
    60_000
}

fn default_lookup_timeout_ms() -> u64 {
    2_000
}

fn default_top_k() -> usize {
    3
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            node_timeout_ms: default_node_timeout_ms(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            outbound_buffer: default_outbound_buffer(),
            max_text_len: default_max_text_len(),
            offset_unit: OffsetUnit::default(),
            evaluation_timeout_ms: default_evaluation_timeout_ms(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

/// `0` means "no bound".
pub(crate) fn bounded(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl GraphConfig {
    pub fn node_timeout(&self) -> Option<Duration> {
        bounded(self.node_timeout_ms)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `CALLPILOT_HOST` overrides `server.host`
/// - `CALLPILOT_PORT` overrides `server.port`
/// - `CALLPILOT_LOG_LEVEL` overrides `logging.level`
/// - `CALLPILOT_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `CALLPILOT_NODE_TIMEOUT_MS` overrides `graph.node_timeout_ms`
/// - `CALLPILOT_OFFSET_UNIT` overrides `session.offset_unit` ("ticks" or "seconds")
/// - `CALLPILOT_LLM_ENABLED` overrides `llm.enabled`
/// - `CALLPILOT_LLM_MODEL` overrides `llm.model`
/// - `CALLPILOT_LLM_BASE_URL` overrides `llm.base_url`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn is_truthy(value: &str) -> bool {
    value == "true" || value == "1"
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("CALLPILOT_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("CALLPILOT_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(level) = var("CALLPILOT_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("CALLPILOT_LOG_JSON") {
        config.logging.json = is_truthy(&json);
    }
    if let Some(timeout) = var("CALLPILOT_NODE_TIMEOUT_MS") {
        if let Ok(parsed) = timeout.parse() {
            config.graph.node_timeout_ms = parsed;
        }
    }
    if let Some(unit) = var("CALLPILOT_OFFSET_UNIT") {
        match unit.trim() {
            "ticks" => config.session.offset_unit = OffsetUnit::Ticks,
            "seconds" => config.session.offset_unit = OffsetUnit::Seconds,
            other => tracing::warn!(value = other, "ignoring unknown CALLPILOT_OFFSET_UNIT"),
        }
    }
    if let Some(enabled) = var("CALLPILOT_LLM_ENABLED") {
        config.llm.enabled = is_truthy(&enabled);
    }
    if let Some(model) = var("CALLPILOT_LLM_MODEL") {
        config.llm.model = model;
    }
    if let Some(base_url) = var("CALLPILOT_LLM_BASE_URL") {
        config.llm.base_url = base_url;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.toml");
        let config = load_config(path.to_str()).expect("defaults expected");
        assert_eq!(config.knowledge.top_k, 3);
        assert_eq!(config.graph.node_timeout(), Some(Duration::from_secs(15)));
        assert!(!config.llm.enabled);
    }

    #[test]
    fn partial_file_keeps_section_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[server]\nport = 9100\n\n[graph]\nnode_timeout_ms = 0\n\n[llm]\nmodel = \"local-model\""
        )
        .expect("write config");

        let config = load_config(file.path().to_str()).expect("config should parse");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, default_host());
        assert_eq!(config.graph.node_timeout(), None);
        assert_eq!(config.llm.model, "local-model");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.session.max_text_len, 4_096);
        assert_eq!(config.session.offset_unit, OffsetUnit::Ticks);
    }

    #[test]
    fn offset_unit_reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[session]\noffset_unit = \"seconds\"").expect("write config");
        let config = load_config(file.path().to_str()).expect("config should parse");
        assert_eq!(config.session.offset_unit, OffsetUnit::Seconds);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[server\nport = ").expect("write config");
        assert!(matches!(
            load_config(file.path().to_str()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn env_overrides_apply_and_bad_values_are_ignored() {
        let vars: HashMap<&str, &str> = [
            ("CALLPILOT_PORT", "not-a-port"),
            ("CALLPILOT_LOG_JSON", "1"),
            ("CALLPILOT_NODE_TIMEOUT_MS", "250"),
            ("CALLPILOT_LLM_ENABLED", "true"),
            ("CALLPILOT_OFFSET_UNIT", "seconds"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 8000);
        assert!(config.logging.json);
        assert_eq!(config.graph.node_timeout(), Some(Duration::from_millis(250)));
        assert!(config.llm.enabled);
        assert_eq!(config.session.offset_unit, OffsetUnit::Seconds);
    }
}
