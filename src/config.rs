// Configuration module for reading Agent.toml
// This module provides configuration management for the grid agent

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::types::Direction;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub agent: AgentConfig,
    pub pacing: PacingConfig,
    pub debug: DebugConfig,
}

/// Game server endpoint
#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionConfig {
    pub server_url: String,
}

impl ConnectionConfig {
    /// WebSocket URL the server expects for a given agent id
    pub fn url_for(&self, agent_id: &str) -> String {
        format!("{}?id={}", self.server_url, agent_id)
    }
}

/// Agent identity and strategy defaults
#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub default_id: String,
    pub default_mode: String,
    /// Opponent identifier on the map; first foreign head when absent
    #[serde(default)]
    pub opponent_id: Option<String>,
    pub mirror_default_direction: Direction,
}

/// Pre-send delay settings
#[derive(Debug, Deserialize, Clone)]
pub struct PacingConfig {
    pub base_delay_ms: u64,
    /// Added after every move when the escalating-delay strategy is active
    pub delay_increment_ms: u64,
}

impl PacingConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn increment(&self) -> Duration {
        Duration::from_millis(self.delay_increment_ms)
    }
}

/// Debug configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Agent.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        toml::from_str(&contents).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Loads default configuration from Agent.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file("Agent.toml")
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the values in Agent.toml
    pub fn default_hardcoded() -> Self {
        Config {
            connection: ConnectionConfig {
                server_url: "ws://localhost:3000".to_string(),
            },
            agent: AgentConfig {
                default_id: "k".to_string(),
                default_mode: "up".to_string(),
                opponent_id: None,
                mirror_default_direction: Direction::Right,
            },
            pacing: PacingConfig {
                base_delay_ms: 100,
                delay_increment_ms: 100,
            },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "agent_debug.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            eprintln!("Warning: Could not load Agent.toml ({}), using hardcoded defaults", e);
            Self::default_hardcoded()
        })
    }
}
