//! Configuration types for the research daemon.
//!
//! Loaded from a TOML file (default `~/.config/vigil/config.toml`); every
//! field has a default so a missing file or a partial file both work.

use crate::error::{BrainError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the research daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    /// Reasoning backend settings.
    pub reasoning: ReasoningConfig,
    /// Monthly spend ceiling settings.
    pub budget: BudgetConfig,
    /// Wake cadence and seed interests.
    pub brain: LoopConfig,
    /// Search provider settings.
    pub research: ResearchConfig,
    /// Notification sink settings.
    pub notify: NotifyConfig,
}

/// Reasoning backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Provider base URL.
    pub api_url: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Max output tokens per request.
    pub max_tokens: u32,
    /// API key reference.
    pub api_key: SecretRef,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com".to_owned(),
            model: "claude-sonnet-4-20250514".to_owned(),
            max_tokens: 1024,
            api_key: SecretRef::Env {
                var: "ANTHROPIC_API_KEY".to_owned(),
            },
        }
    }
}

/// Secret reference for the reasoning credential.
///
/// Inline literals are discouraged; prefer the env form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecretRef {
    /// No credential configured.
    #[default]
    None,
    /// Inline literal key.
    Literal { value: String },
    /// Resolve the key from an environment variable.
    Env { var: String },
}

impl SecretRef {
    /// Resolve the credential, returning `None` when nothing usable is
    /// configured. An absent or empty env var is "not configured", not an
    /// error: the loop must keep running without a credential.
    pub fn resolve(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Literal { value } => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_owned())
                }
            }
            Self::Env { var } => match std::env::var(var) {
                Ok(value) if !value.trim().is_empty() => Some(value.trim().to_owned()),
                _ => None,
            },
        }
    }
}

/// Monthly budget configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Monthly spend ceiling in currency units.
    pub monthly_limit: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            monthly_limit: 50.0,
        }
    }
}

/// Wake cadence and persistent-state location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Decision cycles per day. The wake interval is `24h / thoughts_per_day`,
    /// computed once at startup.
    pub thoughts_per_day: u32,
    /// Directory holding the two persisted JSON documents. `None` resolves to
    /// the platform config dir.
    pub memory_dir: Option<PathBuf>,
    /// Seed interest list written into fresh memory. Not altered by the loop.
    pub interests: Vec<String>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            thoughts_per_day: 6,
            memory_dir: None,
            interests: vec![
                "machine consciousness and autonomous agency".to_owned(),
                "long-horizon AI research directions".to_owned(),
                "emergent behaviour in large language models".to_owned(),
                "philosophy of mind and personal identity".to_owned(),
            ],
        }
    }
}

impl LoopConfig {
    /// Resolve the memory directory, falling back to the platform config dir.
    pub fn resolve_memory_dir(&self) -> PathBuf {
        self.memory_dir.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("vigil")
        })
    }
}

/// Search provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Cap on merged results per cycle (also the web lookup cap).
    pub max_results: usize,
    /// Forum channels to query. Only the first three are searched per cycle.
    pub subreddits: Vec<String>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            subreddits: vec![
                "consciousness".to_owned(),
                "artificial".to_owned(),
                "philosophy".to_owned(),
                "singularity".to_owned(),
            ],
        }
    }
}

/// Notification sink configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Webhook URL to POST findings to. `None` disables notifications.
    pub webhook_url: Option<String>,
}

impl BrainConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a present but invalid file is an
    /// error.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(BrainError::Config(format!(
                    "cannot read config {}: {e}",
                    path.display()
                )));
            }
        };

        let config: Self = toml::from_str(&raw).map_err(|e| {
            BrainError::Config(format!("invalid config {}: {e}", path.display()))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Default config file path (`~/.config/vigil/config.toml`).
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vigil")
            .join("config.toml")
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<()> {
        if self.brain.thoughts_per_day == 0 {
            return Err(BrainError::Config(
                "thoughts_per_day must be greater than 0".to_owned(),
            ));
        }
        if self.budget.monthly_limit < 0.0 {
            return Err(BrainError::Config(
                "monthly_limit must not be negative".to_owned(),
            ));
        }
        if self.research.max_results == 0 {
            return Err(BrainError::Config(
                "research.max_results must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }
}
