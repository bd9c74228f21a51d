//! Configuration loading, validation, and management for Scrivener.
//!
//! Loads configuration from `~/.scrivener/config.toml` with environment
//! variable overrides. Everything is validated once, up front, and turned
//! into an immutable [`PipelineSettings`] before any document is processed.

use scrivener_core::{SplitMethod, StageConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound on configured stages.
pub const MAX_STAGES: usize = 10;

/// The root configuration structure.
///
/// Maps directly to `~/.scrivener/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Field holding the text in JSON input items
    #[serde(default = "default_input_field")]
    pub input_field: String,

    /// Model used by stages without an override
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Temperature used by stages without an override
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Window size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,

    #[serde(default)]
    pub split_method: SplitMethod,

    #[serde(default)]
    pub memory_mode: MemoryMode,

    /// Key of the memory record used for every document without its own key
    #[serde(default = "default_memory_key")]
    pub memory_key: String,

    /// Record per-stage outputs in the result
    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub output_format: ResultFormat,

    /// Text generation backend
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Memory store settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Ordered refinement stages
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

fn default_input_field() -> String {
    "text".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_chunk_size() -> usize {
    4000
}
fn default_overlap_chars() -> usize {
    200
}
fn default_memory_key() -> String {
    "default".into()
}

/// Where memory records live between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryMode {
    /// In-process only; gone when the process exits
    #[default]
    Transient,
    /// JSON file on local disk
    PersistentLocal,
    /// PostgreSQL database
    PersistentRemote,
}

/// Output format of the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    #[default]
    Txt,
    Json,
}

impl std::str::FromStr for ResultFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(Self::Txt),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{other}' (expected txt or json)")),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// "openai", "openrouter", "anthropic", "ollama", ...
    #[serde(default = "default_provider_name")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

fn default_provider_name() -> String {
    "openai".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            api_key: None,
            api_url: None,
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// JSON store file for `persistent-local`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Connection string for `persistent-remote`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
}

impl MemoryConfig {
    /// The configured store file, or `~/.scrivener/memory.json`.
    pub fn store_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("memory.json"))
    }
}

impl std::fmt::Debug for MemoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConfig")
            .field("path", &self.path)
            .field("database_url", &redact(&self.database_url))
            .finish()
    }
}

/// The validated, immutable run configuration handed to the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub default_model: String,
    pub default_temperature: f32,
    pub chunk_size: usize,
    pub overlap_chars: usize,
    pub split_method: SplitMethod,
    pub memory_key: String,
    pub verbose: bool,
    pub stages: Vec<StageConfig>,
}

impl PipelineSettings {
    /// Validate and build settings directly (used by library callers and tests).
    pub fn new(
        default_model: impl Into<String>,
        chunk_size: usize,
        overlap_chars: usize,
        stages: Vec<StageConfig>,
    ) -> Result<Self, ConfigError> {
        let settings = Self {
            default_model: default_model.into(),
            default_temperature: default_temperature(),
            chunk_size,
            overlap_chars,
            split_method: SplitMethod::default(),
            memory_key: default_memory_key(),
            verbose: false,
            stages,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_split_method(mut self, method: SplitMethod) -> Self {
        self.split_method = method;
        self
    }

    pub fn with_memory_key(mut self, key: impl Into<String>) -> Self {
        self.memory_key = key.into();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() || self.stages.len() > MAX_STAGES {
            return Err(ConfigError::ValidationError(format!(
                "between 1 and {MAX_STAGES} stages are required, got {}",
                self.stages.len()
            )));
        }

        if self.chunk_size == 0 {
            return Err(ConfigError::ValidationError("chunk_size must be > 0".into()));
        }

        if self.overlap_chars >= self.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "overlap_chars ({}) must be smaller than chunk_size ({})",
                self.overlap_chars, self.chunk_size
            )));
        }

        if self.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError("default_model must not be empty".into()));
        }

        if self.memory_key.trim().is_empty() {
            return Err(ConfigError::ValidationError("memory_key must not be empty".into()));
        }

        check_temperature("default_temperature", self.default_temperature)?;

        for (i, stage) in self.stages.iter().enumerate() {
            let ordinal = i + 1;
            if stage.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "stage {ordinal} has an empty name"
                )));
            }
            if stage.max_tokens == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "stage '{}' max_tokens must be > 0",
                    stage.name
                )));
            }
            if let Some(t) = stage.temperature {
                check_temperature(&format!("stage '{}' temperature", stage.name), t)?;
            }
        }

        Ok(())
    }
}

fn check_temperature(what: &str, t: f32) -> Result<(), ConfigError> {
    if !(0.0..=2.0).contains(&t) {
        return Err(ConfigError::ValidationError(format!(
            "{what} must be between 0.0 and 2.0"
        )));
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from the default path (~/.scrivener/config.toml).
    ///
    /// Also checks environment variables:
    /// - `SCRIVENER_API_KEY` (highest priority), `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`
    /// - `SCRIVENER_PROVIDER`, `SCRIVENER_MODEL`, `SCRIVENER_DATABASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_overrides(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_overrides(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;

        if config.provider.api_key.is_none() {
            config.provider.api_key = std::env::var("SCRIVENER_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("SCRIVENER_PROVIDER") {
            config.provider.name = provider;
        }

        if let Ok(model) = std::env::var("SCRIVENER_MODEL") {
            config.default_model = model;
        }

        if let Ok(url) = std::env::var("SCRIVENER_DATABASE_URL") {
            config.memory.database_url = Some(url);
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".scrivener")
    }

    /// Validate everything a run depends on and freeze it.
    pub fn pipeline_settings(&self) -> Result<PipelineSettings, ConfigError> {
        let settings = PipelineSettings {
            default_model: self.default_model.clone(),
            default_temperature: self.default_temperature,
            chunk_size: self.chunk_size,
            overlap_chars: self.overlap_chars,
            split_method: self.split_method,
            memory_key: self.memory_key.clone(),
            verbose: self.verbose,
            stages: self.stages.clone(),
        };
        settings.validate()?;

        if self.input_field.trim().is_empty() {
            return Err(ConfigError::ValidationError("input_field must not be empty".into()));
        }

        if self.memory_mode == MemoryMode::PersistentRemote && self.memory.database_url.is_none() {
            return Err(ConfigError::ValidationError(
                "memory_mode = \"persistent-remote\" requires memory.database_url".into(),
            ));
        }

        Ok(settings)
    }

    /// Generate a starter config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self {
            stages: vec![
                StageConfig::new(
                    "copyedit",
                    "Correct spelling, grammar and punctuation. Do not rephrase sentences that are already correct.",
                ),
                StageConfig::new(
                    "flow",
                    "Smooth transitions between sentences and paragraphs so the text reads naturally.",
                ),
            ],
            ..Self::default()
        };
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_field: default_input_field(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            chunk_size: default_chunk_size(),
            overlap_chars: default_overlap_chars(),
            split_method: SplitMethod::default(),
            memory_mode: MemoryMode::default(),
            memory_key: default_memory_key(),
            verbose: false,
            output_format: ResultFormat::default(),
            provider: ProviderConfig::default(),
            memory: MemoryConfig::default(),
            stages: vec![],
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for scrivener_core::Error {
    fn from(e: ConfigError) -> Self {
        scrivener_core::Error::Config {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn one_stage() -> Vec<StageConfig> {
        vec![StageConfig::new("copyedit", "Fix typos.")]
    }

    #[test]
    fn default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.input_field, "text");
        assert_eq!(config.chunk_size, 4000);
        assert_eq!(config.overlap_chars, 200);
        assert_eq!(config.split_method, SplitMethod::Smart);
        assert_eq!(config.memory_mode, MemoryMode::Transient);
        assert_eq!(config.output_format, ResultFormat::Txt);
    }

    #[test]
    fn default_config_without_stages_is_rejected() {
        let err = AppConfig::default().pipeline_settings().unwrap_err();
        assert!(err.to_string().contains("stages"));
    }

    #[test]
    fn too_many_stages_rejected() {
        let stages = (0..11)
            .map(|i| StageConfig::new(format!("s{i}"), "noop"))
            .collect();
        assert!(PipelineSettings::new("m", 1000, 100, stages).is_err());
    }

    #[test]
    fn overlap_must_be_below_chunk_size() {
        assert!(PipelineSettings::new("m", 500, 500, one_stage()).is_err());
        assert!(PipelineSettings::new("m", 500, 499, one_stage()).is_ok());
        assert!(PipelineSettings::new("m", 0, 0, one_stage()).is_err());
    }

    #[test]
    fn invalid_stage_temperature_rejected() {
        let mut stages = one_stage();
        stages[0].temperature = Some(3.5);
        let err = PipelineSettings::new("m", 1000, 100, stages).unwrap_err();
        assert!(err.to_string().contains("copyedit"));
    }

    #[test]
    fn remote_mode_requires_database_url() {
        let config = AppConfig {
            stages: one_stage(),
            memory_mode: MemoryMode::PersistentRemote,
            ..AppConfig::default()
        };
        assert!(config.pipeline_settings().is_err());

        let config = AppConfig {
            memory: MemoryConfig {
                path: None,
                database_url: Some("postgres://localhost/scrivener".into()),
            },
            ..config
        };
        assert!(config.pipeline_settings().is_ok());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_model, "gpt-4o-mini");
    }

    #[test]
    fn parses_full_toml_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmp,
            r#"
input_field = "body"
default_model = "gpt-4o"
chunk_size = 3000
overlap_chars = 150
split_method = "heading"
memory_mode = "persistent-local"
memory_key = "novel"
verbose = true
output_format = "json"

[provider]
name = "anthropic"

[memory]
path = "/tmp/scrivener-memory.json"

[[stages]]
name = "grammar"
prompt_template = "Fix grammar."
temperature = 0.1

[[stages]]
name = "style"
prompt_template = "Improve flow."
model_override = "gpt-4o-mini"
enabled = false
condition = "len > 100"
output_format = "json"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.input_field, "body");
        assert_eq!(config.split_method, SplitMethod::Heading);
        assert_eq!(config.memory_mode, MemoryMode::PersistentLocal);
        assert_eq!(config.output_format, ResultFormat::Json);
        assert_eq!(config.provider.name, "anthropic");
        assert_eq!(config.stages.len(), 2);
        assert!(!config.stages[1].enabled);
        assert_eq!(
            config.stages[1].condition.as_ref().map(|c| c.expression()),
            Some("len > 100")
        );

        let settings = config.pipeline_settings().unwrap();
        assert_eq!(settings.chunk_size, 3000);
        assert_eq!(settings.memory_key, "novel");
        assert!(settings.verbose);
    }

    #[test]
    fn default_toml_round_trips_and_validates() {
        let toml_str = AppConfig::default_toml();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.stages.len(), 2);
        assert!(parsed.pipeline_settings().is_ok());
    }

    #[test]
    fn debug_redacts_api_key() {
        let provider = ProviderConfig {
            api_key: Some("sk-very-secret".into()),
            ..ProviderConfig::default()
        };
        let dbg = format!("{provider:?}");
        assert!(!dbg.contains("sk-very-secret"));
        assert!(dbg.contains("REDACTED"));
    }

    #[test]
    fn result_format_parses() {
        assert_eq!("JSON".parse::<ResultFormat>().unwrap(), ResultFormat::Json);
        assert_eq!("text".parse::<ResultFormat>().unwrap(), ResultFormat::Txt);
        assert!("xml".parse::<ResultFormat>().is_err());
    }
}
