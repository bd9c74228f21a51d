//! Stage configuration — one transformation step of the refinement pipeline.

use serde::{Deserialize, Serialize};

/// How a stage asks the backend to format its answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Reserved skip predicate attached to a stage.
///
/// The expression is stored and logged but never evaluated: every stage with
/// `enabled = true` runs regardless of its condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageCondition(pub String);

impl StageCondition {
    pub fn expression(&self) -> &str {
        &self.0
    }

    /// Always `true`. Placeholder for a future evaluator.
    pub fn admits(&self) -> bool {
        true
    }
}

/// A configured pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Stage name, shown to the model in the prompt preamble
    pub name: String,

    /// Disabled stages are skipped entirely
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Stage-specific instruction text
    pub prompt_template: String,

    /// Overrides the pipeline default model when set and non-empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,

    /// Overrides the pipeline default temperature when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens for this stage's response
    #[serde(default = "default_stage_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub output_format: OutputFormat,

    /// Reserved; see [`StageCondition`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<StageCondition>,

    /// Whether this stage's outputs go to the diagnostic log in verbose runs
    #[serde(default = "default_true")]
    pub save_output: bool,
}

fn default_true() -> bool {
    true
}

fn default_stage_max_tokens() -> u32 {
    2048
}

impl StageConfig {
    /// A minimal enabled text stage.
    pub fn new(name: impl Into<String>, prompt_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            prompt_template: prompt_template.into(),
            model_override: None,
            temperature: None,
            max_tokens: default_stage_max_tokens(),
            output_format: OutputFormat::Text,
            condition: None,
            save_output: true,
        }
    }

    /// The model this stage runs on: the override if non-empty, else `default_model`.
    pub fn effective_model<'a>(&'a self, default_model: &'a str) -> &'a str {
        match self.model_override.as_deref() {
            Some(m) if !m.trim().is_empty() => m,
            _ => default_model,
        }
    }

    pub fn effective_temperature(&self, default_temperature: f32) -> f32 {
        self.temperature.unwrap_or(default_temperature)
    }

    /// Whether the stage runs. Conditions are inert, so only `enabled` matters.
    pub fn should_run(&self) -> bool {
        self.enabled && self.condition.as_ref().is_none_or(StageCondition::admits)
    }
}
