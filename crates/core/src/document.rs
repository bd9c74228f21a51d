//! Document input and per-document output types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::error::PipelineError;

/// Characters of the original text kept in an output preview.
pub const PREVIEW_CHARS: usize = 500;

/// One input document. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,

    /// Overrides the pipeline memory key for this document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_key: Option<String>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            memory_key: None,
        }
    }

    pub fn with_memory_key(mut self, key: impl Into<String>) -> Self {
        self.memory_key = Some(key.into());
        self
    }

    /// Build a document from a JSON item by selecting `input_field`.
    ///
    /// A bare JSON string is accepted as the text itself. An object may also
    /// carry a `memory_key` string that overrides the pipeline key.
    pub fn from_json(
        item: &serde_json::Value,
        input_field: &str,
    ) -> std::result::Result<Self, PipelineError> {
        if let Some(text) = item.as_str() {
            return Ok(Self::new(text));
        }
        let text = item
            .get(input_field)
            .and_then(|v| v.as_str())
            .ok_or_else(|| PipelineError::MissingInputField(input_field.to_string()))?;
        let memory_key = item
            .get("memory_key")
            .and_then(|v| v.as_str())
            .filter(|k| !k.trim().is_empty())
            .map(String::from);
        Ok(Self {
            text: text.to_string(),
            memory_key,
        })
    }

    /// The first [`PREVIEW_CHARS`] characters, with an ellipsis when cut.
    pub fn preview(&self) -> String {
        let mut chars = self.text.chars();
        let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
        if chars.next().is_some() {
            format!("{head}…")
        } else {
            head
        }
    }
}

/// One diagnostic entry: what a stage produced for a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOutput {
    pub stage_ordinal: usize,
    pub chunk_index: usize,
    pub output: String,
}

/// An entry of [`DocumentOutput::stage_outputs`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkOutput {
    pub chunk_index: usize,
    pub output: String,
}

/// Append-only log of stage outputs. Written by the runner, never read back by it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageLog {
    entries: Vec<StageOutput>,
}

impl StageLog {
    pub fn record(&mut self, stage_ordinal: usize, chunk_index: usize, output: &str) {
        self.entries.push(StageOutput {
            stage_ordinal,
            chunk_index,
            output: output.to_string(),
        });
    }

    pub fn entries(&self) -> &[StageOutput] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Group by stage ordinal, preserving recording order within a stage.
    pub fn by_stage(&self) -> BTreeMap<usize, Vec<ChunkOutput>> {
        let mut grouped: BTreeMap<usize, Vec<ChunkOutput>> = BTreeMap::new();
        for e in &self.entries {
            grouped.entry(e.stage_ordinal).or_default().push(ChunkOutput {
                chunk_index: e.chunk_index,
                output: e.output.clone(),
            });
        }
        grouped
    }
}

/// The result of processing one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOutput {
    /// Truncated preview of the input
    pub original_text: String,
    pub final_text: String,
    pub chunks_count: usize,
    /// Present only in verbose runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_outputs: Option<BTreeMap<usize, Vec<ChunkOutput>>>,
    pub memory_version: u64,
    /// False when the memory store rejected the save
    pub memory_persisted: bool,
}
