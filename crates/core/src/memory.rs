//! Memory record and store trait — the continuity state carried across
//! chunks, stages and runs for one memory key.
//!
//! The record is loaded once per document, mutated while the stages run and
//! persisted once at the end. Field names follow the stored JSON layout.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::error::MemoryError;

/// The continuity record for one memory key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// Persist counter: +1 on every successful save
    #[serde(default)]
    pub version: u64,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,

    #[serde(default)]
    pub style_profile: StyleProfile,

    #[serde(default)]
    pub glossary: Glossary,

    #[serde(default)]
    pub context_summary: ContextSummary,

    #[serde(default)]
    pub last_edited_tail: EditedTail,

    #[serde(default)]
    pub usage_stats: UsageStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub formality: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Glossary {
    /// Term → preferred rendering, rendered into prompts in key order
    #[serde(default)]
    pub term_map: BTreeMap<String, String>,

    #[serde(rename = "lastModified", default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSummary {
    #[serde(default)]
    pub short: String,
    #[serde(default)]
    pub long: String,
}

/// The most recent edited tail, global to the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditedTail {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub length_chars: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    #[serde(rename = "totalTokensUsed", default)]
    pub total_tokens_used: u64,
    #[serde(default)]
    pub executions: u64,
}

impl Memory {
    /// A fresh record for a key seen for the first time.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            version: 0,
            created_at: now,
            last_updated: now,
            style_profile: StyleProfile::default(),
            glossary: Glossary::default(),
            context_summary: ContextSummary::default(),
            last_edited_tail: EditedTail::default(),
            usage_stats: UsageStats::default(),
        }
    }

    /// Overwrite the global tail.
    pub fn set_tail(&mut self, tail: String) {
        self.last_edited_tail.length_chars = tail.chars().count();
        self.last_edited_tail.text = tail;
    }

    pub fn tail(&self) -> &str {
        &self.last_edited_tail.text
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

/// The key-value store holding memory records.
///
/// Implementations: in-process (transient), JSON file, PostgreSQL.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// The backend name (e.g., "in_memory", "file", "postgres").
    fn name(&self) -> &str;

    /// Load the record for `key`. `Ok(None)` means first run for this key.
    async fn get(&self, key: &str) -> std::result::Result<Option<Memory>, MemoryError>;

    /// Store the record for `key`, replacing any previous one.
    async fn put(&self, key: &str, memory: &Memory) -> std::result::Result<(), MemoryError>;

    /// Remove the record for `key`. Returns whether one existed.
    async fn delete(&self, key: &str) -> std::result::Result<bool, MemoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_record_is_version_zero() {
        let mem = Memory::new();
        assert_eq!(mem.version, 0);
        assert!(mem.tail().is_empty());
        assert_eq!(mem.created_at, mem.last_updated);
    }

    #[test]
    fn set_tail_counts_chars_not_bytes() {
        let mut mem = Memory::new();
        mem.set_tail("他说。好".into());
        assert_eq!(mem.last_edited_tail.length_chars, 4);
        assert_eq!(mem.tail(), "他说。好");
    }

    #[test]
    fn serializes_with_stored_field_names() {
        let mut mem = Memory::new();
        mem.glossary.term_map.insert("colour".into(), "color".into());
        let json = serde_json::to_value(&mem).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("lastUpdated").is_some());
        assert!(json["usage_stats"].get("totalTokensUsed").is_some());
        assert_eq!(json["glossary"]["term_map"]["colour"], "color");
        assert!(json["last_edited_tail"].get("length_chars").is_some());
    }

    #[test]
    fn partial_record_fills_defaults() {
        let mem: Memory = serde_json::from_value(serde_json::json!({
            "version": 7,
            "createdAt": "2026-01-01T00:00:00Z",
            "lastUpdated": "2026-01-02T00:00:00Z",
            "style_profile": { "tone": "warm" }
        }))
        .unwrap();
        assert_eq!(mem.version, 7);
        assert_eq!(mem.style_profile.tone, "warm");
        assert!(mem.glossary.term_map.is_empty());
    }
}
