//! # Scrivener Core
//!
//! Domain types, collaborator traits, and error definitions for the Scrivener
//! text refinement pipeline. This crate has **no framework dependencies**: it
//! defines the model that every other crate implements against.
//!
//! The two external collaborators, text generation and memory storage, are
//! traits here. Implementations live in `scrivener-providers` and
//! `scrivener-memory`; tests substitute scripted stubs.

pub mod error;
pub mod chunk;
pub mod stage;
pub mod provider;
pub mod memory;
pub mod document;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, PipelineError, ProviderError, Result};
pub use chunk::{Chunk, EditedChunk, SplitMethod};
pub use stage::{OutputFormat, StageCondition, StageConfig};
pub use provider::{GenerationRequest, Provider};
pub use memory::{Memory, MemoryStore};
pub use document::{ChunkOutput, Document, DocumentOutput, StageLog, StageOutput};
