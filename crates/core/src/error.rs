//! Error types for the Scrivener domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Scrivener operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Pipeline errors ---
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures reported by the text-generation collaborator.
///
/// These are never caught by the pipeline: they abort the current document.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures reported by a memory store.
///
/// Load failures degrade to a fresh record; save failures degrade to a
/// `false` persisted flag. Neither aborts a document.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Memory store not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// The chunker would not advance: the retreat by `overlap` cancels the cut.
    #[error("Chunker stalled at char {position}: cut {cut} does not exceed overlap {overlap}")]
    BoundaryStall {
        position: usize,
        cut: usize,
        overlap: usize,
    },

    #[error("Invalid pipeline settings: {0}")]
    InvalidSettings(String),

    #[error("Pipeline has no stages configured")]
    NoStages,

    #[error("Input field '{0}' is missing or not a string")]
    MissingInputField(String),
}
