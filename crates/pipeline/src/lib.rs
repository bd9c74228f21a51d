//! # Scrivener Pipeline
//!
//! The refinement engine. A document is cut into overlapping chunks, every
//! enabled stage is applied to each chunk in order while a continuity tail is
//! carried in [`Memory`](scrivener_core::Memory), and the edited chunks are
//! stitched back together with the duplicated overlap removed.
//!
//! ```text
//! text ─▶ Chunker ─▶ StageRunner ─▶ reassemble ─▶ final text
//!                       │    ▲
//!                       ▼    │ tail
//!                     Provider   Memory ─▶ MemoryStore
//! ```

pub mod text;
pub mod chunker;
pub mod tail;
pub mod response;
pub mod prompt;
pub mod runner;
pub mod reassemble;
pub mod processor;

pub use chunker::{Chunker, chunk_text};
pub use tail::tail_of;
pub use response::{ResponseShape, resolve_text};
pub use prompt::build_prompt;
pub use runner::StageRunner;
pub use reassemble::{ExactMatcher, MIN_OVERLAP, OverlapMatcher, reassemble, reassemble_with};
pub use processor::{
    BatchItemResult, KeyGuard, KeyLocks, MemoryOrigin, Pipeline, load_memory, persist_memory,
};
