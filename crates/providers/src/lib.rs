//! Text generation providers for Scrivener.
//!
//! All providers implement the `scrivener_core::Provider` trait.
//! The router builds the one named in configuration.

mod http;
pub mod anthropic;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
