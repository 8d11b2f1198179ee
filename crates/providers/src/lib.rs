//! Language-model provider implementations for AskMyCar.
//!
//! All providers implement the `askmycar_core::Provider` trait.

pub mod anthropic;

pub use anthropic::AnthropicProvider;
