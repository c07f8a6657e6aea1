//! LLM capability implementations.

pub mod anthropic;

pub use anthropic::AnthropicAi;
