//! OpenAI-compatible text-generation adapter.
//!
//! Implements [`TextGenerator`] against any chat-completions endpoint that
//! speaks the OpenAI wire format, running the function-calling loop locally:
//! tool calls requested by the model are executed against the configured
//! [`ProductCatalog`] and their results fed back until the model produces a
//! final text reply.

pub mod config;
pub mod generator;
mod wire;

pub use config::OpenAiConfig;
pub use generator::OpenAiGenerator;
