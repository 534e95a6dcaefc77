// src/ai/mod.rs
pub mod prompt;
pub mod provider;
pub mod reconcile;

pub use provider::{CompletionRequest, CompletionResponse, LlmProvider, OpenAiProvider, TokenUsage};
pub use reconcile::{clean_response, reconcile, ReconcileInput, ReconcileMode, ReconcileOutcome};
