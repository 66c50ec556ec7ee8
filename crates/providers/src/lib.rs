//! Completion provider implementations for FinGuru.
//!
//! All providers implement the `finguru_core::Provider` trait.
//! The router selects the correct provider based on configuration, and
//! [`RetryingCompleter`] layers the rate-limit backoff policy on top.

pub mod openai_compat;
pub mod retry;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use retry::{AttemptOutcome, CompletionError, CompletionOptions, RetryingCompleter};
pub use router::ProviderRouter;
