//! # FinGuru Core
//!
//! Domain types, traits, and error definitions for the FinGuru conversation
//! middleware. This crate has **zero framework dependencies**: it defines the
//! domain model that all other crates implement against.
//!
//! - [`message`]: wire messages and immutable conversation turns
//! - [`profile`]: the incrementally learned financial profile
//! - [`provider`]: the completion-service abstraction
//! - [`error`]: per-context error enums

pub mod error;
pub mod message;
pub mod profile;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, SessionError};
pub use message::{Message, Role, Turn};
pub use profile::{GoalTag, ProfileField, RiskTolerance, UserProfile};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
