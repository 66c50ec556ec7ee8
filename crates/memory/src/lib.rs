//! Conversation memory for FinGuru.
//!
//! - [`history`]: bounded per-user turn history
//! - [`session`]: the per-user session store and its locking discipline
//! - [`faq`]: seeded FAQ knowledge base with optional embeddings

pub mod faq;
pub mod history;
pub mod session;
pub mod vector;

pub use faq::{FaqEntry, FaqIndex, FaqMatch};
pub use history::{ConversationHistory, DEFAULT_HISTORY_CAP};
pub use session::{Session, SessionStore};
pub use vector::cosine_similarity;
