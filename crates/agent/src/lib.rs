//! The conversation core of FinGuru.
//!
//! Every turn follows the same pipeline:
//!
//! 1. **Guard** against empty input and answer greetings directly
//! 2. **Extract** profile facts from the message ([`extract`])
//! 3. **Assemble** a system prompt from persona, profile and history ([`prompt`])
//! 4. **Complete** through the retrying completer
//! 5. **Record** the exchange in the user's history on success
//!
//! [`SessionCoordinator`] runs the pipeline under a per-user lock.

pub mod coordinator;
pub mod extract;
pub mod persona;
pub mod prompt;

#[cfg(test)]
mod test_helpers;

pub use coordinator::{ANONYMOUS_USER, SessionCoordinator, TurnOutcome, TurnReply};
pub use extract::{Extraction, extract};
pub use prompt::PromptAssembler;
