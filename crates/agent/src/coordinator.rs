//! The session coordinator: one conversation turn, end to end.
//!
//! A turn runs under the user's session lock: greeting check, profile
//! extraction, prompt assembly, completion, and history update. Every exit
//! path produces a reply; nothing escapes to the caller, panics included.

use crate::extract::extract;
use crate::persona::{
    self, APOLOGY_REPLY, CONNECTION_FAILURE_REPLY, EMPTY_INPUT_REPLY, GREETING_RESPONSE,
    SERVICE_FAILURE_REPLY,
};
use crate::prompt::PromptAssembler;
use finguru_core::error::{ProviderError, SessionError};
use finguru_core::message::{Message, Turn};
use finguru_core::profile::UserProfile;
use finguru_core::provider::Provider;
use finguru_memory::SessionStore;
use finguru_providers::{CompletionError, CompletionOptions, RetryingCompleter};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// User id used when a caller does not supply one.
pub const ANONYMOUS_USER: &str = "anonymous";

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The completion service answered and the exchange was recorded.
    Answered,
    /// Canned greeting; the pipeline was bypassed.
    Greeting,
    /// Nothing to answer.
    EmptyInput,
    /// The completion service failed; a fallback reply was given.
    Degraded,
    /// Something unanticipated went wrong; an apology was given.
    Failed,
}

/// Result of one turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub response: String,
    pub user_id: String,
    pub outcome: TurnOutcome,
    /// Profile after the turn. `None` when the input was rejected before a
    /// session was touched.
    pub profile: Option<UserProfile>,
}

/// Orchestrates turns against a shared [`SessionStore`].
pub struct SessionCoordinator {
    store: Arc<SessionStore>,
    completer: RetryingCompleter,
    assembler: PromptAssembler,
    options: CompletionOptions,
    context_window: usize,
}

impl SessionCoordinator {
    pub fn new(store: Arc<SessionStore>, completer: RetryingCompleter) -> Self {
        Self {
            store,
            completer,
            assembler: PromptAssembler::default(),
            options: CompletionOptions::default(),
            context_window: 6,
        }
    }

    /// Wire a coordinator from configuration around `provider`.
    pub fn from_config(provider: Arc<dyn Provider>, config: &finguru_config::AppConfig) -> Self {
        let store = Arc::new(SessionStore::new(config.session.history_cap));
        Self::new(store, RetryingCompleter::from_config(provider, config))
            .with_assembler(PromptAssembler::from_config(&config.persona))
            .with_options(CompletionOptions {
                temperature: config.default_temperature,
                max_tokens: Some(config.default_max_tokens),
                max_retries: config.retry.max_retries,
            })
            .with_context_window(config.session.context_window)
    }

    pub fn with_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// How many of the most recent turns accompany each completion request.
    pub fn with_context_window(mut self, turns: usize) -> Self {
        self.context_window = turns;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn model(&self) -> &str {
        self.completer.model()
    }

    /// Handle one user message.
    pub async fn handle_turn(&self, user_id: &str, input: &str) -> TurnReply {
        self.handle_turn_with_cancel(user_id, input, &CancellationToken::new())
            .await
    }

    /// Handle one user message; `cancel` aborts a pending completion.
    pub async fn handle_turn_with_cancel(
        &self,
        user_id: &str,
        input: &str,
        cancel: &CancellationToken,
    ) -> TurnReply {
        let turn = AssertUnwindSafe(self.turn(user_id, input, cancel)).catch_unwind();
        match turn.await {
            Ok(reply) => reply,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                error!(user_id, reason = %reason, "Turn panicked");
                TurnReply {
                    response: APOLOGY_REPLY.into(),
                    user_id: user_id.into(),
                    outcome: TurnOutcome::Failed,
                    profile: None,
                }
            }
        }
    }

    async fn turn(&self, user_id: &str, input: &str, cancel: &CancellationToken) -> TurnReply {
        if input.trim().is_empty() {
            debug!(user_id, "Rejecting empty input");
            return TurnReply {
                response: EMPTY_INPUT_REPLY.into(),
                user_id: user_id.into(),
                outcome: TurnOutcome::EmptyInput,
                profile: None,
            };
        }

        let mut session = self.store.lock(user_id).await;
        info!(user_id, input_len = input.len(), "Handling turn");

        if persona::is_greeting(input) {
            session.history.push_exchange(input, GREETING_RESPONSE);
            return TurnReply {
                response: GREETING_RESPONSE.into(),
                user_id: user_id.into(),
                outcome: TurnOutcome::Greeting,
                profile: Some(session.profile.clone()),
            };
        }

        let extraction = extract(input, &session.profile);
        if !extraction.newly_extracted.is_empty() {
            debug!(user_id, fields = ?extraction.newly_extracted, "Profile updated");
        }
        session.profile = extraction.profile;

        let system = self
            .assembler
            .assemble(&session.history, &session.profile, &extraction.newly_extracted);

        let mut messages = vec![Message::system(system)];
        messages.extend(session.history.recent(self.context_window).map(Message::from));
        messages.push(Message::user(input));

        let (response, outcome) =
            match self.completer.complete(messages, &self.options, cancel).await {
                Ok(text) => match usable_reply(text) {
                    Ok(text) => {
                        session.history.push_exchange(input, text.clone());
                        (text, TurnOutcome::Answered)
                    }
                    Err(e) => {
                        error!(user_id, error = %e, "Discarding completion");
                        (APOLOGY_REPLY.into(), TurnOutcome::Failed)
                    }
                },
                Err(e) => {
                    warn!(user_id, error = %e, "Completion failed, answering in degraded mode");
                    let (reply, outcome) = fallback_reply(&e);
                    (reply.into(), outcome)
                }
            };

        TurnReply {
            response,
            user_id: user_id.into(),
            outcome,
            profile: Some(session.profile.clone()),
        }
    }

    /// Current profile, or `None` if the user has no session.
    pub async fn profile(&self, user_id: &str) -> Option<UserProfile> {
        let session = self.store.lock_existing(user_id).await?;
        Some(session.profile.clone())
    }

    /// Current history, oldest first, or `None` if the user has no session.
    pub async fn history(&self, user_id: &str) -> Option<Vec<Turn>> {
        let session = self.store.lock_existing(user_id).await?;
        Some(session.history.to_vec())
    }

    /// Forget everything about `user_id`. No-op for unknown users.
    pub async fn reset(&self, user_id: &str) {
        self.store.reset(user_id).await;
        info!(user_id, "Session reset");
    }

    pub async fn session_count(&self) -> usize {
        self.store.len().await
    }
}

/// Trim a completion and reject it if nothing is left.
fn usable_reply(text: String) -> Result<String, SessionError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SessionError::MalformedCompletion("empty completion".into()));
    }
    Ok(trimmed.to_string())
}

/// User-facing text for a failed completion.
fn fallback_reply(error: &CompletionError) -> (&'static str, TurnOutcome) {
    match error {
        CompletionError::RetriesExhausted { .. }
        | CompletionError::Cancelled
        | CompletionError::DeadlineExceeded(_) => (CONNECTION_FAILURE_REPLY, TurnOutcome::Degraded),
        CompletionError::Rejected(e) if e.is_connectivity() => {
            (CONNECTION_FAILURE_REPLY, TurnOutcome::Degraded)
        }
        CompletionError::Rejected(ProviderError::MalformedResponse(_)) => {
            (APOLOGY_REPLY, TurnOutcome::Failed)
        }
        CompletionError::Rejected(_) => (SERVICE_FAILURE_REPLY, TurnOutcome::Degraded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{Behavior, RecordingProvider};
    use finguru_core::message::Role;
    use finguru_core::profile::{GoalTag, RiskTolerance};

    fn coordinator(provider: Arc<RecordingProvider>) -> SessionCoordinator {
        let store = Arc::new(SessionStore::new(10));
        SessionCoordinator::new(store, RetryingCompleter::new(provider, "mistral-tiny"))
    }

    #[tokio::test]
    async fn empty_input_touches_nothing() {
        let provider = Arc::new(RecordingProvider::replying("unused"));
        let coord = coordinator(provider.clone());

        let reply = coord.handle_turn("u1", "   ").await;
        assert_eq!(reply.response, EMPTY_INPUT_REPLY);
        assert_eq!(reply.outcome, TurnOutcome::EmptyInput);
        assert!(reply.profile.is_none());
        assert_eq!(coord.session_count().await, 0);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn greeting_short_circuits_pipeline() {
        let provider = Arc::new(RecordingProvider::replying("unused"));
        let coord = coordinator(provider.clone());

        let reply = coord.handle_turn("u1", "Hi").await;
        assert_eq!(reply.response, GREETING_RESPONSE);
        assert_eq!(reply.outcome, TurnOutcome::Greeting);
        assert_eq!(provider.call_count(), 0);

        let history = coord.history("u1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content(), "Hi");
        assert_eq!(history[1].content(), GREETING_RESPONSE);
        assert!(!coord.profile("u1").await.unwrap().has_any());
    }

    #[tokio::test]
    async fn successful_turn_updates_profile_and_history() {
        let provider = Arc::new(RecordingProvider::replying("  • Start a SIP\n"));
        let coord = coordinator(provider.clone());

        let reply = coord
            .handle_turn("u1", "I am 30 and earn 12 lakhs, saving for a house")
            .await;
        assert_eq!(reply.response, "• Start a SIP");
        assert_eq!(reply.outcome, TurnOutcome::Answered);
        assert_eq!(reply.user_id, "u1");

        let profile = reply.profile.unwrap();
        assert_eq!(profile.age, Some(30));
        assert_eq!(profile.income, Some(1_200_000.0));
        assert_eq!(profile.goals, vec![GoalTag::Home]);

        let request = provider.last_request().unwrap();
        assert_eq!(request.model, "mistral-tiny");
        assert_eq!(request.max_tokens, Some(600));
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.contains("NEWLY LEARNED: age, income, goal_home"));
        assert!(request.messages[0].content.contains("MISSING INFO: risk tolerance"));
        assert_eq!(request.messages[1].role, Role::User);

        let history = coord.history("u1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content(), "• Start a SIP");
    }

    #[tokio::test]
    async fn only_recent_window_is_sent() {
        let provider = Arc::new(RecordingProvider::replying("ok"));
        let coord = coordinator(provider.clone());

        for i in 0..6 {
            coord.handle_turn("u1", &format!("question number {i}")).await;
        }
        let request = provider.last_request().unwrap();
        // system + 6 history turns + current input
        assert_eq!(request.messages.len(), 8);
        assert_eq!(request.messages[1].content, "question number 2");
        assert_eq!(request.messages[7].content, "question number 5");
        assert!(request.messages[0].content.contains("PREVIOUS CONVERSATION CONTEXT"));
        assert_eq!(coord.history("u1").await.unwrap().len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_rate_limit_leaves_history_alone() {
        let provider = Arc::new(RecordingProvider::failing(ProviderError::RateLimited {
            retry_after_secs: 1,
        }));
        let coord = coordinator(provider.clone());

        let reply = coord.handle_turn("u1", "I prefer low risk options").await;
        assert_eq!(reply.response, CONNECTION_FAILURE_REPLY);
        assert_eq!(reply.outcome, TurnOutcome::Degraded);
        assert_eq!(provider.call_count(), 3);
        assert!(coord.history("u1").await.unwrap().is_empty());
        assert_eq!(
            coord.profile("u1").await.unwrap().risk_tolerance,
            Some(RiskTolerance::Conservative)
        );
    }

    #[tokio::test]
    async fn service_failure_steers_to_simple_question() {
        let provider = Arc::new(RecordingProvider::failing(ProviderError::AuthenticationFailed(
            "bad key".into(),
        )));
        let coord = coordinator(provider.clone());

        let reply = coord.handle_turn("u1", "How do I save tax?").await;
        assert_eq!(reply.response, SERVICE_FAILURE_REPLY);
        assert_eq!(provider.call_count(), 1);
        assert!(coord.history("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn network_failure_uses_connection_reply() {
        let provider = Arc::new(RecordingProvider::failing(ProviderError::Network(
            "connection refused".into(),
        )));
        let reply = coordinator(provider).handle_turn("u1", "What is SIP?").await;
        assert_eq!(reply.response, CONNECTION_FAILURE_REPLY);
    }

    #[tokio::test]
    async fn empty_completion_becomes_apology() {
        let provider = Arc::new(RecordingProvider::replying("   "));
        let coord = coordinator(provider);

        let reply = coord.handle_turn("u1", "What is SIP?").await;
        assert_eq!(reply.response, APOLOGY_REPLY);
        assert_eq!(reply.outcome, TurnOutcome::Failed);
        assert!(coord.history("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let provider = Arc::new(RecordingProvider::new(Behavior::Panic));
        let coord = coordinator(provider);

        let reply = coord.handle_turn("u1", "What is SIP?").await;
        assert_eq!(reply.response, APOLOGY_REPLY);
        assert_eq!(reply.outcome, TurnOutcome::Failed);
        assert_eq!(reply.user_id, "u1");

        // The session lock was released during unwinding.
        let again = coord.handle_turn("u1", "hello").await;
        assert_eq!(again.response, GREETING_RESPONSE);
    }

    #[tokio::test]
    async fn cancelled_turn_degrades() {
        let provider = Arc::new(RecordingProvider::replying("never seen"));
        let coord = coordinator(provider);
        let token = CancellationToken::new();
        token.cancel();

        let reply = coord
            .handle_turn_with_cancel("u1", "What is SIP?", &token)
            .await;
        assert_eq!(reply.response, CONNECTION_FAILURE_REPLY);
        assert!(coord.history("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_forgets_user() {
        let provider = Arc::new(RecordingProvider::replying("ok"));
        let coord = coordinator(provider);

        coord.reset("nobody").await;
        assert!(coord.profile("nobody").await.is_none());

        coord.handle_turn("u1", "I am 50 years old").await;
        assert!(coord.profile("u1").await.is_some());

        coord.reset("u1").await;
        assert!(coord.profile("u1").await.is_none());
        assert!(coord.history("u1").await.is_none());
        assert_eq!(coord.session_count().await, 0);

        coord.reset("u1").await;
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let provider = Arc::new(RecordingProvider::replying("ok"));
        let coord = coordinator(provider);

        coord.handle_turn("alice", "I am 25").await;
        coord.handle_turn("bob", "I am 60").await;

        assert_eq!(coord.profile("alice").await.unwrap().age, Some(25));
        assert_eq!(coord.profile("bob").await.unwrap().age, Some(60));
        assert_eq!(coord.session_count().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_turns_for_one_user_are_serialized() {
        let provider = Arc::new(RecordingProvider::replying("ok"));
        let coord = Arc::new(coordinator(provider.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let coord = coord.clone();
                tokio::spawn(async move {
                    coord.handle_turn("shared", &format!("message {i}")).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(provider.call_count(), 8);
        let history = coord.history("shared").await.unwrap();
        assert_eq!(history.len(), 10);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role(), Role::User);
            assert_eq!(pair[1].role(), Role::Assistant);
        }
    }
}
