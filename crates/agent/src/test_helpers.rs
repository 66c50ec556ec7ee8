//! Shared test helpers for coordinator tests.

use finguru_core::error::ProviderError;
use finguru_core::message::Message;
use finguru_core::provider::{Provider, ProviderRequest, ProviderResponse};
use std::sync::Mutex;

/// What the mock does on every call.
#[derive(Clone)]
pub enum Behavior {
    Reply(String),
    Fail(ProviderError),
    Panic,
}

/// A provider that records every request and answers with a fixed behavior.
pub struct RecordingProvider {
    behavior: Behavior,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl RecordingProvider {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(Behavior::Reply(text.into()))
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(Behavior::Fail(error))
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        "recording_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        match &self.behavior {
            Behavior::Reply(text) => Ok(ProviderResponse {
                message: Message::assistant(text.clone()),
                usage: None,
                model,
            }),
            Behavior::Fail(error) => Err(error.clone()),
            Behavior::Panic => panic!("provider blew up"),
        }
    }
}
