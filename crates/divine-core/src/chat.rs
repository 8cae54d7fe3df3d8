//! Chat session: the ordered transcript and the streaming merge rule.
//!
//! Each user turn appends one `user` entry. The reply is a single `model`
//! entry that is replaced in place on every fragment, so one streamed answer
//! never occupies more than one slot.

use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::gateway::AiGateway;
use crate::lifecycle::{FeatureError, Submission};

pub const CHAT_FAILURE_NOTICE: &str = "Neural link unstable. Recalibrate and retry.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Replace the trailing model entry, or append one if the tail is a user entry.
pub fn merge_model_text(messages: &mut Vec<ChatMessage>, text: &str) {
    match messages.last_mut() {
        Some(last) if last.role == Role::Model => last.text = text.to_string(),
        _ => messages.push(ChatMessage::model(text)),
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatState {
    pub messages: Vec<ChatMessage>,
    pub busy: bool,
    pub last_error: Option<FeatureError>,
}

/// Chat feature. Cloning shares the same transcript.
#[derive(Clone, Default)]
pub struct ChatSession {
    state: Arc<Mutex<ChatState>>,
}

struct BusyGuard<'a>(&'a Mutex<ChatState>);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut s) = self.0.lock() {
            s.busy = false;
        }
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ChatState {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.snapshot().messages
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().map(|s| s.busy).unwrap_or(false)
    }

    /// Send `input` and stream the reply into the transcript.
    ///
    /// `on_fragment` sees the accumulated reply after every fragment.
    pub async fn submit_with<F>(&self, gateway: &dyn AiGateway, input: &str, mut on_fragment: F) -> Submission
    where
        F: FnMut(&str) + Send,
    {
        let text = input.trim();
        if text.is_empty() {
            return Submission::Rejected(ValidationError::EmptyInput { field: "message" });
        }

        let history = {
            let Ok(mut s) = self.state.lock() else {
                return Submission::Rejected(ValidationError::Busy { feature: "chat" });
            };
            if s.busy {
                return Submission::Rejected(ValidationError::Busy { feature: "chat" });
            }
            s.busy = true;
            s.last_error = None;
            let history = s.messages.clone();
            s.messages.push(ChatMessage::user(input));
            history
        };
        let _guard = BusyGuard(&self.state);

        tracing::info!(target: "divine::lifecycle", feature = "chat", turns = history.len(), "submitting chat turn");

        let mut reply = String::new();
        let result = match gateway.stream_chat(&history, input).await {
            Ok(mut stream) => {
                let mut outcome = Ok(());
                while let Some(fragment) = stream.next().await {
                    match fragment {
                        Ok(piece) => {
                            if piece.is_empty() {
                                continue;
                            }
                            reply.push_str(&piece);
                            if let Ok(mut s) = self.state.lock() {
                                merge_model_text(&mut s.messages, &reply);
                            }
                            on_fragment(&reply);
                        }
                        Err(e) => {
                            outcome = Err(e);
                            break;
                        }
                    }
                }
                outcome
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => Submission::Settled,
            Err(e) => {
                tracing::warn!(target: "divine::lifecycle", feature = "chat", error = %e, "chat stream failed");
                if let Ok(mut s) = self.state.lock() {
                    merge_model_text(&mut s.messages, CHAT_FAILURE_NOTICE);
                    s.last_error = Some(FeatureError::new(CHAT_FAILURE_NOTICE, &e));
                }
                Submission::Failed
            }
        }
    }

    pub async fn submit(&self, gateway: &dyn AiGateway, input: &str) -> Submission {
        self.submit_with(gateway, input, |_| {}).await
    }

    pub fn clear(&self) {
        if let Ok(mut s) = self.state.lock() {
            if !s.busy {
                s.messages.clear();
                s.last_error = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_appends_after_user_and_replaces_model() {
        let mut msgs = vec![ChatMessage::user("hi")];
        merge_model_text(&mut msgs, "He");
        merge_model_text(&mut msgs, "Hello");
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1], ChatMessage::model("Hello"));
    }

    #[test]
    fn merge_into_empty_transcript_appends() {
        let mut msgs = Vec::new();
        merge_model_text(&mut msgs, "x");
        assert_eq!(msgs, vec![ChatMessage::model("x")]);
    }
}
