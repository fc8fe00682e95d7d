use std::fmt;

use crate::error::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
    /// Inline notice for a turn whose backend call failed.
    Error,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::User => "user",
            Role::Model => "model",
            Role::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// One in-flight request handed to the backend client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTicket {
    pub id: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("message is empty")]
    Empty,
    #[error("a reply is still pending")]
    Busy,
}

/// Per-session chat state.
///
/// Sends are serialized: while one request is pending a new submit is
/// rejected, so replies always land in send order.
#[derive(Debug, Default)]
pub struct ChatEngine {
    messages: Vec<Message>,
    pending: Option<u64>,
    next_id: u64,
}

impl ChatEngine {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Accept a user turn: append it optimistically and hand back the ticket
    /// to send.
    pub fn submit(&mut self, text: &str) -> Result<ChatTicket, SubmitError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitError::Empty);
        }
        if self.pending.is_some() {
            return Err(SubmitError::Busy);
        }
        self.next_id += 1;
        let id = self.next_id;
        self.messages.push(Message::new(Role::User, text));
        self.pending = Some(id);
        tracing::debug!(id, "chat Idle -> Sending");
        Ok(ChatTicket {
            id,
            text: text.to_string(),
        })
    }

    /// Settle the pending request. On success returns the reply text, which
    /// becomes the reaction description. Replies for unknown ids are dropped.
    pub fn resolve(&mut self, id: u64, result: Result<String, BackendError>) -> Option<String> {
        if self.pending != Some(id) {
            tracing::warn!(id, "dropping reply for a request that is not pending");
            return None;
        }
        self.pending = None;
        match result {
            Ok(reply) => {
                tracing::debug!(id, "chat Sending -> Replied");
                self.messages.push(Message::new(Role::Model, reply.clone()));
                Some(reply)
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "chat Sending -> Failed");
                self.messages
                    .push(Message::new(Role::Error, format!("Couldn't reach Rin: {e}")));
                None
            }
        }
    }
}
