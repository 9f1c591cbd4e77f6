//! Shared conversation and engine-state types.
//!
//! These types define stable contracts between the parser, dispatcher, and
//! loop driver. They carry no I/O and must stay deterministic.

use serde::{Deserialize, Serialize};

/// Originator of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role-tagged turn in the conversation history.
///
/// The history itself is a `Vec<Message>` owned by the loop driver:
/// append-only while a task is in flight, cleared exactly when a
/// task-finished signal is handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Handler-authoring state threaded through the dispatcher and loop driver.
///
/// At most one authoring session is in flight at a time, and the pending
/// handler name exists exactly while a session is active.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Authoring {
    #[default]
    Inactive,
    Pending {
        name: String,
    },
}

impl Authoring {
    pub fn begin(name: impl Into<String>) -> Self {
        Self::Pending { name: name.into() }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Return the pending handler name and reset to [`Authoring::Inactive`].
    ///
    /// The loop driver calls this once per model turn, so authoring mode is
    /// cleared no matter how synthesis goes.
    pub fn take(&mut self) -> Option<String> {
        match std::mem::take(self) {
            Self::Pending { name } => Some(name),
            Self::Inactive => None,
        }
    }
}
