//! Transport seam between the delivery pipeline and platform connectors.
//!
//! Platform connector implementations (Telegram, Discord, ...) live outside
//! this crate; they implement [`Transport`] and report failures as
//! [`TransportError`] values, with a structured [`FailureKind`] where the
//! remote API provides one.

pub mod error;

pub use error::{FailureKind, TransportError, PERMANENT_FAILURE_SIGNATURES};

use async_trait::async_trait;
use serde_json::Value;

/// Chat actions a connector can signal while the bot is working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatAction {
    /// The bot is composing a text reply.
    Typing,
    /// The bot is uploading a photo.
    UploadingPhoto,
    /// The bot is recording a voice message.
    RecordingVoice,
}

impl ChatAction {
    /// Wire name understood by the remote APIs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::UploadingPhoto => "upload_photo",
            Self::RecordingVoice => "record_voice",
        }
    }
}

impl std::fmt::Display for ChatAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of remote API operations the batcher can coalesce.
///
/// Dispatch is an exhaustive `match`, so adding an operation here forces
/// every call site to handle it.
#[derive(Debug, Clone)]
pub enum ApiCall {
    /// Deliver a text message to a chat.
    SendMessage {
        target: String,
        text: String,
        options: Option<Value>,
    },
    /// Replace the text of a previously sent message.
    EditMessage {
        target: String,
        message_id: String,
        text: String,
    },
    /// Delete a previously sent message.
    DeleteMessage {
        target: String,
        message_id: String,
    },
    /// Signal a chat action (typing indicator and friends).
    SendChatAction {
        target: String,
        action: ChatAction,
    },
}

impl ApiCall {
    /// Stable method name for logs and metrics.
    pub const fn method(&self) -> &'static str {
        match self {
            Self::SendMessage { .. } => "send_message",
            Self::EditMessage { .. } => "edit_message",
            Self::DeleteMessage { .. } => "delete_message",
            Self::SendChatAction { .. } => "send_chat_action",
        }
    }

    /// The chat or user the call is addressed to.
    pub fn target(&self) -> &str {
        match self {
            Self::SendMessage { target, .. }
            | Self::EditMessage { target, .. }
            | Self::DeleteMessage { target, .. }
            | Self::SendChatAction { target, .. } => target,
        }
    }
}

/// Outbound send surface implemented by platform connectors.
///
/// Every method resolves to the remote API's response payload on success and
/// a classified [`TransportError`] on failure.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a text message to `target`.
    async fn send_message(
        &self,
        target: &str,
        text: &str,
        options: Option<&Value>,
    ) -> Result<Value, TransportError>;

    /// Edit a previously sent message.
    async fn edit_message(
        &self,
        target: &str,
        message_id: &str,
        text: &str,
    ) -> Result<Value, TransportError>;

    /// Delete a previously sent message.
    async fn delete_message(&self, target: &str, message_id: &str)
        -> Result<Value, TransportError>;

    /// Signal a chat action to `target`.
    async fn send_chat_action(
        &self,
        target: &str,
        action: ChatAction,
    ) -> Result<Value, TransportError>;
}
