//! Transport failure classification.
//!
//! Connectors that know why a send failed attach a structured
//! [`FailureKind`]; for those that only surface a human-readable message, the
//! permanent-failure vocabulary below is matched as a fallback.

use thiserror::Error;

/// Message fragments that mark a recipient as permanently unreachable.
///
/// Matched case-insensitively against connector error messages when no
/// structured classification is available. Wording tracks the upstream
/// messaging APIs.
pub const PERMANENT_FAILURE_SIGNATURES: &[&str] = &[
    "blocked by the user",
    "user is deactivated",
    "is deactivated",
    "chat not found",
    "forbidden: bot was blocked",
    "bot was kicked",
];

/// Whether a failed send is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Retries may succeed (network blip, upstream 5xx, flood control).
    Transient,
    /// Retries cannot succeed (recipient blocked the bot, chat deleted).
    Permanent,
}

/// Error returned by a [`Transport`](crate::transport::Transport) call.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Human-readable failure message from the remote API or connector.
    pub message: String,
    /// Structured classification, when the connector knows it.
    pub kind: Option<FailureKind>,
}

impl TransportError {
    /// An error the connector already knows is retryable.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: Some(FailureKind::Transient),
        }
    }

    /// An error the connector already knows is terminal.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: Some(FailureKind::Permanent),
        }
    }

    /// An unclassified error; classification falls back to the
    /// permanent-failure vocabulary.
    pub fn api(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
        }
    }

    /// Classify this failure.
    ///
    /// A structured [`FailureKind`] from the connector wins; otherwise the
    /// message is matched case-insensitively against
    /// [`PERMANENT_FAILURE_SIGNATURES`].
    pub fn classify(&self) -> FailureKind {
        if let Some(kind) = self.kind {
            return kind;
        }
        let message = self.message.to_lowercase();
        if PERMANENT_FAILURE_SIGNATURES
            .iter()
            .any(|signature| message.contains(signature))
        {
            FailureKind::Permanent
        } else {
            FailureKind::Transient
        }
    }

    /// Whether retrying this send cannot succeed.
    pub fn is_permanent(&self) -> bool {
        self.classify() == FailureKind::Permanent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_kind_wins_over_message() {
        let err = TransportError::permanent("rate limited, retry later");
        assert_eq!(err.classify(), FailureKind::Permanent);

        let err = TransportError::transient("Forbidden: bot was blocked by the user");
        assert_eq!(err.classify(), FailureKind::Transient);
    }

    #[test]
    fn test_substring_fallback_is_case_insensitive() {
        let err = TransportError::api("Forbidden: Bot Was BLOCKED by the user");
        assert!(err.is_permanent());

        let err = TransportError::api("Bad Request: CHAT NOT FOUND");
        assert!(err.is_permanent());
    }

    #[test]
    fn test_unmatched_messages_are_transient() {
        let err = TransportError::api("Gateway timeout");
        assert_eq!(err.classify(), FailureKind::Transient);

        let err = TransportError::api("Too Many Requests: retry after 5");
        assert_eq!(err.classify(), FailureKind::Transient);
    }

    #[test]
    fn test_deactivated_recipient_is_permanent() {
        let err = TransportError::api("Forbidden: user is deactivated");
        assert!(err.is_permanent());
    }
}
