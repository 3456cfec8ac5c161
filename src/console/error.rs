//! Error types for the console core.

use thiserror::Error;

use crate::amount::AmountError;
use crate::model::{MutationKind, RecordId, Target};
use crate::transport::TransportError;

/// Top-level error returned by console operations.
#[derive(Debug, Clone, Error)]
pub enum ConsoleError {
    /// The server answered 401/403. The session is gone and the caller must
    /// send the operator back to sign-in.
    #[error("session expired")]
    SessionExpired,

    /// No admin session is present; nothing was sent.
    #[error("sign in as an administrator to use the console")]
    SignInRequired,

    #[error("network failure: {0}")]
    Network(#[from] TransportError),

    #[error("server error: {status} {body}")]
    Rejected { status: u16, body: String },

    #[error("{context} did not return the expected JSON: {excerpt}")]
    MalformedResponse { context: String, excerpt: String },

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("a mutation on {0} is already in flight")]
    InFlight(RecordId),

    #[error("another action is awaiting confirmation")]
    ConfirmationPending,

    /// The console was invalidated while the request was outstanding; its
    /// result was dropped.
    #[error("response arrived after the console was reset")]
    Stale,
}

impl ConsoleError {
    /// Errors whose only sensible reaction is a redirect to sign-in.
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, ConsoleError::SessionExpired | ConsoleError::SignInRequired)
    }
}

/// Input rejected locally, before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Enter a valid amount: {0}")]
    Amount(#[from] AmountError),

    #[error("Enter a valid amount: no amount entered for wallet {0}")]
    MissingAmount(RecordId),

    #[error("cannot {0} {1}")]
    UnsupportedTarget(MutationKind, Target),
}
