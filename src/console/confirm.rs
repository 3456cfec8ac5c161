//! Yes/no checkpoint in front of destructive actions.

use super::ConsoleError;
use crate::model::{MutationKind, Target};

/// Which mutation kinds must be confirmed before they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub approve: bool,
    pub reject: bool,
    pub credit: bool,
    pub debit: bool,
}

impl ConfirmationPolicy {
    /// Every destructive action asks first.
    pub fn all() -> Self {
        Self {
            approve: true,
            reject: true,
            credit: true,
            debit: true,
        }
    }

    pub fn requires_confirmation(&self, kind: MutationKind) -> bool {
        match kind {
            MutationKind::Approve => self.approve,
            MutationKind::Reject => self.reject,
            MutationKind::Credit => self.credit,
            MutationKind::Debit => self.debit,
        }
    }
}

/// Approve and reject ask; wallet adjustments go straight through.
impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            approve: true,
            reject: true,
            credit: false,
            debit: false,
        }
    }
}

/// An action waiting for the operator's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub action: MutationKind,
    pub target: Target,
}

/// Holds at most one [`ConfirmationRequest`] at a time.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationGate {
    policy: ConfirmationPolicy,
    pending: Option<ConfirmationRequest>,
}

impl ConfirmationGate {
    pub fn new(policy: ConfirmationPolicy) -> Self {
        Self {
            policy,
            pending: None,
        }
    }

    pub fn requires_confirmation(&self, kind: MutationKind) -> bool {
        self.policy.requires_confirmation(kind)
    }

    pub fn pending(&self) -> Option<&ConfirmationRequest> {
        self.pending.as_ref()
    }

    /// Open a request. Fails while another one is outstanding.
    pub fn request(&mut self, action: MutationKind, target: Target) -> Result<(), ConsoleError> {
        if self.pending.is_some() {
            return Err(ConsoleError::ConfirmationPending);
        }
        self.pending = Some(ConfirmationRequest { action, target });
        Ok(())
    }

    /// Take the pending request so it can be executed.
    pub fn confirm(&mut self) -> Option<ConfirmationRequest> {
        self.pending.take()
    }

    /// Drop the pending request without side effects.
    pub fn cancel(&mut self) -> Option<ConfirmationRequest> {
        self.pending.take()
    }
}
