//! Optimistic mutations with rollback.
//!
//! Every mutation goes through `with_optimistic_update`: apply the
//! local effect, issue the remote call, then either commit the server's
//! answer or revert the local effect. At most one mutation per target id is
//! outstanding at any time.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::future::Future;

use serde_json::json;
use tracing::{debug, info, warn};

use super::fetch::{ensure_success, parse_record};
use super::{Collections, Console, ConsoleError, Notice, ValidationError};
use crate::amount::Amount;
use crate::model::{CollectionKind, MutationKind, PendingKind, Record, RecordId, Target, WalletAction};
use crate::transport::{ApiRequest, Transport};

/// Body sent with every approve/reject call.
const DECISION_NOTE: &str = "processed by admin";

/// A mutation between its optimistic step and the settlement of its remote
/// call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    pub kind: MutationKind,
    pub target: Target,
}

/// Per-target transient state: in-flight locks and wallet amount drafts.
#[derive(Debug, Default)]
pub struct MutationCoordinator {
    in_flight: HashMap<RecordId, PendingMutation>,
    amount_inputs: HashMap<RecordId, String>,
}

impl MutationCoordinator {
    pub fn is_in_flight(&self, id: &RecordId) -> bool {
        self.in_flight.contains_key(id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingMutation> + '_ {
        self.in_flight.values()
    }

    pub fn set_amount_input(&mut self, wallet: RecordId, text: impl Into<String>) {
        self.amount_inputs.insert(wallet, text.into());
    }

    pub fn amount_input(&self, wallet: &RecordId) -> Option<&str> {
        self.amount_inputs.get(wallet).map(String::as_str)
    }

    /// Lock `pending.target` for the duration of one remote call.
    fn begin(&mut self, pending: PendingMutation) -> Result<(), ConsoleError> {
        match self.in_flight.entry(pending.target.id().clone()) {
            Entry::Occupied(entry) => Err(ConsoleError::InFlight(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(pending);
                Ok(())
            }
        }
    }

    fn settle(&mut self, id: &RecordId) {
        self.in_flight.remove(id);
    }

    /// Validated amount drafted for a wallet row.
    fn amount_for(&self, wallet: &RecordId) -> Result<Amount, ValidationError> {
        let text = self
            .amount_inputs
            .get(wallet)
            .ok_or_else(|| ValidationError::MissingAmount(wallet.clone()))?;
        Ok(Amount::parse_positive(text)?)
    }

    fn clear_amount(&mut self, wallet: &RecordId) {
        self.amount_inputs.remove(wallet);
    }

    pub(super) fn clear_inputs(&mut self) {
        self.amount_inputs.clear();
    }
}

/// Mutation API
impl<T: Transport> Console<T> {
    /// Draft the amount for a wallet row's next credit/debit.
    pub fn set_amount_input(&self, wallet: &RecordId, text: &str) {
        self.lock().mutations.set_amount_input(wallet.clone(), text);
    }

    pub fn amount_input(&self, wallet: &RecordId) -> Option<String> {
        self.lock().mutations.amount_input(wallet).map(str::to_string)
    }

    pub fn is_in_flight(&self, id: &RecordId) -> bool {
        self.lock().mutations.is_in_flight(id)
    }

    pub fn pending_mutations(&self) -> Vec<PendingMutation> {
        self.lock().mutations.pending().cloned().collect()
    }

    /// Run a mutation right away. Reached only through [`Console::request`]
    /// and [`Console::confirm`], which enforce the confirmation gate.
    ///
    /// Posts a success or error [`Notice`]. A session expiry posts nothing:
    /// local state is discarded and the caller redirects to sign-in.
    pub(super) async fn mutate(&self, action: MutationKind, target: Target) -> Result<(), ConsoleError> {
        self.ensure_admin()?;

        let result = match (action, &target) {
            (MutationKind::Approve | MutationKind::Reject, Target::Pending { kind, id }) => {
                self.decide(action, *kind, id).await
            }
            (MutationKind::Credit | MutationKind::Debit, Target::Wallet { id }) => {
                self.adjust_wallet(action, id).await
            }
            _ => Err(ValidationError::UnsupportedTarget(action, target.clone()).into()),
        };

        self.report(action, &target, &result);
        result
    }
}

/// Private API
impl<T: Transport> Console<T> {
    /// Approve or reject a pending deposit/withdrawal.
    ///
    /// The item leaves its pending collection before the call; an approval
    /// prepends the server's transaction record on success.
    async fn decide(
        &self,
        action: MutationKind,
        kind: PendingKind,
        id: &RecordId,
    ) -> Result<(), ConsoleError> {
        let collection = kind.collection();
        let path = format!("/api/admin/{}/{}/{}", kind.path_segment(), action.verb(), id);
        let request = ApiRequest::put(path, json!({ "note": DECISION_NOTE }));

        let remote = self.send_decision(action, request);

        self.with_optimistic_update(
            PendingMutation {
                kind: action,
                target: Target::Pending {
                    kind,
                    id: id.clone(),
                },
            },
            |collections| collections.remove(collection, id),
            remote,
            |collections, transaction: Option<Record>| {
                if let Some(transaction) = transaction {
                    collections.prepend(CollectionKind::Transactions, transaction);
                }
            },
            |collections, removed| {
                if let Some(removed) = removed {
                    collections.restore(collection, removed);
                }
            },
        )
        .await
    }

    /// Credit or debit a wallet by its drafted amount.
    ///
    /// No numeric change is applied locally; the wallet row is only locked
    /// until the server returns the updated wallet.
    async fn adjust_wallet(&self, action: MutationKind, id: &RecordId) -> Result<(), ConsoleError> {
        let amount = self.lock().mutations.amount_for(id)?;
        let wallet_action = match action {
            MutationKind::Debit => WalletAction::Reduce,
            _ => WalletAction::Topup,
        };
        let request = ApiRequest::put(
            format!("/api/admin/wallets/{id}"),
            json!({ "amount": amount, "action": wallet_action }),
        );

        let remote = self.send_wallet_update(request);

        self.with_optimistic_update(
            PendingMutation {
                kind: action,
                target: Target::Wallet { id: id.clone() },
            },
            |_| (),
            remote,
            |collections, wallet| {
                if !collections.replace_item(CollectionKind::Wallets, wallet) {
                    debug!(wallet = %id, "updated wallet is not loaded locally");
                }
            },
            |_, ()| {},
        )
        .await?;

        self.lock().mutations.clear_amount(id);
        Ok(())
    }

    async fn send_decision(
        &self,
        action: MutationKind,
        request: ApiRequest,
    ) -> Result<Option<Record>, ConsoleError> {
        let response = ensure_success(self.guard.send(request).await?)?;
        match action {
            MutationKind::Approve => parse_record("approve", &response.body).map(Some),
            _ => Ok(None),
        }
    }

    async fn send_wallet_update(&self, request: ApiRequest) -> Result<Record, ConsoleError> {
        let response = ensure_success(self.guard.send(request).await?)?;
        parse_record("wallet update", &response.body)
    }

    /// Apply `apply` now, run `remote`, then `commit` its output or `revert`
    /// with what `apply` returned.
    ///
    /// Results that settle after the console was invalidated are dropped
    /// without touching state.
    async fn with_optimistic_update<S, O, Fut>(
        &self,
        pending: PendingMutation,
        apply: impl FnOnce(&mut Collections) -> S,
        remote: Fut,
        commit: impl FnOnce(&mut Collections, O),
        revert: impl FnOnce(&mut Collections, S),
    ) -> Result<(), ConsoleError>
    where
        Fut: Future<Output = Result<O, ConsoleError>>,
    {
        let id = pending.target.id().clone();
        let (snapshot, epoch) = {
            let mut state = self.lock();
            state.mutations.begin(pending)?;
            let snapshot = apply(&mut state.collections);
            (snapshot, state.epoch)
        };

        let result = remote.await;

        let mut state = self.lock();
        state.mutations.settle(&id);
        if state.epoch != epoch {
            return match result {
                Err(ConsoleError::SessionExpired) => Err(ConsoleError::SessionExpired),
                _ => Err(ConsoleError::Stale),
            };
        }
        match result {
            Ok(output) => {
                commit(&mut state.collections, output);
                Ok(())
            }
            Err(e) => {
                revert(&mut state.collections, snapshot);
                Err(e)
            }
        }
    }

    fn report(&self, action: MutationKind, target: &Target, result: &Result<(), ConsoleError>) {
        match result {
            Ok(()) => {
                info!(%action, %target, "mutation committed");
                self.lock().post(Notice::success(success_message(action)));
            }
            Err(e) if e.requires_sign_in() => {
                warn!(%action, %target, "session expired during mutation, discarding local state");
                self.invalidate();
            }
            Err(ConsoleError::Stale) => {
                info!(%action, %target, "mutation settled after reset, result dropped");
            }
            Err(e @ ConsoleError::InFlight(_)) => {
                info!(%action, %target, reason = %e, "mutation skipped");
            }
            Err(e @ ConsoleError::Validation(_)) => {
                info!(%action, %target, reason = %e, "mutation rejected locally");
                self.lock().post(Notice::error(e.to_string()));
            }
            Err(e) => {
                warn!(%action, %target, reason = %e, "mutation rolled back");
                self.lock()
                    .post(Notice::error(format!("Failed to {action}: {e}")));
            }
        }
    }
}

fn success_message(action: MutationKind) -> &'static str {
    match action {
        MutationKind::Approve => "approved successfully",
        MutationKind::Reject => "rejected successfully",
        MutationKind::Credit => "Wallet credited successfully",
        MutationKind::Debit => "Wallet reduced successfully",
    }
}
