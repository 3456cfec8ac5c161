//! Console data-synchronization core.
//!
//! The [`Console`] keeps the five admin collections in sync with the remote
//! service, serves paginated/filtered views over them, and runs
//! approve/reject/credit/debit mutations optimistically with rollback.
//! All shared state sits behind one lock that is never held across a
//! network call, so independent actions can overlap while each network
//! round-trip is outstanding.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::model::{CollectionKind, MutationKind, Record, Target};
use crate::transport::Transport;

mod confirm;
pub use confirm::{ConfirmationGate, ConfirmationPolicy, ConfirmationRequest};

mod error;
pub use error::{ConsoleError, ValidationError};

mod fetch;
pub use fetch::{CollectionSpec, LoadPolicy, LoadReport, ResourceFetcher, excerpt, normalize};

mod guard;
pub use guard::SessionGuard;

mod mutation;
pub use mutation::{MutationCoordinator, PendingMutation};

mod notice;
pub use notice::{NOTICE_LIFETIME, Notice, Severity};

mod query;
pub use query::{PAGE_SIZE, QueryState, QueryView, SEARCH_DEBOUNCE, SearchDebouncer, view};

mod state;
pub use state::{Collections, Removed};

/// What happened to a destructive action handed to [`Console::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Parked in the confirmation gate.
    AwaitingConfirmation,
    /// Ran to completion.
    Completed,
}

/// Everything the console mutates, guarded by a single lock.
#[derive(Debug)]
struct ConsoleState {
    collections: Collections,
    /// Bumped whenever local state is thrown away; responses issued under an
    /// older epoch are dropped when they settle.
    epoch: u64,
    loading: bool,
    load_errors: HashMap<CollectionKind, String>,
    query: QueryState,
    gate: ConfirmationGate,
    mutations: MutationCoordinator,
    notice: Option<Notice>,
}

impl ConsoleState {
    fn new(confirmation: ConfirmationPolicy) -> Self {
        Self {
            collections: Collections::default(),
            epoch: 0,
            loading: false,
            load_errors: HashMap::new(),
            query: QueryState::default(),
            gate: ConfirmationGate::new(confirmation),
            mutations: MutationCoordinator::default(),
            notice: None,
        }
    }

    fn post(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    /// Drop every piece of local state. In-flight flags are kept: they
    /// track real outstanding requests and are released when those settle.
    fn discard(&mut self) {
        self.collections.clear();
        self.epoch += 1;
        self.loading = false;
        self.load_errors.clear();
        self.gate.cancel();
        self.mutations.clear_inputs();
        self.notice = None;
    }
}

/// The admin console core.
pub struct Console<T> {
    guard: SessionGuard<T>,
    fetcher: ResourceFetcher,
    state: Mutex<ConsoleState>,
}

/// Public API
impl<T: Transport> Console<T> {
    pub fn new(
        guard: SessionGuard<T>,
        fetcher: ResourceFetcher,
        confirmation: ConfirmationPolicy,
    ) -> Self {
        Self {
            guard,
            fetcher,
            state: Mutex::new(ConsoleState::new(confirmation)),
        }
    }

    pub fn guard(&self) -> &SessionGuard<T> {
        &self.guard
    }

    /// The console only runs for a present ADMIN session.
    pub fn ensure_admin(&self) -> Result<(), ConsoleError> {
        if self.guard.is_admin() {
            Ok(())
        } else {
            Err(ConsoleError::SignInRequired)
        }
    }

    /// Reload every collection.
    ///
    /// Loaded collections replace the previous contents wholesale, all under
    /// one lock. Under [`LoadPolicy::PerCollection`] failed collections keep
    /// their previous contents and record an error instead.
    pub async fn refresh(&self) -> Result<(), ConsoleError> {
        if let Err(e) = self.ensure_admin() {
            self.invalidate();
            return Err(e);
        }

        let epoch = {
            let mut state = self.lock();
            state.loading = true;
            state.epoch
        };

        let result = self.fetcher.load(&self.guard).await;

        let mut state = self.lock();
        if state.epoch != epoch {
            debug!("discarding load result issued before reset");
            return match result {
                Err(ConsoleError::SessionExpired) => Err(ConsoleError::SessionExpired),
                _ => Err(ConsoleError::Stale),
            };
        }
        state.loading = false;

        match result {
            Ok(report) => {
                for (kind, items) in report.loaded {
                    state.load_errors.remove(&kind);
                    state.collections.replace(kind, items);
                }
                if !report.failed.is_empty() {
                    let summary = report
                        .failed
                        .iter()
                        .map(|(kind, e)| format!("{}: {e}", kind.label()))
                        .collect::<Vec<_>>()
                        .join("; ");
                    for (kind, e) in report.failed {
                        state.load_errors.insert(kind, e.to_string());
                    }
                    state.post(Notice::error(summary));
                }
                info!(epoch, "collections refreshed");
                Ok(())
            }
            Err(ConsoleError::SessionExpired) => {
                warn!("session expired while loading, discarding local state");
                state.discard();
                Err(ConsoleError::SessionExpired)
            }
            Err(e) => {
                state.post(Notice::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Throw away local state, e.g. when the screen is left. Responses that
    /// are still in flight are ignored when they arrive.
    pub fn invalidate(&self) {
        self.lock().discard();
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Error recorded by the last per-collection load, if it failed.
    pub fn load_error(&self, kind: CollectionKind) -> Option<String> {
        self.lock().load_errors.get(&kind).cloned()
    }

    /// Copy of one collection as currently held.
    pub fn collection(&self, kind: CollectionKind) -> Vec<Record> {
        self.lock().collections.get(kind).to_vec()
    }

    /// Item count per collection, for the summary cards.
    pub fn counts(&self) -> Vec<(CollectionKind, usize)> {
        let state = self.lock();
        CollectionKind::ALL
            .into_iter()
            .map(|kind| (kind, state.collections.count(kind)))
            .collect()
    }

    pub fn active(&self) -> CollectionKind {
        self.lock().query.active()
    }

    pub fn select(&self, kind: CollectionKind) {
        self.lock().query.select(kind);
    }

    pub fn set_page(&self, page: usize) {
        self.lock().query.set_page(page);
    }

    pub fn next_page(&self) {
        let mut state = self.lock();
        let total_pages = state
            .query
            .view(state.collections.get(state.query.active()))
            .total_pages;
        state.query.next_page(total_pages);
    }

    pub fn prev_page(&self) {
        self.lock().query.prev_page();
    }

    /// Feed raw search input; it takes effect on a later [`tick`](Self::tick).
    pub fn input_search(&self, text: &str, now: Instant) {
        self.lock().query.input_search(text, now);
    }

    /// When the pending search input settles, if any.
    pub fn search_deadline(&self) -> Option<Instant> {
        self.lock().query.search_deadline()
    }

    /// Advance time-driven state: debounced search and notice expiry.
    /// Returns true when the search term changed.
    pub fn tick(&self, now: Instant) -> bool {
        let mut state = self.lock();
        if state.notice.as_ref().is_some_and(|n| n.is_expired(now)) {
            state.notice = None;
        }
        state.query.tick(now)
    }

    /// Evaluate the active collection under the current page and search.
    pub fn with_view<R>(&self, f: impl FnOnce(&QueryView<'_>) -> R) -> R {
        let state = self.lock();
        let view = state.query.view(state.collections.get(state.query.active()));
        f(&view)
    }

    pub fn notice(&self) -> Option<Notice> {
        self.lock().notice.clone()
    }

    pub fn dismiss_notice(&self) {
        self.lock().notice = None;
    }

    pub fn pending_confirmation(&self) -> Option<ConfirmationRequest> {
        self.lock().gate.pending().cloned()
    }

    pub fn requires_confirmation(&self, action: MutationKind) -> bool {
        self.lock().gate.requires_confirmation(action)
    }

    /// Ask for a destructive action.
    ///
    /// Actions the policy gates are parked until [`confirm`](Self::confirm)
    /// or [`cancel`](Self::cancel); the rest run immediately. Nothing new
    /// runs while a confirmation is outstanding.
    pub async fn request(
        &self,
        action: MutationKind,
        target: Target,
    ) -> Result<Dispatch, ConsoleError> {
        self.ensure_admin()?;
        {
            let mut state = self.lock();
            if state.gate.pending().is_some() {
                return Err(ConsoleError::ConfirmationPending);
            }
            if state.gate.requires_confirmation(action) {
                info!(%action, %target, "awaiting confirmation");
                state.gate.request(action, target)?;
                return Ok(Dispatch::AwaitingConfirmation);
            }
        }
        self.mutate(action, target).await?;
        Ok(Dispatch::Completed)
    }

    /// Run the parked action. Returns false when nothing was pending.
    pub async fn confirm(&self) -> Result<bool, ConsoleError> {
        let pending = self.lock().gate.confirm();
        match pending {
            Some(request) => {
                self.mutate(request.action, request.target).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop the parked action. Returns false when nothing was pending.
    pub fn cancel(&self) -> bool {
        let cancelled = self.lock().gate.cancel();
        if let Some(request) = &cancelled {
            info!(action = %request.action, target = %request.target, "confirmation cancelled");
        }
        cancelled.is_some()
    }
}

/// Private API
impl<T: Transport> Console<T> {
    fn lock(&self) -> MutexGuard<'_, ConsoleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
