//! Session guard: attaches the bearer credential to every request and turns
//! 401/403 into a cleared session.

use tokio::sync::watch;
use tracing::warn;

use super::ConsoleError;
use crate::session::Session;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Wraps a [`Transport`] with the current [`Session`].
///
/// The session lives in a watch channel: subscribers observe `None` as soon
/// as the session is invalidated, which is the signal to go back to sign-in.
pub struct SessionGuard<T> {
    transport: T,
    session: watch::Sender<Option<Session>>,
}

impl<T: Transport> SessionGuard<T> {
    pub fn new(transport: T, session: Option<Session>) -> Self {
        let (session, _) = watch::channel(session);
        Self { transport, session }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    pub fn is_present(&self) -> bool {
        self.session.borrow().is_some()
    }

    /// True when a session is present and carries the ADMIN role.
    pub fn is_admin(&self) -> bool {
        self.session.borrow().as_ref().is_some_and(Session::is_admin)
    }

    pub fn sign_in(&self, session: Session) {
        self.session.send_replace(Some(session));
    }

    pub fn sign_out(&self) {
        self.session.send_replace(None);
    }

    /// Send a request, authenticated when a session is present.
    ///
    /// A 401/403 answer clears the session and yields
    /// [`ConsoleError::SessionExpired`]; there is no retry or refresh.
    /// Every other status is handed back to the caller untouched.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ConsoleError> {
        request.bearer = self
            .session
            .borrow()
            .as_ref()
            .map(|session| session.token().clone());
        let path = request.path.clone();

        let response = self.transport.execute(request).await?;

        if response.is_unauthorized() {
            warn!(path = %path, status = response.status, "unauthorized, clearing session");
            self.sign_out();
            return Err(ConsoleError::SessionExpired);
        }
        Ok(response)
    }
}
