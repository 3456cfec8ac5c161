#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use admin_console::console::{
    CollectionSpec, ConfirmationPolicy, LoadPolicy, ResourceFetcher, SessionGuard,
};
use admin_console::transport::{ApiRequest, ApiResponse, Method, Transport, TransportError};
use admin_console::{CollectionKind, Console, Role, Session};
use tokio::sync::Notify;

pub const TOKEN: &str = "test-token";

#[derive(Debug, Clone)]
enum Reply {
    Respond(ApiResponse),
    Fail(TransportError),
    /// Answer once the notify is triggered.
    Held(Arc<Notify>, ApiResponse),
}

/// In-memory transport answering from a route table and logging every
/// request. Unknown routes answer 404.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), Reply>>,
    log: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: &str) {
        self.route(method, path, Reply::Respond(ApiResponse::new(status, body)));
    }

    pub fn fail(&self, method: Method, path: &str, error: TransportError) {
        self.route(method, path, Reply::Fail(error));
    }

    /// Answer `path` only after the returned notify fires.
    pub fn hold(&self, method: Method, path: &str, status: u16, body: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.route(
            method,
            path,
            Reply::Held(gate.clone(), ApiResponse::new(status, body)),
        );
        gate
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.method == method)
            .count()
    }

    fn route(&self, method: Method, path: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), reply);
    }
}

impl Transport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let reply = self
            .routes
            .lock()
            .unwrap()
            .get(&(request.method, request.path.clone()))
            .cloned();
        self.log.lock().unwrap().push(request);

        match reply {
            None => Ok(ApiResponse::new(404, "not found")),
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(error)) => Err(error),
            Some(Reply::Held(gate, response)) => {
                gate.notified().await;
                Ok(response)
            }
        }
    }
}

pub fn admin() -> Session {
    Session::new(TOKEN, Role::Admin)
}

pub fn console(session: Option<Session>) -> Console<ScriptedTransport> {
    console_with(session, LoadPolicy::AllOrNothing, ConfirmationPolicy::default())
}

pub fn console_with(
    session: Option<Session>,
    policy: LoadPolicy,
    confirmation: ConfirmationPolicy,
) -> Console<ScriptedTransport> {
    let guard = SessionGuard::new(ScriptedTransport::new(), session);
    let fetcher = ResourceFetcher::new(CollectionSpec::dashboard(), policy);
    Console::new(guard, fetcher, confirmation)
}

pub fn transport(console: &Console<ScriptedTransport>) -> &ScriptedTransport {
    console.guard().transport()
}

/// Answer every listing endpoint with a small data set, mixing bare arrays
/// and `data` wrappers.
pub fn seed(transport: &ScriptedTransport) {
    let listings = [
        (
            CollectionKind::Users,
            r#"[{"id": 1, "firstName": "Alice", "email": "alice@x.com", "role": "USER"},
                {"id": 2, "firstName": "Bob", "email": "bob@x.com", "role": "USER"}]"#,
        ),
        (
            CollectionKind::PendingDeposits,
            r#"{"data": [{"id": 10, "amount": 50, "username": "alice"},
                         {"id": 11, "amount": 75, "username": "bob"}]}"#,
        ),
        (
            CollectionKind::PendingWithdrawals,
            r#"[{"id": 20, "amount": 30, "username": "bob"}]"#,
        ),
        (
            CollectionKind::Transactions,
            r#"{"data": [{"id": 100, "type": "DEPOSIT", "amount": 20, "status": "APPROVED"}]}"#,
        ),
        (
            CollectionKind::Wallets,
            r#"[{"id": "w1", "balance": 100, "user": {"email": "alice@x.com"}}]"#,
        ),
    ];
    for (kind, body) in listings {
        transport.respond(Method::Get, kind.endpoint(), 200, body);
    }
}

pub fn ids(console: &Console<ScriptedTransport>, kind: CollectionKind) -> Vec<String> {
    console
        .collection(kind)
        .iter()
        .map(|record| record.id().to_string())
        .collect()
}
