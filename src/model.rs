//! Core domain types for the admin console.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The five remote collections the console keeps in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKind {
    Users,
    PendingDeposits,
    PendingWithdrawals,
    Transactions,
    Wallets,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 5] = [
        CollectionKind::Users,
        CollectionKind::PendingDeposits,
        CollectionKind::PendingWithdrawals,
        CollectionKind::Transactions,
        CollectionKind::Wallets,
    ];

    /// Listing endpoint, relative to the service base url.
    pub fn endpoint(self) -> &'static str {
        match self {
            CollectionKind::Users => "/api/admin/users",
            CollectionKind::PendingDeposits => "/api/admin/deposits/pending",
            CollectionKind::PendingWithdrawals => "/api/admin/withdrawals/pending",
            CollectionKind::Transactions => "/api/admin/transactions?limit=200",
            CollectionKind::Wallets => "/api/admin/wallets",
        }
    }

    /// Human readable name, used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            CollectionKind::Users => "Users",
            CollectionKind::PendingDeposits => "Pending Deposits",
            CollectionKind::PendingWithdrawals => "Pending Withdrawals",
            CollectionKind::Transactions => "Transactions",
            CollectionKind::Wallets => "Wallets",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollectionKind::Users => "users",
            CollectionKind::PendingDeposits => "deposits",
            CollectionKind::PendingWithdrawals => "withdrawals",
            CollectionKind::Transactions => "transactions",
            CollectionKind::Wallets => "wallets",
        };
        f.write_str(name)
    }
}

impl FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "users" => Ok(CollectionKind::Users),
            "deposits" | "pending-deposits" => Ok(CollectionKind::PendingDeposits),
            "withdrawals" | "pending-withdrawals" => Ok(CollectionKind::PendingWithdrawals),
            "transactions" => Ok(CollectionKind::Transactions),
            "wallets" => Ok(CollectionKind::Wallets),
            other => Err(format!("unknown collection '{other}'")),
        }
    }
}

/// Identifier of one item of a collection.
///
/// Servers hand out both numeric and string ids; both are kept in their
/// textual form so they compare and format the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(RecordId(s.clone())),
            Value::Number(n) => Some(RecordId(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId(value.to_string())
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        RecordId(value.to_string())
    }
}

/// One item of a collection, kept in the exact shape the server sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    value: Value,
}

impl Record {
    /// Wrap a server value, extracting its `id` (or `_id`).
    ///
    /// Returns `None` when the value is not an object or carries no usable id.
    pub fn from_value(value: Value) -> Option<Self> {
        let id = value
            .get("id")
            .and_then(RecordId::from_json)
            .or_else(|| value.get("_id").and_then(RecordId::from_json))?;
        Some(Self { id, value })
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Look up a nested field by path, e.g. `["wallet", "user", "email"]`.
    pub fn field(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(&self.value, |value, key| value.get(key))
    }

    /// Lowercased compact JSON rendering, the haystack for free-text search.
    /// Keys keep the order the server sent them in.
    pub fn search_text(&self) -> String {
        self.value.to_string().to_lowercase()
    }

    /// Best-effort display name of the user owning a pending request.
    pub fn owner_name(&self) -> String {
        let first = self.field(&["wallet", "user", "firstName"]).and_then(Value::as_str);
        let last = self.field(&["wallet", "user", "lastName"]).and_then(Value::as_str);
        if let (Some(first), Some(last)) = (first, last) {
            return format!("{first} {last}");
        }
        ["user", "username"]
            .into_iter()
            .find_map(|key| self.field(&[key]).and_then(Value::as_str))
            .unwrap_or("Unknown User")
            .to_string()
    }
}

/// Role carried by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Kind of pending request awaiting an admin decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingKind {
    Deposit,
    Withdrawal,
}

impl PendingKind {
    /// Collection holding requests of this kind.
    pub fn collection(self) -> CollectionKind {
        match self {
            PendingKind::Deposit => CollectionKind::PendingDeposits,
            PendingKind::Withdrawal => CollectionKind::PendingWithdrawals,
        }
    }

    /// Path segment used by the approve/reject endpoints.
    pub fn path_segment(self) -> &'static str {
        match self {
            PendingKind::Deposit => "deposit",
            PendingKind::Withdrawal => "withdraw",
        }
    }
}

impl fmt::Display for PendingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingKind::Deposit => f.write_str("deposit"),
            PendingKind::Withdrawal => f.write_str("withdrawal"),
        }
    }
}

impl FromStr for PendingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deposit" => Ok(PendingKind::Deposit),
            "withdrawal" | "withdraw" => Ok(PendingKind::Withdrawal),
            other => Err(format!("unknown request kind '{other}'")),
        }
    }
}

/// A state-changing action the console can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Approve,
    Reject,
    /// Wallet top-up.
    Credit,
    /// Wallet reduction.
    Debit,
}

impl MutationKind {
    /// Verb used in user-facing notices.
    pub fn verb(self) -> &'static str {
        match self {
            MutationKind::Approve => "approve",
            MutationKind::Reject => "reject",
            MutationKind::Credit => "credit",
            MutationKind::Debit => "debit",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// `action` field of the wallet update body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletAction {
    Topup,
    Reduce,
}

/// The item a mutation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Pending { kind: PendingKind, id: RecordId },
    Wallet { id: RecordId },
}

impl Target {
    pub fn id(&self) -> &RecordId {
        match self {
            Target::Pending { id, .. } | Target::Wallet { id } => id,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Pending { kind, id } => write!(f, "{kind} {id}"),
            Target::Wallet { id } => write!(f, "wallet {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_accepts_numeric_and_string_ids() {
        let numeric = Record::from_value(json!({"id": 7, "amount": 10})).unwrap();
        assert_eq!(numeric.id(), &RecordId::from(7));

        let string = Record::from_value(json!({"id": "abc"})).unwrap();
        assert_eq!(string.id().as_str(), "abc");

        let mongo = Record::from_value(json!({"_id": "65f0"})).unwrap();
        assert_eq!(mongo.id().as_str(), "65f0");
    }

    #[test]
    fn record_without_id_is_rejected() {
        assert!(Record::from_value(json!({"amount": 10})).is_none());
        assert!(Record::from_value(json!({"id": ""})).is_none());
        assert!(Record::from_value(json!({"id": null})).is_none());
        assert!(Record::from_value(json!([1, 2])).is_none());
    }

    #[test]
    fn search_text_is_lowercased_json() {
        let record =
            Record::from_value(json!({"id": 1, "firstName": "Alice", "lastName": "Wong"}))
                .unwrap();
        let text = record.search_text();
        assert!(text.contains("alice"));
        assert!(text.contains("wong"));
        assert!(!text.contains("Alice"));
    }

    #[test]
    fn search_text_keeps_server_key_order() {
        let record: Record = serde_json::from_str::<Value>(
            r#"{"id": 4, "status": "PENDING", "amount": 50, "note": "Zed"}"#,
        )
        .ok()
        .and_then(Record::from_value)
        .unwrap();
        assert_eq!(
            record.search_text(),
            r#"{"id":4,"status":"pending","amount":50,"note":"zed"}"#
        );
        assert!(record.search_text().contains(r#""pending","amount""#));
    }

    #[test]
    fn owner_name_falls_back() {
        let nested = Record::from_value(json!({
            "id": 1,
            "wallet": {"user": {"firstName": "Ada", "lastName": "Lovelace"}}
        }))
        .unwrap();
        assert_eq!(nested.owner_name(), "Ada Lovelace");

        let flat = Record::from_value(json!({"id": 2, "username": "ada"})).unwrap();
        assert_eq!(flat.owner_name(), "ada");

        let unknown = Record::from_value(json!({"id": 3})).unwrap();
        assert_eq!(unknown.owner_name(), "Unknown User");
    }

    #[test]
    fn collection_kind_round_trips_through_display() {
        for kind in CollectionKind::ALL {
            assert_eq!(kind.to_string().parse::<CollectionKind>(), Ok(kind));
        }
        assert!("ledger".parse::<CollectionKind>().is_err());
    }

    #[test]
    fn pending_kind_routes() {
        assert_eq!(PendingKind::Deposit.path_segment(), "deposit");
        assert_eq!(PendingKind::Withdrawal.path_segment(), "withdraw");
        assert_eq!(
            PendingKind::Withdrawal.collection(),
            CollectionKind::PendingWithdrawals
        );
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
    }
}
