use std::io;

use serde::Serialize;
use serde_json::Value;

use crate::CollectionKind;
use crate::console::QueryView;
use crate::model::Record;

#[derive(Debug, Serialize)]
struct UserRow<'a> {
    id: &'a str,
    name: String,
    email: String,
    role: String,
}

#[derive(Debug, Serialize)]
struct PendingRow<'a> {
    id: &'a str,
    user: String,
    amount: String,
    reference: String,
}

#[derive(Debug, Serialize)]
struct TransactionRow<'a> {
    id: &'a str,
    r#type: String,
    amount: String,
    status: String,
    created: String,
}

#[derive(Debug, Serialize)]
struct WalletRow<'a> {
    id: &'a str,
    user: String,
    balance: String,
}

#[derive(Debug, Serialize)]
struct CountRow {
    collection: String,
    count: usize,
}

/// Render a scalar field for display; objects and missing fields become empty.
fn text(record: &Record, path: &[&str]) -> String {
    match record.field(path) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn first_text(record: &Record, paths: &[&[&str]]) -> String {
    paths
        .iter()
        .map(|path| text(record, path))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

/// Write one page of a collection as csv, with columns chosen per collection.
pub fn write_view<W: io::Write>(
    kind: CollectionKind,
    view: &QueryView<'_>,
    writer: W,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);

    for record in &view.items {
        let id = record.id().as_str();
        match kind {
            CollectionKind::Users => writer.serialize(UserRow {
                id,
                name: format!(
                    "{} {}",
                    text(record, &["firstName"]),
                    text(record, &["lastName"])
                )
                .trim()
                .to_string(),
                email: text(record, &["email"]),
                role: text(record, &["role"]),
            })?,
            CollectionKind::PendingDeposits | CollectionKind::PendingWithdrawals => {
                writer.serialize(PendingRow {
                    id,
                    user: record.owner_name(),
                    amount: text(record, &["amount"]),
                    reference: first_text(record, &[&["reference"], &["id"]]),
                })?
            }
            CollectionKind::Transactions => writer.serialize(TransactionRow {
                id,
                r#type: text(record, &["type"]),
                amount: text(record, &["amount"]),
                status: text(record, &["status"]),
                created: text(record, &["createdAt"]),
            })?,
            CollectionKind::Wallets => writer.serialize(WalletRow {
                id,
                user: first_text(record, &[&["user", "email"], &["userId"]]),
                balance: text(record, &["balance"]),
            })?,
        }
    }

    writer.flush()?;
    Ok(())
}

/// Write the per-collection item counts.
pub fn write_counts<W: io::Write>(
    counts: &[(CollectionKind, usize)],
    writer: W,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for (kind, count) in counts {
        writer.serialize(CountRow {
            collection: kind.to_string(),
            count: *count,
        })?;
    }
    writer.flush()?;
    Ok(())
}
