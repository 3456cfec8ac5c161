use crate::model::{CollectionKind, Record, RecordId};

/// An item taken out of a collection, with the ids of its neighbours at
/// the time of removal.
#[derive(Debug, Clone, PartialEq)]
pub struct Removed {
    pub record: Record,
    pub predecessor: Option<RecordId>,
    pub successor: Option<RecordId>,
}

/// The five collections as last synchronized with the server.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Collections {
    users: Vec<Record>,
    pending_deposits: Vec<Record>,
    pending_withdrawals: Vec<Record>,
    transactions: Vec<Record>,
    wallets: Vec<Record>,
}

impl Collections {
    pub fn get(&self, kind: CollectionKind) -> &[Record] {
        match kind {
            CollectionKind::Users => &self.users,
            CollectionKind::PendingDeposits => &self.pending_deposits,
            CollectionKind::PendingWithdrawals => &self.pending_withdrawals,
            CollectionKind::Transactions => &self.transactions,
            CollectionKind::Wallets => &self.wallets,
        }
    }

    fn get_mut(&mut self, kind: CollectionKind) -> &mut Vec<Record> {
        match kind {
            CollectionKind::Users => &mut self.users,
            CollectionKind::PendingDeposits => &mut self.pending_deposits,
            CollectionKind::PendingWithdrawals => &mut self.pending_withdrawals,
            CollectionKind::Transactions => &mut self.transactions,
            CollectionKind::Wallets => &mut self.wallets,
        }
    }

    pub fn count(&self, kind: CollectionKind) -> usize {
        self.get(kind).len()
    }

    /// Full replacement, never a merge with previous contents.
    pub fn replace(&mut self, kind: CollectionKind, items: Vec<Record>) {
        *self.get_mut(kind) = items;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Remove an item, remembering its neighbours so it can be put back.
    pub fn remove(&mut self, kind: CollectionKind, id: &RecordId) -> Option<Removed> {
        let items = self.get_mut(kind);
        let index = items.iter().position(|record| record.id() == id)?;
        let record = items.remove(index);
        let predecessor = index
            .checked_sub(1)
            .and_then(|i| items.get(i))
            .map(|r| r.id().clone());
        let successor = items.get(index).map(|r| r.id().clone());
        Some(Removed {
            record,
            predecessor,
            successor,
        })
    }

    /// Put a removed item back relative to its old neighbours: before its
    /// successor if still present, else after its predecessor, else last.
    /// No-op if it is already present (e.g. a refresh brought it back).
    pub fn restore(&mut self, kind: CollectionKind, removed: Removed) {
        let items = self.get_mut(kind);
        if items.iter().any(|existing| existing.id() == removed.record.id()) {
            return;
        }
        let position = |id: &Option<RecordId>| {
            id.as_ref()
                .and_then(|id| items.iter().position(|r| r.id() == id))
        };
        let index = position(&removed.successor)
            .or_else(|| position(&removed.predecessor).map(|i| i + 1))
            .unwrap_or(items.len());
        items.insert(index, removed.record);
    }

    pub fn prepend(&mut self, kind: CollectionKind, record: Record) {
        self.get_mut(kind).insert(0, record);
    }

    /// Replace the item with the same id in place. Returns false if absent.
    pub fn replace_item(&mut self, kind: CollectionKind, record: Record) -> bool {
        match self
            .get_mut(kind)
            .iter_mut()
            .find(|existing| existing.id() == record.id())
        {
            Some(existing) => {
                *existing = record;
                true
            }
            None => false,
        }
    }
}
