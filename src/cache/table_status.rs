//! Table status cache — last-known status per table id
//!
//! Updated by inbound `TableStatusChanged` events and by the table
//! assigner's own transitions. A hint only: decisions that must be
//! serialized happen at the restaurant service, never here.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::domain::TableStatus;

/// Thread-safe mapping `table_id → last-known status`.
pub struct TableStatusCache {
    statuses: DashMap<String, TableStatus>,
}

/// Shared, reference-counted table status cache.
pub type SharedTableStatusCache = Arc<TableStatusCache>;

impl TableStatusCache {
    pub fn new() -> Self {
        Self {
            statuses: DashMap::new(),
        }
    }

    /// Wrap in `Arc` for shared ownership.
    pub fn shared() -> SharedTableStatusCache {
        Arc::new(Self::new())
    }

    /// Known status, or None when the table was never reported.
    pub fn get(&self, table_id: &str) -> Option<TableStatus> {
        self.statuses.get(table_id).map(|entry| *entry.value())
    }

    /// Overwrite the cached status, returning the previous one.
    pub fn put(&self, table_id: &str, status: TableStatus) -> Option<TableStatus> {
        let old = self.statuses.insert(table_id.to_string(), status);
        debug!(table_id, %status, old = ?old, "Table status cached");
        old
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

impl Default for TableStatusCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_table_returns_none() {
        let cache = TableStatusCache::new();
        assert_eq!(cache.get("T1"), None);
    }

    #[test]
    fn put_overwrites_and_returns_previous() {
        let cache = TableStatusCache::new();
        assert_eq!(cache.put("T1", TableStatus::Available), None);
        assert_eq!(
            cache.put("T1", TableStatus::Reserved),
            Some(TableStatus::Available)
        );
        assert_eq!(cache.get("T1"), Some(TableStatus::Reserved));
        assert_eq!(cache.len(), 1);
    }
}
