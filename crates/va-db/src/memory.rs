//! In-memory table shared by the `Memory*Store` implementations
//!
//! Used by tests and by `STORAGE=memory`. Each store keeps the same
//! uniqueness rules as its Postgres schema by checking under the write lock.

use std::collections::HashMap;

use tokio::sync::RwLock;
use va_core::{Id, Identifiable};

use crate::repository::{RepositoryError, RepositoryResult};

pub struct MemoryTable<T> {
    rows: RwLock<HashMap<Id, T>>,
}

impl<T> Default for MemoryTable<T> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> MemoryTable<T>
where
    T: Identifiable + Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: Id) -> Option<T> {
        self.rows.read().await.get(&id).cloned()
    }

    /// Insert unless `conflicts` matches an existing row
    pub async fn insert_unique<F>(&self, row: T, constraint: &str, conflicts: F) -> RepositoryResult<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut rows = self.rows.write().await;
        if rows.values().any(|existing| conflicts(existing)) {
            return Err(RepositoryError::Conflict(constraint.to_string()));
        }
        rows.insert(row.id(), row.clone());
        Ok(row)
    }

    pub async fn insert(&self, row: T) -> T {
        self.rows.write().await.insert(row.id(), row.clone());
        row
    }

    /// Replace an existing row. `Ok(false)` when the id is unknown
    pub async fn replace_unique<F>(&self, row: T, constraint: &str, conflicts: F) -> RepositoryResult<bool>
    where
        F: Fn(&T) -> bool,
    {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&row.id()) {
            return Ok(false);
        }
        if rows
            .values()
            .any(|existing| existing.id() != row.id() && conflicts(existing))
        {
            return Err(RepositoryError::Conflict(constraint.to_string()));
        }
        rows.insert(row.id(), row);
        Ok(true)
    }

    pub async fn replace(&self, row: T) -> bool {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&row.id()) {
            Some(slot) => {
                *slot = row;
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, id: Id) -> Option<T> {
        self.rows.write().await.remove(&id)
    }

    /// Remove the row only if `pred` accepts it
    pub async fn remove_if<F>(&self, id: Id, pred: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut rows = self.rows.write().await;
        match rows.get(&id) {
            Some(row) if pred(row) => rows.remove(&id),
            _ => None,
        }
    }

    /// Remove every row matching `pred`, returning how many went
    pub async fn remove_where<F>(&self, pred: F) -> u64
    where
        F: Fn(&T) -> bool,
    {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, row| !pred(row));
        (before - rows.len()) as u64
    }

    pub async fn find<F>(&self, pred: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        self.rows.read().await.values().find(|row| pred(row)).cloned()
    }

    pub async fn filter<F>(&self, pred: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.rows
            .read()
            .await
            .values()
            .filter(|row| pred(row))
            .cloned()
            .collect()
    }

    pub async fn any<F>(&self, pred: F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        self.rows.read().await.values().any(pred)
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}
