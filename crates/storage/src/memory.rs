//! Process-local [`VaultStore`] used by tests.
//!
//! Enforces the same primary-key, uniqueness and ownership constraints as
//! the Postgres schema and reports them with the same constraint names.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use infokeeper_contracts::User;
use tokio::sync::RwLock;

use crate::{ConstraintKind, Resource, Specification, StorageError, VaultStore};

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    tables: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MemoryState {
    fn rows<R: Resource>(&self) -> &[R] {
        self.tables
            .get(&TypeId::of::<R>())
            .and_then(|rows| rows.downcast_ref::<Vec<R>>())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn rows_mut<R: Resource>(&mut self) -> Result<&mut Vec<R>, StorageError> {
        self.tables
            .entry(TypeId::of::<R>())
            .or_insert_with(|| Box::new(Vec::<R>::new()))
            .downcast_mut::<Vec<R>>()
            .ok_or_else(|| StorageError::Backend(format!("{} table has wrong row type", R::TABLE)))
    }
}

fn violation(kind: ConstraintKind, constraint: String) -> StorageError {
    StorageError::Constraint { kind, constraint }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VaultStore for MemoryStore {
    async fn insert<R: Resource>(
        &self,
        record: &R,
        _deadline: Option<Duration>,
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().await;

        if !state.users.iter().any(|u| u.id == record.owner_id()) {
            return Err(violation(
                ConstraintKind::ForeignKey,
                format!("{}_owner_id_fkey", R::TABLE),
            ));
        }

        let rows = state.rows_mut::<R>()?;
        if rows.iter().any(|row| row.id() == record.id()) {
            return Err(violation(ConstraintKind::Unique, format!("{}_pkey", R::TABLE)));
        }

        for (name, columns) in R::UNIQUE {
            let clash = rows.iter().any(|row| {
                columns
                    .iter()
                    .all(|column| row.column(column) == record.column(column))
            });
            if clash {
                return Err(violation(ConstraintKind::Unique, name.to_string()));
            }
        }

        rows.push(record.clone());
        Ok(())
    }

    async fn select<R: Resource>(
        &self,
        spec: &Specification,
        _deadline: Option<Duration>,
    ) -> Result<Vec<R>, StorageError> {
        let state = self.state.read().await;

        let mut rows: Vec<R> = state
            .rows::<R>()
            .iter()
            .filter(|row| row.owner_id() == spec.owner_id())
            .filter(|row| {
                spec.conditions().iter().all(|condition| {
                    row.column(condition.column)
                        .is_some_and(|actual| condition.matches(&actual))
                })
            })
            .cloned()
            .collect();

        // Same order as the Postgres store's `ORDER BY created_at, id`.
        rows.sort_by(|a, b| (a.created_at(), a.id()).cmp(&(b.created_at(), b.id())));
        Ok(rows)
    }

    async fn insert_user(&self, user: &User, _deadline: Option<Duration>) -> Result<(), StorageError> {
        let mut state = self.state.write().await;

        if state.users.iter().any(|u| u.id == user.id) {
            return Err(violation(ConstraintKind::Unique, "users_pkey".to_string()));
        }
        if state.users.iter().any(|u| u.login == user.login) {
            return Err(violation(ConstraintKind::Unique, "unique_login".to_string()));
        }

        state.users.push(user.clone());
        Ok(())
    }

    async fn find_user_by_login(
        &self,
        login: &str,
        _deadline: Option<Duration>,
    ) -> Result<Option<User>, StorageError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.login == login).cloned())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
