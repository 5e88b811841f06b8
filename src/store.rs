//! # Economy Store
//!
//! The host-supplied service holding per-owner collectable balances and
//! answering find queries. The runtime only talks to the store through the
//! [`EconomyStore`] trait; every balance operation is atomic and linearizable
//! per `(owner, collectable)` key, and the engine never assumes atomicity
//! across a multi-statement event body.
//!
//! [`InMemoryStore`] is the reference implementation used by the test suite:
//! a dashmap balance table whose per-key entry locks provide the required
//! linearizability.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

use crate::eval::Value;

/// An owner identity: a user id or a gameserver id.
pub type OwnerId = String;

/// A host-side entity returned by find queries, e.g. a chest instance or a
/// gameserver record.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: String,
    /// The entity kind the host files it under (`Chest`, `gameserver`, ...).
    pub kind: String,
    pub owner: OwnerId,
    pub attributes: HashMap<String, Value>,
}

/// The abstract query: a subject kind plus an optional evaluated filter
/// value. How the filter is interpreted is the host's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct FindPredicate {
    pub subject: String,
    pub filter: Option<Value>,
}

/// An outbound event emitted by a `notify` statement. Fire-and-forget.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub target: Value,
    pub event: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(
        "insufficient balance: {owner} holds {available} x {collectable}, needs {requested}"
    )]
    InsufficientBalance {
        owner: OwnerId,
        collectable: String,
        requested: i64,
        available: i64,
    },
    #[error("amount must be non-negative, got {0}")]
    InvalidAmount(i64),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The economy store contract.
///
/// `credit` and `debit` take non-negative amounts and return the new
/// balance. `debit` fails with [`StoreError::InsufficientBalance`] and leaves
/// the balance unchanged when the owner holds too little. Balances are never
/// negative.
#[async_trait]
pub trait EconomyStore: Send + Sync {
    async fn balance(&self, owner: &str, collectable: &str) -> Result<i64, StoreError>;

    async fn credit(&self, owner: &str, collectable: &str, amount: i64)
    -> Result<i64, StoreError>;

    async fn debit(&self, owner: &str, collectable: &str, amount: i64)
    -> Result<i64, StoreError>;

    async fn find(&self, predicate: &FindPredicate) -> Result<Vec<Entity>, StoreError>;

    async fn notify(&self, notification: Notification) -> Result<(), StoreError>;
}

/// In-memory store backing the test suite.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    balances: DashMap<(OwnerId, String), i64>,
    entities: Mutex<Vec<Entity>>,
    notifications: Mutex<Vec<Notification>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&self, entity: Entity) {
        self.entities.lock().expect("entity lock").push(entity);
    }

    pub fn set_balance(&self, owner: &str, collectable: &str, amount: i64) {
        self.balances
            .insert((owner.to_string(), collectable.to_string()), amount);
    }

    /// Notifications recorded so far, for test inspection.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().expect("notification lock").clone()
    }

    fn filter_matches(entity: &Entity, filter: &Value) -> bool {
        match filter {
            Value::List(items) => items.iter().any(|item| Self::filter_matches(entity, item)),
            Value::Entity(e) => entity.attributes.values().any(|v| match v {
                Value::Entity(attr) => attr.id == e.id,
                _ => false,
            }),
            other => entity.attributes.values().any(|v| v == other),
        }
    }
}

#[async_trait]
impl EconomyStore for InMemoryStore {
    async fn balance(&self, owner: &str, collectable: &str) -> Result<i64, StoreError> {
        Ok(self
            .balances
            .get(&(owner.to_string(), collectable.to_string()))
            .map(|v| *v)
            .unwrap_or(0))
    }

    async fn credit(
        &self,
        owner: &str,
        collectable: &str,
        amount: i64,
    ) -> Result<i64, StoreError> {
        if amount < 0 {
            return Err(StoreError::InvalidAmount(amount));
        }
        let mut entry = self
            .balances
            .entry((owner.to_string(), collectable.to_string()))
            .or_insert(0);
        *entry += amount;
        debug!(owner, collectable, amount, balance = *entry, "credit");
        Ok(*entry)
    }

    async fn debit(
        &self,
        owner: &str,
        collectable: &str,
        amount: i64,
    ) -> Result<i64, StoreError> {
        if amount < 0 {
            return Err(StoreError::InvalidAmount(amount));
        }
        let mut entry = self
            .balances
            .entry((owner.to_string(), collectable.to_string()))
            .or_insert(0);
        if *entry < amount {
            return Err(StoreError::InsufficientBalance {
                owner: owner.to_string(),
                collectable: collectable.to_string(),
                requested: amount,
                available: *entry,
            });
        }
        *entry -= amount;
        debug!(owner, collectable, amount, balance = *entry, "debit");
        Ok(*entry)
    }

    async fn find(&self, predicate: &FindPredicate) -> Result<Vec<Entity>, StoreError> {
        let entities = self.entities.lock().expect("entity lock");
        Ok(entities
            .iter()
            .filter(|entity| entity.kind == predicate.subject)
            .filter(|entity| match &predicate.filter {
                Some(filter) => Self::filter_matches(entity, filter),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn notify(&self, notification: Notification) -> Result<(), StoreError> {
        debug!(event = %notification.event, "notify");
        self.notifications
            .lock()
            .expect("notification lock")
            .push(notification);
        Ok(())
    }
}
