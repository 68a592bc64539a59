//! # Nested-Collection Reconciler
//!
//! One three-way merge shared by every child collection of a recording
//! (metadata, playback formats). Given the persisted items and the desired
//! items, both keyed by a natural key:
//!
//! 1. persisted items whose key is desired are updated to the desired value,
//!    but only when a non-key field actually differs,
//! 2. persisted items whose key is not desired are deleted,
//! 3. desired items with no persisted counterpart are created.
//!
//! Planning is pure ([`plan`]); applying goes through a [`CollectionStore`]
//! so the same merge drives any storage.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// Counts of what a reconciliation did to one collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionChanges {
    pub created: u64,
    pub updated: u64,
    pub deleted: u64,
    pub unchanged: u64,
}

impl CollectionChanges {
    /// Number of writes performed
    pub fn writes(&self) -> u64 {
        self.created + self.updated + self.deleted
    }

    /// Whether nothing was written
    pub fn is_noop(&self) -> bool {
        self.writes() == 0
    }

    /// Add another collection's counts to this one
    pub fn absorb(&mut self, other: CollectionChanges) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.unchanged += other.unchanged;
    }
}

/// Planned operations for one collection
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan<P, D> {
    pub updates: Vec<(P, D)>,
    pub deletes: Vec<P>,
    pub creates: Vec<D>,
    pub unchanged: Vec<P>,
}

impl<P, D> MergePlan<P, D> {
    /// Whether applying the plan would write anything
    pub fn is_noop(&self) -> bool {
        self.updates.is_empty() && self.deletes.is_empty() && self.creates.is_empty()
    }
}

/// Storage of one child collection of one owner
#[async_trait]
pub trait CollectionStore: Send {
    type Key: Eq + Hash + Clone + Send;
    type Persisted: Send + Sync;
    type Desired: Send + Sync;

    fn persisted_key(&self, item: &Self::Persisted) -> Self::Key;

    fn desired_key(&self, item: &Self::Desired) -> Self::Key;

    /// Whether a non-key field of `persisted` differs from `desired`
    fn differs(&self, persisted: &Self::Persisted, desired: &Self::Desired) -> bool;

    /// Load the persisted items of the owner
    async fn load(&mut self) -> Result<Vec<Self::Persisted>>;

    async fn update(&mut self, persisted: &Self::Persisted, desired: &Self::Desired) -> Result<()>;

    async fn delete(&mut self, persisted: &Self::Persisted) -> Result<()>;

    async fn create(&mut self, desired: &Self::Desired) -> Result<()>;
}

/// Compute the merge of `persisted` into `desired`
///
/// Duplicate desired keys collapse to the last occurrence, at the position of
/// the first. Created items keep the desired order.
pub fn plan<P, D, K>(
    persisted: Vec<P>,
    desired: Vec<D>,
    persisted_key: impl Fn(&P) -> K,
    desired_key: impl Fn(&D) -> K,
    differs: impl Fn(&P, &D) -> bool,
) -> MergePlan<P, D>
where
    K: Eq + Hash + Clone,
{
    // Working copy of the desired set, keyed, in first-seen order
    let mut order: Vec<K> = Vec::with_capacity(desired.len());
    let mut working: HashMap<K, D> = HashMap::with_capacity(desired.len());
    for item in desired {
        let key = desired_key(&item);
        if working.insert(key.clone(), item).is_none() {
            order.push(key);
        }
    }

    let mut merge = MergePlan {
        updates: Vec::new(),
        deletes: Vec::new(),
        creates: Vec::new(),
        unchanged: Vec::new(),
    };

    for item in persisted {
        match working.remove(&persisted_key(&item)) {
            Some(wanted) if differs(&item, &wanted) => merge.updates.push((item, wanted)),
            Some(_) => merge.unchanged.push(item),
            None => merge.deletes.push(item),
        }
    }

    merge.creates = order
        .into_iter()
        .filter_map(|key| working.remove(&key))
        .collect();

    merge
}

/// Reconcile the store's collection with `desired`
///
/// Applies updates, then deletes, then creates.
pub async fn reconcile<S>(store: &mut S, desired: Vec<S::Desired>) -> Result<CollectionChanges>
where
    S: CollectionStore,
{
    let persisted = store.load().await?;
    let merge = {
        let store_ref: &S = store;
        plan(
            persisted,
            desired,
            |p| store_ref.persisted_key(p),
            |d| store_ref.desired_key(d),
            |p, d| store_ref.differs(p, d),
        )
    };

    let mut changes = CollectionChanges {
        unchanged: merge.unchanged.len() as u64,
        ..CollectionChanges::default()
    };

    for (persisted, desired) in &merge.updates {
        store.update(persisted, desired).await?;
        changes.updated += 1;
    }

    for persisted in &merge.deletes {
        store.delete(persisted).await?;
        changes.deleted += 1;
    }

    for desired in &merge.creates {
        store.create(desired).await?;
        changes.created += 1;
    }

    Ok(changes)
}
