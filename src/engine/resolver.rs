//! The resolver: builds [`RefData`] views of items.
//!
//! A resolver is built once per input snapshot and owns the bounded cache
//! that memoizes resolved sub-graphs. Resolving an item:
//!
//! ```text
//! (0) blank item            -> None
//! (1) cache probe           -> id/valid-from key; hit returns immediately
//! (2) field pass            -> merge_values(item) with a fresh cycle guard
//! (3) user folds            -> user-id, then booked-users, weak merge
//! (4) field-reference pass  -> alias resolution
//! (5) cache + return
//! ```
//!
//! The cache probe is the performance guarantee: at most one recomputation
//! per distinct `(id, valid-from)` pair until the entry expires or the
//! owning resolver is dropped.

use std::sync::Arc;

use super::context::ResolveCtx;
use super::priority::sorted_fields;
use crate::cache::Cache;
use crate::model::{FieldInstance, Item, RefData, Snapshot};
use crate::value::MergeMode;

pub struct Resolver {
    snapshot: Snapshot,
    order: Vec<FieldInstance>,
    cache: Cache<Arc<RefData>>,
}

impl Resolver {
    /// Build a resolver over `snapshot`. The field order is computed once;
    /// the cache starts empty, so a new build can never serve data from an
    /// older snapshot.
    pub fn new(snapshot: Snapshot) -> Self {
        let order = sorted_fields(&snapshot.fields);
        Resolver { snapshot, order, cache: Cache::new("field-data") }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Produce the fully resolved, denormalized view of `item`, or `None`
    /// for a blank entity.
    pub fn resolve(&self, item: &Item) -> Option<RefData> {
        if item.is_blank() {
            return None;
        }

        let cache_key = item
            .id
            .as_ref()
            .map(|id| format!("{id}/{}", item.valid_from.as_deref().unwrap_or_default()));
        if let Some(key) = &cache_key {
            if let Some(hit) = self.cache.get(key) {
                return Some((*hit).clone());
            }
        }

        let mut ctx = ResolveCtx::new(&self.snapshot, &self.order, &self.cache);
        let mut data = RefData::new();
        ctx.merge_values(&mut data, item);

        if let Some(user_id) = &item.user_id {
            ctx.merge_user_values(&mut data, user_id, MergeMode::Weak);
        }
        for user_id in &item.booked_users {
            ctx.merge_user_values(&mut data, user_id, MergeMode::Weak);
        }

        ctx.resolve_field_references(&mut data);

        if let Some(key) = cache_key {
            self.cache.set(key, Arc::new(data.clone()));
        }
        Some(data)
    }
}
