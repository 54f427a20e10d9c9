use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::Lazy;

use crate::engine::Resolver;
use crate::model::Snapshot;

/// One-slot resolver memo. Rebuilding per call would discard the resolution
/// cache; hosts typically resolve many items against one snapshot before
/// the snapshot changes.
static LAST_BUILD: Lazy<Mutex<Option<(Snapshot, Arc<Resolver>)>>> = Lazy::new(|| Mutex::new(None));

/// Build a [`Resolver`] for `snapshot`, reusing the previous build when the
/// snapshot is structurally equal to the last one seen.
///
/// A changed snapshot always yields a fresh resolver with an empty cache,
/// so stale data can never leak across builds. Use [`Resolver::new`]
/// directly to bypass the memo.
///
/// # Example
/// ```
/// use std::collections::BTreeMap;
/// use refbuilder::{Item, Snapshot, build_resolver};
///
/// let snapshot = Snapshot::new(BTreeMap::new(), BTreeMap::new(), BTreeMap::new());
/// let resolver = build_resolver(snapshot);
/// assert!(resolver.resolve(&Item::default()).is_none());
/// ```
pub fn build_resolver(snapshot: Snapshot) -> Arc<Resolver> {
    let mut slot = LAST_BUILD.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some((last, resolver)) = slot.as_ref() {
        if *last == snapshot {
            return Arc::clone(resolver);
        }
    }
    let resolver = Arc::new(Resolver::new(snapshot.clone()));
    *slot = Some((snapshot, Arc::clone(&resolver)));
    resolver
}
