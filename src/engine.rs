//! Reference-resolution engine.
//!
//! This module is the entry point for turning a raw item into its
//! denormalized [`RefData`](crate::RefData) view. It is split into
//! focused submodules under `src/engine/` while keeping public paths stable
//! (`crate::engine::Resolver`).
//!
//! ## How the parts work together
//!
//! Resolving one item is a pipeline:
//!
//! ```text
//! fields (all) ──┐
//!               │  priority::sorted_fields       (priority.rs)
//!               └───────────────┬──────────────
//!                               │ once per Resolver build
//! item ─────────────────────────┼─ cache probe on id/valid-from
//!                               v
//!                   ResolveCtx::merge_values     (context.rs)
//!                     - per-field value priority chain
//!                     - projection under field-id / section
//!                     - recurse into registry/user references
//!                       (visited set keeps cycles finite,
//!                        cache memoizes resolved sub-graphs)
//!                               │
//!                               v
//!                   weak user folds (user-id, booked-users)
//!                               │
//!                               v
//!                   resolve_field_references     (context.rs)
//!                     - final aliasing pass
//!                               │
//!                               v
//!                           RefData
//! ```
//!
//! The engine leans on **ordered overwriting**: within one entity's field
//! pass, fields apply in priority order and later values supersede earlier
//! ones, so precedence lives in the sort rather than in per-field
//! conditionals.
//!
//! ## Responsibilities by module
//!
//! - `priority.rs`: the banded priority function and the one-time field sort.
//! - `context.rs`: the per-call resolution context; field pass, reference
//!   merging, article attachment and the field-reference aliasing pass.
//! - `resolver.rs`: the [`Resolver`] itself; cache keying and the top-level
//!   resolution sequence.

#[path = "engine/context.rs"]
mod context;
#[path = "engine/priority.rs"]
mod priority;
#[path = "engine/resolver.rs"]
mod resolver;

pub use resolver::Resolver;
