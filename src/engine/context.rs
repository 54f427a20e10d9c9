//! Per-call resolution context.
//!
//! [`ResolveCtx`] carries the cycle guard (visited set) and borrows the
//! resolver's snapshot, sorted field order and memoization cache. The merge
//! routines are methods on it and recurse through it, so there is no shared
//! mutable module state: one context per top-level `resolve` call.
//!
//! ## Per-field value priority
//!
//! For each field instance applicable to the entity's registry:
//!
//! ```text
//! field-id == "title"  -> the entity's title, always
//! attrs[field.id]      -> explicit per-item attribute
//! kind-specific raw    -> Breaks reads `breaks`; StartEnd synthesizes
//!                         [start, end] (non-user entities only)
//! values[field.id]     -> the entity's values map
//! default_value        -> unless the field is archived
//! ```
//!
//! Empty values write nothing. A non-empty value lands under the field's own
//! id, is projected under `field-id` (or `[section, field-id]` with the
//! instance id recorded under `_mapping`), and then the reference kinds pull
//! referenced entities in.

use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::Cache;
use crate::model::{ArticleType, FieldInstance, FieldKind, Item, RefData, Snapshot};
use crate::value::{MergeMode, Value};

pub(crate) struct ResolveCtx<'a> {
    snapshot: &'a Snapshot,
    order: &'a [FieldInstance],
    cache: &'a Cache<Arc<RefData>>,
    /// Ids on the current recursion path. Marked before recursing into a
    /// reference and cleared after, so sibling branches may still resolve
    /// the same id while a path can never revisit an ancestor.
    visited: HashSet<String>,
}

impl<'a> ResolveCtx<'a> {
    pub(crate) fn new(snapshot: &'a Snapshot, order: &'a [FieldInstance], cache: &'a Cache<Arc<RefData>>) -> Self {
        ResolveCtx { snapshot, order, cache, visited: HashSet::new() }
    }

    /// Run the field pass for one entity, accumulating into `acc`.
    pub(crate) fn merge_values(&mut self, acc: &mut RefData, entity: &Item) {
        let order = self.order;
        for fi in order {
            if let Some(registry_id) = entity.registry_id.as_deref() {
                if fi.registry_id.as_deref() != Some(registry_id) {
                    continue;
                }
            }

            let value = field_value(entity, fi);
            if value.is_empty() {
                continue;
            }

            acc.set(fi.id.clone(), value.clone());
            match &fi.section {
                Some(section) => {
                    acc.set_in(&[section, &fi.field_id], value.clone());
                    acc.set_in(&["_mapping", section, &fi.field_id], Value::Text(fi.id.clone()));
                }
                None => acc.set(fi.field_id.clone(), value.clone()),
            }

            if fi.field_id == "customer-no"
                && acc.get_in(&["invoice-head", "customer-name"]).is_none_or(Value::is_empty)
            {
                if let Some(title) = &entity.title {
                    // Copy customer name from title
                    acc.set_in(&["invoice-head", "customer-name"], Value::Text(title.clone()));
                }
            }

            match fi.kind {
                FieldKind::RegistryReference => {
                    if let Some(id) = value.as_str() {
                        let id = id.to_string();
                        self.merge_registry_values(acc, &id);
                    }
                }
                FieldKind::UserReference => {
                    if let Some(id) = value.as_str() {
                        let id = id.to_string();
                        self.merge_user_values(acc, &id, MergeMode::Strong);
                    }
                }
                FieldKind::ArticleReference => self.attach_article(acc, fi, &value),
                _ => {}
            }
        }
    }

    /// Resolve the registry item `id` references (through the cache when
    /// possible) and strong-merge its data into `acc`. Seeds the `path`
    /// segment and the `title-<registry-id>` alias key.
    pub(crate) fn merge_registry_values(&mut self, acc: &mut RefData, id: &str) {
        let mut referenced = self.cache.get(id);

        if referenced.is_none() {
            if self.visited.contains(id) {
                tracing::debug!(id, "cycle on registry reference; skipping");
                return;
            }
            self.visited.insert(id.to_string());
            let snapshot = self.snapshot;
            if let Some(entity) = snapshot.reg_data.get(id) {
                if !entity.is_blank() {
                    let mut sub = RefData::new();
                    sub.set(
                        "path",
                        Value::list([Value::map([
                            ("title", text_or_null(&entity.title)),
                            ("id", Value::from(id)),
                            ("registry-id", text_or_null(&entity.registry_id)),
                        ])]),
                    );
                    if let (Some(registry_id), Some(title)) = (&entity.registry_id, &entity.title) {
                        sub.set(format!("title-{registry_id}"), Value::Text(title.clone()));
                    }
                    self.merge_values(&mut sub, entity);
                    referenced = Some(self.cache.set(id.to_string(), Arc::new(sub)));
                }
            }
            self.visited.remove(id);
        }

        if let Some(referenced) = referenced {
            acc.merge_from(&referenced, MergeMode::Strong);
        }
    }

    /// Resolve the user `id` references and merge its data into `acc` under
    /// `mode`. Seeds a `users` sequence entry. The top-level user folds pass
    /// `Weak` so item data is never clobbered; a nested user-reference field
    /// passes `Strong`.
    pub(crate) fn merge_user_values(&mut self, acc: &mut RefData, id: &str, mode: MergeMode) {
        let mut referenced = self.cache.get(id);

        if referenced.is_none() {
            if self.visited.contains(id) {
                tracing::debug!(id, "cycle on user reference; skipping");
                return;
            }
            self.visited.insert(id.to_string());
            let snapshot = self.snapshot;
            if let Some(user) = snapshot.users.get(id) {
                if !user.is_blank() {
                    let mut sub = RefData::new();
                    sub.set(
                        "users",
                        Value::list([Value::map([("name", text_or_null(&user.name)), ("id", Value::from(id))])]),
                    );
                    self.merge_values(&mut sub, user);
                    referenced = Some(self.cache.set(id.to_string(), Arc::new(sub)));
                }
            }
            self.visited.remove(id);
        }

        if let Some(referenced) = referenced {
            acc.merge_from(&referenced, mode);
        }
    }

    /// Attach the `[articles, <type>]` sub-map for an article-reference
    /// field. No cross-catalog lookup; a dangling id yields an entry with no
    /// sub-fields rather than an error.
    fn attach_article(&self, acc: &mut RefData, fi: &FieldInstance, value: &Value) {
        let Some(id) = value.as_str() else {
            return;
        };
        let article_type = fi.article_type();
        let catalog = match article_type {
            ArticleType::Salary => &self.snapshot.salary_articles,
            ArticleType::Invoice => &self.snapshot.invoice_articles,
        };

        let mut entry = RefData::new();
        if let Some(article) = catalog.get(id) {
            entry.set("id", Value::Text(article.id.clone()));
            let catalog_key = match article_type {
                ArticleType::Salary => article.code.as_ref().map(|code| ("code", code.clone())),
                ArticleType::Invoice => article.sku.as_ref().map(|sku| ("sku", sku.clone())),
            };
            if let Some((key, code)) = catalog_key {
                entry.set(key, Value::Text(code));
            }
        }

        let fields: Vec<(String, Value)> = entry.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        acc.set_in(&["articles", article_type.key()], Value::map(fields));
    }

    /// Final aliasing pass: a field-reference field's resolved value is the
    /// id of another field in the result; replace it with that field's
    /// value. Runs once after all merging so chains through registry
    /// references are already populated. A reference to a missing key
    /// resolves to nothing.
    pub(crate) fn resolve_field_references(&self, acc: &mut RefData) {
        if acc.is_empty() {
            return;
        }
        for fi in self.order {
            if fi.kind != FieldKind::FieldReference {
                continue;
            }
            let Some(target) = acc.get(&fi.id).and_then(Value::as_str) else {
                continue;
            };
            if target.is_empty() {
                continue;
            }
            let target = target.to_string();
            match acc.get(&target).cloned() {
                Some(value) => acc.set(fi.id.clone(), value),
                None => acc.remove(&fi.id),
            }
        }
    }
}

fn text_or_null(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

/// Compute one field's value for one entity; see the module docs for the
/// priority chain.
fn field_value(entity: &Item, fi: &FieldInstance) -> Value {
    if fi.field_id == "title" {
        return text_or_null(&entity.title);
    }

    let explicit = match entity.attrs.get(&fi.id) {
        Some(attr) if !attr.is_null() => attr.clone(),
        _ => match fi.kind {
            FieldKind::Breaks => entity.breaks.clone().unwrap_or(Value::Null),
            FieldKind::StartEnd if !entity.is_user_entity() => {
                Value::list([text_or_null(&entity.start), text_or_null(&entity.end)])
            }
            _ => entity.values.get(&fi.id).cloned().unwrap_or(Value::Null),
        },
    };

    if explicit.is_null() && !fi.archived {
        return fi.default_value.clone().unwrap_or(Value::Null);
    }
    explicit
}
