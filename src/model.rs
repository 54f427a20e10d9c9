//! Domain model: field definitions, registry items, article catalogs and the
//! resolved result map.
//!
//! All inputs are immutable snapshots owned by the caller; the engine only
//! reads them. Items and users share one shape ([`Item`]) because the
//! resolver walks both with the same field pass: a user is just an entity
//! whose index happens to be the user store.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::value::{MergeMode, Value};

pub type FieldIndex = BTreeMap<String, FieldInstance>;
pub type ItemIndex = BTreeMap<String, Item>;
pub type ArticleIndex = BTreeMap<String, Article>;

/// Resolution behavior selector for a field instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    /// Value is the id of another registry item, inlined on resolution.
    RegistryReference,
    /// Value is a user id, inlined on resolution.
    UserReference,
    /// Value is an id into an external article catalog.
    ArticleReference,
    /// Value is the id of another field in the same result; aliased in a
    /// final pass.
    FieldReference,
    /// Reads the item's raw `breaks` attribute.
    Breaks,
    /// Synthesizes a two-element list from the item's `start`/`end`.
    StartEnd,
    /// Any plain scalar kind (number, text, ...).
    #[default]
    Plain,
}

/// Which article catalog an article-reference field consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArticleType {
    #[default]
    Invoice,
    Salary,
}

impl ArticleType {
    pub fn key(self) -> &'static str {
        match self {
            ArticleType::Invoice => "invoice",
            ArticleType::Salary => "salary",
        }
    }
}

/// Per-field configuration knobs. Only the article catalog selector matters
/// to the engine; everything else the host stores here is opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldSettings {
    pub article_type: Option<ArticleType>,
}

/// One configured field attached to a registry, or global when
/// `registry_id` is absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldInstance {
    pub id: String,
    /// Semantic kind key, e.g. `default-number` or `registry-PRICELIST`.
    /// The well-known value `title` short-circuits to the item's title.
    pub field_id: String,
    pub kind: FieldKind,
    /// Optional grouping key; values are additionally projected under
    /// `[section, field-id]`.
    pub section: Option<String>,
    /// Restricts the field to items of this registry; absent means global.
    pub registry_id: Option<String>,
    /// Sort priority within its band.
    pub weight: i64,
    /// Archived fields sort first and never seed their default value.
    pub archived: bool,
    pub settings: FieldSettings,
    /// Used when the entity itself supplies no value for this field.
    pub default_value: Option<Value>,
}

impl FieldInstance {
    pub fn new(id: impl Into<String>, field_id: impl Into<String>, kind: FieldKind) -> Self {
        FieldInstance { id: id.into(), field_id: field_id.into(), kind, ..Default::default() }
    }

    pub fn article_type(&self) -> ArticleType {
        self.settings.article_type.unwrap_or_default()
    }
}

/// One data record belonging to a registry. The same shape carries users;
/// `name`, `role` and `username` are only ever populated there.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Item {
    pub id: Option<String>,
    pub registry_id: Option<String>,
    pub title: Option<String>,
    /// Combined with `id` to form the resolution cache key.
    pub valid_from: Option<String>,
    /// Raw values keyed by field-instance id.
    pub values: BTreeMap<String, Value>,
    pub user_id: Option<String>,
    pub booked_users: Vec<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub breaks: Option<Value>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub username: Option<String>,
    /// Explicit per-item attributes keyed by field-instance id; these take
    /// precedence over the `values` map.
    pub attrs: BTreeMap<String, Value>,
}

impl Item {
    /// Heuristic discriminator for user entities, used by the `start-end`
    /// field kind.
    pub fn is_user_entity(&self) -> bool {
        self.role.is_some() || self.username.is_some()
    }

    /// An entity with no identity and no data. Blank referenced entities
    /// contribute nothing to a resolution; a blank top-level item resolves
    /// to `None`.
    pub fn is_blank(&self) -> bool {
        self.id.is_none()
            && self.registry_id.is_none()
            && self.title.is_none()
            && self.valid_from.is_none()
            && self.values.is_empty()
            && self.user_id.is_none()
            && self.booked_users.is_empty()
            && self.start.is_none()
            && self.end.is_none()
            && self.breaks.is_none()
            && self.name.is_none()
            && self.attrs.is_empty()
    }
}

/// An external catalog entry. Invoice catalogs carry `sku`, salary catalogs
/// carry `code`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Article {
    pub id: String,
    pub sku: Option<String>,
    pub code: Option<String>,
    pub title: Option<String>,
}

/// Immutable bundle of the input indexes a resolver is built from.
///
/// The indexes are shared via `Arc` so snapshots clone cheaply; structural
/// equality over the contents is what the builder memoization keys on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub fields: Arc<FieldIndex>,
    pub reg_data: Arc<ItemIndex>,
    pub users: Arc<ItemIndex>,
    pub invoice_articles: Arc<ArticleIndex>,
    pub salary_articles: Arc<ArticleIndex>,
}

impl Snapshot {
    pub fn new(fields: FieldIndex, reg_data: ItemIndex, users: ItemIndex) -> Self {
        Snapshot {
            fields: Arc::new(fields),
            reg_data: Arc::new(reg_data),
            users: Arc::new(users),
            invoice_articles: Arc::default(),
            salary_articles: Arc::default(),
        }
    }

    pub fn with_invoice_articles(mut self, articles: ArticleIndex) -> Self {
        self.invoice_articles = Arc::new(articles);
        self
    }

    pub fn with_salary_articles(mut self, articles: ArticleIndex) -> Self {
        self.salary_articles = Arc::new(articles);
        self
    }
}

/// A fully resolved, denormalized view of one item.
///
/// Field values live under their field-instance id and are projected under
/// `field-id` (or `[section, field-id]` with the originating instance id
/// recorded under `[_mapping, section, field-id]`). Referenced entities are
/// merged in flat; traversed registry references accumulate `path` segments
/// and `title-<registry-id>` alias keys; referenced users accumulate a
/// `users` sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RefData {
    entries: BTreeMap<String, Value>,
}

impl RefData {
    pub fn new() -> Self {
        RefData::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Walk nested maps along `path`.
    pub fn get_in(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        self.entries.get(*first)?.get_in(rest)
    }

    /// The ordered `{title, id, registry-id}` segments accumulated while
    /// resolving registry references.
    pub fn path(&self) -> &[Value] {
        match self.entries.get("path") {
            Some(Value::List(segments)) => segments,
            _ => &[],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub(crate) fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub(crate) fn set_in(&mut self, path: &[&str], value: Value) {
        set_in_map(&mut self.entries, path, value);
    }

    pub(crate) fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Fold `other` into `self`: colliding keys combine via
    /// [`Value::merge`], everything else is inserted.
    pub(crate) fn merge_from(&mut self, other: &RefData, mode: MergeMode) {
        for (key, incoming) in &other.entries {
            match self.entries.remove(key) {
                Some(existing) => {
                    self.entries.insert(key.clone(), existing.merge(incoming.clone(), mode));
                }
                None => {
                    self.entries.insert(key.clone(), incoming.clone());
                }
            }
        }
    }
}

fn set_in_map(target: &mut BTreeMap<String, Value>, path: &[&str], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };
    if rest.is_empty() {
        target.insert((*first).to_string(), value);
        return;
    }
    let slot = target.entry((*first).to_string()).or_insert_with(|| Value::Map(BTreeMap::new()));
    if !matches!(slot, Value::Map(_)) {
        *slot = Value::Map(BTreeMap::new());
    }
    if let Value::Map(inner) = slot {
        set_in_map(inner, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_in_creates_intermediate_maps() {
        let mut data = RefData::new();
        data.set_in(&["generic", "default-number"], Value::from(42i64));
        data.set_in(&["_mapping", "generic", "default-number"], Value::from("FIELD_1"));

        assert_eq!(data.get_in(&["generic", "default-number"]), Some(&Value::from(42i64)));
        assert_eq!(data.get_in(&["_mapping", "generic", "default-number"]), Some(&Value::from("FIELD_1")));
        assert_eq!(data.get_in(&["generic", "missing"]), None);
    }

    #[test]
    fn merge_from_respects_the_mode_on_collisions() {
        let mut base = RefData::new();
        base.set("shared", Value::from("mine"));
        base.set("path", Value::list([Value::from("a")]));

        let mut other = RefData::new();
        other.set("shared", Value::from("theirs"));
        other.set("path", Value::list([Value::from("b")]));
        other.set("extra", Value::from(1i64));

        let mut weak = base.clone();
        weak.merge_from(&other, MergeMode::Weak);
        assert_eq!(weak.get("shared"), Some(&Value::from("mine")));
        assert_eq!(weak.get("path"), Some(&Value::list([Value::from("a"), Value::from("b")])));
        assert_eq!(weak.get("extra"), Some(&Value::from(1i64)));

        base.merge_from(&other, MergeMode::Strong);
        assert_eq!(base.get("shared"), Some(&Value::from("theirs")));
    }

    #[test]
    fn blank_detection() {
        assert!(Item::default().is_blank());
        let named = Item { id: Some("X".into()), ..Default::default() };
        assert!(!named.is_blank());
    }
}
