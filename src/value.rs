//! Tagged value model and merge semantics.
//!
//! Every raw field value, every resolved sub-map and every accumulator the
//! engine touches is a [`Value`]. The variants cover the semantic container
//! types the merge rules care about (ordered sequence, mapping, set) plus the
//! scalar kinds; merging dispatches by pattern matching instead of probing
//! runtime shapes.
//!
//! ## Merge rules
//!
//! Two values colliding under one key combine as follows:
//!
//! ```text
//! list × anything -> concatenate (scalar right operand appends as one element)
//! map  × map      -> recursive merge, same mode
//! set  × set      -> union
//! scalar collision-> Strong: next wins unless Null; Weak: previous wins
//! ```
//!
//! A container-shape mismatch (map × non-map, set × non-set) is recovered
//! defensively: it is logged and falls back to the scalar rule for the active
//! mode, so one bad value cannot abort a whole resolution.

use std::collections::{BTreeMap, BTreeSet};

/// Scalar-collision policy used when two values meet under the same key.
///
/// `Strong` lets the newer value win; `Weak` keeps whatever is already there.
/// Container-combining rules are identical in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    Strong,
    Weak,
}

/// A dynamically shaped field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Ordered sequence; merging concatenates.
    List(Vec<Value>),
    /// String-keyed mapping; merging recurses per key.
    Map(BTreeMap<String, Value>),
    /// Set of identifiers; merging unions.
    Set(BTreeSet<String>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// Build a `Value::Map` from key/value pairs.
    pub fn map<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a `Value::List` from items.
    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Value {
        Value::List(items.into_iter().collect())
    }

    /// Build a `Value::Set` from string-like members.
    pub fn set<S, I>(members: I) -> Value
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        Value::Set(members.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Walk nested maps along `path`.
    pub fn get_in(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(self, |v, key| v.get(key))
    }

    /// JS-style truthiness, used by the `is-empty` flag probe.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) | Value::Set(_) => true,
        }
    }

    /// Emptiness as the resolver sees it: `Null`, the empty string, a map
    /// whose `is-empty` key is truthy, or a container all of whose elements
    /// are themselves empty. Empty values never make it into a result map.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(_) | Value::Number(_) => false,
            Value::Text(s) => s.is_empty(),
            Value::List(items) => items.iter().all(Value::is_empty),
            Value::Set(members) => members.iter().all(|m| m.is_empty()),
            Value::Map(entries) => {
                if entries.get("is-empty").is_some_and(Value::is_truthy) {
                    return true;
                }
                entries.values().all(Value::is_empty)
            }
        }
    }

    /// Combine `self` (the existing value) with `next` under `mode`.
    pub fn merge(self, next: Value, mode: MergeMode) -> Value {
        use Value::{List, Map, Set};

        match (self, next) {
            (List(mut a), List(b)) => {
                a.extend(b);
                List(a)
            }
            (List(a), Value::Null) => List(a),
            (List(mut a), other) => {
                a.push(other);
                List(a)
            }
            (Map(mut a), Map(b)) => {
                for (key, incoming) in b {
                    match a.remove(&key) {
                        Some(existing) => {
                            a.insert(key, existing.merge(incoming, mode));
                        }
                        None => {
                            a.insert(key, incoming);
                        }
                    }
                }
                Map(a)
            }
            (Set(mut a), Set(b)) => {
                a.extend(b);
                Set(a)
            }
            (prev, Value::Null) => prev,
            (prev @ (Map(_) | Set(_)), next) => {
                tracing::warn!(
                    existing = prev.kind_name(),
                    incoming = next.kind_name(),
                    "container shape mismatch during merge; applying scalar rule"
                );
                match mode {
                    MergeMode::Strong => next,
                    MergeMode::Weak => prev,
                }
            }
            (prev, next) => match mode {
                MergeMode::Strong => next,
                MergeMode::Weak => prev,
            },
        }
    }

    /// Plain stringification used by title composition when no formatter
    /// applies. Whole numbers print without a decimal point.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null | Value::Map(_) => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::Text(s) => s.clone(),
            Value::List(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(Value::to_display_string)
                    .filter(|s| !s.is_empty())
                    .collect();
                parts.join(", ")
            }
            Value::Set(members) => {
                let parts: Vec<&str> = members.iter().map(String::as_str).collect();
                parts.join(", ")
            }
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_scalar_collision_lets_the_newer_value_win() {
        let merged = Value::from("old").merge(Value::from("new"), MergeMode::Strong);
        assert_eq!(merged, Value::from("new"));
    }

    #[test]
    fn weak_scalar_collision_keeps_the_existing_value() {
        let merged = Value::from("old").merge(Value::from("new"), MergeMode::Weak);
        assert_eq!(merged, Value::from("old"));
    }

    #[test]
    fn null_never_overwrites() {
        let merged = Value::from(42i64).merge(Value::Null, MergeMode::Strong);
        assert_eq!(merged, Value::from(42i64));
    }

    #[test]
    fn lists_concatenate_in_both_modes() {
        for mode in [MergeMode::Strong, MergeMode::Weak] {
            let merged = Value::list([Value::from(1i64)]).merge(Value::list([Value::from(2i64)]), mode);
            assert_eq!(merged, Value::list([Value::from(1i64), Value::from(2i64)]));
        }
    }

    #[test]
    fn scalar_appends_to_list() {
        let merged = Value::list([Value::from("a")]).merge(Value::from("b"), MergeMode::Strong);
        assert_eq!(merged, Value::list([Value::from("a"), Value::from("b")]));
    }

    #[test]
    fn maps_merge_recursively_with_the_same_mode() {
        let prev = Value::map([("inner", Value::map([("k", Value::from("old"))]))]);
        let next = Value::map([("inner", Value::map([("k", Value::from("new")), ("extra", Value::from(1i64))]))]);

        let strong = prev.clone().merge(next.clone(), MergeMode::Strong);
        assert_eq!(strong.get_in(&["inner", "k"]), Some(&Value::from("new")));
        assert_eq!(strong.get_in(&["inner", "extra"]), Some(&Value::from(1i64)));

        let weak = prev.merge(next, MergeMode::Weak);
        assert_eq!(weak.get_in(&["inner", "k"]), Some(&Value::from("old")));
        assert_eq!(weak.get_in(&["inner", "extra"]), Some(&Value::from(1i64)));
    }

    #[test]
    fn sets_union() {
        let merged = Value::set(["a", "b"]).merge(Value::set(["b", "c"]), MergeMode::Weak);
        assert_eq!(merged, Value::set(["a", "b", "c"]));
    }

    #[test]
    fn shape_mismatch_falls_back_to_the_scalar_rule() {
        let strong = Value::map([("k", Value::from(1i64))]).merge(Value::from("flat"), MergeMode::Strong);
        assert_eq!(strong, Value::from("flat"));

        let weak = Value::set(["a"]).merge(Value::from("flat"), MergeMode::Weak);
        assert_eq!(weak, Value::set(["a"]));
    }

    #[test]
    fn emptiness_covers_nested_containers() {
        assert!(Value::Null.is_empty());
        assert!(Value::from("").is_empty());
        assert!(!Value::from(0i64).is_empty());
        assert!(Value::list([]).is_empty());
        assert!(Value::list([Value::Null, Value::from("")]).is_empty());
        assert!(!Value::list([Value::from(""), Value::from("x")]).is_empty());
        assert!(Value::map([("a", Value::Null)]).is_empty());
        assert!(Value::map([("is-empty", Value::from(true)), ("a", Value::from(1i64))]).is_empty());
    }

    #[test]
    fn display_strings_trim_whole_number_points() {
        assert_eq!(Value::from(98i64).to_display_string(), "98");
        assert_eq!(Value::from(1.5).to_display_string(), "1.5");
        assert_eq!(Value::from("x").to_display_string(), "x");
        assert_eq!(Value::Null.to_display_string(), "");
    }
}
