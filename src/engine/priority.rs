//! Field priority ordering.
//!
//! Field instances are sorted once per resolver build; the order is the
//! precedence during merging, because within one entity's field pass a later
//! field overwrites an earlier one. The bands encode: archived/default data
//! first (applied, then superseded), ordinary fields by weight, then
//! shifts-scoped and finally reports-scoped fields, so register-specific
//! values take final precedence over generic ones.

use crate::model::{FieldIndex, FieldInstance};
use crate::registers::{REPORTS_REG_ID, SHIFTS_REG_ID};

pub(crate) fn priority(fi: &FieldInstance) -> i64 {
    if fi.archived {
        return -10_000 + fi.weight;
    }
    match fi.registry_id.as_deref() {
        Some(REPORTS_REG_ID) => 10_000 + fi.weight,
        Some(SHIFTS_REG_ID) => 1_000 + fi.weight,
        _ => fi.weight,
    }
}

/// Clone the index into a vector sorted by [`priority`]. The sort is stable
/// over the index's deterministic key order, so equal-priority fields keep a
/// reproducible relative order.
pub(crate) fn sorted_fields(index: &FieldIndex) -> Vec<FieldInstance> {
    let mut fields: Vec<FieldInstance> = index.values().cloned().collect();
    fields.sort_by_key(priority);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldKind;
    use std::collections::BTreeMap;

    fn field(id: &str, registry_id: Option<&str>, weight: i64, archived: bool) -> FieldInstance {
        FieldInstance {
            registry_id: registry_id.map(str::to_string),
            weight,
            archived,
            ..FieldInstance::new(id, "default-number", FieldKind::Plain)
        }
    }

    #[test]
    fn archived_sorts_first_and_register_bands_sort_last() {
        let mut index: FieldIndex = BTreeMap::new();
        index.insert("A".into(), field("A", Some(REPORTS_REG_ID), 1, false));
        index.insert("B".into(), field("B", Some(SHIFTS_REG_ID), 1, false));
        index.insert("C".into(), field("C", None, 5, false));
        index.insert("D".into(), field("D", None, 3, true));

        let sorted = sorted_fields(&index);
        let order: Vec<&str> = sorted.iter().map(|fi| fi.id.as_str()).collect();
        assert_eq!(order, vec!["D", "C", "B", "A"]);
    }

    #[test]
    fn weight_orders_within_a_band() {
        assert!(priority(&field("a", None, 2, false)) < priority(&field("b", None, 7, false)));
        assert!(
            priority(&field("a", Some(SHIFTS_REG_ID), 9, false)) < priority(&field("b", Some(REPORTS_REG_ID), 0, false))
        );
        assert!(priority(&field("a", None, 9, true)) < priority(&field("b", None, -50, false)));
    }
}
