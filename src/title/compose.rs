//! Title composition over resolved data.
//!
//! Two modes, selected by the normalized setting:
//!
//! - field-based (settings carry a non-empty `fields` list and field
//!   definitions were supplied): each configured field's resolved value is
//!   rendered through its format id and the fragments are joined.
//! - path-based (everything else): the `title` of every path segment
//!   accumulated during registry-reference resolution is joined, optionally
//!   excluding one registry via `remove_id`; an empty path falls back to
//!   the resolved `title` value.
//!
//! Both modes share the cleanup invariant: empty and whitespace-only
//! fragments are dropped, runs of adjacent separators collapse, and a
//! result that is empty or consists solely of separator characters is
//! `None` rather than a string like `", , "`.

use regex::NoExpand;

use super::format::formatter;
use super::setting::{TitleSetting, normalize_settings};
use crate::model::{FieldIndex, RefData};
use crate::value::Value;

/// Compose a display title for `data`.
///
/// `settings` accepts any of the shapes normalized by
/// [`TitleSetting::from_value`]; `remove_id` excludes one registry's
/// segment from path-based composition. Returns `None` when nothing
/// composable is present.
pub fn compose_title(
    data: &RefData,
    remove_id: Option<&str>,
    settings: Option<&Value>,
    fields: Option<&FieldIndex>,
) -> Option<String> {
    match settings {
        Some(settings) => {
            let setting = normalize_settings(settings);
            match fields {
                Some(_) if !setting.fields.is_empty() => field_based(data, &setting),
                _ => path_based(data, remove_id, &setting),
            }
        }
        None => path_based(data, remove_id, &TitleSetting::default()),
    }
}

fn field_based(data: &RefData, setting: &TitleSetting) -> Option<String> {
    let parts: Vec<String> = setting
        .fields
        .iter()
        .map(|field| {
            let value = data.get(&field.id);
            match field.format.as_deref() {
                Some("registry-reference") => registry_reference_part(data, value),
                Some("standard") | None => value.map(Value::to_display_string).unwrap_or_default(),
                Some(other) => formatter(other)(value.unwrap_or(&Value::Null)).unwrap_or_default(),
            }
        })
        .collect();
    join_clean(parts, setting)
}

/// A registry-reference field's value is an id; render the title of the
/// path segment it points at, falling back to the raw value when no
/// segment matches.
fn registry_reference_part(data: &RefData, value: Option<&Value>) -> String {
    let raw = value.map(Value::to_display_string).unwrap_or_default();
    let Some(wanted) = value.and_then(Value::as_str) else {
        return raw;
    };
    for segment in data.path() {
        let hit = segment.get("id").and_then(Value::as_str) == Some(wanted)
            || segment.get("registry-id").and_then(Value::as_str) == Some(wanted);
        if !hit {
            continue;
        }
        if let Some(title) = segment.get("title").and_then(Value::as_str) {
            if !title.is_empty() {
                return title.to_string();
            }
        }
    }
    raw
}

fn path_based(data: &RefData, remove_id: Option<&str>, setting: &TitleSetting) -> Option<String> {
    let mut parts: Vec<String> = data
        .path()
        .iter()
        .filter(|segment| {
            remove_id.is_none_or(|id| segment.get("registry-id").and_then(Value::as_str) != Some(id))
        })
        .filter_map(|segment| segment.get("title").and_then(Value::as_str))
        .filter(|title| !title.trim().is_empty())
        .map(str::to_string)
        .collect();

    if parts.is_empty() {
        if let Some(title) = data.get("title").and_then(Value::as_str) {
            if !title.trim().is_empty() {
                parts.push(title.to_string());
            }
        }
    }

    join_clean(parts, setting)
}

/// Join fragments under the cleanup invariant.
fn join_clean(parts: Vec<String>, setting: &TitleSetting) -> Option<String> {
    let parts: Vec<&str> = parts.iter().map(|p| p.trim()).filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return None;
    }

    let mut result = parts.join(&setting.separator);

    // Fragments themselves may contain separator runs.
    if let Some(consecutive) = &setting.consecutive {
        loop {
            let collapsed = consecutive.replace_all(&result, NoExpand(&setting.separator)).into_owned();
            if collapsed == result {
                break;
            }
            result = collapsed;
        }
    }
    if !setting.separator.is_empty() {
        let cleaned: Vec<&str> = result
            .split(setting.separator.as_str())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if cleaned.is_empty() {
            return None;
        }
        result = cleaned.join(&setting.separator);
    }

    if let Some(only) = &setting.separator_only {
        if only.is_match(result.trim()) {
            return None;
        }
    }
    if result.trim().is_empty() { None } else { Some(result) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(title: &str, id: &str, registry_id: &str) -> Value {
        Value::map([
            ("title", Value::from(title)),
            ("id", Value::from(id)),
            ("registry-id", Value::from(registry_id)),
        ])
    }

    fn data_with_path(segments: Vec<Value>) -> RefData {
        let mut data = RefData::new();
        data.set("path", Value::List(segments));
        data
    }

    #[test]
    fn path_composition_joins_segment_titles_with_the_separator() {
        let data = data_with_path(vec![segment("Customer 001", "C1", "CUSTOMERS")]);
        let settings = Value::map([("separator", Value::from(" - "))]);
        assert_eq!(compose_title(&data, None, Some(&settings), None), Some("Customer 001".to_string()));

        let data = data_with_path(vec![
            segment("Customer 001", "C1", "CUSTOMERS"),
            segment("Project A", "P1", "PROJECTS"),
        ]);
        assert_eq!(
            compose_title(&data, None, Some(&settings), None),
            Some("Customer 001 - Project A".to_string())
        );
    }

    #[test]
    fn remove_id_excludes_one_registry_segment() {
        let data = data_with_path(vec![
            segment("Customer 001", "C1", "CUSTOMERS"),
            segment("Project A", "P1", "PROJECTS"),
        ]);
        assert_eq!(compose_title(&data, Some("CUSTOMERS"), None, None), Some("Project A".to_string()));
    }

    #[test]
    fn empty_path_falls_back_to_the_resolved_title() {
        let mut data = RefData::new();
        data.set("title", Value::from("Standalone"));
        assert_eq!(compose_title(&data, None, None, None), Some("Standalone".to_string()));
    }

    #[test]
    fn nothing_composable_is_none() {
        assert_eq!(compose_title(&RefData::new(), None, None, None), None);

        // All segment titles blank.
        let data = data_with_path(vec![segment("", "C1", "CUSTOMERS"), segment("   ", "P1", "PROJECTS")]);
        assert_eq!(compose_title(&data, None, None, None), None);
    }

    #[test]
    fn field_composition_renders_configured_fields() {
        let mut data = data_with_path(vec![segment("Customer 001", "C1", "CUSTOMERS")]);
        data.set("NAME_FIELD", Value::from("Alpha"));
        data.set("CUSTOMER_REF", Value::from("C1"));
        data.set("ACTIVE", Value::from(true));

        let settings = Value::map([
            ("separator", Value::from(" » ")),
            (
                "fields",
                Value::list([
                    Value::map([("id", Value::from("NAME_FIELD")), ("format-id", Value::from("standard"))]),
                    Value::map([("id", Value::from("CUSTOMER_REF")), ("format-id", Value::from("registry-reference"))]),
                    Value::map([("id", Value::from("ACTIVE")), ("format-id", Value::from("boolean"))]),
                ]),
            ),
        ]);
        let fields = FieldIndex::new();
        assert_eq!(
            compose_title(&data, None, Some(&settings), Some(&fields)),
            Some("Alpha » Customer 001 » Yes".to_string())
        );
    }

    #[test]
    fn registry_reference_falls_back_to_the_raw_value() {
        let mut data = data_with_path(vec![segment("Customer 001", "C1", "CUSTOMERS")]);
        data.set("CUSTOMER_REF", Value::from("UNKNOWN"));

        let settings = Value::map([(
            "fields",
            Value::list([Value::map([
                ("id", Value::from("CUSTOMER_REF")),
                ("format-id", Value::from("registry-reference")),
            ])]),
        )]);
        let fields = FieldIndex::new();
        assert_eq!(compose_title(&data, None, Some(&settings), Some(&fields)), Some("UNKNOWN".to_string()));
    }

    #[test]
    fn empty_fragments_never_leave_separator_runs() {
        let mut data = RefData::new();
        data.set("A", Value::from("SomeValue"));
        data.set("C", Value::from("AnotherValue"));

        let settings = Value::map([
            ("separator", Value::from(" » ")),
            (
                "fields",
                Value::list([
                    Value::map([("id", Value::from("A"))]),
                    Value::map([("id", Value::from("B"))]),
                    Value::map([("id", Value::from("C"))]),
                ]),
            ),
        ]);
        let fields = FieldIndex::new();
        assert_eq!(
            compose_title(&data, None, Some(&settings), Some(&fields)),
            Some("SomeValue » AnotherValue".to_string())
        );
    }

    #[test]
    fn all_empty_fields_compose_to_none() {
        let settings = Value::map([(
            "fields",
            Value::list([
                Value::map([("id", Value::from("A"))]),
                Value::map([("id", Value::from("B"))]),
            ]),
        )]);
        let fields = FieldIndex::new();
        assert_eq!(compose_title(&RefData::new(), None, Some(&settings), Some(&fields)), None);
    }

    #[test]
    fn separator_runs_inside_fragments_collapse() {
        let mut data = RefData::new();
        data.set("A", Value::from("SomeValue, , AnotherValue"));

        let settings = Value::map([("fields", Value::list([Value::map([("id", Value::from("A"))])]))]);
        let fields = FieldIndex::new();
        assert_eq!(
            compose_title(&data, None, Some(&settings), Some(&fields)),
            Some("SomeValue, AnotherValue".to_string())
        );
    }

    #[test]
    fn separator_only_fragments_compose_to_none() {
        let mut data = RefData::new();
        data.set("A", Value::from(", ,"));

        let settings = Value::map([("fields", Value::list([Value::map([("id", Value::from("A"))])]))]);
        let fields = FieldIndex::new();
        assert_eq!(compose_title(&data, None, Some(&settings), Some(&fields)), None);
    }
}
