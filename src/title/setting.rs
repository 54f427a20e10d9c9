//! Title-setting normalization.
//!
//! Hosts hand title configuration over in one of three shapes:
//!
//! ```text
//! keyed    -> { "<shifts>/dynamic-title": { separator, fields } }
//! wrapper  -> { <anything>: { id: "<shifts>/dynamic-title", value: {...} } }
//! bare     -> { separator, fields }
//! ```
//!
//! All three normalize once, at this boundary, into [`TitleSetting`]; the
//! composition code never probes shapes. The normalized setting is kept in a
//! single-slot memo keyed on structural equality of the raw settings value,
//! so repeated composition with unchanged settings skips re-normalization
//! and regex construction.

use std::sync::{Arc, Mutex, PoisonError};

use regex::Regex;

use crate::registers::shift_title_setting_id;
use crate::value::Value;

pub const DEFAULT_SEPARATOR: &str = ", ";

/// One configured title component: the result key to read and an optional
/// format id selecting how to render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleField {
    pub id: String,
    pub format: Option<String>,
}

/// Canonical title configuration.
#[derive(Debug, Clone)]
pub struct TitleSetting {
    pub separator: String,
    pub fields: Vec<TitleField>,
    /// Matches a string made solely of separator characters; absent for the
    /// empty separator.
    pub(crate) separator_only: Option<Regex>,
    /// Matches two adjacent separators with optional whitespace between.
    pub(crate) consecutive: Option<Regex>,
}

impl TitleSetting {
    pub fn new(separator: impl Into<String>, fields: Vec<TitleField>) -> Self {
        let separator = separator.into();
        let separator_only = (!separator.is_empty())
            .then(|| Regex::new(&format!("^[{}]*$", class_escape(&separator))).ok())
            .flatten();
        let consecutive = (!separator.is_empty())
            .then(|| {
                let escaped = regex::escape(&separator);
                Regex::new(&format!("{escaped}\\s*{escaped}")).ok()
            })
            .flatten();
        TitleSetting { separator, fields, separator_only, consecutive }
    }

    /// Normalize any of the three accepted shapes.
    pub fn from_value(settings: &Value) -> Self {
        let setting = extract(settings);
        let separator = setting
            .get("separator")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SEPARATOR);
        let fields = match setting.get("fields") {
            Some(Value::List(items)) => items
                .iter()
                .filter_map(|item| {
                    let id = item.get("id").and_then(Value::as_str)?;
                    // Hosts send either spelling of the format key.
                    let format = item
                        .get("format-id")
                        .or_else(|| item.get("formatId"))
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    Some(TitleField { id: id.to_string(), format })
                })
                .collect(),
            _ => Vec::new(),
        };
        TitleSetting::new(separator, fields)
    }
}

impl Default for TitleSetting {
    fn default() -> Self {
        TitleSetting::new(DEFAULT_SEPARATOR, Vec::new())
    }
}

/// Locate the `{separator, fields}` payload inside `settings`.
fn extract(settings: &Value) -> &Value {
    let key = shift_title_setting_id();
    let mut setting = settings.get(key);

    if setting.is_none() {
        if let Value::Map(entries) = settings {
            setting = entries
                .values()
                .find(|candidate| candidate.get("id").and_then(Value::as_str) == Some(key))
                .and_then(|wrapper| wrapper.get("value"));
        }
    }

    let setting = setting.unwrap_or(settings);
    if setting.get("id").and_then(Value::as_str) == Some(key) {
        setting.get("value").unwrap_or(setting)
    } else {
        setting
    }
}

/// Escape `separator` for use inside a regex character class.
fn class_escape(separator: &str) -> String {
    let mut out = String::with_capacity(separator.len());
    for c in separator.chars() {
        if matches!(c, '\\' | '[' | ']' | '^' | '-' | '&' | '~') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Single-slot [`TitleSetting::from_value`] memo keyed on structural
/// equality of the raw settings value.
pub(crate) struct SettingMemo {
    slot: Mutex<Option<(Value, Arc<TitleSetting>)>>,
}

impl SettingMemo {
    pub(crate) const fn new() -> Self {
        SettingMemo { slot: Mutex::new(None) }
    }

    pub(crate) fn normalize(&self, settings: &Value) -> Arc<TitleSetting> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((raw, normalized)) = slot.as_ref() {
            if raw == settings {
                return Arc::clone(normalized);
            }
        }
        let normalized = Arc::new(TitleSetting::from_value(settings));
        *slot = Some((settings.clone(), Arc::clone(&normalized)));
        normalized
    }
}

static NORMALIZED: SettingMemo = SettingMemo::new();

pub(crate) fn normalize_settings(settings: &Value) -> Arc<TitleSetting> {
    NORMALIZED.normalize(settings)
}
