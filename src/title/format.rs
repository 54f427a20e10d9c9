//! Built-in value formatters for field-based title composition.
//!
//! A formatter turns one resolved value into a display fragment; `None`
//! means the value contributes nothing (the part is dropped before
//! joining). Unknown format ids resolve to `standard`, so a bad format id
//! degrades to plain stringification instead of failing the composition.

use chrono::NaiveDateTime;

use crate::value::Value;

pub(crate) type Formatter = fn(&Value) -> Option<String>;

pub(crate) fn formatter(id: &str) -> Formatter {
    match id {
        "address" => address,
        "address-address1" => address_address1,
        "address-address2" => address_address2,
        "address-city" => address_city,
        "address-zip" => address_zip,
        "address-country" => address_country,
        "breaks" => breaks,
        "start-end" => start_end,
        "boolean" => boolean,
        "color" => color,
        _ => standard,
    }
}

fn standard(value: &Value) -> Option<String> {
    let s = value.to_display_string().trim().to_string();
    if s.is_empty() { None } else { Some(s) }
}

fn boolean(value: &Value) -> Option<String> {
    if value.is_null() {
        return None;
    }
    Some(if value.is_truthy() { "Yes".to_string() } else { "No".to_string() })
}

fn color(value: &Value) -> Option<String> {
    let s = value.to_display_string().trim().to_lowercase();
    if s.is_empty() { Some("5bc0de".to_string()) } else { Some(s) }
}

fn part(value: &Value, key: &str) -> Option<String> {
    let s = value.get(key)?.as_str()?.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}

fn address(value: &Value) -> Option<String> {
    let address1 = part(value, "address1");
    let address2 = part(value, "address2");
    let zip = part(value, "zip");
    let city = part(value, "city");
    let country = part(value, "country");

    let mut parts: Vec<String> = Vec::new();
    if let Some(address1) = address1 {
        parts.push(address1);
    }
    if let Some(address2) = address2 {
        parts.push(address2);
    }
    match (zip, city) {
        (Some(zip), Some(city)) => parts.push(format!("{zip} {city}")),
        (Some(zip), None) => parts.push(zip),
        (None, Some(city)) => parts.push(city),
        (None, None) => {}
    }
    if let Some(country) = country {
        parts.push(country);
    }

    if parts.is_empty() { None } else { Some(parts.join(", ")) }
}

fn address_address1(value: &Value) -> Option<String> {
    part(value, "address1").map(|s| s.to_uppercase())
}

fn address_address2(value: &Value) -> Option<String> {
    part(value, "address2").map(|s| s.to_uppercase())
}

fn address_city(value: &Value) -> Option<String> {
    part(value, "city").map(|s| s.to_uppercase())
}

fn address_zip(value: &Value) -> Option<String> {
    part(value, "zip")
}

fn address_country(value: &Value) -> Option<String> {
    part(value, "country").map(|s| s.to_uppercase())
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// `HH:MM-HH:MM` per break, joined with `", "`. Unparsable breaks are
/// skipped.
fn breaks(value: &Value) -> Option<String> {
    let Value::List(items) = value else {
        return None;
    };
    let parts: Vec<String> = items
        .iter()
        .filter_map(|item| {
            let start = parse_timestamp(item.get("start")?.as_str()?)?;
            let end = parse_timestamp(item.get("end")?.as_str()?)?;
            Some(format!("{}-{}", start.format("%H:%M"), end.format("%H:%M")))
        })
        .collect();
    if parts.is_empty() { None } else { Some(parts.join(", ")) }
}

/// `YYYY-MM-DD HH:MM, HH:MM` from a `[start, end]` pair.
fn start_end(value: &Value) -> Option<String> {
    let Value::List(items) = value else {
        return None;
    };
    let start = parse_timestamp(items.first()?.as_str()?)?;
    let end = parse_timestamp(items.get(1)?.as_str()?)?;
    Some(format!("{}, {}", start.format("%Y-%m-%d %H:%M"), end.format("%H:%M")))
}
