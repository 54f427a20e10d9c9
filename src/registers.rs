//! Well-known register identifiers.
//!
//! These ids are part of the contract between the engine and the host's
//! field definitions: the priority ordering bands on the reports and shifts
//! registers, and title composition looks its setting up under
//! `<shifts>/dynamic-title`.

use once_cell::sync::Lazy;

pub const ALLOWANCE_REG_ID: &str = "5565928d2f4d70942934d1eb";
pub const AVAIL_REG_ID: &str = "57ee1cd077187846c0283da3";
pub const MATERIALS_REG_ID: &str = "5564a98431cd2f70ae1fc5d1";
pub const REPORTS_REG_ID: &str = "553e2f263029e0478fc757f3";
pub const SHIFTS_REG_ID: &str = "553e2f1f3029e0478fc757f2";
pub const USERS_REG_ID: &str = "553e2f063029e0478fc757f1";

static SHIFT_TITLE_SETTING_ID: Lazy<String> = Lazy::new(|| format!("{SHIFTS_REG_ID}/dynamic-title"));

/// The settings key under which the shifts register's dynamic-title
/// configuration lives.
pub fn shift_title_setting_id() -> &'static str {
    &SHIFT_TITLE_SETTING_ID
}
