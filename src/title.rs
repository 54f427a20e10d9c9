//! Title composition.
//!
//! Turns resolved [`RefData`](crate::RefData) into a display string.
//! Split into focused submodules under `src/title/`:
//!
//! ```text
//! raw settings value ── setting.rs ── TitleSetting { separator, fields }
//!                                       (three shapes normalized once,
//!                                        memoized on structural equality)
//!                               │
//!                               v
//!                        compose.rs
//!                          - field-based: render each configured field
//!                            through its format id     (format.rs)
//!                          - path-based: join ancestor titles from the
//!                            resolution path
//!                          - shared cleanup: no empty fragments, no
//!                            separator-only results
//! ```

#[path = "title/compose.rs"]
mod compose;
#[path = "title/format.rs"]
mod format;
#[path = "title/setting.rs"]
mod setting;

pub use compose::compose_title;
pub use setting::{DEFAULT_SEPARATOR, TitleField, TitleSetting};
