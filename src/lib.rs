extern crate self as refbuilder;

mod api;
mod cache;
mod engine;
mod model;
pub mod registers;
mod title;
mod value;

pub use api::build_resolver;
pub use cache::{Cache, DEFAULT_LIFETIME, DEFAULT_MAX_SIZE, stop_background_sweep};
pub use engine::Resolver;
pub use model::{
    Article, ArticleIndex, ArticleType, FieldIndex, FieldInstance, FieldKind, FieldSettings, Item,
    ItemIndex, RefData, Snapshot,
};
pub use title::{DEFAULT_SEPARATOR, TitleField, TitleSetting, compose_title};
pub use value::{MergeMode, Value};
