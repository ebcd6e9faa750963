//! Model layer
//!
//! Declaring models, registering their table metadata, and the validated
//! instances built on top of them.
//!
//! - `Field`: a named slot with a normalized validator and flags
//! - `ModelDef` / `Table`: declaration and registered metadata
//! - `ModelRegistry`: model identity to table, append-only
//! - `Document`: one instance, validated on every write
//! - `ModelLoader`: definitions persisted as JSON files

mod document;
mod field;
mod loader;
mod registry;
mod table;

pub use document::Document;
pub use field::Field;
pub use loader::ModelLoader;
pub use registry::ModelRegistry;
pub use table::{FieldRecord, ModelDef, ModelRecord, Table};
