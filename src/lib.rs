//! astrology - A schema-validated object-document mapper
//!
//! - `schema`: compact shorthand specs normalized into validator trees
//! - `model`: field descriptors, registered table metadata, validated documents
//! - `session`: unit of work with an identity map over a document store

pub mod config;
pub mod model;
pub mod observability;
pub mod schema;
pub mod session;

pub use config::{AstrologyConfig, ConfigError, ConfigResult};
pub use model::{Document, Field, ModelDef, ModelRegistry, Table};
pub use schema::{normalize, SchemaError, SchemaResult, Spec, Validator};
pub use session::{DocumentStore, MemoryStore, Session, SessionError, SessionResult};
