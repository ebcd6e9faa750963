//! Unit-of-work session
//!
//! - `DocumentStore`: the external store contract, `MemoryStore` in process
//! - `IdentityMap`: weak (model, key) -> live document map
//! - `Session`: pending inserts/deletes applied in one batch on commit
//!
//! A session is single-owner: documents are shared as `Rc<RefCell<_>>` and
//! the session is not `Send`.

mod errors;
mod identity;
mod store;
mod unit_of_work;

pub use errors::{SessionError, SessionResult, StoreError, StoreResult};
pub use identity::{DocumentRef, IdentityKey, IdentityMap};
pub use store::{DeleteOp, DocumentStore, InsertOp, MemoryStore, WriteBatch};
pub use unit_of_work::Session;
