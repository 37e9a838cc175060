//! Value Resolver/Writer
//!
//! Reads and upserts the values an entity has stored against the field
//! definitions applicable to its tenant type. Validation runs over the
//! whole submission before any write; writes for one submission share a
//! single transaction.

pub mod store;
pub mod validate;

pub use store::{get_values, set_values};
pub use validate::{validate_submission, WriteOp};
