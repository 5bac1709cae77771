//! Shared vocabulary for the declower workspace.
//!
//! This crate has no knowledge of declarations or target code; it only holds
//! the leaf types every other crate needs: source spans, qualified names,
//! stable declaration hashes, modifier flags and the error hierarchy.

mod decl_hash;
mod error;
mod modifiers;
mod qualified_name;
mod span;

pub use decl_hash::{DeclHash, hash_constants};
pub use error::{LoweringError, ModelError};
pub use modifiers::Modifiers;
pub use qualified_name::QualifiedName;
pub use span::Span;
