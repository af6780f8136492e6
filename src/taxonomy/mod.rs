//! Taxonomy data model
//!
//! A taxonomy is a named group of terms. Content items carry term
//! associations per group; the same logical term may be attached to an
//! item through several groups at once (legacy and canonical).

mod schema;
mod term;

pub use schema::{CanonicalSchema, RoutePattern};
pub use term::{slugify, GroupName, ItemId, NewTerm, Term, TermRef};
