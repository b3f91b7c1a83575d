//! Federated GraphQL composition with contract schema filtering.
//!
//! This crate composes a set of subgraph schemas into a supergraph, derives
//! the public (API) schema, and produces *contract* variants of both: a
//! contract hides every schema element whose `@tag`s fall outside the
//! contract's include/exclude filter, and can additionally prune types the
//! filtered public schema can no longer reach.
//!
//! [`composition::compose`] is the entry point; the lower-level building
//! blocks ([`merge`], [`contracts`], [`api_schema`], [`metadata`]) are public
//! for callers that need individual phases.

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

pub mod api_schema;
pub mod composition;
pub mod contracts;
pub mod error;
pub mod link;
pub mod merge;
pub mod metadata;
pub mod subgraph;

pub use crate::api_schema::to_public_schema;
pub use crate::composition::CompositionResult;
pub use crate::composition::compose;
pub use crate::contracts::TagFilter;
pub use crate::error::CompositionError;
pub use crate::merge::merge_subgraphs;
pub use crate::subgraph::Subgraph;
