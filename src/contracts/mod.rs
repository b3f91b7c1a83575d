//! Contract views of a composed graph: tag-based filtering of subgraphs and
//! reachability-driven pruning of the resulting supergraph.

pub mod reachability;
pub mod tag_filter;

pub use reachability::add_inaccessible_to_unreachable_types;
pub use reachability::reachable_type_names;
pub use tag_filter::TagFilter;
pub use tag_filter::apply_tag_filter_on_subgraphs;
