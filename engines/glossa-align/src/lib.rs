pub mod graph;
pub mod project;

pub use graph::AlignmentIndex;
pub use project::{build_quote_with_ellipsis, find_aligned_tokens};
