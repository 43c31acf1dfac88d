//! Recursive subgroup traversal and report generation.

pub mod report;
pub mod walk;

pub use report::Report;
pub use walk::{traverse, Walker, DEFAULT_MAX_DEPTH};
