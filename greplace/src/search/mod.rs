//! Recursive search-and-replace orchestration.
//!
//! [`params`] turns a validated [`crate::config::SearchConfig`] into the
//! compiled form the engine consumes, and [`engine`] runs the traversal on a
//! background thread, streaming results to a [`SearchObserver`].

pub mod engine;
pub mod params;

pub use engine::{SearchEngine, SearchObserver};
pub use params::{IncludeFilter, SearchParams};
