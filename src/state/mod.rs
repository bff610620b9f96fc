//! State module for crawl data
//!
//! # Components
//!
//! - `JobRecord`: one discovered listing, basic or enriched
//! - `JobSource`: the site a listing came from
//! - `TraversalState`: the per-query listing traversal state machine

mod job;
mod traversal_state;

// Re-export main types
pub use job::{JobRecord, JobSource, DESCRIPTION_NOT_FOUND};
pub use traversal_state::TraversalState;
