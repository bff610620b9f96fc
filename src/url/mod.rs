//! URL handling module for Jobtrawl
//!
//! Job links are canonicalized into absolute URLs that serve as the identity key
//! of a listing for deduplication and storage.

mod normalize;

pub use normalize::canonicalize_job_url;
