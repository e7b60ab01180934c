//! Utility functions and helpers
//!
//! URL parsing and query-string editing used by the capture store and the
//! probe engine.

pub mod uri;

// Re-export commonly used utilities
pub use uri::*;
