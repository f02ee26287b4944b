//! Utility functions for string formatting and manipulation.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{file_slug, format_date, format_optional, truncate_string, yes_no};
