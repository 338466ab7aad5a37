//! Utility functions for identifier generation and timestamp handling.

pub mod timestamps;
mod ids;

pub use ids::{artifact_fingerprint, generate_uuid};
pub use timestamps::{format_iso8601, format_log_timestamp, iso_timestamp, now_utc, Timestamp};
