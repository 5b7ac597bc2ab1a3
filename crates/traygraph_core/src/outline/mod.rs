//! Plain-text outline interchange.
//!
//! # Responsibility
//! - Convert between dash-indented markdown outlines and trays.

pub mod markdown;
