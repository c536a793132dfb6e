//! Utility modules for adforge.

pub mod json_repair;

pub use json_repair::extract_json;
