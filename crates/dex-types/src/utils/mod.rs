//! Formatting helpers shared across the executor.

pub mod formatting;

pub use formatting::{explorer_link, format_token_amount, truncate_id};
