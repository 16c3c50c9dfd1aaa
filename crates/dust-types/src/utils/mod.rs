//! Helpers shared across the aggregator crates.

pub mod amounts;
pub mod formatting;
pub mod helpers;

pub use amounts::{from_minor_units, scale_base_units, to_minor_units, AmountError};
pub use formatting::{format_usd, truncate_id, with_0x_prefix, without_0x_prefix};
pub use helpers::current_timestamp;
