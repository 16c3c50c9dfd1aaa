//! Common types module for the dust aggregator.
//!
//! This module defines the data model shared by every aggregator component:
//! normalized dust items, remote operation descriptors, submission and result
//! types, batch state, and the events published while a batch runs.

/// Batch state, per-item outcomes and failure reasons.
pub mod batch;
/// Normalized dust balances and the raw readings they are built from.
pub mod dust;
/// Shared invocation error taxonomy.
pub mod errors;
/// Event types published to presentation layers.
pub mod events;
/// Settlement network configuration.
pub mod networks;
/// Remote operation descriptors and the typed parameter schema.
pub mod operation;
/// Self-registering implementation trait.
pub mod registry;
/// Redacting wrapper for secret seeds.
pub mod secret_string;
/// Signed submissions, handles and raw network results.
pub mod submission;
/// Utility functions for amount scaling and display.
pub mod utils;
/// Configuration validation types for implementation configs.
pub mod validation;

pub use batch::*;
pub use dust::*;
pub use errors::*;
pub use events::*;
pub use networks::{AddressSchemeKind, NetworkConfig};
pub use operation::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use submission::*;
pub use utils::{
	current_timestamp, format_usd, from_minor_units, scale_base_units, to_minor_units, truncate_id,
	with_0x_prefix, without_0x_prefix, AmountError,
};
pub use validation::*;
