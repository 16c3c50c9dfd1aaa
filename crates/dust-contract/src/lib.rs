//! Aggregator contract surface.
//!
//! Encodes typed operation arguments into position-encoded requests for the
//! aggregator contract and decodes the values it returns. Address parameters
//! are checked against the settlement network's address scheme.

pub mod address;
pub mod decoder;
pub mod encoder;

pub use address::{scheme_for, AddressScheme, EvmAddressScheme, StellarAddressScheme};
pub use decoder::{decode, decode_for};
pub use encoder::{is_valid_symbol, InvocationEncoder, MAX_SYMBOL_LEN};
