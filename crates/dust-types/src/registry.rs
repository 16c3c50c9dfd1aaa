//! Registration trait for pluggable implementations.

/// Ties an implementation to the name it is selected by in config and to the
/// factory that builds it.
///
/// Each pluggable concern (price tables, signers, submission backends)
/// defines its own factory type. Implementations expose a `Registry` struct
/// implementing this trait, and the concern's `get_all_implementations`
/// collects them for the builder.
pub trait ImplementationRegistry {
	/// Key used in config, e.g. `"static"` for `[prices.implementations.static]`
	/// or `"local"` for `[accounts.<chain>] implementation = "local"`.
	const NAME: &'static str;

	type Factory;

	fn factory() -> Self::Factory;
}
