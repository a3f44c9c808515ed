//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Each pluggable implementation (storage backends, backend clients)
/// provides a `Registry` struct that declares the name used to select it in
/// the configuration file and the factory that builds it.
pub trait ImplementationRegistry {
	/// Name used in configuration, e.g. "memory" for
	/// `session.storage.implementations.memory`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
