//! Factory functions for the pluggable console components.

use stall_core::ConsoleFactories;
use stall_storage::implementations::file::create_storage as create_file_storage;
use stall_storage::implementations::memory::create_storage as create_memory_storage;
use stall_storage::StorageFactory;

/// Builds a factory map, casting each entry to the interface's factory type.
macro_rules! create_factory_map {
    ($factory_type:ty, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert($name.to_string(), $factory as $factory_type);
        )*
        factories
    }};
}

/// Every implementation the console binary can be configured with.
pub fn console_factories() -> ConsoleFactories<StorageFactory> {
	ConsoleFactories {
		storage_factories: create_factory_map!(
			StorageFactory,
			"file" => create_file_storage,
			"memory" => create_memory_storage,
		),
	}
}
