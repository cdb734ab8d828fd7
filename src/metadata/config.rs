//! Domain configuration
//!
//! This module provides configuration options for a [`crate::metadata::typesystem::Domain`]:
//! when method bodies are translated, whether bulk translation runs in parallel, and the
//! initial sizes of the shared caches.

/// Configuration for a [`crate::metadata::typesystem::Domain`]
///
/// Translation is always lazy per method: [`crate::metadata::method::Method::compiled_body`]
/// translates on first access. These options only control bulk translation driven by the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainConfig {
    /// Translate every method body of a type when it is loaded through
    /// [`crate::metadata::typesystem::Domain::load_type`]; the first translation failure fails
    /// the load
    pub compile_on_load: bool,

    /// Fan bulk translation out over the rayon thread pool
    pub parallel_compile: bool,

    /// Initial capacity of the string literal cache
    pub string_cache_capacity: usize,

    /// Initial capacity of the method descriptor caches
    pub method_cache_capacity: usize,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self::lazy()
    }
}

impl DomainConfig {
    /// Nothing is translated until first access (the default)
    #[must_use]
    pub fn lazy() -> Self {
        Self {
            compile_on_load: false,
            parallel_compile: true,
            string_cache_capacity: 1024,
            method_cache_capacity: 256,
        }
    }

    /// Translate whole types on load, in parallel
    ///
    /// Surfaces translation failures at load time instead of at first call.
    #[must_use]
    pub fn eager() -> Self {
        Self {
            compile_on_load: true,
            parallel_compile: true,
            string_cache_capacity: 4096,
            method_cache_capacity: 1024,
        }
    }

    /// Lazy, serial, with small caches
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            compile_on_load: false,
            parallel_compile: false,
            string_cache_capacity: 0,
            method_cache_capacity: 0,
        }
    }
}
