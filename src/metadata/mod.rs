//! Runtime metadata consumed by the translator.
//!
//! - [`token`] - Metadata tokens identifying types, methods and fields
//! - [`typesystem`] - Runtime types, generic resolution and the [`typesystem::Registry`]
//! - [`method`] - Method definitions, raw bodies and the lazily compiled method descriptor
//! - [`config`] - [`config::DomainConfig`] presets

pub mod config;
pub mod method;
pub mod token;
pub mod typesystem;
