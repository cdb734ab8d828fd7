// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # ilbody
//!
//! Method body translation and generic instantiation for a CIL interpreter.
//!
//! `ilbody` sits at the front end of a stack-based bytecode interpreter. It takes a method's
//! declared instruction stream, whose operands still use their heterogeneous CIL encodings,
//! and produces an execution-ready body: a flat, index-addressed instruction array in which
//! every operand is a small uniform token (instruction index, slot index, identity hash or jump
//! table key), together with index-based exception regions and `switch` jump tables.
//!
//! ## Features
//!
//! - **Operand normalization** - One rule per operand class, selected by the opcode
//! - **Two-level generic resolution** - Declaring type bindings first, method bindings second
//! - **Immutable instantiation** - Every generic method instantiation is its own descriptor
//! - **Lazy, memoized translation** - Bodies translate on first access, without locks held
//! - **Concurrent registry** - Lock-free storage with insert-if-absent caches
//!
//! ## Quick Start
//!
//! ```rust
//! use ilbody::prelude::*;
//!
//! let domain = Domain::new();
//! let owner = TypeBuilder::new(&domain, Token::new(0x0200_0001))
//!     .class("Demo", "Greeter")
//!     .build()?;
//!
//! let mut body = BodyBuilder::new();
//! body.ldarg(0)?;
//! body.emit_branch(OpCode::BrtrueS, "yes")?;
//! body.ldstr("no")?;
//! body.ret()?;
//! body.define_label("yes")?;
//! body.ldstr("yes")?;
//! body.ret()?;
//!
//! let def = MethodDef::new(Token::new(0x0600_0001), "Answer")
//!     .static_method()
//!     .param("flag", RawType::Primitive(PrimitiveKind::Boolean))
//!     .returns(RawType::Primitive(PrimitiveKind::String))
//!     .with_body(body.finalize()?);
//! domain.define_method(owner.token, def)?;
//!
//! let method = domain.method(owner.token, Token::new(0x0600_0001))?;
//! let code = method.compiled_body(&domain)?;
//! assert_eq!(code[1].target(), Some(4));
//! assert_eq!(domain.strings().len(), 2);
//! # Ok::<(), ilbody::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`assembly`] - Opcodes and the raw and compiled instruction models
//! - [`metadata`] - Tokens, runtime types, the [`metadata::typesystem::Registry`] with its
//!   in-memory [`metadata::typesystem::Domain`], and method descriptors
//! - [`compiler`] - The translation passes
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Logging
//!
//! Diagnostics go through the [`log`] facade; install any logger to see them. Compiled bodies
//! and instantiations are reported at `debug`, registrations at `trace`.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use ilbody::prelude::*;
///
/// let domain = Domain::with_config(DomainConfig::minimal());
/// assert!(domain.primitive(PrimitiveKind::Object).is_some());
/// ```
pub mod prelude;

/// CIL opcodes and instruction representations
///
/// - [`assembly::OpCode`] - The closed opcode enumeration with operand classes
/// - [`assembly::RawInstruction`] - Translator input, operands in native encoding
/// - [`assembly::Instruction`] - Translator output, operands normalized to runtime tokens
pub mod assembly;

/// Method body translation passes
pub mod compiler;

/// Tokens, runtime types, registries and method descriptors
pub mod metadata;

/// `ilbody` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `ilbody` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust
/// use ilbody::{Error, ReferenceKind};
///
/// let err = Error::UnresolvedReference {
///     kind: ReferenceKind::Method,
///     reference: "0x06000042".to_string(),
/// };
/// assert_eq!(err.to_string(), "Unresolved method reference - 0x06000042");
/// ```
pub use error::{Error, ReferenceKind};
