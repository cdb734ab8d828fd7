//! # ilbody Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the ilbody library. Import this module to get quick access to the essential
//! types for defining types and methods and translating method bodies.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all ilbody operations
pub use crate::Error;

/// The result type used throughout ilbody
pub use crate::Result;

/// The kind of reference carried by an unresolved reference error
pub use crate::ReferenceKind;

/// Configuration of a domain
pub use crate::metadata::config::DomainConfig;

// ================================================================================================
// Instruction Models
// ================================================================================================

/// Opcodes and their static operand information
pub use crate::assembly::{OpCode, OperandClass, OperandType};

/// Raw instructions and the references they carry
pub use crate::assembly::{
    ArgumentRef, FieldRef, LocalVariable, MethodRef, RawInstruction, RawOperand, TokenOperand,
};

/// Compiled instructions
pub use crate::assembly::{Instruction, JumpTableKey, Operand};

// ================================================================================================
// Type System
// ================================================================================================

/// Metadata token type for referencing definitions
pub use crate::metadata::token::Token;

/// Core type system components
pub use crate::metadata::typesystem::{
    Domain, GenericBindings, GenericContext, PrimitiveKind, RawType, Registry, RuntimeType,
    TypeBuilder, TypeFlavor, TypeRc, TypeSource,
};

// ================================================================================================
// Methods and Translation
// ================================================================================================

/// Method definitions, raw bodies and descriptors
pub use crate::metadata::method::{
    BodyBuilder, ExceptionHandlerFlags, ExceptionRegion, HandlerKind, Method, MethodDef,
    MethodFlags, MethodRc, RawBody, RawExceptionHandler,
};

/// Translation output
pub use crate::compiler::CompiledBody;
