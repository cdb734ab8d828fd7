//! CIL instruction set and instruction models.
//!
//! This module holds everything the translator needs to know about individual instructions:
//! the closed [`OpCode`] enumeration with its static operand metadata, the raw input model
//! produced by a decoder (or by [`crate::metadata::method::BodyBuilder`]) and the compiled,
//! index-addressed output model.
//!
//! # Key Components
//!
//! - [`OpCode`], [`OperandType`], [`OperandClass`] - static per-opcode information
//! - [`RawInstruction`], [`RawOperand`] - instructions with operands in native encoding
//! - [`Instruction`], [`Operand`] - instructions with operands normalized to runtime tokens
//!
//! # Examples
//!
//! ```rust
//! use ilbody::assembly::{OpCode, OperandClass, RawInstruction, RawOperand};
//!
//! let raw = RawInstruction::new(0, OpCode::BrS, RawOperand::Target(7));
//! assert_eq!(raw.opcode.operand_class(), OperandClass::Branch);
//! assert_eq!(raw.size(), 2);
//! ```

mod instruction;
mod opcodes;

pub use instruction::{
    ArgumentRef, FieldRef, Instruction, JumpTableKey, LocalVariable, MethodRef, Operand,
    RawInstruction, RawOperand, TokenOperand,
};
pub use opcodes::{OpCode, OperandClass, OperandType};
