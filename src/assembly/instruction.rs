//! Raw and compiled instruction representations.
//!
//! A method body enters the translator as a sequence of [`RawInstruction`]s whose operands
//! keep their heterogeneous native encodings (branch target offsets, local and argument
//! declarations, metadata references, literals). It leaves as a flat array of
//! [`Instruction`]s whose [`Operand`] is a small, uniform runtime token selected by the
//! opcode's [`crate::assembly::OperandClass`].
//!
//! # Key Components
//!
//! - [`RawInstruction`] / [`RawOperand`] - input model, one per decoded CIL instruction
//! - [`MethodRef`], [`FieldRef`], [`TokenOperand`] - metadata references carried by raw operands
//! - [`Instruction`] / [`Operand`] - index-addressed output model
//! - [`JumpTableKey`] - dense key of a `switch` site's jump table
//!
//! # Examples
//!
//! ```rust
//! use ilbody::assembly::{Instruction, OpCode, Operand};
//!
//! let branch = Instruction::new(OpCode::Br, Operand::Target(5));
//! assert_eq!(branch.target(), Some(5));
//! assert_eq!(branch.to_string(), "br 5");
//! ```

use std::fmt;

use crate::{
    assembly::OpCode,
    metadata::{token::Token, typesystem::RawType},
};

/// A local variable declaration, addressed by its declared position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalVariable {
    /// Declared positional index
    pub index: u16,
}

/// An argument reference as it appears in a raw body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentRef {
    /// The implicit receiver (`this`), only valid on instance methods
    This,
    /// A declared parameter, by its 0-based position in the parameter list
    Param(u16),
}

/// A reference to a method, as carried by call-family operands.
///
/// `parent` is the declaring type as seen from the call site; `None` means the method is
/// declared on the type that owns the body being translated. `generic_args` is non-empty
/// for a call to a generic method instantiation (a `MethodSpec`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// The declaring type, if different from the calling method's declaring type
    pub parent: Option<RawType>,
    /// The method definition token
    pub token: Token,
    /// Method-level generic arguments of the call site
    pub generic_args: Vec<RawType>,
}

impl MethodRef {
    /// A reference to a non-generic method on the calling method's own declaring type
    #[must_use]
    pub fn local(token: Token) -> Self {
        MethodRef {
            parent: None,
            token,
            generic_args: Vec::new(),
        }
    }

    /// A reference to a non-generic method on `parent`
    #[must_use]
    pub fn on(parent: RawType, token: Token) -> Self {
        MethodRef {
            parent: Some(parent),
            token,
            generic_args: Vec::new(),
        }
    }

    /// Attach method-level generic arguments
    #[must_use]
    pub fn with_generic_args(mut self, args: Vec<RawType>) -> Self {
        self.generic_args = args;
        self
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            write!(f, "{parent}::")?;
        }
        write!(f, "{}", self.token)?;
        if !self.generic_args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.generic_args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

/// A reference to a field, as carried by field-access operands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// The declaring type of the field
    pub parent: RawType,
    /// The field definition token
    pub token: Token,
}

impl FieldRef {
    /// Create a new field reference
    #[must_use]
    pub fn new(parent: RawType, token: Token) -> Self {
        FieldRef { parent, token }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.parent, self.token)
    }
}

/// The operand of `ldtoken`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenOperand {
    /// A field handle
    Field(FieldRef),
    /// A type handle
    Type(RawType),
    /// A method handle
    Method(MethodRef),
}

impl fmt::Display for TokenOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenOperand::Field(field) => write!(f, "field {field}"),
            TokenOperand::Type(ty) => write!(f, "type {ty}"),
            TokenOperand::Method(method) => write!(f, "method {method}"),
        }
    }
}

/// A raw operand in its native encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOperand {
    /// No operand present
    None,
    /// Branch target, as the byte offset of the target instruction
    Target(u32),
    /// `switch` targets, as byte offsets in case order
    Switch(Vec<u32>),
    /// Signed 8-bit immediate
    Int8(i8),
    /// Signed 32-bit immediate
    Int32(i32),
    /// Signed 64-bit immediate
    Int64(i64),
    /// 32-bit float immediate
    Float32(f32),
    /// 64-bit float immediate
    Float64(f64),
    /// Local variable declaration
    Local(LocalVariable),
    /// Argument declaration
    Argument(ArgumentRef),
    /// Method reference
    Method(MethodRef),
    /// Type reference
    Type(RawType),
    /// Field reference
    Field(FieldRef),
    /// `ldtoken` handle
    Token(TokenOperand),
    /// String literal
    String(String),
}

impl RawOperand {
    /// Short name of the operand kind, for diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RawOperand::None => "none",
            RawOperand::Target(_) => "branch target",
            RawOperand::Switch(_) => "switch targets",
            RawOperand::Int8(_) => "int8",
            RawOperand::Int32(_) => "int32",
            RawOperand::Int64(_) => "int64",
            RawOperand::Float32(_) => "float32",
            RawOperand::Float64(_) => "float64",
            RawOperand::Local(_) => "local variable",
            RawOperand::Argument(_) => "argument",
            RawOperand::Method(_) => "method reference",
            RawOperand::Type(_) => "type reference",
            RawOperand::Field(_) => "field reference",
            RawOperand::Token(_) => "token handle",
            RawOperand::String(_) => "string literal",
        }
    }
}

/// One instruction of a raw method body.
///
/// The byte `offset` is the instruction's identity: branch targets, switch targets and
/// exception handler bounds all refer to instructions by offset.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInstruction {
    /// Byte offset of the instruction within the body
    pub offset: u32,
    /// The opcode
    pub opcode: OpCode,
    /// The operand in its native encoding
    pub operand: RawOperand,
}

impl RawInstruction {
    /// Create a new raw instruction
    #[must_use]
    pub fn new(offset: u32, opcode: OpCode, operand: RawOperand) -> Self {
        RawInstruction {
            offset,
            opcode,
            operand,
        }
    }

    /// Encoded size of this instruction in bytes
    #[must_use]
    pub fn size(&self) -> u32 {
        let targets = match &self.operand {
            RawOperand::Switch(targets) => targets.len(),
            _ => 0,
        };
        self.opcode.encoded_size(targets)
    }
}

impl fmt::Display for RawInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04x}: {}", self.offset, self.opcode)
    }
}

/// Dense key identifying one `switch` site's jump table within a compiled body.
///
/// Keys are assigned in order of switch-site appearance, starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JumpTableKey(pub u32);

impl fmt::Display for JumpTableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "jt{}", self.0)
    }
}

/// The normalized operand of a compiled instruction.
///
/// Exactly one variant is meaningful per opcode, selected by the opcode's operand class,
/// so an operand can never be read through the wrong payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// Index of the target instruction
    Target(u32),
    /// 32-bit integer constant (narrow constants are widened)
    Int32(i32),
    /// 64-bit integer constant
    Int64(i64),
    /// 32-bit float constant
    Float32(f32),
    /// 64-bit float constant
    Float64(f64),
    /// Local variable slot
    Local(u32),
    /// Argument slot; slot 0 is the receiver when the method has one
    Argument(u32),
    /// Method identity
    Method(u64),
    /// Type identity
    Type(u64),
    /// Instance field slot within the declaring type's layout
    Field(u32),
    /// Wide static field slot
    StaticField(u64),
    /// Hash of an interned string literal
    String(u64),
    /// Key of the jump table built for this `switch`
    Switch(JumpTableKey),
}

/// One compiled instruction, addressed by its index in the compiled body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction {
    /// The opcode
    pub opcode: OpCode,
    /// The normalized operand
    pub operand: Operand,
}

impl Instruction {
    /// Create a new compiled instruction
    #[must_use]
    pub fn new(opcode: OpCode, operand: Operand) -> Self {
        Instruction { opcode, operand }
    }

    /// Branch target index, for branches and `leave`
    #[must_use]
    pub fn target(&self) -> Option<u32> {
        match self.operand {
            Operand::Target(index) => Some(index),
            _ => None,
        }
    }

    /// Local or argument slot
    #[must_use]
    pub fn slot(&self) -> Option<u32> {
        match self.operand {
            Operand::Local(slot) | Operand::Argument(slot) | Operand::Field(slot) => Some(slot),
            _ => None,
        }
    }

    /// The 32-bit constant of `ldc.i4` and `ldc.i4.s`
    #[must_use]
    pub fn get_i32_operand(&self) -> Option<i32> {
        match self.operand {
            Operand::Int32(value) => Some(value),
            _ => None,
        }
    }

    /// The 64-bit constant of `ldc.i8`
    #[must_use]
    pub fn get_i64_operand(&self) -> Option<i64> {
        match self.operand {
            Operand::Int64(value) => Some(value),
            _ => None,
        }
    }

    /// The identity token of a call, type, static field or string operand
    #[must_use]
    pub fn identity(&self) -> Option<u64> {
        match self.operand {
            Operand::Method(id)
            | Operand::Type(id)
            | Operand::StaticField(id)
            | Operand::String(id) => Some(id),
            _ => None,
        }
    }

    /// The jump table key of a `switch`
    #[must_use]
    pub fn jump_table_key(&self) -> Option<JumpTableKey> {
        match self.operand {
            Operand::Switch(key) => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        match self.operand {
            Operand::None => Ok(()),
            Operand::Target(index) => write!(f, " {index}"),
            Operand::Int32(value) => write!(f, " {value}"),
            Operand::Int64(value) => write!(f, " {value}"),
            Operand::Float32(value) => write!(f, " {value}"),
            Operand::Float64(value) => write!(f, " {value}"),
            Operand::Local(slot) => write!(f, " V_{slot}"),
            Operand::Argument(slot) => write!(f, " A_{slot}"),
            Operand::Field(slot) => write!(f, " F_{slot}"),
            Operand::Method(id) | Operand::Type(id) | Operand::String(id) => {
                write!(f, " 0x{id:016X}")
            }
            Operand::StaticField(slot) => write!(f, " S_{slot:X}"),
            Operand::Switch(key) => write!(f, " {key}"),
        }
    }
}
