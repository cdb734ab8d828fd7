//! Raw method bodies and the label-based body builder.
//!
//! A [`RawBody`] is the translator's input: the instruction stream with native operands, the
//! exception handler clauses and the local variable count. [`BodyBuilder`] assembles one from
//! opcodes and symbolic labels, assigning CIL byte offsets from each instruction's encoded size
//! and resolving branch, switch and handler labels when the body is finalized.
//!
//! # Examples
//!
//! ```rust
//! use ilbody::{assembly::OpCode, metadata::method::BodyBuilder};
//!
//! let mut builder = BodyBuilder::new();
//! builder.ldarg(0)?;
//! builder.emit_branch(OpCode::BrtrueS, "done")?;
//! builder.ldstr("zero")?;
//! builder.emit(OpCode::Pop)?;
//! builder.define_label("done")?;
//! builder.ret()?;
//!
//! let body = builder.finalize()?;
//! assert_eq!(body.instructions.len(), 5);
//! assert_eq!(body.code_size, 2 + 2 + 5 + 1 + 1);
//! # Ok::<(), ilbody::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    assembly::{
        ArgumentRef, LocalVariable, MethodRef, OpCode, OperandClass, OperandType, RawInstruction,
        RawOperand,
    },
    metadata::{
        method::{ExceptionHandlerFlags, RawExceptionHandler},
        typesystem::RawType,
    },
    Error, Result,
};

/// The raw body of a method.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawBody {
    /// Instructions in stream order, each identified by its byte offset
    pub instructions: Vec<RawInstruction>,
    /// Exception handler clauses
    pub exception_handlers: Vec<RawExceptionHandler>,
    /// Number of declared local variables
    pub local_count: u16,
    /// Size of the instruction stream in bytes
    pub code_size: u32,
}

impl RawBody {
    /// Create a body from decoded instructions; the code size is taken from the last instruction
    #[must_use]
    pub fn new(
        instructions: Vec<RawInstruction>,
        exception_handlers: Vec<RawExceptionHandler>,
        local_count: u16,
    ) -> Self {
        let code_size = instructions
            .last()
            .map_or(0, |last| last.offset.saturating_add(last.size()));

        RawBody {
            instructions,
            exception_handlers,
            local_count,
            code_size,
        }
    }

    /// Number of instructions
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if the body has no instructions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

enum PendingOperand {
    Ready(RawOperand),
    Branch(String),
    Switch(Vec<String>),
}

struct PendingInstruction {
    offset: u32,
    opcode: OpCode,
    operand: PendingOperand,
}

struct PendingHandler {
    flags: ExceptionHandlerFlags,
    try_start: String,
    try_end: String,
    handler_start: String,
    handler_end: String,
    catch_type: Option<RawType>,
}

/// Label-based assembler for [`RawBody`].
///
/// Labels name the offset of the next emitted instruction. A label defined after the last
/// instruction names the end of the body, which is a valid exclusive end for a handler range.
#[derive(Default)]
pub struct BodyBuilder {
    instructions: Vec<PendingInstruction>,
    labels: HashMap<String, u32>,
    handlers: Vec<PendingHandler>,
    position: u32,
    local_count: u16,
}

impl BodyBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the number of local variables
    pub fn declare_locals(&mut self, count: u16) {
        self.local_count = count;
    }

    /// Byte offset the next instruction will be emitted at
    #[must_use]
    pub fn current_position(&self) -> u32 {
        self.position
    }

    /// Offset of a defined label
    #[must_use]
    pub fn label_offset(&self, name: &str) -> Option<u32> {
        self.labels.get(name).copied()
    }

    /// Emit an instruction without operand.
    ///
    /// # Errors
    /// Returns [`Error::InvalidOperand`] if the opcode requires an operand.
    pub fn emit(&mut self, opcode: OpCode) -> Result<()> {
        self.emit_with(opcode, RawOperand::None)
    }

    /// Emit an instruction with an operand in native encoding.
    ///
    /// # Errors
    /// Returns [`Error::InvalidOperand`] if the operand does not fit the opcode.
    pub fn emit_with(&mut self, opcode: OpCode, operand: RawOperand) -> Result<()> {
        if !accepts(opcode, &operand) {
            return Err(Error::InvalidOperand {
                opcode: opcode.mnemonic(),
                expected: expected_operand(opcode),
            });
        }

        let targets = match &operand {
            RawOperand::Switch(targets) => targets.len(),
            _ => 0,
        };
        self.push(opcode, PendingOperand::Ready(operand), targets);
        Ok(())
    }

    /// Emit a branch or `leave` to a label that may be defined later.
    ///
    /// # Errors
    /// Returns [`Error::InvalidOperand`] if the opcode is not a branch.
    pub fn emit_branch(&mut self, opcode: OpCode, label: &str) -> Result<()> {
        if !opcode.is_branch() {
            return Err(Error::InvalidOperand {
                opcode: opcode.mnemonic(),
                expected: expected_operand(opcode),
            });
        }

        self.push(opcode, PendingOperand::Branch(label.to_string()), 0);
        Ok(())
    }

    /// Emit a `switch` over labels, in case order.
    ///
    /// # Errors
    /// Currently infallible; kept fallible for symmetry with the other emitters.
    pub fn emit_switch(&mut self, labels: &[&str]) -> Result<()> {
        let labels: Vec<String> = labels.iter().map(|label| (*label).to_string()).collect();
        let count = labels.len();
        self.push(OpCode::Switch, PendingOperand::Switch(labels), count);
        Ok(())
    }

    /// Define a label at the current position.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateLabel`] if the label already exists.
    pub fn define_label(&mut self, name: &str) -> Result<()> {
        if self.labels.contains_key(name) {
            return Err(Error::DuplicateLabel(name.to_string()));
        }

        self.labels.insert(name.to_string(), self.position);
        Ok(())
    }

    /// Load a declared parameter (receiver excluded).
    ///
    /// Always uses an explicit operand so the receiver shift is applied at translation.
    ///
    /// # Errors
    /// Infallible in practice; see [`BodyBuilder::emit_with`].
    pub fn ldarg(&mut self, index: u16) -> Result<()> {
        let opcode = if index <= 255 {
            OpCode::LdargS
        } else {
            OpCode::Ldarg
        };
        self.emit_with(opcode, RawOperand::Argument(ArgumentRef::Param(index)))
    }

    /// Load the receiver
    ///
    /// # Errors
    /// Infallible in practice; see [`BodyBuilder::emit_with`].
    pub fn ldarg_this(&mut self) -> Result<()> {
        self.emit_with(OpCode::LdargS, RawOperand::Argument(ArgumentRef::This))
    }

    /// Load a local variable with the most compact encoding
    ///
    /// # Errors
    /// Infallible in practice; see [`BodyBuilder::emit_with`].
    pub fn ldloc(&mut self, index: u16) -> Result<()> {
        match index {
            0 => self.emit(OpCode::Ldloc0),
            1 => self.emit(OpCode::Ldloc1),
            2 => self.emit(OpCode::Ldloc2),
            3 => self.emit(OpCode::Ldloc3),
            x if x <= 255 => {
                self.emit_with(OpCode::LdlocS, RawOperand::Local(LocalVariable { index: x }))
            }
            x => self.emit_with(OpCode::Ldloc, RawOperand::Local(LocalVariable { index: x })),
        }
    }

    /// Store a local variable with the most compact encoding
    ///
    /// # Errors
    /// Infallible in practice; see [`BodyBuilder::emit_with`].
    pub fn stloc(&mut self, index: u16) -> Result<()> {
        match index {
            0 => self.emit(OpCode::Stloc0),
            1 => self.emit(OpCode::Stloc1),
            2 => self.emit(OpCode::Stloc2),
            3 => self.emit(OpCode::Stloc3),
            x if x <= 255 => {
                self.emit_with(OpCode::StlocS, RawOperand::Local(LocalVariable { index: x }))
            }
            x => self.emit_with(OpCode::Stloc, RawOperand::Local(LocalVariable { index: x })),
        }
    }

    /// Load a 32-bit constant with the most compact encoding
    ///
    /// # Errors
    /// Infallible in practice; see [`BodyBuilder::emit_with`].
    pub fn ldc_i4(&mut self, value: i32) -> Result<()> {
        match value {
            -1 => self.emit(OpCode::LdcI4M1),
            0 => self.emit(OpCode::LdcI40),
            1 => self.emit(OpCode::LdcI41),
            2 => self.emit(OpCode::LdcI42),
            3 => self.emit(OpCode::LdcI43),
            4 => self.emit(OpCode::LdcI44),
            5 => self.emit(OpCode::LdcI45),
            6 => self.emit(OpCode::LdcI46),
            7 => self.emit(OpCode::LdcI47),
            8 => self.emit(OpCode::LdcI48),
            x => match i8::try_from(x) {
                Ok(small) => self.emit_with(OpCode::LdcI4S, RawOperand::Int8(small)),
                Err(_) => self.emit_with(OpCode::LdcI4, RawOperand::Int32(x)),
            },
        }
    }

    /// Load a string literal
    ///
    /// # Errors
    /// Infallible in practice; see [`BodyBuilder::emit_with`].
    pub fn ldstr(&mut self, text: &str) -> Result<()> {
        self.emit_with(OpCode::Ldstr, RawOperand::String(text.to_string()))
    }

    /// Call a method
    ///
    /// # Errors
    /// Infallible in practice; see [`BodyBuilder::emit_with`].
    pub fn call(&mut self, method: MethodRef) -> Result<()> {
        self.emit_with(OpCode::Call, RawOperand::Method(method))
    }

    /// Return
    ///
    /// # Errors
    /// Infallible in practice; see [`BodyBuilder::emit_with`].
    pub fn ret(&mut self) -> Result<()> {
        self.emit(OpCode::Ret)
    }

    /// Register a catch clause over label-delimited ranges (ends are exclusive)
    pub fn try_catch(
        &mut self,
        try_range: (&str, &str),
        handler_range: (&str, &str),
        catch_type: RawType,
    ) {
        self.handler(
            ExceptionHandlerFlags::EXCEPTION,
            try_range,
            handler_range,
            Some(catch_type),
        );
    }

    /// Register a finally clause over label-delimited ranges (ends are exclusive)
    pub fn try_finally(&mut self, try_range: (&str, &str), handler_range: (&str, &str)) {
        self.handler(ExceptionHandlerFlags::FINALLY, try_range, handler_range, None);
    }

    /// Register a handler clause of any kind over label-delimited ranges (ends are exclusive)
    pub fn handler(
        &mut self,
        flags: ExceptionHandlerFlags,
        try_range: (&str, &str),
        handler_range: (&str, &str),
        catch_type: Option<RawType>,
    ) {
        self.handlers.push(PendingHandler {
            flags,
            try_start: try_range.0.to_string(),
            try_end: try_range.1.to_string(),
            handler_start: handler_range.0.to_string(),
            handler_end: handler_range.1.to_string(),
            catch_type,
        });
    }

    /// Resolve all labels and produce the body.
    ///
    /// # Errors
    /// Returns [`Error::UndefinedLabel`] if a branch, switch or handler names an unknown label,
    /// or [`Error::Malformed`] if a handler range ends before it starts.
    pub fn finalize(self) -> Result<RawBody> {
        let mut instructions = Vec::with_capacity(self.instructions.len());
        for pending in self.instructions {
            let operand = match pending.operand {
                PendingOperand::Ready(operand) => operand,
                PendingOperand::Branch(label) => RawOperand::Target(lookup(&self.labels, &label)?),
                PendingOperand::Switch(labels) => RawOperand::Switch(
                    labels
                        .iter()
                        .map(|label| lookup(&self.labels, label))
                        .collect::<Result<Vec<_>>>()?,
                ),
            };
            instructions.push(RawInstruction::new(pending.offset, pending.opcode, operand));
        }

        let mut exception_handlers = Vec::with_capacity(self.handlers.len());
        for handler in self.handlers {
            let (try_offset, try_length) =
                range(&self.labels, &handler.try_start, &handler.try_end)?;
            let (handler_offset, handler_length) =
                range(&self.labels, &handler.handler_start, &handler.handler_end)?;

            exception_handlers.push(RawExceptionHandler {
                flags: handler.flags,
                try_offset,
                try_length,
                handler_offset,
                handler_length,
                catch_type: handler.catch_type,
                filter_offset: 0,
            });
        }

        Ok(RawBody {
            instructions,
            exception_handlers,
            local_count: self.local_count,
            code_size: self.position,
        })
    }

    fn push(&mut self, opcode: OpCode, operand: PendingOperand, switch_targets: usize) {
        self.instructions.push(PendingInstruction {
            offset: self.position,
            opcode,
            operand,
        });
        self.position = self
            .position
            .saturating_add(opcode.encoded_size(switch_targets));
    }
}

fn lookup(labels: &HashMap<String, u32>, label: &str) -> Result<u32> {
    labels
        .get(label)
        .copied()
        .ok_or_else(|| Error::UndefinedLabel(label.to_string()))
}

fn range(labels: &HashMap<String, u32>, start: &str, end: &str) -> Result<(u32, u32)> {
    let start_offset = lookup(labels, start)?;
    let end_offset = lookup(labels, end)?;
    let length = end_offset.checked_sub(start_offset).ok_or_else(|| {
        malformed_error!("Handler range '{}'..'{}' ends before it starts", start, end)
    })?;
    Ok((start_offset, length))
}

fn accepts(opcode: OpCode, operand: &RawOperand) -> bool {
    match opcode.operand_class() {
        OperandClass::None => {
            opcode.operand_type() != OperandType::None || matches!(operand, RawOperand::None)
        }
        OperandClass::Branch => matches!(operand, RawOperand::Target(_)),
        OperandClass::Int8Constant => matches!(operand, RawOperand::Int8(_)),
        OperandClass::Int32Constant => matches!(operand, RawOperand::Int32(_)),
        OperandClass::Int64Constant => matches!(operand, RawOperand::Int64(_)),
        OperandClass::Float32Constant => matches!(operand, RawOperand::Float32(_)),
        OperandClass::Float64Constant => matches!(operand, RawOperand::Float64(_)),
        OperandClass::Local => matches!(operand, RawOperand::Local(_)),
        OperandClass::Argument => matches!(operand, RawOperand::Argument(_)),
        OperandClass::Call => matches!(operand, RawOperand::Method(_)),
        OperandClass::Type => matches!(operand, RawOperand::Type(_)),
        OperandClass::InstanceField | OperandClass::StaticField => {
            matches!(operand, RawOperand::Field(_))
        }
        OperandClass::TokenLoad => matches!(operand, RawOperand::Token(_)),
        OperandClass::String => matches!(operand, RawOperand::String(_)),
        OperandClass::Switch => matches!(operand, RawOperand::Switch(_)),
    }
}

/// Human readable name of the operand an opcode takes
pub(crate) fn expected_operand(opcode: OpCode) -> &'static str {
    match opcode.operand_class() {
        OperandClass::None => "no operand",
        OperandClass::Branch => "branch target",
        OperandClass::Int8Constant => "int8",
        OperandClass::Int32Constant => "int32",
        OperandClass::Int64Constant => "int64",
        OperandClass::Float32Constant => "float32",
        OperandClass::Float64Constant => "float64",
        OperandClass::Local => "local variable",
        OperandClass::Argument => "argument",
        OperandClass::Call => "method reference",
        OperandClass::Type => "type reference",
        OperandClass::InstanceField | OperandClass::StaticField => "field reference",
        OperandClass::TokenLoad => "token handle",
        OperandClass::String => "string literal",
        OperandClass::Switch => "switch targets",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{token::Token, typesystem::PrimitiveKind};

    #[test]
    fn offsets_follow_encoded_sizes() {
        let mut builder = BodyBuilder::new();
        builder.ldarg(0).unwrap();
        builder.ldc_i4(5).unwrap();
        builder.ldc_i4(100).unwrap();
        builder.ldc_i4(1000).unwrap();
        builder.emit(OpCode::Ret).unwrap();
        let body = builder.finalize().unwrap();

        let offsets: Vec<u32> = body.instructions.iter().map(|i| i.offset).collect();
        assert_eq!(offsets, vec![0, 2, 3, 5, 10]);
        assert_eq!(body.code_size, 11);
        assert_eq!(body.instructions[2].operand, RawOperand::Int8(100));
        assert_eq!(body.instructions[3].operand, RawOperand::Int32(1000));
    }

    #[test]
    fn forward_and_backward_labels() {
        let mut builder = BodyBuilder::new();
        builder.define_label("top").unwrap();
        builder.emit(OpCode::Nop).unwrap();
        builder.emit_branch(OpCode::BrS, "end").unwrap();
        builder.emit_branch(OpCode::Br, "top").unwrap();
        builder.define_label("end").unwrap();
        builder.ret().unwrap();
        let body = builder.finalize().unwrap();

        assert_eq!(body.instructions[1].operand, RawOperand::Target(8));
        assert_eq!(body.instructions[2].operand, RawOperand::Target(0));
    }

    #[test]
    fn switch_targets_in_case_order() {
        let mut builder = BodyBuilder::new();
        builder.emit_switch(&["b", "a", "b"]).unwrap();
        builder.define_label("a").unwrap();
        builder.emit(OpCode::Nop).unwrap();
        builder.define_label("b").unwrap();
        builder.ret().unwrap();
        let body = builder.finalize().unwrap();

        assert_eq!(body.instructions[0].operand, RawOperand::Switch(vec![18, 17, 18]));
    }

    #[test]
    fn label_errors() {
        let mut builder = BodyBuilder::new();
        builder.define_label("x").unwrap();
        assert!(matches!(
            builder.define_label("x"),
            Err(Error::DuplicateLabel(_))
        ));

        builder.emit_branch(OpCode::Br, "missing").unwrap();
        assert!(matches!(builder.finalize(), Err(Error::UndefinedLabel(l)) if l == "missing"));
    }

    #[test]
    fn operand_validation() {
        let mut builder = BodyBuilder::new();
        assert!(matches!(
            builder.emit(OpCode::Ldstr),
            Err(Error::InvalidOperand {
                opcode: "ldstr",
                ..
            })
        ));
        assert!(builder.emit_branch(OpCode::Add, "x").is_err());
        assert!(builder
            .emit_with(OpCode::Box, RawOperand::Type(RawType::Primitive(PrimitiveKind::I4)))
            .is_ok());
        assert!(builder
            .emit_with(OpCode::Ldfld, RawOperand::Type(RawType::Named(Token::new(1))))
            .is_err());
    }

    #[test]
    fn handler_ranges_reach_body_end() {
        let mut builder = BodyBuilder::new();
        builder.define_label("try").unwrap();
        builder.emit(OpCode::Nop).unwrap();
        builder.emit_branch(OpCode::LeaveS, "end").unwrap();
        builder.define_label("finally").unwrap();
        builder.emit(OpCode::Endfinally).unwrap();
        builder.define_label("end").unwrap();
        builder.try_finally(("try", "finally"), ("finally", "end"));
        let body = builder.finalize().unwrap();

        let handler = &body.exception_handlers[0];
        assert_eq!((handler.try_offset, handler.try_length), (0, 3));
        assert_eq!((handler.handler_offset, handler.handler_length), (3, 1));
        assert_eq!(handler.handler_end(), body.code_size);
    }
}
