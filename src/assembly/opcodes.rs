//! The closed CIL opcode enumeration (ECMA-335 Partition III).
//!
//! Every opcode carries three pieces of static information, all produced from one table:
//!
//! - its encoded value ([`OpCode::code`], two-byte opcodes are `0xFExx`)
//! - its [`OperandType`], which fixes the encoded operand width
//! - its [`OperandClass`], which selects how the translator normalizes the operand
//!
//! # Examples
//!
//! ```rust
//! use ilbody::assembly::{OpCode, OperandClass, OperandType};
//! use std::str::FromStr;
//!
//! let op = OpCode::from_str("brfalse.s").unwrap();
//! assert_eq!(op, OpCode::BrfalseS);
//! assert_eq!(op.code(), 0x2C);
//! assert_eq!(op.operand_type(), OperandType::Int8);
//! assert_eq!(op.operand_class(), OperandClass::Branch);
//! assert_eq!(op.to_string(), "brfalse.s");
//! ```

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Types of operands for CIL instructions, fixing their encoded width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand present
    None,
    /// Signed 8-bit integer
    Int8,
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// Metadata token reference
    Token,
    /// Switch table operand
    Switch,
}

impl OperandType {
    /// Returns the size in bytes of this operand type.
    ///
    /// Returns `None` for `Switch`, whose size depends on the number of targets.
    #[must_use]
    pub const fn size(&self) -> Option<u32> {
        match self {
            OperandType::None => Some(0),
            OperandType::Int8 | OperandType::UInt8 => Some(1),
            OperandType::UInt16 => Some(2),
            OperandType::Int32 | OperandType::Float32 | OperandType::Token => Some(4),
            OperandType::Int64 | OperandType::Float64 => Some(8),
            OperandType::Switch => None,
        }
    }
}

/// How the translator normalizes the operand of an opcode.
///
/// Opcodes in [`OperandClass::None`] keep no operand in their compiled form, even when the
/// raw encoding carries one (`jmp`, `calli`, `unaligned.`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandClass {
    /// No operand normalization
    None,
    /// Branch or leave: target instruction becomes its index
    Branch,
    /// `ldc.i4.s`: narrow constant widened to 32 bits
    Int8Constant,
    /// `ldc.i4`
    Int32Constant,
    /// `ldc.i8`
    Int64Constant,
    /// `ldc.r4`
    Float32Constant,
    /// `ldc.r8`
    Float64Constant,
    /// Local variable slot access
    Local,
    /// Argument slot access, shifted by one when the method has a receiver
    Argument,
    /// Call family, resolved to a method identity
    Call,
    /// Type manipulation, resolved to a type identity
    Type,
    /// Instance field access, resolved to an instance layout slot
    InstanceField,
    /// Static field access, resolved to a wide static slot
    StaticField,
    /// `ldtoken`, supported on field references only
    TokenLoad,
    /// `ldstr`, interned into the string cache
    String,
    /// `switch`, resolved into a jump table
    Switch,
}

macro_rules! define_opcodes {
    ($( $variant:ident => $mnemonic:literal, $code:literal, $operand:ident, $class:ident; )*) => {
        /// A CIL opcode.
        ///
        /// The enumeration is closed: every instruction the translator sees is one of these.
        /// The `Display`/`FromStr` forms are the ECMA-335 mnemonics.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Display, EnumString, EnumIter, IntoStaticStr,
        )]
        pub enum OpCode {
            $(
                #[allow(missing_docs)]
                #[strum(serialize = $mnemonic)]
                $variant,
            )*
        }

        impl OpCode {
            /// The encoded opcode value; two-byte opcodes are returned as `0xFExx`.
            #[must_use]
            pub const fn code(self) -> u16 {
                match self {
                    $( OpCode::$variant => $code, )*
                }
            }

            /// The encoded operand type of this opcode.
            #[must_use]
            pub const fn operand_type(self) -> OperandType {
                match self {
                    $( OpCode::$variant => OperandType::$operand, )*
                }
            }

            /// The normalization class of this opcode's operand.
            #[must_use]
            pub const fn operand_class(self) -> OperandClass {
                match self {
                    $( OpCode::$variant => OperandClass::$class, )*
                }
            }

            /// Look up an opcode by its encoded value.
            #[must_use]
            pub fn from_code(code: u16) -> Option<OpCode> {
                match code {
                    $( $code => Some(OpCode::$variant), )*
                    _ => None,
                }
            }
        }
    };
}

define_opcodes! {
    Nop => "nop", 0x00, None, None;
    Break => "break", 0x01, None, None;
    Ldarg0 => "ldarg.0", 0x02, None, None;
    Ldarg1 => "ldarg.1", 0x03, None, None;
    Ldarg2 => "ldarg.2", 0x04, None, None;
    Ldarg3 => "ldarg.3", 0x05, None, None;
    Ldloc0 => "ldloc.0", 0x06, None, None;
    Ldloc1 => "ldloc.1", 0x07, None, None;
    Ldloc2 => "ldloc.2", 0x08, None, None;
    Ldloc3 => "ldloc.3", 0x09, None, None;
    Stloc0 => "stloc.0", 0x0A, None, None;
    Stloc1 => "stloc.1", 0x0B, None, None;
    Stloc2 => "stloc.2", 0x0C, None, None;
    Stloc3 => "stloc.3", 0x0D, None, None;
    LdargS => "ldarg.s", 0x0E, UInt8, Argument;
    LdargaS => "ldarga.s", 0x0F, UInt8, Argument;
    StargS => "starg.s", 0x10, UInt8, Argument;
    LdlocS => "ldloc.s", 0x11, UInt8, Local;
    LdlocaS => "ldloca.s", 0x12, UInt8, Local;
    StlocS => "stloc.s", 0x13, UInt8, Local;
    Ldnull => "ldnull", 0x14, None, None;
    LdcI4M1 => "ldc.i4.m1", 0x15, None, None;
    LdcI40 => "ldc.i4.0", 0x16, None, None;
    LdcI41 => "ldc.i4.1", 0x17, None, None;
    LdcI42 => "ldc.i4.2", 0x18, None, None;
    LdcI43 => "ldc.i4.3", 0x19, None, None;
    LdcI44 => "ldc.i4.4", 0x1A, None, None;
    LdcI45 => "ldc.i4.5", 0x1B, None, None;
    LdcI46 => "ldc.i4.6", 0x1C, None, None;
    LdcI47 => "ldc.i4.7", 0x1D, None, None;
    LdcI48 => "ldc.i4.8", 0x1E, None, None;
    LdcI4S => "ldc.i4.s", 0x1F, Int8, Int8Constant;
    LdcI4 => "ldc.i4", 0x20, Int32, Int32Constant;
    LdcI8 => "ldc.i8", 0x21, Int64, Int64Constant;
    LdcR4 => "ldc.r4", 0x22, Float32, Float32Constant;
    LdcR8 => "ldc.r8", 0x23, Float64, Float64Constant;
    Dup => "dup", 0x25, None, None;
    Pop => "pop", 0x26, None, None;
    Jmp => "jmp", 0x27, Token, None;
    Call => "call", 0x28, Token, Call;
    Calli => "calli", 0x29, Token, None;
    Ret => "ret", 0x2A, None, None;
    BrS => "br.s", 0x2B, Int8, Branch;
    BrfalseS => "brfalse.s", 0x2C, Int8, Branch;
    BrtrueS => "brtrue.s", 0x2D, Int8, Branch;
    BeqS => "beq.s", 0x2E, Int8, Branch;
    BgeS => "bge.s", 0x2F, Int8, Branch;
    BgtS => "bgt.s", 0x30, Int8, Branch;
    BleS => "ble.s", 0x31, Int8, Branch;
    BltS => "blt.s", 0x32, Int8, Branch;
    BneUnS => "bne.un.s", 0x33, Int8, Branch;
    BgeUnS => "bge.un.s", 0x34, Int8, Branch;
    BgtUnS => "bgt.un.s", 0x35, Int8, Branch;
    BleUnS => "ble.un.s", 0x36, Int8, Branch;
    BltUnS => "blt.un.s", 0x37, Int8, Branch;
    Br => "br", 0x38, Int32, Branch;
    Brfalse => "brfalse", 0x39, Int32, Branch;
    Brtrue => "brtrue", 0x3A, Int32, Branch;
    Beq => "beq", 0x3B, Int32, Branch;
    Bge => "bge", 0x3C, Int32, Branch;
    Bgt => "bgt", 0x3D, Int32, Branch;
    Ble => "ble", 0x3E, Int32, Branch;
    Blt => "blt", 0x3F, Int32, Branch;
    BneUn => "bne.un", 0x40, Int32, Branch;
    BgeUn => "bge.un", 0x41, Int32, Branch;
    BgtUn => "bgt.un", 0x42, Int32, Branch;
    BleUn => "ble.un", 0x43, Int32, Branch;
    BltUn => "blt.un", 0x44, Int32, Branch;
    Switch => "switch", 0x45, Switch, Switch;
    LdindI1 => "ldind.i1", 0x46, None, None;
    LdindU1 => "ldind.u1", 0x47, None, None;
    LdindI2 => "ldind.i2", 0x48, None, None;
    LdindU2 => "ldind.u2", 0x49, None, None;
    LdindI4 => "ldind.i4", 0x4A, None, None;
    LdindU4 => "ldind.u4", 0x4B, None, None;
    LdindI8 => "ldind.i8", 0x4C, None, None;
    LdindI => "ldind.i", 0x4D, None, None;
    LdindR4 => "ldind.r4", 0x4E, None, None;
    LdindR8 => "ldind.r8", 0x4F, None, None;
    LdindRef => "ldind.ref", 0x50, None, None;
    StindRef => "stind.ref", 0x51, None, None;
    StindI1 => "stind.i1", 0x52, None, None;
    StindI2 => "stind.i2", 0x53, None, None;
    StindI4 => "stind.i4", 0x54, None, None;
    StindI8 => "stind.i8", 0x55, None, None;
    StindR4 => "stind.r4", 0x56, None, None;
    StindR8 => "stind.r8", 0x57, None, None;
    Add => "add", 0x58, None, None;
    Sub => "sub", 0x59, None, None;
    Mul => "mul", 0x5A, None, None;
    Div => "div", 0x5B, None, None;
    DivUn => "div.un", 0x5C, None, None;
    Rem => "rem", 0x5D, None, None;
    RemUn => "rem.un", 0x5E, None, None;
    And => "and", 0x5F, None, None;
    Or => "or", 0x60, None, None;
    Xor => "xor", 0x61, None, None;
    Shl => "shl", 0x62, None, None;
    Shr => "shr", 0x63, None, None;
    ShrUn => "shr.un", 0x64, None, None;
    Neg => "neg", 0x65, None, None;
    Not => "not", 0x66, None, None;
    ConvI1 => "conv.i1", 0x67, None, None;
    ConvI2 => "conv.i2", 0x68, None, None;
    ConvI4 => "conv.i4", 0x69, None, None;
    ConvI8 => "conv.i8", 0x6A, None, None;
    ConvR4 => "conv.r4", 0x6B, None, None;
    ConvR8 => "conv.r8", 0x6C, None, None;
    ConvU4 => "conv.u4", 0x6D, None, None;
    ConvU8 => "conv.u8", 0x6E, None, None;
    Callvirt => "callvirt", 0x6F, Token, Call;
    Cpobj => "cpobj", 0x70, Token, Type;
    Ldobj => "ldobj", 0x71, Token, Type;
    Ldstr => "ldstr", 0x72, Token, String;
    Newobj => "newobj", 0x73, Token, Call;
    Castclass => "castclass", 0x74, Token, Type;
    Isinst => "isinst", 0x75, Token, Type;
    ConvRUn => "conv.r.un", 0x76, None, None;
    Unbox => "unbox", 0x79, Token, Type;
    Throw => "throw", 0x7A, None, None;
    Ldfld => "ldfld", 0x7B, Token, InstanceField;
    Ldflda => "ldflda", 0x7C, Token, InstanceField;
    Stfld => "stfld", 0x7D, Token, InstanceField;
    Ldsfld => "ldsfld", 0x7E, Token, StaticField;
    Ldsflda => "ldsflda", 0x7F, Token, StaticField;
    Stsfld => "stsfld", 0x80, Token, StaticField;
    Stobj => "stobj", 0x81, Token, Type;
    ConvOvfI1Un => "conv.ovf.i1.un", 0x82, None, None;
    ConvOvfI2Un => "conv.ovf.i2.un", 0x83, None, None;
    ConvOvfI4Un => "conv.ovf.i4.un", 0x84, None, None;
    ConvOvfI8Un => "conv.ovf.i8.un", 0x85, None, None;
    ConvOvfU1Un => "conv.ovf.u1.un", 0x86, None, None;
    ConvOvfU2Un => "conv.ovf.u2.un", 0x87, None, None;
    ConvOvfU4Un => "conv.ovf.u4.un", 0x88, None, None;
    ConvOvfU8Un => "conv.ovf.u8.un", 0x89, None, None;
    ConvOvfIUn => "conv.ovf.i.un", 0x8A, None, None;
    ConvOvfUUn => "conv.ovf.u.un", 0x8B, None, None;
    Box => "box", 0x8C, Token, Type;
    Newarr => "newarr", 0x8D, Token, Type;
    Ldlen => "ldlen", 0x8E, None, None;
    Ldelema => "ldelema", 0x8F, Token, Type;
    LdelemI1 => "ldelem.i1", 0x90, None, None;
    LdelemU1 => "ldelem.u1", 0x91, None, None;
    LdelemI2 => "ldelem.i2", 0x92, None, None;
    LdelemU2 => "ldelem.u2", 0x93, None, None;
    LdelemI4 => "ldelem.i4", 0x94, None, None;
    LdelemU4 => "ldelem.u4", 0x95, None, None;
    LdelemI8 => "ldelem.i8", 0x96, None, None;
    LdelemI => "ldelem.i", 0x97, None, None;
    LdelemR4 => "ldelem.r4", 0x98, None, None;
    LdelemR8 => "ldelem.r8", 0x99, None, None;
    LdelemRef => "ldelem.ref", 0x9A, None, None;
    StelemI => "stelem.i", 0x9B, None, None;
    StelemI1 => "stelem.i1", 0x9C, None, None;
    StelemI2 => "stelem.i2", 0x9D, None, None;
    StelemI4 => "stelem.i4", 0x9E, None, None;
    StelemI8 => "stelem.i8", 0x9F, None, None;
    StelemR4 => "stelem.r4", 0xA0, None, None;
    StelemR8 => "stelem.r8", 0xA1, None, None;
    StelemRef => "stelem.ref", 0xA2, None, None;
    Ldelem => "ldelem", 0xA3, Token, Type;
    Stelem => "stelem", 0xA4, Token, Type;
    UnboxAny => "unbox.any", 0xA5, Token, Type;
    ConvOvfI1 => "conv.ovf.i1", 0xB3, None, None;
    ConvOvfU1 => "conv.ovf.u1", 0xB4, None, None;
    ConvOvfI2 => "conv.ovf.i2", 0xB5, None, None;
    ConvOvfU2 => "conv.ovf.u2", 0xB6, None, None;
    ConvOvfI4 => "conv.ovf.i4", 0xB7, None, None;
    ConvOvfU4 => "conv.ovf.u4", 0xB8, None, None;
    ConvOvfI8 => "conv.ovf.i8", 0xB9, None, None;
    ConvOvfU8 => "conv.ovf.u8", 0xBA, None, None;
    Refanyval => "refanyval", 0xC2, Token, Type;
    Ckfinite => "ckfinite", 0xC3, None, None;
    Mkrefany => "mkrefany", 0xC6, Token, Type;
    Ldtoken => "ldtoken", 0xD0, Token, TokenLoad;
    ConvU2 => "conv.u2", 0xD1, None, None;
    ConvU1 => "conv.u1", 0xD2, None, None;
    ConvI => "conv.i", 0xD3, None, None;
    ConvOvfI => "conv.ovf.i", 0xD4, None, None;
    ConvOvfU => "conv.ovf.u", 0xD5, None, None;
    AddOvf => "add.ovf", 0xD6, None, None;
    AddOvfUn => "add.ovf.un", 0xD7, None, None;
    MulOvf => "mul.ovf", 0xD8, None, None;
    MulOvfUn => "mul.ovf.un", 0xD9, None, None;
    SubOvf => "sub.ovf", 0xDA, None, None;
    SubOvfUn => "sub.ovf.un", 0xDB, None, None;
    Endfinally => "endfinally", 0xDC, None, None;
    Leave => "leave", 0xDD, Int32, Branch;
    LeaveS => "leave.s", 0xDE, Int8, Branch;
    StindI => "stind.i", 0xDF, None, None;
    ConvU => "conv.u", 0xE0, None, None;
    Arglist => "arglist", 0xFE00, None, None;
    Ceq => "ceq", 0xFE01, None, None;
    Cgt => "cgt", 0xFE02, None, None;
    CgtUn => "cgt.un", 0xFE03, None, None;
    Clt => "clt", 0xFE04, None, None;
    CltUn => "clt.un", 0xFE05, None, None;
    Ldftn => "ldftn", 0xFE06, Token, Call;
    Ldvirtftn => "ldvirtftn", 0xFE07, Token, Call;
    Ldarg => "ldarg", 0xFE09, UInt16, Argument;
    Ldarga => "ldarga", 0xFE0A, UInt16, Argument;
    Starg => "starg", 0xFE0B, UInt16, Argument;
    Ldloc => "ldloc", 0xFE0C, UInt16, Local;
    Ldloca => "ldloca", 0xFE0D, UInt16, Local;
    Stloc => "stloc", 0xFE0E, UInt16, Local;
    Localloc => "localloc", 0xFE0F, None, None;
    Endfilter => "endfilter", 0xFE11, None, None;
    Unaligned => "unaligned.", 0xFE12, UInt8, None;
    Volatile => "volatile.", 0xFE13, None, None;
    Tail => "tail.", 0xFE14, None, None;
    Initobj => "initobj", 0xFE15, Token, Type;
    Constrained => "constrained.", 0xFE16, Token, Type;
    Cpblk => "cpblk", 0xFE17, None, None;
    Initblk => "initblk", 0xFE18, None, None;
    Rethrow => "rethrow", 0xFE1A, None, None;
    Sizeof => "sizeof", 0xFE1C, Token, Type;
    Refanytype => "refanytype", 0xFE1D, None, None;
    Readonly => "readonly.", 0xFE1E, None, None;
}

impl OpCode {
    /// The ECMA-335 mnemonic of this opcode.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        self.into()
    }

    /// Encoded size of the opcode itself (1, or 2 for `0xFE`-prefixed opcodes).
    #[must_use]
    pub const fn opcode_size(self) -> u32 {
        if self.code() > 0xFF {
            2
        } else {
            1
        }
    }

    /// Encoded size of the whole instruction.
    ///
    /// `switch_targets` is only consulted for `switch`, whose operand is a 4-byte count
    /// followed by one 4-byte offset per target.
    #[must_use]
    pub fn encoded_size(self, switch_targets: usize) -> u32 {
        let operand = match self.operand_type().size() {
            Some(size) => size,
            None => 4u32.saturating_add(
                4u32.saturating_mul(u32::try_from(switch_targets).unwrap_or(u32::MAX)),
            ),
        };
        self.opcode_size() + operand
    }

    /// Returns `true` for branches and `leave`.
    #[must_use]
    pub const fn is_branch(self) -> bool {
        matches!(self.operand_class(), OperandClass::Branch)
    }
}
