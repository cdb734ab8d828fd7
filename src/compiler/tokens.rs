//! Operand normalization, one operand class at a time.
//!
//! Every raw operand is turned into the single [`Operand`] payload its opcode's
//! [`OperandClass`] selects. Metadata references go through the [`Registry`]; an unknown
//! reference is always an error, never a zero token.

use crate::{
    assembly::{
        ArgumentRef, FieldRef, Instruction, MethodRef, Operand, OperandClass, RawInstruction,
        RawOperand, TokenOperand,
    },
    compiler::{AddressMap, JumpTables},
    metadata::{
        method::Method,
        typesystem::{GenericContext, IdentityHash, RawType, Registry},
    },
    Error, ReferenceKind, Result,
};

/// Resolves the operands of one method body.
pub(crate) struct TokenResolver<'a> {
    method: &'a Method,
    registry: &'a dyn Registry,
    map: &'a AddressMap,
    context: GenericContext<'a>,
}

impl<'a> TokenResolver<'a> {
    pub(crate) fn new(method: &'a Method, registry: &'a dyn Registry, map: &'a AddressMap) -> Self {
        TokenResolver {
            method,
            registry,
            map,
            context: method.generic_context(),
        }
    }

    /// Translate one raw instruction
    pub(crate) fn resolve(
        &self,
        raw: &RawInstruction,
        tables: &mut JumpTables,
    ) -> Result<Instruction> {
        let operand = match (raw.opcode.operand_class(), &raw.operand) {
            // Compact forms and prefixes carry no operand worth normalizing
            (OperandClass::None, _) => Operand::None,
            (OperandClass::Branch, RawOperand::Target(offset)) => {
                Operand::Target(self.map.branch_target(*offset, self.method)?)
            }
            (OperandClass::Int8Constant, RawOperand::Int8(value)) => {
                Operand::Int32(i32::from(*value))
            }
            (OperandClass::Int32Constant, RawOperand::Int32(value)) => Operand::Int32(*value),
            (OperandClass::Int64Constant, RawOperand::Int64(value)) => Operand::Int64(*value),
            (OperandClass::Float32Constant, RawOperand::Float32(value)) => {
                Operand::Float32(*value)
            }
            (OperandClass::Float64Constant, RawOperand::Float64(value)) => {
                Operand::Float64(*value)
            }
            (OperandClass::Local, RawOperand::Local(local)) => {
                Operand::Local(u32::from(local.index))
            }
            (OperandClass::Argument, RawOperand::Argument(argument)) => {
                Operand::Argument(self.argument_slot(*argument)?)
            }
            (OperandClass::Call, RawOperand::Method(method)) => {
                Operand::Method(self.method_token(method)?)
            }
            (OperandClass::Type, RawOperand::Type(ty)) => Operand::Type(self.type_token(ty)?),
            (OperandClass::InstanceField, RawOperand::Field(field)) => {
                Operand::Field(self.instance_field(field)?)
            }
            (OperandClass::StaticField, RawOperand::Field(field)) => {
                Operand::StaticField(self.static_field(field)?)
            }
            (OperandClass::TokenLoad, RawOperand::Token(handle)) => match handle {
                TokenOperand::Field(field) => Operand::StaticField(self.static_field(field)?),
                other => return Err(Error::UnsupportedTokenOperand(other.to_string())),
            },
            (OperandClass::String, RawOperand::String(text)) => {
                Operand::String(self.registry.intern_string(text))
            }
            (OperandClass::Switch, RawOperand::Switch(targets)) => {
                Operand::Switch(tables.prepare(raw.offset, targets, self.map, self.method)?)
            }
            (_, operand) => {
                return Err(malformed_error!(
                    "{} in {} carries a {} operand",
                    raw,
                    self.method,
                    operand.kind()
                ))
            }
        };

        Ok(Instruction::new(raw.opcode, operand))
    }

    /// Declared parameter index, shifted past the receiver when there is one
    fn argument_slot(&self, argument: ArgumentRef) -> Result<u32> {
        let receiver = u32::from(self.method.has_receiver());
        match argument {
            ArgumentRef::Param(index) => Ok(u32::from(index) + receiver),
            ArgumentRef::This if receiver == 1 => Ok(0),
            ArgumentRef::This => Err(malformed_error!(
                "Static method {} references its receiver",
                self.method
            )),
        }
    }

    fn method_token(&self, raw: &MethodRef) -> Result<u64> {
        let resolved = self
            .registry
            .resolve_method(raw, &self.context)?
            .ok_or_else(|| Error::UnresolvedReference {
                kind: ReferenceKind::Method,
                reference: raw.to_string(),
            })?;

        if resolved.is_generic_instance() || resolved.declaring_type().is_generic_instance() {
            Ok(resolved.identity())
        } else {
            Ok(IdentityHash::new()
                .add_component("method-ref")
                .add_component(raw)
                .finalize())
        }
    }

    fn type_token(&self, raw: &RawType) -> Result<u64> {
        let resolved = self.context.resolve_type(self.registry, raw)?;

        if raw.contains_generic_parameter() || resolved.is_user_type() {
            Ok(resolved.identity())
        } else {
            Ok(raw.identity())
        }
    }

    fn instance_field(&self, raw: &FieldRef) -> Result<u32> {
        self.registry
            .instance_field_slot(raw, &self.context)?
            .ok_or_else(|| Error::UnresolvedReference {
                kind: ReferenceKind::InstanceField,
                reference: raw.to_string(),
            })
    }

    fn static_field(&self, raw: &FieldRef) -> Result<u64> {
        self.registry
            .static_field_slot(raw, &self.context)?
            .ok_or_else(|| Error::UnresolvedReference {
                kind: ReferenceKind::StaticField,
                reference: raw.to_string(),
            })
    }
}
