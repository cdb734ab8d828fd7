//! Method body translation.
//!
//! This module turns a method's [`crate::metadata::method::RawBody`] into the execution-ready
//! [`CompiledBody`]: a flat instruction array whose operands are instruction indices, slot
//! indices, identity tokens or jump table keys, plus the body's exception regions and jump
//! tables.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     Translation Pipeline                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  AddressMap            raw offset → dense index (0..N-1)         │
//! │    └─ end of body      → N (exclusive range ends only)           │
//! │                                                                  │
//! │  TokenResolver         one rule per operand class                │
//! │    ├─ branch/leave     target index                              │
//! │    ├─ constants        widened copy                              │
//! │    ├─ local/argument   slot (arguments shifted past `this`)      │
//! │    ├─ call/type        identity tokens via the Registry          │
//! │    ├─ fields           instance slot / wide static slot          │
//! │    ├─ ldstr            interned literal hash                     │
//! │    └─ switch           → JumpTables                              │
//! │                                                                  │
//! │  ExceptionRegions      catch/finally over inclusive indices      │
//! │                                                                  │
//! │  JumpTables            per-site target lists, dense keys         │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Translation is a pure function of the raw body, the method's generic bindings and the
//! registry state; it runs on the calling thread and is normally driven through
//! [`crate::metadata::method::Method::compiled_body`].

mod addressmap;
mod jumptable;
mod regions;
mod tokens;

pub use addressmap::AddressMap;
pub use jumptable::JumpTables;

use crate::{
    assembly::Instruction,
    metadata::{
        method::{ExceptionRegion, Method},
        typesystem::Registry,
    },
    Result,
};

/// The translated artifacts of one method descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledBody {
    /// Instructions, addressed by index
    pub instructions: Vec<Instruction>,
    /// Exception regions in clause order
    pub exception_regions: Vec<ExceptionRegion>,
    /// Jump tables of the body's `switch` sites
    pub jump_tables: JumpTables,
}

/// Translate the raw body of `method`.
///
/// A method without a body translates to an empty [`CompiledBody`].
///
/// # Errors
/// Returns the first resolution failure; see [`crate::Error`] for the taxonomy.
pub fn compile(method: &Method, registry: &dyn Registry) -> Result<CompiledBody> {
    let Some(body) = method.raw_body() else {
        return Ok(CompiledBody::default());
    };

    let map = AddressMap::build(body);
    let resolver = tokens::TokenResolver::new(method, registry, &map);
    let mut jump_tables = JumpTables::default();

    let instructions = body
        .instructions
        .iter()
        .map(|raw| resolver.resolve(raw, &mut jump_tables))
        .collect::<Result<Vec<_>>>()?;
    let exception_regions =
        regions::build_regions(method, registry, &body.exception_handlers, &map)?;

    log::debug!(
        "Compiled {} - {} instructions, {} regions, {} jump tables",
        method,
        instructions.len(),
        exception_regions.len(),
        jump_tables.len()
    );

    Ok(CompiledBody {
        instructions,
        exception_regions,
        jump_tables,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        assembly::{
            ArgumentRef, FieldRef, MethodRef, OpCode, Operand, RawOperand, TokenOperand,
        },
        metadata::{
            method::{BodyBuilder, ExceptionHandlerFlags, HandlerKind, MethodDef},
            token::Token,
            typesystem::{Domain, PrimitiveKind, RawType, TypeBuilder},
        },
        test::{define, demo_type, generic_box},
        Error, ReferenceKind,
    };

    #[test]
    fn constants_widened() {
        let domain = Domain::new();
        let owner = demo_type(&domain);

        let mut body = BodyBuilder::new();
        body.ldc_i4(-5).unwrap();
        body.ldc_i4(3).unwrap();
        body.emit_with(OpCode::LdcI8, RawOperand::Int64(1 << 40)).unwrap();
        body.emit_with(OpCode::LdcR4, RawOperand::Float32(1.5)).unwrap();
        body.emit_with(OpCode::LdcR8, RawOperand::Float64(-2.25)).unwrap();
        body.ret().unwrap();
        let method = define(&domain, &owner, MethodDef::new(Token::new(0x0600_0001), "C"), body);

        let code = method.compiled_body(&domain).unwrap();
        assert_eq!(code[0].get_i32_operand(), Some(-5));
        assert_eq!(code[1].operand, Operand::None);
        assert_eq!(code[2].get_i64_operand(), Some(1 << 40));
        assert_eq!(code[3].operand, Operand::Float32(1.5));
        assert_eq!(code[4].operand, Operand::Float64(-2.25));
    }

    #[test]
    fn argument_slots_follow_receiver() {
        let domain = Domain::new();
        let owner = demo_type(&domain);

        let body = || {
            let mut body = BodyBuilder::new();
            body.ldarg(0).unwrap();
            body.ldarg(2).unwrap();
            body.ret().unwrap();
            body
        };
        let instance = define(
            &domain,
            &owner,
            MethodDef::new(Token::new(0x0600_0001), "I"),
            body(),
        );
        let stat = define(
            &domain,
            &owner,
            MethodDef::new(Token::new(0x0600_0002), "S").static_method(),
            body(),
        );

        let slots: Vec<_> = instance
            .compiled_body(&domain)
            .unwrap()
            .iter()
            .filter_map(|i| i.slot())
            .collect();
        assert_eq!(slots, vec![1, 3]);

        let slots: Vec<_> = stat
            .compiled_body(&domain)
            .unwrap()
            .iter()
            .filter_map(|i| i.slot())
            .collect();
        assert_eq!(slots, vec![0, 2]);
    }

    #[test]
    fn receiver_on_static_method_is_malformed() {
        let domain = Domain::new();
        let owner = demo_type(&domain);

        let mut body = BodyBuilder::new();
        body.emit_with(OpCode::LdargS, RawOperand::Argument(ArgumentRef::This))
            .unwrap();
        body.ret().unwrap();
        let method = define(
            &domain,
            &owner,
            MethodDef::new(Token::new(0x0600_0001), "S").static_method(),
            body,
        );

        assert!(matches!(
            method.compiled_body(&domain),
            Err(Error::Malformed { .. })
        ));
        assert!(!method.is_compiled());
    }

    #[test]
    fn unresolved_references_fail_loudly() {
        let domain = Domain::new();
        let owner = demo_type(&domain);

        let mut body = BodyBuilder::new();
        body.call(MethodRef::local(Token::new(0x0600_0999))).unwrap();
        body.ret().unwrap();
        let call = define(&domain, &owner, MethodDef::new(Token::new(0x0600_0001), "A"), body);
        assert!(matches!(
            call.compiled_body(&domain),
            Err(Error::UnresolvedReference {
                kind: ReferenceKind::Method,
                ..
            })
        ));

        let mut body = BodyBuilder::new();
        body.emit_with(OpCode::Box, RawOperand::Type(RawType::Named(Token::new(0x0200_0999))))
            .unwrap();
        body.ret().unwrap();
        let boxing = define(&domain, &owner, MethodDef::new(Token::new(0x0600_0002), "B"), body);
        assert!(matches!(
            boxing.compiled_body(&domain),
            Err(Error::UnresolvedReference {
                kind: ReferenceKind::Type,
                ..
            })
        ));

        let mut body = BodyBuilder::new();
        body.emit_with(
            OpCode::Ldsfld,
            RawOperand::Field(FieldRef::new(RawType::Named(owner.token), Token::new(0x0400_0999))),
        )
        .unwrap();
        body.ret().unwrap();
        let field = define(&domain, &owner, MethodDef::new(Token::new(0x0600_0003), "F"), body);
        assert!(matches!(
            field.compiled_body(&domain),
            Err(Error::UnresolvedReference {
                kind: ReferenceKind::StaticField,
                ..
            })
        ));
    }

    #[test]
    fn field_slots() {
        let domain = Domain::new();
        let owner = demo_type(&domain);

        let mut body = BodyBuilder::new();
        body.ldarg_this().unwrap();
        body.emit_with(
            OpCode::Ldfld,
            RawOperand::Field(FieldRef::new(RawType::Named(owner.token), Token::new(0x0400_0002))),
        )
        .unwrap();
        body.emit_with(
            OpCode::Ldsfld,
            RawOperand::Field(FieldRef::new(RawType::Named(owner.token), Token::new(0x0400_0003))),
        )
        .unwrap();
        body.emit_with(
            OpCode::Ldtoken,
            RawOperand::Token(TokenOperand::Field(FieldRef::new(
                RawType::Named(owner.token),
                Token::new(0x0400_0003),
            ))),
        )
        .unwrap();
        body.ret().unwrap();
        let method = define(&domain, &owner, MethodDef::new(Token::new(0x0600_0001), "F"), body);

        let code = method.compiled_body(&domain).unwrap();
        assert_eq!(code[0].slot(), Some(0));
        assert_eq!(code[1].operand, Operand::Field(1));
        let Operand::StaticField(wide) = code[2].operand else {
            panic!("expected a static slot, got {}", code[2]);
        };
        assert_eq!(code[3].operand, Operand::StaticField(wide));
        assert_eq!(wide & 0xFFFF_FFFF, 0);
    }

    #[test]
    fn ldtoken_type_unsupported() {
        let domain = Domain::new();
        let owner = demo_type(&domain);

        let mut body = BodyBuilder::new();
        body.emit_with(
            OpCode::Ldtoken,
            RawOperand::Token(TokenOperand::Type(RawType::Primitive(PrimitiveKind::I4))),
        )
        .unwrap();
        body.ret().unwrap();
        let method = define(&domain, &owner, MethodDef::new(Token::new(0x0600_0001), "T"), body);

        assert!(matches!(
            method.compiled_body(&domain),
            Err(Error::UnsupportedTokenOperand(_))
        ));
    }

    #[test]
    fn handler_kinds() {
        let domain = Domain::new();
        let owner = demo_type(&domain);

        for (flags, supported) in [
            (ExceptionHandlerFlags::FAULT, false),
            (ExceptionHandlerFlags::FILTER, false),
            (ExceptionHandlerFlags::FINALLY, true),
        ] {
            let mut body = BodyBuilder::new();
            body.define_label("try").unwrap();
            body.emit_branch(OpCode::LeaveS, "end").unwrap();
            body.define_label("handler").unwrap();
            body.emit(OpCode::Endfinally).unwrap();
            body.define_label("end").unwrap();
            body.ret().unwrap();
            body.handler(flags, ("try", "handler"), ("handler", "end"), None);

            let token = domain.reserve_method_token();
            let method = define(&domain, &owner, MethodDef::new(token, "H"), body);
            let result = method.exception_regions(&domain);
            if supported {
                let regions = result.unwrap();
                assert_eq!(regions.len(), 1);
                assert_eq!(regions[0].kind, HandlerKind::Finally);
                assert_eq!((regions[0].try_start, regions[0].try_end), (0, 0));
                assert_eq!((regions[0].handler_start, regions[0].handler_end), (1, 1));
            } else {
                assert!(matches!(result, Err(Error::UnsupportedHandlerKind(f)) if f == flags));
            }
        }
    }

    #[test]
    fn catch_type_resolved() {
        let domain = Domain::new();
        let owner = demo_type(&domain);
        let failure = TypeBuilder::new(&domain, Token::new(0x0200_0010))
            .class("Demo", "Failure")
            .extends(domain.primitive(PrimitiveKind::Exception).unwrap())
            .build()
            .unwrap();

        let mut body = BodyBuilder::new();
        body.define_label("try").unwrap();
        body.emit(OpCode::Nop).unwrap();
        body.emit_branch(OpCode::LeaveS, "end").unwrap();
        body.define_label("catch").unwrap();
        body.emit(OpCode::Pop).unwrap();
        body.emit_branch(OpCode::LeaveS, "end").unwrap();
        body.define_label("end").unwrap();
        body.ret().unwrap();
        body.try_catch(("try", "catch"), ("catch", "end"), RawType::Named(failure.token));
        let method = define(&domain, &owner, MethodDef::new(Token::new(0x0600_0001), "C"), body);

        let regions = method.exception_regions(&domain).unwrap();
        assert_eq!(regions[0].try_start, 0);
        assert_eq!(regions[0].try_end, 1);
        assert_eq!(regions[0].handler_start, 2);
        assert_eq!(regions[0].handler_end, 3);
        assert_eq!(
            regions[0].kind.catch_type().map(|t| t.identity()),
            Some(failure.identity())
        );
    }

    #[test]
    fn without_body() {
        let domain = Domain::new();
        let owner = demo_type(&domain);
        domain
            .define_method(
                owner.token,
                MethodDef::new(Token::new(0x0600_0001), "Abstract"),
            )
            .unwrap();
        let method = domain.method(owner.token, Token::new(0x0600_0001)).unwrap();

        let compiled = compile(&method, &domain).unwrap();
        assert_eq!(compiled, CompiledBody::default());
    }

    #[test]
    fn branch_to_end_is_malformed() {
        let domain = Domain::new();
        let owner = demo_type(&domain);

        let mut body = BodyBuilder::new();
        body.emit_branch(OpCode::BrS, "end").unwrap();
        body.define_label("end").unwrap();
        let method = define(&domain, &owner, MethodDef::new(Token::new(0x0600_0001), "E"), body);

        assert!(matches!(
            method.compiled_body(&domain),
            Err(Error::MalformedBranchTarget { offset: 2, .. })
        ));
    }

    #[test]
    fn jump_table_fetch_is_shared() {
        let domain = Domain::new();
        let owner = demo_type(&domain);

        let mut body = BodyBuilder::new();
        body.ldarg(0).unwrap();
        body.emit_switch(&["a", "b"]).unwrap();
        body.define_label("a").unwrap();
        body.emit(OpCode::Nop).unwrap();
        body.define_label("b").unwrap();
        body.ret().unwrap();
        let method = define(
            &domain,
            &owner,
            MethodDef::new(Token::new(0x0600_0001), "J").static_method(),
            body,
        );

        let code = method.compiled_body(&domain).unwrap();
        let key = code[1].jump_table_key().unwrap();
        let first = method.jump_table(key).unwrap();
        let second = method.jump_table(key).unwrap();
        assert_eq!(&*first, &[2, 3]);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn generic_type_statics_split_per_instance() {
        let domain = Domain::new();
        let boxed = generic_box(&domain);
        let box_of_t = || RawType::GenericInstance {
            definition: boxed.token,
            args: vec![RawType::GenericParameter("T".into())],
        };

        let mut body = BodyBuilder::new();
        body.ldarg_this().unwrap();
        body.emit_with(
            OpCode::Ldfld,
            RawOperand::Field(FieldRef::new(box_of_t(), Token::new(0x0400_0011))),
        )
        .unwrap();
        body.emit_with(
            OpCode::Ldsfld,
            RawOperand::Field(FieldRef::new(box_of_t(), Token::new(0x0400_0012))),
        )
        .unwrap();
        body.ret().unwrap();
        define(&domain, &boxed, MethodDef::new(Token::new(0x0600_0001), "Get"), body);

        let compiled_on = |kind| {
            let arg = domain.primitive(kind).unwrap();
            let instance = domain.instantiate_type(&boxed, &[arg]).unwrap();
            let method = domain
                .method_on(&instance, Token::new(0x0600_0001))
                .unwrap()
                .unwrap();
            method.compiled_body(&domain).unwrap().to_vec()
        };
        let ints = compiled_on(PrimitiveKind::I4);
        let strings = compiled_on(PrimitiveKind::String);

        assert_eq!(ints[1].operand, Operand::Field(0));
        assert_eq!(ints[1].operand, strings[1].operand);
        assert_ne!(ints[2].operand, strings[2].operand);
        assert_eq!(domain.statics().type_count(), 2);
    }
}
