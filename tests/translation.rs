//! Integration tests for method body translation.
//!
//! Covers branch and switch addressing, argument slot shifting, exception regions, string
//! interning and the determinism of repeated translation.

use std::sync::Arc;

use ilbody::{compiler::compile, metadata::token::TableId, prelude::*};

const OWNER: Token = Token(0x0200_0001);

fn domain_with_owner() -> Result<(Domain, TypeRc)> {
    let domain = Domain::new();
    let owner = TypeBuilder::new(&domain, OWNER)
        .class("Demo", "Sample")
        .field(Token::new(0x0400_0001), "state")
        .build()?;
    Ok((domain, owner))
}

fn define(domain: &Domain, def: MethodDef, body: BodyBuilder) -> Result<MethodRc> {
    let token = def.token;
    domain.define_method(OWNER, def.with_body(body.finalize()?))?;
    domain.method(OWNER, token)
}

/// `[ldarg 0, ldc 5, beq L1, ldstr "a", br L2, L1: ldstr "b", L2: ret]`
fn worked_example() -> Result<BodyBuilder> {
    let mut body = BodyBuilder::new();
    body.ldarg(0)?;
    body.ldc_i4(5)?;
    body.emit_branch(OpCode::Beq, "L1")?;
    body.ldstr("a")?;
    body.emit_branch(OpCode::Br, "L2")?;
    body.define_label("L1")?;
    body.ldstr("b")?;
    body.define_label("L2")?;
    body.ret()?;
    Ok(body)
}

#[test]
fn worked_example_on_instance_method() -> Result<()> {
    let (domain, _) = domain_with_owner()?;
    let method = define(
        &domain,
        MethodDef::new(Token::new(0x0600_0001), "Pick")
            .param("value", RawType::Primitive(PrimitiveKind::I4))
            .returns(RawType::Primitive(PrimitiveKind::String)),
        worked_example()?,
    )?;

    let code = method.compiled_body(&domain)?;
    assert_eq!(code.len(), 7);
    assert_eq!(code[0].opcode, OpCode::LdargS);
    assert_eq!(code[0].slot(), Some(1));
    assert_eq!(code[2].target(), Some(5));
    assert_eq!(code[4].target(), Some(6));
    assert_eq!(code[6].opcode, OpCode::Ret);
    assert_eq!(code[3].identity(), Some(domain.strings().intern("a")));
    Ok(())
}

#[test]
fn worked_example_on_static_method() -> Result<()> {
    let (domain, _) = domain_with_owner()?;
    let method = define(
        &domain,
        MethodDef::new(Token::new(0x0600_0001), "Pick")
            .static_method()
            .param("value", RawType::Primitive(PrimitiveKind::I4)),
        worked_example()?,
    )?;

    let code = method.compiled_body(&domain)?;
    assert_eq!(code[0].slot(), Some(0));
    assert_eq!(code[2].target(), Some(5));
    Ok(())
}

#[test]
fn every_branch_targets_its_instruction() -> Result<()> {
    let (domain, _) = domain_with_owner()?;

    let mut body = BodyBuilder::new();
    body.declare_locals(2);
    body.define_label("loop")?;
    body.ldloc(0)?;
    body.ldc_i4(100)?;
    body.emit_branch(OpCode::BgeS, "done")?;
    body.ldloc(0)?;
    body.ldc_i4(1)?;
    body.emit(OpCode::Add)?;
    body.stloc(0)?;
    body.ldloc(1)?;
    body.emit_branch(OpCode::Brfalse, "loop")?;
    body.define_label("try")?;
    body.emit(OpCode::Nop)?;
    body.emit_branch(OpCode::Leave, "done")?;
    body.define_label("finally")?;
    body.emit(OpCode::Endfinally)?;
    body.define_label("done")?;
    body.ret()?;
    body.try_finally(("try", "finally"), ("finally", "done"));
    let method = define(
        &domain,
        MethodDef::new(Token::new(0x0600_0001), "Loop").static_method(),
        body,
    )?;

    let raw = method.raw_body().map(|b| b.instructions.clone()).unwrap_or_default();
    let code = method.compiled_body(&domain)?;
    assert_eq!(code.len(), raw.len());

    let mut branches = 0;
    for (compiled, source) in code.iter().zip(&raw) {
        if let (Some(index), RawOperand::Target(offset)) = (compiled.target(), &source.operand) {
            assert_eq!(raw[index as usize].offset, *offset);
            branches += 1;
        }
    }
    assert_eq!(branches, 3);
    assert_eq!(method.local_variable_count(), 2);
    Ok(())
}

#[test]
fn argument_slot_shift() -> Result<()> {
    let (domain, _) = domain_with_owner()?;

    for (token, is_static) in [(0x0600_0001, false), (0x0600_0002, true)] {
        let mut body = BodyBuilder::new();
        for k in 0..4 {
            body.ldarg(k)?;
        }
        body.emit_with(OpCode::Starg, RawOperand::Argument(ArgumentRef::Param(300)))?;
        body.ret()?;

        let mut def = MethodDef::new(Token::new(token), "Args");
        if is_static {
            def = def.static_method();
        }
        let method = define(&domain, def, body)?;

        let shift = u32::from(!is_static);
        let slots: Vec<u32> = method
            .compiled_body(&domain)?
            .iter()
            .filter_map(Instruction::slot)
            .collect();
        assert_eq!(slots, vec![shift, 1 + shift, 2 + shift, 3 + shift, 300 + shift]);
    }
    Ok(())
}

#[test]
fn exception_regions_are_ordered() -> Result<()> {
    let (domain, _) = domain_with_owner()?;

    let mut body = BodyBuilder::new();
    body.define_label("outer")?;
    body.define_label("inner")?;
    body.emit(OpCode::Nop)?;
    body.emit(OpCode::Nop)?;
    body.emit_branch(OpCode::LeaveS, "after_catch")?;
    body.define_label("catch")?;
    body.emit(OpCode::Pop)?;
    body.emit_branch(OpCode::LeaveS, "after_catch")?;
    body.define_label("after_catch")?;
    body.emit_branch(OpCode::LeaveS, "end")?;
    body.define_label("finally")?;
    body.emit(OpCode::Endfinally)?;
    body.define_label("end")?;
    body.ret()?;
    body.try_catch(
        ("inner", "catch"),
        ("catch", "after_catch"),
        RawType::Primitive(PrimitiveKind::Exception),
    );
    body.try_finally(("outer", "finally"), ("finally", "end"));
    let method = define(
        &domain,
        MethodDef::new(Token::new(0x0600_0001), "Guarded"),
        body,
    )?;

    let regions = method.exception_regions(&domain)?;
    assert_eq!(regions.len(), 2);
    for region in regions {
        assert!(region.try_start <= region.try_end);
        assert!(region.handler_start <= region.handler_end);
        assert!(region.try_end < region.handler_start);
    }

    let catch = &regions[0];
    assert_eq!((catch.try_start, catch.try_end), (0, 2));
    assert_eq!((catch.handler_start, catch.handler_end), (3, 4));
    assert_eq!(
        catch.kind.catch_type().map(|t| t.full_name()),
        Some("System.Exception".to_string())
    );

    let finally = &regions[1];
    assert_eq!((finally.try_start, finally.try_end), (0, 5));
    assert_eq!((finally.handler_start, finally.handler_end), (6, 6));
    assert_eq!(finally.kind, HandlerKind::Finally);
    assert!(finally.protects(5));
    assert!(!finally.protects(6));
    assert!(finally.handles(6));
    Ok(())
}

#[test]
fn handler_reaching_end_of_body() -> Result<()> {
    let (domain, _) = domain_with_owner()?;

    let mut body = BodyBuilder::new();
    body.define_label("try")?;
    body.emit(OpCode::Nop)?;
    body.emit_branch(OpCode::LeaveS, "try")?;
    body.define_label("handler")?;
    body.emit(OpCode::Throw)?;
    body.define_label("end")?;
    body.try_catch(
        ("try", "handler"),
        ("handler", "end"),
        RawType::Primitive(PrimitiveKind::Object),
    );
    let method = define(
        &domain,
        MethodDef::new(Token::new(0x0600_0001), "Rethrow"),
        body,
    )?;

    let regions = method.exception_regions(&domain)?;
    assert_eq!((regions[0].handler_start, regions[0].handler_end), (2, 2));
    Ok(())
}

#[test]
fn switch_tables_follow_case_order() -> Result<()> {
    let (domain, _) = domain_with_owner()?;

    let mut body = BodyBuilder::new();
    body.ldarg(0)?;
    body.emit_switch(&["two", "zero", "one", "zero"])?;
    body.emit_branch(OpCode::BrS, "end")?;
    body.define_label("zero")?;
    body.emit(OpCode::Nop)?;
    body.define_label("one")?;
    body.emit(OpCode::Nop)?;
    body.define_label("two")?;
    body.emit(OpCode::Nop)?;
    body.define_label("end")?;
    body.ldarg(0)?;
    body.emit_switch(&["end"])?;
    body.ret()?;
    let method = define(
        &domain,
        MethodDef::new(Token::new(0x0600_0001), "Dispatch").static_method(),
        body,
    )?;

    let code = method.compiled_body(&domain)?;
    let first = code[1].jump_table_key().ok_or(Error::Error("no key".into()))?;
    let second = code[7].jump_table_key().ok_or(Error::Error("no key".into()))?;
    assert_ne!(first, second);

    let table = method.jump_table(first).ok_or(Error::Error("no table".into()))?;
    assert_eq!(table.len(), 4);
    assert_eq!(&*table, &[5, 3, 4, 3]);
    assert!(Arc::ptr_eq(
        &table,
        &method.jump_table(first).ok_or(Error::Error("no table".into()))?
    ));
    assert_eq!(
        method.jump_table(second).as_deref(),
        Some(&[6u32][..])
    );
    Ok(())
}

#[test]
fn translation_is_deterministic() -> Result<()> {
    let build = || -> Result<(Domain, MethodRc)> {
        let (domain, _) = domain_with_owner()?;
        let mut body = worked_example()?;
        body.ldarg(0)?;
        body.emit_switch(&["L3", "L3"])?;
        body.define_label("L3")?;
        body.ret()?;
        let method = define(
            &domain,
            MethodDef::new(Token::new(0x0600_0001), "Pick"),
            body,
        )?;
        Ok((domain, method))
    };

    let (domain_a, a) = build()?;
    let (domain_b, b) = build()?;

    let first = compile(&a, &domain_a)?;
    let second = compile(&a, &domain_a)?;
    let fresh = compile(&b, &domain_b)?;
    assert_eq!(first, second);
    assert_eq!(first, fresh);
    assert_eq!(a.compiled(&domain_a)?, &first);
    Ok(())
}

#[test]
fn string_cache_has_one_entry_per_literal() -> Result<()> {
    let (domain, _) = domain_with_owner()?;

    for (row, literals) in [
        (1, vec!["alpha", "beta", "alpha"]),
        (2, vec!["beta", "gamma"]),
        (3, vec!["alpha"]),
    ] {
        let mut body = BodyBuilder::new();
        for literal in literals {
            body.ldstr(literal)?;
            body.emit(OpCode::Pop)?;
        }
        body.ret()?;
        let method = define(
            &domain,
            MethodDef::new(Token::from_parts(TableId::MethodDef, row), "Strings"),
            body,
        )?;
        method.compiled_body(&domain)?;
    }

    assert_eq!(domain.strings().len(), 3);
    let alpha = domain.strings().intern("alpha");
    assert_eq!(domain.strings().get(alpha).as_deref(), Some("alpha"));
    assert_eq!(domain.strings().len(), 3);
    Ok(())
}

#[test]
fn failures_surface_at_first_access() -> Result<()> {
    let (domain, _) = domain_with_owner()?;

    let mut body = BodyBuilder::new();
    body.emit_with(
        OpCode::Box,
        RawOperand::Type(RawType::GenericParameter("X".into())),
    )?;
    body.ret()?;
    let method = define(
        &domain,
        MethodDef::new(Token::new(0x0600_0001), "Broken"),
        body,
    )?;

    for _ in 0..2 {
        match method.compiled_body(&domain) {
            Err(Error::UnresolvedGenericParameter { name, method }) => {
                assert_eq!(name, "X");
                assert_eq!(method, "Demo.Sample.Broken");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
    assert!(!method.is_compiled());
    Ok(())
}
