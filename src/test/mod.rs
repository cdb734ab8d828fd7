//! Fixtures shared by the unit tests.

use std::sync::Arc;

use crate::metadata::{
    method::{BodyBuilder, MethodDef, MethodRc},
    token::Token,
    typesystem::{Domain, TypeBuilder, TypeRc},
};

/// `Demo.Widget`: instance fields `id` (0x04000001) and `name` (0x04000002), static field
/// `Count` (0x04000003)
pub fn demo_type(domain: &Domain) -> TypeRc {
    TypeBuilder::new(domain, Token::new(0x0200_0001))
        .class("Demo", "Widget")
        .field(Token::new(0x0400_0001), "id")
        .field(Token::new(0x0400_0002), "name")
        .static_field(Token::new(0x0400_0003), "Count")
        .build()
        .unwrap()
}

/// `Demo.Box<T>`: instance field `value` (0x04000011), static field `Shared` (0x04000012)
pub fn generic_box(domain: &Domain) -> TypeRc {
    TypeBuilder::new(domain, Token::new(0x0200_0002))
        .class("Demo", "Box`1")
        .generic_param("T")
        .field(Token::new(0x0400_0011), "value")
        .static_field(Token::new(0x0400_0012), "Shared")
        .build()
        .unwrap()
}

/// Attach `body` to `def`, define it on `owner` and return its descriptor
pub fn define(domain: &Domain, owner: &TypeRc, def: MethodDef, body: BodyBuilder) -> MethodRc {
    let token = def.token;
    domain
        .define_method(owner.token, def.with_body(body.finalize().unwrap()))
        .unwrap();
    let method = domain.method(owner.token, token).unwrap();
    assert!(Arc::ptr_eq(method.declaring_type(), owner));
    method
}
