//! Method flags and the immutable method definition a descriptor is built from.
//!
//! # Key Types
//! - [`MethodFlags`]: Attribute flags (ECMA-335 `MethodAttributes` subset)
//! - [`ParamDef`]: A declared parameter
//! - [`MethodDef`]: Name, signature shape, generic parameters and raw body of a method

use bitflags::bitflags;

use crate::metadata::{
    method::RawBody,
    token::Token,
    typesystem::{PrimitiveKind, RawType},
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method attribute flags
    pub struct MethodFlags: u32 {
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method is special
        const SPECIAL_NAME = 0x0800;
        /// CLI provides 'special' behavior, depending upon the name of the method
        const RTSPECIAL_NAME = 0x1000;
    }
}

/// A declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDef {
    /// Parameter name
    pub name: String,
    /// Declared parameter type
    pub param_type: RawType,
}

/// The immutable definition of a method.
///
/// Every descriptor of the method (the definition and each generic instantiation, on each
/// instantiation of its declaring type) shares one `MethodDef`.
///
/// # Examples
///
/// ```rust
/// use ilbody::metadata::{method::MethodDef, token::Token, typesystem::{PrimitiveKind, RawType}};
///
/// let def = MethodDef::new(Token::new(0x0600_0001), "Add")
///     .static_method()
///     .param("a", RawType::Primitive(PrimitiveKind::I4))
///     .param("b", RawType::Primitive(PrimitiveKind::I4))
///     .returns(RawType::Primitive(PrimitiveKind::I4));
///
/// assert!(!def.has_this());
/// assert_eq!(def.params.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// Method token
    pub token: Token,
    /// Method name
    pub name: String,
    /// Attribute flags
    pub flags: MethodFlags,
    /// Declared generic parameter names, in declaration order
    pub generic_params: Vec<String>,
    /// Declared parameters, receiver excluded
    pub params: Vec<ParamDef>,
    /// Declared return type
    pub return_type: RawType,
    /// The raw body; `None` for abstract and runtime-provided methods
    pub body: Option<RawBody>,
}

impl MethodDef {
    /// Create an instance method returning `System.Void` with no parameters and no body
    #[must_use]
    pub fn new(token: Token, name: &str) -> Self {
        MethodDef {
            token,
            name: name.to_string(),
            flags: MethodFlags::empty(),
            generic_params: Vec::new(),
            params: Vec::new(),
            return_type: RawType::Primitive(PrimitiveKind::Void),
            body: None,
        }
    }

    /// Mark as static
    #[must_use]
    pub fn static_method(mut self) -> Self {
        self.flags |= MethodFlags::STATIC;
        self
    }

    /// Mark as an instance constructor (`.ctor` naming is left to the caller)
    #[must_use]
    pub fn constructor(mut self) -> Self {
        self.flags |= MethodFlags::SPECIAL_NAME | MethodFlags::RTSPECIAL_NAME;
        self
    }

    /// Add flags
    #[must_use]
    pub fn with_flags(mut self, flags: MethodFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Declare a generic parameter
    #[must_use]
    pub fn generic_param(mut self, name: &str) -> Self {
        self.generic_params.push(name.to_string());
        self
    }

    /// Append a parameter
    #[must_use]
    pub fn param(mut self, name: &str, param_type: RawType) -> Self {
        self.params.push(ParamDef {
            name: name.to_string(),
            param_type,
        });
        self
    }

    /// Set the return type
    #[must_use]
    pub fn returns(mut self, return_type: RawType) -> Self {
        self.return_type = return_type;
        self
    }

    /// Attach the raw body
    #[must_use]
    pub fn with_body(mut self, body: RawBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns `true` if the method has an implicit receiver
    #[must_use]
    pub fn has_this(&self) -> bool {
        !self.flags.contains(MethodFlags::STATIC)
    }

    /// Returns `true` for `.ctor` and `.cctor` with runtime special naming
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.flags
            .contains(MethodFlags::SPECIAL_NAME | MethodFlags::RTSPECIAL_NAME)
            && (self.name == ".ctor" || self.name == ".cctor")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_requires_name_and_flags() {
        let ctor = MethodDef::new(Token::new(0x0600_0001), ".ctor").constructor();
        assert!(ctor.is_constructor());
        assert!(ctor.has_this());

        let named_only = MethodDef::new(Token::new(0x0600_0002), ".ctor");
        assert!(!named_only.is_constructor());

        let flagged_only = MethodDef::new(Token::new(0x0600_0003), "Init").constructor();
        assert!(!flagged_only.is_constructor());
    }

    #[test]
    fn generic_params_in_order() {
        let def = MethodDef::new(Token::new(0x0600_0004), "Map")
            .static_method()
            .generic_param("TIn")
            .generic_param("TOut");
        assert_eq!(def.generic_params, vec!["TIn".to_string(), "TOut".to_string()]);
        assert!(!def.has_this());
        assert_eq!(def.return_type, RawType::Primitive(PrimitiveKind::Void));
    }
}
