//! Two-level generic parameter resolution.
//!
//! A [`GenericContext`] describes where a type reference is being resolved: the declaring type
//! of the method being translated (possibly a generic instantiation) and the method's own
//! generic parameters and bindings. Parameter names are looked up in the declaring type's
//! bindings first and in the method's bindings second.
//!
//! When neither level binds a name, the outcome depends on who declares it. A name declared by
//! a level that is still unbound (an uninstantiated generic type or method definition) resolves
//! to an open placeholder; the shape of a definition is legitimately open. A name that no level
//! declares fails with [`Error::UnresolvedGenericParameter`].

use std::sync::Arc;

use crate::{
    metadata::typesystem::{GenericBindings, RawType, Registry, RuntimeType, TypeRc},
    Error, ReferenceKind, Result,
};

/// The generic scope a type reference is resolved in.
#[derive(Clone, Copy)]
pub struct GenericContext<'a> {
    declaring_type: &'a TypeRc,
    method_name: &'a str,
    method_params: &'a [String],
    method_args: Option<&'a GenericBindings>,
}

impl<'a> GenericContext<'a> {
    /// A context with only type-level generics
    #[must_use]
    pub fn for_type(declaring_type: &'a TypeRc) -> Self {
        GenericContext {
            declaring_type,
            method_name: "",
            method_params: &[],
            method_args: None,
        }
    }

    /// A context for a method; `method_args` is `None` on a generic method definition
    #[must_use]
    pub fn for_method(
        declaring_type: &'a TypeRc,
        method_name: &'a str,
        method_params: &'a [String],
        method_args: Option<&'a GenericBindings>,
    ) -> Self {
        GenericContext {
            declaring_type,
            method_name,
            method_params,
            method_args,
        }
    }

    /// The declaring type of the scope
    #[must_use]
    pub fn declaring_type(&self) -> &'a TypeRc {
        self.declaring_type
    }

    /// The method-level bindings, present only on instantiated method descriptors
    #[must_use]
    pub fn method_arguments(&self) -> Option<&'a GenericBindings> {
        self.method_args
    }

    /// Look up a bound generic argument: declaring type first, then the method
    #[must_use]
    pub fn find_generic_argument(&self, name: &str) -> Option<TypeRc> {
        self.declaring_type
            .find_generic_argument(name)
            .or_else(|| self.method_args.and_then(|args| args.get(name).cloned()))
    }

    /// Returns `true` if `name` is declared by a level that has no bindings yet
    #[must_use]
    pub fn is_open_parameter(&self, name: &str) -> bool {
        let method_open =
            self.method_args.is_none() && self.method_params.iter().any(|param| param == name);
        let type_open = self.declaring_type.is_generic_definition()
            && self.declaring_type.generic_params.iter().any(|param| param == name);

        method_open || type_open
    }

    /// Resolve a generic parameter name to a concrete type or an open placeholder.
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedGenericParameter`] if no level binds or declares `name`.
    pub fn resolve(&self, name: &str) -> Result<TypeRc> {
        if let Some(ty) = self.find_generic_argument(name) {
            return Ok(ty);
        }

        if self.is_open_parameter(name) {
            return Ok(Arc::new(RuntimeType::generic_parameter(name)));
        }

        Err(Error::UnresolvedGenericParameter {
            name: name.to_string(),
            method: self.owner(),
        })
    }

    /// Resolve a raw type through `registry`, falling back to generic resolution for a bare
    /// generic parameter.
    ///
    /// # Errors
    /// Returns [`Error::UnresolvedReference`] if the registry does not know the type, or any
    /// error the registry or generic resolution raise.
    pub fn resolve_type(&self, registry: &dyn Registry, raw: &RawType) -> Result<TypeRc> {
        if let Some(ty) = registry.resolve_type(raw, self)? {
            return Ok(ty);
        }

        match raw {
            RawType::GenericParameter(name) => self.resolve(name),
            _ => Err(Error::UnresolvedReference {
                kind: ReferenceKind::Type,
                reference: raw.to_string(),
            }),
        }
    }

    fn owner(&self) -> String {
        if self.method_name.is_empty() {
            self.declaring_type.full_name()
        } else {
            format!("{}.{}", self.declaring_type.full_name(), self.method_name)
        }
    }
}
