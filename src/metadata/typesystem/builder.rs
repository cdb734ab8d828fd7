//! Builder for type definitions.
//!
//! This module provides the [`TypeBuilder`] struct, which offers a fluent API for defining
//! classes, value types, interfaces and delegates with their generic parameters, base type and
//! fields, and registering them in a [`Domain`].
//!
//! # Example
//!
//! ```rust
//! use ilbody::metadata::{token::Token, typesystem::{Domain, TypeBuilder}};
//!
//! let domain = Domain::new();
//! let list = TypeBuilder::new(&domain, Token::new(0x0200_0001))
//!     .class("Demo", "List`1")
//!     .generic_param("T")
//!     .field(Token::new(0x0400_0001), "items")
//!     .static_field(Token::new(0x0400_0002), "Empty")
//!     .build()?;
//!
//! assert!(list.is_generic_definition());
//! assert_eq!(list.instance_field_count(), 1);
//! # Ok::<(), ilbody::Error>(())
//! ```

use crate::{
    metadata::{
        token::Token,
        typesystem::{Domain, FieldDef, RuntimeType, TypeFlavor, TypeRc, TypeSource},
    },
    Result,
};

/// Provides a fluent API for building type definitions
pub struct TypeBuilder<'a> {
    /// Domain the type is registered in
    domain: &'a Domain,
    token: Token,
    flavor: TypeFlavor,
    namespace: String,
    name: String,
    source: TypeSource,
    generic_params: Vec<String>,
    fields: Vec<FieldDef>,
    base: Option<TypeRc>,
}

impl<'a> TypeBuilder<'a> {
    /// Create a new builder for a user class with the given token
    ///
    /// ## Arguments
    /// * 'domain' - The domain to register the type in
    /// * 'token' - The `TypeDef` token of the new type
    #[must_use]
    pub fn new(domain: &'a Domain, token: Token) -> Self {
        TypeBuilder {
            domain,
            token,
            flavor: TypeFlavor::Class,
            namespace: String::new(),
            name: String::new(),
            source: TypeSource::User,
            generic_params: Vec::new(),
            fields: Vec::new(),
            base: None,
        }
    }

    /// Define a class
    #[must_use]
    pub fn class(self, namespace: &str, name: &str) -> Self {
        self.named(TypeFlavor::Class, namespace, name)
    }

    /// Define a value type
    #[must_use]
    pub fn value_type(self, namespace: &str, name: &str) -> Self {
        self.named(TypeFlavor::ValueType, namespace, name)
    }

    /// Define an interface
    #[must_use]
    pub fn interface(self, namespace: &str, name: &str) -> Self {
        self.named(TypeFlavor::Interface, namespace, name)
    }

    /// Define a delegate type
    #[must_use]
    pub fn delegate(self, namespace: &str, name: &str) -> Self {
        self.named(TypeFlavor::Delegate, namespace, name)
    }

    /// Mark the type as provided by the runtime instead of the interpreted code
    #[must_use]
    pub fn runtime(mut self) -> Self {
        self.source = TypeSource::Runtime;
        self
    }

    /// Declare a generic parameter
    #[must_use]
    pub fn generic_param(mut self, name: &str) -> Self {
        self.generic_params.push(name.to_string());
        self
    }

    /// Set the base type
    #[must_use]
    pub fn extends(mut self, base: TypeRc) -> Self {
        self.base = Some(base);
        self
    }

    /// Append an instance field
    #[must_use]
    pub fn field(mut self, token: Token, name: &str) -> Self {
        self.fields.push(FieldDef {
            token,
            name: name.to_string(),
            is_static: false,
        });
        self
    }

    /// Append a static field
    #[must_use]
    pub fn static_field(mut self, token: Token, name: &str) -> Self {
        self.fields.push(FieldDef {
            token,
            name: name.to_string(),
            is_static: true,
        });
        self
    }

    /// Finalize the type and register it in the domain
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeInsert`] if the token is already registered.
    pub fn build(self) -> Result<TypeRc> {
        let new_type = RuntimeType::new(
            self.token,
            self.flavor,
            self.namespace,
            self.name,
            self.source,
            self.generic_params,
            self.fields,
            self.base,
        );

        self.domain.insert_type(new_type)
    }

    fn named(mut self, flavor: TypeFlavor, namespace: &str, name: &str) -> Self {
        self.flavor = flavor;
        self.namespace = namespace.to_string();
        self.name = name.to_string();
        self
    }
}
