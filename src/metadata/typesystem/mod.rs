//! Runtime type system consumed by the translator.
//!
//! This module provides the type model the translator resolves operands against: runtime type
//! descriptors, unresolved raw type references, generic bindings with the two-level generic
//! resolver, and the [`Registry`] collaborator with its in-memory implementation [`Domain`].
//!
//! # Key Components
//!
//! - [`RuntimeType`]: A loaded type, user-defined or provided by the runtime
//! - [`RawType`]: Unresolved type reference as carried by raw operands
//! - [`GenericBindings`] / [`GenericContext`]: Generic argument binding and resolution
//! - [`Registry`]: The resolution interface used during translation
//! - [`Domain`]: Thread-safe in-memory registry with string and static-field caches
//! - [`TypeBuilder`]: Fluent construction of type definitions
//!
//! # Examples
//!
//! ```rust
//! use ilbody::metadata::{token::Token, typesystem::{Domain, PrimitiveKind, TypeBuilder}};
//!
//! let domain = Domain::new();
//! let point = TypeBuilder::new(&domain, Token::new(0x0200_0001))
//!     .value_type("Demo", "Point")
//!     .field(Token::new(0x0400_0001), "X")
//!     .field(Token::new(0x0400_0002), "Y")
//!     .build()?;
//!
//! assert_eq!(point.full_name(), "Demo.Point");
//! assert_eq!(point.instance_field_slot(Token::new(0x0400_0002)), Some(1));
//! assert!(domain.primitive(PrimitiveKind::I4).is_some());
//! # Ok::<(), ilbody::Error>(())
//! ```

mod base;
mod builder;
mod caches;
mod generics;
mod hash;
mod primitives;
mod registry;
mod resolver;

use std::{fmt, sync::Arc};

pub use base::{RawType, TypeFlavor, TypeSource};
pub use builder::TypeBuilder;
pub use caches::{StaticFieldTable, StringCache};
pub use generics::GenericBindings;
pub use hash::IdentityHash;
pub use primitives::PrimitiveKind;
pub use registry::{Domain, Registry};
pub use resolver::GenericContext;

use crate::metadata::token::Token;

/// Reference to a `RuntimeType`
pub type TypeRc = Arc<RuntimeType>;
/// A list of fields, shared between a generic definition and its instantiations
pub type FieldList = Arc<Vec<FieldDef>>;
/// Append-only list of method tokens declared by a type
pub type MethodTokenList = Arc<boxcar::Vec<Token>>;

/// A field declared by a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field token
    pub token: Token,
    /// Field name
    pub name: String,
    /// `true` for static fields
    pub is_static: bool,
}

/// A loaded runtime type.
///
/// Generic instantiations are distinct `RuntimeType`s that share their definition's field
/// and method lists and carry their own [`GenericBindings`]. Each type has an identity hash
/// that is the canonical reference used in compiled type tokens.
pub struct RuntimeType {
    /// Token (the definition's token for instantiations, zero for placeholders)
    pub token: Token,
    /// `TypeNamespace`
    pub namespace: String,
    /// `TypeName`
    pub name: String,
    /// The shape of the type
    pub flavor: TypeFlavor,
    /// User or runtime provided
    pub source: TypeSource,
    /// Declared generic parameter names, in declaration order
    pub generic_params: Vec<String>,
    /// All fields this type has
    pub fields: FieldList,
    /// All methods this type has
    pub methods: MethodTokenList,
    generic_args: GenericBindings,
    base: Option<TypeRc>,
    element: Option<TypeRc>,
    definition: Option<TypeRc>,
    identity: u64,
}

impl RuntimeType {
    /// Create a new type definition
    #[must_use]
    pub fn new(
        token: Token,
        flavor: TypeFlavor,
        namespace: String,
        name: String,
        source: TypeSource,
        generic_params: Vec<String>,
        fields: Vec<FieldDef>,
        base: Option<TypeRc>,
    ) -> Self {
        let identity = IdentityHash::new()
            .add_component("def")
            .add_component(&source)
            .add_fullname(&namespace, &name)
            .add_token(&token)
            .finalize();

        RuntimeType {
            token,
            namespace,
            name,
            flavor,
            source,
            generic_params,
            fields: Arc::new(fields),
            methods: Arc::new(boxcar::Vec::new()),
            generic_args: GenericBindings::default(),
            base,
            element: None,
            definition: None,
            identity,
        }
    }

    /// Create a built-in runtime type
    #[must_use]
    pub fn primitive(kind: PrimitiveKind) -> Self {
        RuntimeType::new(
            kind.token(),
            kind.to_flavor(),
            kind.namespace().to_string(),
            kind.name().to_string(),
            TypeSource::Runtime,
            Vec::new(),
            Vec::new(),
            None,
        )
    }

    /// Create an open generic parameter placeholder
    #[must_use]
    pub fn generic_parameter(name: &str) -> Self {
        RuntimeType {
            token: Token::new(0),
            namespace: String::new(),
            name: name.to_string(),
            flavor: TypeFlavor::GenericParameter,
            source: TypeSource::Runtime,
            generic_params: Vec::new(),
            fields: Arc::new(Vec::new()),
            methods: Arc::new(boxcar::Vec::new()),
            generic_args: GenericBindings::default(),
            base: None,
            element: None,
            definition: None,
            identity: IdentityHash::new().add_component("!").add_component(name).finalize(),
        }
    }

    /// Create an instantiation of a generic type definition.
    ///
    /// The bindings must already have been checked against the definition's arity.
    #[must_use]
    pub fn instantiate(definition: &TypeRc, args: GenericBindings) -> Self {
        let identity = IdentityHash::new()
            .add_component("inst")
            .add_identity(definition.identity)
            .add_identity(args.identity())
            .finalize();

        RuntimeType {
            token: definition.token,
            namespace: definition.namespace.clone(),
            name: definition.name.clone(),
            flavor: definition.flavor,
            source: definition.source,
            generic_params: definition.generic_params.clone(),
            fields: definition.fields.clone(),
            methods: definition.methods.clone(),
            generic_args: args,
            base: definition.base.clone(),
            element: None,
            definition: Some(definition.clone()),
            identity,
        }
    }

    /// Create a single-dimensional array of `element`
    #[must_use]
    pub fn sz_array(element: &TypeRc) -> Self {
        RuntimeType {
            token: Token::new(0),
            namespace: element.namespace.clone(),
            name: format!("{}[]", element.name),
            flavor: TypeFlavor::SzArray,
            source: element.source,
            generic_params: Vec::new(),
            fields: Arc::new(Vec::new()),
            methods: Arc::new(boxcar::Vec::new()),
            generic_args: GenericBindings::default(),
            base: None,
            element: Some(element.clone()),
            definition: None,
            identity: IdentityHash::new()
                .add_component("[]")
                .add_identity(element.identity)
                .finalize(),
        }
    }

    /// Identity hash of the type's canonical reference
    #[must_use]
    pub fn identity(&self) -> u64 {
        self.identity
    }

    /// Returns the full name (Namespace.Name) of the type, with bound generic arguments
    #[must_use]
    pub fn full_name(&self) -> String {
        if let Some(element) = &self.element {
            return format!("{}[]", element.full_name());
        }
        let mut name = if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        };
        if !self.generic_args.is_empty() {
            name.push_str(&self.generic_args.to_string());
        }
        name
    }

    /// Access the base type of this type, if it exists
    #[must_use]
    pub fn base(&self) -> Option<&TypeRc> {
        self.base.as_ref()
    }

    /// The element type of an array
    #[must_use]
    pub fn element_type(&self) -> Option<&TypeRc> {
        self.element.as_ref()
    }

    /// The generic definition this type instantiates
    #[must_use]
    pub fn definition(&self) -> Option<&TypeRc> {
        self.definition.as_ref()
    }

    /// The bound generic arguments (empty unless this is an instantiation)
    #[must_use]
    pub fn generic_arguments(&self) -> &GenericBindings {
        &self.generic_args
    }

    /// Look up a bound generic argument by parameter name
    #[must_use]
    pub fn find_generic_argument(&self, name: &str) -> Option<TypeRc> {
        self.generic_args.get(name).cloned()
    }

    /// Returns `true` for types defined by the interpreted code
    #[must_use]
    pub fn is_user_type(&self) -> bool {
        self.source == TypeSource::User
    }

    /// Returns `true` for delegate types
    #[must_use]
    pub fn is_delegate(&self) -> bool {
        self.flavor == TypeFlavor::Delegate
    }

    /// Returns `true` for open generic parameter placeholders
    #[must_use]
    pub fn is_generic_parameter(&self) -> bool {
        self.flavor == TypeFlavor::GenericParameter
    }

    /// Returns `true` for an uninstantiated generic type definition
    #[must_use]
    pub fn is_generic_definition(&self) -> bool {
        !self.generic_params.is_empty() && self.generic_args.is_empty()
    }

    /// Returns `true` for an instantiation of a generic type
    #[must_use]
    pub fn is_generic_instance(&self) -> bool {
        !self.generic_args.is_empty()
    }

    /// Returns `true` for value types
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        match self.flavor {
            TypeFlavor::Primitive(kind) => kind.is_value_type(),
            TypeFlavor::ValueType => true,
            _ => false,
        }
    }

    /// Number of instance fields, base type fields included
    #[must_use]
    pub fn instance_field_count(&self) -> u32 {
        let own = self.fields.iter().filter(|field| !field.is_static).count();
        let inherited = self.base.as_ref().map_or(0, |base| base.instance_field_count());
        inherited + u32::try_from(own).unwrap_or(u32::MAX)
    }

    /// Slot of an instance field within this type's layout.
    ///
    /// Base type fields come first, then this type's own fields in declaration order.
    #[must_use]
    pub fn instance_field_slot(&self, token: Token) -> Option<u32> {
        let inherited = self.base.as_ref().map_or(0, |base| base.instance_field_count());
        let own = self
            .fields
            .iter()
            .filter(|field| !field.is_static)
            .position(|field| field.token == token);

        match own {
            Some(position) => u32::try_from(position).ok().map(|p| inherited + p),
            None => self
                .base
                .as_ref()
                .and_then(|base| base.instance_field_slot(token)),
        }
    }

    /// Index of a static field among this type's own static fields
    #[must_use]
    pub fn static_field_index(&self, token: Token) -> Option<u32> {
        self.fields
            .iter()
            .filter(|field| field.is_static)
            .position(|field| field.token == token)
            .and_then(|position| u32::try_from(position).ok())
    }
}

impl fmt::Debug for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeType")
            .field("token", &self.token)
            .field("name", &self.full_name())
            .field("flavor", &self.flavor)
            .field("source", &self.source)
            .field("identity", &format_args!("0x{:016X}", self.identity))
            .finish_non_exhaustive()
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}
