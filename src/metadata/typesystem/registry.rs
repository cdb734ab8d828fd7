//! The resolution interface used during translation and its in-memory implementation.
//!
//! The translator never looks types, methods or fields up itself: every operand is resolved
//! through a [`Registry`], passed explicitly to each translating call. [`Domain`] is the
//! registry this crate ships: a thread-safe store of type and method definitions that also owns
//! the process-wide string literal cache and static field address space.
//!
//! # Registry Architecture
//!
//! - **Token-based lookup**: Primary storage of types and method definitions in `SkipMap`s
//! - **Name-based lookup**: Secondary full-name index in a `DashMap`
//! - **Instantiation caches**: Generic type instances, arrays, method descriptors and generic
//!   method instances, keyed by identity hash so the same instantiation is built once
//!
//! # Thread Safety
//!
//! All operations take `&self`. Cached values are constructed outside of any map lock and
//! published with insert-if-absent, so concurrent requests for the same instantiation observe
//! one shared result.
//!
//! # Examples
//!
//! ```rust
//! use ilbody::prelude::*;
//!
//! let domain = Domain::new();
//! let list = TypeBuilder::new(&domain, Token::new(0x0200_0001))
//!     .class("Demo", "List`1")
//!     .generic_param("T")
//!     .build()?;
//!
//! let int = domain.primitive(PrimitiveKind::I4).unwrap();
//! let a = domain.instantiate_type(&list, &[int.clone()])?;
//! let b = domain.instantiate_type(&list, &[int])?;
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! assert_eq!(a.full_name(), "Demo.List`1<System.Int32>");
//! # Ok::<(), ilbody::Error>(())
//! ```

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use rayon::prelude::*;
use strum::IntoEnumIterator;

use crate::{
    assembly::{FieldRef, MethodRef},
    metadata::{
        config::DomainConfig,
        method::{Method, MethodDef, MethodRc},
        token::{TableId, Token},
        typesystem::{
            GenericBindings, GenericContext, IdentityHash, PrimitiveKind, RawType, RuntimeType,
            StaticFieldTable, StringCache, TypeRc,
        },
    },
    Error, ReferenceKind, Result,
};

/// Resolves raw metadata references for the translator.
///
/// Every method receives the [`GenericContext`] of the method being translated. `Ok(None)`
/// means the reference is unknown to the registry; the caller turns that into
/// [`Error::UnresolvedReference`]. `Err` is reserved for failures while resolving a nested
/// part of the reference, such as an unbound generic argument.
///
/// A top-level [`RawType::GenericParameter`] that the context does not bind should resolve to
/// `Ok(None)`; the generic resolver then decides between an open placeholder and
/// [`Error::UnresolvedGenericParameter`].
pub trait Registry: Send + Sync {
    /// Resolve a raw type reference
    ///
    /// # Errors
    /// Returns an error if a nested part of the reference cannot be resolved.
    fn resolve_type(&self, raw: &RawType, context: &GenericContext<'_>)
        -> Result<Option<TypeRc>>;

    /// Resolve a raw method reference to a descriptor, instantiating generic methods
    ///
    /// # Errors
    /// Returns an error if a nested part of the reference cannot be resolved.
    fn resolve_method(
        &self,
        raw: &MethodRef,
        context: &GenericContext<'_>,
    ) -> Result<Option<MethodRc>>;

    /// Slot of an instance field within its declaring type's layout
    ///
    /// # Errors
    /// Returns an error if the declaring type cannot be resolved.
    fn instance_field_slot(
        &self,
        raw: &FieldRef,
        context: &GenericContext<'_>,
    ) -> Result<Option<u32>>;

    /// Wide process-wide slot of a static field
    ///
    /// # Errors
    /// Returns an error if the declaring type cannot be resolved.
    fn static_field_slot(&self, raw: &FieldRef, context: &GenericContext<'_>)
        -> Result<Option<u64>>;

    /// Register a string literal and return its hash; registering twice is a no-op
    fn intern_string(&self, text: &str) -> u64;
}

/// Thread-safe in-memory type and method registry.
pub struct Domain {
    config: DomainConfig,
    /// Primary type storage, by token
    types: SkipMap<Token, TypeRc>,
    /// `Namespace.Name` index
    types_by_fullname: DashMap<String, Token>,
    /// Generic type instances, by identity
    instances: DashMap<u64, TypeRc>,
    /// Array types, by element identity
    arrays: DashMap<u64, TypeRc>,
    /// Method definitions with their declaring type token
    method_defs: SkipMap<Token, (Token, Arc<MethodDef>)>,
    /// Method descriptors, by declaring type identity and method token
    methods: DashMap<(u64, Token), MethodRc>,
    /// Generic method instances, by definition and argument identities
    method_instances: DashMap<u64, MethodRc>,
    strings: StringCache,
    statics: StaticFieldTable,
    next_method_row: AtomicU32,
}

impl Domain {
    /// Create a domain with the default configuration and the primitive types registered
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DomainConfig::default())
    }

    /// Create a domain with the given configuration and the primitive types registered
    #[must_use]
    pub fn with_config(config: DomainConfig) -> Self {
        let domain = Domain {
            config,
            types: SkipMap::new(),
            types_by_fullname: DashMap::new(),
            instances: DashMap::new(),
            arrays: DashMap::new(),
            method_defs: SkipMap::new(),
            methods: DashMap::with_capacity(config.method_cache_capacity),
            method_instances: DashMap::with_capacity(config.method_cache_capacity),
            strings: StringCache::with_capacity(config.string_cache_capacity),
            statics: StaticFieldTable::new(),
            next_method_row: AtomicU32::new(1),
        };

        for kind in PrimitiveKind::iter() {
            domain.register(Arc::new(RuntimeType::primitive(kind)));
        }

        domain
    }

    /// The configuration of this domain
    #[must_use]
    pub fn config(&self) -> &DomainConfig {
        &self.config
    }

    /// A built-in runtime type
    #[must_use]
    pub fn primitive(&self, kind: PrimitiveKind) -> Option<TypeRc> {
        self.get_type(kind.token())
    }

    /// Look up a type definition by token
    #[must_use]
    pub fn get_type(&self, token: Token) -> Option<TypeRc> {
        self.types.get(&token).map(|entry| entry.value().clone())
    }

    /// Look up a type definition by `Namespace.Name`
    #[must_use]
    pub fn get_by_fullname(&self, fullname: &str) -> Option<TypeRc> {
        let token = *self.types_by_fullname.get(fullname)?;
        self.get_type(token)
    }

    /// Number of registered type definitions, primitives included
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Register a type definition
    ///
    /// # Errors
    /// Returns [`Error::TypeInsert`] if a type with the same token is already registered.
    pub fn insert_type(&self, new_type: RuntimeType) -> Result<TypeRc> {
        let token = new_type.token;
        let type_rc = Arc::new(new_type);

        let entry = self.types.get_or_insert(token, type_rc.clone());
        if !Arc::ptr_eq(entry.value(), &type_rc) {
            return Err(Error::TypeInsert(token));
        }

        self.types_by_fullname.insert(type_rc.full_name(), token);
        log::trace!("Registered type {} as {}", type_rc.full_name(), token);
        Ok(type_rc)
    }

    /// Define a method on a registered type
    ///
    /// # Errors
    /// Returns [`Error::TypeNotFound`] if the declaring type is unknown, or
    /// [`Error::TypeInsert`] if a method with the same token is already defined.
    pub fn define_method(&self, type_token: Token, def: MethodDef) -> Result<Arc<MethodDef>> {
        let owner = self
            .get_type(type_token)
            .ok_or(Error::TypeNotFound(type_token))?;

        let token = def.token;
        let def = Arc::new(def);
        let entry = self
            .method_defs
            .get_or_insert(token, (type_token, def.clone()));
        if !Arc::ptr_eq(&entry.value().1, &def) {
            return Err(Error::TypeInsert(token));
        }

        owner.methods.push(token);
        log::trace!("Defined method {}.{} as {}", owner.full_name(), def.name, token);
        Ok(def)
    }

    /// Reserve a `MethodDef` token not yet used by any definition.
    ///
    /// Allows bodies to reference methods (including themselves) before they are defined.
    pub fn reserve_method_token(&self) -> Token {
        loop {
            let row = self.next_method_row.fetch_add(1, Ordering::Relaxed);
            let token = Token::from_parts(TableId::MethodDef, row);
            if !self.method_defs.contains_key(&token) {
                return token;
            }
        }
    }

    /// The descriptor of a method on a type definition
    ///
    /// # Errors
    /// Returns [`Error::TypeNotFound`] for an unknown type, [`Error::UnresolvedReference`] if
    /// the method is not declared on the type or its bases, or an error resolving its return
    /// type.
    pub fn method(&self, type_token: Token, method_token: Token) -> Result<MethodRc> {
        let owner = self
            .get_type(type_token)
            .ok_or(Error::TypeNotFound(type_token))?;

        self.method_on(&owner, method_token)?
            .ok_or_else(|| Error::UnresolvedReference {
                kind: ReferenceKind::Method,
                reference: format!("{}::{}", owner.full_name(), method_token),
            })
    }

    /// The descriptor of a method as seen on `owner`, which may be a generic type instance.
    ///
    /// Methods declared on a base type are found through the base chain. Returns `Ok(None)` if
    /// neither `owner` nor its bases declare the method.
    ///
    /// # Errors
    /// Returns an error resolving the method's return type.
    pub fn method_on(&self, owner: &TypeRc, method_token: Token) -> Result<Option<MethodRc>> {
        let Some(entry) = self.method_defs.get(&method_token) else {
            return Ok(None);
        };
        let (declaring_token, def) = entry.value();

        let mut declaring = Some(owner);
        while let Some(candidate) = declaring {
            if candidate.token == *declaring_token {
                break;
            }
            declaring = candidate.base();
        }
        let Some(declaring) = declaring else {
            return Ok(None);
        };

        let key = (declaring.identity(), method_token);
        if let Some(existing) = self.methods.get(&key) {
            return Ok(Some(existing.clone()));
        }

        let method = Arc::new(Method::new(def.clone(), declaring.clone(), self)?);
        Ok(Some(self.methods.entry(key).or_insert(method).clone()))
    }

    /// Instantiate a generic type definition; the same instantiation yields the same type.
    ///
    /// Instantiating an instance rebinds its definition.
    ///
    /// # Errors
    /// Returns [`Error::ArityMismatch`] if `args` does not match the declared parameters.
    pub fn instantiate_type(&self, definition: &TypeRc, args: &[TypeRc]) -> Result<TypeRc> {
        let definition = definition.definition().unwrap_or(definition);
        let bindings =
            GenericBindings::bind(&definition.generic_params, args, &definition.full_name())?;

        let key = IdentityHash::new()
            .add_component("inst")
            .add_identity(definition.identity())
            .add_identity(bindings.identity())
            .finalize();
        if let Some(existing) = self.instances.get(&key) {
            return Ok(existing.clone());
        }

        let instance = Arc::new(RuntimeType::instantiate(definition, bindings));
        log::debug!("Instantiated generic type {}", instance.full_name());
        Ok(self.instances.entry(key).or_insert(instance).clone())
    }

    /// Instantiate a generic method; the same instantiation yields the same descriptor.
    ///
    /// # Errors
    /// Returns [`Error::ArityMismatch`] if `args` does not match the declared parameters, or an
    /// error resolving the instantiated return type.
    pub fn instantiate_method(&self, method: &MethodRc, args: &[TypeRc]) -> Result<MethodRc> {
        let root = method.definition().unwrap_or(method);

        let key = args
            .iter()
            .fold(
                IdentityHash::new()
                    .add_component("method-inst")
                    .add_identity(root.identity()),
                |hash, arg| hash.add_identity(arg.identity()),
            )
            .finalize();
        if let Some(existing) = self.method_instances.get(&key) {
            return Ok(existing.clone());
        }

        let instance = Arc::new(root.make_generic(self, args)?);
        Ok(self.method_instances.entry(key).or_insert(instance).clone())
    }

    /// The single-dimensional array type of `element`
    #[must_use]
    pub fn array_of(&self, element: &TypeRc) -> TypeRc {
        if let Some(existing) = self.arrays.get(&element.identity()) {
            return existing.clone();
        }

        let array = Arc::new(RuntimeType::sz_array(element));
        self.arrays
            .entry(element.identity())
            .or_insert(array)
            .clone()
    }

    /// The string literal cache
    #[must_use]
    pub fn strings(&self) -> &StringCache {
        &self.strings
    }

    /// The static field address space
    #[must_use]
    pub fn statics(&self) -> &StaticFieldTable {
        &self.statics
    }

    /// Look up a type for execution, translating all of its methods if the configuration
    /// requests compilation on load.
    ///
    /// # Errors
    /// Returns [`Error::TypeNotFound`] for an unknown type, or the first translation failure.
    pub fn load_type(&self, token: Token) -> Result<TypeRc> {
        let loaded = self.get_type(token).ok_or(Error::TypeNotFound(token))?;
        if self.config.compile_on_load {
            self.compile_type(&loaded)?;
        }
        Ok(loaded)
    }

    /// Translate every method body declared on `owner`, returning the number of methods
    ///
    /// # Errors
    /// Returns the first translation failure.
    pub fn compile_type(&self, owner: &TypeRc) -> Result<usize> {
        let mut methods = Vec::with_capacity(owner.methods.count());
        for (_, token) in owner.methods.iter() {
            if let Some(method) = self.method_on(owner, *token)? {
                methods.push(method);
            }
        }

        if self.config.parallel_compile {
            methods
                .par_iter()
                .try_for_each(|method| method.compiled(self).map(|_| ()))?;
        } else {
            for method in &methods {
                method.compiled(self)?;
            }
        }

        Ok(methods.len())
    }

    /// Translate every method of every user type, returning the number of methods
    ///
    /// # Errors
    /// Returns the first translation failure.
    pub fn compile_all(&self) -> Result<usize> {
        let user_types: Vec<TypeRc> = self
            .types
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|ty| ty.is_user_type())
            .collect();

        let counts = if self.config.parallel_compile {
            user_types
                .par_iter()
                .map(|ty| self.compile_type(ty))
                .collect::<Result<Vec<_>>>()?
        } else {
            user_types
                .iter()
                .map(|ty| self.compile_type(ty))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(counts.into_iter().sum())
    }

    fn register(&self, type_rc: TypeRc) {
        self.types_by_fullname
            .insert(type_rc.full_name(), type_rc.token);
        self.types.insert(type_rc.token, type_rc);
    }

    /// Resolve a raw type; a top-level generic parameter unbound by the context is unknown
    fn lookup_type(&self, raw: &RawType, context: &GenericContext<'_>) -> Result<Option<TypeRc>> {
        match raw {
            RawType::Primitive(kind) => Ok(self.primitive(*kind)),
            RawType::Named(token) => Ok(self.get_type(*token)),
            RawType::GenericParameter(name) => Ok(context.find_generic_argument(name)),
            RawType::SzArray(element) => Ok(self
                .lookup_nested(element, context)?
                .map(|element| self.array_of(&element))),
            RawType::GenericInstance { definition, args } => {
                let Some(definition) = self.get_type(*definition) else {
                    return Ok(None);
                };

                let mut resolved = Vec::with_capacity(args.len());
                for arg in args {
                    match self.lookup_nested(arg, context)? {
                        Some(ty) => resolved.push(ty),
                        None => return Ok(None),
                    }
                }

                self.instantiate_type(&definition, &resolved).map(Some)
            }
        }
    }

    /// Resolve a raw type nested in another reference; generic parameters must resolve
    fn lookup_nested(&self, raw: &RawType, context: &GenericContext<'_>) -> Result<Option<TypeRc>> {
        match raw {
            RawType::GenericParameter(name) => context.resolve(name).map(Some),
            _ => self.lookup_type(raw, context),
        }
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry for Domain {
    fn resolve_type(
        &self,
        raw: &RawType,
        context: &GenericContext<'_>,
    ) -> Result<Option<TypeRc>> {
        self.lookup_type(raw, context)
    }

    fn resolve_method(
        &self,
        raw: &MethodRef,
        context: &GenericContext<'_>,
    ) -> Result<Option<MethodRc>> {
        let owner = match &raw.parent {
            Some(parent) => match self.lookup_nested(parent, context)? {
                Some(owner) => owner,
                None => return Ok(None),
            },
            None => context.declaring_type().clone(),
        };

        let Some(method) = self.method_on(&owner, raw.token)? else {
            return Ok(None);
        };
        if raw.generic_args.is_empty() {
            return Ok(Some(method));
        }

        let mut args = Vec::with_capacity(raw.generic_args.len());
        for arg in &raw.generic_args {
            match self.lookup_nested(arg, context)? {
                Some(ty) => args.push(ty),
                None => return Ok(None),
            }
        }

        self.instantiate_method(&method, &args).map(Some)
    }

    fn instance_field_slot(
        &self,
        raw: &FieldRef,
        context: &GenericContext<'_>,
    ) -> Result<Option<u32>> {
        Ok(self
            .lookup_nested(&raw.parent, context)?
            .and_then(|owner| owner.instance_field_slot(raw.token)))
    }

    fn static_field_slot(
        &self,
        raw: &FieldRef,
        context: &GenericContext<'_>,
    ) -> Result<Option<u64>> {
        let Some(owner) = self.lookup_nested(&raw.parent, context)? else {
            return Ok(None);
        };

        Ok(owner
            .static_field_index(raw.token)
            .map(|index| self.statics.slot(&owner, index)))
    }

    fn intern_string(&self, text: &str) -> u64 {
        self.strings.intern(text)
    }
}
