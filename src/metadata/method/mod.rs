//! Method descriptors and their lazily translated bodies.
//!
//! A [`Method`] is created by the registry when a method is first referenced, and once more per
//! generic instantiation requested through [`Method::make_generic`]. Cheap metadata (name,
//! declaring type, receiver, return type) is available immediately; the parameter types and the
//! compiled body are computed on first access and memoized for the descriptor's lifetime.
//!
//! # Key Components
//!
//! - [`Method`] / [`MethodRc`]: The method descriptor
//! - [`MethodDef`]: The immutable definition shared by every descriptor of a method
//! - [`RawBody`] / [`BodyBuilder`]: Translator input and its label-based assembler
//! - [`ExceptionRegion`]: Index-bounded try/handler ranges of a compiled body
//!
//! # Thread Safety
//!
//! Descriptors are `Send + Sync`. Lazy artifacts are published through [`OnceLock`]: the
//! computation runs without holding a lock and the first result published wins, so concurrent
//! first accesses may translate twice but never observe a partial result.

mod body;
mod exceptions;
mod types;

pub use body::{BodyBuilder, RawBody};
pub use exceptions::{ExceptionHandlerFlags, ExceptionRegion, HandlerKind, RawExceptionHandler};
pub use types::{MethodDef, MethodFlags, ParamDef};

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use crate::{
    assembly::{Instruction, JumpTableKey},
    compiler::{self, CompiledBody},
    metadata::{
        token::Token,
        typesystem::{GenericBindings, GenericContext, IdentityHash, Registry, TypeRc},
    },
    Result,
};

/// Reference to a `Method`
pub type MethodRc = Arc<Method>;

/// A method descriptor: one per declared method, or per generic instantiation of a method.
///
/// # Examples
///
/// ```rust
/// use ilbody::prelude::*;
///
/// let domain = Domain::new();
/// let owner = TypeBuilder::new(&domain, Token::new(0x0200_0001))
///     .class("Demo", "Calc")
///     .build()?;
///
/// let mut body = BodyBuilder::new();
/// body.ldarg(0)?;
/// body.ret()?;
/// let def = MethodDef::new(Token::new(0x0600_0001), "Echo")
///     .param("value", RawType::Primitive(PrimitiveKind::I4))
///     .returns(RawType::Primitive(PrimitiveKind::I4))
///     .with_body(body.finalize()?);
/// domain.define_method(owner.token, def)?;
///
/// let method = domain.method(owner.token, Token::new(0x0600_0001))?;
/// let code = method.compiled_body(&domain)?;
/// assert_eq!(code[0].slot(), Some(1));
/// assert_eq!(method.to_string(), "Demo.Calc.Echo(System.Int32 value)");
/// # Ok::<(), ilbody::Error>(())
/// ```
pub struct Method {
    def: Arc<MethodDef>,
    declaring_type: TypeRc,
    generic_args: Option<GenericBindings>,
    definition: Option<MethodRc>,
    return_type: TypeRc,
    parameters: OnceLock<Vec<TypeRc>>,
    compiled: OnceLock<CompiledBody>,
    identity: u64,
}

impl Method {
    /// Create the descriptor of a method definition on `declaring_type`.
    ///
    /// The return type is resolved eagerly; a generic method definition resolves its own open
    /// parameters to placeholders.
    ///
    /// # Errors
    /// Returns an error if the return type cannot be resolved.
    pub fn new(
        def: Arc<MethodDef>,
        declaring_type: TypeRc,
        registry: &dyn Registry,
    ) -> Result<Self> {
        let return_type = GenericContext::for_method(
            &declaring_type,
            &def.name,
            &def.generic_params,
            None,
        )
        .resolve_type(registry, &def.return_type)?;

        let identity = IdentityHash::new()
            .add_component("method")
            .add_identity(declaring_type.identity())
            .add_token(&def.token)
            .finalize();

        Ok(Method {
            def,
            declaring_type,
            generic_args: None,
            definition: None,
            return_type,
            parameters: OnceLock::new(),
            compiled: OnceLock::new(),
            identity,
        })
    }

    /// Create a new descriptor binding this method's generic parameters to `args`.
    ///
    /// The result shares the definition and declaring type but never the compiled artifacts;
    /// its body is translated independently on first access. Instantiating an instantiation
    /// rebinds the original definition.
    ///
    /// # Errors
    /// Returns [`crate::Error::ArityMismatch`] if `args` does not match the declared generic
    /// parameter count, or an error resolving the instantiated return type.
    pub fn make_generic(self: &Arc<Self>, registry: &dyn Registry, args: &[TypeRc]) -> Result<Self> {
        let root = match &self.definition {
            Some(definition) => definition.clone(),
            None => self.clone(),
        };

        let bindings = GenericBindings::bind(
            &root.def.generic_params,
            args,
            &format!("{}.{}", root.declaring_type.full_name(), root.def.name),
        )?;

        let return_type = GenericContext::for_method(
            &root.declaring_type,
            &root.def.name,
            &root.def.generic_params,
            Some(&bindings),
        )
        .resolve_type(registry, &root.def.return_type)?;

        let identity = IdentityHash::new()
            .add_component("method-inst")
            .add_identity(root.identity)
            .add_identity(bindings.identity())
            .finalize();

        log::debug!(
            "Instantiated generic method {}.{}{}",
            root.declaring_type.full_name(),
            root.def.name,
            bindings
        );

        Ok(Method {
            def: root.def.clone(),
            declaring_type: root.declaring_type.clone(),
            generic_args: Some(bindings),
            definition: Some(root),
            return_type,
            parameters: OnceLock::new(),
            compiled: OnceLock::new(),
            identity,
        })
    }

    /// Method token
    #[must_use]
    pub fn token(&self) -> Token {
        self.def.token
    }

    /// Method name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// The shared method definition
    #[must_use]
    pub fn def(&self) -> &MethodDef {
        &self.def
    }

    /// The declaring type (an instantiation when declared on a generic type instance)
    #[must_use]
    pub fn declaring_type(&self) -> &TypeRc {
        &self.declaring_type
    }

    /// The generic method definition this descriptor instantiates
    #[must_use]
    pub fn definition(&self) -> Option<&MethodRc> {
        self.definition.as_ref()
    }

    /// The method-level generic bindings, present only on instantiated descriptors
    #[must_use]
    pub fn generic_arguments(&self) -> Option<&GenericBindings> {
        self.generic_args.as_ref()
    }

    /// The generic scope operands of this method are resolved in
    #[must_use]
    pub fn generic_context(&self) -> GenericContext<'_> {
        GenericContext::for_method(
            &self.declaring_type,
            &self.def.name,
            &self.def.generic_params,
            self.generic_args.as_ref(),
        )
    }

    /// Identity hash; distinct per declaring type instantiation and per method binding
    #[must_use]
    pub fn identity(&self) -> u64 {
        self.identity
    }

    /// The resolved return type
    #[must_use]
    pub fn return_type(&self) -> &TypeRc {
        &self.return_type
    }

    /// The raw body, if the method has one
    #[must_use]
    pub fn raw_body(&self) -> Option<&RawBody> {
        self.def.body.as_ref()
    }

    /// Returns `true` if argument slot 0 is the implicit receiver
    #[must_use]
    pub fn has_receiver(&self) -> bool {
        self.def.has_this()
    }

    /// Returns `true` for static methods
    #[must_use]
    pub fn is_static(&self) -> bool {
        !self.def.has_this()
    }

    /// Returns `true` for `.ctor` and `.cctor`
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.def.is_constructor()
    }

    /// Returns `true` for the `Invoke` entry point of a delegate type
    #[must_use]
    pub fn is_delegate_invoke(&self) -> bool {
        self.declaring_type.is_delegate() && self.def.name == "Invoke"
    }

    /// Number of declared generic parameters
    #[must_use]
    pub fn generic_parameter_count(&self) -> usize {
        self.def.generic_params.len()
    }

    /// Returns `true` for a bound instantiation of a generic method
    #[must_use]
    pub fn is_generic_instance(&self) -> bool {
        self.generic_args.is_some()
    }

    /// Returns `true` for an uninstantiated generic method definition
    #[must_use]
    pub fn is_generic_definition(&self) -> bool {
        !self.def.generic_params.is_empty() && self.generic_args.is_none()
    }

    /// Number of declared locals
    #[must_use]
    pub fn local_variable_count(&self) -> u16 {
        self.def.body.as_ref().map_or(0, |body| body.local_count)
    }

    /// Number of declared parameters, receiver excluded
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.def.params.len()
    }

    /// The resolved parameter types, receiver excluded.
    ///
    /// # Errors
    /// Returns an error if a parameter type cannot be resolved, including
    /// [`crate::Error::UnresolvedGenericParameter`] for a name nothing declares.
    pub fn parameters(&self, registry: &dyn Registry) -> Result<&[TypeRc]> {
        if let Some(parameters) = self.parameters.get() {
            return Ok(parameters);
        }

        let context = self.generic_context();
        let resolved = self
            .def
            .params
            .iter()
            .map(|param| context.resolve_type(registry, &param.param_type))
            .collect::<Result<Vec<_>>>()?;

        Ok(self.parameters.get_or_init(|| resolved))
    }

    /// The compiled instruction array, translated on first access.
    ///
    /// A method without a body compiles to an empty array.
    ///
    /// # Errors
    /// Returns the translation failure; nothing is cached on failure.
    pub fn compiled_body(&self, registry: &dyn Registry) -> Result<&[Instruction]> {
        Ok(&self.compiled(registry)?.instructions)
    }

    /// The exception regions of the compiled body, translating it if necessary.
    ///
    /// # Errors
    /// Returns the translation failure.
    pub fn exception_regions(&self, registry: &dyn Registry) -> Result<&[ExceptionRegion]> {
        Ok(&self.compiled(registry)?.exception_regions)
    }

    /// The jump table of a `switch` site; `None` before compilation or for an unknown key
    #[must_use]
    pub fn jump_table(&self, key: JumpTableKey) -> Option<Arc<[u32]>> {
        self.compiled.get().and_then(|body| body.jump_tables.get(key))
    }

    /// The full set of compiled artifacts, translating on first access.
    ///
    /// # Errors
    /// Returns the translation failure.
    pub fn compiled(&self, registry: &dyn Registry) -> Result<&CompiledBody> {
        if let Some(compiled) = self.compiled.get() {
            return Ok(compiled);
        }

        let compiled = compiler::compile(self, registry)?;
        Ok(self.compiled.get_or_init(|| compiled))
    }

    /// Returns `true` once the body has been translated
    #[must_use]
    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("token", &self.def.token)
            .field("name", &self.def.name)
            .field("declaring_type", &self.declaring_type.full_name())
            .field("generic_args", &self.generic_args)
            .field("compiled", &self.is_compiled())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type.full_name(), self.def.name)?;
        if let Some(args) = &self.generic_args {
            write!(f, "{args}")?;
        }

        f.write_str("(")?;
        let resolved = self.parameters.get();
        for (i, param) in self.def.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match resolved.and_then(|types| types.get(i)) {
                Some(ty) => write!(f, "{} {}", ty.full_name(), param.name)?,
                None => write!(f, "{} {}", param.param_type, param.name)?,
            }
        }
        f.write_str(")")
    }
}
