use std::fmt;

use crate::metadata::{
    token::Token,
    typesystem::{IdentityHash, PrimitiveKind},
};

/// A type reference as it appears in a raw operand, signature or handler clause.
///
/// Raw types are unresolved: they name a type by token or by shape and are turned into a
/// [`crate::metadata::typesystem::TypeRc`] by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawType {
    /// A built-in runtime type
    Primitive(PrimitiveKind),
    /// A type definition or reference, by token
    Named(Token),
    /// A generic type instantiated with concrete (or still open) arguments
    GenericInstance {
        /// The generic type definition
        definition: Token,
        /// The type arguments, in declaration order
        args: Vec<RawType>,
    },
    /// A single-dimensional, zero-based array
    SzArray(Box<RawType>),
    /// A generic parameter, by declared name
    GenericParameter(String),
}

impl RawType {
    /// Returns `true` for [`RawType::GenericParameter`]
    #[must_use]
    pub fn is_generic_parameter(&self) -> bool {
        matches!(self, RawType::GenericParameter(_))
    }

    /// Returns `true` if a generic parameter occurs anywhere in this type
    #[must_use]
    pub fn contains_generic_parameter(&self) -> bool {
        match self {
            RawType::GenericParameter(_) => true,
            RawType::GenericInstance { args, .. } => {
                args.iter().any(RawType::contains_generic_parameter)
            }
            RawType::SzArray(element) => element.contains_generic_parameter(),
            RawType::Primitive(_) | RawType::Named(_) => false,
        }
    }

    /// Stable identity hash of the raw reference itself
    #[must_use]
    pub fn identity(&self) -> u64 {
        IdentityHash::new()
            .add_component("raw-type")
            .add_component(self)
            .finalize()
    }
}

impl From<PrimitiveKind> for RawType {
    fn from(kind: PrimitiveKind) -> Self {
        RawType::Primitive(kind)
    }
}

impl From<Token> for RawType {
    fn from(token: Token) -> Self {
        RawType::Named(token)
    }
}

impl fmt::Display for RawType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawType::Primitive(kind) => write!(f, "{}.{}", kind.namespace(), kind.name()),
            RawType::Named(token) => write!(f, "{token}"),
            RawType::GenericInstance { definition, args } => {
                write!(f, "{definition}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
            RawType::SzArray(element) => write!(f, "{element}[]"),
            RawType::GenericParameter(name) => f.write_str(name),
        }
    }
}

/// Represents the shape of a runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFlavor {
    /// A built-in value type or `System.Void`
    Primitive(PrimitiveKind),
    /// A reference type
    Class,
    /// A user value type
    ValueType,
    /// An interface
    Interface,
    /// A delegate type
    Delegate,
    /// A single-dimensional array; the element type is on the type itself
    SzArray,
    /// An open generic parameter placeholder
    GenericParameter,
}

/// Where a type comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeSource {
    /// Defined by the interpreted code
    User,
    /// Provided by the host runtime
    Runtime,
}
