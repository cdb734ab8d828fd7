use thiserror::Error;

use crate::metadata::{method::ExceptionHandlerFlags, token::Token};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The kind of metadata reference that failed to resolve.
///
/// Carried by [`Error::UnresolvedReference`] so callers can tell a missing callee apart from a
/// missing type or field without parsing the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// A call-family operand (`call`, `callvirt`, `newobj`, `ldftn`, `ldvirtftn`)
    Method,
    /// A type operand, a catch type, a parameter type or the return type
    Type,
    /// An instance field operand
    InstanceField,
    /// A static field operand (including `ldtoken` on a field)
    StaticField,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReferenceKind::Method => "method",
            ReferenceKind::Type => "type",
            ReferenceKind::InstanceField => "instance field",
            ReferenceKind::StaticField => "static field",
        };
        f.write_str(name)
    }
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Translation errors are raised when a method body is first compiled, never deferred to
/// execution. They are not recovered locally: the caller that asked for the compiled body
/// decides whether to abort the enclosing operation (for example, loading the owning type).
/// Translation is deterministic, so retrying without changing registry state is pointless.
///
/// # Error Categories
///
/// ## Translation Errors
/// - [`Error::UnresolvedReference`] - The registry could not resolve a call/type/field operand
/// - [`Error::UnresolvedGenericParameter`] - A generic parameter is bound at neither lookup level
/// - [`Error::UnsupportedHandlerKind`] - A fault or filter region was encountered
/// - [`Error::UnsupportedTokenOperand`] - `ldtoken` on something other than a field
/// - [`Error::MalformedBranchTarget`] - A branch or switch target is not an instruction of the body
/// - [`Error::ArityMismatch`] - Generic instantiation with the wrong number of arguments
///
/// ## Construction Errors
/// - [`Error::Malformed`] - Inconsistent raw input detected while wiring descriptors
/// - [`Error::UndefinedLabel`], [`Error::DuplicateLabel`], [`Error::InvalidOperand`] - Body builder misuse
/// - [`Error::TypeNotFound`], [`Error::TypeInsert`] - Registry population failures
///
/// # Examples
///
/// ```rust,no_run
/// use ilbody::{Error, prelude::*};
///
/// fn body_len(method: &Method, domain: &Domain) -> ilbody::Result<usize> {
///     match method.compiled_body(domain) {
///         Ok(body) => Ok(body.len()),
///         Err(Error::UnresolvedReference { kind, reference }) => {
///             eprintln!("cannot resolve {kind} {reference}");
///             Err(Error::UnresolvedReference { kind, reference })
///         }
///         Err(e) => Err(e),
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A call, type or field operand could not be resolved by the registry.
    ///
    /// Defaulting the token to zero is never done; an unresolvable operand always
    /// fails the translation of the affected method.
    #[error("Unresolved {kind} reference - {reference}")]
    UnresolvedReference {
        /// Which operand class failed
        kind: ReferenceKind,
        /// Printable form of the raw operand
        reference: String,
    },

    /// A generic parameter name is bound by neither the declaring type nor the method.
    ///
    /// Only raised where every open parameter must be closed. Enumerating the declared shape
    /// of an uninstantiated generic definition yields an open placeholder instead.
    #[error("Cannot find generic parameter '{name}' in {method}")]
    UnresolvedGenericParameter {
        /// The generic parameter name
        name: String,
        /// Display name of the method being translated
        method: String,
    },

    /// An exception region of a kind other than catch or finally.
    #[error("Unsupported exception handler kind - {0:?}")]
    UnsupportedHandlerKind(ExceptionHandlerFlags),

    /// `ldtoken` with an operand that is not a field reference.
    #[error("Unsupported ldtoken operand - {0}")]
    UnsupportedTokenOperand(String),

    /// A branch, leave or switch target that is not an instruction of the body.
    #[error("Branch target IL_{offset:04x} is not an instruction of {method}")]
    MalformedBranchTarget {
        /// Display name of the method being translated
        method: String,
        /// The raw target offset
        offset: u32,
    },

    /// A generic instantiation received the wrong number of type arguments.
    #[error("Generic arity mismatch for {target} - expected {expected}, got {actual}")]
    ArityMismatch {
        /// The generic method or type being instantiated
        target: String,
        /// Declared generic parameter count
        expected: usize,
        /// Number of concrete types supplied
        actual: usize,
    },

    /// The input is inconsistent and could not be processed.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A branch, switch or handler referenced a label that was never defined.
    #[error("Undefined label - {0}")]
    UndefinedLabel(String),

    /// A label was defined twice in the same body.
    #[error("Duplicate label - {0}")]
    DuplicateLabel(String),

    /// An operand was supplied that the opcode does not accept.
    #[error("Invalid operand for '{opcode}' - expected {expected}")]
    InvalidOperand {
        /// Mnemonic of the offending opcode
        opcode: &'static str,
        /// Description of the operand the opcode takes
        expected: &'static str,
    },

    /// Failed to find type in the registry.
    #[error("Failed to find type in registry - {0}")]
    TypeNotFound(Token),

    /// Failed to insert a new type or method into the registry.
    #[error("Failed to insert into registry - {0}")]
    TypeInsert(Token),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
