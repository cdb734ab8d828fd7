//! Exception handler representation for method bodies.
//!
//! A raw body carries [`RawExceptionHandler`] clauses in CIL form (byte offsets and lengths).
//! Translation turns each clause into an [`ExceptionRegion`] whose bounds are inclusive
//! instruction indices and whose [`HandlerKind`] is closed over catch and finally.

use std::fmt;

use bitflags::bitflags;

use crate::metadata::typesystem::{RawType, TypeRc};

bitflags! {
    /// Exception handler flags defining the type of exception handling clause.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExceptionHandlerFlags: u16 {
        /// A typed exception clause.
        ///
        /// The clause's catch type names the exception type this handler catches.
        const EXCEPTION = 0x0000;

        /// An exception filter and handler clause.
        const FILTER = 0x0001;

        /// A finally clause.
        const FINALLY = 0x0002;

        /// A fault clause (finally that executes only on exception).
        const FAULT = 0x0004;
    }
}

/// Exception handler clause of a raw body.
///
/// # Layout in IL
///
/// ```text
/// try {
///     // try_offset -> try_offset + try_length
/// }
/// catch (ExceptionType) {
///     // handler_offset -> handler_offset + handler_length
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RawExceptionHandler {
    /// Flags describing the type of exception handler (catch, filter, finally, fault).
    pub flags: ExceptionHandlerFlags,
    /// Offset in bytes of try block from start of method body.
    pub try_offset: u32,
    /// Length in bytes of the try block.
    pub try_length: u32,
    /// Location of the handler for this try block.
    pub handler_offset: u32,
    /// Size of the handler code in bytes.
    pub handler_length: u32,
    /// If flags == EXCEPTION, then this type will handle the exception.
    pub catch_type: Option<RawType>,
    /// Offset in method body for filter-based exception handler.
    pub filter_offset: u32,
}

impl RawExceptionHandler {
    /// Exclusive end offset of the try block
    #[must_use]
    pub fn try_end(&self) -> u32 {
        self.try_offset.saturating_add(self.try_length)
    }

    /// Exclusive end offset of the handler block
    #[must_use]
    pub fn handler_end(&self) -> u32 {
        self.handler_offset.saturating_add(self.handler_length)
    }
}

/// The kind of a compiled handler region.
#[derive(Clone)]
pub enum HandlerKind {
    /// Catches exceptions assignable to the carried type
    Catch(TypeRc),
    /// Runs on every exit from the try block
    Finally,
}

impl HandlerKind {
    /// The guarded exception type of a catch region
    #[must_use]
    pub fn catch_type(&self) -> Option<&TypeRc> {
        match self {
            HandlerKind::Catch(ty) => Some(ty),
            HandlerKind::Finally => None,
        }
    }
}

impl PartialEq for HandlerKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HandlerKind::Catch(a), HandlerKind::Catch(b)) => a.identity() == b.identity(),
            (HandlerKind::Finally, HandlerKind::Finally) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKind::Catch(ty) => write!(f, "Catch({})", ty.full_name()),
            HandlerKind::Finally => f.write_str("Finally"),
        }
    }
}

/// A try/handler range over compiled instruction indices, both ends inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionRegion {
    /// Index of the first instruction of the try block
    pub try_start: u32,
    /// Index of the last instruction of the try block
    pub try_end: u32,
    /// Index of the first instruction of the handler
    pub handler_start: u32,
    /// Index of the last instruction of the handler
    pub handler_end: u32,
    /// Catch or finally
    pub kind: HandlerKind,
}

impl ExceptionRegion {
    /// Returns `true` if `index` lies in the try block
    #[must_use]
    pub fn protects(&self, index: u32) -> bool {
        (self.try_start..=self.try_end).contains(&index)
    }

    /// Returns `true` if `index` lies in the handler block
    #[must_use]
    pub fn handles(&self, index: u32) -> bool {
        (self.handler_start..=self.handler_end).contains(&index)
    }
}
