//! Metadata tokens identifying types, methods and fields.
//!
//! A [`Token`] is the opaque identity of a metadata reference as it appears in a raw method body.
//! The high byte selects the metadata table, the low 24 bits the row. The translator never looks
//! inside a token; it only hands it to the registry and hashes it for identity purposes.
//!
//! # Examples
//!
//! ```rust
//! use ilbody::metadata::token::{Token, TableId};
//!
//! let token = Token::from_parts(TableId::MethodDef, 7);
//! assert_eq!(token.value(), 0x0600_0007);
//! assert_eq!(token.table_id(), Some(TableId::MethodDef));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

/// The metadata tables a token can point into.
///
/// Only the tables a method body can reference are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TableId {
    /// `TypeRef` - a type defined outside the interpreted code (runtime type)
    TypeRef = 0x01,
    /// `TypeDef` - a type defined by the interpreted code
    TypeDef = 0x02,
    /// `Field`
    Field = 0x04,
    /// `MethodDef`
    MethodDef = 0x06,
    /// `MemberRef`
    MemberRef = 0x0A,
    /// `TypeSpec`
    TypeSpec = 0x1B,
    /// `MethodSpec`
    MethodSpec = 0x2B,
}

impl TableId {
    /// Map the high byte of a token back to its table.
    #[must_use]
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(TableId::TypeRef),
            0x02 => Some(TableId::TypeDef),
            0x04 => Some(TableId::Field),
            0x06 => Some(TableId::MethodDef),
            0x0A => Some(TableId::MemberRef),
            0x1B => Some(TableId::TypeSpec),
            0x2B => Some(TableId::MethodSpec),
            _ => None,
        }
    }
}

/// A metadata token: table id in the high byte, row in the low 24 bits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Token(pub u32);

impl Token {
    /// Create a token from its raw value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Create a token from a table and a (1-based) row
    #[must_use]
    pub fn from_parts(table: TableId, row: u32) -> Self {
        Token(((table as u32) << 24) | (row & 0x00FF_FFFF))
    }

    /// The raw value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The raw table byte
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The table this token points into, if it is one a method body can reference
    #[must_use]
    pub fn table_id(&self) -> Option<TableId> {
        TableId::from_byte(self.table())
    }

    /// The row within the table
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// A null token refers to nothing
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(0x{:08x})", self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}
