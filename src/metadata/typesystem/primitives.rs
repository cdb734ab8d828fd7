use strum::{EnumIter, IntoEnumIterator};

use crate::metadata::{token::Token, typesystem::TypeFlavor};

/// The built-in runtime types every [`crate::metadata::typesystem::Domain`] pre-registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
pub enum PrimitiveKind {
    /// System.Void - represents no value
    Void,
    /// System.Boolean - true/false value
    Boolean,
    /// System.Char - Unicode 16-bit character
    Char,
    /// System.SByte - signed 8-bit integer
    I1,
    /// System.Byte - unsigned 8-bit integer
    U1,
    /// System.Int16 - signed 16-bit integer
    I2,
    /// System.UInt16 - unsigned 16-bit integer
    U2,
    /// System.Int32 - signed 32-bit integer
    I4,
    /// System.UInt32 - unsigned 32-bit integer
    U4,
    /// System.Int64 - signed 64-bit integer
    I8,
    /// System.UInt64 - unsigned 64-bit integer
    U8,
    /// System.Single - 32-bit floating point
    R4,
    /// System.Double - 64-bit floating point
    R8,
    /// System.IntPtr - native sized signed integer
    I,
    /// System.UIntPtr - native sized unsigned integer
    U,
    /// System.Object - base class for all reference types
    Object,
    /// System.String - immutable string of Unicode characters
    String,
    /// System.ValueType - base class for value types
    ValueType,
    /// System.Exception - root of every catchable type
    Exception,
    /// System.MulticastDelegate - base class for delegates
    MulticastDelegate,
}

impl PrimitiveKind {
    /// Get the artificial token for this type
    #[must_use]
    pub fn token(&self) -> Token {
        Token::new(match self {
            PrimitiveKind::Void => 0xF000_0001,
            PrimitiveKind::Boolean => 0xF000_0002,
            PrimitiveKind::Char => 0xF000_0003,
            PrimitiveKind::I1 => 0xF000_0004,
            PrimitiveKind::U1 => 0xF000_0005,
            PrimitiveKind::I2 => 0xF000_0006,
            PrimitiveKind::U2 => 0xF000_0007,
            PrimitiveKind::I4 => 0xF000_0008,
            PrimitiveKind::U4 => 0xF000_0009,
            PrimitiveKind::I8 => 0xF000_000A,
            PrimitiveKind::U8 => 0xF000_000B,
            PrimitiveKind::R4 => 0xF000_000C,
            PrimitiveKind::R8 => 0xF000_000D,
            PrimitiveKind::I => 0xF000_000E,
            PrimitiveKind::U => 0xF000_000F,
            PrimitiveKind::Object => 0xF000_0010,
            PrimitiveKind::String => 0xF000_0011,
            PrimitiveKind::ValueType => 0xF000_0013,
            PrimitiveKind::Exception => 0xF000_0018,
            PrimitiveKind::MulticastDelegate => 0xF000_0019,
        })
    }

    /// Get the namespace of this type
    #[must_use]
    pub fn namespace(&self) -> &'static str {
        "System"
    }

    /// Get the short name (without namespace)
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::Void => "Void",
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::Char => "Char",
            PrimitiveKind::I1 => "SByte",
            PrimitiveKind::U1 => "Byte",
            PrimitiveKind::I2 => "Int16",
            PrimitiveKind::U2 => "UInt16",
            PrimitiveKind::I4 => "Int32",
            PrimitiveKind::U4 => "UInt32",
            PrimitiveKind::I8 => "Int64",
            PrimitiveKind::U8 => "UInt64",
            PrimitiveKind::R4 => "Single",
            PrimitiveKind::R8 => "Double",
            PrimitiveKind::I => "IntPtr",
            PrimitiveKind::U => "UIntPtr",
            PrimitiveKind::Object => "Object",
            PrimitiveKind::String => "String",
            PrimitiveKind::ValueType => "ValueType",
            PrimitiveKind::Exception => "Exception",
            PrimitiveKind::MulticastDelegate => "MulticastDelegate",
        }
    }

    /// Get the full type name (with namespace)
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace(), self.name())
    }

    /// Convert to `TypeFlavor`
    #[must_use]
    pub fn to_flavor(&self) -> TypeFlavor {
        match self {
            PrimitiveKind::Object
            | PrimitiveKind::String
            | PrimitiveKind::ValueType
            | PrimitiveKind::Exception
            | PrimitiveKind::MulticastDelegate => TypeFlavor::Class,
            kind => TypeFlavor::Primitive(*kind),
        }
    }

    /// Is this a value type
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        !matches!(
            self,
            PrimitiveKind::Void
                | PrimitiveKind::Object
                | PrimitiveKind::String
                | PrimitiveKind::ValueType
                | PrimitiveKind::Exception
                | PrimitiveKind::MulticastDelegate
        )
    }

    /// Look up the primitive owning an artificial token
    #[must_use]
    pub fn from_token(token: Token) -> Option<Self> {
        PrimitiveKind::iter().find(|kind| kind.token() == token)
    }
}
