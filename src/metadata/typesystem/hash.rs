//! Identity hashing for types, method instantiations, raw operands and string literals.
//!
//! Every identity token the translator embeds into a compiled instruction comes out of
//! [`IdentityHash`]. Components are folded in sequence with FNV-1a style mixing plus an extra
//! avalanche step, so the result is order-sensitive and does not suffer the cancellation
//! problems of XOR-combining component hashes. Two instantiations that differ in any bound
//! argument therefore end up with different identities.
//!
//! # Example Usage
//!
//! ```rust
//! use ilbody::metadata::typesystem::IdentityHash;
//!
//! let list_of_int = IdentityHash::new()
//!     .add_component("inst")
//!     .add_component(&0x0200_0001_u32)
//!     .add_component("System.Int32")
//!     .finalize();
//! let list_of_string = IdentityHash::new()
//!     .add_component("inst")
//!     .add_component(&0x0200_0001_u32)
//!     .add_component("System.String")
//!     .finalize();
//! assert_ne!(list_of_int, list_of_string);
//! ```

use std::hash::{DefaultHasher, Hash, Hasher};

use crate::metadata::token::Token;

/// Sequential identity hash builder.
pub struct IdentityHash {
    state: u64,
}

impl IdentityHash {
    /// Start a new hash from the FNV-1a offset basis
    #[must_use]
    pub fn new() -> Self {
        IdentityHash {
            state: 0xcbf2_9ce4_8422_2325_u64, // FNV-1a 64-bit offset basis
        }
    }

    fn mix(&mut self, value: u64) {
        self.state ^= value;
        self.state = self.state.wrapping_mul(0x0100_0000_01b3_u64); // FNV-1a 64-bit prime

        self.state ^= self.state >> 33;
        self.state = self.state.wrapping_mul(0xff51_afd7_ed55_8ccd_u64);
        self.state ^= self.state >> 33;
    }

    /// Fold any hashable component into the hash
    #[must_use]
    pub fn add_component<T: Hash + ?Sized>(mut self, component: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        component.hash(&mut hasher);
        self.mix(hasher.finish());
        self
    }

    /// Fold in a namespace and name pair
    #[must_use]
    pub fn add_fullname(self, namespace: &str, name: &str) -> Self {
        self.add_component(namespace).add_component(name)
    }

    /// Fold in a metadata token
    #[must_use]
    pub fn add_token(self, token: &Token) -> Self {
        self.add_component(&token.value())
    }

    /// Fold in a previously computed identity
    #[must_use]
    pub fn add_identity(mut self, identity: u64) -> Self {
        self.mix(identity);
        self
    }

    /// Produce the final hash value
    #[must_use]
    pub fn finalize(self) -> u64 {
        self.state
    }

    /// Hash a single component in one step
    #[must_use]
    pub fn of<T: Hash + ?Sized>(component: &T) -> u64 {
        IdentityHash::new().add_component(component).finalize()
    }
}

impl Default for IdentityHash {
    fn default() -> Self {
        Self::new()
    }
}
