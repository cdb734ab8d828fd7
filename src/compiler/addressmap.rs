//! Offset to index mapping of a raw body.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::{metadata::method::RawBody, Error, Result};

/// Maps the byte offset of every raw instruction to its dense 0-based index.
///
/// Used only while a body is translated; the compiled array is addressed by index.
#[derive(Debug, Clone)]
pub struct AddressMap {
    indices: FxHashMap<u32, u32>,
    code_size: u32,
    len: u32,
}

impl AddressMap {
    /// Index every instruction of `body` in stream order
    #[must_use]
    pub fn build(body: &RawBody) -> Self {
        let mut indices =
            FxHashMap::with_capacity_and_hasher(body.instructions.len(), Default::default());
        let mut len = 0;
        for (index, instruction) in (0u32..).zip(&body.instructions) {
            indices.insert(instruction.offset, index);
            len = index + 1;
        }

        AddressMap {
            indices,
            code_size: body.code_size,
            len,
        }
    }

    /// Index of the instruction at `offset`
    #[must_use]
    pub fn index_of(&self, offset: u32) -> Option<u32> {
        self.indices.get(&offset).copied()
    }

    /// Index of an exclusive range end; the end of the body maps to one past the last index
    #[must_use]
    pub fn end_index(&self, offset: u32) -> Option<u32> {
        if offset == self.code_size {
            Some(self.len)
        } else {
            self.index_of(offset)
        }
    }

    /// Index of a branch, leave or switch target.
    ///
    /// # Errors
    /// Returns [`Error::MalformedBranchTarget`] if no instruction starts at `offset`.
    pub fn branch_target(&self, offset: u32, owner: &dyn fmt::Display) -> Result<u32> {
        self.index_of(offset)
            .ok_or_else(|| Error::MalformedBranchTarget {
                method: owner.to_string(),
                offset,
            })
    }

    /// Number of mapped instructions
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` for an empty body
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assembly::OpCode, metadata::method::BodyBuilder};

    fn body() -> RawBody {
        let mut builder = BodyBuilder::new();
        builder.emit(OpCode::Nop).unwrap();
        builder.ldc_i4(1000).unwrap();
        builder.emit(OpCode::Pop).unwrap();
        builder.ret().unwrap();
        builder.finalize().unwrap()
    }

    #[test]
    fn dense_indices_in_order() {
        let map = AddressMap::build(&body());

        assert_eq!(map.len(), 4);
        assert_eq!(map.index_of(0), Some(0));
        assert_eq!(map.index_of(1), Some(1));
        assert_eq!(map.index_of(6), Some(2));
        assert_eq!(map.index_of(7), Some(3));
        assert_eq!(map.index_of(2), None);
    }

    #[test]
    fn end_of_body() {
        let map = AddressMap::build(&body());

        assert_eq!(map.end_index(8), Some(4));
        assert_eq!(map.end_index(7), Some(3));
        match map.branch_target(8, &"Demo.M") {
            Err(Error::MalformedBranchTarget { method, offset }) => {
                assert_eq!(method, "Demo.M");
                assert_eq!(offset, 8);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_body() {
        let map = AddressMap::build(&RawBody::default());
        assert!(map.is_empty());
        assert_eq!(map.end_index(0), Some(0));
    }
}
