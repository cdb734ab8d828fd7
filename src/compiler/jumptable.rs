//! Jump tables of `switch` sites.

use std::{fmt, sync::Arc};

use rustc_hash::FxHashMap;

use crate::{assembly::JumpTableKey, compiler::AddressMap, Result};

/// The jump tables of one compiled body.
///
/// Each `switch` site, identified by its raw offset, gets one table of target indices in case
/// order. Keys are dense and assigned in order of first appearance. Tables are shared, so
/// fetching the same key twice returns the same allocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JumpTables {
    sites: FxHashMap<u32, JumpTableKey>,
    tables: Vec<Arc<[u32]>>,
}

impl JumpTables {
    /// Build the table for the `switch` at `site`, or return the existing key.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedBranchTarget`] if a case target is not an instruction.
    pub fn prepare(
        &mut self,
        site: u32,
        targets: &[u32],
        map: &AddressMap,
        owner: &dyn fmt::Display,
    ) -> Result<JumpTableKey> {
        if let Some(key) = self.sites.get(&site) {
            return Ok(*key);
        }

        let resolved = targets
            .iter()
            .map(|target| map.branch_target(*target, owner))
            .collect::<Result<Vec<u32>>>()?;

        let key = JumpTableKey(u32::try_from(self.tables.len()).map_err(|_| {
            malformed_error!("Too many switch sites in {}", owner)
        })?);
        self.tables.push(Arc::from(resolved));
        self.sites.insert(site, key);
        Ok(key)
    }

    /// The table for `key`
    #[must_use]
    pub fn get(&self, key: JumpTableKey) -> Option<Arc<[u32]>> {
        self.tables.get(usize::try_from(key.0).ok()?).cloned()
    }

    /// The key assigned to the `switch` at raw offset `site`
    #[must_use]
    pub fn key_of(&self, site: u32) -> Option<JumpTableKey> {
        self.sites.get(&site).copied()
    }

    /// Number of tables
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if the body has no `switch`
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
