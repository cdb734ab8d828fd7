use std::fmt;

use crate::{
    metadata::typesystem::{IdentityHash, TypeRc},
    Error, Result,
};

/// Ordered (parameter name, concrete type) pairs closing a generic type or method.
///
/// The order matches the generic parameter declaration order of the construct being
/// instantiated. Bindings are immutable once built; instantiating again produces a new value.
#[derive(Clone, Default)]
pub struct GenericBindings {
    pairs: Vec<(String, TypeRc)>,
}

impl GenericBindings {
    /// Pair declared parameter names with concrete types, positionally.
    ///
    /// ## Arguments
    /// * `names`  - The declared generic parameter names
    /// * `types`  - The concrete types, one per name
    /// * `target` - Display name of the construct being instantiated, for diagnostics
    ///
    /// # Errors
    /// Returns [`Error::ArityMismatch`] if the counts differ.
    pub fn bind(names: &[String], types: &[TypeRc], target: &str) -> Result<Self> {
        if names.len() != types.len() {
            return Err(Error::ArityMismatch {
                target: target.to_string(),
                expected: names.len(),
                actual: types.len(),
            });
        }

        Ok(GenericBindings {
            pairs: names.iter().cloned().zip(types.iter().cloned()).collect(),
        })
    }

    /// Look up the type bound to `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeRc> {
        self.pairs
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, ty)| ty)
    }

    /// Returns `true` if `name` is one of the bound parameters
    #[must_use]
    pub fn binds(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of bound parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if nothing is bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate the (name, type) pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeRc)> {
        self.pairs.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    /// The bound types in declaration order
    pub fn types(&self) -> impl Iterator<Item = &TypeRc> {
        self.pairs.iter().map(|(_, ty)| ty)
    }

    /// Combined identity of the bound types, in order
    #[must_use]
    pub fn identity(&self) -> u64 {
        self.pairs
            .iter()
            .fold(IdentityHash::new().add_component(&self.pairs.len()), |hash, (_, ty)| {
                hash.add_identity(ty.identity())
            })
            .finalize()
    }
}

impl fmt::Debug for GenericBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.pairs.iter().map(|(name, ty)| (name, ty.full_name())))
            .finish()
    }
}

impl fmt::Display for GenericBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<")?;
        for (i, ty) in self.types().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&ty.full_name())?;
        }
        f.write_str(">")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::metadata::typesystem::{PrimitiveKind, RuntimeType};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn bind_positional() {
        let int = Arc::new(RuntimeType::primitive(PrimitiveKind::I4));
        let string = Arc::new(RuntimeType::primitive(PrimitiveKind::String));
        let bindings =
            GenericBindings::bind(&names(&["K", "V"]), &[int, string], "Demo.Map`2").unwrap();

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings.get("V").map(|t| t.name.as_str()), Some("String"));
        assert!(bindings.binds("K"));
        assert!(!bindings.binds("T"));
        assert_eq!(bindings.to_string(), "<System.Int32, System.String>");
        assert_eq!(
            bindings.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            vec!["K", "V"]
        );
    }

    #[test]
    fn bind_arity_mismatch() {
        let int = Arc::new(RuntimeType::primitive(PrimitiveKind::I4));
        let err = GenericBindings::bind(&names(&["K", "V"]), &[int], "Demo.Map`2").unwrap_err();
        assert!(matches!(
            err,
            Error::ArityMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn identity_is_order_sensitive() {
        let int = Arc::new(RuntimeType::primitive(PrimitiveKind::I4));
        let string = Arc::new(RuntimeType::primitive(PrimitiveKind::String));
        let kv = names(&["K", "V"]);
        let a = GenericBindings::bind(&kv, &[int.clone(), string.clone()], "m").unwrap();
        let b = GenericBindings::bind(&kv, &[string, int], "m").unwrap();
        assert_ne!(a.identity(), b.identity());
        assert_ne!(a.identity(), GenericBindings::default().identity());
    }
}
