//! Identity Map: address → live resource.

use rustc_hash::FxHashMap;

use super::{ScriptResource, StyleResource};
use crate::core::Address;

/// Anything identified by a physical address.
pub trait Addressed {
    fn address(&self) -> &Address;
}

impl Addressed for ScriptResource {
    fn address(&self) -> &Address {
        &self.address
    }
}

impl Addressed for StyleResource {
    fn address(&self) -> &Address {
        &self.address
    }
}

/// Borrowed lookup from address to resource.
///
/// When an address appears twice, the later resource wins.
#[derive(Debug)]
pub struct IdentityMap<'a, R> {
    by_address: FxHashMap<&'a Address, &'a R>,
}

impl<'a, R: Addressed> IdentityMap<'a, R> {
    pub fn new(resources: &'a [R]) -> Self {
        let mut by_address = FxHashMap::default();
        by_address.reserve(resources.len());
        for resource in resources {
            by_address.insert(resource.address(), resource);
        }
        Self { by_address }
    }

    pub fn get(&self, address: &Address) -> Option<&'a R> {
        self.by_address.get(address).copied()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.by_address.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn test_lookup_and_last_wins() {
        let mut doc = Document::new();
        let a = Address::from_absolute("https://example.com/a.css");
        let first = StyleResource::new(doc.create_element("link"), a.clone());
        let second = StyleResource::new(doc.create_element("link"), a.clone());
        let resources = vec![first, second.clone()];

        let map = IdentityMap::new(&resources);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&a), Some(&second));
        assert!(!map.contains(&Address::from_absolute("https://example.com/b.css")));
    }
}
