// MIT License - Copyright (c) 2024 paradox-link contributors

//! Per-panel-family memory layout configuration: which EEPROM addresses hold
//! each element type's label blocks, and which element indices the consumer
//! cares about.
//!
//! This is injected configuration — the crate consumes it, the integration
//! that knows the panel family owns it.

use std::collections::BTreeMap;

/// Where one element type's labels live in panel memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDef {
    /// Ordered groups of EEPROM addresses to read, one read per address.
    /// Groups are flattened in order when loading.
    pub addresses: Vec<Vec<u16>>,
    /// Byte offset of the label text within each read block.
    pub label_offset: usize,
}

impl ElementDef {
    /// All addresses in reading order, groups flattened.
    pub fn flattened_addresses(&self) -> Vec<u16> {
        self.addresses.iter().flatten().copied().collect()
    }
}

/// The memory layout for one panel family, plus optional per-element-type
/// allow-lists of 1-based indices.
///
/// One instance per panel family, built explicitly and passed to the
/// components that need it.
#[derive(Debug, Clone, Default)]
pub struct MemoryMap {
    elements: BTreeMap<String, ElementDef>,
    limits: BTreeMap<String, Vec<u32>>,
}

impl MemoryMap {
    pub fn builder() -> MemoryMapBuilder {
        MemoryMapBuilder::default()
    }

    /// Element types and their definitions, in name order.
    pub fn elements(&self) -> impl Iterator<Item = (&str, &ElementDef)> {
        self.elements.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn element(&self, element_type: &str) -> Option<&ElementDef> {
        self.elements.get(element_type)
    }

    /// The allow-list of 1-based indices for an element type, if one was
    /// configured. `None` means every index is of interest.
    pub fn limits(&self, element_type: &str) -> Option<&[u32]> {
        self.limits.get(element_type).map(Vec::as_slice)
    }

    /// The addresses to probe for an element type: groups flattened in
    /// order, then filtered by the allow-list on 1-based position.
    pub fn addresses_to_probe(&self, element_type: &str) -> Vec<u16> {
        let Some(def) = self.elements.get(element_type) else {
            return Vec::new();
        };
        let flat = def.flattened_addresses();
        match self.limits(element_type) {
            None => flat,
            Some(limits) => flat
                .iter()
                .enumerate()
                .filter(|(i, _)| limits.contains(&(*i as u32 + 1)))
                .map(|(_, &a)| a)
                .collect(),
        }
    }
}

/// Builder for [`MemoryMap`].
#[derive(Debug, Clone, Default)]
pub struct MemoryMapBuilder {
    map: MemoryMap,
}

impl MemoryMapBuilder {
    /// Define an element type's label addresses and label offset.
    pub fn element(
        mut self,
        element_type: impl Into<String>,
        addresses: Vec<Vec<u16>>,
        label_offset: usize,
    ) -> Self {
        self.map.elements.insert(
            element_type.into(),
            ElementDef {
                addresses,
                label_offset,
            },
        );
        self
    }

    /// Restrict an element type to the given 1-based indices.
    pub fn limit(mut self, element_type: impl Into<String>, indices: Vec<u32>) -> Self {
        self.map.limits.insert(element_type.into(), indices);
        self
    }

    pub fn build(self) -> MemoryMap {
        self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flattened_addresses_keep_group_order() {
        let def = ElementDef {
            addresses: vec![vec![0x100, 0x110], vec![0x200], vec![0x300, 0x310]],
            label_offset: 0,
        };
        assert_eq!(
            def.flattened_addresses(),
            vec![0x100, 0x110, 0x200, 0x300, 0x310]
        );
    }

    #[test]
    fn test_addresses_to_probe_without_limits() {
        let map = MemoryMap::builder()
            .element("zone", vec![vec![0x10, 0x20, 0x30]], 0)
            .build();
        assert_eq!(map.addresses_to_probe("zone"), vec![0x10, 0x20, 0x30]);
    }

    #[test]
    fn test_addresses_to_probe_honors_one_based_limits() {
        let map = MemoryMap::builder()
            .element("zone", vec![vec![0x10, 0x20], vec![0x30, 0x40]], 0)
            .limit("zone", vec![1, 3])
            .build();
        assert_eq!(map.addresses_to_probe("zone"), vec![0x10, 0x30]);
    }

    #[test]
    fn test_unknown_element_type_is_empty() {
        let map = MemoryMap::default();
        assert!(map.addresses_to_probe("door").is_empty());
        assert!(map.element("door").is_none());
        assert!(map.limits("door").is_none());
    }

    #[test]
    fn test_elements_iterate_in_name_order() {
        let map = MemoryMap::builder()
            .element("zone", vec![vec![1]], 0)
            .element("door", vec![vec![2]], 4)
            .element("user", vec![vec![3]], 0)
            .build();
        let names: Vec<&str> = map.elements().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["door", "user", "zone"]);
    }
}
