// MIT License - Copyright (c) 2024 paradox-link contributors

//! Property diff/publish engine.
//!
//! Bulk status payloads decode into deeply nested trees describing live
//! state for many elements at once. This module walks freshly decoded
//! trees, detects changes against a last-seen cache, and pushes only the
//! deltas to the owning system through an [`UpdateSink`].

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

/// Record keys beginning with this prefix are internal to the decoder and
/// never published.
const PRIVATE_PREFIX: char = '_';

/// A scalar leaf of a property tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// A decoded bulk-status payload: either an ordered sequence (positionally
/// indexed, 0-based), a keyed record, or a scalar leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyNode {
    Sequence(Vec<PropertyNode>),
    Record(BTreeMap<String, PropertyNode>),
    Leaf(PropertyValue),
}

impl PropertyNode {
    /// Build a record node from key/value pairs.
    pub fn record<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<PropertyNode>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Record(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a sequence node.
    pub fn sequence<V, I>(items: I) -> Self
    where
        V: Into<PropertyNode>,
        I: IntoIterator<Item = V>,
    {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Self::Sequence(_) | Self::Record(_))
    }

    /// This node's direct entries. Sequences yield 0-based positional keys;
    /// records yield their keys with private-prefixed entries skipped;
    /// leaves yield nothing.
    pub fn entries(&self) -> impl Iterator<Item = (PropertyKey, &PropertyNode)> {
        let items: Vec<(PropertyKey, &PropertyNode)> = match self {
            Self::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (PropertyKey::Index(i as u32), v))
                .collect(),
            Self::Record(map) => map
                .iter()
                .filter(|(k, _)| !k.starts_with(PRIVATE_PREFIX))
                .map(|(k, v)| (PropertyKey::Name(k.clone()), v))
                .collect(),
            Self::Leaf(_) => Vec::new(),
        };
        items.into_iter()
    }
}

impl From<bool> for PropertyNode {
    fn from(v: bool) -> Self {
        Self::Leaf(PropertyValue::Bool(v))
    }
}

impl From<i64> for PropertyNode {
    fn from(v: i64) -> Self {
        Self::Leaf(PropertyValue::Int(v))
    }
}

impl From<&str> for PropertyNode {
    fn from(v: &str) -> Self {
        Self::Leaf(PropertyValue::Text(v.to_string()))
    }
}

/// How an entry is addressed within its parent node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyKey {
    /// Position within a sequence (0-based).
    Index(u32),
    /// Key within a record.
    Name(String),
}

impl PropertyKey {
    /// The key as an element index, if it is one: a sequence position, or a
    /// record key that parses as a number.
    pub fn as_index(&self) -> Option<u32> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Name(s) => s.parse().ok(),
        }
    }
}

impl std::fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{}", i),
            Self::Name(s) => f.write_str(s),
        }
    }
}

/// Receives per-element property updates. Implemented by the owning system.
pub trait UpdateSink {
    fn update_properties(&mut self, element_type: &str, index: &PropertyKey, properties: PropertyNode);
}

/// Detects per-key changes in decoded property trees and emits only the
/// deltas.
///
/// Change detection is keyed on the *entire* value under each top-level key:
/// a change anywhere inside re-emits every inner index under that key. The
/// cache grows with addresses encountered and is never pruned here.
pub struct PropertyPublisher {
    limits: BTreeMap<String, Vec<u32>>,
    cache: HashMap<u32, HashMap<String, PropertyNode>>,
}

impl Default for PropertyPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyPublisher {
    /// A publisher with no index allow-lists: every element is of interest.
    pub fn new() -> Self {
        Self::with_limits(BTreeMap::new())
    }

    /// A publisher restricted by per-element-type index allow-lists.
    pub fn with_limits(limits: BTreeMap<String, Vec<u32>>) -> Self {
        Self {
            limits,
            cache: HashMap::new(),
        }
    }

    /// Walk one decoded bulk-status tree and publish changed entries.
    ///
    /// `address` is the panel memory address the tree was decoded from; the
    /// change cache is keyed on (address, top-level key).
    pub fn process_properties_bulk(
        &mut self,
        properties: &PropertyNode,
        address: u32,
        sink: &mut dyn UpdateSink,
    ) {
        for (key, value) in properties.entries() {
            if !value.is_container() {
                continue;
            }
            // Positional top-level entries carry no key text to derive an
            // element type from.
            let PropertyKey::Name(key) = key else {
                continue;
            };
            let (element_type, prop_name) = match key.split_once('_') {
                Some((e, p)) => (e, p),
                None => (key.as_str(), ""),
            };

            let unchanged = self
                .cache
                .get(&address)
                .and_then(|known| known.get(&key))
                .is_some_and(|old| old == value);
            if unchanged {
                continue;
            }

            debug!("Property change at {:#06x} under key {}", address, key);
            self.cache
                .entry(address)
                .or_default()
                .insert(key.clone(), value.clone());

            if prop_name.is_empty() {
                continue;
            }

            let limit_list = self.limits.get(element_type);
            for (index, status) in value.entries() {
                if let Some(limits) = limit_list {
                    match index.as_index() {
                        Some(i) if limits.contains(&i) => {}
                        _ => continue,
                    }
                }
                if prop_name == "status" {
                    sink.update_properties(element_type, &index, status.clone());
                } else {
                    let single =
                        PropertyNode::record([(prop_name.to_string(), status.clone())]);
                    sink.update_properties(element_type, &index, single);
                }
            }
        }
    }
}
