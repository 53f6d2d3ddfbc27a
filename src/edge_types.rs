// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::Attributes;

/// Versioned classification of edges by their attributes.
///
/// Every [NetworkTile](crate::NetworkTile) caches the edge type of each of its edges,
/// together with the [id](EdgeTypeMap::id) of the map used to compute them.
/// Installing a map with a different id into a [RoutingNetwork](crate::RoutingNetwork)
/// makes every tile re-derive its edge types the next time it's accessed.
///
/// Maps with equal ids must classify edges identically.
#[derive(Clone)]
pub struct EdgeTypeMap {
    id: u32,
    classify: Arc<dyn Fn(&Attributes) -> u32 + Send + Sync>,
}

impl EdgeTypeMap {
    pub fn new<F>(id: u32, classify: F) -> Self
    where
        F: Fn(&Attributes) -> u32 + Send + Sync + 'static,
    {
        Self {
            id,
            classify: Arc::new(classify),
        }
    }

    /// Creates a map which reduces attributes to the provided keys, and assigns
    /// each distinct reduced set a compact id (in order of first appearance).
    ///
    /// Two edges share an edge type if and only if they have identical values
    /// under all `keys`.
    pub fn for_keys<I, S>(id: u32, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        let index = EdgeTypeIndex::default();
        Self::new(id, move |attributes| {
            let reduced: Attributes = attributes
                .iter()
                .filter(|(k, _)| keys.iter().any(|key| key == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            index.get_or_insert(reduced)
        })
    }

    /// Version stamp of this map.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Computes the edge type of an edge with given attributes.
    pub fn get(&self, attributes: &Attributes) -> u32 {
        (self.classify)(attributes)
    }

    /// True if `other` is a clone of this map, as opposed to a map which
    /// merely shares its id.
    pub fn is_same(&self, other: &EdgeTypeMap) -> bool {
        self.id == other.id
            && std::ptr::addr_eq(Arc::as_ptr(&self.classify), Arc::as_ptr(&other.classify))
    }
}

impl Default for EdgeTypeMap {
    /// The default map classifies all edges as type `0`.
    fn default() -> Self {
        Self::new(0, |_| 0)
    }
}

impl fmt::Debug for EdgeTypeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeTypeMap").field("id", &self.id).finish()
    }
}

/// Append-only interning table of attribute sets, shared by all clones
/// of an [EdgeTypeMap] built with [EdgeTypeMap::for_keys].
#[derive(Debug, Default)]
struct EdgeTypeIndex {
    ids: RwLock<HashMap<Attributes, u32>>,
}

impl EdgeTypeIndex {
    fn get_or_insert(&self, attributes: Attributes) -> u32 {
        if let Some(&id) = self.ids.read().get(&attributes) {
            return id;
        }

        let mut ids = self.ids.write();
        let next = ids.len() as u32;
        *ids.entry(attributes).or_insert(next)
    }
}
