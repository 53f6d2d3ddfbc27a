// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Identifies a vertex of a [RoutingNetwork](crate::RoutingNetwork):
/// the [tile](crate::tiles) it lives in, and its index within that tile.
///
/// Local ids are assigned by the tile in insertion order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId {
    pub tile_id: u32,
    pub local_id: u32,
}

impl VertexId {
    /// Sentinel value, not referring to any vertex.
    pub const EMPTY: Self = Self {
        tile_id: u32::MAX,
        local_id: u32::MAX,
    };

    pub const fn new(tile_id: u32, local_id: u32) -> Self {
        Self { tile_id, local_id }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Packs the id into a single integer: tile id in the high 32 bits,
    /// local id in the low 32 bits.
    pub fn encode(&self) -> u64 {
        ((self.tile_id as u64) << 32) | self.local_id as u64
    }

    /// Inverse of [VertexId::encode].
    pub fn decode(encoded: u64) -> Self {
        Self {
            tile_id: (encoded >> 32) as u32,
            local_id: encoded as u32,
        }
    }
}

impl std::fmt::Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.tile_id, self.local_id)
    }
}

/// Identifies an edge of a [RoutingNetwork](crate::RoutingNetwork).
///
/// Local ids below [EdgeId::MIN_CROSS_ID] refer to edges with both endpoints
/// in `tile_id`. Ids at or above it refer to cross-tile edges; such an edge is
/// stored in both endpoint tiles under the very same `EdgeId`, with `tile_id`
/// being the tile of its first vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId {
    pub tile_id: u32,
    pub local_id: u32,
}

impl EdgeId {
    /// Largest local id usable by an edge contained in a single tile.
    pub const MAX_LOCAL_ID: u32 = (u32::MAX / 2) - 1;

    /// First local id of the cross-tile range.
    pub const MIN_CROSS_ID: u32 = Self::MAX_LOCAL_ID + 1;

    /// Sentinel value, not referring to any edge.
    pub const EMPTY: Self = Self {
        tile_id: u32::MAX,
        local_id: u32::MAX,
    };

    pub const fn new(tile_id: u32, local_id: u32) -> Self {
        Self { tile_id, local_id }
    }

    /// Creates the id of the `local_id`-th cross-tile edge allocated by `tile_id`.
    pub const fn cross_edge_id(tile_id: u32, local_id: u32) -> Self {
        Self {
            tile_id,
            local_id: local_id + Self::MIN_CROSS_ID,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn is_cross(&self) -> bool {
        !self.is_empty() && self.local_id >= Self::MIN_CROSS_ID
    }

    /// Packs the id into a single integer: tile id in the high 32 bits,
    /// local id in the low 32 bits.
    pub fn encode(&self) -> u64 {
        ((self.tile_id as u64) << 32) | self.local_id as u64
    }

    /// Inverse of [EdgeId::encode].
    pub fn decode(encoded: u64) -> Self {
        Self {
            tile_id: (encoded >> 32) as u32,
            local_id: encoded as u32,
        }
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_cross() {
            write!(f, "{}/x{}", self.tile_id, self.local_id - Self::MIN_CROSS_ID)
        } else {
            write!(f, "{}/{}", self.tile_id, self.local_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_id_encoding() {
        let v = VertexId::new(0x0102_0304, 7);
        assert_eq!(v.encode(), 0x0102_0304_0000_0007);
        assert_eq!(VertexId::decode(v.encode()), v);
        assert!(VertexId::EMPTY.is_empty());
        assert!(!v.is_empty());
    }

    #[test]
    fn edge_id_ranges() {
        let local = EdgeId::new(12, EdgeId::MAX_LOCAL_ID);
        assert!(!local.is_cross());

        let cross = EdgeId::cross_edge_id(12, 0);
        assert!(cross.is_cross());
        assert_eq!(cross.local_id, EdgeId::MIN_CROSS_ID);
        assert_eq!(EdgeId::decode(cross.encode()), cross);
        assert_eq!(cross.to_string(), "12/x0");

        assert!(!EdgeId::EMPTY.is_cross());
    }
}
