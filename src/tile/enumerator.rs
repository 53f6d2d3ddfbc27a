// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{NetworkTile, TileError, NO_EDGE};
use crate::{Attributes, Coordinate, EdgeId, VertexId};

/// Cursor over the edges incident to a vertex of a single [NetworkTile].
///
/// Call [move_to](NetworkTileEnumerator::move_to) to select a vertex, and then
/// [move_next](NetworkTileEnumerator::move_next) to advance to its edges. Edge
/// properties are only valid after `move_next` returned true.
///
/// Edges are reported as seen from the selected vertex: it is always the tail,
/// and [forward](NetworkTileEnumerator::forward) tells whether the edge is
/// traversed in the direction it was added in.
#[derive(Debug, Clone)]
pub struct NetworkTileEnumerator<'t> {
    tile: &'t NetworkTile,
    vertex: u32,
    current: u32,
    next: u32,
    forward: bool,
}

impl<'t> NetworkTileEnumerator<'t> {
    pub(super) fn new(tile: &'t NetworkTile) -> Self {
        Self {
            tile,
            vertex: u32::MAX,
            current: NO_EDGE,
            next: NO_EDGE,
            forward: false,
        }
    }

    /// Selects the vertex whose edges will be enumerated.
    /// Returns false if the vertex doesn't belong to the tile.
    pub fn move_to(&mut self, vertex: VertexId) -> bool {
        if !self.tile.has_vertex(vertex) {
            self.vertex = u32::MAX;
            self.current = NO_EDGE;
            self.next = NO_EDGE;
            return false;
        }

        self.vertex = vertex.local_id;
        self.current = NO_EDGE;
        self.next = self.tile.first_edge(vertex.local_id);
        return true;
    }

    /// Advances to the next edge incident to the selected vertex.
    pub fn move_next(&mut self) -> bool {
        if self.next == NO_EDGE {
            self.current = NO_EDGE;
            return false;
        }

        self.current = self.next;
        let (forward, next) = self.tile.step(self.vertex, self.current);
        self.forward = forward;
        self.next = next;
        return true;
    }

    /// Restarts enumeration of the edges of the selected vertex.
    pub fn reset(&mut self) {
        if self.vertex != u32::MAX {
            self.current = NO_EDGE;
            self.next = self.tile.first_edge(self.vertex);
        }
    }

    pub fn tile(&self) -> &'t NetworkTile {
        self.tile
    }

    pub fn edge_id(&self) -> EdgeId {
        self.tile.record_edge_id(self.current)
    }

    pub fn forward(&self) -> bool {
        self.forward
    }

    pub fn tail(&self) -> VertexId {
        self.tile.record_tail(self.current, self.forward)
    }

    pub fn head(&self) -> VertexId {
        self.tile.record_head(self.current, self.forward)
    }

    /// Length of the edge, in meters.
    pub fn length(&self) -> f64 {
        self.tile.record_length(self.current)
    }

    pub fn profile(&self) -> u32 {
        self.tile.record_profile(self.current)
    }

    pub fn edge_type_id(&self) -> u32 {
        self.tile.record_edge_type(self.current)
    }

    pub fn attributes(&self) -> &'t Attributes {
        self.tile.record_attributes(self.current)
    }

    /// Intermediate points of the edge, ordered from tail to head.
    pub fn shape(&self) -> Result<Vec<Coordinate>, TileError> {
        self.tile.record_shape(self.current, self.forward)
    }

    pub fn tail_order(&self) -> Option<u8> {
        self.tile.record_tail_order(self.current, self.forward)
    }

    pub fn head_order(&self) -> Option<u8> {
        self.tile.record_head_order(self.current, self.forward)
    }

    /// Costs of arriving at the tail over an edge with `from_order`,
    /// and continuing over this edge.
    pub fn turn_cost_to_tail(&self, from_order: u8) -> Vec<(&'t Attributes, u32)> {
        self.tile
            .record_turn_costs_to_tail(self.current, self.forward, from_order)
    }
}
