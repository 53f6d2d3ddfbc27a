// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::RoutingNetwork;
use crate::tile::{TileError, NO_EDGE};
use crate::{Attributes, Coordinate, EdgeId, EdgeTypeMap, NetworkTile, VertexId};

/// Cursor over the edges of a [RoutingNetwork].
///
/// The cursor is either positioned at a vertex with
/// [move_to_vertex](RoutingNetworkEdgeEnumerator::move_to_vertex), after which
/// [move_next](RoutingNetworkEdgeEnumerator::move_next) walks through its edges,
/// or directly at a single edge with [move_to](RoutingNetworkEdgeEnumerator::move_to).
///
/// The enumerator holds on to the tile snapshot it's currently positioned in;
/// concurrent writes become visible after the next move.
#[derive(Debug, Clone)]
pub struct RoutingNetworkEdgeEnumerator<'a> {
    network: &'a RoutingNetwork,
    tile: Option<Arc<NetworkTile>>,
    vertex: u32,
    current: u32,
    next: u32,
    forward: bool,
}

impl<'a> RoutingNetworkEdgeEnumerator<'a> {
    pub(super) fn new(network: &'a RoutingNetwork) -> Self {
        Self {
            network,
            tile: None,
            vertex: u32::MAX,
            current: NO_EDGE,
            next: NO_EDGE,
            forward: false,
        }
    }

    pub fn network(&self) -> &'a RoutingNetwork {
        self.network
    }

    /// Positions the cursor before the first edge incident to the vertex.
    /// Returns false if the vertex doesn't exist.
    pub fn move_to_vertex(&mut self, vertex: VertexId) -> bool {
        self.current = NO_EDGE;
        self.next = NO_EDGE;

        let Some(tile) = self.load(vertex.tile_id) else {
            return false;
        };
        if !tile.has_vertex(vertex) {
            return false;
        }

        self.vertex = vertex.local_id;
        self.next = tile.first_edge(vertex.local_id);
        return true;
    }

    /// Positions the cursor directly at an edge, traversed forward
    /// (in the direction it was added) or backward.
    ///
    /// The cursor switches to the tile of the tail, so that it's possible
    /// to inspect turn costs at the tail. Further calls to `move_next`
    /// return false.
    pub fn move_to(&mut self, edge: EdgeId, forward: bool) -> bool {
        self.current = NO_EDGE;
        self.next = NO_EDGE;

        let Some(tile) = self.load(edge.tile_id) else {
            return false;
        };
        let Some(idx) = tile.find_edge(edge) else {
            return false;
        };

        let tail = tile.record_tail(idx, forward);
        let (tile, idx) = if tail.tile_id == tile.tile_id() {
            (tile, idx)
        } else {
            let Some(tile) = self.load(tail.tile_id) else {
                return false;
            };
            match tile.find_edge(edge) {
                Some(idx) => (tile, idx),
                None => return false,
            }
        };

        debug_assert_eq!(tile.record_tail(idx, forward), tail);
        self.vertex = tail.local_id;
        self.current = idx;
        self.forward = forward;
        return true;
    }

    /// Advances to the next edge incident to the vertex selected by `move_to_vertex`.
    pub fn move_next(&mut self) -> bool {
        let Some(tile) = &self.tile else {
            return false;
        };
        if self.next == NO_EDGE {
            self.current = NO_EDGE;
            return false;
        }

        self.current = self.next;
        let (forward, next) = tile.step(self.vertex, self.current);
        self.forward = forward;
        self.next = next;
        return true;
    }

    /// Restarts enumeration of the edges of the vertex selected by `move_to_vertex`.
    pub fn reset(&mut self) {
        if let Some(tile) = &self.tile {
            self.current = NO_EDGE;
            self.next = tile.first_edge(self.vertex);
        }
    }

    fn load(&mut self, tile_id: u32) -> Option<Arc<NetworkTile>> {
        self.tile = self.network.get_tile_for_read(tile_id);
        self.tile.clone()
    }

    fn tile(&self) -> &NetworkTile {
        // Accessors are only valid after a successful move, which sets the tile.
        self.tile
            .as_deref()
            .unwrap_or_else(|| panic!("edge enumerator is not positioned at an edge"))
    }

    pub fn edge_id(&self) -> EdgeId {
        self.tile().record_edge_id(self.current)
    }

    /// True if the current edge is traversed in the direction it was added.
    pub fn forward(&self) -> bool {
        self.forward
    }

    pub fn tail(&self) -> VertexId {
        self.tile().record_tail(self.current, self.forward)
    }

    pub fn head(&self) -> VertexId {
        self.tile().record_head(self.current, self.forward)
    }

    pub fn tail_location(&self) -> Option<Coordinate> {
        self.tile().get_vertex(self.tail())
    }

    /// Position of the head, which may require a lookup in another tile.
    pub fn head_location(&self) -> Option<Coordinate> {
        let head = self.head();
        self.tile()
            .get_vertex(head)
            .or_else(|| self.network.try_get_vertex(head))
    }

    /// Length of the edge in meters.
    pub fn length(&self) -> f64 {
        self.tile().record_length(self.current)
    }

    pub fn profile(&self) -> u32 {
        self.tile().record_profile(self.current)
    }

    pub fn edge_type_id(&self) -> u32 {
        self.tile().record_edge_type(self.current)
    }

    /// Id of the [EdgeTypeMap] which computed [edge_type_id](Self::edge_type_id).
    pub fn edge_type_map_id(&self) -> u32 {
        self.tile().edge_type_map_id()
    }

    /// The [EdgeTypeMap] which computed [edge_type_id](Self::edge_type_id).
    pub fn edge_type_map(&self) -> &EdgeTypeMap {
        self.tile().edge_type_map()
    }

    pub fn attributes(&self) -> &Attributes {
        self.tile().record_attributes(self.current)
    }

    /// Intermediate points of the edge, ordered from tail to head.
    pub fn shape(&self) -> Result<Vec<Coordinate>, TileError> {
        self.tile().record_shape(self.current, self.forward)
    }

    pub fn tail_order(&self) -> Option<u8> {
        self.tile()
            .record_tail_order(self.current, self.forward)
    }

    /// Turn order of the current edge at its head.
    ///
    /// Orders of a vertex are kept on the copy of the edge in the vertex's
    /// own tile, so a head in another tile is looked up there.
    pub fn head_order(&self) -> Option<u8> {
        let tile = self.tile();
        let head = tile.record_head(self.current, self.forward);
        if head.tile_id == tile.tile_id() {
            return tile.record_head_order(self.current, self.forward);
        }

        let head_tile = self.network.get_tile_for_read(head.tile_id)?;
        let idx = head_tile.find_edge(tile.record_edge_id(self.current))?;
        head_tile.record_head_order(idx, self.forward)
    }

    /// Turn costs for arriving at the tail over an edge with `from_order`
    /// and departing over the current edge.
    pub fn turn_cost_to_tail(&self, from_order: u8) -> Vec<(&Attributes, u32)> {
        self.tile()
            .record_turn_costs_to_tail(self.current, self.forward, from_order)
    }
}

/// Iterator over vertices of a set of tiles of a [RoutingNetwork].
#[derive(Debug)]
pub struct RoutingNetworkVertexEnumerator<'a> {
    network: &'a RoutingNetwork,
    tile_ids: std::vec::IntoIter<u32>,
    tile: Option<Arc<NetworkTile>>,
    next_local_id: u32,
}

impl<'a> RoutingNetworkVertexEnumerator<'a> {
    pub(super) fn new(network: &'a RoutingNetwork, tile_ids: Vec<u32>) -> Self {
        Self {
            network,
            tile_ids: tile_ids.into_iter(),
            tile: None,
            next_local_id: 0,
        }
    }
}

impl Iterator for RoutingNetworkVertexEnumerator<'_> {
    type Item = VertexId;

    fn next(&mut self) -> Option<VertexId> {
        loop {
            if let Some(tile) = &self.tile {
                if self.next_local_id < tile.vertex_count() {
                    let vertex = VertexId::new(tile.tile_id(), self.next_local_id);
                    self.next_local_id += 1;
                    return Some(vertex);
                }
            }

            let tile_id = self.tile_ids.next()?;
            self.tile = self.network.get_tile_for_read(tile_id);
            self.next_local_id = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EdgeDetails, NetworkOptions};

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr) => {
            assert!(
                (($a - $b).abs() < 1e-4),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    #[test]
    fn move_to_switches_to_tail_tile() {
        let network = RoutingNetwork::new(NetworkOptions::default()).unwrap();
        let (a, b, edge) = {
            let mut writer = network.writer().unwrap();
            let a = writer.add_vertex(0.0100, 0.0010, None).unwrap();
            let b = writer.add_vertex(0.0300, 0.0020, None).unwrap();
            let details = EdgeDetails {
                shape: vec![Coordinate::new(0.0200, 0.0015)],
                ..EdgeDetails::default()
            };
            (a, b, writer.add_edge(a, b, &details).unwrap())
        };

        let mut e = network.edge_enumerator();
        assert!(e.move_to(edge, false));
        assert_eq!(e.tail(), b);
        assert_eq!(e.head(), a);
        assert!(!e.forward());
        assert!(!e.move_next());

        assert!(e.move_to(edge, false));
        assert_almost_eq!(e.tail_location().unwrap().lon, 0.0300);
        assert_almost_eq!(e.head_location().unwrap().lon, 0.0100);
        assert_eq!(e.shape().unwrap(), vec![Coordinate::new(0.0200, 0.0015)]);

        assert!(e.move_to(edge, true));
        assert_eq!(e.tail(), a);
        assert_almost_eq!(e.head_location().unwrap().lat, 0.0020);

        assert!(!e.move_to(EdgeId::new(a.tile_id, 5), true));
        assert!(!e.move_to_vertex(VertexId::new(a.tile_id, 5)));
    }

    #[test]
    fn shapes_are_symmetric() {
        let network = RoutingNetwork::new(NetworkOptions::default()).unwrap();
        let edge = {
            let mut writer = network.writer().unwrap();
            let a = writer.add_vertex(0.0, 0.0, None).unwrap();
            let b = writer.add_vertex(0.0, 0.003, None).unwrap();
            let details = EdgeDetails {
                shape: vec![Coordinate::new(0.0001, 0.001), Coordinate::new(0.0002, 0.002)],
                ..EdgeDetails::default()
            };
            writer.add_edge(a, b, &details).unwrap()
        };

        let mut e = network.edge_enumerator();
        assert!(e.move_to(edge, true));
        let forward = e.shape().unwrap();
        assert!(e.move_to(edge, false));
        let mut backward = e.shape().unwrap();
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn reset_restarts_enumeration() {
        let network = RoutingNetwork::new(NetworkOptions::default()).unwrap();
        let a = {
            let mut writer = network.writer().unwrap();
            let a = writer.add_vertex(0.0, 0.0, None).unwrap();
            let b = writer.add_vertex(0.0, 0.001, None).unwrap();
            let c = writer.add_vertex(0.001, 0.0, None).unwrap();
            writer.add_edge(a, b, &EdgeDetails::default()).unwrap();
            writer.add_edge(c, a, &EdgeDetails::default()).unwrap();
            a
        };

        let mut e = network.edge_enumerator();
        assert!(e.move_to_vertex(a));
        assert!(e.move_next());
        assert!(e.move_next());
        assert!(!e.move_next());

        e.reset();
        assert!(e.move_next());
        assert!(e.forward());
        assert!(e.move_next());
        assert!(!e.forward());
    }

    #[test]
    fn head_order_is_read_from_the_head_tile() {
        let network = RoutingNetwork::new(NetworkOptions::default()).unwrap();
        let (wc, cn) = {
            let mut writer = network.writer().unwrap();
            let west = writer.add_vertex(0.0100, 0.0010, None).unwrap();
            let center = writer.add_vertex(0.0300, 0.0010, None).unwrap();
            let north = writer.add_vertex(0.0300, 0.0020, None).unwrap();
            let wc = writer.add_edge(west, center, &EdgeDetails::default()).unwrap();
            let cn = writer.add_edge(center, north, &EdgeDetails::default()).unwrap();
            writer
                .add_turn_costs(center, &Attributes::new(), &[wc, cn], &[0, 0, 0, 0])
                .unwrap();
            (wc, cn)
        };
        assert!(wc.is_cross());

        let mut e = network.edge_enumerator();
        assert!(e.move_to(wc, true));
        assert_eq!(e.tail_order(), None);
        assert_eq!(e.head_order(), Some(0));

        assert!(e.move_to(wc, false));
        assert_eq!(e.tail_order(), Some(0));
        assert_eq!(e.head_order(), None);

        assert!(e.move_to(cn, false));
        assert_eq!(e.head_order(), Some(1));
    }

    #[test]
    fn moves_pick_up_new_tile_versions() {
        let network = RoutingNetwork::new(NetworkOptions::default()).unwrap();
        let (a, edge) = {
            let mut writer = network.writer().unwrap();
            let a = writer.add_vertex(0.002, 0.002, None).unwrap();
            let b = writer.add_vertex(0.002, 0.003, None).unwrap();
            (a, writer.add_edge(a, b, &EdgeDetails::default()).unwrap())
        };

        let mut e = network.edge_enumerator();
        assert!(e.move_to(edge, true));
        assert_eq!(e.edge_type_id(), 0);

        network.set_edge_type_map(EdgeTypeMap::new(1, |_| 9));
        {
            let mut writer = network.writer().unwrap();
            let c = writer.add_vertex(0.003, 0.002, None).unwrap();
            writer.add_edge(a, c, &EdgeDetails::default()).unwrap();
        }

        assert!(e.move_to(edge, true));
        assert_eq!(e.edge_type_id(), 9);
        assert_eq!(e.edge_type_map_id(), 1);

        assert!(e.move_to_vertex(a));
        let mut count = 0;
        while e.move_next() {
            count += 1;
        }
        assert_eq!(count, 2);
    }
}
