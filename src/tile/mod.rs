// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use crate::{Attributes, Coordinate, EdgeId, EdgeTypeMap, VertexId};

mod enumerator;
mod shape;
mod turn_costs;

pub use enumerator::NetworkTileEnumerator;
pub use turn_costs::TURN_PROHIBITED;

/// Number of distinct edge profiles which can be stored in a tile.
pub const MAX_PROFILE_COUNT: u32 = 1 << 14;

/// Largest storable edge length, in meters.
pub const MAX_DISTANCE: f64 = (u32::MAX >> 14) as f64 / 10.0;

/// Marks the end of an adjacency list.
pub(crate) const NO_EDGE: u32 = u32::MAX;

const NO_SHAPE: u32 = u32::MAX;

/// Error conditions arising from misuse of a [NetworkTile].
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("distance out of range: {0} (max {MAX_DISTANCE})")]
    DistanceOutOfRange(f64),

    #[error("profile out of range: {0} (max {max})", max = MAX_PROFILE_COUNT - 1)]
    ProfileOutOfRange(u32),

    #[error("at least one vertex has to be local to tile {tile_id}: {vertex1} - {vertex2}")]
    NoLocalVertex {
        tile_id: u32,
        vertex1: VertexId,
        vertex2: VertexId,
    },

    #[error("edge can't start and end at the same vertex {0}")]
    SelfLoop(VertexId),

    #[error("vertex {0} does not exist")]
    VertexNotFound(VertexId),

    #[error("edge {0} does not exist")]
    EdgeNotFound(EdgeId),

    #[error("edge {edge} is not incident to vertex {vertex}")]
    EdgeNotIncident { edge: EdgeId, vertex: VertexId },

    #[error("tile {0} can't hold more edges")]
    TooManyEdges(u32),

    #[error("turn cost matrix for {edges} edges needs {} entries, got {got}", .edges * .edges)]
    InvalidTurnCostMatrix { edges: usize, got: usize },

    #[error("vertex {0} has too many turn orders")]
    TooManyTurnOrders(VertexId),

    #[error("corrupt shape data: {0}")]
    Shape(#[from] protobuf::Error),
}

/// Endpoint of an edge as seen by a tile. External vertices are stored once
/// per tile, in [NetworkTile::external_vertices].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VertexSlot {
    Local(u32),
    External(u32),
}

#[derive(Debug, Clone)]
struct EdgeRecord {
    id: EdgeId,
    vertex1: VertexSlot,
    vertex2: VertexSlot,

    /// Next edge in the adjacency list of vertex1 (if local).
    next1: u32,

    /// Next edge in the adjacency list of vertex2 (if local).
    next2: u32,

    /// `profile | (decimeters << 14)`, see [pack_data].
    data: u32,

    attributes: u32,
    edge_type: u32,
    shape: u32,

    /// Turn order at vertex1 and vertex2, respectively.
    order1: Option<u8>,
    order2: Option<u8>,

    removed: bool,
}

impl EdgeRecord {
    fn next_at(&self, vertex: u32) -> u32 {
        if self.vertex1 == VertexSlot::Local(vertex) {
            self.next1
        } else {
            debug_assert_eq!(self.vertex2, VertexSlot::Local(vertex));
            self.next2
        }
    }

    fn set_next_at(&mut self, vertex: u32, next: u32) {
        if self.vertex1 == VertexSlot::Local(vertex) {
            self.next1 = next;
        } else {
            debug_assert_eq!(self.vertex2, VertexSlot::Local(vertex));
            self.next2 = next;
        }
    }
}

/// Packs an edge length and profile into a single word.
fn pack_data(distance: f64, profile: u32) -> Result<u32, TileError> {
    if !(0.0..=MAX_DISTANCE).contains(&distance) {
        return Err(TileError::DistanceOutOfRange(distance));
    }
    if profile >= MAX_PROFILE_COUNT {
        return Err(TileError::ProfileOutOfRange(profile));
    }

    let decimeters = (distance * 10.0).round() as u32;
    Ok(profile | (decimeters << 14))
}

fn unpack_data(data: u32) -> (f64, u32) {
    ((data >> 14) as f64 / 10.0, data & (MAX_PROFILE_COUNT - 1))
}

fn to_fixed(degrees: f64) -> i32 {
    (degrees * 1e7).round() as i32
}

fn from_fixed(fixed: i32) -> f64 {
    fixed as f64 / 1e7
}

/// Geometry, attributes and profile of a new edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeDetails {
    /// Intermediate points between the two vertices.
    pub shape: Vec<Coordinate>,

    pub attributes: Attributes,

    /// Length of the edge in meters. When `None`, the
    /// [RoutingNetwork](crate::RoutingNetwork) computes it from the geometry.
    pub distance: Option<f64>,

    /// Small numeric classification of the edge, below [MAX_PROFILE_COUNT].
    pub profile: u32,
}

/// NetworkTile stores the part of the routing graph contained in a single tile:
/// vertices, edges incident to them, their shapes, attributes and turn costs.
///
/// Vertices are append-only. Every local vertex heads a singly-linked list of
/// incident edges, threaded through the edge records: each record carries
/// one "next" pointer per endpoint. Edges to vertices in other tiles refer
/// to those through an interned table of external vertices; such edges are
/// stored in both tiles, see [EdgeId].
#[derive(Debug, Clone)]
pub struct NetworkTile {
    tile_id: u32,
    zoom: u32,
    edge_type_map: EdgeTypeMap,

    coordinates: Vec<[i32; 2]>,
    elevations: Vec<Option<f32>>,
    heads: Vec<u32>,

    external_vertices: Vec<VertexId>,
    external_index: HashMap<VertexId, u32>,

    edges: Vec<EdgeRecord>,
    cross_edges: HashMap<EdgeId, u32>,
    next_cross_id: u32,

    shapes: Vec<u8>,
    attribute_sets: Vec<Attributes>,
    attribute_index: HashMap<Attributes, u32>,
    turn_costs: turn_costs::TurnCosts,
}

impl NetworkTile {
    /// Creates an empty tile.
    pub fn new(tile_id: u32, zoom: u32, edge_type_map: EdgeTypeMap) -> Self {
        Self {
            tile_id,
            zoom,
            edge_type_map,
            coordinates: Vec::new(),
            elevations: Vec::new(),
            heads: Vec::new(),
            external_vertices: Vec::new(),
            external_index: HashMap::new(),
            edges: Vec::new(),
            cross_edges: HashMap::new(),
            next_cross_id: 0,
            shapes: Vec::new(),
            attribute_sets: Vec::new(),
            attribute_index: HashMap::new(),
            turn_costs: turn_costs::TurnCosts::default(),
        }
    }

    pub fn tile_id(&self) -> u32 {
        self.tile_id
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    /// Id of the [EdgeTypeMap] which computed the cached edge types.
    pub fn edge_type_map_id(&self) -> u32 {
        self.edge_type_map.id()
    }

    pub fn edge_type_map(&self) -> &EdgeTypeMap {
        &self.edge_type_map
    }

    pub fn vertex_count(&self) -> u32 {
        self.coordinates.len() as u32
    }

    /// Number of edge records, including removed edges.
    pub fn edge_record_count(&self) -> u32 {
        self.edges.len() as u32
    }

    /// Appends a new vertex and returns its id. Local ids are assigned sequentially.
    pub fn add_vertex(&mut self, lon: f64, lat: f64, elevation: Option<f32>) -> VertexId {
        let local_id = self.coordinates.len() as u32;
        self.coordinates.push([to_fixed(lon), to_fixed(lat)]);
        self.elevations.push(elevation);
        self.heads.push(NO_EDGE);
        VertexId::new(self.tile_id, local_id)
    }

    pub fn has_vertex(&self, vertex: VertexId) -> bool {
        vertex.tile_id == self.tile_id && vertex.local_id < self.vertex_count()
    }

    /// Returns the position of a local vertex.
    pub fn get_vertex(&self, vertex: VertexId) -> Option<Coordinate> {
        if !self.has_vertex(vertex) {
            return None;
        }
        let idx = vertex.local_id as usize;
        let [lon, lat] = self.coordinates[idx];
        Some(Coordinate {
            lon: from_fixed(lon),
            lat: from_fixed(lat),
            elevation: self.elevations[idx],
        })
    }

    /// Adds an edge between two vertices, at least one of which must belong to this tile.
    ///
    /// `distance` is the length of the edge in meters; `details.distance` is ignored.
    ///
    /// Edges between two local vertices get a local id. Edges to other tiles get
    /// a cross-tile id: newly allocated by this tile if `edge_id` is `None`,
    /// otherwise `edge_id` is used verbatim (this is how the second copy of a
    /// cross-tile edge shares the id of the first one).
    pub fn add_edge(
        &mut self,
        vertex1: VertexId,
        vertex2: VertexId,
        distance: f64,
        details: &EdgeDetails,
        edge_id: Option<EdgeId>,
    ) -> Result<EdgeId, TileError> {
        let local1 = vertex1.tile_id == self.tile_id;
        let local2 = vertex2.tile_id == self.tile_id;
        if !local1 && !local2 {
            return Err(TileError::NoLocalVertex {
                tile_id: self.tile_id,
                vertex1,
                vertex2,
            });
        }
        if vertex1 == vertex2 {
            return Err(TileError::SelfLoop(vertex1));
        }
        for (vertex, local) in [(vertex1, local1), (vertex2, local2)] {
            if local && !self.has_vertex(vertex) {
                return Err(TileError::VertexNotFound(vertex));
            }
        }

        let data = pack_data(distance, details.profile)?;
        let idx = self.edges.len() as u32;

        let id = match edge_id {
            Some(id) => id,
            None if local1 && local2 => {
                if idx > EdgeId::MAX_LOCAL_ID {
                    return Err(TileError::TooManyEdges(self.tile_id));
                }
                EdgeId::new(self.tile_id, idx)
            }
            None => {
                if self.next_cross_id > EdgeId::MAX_LOCAL_ID {
                    return Err(TileError::TooManyEdges(self.tile_id));
                }
                let id = EdgeId::cross_edge_id(self.tile_id, self.next_cross_id);
                self.next_cross_id += 1;
                id
            }
        };

        let shape = if details.shape.is_empty() {
            NO_SHAPE
        } else {
            let offset = self.shapes.len() as u32;
            shape::encode(&details.shape, &mut self.shapes)?;
            offset
        };

        let attributes = self.intern_attributes(&details.attributes);
        let edge_type = self.edge_type_map.get(&details.attributes);

        let slot1 = self.slot_for(vertex1);
        let slot2 = self.slot_for(vertex2);

        self.edges.push(EdgeRecord {
            id,
            vertex1: slot1,
            vertex2: slot2,
            next1: NO_EDGE,
            next2: NO_EDGE,
            data,
            attributes,
            edge_type,
            shape,
            order1: None,
            order2: None,
            removed: false,
        });
        if id.is_cross() {
            self.cross_edges.insert(id, idx);
        }

        if let VertexSlot::Local(v) = slot1 {
            self.link(v, idx);
        }
        if let VertexSlot::Local(v) = slot2 {
            self.link(v, idx);
        }

        return Ok(id);
    }

    /// Unlinks an edge from the adjacency lists of its local vertices.
    /// The id of a removed edge is never reused.
    pub fn remove_edge(&mut self, edge_id: EdgeId) -> Result<(), TileError> {
        let idx = self
            .find_edge(edge_id)
            .ok_or(TileError::EdgeNotFound(edge_id))?;

        let slots = {
            let record = &self.edges[idx as usize];
            [record.vertex1, record.vertex2]
        };
        for slot in slots {
            if let VertexSlot::Local(v) = slot {
                self.unlink(v, idx);
            }
        }

        self.edges[idx as usize].removed = true;
        Ok(())
    }

    /// Appends `idx` to the end of the adjacency list of `vertex`.
    fn link(&mut self, vertex: u32, idx: u32) {
        let mut current = self.heads[vertex as usize];
        if current == NO_EDGE {
            self.heads[vertex as usize] = idx;
            return;
        }

        loop {
            let next = self.edges[current as usize].next_at(vertex);
            if next == NO_EDGE {
                self.edges[current as usize].set_next_at(vertex, idx);
                return;
            }
            current = next;
        }
    }

    fn unlink(&mut self, vertex: u32, idx: u32) {
        let after = self.edges[idx as usize].next_at(vertex);

        let mut current = self.heads[vertex as usize];
        if current == idx {
            self.heads[vertex as usize] = after;
            return;
        }

        while current != NO_EDGE {
            let next = self.edges[current as usize].next_at(vertex);
            if next == idx {
                self.edges[current as usize].set_next_at(vertex, after);
                return;
            }
            current = next;
        }
    }

    fn slot_for(&mut self, vertex: VertexId) -> VertexSlot {
        if vertex.tile_id == self.tile_id {
            return VertexSlot::Local(vertex.local_id);
        }

        let next = self.external_vertices.len() as u32;
        let idx = *self.external_index.entry(vertex).or_insert(next);
        if idx == next {
            self.external_vertices.push(vertex);
        }
        VertexSlot::External(idx)
    }

    fn resolve(&self, slot: VertexSlot) -> VertexId {
        match slot {
            VertexSlot::Local(local_id) => VertexId::new(self.tile_id, local_id),
            VertexSlot::External(idx) => self.external_vertices[idx as usize],
        }
    }

    fn intern_attributes(&mut self, attributes: &Attributes) -> u32 {
        if let Some(&idx) = self.attribute_index.get(attributes) {
            return idx;
        }
        let idx = self.attribute_sets.len() as u32;
        self.attribute_sets.push(attributes.clone());
        self.attribute_index.insert(attributes.clone(), idx);
        idx
    }

    /// Finds the record of a (not removed) edge stored in this tile.
    pub(crate) fn find_edge(&self, edge_id: EdgeId) -> Option<u32> {
        let idx = if edge_id.is_cross() {
            *self.cross_edges.get(&edge_id)?
        } else if edge_id.tile_id == self.tile_id {
            edge_id.local_id
        } else {
            return None;
        };

        match self.edges.get(idx as usize) {
            Some(record) if !record.removed && record.id == edge_id => Some(idx),
            _ => None,
        }
    }

    /// Attaches a table of turn costs to a vertex.
    ///
    /// `costs` is a row-major square matrix: `costs[i * edges.len() + j]` is the cost
    /// of arriving over `edges[i]` and departing over `edges[j]`.
    /// [TURN_PROHIBITED] marks prohibited turns.
    ///
    /// Every edge gets a turn order at `vertex` (if it doesn't have one already),
    /// later exposed by the enumerators.
    pub fn add_turn_costs(
        &mut self,
        vertex: VertexId,
        attributes: &Attributes,
        edges: &[EdgeId],
        costs: &[u32],
    ) -> Result<(), TileError> {
        if !self.has_vertex(vertex) {
            return Err(TileError::VertexNotFound(vertex));
        }
        if costs.len() != edges.len() * edges.len() {
            return Err(TileError::InvalidTurnCostMatrix {
                edges: edges.len(),
                got: costs.len(),
            });
        }

        let v = vertex.local_id;
        let mut records = Vec::with_capacity(edges.len());
        for &edge in edges {
            let idx = self.find_edge(edge).ok_or(TileError::EdgeNotFound(edge))?;
            let record = &self.edges[idx as usize];
            let first = if record.vertex1 == VertexSlot::Local(v) {
                true
            } else if record.vertex2 == VertexSlot::Local(v) {
                false
            } else {
                return Err(TileError::EdgeNotIncident { edge, vertex });
            };
            records.push((idx, first));
        }

        let mut next_order = self.max_turn_order(v).map_or(0u16, |o| o as u16 + 1);
        let mut orders = Vec::with_capacity(edges.len());
        for (idx, first) in records {
            let record = &mut self.edges[idx as usize];
            let slot = if first {
                &mut record.order1
            } else {
                &mut record.order2
            };

            let order = match *slot {
                Some(order) => order,
                None => {
                    if next_order > u8::MAX as u16 {
                        return Err(TileError::TooManyTurnOrders(vertex));
                    }
                    let order = next_order as u8;
                    next_order += 1;
                    *slot = Some(order);
                    order
                }
            };
            orders.push(order);
        }

        let attributes = self.intern_attributes(attributes);
        self.turn_costs.add(v, attributes, orders, costs.to_vec());
        Ok(())
    }

    fn max_turn_order(&self, vertex: u32) -> Option<u8> {
        let mut max = None;
        let mut current = self.heads[vertex as usize];
        while current != NO_EDGE {
            let record = &self.edges[current as usize];
            let order = if record.vertex1 == VertexSlot::Local(vertex) {
                record.order1
            } else {
                record.order2
            };
            max = max.max(order);
            current = record.next_at(vertex);
        }
        return max;
    }

    /// Returns a copy of this tile with edge types re-computed by another map.
    pub fn clone_for_edge_type_map(&self, edge_type_map: &EdgeTypeMap) -> Self {
        let mut tile = self.clone();
        for record in tile.edges.iter_mut() {
            record.edge_type = edge_type_map.get(&tile.attribute_sets[record.attributes as usize]);
        }
        tile.edge_type_map = edge_type_map.clone();
        return tile;
    }

    /// Returns a cursor over the edges of this tile, positioned nowhere.
    pub fn enumerator(&self) -> NetworkTileEnumerator<'_> {
        NetworkTileEnumerator::new(self)
    }

    /// Iterates over ids of all vertices of this tile.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.vertex_count()).map(|local_id| VertexId::new(self.tile_id, local_id))
    }

    // Record accessors shared by the tile and network enumerators.
    // `forward` tells whether the record is traversed from vertex1 to vertex2.

    pub(crate) fn first_edge(&self, local_vertex: u32) -> u32 {
        self.heads
            .get(local_vertex as usize)
            .copied()
            .unwrap_or(NO_EDGE)
    }

    /// Returns whether `local_vertex` is vertex1 of the record, and the next record
    /// in its adjacency list.
    pub(crate) fn step(&self, local_vertex: u32, idx: u32) -> (bool, u32) {
        let record = &self.edges[idx as usize];
        let forward = record.vertex1 == VertexSlot::Local(local_vertex);
        (forward, record.next_at(local_vertex))
    }

    pub(crate) fn record_edge_id(&self, idx: u32) -> EdgeId {
        self.edges[idx as usize].id
    }

    pub(crate) fn record_tail(&self, idx: u32, forward: bool) -> VertexId {
        let record = &self.edges[idx as usize];
        self.resolve(if forward { record.vertex1 } else { record.vertex2 })
    }

    pub(crate) fn record_head(&self, idx: u32, forward: bool) -> VertexId {
        let record = &self.edges[idx as usize];
        self.resolve(if forward { record.vertex2 } else { record.vertex1 })
    }

    pub(crate) fn record_tail_order(&self, idx: u32, forward: bool) -> Option<u8> {
        let record = &self.edges[idx as usize];
        if forward {
            record.order1
        } else {
            record.order2
        }
    }

    pub(crate) fn record_head_order(&self, idx: u32, forward: bool) -> Option<u8> {
        self.record_tail_order(idx, !forward)
    }

    pub(crate) fn record_length(&self, idx: u32) -> f64 {
        unpack_data(self.edges[idx as usize].data).0
    }

    pub(crate) fn record_profile(&self, idx: u32) -> u32 {
        unpack_data(self.edges[idx as usize].data).1
    }

    pub(crate) fn record_edge_type(&self, idx: u32) -> u32 {
        self.edges[idx as usize].edge_type
    }

    pub(crate) fn record_attributes(&self, idx: u32) -> &Attributes {
        &self.attribute_sets[self.edges[idx as usize].attributes as usize]
    }

    /// Decodes the shape of the record, in the direction of traversal.
    pub(crate) fn record_shape(&self, idx: u32, forward: bool) -> Result<Vec<Coordinate>, TileError> {
        let offset = self.edges[idx as usize].shape;
        if offset == NO_SHAPE {
            return Ok(Vec::new());
        }

        let mut points = shape::decode(&self.shapes[offset as usize..])?;
        if !forward {
            points.reverse();
        }
        Ok(points)
    }

    /// Returns the turn costs for arriving at the tail of the record over
    /// an edge with `from_order` and departing over the record.
    pub(crate) fn record_turn_costs_to_tail(
        &self,
        idx: u32,
        forward: bool,
        from_order: u8,
    ) -> Vec<(&Attributes, u32)> {
        let (VertexSlot::Local(vertex), Some(to_order)) = (
            self.tail_slot(idx, forward),
            self.record_tail_order(idx, forward),
        ) else {
            return Vec::new();
        };

        self.turn_costs
            .get(vertex, from_order, to_order)
            .map(|(attributes, cost)| (&self.attribute_sets[attributes as usize], cost))
            .collect()
    }

    fn tail_slot(&self, idx: u32, forward: bool) -> VertexSlot {
        let record = &self.edges[idx as usize];
        if forward {
            record.vertex1
        } else {
            record.vertex2
        }
    }

    /// Returns true if any turn cost table is attached to the local vertex.
    pub fn has_turn_costs(&self, vertex: VertexId) -> bool {
        self.has_vertex(vertex) && self.turn_costs.has_tables(vertex.local_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes;

    fn details() -> EdgeDetails {
        EdgeDetails::default()
    }

    #[test]
    fn vertices_get_sequential_ids() {
        let mut tile = NetworkTile::new(5, 14, EdgeTypeMap::default());
        let a = tile.add_vertex(4.1, 51.2, None);
        let b = tile.add_vertex(4.2, 51.3, Some(12.5));

        assert_eq!(a, VertexId::new(5, 0));
        assert_eq!(b, VertexId::new(5, 1));

        let b_location = tile.get_vertex(b).unwrap();
        assert!((b_location.lon - 4.2).abs() < 1e-7);
        assert!((b_location.lat - 51.3).abs() < 1e-7);
        assert_eq!(b_location.elevation, Some(12.5));

        assert!(tile.get_vertex(VertexId::new(5, 2)).is_none());
        assert!(tile.get_vertex(VertexId::new(6, 0)).is_none());
    }

    #[test]
    fn data_packing() {
        let packed = pack_data(123.45, 17).unwrap();
        let (distance, profile) = unpack_data(packed);
        assert!((distance - 123.5).abs() < 1e-9 || (distance - 123.4).abs() < 1e-9);
        assert_eq!(profile, 17);

        let (max, _) = unpack_data(pack_data(MAX_DISTANCE, 0).unwrap());
        assert!((max - MAX_DISTANCE).abs() < 1e-9);

        assert!(matches!(
            pack_data(MAX_DISTANCE + 1.0, 0),
            Err(TileError::DistanceOutOfRange(_))
        ));
        assert!(matches!(pack_data(-1.0, 0), Err(TileError::DistanceOutOfRange(_))));
        assert!(matches!(
            pack_data(1.0, MAX_PROFILE_COUNT),
            Err(TileError::ProfileOutOfRange(_))
        ));
    }

    #[test]
    fn edge_validation() {
        let mut tile = NetworkTile::new(5, 14, EdgeTypeMap::default());
        let a = tile.add_vertex(0.0, 0.0, None);

        assert!(matches!(
            tile.add_edge(a, a, 1.0, &details(), None),
            Err(TileError::SelfLoop(_))
        ));
        assert!(matches!(
            tile.add_edge(VertexId::new(1, 0), VertexId::new(2, 0), 1.0, &details(), None),
            Err(TileError::NoLocalVertex { .. })
        ));
        assert!(matches!(
            tile.add_edge(a, VertexId::new(5, 9), 1.0, &details(), None),
            Err(TileError::VertexNotFound(_))
        ));
    }

    #[test]
    fn edge_ids() {
        let mut tile = NetworkTile::new(5, 14, EdgeTypeMap::default());
        let a = tile.add_vertex(0.0, 0.0, None);
        let b = tile.add_vertex(0.0, 0.001, None);
        let external = VertexId::new(6, 3);

        let local = tile.add_edge(a, b, 1.0, &details(), None).unwrap();
        let cross = tile.add_edge(b, external, 1.0, &details(), None).unwrap();
        let local2 = tile.add_edge(b, a, 1.0, &details(), None).unwrap();

        assert_eq!(local, EdgeId::new(5, 0));
        assert_eq!(cross, EdgeId::cross_edge_id(5, 0));
        assert_eq!(local2, EdgeId::new(5, 2));

        let copied = EdgeId::cross_edge_id(6, 4);
        assert_eq!(
            tile.add_edge(external, a, 1.0, &details(), Some(copied)).unwrap(),
            copied
        );
        assert_eq!(tile.find_edge(copied), Some(3));
        assert_eq!(tile.find_edge(EdgeId::new(6, 0)), None);

        // The external vertex is interned only once
        assert_eq!(tile.external_vertices, vec![external]);
    }

    #[test]
    fn adjacency_lists_keep_insertion_order() {
        let mut tile = NetworkTile::new(5, 14, EdgeTypeMap::default());
        let a = tile.add_vertex(0.0, 0.0, None);
        let b = tile.add_vertex(0.0, 0.001, None);
        let c = tile.add_vertex(0.001, 0.0, None);

        let ab = tile.add_edge(a, b, 1.0, &details(), None).unwrap();
        let ca = tile.add_edge(c, a, 1.0, &details(), None).unwrap();
        let bc = tile.add_edge(b, c, 1.0, &details(), None).unwrap();

        let mut e = tile.enumerator();
        let mut at_a = Vec::new();
        assert!(e.move_to(a));
        while e.move_next() {
            at_a.push((e.edge_id(), e.forward(), e.head()));
        }
        assert_eq!(at_a, vec![(ab, true, b), (ca, false, c)]);

        let mut at_b = Vec::new();
        assert!(e.move_to(b));
        while e.move_next() {
            at_b.push((e.edge_id(), e.forward()));
        }
        assert_eq!(at_b, vec![(ab, false), (bc, true)]);
    }

    #[test]
    fn remove_edge_unlinks_both_ends() {
        let mut tile = NetworkTile::new(5, 14, EdgeTypeMap::default());
        let a = tile.add_vertex(0.0, 0.0, None);
        let b = tile.add_vertex(0.0, 0.001, None);
        let c = tile.add_vertex(0.001, 0.0, None);

        let ab = tile.add_edge(a, b, 1.0, &details(), None).unwrap();
        let ac = tile.add_edge(a, c, 1.0, &details(), None).unwrap();
        let bc = tile.add_edge(b, c, 1.0, &details(), None).unwrap();

        tile.remove_edge(ac).unwrap();
        assert!(tile.find_edge(ac).is_none());
        assert!(matches!(tile.remove_edge(ac), Err(TileError::EdgeNotFound(_))));

        let mut e = tile.enumerator();
        let collect = |e: &mut NetworkTileEnumerator<'_>, v| {
            let mut ids = Vec::new();
            e.move_to(v);
            while e.move_next() {
                ids.push(e.edge_id());
            }
            ids
        };
        assert_eq!(collect(&mut e, a), vec![ab]);
        assert_eq!(collect(&mut e, b), vec![ab, bc]);
        assert_eq!(collect(&mut e, c), vec![bc]);

        // New edges get fresh ids
        let ac2 = tile.add_edge(a, c, 1.0, &details(), None).unwrap();
        assert_ne!(ac2, ac);
    }

    #[test]
    fn attributes_are_interned() {
        let mut tile = NetworkTile::new(5, 14, EdgeTypeMap::default());
        let a = tile.add_vertex(0.0, 0.0, None);
        let b = tile.add_vertex(0.0, 0.001, None);
        let c = tile.add_vertex(0.001, 0.0, None);

        let road = EdgeDetails {
            attributes: attributes! {"highway" => "residential"},
            ..EdgeDetails::default()
        };
        tile.add_edge(a, b, 1.0, &road, None).unwrap();
        tile.add_edge(b, c, 1.0, &road, None).unwrap();
        assert_eq!(tile.attribute_sets.len(), 1);
        assert_eq!(tile.record_attributes(1), &road.attributes);
    }

    #[test]
    fn clone_for_edge_type_map_rederives_types() {
        let mut tile = NetworkTile::new(5, 14, EdgeTypeMap::default());
        let a = tile.add_vertex(0.0, 0.0, None);
        let b = tile.add_vertex(0.0, 0.001, None);
        let road = EdgeDetails {
            attributes: attributes! {"highway" => "residential"},
            ..EdgeDetails::default()
        };
        tile.add_edge(a, b, 1.0, &road, None).unwrap();
        assert_eq!(tile.record_edge_type(0), 0);

        let map = EdgeTypeMap::new(7, |attributes| attributes.len() as u32 + 40);
        let cloned = tile.clone_for_edge_type_map(&map);
        assert_eq!(cloned.edge_type_map_id(), 7);
        assert_eq!(cloned.record_edge_type(0), 41);

        // The original is untouched
        assert_eq!(tile.edge_type_map_id(), 0);
        assert_eq!(tile.record_edge_type(0), 0);
    }

    #[test]
    fn turn_costs_assign_orders() {
        let mut tile = NetworkTile::new(5, 14, EdgeTypeMap::default());
        let center = tile.add_vertex(0.0, 0.0, None);
        let n = tile.add_vertex(0.0, 0.001, None);
        let e = tile.add_vertex(0.001, 0.0, None);

        let cn = tile.add_edge(center, n, 1.0, &details(), None).unwrap();
        let ec = tile.add_edge(e, center, 1.0, &details(), None).unwrap();

        let restriction = attributes! {"restriction" => "no_left_turn"};
        tile.add_turn_costs(center, &restriction, &[cn, ec], &[0, TURN_PROHIBITED, 0, 0])
            .unwrap();

        // cn: vertex1 = center, ec: vertex2 = center
        assert_eq!(tile.record_tail_order(0, true), Some(0));
        assert_eq!(tile.record_head_order(1, true), Some(1));
        assert_eq!(tile.record_tail_order(1, true), None);

        // Arriving over cn (order 0), departing over ec backwards
        let costs = tile.record_turn_costs_to_tail(1, false, 0);
        assert_eq!(costs, vec![(&restriction, TURN_PROHIBITED)]);

        // Arriving over ec (order 1), departing over cn
        let costs = tile.record_turn_costs_to_tail(0, true, 1);
        assert_eq!(costs, vec![(&restriction, 0)]);

        assert!(tile.has_turn_costs(center));
        assert!(!tile.has_turn_costs(n));

        assert!(matches!(
            tile.add_turn_costs(center, &restriction, &[cn], &[0, 0]),
            Err(TileError::InvalidTurnCostMatrix { edges: 1, got: 2 })
        ));
        assert!(matches!(
            tile.add_turn_costs(n, &restriction, &[ec], &[0]),
            Err(TileError::EdgeNotIncident { .. })
        ));
    }

    #[test]
    fn shapes_follow_direction() {
        let mut tile = NetworkTile::new(5, 14, EdgeTypeMap::default());
        let a = tile.add_vertex(0.0, 0.0, None);
        let b = tile.add_vertex(0.0, 0.003, None);
        let curvy = EdgeDetails {
            shape: vec![Coordinate::new(0.0001, 0.001), Coordinate::new(0.0002, 0.002)],
            ..EdgeDetails::default()
        };
        tile.add_edge(a, b, 1.0, &curvy, None).unwrap();

        let forward = tile.record_shape(0, true).unwrap();
        let mut backward = tile.record_shape(0, false).unwrap();
        backward.reverse();
        assert_eq!(forward, curvy.shape);
        assert_eq!(backward, forward);
    }
}
