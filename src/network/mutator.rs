// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{NetworkError, RoutingNetwork};
use crate::distance::shape_length;
use crate::{Attributes, Coordinate, EdgeDetails, EdgeId, VertexId};

/// Exclusive session for arbitrary changes to a [RoutingNetwork].
///
/// Changes are made on private copies of the affected tiles and remain
/// invisible to readers until [commit](RoutingNetworkMutator::commit).
/// Dropping an uncommitted mutator discards its changes.
#[derive(Debug)]
pub struct RoutingNetworkMutator<'a> {
    network: &'a RoutingNetwork,
}

impl<'a> RoutingNetworkMutator<'a> {
    pub(super) fn new(network: &'a RoutingNetwork) -> Self {
        Self { network }
    }

    /// Returns the position of a vertex, as seen by this mutator.
    pub fn get_vertex(&self, vertex: VertexId) -> Option<Coordinate> {
        if let Some(state) = self.network.mutator.lock().as_ref() {
            if let Some(tile) = state.tiles.get(&vertex.tile_id) {
                return tile.get_vertex(vertex);
            }
        }
        self.network.try_get_vertex(vertex)
    }

    /// Adds a vertex to the tile containing its position.
    ///
    /// Fails with [NetworkError::TileConflict] if the writer has changed that tile
    /// since this mutator first saw it.
    pub fn add_vertex(
        &mut self,
        lon: f64,
        lat: f64,
        elevation: Option<f32>,
    ) -> Result<VertexId, NetworkError> {
        let network = self.network;
        let tile_id = network.tile_id_for(lon, lat);

        network.with_mutator(|tiles, state| -> Result<VertexId, NetworkError> {
            state.ensure_unchanged(tile_id)?;
            let vertex = state.tile(network, tiles, tile_id).add_vertex(lon, lat, elevation);
            state.dirty.insert(tile_id);
            Ok(vertex)
        })
    }

    /// Adds an edge between two vertices; see [RoutingNetworkWriter::add_edge](super::RoutingNetworkWriter::add_edge).
    pub fn add_edge(
        &mut self,
        vertex1: VertexId,
        vertex2: VertexId,
        details: &EdgeDetails,
    ) -> Result<EdgeId, NetworkError> {
        let network = self.network;
        let cross = vertex1.tile_id != vertex2.tile_id;

        network.with_mutator(|tiles, state| -> Result<EdgeId, NetworkError> {
            state.ensure_unchanged(vertex1.tile_id)?;
            if cross {
                state.ensure_unchanged(vertex2.tile_id)?;
            }

            let from = state
                .tile(network, tiles, vertex1.tile_id)
                .get_vertex(vertex1)
                .ok_or(NetworkError::VertexNotFound(vertex1))?;
            let to = state
                .tile(network, tiles, vertex2.tile_id)
                .get_vertex(vertex2)
                .ok_or(NetworkError::VertexNotFound(vertex2))?;
            let distance = details
                .distance
                .unwrap_or_else(|| shape_length(from, &details.shape, to));

            let id = state
                .tile(network, tiles, vertex1.tile_id)
                .add_edge(vertex1, vertex2, distance, details, None)?;
            state.dirty.insert(vertex1.tile_id);

            if cross {
                state
                    .tile(network, tiles, vertex2.tile_id)
                    .add_edge(vertex1, vertex2, distance, details, Some(id))?;
                state.dirty.insert(vertex2.tile_id);
            }

            Ok(id)
        })
    }

    /// Removes an edge from the network (from both tiles, if it crosses a tile boundary).
    pub fn remove_edge(&mut self, edge: EdgeId) -> Result<(), NetworkError> {
        let network = self.network;

        network.with_mutator(|tiles, state| -> Result<(), NetworkError> {
            let tile = state.tile(network, tiles, edge.tile_id);
            let idx = tile
                .find_edge(edge)
                .ok_or(NetworkError::EdgeNotFound(edge))?;
            let tail = tile.record_tail(idx, true);
            let head = tile.record_head(idx, true);

            let other = [tail.tile_id, head.tile_id]
                .into_iter()
                .find(|&tile_id| tile_id != edge.tile_id);
            state.ensure_unchanged(edge.tile_id)?;
            if let Some(tile_id) = other {
                state.ensure_unchanged(tile_id)?;
            }

            state.tile(network, tiles, edge.tile_id).remove_edge(edge)?;
            state.dirty.insert(edge.tile_id);

            if let Some(tile_id) = other {
                let tile = state.tile(network, tiles, tile_id);
                if tile.find_edge(edge).is_some() {
                    tile.remove_edge(edge)?;
                    state.dirty.insert(tile_id);
                }
            }

            log::trace!("removed edge {edge}: {tail} -> {head}");
            Ok(())
        })
    }

    /// Attaches a table of turn costs to a vertex; see [NetworkTile::add_turn_costs](crate::NetworkTile::add_turn_costs).
    pub fn add_turn_costs(
        &mut self,
        vertex: VertexId,
        attributes: &Attributes,
        edges: &[EdgeId],
        costs: &[u32],
    ) -> Result<(), NetworkError> {
        let network = self.network;

        network.with_mutator(|tiles, state| -> Result<(), NetworkError> {
            let tile = state.tile(network, tiles, vertex.tile_id);
            if !tile.has_vertex(vertex) {
                return Err(NetworkError::VertexNotFound(vertex));
            }
            state.ensure_unchanged(vertex.tile_id)?;

            state
                .tile(network, tiles, vertex.tile_id)
                .add_turn_costs(vertex, attributes, edges, costs)?;
            state.dirty.insert(vertex.tile_id);
            Ok(())
        })
    }

    /// Publishes all changes at once, and invalidates all computed islands.
    /// Returns the number of changed tiles.
    pub fn commit(self) -> usize {
        let installed = self.network.commit_mutator();
        self.network.islands.clear();
        log::debug!("mutator committed {installed} tiles");
        installed
    }
}

impl Drop for RoutingNetworkMutator<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.network.mutator.lock().take() {
            if !state.dirty.is_empty() {
                log::warn!("discarding {} uncommitted tiles", state.dirty.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NetworkOptions;

    fn network_with_path() -> (RoutingNetwork, [VertexId; 3], [EdgeId; 2]) {
        let network = RoutingNetwork::new(NetworkOptions::default()).unwrap();
        let mut writer = network.writer().unwrap();
        let a = writer.add_vertex(0.0100, 0.0010, None).unwrap();
        let b = writer.add_vertex(0.0150, 0.0010, None).unwrap();
        let c = writer.add_vertex(0.0300, 0.0010, None).unwrap();
        let ab = writer.add_edge(a, b, &EdgeDetails::default()).unwrap();
        let bc = writer.add_edge(b, c, &EdgeDetails::default()).unwrap();
        drop(writer);
        (network, [a, b, c], [ab, bc])
    }

    fn edges_at(network: &RoutingNetwork, vertex: VertexId) -> Vec<EdgeId> {
        let mut e = network.edge_enumerator();
        let mut edges = Vec::new();
        if e.move_to_vertex(vertex) {
            while e.move_next() {
                edges.push(e.edge_id());
            }
        }
        edges
    }

    #[test]
    fn changes_are_invisible_until_commit() {
        let (network, [a, _, c], _) = network_with_path();

        let mut mutator = network.mutate().unwrap();
        let ac = mutator.add_edge(a, c, &EdgeDetails::default()).unwrap();
        let d = mutator.add_vertex(0.0101, 0.0011, None).unwrap();
        assert!(mutator.get_vertex(d).is_some());

        assert_eq!(edges_at(&network, a).len(), 1);
        assert!(network.try_get_vertex(d).is_none());

        assert_eq!(mutator.commit(), 2);
        assert!(!network.has_mutator());
        assert_eq!(edges_at(&network, a).len(), 2);
        assert!(edges_at(&network, c).contains(&ac));
        assert!(network.try_get_vertex(d).is_some());
    }

    #[test]
    fn dropping_discards_changes() {
        let (network, [a, _, c], _) = network_with_path();

        let mut mutator = network.mutate().unwrap();
        mutator.add_edge(a, c, &EdgeDetails::default()).unwrap();
        drop(mutator);

        assert!(!network.has_mutator());
        assert_eq!(edges_at(&network, a).len(), 1);
        assert_eq!(edges_at(&network, c).len(), 1);
    }

    #[test]
    fn remove_cross_tile_edge() {
        let (network, [a, b, c], [ab, bc]) = network_with_path();
        assert!(bc.is_cross());

        let mut mutator = network.mutate().unwrap();
        mutator.remove_edge(bc).unwrap();
        assert!(matches!(
            mutator.remove_edge(bc),
            Err(NetworkError::EdgeNotFound(_))
        ));
        mutator.commit();

        assert_eq!(edges_at(&network, a), vec![ab]);
        assert_eq!(edges_at(&network, b), vec![ab]);
        assert!(edges_at(&network, c).is_empty());
    }

    #[test]
    fn writer_changes_do_not_leak_into_mutator() {
        let (network, [a, b, c], _) = network_with_path();

        let mut mutator = network.mutate().unwrap();
        assert!(mutator.get_vertex(a).is_some());
        mutator.remove_edge(EdgeId::new(a.tile_id, 0)).unwrap();

        // The writer modifies a tile the mutator has not seen yet
        let c_tile_vertex = network
            .writer()
            .unwrap()
            .add_vertex(0.0301, 0.0011, None)
            .unwrap();
        assert!(network.try_get_vertex(c_tile_vertex).is_some());
        assert!(mutator.get_vertex(c_tile_vertex).is_none());
        assert!(mutator.get_vertex(c).is_some());

        // ...after which the mutator can't change that tile
        assert!(matches!(
            mutator.add_vertex(0.0302, 0.0012, None),
            Err(NetworkError::TileConflict(id)) if id == c.tile_id
        ));
        assert!(matches!(
            mutator.add_edge(b, c, &EdgeDetails::default()),
            Err(NetworkError::TileConflict(_))
        ));

        // Tiles only read by the mutator are not published
        assert_eq!(mutator.commit(), 1);
        assert!(network.try_get_vertex(c_tile_vertex).is_some());
        assert_eq!(edges_at(&network, b).len(), 1);
        assert_eq!(edges_at(&network, c).len(), 1);
    }

    #[test]
    fn writer_cannot_change_tiles_changed_by_mutator() {
        let (network, [a, _, c], _) = network_with_path();

        let mut mutator = network.mutate().unwrap();
        let m = mutator.add_vertex(0.0101, 0.0011, None).unwrap();

        let mut writer = network.writer().unwrap();
        assert!(matches!(
            writer.add_vertex(0.0102, 0.0012, None),
            Err(NetworkError::TileConflict(id)) if id == a.tile_id
        ));

        // Neither half of a cross-tile edge is stored
        assert!(matches!(
            writer.add_edge(c, a, &EdgeDetails::default()),
            Err(NetworkError::TileConflict(_))
        ));
        assert!(matches!(
            writer.add_turn_costs(a, &Attributes::new(), &[], &[]),
            Err(NetworkError::TileConflict(_))
        ));
        drop(writer);
        assert_eq!(edges_at(&network, c).len(), 1);

        mutator.commit();
        let location = network.try_get_vertex(m).unwrap();
        assert!((location.lon - 0.0101).abs() < 1e-6);
        assert_eq!(edges_at(&network, a).len(), 1);
        assert_eq!(edges_at(&network, c).len(), 1);

        // Once the mutator is gone, the writer may change the tile again
        let w = network.writer().unwrap().add_vertex(0.0102, 0.0012, None).unwrap();
        assert_ne!(w, m);
        assert!((network.try_get_vertex(w).unwrap().lon - 0.0102).abs() < 1e-6);
    }

    #[test]
    fn writer_appends_elsewhere_survive_commit() {
        let (network, [a, b, c], [_, bc]) = network_with_path();

        let mut mutator = network.mutate().unwrap();
        mutator.remove_edge(bc).unwrap();

        // A tile the mutator has never seen
        let mut writer = network.writer().unwrap();
        let far = writer.add_vertex(0.0500, 0.0010, None).unwrap();
        let near = writer.add_vertex(0.0310, 0.0010, None);
        assert!(matches!(near, Err(NetworkError::TileConflict(_))));
        drop(writer);

        assert_eq!(mutator.commit(), 2);
        assert!(network.try_get_vertex(far).is_some());
        assert!(network.try_get_vertex(a).is_some());
        assert_eq!(edges_at(&network, b).len(), 1);
        assert!(edges_at(&network, c).is_empty());
    }
}
