// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::{ensure_capacity, tile_in, vertex_in, NetworkError, RoutingNetwork};
use crate::distance::shape_length;
use crate::{Attributes, EdgeDetails, EdgeId, NetworkTile, VertexId};

/// Exclusive session for appending data to a [RoutingNetwork].
///
/// Every change is visible to new readers immediately. Only one writer may
/// exist at a time; dropping it allows another one to be created.
///
/// While a [mutator](super::RoutingNetworkMutator) is active, tiles it has changed
/// can't be written to: such writes fail with [NetworkError::TileConflict].
#[derive(Debug)]
pub struct RoutingNetworkWriter<'a> {
    network: &'a RoutingNetwork,
}

impl<'a> RoutingNetworkWriter<'a> {
    pub(super) fn new(network: &'a RoutingNetwork) -> Self {
        Self { network }
    }

    /// Adds a vertex to the tile containing its position.
    pub fn add_vertex(
        &mut self,
        lon: f64,
        lat: f64,
        elevation: Option<f32>,
    ) -> Result<VertexId, NetworkError> {
        let tile_id = self.network.tile_id_for(lon, lat);
        let mut tiles = self.network.tiles.write();
        let vertex = self
            .network
            .get_tile_for_write(&mut tiles, tile_id)?
            .add_vertex(lon, lat, elevation);
        Ok(vertex)
    }

    /// Adds an edge between two existing vertices.
    ///
    /// If the vertices belong to different tiles, the edge is stored in both of them
    /// under the same id, and either both tiles are changed or none.
    /// The length of the edge is computed from its geometry unless `details.distance` is set.
    pub fn add_edge(
        &mut self,
        vertex1: VertexId,
        vertex2: VertexId,
        details: &EdgeDetails,
    ) -> Result<EdgeId, NetworkError> {
        let mut tiles = self.network.tiles.write();

        let from = vertex_in(&tiles, vertex1).ok_or(NetworkError::VertexNotFound(vertex1))?;
        let to = vertex_in(&tiles, vertex2).ok_or(NetworkError::VertexNotFound(vertex2))?;
        let distance = details
            .distance
            .unwrap_or_else(|| shape_length(from, &details.shape, to));

        let cross = vertex2.tile_id != vertex1.tile_id;
        self.network.claim_for_writer(&tiles, vertex1.tile_id)?;
        if cross {
            self.network.claim_for_writer(&tiles, vertex2.tile_id)?;
        }

        let id = self
            .network
            .get_tile_for_write(&mut tiles, vertex1.tile_id)?
            .add_edge(vertex1, vertex2, distance, details, None)?;

        if cross {
            self.network
                .get_tile_for_write(&mut tiles, vertex2.tile_id)?
                .add_edge(vertex1, vertex2, distance, details, Some(id))?;
        }

        log::trace!("added edge {id}: {vertex1} -> {vertex2} ({distance:.1} m)");
        Ok(id)
    }

    /// Attaches a table of turn costs to a vertex; see [NetworkTile::add_turn_costs].
    pub fn add_turn_costs(
        &mut self,
        vertex: VertexId,
        attributes: &Attributes,
        edges: &[EdgeId],
        costs: &[u32],
    ) -> Result<(), NetworkError> {
        let mut tiles = self.network.tiles.write();
        if vertex_in(&tiles, vertex).is_none() {
            return Err(NetworkError::VertexNotFound(vertex));
        }

        self.network
            .get_tile_for_write(&mut tiles, vertex.tile_id)?
            .add_turn_costs(vertex, attributes, edges, costs)?;
        Ok(())
    }

    /// Installs a fully built tile, typically produced by a tile loader.
    ///
    /// Fails with [NetworkError::TileExists] if the tile has already been populated.
    pub fn add_tile(&mut self, tile: NetworkTile) -> Result<(), NetworkError> {
        let tile_id = tile.tile_id();
        if tile.zoom() != self.network.zoom {
            return Err(NetworkError::ZoomMismatch {
                tile_id,
                got: tile.zoom(),
                expected: self.network.zoom,
            });
        }

        let map = self.network.edge_type_map();
        let tile = if tile.edge_type_map_id() != map.id() {
            tile.clone_for_edge_type_map(&map)
        } else {
            tile
        };

        let mut tiles = self.network.tiles.write();
        if tile_in(&tiles, tile_id).is_some() {
            return Err(NetworkError::TileExists(tile_id));
        }
        self.network.claim_for_writer(&tiles, tile_id)?;

        log::debug!(
            "adding tile {tile_id} with {} vertices and {} edges",
            tile.vertex_count(),
            tile.edge_record_count()
        );
        ensure_capacity(&mut tiles, tile_id);
        tiles.set(tile_id as usize, Some(Arc::new(tile)));
        Ok(())
    }
}

impl Drop for RoutingNetworkWriter<'_> {
    fn drop(&mut self) {
        *self.network.writer_active.lock() = false;
    }
}
