// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::islands::IslandManager;
use crate::sparse::{SparseArray, SparseArrayError};
use crate::tile::{NetworkTile, TileError};
use crate::tiles::{self, BoundingBox, MAX_ZOOM};
use crate::{Coordinate, EdgeId, EdgeTypeMap, VertexId};

mod enumerator;
mod mutator;
mod usage;
mod writer;

pub use enumerator::{RoutingNetworkEdgeEnumerator, RoutingNetworkVertexEnumerator};
pub use mutator::RoutingNetworkMutator;
pub use usage::{TileSourceNotifier, UsageNotifier};
pub use writer::RoutingNetworkWriter;

/// Error conditions which may occur when accessing or modifying a [RoutingNetwork].
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("only one writer is allowed at a time")]
    WriterActive,

    #[error("only one mutator is allowed at a time")]
    MutatorActive,

    #[error("tile {0} already exists")]
    TileExists(u32),

    #[error("tile {tile_id} has zoom {got}, expected {expected}")]
    ZoomMismatch { tile_id: u32, got: u32, expected: u32 },

    #[error("unsupported zoom level: {0} (max {MAX_ZOOM})")]
    InvalidZoom(u32),

    #[error("vertex {0} does not exist")]
    VertexNotFound(VertexId),

    #[error("edge {0} does not exist")]
    EdgeNotFound(EdgeId),

    #[error("tile {0} was changed by both the writer and the mutator")]
    TileConflict(u32),

    #[error(transparent)]
    Tile(#[from] TileError),

    #[error(transparent)]
    SparseArray(#[from] SparseArrayError),
}

/// Additional controls for a [RoutingNetwork].
#[derive(Debug, Clone)]
pub struct NetworkOptions {
    /// Zoom level of the tiles partitioning the network, at most [MAX_ZOOM].
    pub zoom: u32,

    /// Number of tile slots allocated at once. Must be a power of two.
    pub block_size: usize,

    /// Strongly connected components with more directed edges than this
    /// are never considered islands.
    pub max_island_size: u32,

    /// Initial classification of edges.
    pub edge_type_map: EdgeTypeMap,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            zoom: 14,
            block_size: 1024,
            max_island_size: 1024,
            edge_type_map: EdgeTypeMap::default(),
        }
    }
}

type TileArray = SparseArray<Option<Arc<NetworkTile>>>;

/// Private working set of an active [RoutingNetworkMutator].
#[derive(Debug, Default)]
struct MutatorState {
    tiles: HashMap<u32, NetworkTile>,

    /// Tiles changed by the mutator. Only these are installed on commit.
    dirty: HashSet<u32>,

    /// Tiles changed by the writer after the mutator got its copy.
    stale: HashSet<u32>,
}

impl MutatorState {
    /// Returns the private copy of a tile, copying it from `tiles` (or creating
    /// an empty one) if necessary.
    fn tile(&mut self, network: &RoutingNetwork, tiles: &TileArray, tile_id: u32) -> &mut NetworkTile {
        self.tiles
            .entry(tile_id)
            .or_insert_with(|| network.copy_for_mutator(tiles, tile_id))
    }

    /// Fails if the writer has changed a tile after this mutator copied it.
    fn ensure_unchanged(&self, tile_id: u32) -> Result<(), NetworkError> {
        if self.stale.contains(&tile_id) {
            Err(NetworkError::TileConflict(tile_id))
        } else {
            Ok(())
        }
    }
}

/// RoutingNetwork is a road graph partitioned into [tiles](NetworkTile).
///
/// Tiles are shared, immutable snapshots: readers (like the
/// [enumerators](RoutingNetworkEdgeEnumerator)) hold on to the snapshot they
/// started with, while changes are made on a private copy which is swapped in.
///
/// The network may be changed through at most one [RoutingNetworkWriter]
/// (appending data, typically when lazily loading tiles) and at most one
/// [RoutingNetworkMutator] (arbitrary edits, published all at once) at a time.
/// A tile may be changed by only one of them during a mutator session;
/// the other one fails with [NetworkError::TileConflict].
pub struct RoutingNetwork {
    // Lock order: tiles, mutator, edge_type_map
    zoom: u32,
    tiles: RwLock<TileArray>,
    edge_type_map: RwLock<EdgeTypeMap>,
    writer_active: Mutex<bool>,
    mutator: Mutex<Option<MutatorState>>,
    usage_notifier: Option<Arc<dyn UsageNotifier>>,
    islands: IslandManager,
}

impl RoutingNetwork {
    /// Creates an empty network.
    pub fn new(options: NetworkOptions) -> Result<Self, NetworkError> {
        if options.zoom == 0 || options.zoom > MAX_ZOOM {
            return Err(NetworkError::InvalidZoom(options.zoom));
        }

        Ok(Self {
            zoom: options.zoom,
            tiles: RwLock::new(SparseArray::new(0, options.block_size, None)?),
            edge_type_map: RwLock::new(options.edge_type_map),
            writer_active: Mutex::new(false),
            mutator: Mutex::new(None),
            usage_notifier: None,
            islands: IslandManager::new(options.max_island_size),
        })
    }

    /// Installs an object notified whenever a part of the network is about to be used.
    pub fn with_usage_notifier(mut self, notifier: Arc<dyn UsageNotifier>) -> Self {
        self.usage_notifier = Some(notifier);
        self
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    /// Returns the id of the tile containing a position.
    pub fn tile_id_for(&self, lon: f64, lat: f64) -> u32 {
        tiles::tile_id(lon, lat, self.zoom)
    }

    /// Returns the currently active [EdgeTypeMap].
    pub fn edge_type_map(&self) -> EdgeTypeMap {
        self.edge_type_map.read().clone()
    }

    /// Replaces the active [EdgeTypeMap]. Tiles re-derive their edge types
    /// lazily, the next time they're read or written.
    pub fn set_edge_type_map(&self, edge_type_map: EdgeTypeMap) {
        let mut current = self.edge_type_map.write();
        if current.id() != edge_type_map.id() {
            log::debug!(
                "edge type map changed: {} -> {}",
                current.id(),
                edge_type_map.id()
            );
        }
        *current = edge_type_map;
    }

    /// Per-profile island state of this network.
    pub fn island_manager(&self) -> &IslandManager {
        &self.islands
    }

    /// Returns the position of a vertex, or `None` if it doesn't exist (or its tile isn't loaded).
    pub fn try_get_vertex(&self, vertex: VertexId) -> Option<Coordinate> {
        if vertex.is_empty() {
            return None;
        }
        vertex_in(&self.tiles.read(), vertex)
    }

    /// Returns true if a tile with the given id has been populated.
    pub fn has_tile(&self, tile_id: u32) -> bool {
        tile_in(&self.tiles.read(), tile_id).is_some()
    }

    /// Lists ids of all populated tiles, in ascending order.
    pub fn tile_ids(&self) -> Vec<u32> {
        self.tiles
            .read()
            .iter_allocated()
            .filter_map(|(idx, tile)| tile.as_ref().map(|_| idx as u32))
            .collect()
    }

    /// Returns a cursor over edges of this network.
    pub fn edge_enumerator(&self) -> RoutingNetworkEdgeEnumerator<'_> {
        RoutingNetworkEdgeEnumerator::new(self)
    }

    /// Returns an iterator over all vertices of all populated tiles.
    pub fn vertex_enumerator(&self) -> RoutingNetworkVertexEnumerator<'_> {
        RoutingNetworkVertexEnumerator::new(self, self.tile_ids())
    }

    /// Returns an iterator over vertices of a single tile.
    pub fn tile_vertex_enumerator(&self, tile_id: u32) -> RoutingNetworkVertexEnumerator<'_> {
        RoutingNetworkVertexEnumerator::new(self, vec![tile_id])
    }

    /// Starts a writing session. Fails with [NetworkError::WriterActive]
    /// if another writer is still alive.
    pub fn writer(&self) -> Result<RoutingNetworkWriter<'_>, NetworkError> {
        let mut active = self.writer_active.lock();
        if *active {
            return Err(NetworkError::WriterActive);
        }
        *active = true;
        Ok(RoutingNetworkWriter::new(self))
    }

    pub fn has_writer(&self) -> bool {
        *self.writer_active.lock()
    }

    /// Starts a mutation session. Fails with [NetworkError::MutatorActive]
    /// if another mutator is still alive.
    pub fn mutate(&self) -> Result<RoutingNetworkMutator<'_>, NetworkError> {
        let mut state = self.mutator.lock();
        if state.is_some() {
            return Err(NetworkError::MutatorActive);
        }
        *state = Some(MutatorState::default());
        Ok(RoutingNetworkMutator::new(self))
    }

    pub fn has_mutator(&self) -> bool {
        self.mutator.lock().is_some()
    }

    /// Creates an independent copy of this network. Tiles are shared until either
    /// copy changes them; island state is copied.
    pub fn snapshot(&self) -> Self {
        Self {
            zoom: self.zoom,
            tiles: RwLock::new(self.tiles.read().clone()),
            edge_type_map: RwLock::new(self.edge_type_map()),
            writer_active: Mutex::new(false),
            mutator: Mutex::new(None),
            usage_notifier: self.usage_notifier.clone(),
            islands: self.islands.clone(),
        }
    }

    /// Tells the usage notifier (if any) that data around a vertex is about to be used.
    pub async fn usage_notify_vertex(&self, vertex: VertexId, cancel: &CancellationToken) {
        if let Some(notifier) = &self.usage_notifier {
            notifier.notify_vertex(self, vertex, cancel).await;
        }
    }

    /// Tells the usage notifier (if any) that data within a box is about to be used.
    pub async fn usage_notify_box(&self, bbox: BoundingBox, cancel: &CancellationToken) {
        if let Some(notifier) = &self.usage_notifier {
            notifier.notify_box(self, bbox, cancel).await;
        }
    }

    /// Retrieves a tile for reading, re-deriving its edge types first
    /// if they were computed by a different [EdgeTypeMap].
    pub(crate) fn get_tile_for_read(&self, tile_id: u32) -> Option<Arc<NetworkTile>> {
        let map_id = self.edge_type_map.read().id();

        {
            let tiles = self.tiles.read();
            let tile = tile_in(&tiles, tile_id)?;
            if tile.edge_type_map_id() == map_id {
                return Some(tile.clone());
            }
        }

        let map = self.edge_type_map();
        let mut tiles = self.tiles.write();
        let slot = tiles.get_mut(tile_id as usize);
        let tile = slot.as_mut()?;
        if tile.edge_type_map_id() != map.id() {
            log::debug!(
                "re-deriving edge types of tile {} ({} -> {})",
                tile_id,
                tile.edge_type_map_id(),
                map.id()
            );
            *tile = Arc::new(tile.clone_for_edge_type_map(&map));
        }
        Some(tile.clone())
    }

    /// Returns `(vertex1, vertex2)` of an edge, as stored in the tile of its id.
    pub(crate) fn edge_endpoints(&self, edge: EdgeId) -> Option<(VertexId, VertexId)> {
        let tile = self.get_tile_for_read(edge.tile_id)?;
        let idx = tile.find_edge(edge)?;
        Some((tile.record_tail(idx, true), tile.record_head(idx, true)))
    }

    /// Retrieves a tile for writing, creating it if necessary.
    ///
    /// See [claim_for_writer](Self::claim_for_writer) for the interaction with an active mutator.
    fn get_tile_for_write<'t>(
        &self,
        tiles: &'t mut TileArray,
        tile_id: u32,
    ) -> Result<&'t mut NetworkTile, NetworkError> {
        let map = self.edge_type_map();
        ensure_capacity(tiles, tile_id);

        if let Some(tile) = tiles.get_mut(tile_id as usize).as_mut() {
            if tile.edge_type_map_id() != map.id() {
                log::debug!(
                    "re-deriving edge types of tile {} ({} -> {})",
                    tile_id,
                    tile.edge_type_map_id(),
                    map.id()
                );
                *tile = Arc::new(tile.clone_for_edge_type_map(&map));
            }
        }

        self.claim_for_writer(tiles, tile_id)?;
        let slot = tiles.get_mut(tile_id as usize);
        let tile = slot.get_or_insert_with(|| Arc::new(NetworkTile::new(tile_id, self.zoom, map)));
        Ok(Arc::make_mut(tile))
    }

    /// Prepares an active mutator (if any) for a writer's change to a tile.
    ///
    /// Fails with [NetworkError::TileConflict] if the mutator has already changed the tile.
    /// Otherwise, a mutator which has not seen the tile yet receives a copy of the tile as it
    /// was before the write, and the mutator may no longer change the tile.
    fn claim_for_writer(&self, tiles: &TileArray, tile_id: u32) -> Result<(), NetworkError> {
        let mut guard = self.mutator.lock();
        let Some(state) = guard.as_mut() else {
            return Ok(());
        };
        if state.dirty.contains(&tile_id) {
            return Err(NetworkError::TileConflict(tile_id));
        }

        state
            .tiles
            .entry(tile_id)
            .or_insert_with(|| self.copy_for_mutator(tiles, tile_id));
        state.stale.insert(tile_id);
        Ok(())
    }

    /// Copies a live tile (or creates an empty one) for the private use of a mutator.
    fn copy_for_mutator(&self, tiles: &TileArray, tile_id: u32) -> NetworkTile {
        let map = self.edge_type_map();
        match tile_in(tiles, tile_id) {
            Some(tile) if tile.edge_type_map_id() == map.id() => NetworkTile::clone(&**tile),
            Some(tile) => tile.clone_for_edge_type_map(&map),
            None => NetworkTile::new(tile_id, self.zoom, map),
        }
    }

    /// Runs `f` on the working set of the active mutator, with the live tiles
    /// locked against concurrent writes.
    fn with_mutator<R>(&self, f: impl FnOnce(&TileArray, &mut MutatorState) -> R) -> R {
        let tiles = self.tiles.read();
        let mut guard = self.mutator.lock();
        let state = guard.get_or_insert_with(MutatorState::default);
        f(&*tiles, state)
    }

    /// Publishes tiles changed by the active mutator and releases the mutator slot.
    /// Returns the number of installed tiles.
    fn commit_mutator(&self) -> usize {
        let mut tiles = self.tiles.write();
        let Some(state) = self.mutator.lock().take() else {
            return 0;
        };

        let mut installed = 0;
        for (tile_id, tile) in state.tiles {
            if state.dirty.contains(&tile_id) {
                ensure_capacity(&mut tiles, tile_id);
                tiles.set(tile_id as usize, Some(Arc::new(tile)));
                installed += 1;
            }
        }
        installed
    }
}

impl std::fmt::Debug for RoutingNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingNetwork")
            .field("zoom", &self.zoom)
            .field("tiles", &self.tile_ids().len())
            .field("edge_type_map", &self.edge_type_map.read().id())
            .finish()
    }
}

fn tile_in(tiles: &TileArray, tile_id: u32) -> Option<&Arc<NetworkTile>> {
    if (tile_id as usize) < tiles.len() {
        tiles.get(tile_id as usize).as_ref()
    } else {
        None
    }
}

fn vertex_in(tiles: &TileArray, vertex: VertexId) -> Option<Coordinate> {
    tile_in(tiles, vertex.tile_id)?.get_vertex(vertex)
}

fn ensure_capacity(tiles: &mut TileArray, tile_id: u32) {
    let needed = tile_id as usize + 1;
    if needed > tiles.len() {
        tiles.resize(needed);
    }
}
