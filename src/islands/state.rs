// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::EdgeId;

#[derive(Debug, Clone, Default)]
struct IslandsState {
    tiles_done: HashSet<u32>,
    island_edges: HashSet<EdgeId>,
}

/// Confirmed island analysis results for a single profile.
///
/// Cloning creates an independent deep copy.
#[derive(Debug, Default)]
pub struct Islands {
    state: RwLock<IslandsState>,
}

impl Islands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if all edges incident to the vertices of the tile have been analyzed.
    pub fn is_tile_done(&self, tile_id: u32) -> bool {
        self.state.read().tiles_done.contains(&tile_id)
    }

    pub fn set_tile_done(&self, tile_id: u32) {
        self.state.write().tiles_done.insert(tile_id);
    }

    /// Records that an edge lies on an island.
    pub fn add_island_edge(&self, edge: EdgeId) {
        self.state.write().island_edges.insert(edge);
    }

    /// Records multiple island edges and marks their tile as done, all at once.
    pub fn complete_tile(&self, tile_id: u32, island_edges: impl IntoIterator<Item = EdgeId>) {
        let mut state = self.state.write();
        state.island_edges.extend(island_edges);
        state.tiles_done.insert(tile_id);
    }

    /// Checks whether an edge lies on an island: `Some(true)` if it was recorded as such,
    /// `Some(false)` if its tile has been analyzed without it being recorded, `None` otherwise.
    pub fn is_edge_on_island(&self, edge: EdgeId) -> Option<bool> {
        let state = self.state.read();
        if state.island_edges.contains(&edge) {
            Some(true)
        } else if state.tiles_done.contains(&edge.tile_id) {
            Some(false)
        } else {
            None
        }
    }

    pub fn island_edge_count(&self) -> usize {
        self.state.read().island_edges.len()
    }
}

impl Clone for Islands {
    fn clone(&self) -> Self {
        Self {
            state: RwLock::new(self.state.read().clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_follow_tile_state() {
        let islands = Islands::new();
        let edge = EdgeId::new(4, 0);
        let other = EdgeId::new(4, 1);
        assert_eq!(islands.is_edge_on_island(edge), None);

        islands.add_island_edge(edge);
        assert_eq!(islands.is_edge_on_island(edge), Some(true));
        assert_eq!(islands.is_edge_on_island(other), None);

        islands.set_tile_done(4);
        assert!(islands.is_tile_done(4));
        assert_eq!(islands.is_edge_on_island(other), Some(false));
    }

    #[test]
    fn clone_is_deep() {
        let islands = Islands::new();
        islands.complete_tile(4, [EdgeId::new(4, 0)]);

        let copy = islands.clone();
        islands.complete_tile(5, [EdgeId::new(5, 0)]);

        assert!(copy.is_tile_done(4));
        assert!(!copy.is_tile_done(5));
        assert_eq!(copy.island_edge_count(), 1);
        assert_eq!(islands.island_edge_count(), 2);
    }
}
