// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Detection of islands: small strongly connected parts of the network,
//! which can't be reached from (or can't reach) the rest of it under a given profile.
//!
//! The analysis is incremental. [IslandLabels] accumulate connectivity discovered
//! by [is_on_island] searches, and [Islands] record per-tile answers.
//! [IslandManager] ties both together for every profile used with a network.

mod builder;
mod graph;
mod labels;
mod manager;
mod state;

pub use builder::{build_for_tile, is_on_island, KnownIslandEdges};
pub use labels::{DirectedEdge, IslandLabels, LabelDetails, NOT_AN_ISLAND_LABEL};
pub use manager::{IslandManager, ProfileIslands};
pub use state::Islands;

use crate::EdgeId;

#[derive(Debug, thiserror::Error)]
pub enum IslandError {
    #[error("edge {0} does not exist")]
    EdgeNotFound(EdgeId),
}
