// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Tiled storage of road networks, with incremental island detection.
//!
//! A [RoutingNetwork] partitions vertices into [slippy map tiles](tiles), each stored
//! as a compact [NetworkTile]. Tiles may be loaded lazily (through a [UsageNotifier]
//! and a [RoutingNetworkWriter]) or edited all at once with a [RoutingNetworkMutator].
//! Edges are walked with a [RoutingNetworkEdgeEnumerator], and interpreted for a
//! specific mode of transport by a [cost function](cost::CostFunction).
//!
//! [Islands](islands) are small parts of the network, disconnected from everything
//! else for a given profile. They're detected per tile, on demand, through the
//! network's [IslandManager].
//!
//! # Example
//!
//! ```
//! use routenet::cost::{ProfileCostFunction, CAR_PROFILE};
//! use routenet::{attributes, EdgeDetails, NetworkOptions, RoutingNetwork};
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let network = RoutingNetwork::new(NetworkOptions::default()).unwrap();
//! let mut writer = network.writer().unwrap();
//! let a = writer.add_vertex(7.4246, 43.7384, None).unwrap();
//! let b = writer.add_vertex(7.4250, 43.7390, None).unwrap();
//! let road = EdgeDetails {
//!     attributes: attributes! {"highway" => "residential"},
//!     ..EdgeDetails::default()
//! };
//! let edge = writer.add_edge(a, b, &road).unwrap();
//! drop(writer);
//!
//! let car = ProfileCostFunction::new(CAR_PROFILE, 1);
//! let on_island = network
//!     .island_manager()
//!     .is_on_island(&network, &car, edge, &CancellationToken::new())
//!     .await
//!     .unwrap();
//! assert_eq!(on_island, Some(true));
//! # });
//! ```

use std::collections::BTreeMap;

pub mod cost;
mod distance;
mod edge_types;
mod ids;
pub mod islands;
mod network;
mod sparse;
mod tile;
pub mod tiles;

pub use distance::earth_distance;
pub use edge_types::EdgeTypeMap;
pub use ids::{EdgeId, VertexId};
pub use islands::IslandManager;
pub use network::{
    NetworkError, NetworkOptions, RoutingNetwork, RoutingNetworkEdgeEnumerator, RoutingNetworkMutator,
    RoutingNetworkVertexEnumerator, RoutingNetworkWriter, TileSourceNotifier, UsageNotifier,
};
pub use sparse::{SparseArray, SparseArrayError};
pub use tile::{EdgeDetails, NetworkTile, NetworkTileEnumerator, TileError, MAX_DISTANCE, TURN_PROHIBITED};
pub use tiles::BoundingBox;

/// Free-form key-value data attached to edges and turn costs,
/// e.g. OpenStreetMap tags.
pub type Attributes = BTreeMap<String, String>;

/// Position on Earth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
    pub elevation: Option<f32>,
}

impl Coordinate {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self {
            lon,
            lat,
            elevation: None,
        }
    }
}

/// Creates [Attributes] from `key => value` pairs.
///
/// ```
/// let a = routenet::attributes! {"highway" => "residential", "oneway" => "yes"};
/// assert_eq!(a.get("oneway").map(String::as_str), Some("yes"));
/// ```
#[macro_export]
macro_rules! attributes {
    {} => {
        $crate::Attributes::new()
    };

    { $($key:expr => $value:expr),+ $(,)? } => {{
        let mut a = $crate::Attributes::new();
        $( a.insert(::std::string::ToString::to_string(&$key), ::std::string::ToString::to_string(&$value)); )+
        a
    }};
}
