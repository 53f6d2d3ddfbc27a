// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::RoutingNetwork;
use crate::tiles::BoundingBox;
use crate::{NetworkTile, VertexId};

/// UsageNotifier is told whenever a part of a [RoutingNetwork] is about to be used,
/// giving it a chance to populate missing tiles (through a
/// [writer](RoutingNetwork::writer)) before the data is accessed.
#[async_trait]
pub trait UsageNotifier: Send + Sync {
    /// Called before the edges of `vertex` are enumerated.
    async fn notify_vertex(
        &self,
        network: &RoutingNetwork,
        vertex: VertexId,
        cancel: &CancellationToken,
    );

    /// Called before any data within `bbox` is accessed.
    async fn notify_box(&self, network: &RoutingNetwork, bbox: BoundingBox, cancel: &CancellationToken);
}

/// UsageNotifier which lazily loads missing tiles from a tile source.
///
/// The source is asked for every tile at most once; it returns `None`
/// for tiles which don't exist.
pub struct TileSourceNotifier<F> {
    source: F,
    requested: Mutex<HashSet<u32>>,
}

impl<F> TileSourceNotifier<F>
where
    F: Fn(u32) -> Option<NetworkTile> + Send + Sync,
{
    pub fn new(source: F) -> Self {
        Self {
            source,
            requested: Mutex::new(HashSet::new()),
        }
    }

    fn load(&self, network: &RoutingNetwork, tile_id: u32) {
        if network.has_tile(tile_id) || !self.requested.lock().insert(tile_id) {
            return;
        }

        let Some(tile) = (self.source)(tile_id) else {
            log::debug!("tile {tile_id} is not available");
            return;
        };

        let result = network.writer().and_then(|mut writer| writer.add_tile(tile));
        if let Err(err) = result {
            log::warn!("failed to load tile {tile_id}: {err}");
            self.requested.lock().remove(&tile_id);
        }
    }
}

#[async_trait]
impl<F> UsageNotifier for TileSourceNotifier<F>
where
    F: Fn(u32) -> Option<NetworkTile> + Send + Sync,
{
    async fn notify_vertex(
        &self,
        network: &RoutingNetwork,
        vertex: VertexId,
        cancel: &CancellationToken,
    ) {
        if !cancel.is_cancelled() && !vertex.is_empty() {
            self.load(network, vertex.tile_id);
        }
    }

    async fn notify_box(&self, network: &RoutingNetwork, bbox: BoundingBox, cancel: &CancellationToken) {
        for tile_id in bbox.tiles(network.zoom()) {
            if cancel.is_cancelled() {
                return;
            }
            self.load(network, tile_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::{EdgeTypeMap, NetworkOptions};

    fn source(calls: Arc<AtomicU32>) -> impl Fn(u32) -> Option<NetworkTile> + Send + Sync {
        move |tile_id| {
            calls.fetch_add(1, Ordering::SeqCst);
            let (x, y) = crate::tiles::tile_id_to_xy(tile_id, 14);
            let bounds = crate::tiles::tile_bounds(tile_id, 14);
            if x % 2 == 1 || y > 1 << 13 {
                return None;
            }

            let mut tile = NetworkTile::new(tile_id, 14, EdgeTypeMap::default());
            tile.add_vertex(bounds.min_lon + 1e-4, bounds.min_lat + 1e-4, None);
            Some(tile)
        }
    }

    #[tokio::test]
    async fn loads_tiles_of_touched_vertices_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let network = RoutingNetwork::new(NetworkOptions::default())
            .unwrap()
            .with_usage_notifier(Arc::new(TileSourceNotifier::new(source(calls.clone()))));
        let cancel = CancellationToken::new();

        let tile_id = crate::tiles::tile_id_from_xy(100, 200, 14);
        let vertex = VertexId::new(tile_id, 0);
        assert!(network.try_get_vertex(vertex).is_none());

        network.usage_notify_vertex(vertex, &cancel).await;
        assert!(network.try_get_vertex(vertex).is_some());

        network.usage_notify_vertex(vertex, &cancel).await;
        network
            .usage_notify_vertex(VertexId::new(tile_id + 1, 0), &cancel)
            .await;
        network
            .usage_notify_vertex(VertexId::new(tile_id + 1, 0), &cancel)
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(network.tile_ids(), vec![tile_id]);
    }

    #[tokio::test]
    async fn loads_tiles_in_box() {
        let calls = Arc::new(AtomicU32::new(0));
        let network = RoutingNetwork::new(NetworkOptions::default())
            .unwrap()
            .with_usage_notifier(Arc::new(TileSourceNotifier::new(source(calls.clone()))));

        // Four tiles in the north-west of the null island
        let bbox = BoundingBox {
            min_lon: -0.03,
            min_lat: 0.01,
            max_lon: -0.01,
            max_lat: 0.03,
        };
        network.usage_notify_box(bbox, &CancellationToken::new()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(network.tile_ids().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_notifications_do_nothing() {
        let calls = Arc::new(AtomicU32::new(0));
        let network = RoutingNetwork::new(NetworkOptions::default())
            .unwrap()
            .with_usage_notifier(Arc::new(TileSourceNotifier::new(source(calls.clone()))));
        let cancel = CancellationToken::new();
        cancel.cancel();

        network.usage_notify_vertex(VertexId::new(0, 0), &cancel).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
