// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;

use super::{builder, IslandError, IslandLabels, Islands};
use crate::cost::CostFunction;
use crate::{EdgeId, RoutingNetwork};

/// Island analysis state of a single profile.
#[derive(Debug)]
pub struct ProfileIslands {
    islands: Islands,
    labels: Mutex<IslandLabels>,
}

impl ProfileIslands {
    fn new(max_island_size: u32) -> Self {
        Self {
            islands: Islands::new(),
            labels: Mutex::new(IslandLabels::new(max_island_size)),
        }
    }

    /// Confirmed results of the analysis.
    pub fn islands(&self) -> &Islands {
        &self.islands
    }
}

type InFlight = Arc<OnceCell<bool>>;

/// IslandManager keeps island analysis state for every profile used with a
/// [RoutingNetwork], and makes sure each tile is analyzed at most once at a time.
#[derive(Debug)]
pub struct IslandManager {
    max_island_size: u32,
    profiles: RwLock<HashMap<String, Arc<ProfileIslands>>>,
    in_flight: RwLock<HashMap<(String, u32), InFlight>>,
}

impl IslandManager {
    pub fn new(max_island_size: u32) -> Self {
        Self {
            max_island_size,
            profiles: RwLock::new(HashMap::new()),
            in_flight: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_island_size(&self) -> u32 {
        self.max_island_size
    }

    /// Returns the analysis state of a profile, creating it if necessary.
    pub fn profile(&self, name: &str) -> Arc<ProfileIslands> {
        if let Some(p) = self.profiles.read().get(name) {
            return p.clone();
        }

        self.profiles
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(ProfileIslands::new(self.max_island_size)))
            .clone()
    }

    /// Forgets the state of all profiles.
    ///
    /// Analyses already running finish on the old state.
    pub fn clear(&self) {
        self.profiles.write().clear();
    }

    /// Analyzes all edges around vertices of a tile, unless it has already been done.
    ///
    /// Concurrent calls for the same profile and tile share a single analysis.
    /// Returns false if the analysis was cancelled.
    pub async fn build_for_tile(
        &self,
        network: &RoutingNetwork,
        cost: &dyn CostFunction,
        tile_id: u32,
        cancel: &CancellationToken,
    ) -> Result<bool, IslandError> {
        let profile = self.profile(cost.profile_name());
        if profile.islands.is_tile_done(tile_id) {
            return Ok(true);
        }

        let key = (cost.profile_name().to_string(), tile_id);
        let cell = self.in_flight_cell(&key);

        let result = cell
            .get_or_try_init(|| async {
                let mut labels = profile.labels.lock().await;
                if profile.islands.is_tile_done(tile_id) {
                    return Ok(true);
                }

                let built = builder::build_for_tile(
                    network,
                    &profile.islands,
                    &mut labels,
                    cost,
                    tile_id,
                    cancel,
                )
                .await;

                // Cancelled builds aren't shared, so that later calls may retry
                let result: Result<bool, Option<IslandError>> = match built {
                    Ok(true) => Ok(true),
                    Ok(false) => Err(None),
                    Err(err) => Err(Some(err)),
                };
                result
            })
            .await
            .map(|&done| done);

        {
            let mut in_flight = self.in_flight.write();
            if in_flight.get(&key).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
                in_flight.remove(&key);
            }
        }

        match result {
            Ok(done) => Ok(done),
            Err(None) => Ok(false),
            Err(Some(err)) => Err(err),
        }
    }

    /// Checks whether an edge lies on an island for the profile of the cost function,
    /// analyzing the edge's tile first if necessary.
    ///
    /// Returns `None` if the answer is unknown, e.g. because the analysis was cancelled.
    pub async fn is_on_island(
        &self,
        network: &RoutingNetwork,
        cost: &dyn CostFunction,
        edge: EdgeId,
        cancel: &CancellationToken,
    ) -> Result<Option<bool>, IslandError> {
        let profile = self.profile(cost.profile_name());
        if let Some(answer) = profile.islands.is_edge_on_island(edge) {
            return Ok(Some(answer));
        }

        self.build_for_tile(network, cost, edge.tile_id, cancel).await?;
        Ok(profile.islands.is_edge_on_island(edge))
    }

    fn in_flight_cell(&self, key: &(String, u32)) -> InFlight {
        let in_flight = self.in_flight.upgradable_read();
        if let Some(cell) = in_flight.get(key) {
            return cell.clone();
        }

        let mut in_flight = RwLockUpgradableReadGuard::upgrade(in_flight);
        in_flight.entry(key.clone()).or_default().clone()
    }
}

/// Copies confirmed results of every profile. Labels and running analyses are not copied.
impl Clone for IslandManager {
    fn clone(&self) -> Self {
        let profiles = self
            .profiles
            .read()
            .iter()
            .map(|(name, p)| {
                let copy = ProfileIslands {
                    islands: p.islands.clone(),
                    labels: Mutex::new(IslandLabels::new(self.max_island_size)),
                };
                (name.clone(), Arc::new(copy))
            })
            .collect();

        Self {
            max_island_size: self.max_island_size,
            profiles: RwLock::new(profiles),
            in_flight: RwLock::new(HashMap::new()),
        }
    }
}
