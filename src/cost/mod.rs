// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Interpretation of edges for a specific mode of travel.

use crate::{EdgeId, RoutingNetworkEdgeEnumerator};

mod adapter;
mod profile;

pub use adapter::ProfileCostFunction;
pub use profile::{
    EdgeFactor, Penalty, Profile, TagProfile, TurnRestriction, BICYCLE_PROFILE, CAR_PROFILE,
    FOOT_PROFILE,
};

/// Result of evaluating an edge with a [CostFunction].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCost {
    /// Whether the edge may be traversed in the requested direction at all.
    pub can_access: bool,

    /// Whether a route may start or end on this edge.
    pub can_stop: bool,

    /// Cost of traversing the edge.
    pub cost: f64,

    /// Cost of turning onto the edge from the previous one;
    /// [f64::INFINITY] if the turn is prohibited.
    pub turn_cost: f64,
}

impl EdgeCost {
    pub const INACCESSIBLE: Self = Self {
        can_access: false,
        can_stop: false,
        cost: f64::INFINITY,
        turn_cost: 0.0,
    };

    /// True if the edge can be accessed with a finite cost, including the turn.
    pub fn is_traversable(&self) -> bool {
        self.can_access && self.cost.is_finite() && self.turn_cost.is_finite()
    }
}

/// CostFunction evaluates edges for a single travel profile.
///
/// Different cost functions with the same [profile_name](CostFunction::profile_name)
/// must agree on which edges are traversable, as island state is kept per profile name.
pub trait CostFunction: Send + Sync {
    fn profile_name(&self) -> &str;

    /// Evaluates the edge under the cursor, in the direction of the cursor.
    ///
    /// `previous` lists edges traversed before, most recent first, together with their
    /// turn orders at the vertex where they meet the next edge. It's empty if the route
    /// starts at this edge.
    fn get(&self, edge: &RoutingNetworkEdgeEnumerator<'_>, previous: &[(EdgeId, Option<u8>)]) -> EdgeCost;
}
