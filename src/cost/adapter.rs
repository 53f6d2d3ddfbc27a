// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{CostFunction, EdgeCost, EdgeFactor, Profile};
use crate::tile::TURN_PROHIBITED;
use crate::{EdgeId, EdgeTypeMap, RoutingNetworkEdgeEnumerator};

/// [CostFunction] computing costs with a [Profile].
///
/// Edge factors are cached per edge type, but only for edges classified by
/// this cost function's own [EdgeTypeMap] (which guarantees that equal types
/// mean equal factors). Install it with
/// [RoutingNetwork::set_edge_type_map](crate::RoutingNetwork::set_edge_type_map)
/// for the cache to kick in. Edges classified by any other map, even one with
/// the same id, are evaluated from their attributes.
pub struct ProfileCostFunction<P> {
    profile: P,
    edge_type_map: EdgeTypeMap,
    factors: RwLock<HashMap<u32, EdgeFactor>>,
}

impl<P: Profile> ProfileCostFunction<P> {
    /// Creates a cost function for a profile.
    ///
    /// `edge_type_map_id` should be unique among all edge type maps used with a network:
    /// a network only re-derives edge types when the id of its map changes. Two cost
    /// functions built with the same id never share cached factors, but the network
    /// doesn't re-derive edge types when switching between their maps.
    pub fn new(profile: P, edge_type_map_id: u32) -> Self {
        let edge_type_map = EdgeTypeMap::for_keys(edge_type_map_id, profile.attribute_keys());
        Self {
            profile,
            edge_type_map,
            factors: RwLock::new(HashMap::new()),
        }
    }

    pub fn profile(&self) -> &P {
        &self.profile
    }

    /// Edge type map grouping edges by all attributes read by the profile.
    pub fn edge_type_map(&self) -> &EdgeTypeMap {
        &self.edge_type_map
    }

    fn factor(&self, edge: &RoutingNetworkEdgeEnumerator<'_>) -> EdgeFactor {
        if !edge.edge_type_map().is_same(&self.edge_type_map) {
            return self.profile.factor(edge.attributes());
        }

        let edge_type = edge.edge_type_id();
        if let Some(&factor) = self.factors.read().get(&edge_type) {
            return factor;
        }

        let factor = self.profile.factor(edge.attributes());
        self.factors.write().insert(edge_type, factor);
        factor
    }

    /// Sums the costs of turning from the most recent previous edge onto `edge`.
    fn turn_cost(&self, edge: &RoutingNetworkEdgeEnumerator<'_>, previous: &[(EdgeId, Option<u8>)]) -> f64 {
        let Some(&(_, Some(from_order))) = previous.first() else {
            return 0.0;
        };

        let mut total = 0.0;
        for (attributes, cost) in edge.turn_cost_to_tail(from_order) {
            let factor = self.profile.turn_cost_factor(attributes);
            if factor <= 0.0 {
                continue;
            }
            if cost == TURN_PROHIBITED {
                return f64::INFINITY;
            }
            total += cost as f64 * factor;
        }
        total
    }
}

impl<P: Profile> CostFunction for ProfileCostFunction<P> {
    fn profile_name(&self) -> &str {
        self.profile.name()
    }

    fn get(&self, edge: &RoutingNetworkEdgeEnumerator<'_>, previous: &[(EdgeId, Option<u8>)]) -> EdgeCost {
        let factor = self.factor(edge);
        let multiplier = factor.in_direction(edge.forward());
        if multiplier <= 0.0 {
            return EdgeCost::INACCESSIBLE;
        }

        EdgeCost {
            can_access: true,
            can_stop: factor.can_stop,
            cost: edge.length() * multiplier,
            turn_cost: self.turn_cost(edge, previous),
        }
    }
}

impl<P: Profile> std::fmt::Debug for ProfileCostFunction<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileCostFunction")
            .field("profile", &self.profile.name())
            .field("edge_type_map", &self.edge_type_map.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CAR_PROFILE;
    use crate::{attributes, EdgeDetails, NetworkOptions, RoutingNetwork, VertexId};

    /// A T-junction at `center`: a two-way residential road to the north and
    /// to the east, and a one-way road coming in from the west.
    fn junction() -> (RoutingNetwork, VertexId, [EdgeId; 3]) {
        let network = RoutingNetwork::new(NetworkOptions::default()).unwrap();
        let mut writer = network.writer().unwrap();
        let center = writer.add_vertex(0.005, 0.005, None).unwrap();
        let north = writer.add_vertex(0.005, 0.006, None).unwrap();
        let east = writer.add_vertex(0.006, 0.005, None).unwrap();
        let west = writer.add_vertex(0.004, 0.005, None).unwrap();

        let residential = EdgeDetails {
            attributes: attributes! {"highway" => "residential"},
            distance: Some(100.0),
            ..EdgeDetails::default()
        };
        let one_way = EdgeDetails {
            attributes: attributes! {"highway" => "residential", "oneway" => "yes"},
            distance: Some(100.0),
            ..EdgeDetails::default()
        };

        let cn = writer.add_edge(center, north, &residential).unwrap();
        let ce = writer.add_edge(center, east, &residential).unwrap();
        let wc = writer.add_edge(west, center, &one_way).unwrap();

        // No left turn from west to north
        writer
            .add_turn_costs(
                center,
                &attributes! {"type" => "restriction", "restriction" => "no_left_turn"},
                &[wc, cn],
                &[0, TURN_PROHIBITED, 0, 0],
            )
            .unwrap();
        drop(writer);

        (network, center, [cn, ce, wc])
    }

    #[test]
    fn respects_direction() {
        let (network, _, [cn, _, wc]) = junction();
        let cost = ProfileCostFunction::new(CAR_PROFILE, 1);
        let mut e = network.edge_enumerator();

        assert!(e.move_to(cn, true));
        let c = cost.get(&e, &[]);
        assert!(c.is_traversable());
        assert_eq!(c.cost, 1500.0);
        assert_eq!(c.turn_cost, 0.0);

        assert!(e.move_to(wc, true));
        assert!(cost.get(&e, &[]).is_traversable());
        assert!(e.move_to(wc, false));
        assert_eq!(cost.get(&e, &[]), EdgeCost::INACCESSIBLE);
    }

    #[test]
    fn applies_turn_restrictions() {
        let (network, _, [cn, ce, wc]) = junction();
        let cost = ProfileCostFunction::new(CAR_PROFILE, 1);
        let mut e = network.edge_enumerator();

        assert!(e.move_to(wc, true));
        let arrival = (wc, e.head_order());
        assert_eq!(arrival.1, Some(0));

        assert!(e.move_to(cn, true));
        let c = cost.get(&e, &[arrival]);
        assert!(c.can_access);
        assert_eq!(c.turn_cost, f64::INFINITY);
        assert!(!c.is_traversable());

        // The east road has no turn order, hence no turn costs
        assert!(e.move_to(ce, true));
        assert_eq!(cost.get(&e, &[arrival]).turn_cost, 0.0);

        // Restrictions are ignored when the profile exempts them
        let exempt = crate::cost::TagProfile {
            disable_restrictions: true,
            ..CAR_PROFILE
        };
        let cost = ProfileCostFunction::new(exempt, 2);
        assert!(e.move_to(cn, true));
        assert_eq!(cost.get(&e, &[arrival]).turn_cost, 0.0);
    }

    #[test]
    fn caches_factors_per_edge_type() {
        let (network, _, [cn, _, wc]) = junction();
        let cost = ProfileCostFunction::new(CAR_PROFILE, 1);
        network.set_edge_type_map(cost.edge_type_map().clone());

        let mut e = network.edge_enumerator();
        assert!(e.move_to(cn, true));
        assert_eq!(cost.get(&e, &[]).cost, 1500.0);
        assert!(e.move_to(wc, false));
        assert!(!cost.get(&e, &[]).can_access);

        // Two distinct edge types: two-way and one-way residential
        assert_eq!(cost.factors.read().len(), 2);
    }

    #[test]
    fn functions_with_equal_ids_keep_separate_caches() {
        let (network, _, [cn, _, _]) = junction();
        let (other, _, [_, _, other_wc]) = junction();
        let first = ProfileCostFunction::new(CAR_PROFILE, 1);
        let second = ProfileCostFunction::new(CAR_PROFILE, 1);

        // The second function's table sees the one-way road first
        let one_way = attributes! {"highway" => "residential", "oneway" => "yes"};
        assert_eq!(second.edge_type_map().get(&one_way), 0);
        other.set_edge_type_map(second.edge_type_map().clone());
        let mut o = other.edge_enumerator();
        assert!(o.move_to(other_wc, false));
        assert_eq!(o.edge_type_id(), 0);
        assert_eq!(second.get(&o, &[]), EdgeCost::INACCESSIBLE);
        assert!(second.factors.read().contains_key(&0));

        // In the first function's table, type 0 is the two-way road
        network.set_edge_type_map(first.edge_type_map().clone());
        let mut e = network.edge_enumerator();
        assert!(e.move_to(cn, false));
        assert_eq!(e.edge_type_id(), 0);
        assert!(second.get(&e, &[]).is_traversable());
        assert!(first.get(&e, &[]).is_traversable());
    }

    #[test]
    fn turn_restrictions_apply_after_cross_tile_edges() {
        let network = RoutingNetwork::new(NetworkOptions::default()).unwrap();
        let (wc, cn) = {
            let mut writer = network.writer().unwrap();
            let west = writer.add_vertex(0.0100, 0.0010, None).unwrap();
            let center = writer.add_vertex(0.0300, 0.0010, None).unwrap();
            let north = writer.add_vertex(0.0300, 0.0020, None).unwrap();
            let road = EdgeDetails {
                attributes: attributes! {"highway" => "residential"},
                ..EdgeDetails::default()
            };
            let wc = writer.add_edge(west, center, &road).unwrap();
            let cn = writer.add_edge(center, north, &road).unwrap();
            writer
                .add_turn_costs(
                    center,
                    &attributes! {"type" => "restriction", "restriction" => "no_left_turn"},
                    &[wc, cn],
                    &[0, TURN_PROHIBITED, 0, 0],
                )
                .unwrap();
            (wc, cn)
        };
        assert_ne!(wc.tile_id, cn.tile_id);

        let cost = ProfileCostFunction::new(CAR_PROFILE, 1);
        let mut e = network.edge_enumerator();
        assert!(e.move_to(wc, true));
        let arrival = (wc, e.head_order());
        assert_eq!(arrival.1, Some(0));

        assert!(e.move_to(cn, true));
        assert_eq!(cost.get(&e, &[arrival]).turn_cost, f64::INFINITY);

        // The other way around is allowed
        assert!(e.move_to(cn, false));
        let arrival = (cn, e.head_order());
        assert!(e.move_to(wc, false));
        assert_eq!(cost.get(&e, &[arrival]).turn_cost, 0.0);
    }
}
