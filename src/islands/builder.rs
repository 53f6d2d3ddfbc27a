// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashSet};

use tokio_util::sync::CancellationToken;

use super::labels::{DirectedEdge, IslandLabels, NOT_AN_ISLAND_LABEL};
use super::{IslandError, Islands};
use crate::cost::CostFunction;
use crate::{EdgeId, RoutingNetwork, VertexId};

/// Callback providing already known answers for edges, see [is_on_island].
pub type KnownIslandEdges<'a> = &'a (dyn Fn(EdgeId) -> Option<bool> + Send + Sync);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Search {
    /// Follows edges leaving the explored set.
    Forward = 0,

    /// Follows edges entering the explored set.
    Backward = 1,
}

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    hops: u32,
    edge: DirectedEdge,
    search: Search,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.hops == other.hops
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // NOTE: Reversed, as BinaryHeap is a max-heap and closer edges go first.
        other.hops.cmp(&self.hops)
    }
}

/// Checks whether an edge lies on an island: a strongly connected component
/// (of directed edges, under the given cost function) with at most
/// [max_island_size](IslandLabels::max_island_size) edges.
///
/// Returns `None` if the edge isn't traversable in either direction.
///
/// The search explores edges reachable from the edge and edges from which the edge
/// can be reached, in order of distance (in edges), recording discovered connections
/// in `labels`. It stops as soon as the edge's component provably exceeds the size
/// limit, or once either search runs out of edges without hitting components already
/// known to be too big, in which case the component is complete.
///
/// `known` may provide definitive answers for some edges (e.g. from previously analyzed
/// tiles), which are used instead of exploring past such edges.
///
/// Cancellation stops the search with a conservative `Some(true)`.
pub async fn is_on_island(
    network: &RoutingNetwork,
    labels: &mut IslandLabels,
    cost: &dyn CostFunction,
    edge: EdgeId,
    known: Option<KnownIslandEdges<'_>>,
    cancel: &CancellationToken,
) -> Result<Option<bool>, IslandError> {
    let (vertex1, vertex2) = network
        .edge_endpoints(edge)
        .ok_or(IslandError::EdgeNotFound(edge))?;
    network.usage_notify_vertex(vertex1, cancel).await;
    network.usage_notify_vertex(vertex2, cancel).await;

    let root = if is_traversable(network, cost, DirectedEdge::new(edge, true)) {
        DirectedEdge::new(edge, true)
    } else if is_traversable(network, cost, DirectedEdge::new(edge, false)) {
        DirectedEdge::new(edge, false)
    } else {
        return Ok(None);
    };

    if labels.get(root).is_none() {
        label_new(labels, root, known);
    }
    if let Some(answer) = root_state(labels, root) {
        return Ok(Some(answer));
    }

    let mut queue = BinaryHeap::from([
        QueueItem {
            hops: 0,
            edge: root,
            search: Search::Forward,
        },
        QueueItem {
            hops: 0,
            edge: root,
            search: Search::Backward,
        },
    ]);
    let mut visited = [HashSet::from([root]), HashSet::from([root])];
    let mut pending = [1usize, 1usize];
    let mut truncated = [false, false];

    while let Some(item) = queue.pop() {
        if cancel.is_cancelled() {
            log::debug!("island search from {edge} cancelled");
            return Ok(Some(true));
        }

        let s = item.search as usize;
        pending[s] -= 1;

        let neighbours = match item.search {
            Search::Forward => successors(network, cost, item.edge, cancel).await,
            Search::Backward => predecessors(network, cost, item.edge, cancel).await,
        };

        for neighbour in neighbours {
            let Some(current) = labels.get(item.edge) else {
                panic!("explored edge {:?} has no label", item.edge);
            };
            let label = match labels.get(neighbour) {
                Some(label) => label,
                None => label_new(labels, neighbour, known),
            };

            match item.search {
                Search::Forward => labels.connect_to(current, label),
                Search::Backward => labels.connect_to(label, current),
            };

            if let Some(answer) = root_state(labels, root) {
                log::trace!("edge {edge} on island: {answer}");
                return Ok(Some(answer));
            }

            let label = labels.find(label);
            if label == NOT_AN_ISLAND_LABEL {
                truncated[s] = true;
                continue;
            }
            if !labels.details(label).can_grow {
                continue;
            }

            if visited[s].insert(neighbour) {
                pending[s] += 1;
                queue.push(QueueItem {
                    hops: item.hops + 1,
                    edge: neighbour,
                    search: item.search,
                });
            }
        }

        if pending[s] == 0 && !truncated[s] {
            break;
        }
    }

    if let Some(answer) = root_state(labels, root) {
        return Ok(Some(answer));
    }

    // One of the searches (or both) found every edge of the component
    let Some(label) = labels.get(root) else {
        panic!("root edge {root:?} has no label");
    };
    let size = labels.details(label).size;
    assert!(
        size <= labels.max_island_size(),
        "a large island without the not-an-island label: {size} edges"
    );
    labels.set_as_complete(label);
    log::trace!("edge {edge} is on an island of {size} edges");
    Ok(Some(true))
}

/// Runs [is_on_island] for every edge incident to any vertex of a tile,
/// and records the results in `islands`.
///
/// Returns false (without marking the tile as done) if cancelled.
pub async fn build_for_tile(
    network: &RoutingNetwork,
    islands: &Islands,
    labels: &mut IslandLabels,
    cost: &dyn CostFunction,
    tile_id: u32,
    cancel: &CancellationToken,
) -> Result<bool, IslandError> {
    let known: KnownIslandEdges<'_> = &|edge| islands.is_edge_on_island(edge);
    let bounds = crate::tiles::tile_bounds(tile_id, network.zoom());
    network.usage_notify_box(bounds, cancel).await;

    let vertices: Vec<VertexId> = network.tile_vertex_enumerator(tile_id).collect();
    let mut decided = HashSet::new();
    let mut island_edges = Vec::new();

    for vertex in vertices {
        if cancel.is_cancelled() {
            log::warn!("island analysis of tile {tile_id} cancelled");
            return Ok(false);
        }

        for edge in incident_edges(network, vertex) {
            if !decided.insert(edge) {
                continue;
            }

            let answer = is_on_island(network, labels, cost, edge, Some(known), cancel).await?;
            if cancel.is_cancelled() {
                log::warn!("island analysis of tile {tile_id} cancelled");
                return Ok(false);
            }
            if answer == Some(true) {
                island_edges.push(edge);
            }
        }
    }

    log::debug!(
        "tile {tile_id}: {} of {} edges on islands for {}",
        island_edges.len(),
        decided.len(),
        cost.profile_name()
    );
    islands.complete_tile(tile_id, island_edges);
    Ok(true)
}

fn label_new(labels: &mut IslandLabels, edge: DirectedEdge, known: Option<KnownIslandEdges<'_>>) -> u32 {
    match known.and_then(|known| known(edge.edge)) {
        Some(false) => labels.add_to(NOT_AN_ISLAND_LABEL, edge),
        Some(true) => labels.add_new(edge, false),
        None => labels.add_new(edge, true),
    }
}

/// Returns `Some(false)` if the root is known not to be on an island,
/// `Some(true)` if its component is complete, `None` if it's unknown.
fn root_state(labels: &mut IslandLabels, root: DirectedEdge) -> Option<bool> {
    let (label, details) = labels.try_get_with_details(root)?;
    if label == NOT_AN_ISLAND_LABEL {
        Some(false)
    } else if !details.can_grow {
        Some(true)
    } else {
        None
    }
}

fn is_traversable(network: &RoutingNetwork, cost: &dyn CostFunction, edge: DirectedEdge) -> bool {
    let mut e = network.edge_enumerator();
    e.move_to(edge.edge, edge.forward) && cost.get(&e, &[]).is_traversable()
}

fn incident_edges(network: &RoutingNetwork, vertex: VertexId) -> Vec<EdgeId> {
    let mut e = network.edge_enumerator();
    let mut edges = Vec::new();
    if e.move_to_vertex(vertex) {
        while e.move_next() {
            edges.push(e.edge_id());
        }
    }
    edges
}

/// Lists directed edges which may be taken right after `edge`.
async fn successors(
    network: &RoutingNetwork,
    cost: &dyn CostFunction,
    edge: DirectedEdge,
    cancel: &CancellationToken,
) -> Vec<DirectedEdge> {
    let (head, head_order) = {
        let mut e = network.edge_enumerator();
        if !e.move_to(edge.edge, edge.forward) {
            return Vec::new();
        }
        (e.head(), e.head_order())
    };
    network.usage_notify_vertex(head, cancel).await;

    let previous = [(edge.edge, head_order)];
    let mut n = network.edge_enumerator();
    let mut found = Vec::new();
    if n.move_to_vertex(head) {
        while n.move_next() {
            if cost.get(&n, &previous).is_traversable() {
                found.push(DirectedEdge::new(n.edge_id(), n.forward()));
            }
        }
    }
    found
}

/// Lists directed edges after which `edge` may be taken.
async fn predecessors(
    network: &RoutingNetwork,
    cost: &dyn CostFunction,
    edge: DirectedEdge,
    cancel: &CancellationToken,
) -> Vec<DirectedEdge> {
    let Some(tail) = tail_of(network, edge) else {
        return Vec::new();
    };
    network.usage_notify_vertex(tail, cancel).await;

    // Edges at the tail, reversed to arrive at it
    let candidates: Vec<(DirectedEdge, VertexId)> = {
        let mut n = network.edge_enumerator();
        let mut candidates = Vec::new();
        if n.move_to_vertex(tail) {
            while n.move_next() {
                candidates.push((DirectedEdge::new(n.edge_id(), !n.forward()), n.head()));
            }
        }
        candidates
    };
    for &(_, far) in &candidates {
        network.usage_notify_vertex(far, cancel).await;
    }

    let mut current = network.edge_enumerator();
    if !current.move_to(edge.edge, edge.forward) {
        return Vec::new();
    }

    let mut p = network.edge_enumerator();
    let mut found = Vec::new();
    for (predecessor, _) in candidates {
        if !p.move_to(predecessor.edge, predecessor.forward) || !cost.get(&p, &[]).is_traversable() {
            continue;
        }
        if cost
            .get(&current, &[(predecessor.edge, p.head_order())])
            .is_traversable()
        {
            found.push(predecessor);
        }
    }
    found
}

fn tail_of(network: &RoutingNetwork, edge: DirectedEdge) -> Option<VertexId> {
    let mut e = network.edge_enumerator();
    e.move_to(edge.edge, edge.forward).then(|| e.tail())
}
