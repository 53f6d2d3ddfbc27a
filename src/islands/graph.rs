// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Directed graph over island labels, recording "some edge of `tail` leads to
/// some edge of `head`" facts.
///
/// The graph is kept acyclic: a connection closing a cycle is reported back
/// as the set of labels on the cycle, which are all mutually reachable and
/// must be merged with [IslandLabelGraph::merge].
#[derive(Debug, Clone, Default)]
pub(super) struct IslandLabelGraph {
    outgoing: HashMap<u32, HashSet<u32>>,
    incoming: HashMap<u32, HashSet<u32>>,
}

impl IslandLabelGraph {
    pub(super) fn has_edge(&self, tail: u32, head: u32) -> bool {
        self.outgoing
            .get(&tail)
            .is_some_and(|heads| heads.contains(&head))
    }

    /// Adds a `tail → head` connection.
    ///
    /// Returns the labels of all cycles closed by the new connection (sorted,
    /// including `tail` and `head`), or `None` if the graph remains acyclic.
    pub(super) fn connect(&mut self, tail: u32, head: u32) -> Option<BTreeSet<u32>> {
        if tail == head || self.has_edge(tail, head) {
            return None;
        }

        let head_has_outgoing = self.outgoing.get(&head).is_some_and(|h| !h.is_empty());
        self.outgoing.entry(tail).or_default().insert(head);
        self.incoming.entry(head).or_default().insert(tail);

        if !head_has_outgoing {
            return None;
        }

        // Labels on the cycles are reachable from head and reach tail. Both sides are
        // explored in lockstep, and the side which runs out first bounds the other.
        let mut from_head = Search::new(&self.outgoing, head);
        let mut to_tail = Search::new(&self.incoming, tail);
        loop {
            if !from_head.step() {
                if !from_head.seen.contains(&tail) {
                    return None;
                }
                return Some(Self::reachable_within(&self.incoming, tail, &from_head.seen));
            }

            if !to_tail.step() {
                if !to_tail.seen.contains(&head) {
                    return None;
                }
                return Some(Self::reachable_within(&self.outgoing, head, &to_tail.seen));
            }
        }
    }

    /// Collapses all `labels` into `into`, re-attaching their external connections.
    pub(super) fn merge(&mut self, labels: &BTreeSet<u32>, into: u32) {
        debug_assert!(labels.contains(&into));

        for &label in labels.iter().filter(|&&l| l != into) {
            for head in self.outgoing.remove(&label).unwrap_or_default() {
                if let Some(tails) = self.incoming.get_mut(&head) {
                    tails.remove(&label);
                }
                if !labels.contains(&head) {
                    self.outgoing.entry(into).or_default().insert(head);
                    self.incoming.entry(head).or_default().insert(into);
                }
            }

            for tail in self.incoming.remove(&label).unwrap_or_default() {
                if let Some(heads) = self.outgoing.get_mut(&tail) {
                    heads.remove(&label);
                }
                if !labels.contains(&tail) {
                    self.incoming.entry(into).or_default().insert(tail);
                    self.outgoing.entry(tail).or_default().insert(into);
                }
            }
        }

        // Connections between the merged labels collapse into self-loops
        if let Some(heads) = self.outgoing.get_mut(&into) {
            heads.retain(|h| !labels.contains(h));
        }
        if let Some(tails) = self.incoming.get_mut(&into) {
            tails.retain(|t| !labels.contains(t));
        }
    }

    /// Returns all labels reachable from `start` (including `start`) without leaving `within`.
    fn reachable_within(
        adjacency: &HashMap<u32, HashSet<u32>>,
        start: u32,
        within: &HashSet<u32>,
    ) -> BTreeSet<u32> {
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(label) = queue.pop_front() {
            for &next in adjacency.get(&label).into_iter().flatten() {
                if within.contains(&next) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        return seen;
    }

    #[cfg(test)]
    fn edge_count(&self) -> usize {
        self.outgoing.values().map(HashSet::len).sum()
    }
}

/// Breadth-first search over the label graph, advanced one label at a time.
struct Search<'g> {
    adjacency: &'g HashMap<u32, HashSet<u32>>,
    seen: HashSet<u32>,
    queue: VecDeque<u32>,
}

impl<'g> Search<'g> {
    fn new(adjacency: &'g HashMap<u32, HashSet<u32>>, start: u32) -> Self {
        Self {
            adjacency,
            seen: HashSet::from([start]),
            queue: VecDeque::from([start]),
        }
    }

    /// Expands the next label. Returns false if all reachable labels have been seen.
    fn step(&mut self) -> bool {
        let Some(label) = self.queue.pop_front() else {
            return false;
        };
        for &next in self.adjacency.get(&label).into_iter().flatten() {
            if self.seen.insert(next) {
                self.queue.push_back(next);
            }
        }
        true
    }
}
