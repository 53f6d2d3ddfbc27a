// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BTreeSet, HashMap};

use super::graph::IslandLabelGraph;
use crate::EdgeId;

/// Label of the component joining all edges known to belong to
/// components larger than the island size limit.
pub const NOT_AN_ISLAND_LABEL: u32 = 0;

/// An edge, together with the direction it's traversed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirectedEdge {
    pub edge: EdgeId,
    pub forward: bool,
}

impl DirectedEdge {
    pub fn new(edge: EdgeId, forward: bool) -> Self {
        Self { edge, forward }
    }

    pub fn reversed(self) -> Self {
        Self {
            edge: self.edge,
            forward: !self.forward,
        }
    }
}

/// Size and state of a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelDetails {
    /// Number of directed edges in the component, [u32::MAX] for [NOT_AN_ISLAND_LABEL].
    pub size: u32,

    /// False once all edges of the component are known; the size is then final.
    pub can_grow: bool,
}

impl LabelDetails {
    const NOT_AN_ISLAND: Self = Self {
        size: u32::MAX,
        can_grow: false,
    };
}

/// IslandLabels assigns directed edges to (partially discovered) strongly
/// connected components, identified by labels.
///
/// Components are merged whenever they're found to be mutually reachable.
/// Merged labels are tracked with a disjoint-set forest, so label ids handed out
/// earlier stay valid: they resolve to the label of the merged component.
#[derive(Debug, Clone)]
pub struct IslandLabels {
    max_island_size: u32,
    edges: HashMap<DirectedEdge, u32>,
    parents: Vec<u32>,
    details: Vec<LabelDetails>,
    graph: IslandLabelGraph,
}

impl IslandLabels {
    pub fn new(max_island_size: u32) -> Self {
        Self {
            max_island_size,
            edges: HashMap::new(),
            parents: vec![NOT_AN_ISLAND_LABEL],
            details: vec![LabelDetails::NOT_AN_ISLAND],
            graph: IslandLabelGraph::default(),
        }
    }

    pub fn max_island_size(&self) -> u32 {
        self.max_island_size
    }

    /// Number of labelled directed edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Resolves a (possibly merged) label to the label of its component.
    pub fn find(&mut self, label: u32) -> u32 {
        let mut root = label;
        while self.parents[root as usize] != root {
            root = self.parents[root as usize];
        }

        let mut current = label;
        while self.parents[current as usize] != root {
            let next = self.parents[current as usize];
            self.parents[current as usize] = root;
            current = next;
        }

        return root;
    }

    /// Returns the label of an edge, if it has one.
    pub fn get(&mut self, edge: DirectedEdge) -> Option<u32> {
        let label = *self.edges.get(&edge)?;
        Some(self.find(label))
    }

    pub fn try_get_with_details(&mut self, edge: DirectedEdge) -> Option<(u32, LabelDetails)> {
        let label = self.get(edge)?;
        Some((label, self.details[label as usize]))
    }

    pub fn details(&mut self, label: u32) -> LabelDetails {
        let label = self.find(label);
        self.details[label as usize]
    }

    /// Assigns an edge a new singleton label.
    ///
    /// Panics if the edge already has a label.
    pub fn add_new(&mut self, edge: DirectedEdge, can_grow: bool) -> u32 {
        let label = self.parents.len() as u32;
        assert!(label != u32::MAX, "too many island labels");

        self.parents.push(label);
        self.details.push(LabelDetails { size: 1, can_grow });
        let previous = self.edges.insert(edge, label);
        assert!(previous.is_none(), "{edge:?} already has a label");

        if 1 > self.max_island_size {
            return self.mark_not_an_island(label);
        }
        return label;
    }

    /// Adds an edge to an existing component. Returns the (possibly changed) label
    /// of the component.
    ///
    /// Panics if the edge already has a label.
    pub fn add_to(&mut self, label: u32, edge: DirectedEdge) -> u32 {
        let label = self.find(label);
        let previous = self.edges.insert(edge, label);
        assert!(previous.is_none(), "{edge:?} already has a label");

        if label == NOT_AN_ISLAND_LABEL {
            return label;
        }

        let details = &mut self.details[label as usize];
        details.size += 1;
        if details.size > self.max_island_size {
            return self.mark_not_an_island(label);
        }
        return label;
    }

    /// Records that some edge of `tail` leads to some edge of `head`.
    ///
    /// If this makes the two components mutually reachable, all components
    /// on the closed cycle are merged. Returns true if a merge happened.
    pub fn connect_to(&mut self, tail: u32, head: u32) -> bool {
        let tail = self.find(tail);
        let head = self.find(head);
        if tail == head {
            return false;
        }

        match self.graph.connect(tail, head) {
            Some(cycle) => {
                self.merge(cycle);
                true
            }
            None => false,
        }
    }

    /// Marks the component as fully discovered.
    pub fn set_as_complete(&mut self, label: u32) {
        let label = self.find(label);
        self.details[label as usize].can_grow = false;
    }

    /// Merges mutually reachable components into the lowest label. Returns the surviving label.
    fn merge(&mut self, labels: BTreeSet<u32>) -> u32 {
        let Some(&into) = labels.first() else {
            panic!("merging an empty set of labels");
        };

        let mut merged = self.details[into as usize];
        for &label in labels.iter().skip(1) {
            let details = self.details[label as usize];
            merged.size = merged.size.saturating_add(details.size);
            merged.can_grow &= details.can_grow;
            self.parents[label as usize] = into;
        }

        if into == NOT_AN_ISLAND_LABEL {
            merged = LabelDetails::NOT_AN_ISLAND;
        }
        self.details[into as usize] = merged;
        self.graph.merge(&labels, into);

        if into != NOT_AN_ISLAND_LABEL && merged.size > self.max_island_size {
            return self.mark_not_an_island(into);
        }
        return into;
    }

    /// Merges an oversized component into [NOT_AN_ISLAND_LABEL],
    /// together with everything on a path between the two.
    fn mark_not_an_island(&mut self, label: u32) -> u32 {
        log::trace!("island label {label} exceeds {} edges", self.max_island_size);

        if let Some(cycle) = self.graph.connect(label, NOT_AN_ISLAND_LABEL) {
            return self.merge(cycle);
        }

        match self.graph.connect(NOT_AN_ISLAND_LABEL, label) {
            Some(cycle) => self.merge(cycle),
            None => panic!("label {label} not merged into the not-an-island label"),
        }
    }
}
