// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

/// Cost value marking a prohibited turn.
pub const TURN_PROHIBITED: u32 = u32::MAX;

/// Square matrix of costs for turning between edges incident to a vertex.
///
/// Rows and columns are addressed by the edges' turn orders at that vertex;
/// `orders[i]` is the turn order of the edge of row/column `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TurnCostTable {
    attributes: u32,
    orders: Vec<u8>,
    costs: Vec<u32>,
}

impl TurnCostTable {
    fn get(&self, from_order: u8, to_order: u8) -> Option<u32> {
        let from = self.orders.iter().position(|&o| o == from_order)?;
        let to = self.orders.iter().position(|&o| o == to_order)?;
        Some(self.costs[from * self.orders.len() + to])
    }
}

/// All turn cost tables of a single tile.
#[derive(Debug, Clone, Default)]
pub(super) struct TurnCosts {
    tables: Vec<TurnCostTable>,
    by_vertex: HashMap<u32, Vec<u32>>,
}

impl TurnCosts {
    pub(super) fn add(&mut self, vertex: u32, attributes: u32, orders: Vec<u8>, costs: Vec<u32>) {
        debug_assert_eq!(orders.len() * orders.len(), costs.len());
        let idx = self.tables.len() as u32;
        self.tables.push(TurnCostTable {
            attributes,
            orders,
            costs,
        });
        self.by_vertex.entry(vertex).or_default().push(idx);
    }

    /// Returns `(attributes, cost)` of every table at `vertex` with an entry
    /// for turning from the edge with `from_order` onto the edge with `to_order`.
    pub(super) fn get(
        &self,
        vertex: u32,
        from_order: u8,
        to_order: u8,
    ) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.by_vertex
            .get(&vertex)
            .map(|tables| tables.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |&idx| {
                let table = &self.tables[idx as usize];
                table
                    .get(from_order, to_order)
                    .map(|cost| (table.attributes, cost))
            })
    }

    pub(super) fn has_tables(&self, vertex: u32) -> bool {
        self.by_vertex.contains_key(&vertex)
    }
}
