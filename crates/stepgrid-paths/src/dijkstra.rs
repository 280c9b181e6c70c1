//! Single-source shortest-path costs, computed in one shot.
//!
//! [`CostMap`] runs a plain Dijkstra over the same adjacency and movement
//! costs the incremental engine uses. It is the yardstick for judging what a
//! heuristic did to path quality: with an admissible heuristic the engine's
//! goal cost equals [`CostMap::at`] for the goal.

use std::collections::BinaryHeap;

use stepgrid_core::{Grid, Point, Range};

use crate::error::PathError;

/// Sentinel for cells the source cannot reach.
pub const UNREACHABLE: i32 = i32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeRef {
    idx: usize,
    g: i32,
}

impl Ord for NodeRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse so BinaryHeap (max-heap) pops smallest g first.
        other.g.cmp(&self.g).then_with(|| other.idx.cmp(&self.idx))
    }
}

impl PartialOrd for NodeRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Cheapest cost from a source cell to every cell of a grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostMap {
    source: Point,
    bounds: Range,
    costs: Vec<i32>,
}

impl CostMap {
    /// Compute the cost map from `source`.
    ///
    /// Fails with [`PathError::InvalidCell`] if `source` is out of bounds or
    /// blocked.
    pub fn compute(grid: &Grid, source: Point) -> Result<Self, PathError> {
        let si = grid
            .index(source)
            .filter(|&i| !grid.is_blocked_at(i))
            .ok_or(PathError::InvalidCell(source))?;

        let mut costs = vec![UNREACHABLE; grid.len()];
        let mut open = BinaryHeap::new();
        let mut nbuf = Vec::with_capacity(4);
        costs[si] = 0;
        open.push(NodeRef { idx: si, g: 0 });

        while let Some(NodeRef { idx: ci, g }) = open.pop() {
            if g > costs[ci] {
                continue;
            }
            nbuf.clear();
            grid.open_neighbors_at(ci, &mut nbuf);
            for &ni in &nbuf {
                let tentative = g.saturating_add(grid.cost_at(ni));
                if tentative < costs[ni] {
                    costs[ni] = tentative;
                    open.push(NodeRef {
                        idx: ni,
                        g: tentative,
                    });
                }
            }
        }

        Ok(Self {
            source,
            bounds: grid.range(),
            costs,
        })
    }

    #[inline]
    pub fn source(&self) -> Point {
        self.source
    }

    /// Cheapest cost to `p`, or `None` if it is unreachable or out of range.
    pub fn at(&self, p: Point) -> Option<i32> {
        let i = self.bounds.index(p)?;
        self.costs.get(i).copied().filter(|&c| c != UNREACHABLE)
    }

    /// Number of cells reachable from the source, the source included.
    pub fn reachable(&self) -> usize {
        self.costs.iter().filter(|&&c| c != UNREACHABLE).count()
    }
}
