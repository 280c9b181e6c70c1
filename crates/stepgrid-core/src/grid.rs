//! The [`Grid`] type: a fixed-size map of obstacle flags and movement costs.
//!
//! Dimensions are fixed at construction. In-bounds 4-neighbour adjacency is
//! computed once for every cell; obstacle state is applied on each query so
//! that toggling a cell never leaves a stale neighbour list behind.

use std::fmt;

use crate::geom::{Point, Range};

/// Movement cost of a freshly created cell.
pub const DEFAULT_COST: i32 = 1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by [`Grid`] mutators and queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    /// The cell identity lies outside the grid extents.
    OutOfBounds(Point),
    /// Movement costs must be at least 1.
    InvalidCost { pos: Point, cost: i32 },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds(p) => write!(f, "cell {p} is outside the grid"),
            Self::InvalidCost { pos, cost } => {
                write!(f, "invalid movement cost {cost} for cell {pos} (must be >= 1)")
            }
        }
    }
}

impl std::error::Error for GridError {}

// ---------------------------------------------------------------------------
// Adjacency
// ---------------------------------------------------------------------------

/// Up to four in-bounds neighbour indices of a cell.
#[derive(Debug, Clone, Copy, Default)]
struct Adjacency {
    ids: [usize; 4],
    len: u8,
}

impl Adjacency {
    fn push(&mut self, idx: usize) {
        self.ids[self.len as usize] = idx;
        self.len += 1;
    }

    #[inline]
    fn as_slice(&self) -> &[usize] {
        &self.ids[..self.len as usize]
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// A rectangular map with a blocked flag and a movement cost per cell.
///
/// Cells are addressed by [`Point`] with `0 <= x < width` and
/// `0 <= y < height`; [`index`](Grid::index) gives the row-major flat index
/// used by arenas that keep one slot per cell.
#[derive(Debug, Clone)]
pub struct Grid {
    bounds: Range,
    blocked: Vec<bool>,
    costs: Vec<i32>,
    adjacency: Vec<Adjacency>,
}

impl Grid {
    /// Create a new open grid where every cell costs [`DEFAULT_COST`].
    ///
    /// Negative dimensions are clamped to zero.
    pub fn new(width: i32, height: i32) -> Self {
        let bounds = Range::new(0, 0, width.max(0), height.max(0));
        let len = bounds.len();
        let mut grid = Self {
            bounds,
            blocked: vec![false; len],
            costs: vec![DEFAULT_COST; len],
            adjacency: Vec::with_capacity(len),
        };
        grid.build_adjacency();
        grid
    }

    fn build_adjacency(&mut self) {
        self.adjacency.clear();
        for p in self.bounds.iter() {
            let mut adj = Adjacency::default();
            for n in p.neighbors_4() {
                if let Some(ni) = self.index(n) {
                    adj.push(ni);
                }
            }
            self.adjacency.push(adj);
        }
    }

    /// The bounding range of the grid, anchored at the origin.
    #[inline]
    pub fn range(&self) -> Range {
        self.bounds
    }

    /// Width in cells.
    #[inline]
    pub fn width(&self) -> i32 {
        self.bounds.width()
    }

    /// Height in cells.
    #[inline]
    pub fn height(&self) -> i32 {
        self.bounds.height()
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    /// Whether the grid has no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }

    /// Whether `p` is a valid cell identity.
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        self.bounds.contains(p)
    }

    /// Row-major flat index of `p`, or `None` when out of bounds.
    #[inline]
    pub fn index(&self, p: Point) -> Option<usize> {
        self.bounds.index(p)
    }

    /// Cell identity for a flat index produced by [`index`](Grid::index).
    #[inline]
    pub fn point(&self, idx: usize) -> Point {
        self.bounds.point(idx)
    }

    fn checked_index(&self, p: Point) -> Result<usize, GridError> {
        self.index(p).ok_or(GridError::OutOfBounds(p))
    }

    /// Whether the cell at `p` is an obstacle.
    pub fn is_blocked(&self, p: Point) -> Result<bool, GridError> {
        Ok(self.blocked[self.checked_index(p)?])
    }

    /// Mark or unmark the cell at `p` as an obstacle.
    pub fn set_blocked(&mut self, p: Point, blocked: bool) -> Result<(), GridError> {
        let i = self.checked_index(p)?;
        self.blocked[i] = blocked;
        Ok(())
    }

    /// Unblock every cell.
    pub fn clear_blocked(&mut self) {
        self.blocked.fill(false);
    }

    /// Movement cost of entering the cell at `p`.
    pub fn cost(&self, p: Point) -> Result<i32, GridError> {
        Ok(self.costs[self.checked_index(p)?])
    }

    /// Set the movement cost of entering the cell at `p`. Must be >= 1.
    pub fn set_cost(&mut self, p: Point, cost: i32) -> Result<(), GridError> {
        let i = self.checked_index(p)?;
        if cost < 1 {
            return Err(GridError::InvalidCost { pos: p, cost });
        }
        self.costs[i] = cost;
        Ok(())
    }

    /// Blocked flag by flat index. The index must come from this grid.
    #[inline]
    pub fn is_blocked_at(&self, idx: usize) -> bool {
        self.blocked[idx]
    }

    /// Movement cost by flat index. The index must come from this grid.
    #[inline]
    pub fn cost_at(&self, idx: usize) -> i32 {
        self.costs[idx]
    }

    /// Append the open neighbours of the cell with flat index `idx` into
    /// `buf`, in up/right/down/left order. The caller clears `buf`.
    pub fn open_neighbors_at(&self, idx: usize, buf: &mut Vec<usize>) {
        buf.extend(
            self.adjacency[idx]
                .as_slice()
                .iter()
                .copied()
                .filter(|&ni| !self.blocked[ni]),
        );
    }

    /// The open (in-bounds, unblocked) 4-neighbours of `p`.
    pub fn neighbors_of(&self, p: Point) -> Result<Vec<Point>, GridError> {
        let i = self.checked_index(p)?;
        let mut buf = Vec::with_capacity(4);
        self.open_neighbors_at(i, &mut buf);
        Ok(buf.into_iter().map(|ni| self.point(ni)).collect())
    }

    /// Row-major iterator over every cell identity.
    #[inline]
    pub fn iter(&self) -> crate::geom::RangeIter {
        self.bounds.iter()
    }
}

// ---------------------------------------------------------------------------
// serde
// ---------------------------------------------------------------------------

#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct GridRepr {
    width: i32,
    height: i32,
    blocked: Vec<bool>,
    costs: Vec<i32>,
}

#[cfg(feature = "serde")]
impl serde::Serialize for Grid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        GridRepr {
            width: self.width(),
            height: self.height(),
            blocked: self.blocked.clone(),
            costs: self.costs.clone(),
        }
        .serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Grid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let repr = GridRepr::deserialize(deserializer)?;
        // Check against the cell data before allocating anything.
        let cells = (repr.width.max(0) as usize).checked_mul(repr.height.max(0) as usize);
        if cells != Some(repr.blocked.len()) || cells != Some(repr.costs.len()) {
            return Err(D::Error::custom("grid cell data does not match dimensions"));
        }
        if let Some(&bad) = repr.costs.iter().find(|&&c| c < 1) {
            return Err(D::Error::custom(format!("invalid movement cost {bad}")));
        }
        let mut grid = Grid::new(repr.width, repr.height);
        grid.blocked = repr.blocked;
        grid.costs = repr.costs;
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_grid_is_open() {
        let g = Grid::new(4, 3);
        assert_eq!(g.len(), 12);
        assert_eq!(g.width(), 4);
        assert_eq!(g.height(), 3);
        for p in g.iter() {
            assert_eq!(g.is_blocked(p), Ok(false));
            assert_eq!(g.cost(p), Ok(DEFAULT_COST));
        }
    }

    #[test]
    fn negative_dimensions_clamp() {
        let g = Grid::new(-3, 5);
        assert!(g.is_empty());
        assert!(!g.contains(Point::ZERO));
    }

    #[test]
    fn index_point_round_trip() {
        let g = Grid::new(5, 4);
        for p in g.iter() {
            let i = g.index(p).unwrap();
            assert_eq!(g.point(i), p);
        }
        assert_eq!(g.index(Point::new(5, 0)), None);
        assert_eq!(g.index(Point::new(0, -1)), None);
    }

    #[test]
    fn corner_and_interior_neighbors() {
        let g = Grid::new(3, 3);
        assert_eq!(
            g.neighbors_of(Point::new(0, 0)).unwrap(),
            vec![Point::new(1, 0), Point::new(0, 1)]
        );
        assert_eq!(g.neighbors_of(Point::new(1, 1)).unwrap().len(), 4);
    }

    #[test]
    fn blocked_cells_are_filtered_on_query() {
        let mut g = Grid::new(3, 3);
        g.set_blocked(Point::new(1, 0), true).unwrap();
        assert_eq!(
            g.neighbors_of(Point::new(1, 1)).unwrap(),
            vec![Point::new(2, 1), Point::new(1, 2), Point::new(0, 1)]
        );
        g.set_blocked(Point::new(1, 0), false).unwrap();
        assert_eq!(g.neighbors_of(Point::new(1, 1)).unwrap().len(), 4);
    }

    #[test]
    fn clear_blocked_unblocks_everything() {
        let mut g = Grid::new(3, 3);
        g.set_blocked(Point::new(0, 0), true).unwrap();
        g.set_blocked(Point::new(2, 2), true).unwrap();
        g.clear_blocked();
        assert!(g.iter().all(|p| g.is_blocked(p) == Ok(false)));
    }

    #[test]
    fn out_of_bounds_errors() {
        let mut g = Grid::new(2, 2);
        let p = Point::new(2, 0);
        assert_eq!(g.set_blocked(p, true), Err(GridError::OutOfBounds(p)));
        assert_eq!(g.is_blocked(p), Err(GridError::OutOfBounds(p)));
        assert_eq!(g.cost(p), Err(GridError::OutOfBounds(p)));
        assert!(g.neighbors_of(p).is_err());
    }

    #[test]
    fn cost_must_be_positive() {
        let mut g = Grid::new(2, 2);
        let p = Point::new(1, 1);
        assert_eq!(
            g.set_cost(p, 0),
            Err(GridError::InvalidCost { pos: p, cost: 0 })
        );
        assert_eq!(g.cost(p), Ok(DEFAULT_COST));
        g.set_cost(p, 5).unwrap();
        assert_eq!(g.cost(p), Ok(5));
        assert_eq!(g.cost_at(g.index(p).unwrap()), 5);
    }

    #[test]
    fn error_messages() {
        let e = GridError::OutOfBounds(Point::new(7, -1));
        assert_eq!(e.to_string(), "cell (7, -1) is outside the grid");
    }
}
