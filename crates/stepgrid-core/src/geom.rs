//! Cell coordinates ([`Point`]) and rectangular extents ([`Range`]).

use std::fmt;

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// Integer cell coordinates. X grows right, Y grows down.
///
/// Points order row-major (by `y`, then `x`), the same order
/// [`Range::iter`] yields them in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The four orthogonal neighbours: up, right, down, left.
    ///
    /// Some may lie outside any particular grid.
    #[inline]
    pub fn neighbors_4(self) -> [Point; 4] {
        let Self { x, y } = self;
        [
            Self::new(x, y - 1),
            Self::new(x + 1, y),
            Self::new(x, y + 1),
            Self::new(x - 1, y),
        ]
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Range
// ---------------------------------------------------------------------------

/// Half-open rectangle of cells: `min` inclusive, `max` exclusive.
///
/// Cells inside a range have a dense row-major index, see
/// [`index`](Range::index) and [`point`](Range::point).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    pub min: Point,
    pub max: Point,
}

impl Range {
    /// Range spanning two corners, given in any order.
    #[inline]
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            min: Point::new(x0.min(x1), y0.min(y1)),
            max: Point::new(x0.max(x1), y0.max(y1)),
        }
    }

    #[inline]
    pub fn width(self) -> i32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(self) -> i32 {
        self.max.y - self.min.y
    }

    /// Number of cells.
    #[inline]
    pub fn len(self) -> usize {
        self.width() as usize * self.height() as usize
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn contains(self, p: Point) -> bool {
        (self.min.x..self.max.x).contains(&p.x) && (self.min.y..self.max.y).contains(&p.y)
    }

    /// Row-major index of `p`, or `None` outside the range.
    #[inline]
    pub fn index(self, p: Point) -> Option<usize> {
        if !self.contains(p) {
            return None;
        }
        let (dx, dy) = ((p.x - self.min.x) as usize, (p.y - self.min.y) as usize);
        Some(dy * self.width() as usize + dx)
    }

    /// Cell at row-major index `i`. Indices past the end continue below the
    /// last row.
    #[inline]
    pub fn point(self, i: usize) -> Point {
        let w = self.width().max(1) as usize;
        Point::new(self.min.x + (i % w) as i32, self.min.y + (i / w) as i32)
    }

    /// Every cell, row by row.
    #[inline]
    pub fn iter(self) -> RangeIter {
        RangeIter {
            range: self,
            next: 0,
            end: self.len(),
        }
    }
}

impl IntoIterator for Range {
    type Item = Point;
    type IntoIter = RangeIter;

    fn into_iter(self) -> RangeIter {
        self.iter()
    }
}

/// Iterator over the cells of a [`Range`] in index order.
#[derive(Clone, Debug)]
pub struct RangeIter {
    range: Range,
    next: usize,
    end: usize,
}

impl Iterator for RangeIter {
    type Item = Point;

    #[inline]
    fn next(&mut self) -> Option<Point> {
        if self.next >= self.end {
            return None;
        }
        let p = self.range.point(self.next);
        self.next += 1;
        Some(p)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.next;
        (n, Some(n))
    }
}

impl ExactSizeIterator for RangeIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_go_clockwise_from_up() {
        assert_eq!(
            Point::new(2, 2).neighbors_4(),
            [
                Point::new(2, 1),
                Point::new(3, 2),
                Point::new(2, 3),
                Point::new(1, 2),
            ]
        );
    }

    #[test]
    fn points_sort_row_major() {
        let mut pts = vec![Point::new(1, 1), Point::new(0, 1), Point::new(5, 0)];
        pts.sort();
        assert_eq!(pts, vec![Point::new(5, 0), Point::new(0, 1), Point::new(1, 1)]);
        assert_eq!(Point::new(-3, 7).to_string(), "(-3, 7)");
    }

    #[test]
    fn corners_in_any_order() {
        let r = Range::new(4, 3, 0, 0);
        assert_eq!(r, Range::new(0, 0, 4, 3));
        assert_eq!((r.width(), r.height(), r.len()), (4, 3, 12));
        assert!(r.contains(Point::new(3, 2)));
        assert!(!r.contains(Point::new(4, 2)));
        assert!(!r.contains(Point::new(0, -1)));
    }

    #[test]
    fn index_and_point_agree() {
        let r = Range::new(1, 1, 4, 3);
        for (i, p) in r.iter().enumerate() {
            assert_eq!(r.index(p), Some(i));
            assert_eq!(r.point(i), p);
        }
        assert_eq!(r.iter().len(), 6);
        assert_eq!(r.iter().nth(3), Some(Point::new(1, 2)));
        assert_eq!(r.index(Point::ZERO), None);
    }

    #[test]
    fn empty_range_yields_nothing() {
        let r = Range::new(2, 2, 2, 5);
        assert!(r.is_empty());
        assert_eq!(r.iter().count(), 0);
        assert_eq!(r.index(Point::new(2, 2)), None);
    }
}
