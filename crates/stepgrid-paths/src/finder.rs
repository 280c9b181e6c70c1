use log::{debug, trace, warn};
use stepgrid_core::{Grid, Point};

use crate::distance::manhattan;
use crate::error::PathError;
use crate::heap::IndexedHeap;
use crate::heuristic::Heuristic;
use crate::session::{Category, RecordArena, SearchRecord};

/// Where the engine is in its step sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchState {
    /// No session has been started (or the last one was reset).
    Idle,
    /// `start` was called; the frontier holds only the start cell.
    Seeded,
    /// Waiting for the next [`step_frontier`](PathFinder::step_frontier).
    Frontier,
    /// A cell is being expanded; neighbour candidates are pending.
    Neighbor,
    /// The goal was popped and the path reconstructed.
    Done,
    /// The frontier ran dry before reaching the goal.
    Exhausted,
}

impl SearchState {
    /// Whether the session has ended, successfully or not.
    #[inline]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Exhausted)
    }

    /// Whether a session is active and can still be stepped.
    #[inline]
    pub fn is_in_progress(self) -> bool {
        matches!(self, Self::Seeded | Self::Frontier | Self::Neighbor)
    }
}

#[derive(Debug, Clone)]
struct Session {
    start: Point,
    goal: Point,
    goal_idx: usize,
    heuristic: Heuristic,
}

/// Incremental A* over a [`Grid`].
///
/// A search is driven one observable step at a time:
///
/// ```
/// use stepgrid_core::{Grid, Point};
/// use stepgrid_paths::PathFinder;
///
/// let mut pf = PathFinder::new(Grid::new(5, 5));
/// pf.start(Point::new(0, 0), Point::new(4, 4)).unwrap();
/// while pf.step_frontier() {
///     while pf.step_neighbor() {}
/// }
/// assert_eq!(pf.path().len(), 9);
/// ```
///
/// Per-cell [`SearchRecord`]s are kept in an arena sized to the grid and
/// invalidated lazily by session id, so restarting a search is `O(1)`.
/// Calling a step operation before [`start`](Self::start), or after the
/// session finished, is a no-op that returns `false`.
#[derive(Debug, Clone)]
pub struct PathFinder {
    grid: Grid,
    heuristic: Heuristic,
    records: RecordArena,
    frontier: IndexedHeap<usize>,
    session: Option<Session>,
    state: SearchState,
    current: Option<usize>,
    pending: Vec<usize>,
    path: Vec<Point>,
    expansions: usize,
}

impl PathFinder {
    /// Create an engine over `grid` using the Manhattan heuristic.
    pub fn new(grid: Grid) -> Self {
        let len = grid.len();
        Self {
            grid,
            heuristic: Heuristic::default(),
            records: RecordArena::new(len),
            frontier: IndexedHeap::with_index_bound(len),
            session: None,
            state: SearchState::Idle,
            current: None,
            pending: Vec::with_capacity(4),
            path: Vec::new(),
            expansions: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Grid access
    // -----------------------------------------------------------------------

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Block or unblock a cell.
    ///
    /// Blocking the start or goal of a search in progress fails with
    /// [`PathError::InvalidCell`]. Other edits during a search are the
    /// caller's responsibility: they take effect from the next step.
    pub fn set_blocked(&mut self, p: Point, blocked: bool) -> Result<(), PathError> {
        if blocked && self.state.is_in_progress() {
            if let Some(s) = &self.session {
                if p == s.start || p == s.goal {
                    return Err(PathError::InvalidCell(p));
                }
            }
        }
        self.grid.set_blocked(p, blocked)?;
        Ok(())
    }

    /// Set the movement cost of entering a cell (>= 1).
    ///
    /// Costs already summed into the records of a search in progress would
    /// go stale, so the call fails with [`PathError::SearchInProgress`]
    /// until the search finishes or is [`reset`](Self::reset).
    pub fn set_cost(&mut self, p: Point, cost: i32) -> Result<(), PathError> {
        if self.state.is_in_progress() {
            return Err(PathError::SearchInProgress(p));
        }
        self.grid.set_cost(p, cost)?;
        Ok(())
    }

    /// Unblock every cell.
    pub fn clear_blocked(&mut self) {
        self.grid.clear_blocked();
    }

    // -----------------------------------------------------------------------
    // Heuristic
    // -----------------------------------------------------------------------

    /// The active heuristic expression text.
    #[inline]
    pub fn get_heuristic(&self) -> &str {
        self.heuristic.text()
    }

    /// Replace the heuristic, reporting why the text was rejected.
    ///
    /// On failure the previous heuristic stays active. A new heuristic
    /// applies from the next [`start`](Self::start).
    pub fn try_set_heuristic(&mut self, text: &str) -> Result<(), PathError> {
        match Heuristic::new(text) {
            Ok(h) => {
                debug!("heuristic set to {:?}", h.text());
                self.heuristic = h;
                Ok(())
            }
            Err(e) => {
                warn!("rejected heuristic {text:?}: {e}");
                Err(e.into())
            }
        }
    }

    /// Replace the heuristic; `false` if the text was rejected.
    pub fn set_heuristic(&mut self, text: &str) -> bool {
        self.try_set_heuristic(text).is_ok()
    }

    // -----------------------------------------------------------------------
    // Driving
    // -----------------------------------------------------------------------

    fn open_index(&self, p: Point) -> Result<usize, PathError> {
        self.grid
            .index(p)
            .filter(|&i| !self.grid.is_blocked_at(i))
            .ok_or(PathError::InvalidCell(p))
    }

    /// Begin a new search session from `start` to `goal`.
    ///
    /// Fails with [`PathError::InvalidCell`] if either endpoint is out of
    /// bounds or blocked; the previous session is then left untouched.
    pub fn start(&mut self, start: Point, goal: Point) -> Result<(), PathError> {
        let start_idx = self.open_index(start)?;
        let goal_idx = self.open_index(goal)?;

        let id = self.records.begin_session();
        self.frontier.clear();
        self.pending.clear();
        self.path.clear();
        self.current = None;
        self.expansions = 0;

        let heuristic = self.heuristic.clone();
        let h = estimate(&heuristic, start, goal);
        let rec = self.records.claim(start_idx);
        rec.cost_so_far = 0;
        rec.came_from = None;
        rec.category = Category::Frontier;
        rec.heuristic = h;
        rec.priority = h;
        self.frontier.push(start_idx, h);

        self.session = Some(Session {
            start,
            goal,
            goal_idx,
            heuristic,
        });
        self.state = SearchState::Seeded;
        debug!("session {id}: search {start} -> {goal}");
        Ok(())
    }

    /// Pop the best frontier cell.
    ///
    /// Returns `true` when the cell was not the goal and its neighbours are
    /// now pending for [`step_neighbor`](Self::step_neighbor). Returns
    /// `false` when the search is over: the goal was reached (the path is
    /// available from [`path`](Self::path)) or the frontier is empty.
    ///
    /// If neighbours of the previous cell are still pending they are all
    /// relaxed first.
    pub fn step_frontier(&mut self) -> bool {
        match self.state {
            SearchState::Seeded | SearchState::Frontier => {}
            SearchState::Neighbor => while self.step_neighbor() {},
            SearchState::Idle | SearchState::Done | SearchState::Exhausted => return false,
        }
        let Some(goal_idx) = self.session.as_ref().map(|s| s.goal_idx) else {
            return false;
        };

        let Some((ci, key)) = self.frontier.pop() else {
            self.current = None;
            self.state = SearchState::Exhausted;
            debug!(
                "session {}: frontier exhausted after {} expansions",
                self.records.session_id(),
                self.expansions
            );
            return false;
        };
        self.current = Some(ci);
        trace!("pop {} (key {key})", self.grid.point(ci));

        if ci == goal_idx {
            self.build_path(goal_idx);
            self.state = SearchState::Done;
            debug!(
                "session {}: goal reached, path of {} cells after {} expansions",
                self.records.session_id(),
                self.path.len(),
                self.expansions
            );
            return false;
        }

        self.expansions += 1;
        self.pending.clear();
        self.grid.open_neighbors_at(ci, &mut self.pending);
        self.state = SearchState::Neighbor;
        true
    }

    /// Relax one pending neighbour of the current cell.
    ///
    /// Returns `true` after handling a candidate (improved or not). Once no
    /// candidates remain the call marks the current cell `Visited` and
    /// returns `false`.
    pub fn step_neighbor(&mut self) -> bool {
        if self.state != SearchState::Neighbor {
            return false;
        }
        let Some(ci) = self.current else {
            return false;
        };
        match self.pending.pop() {
            Some(ni) => {
                self.relax(ci, ni);
                true
            }
            None => {
                self.records.claim(ci).category = Category::Visited;
                self.current = None;
                self.state = SearchState::Frontier;
                false
            }
        }
    }

    fn relax(&mut self, ci: usize, ni: usize) {
        let Some(session) = &self.session else {
            return;
        };
        let Some(current_cost) = self.records.get(ci).map(|r| r.cost_so_far) else {
            return;
        };
        let new_cost = current_cost.saturating_add(self.grid.cost_at(ni));
        let np = self.grid.point(ni);

        let rec = self.records.claim(ni);
        let h = match rec.category {
            Category::Unvisited => estimate(&session.heuristic, np, session.goal),
            Category::Frontier | Category::Visited => {
                if rec.cost_so_far <= new_cost {
                    trace!("skip {np}: {} <= {new_cost}", rec.cost_so_far);
                    return;
                }
                if rec.category == Category::Frontier {
                    self.frontier.remove(&ni);
                }
                rec.heuristic
            }
        };

        rec.cost_so_far = new_cost;
        rec.came_from = Some(self.grid.point(ci));
        rec.category = Category::Frontier;
        rec.heuristic = h;
        rec.priority = new_cost as f64 + h;
        trace!("relax {np}: cost {new_cost}, key {}", rec.priority);
        self.frontier.push(ni, rec.priority);
    }

    fn build_path(&mut self, goal_idx: usize) {
        self.path.clear();
        let mut next = Some(goal_idx);
        // Costs strictly decrease along came_from links, so this terminates.
        while let Some(i) = next {
            self.path.push(self.grid.point(i));
            next = self
                .records
                .get(i)
                .and_then(|r| r.came_from)
                .and_then(|p| self.grid.index(p));
        }
        self.path.reverse();
    }

    /// Step until the session finishes. Returns whether a path was found.
    pub fn run_to_end(&mut self) -> bool {
        while self.step_frontier() {
            while self.step_neighbor() {}
        }
        self.state == SearchState::Done
    }

    /// Start a search and run it to completion.
    ///
    /// Returns the path `[start, ..., goal]`, or `None` if the goal is
    /// unreachable.
    pub fn find_path(&mut self, start: Point, goal: Point) -> Result<Option<Vec<Point>>, PathError> {
        self.start(start, goal)?;
        Ok(self.run_to_end().then(|| self.path.clone()))
    }

    /// Abandon the current session and return to [`SearchState::Idle`].
    ///
    /// Every record becomes logically absent.
    pub fn reset(&mut self) {
        self.records.begin_session();
        self.frontier.clear();
        self.pending.clear();
        self.path.clear();
        self.current = None;
        self.session = None;
        self.expansions = 0;
        self.state = SearchState::Idle;
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[inline]
    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Id of the current (or last) session; 0 before the first search.
    #[inline]
    pub fn session_id(&self) -> u32 {
        self.records.session_id()
    }

    /// Start and goal of the current session.
    pub fn endpoints(&self) -> Option<(Point, Point)> {
        self.session.as_ref().map(|s| (s.start, s.goal))
    }

    /// The search record of `p`, or `None` if the current session has not
    /// reached it (or `p` is out of bounds).
    pub fn record(&self, p: Point) -> Option<&SearchRecord> {
        self.records.get(self.grid.index(p)?)
    }

    /// Whether `p` has a record belonging to the current session.
    pub fn is_in_session(&self, p: Point) -> bool {
        self.record(p).is_some()
    }

    /// The reconstructed path, empty until the goal is reached.
    #[inline]
    pub fn path(&self) -> &[Point] {
        &self.path
    }

    /// The cell being expanded (popped but not yet `Visited`).
    pub fn current(&self) -> Option<Point> {
        self.current.map(|i| self.grid.point(i))
    }

    /// Neighbour candidates of the current cell not yet relaxed, in the
    /// order they will be processed.
    pub fn pending_neighbors(&self) -> impl Iterator<Item = Point> + '_ {
        self.pending.iter().rev().map(|&i| self.grid.point(i))
    }

    /// Number of cells waiting in the frontier queue.
    #[inline]
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Cells in the frontier queue with their priority keys (unordered).
    pub fn frontier(&self) -> impl Iterator<Item = (Point, f64)> + '_ {
        self.frontier.iter().map(|(&i, key)| (self.grid.point(i), key))
    }

    /// Number of cells expanded so far in this session.
    #[inline]
    pub fn expansions(&self) -> usize {
        self.expansions
    }
}

/// Heuristic value for `p`, falling back to Manhattan distance when the
/// expression fails at this particular cell.
fn estimate(h: &Heuristic, p: Point, goal: Point) -> f64 {
    match h.estimate(p, goal) {
        Ok(v) => v,
        Err(e) => {
            warn!("heuristic {:?} failed at {p}: {e}; using Manhattan", h.text());
            manhattan(p, goal) as f64
        }
    }
}
