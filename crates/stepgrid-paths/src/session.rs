//! Search sessions and per-cell search records.
//!
//! Records live in a flat arena with one slot per grid cell, allocated once
//! for the grid's lifetime. Each slot remembers the session that last wrote
//! it; a slot tagged with any other session is logically absent and is reset
//! on first touch. Starting a new search therefore costs `O(1)` instead of a
//! full-grid clear.

use stepgrid_core::Point;

/// Search status of a cell within the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    /// Not reached by the current session.
    #[default]
    Unvisited,
    /// Discovered, neighbours not yet all relaxed.
    Frontier,
    /// Fully expanded.
    Visited,
}

/// Per-cell search state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchRecord {
    pub(crate) session: u32,
    pub(crate) category: Category,
    pub(crate) cost_so_far: i32,
    pub(crate) came_from: Option<Point>,
    pub(crate) heuristic: f64,
    pub(crate) priority: f64,
}

impl SearchRecord {
    /// Session that last wrote this record.
    #[inline]
    pub fn session_id(&self) -> u32 {
        self.session
    }

    #[inline]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Best known cost from the start. Meaningless while `Unvisited`.
    #[inline]
    pub fn cost_so_far(&self) -> i32 {
        self.cost_so_far
    }

    /// Predecessor on the best known path; `None` for the start cell.
    #[inline]
    pub fn came_from(&self) -> Option<Point> {
        self.came_from
    }

    /// Heuristic estimate to the goal, computed when the cell was reached.
    #[inline]
    pub fn heuristic(&self) -> f64 {
        self.heuristic
    }

    /// `cost_so_far + heuristic`, the frontier ordering key.
    #[inline]
    pub fn priority_key(&self) -> f64 {
        self.priority
    }

    fn fresh(session: u32) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// SessionLedger
// ---------------------------------------------------------------------------

/// Monotonic search-session counter.
///
/// Id 0 means "no session" and is never handed out: the counter wraps from
/// `u32::MAX` back to 1, so default (zeroed) records never match a session.
#[derive(Debug, Clone, Default)]
pub struct SessionLedger {
    current: u32,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn starting_at(current: u32) -> Self {
        Self { current }
    }

    /// The most recently issued id, or 0 before the first session.
    #[inline]
    pub fn current(&self) -> u32 {
        self.current
    }

    /// Issue the next session id.
    pub fn advance(&mut self) -> u32 {
        self.current = self.current.checked_add(1).unwrap_or(1);
        self.current
    }
}

// ---------------------------------------------------------------------------
// RecordArena
// ---------------------------------------------------------------------------

/// One [`SearchRecord`] per cell, invalidated lazily by session id.
#[derive(Debug, Clone)]
pub(crate) struct RecordArena {
    slots: Vec<SearchRecord>,
    ledger: SessionLedger,
}

impl RecordArena {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            slots: vec![SearchRecord::default(); len],
            ledger: SessionLedger::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_ledger(len: usize, ledger: SessionLedger) -> Self {
        Self {
            slots: vec![SearchRecord::default(); len],
            ledger,
        }
    }

    #[inline]
    pub(crate) fn session_id(&self) -> u32 {
        self.ledger.current()
    }

    /// Start a new session, invalidating every record.
    ///
    /// When the id wraps back to 1 the slots are physically cleared, since
    /// records written by an earlier session 1 would otherwise look current.
    pub(crate) fn begin_session(&mut self) -> u32 {
        let id = self.ledger.advance();
        if id == 1 {
            self.slots.fill(SearchRecord::default());
        }
        id
    }

    /// The record at `idx` if it belongs to the current session.
    #[inline]
    pub(crate) fn get(&self, idx: usize) -> Option<&SearchRecord> {
        let session = self.ledger.current();
        self.slots
            .get(idx)
            .filter(|r| session != 0 && r.session == session)
    }

    /// The record at `idx`, reset to `Unvisited` first if it is stale.
    pub(crate) fn claim(&mut self, idx: usize) -> &mut SearchRecord {
        let session = self.ledger.current();
        let rec = &mut self.slots[idx];
        if rec.session != session {
            *rec = SearchRecord::fresh(session);
        }
        rec
    }
}
