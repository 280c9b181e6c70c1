//! Shared model for the terminal visualiser and the headless tracer.
//!
//! Builds the demo grid, renders engine state as text (one line per grid
//! row) and holds the heuristic presets the visualiser cycles through.

use log::debug;
use rand::{Rng, RngExt};
use stepgrid_core::{Grid, GridError, Point, Range};
use stepgrid_paths::{Category, DEFAULT_HEURISTIC, PathError, PathFinder, SearchState};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Named heuristics offered by the visualiser, Manhattan first.
pub const HEURISTIC_PRESETS: &[(&str, &str)] = &[
    ("manhattan", DEFAULT_HEURISTIC),
    ("euclid", "SQRT((nodeX - goalX)^2 + (nodeY - goalY)^2)"),
    ("euclid squared", "(nodeX - goalX)^2 + (nodeY - goalY)^2"),
    ("chebyshev", "MAX(ABS(nodeX - goalX), ABS(nodeY - goalY))"),
    ("dijkstra", "0"),
    ("weighted", "5 * (ABS(nodeX - goalX) + ABS(nodeY - goalY))"),
];

/// Obstacle density used by the "random obstacles" action.
pub const RANDOM_OBSTACLE_DENSITY: f64 = 0.25;

/// Glyphs used by [`render_lines`].
pub mod glyph {
    pub const BLOCKED: char = '#';
    pub const START: char = 'S';
    pub const GOAL: char = 'G';
    pub const PATH: char = '*';
    pub const CURRENT: char = '@';
    pub const PENDING: char = '+';
    pub const FRONTIER: char = 'o';
    pub const VISITED: char = '.';
    pub const UNVISITED: char = ' ';
}

// ---------------------------------------------------------------------------
// GridConfig
// ---------------------------------------------------------------------------

/// Dimensions, obstacles and endpoints of the demo grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    pub width: i32,
    pub height: i32,
    /// Probability in `[0, 1]` that a cell starts blocked.
    pub obstacle_density: f64,
    pub start: Point,
    pub goal: Point,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 19,
            height: 15,
            obstacle_density: 0.0,
            start: Point::new(5, 4),
            goal: Point::new(15, 4),
        }
    }
}

impl GridConfig {
    pub fn with_size(mut self, width: i32, height: i32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_obstacle_density(mut self, density: f64) -> Self {
        self.obstacle_density = density;
        self
    }

    pub fn with_endpoints(mut self, start: Point, goal: Point) -> Self {
        self.start = start;
        self.goal = goal;
        self
    }
}

fn scatter<E>(
    range: Range,
    density: f64,
    keep: &[Point],
    rng: &mut impl Rng,
    mut block: impl FnMut(Point) -> Result<(), E>,
) -> Result<usize, E> {
    let density = if density.is_finite() {
        density.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut blocked = 0;
    for p in range {
        if !keep.contains(&p) && rng.random_bool(density) {
            block(p)?;
            blocked += 1;
        }
    }
    debug!("scattered {blocked} obstacles at density {density}");
    Ok(blocked)
}

/// Build the grid described by `config`.
///
/// The start and goal cells are never blocked. Fails if either endpoint
/// lies outside the grid.
pub fn build_grid(config: &GridConfig, rng: &mut impl Rng) -> Result<Grid, GridError> {
    let mut grid = Grid::new(config.width, config.height);
    for p in [config.start, config.goal] {
        if !grid.contains(p) {
            return Err(GridError::OutOfBounds(p));
        }
    }
    scatter(
        grid.range(),
        config.obstacle_density,
        &[config.start, config.goal],
        rng,
        |p| grid.set_blocked(p, true),
    )?;
    Ok(grid)
}

/// Block random cells of the engine's grid, sparing `keep`. Returns how
/// many cells were blocked.
pub fn scatter_obstacles(
    pf: &mut PathFinder,
    density: f64,
    keep: &[Point],
    rng: &mut impl Rng,
) -> Result<usize, PathError> {
    let range = pf.grid().range();
    scatter(range, density, keep, rng, |p| pf.set_blocked(p, true))
}

// ---------------------------------------------------------------------------
// Heuristic presets
// ---------------------------------------------------------------------------

/// Index of the preset after `index`, wrapping around.
pub fn next_preset(index: usize) -> usize {
    (index + 1) % HEURISTIC_PRESETS.len()
}

/// Name of the preset whose expression is `text`, if any.
pub fn preset_name(text: &str) -> Option<&'static str> {
    HEURISTIC_PRESETS
        .iter()
        .find(|(_, expr)| *expr == text)
        .map(|(name, _)| *name)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the engine's grid, marking the current session's endpoints.
pub fn render_lines(pf: &PathFinder) -> Vec<String> {
    render_with_endpoints(pf, pf.endpoints())
}

/// Render the engine's grid with explicit endpoint markers, for drawing the
/// start and goal before a search has begun.
pub fn render_with_endpoints(pf: &PathFinder, endpoints: Option<(Point, Point)>) -> Vec<String> {
    let grid = pf.grid();
    let pending: Vec<Point> = pf.pending_neighbors().collect();
    let current = pf.current();
    let path = pf.path();

    (0..grid.height())
        .map(|y| {
            (0..grid.width())
                .map(|x| {
                    let p = Point::new(x, y);
                    if grid.is_blocked(p) == Ok(true) {
                        glyph::BLOCKED
                    } else if endpoints.is_some_and(|(s, _)| s == p) {
                        glyph::START
                    } else if endpoints.is_some_and(|(_, g)| g == p) {
                        glyph::GOAL
                    } else if path.contains(&p) {
                        glyph::PATH
                    } else if current == Some(p) {
                        glyph::CURRENT
                    } else if pending.contains(&p) {
                        glyph::PENDING
                    } else {
                        match pf.record(p).map(|r| r.category()) {
                            Some(Category::Frontier) => glyph::FRONTIER,
                            Some(Category::Visited) => glyph::VISITED,
                            _ => glyph::UNVISITED,
                        }
                    }
                })
                .collect()
        })
        .collect()
}

fn state_label(state: SearchState) -> &'static str {
    match state {
        SearchState::Idle => "idle",
        SearchState::Seeded => "seeded",
        SearchState::Frontier => "select frontier",
        SearchState::Neighbor => "select neighbor",
        SearchState::Done => "path found",
        SearchState::Exhausted => "no path",
    }
}

/// One-line summary of the search.
pub fn status_line(pf: &PathFinder) -> String {
    let mut line = format!(
        "session {} | {} | frontier {} | expanded {}",
        pf.session_id(),
        state_label(pf.state()),
        pf.frontier_len(),
        pf.expansions()
    );
    if pf.state() == SearchState::Done {
        if let Some(cost) = path_cost(pf) {
            line.push_str(&format!(" | path {} cells, cost {cost}", pf.path().len()));
        }
    }
    line
}

/// Cost of the reconstructed path, once the goal was reached.
pub fn path_cost(pf: &PathFinder) -> Option<i32> {
    let goal = pf.path().last()?;
    pf.record(*goal).map(|r| r.cost_so_far())
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Print the engine's log records to stderr.
///
/// Reads `RUST_LOG`, defaulting to `warn`:
/// ```bash
/// RUST_LOG=stepgrid_paths=trace cargo run --bin trace
/// ```
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn empty_density_builds_open_grid() {
        let config = GridConfig::default();
        let grid = build_grid(&config, &mut rng()).unwrap();
        assert_eq!((grid.width(), grid.height()), (19, 15));
        assert!(grid.iter().all(|p| grid.is_blocked(p) == Ok(false)));
    }

    #[test]
    fn full_density_spares_endpoints() {
        let config = GridConfig::default()
            .with_size(6, 4)
            .with_endpoints(Point::new(0, 0), Point::new(5, 3))
            .with_obstacle_density(1.0);
        let grid = build_grid(&config, &mut rng()).unwrap();
        for p in grid.iter() {
            let open = p == config.start || p == config.goal;
            assert_eq!(grid.is_blocked(p), Ok(!open), "{p}");
        }
    }

    #[test]
    fn same_seed_same_grid() {
        let config = GridConfig::default().with_obstacle_density(0.3);
        let a = build_grid(&config, &mut rng()).unwrap();
        let b = build_grid(&config, &mut rng()).unwrap();
        assert!(a.iter().all(|p| a.is_blocked(p) == b.is_blocked(p)));
        assert!(a.iter().any(|p| a.is_blocked(p) == Ok(true)));
    }

    #[test]
    fn endpoints_must_fit() {
        let config = GridConfig::default().with_size(4, 4);
        assert_eq!(
            build_grid(&config, &mut rng()).err(),
            Some(GridError::OutOfBounds(Point::new(5, 4)))
        );
    }

    #[test]
    fn scatter_through_engine() {
        let mut pf = PathFinder::new(Grid::new(5, 5));
        let keep = [Point::new(0, 0), Point::new(4, 4)];
        let n = scatter_obstacles(&mut pf, 1.0, &keep, &mut rng()).unwrap();
        assert_eq!(n, 23);
        pf.clear_blocked();
        assert_eq!(scatter_obstacles(&mut pf, 0.0, &keep, &mut rng()), Ok(0));
    }

    #[test]
    fn presets_are_valid_and_cycle() {
        for (name, text) in HEURISTIC_PRESETS {
            assert!(stepgrid_paths::validate(text), "{name}");
        }
        assert_eq!(preset_name(DEFAULT_HEURISTIC), Some("manhattan"));
        assert_eq!(preset_name("nodeX"), None);
        assert_eq!(next_preset(HEURISTIC_PRESETS.len() - 1), 0);
    }

    #[test]
    fn render_idle_grid() {
        let mut grid = Grid::new(4, 2);
        grid.set_blocked(Point::new(1, 1), true).unwrap();
        let pf = PathFinder::new(grid);
        assert_eq!(render_lines(&pf), vec!["    ", " #  "]);
        assert_eq!(
            render_with_endpoints(&pf, Some((Point::new(0, 0), Point::new(3, 1)))),
            vec!["S   ", " #  "]
        );
    }

    #[test]
    fn render_mid_search() {
        let mut pf = PathFinder::new(Grid::new(5, 1));
        pf.start(Point::new(0, 0), Point::new(4, 0)).unwrap();
        assert!(pf.step_frontier());
        assert!(pf.step_neighbor());
        assert!(!pf.step_neighbor());
        assert!(pf.step_frontier());
        // (1, 0) is being expanded; (2, 0) and (0, 0) are its candidates.
        assert_eq!(render_lines(&pf), vec!["S@+ G"]);
        // (0, 0) goes first and is no improvement.
        assert!(pf.step_neighbor());
        assert_eq!(render_lines(&pf), vec!["S@+ G"]);
        assert!(pf.step_neighbor());
        assert_eq!(render_lines(&pf), vec!["S@o G"]);
        assert!(!pf.step_neighbor());
        assert_eq!(render_lines(&pf), vec!["S.o G"]);
    }

    #[test]
    fn render_finished_search() {
        let mut grid = Grid::new(3, 3);
        grid.set_blocked(Point::new(1, 1), true).unwrap();
        let mut pf = PathFinder::new(grid);
        pf.start(Point::new(0, 1), Point::new(2, 1)).unwrap();
        assert!(pf.run_to_end());
        let lines = render_lines(&pf);
        assert_eq!(lines[1], "S#G");
        assert_eq!(pf.path().len(), 5);
        assert_eq!(lines.iter().flat_map(|l| l.chars()).filter(|&c| c == '*').count(), 3);
    }

    #[test]
    fn status_reports_progress() {
        let mut pf = PathFinder::new(Grid::new(3, 1));
        assert_eq!(status_line(&pf), "session 0 | idle | frontier 0 | expanded 0");
        pf.start(Point::new(0, 0), Point::new(2, 0)).unwrap();
        assert!(pf.run_to_end());
        assert_eq!(path_cost(&pf), Some(2));
        assert_eq!(
            status_line(&pf),
            "session 1 | path found | frontier 0 | expanded 2 | path 3 cells, cost 2"
        );
    }
}
