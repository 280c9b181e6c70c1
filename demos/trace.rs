//! Headless search trace: prints the grid after every expansion.
//!
//! Run: cargo run --bin trace -- [heuristic] [seed]
//!
//! Set `RUST_LOG=stepgrid_paths=debug` to see the engine's own log.

use std::io::{self, Write};

use rand::SeedableRng;
use rand::rngs::StdRng;

use stepgrid_demos::{
    GridConfig, build_grid, init_logging, path_cost, preset_name, render_lines, status_line,
};
use stepgrid_paths::{CostMap, DriverPhase, PathFinder, PlaybackConfig, Stepper};

const DEFAULT_SEED: u64 = 7;
const OBSTACLE_DENSITY: f64 = 0.2;

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let heuristic = args.next();
    let seed = match args.next() {
        Some(s) => s.parse::<u64>()?,
        None => DEFAULT_SEED,
    };

    let config = GridConfig::default().with_obstacle_density(OBSTACLE_DENSITY);
    let grid = build_grid(&config, &mut StdRng::seed_from_u64(seed))?;
    let reference = CostMap::compute(&grid, config.start)?;

    let mut pf = PathFinder::new(grid);
    if let Some(text) = heuristic {
        pf.try_set_heuristic(&text)?;
    }
    let mut stepper =
        Stepper::new(config.start, config.goal).with_config(&PlaybackConfig::default());

    let mut out = io::stdout().lock();
    writeln!(
        out,
        "seed {seed}, heuristic {} ({})",
        pf.get_heuristic(),
        preset_name(pf.get_heuristic()).unwrap_or("custom")
    )?;
    while !stepper.is_finished() {
        let phase = stepper.advance(&mut pf)?;
        if phase == DriverPhase::SelectFrontier && pf.expansions() > 0 {
            writeln!(out, "-- expansion {} --", pf.expansions())?;
            for line in render_lines(&pf) {
                writeln!(out, "|{line}|")?;
            }
        }
    }

    writeln!(out, "-- result --")?;
    for line in render_lines(&pf) {
        writeln!(out, "|{line}|")?;
    }
    writeln!(out, "{}", status_line(&pf))?;
    match (path_cost(&pf), reference.at(config.goal)) {
        (Some(found), Some(best)) if found == best => writeln!(out, "cost {found} is optimal")?,
        (Some(found), Some(best)) => writeln!(out, "cost {found}, optimal is {best}")?,
        (None, None) => writeln!(out, "goal is unreachable")?,
        (found, best) => writeln!(out, "engine: {found:?}, reference: {best:?}")?,
    }
    Ok(())
}

fn main() {
    init_logging();
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
