//! Tissue Sim - Entry point
//!
//! No-GUI diagnostics runner for the division core: grows the volume
//! attribute of every cell in a small tissue, runs the division pass each
//! step, and reports the resulting topology and attribute bookkeeping.
//!
//! CLI Usage:
//!   cargo run                        # 60 steps with defaults
//!   cargo run -- -n 200 -g 0.08     # custom step count and growth rate

use anyhow::{Context, Result, bail};
use glam::DVec3;
use rand::SeedableRng;
use rand::rngs::StdRng;

use tissue_sim::{
    DivisionParameters, Tissue, TissueAttributes, build_rules, division_step,
};

struct Options {
    steps: usize,
    growth: f64,
    seed: u64,
}

fn parse_args() -> Result<Options> {
    let mut options = Options { steps: 60, growth: 0.05, seed: 7 };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .with_context(|| format!("missing value for {name}"))
        };
        match arg.as_str() {
            "-n" => options.steps = value("-n")?.parse()?,
            "-g" => options.growth = value("-g")?.parse()?,
            "-s" => options.seed = value("-s")?.parse()?,
            other => bail!("unknown argument {other}"),
        }
    }
    Ok(options)
}

/// Regular hexagon with the given circumradius.
fn hexagon(radius: f64) -> Vec<DVec3> {
    (0..6)
        .map(|k| {
            let angle = std::f64::consts::TAU * k as f64 / 6.0;
            DVec3::new(radius * angle.cos(), radius * angle.sin(), 0.0)
        })
        .collect()
}

fn main() -> Result<()> {
    let options = parse_args()?;
    println!("=== Tissue Sim - Division Diagnostics ===\n");

    let params = DivisionParameters::load_or_default("data/division.json");
    let rules = build_rules(&params)?;
    println!("Rules: {}", rules.len());
    for rule in &rules {
        println!("  {}", rule.kind.name());
    }

    let mut tissue = Tissue::from_polygon(&hexagon(1.0), 2);
    let mut attrs = TissueAttributes::new(params.layout);
    let initial_area = tissue.cell_area(0);
    attrs
        .cells
        .append_row(vec![initial_area, 1.0, 0.0, 0.0]);
    for wall in 0..tissue.walls.len() {
        let mut row = vec![0.0; params.layout.wall_columns];
        row[params.wall_resting_length_column] = tissue.wall_length(wall);
        attrs.walls.append_row(row);
    }
    for _ in 0..tissue.vertices.len() {
        attrs.vertices.append_zero_row();
    }

    println!("\nInitial cell area: {initial_area:.4}");
    println!("Growth per step: {:.1}%\n", options.growth * 100.0);

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut divisions = 0;
    for step in 0..options.steps {
        // Stand-in for the (external) growth integrator: volume and clock
        // advance, geometry stays put.
        for cell in 0..tissue.cells.len() {
            let volume = attrs.cells.get(cell, 0);
            attrs.cells.set(cell, 0, volume * (1.0 + options.growth));
            let time = attrs.cells.get(cell, 2);
            attrs.cells.set(cell, 2, time + 1.0);
        }

        let events = division_step(&mut tissue, &mut attrs, &rules, &mut rng);
        divisions += events.len();
        for event in &events {
            println!(
                "step {:>4}: cell {} -> daughters {}/{} ({})",
                step,
                event.parent,
                event.parent,
                event.daughter,
                event.kind.name()
            );
        }
    }

    let total_area: f64 = (0..tissue.cells.len()).map(|c| tissue.cell_area(c)).sum();
    let total_volume: f64 = (0..tissue.cells.len()).map(|c| attrs.cells.get(c, 0)).sum();

    println!("\n=== Summary ===");
    println!("Steps:        {}", options.steps);
    println!("Divisions:    {divisions}");
    println!("Cells:        {}", tissue.cells.len());
    println!("Walls:        {}", tissue.walls.len());
    println!("Vertices:     {}", tissue.vertices.len());
    println!("Cell rows:    {}", attrs.cells.rows());
    println!("Total area:   {total_area:.6} (initial {initial_area:.6})");
    println!("Total volume: {total_volume:.4}");

    for cell in 0..tissue.cells.len() {
        if !tissue.ring_is_closed(cell) {
            bail!("ring of cell {cell} is not closed");
        }
    }
    if attrs.cells.rows() != tissue.cells.len()
        || attrs.walls.rows() != tissue.walls.len()
        || attrs.vertices.rows() != tissue.vertices.len()
    {
        bail!("attribute rows out of step with entities");
    }
    println!("Topology and attribute bookkeeping consistent.");

    Ok(())
}
