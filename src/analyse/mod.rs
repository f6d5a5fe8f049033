//! Analysis driver: CLI arguments, the end-to-end pipeline, and reporting.
//!
//! # Main Operations
//!
//! - **[`compute_bounds`]**: run the full analysis on a loaded net and return a
//!   [`BoundsReport`].
//! - **[`analyse_main`]**: the CLI entry point — load a `.pnml` file, compute
//!   the bounds of the requested reference transition, print the results, and
//!   write the requested artefacts (LP models/solutions, annotated PNML, DOT).
//!
//! # Workflow
//!
//! 1. Load and validate the PTPN from `<NAME>.pnml`
//! 2. Expand to a GSPN and partition the transitions into equal-conflict sets
//! 3. Solve the throughput LP for the reference transition
//! 4. If the net is live, solve the cycle-time LP and extract the critical
//!    subnet
//! 5. Write bounds and the critical subnet back onto the net and export

pub mod bounds;
pub mod cycle_time;
pub mod throughput;

pub use bounds::{BoundsOutcome, BoundsReport, SolveOptions, compute_bounds};

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use itertools::Itertools;
use prettytable::{Table, row};

use crate::net::{PtpnNet, dot, pnml};

/// Format of the annotated result file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Enriched PNML carrying the computed bounds and the critical subnet.
    Pnml,
    /// Graphviz DOT rendering of the annotated net.
    Dot,
}

/// Command-line arguments for the bound analysis.
#[derive(Debug, Parser)]
pub struct AnalyseArgs {
    /// Net file name, without the .pnml extension
    pub name: String,

    /// Display name of the reference transition
    pub tname: String,

    /// Dump the generated LP models in CPLEX LP format
    #[clap(long, short = 'l')]
    pub lp_model: bool,

    /// Dump the LP solutions
    #[clap(long)]
    pub lp_solution: bool,

    /// Base name for the annotated result file
    #[clap(long, short = 'o')]
    pub output: Option<String>,

    /// Format of the annotated result file
    #[clap(long, value_enum, default_value = "pnml")]
    pub format: OutputFormat,

    /// Print the LP solutions and the critical subnet to stdout
    #[clap(long, short = 'v')]
    pub verbose: bool,
}

/// Run the bound analysis for the given arguments.
///
/// Exits with an error on a missing input file, an unknown reference
/// transition, a validation failure, or a solver failure; a non-live net is a
/// normal result and reported as such.
pub fn analyse_main(args: AnalyseArgs) -> Result<()> {
    let AnalyseArgs {
        name,
        tname,
        lp_model,
        lp_solution,
        output,
        format,
        verbose,
    } = args;

    let filename = PathBuf::from(format!("{}.pnml", name));
    if !filename.is_file() {
        bail!("the file {} does not exist", filename.display());
    }

    let mut net = pnml::read_file(&filename)
        .with_context(|| format!("failed to load PTPN net {}", filename.display()))?;

    let options = SolveOptions {
        lp_model_base: lp_model.then(|| PathBuf::from(&name)),
        lp_solution_base: lp_solution.then(|| PathBuf::from(&name)),
    };

    let report = compute_bounds(&net, &tname, &options)?;
    report.apply(&mut net)?;

    let mut writer: Box<dyn Write> = Box::new(std::io::stdout());

    writeln!(
        writer,
        "Max throughput of '{}': {}",
        tname, report.throughput
    )?;
    match &report.outcome {
        BoundsOutcome::Bounded { cycle_time, .. } => {
            writeln!(writer, "Min cycle time of '{}': {}", tname, cycle_time)?;
        }
        BoundsOutcome::NonLive => {
            writeln!(writer, "The net is not live.")?;
        }
    }

    if verbose {
        print_solution(&mut writer, &net, &report)?;
    }

    if let Some(base) = output {
        match format {
            OutputFormat::Pnml => {
                let path = format!("{}.pnml", base);
                pnml::write_file(&net, PathBuf::from(&path))?;
                writeln!(writer, "Annotated PNML written to {}", path)?;
            }
            OutputFormat::Dot => {
                let path = format!("{}.dot", base);
                fs::write(&path, dot::render(&net))?;
                writeln!(writer, "DOT graph written to {}", path)?;
            }
        }
    }

    Ok(())
}

/// Print the LP solution and the critical subnet using original entity names.
fn print_solution<W: Write>(writer: &mut W, net: &PtpnNet, report: &BoundsReport) -> Result<()> {
    let mut table = Table::new();
    table.set_titles(row!["Place", "M"]);
    for (id, value) in &report.markings {
        let name = net
            .place(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.clone());
        table.add_row(row![name, format!("{}", value)]);
    }
    table.set_format(*prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    writeln!(writer, "\nSteady-state markings:")?;
    table.print(writer)?;

    let mut table = Table::new();
    table.set_titles(row!["Transition", "s", "x"]);
    for (id, firings, throughput) in &report.flows {
        let name = net
            .transition(id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| id.clone());
        table.add_row(row![name, format!("{}", firings), format!("{}", throughput)]);
    }
    table.set_format(*prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    writeln!(writer, "\nTransition flows:")?;
    table.print(writer)?;

    if let BoundsOutcome::Bounded {
        critical_subnet, ..
    } = &report.outcome
    {
        let place_names = critical_subnet
            .places
            .iter()
            .map(|id| {
                net.place(id)
                    .map(|p| p.name.to_string())
                    .unwrap_or_else(|| id.to_string())
            })
            .join(", ");
        let transition_names = critical_subnet
            .transitions
            .iter()
            .map(|id| {
                net.transition(id)
                    .map(|t| t.name.to_string())
                    .unwrap_or_else(|| id.to_string())
            })
            .join(", ");

        writeln!(writer, "\nPlaces of the slowest subnet: {}", place_names)?;
        writeln!(
            writer,
            "Transitions of the slowest subnet: {}",
            transition_names
        )?;
    }

    Ok(())
}
