//! Performance-bound analysis for Probabilistic Timed Petri Nets (PTPNs).
//!
//! This library computes an upper bound on the steady-state throughput of a
//! designated reference transition, the matching lower bound on its cycle
//! time, and the *critical subnet* — the place/transition subset that
//! bottlenecks performance.
//!
//! # Overview
//!
//! The analysis works on a PTPN: a place/transition net where each transition
//! carries a firing-time function and output arcs may be grouped into named
//! probabilistic distributions. The pipeline is:
//!
//! 1. **Expansion** ([`gspn`]): the PTPN is rewritten into an equivalent
//!    generalized stochastic Petri net (GSPN). Each probabilistic output
//!    distribution becomes an intermediate place feeding one weighted immediate
//!    transition per outcome, so probabilistic choice turns into a proper
//!    equal conflict in the net structure.
//! 2. **Throughput LP** ([`analyse::throughput`]): a linear program over the
//!    expanded net maximizes the reference transition's throughput under
//!    reachability, flow-balance, Little's-law, and equal-conflict routing
//!    constraints.
//! 3. **Cycle-time LP** ([`analyse::cycle_time`]): a second LP over place
//!    invariants, parameterized by the visit ratios of the first solution,
//!    finds the slowest circuit and with it the critical subnet.
//!
//! Results are written back onto the reference transition as bounds and
//! attached to the net as a critical subnet, ready for PNML or DOT export.
//!
//! # Usage Example
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use ptpnbound::analyse::{SolveOptions, compute_bounds};
//! use ptpnbound::net::pnml;
//! use std::path::Path;
//!
//! let mut net = pnml::read_file(Path::new("factory.pnml"))?;
//! let report = compute_bounds(&net, "produce", &SolveOptions::default())?;
//! report.apply(&mut net)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - **[`net`]**: PTPN data model, validation, PNML import/export, DOT rendering
//! - **[`gspn`]**: PTPN → GSPN expansion, incidence matrices, equal-conflict sets
//! - **[`analyse`]**: LP formulation, bound computation, and reporting
//! - **[`lp_solver`]**: Linear programming solver abstraction layer

use clap::Parser;
use std::{error::Error, fmt};

pub mod analyse;
pub mod gspn;
pub mod lp_solver;
pub mod net;

// Re-export the main types and functions for easy access
pub use analyse::{AnalyseArgs, BoundsReport, analyse_main, compute_bounds};
pub use net::{PtpnNet, Symbol};

/// Errors that can occur while loading, validating, or analysing a PTPN.
///
/// `NonLive` (throughput optimum 0) is deliberately absent: it is a normal
/// analysis outcome, reported through
/// [`analyse::BoundsOutcome`](analyse::BoundsOutcome).
#[derive(Debug, Clone, PartialEq)]
pub enum PtpnError {
    /// Malformed PNML input.
    Parse(String),
    /// An input invariant of the net model is violated.
    Validation(String),
    /// Time-function parameters are unrecognized or out of range.
    InvalidParameters { transition: Symbol, reason: String },
    /// The reference transition name is not present in the net.
    UnknownTransition(String),
    /// An LP was reported infeasible.
    Infeasible { lp: String },
    /// An LP was reported unbounded.
    Unbounded { lp: String },
    /// The LP backend returned an internal failure.
    Solver { lp: String, reason: String },
}

impl fmt::Display for PtpnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PtpnError::Parse(reason) => write!(f, "PNML parse error: {}", reason),
            PtpnError::Validation(reason) => write!(f, "invalid net: {}", reason),
            PtpnError::InvalidParameters { transition, reason } => {
                write!(f, "invalid parameters on transition '{}': {}", transition, reason)
            }
            PtpnError::UnknownTransition(name) => {
                write!(f, "transition '{}' does not exist in the net", name)
            }
            PtpnError::Infeasible { lp } => write!(f, "LP '{}' is infeasible", lp),
            PtpnError::Unbounded { lp } => write!(f, "LP '{}' is unbounded", lp),
            PtpnError::Solver { lp, reason } => {
                write!(f, "solver failure in LP '{}': {}", lp, reason)
            }
        }
    }
}

impl Error for PtpnError {}

/// Command-line interface arguments.
///
/// The binary computes the maximum throughput and minimum cycle time of one
/// reference transition and can export the annotated net and the LP artefacts.
#[derive(Debug, Parser)]
#[clap(
    name = "ptpnbound",
    about = "Performance bound solver for Probabilistic Timed Petri Nets"
)]
pub struct CliArguments {
    #[clap(flatten)]
    pub analyse: AnalyseArgs,
}
