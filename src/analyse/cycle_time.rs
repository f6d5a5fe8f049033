//! Cycle-time LP and critical-subnet extraction.
//!
//! Given the visit ratios `v` of the throughput solution, this LP searches for
//! a *place invariant* — a non-negative vector `y` over places with
//! `Cᵀ·y = 0` — that maximizes the cycle time projected on those visits:
//!
//! ```text
//! max  Σ_j (Σ_i B[i,j]·y[i]) · δ[j] · v[j]
//! s.t. Cᵀ·y = 0          (pinv<n>, one equality per transition)
//!      M0ᵀ·y = 1         (inimark<n>)
//!      y >= 0
//! ```
//!
//! The optimum is a lower bound on the cycle time of the reference transition,
//! the reciprocal of the throughput bound when both LPs are tight. The support
//! `{i : y[i] > 0}` marks the *critical places*: the slowest circuit of the
//! net. A transition is critical iff its pre-set and its post-set both
//! intersect the support.
//!
//! Reported entities are always original PTPN entities: intermediate places
//! inserted by the expansion are dropped, synthetic immediate transitions are
//! replaced by the transition that owns their distribution.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::PtpnError;
use crate::constraint;
use crate::gspn::{Gspn, PlaceOrigin};
use crate::lp_solver::{
    LPModelBuilder, LPSolution, LinearExpression, OptimizationSense, OptimizationStatus,
    VariableId, VariableType,
};
use crate::net::CriticalSubnet;

/// Values of `y` below this are treated as zero when reading off the support.
pub const SUPPORT_TOLERANCE: f64 = 1e-9;

/// Brand type of the cycle-time LP model.
#[derive(Debug, Clone)]
pub struct CycleTimeModel;

/// The cycle-time LP, ready to be solved or exported.
pub struct CycleTimeLp {
    builder: LPModelBuilder<CycleTimeModel>,
    invariant: Vec<VariableId<CycleTimeModel>>,
}

/// Optimal solution of the cycle-time LP.
#[derive(Debug, Clone)]
pub struct CycleTimeSolution {
    /// Optimal objective value: the cycle-time lower bound of the reference.
    pub objective: f64,
    /// Place-invariant value per expanded place.
    pub invariant: Vec<f64>,
    raw: LPSolution<CycleTimeModel>,
}

impl CycleTimeLp {
    /// Formulate the cycle-time LP for `gspn` under the given visit ratios.
    pub fn build(gspn: &Gspn, visit_ratios: &[f64], name: &str) -> Self {
        let np = gspn.num_places();
        let nt = gspn.num_transitions();
        let mut builder = LPModelBuilder::new(name);

        let invariant: Vec<_> = (0..np)
            .map(|i| {
                builder.add_variable(
                    format!("y{}", i),
                    VariableType::Continuous,
                    0.0,
                    f64::INFINITY,
                )
            })
            .collect();

        // Objective: sum over places of y[i] * (Σ_j B[i,j] * delta[j] * v[j])
        let mut objective = LinearExpression::new(0.0);
        for i in 0..np {
            let coefficient: f64 = gspn
                .pre
                .row(i)
                .map(|(j, b)| (b as f64) * gspn.delays[j] * visit_ratios[j])
                .sum();
            if coefficient != 0.0 {
                objective.add_term(coefficient, invariant[i]);
            }
        }
        builder.set_objective(objective, OptimizationSense::Maximize);

        let incidence = gspn.incidence();
        let mut n_constr = 0usize;

        // Place-invariant: C^T y = 0, one equality per transition
        for j in 0..nt {
            let mut expr = LinearExpression::new(0.0);
            for (i, c) in incidence.column(j) {
                expr.add_term(c as f64, invariant[i]);
            }
            builder.add_constraint(constraint!(format!("pinv{}", n_constr), (expr) == 0.0));
            n_constr += 1;
        }

        // Normalization against the initial marking: M0^T y = 1
        let mut expr = LinearExpression::new(0.0);
        for (i, &m0) in gspn.m0.iter().enumerate() {
            if m0 > 0 {
                expr.add_term(m0 as f64, invariant[i]);
            }
        }
        builder.add_constraint(constraint!(format!("inimark{}", n_constr), (expr) == 1.0));

        CycleTimeLp { builder, invariant }
    }

    /// The underlying LP model, for export.
    pub fn builder(&self) -> &LPModelBuilder<CycleTimeModel> {
        &self.builder
    }

    /// Solve the LP and extract the invariant vector.
    pub fn solve(&self) -> Result<CycleTimeSolution, PtpnError> {
        let lp_name = self.builder.name().to_string();
        let raw = self.builder.solve().map_err(|e| PtpnError::Solver {
            lp: lp_name.clone(),
            reason: e.to_string(),
        })?;

        match raw.status {
            OptimizationStatus::Optimal | OptimizationStatus::Feasible => {}
            OptimizationStatus::Infeasible | OptimizationStatus::InfeasibleOrUnbounded => {
                return Err(PtpnError::Infeasible { lp: lp_name });
            }
            OptimizationStatus::Unbounded => {
                return Err(PtpnError::Unbounded { lp: lp_name });
            }
            OptimizationStatus::Other(reason) => {
                return Err(PtpnError::Solver {
                    lp: lp_name,
                    reason: reason.to_string(),
                });
            }
        }

        Ok(CycleTimeSolution {
            objective: raw.objective_value,
            invariant: self
                .invariant
                .iter()
                .map(|&v| raw.get_value(v).unwrap_or(0.0))
                .collect(),
            raw,
        })
    }

    /// Write a solved solution to `path` as a name/value listing.
    pub fn write_solution(
        &self,
        solution: &CycleTimeSolution,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        self.builder.write_solution(&solution.raw, path)
    }
}

/// Read the critical subnet off an optimal invariant.
///
/// Critical places are the support of `y`, reported by decreasing invariant
/// weight and restricted to original places. Critical transitions are those
/// whose pre-set and post-set both intersect the support, with synthetic
/// immediate transitions folded back into their originating transition; they
/// are reported in declaration order.
pub fn critical_subnet(gspn: &Gspn, invariant: &[f64]) -> CriticalSubnet {
    let support: Vec<bool> = invariant.iter().map(|&y| y > SUPPORT_TOLERANCE).collect();

    let places = support
        .iter()
        .enumerate()
        .filter(|&(_, &in_support)| in_support)
        .filter_map(|(i, _)| match gspn.place_origin(i) {
            PlaceOrigin::Original(id) => Some((i, id.clone())),
            PlaceOrigin::Distribution { .. } => None,
        })
        .sorted_by_key(|&(i, _)| (std::cmp::Reverse(OrderedFloat(invariant[i])), i))
        .map(|(_, id)| id)
        .collect();

    let mut transitions = Vec::new();
    let mut reported: HashSet<crate::Symbol> = HashSet::new();
    for j in 0..gspn.num_transitions() {
        let pre_hit = gspn.pre.column(j).any(|(i, b)| b > 0 && support[i]);
        let post_hit = gspn.post.column(j).any(|(i, f)| f > 0 && support[i]);
        if pre_hit && post_hit {
            let original = gspn.transition_origin(j).original_id().clone();
            if reported.insert(original.clone()) {
                transitions.push(original);
            }
        }
    }

    CriticalSubnet {
        places,
        transitions,
    }
}
