//! Throughput-maximization LP over the expanded net.
//!
//! For an expanded net with `|P|` places and `|T|` transitions the LP uses
//! three groups of continuous, non-negative variables:
//!
//! - `M<i>` — steady-state mean marking of place `i`
//! - `s<j>` — cumulative firing count of transition `j` (projective variable)
//! - `x<j>` — steady-state throughput of transition `j`
//!
//! subject to, with `C = F - B`:
//!
//! 1. *Reachability:* `M - C·s = M0`, one equality per place (`reach<n>`)
//! 2. *Conservative flow:* `C·x = 0`, one equality per place (`flow<n>`)
//! 3. *Little's law:* `M[i] - δ[j]·B[i,j]·x[j] >= 0` for every place `i`
//!    feeding a timed transition `j` (`little<n>`)
//! 4. *Routing:* inside every equal-conflict set of size ≥ 2, throughput is
//!    proportional to the weights (`routing<n>`)
//!
//! and the objective maximizes `x` of the reference transition. The optimum
//! is an upper bound on the reference throughput; an optimum of 0 means the
//! net is not live.

use std::path::Path;

use anyhow::Result;

use crate::PtpnError;
use crate::constraint;
use crate::gspn::Gspn;
use crate::lp_solver::{
    LPModelBuilder, LPSolution, LinearExpression, OptimizationSense, OptimizationStatus,
    VariableId, VariableType,
};

/// Brand type of the throughput LP model.
#[derive(Debug, Clone)]
pub struct ThroughputModel;

/// The throughput LP, ready to be solved or exported.
pub struct ThroughputLp {
    builder: LPModelBuilder<ThroughputModel>,
    marking: Vec<VariableId<ThroughputModel>>,
    firings: Vec<VariableId<ThroughputModel>>,
    throughput: Vec<VariableId<ThroughputModel>>,
}

/// Optimal solution of the throughput LP.
#[derive(Debug, Clone)]
pub struct ThroughputSolution {
    /// Optimal objective value: the throughput upper bound of the reference.
    pub objective: f64,
    /// Steady-state mean marking per expanded place.
    pub marking: Vec<f64>,
    /// Cumulative firing count per expanded transition.
    pub firing_counts: Vec<f64>,
    /// Steady-state throughput per expanded transition.
    pub throughputs: Vec<f64>,
    raw: LPSolution<ThroughputModel>,
}

impl ThroughputSolution {
    /// Visit ratios `v[j] = x[j] / x[ref]`; `None` when the reference does not
    /// fire in steady state.
    pub fn visit_ratios(&self, reference: usize) -> Option<Vec<f64>> {
        let x_ref = self.throughputs[reference];
        if x_ref > 0.0 {
            Some(self.throughputs.iter().map(|x| x / x_ref).collect())
        } else {
            None
        }
    }
}

impl ThroughputLp {
    /// Formulate the throughput LP for `gspn` with the given equal-conflict
    /// partition (weights already normalized) and reference transition index.
    pub fn build(gspn: &Gspn, partition: &[Vec<usize>], reference: usize, name: &str) -> Self {
        let np = gspn.num_places();
        let nt = gspn.num_transitions();
        let mut builder = LPModelBuilder::new(name);

        let marking: Vec<_> = (0..np)
            .map(|i| {
                builder.add_variable(
                    format!("M{}", i),
                    VariableType::Continuous,
                    0.0,
                    f64::INFINITY,
                )
            })
            .collect();
        let firings: Vec<_> = (0..nt)
            .map(|j| {
                builder.add_variable(
                    format!("s{}", j),
                    VariableType::Continuous,
                    0.0,
                    f64::INFINITY,
                )
            })
            .collect();
        let throughput: Vec<_> = (0..nt)
            .map(|j| {
                builder.add_variable(
                    format!("x{}", j),
                    VariableType::Continuous,
                    0.0,
                    f64::INFINITY,
                )
            })
            .collect();

        let incidence = gspn.incidence();
        let mut n_constr = 0usize;

        // Reachability (state equation): M - C s = M0
        for p in 0..np {
            let mut expr = LinearExpression::from_variable(marking[p]);
            for (t, c) in incidence.row(p) {
                expr.add_term(-(c as f64), firings[t]);
            }
            builder.add_constraint(constraint!(
                format!("reach{}", n_constr),
                (expr) == gspn.m0[p] as f64
            ));
            n_constr += 1;
        }

        // Conservative flow: C x = 0
        for p in 0..np {
            let mut expr = LinearExpression::new(0.0);
            for (t, c) in incidence.row(p) {
                expr.add_term(c as f64, throughput[t]);
            }
            builder.add_constraint(constraint!(format!("flow{}", n_constr), (expr) == 0.0));
            n_constr += 1;
        }

        // Little's law: M[i] >= delta[j] * B[i,j] * x[j] for timed transitions
        for j in 0..nt {
            if gspn.delays[j] <= 0.0 {
                continue;
            }
            for (i, b) in gspn.pre.column(j) {
                if b == 0 {
                    continue;
                }
                let expr = marking[i] - gspn.delays[j] * (b as f64) * throughput[j];
                builder.add_constraint(constraint!(format!("little{}", n_constr), (expr) >= 0.0));
                n_constr += 1;
            }
        }

        // Routing: x[t] = w[t] * sum of the ECS, linearized per member
        for ecs in partition {
            if ecs.len() < 2 {
                continue;
            }
            for &t in ecs {
                let mut expr = LinearExpression::new(0.0);
                expr.add_term(1.0 - gspn.weights[t], throughput[t]);
                for &other in ecs {
                    if other != t {
                        expr.add_term(-gspn.weights[t], throughput[other]);
                    }
                }
                builder.add_constraint(constraint!(format!("routing{}", n_constr), (expr) == 0.0));
                n_constr += 1;
            }
        }

        builder.set_objective(throughput[reference], OptimizationSense::Maximize);

        ThroughputLp {
            builder,
            marking,
            firings,
            throughput,
        }
    }

    /// The underlying LP model, for export.
    pub fn builder(&self) -> &LPModelBuilder<ThroughputModel> {
        &self.builder
    }

    /// Solve the LP and extract the variable groups.
    pub fn solve(&self) -> Result<ThroughputSolution, PtpnError> {
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

        let values = |vars: &[VariableId<ThroughputModel>]| -> Vec<f64> {
            vars.iter()
                .map(|&v| raw.get_value(v).unwrap_or(0.0))
                .collect()
        };

        Ok(ThroughputSolution {
            objective: raw.objective_value,
            marking: values(&self.marking),
            firing_counts: values(&self.firings),
            throughputs: values(&self.throughput),
            raw,
        })
    }

    /// Write a solved solution to `path` as a name/value listing.
    pub fn write_solution(
        &self,
        solution: &ThroughputSolution,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        self.builder.write_solution(&solution.raw, path)
    }
}
