//! Bound computation pipeline and result reporting.
//!
//! [`compute_bounds`] runs the full analysis on a validated net: GSPN
//! expansion, equal-conflict partitioning and weight normalization, the
//! throughput LP, and — when the net turns out to be live — the cycle-time LP
//! with critical-subnet extraction. The returned [`BoundsReport`] carries the
//! results mapped back to original PTPN entities; [`BoundsReport::apply`]
//! writes them onto the net, the single mutation an analysis performs.

use std::path::PathBuf;

use crate::PtpnError;
use crate::analyse::cycle_time::{self, CycleTimeLp};
use crate::analyse::throughput::ThroughputLp;
use crate::gspn::{Gspn, PlaceOrigin, TransitionOrigin, ecs};
use crate::net::{Bound, CriticalSubnet, Metric, PtpnNet, StatQualifier, Symbol};

/// Optional artefact dumping for an analysis run.
///
/// When a base path is set, the LP models and/or solutions are written next to
/// it as `<base>_lp_max_X.lp`, `<base>_lp_CT.lp`, `<base>_lp_max_X.sol`, and
/// `<base>_lp_CT.sol`.
#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    pub lp_model_base: Option<PathBuf>,
    pub lp_solution_base: Option<PathBuf>,
}

/// Outcome of the analysis beyond the throughput bound itself.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundsOutcome {
    /// The throughput optimum is 0: the net is not live and no cycle-time
    /// analysis was attempted. A normal result, not an error.
    NonLive,
    /// The net is live; both bounds and the critical subnet were computed.
    Bounded {
        cycle_time: f64,
        critical_subnet: CriticalSubnet,
    },
}

/// Results of one analysis run, mapped back to original PTPN entities.
#[derive(Debug, Clone)]
pub struct BoundsReport {
    /// Id of the reference transition.
    pub reference: Symbol,
    /// Display name of the reference transition.
    pub reference_name: Symbol,
    /// Upper bound on the reference throughput (the LP optimum).
    pub throughput: f64,
    /// Steady-state mean marking per original place.
    pub markings: Vec<(Symbol, f64)>,
    /// Firing count and throughput per original transition.
    pub flows: Vec<(Symbol, f64, f64)>,
    pub outcome: BoundsOutcome,
}

impl BoundsReport {
    /// Whether the net was found live.
    pub fn is_live(&self) -> bool {
        matches!(self.outcome, BoundsOutcome::Bounded { .. })
    }

    /// The computed bounds as `(metric, qualifier, value)` triples, ready for
    /// the export layers.
    pub fn bounds(&self) -> Vec<(Metric, StatQualifier, f64)> {
        let mut bounds = vec![(Metric::Throughput, StatQualifier::Max, self.throughput)];
        if let BoundsOutcome::Bounded { cycle_time, .. } = &self.outcome {
            bounds.push((Metric::CycleTime, StatQualifier::Min, *cycle_time));
        }
        bounds
    }

    /// Write the bounds onto the reference transition and attach the critical
    /// subnet to the net. Called once per analysis run.
    pub fn apply(&self, net: &mut PtpnNet) -> Result<(), PtpnError> {
        let transition = net
            .transition_mut(&self.reference)
            .ok_or_else(|| PtpnError::UnknownTransition(self.reference.to_string()))?;

        transition.set_bound(
            Metric::Throughput,
            Bound {
                qualifier: StatQualifier::Max,
                value: self.throughput,
            },
        );

        if let BoundsOutcome::Bounded {
            cycle_time,
            critical_subnet,
        } = &self.outcome
        {
            transition.set_bound(
                Metric::CycleTime,
                Bound {
                    qualifier: StatQualifier::Min,
                    value: *cycle_time,
                },
            );
            net.set_critical_subnet(critical_subnet.clone());
        }

        Ok(())
    }
}

/// Compute the throughput and cycle-time bounds of the transition named
/// `reference` and identify the critical subnet.
///
/// Validation is eager: the net is checked before expansion, and an unknown
/// reference name fails before any LP is built.
pub fn compute_bounds(
    net: &PtpnNet,
    reference: &str,
    options: &SolveOptions,
) -> Result<BoundsReport, PtpnError> {
    net.validate()?;

    let reference_transition = net
        .transition_by_name(reference)
        .ok_or_else(|| PtpnError::UnknownTransition(reference.to_string()))?;

    let mut gspn = Gspn::expand(net)?;
    let partition = ecs::partition(&gspn);
    ecs::normalise_weights(&mut gspn.weights, &partition);

    let reference_index = gspn
        .transition_index(&reference_transition.id)
        .ok_or_else(|| PtpnError::UnknownTransition(reference.to_string()))?;

    let lp = ThroughputLp::build(
        &gspn,
        &partition,
        reference_index,
        &format!("obj{}", reference),
    );
    if let Some(base) = &options.lp_model_base {
        lp.builder()
            .write_lp(format!("{}_lp_max_X.lp", base.display()))
            .map_err(|e| PtpnError::Solver {
                lp: lp.builder().name().to_string(),
                reason: e.to_string(),
            })?;
    }

    let solution = lp.solve()?;
    if let Some(base) = &options.lp_solution_base {
        lp.write_solution(&solution, format!("{}_lp_max_X.sol", base.display()))
            .map_err(|e| PtpnError::Solver {
                lp: lp.builder().name().to_string(),
                reason: e.to_string(),
            })?;
    }

    // Back-map the solution vectors to original entities for reporting
    let markings = (0..gspn.num_places())
        .filter_map(|i| match gspn.place_origin(i) {
            PlaceOrigin::Original(id) => Some((id.clone(), solution.marking[i])),
            PlaceOrigin::Distribution { .. } => None,
        })
        .collect();
    let flows = (0..gspn.num_transitions())
        .filter_map(|j| match gspn.transition_origin(j) {
            TransitionOrigin::Original(id) => Some((
                id.clone(),
                solution.firing_counts[j],
                solution.throughputs[j],
            )),
            TransitionOrigin::Outcome { .. } => None,
        })
        .collect();

    let outcome = match solution.visit_ratios(reference_index) {
        None => BoundsOutcome::NonLive,
        Some(visit_ratios) => {
            let ct_lp = CycleTimeLp::build(&gspn, &visit_ratios, &format!("ct{}", reference));
            if let Some(base) = &options.lp_model_base {
                ct_lp
                    .builder()
                    .write_lp(format!("{}_lp_CT.lp", base.display()))
                    .map_err(|e| PtpnError::Solver {
                        lp: ct_lp.builder().name().to_string(),
                        reason: e.to_string(),
                    })?;
            }

            let ct_solution = ct_lp.solve()?;
            if let Some(base) = &options.lp_solution_base {
                ct_lp
                    .write_solution(&ct_solution, format!("{}_lp_CT.sol", base.display()))
                    .map_err(|e| PtpnError::Solver {
                        lp: ct_lp.builder().name().to_string(),
                        reason: e.to_string(),
                    })?;
            }

            BoundsOutcome::Bounded {
                cycle_time: ct_solution.objective,
                critical_subnet: cycle_time::critical_subnet(&gspn, &ct_solution.invariant),
            }
        }
    };

    Ok(BoundsReport {
        reference: reference_transition.id.clone(),
        reference_name: Symbol::from(reference),
        throughput: solution.objective,
        markings,
        flows,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Symbol;
    use crate::net::{NetArc, Place, TimeFunction, Transition};
    use approx::assert_relative_eq;

    fn self_loop_net() -> PtpnNet {
        let mut net = PtpnNet::new("loop");
        net.add_place(Place::new("p0", "p0", 1));
        net.add_transition(Transition::new(
            "t0",
            "t0",
            Some(TimeFunction::Exponential { lambda: 2.0 }),
        ));
        net.add_arc(NetArc::new("a0", "p0", "t0", 1));
        net.add_arc(NetArc::new("a1", "t0", "p0", 1));
        net
    }

    #[test]
    fn test_self_loop_bounds() {
        let net = self_loop_net();
        let report = compute_bounds(&net, "t0", &SolveOptions::default()).unwrap();

        assert_relative_eq!(report.throughput, 2.0, epsilon = 1e-5);
        match &report.outcome {
            BoundsOutcome::Bounded {
                cycle_time,
                critical_subnet,
            } => {
                assert_relative_eq!(*cycle_time, 0.5, epsilon = 1e-5);
                assert_eq!(critical_subnet.places, vec![Symbol::from("p0")]);
                assert_eq!(critical_subnet.transitions, vec![Symbol::from("t0")]);
            }
            BoundsOutcome::NonLive => panic!("self-loop net is live"),
        }
    }

    #[test]
    fn test_apply_writes_bounds_once() {
        let mut net = self_loop_net();
        let report = compute_bounds(&net, "t0", &SolveOptions::default()).unwrap();
        report.apply(&mut net).unwrap();

        let bounds = net.transition_by_name("t0").unwrap().bounds();
        assert_eq!(bounds.len(), 2);
        assert_eq!(bounds[&Metric::Throughput].qualifier, StatQualifier::Max);
        assert_eq!(bounds[&Metric::CycleTime].qualifier, StatQualifier::Min);
        assert!(net.critical_subnet().is_some());
    }

    #[test]
    fn test_unknown_reference_transition() {
        let net = self_loop_net();
        let err = compute_bounds(&net, "missing", &SolveOptions::default()).unwrap_err();
        assert_eq!(err, PtpnError::UnknownTransition("missing".to_string()));
    }

    #[test]
    fn test_validation_runs_before_expansion() {
        let mut net = self_loop_net();
        net.add_arc(NetArc::new("bad", "p0", "gone", 1));
        let err = compute_bounds(&net, "t0", &SolveOptions::default()).unwrap_err();
        assert!(matches!(err, PtpnError::Validation(_)));
    }

    #[test]
    fn test_non_live_net_skips_cycle_time() {
        let mut net = PtpnNet::new("dead");
        net.add_place(Place::new("p", "p", 0));
        net.add_place(Place::new("q", "q", 0));
        net.add_transition(Transition::new(
            "t1",
            "t1",
            Some(TimeFunction::Constant { k: 1.0 }),
        ));
        net.add_transition(Transition::new(
            "t2",
            "t2",
            Some(TimeFunction::Constant { k: 1.0 }),
        ));
        net.add_arc(NetArc::new("a0", "p", "t1", 1));
        net.add_arc(NetArc::new("a1", "p", "t2", 1));
        net.add_arc(NetArc::new("a2", "t1", "q", 1));
        net.add_arc(NetArc::new("a3", "t2", "q", 1));

        let report = compute_bounds(&net, "t1", &SolveOptions::default()).unwrap();
        assert_eq!(report.throughput, 0.0);
        assert_eq!(report.outcome, BoundsOutcome::NonLive);
        assert_eq!(report.bounds().len(), 1);

        let mut net = net;
        report.apply(&mut net).unwrap();
        assert!(net.critical_subnet().is_none());
        assert_eq!(net.transition_by_name("t1").unwrap().bounds().len(), 1);
    }

    #[test]
    fn test_duality_between_bounds() {
        let net = self_loop_net();
        let report = compute_bounds(&net, "t0", &SolveOptions::default()).unwrap();
        if let BoundsOutcome::Bounded { cycle_time, .. } = report.outcome {
            assert_relative_eq!(report.throughput * cycle_time, 1.0, epsilon = 1e-4);
        } else {
            panic!("expected live net");
        }
    }
}
