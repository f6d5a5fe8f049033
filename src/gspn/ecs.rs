//! Equal-conflict set partitioning and weight normalization.
//!
//! Two expanded transitions are in the same *equal-conflict set* (ECS) iff
//! their input places coincide exactly: `{p : B[p,t1] > 0} = {p : B[p,t2] > 0}`.
//! Conflicts inside an ECS are resolved proportionally to the transition
//! weights, which therefore have to sum to 1 within every ECS of size ≥ 2.
//! Singleton ECSs keep their weight.

use std::collections::HashMap;

use crate::gspn::Gspn;
use crate::net::PROB_TOLERANCE;

/// Partition all expanded transitions into equal-conflict sets.
///
/// The returned sets are disjoint, cover every transition exactly once, and
/// are ordered by the lowest transition index they contain; members are in
/// index order. Transitions with an empty pre-set all land in one set.
pub fn partition(gspn: &Gspn) -> Vec<Vec<usize>> {
    // Input sets, in place-index order thanks to row-major matrix iteration
    let mut inputs: Vec<Vec<usize>> = vec![Vec::new(); gspn.num_transitions()];
    for (p, t, value) in gspn.pre.entries() {
        if value > 0 {
            inputs[t].push(p);
        }
    }

    let mut partition: Vec<Vec<usize>> = Vec::new();
    let mut positions: HashMap<&[usize], usize> = HashMap::new();

    for (t, input_set) in inputs.iter().enumerate() {
        match positions.get(input_set.as_slice()) {
            Some(&k) => partition[k].push(t),
            None => {
                positions.insert(input_set.as_slice(), partition.len());
                partition.push(vec![t]);
            }
        }
    }

    partition
}

/// Normalize weights so that they sum to 1 within every ECS of size ≥ 2.
///
/// Pre-normalized inputs are accepted as-is; anything else is rescaled with a
/// warning, matching the probabilistic-routing interpretation of weights.
pub fn normalise_weights(weights: &mut [f64], partition: &[Vec<usize>]) {
    for ecs in partition {
        if ecs.len() < 2 {
            continue;
        }

        let sum: f64 = ecs.iter().map(|&t| weights[t]).sum();
        if (sum - 1.0).abs() <= PROB_TOLERANCE {
            continue;
        }
        if sum <= 0.0 {
            log::warn!("equal-conflict set {:?} has non-positive weight sum {}", ecs, sum);
            continue;
        }

        log::warn!(
            "weights of equal-conflict set {:?} sum to {}, normalizing",
            ecs,
            sum
        );
        for &t in ecs {
            weights[t] /= sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{NetArc, Place, PtpnNet, TimeFunction, Transition};
    use approx::assert_relative_eq;

    fn choice_gspn() -> Gspn {
        let mut net = PtpnNet::new("choice");
        net.add_place(Place::new("p", "p", 1));
        net.add_place(Place::new("q", "q", 0));
        net.add_place(Place::new("r", "r", 0));
        net.add_transition(Transition::new(
            "t",
            "t",
            Some(TimeFunction::Exponential { lambda: 1.0 }),
        ));
        net.add_transition(Transition::new(
            "u",
            "u",
            Some(TimeFunction::Constant { k: 4.0 }),
        ));
        net.add_transition(Transition::new(
            "v",
            "v",
            Some(TimeFunction::Constant { k: 1.0 }),
        ));
        net.add_arc(NetArc::new("a0", "p", "t", 1));
        net.add_arc(NetArc::with_distribution("a1", "t", "q", 1, "D", 0.5));
        net.add_arc(NetArc::with_distribution("a2", "t", "r", 1, "D", 0.5));
        net.add_arc(NetArc::new("a3", "q", "u", 1));
        net.add_arc(NetArc::new("a4", "r", "v", 1));
        net.add_arc(NetArc::new("a5", "u", "p", 1));
        net.add_arc(NetArc::new("a6", "v", "p", 1));
        Gspn::expand(&net).unwrap()
    }

    #[test]
    fn test_partition_covers_every_transition_once() {
        let gspn = choice_gspn();
        let partition = partition(&gspn);

        let mut seen = vec![0usize; gspn.num_transitions()];
        for ecs in &partition {
            for &t in ecs {
                seen[t] += 1;
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn test_outcome_transitions_share_an_ecs() {
        let gspn = choice_gspn();
        let partition = partition(&gspn);

        let t_q = gspn.transition_index(&crate::Symbol::from("t_D_q")).unwrap();
        let t_r = gspn.transition_index(&crate::Symbol::from("t_D_r")).unwrap();

        let ecs = partition
            .iter()
            .find(|ecs| ecs.contains(&t_q))
            .expect("t_D_q must be covered");
        assert!(ecs.contains(&t_r));
        assert_eq!(ecs.len(), 2);
    }

    #[test]
    fn test_pre_sets_equal_within_each_ecs() {
        let gspn = choice_gspn();
        for ecs in partition(&gspn) {
            let pre_set = |t: usize| -> Vec<usize> {
                (0..gspn.num_places())
                    .filter(|&p| gspn.pre.get(p, t) > 0)
                    .collect()
            };
            let first = pre_set(ecs[0]);
            for &t in &ecs[1..] {
                assert_eq!(pre_set(t), first);
            }
        }
    }

    #[test]
    fn test_sharing_an_input_place_is_not_enough() {
        // u and v share nothing; t consumes p while u and v consume q and r.
        // All pre-sets differ, so the three original transitions are alone.
        let gspn = choice_gspn();
        let partition = partition(&gspn);
        for original in 0..3 {
            let ecs = partition.iter().find(|ecs| ecs.contains(&original)).unwrap();
            assert_eq!(ecs.len(), 1, "transition {} should be a singleton", original);
        }
    }

    #[test]
    fn test_normalisation_rescales_unnormalized_ecs() {
        let mut weights = vec![1.0, 1.0];
        normalise_weights(&mut weights, &[vec![0, 1]]);
        assert_relative_eq!(weights[0], 0.5);
        assert_relative_eq!(weights[1], 0.5);
    }

    #[test]
    fn test_normalisation_keeps_singletons_and_normalized_sets() {
        let mut weights = vec![3.0, 0.25, 0.75];
        normalise_weights(&mut weights, &[vec![0], vec![1, 2]]);
        assert_relative_eq!(weights[0], 3.0);
        assert_relative_eq!(weights[1], 0.25);
        assert_relative_eq!(weights[2], 0.75);
    }
}
