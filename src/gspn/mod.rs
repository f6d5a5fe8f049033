//! PTPN → GSPN expansion.
//!
//! The LP formulation assumes GSPN semantics: every transition has a mean
//! firing time, and conflicts between immediate transitions are resolved by
//! weights. A PTPN's probabilistic output distributions do not fit that shape
//! directly — inlining the probabilities as arc labels would break
//! equal-conflict analysis. Instead, each named distribution `D` on a
//! transition `t` is expanded:
//!
//! - a fresh intermediate place `p_D` receives one token per firing of `t`;
//! - every outcome arc `(q, m, π)` of `D` becomes a fresh immediate transition
//!   with weight `π` that consumes the token from `p_D` and deposits `m`
//!   tokens into `q`.
//!
//! The immediate transitions of one distribution share `p_D` as their only
//! input place, so they form an equal-conflict set and the probabilistic
//! choice becomes a proper conflict in the net.
//!
//! The expanded net is a transient, internal structure: index maps, sparse
//! pre/post incidence matrices, the initial marking, and per-transition weight
//! and delay vectors, plus origin maps that let analysis results be reported
//! against the original PTPN entities.
//!
//! Expansion iterates places, transitions, and arcs in input-declaration
//! order, so synthetic ids and index assignment are stable across runs.

pub mod dok;
pub mod ecs;

pub use dok::DokMatrix;

use std::collections::HashMap;

use crate::PtpnError;
use crate::net::{ArcKind, PtpnNet, Symbol};

/// Provenance of an expanded place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceOrigin {
    /// Place of the input PTPN.
    Original(Symbol),
    /// Intermediate place inserted for a distribution on a transition.
    Distribution {
        transition: Symbol,
        distribution: Symbol,
    },
}

/// Provenance of an expanded transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOrigin {
    /// Transition of the input PTPN.
    Original(Symbol),
    /// Immediate transition inserted for one outcome of a distribution.
    Outcome {
        transition: Symbol,
        distribution: Symbol,
    },
}

impl TransitionOrigin {
    /// Id of the original PTPN transition this expanded transition stems from.
    pub fn original_id(&self) -> &Symbol {
        match self {
            TransitionOrigin::Original(id) => id,
            TransitionOrigin::Outcome { transition, .. } => transition,
        }
    }
}

/// GSPN-shaped expansion of a PTPN.
///
/// Index maps are monotone in insertion order: the original places and
/// transitions keep their declaration indices, synthetic entries are appended
/// in the order the expansion creates them.
#[derive(Debug, Clone)]
pub struct Gspn {
    place_ids: Vec<Symbol>,
    place_origins: Vec<PlaceOrigin>,
    transition_ids: Vec<Symbol>,
    transition_origins: Vec<TransitionOrigin>,
    place_index: HashMap<Symbol, usize>,
    transition_index: HashMap<Symbol, usize>,
    /// Initial marking vector.
    pub m0: Vec<u64>,
    /// Pre-incidence matrix `B[place, transition]`.
    pub pre: DokMatrix,
    /// Post-incidence matrix `F[place, transition]`.
    pub post: DokMatrix,
    /// Transition weights; 1 for original transitions, the outcome probability
    /// for synthetic immediate transitions (renormalized per ECS later).
    pub weights: Vec<f64>,
    /// Mean firing delays; 0 for synthetic immediate transitions.
    pub delays: Vec<f64>,
}

impl Gspn {
    /// Expand a validated PTPN into its GSPN structure.
    pub fn expand(net: &PtpnNet) -> Result<Self, PtpnError> {
        let mut gspn = Gspn {
            place_ids: Vec::new(),
            place_origins: Vec::new(),
            transition_ids: Vec::new(),
            transition_origins: Vec::new(),
            place_index: HashMap::new(),
            transition_index: HashMap::new(),
            m0: Vec::new(),
            pre: DokMatrix::new(net.places().len(), net.transitions().len()),
            post: DokMatrix::new(net.places().len(), net.transitions().len()),
            weights: Vec::new(),
            delays: Vec::new(),
        };

        for place in net.places() {
            gspn.place_index
                .insert(place.id.clone(), gspn.place_ids.len());
            gspn.place_ids.push(place.id.clone());
            gspn.place_origins
                .push(PlaceOrigin::Original(place.id.clone()));
            gspn.m0.push(place.initial_marking);
        }

        for transition in net.transitions() {
            gspn.transition_index
                .insert(transition.id.clone(), gspn.transition_ids.len());
            gspn.transition_ids.push(transition.id.clone());
            gspn.transition_origins
                .push(TransitionOrigin::Original(transition.id.clone()));
            gspn.weights.push(1.0);
            gspn.delays.push(transition.mean_delay());
        }

        // Incidence matrices are filled from the transition view point: inputs
        // go straight into B, outputs are grouped by distribution first.
        for transition in net.transitions() {
            let t = gspn.transition_index[&transition.id];

            // {dist id or None -> [(place index, multiplicity, probability)]},
            // groups and group members in arc-declaration order
            let mut group_order: Vec<Option<Symbol>> = Vec::new();
            let mut post_set: HashMap<Option<Symbol>, Vec<(usize, u64, f64)>> = HashMap::new();

            for arc in net.arcs() {
                let (kind, place_id, transition_id) = net.arc_endpoints(arc)?;
                if transition_id != &transition.id {
                    continue;
                }
                let p = gspn.place_index[place_id];

                match kind {
                    ArcKind::Input => {
                        gspn.pre.set(p, t, arc.multiplicity as i64);
                    }
                    ArcKind::Output => {
                        let probability = match (&arc.distribution, arc.probability) {
                            (Some(_), Some(prob)) => prob,
                            (None, _) => 1.0,
                            (Some(_), None) => {
                                return Err(PtpnError::Validation(format!(
                                    "distribution arc '{}' carries no probability",
                                    arc.id
                                )));
                            }
                        };
                        let key = arc.distribution.clone();
                        if !post_set.contains_key(&key) {
                            group_order.push(key.clone());
                        }
                        post_set
                            .entry(key)
                            .or_default()
                            .push((p, arc.multiplicity, probability));
                    }
                }
            }

            for key in group_order {
                match key {
                    None => {
                        // Deterministic multi-arcs need no expansion
                        for (q, mult, _) in &post_set[&None] {
                            gspn.post.set(*q, t, *mult as i64);
                        }
                    }
                    Some(dist) => {
                        let p_dist =
                            gspn.insert_distribution_place(&transition.id, &dist)?;
                        gspn.post.set(p_dist, t, 1);

                        let outcomes = post_set[&Some(dist.clone())].clone();
                        for (q, mult, probability) in outcomes {
                            let target_id = gspn.place_ids[q].clone();
                            let t_out = gspn.insert_outcome_transition(
                                &transition.id,
                                &dist,
                                &target_id,
                                probability,
                            )?;
                            gspn.pre.set(p_dist, t_out, 1);
                            gspn.post.set(q, t_out, mult as i64);
                        }
                    }
                }
            }
        }

        Ok(gspn)
    }

    fn insert_distribution_place(
        &mut self,
        transition: &Symbol,
        distribution: &Symbol,
    ) -> Result<usize, PtpnError> {
        let id = Symbol::from(format!("{}_{}", transition, distribution));
        if self.place_index.contains_key(&id) {
            return Err(PtpnError::Validation(format!(
                "synthetic place id '{}' collides with an existing place",
                id
            )));
        }

        let index = self.place_ids.len();
        self.place_index.insert(id.clone(), index);
        self.place_ids.push(id);
        self.place_origins.push(PlaceOrigin::Distribution {
            transition: transition.clone(),
            distribution: distribution.clone(),
        });
        self.m0.push(0);
        self.pre.resize(index + 1, self.transition_ids.len());
        self.post.resize(index + 1, self.transition_ids.len());
        Ok(index)
    }

    fn insert_outcome_transition(
        &mut self,
        transition: &Symbol,
        distribution: &Symbol,
        target_place: &Symbol,
        probability: f64,
    ) -> Result<usize, PtpnError> {
        let id = Symbol::from(format!("{}_{}_{}", transition, distribution, target_place));
        if self.transition_index.contains_key(&id) {
            return Err(PtpnError::Validation(format!(
                "synthetic transition id '{}' collides with an existing transition",
                id
            )));
        }

        let index = self.transition_ids.len();
        self.transition_index.insert(id.clone(), index);
        self.transition_ids.push(id);
        self.transition_origins.push(TransitionOrigin::Outcome {
            transition: transition.clone(),
            distribution: distribution.clone(),
        });
        self.weights.push(probability);
        self.delays.push(0.0);
        self.pre.resize(self.place_ids.len(), index + 1);
        self.post.resize(self.place_ids.len(), index + 1);
        Ok(index)
    }

    pub fn num_places(&self) -> usize {
        self.place_ids.len()
    }

    pub fn num_transitions(&self) -> usize {
        self.transition_ids.len()
    }

    pub fn place_id(&self, index: usize) -> &Symbol {
        &self.place_ids[index]
    }

    pub fn transition_id(&self, index: usize) -> &Symbol {
        &self.transition_ids[index]
    }

    pub fn place_origin(&self, index: usize) -> &PlaceOrigin {
        &self.place_origins[index]
    }

    pub fn transition_origin(&self, index: usize) -> &TransitionOrigin {
        &self.transition_origins[index]
    }

    pub fn place_index(&self, id: &Symbol) -> Option<usize> {
        self.place_index.get(id).copied()
    }

    pub fn transition_index(&self, id: &Symbol) -> Option<usize> {
        self.transition_index.get(id).copied()
    }

    /// Net incidence matrix `C = F - B`.
    pub fn incidence(&self) -> DokMatrix {
        self.post.sub(&self.pre)
    }
}
