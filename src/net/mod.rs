//! Probabilistic Timed Petri Net (PTPN) data model.
//!
//! A [`PtpnNet`] is an immutable description of the input net: a place table, a
//! transition table, and an arc table. Arcs reference their endpoints by stable
//! string id and are dereferenced through the tables; the model embeds no
//! cross-pointers between places and transitions, which keeps the GSPN
//! expansion a pure matrix-building pass over the three tables.
//!
//! The net is constructed once (programmatically or by [`pnml`]) and validated
//! eagerly with [`PtpnNet::validate`] before any analysis. The only mutation an
//! analysis performs on the model is writing the computed bounds and critical
//! subnet back at report time.
//!
//! # Arc semantics
//!
//! - Input arcs (place → transition) carry only a multiplicity.
//! - Output arcs (transition → place) may additionally belong to a named
//!   *distribution* and then carry a probability. All arcs sharing a
//!   distribution id on the same transition form one probabilistic choice and
//!   their probabilities must sum to 1.
//! - Output arcs without a distribution id are ordinary always-taken post arcs.

pub mod dot;
pub mod pnml;
pub mod time_function;

pub use time_function::TimeFunction;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::PtpnError;

/// Interned identifier/name string.
pub type Symbol = string_cache::DefaultAtom;

/// Tolerance used when checking that distribution probabilities sum to 1.
pub const PROB_TOLERANCE: f64 = 1e-6;

/// Performance metric a bound refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    /// Steady-state throughput of a transition.
    Throughput,
    /// Cycle time of a transition (reciprocal of throughput on a critical circuit).
    CycleTime,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Throughput => write!(f, "Throughput"),
            Metric::CycleTime => write!(f, "CycleTime"),
        }
    }
}

/// Whether a bound value is an upper (`max`) or lower (`min`) bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatQualifier {
    Max,
    Min,
}

impl fmt::Display for StatQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatQualifier::Max => write!(f, "max"),
            StatQualifier::Min => write!(f, "min"),
        }
    }
}

/// A computed bound on a transition metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub qualifier: StatQualifier,
    pub value: f64,
}

/// Place of the PTPN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub id: Symbol,
    pub name: Symbol,
    pub initial_marking: u64,
}

impl Place {
    pub fn new(id: impl Into<Symbol>, name: impl Into<Symbol>, initial_marking: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            initial_marking,
        }
    }
}

/// Transition of the PTPN.
///
/// The `bounds` map stays empty until an analysis writes its results back; it
/// is the only part of the model an analysis run mutates.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub id: Symbol,
    pub name: Symbol,
    pub time_function: Option<TimeFunction>,
    bounds: BTreeMap<Metric, Bound>,
}

impl Transition {
    pub fn new(
        id: impl Into<Symbol>,
        name: impl Into<Symbol>,
        time_function: Option<TimeFunction>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            time_function,
            bounds: BTreeMap::new(),
        }
    }

    /// Mean firing delay; transitions without a time function are immediate.
    pub fn mean_delay(&self) -> f64 {
        self.time_function
            .as_ref()
            .map(TimeFunction::mean_delay)
            .unwrap_or(0.0)
    }

    /// Bounds computed for this transition, keyed by metric.
    pub fn bounds(&self) -> &BTreeMap<Metric, Bound> {
        &self.bounds
    }

    pub(crate) fn set_bound(&mut self, metric: Metric, bound: Bound) {
        self.bounds.insert(metric, bound);
    }
}

/// Arc of the PTPN, referencing its endpoints by id.
#[derive(Debug, Clone, PartialEq)]
pub struct NetArc {
    pub id: Symbol,
    pub multiplicity: u64,
    /// Distribution this arc belongs to; `None` for ordinary P/T arcs.
    pub distribution: Option<Symbol>,
    /// Outcome probability; present iff `distribution` is present.
    pub probability: Option<f64>,
    pub source: Symbol,
    pub target: Symbol,
}

impl NetArc {
    /// An ordinary P/T arc.
    pub fn new(
        id: impl Into<Symbol>,
        source: impl Into<Symbol>,
        target: impl Into<Symbol>,
        multiplicity: u64,
    ) -> Self {
        Self {
            id: id.into(),
            multiplicity,
            distribution: None,
            probability: None,
            source: source.into(),
            target: target.into(),
        }
    }

    /// An output arc belonging to a named distribution with the given
    /// outcome probability.
    pub fn with_distribution(
        id: impl Into<Symbol>,
        source: impl Into<Symbol>,
        target: impl Into<Symbol>,
        multiplicity: u64,
        distribution: impl Into<Symbol>,
        probability: f64,
    ) -> Self {
        Self {
            id: id.into(),
            multiplicity,
            distribution: Some(distribution.into()),
            probability: Some(probability),
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Direction of an arc relative to its transition endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcKind {
    /// place → transition
    Input,
    /// transition → place
    Output,
}

/// Places and transitions of the slowest circuit, by original id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CriticalSubnet {
    pub places: Vec<Symbol>,
    pub transitions: Vec<Symbol>,
}

/// The PTPN model: parallel tables of places and transitions plus an arc table.
#[derive(Debug, Clone, Default)]
pub struct PtpnNet {
    name: Symbol,
    net_id: Option<Symbol>,
    page_id: Option<Symbol>,
    places: Vec<Place>,
    transitions: Vec<Transition>,
    arcs: Vec<NetArc>,
    critical_subnet: Option<CriticalSubnet>,
}

impl PtpnNet {
    pub fn new(name: impl Into<Symbol>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &Symbol {
        &self.name
    }

    pub fn net_id(&self) -> Option<&Symbol> {
        self.net_id.as_ref()
    }

    pub fn page_id(&self) -> Option<&Symbol> {
        self.page_id.as_ref()
    }

    pub(crate) fn set_ids(&mut self, net_id: Option<Symbol>, page_id: Option<Symbol>) {
        self.net_id = net_id;
        self.page_id = page_id;
    }

    pub fn add_place(&mut self, place: Place) {
        self.places.push(place);
    }

    pub fn add_transition(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    pub fn add_arc(&mut self, arc: NetArc) {
        self.arcs.push(arc);
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn arcs(&self) -> &[NetArc] {
        &self.arcs
    }

    pub fn place(&self, id: &Symbol) -> Option<&Place> {
        self.places.iter().find(|p| &p.id == id)
    }

    pub fn transition(&self, id: &Symbol) -> Option<&Transition> {
        self.transitions.iter().find(|t| &t.id == id)
    }

    pub(crate) fn transition_mut(&mut self, id: &Symbol) -> Option<&mut Transition> {
        self.transitions.iter_mut().find(|t| &t.id == id)
    }

    /// Look up a transition by display name.
    pub fn transition_by_name(&self, name: &str) -> Option<&Transition> {
        self.transitions.iter().find(|t| &*t.name == name)
    }

    pub fn critical_subnet(&self) -> Option<&CriticalSubnet> {
        self.critical_subnet.as_ref()
    }

    pub(crate) fn set_critical_subnet(&mut self, subnet: CriticalSubnet) {
        self.critical_subnet = Some(subnet);
    }

    /// Classify an arc and return its place and transition endpoints.
    ///
    /// Fails with [`PtpnError::Validation`] when the arc does not connect
    /// exactly one place and one transition.
    pub fn arc_endpoints<'a>(
        &self,
        arc: &'a NetArc,
    ) -> Result<(ArcKind, &'a Symbol, &'a Symbol), PtpnError> {
        let source_is_place = self.place(&arc.source).is_some();
        let target_is_place = self.place(&arc.target).is_some();
        let source_is_trans = self.transition(&arc.source).is_some();
        let target_is_trans = self.transition(&arc.target).is_some();

        if source_is_place && target_is_trans {
            Ok((ArcKind::Input, &arc.source, &arc.target))
        } else if source_is_trans && target_is_place {
            Ok((ArcKind::Output, &arc.target, &arc.source))
        } else {
            Err(PtpnError::Validation(format!(
                "arc '{}' must connect one place and one transition (source '{}', target '{}')",
                arc.id, arc.source, arc.target
            )))
        }
    }

    /// Check all input invariants. Called once, before any analysis.
    pub fn validate(&self) -> Result<(), PtpnError> {
        let mut seen: HashSet<&Symbol> = HashSet::new();
        for place in &self.places {
            if !seen.insert(&place.id) {
                return Err(PtpnError::Validation(format!(
                    "duplicate node id '{}'",
                    place.id
                )));
            }
        }
        for transition in &self.transitions {
            if !seen.insert(&transition.id) {
                return Err(PtpnError::Validation(format!(
                    "duplicate node id '{}'",
                    transition.id
                )));
            }
            if let Some(tf) = &transition.time_function {
                tf.validate(&transition.id)?;
            }
        }

        // Probabilities of arcs sharing a distribution id on the same
        // transition must sum to 1.
        let mut dist_sums: HashMap<(&Symbol, &Symbol), f64> = HashMap::new();

        for arc in &self.arcs {
            if arc.multiplicity < 1 {
                return Err(PtpnError::Validation(format!(
                    "arc '{}' has multiplicity {}, expected >= 1",
                    arc.id, arc.multiplicity
                )));
            }

            let (kind, _place, transition) = self.arc_endpoints(arc)?;

            match kind {
                ArcKind::Input => {
                    if arc.distribution.is_some() || arc.probability.is_some() {
                        return Err(PtpnError::Validation(format!(
                            "input arc '{}' must not carry a distribution or probability",
                            arc.id
                        )));
                    }
                }
                ArcKind::Output => match (&arc.distribution, arc.probability) {
                    (Some(dist), Some(prob)) => {
                        if !(0.0..=1.0).contains(&prob) {
                            return Err(PtpnError::Validation(format!(
                                "arc '{}' has probability {} outside [0, 1]",
                                arc.id, prob
                            )));
                        }
                        *dist_sums.entry((transition, dist)).or_insert(0.0) += prob;
                    }
                    (Some(_), None) | (None, Some(_)) => {
                        return Err(PtpnError::Validation(format!(
                            "arc '{}' must carry a probability iff it carries a distribution id",
                            arc.id
                        )));
                    }
                    (None, None) => {}
                },
            }
        }

        for ((transition, dist), sum) in dist_sums {
            if (sum - 1.0).abs() > PROB_TOLERANCE {
                return Err(PtpnError::Validation(format!(
                    "probabilities of distribution '{}' on transition '{}' sum to {}, expected 1",
                    dist, transition, sum
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_stage_net() -> PtpnNet {
        let mut net = PtpnNet::new("pipeline");
        net.add_place(Place::new("p1", "p1", 1));
        net.add_place(Place::new("p2", "p2", 0));
        net.add_transition(Transition::new(
            "t1",
            "t1",
            Some(TimeFunction::Interval { min: 1.0, max: 3.0 }),
        ));
        net.add_transition(Transition::new(
            "t2",
            "t2",
            Some(TimeFunction::Constant { k: 2.0 }),
        ));
        net.add_arc(NetArc::new("a1", "p1", "t1", 1));
        net.add_arc(NetArc::new("a2", "t1", "p2", 1));
        net.add_arc(NetArc::new("a3", "p2", "t2", 1));
        net.add_arc(NetArc::new("a4", "t2", "p1", 1));
        net
    }

    #[test]
    fn test_valid_net_passes_validation() {
        let net = two_stage_net();
        net.validate().expect("net should validate");
    }

    #[test]
    fn test_arc_endpoint_classification() {
        let net = two_stage_net();
        let (kind, place, transition) = net.arc_endpoints(&net.arcs()[0]).unwrap();
        assert_eq!(kind, ArcKind::Input);
        assert_eq!(&**place, "p1");
        assert_eq!(&**transition, "t1");

        let (kind, place, transition) = net.arc_endpoints(&net.arcs()[1]).unwrap();
        assert_eq!(kind, ArcKind::Output);
        assert_eq!(&**place, "p2");
        assert_eq!(&**transition, "t1");
    }

    #[test]
    fn test_dangling_arc_rejected() {
        let mut net = two_stage_net();
        net.add_arc(NetArc::new("bad", "p1", "nowhere", 1));
        assert!(matches!(net.validate(), Err(PtpnError::Validation(_))));
    }

    #[test]
    fn test_place_to_place_arc_rejected() {
        let mut net = two_stage_net();
        net.add_arc(NetArc::new("bad", "p1", "p2", 1));
        assert!(matches!(net.validate(), Err(PtpnError::Validation(_))));
    }

    #[test]
    fn test_input_arc_with_distribution_rejected() {
        let mut net = two_stage_net();
        net.add_arc(NetArc::with_distribution("bad", "p1", "t1", 1, "D", 1.0));
        assert!(matches!(net.validate(), Err(PtpnError::Validation(_))));
    }

    #[test]
    fn test_zero_multiplicity_rejected() {
        let mut net = two_stage_net();
        net.add_arc(NetArc::new("bad", "p1", "t1", 0));
        assert!(matches!(net.validate(), Err(PtpnError::Validation(_))));
    }

    #[test]
    fn test_probabilities_must_sum_to_one() {
        let mut net = PtpnNet::new("choice");
        net.add_place(Place::new("p", "p", 1));
        net.add_place(Place::new("q", "q", 0));
        net.add_place(Place::new("r", "r", 0));
        net.add_transition(Transition::new(
            "t",
            "t",
            Some(TimeFunction::Exponential { lambda: 1.0 }),
        ));
        net.add_arc(NetArc::new("a0", "p", "t", 1));
        net.add_arc(NetArc::with_distribution("a1", "t", "q", 1, "D", 0.5));
        net.add_arc(NetArc::with_distribution("a2", "t", "r", 1, "D", 0.4));

        let err = net.validate().unwrap_err();
        match err {
            PtpnError::Validation(reason) => assert!(reason.contains("sum to")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut net = two_stage_net();
        net.add_place(Place::new("p1", "again", 0));
        assert!(matches!(net.validate(), Err(PtpnError::Validation(_))));
    }

    #[test]
    fn test_transition_lookup_by_name() {
        let mut net = PtpnNet::new("lookup");
        net.add_transition(Transition::new("t7", "produce", None));
        assert_eq!(&*net.transition_by_name("produce").unwrap().id, "t7");
        assert!(net.transition_by_name("consume").is_none());
    }

    #[test]
    fn test_immediate_transition_delay() {
        let t = Transition::new("t", "t", None);
        assert_eq!(t.mean_delay(), 0.0);
    }
}
