//! Graphviz DOT rendering of a (possibly annotated) PTPN.
//!
//! The net is mirrored into a `petgraph` graph whose node and edge labels
//! carry markings, time functions, computed bounds, and distribution
//! probabilities; places and transitions of the critical subnet are tagged.

use std::collections::HashMap;
use std::fmt::Write as _;

use petgraph::dot::Dot;
use petgraph::stable_graph::StableGraph;

use crate::net::{ArcKind, PtpnNet};

/// Render the net as a DOT digraph.
pub fn render(net: &PtpnNet) -> String {
    let mut graph: StableGraph<String, String> = StableGraph::new();
    let mut node_of = HashMap::new();

    let critical = net.critical_subnet();
    let critical_place = |id| critical.map(|s| s.places.contains(id)).unwrap_or(false);
    let critical_transition = |id| critical.map(|s| s.transitions.contains(id)).unwrap_or(false);

    for place in net.places() {
        let mut label = format!("{} (M0={})", place.name, place.initial_marking);
        if critical_place(&place.id) {
            label.push_str(" [critical]");
        }
        node_of.insert(place.id.clone(), graph.add_node(label));
    }

    for transition in net.transitions() {
        let mut label = transition.name.to_string();
        if let Some(tf) = &transition.time_function {
            let _ = write!(label, " {}", tf);
        }
        for (metric, bound) in transition.bounds() {
            let _ = write!(label, "; {} ({}) = {}", metric, bound.qualifier, bound.value);
        }
        if critical_transition(&transition.id) {
            label.push_str(" [critical]");
        }
        node_of.insert(transition.id.clone(), graph.add_node(label));
    }

    for arc in net.arcs() {
        let Ok((kind, place, transition)) = net.arc_endpoints(arc) else {
            continue;
        };
        let mut label = format!("{}", arc.multiplicity);
        if let (Some(distribution), Some(probability)) = (&arc.distribution, arc.probability) {
            let _ = write!(label, " {}: {}", distribution, probability);
        }
        let (from, to) = match kind {
            ArcKind::Input => (node_of[place], node_of[transition]),
            ArcKind::Output => (node_of[transition], node_of[place]),
        };
        graph.add_edge(from, to, label);
    }

    format!("{}", Dot::new(&graph))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{CriticalSubnet, NetArc, Place, Symbol, TimeFunction, Transition};

    fn loop_net() -> PtpnNet {
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
    fn test_render_contains_nodes_and_edges() {
        let dot = render(&loop_net());
        assert!(dot.contains("digraph"));
        assert!(dot.contains("p0 (M0=1)"));
        assert!(dot.contains("exponential(lambda=2)"));
    }

    #[test]
    fn test_render_marks_critical_entities() {
        let mut net = loop_net();
        net.set_critical_subnet(CriticalSubnet {
            places: vec![Symbol::from("p0")],
            transitions: vec![Symbol::from("t0")],
        });
        let dot = render(&net);
        assert!(dot.contains("p0 (M0=1) [critical]"));
    }
}
