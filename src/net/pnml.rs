//! PNML import and export for the PTPN dialect.
//!
//! The dialect is standard PT-net PNML plus two tool-specific extensions:
//!
//! - `<transition>` may carry `<time_function type="…">` with nested
//!   `<param name="…"><text>value</text></param>` children;
//! - `<arc>` from a transition to a place may carry
//!   `<distribution id="…"><probability><text>…</text></probability></distribution>`.
//!
//! Export writes the net back enriched with the computed results: a
//! `<bound metric="…" statQ="…"><text>…</text></bound>` element per computed
//! bound on a transition, and a net-level `<critical_subnet>` listing the
//! critical places and transitions by original id.
//!
//! Both `<text>` and legacy `<value>` elements are accepted as value carriers
//! on import; export always writes `<text>`.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::Result;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::PtpnError;
use crate::net::{NetArc, Place, PtpnNet, Symbol, TimeFunction, Transition};

/// Read and validate a PTPN from a PNML file; the net is named after the file
/// stem.
pub fn read_file(path: impl AsRef<Path>) -> Result<PtpnNet> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let contents = fs::read_to_string(path)?;
    Ok(parse_str(&name, &contents)?)
}

/// Parse and validate a PTPN from PNML text.
pub fn parse_str(name: &str, input: &str) -> Result<PtpnNet, PtpnError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut net = PtpnNet::new(name);
    let mut net_id: Option<Symbol> = None;
    let mut page_id: Option<Symbol> = None;

    let mut stack: Vec<String> = Vec::new();
    let mut place: Option<PlaceBuilder> = None;
    let mut transition: Option<TransitionBuilder> = None;
    let mut arc: Option<ArcBuilder> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| PtpnError::Parse(e.to_string()))?;
        match event {
            Event::Start(e) => {
                let element = local_name(&e);
                match element.as_str() {
                    "net" => net_id = attribute(&e, "id")?.map(Symbol::from),
                    "page" => page_id = attribute(&e, "id")?.map(Symbol::from),
                    "place" => {
                        place = Some(PlaceBuilder {
                            id: require_attribute(&e, "id")?,
                            name: None,
                            marking: 0,
                        });
                    }
                    "transition" => {
                        transition = Some(TransitionBuilder {
                            id: require_attribute(&e, "id")?,
                            name: None,
                            kind: None,
                            params: HashMap::new(),
                            param: None,
                        });
                    }
                    "arc" => {
                        arc = Some(ArcBuilder {
                            id: require_attribute(&e, "id")?,
                            source: require_attribute(&e, "source")?,
                            target: require_attribute(&e, "target")?,
                            multiplicity: 1,
                            distribution: None,
                            probability: None,
                        });
                    }
                    "time_function" => {
                        if let Some(t) = transition.as_mut() {
                            t.kind = attribute(&e, "type")?;
                        }
                    }
                    "param" => {
                        if let Some(t) = transition.as_mut() {
                            t.param = attribute(&e, "name")?;
                        }
                    }
                    "distribution" => {
                        if let Some(a) = arc.as_mut() {
                            a.distribution = attribute(&e, "id")?;
                        }
                    }
                    _ => {}
                }
                stack.push(element);
            }
            Event::Empty(e) => {
                // Self-closing nodes still declare entities with defaults
                match local_name(&e).as_str() {
                    "place" => {
                        let id = require_attribute(&e, "id")?;
                        net.add_place(Place::new(id.clone(), id, 0));
                    }
                    "transition" => {
                        let id = require_attribute(&e, "id")?;
                        net.add_transition(Transition::new(id.clone(), id, None));
                    }
                    "distribution" => {
                        if let Some(a) = arc.as_mut() {
                            a.distribution = attribute(&e, "id")?;
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                let value = t
                    .unescape()
                    .map_err(|e| PtpnError::Parse(e.to_string()))?
                    .into_owned();
                let Some(context) = text_context(&stack) else {
                    continue;
                };
                match context {
                    "name" => {
                        if let Some(a) = transition.as_mut() {
                            a.name = Some(value);
                        } else if let Some(p) = place.as_mut() {
                            p.name = Some(value);
                        }
                    }
                    "initialMarking" => {
                        if let Some(p) = place.as_mut() {
                            p.marking = parse_u64(&value, &p.id)?;
                        }
                    }
                    "param" => {
                        if let Some(t) = transition.as_mut() {
                            if let Some(param) = t.param.clone() {
                                t.params.insert(param, parse_f64(&value, &t.id)?);
                            }
                        }
                    }
                    "inscription" => {
                        if let Some(a) = arc.as_mut() {
                            a.multiplicity = parse_u64(&value, &a.id)?;
                        }
                    }
                    "probability" => {
                        if let Some(a) = arc.as_mut() {
                            a.probability = Some(parse_f64(&value, &a.id)?);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(_) => {
                let element = stack.pop().unwrap_or_default();
                match element.as_str() {
                    "place" => {
                        if let Some(p) = place.take() {
                            let name = p.name.unwrap_or_else(|| p.id.clone());
                            net.add_place(Place::new(p.id, name, p.marking));
                        }
                    }
                    "transition" => {
                        if let Some(t) = transition.take() {
                            let id = Symbol::from(t.id.as_str());
                            let time_function = match t.kind {
                                Some(kind) => {
                                    Some(TimeFunction::from_params(&id, &kind, &t.params)?)
                                }
                                None => None,
                            };
                            let name = t.name.unwrap_or_else(|| t.id.clone());
                            net.add_transition(Transition::new(id, name, time_function));
                        }
                    }
                    "arc" => {
                        if let Some(a) = arc.take() {
                            net.add_arc(NetArc {
                                id: Symbol::from(a.id),
                                multiplicity: a.multiplicity,
                                distribution: a.distribution.map(Symbol::from),
                                probability: a.probability,
                                source: Symbol::from(a.source),
                                target: Symbol::from(a.target),
                            });
                        }
                    }
                    "param" => {
                        if let Some(t) = transition.as_mut() {
                            t.param = None;
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    net.set_ids(net_id, page_id);
    net.validate()?;
    Ok(net)
}

/// Write the net, enriched with any computed bounds and critical subnet, to a
/// PNML file.
pub fn write_file(net: &PtpnNet, path: impl AsRef<Path>) -> Result<()> {
    fs::write(path, to_pnml(net))?;
    Ok(())
}

/// Render the net as enriched PNML text.
pub fn to_pnml(net: &PtpnNet) -> String {
    let mut out = String::new();
    let net_id = net.net_id().map(|s| s.to_string()).unwrap_or_else(|| net.name().to_string());
    let page_id = net.page_id().map(|s| s.to_string()).unwrap_or_else(|| "page0".to_string());

    out.push_str("<pnml xmlns=\"http://www.pnml.org/version-2009/grammar/pnml\">\n");
    let _ = writeln!(
        out,
        " <net id=\"{}\" type=\"http://www.pnml.org/version-2009/grammar/ptnet\">",
        escape(&net_id)
    );
    let _ = writeln!(out, "  <page id=\"{}\">", escape(&page_id));

    for place in net.places() {
        let _ = writeln!(out, "    <place id=\"{}\">", escape(&place.id));
        out.push_str("     <name>\n");
        let _ = writeln!(out, "      <text>{}</text>", escape(&place.name));
        out.push_str("     </name>\n");
        out.push_str("     <initialMarking>\n");
        let _ = writeln!(out, "      <text>{}</text>", place.initial_marking);
        out.push_str("     </initialMarking>\n");
        out.push_str("    </place>\n");
    }

    for transition in net.transitions() {
        let _ = writeln!(out, "    <transition id=\"{}\">", escape(&transition.id));
        out.push_str("     <name>\n");
        let _ = writeln!(out, "      <text>{}</text>", escape(&transition.name));
        out.push_str("     </name>\n");

        if transition.time_function.is_some() || !transition.bounds().is_empty() {
            out.push_str("     <toolspecific tool=\"ptpnbound\" version=\"0.1\">\n");
            if let Some(tf) = &transition.time_function {
                let _ = writeln!(out, "      <time_function type=\"{}\">", tf.kind());
                for (param, value) in tf.params() {
                    let _ = writeln!(out, "       <param name=\"{}\">", param);
                    let _ = writeln!(out, "        <text>{}</text>", value);
                    out.push_str("       </param>\n");
                }
                out.push_str("      </time_function>\n");
            }
            for (metric, bound) in transition.bounds() {
                let _ = writeln!(
                    out,
                    "      <bound metric=\"{}\" statQ=\"{}\">",
                    metric, bound.qualifier
                );
                let _ = writeln!(out, "       <text>{}</text>", bound.value);
                out.push_str("      </bound>\n");
            }
            out.push_str("     </toolspecific>\n");
        }
        out.push_str("    </transition>\n");
    }

    for arc in net.arcs() {
        let _ = writeln!(
            out,
            "    <arc id=\"{}\" source=\"{}\" target=\"{}\">",
            escape(&arc.id),
            escape(&arc.source),
            escape(&arc.target)
        );
        out.push_str("     <inscription>\n");
        let _ = writeln!(out, "      <text>{}</text>", arc.multiplicity);
        out.push_str("     </inscription>\n");
        if let (Some(distribution), Some(probability)) = (&arc.distribution, arc.probability) {
            out.push_str("     <toolspecific tool=\"ptpnbound\" version=\"0.1\">\n");
            let _ = writeln!(out, "      <distribution id=\"{}\">", escape(distribution));
            out.push_str("       <probability>\n");
            let _ = writeln!(out, "        <text>{}</text>", probability);
            out.push_str("       </probability>\n");
            out.push_str("      </distribution>\n");
            out.push_str("     </toolspecific>\n");
        }
        out.push_str("    </arc>\n");
    }

    out.push_str("  </page>\n");

    if let Some(subnet) = net.critical_subnet() {
        out.push_str("  <toolspecific tool=\"ptpnbound\" version=\"0.1\">\n");
        out.push_str("   <critical_subnet>\n");
        for place in &subnet.places {
            let _ = writeln!(out, "    <pl id=\"{}\"/>", escape(place));
        }
        for transition in &subnet.transitions {
            let _ = writeln!(out, "    <tr id=\"{}\"/>", escape(transition));
        }
        out.push_str("   </critical_subnet>\n");
        out.push_str("  </toolspecific>\n");
    }

    out.push_str(" </net>\n");
    out.push_str("</pnml>\n");
    out
}

struct PlaceBuilder {
    id: String,
    name: Option<String>,
    marking: u64,
}

struct TransitionBuilder {
    id: String,
    name: Option<String>,
    kind: Option<String>,
    params: HashMap<String, f64>,
    param: Option<String>,
}

struct ArcBuilder {
    id: String,
    source: String,
    target: String,
    multiplicity: u64,
    distribution: Option<String>,
    probability: Option<f64>,
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart, name: &str) -> Result<Option<String>, PtpnError> {
    e.try_get_attribute(name)
        .map_err(|err| PtpnError::Parse(err.to_string()))?
        .map(|attr| {
            attr.unescape_value()
                .map(|value| value.into_owned())
                .map_err(|err| PtpnError::Parse(err.to_string()))
        })
        .transpose()
}

fn require_attribute(e: &BytesStart, name: &str) -> Result<String, PtpnError> {
    attribute(e, name)?.ok_or_else(|| {
        PtpnError::Parse(format!(
            "element <{}> is missing attribute '{}'",
            local_name(e),
            name
        ))
    })
}

/// Element a text value belongs to, with `<text>`/`<value>` wrappers stripped.
fn text_context(stack: &[String]) -> Option<&str> {
    let top = stack.last()?;
    if top == "text" || top == "value" {
        stack.get(stack.len().checked_sub(2)?).map(String::as_str)
    } else {
        Some(top)
    }
}

fn parse_u64(value: &str, context: &str) -> Result<u64, PtpnError> {
    value.trim().parse().map_err(|_| {
        PtpnError::Parse(format!("'{}' is not a valid count in '{}'", value, context))
    })
}

fn parse_f64(value: &str, context: &str) -> Result<f64, PtpnError> {
    value.trim().parse().map_err(|_| {
        PtpnError::Parse(format!("'{}' is not a valid number in '{}'", value, context))
    })
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{ArcKind, Metric};
    use approx::assert_relative_eq;

    const CHOICE_PNML: &str = r#"<pnml xmlns="http://www.pnml.org/version-2009/grammar/pnml">
 <net id="n1" type="http://www.pnml.org/version-2009/grammar/ptnet">
  <page id="pg1">
    <place id="p">
     <name><text>buffer</text></name>
     <initialMarking><text>1</text></initialMarking>
    </place>
    <place id="q">
     <name><text>q</text></name>
    </place>
    <place id="r">
     <name><text>r</text></name>
    </place>
    <transition id="t">
     <name><text>serve</text></name>
     <toolspecific tool="ptpnbound" version="0.1">
      <time_function type="exponential">
       <param name="lambda"><text>1.0</text></param>
      </time_function>
     </toolspecific>
    </transition>
    <transition id="u">
     <name><text>u</text></name>
     <toolspecific tool="ptpnbound" version="0.1">
      <time_function type="constant">
       <param name="k"><text>4</text></param>
      </time_function>
     </toolspecific>
    </transition>
    <arc id="a0" source="p" target="t">
     <inscription><text>1</text></inscription>
    </arc>
    <arc id="a1" source="t" target="q">
     <inscription><text>1</text></inscription>
     <toolspecific tool="ptpnbound" version="0.1">
      <distribution id="D">
       <probability><text>0.5</text></probability>
      </distribution>
     </toolspecific>
    </arc>
    <arc id="a2" source="t" target="r">
     <inscription><text>2</text></inscription>
     <toolspecific tool="ptpnbound" version="0.1">
      <distribution id="D">
       <probability><text>0.5</text></probability>
      </distribution>
     </toolspecific>
    </arc>
    <arc id="a3" source="q" target="u">
     <inscription><text>1</text></inscription>
    </arc>
    <arc id="a4" source="r" target="u">
     <inscription><text>1</text></inscription>
    </arc>
    <arc id="a5" source="u" target="p">
     <inscription><text>1</text></inscription>
    </arc>
  </page>
 </net>
</pnml>"#;

    #[test]
    fn test_parse_places_transitions_arcs() {
        let net = parse_str("choice", CHOICE_PNML).unwrap();

        assert_eq!(net.places().len(), 3);
        assert_eq!(net.transitions().len(), 2);
        assert_eq!(net.arcs().len(), 6);
        assert_eq!(net.net_id().map(|s| s.to_string()), Some("n1".to_string()));

        let p = net.place(&Symbol::from("p")).unwrap();
        assert_eq!(&*p.name, "buffer");
        assert_eq!(p.initial_marking, 1);

        let q = net.place(&Symbol::from("q")).unwrap();
        assert_eq!(q.initial_marking, 0);

        let t = net.transition_by_name("serve").unwrap();
        assert_eq!(
            t.time_function,
            Some(TimeFunction::Exponential { lambda: 1.0 })
        );
        assert_relative_eq!(t.mean_delay(), 1.0);
    }

    #[test]
    fn test_parse_distribution_arcs() {
        let net = parse_str("choice", CHOICE_PNML).unwrap();

        let a1 = &net.arcs()[1];
        assert_eq!(a1.distribution, Some(Symbol::from("D")));
        assert_eq!(a1.probability, Some(0.5));
        assert_eq!(a1.multiplicity, 1);

        let a2 = &net.arcs()[2];
        assert_eq!(a2.multiplicity, 2);

        let (kind, place, transition) = net.arc_endpoints(a1).unwrap();
        assert_eq!(kind, ArcKind::Output);
        assert_eq!(&**place, "q");
        assert_eq!(&**transition, "t");
    }

    #[test]
    fn test_malformed_xml_is_a_parse_error() {
        let err = parse_str("broken", "<pnml><net></pnml>").unwrap_err();
        assert!(matches!(err, PtpnError::Parse(_)));
    }

    #[test]
    fn test_bad_probability_fails_validation() {
        let bad = CHOICE_PNML.replace(
            "<probability><text>0.5</text></probability>",
            "<probability><text>0.4</text></probability>",
        );
        let err = parse_str("choice", &bad).unwrap_err();
        assert!(matches!(err, PtpnError::Validation(_)));
    }

    #[test]
    fn test_unknown_time_function_is_rejected() {
        let bad = CHOICE_PNML.replace("type=\"exponential\"", "type=\"weibull\"");
        let err = parse_str("choice", &bad).unwrap_err();
        assert!(matches!(err, PtpnError::InvalidParameters { .. }));
    }

    #[test]
    fn test_legacy_value_elements_are_accepted() {
        let legacy = CHOICE_PNML
            .replace("<text>", "<value>")
            .replace("</text>", "</value>");
        let net = parse_str("choice", &legacy).unwrap();
        assert_eq!(net.place(&Symbol::from("p")).unwrap().initial_marking, 1);
    }

    #[test]
    fn test_export_round_trip() {
        let net = parse_str("choice", CHOICE_PNML).unwrap();
        let rendered = to_pnml(&net);
        let reparsed = parse_str("choice", &rendered).unwrap();

        assert_eq!(net.places(), reparsed.places());
        assert_eq!(net.arcs(), reparsed.arcs());
        assert_eq!(net.transitions().len(), reparsed.transitions().len());
        for (a, b) in net.transitions().iter().zip(reparsed.transitions()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.time_function, b.time_function);
        }
    }

    #[test]
    fn test_export_carries_bounds_and_critical_subnet() {
        use crate::net::{Bound, CriticalSubnet, StatQualifier};

        let mut net = parse_str("choice", CHOICE_PNML).unwrap();
        net.transition_mut(&Symbol::from("t")).unwrap().set_bound(
            Metric::Throughput,
            Bound {
                qualifier: StatQualifier::Max,
                value: 0.25,
            },
        );
        net.set_critical_subnet(CriticalSubnet {
            places: vec![Symbol::from("p")],
            transitions: vec![Symbol::from("t")],
        });

        let rendered = to_pnml(&net);
        assert!(rendered.contains("<bound metric=\"Throughput\" statQ=\"max\">"));
        assert!(rendered.contains("<text>0.25</text>"));
        assert!(rendered.contains("<critical_subnet>"));
        assert!(rendered.contains("<pl id=\"p\"/>"));
        assert!(rendered.contains("<tr id=\"t\"/>"));

        // The enriched file still parses
        let reparsed = parse_str("choice", &rendered).unwrap();
        assert_eq!(reparsed.places().len(), 3);
    }
}
