//! Loop invariant validation.
//!
//! Structural conflicts are reported as boolean failures at the operation
//! that caused them; the checks here exist for the other class of problem,
//! states that should be impossible and indicate an earlier unreported bug.
//! Callers run them at trust boundaries (after a batch import, in tests,
//! from the inspection CLI).

use hn_core::{Handle, HnError, HnResult, Kind};
use hn_graph::Graph;

use crate::builder::LoopSide;
use crate::families::ports;
use crate::traverse;

/// Check one loop's structural invariants.
///
/// - the four boundary nodes are present, live, and attached
/// - both sides are traversable inlet → outlet
/// - splitter and mixer carry the same number of branch ports, densely
/// - the availability-manager list and sizing record exist and are owned
pub fn validate_loop(graph: &Graph, loop_h: Handle) -> HnResult<()> {
    if graph.kind_of(loop_h) != Some(Kind::Loop) {
        return Err(HnError::UnknownHandle {
            handle: loop_h.raw(),
        });
    }

    for side in LoopSide::BOTH {
        let label = side.label();
        let (Some(inlet), Some(outlet), Some(splitter), Some(mixer)) = (
            graph.reference(loop_h, side.inlet_node_field()),
            graph.reference(loop_h, side.outlet_node_field()),
            graph.reference(loop_h, side.splitter_field()),
            graph.reference(loop_h, side.mixer_field()),
        ) else {
            return Err(HnError::invariant(format!(
                "{label} side is missing a boundary node or connector reference"
            )));
        };

        for (what, node) in [("inlet", inlet), ("outlet", outlet)] {
            if graph.kind_of(node) != Some(Kind::Node) {
                return Err(HnError::invariant(format!(
                    "{label} {what} boundary is not a node"
                )));
            }
            let attached = graph.occupant(node, ports::NODE_INLET).is_some()
                && graph.occupant(node, ports::NODE_OUTLET).is_some();
            if !attached {
                return Err(HnError::invariant(format!(
                    "{label} {what} boundary node {node} is detached"
                )));
            }
        }

        let listing = traverse::side_components(graph, loop_h, side);
        if listing.first() != Some(&inlet) || listing.last() != Some(&outlet) {
            return Err(HnError::invariant(format!(
                "{label} side does not run inlet to outlet"
            )));
        }
        if !listing.contains(&splitter) || !listing.contains(&mixer) {
            return Err(HnError::invariant(format!(
                "{label} side does not pass through its splitter and mixer"
            )));
        }

        for connector in [splitter, mixer] {
            for port in ports::FIRST_BRANCH..graph.port_count(connector) {
                if graph.occupant(connector, port).is_none() {
                    return Err(HnError::invariant(format!(
                        "{label} connector {connector} has a hole at branch port {port}"
                    )));
                }
            }
        }
        let branches = traverse::occupied_branch_ports(graph, splitter);
        if branches != traverse::occupied_branch_ports(graph, mixer) {
            return Err(HnError::invariant(format!(
                "{label} splitter and mixer disagree on branch count"
            )));
        }
        if branches == 0 {
            return Err(HnError::invariant(format!(
                "{label} side has no connection between splitter and mixer"
            )));
        }
    }

    if crate::controller::availability_manager_list(graph, loop_h).is_none() {
        return Err(HnError::invariant(
            "loop has no availability-manager list".to_owned(),
        ));
    }
    if crate::controller::sizing_record(graph, loop_h).is_none() {
        return Err(HnError::invariant("loop has no sizing record".to_owned()));
    }
    Ok(())
}

/// Validate every loop in the graph.
pub fn validate_all(graph: &Graph) -> HnResult<()> {
    for loop_h in graph.objects_of_kind(Kind::Loop) {
        validate_loop(graph, loop_h)?;
    }
    Ok(())
}
