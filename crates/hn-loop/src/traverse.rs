//! Ordered traversals and position queries.
//!
//! There is no change-notification mechanism: the GUI and translator
//! re-query these after each edit, so ordering is deterministic document
//! order (backbone, then branches in splitter port order).

use hn_core::{Handle, Kind};

use hn_graph::Graph;

use crate::builder::LoopSide;
use crate::families::{self, PlacementRole, ports};

/// Everything on a loop side, in flow order: inlet node, backbone,
/// splitter, each branch in port order, mixer, backbone, outlet node.
///
/// Returns an empty list when `loop_h` is not a live Loop. Panics if the
/// side's wiring is corrupted (a broken chain here means an earlier edit
/// violated an invariant and went unreported).
pub fn side_components(graph: &Graph, loop_h: Handle, side: LoopSide) -> Vec<Handle> {
    if graph.kind_of(loop_h) != Some(Kind::Loop) {
        return Vec::new();
    }
    let (Some(inlet), Some(outlet), Some(splitter), Some(mixer)) = (
        graph.reference(loop_h, side.inlet_node_field()),
        graph.reference(loop_h, side.outlet_node_field()),
        graph.reference(loop_h, side.splitter_field()),
        graph.reference(loop_h, side.mixer_field()),
    ) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut guard = graph.len() * 2 + 16;
    let mut cursor = inlet;
    let mut entered = ports::NODE_INLET;
    loop {
        guard -= 1;
        assert!(guard > 0, "loop side traversal did not terminate");
        out.push(cursor);
        if cursor == outlet {
            break;
        }
        if cursor == splitter {
            for port in ports::FIRST_BRANCH..graph.port_count(splitter) {
                if let Some(first) = graph.occupant(splitter, port) {
                    let (branch, _) = walk_branch(graph, first.entity, first.port, mixer);
                    out.extend(branch);
                }
            }
            out.push(mixer);
            let next = graph
                .occupant(mixer, ports::COMMON)
                .expect("mixer common port is wired");
            cursor = next.entity;
            entered = next.port;
            continue;
        }
        let kind = graph.kind_of(cursor).expect("traversal entity is live");
        let exit = families::exit_port(kind, entered);
        let next = graph
            .occupant(cursor, exit)
            .expect("loop side chain is unbroken");
        cursor = next.entity;
        entered = next.port;
    }
    out
}

/// Walk one branch from its first entity until `mixer`, returning the
/// entities (mixer excluded) and the mixer port the branch lands on.
fn walk_branch(
    graph: &Graph,
    first: Handle,
    first_port: usize,
    mixer: Handle,
) -> (Vec<Handle>, usize) {
    let mut out = Vec::new();
    let mut guard = graph.len() + 16;
    let mut cursor = first;
    let mut entered = first_port;
    while cursor != mixer {
        guard -= 1;
        assert!(guard > 0, "branch walk did not terminate");
        out.push(cursor);
        let kind = graph.kind_of(cursor).expect("branch entity is live");
        let exit = families::exit_port(kind, entered);
        let next = graph
            .occupant(cursor, exit)
            .expect("branch chain is unbroken");
        cursor = next.entity;
        entered = next.port;
    }
    (out, entered)
}

/// Supply-side listing (see [`side_components`]).
pub fn supply_components(graph: &Graph, loop_h: Handle) -> Vec<Handle> {
    side_components(graph, loop_h, LoopSide::Supply)
}

/// Demand-side listing (see [`side_components`]).
pub fn demand_components(graph: &Graph, loop_h: Handle) -> Vec<Handle> {
    side_components(graph, loop_h, LoopSide::Demand)
}

/// The loop and side a node sits on.
pub fn find_node_context(graph: &Graph, node: Handle) -> Option<(Handle, LoopSide)> {
    if graph.kind_of(node) != Some(Kind::Node) {
        return None;
    }
    for loop_h in graph.objects_of_kind(Kind::Loop) {
        for side in LoopSide::BOTH {
            if side_components(graph, loop_h, side).contains(&node) {
                return Some((loop_h, side));
            }
        }
    }
    None
}

/// The loop and side a component connection is placed on, through the ports
/// of `role`.
pub fn placement(
    graph: &Graph,
    component: Handle,
    role: PlacementRole,
) -> Option<(Handle, LoopSide)> {
    let inlet_end = graph.occupant(component, role.inlet())?;
    find_node_context(graph, inlet_end.entity)
}

/// If `node` is the anchor of a Direct side (the single connector between a
/// splitter and its mixer), the loop and side it anchors.
pub fn anchor_context(graph: &Graph, node: Handle) -> Option<(Handle, LoopSide)> {
    let up = graph.occupant(node, ports::NODE_INLET)?;
    let down = graph.occupant(node, ports::NODE_OUTLET)?;
    if graph.kind_of(up.entity) != Some(Kind::Splitter)
        || graph.kind_of(down.entity) != Some(Kind::Mixer)
    {
        return None;
    }
    if occupied_branch_ports(graph, up.entity) != 1 {
        return None;
    }
    // which loop owns this splitter/mixer pair
    for source in graph.back_references(up.entity) {
        if graph.kind_of(source) != Some(Kind::Loop) {
            continue;
        }
        for side in LoopSide::BOTH {
            if graph.reference(source, side.splitter_field()) == Some(up.entity)
                && graph.reference(source, side.mixer_field()) == Some(down.entity)
            {
                return Some((source, side));
            }
        }
    }
    None
}

/// Number of occupied branch ports on a splitter or mixer.
pub fn occupied_branch_ports(graph: &Graph, connector: Handle) -> usize {
    (ports::FIRST_BRANCH..graph.port_count(connector))
        .filter(|p| graph.occupant(connector, *p).is_some())
        .count()
}

/// Whether `node` is one of the four fixed boundary nodes of some loop.
pub fn is_boundary_node(graph: &Graph, node: Handle) -> bool {
    for source in graph.back_references(node) {
        if graph.kind_of(source) != Some(Kind::Loop) {
            continue;
        }
        for side in LoopSide::BOTH {
            if graph.reference(source, side.inlet_node_field()) == Some(node)
                || graph.reference(source, side.outlet_node_field()) == Some(node)
            {
                return true;
            }
        }
    }
    false
}

/// Locate the branch containing `component`: the owning loop, side,
/// splitter/mixer ports, and the branch's entities in flow order.
///
/// Resolved through the component's own placement, primary connection
/// preferred, so a dual-connection device names its primary branch.
pub(crate) fn locate_branch(
    graph: &Graph,
    component: Handle,
) -> Option<(Handle, LoopSide, usize, usize, Vec<Handle>)> {
    let (loop_h, side) = placement(graph, component, PlacementRole::Primary)
        .or_else(|| placement(graph, component, PlacementRole::Secondary))?;
    let splitter = graph.reference(loop_h, side.splitter_field())?;
    let mixer = graph.reference(loop_h, side.mixer_field())?;
    for port in ports::FIRST_BRANCH..graph.port_count(splitter) {
        if let Some(first) = graph.occupant(splitter, port) {
            let (entities, mixer_port) = walk_branch(graph, first.entity, first.port, mixer);
            if entities.contains(&component) {
                return Some((loop_h, side, port, mixer_port, entities));
            }
        }
    }
    None
}

/// All entities on a branch shared with `component`, or an empty list when
/// it is not on a branch.
pub fn components_on_branch(graph: &Graph, component: Handle) -> Vec<Handle> {
    locate_branch(graph, component)
        .map(|(_, _, _, _, entities)| entities)
        .unwrap_or_default()
}
