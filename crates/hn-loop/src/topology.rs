//! Branch & splitter/mixer topology operations.
//!
//! Placement calls are validate-then-act: a call that returns false has not
//! touched the graph. Re-invoking a placement call on a component that is
//! already placed elsewhere migrates it (atomic disconnect-then-reconnect);
//! the move is logged so outer layers can surface it.

use hn_core::{Handle, Kind};
use hn_graph::Graph;

use crate::builder::{LoopSide, loop_fluid};
use crate::families::{self, PlacementRole, ports};
use crate::traverse::{
    anchor_context, find_node_context, is_boundary_node, locate_branch, occupied_branch_ports,
    placement,
};
use crate::wiring::{self, connect};

/// Add `component` as a new parallel branch on `side`, through its primary
/// connection: `splitter → node → component → node → mixer`.
///
/// Rejected when the component is already placed on either side of this
/// loop. A component placed on a different loop migrates here.
pub fn add_branch_for_component(
    graph: &mut Graph,
    loop_h: Handle,
    side: LoopSide,
    component: Handle,
) -> bool {
    add_branch_role(graph, loop_h, side, component, PlacementRole::Primary)
}

fn add_branch_role(
    graph: &mut Graph,
    loop_h: Handle,
    side: LoopSide,
    component: Handle,
    role: PlacementRole,
) -> bool {
    if graph.kind_of(loop_h) != Some(Kind::Loop) {
        return false;
    }
    let Some(kind) = graph.kind_of(component) else {
        return false;
    };
    if !families::has_role(kind, role) {
        return false;
    }
    // already placed on either side of this loop, through any role: rejected
    for other in [PlacementRole::Primary, PlacementRole::Secondary] {
        if families::has_role(kind, other)
            && placement(graph, component, other).is_some_and(|(l, _)| l == loop_h)
        {
            return false;
        }
    }
    let (Some(splitter), Some(mixer)) = (
        graph.reference(loop_h, side.splitter_field()),
        graph.reference(loop_h, side.mixer_field()),
    ) else {
        return false;
    };
    if !detach_for_migration(graph, component, role) {
        return false;
    }

    // leaving Direct: the anchor node makes way for real branches
    if let Some(anchor) = direct_anchor(graph, loop_h, side) {
        graph.remove_object(anchor);
    }

    let inlet_port = graph.first_free_port_from(splitter, ports::FIRST_BRANCH);
    let outlet_port = graph.first_free_port_from(mixer, ports::FIRST_BRANCH);
    let fluid = loop_fluid(graph, loop_h);
    let component_name = graph.name_of(component).map(str::to_owned);

    let node_a = wiring::make_node(graph, fluid);
    let node_b = wiring::make_node(graph, fluid);
    if let Some(name) = component_name {
        graph.set_name(node_a, format!("{name} Inlet Node"));
        graph.set_name(node_b, format!("{name} Outlet Node"));
    }

    connect(graph, splitter, inlet_port, node_a, ports::NODE_INLET);
    connect(graph, node_a, ports::NODE_OUTLET, component, role.inlet());
    connect(graph, component, role.outlet(), node_b, ports::NODE_INLET);
    connect(graph, node_b, ports::NODE_OUTLET, mixer, outlet_port);
    true
}

/// Place `component` at `node`, through its primary connection.
///
/// One call, two behaviors decided solely by the targeted node: the anchor
/// of a Direct side opens a new parallel branch; any other loop node takes
/// an in-line splice. Nodes on no loop are rejected.
pub fn add_to_node(graph: &mut Graph, component: Handle, node: Handle) -> bool {
    add_to_node_role(graph, component, node, PlacementRole::Primary)
}

/// Place a dual-connection component's secondary connection at `node`.
///
/// Rejected for kinds without the secondary role.
pub fn add_to_tertiary_node(graph: &mut Graph, component: Handle, node: Handle) -> bool {
    add_to_node_role(graph, component, node, PlacementRole::Secondary)
}

fn add_to_node_role(
    graph: &mut Graph,
    component: Handle,
    node: Handle,
    role: PlacementRole,
) -> bool {
    let Some(kind) = graph.kind_of(component) else {
        return false;
    };
    if !families::has_role(kind, role) {
        return false;
    }
    if graph.kind_of(node) != Some(Kind::Node) {
        return false;
    }
    if let Some((loop_h, side)) = anchor_context(graph, node) {
        return add_branch_role(graph, loop_h, side, component, role);
    }
    if find_node_context(graph, node).is_none() {
        return false;
    }
    // splicing next to itself would delete the target mid-operation
    for port in [role.inlet(), role.outlet()] {
        if graph.occupant(component, port).is_some_and(|end| end.entity == node) {
            return false;
        }
    }
    if !detach_for_migration(graph, component, role) {
        return false;
    }
    wiring::insert_component_role(graph, node, component, role)
}

/// If `role` is currently placed, detach it so the component can land
/// somewhere else. False when the ports are occupied but no owning loop can
/// be resolved (a corrupted placement is not silently overwritten).
fn detach_for_migration(graph: &mut Graph, component: Handle, role: PlacementRole) -> bool {
    if graph.occupant(component, role.inlet()).is_none()
        && graph.occupant(component, role.outlet()).is_none()
    {
        return true;
    }
    let Some((from_loop, from_side)) = placement(graph, component, role) else {
        return false;
    };
    tracing::warn!(
        component = %component,
        from_loop = %from_loop,
        side = ?from_side,
        ?role,
        "component migrating to a new placement"
    );
    detach_role(graph, component, role)
}

/// Remove one interior component from its branch or backbone position,
/// reconnecting its neighbors through a single surviving node. The branch
/// stays open; the component stays in the graph, detached.
pub fn remove_component(graph: &mut Graph, component: Handle) -> bool {
    detach_role(graph, component, PlacementRole::Primary)
}

/// Detach a dual-connection component's secondary connection, healing that
/// loop the same way.
pub fn remove_secondary_placement(graph: &mut Graph, component: Handle) -> bool {
    detach_role(graph, component, PlacementRole::Secondary)
}

fn detach_role(graph: &mut Graph, component: Handle, role: PlacementRole) -> bool {
    let (Some(inlet_end), Some(outlet_end)) = (
        graph.occupant(component, role.inlet()),
        graph.occupant(component, role.outlet()),
    ) else {
        return false;
    };
    let node_in = inlet_end.entity;
    let node_out = outlet_end.entity;

    graph.detach_port(component, role.inlet());
    graph.detach_port(component, role.outlet());

    if !is_boundary_node(graph, node_in) {
        // the upstream node goes; its upstream source feeds the surviving
        // downstream node
        let up = graph
            .occupant(node_in, ports::NODE_INLET)
            .expect("placed component has an upstream source");
        graph.detach_port(node_in, ports::NODE_INLET);
        graph.remove_object(node_in);
        connect(graph, up.entity, up.port, node_out, ports::NODE_INLET);
    } else if !is_boundary_node(graph, node_out) {
        let down = graph
            .occupant(node_out, ports::NODE_OUTLET)
            .expect("placed component has a downstream sink");
        graph.detach_port(node_out, ports::NODE_OUTLET);
        graph.remove_object(node_out);
        connect(graph, node_in, ports::NODE_OUTLET, down.entity, down.port);
    } else {
        unreachable!("component wedged directly between two boundary nodes");
    }
    true
}

/// Detach every connection `entity` has onto `loop_h`.
pub(crate) fn detach_from_loop(graph: &mut Graph, entity: Handle, loop_h: Handle) {
    let Some(kind) = graph.kind_of(entity) else {
        return;
    };
    for role in [PlacementRole::Primary, PlacementRole::Secondary] {
        if families::has_role(kind, role)
            && placement(graph, entity, role).is_some_and(|(l, _)| l == loop_h)
        {
            detach_role(graph, entity, role);
        }
    }
}

/// Detach every connection `entity` has onto loops other than `loop_h`.
pub(crate) fn detach_from_other_loops(graph: &mut Graph, entity: Handle, loop_h: Handle) {
    let Some(kind) = graph.kind_of(entity) else {
        return;
    };
    for role in [PlacementRole::Primary, PlacementRole::Secondary] {
        if families::has_role(kind, role)
            && placement(graph, entity, role).is_some_and(|(l, _)| l != loop_h)
        {
            detach_role(graph, entity, role);
        }
    }
}

/// Delete the whole branch holding `component`: its nodes and components,
/// never touching other branches. Dual-connection components on the branch
/// first have their other-loop connection detached so that loop heals.
/// Removing the last branch restores the side to Direct with a fresh anchor
/// node.
pub fn remove_branch_with_component(graph: &mut Graph, component: Handle) -> bool {
    let Some((loop_h, side, _, _, entities)) = locate_branch(graph, component) else {
        return false;
    };
    let (Some(splitter), Some(mixer)) = (
        graph.reference(loop_h, side.splitter_field()),
        graph.reference(loop_h, side.mixer_field()),
    ) else {
        return false;
    };

    // heal foreign connections of dual components riding this branch
    for entity in &entities {
        let Some(kind) = graph.kind_of(*entity) else {
            continue;
        };
        if !kind.is_component() {
            continue;
        }
        for role in [PlacementRole::Primary, PlacementRole::Secondary] {
            if !families::has_role(kind, role) {
                continue;
            }
            let on_this_branch = graph
                .occupant(*entity, role.inlet())
                .is_some_and(|end| entities.contains(&end.entity));
            if !on_this_branch && graph.occupant(*entity, role.inlet()).is_some() {
                detach_role(graph, *entity, role);
            }
        }
    }

    for entity in entities {
        if graph.contains(entity) {
            graph.remove_object(entity);
        }
    }

    graph.compact_ports_from(splitter, ports::FIRST_BRANCH);
    graph.compact_ports_from(mixer, ports::FIRST_BRANCH);

    if occupied_branch_ports(graph, splitter) == 0 {
        let fluid = loop_fluid(graph, loop_h);
        let anchor = wiring::make_node(graph, fluid);
        if let Some(name) = graph.name_of(loop_h).map(str::to_owned) {
            graph.set_name(anchor, format!("{name} {} Connector Node", side.label()));
        }
        connect(graph, splitter, ports::FIRST_BRANCH, anchor, ports::NODE_INLET);
        connect(graph, anchor, ports::NODE_OUTLET, mixer, ports::FIRST_BRANCH);
    }
    true
}

/// Remove `component` from its loop placements and from the graph.
///
/// Convenience for callers deleting equipment outright rather than
/// repositioning it. Returns the removed handles (empty for dangling ones).
pub fn remove_component_entirely(graph: &mut Graph, component: Handle) -> Vec<Handle> {
    if !graph.contains(component) {
        return Vec::new();
    }
    detach_role(graph, component, PlacementRole::Primary);
    detach_role(graph, component, PlacementRole::Secondary);
    graph.remove_object(component)
}

fn direct_anchor(graph: &Graph, loop_h: Handle, side: LoopSide) -> Option<Handle> {
    let splitter = graph.reference(loop_h, side.splitter_field())?;
    let mixer = graph.reference(loop_h, side.mixer_field())?;
    if occupied_branch_ports(graph, splitter) != 1 {
        return None;
    }
    let first = graph.occupant(splitter, ports::FIRST_BRANCH)?;
    let node = first.entity;
    if graph.kind_of(node) != Some(Kind::Node) {
        return None;
    }
    let down = graph.occupant(node, ports::NODE_OUTLET)?;
    (down.entity == mixer).then_some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::create_loop;
    use crate::traverse::{components_on_branch, supply_components};
    use hn_core::FluidType;

    fn loop_with_chiller(g: &mut Graph) -> (Handle, Handle) {
        let lp = create_loop(g, "CHW", FluidType::Water);
        let chiller = g.add_object_named(Kind::Chiller, "Chiller 1");
        assert!(add_branch_for_component(g, lp, LoopSide::Supply, chiller));
        (lp, chiller)
    }

    #[test]
    fn branch_add_remove_round_trip() {
        let mut g = Graph::new();
        let lp = create_loop(&mut g, "CHW", FluidType::Water);
        let before = supply_components(&g, lp);
        let node_count = before
            .iter()
            .filter(|h| g.kind_of(**h) == Some(Kind::Node))
            .count();
        let boundary = (before[0], *before.last().unwrap());

        let chiller = g.add_object_named(Kind::Chiller, "Chiller 1");
        assert!(add_branch_for_component(&mut g, lp, LoopSide::Supply, chiller));
        // anchor replaced by two fresh branch nodes
        let during = supply_components(&g, lp);
        assert!(during.contains(&chiller));
        assert_eq!(
            during
                .iter()
                .filter(|h| g.kind_of(**h) == Some(Kind::Node))
                .count(),
            node_count + 1
        );

        assert!(remove_branch_with_component(&mut g, chiller));
        let after = supply_components(&g, lp);
        assert_eq!(
            after
                .iter()
                .filter(|h| g.kind_of(**h) == Some(Kind::Node))
                .count(),
            node_count
        );
        // boundary handles never changed
        assert_eq!((after[0], *after.last().unwrap()), boundary);
        // the chiller itself was deleted with its branch
        assert!(!g.contains(chiller));
    }

    #[test]
    fn add_branch_rejects_component_already_on_loop() {
        let mut g = Graph::new();
        let (lp, chiller) = loop_with_chiller(&mut g);
        assert!(!add_branch_for_component(
            &mut g,
            lp,
            LoopSide::Supply,
            chiller
        ));
        assert!(!add_branch_for_component(
            &mut g,
            lp,
            LoopSide::Demand,
            chiller
        ));
    }

    #[test]
    fn add_to_anchor_node_opens_branch() {
        let mut g = Graph::new();
        let lp = create_loop(&mut g, "CHW", FluidType::Water);
        let anchor = supply_components(&g, lp)[2];
        let pump = g.add_object_named(Kind::Pump, "P1");

        assert!(add_to_node(&mut g, pump, anchor));
        // the anchor is gone; the pump sits on a branch of its own
        assert!(!g.contains(anchor));
        assert_eq!(components_on_branch(&g, pump).len(), 3);
    }

    #[test]
    fn add_to_interior_node_splices() {
        let mut g = Graph::new();
        let (lp, chiller) = loop_with_chiller(&mut g);
        let chiller_inlet = g.occupant(chiller, ports::INLET).unwrap().entity;

        let pump = g.add_object_named(Kind::Pump, "P1");
        assert!(add_to_node(&mut g, pump, chiller_inlet));

        // same branch, now five entities: node pump node chiller node
        let branch = components_on_branch(&g, chiller);
        assert_eq!(branch.len(), 5);
        assert!(branch.contains(&pump));
        // pump feeds the node the chiller drinks from
        assert_eq!(
            g.occupant(pump, ports::OUTLET).unwrap().entity,
            chiller_inlet
        );
    }

    #[test]
    fn add_to_stray_node_rejected() {
        let mut g = Graph::new();
        let _ = create_loop(&mut g, "CHW", FluidType::Water);
        let stray = wiring::make_node(&mut g, FluidType::Water);
        let pump = g.add_object(Kind::Pump);
        assert!(!add_to_node(&mut g, pump, stray));
        assert_eq!(g.occupant(pump, ports::INLET), None);
    }

    #[test]
    fn repeated_add_to_node_migrates_between_loops() {
        let mut g = Graph::new();
        let (lp_a, chiller) = loop_with_chiller(&mut g);
        let lp_b = create_loop(&mut g, "CW", FluidType::Water);
        let anchor_b = supply_components(&g, lp_b)[2];

        // second placement call: the chiller leaves loop A for loop B
        assert!(add_to_node(&mut g, chiller, anchor_b));
        assert_eq!(
            placement(&g, chiller, PlacementRole::Primary),
            Some((lp_b, LoopSide::Supply))
        );
        assert!(!supply_components(&g, lp_a).contains(&chiller));
        // loop A healed: its branch shrank to a lone node
        assert_eq!(supply_components(&g, lp_a).len(), 5);
    }

    #[test]
    fn tertiary_placement_on_second_loop() {
        let mut g = Graph::new();
        let lp_a = create_loop(&mut g, "CHW", FluidType::Water);
        let lp_b = create_loop(&mut g, "CW", FluidType::Water);
        let hx = g.add_object_named(Kind::HeatExchanger, "HX");

        assert!(add_branch_for_component(&mut g, lp_a, LoopSide::Demand, hx));
        let anchor_b = supply_components(&g, lp_b)[2];
        assert!(add_to_tertiary_node(&mut g, hx, anchor_b));

        assert_eq!(
            placement(&g, hx, PlacementRole::Primary),
            Some((lp_a, LoopSide::Demand))
        );
        assert_eq!(
            placement(&g, hx, PlacementRole::Secondary),
            Some((lp_b, LoopSide::Supply))
        );
        // the secondary role does not exist on straight components
        let pump = g.add_object(Kind::Pump);
        let anchor_a = supply_components(&g, lp_a)[2];
        assert!(!add_to_tertiary_node(&mut g, pump, anchor_a));
    }

    #[test]
    fn remove_component_keeps_branch_open() {
        let mut g = Graph::new();
        let (lp, chiller) = loop_with_chiller(&mut g);
        let branch_before = components_on_branch(&g, chiller);
        assert_eq!(branch_before.len(), 3);

        assert!(remove_component(&mut g, chiller));
        // detached but alive
        assert!(g.contains(chiller));
        assert_eq!(g.occupant(chiller, ports::INLET), None);
        // the branch still exists as a lone node between splitter and mixer
        let listing = supply_components(&g, lp);
        assert_eq!(listing.len(), 5);
        // not an anchor situation by construction: it still is one branch
        assert!(!listing.contains(&chiller));
    }

    #[test]
    fn insert_then_remove_is_exact_round_trip() {
        let mut g = Graph::new();
        let (lp, chiller) = loop_with_chiller(&mut g);
        let before = supply_components(&g, lp);

        let pump = g.add_object_named(Kind::Pump, "P1");
        let chiller_inlet = g.occupant(chiller, ports::INLET).unwrap().entity;
        assert!(add_to_node(&mut g, pump, chiller_inlet));
        assert!(remove_component(&mut g, pump));

        assert_eq!(supply_components(&g, lp), before);
    }

    #[test]
    fn branch_removal_heals_other_loop_of_dual_component() {
        let mut g = Graph::new();
        let lp_a = create_loop(&mut g, "CHW", FluidType::Water);
        let lp_b = create_loop(&mut g, "CW", FluidType::Water);
        let hx = g.add_object_named(Kind::HeatExchanger, "HX");
        assert!(add_branch_for_component(&mut g, lp_a, LoopSide::Demand, hx));
        let anchor_b = supply_components(&g, lp_b)[2];
        assert!(add_to_tertiary_node(&mut g, hx, anchor_b));

        assert!(remove_branch_with_component(&mut g, hx));
        assert!(!g.contains(hx));
        // loop B healed and traversable
        let listing_b = supply_components(&g, lp_b);
        assert_eq!(listing_b.len(), 5);
    }

    #[test]
    fn second_branch_stays_untouched_by_removal() {
        let mut g = Graph::new();
        let (lp, chiller) = loop_with_chiller(&mut g);
        let tower = g.add_object_named(Kind::CoolingTower, "CT1");
        assert!(add_branch_for_component(&mut g, lp, LoopSide::Supply, tower));

        assert!(remove_branch_with_component(&mut g, chiller));
        assert!(g.contains(tower));
        let listing = supply_components(&g, lp);
        assert!(listing.contains(&tower));
        // one branch left: splitter ports compacted to a dense single port
        let splitter = g.reference(lp, LoopSide::Supply.splitter_field()).unwrap();
        assert_eq!(occupied_branch_ports(&g, splitter), 1);
        assert_eq!(
            g.occupant(splitter, ports::FIRST_BRANCH).unwrap().entity,
            g.occupant(tower, ports::INLET).unwrap().entity
        );
    }
}
