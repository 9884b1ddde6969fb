//! Node-mediated wiring.
//!
//! Every edge in a loop runs through a Node: one outlet port, one Node, one
//! inlet port. `connect` enforces the mediation rule on top of the graph's
//! raw occupancy-checked port primitive, and `insert_component` is the single
//! splice underlying every "add a component onto an existing connection"
//! operation.

use hn_core::{FluidType, Handle, Kind, PortIndex};
use hn_graph::schema::node_fields;
use hn_graph::{FieldValue, Graph};

use crate::families::{self, PlacementRole, ports};

/// Connect an outlet port to an inlet port.
///
/// Exactly one endpoint must be a Node; both ports must be unoccupied.
/// Returns false (mutating nothing) otherwise.
pub fn connect(
    graph: &mut Graph,
    src: Handle,
    src_port: PortIndex,
    sink: Handle,
    sink_port: PortIndex,
) -> bool {
    let src_is_node = graph.kind_of(src) == Some(Kind::Node);
    let sink_is_node = graph.kind_of(sink) == Some(Kind::Node);
    if src_is_node == sink_is_node {
        return false;
    }
    graph.attach_ports(src, src_port, sink, sink_port)
}

/// Detach a port, clearing both ends.
///
/// Any Node left orphaned stays in the graph for the caller to dispose of.
pub fn disconnect(graph: &mut Graph, entity: Handle, port: PortIndex) -> bool {
    graph.detach_port(entity, port)
}

/// Fluid tag stored on a node.
pub fn node_fluid(graph: &Graph, node: Handle) -> Option<FluidType> {
    graph
        .field(node, node_fields::FLUID_TYPE)?
        .as_str()
        .and_then(FluidType::parse)
}

/// Create a fresh unattached node carrying `fluid`.
pub fn make_node(graph: &mut Graph, fluid: FluidType) -> Handle {
    let node = graph.add_object(Kind::Node);
    graph.set_field(
        node,
        node_fields::FLUID_TYPE,
        FieldValue::Str(fluid.as_str().to_owned()),
    );
    node
}

/// Splice `component` onto the connection held by `node`, through its
/// primary inlet/outlet pair.
///
/// Given `U → node → D` the result is `U → new_node → component → node → D`;
/// the targeted node keeps its handle and its far-side connection. When
/// `node` is a side inlet boundary node (the loop itself sits upstream) the
/// splice mirrors downstream, `node → component → new_node → D`, so boundary
/// handles never change either way. The new node inherits the targeted
/// node's fluid tag.
pub fn insert_component(graph: &mut Graph, node: Handle, component: Handle) -> bool {
    insert_component_role(graph, node, component, PlacementRole::Primary)
}

/// Role-aware variant of [`insert_component`] for dual-connection kinds.
pub fn insert_component_role(
    graph: &mut Graph,
    node: Handle,
    component: Handle,
    role: PlacementRole,
) -> bool {
    if graph.kind_of(node) != Some(Kind::Node) {
        return false;
    }
    let Some(kind) = graph.kind_of(component) else {
        return false;
    };
    if !families::has_role(kind, role) {
        return false;
    }
    let (inlet, outlet) = (role.inlet(), role.outlet());
    if graph.occupant(component, inlet).is_some() || graph.occupant(component, outlet).is_some() {
        return false;
    }

    let upstream = graph.occupant(node, ports::NODE_INLET);
    let downstream = graph.occupant(node, ports::NODE_OUTLET);
    let fluid = node_fluid(graph, node).unwrap_or_default();

    // A node with the loop itself upstream is a side inlet boundary node.
    let at_side_start =
        upstream.is_some_and(|end| graph.kind_of(end.entity) == Some(Kind::Loop));

    if at_side_start {
        let Some(down) = downstream else {
            return false;
        };
        let new_node = make_node(graph, fluid);
        disconnect(graph, node, ports::NODE_OUTLET);
        connect(graph, node, ports::NODE_OUTLET, component, inlet);
        connect(graph, component, outlet, new_node, ports::NODE_INLET);
        connect(graph, new_node, ports::NODE_OUTLET, down.entity, down.port);
    } else {
        let Some(up) = upstream else {
            return false;
        };
        let new_node = make_node(graph, fluid);
        disconnect(graph, node, ports::NODE_INLET);
        connect(graph, up.entity, up.port, new_node, ports::NODE_INLET);
        connect(graph, new_node, ports::NODE_OUTLET, component, inlet);
        connect(graph, component, outlet, node, ports::NODE_INLET);
    }
    true
}
