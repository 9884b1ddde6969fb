//! Loop construction and removal.

use hn_core::{FluidType, Handle, Kind, PortIndex};
use hn_graph::schema::{loop_fields, sizing_fields};
use hn_graph::{FieldValue, Graph};

use crate::families::ports;
use crate::traverse;
use crate::wiring::{self, connect};

/// Which half of a loop an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopSide {
    Supply,
    Demand,
}

impl LoopSide {
    pub const BOTH: [LoopSide; 2] = [LoopSide::Supply, LoopSide::Demand];

    pub fn label(self) -> &'static str {
        match self {
            LoopSide::Supply => "Supply",
            LoopSide::Demand => "Demand",
        }
    }

    /// Loop-entity port feeding this side's inlet node.
    pub fn start_port(self) -> PortIndex {
        match self {
            LoopSide::Supply => ports::LOOP_SUPPLY_START,
            LoopSide::Demand => ports::LOOP_DEMAND_START,
        }
    }

    /// Loop-entity port fed by this side's outlet node.
    pub fn end_port(self) -> PortIndex {
        match self {
            LoopSide::Supply => ports::LOOP_SUPPLY_END,
            LoopSide::Demand => ports::LOOP_DEMAND_END,
        }
    }

    pub fn inlet_node_field(self) -> usize {
        match self {
            LoopSide::Supply => loop_fields::SUPPLY_INLET_NODE,
            LoopSide::Demand => loop_fields::DEMAND_INLET_NODE,
        }
    }

    pub fn outlet_node_field(self) -> usize {
        match self {
            LoopSide::Supply => loop_fields::SUPPLY_OUTLET_NODE,
            LoopSide::Demand => loop_fields::DEMAND_OUTLET_NODE,
        }
    }

    pub fn splitter_field(self) -> usize {
        match self {
            LoopSide::Supply => loop_fields::SUPPLY_SPLITTER,
            LoopSide::Demand => loop_fields::DEMAND_SPLITTER,
        }
    }

    pub fn mixer_field(self) -> usize {
        match self {
            LoopSide::Supply => loop_fields::SUPPLY_MIXER,
            LoopSide::Demand => loop_fields::DEMAND_MIXER,
        }
    }
}

/// Fluid tag carried by a loop.
pub fn loop_fluid(graph: &Graph, loop_h: Handle) -> FluidType {
    graph
        .field(loop_h, loop_fields::FLUID_TYPE)
        .and_then(|f| f.as_str())
        .and_then(FluidType::parse)
        .unwrap_or_default()
}

/// Build a complete two-sided loop.
///
/// Each side starts Direct: `inlet node → splitter → anchor node → mixer →
/// outlet node`, with the loop entity closing both ends. The four boundary
/// nodes created here keep their handles for the loop's lifetime. An
/// availability-manager list and a sizing record are created with the loop
/// as owned children.
pub fn create_loop(graph: &mut Graph, name: impl Into<String>, fluid: FluidType) -> Handle {
    let name = name.into();
    let loop_h = graph.add_object_named(Kind::Loop, name.clone());
    graph.set_field(
        loop_h,
        loop_fields::FLUID_TYPE,
        FieldValue::Str(fluid.as_str().to_owned()),
    );

    for side in LoopSide::BOTH {
        build_side(graph, loop_h, &name, side, fluid);
    }

    let list = graph.add_object_named(
        Kind::AvailabilityManagerList,
        format!("{name} Availability Manager List"),
    );
    graph.adopt(loop_h, list);

    let sizing = graph.add_object_named(Kind::Sizing, format!("{name} Sizing"));
    graph.adopt(loop_h, sizing);
    graph.set_reference(sizing, sizing_fields::LOOP, loop_h);

    loop_h
}

fn build_side(graph: &mut Graph, loop_h: Handle, name: &str, side: LoopSide, fluid: FluidType) {
    let label = side.label();
    let inlet = wiring::make_node(graph, fluid);
    graph.set_name(inlet, format!("{name} {label} Inlet Node"));
    let outlet = wiring::make_node(graph, fluid);
    graph.set_name(outlet, format!("{name} {label} Outlet Node"));
    let anchor = wiring::make_node(graph, fluid);
    graph.set_name(anchor, format!("{name} {label} Connector Node"));
    let splitter = graph.add_object_named(Kind::Splitter, format!("{name} {label} Splitter"));
    let mixer = graph.add_object_named(Kind::Mixer, format!("{name} {label} Mixer"));

    connect(graph, loop_h, side.start_port(), inlet, ports::NODE_INLET);
    connect(graph, inlet, ports::NODE_OUTLET, splitter, ports::COMMON);
    connect(graph, splitter, ports::FIRST_BRANCH, anchor, ports::NODE_INLET);
    connect(graph, anchor, ports::NODE_OUTLET, mixer, ports::FIRST_BRANCH);
    connect(graph, mixer, ports::COMMON, outlet, ports::NODE_INLET);
    connect(graph, outlet, ports::NODE_OUTLET, loop_h, side.end_port());

    graph.set_reference(loop_h, side.inlet_node_field(), inlet);
    graph.set_reference(loop_h, side.outlet_node_field(), outlet);
    graph.set_reference(loop_h, side.splitter_field(), splitter);
    graph.set_reference(loop_h, side.mixer_field(), mixer);
}

/// Remove a loop and its plumbing.
///
/// Supply components are deleted with the loop; demand components are only
/// detached, since demand-side equipment is routinely shared with other
/// systems. The owned controller records (availability list with its
/// managers, sizing) go with the loop entity's cascade. Returns every handle
/// removed.
pub fn remove_loop(graph: &mut Graph, loop_h: Handle) -> Vec<Handle> {
    if graph.kind_of(loop_h) != Some(Kind::Loop) {
        return Vec::new();
    }
    let mut removed = Vec::new();

    // components connected onward to other loops heal those loops first
    for side in LoopSide::BOTH {
        for entity in traverse::side_components(graph, loop_h, side) {
            if graph
                .kind_of(entity)
                .is_some_and(|k| k.is_component() && !k.is_connector())
            {
                crate::topology::detach_from_other_loops(graph, entity, loop_h);
            }
        }
    }

    // detach demand components rather than deleting them: demand-side
    // equipment is routinely shared with other systems
    let demand = traverse::demand_components(graph, loop_h);
    for entity in demand {
        let Some(kind) = graph.kind_of(entity) else {
            continue;
        };
        if kind.is_component() && !kind.is_connector() {
            crate::topology::detach_from_loop(graph, entity, loop_h);
        }
    }

    for side in LoopSide::BOTH {
        let entities = traverse::side_components(graph, loop_h, side);
        for entity in entities {
            if graph.contains(entity) && entity != loop_h {
                removed.extend(graph.remove_object(entity));
            }
        }
    }
    removed.extend(graph.remove_object(loop_h));
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_loop_builds_both_sides_direct() {
        let mut g = Graph::new();
        let lp = create_loop(&mut g, "CHW", FluidType::Water);

        // loop + 2 x (3 nodes + splitter + mixer) + list + sizing
        assert_eq!(g.len(), 13);

        for side in LoopSide::BOTH {
            let inlet = g.reference(lp, side.inlet_node_field()).unwrap();
            let outlet = g.reference(lp, side.outlet_node_field()).unwrap();
            let splitter = g.reference(lp, side.splitter_field()).unwrap();
            let mixer = g.reference(lp, side.mixer_field()).unwrap();

            assert_eq!(g.kind_of(inlet), Some(Kind::Node));
            assert_eq!(g.kind_of(splitter), Some(Kind::Splitter));

            // inlet node feeds the splitter's common port
            assert_eq!(
                g.occupant(inlet, ports::NODE_OUTLET).unwrap().entity,
                splitter
            );
            // one anchor node joins splitter and mixer
            let anchor = g.occupant(splitter, ports::FIRST_BRANCH).unwrap().entity;
            assert_eq!(g.kind_of(anchor), Some(Kind::Node));
            assert_eq!(
                g.occupant(anchor, ports::NODE_OUTLET).unwrap().entity,
                mixer
            );
            assert_eq!(g.occupant(mixer, ports::COMMON).unwrap().entity, outlet);
            // boundary nodes close on the loop entity
            assert_eq!(
                g.occupant(outlet, ports::NODE_OUTLET).unwrap().entity,
                lp
            );
        }

        // owned controller records
        assert_eq!(g.children(lp).len(), 2);
        assert_eq!(loop_fluid(&g, lp), FluidType::Water);
    }

    #[test]
    fn remove_loop_takes_plumbing_and_controllers() {
        let mut g = Graph::new();
        let lp = create_loop(&mut g, "CHW", FluidType::Water);
        let removed = remove_loop(&mut g, lp);
        assert_eq!(removed.len(), 13);
        assert!(g.is_empty());
    }
}
