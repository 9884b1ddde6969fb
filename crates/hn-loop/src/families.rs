//! Component families and port-role conventions.
//!
//! The component zoo is a closed set of tagged variants; each family shares
//! one capability surface (inlet port, outlet port, placement on a node)
//! selected by kind tag. Port indices are fixed per family so the wiring and
//! topology layers can address them without per-kind dispatch tables.

use hn_core::{Kind, PortIndex};

/// Well-known port indices.
pub mod ports {
    use hn_core::PortIndex;

    // components
    pub const INLET: PortIndex = 0;
    pub const OUTLET: PortIndex = 1;
    pub const SECONDARY_INLET: PortIndex = 2;
    pub const SECONDARY_OUTLET: PortIndex = 3;

    // nodes
    pub const NODE_INLET: PortIndex = 0;
    pub const NODE_OUTLET: PortIndex = 1;

    // splitter/mixer: one common port, branch ports from 1 up
    pub const COMMON: PortIndex = 0;
    pub const FIRST_BRANCH: PortIndex = 1;

    // loop entity: where each side starts and ends
    pub const LOOP_SUPPLY_START: PortIndex = 0;
    pub const LOOP_SUPPLY_END: PortIndex = 1;
    pub const LOOP_DEMAND_START: PortIndex = 2;
    pub const LOOP_DEMAND_END: PortIndex = 3;
}

/// How a component kind connects to loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentFamily {
    /// One inlet, one outlet.
    Straight,
    /// Two independent inlet/outlet pairs, placeable on two loops.
    DualConnection,
}

/// Which of a component's connections a placement call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementRole {
    Primary,
    Secondary,
}

impl PlacementRole {
    pub fn inlet(self) -> PortIndex {
        match self {
            PlacementRole::Primary => ports::INLET,
            PlacementRole::Secondary => ports::SECONDARY_INLET,
        }
    }

    pub fn outlet(self) -> PortIndex {
        match self {
            PlacementRole::Primary => ports::OUTLET,
            PlacementRole::Secondary => ports::SECONDARY_OUTLET,
        }
    }
}

/// Family of a kind, or `None` for kinds that never sit on a branch.
pub fn family(kind: Kind) -> Option<ComponentFamily> {
    if kind.is_straight_component() {
        Some(ComponentFamily::Straight)
    } else if kind.is_dual_connection() {
        Some(ComponentFamily::DualConnection)
    } else {
        None
    }
}

/// Whether `role` exists on `kind`.
pub fn has_role(kind: Kind, role: PlacementRole) -> bool {
    match role {
        PlacementRole::Primary => family(kind).is_some(),
        PlacementRole::Secondary => family(kind) == Some(ComponentFamily::DualConnection),
    }
}

/// Exit port for an entity entered at `entered` during a downstream walk.
///
/// Panics for kinds that do not participate in loop plumbing; reaching one
/// mid-walk means the topology was corrupted earlier.
pub fn exit_port(kind: Kind, entered: PortIndex) -> PortIndex {
    match kind {
        Kind::Node => ports::NODE_OUTLET,
        Kind::Mixer => ports::COMMON,
        _ if kind.is_straight_component() => ports::OUTLET,
        _ if kind.is_dual_connection() => {
            if entered == ports::SECONDARY_INLET {
                ports::SECONDARY_OUTLET
            } else {
                ports::OUTLET
            }
        }
        other => panic!("no downstream exit for {other} entered at port {entered}"),
    }
}
