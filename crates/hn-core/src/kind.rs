//! The closed vocabulary of entity kinds.
//!
//! The engine deliberately models component families as a closed set of
//! tagged variants rather than an open trait-object hierarchy: every
//! lifecycle rule (resource counting, ownership cascade, clone dedup) can
//! then be answered from the tag alone, and the persistence layer gets a
//! stable kind string per entity.

use core::fmt;

/// Kind tag for every entity a graph can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Kind {
    /// A fluid loop: supply side + demand side with fixed boundary nodes.
    Loop,
    /// Wiring point joining one outlet port to one inlet port.
    Node,
    /// Fan-out connector: one common inlet, N branch outlets.
    Splitter,
    /// Fan-in connector: N branch inlets, one common outlet.
    Mixer,

    // Straight components: one inlet, one outlet.
    Pump,
    Boiler,
    Chiller,
    CoolingTower,
    CoilHeating,
    CoilCooling,
    Pipe,

    /// Dual-connection component: a second, independent fluid connection
    /// (secondary inlet/outlet pair) placeable on another loop.
    HeatExchanger,

    /// Ordered control policy attached to a loop through its list.
    AvailabilityManager,
    /// Owned list entity holding a loop's availability managers in rank order.
    AvailabilityManagerList,
    /// Per-loop sizing record; opaque pass-through data for the sizing engine.
    Sizing,

    // Resources: shared by reference, lifecycle-managed by usage counting.
    Schedule,
    Curve,
    Material,
    /// Layered construction: a resource that also owns children.
    Construction,

    /// Child record owned by a Construction.
    StandardsInformation,
}

impl Kind {
    /// Stable tag used by the persistence/GUI collaborators.
    pub fn tag(self) -> &'static str {
        match self {
            Kind::Loop => "Loop",
            Kind::Node => "Node",
            Kind::Splitter => "Splitter",
            Kind::Mixer => "Mixer",
            Kind::Pump => "Pump",
            Kind::Boiler => "Boiler",
            Kind::Chiller => "Chiller",
            Kind::CoolingTower => "CoolingTower",
            Kind::CoilHeating => "CoilHeating",
            Kind::CoilCooling => "CoilCooling",
            Kind::Pipe => "Pipe",
            Kind::HeatExchanger => "HeatExchanger",
            Kind::AvailabilityManager => "AvailabilityManager",
            Kind::AvailabilityManagerList => "AvailabilityManagerList",
            Kind::Sizing => "Sizing",
            Kind::Schedule => "Schedule",
            Kind::Curve => "Curve",
            Kind::Material => "Material",
            Kind::Construction => "Construction",
            Kind::StandardsInformation => "StandardsInformation",
        }
    }

    /// Resources are shared by reference and owned by nobody; they are
    /// deleted only by an explicit purge once unused.
    pub fn is_resource(self) -> bool {
        matches!(
            self,
            Kind::Schedule | Kind::Curve | Kind::Material | Kind::Construction
        )
    }

    /// Kinds that sit on a loop via inlet/outlet ports.
    pub fn is_component(self) -> bool {
        self.is_straight_component() || self.is_dual_connection() || self.is_connector()
    }

    /// One inlet, one outlet.
    pub fn is_straight_component(self) -> bool {
        matches!(
            self,
            Kind::Pump
                | Kind::Boiler
                | Kind::Chiller
                | Kind::CoolingTower
                | Kind::CoilHeating
                | Kind::CoilCooling
                | Kind::Pipe
        )
    }

    /// Components with a second, independent fluid connection.
    pub fn is_dual_connection(self) -> bool {
        matches!(self, Kind::HeatExchanger)
    }

    /// Fan-out/fan-in connectors bounding a loop side's branch section.
    pub fn is_connector(self) -> bool {
        matches!(self, Kind::Splitter | Kind::Mixer)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Working-fluid tag carried by a loop and inherited by its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FluidType {
    #[default]
    Water,
    Air,
    Glycol,
}

impl FluidType {
    /// Canonical choice-field string.
    pub fn as_str(self) -> &'static str {
        match self {
            FluidType::Water => "Water",
            FluidType::Air => "Air",
            FluidType::Glycol => "Glycol",
        }
    }

    /// Parse a canonical choice-field string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Water" => Some(FluidType::Water),
            "Air" => Some(FluidType::Air),
            "Glycol" => Some(FluidType::Glycol),
            _ => None,
        }
    }
}

impl fmt::Display for FluidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
