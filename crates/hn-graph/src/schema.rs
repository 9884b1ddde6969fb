//! Per-kind field schema tables.
//!
//! The original design bound GUI fields to objects through reflective
//! named-field access; here every kind carries a static table of
//! `(field name, type)` descriptors and the graph dispatches reads and
//! writes through it. Downstream layers address well-known fields through
//! the index modules at the bottom of this file.

use crate::entity::FieldValue;
use hn_core::Kind;

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Double,
    Int,
    Bool,
    Str,
    Ref,
}

/// Descriptor for one field of a kind.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    /// Autosized numeric write-backs get a basic non-negativity check.
    pub non_negative: bool,
}

impl FieldSpec {
    /// Whether `value` is storable in this slot. `Empty` always is.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match (self.ty, value) {
            (_, FieldValue::Empty) => true,
            (FieldType::Double, FieldValue::Double(v)) => !self.non_negative || *v >= 0.0,
            (FieldType::Int, FieldValue::Int(v)) => !self.non_negative || *v >= 0,
            (FieldType::Bool, FieldValue::Bool(_)) => true,
            (FieldType::Str, FieldValue::Str(_)) => true,
            (FieldType::Ref, FieldValue::Ref(_)) => true,
            _ => false,
        }
    }
}

/// Schema for one kind: fixed fields plus an optional extensible tail of
/// repeated fields (branch-style lists).
#[derive(Debug, Clone, Copy)]
pub struct KindSchema {
    pub fixed: &'static [FieldSpec],
    pub extensible: Option<FieldSpec>,
}

impl KindSchema {
    /// Index of a fixed field by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fixed.iter().position(|spec| spec.name == name)
    }
}

const fn data(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        non_negative: false,
    }
}

const fn non_neg(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        non_negative: true,
    }
}

const fn object(name: &'static str) -> FieldSpec {
    data(name, FieldType::Ref)
}

const EMPTY: KindSchema = KindSchema {
    fixed: &[],
    extensible: None,
};

const LOOP: KindSchema = KindSchema {
    fixed: &[
        data("Fluid Type", FieldType::Str),
        object("Supply Inlet Node"),
        object("Supply Outlet Node"),
        object("Demand Inlet Node"),
        object("Demand Outlet Node"),
        object("Supply Splitter"),
        object("Supply Mixer"),
        object("Demand Splitter"),
        object("Demand Mixer"),
    ],
    extensible: None,
};

const NODE: KindSchema = KindSchema {
    fixed: &[data("Fluid Type", FieldType::Str)],
    extensible: None,
};

const PUMP: KindSchema = KindSchema {
    fixed: &[
        non_neg("Rated Flow Rate", FieldType::Double),
        non_neg("Rated Pump Head", FieldType::Double),
        object("Pump Curve"),
        object("Availability Schedule"),
    ],
    extensible: None,
};

const BOILER: KindSchema = KindSchema {
    fixed: &[
        non_neg("Nominal Capacity", FieldType::Double),
        non_neg("Nominal Thermal Efficiency", FieldType::Double),
        object("Efficiency Curve"),
    ],
    extensible: None,
};

const CHILLER: KindSchema = KindSchema {
    fixed: &[
        non_neg("Reference Capacity", FieldType::Double),
        non_neg("Reference COP", FieldType::Double),
        object("Capacity Curve"),
    ],
    extensible: None,
};

const COOLING_TOWER: KindSchema = KindSchema {
    fixed: &[
        non_neg("Design Air Flow Rate", FieldType::Double),
        non_neg("Design Fan Power", FieldType::Double),
    ],
    extensible: None,
};

const COIL_HEATING: KindSchema = KindSchema {
    fixed: &[
        non_neg("Rated Capacity", FieldType::Double),
        object("Availability Schedule"),
    ],
    extensible: None,
};

const COIL_COOLING: KindSchema = KindSchema {
    fixed: &[
        non_neg("Design Water Flow Rate", FieldType::Double),
        object("Availability Schedule"),
    ],
    extensible: None,
};

const PIPE: KindSchema = KindSchema {
    fixed: &[non_neg("Pipe Length", FieldType::Double)],
    extensible: None,
};

const HEAT_EXCHANGER: KindSchema = KindSchema {
    fixed: &[non_neg("Heat Exchange Effectiveness", FieldType::Double)],
    extensible: None,
};

const AVAILABILITY_MANAGER: KindSchema = KindSchema {
    fixed: &[
        data("Control Policy", FieldType::Str),
        object("Schedule"),
    ],
    extensible: None,
};

const AVAILABILITY_MANAGER_LIST: KindSchema = KindSchema {
    fixed: &[],
    extensible: Some(object("Availability Manager")),
};

const SIZING: KindSchema = KindSchema {
    fixed: &[
        object("Loop"),
        data("Design Exit Temperature", FieldType::Double),
        non_neg("Design Temperature Difference", FieldType::Double),
        data("Sizing Option", FieldType::Str),
    ],
    extensible: None,
};

const SCHEDULE: KindSchema = KindSchema {
    fixed: &[data("Default Value", FieldType::Double)],
    extensible: None,
};

const CURVE: KindSchema = KindSchema {
    fixed: &[
        data("Coefficient 1", FieldType::Double),
        data("Coefficient 2", FieldType::Double),
        data("Coefficient 3", FieldType::Double),
        data("Minimum Value", FieldType::Double),
        data("Maximum Value", FieldType::Double),
    ],
    extensible: None,
};

const MATERIAL: KindSchema = KindSchema {
    fixed: &[
        non_neg("Thickness", FieldType::Double),
        non_neg("Conductivity", FieldType::Double),
        non_neg("Density", FieldType::Double),
        non_neg("Specific Heat", FieldType::Double),
    ],
    extensible: None,
};

const CONSTRUCTION: KindSchema = KindSchema {
    fixed: &[],
    extensible: Some(object("Layer")),
};

const STANDARDS_INFORMATION: KindSchema = KindSchema {
    fixed: &[
        object("Construction"),
        data("Intended Surface Type", FieldType::Str),
        data("Standards Construction Type", FieldType::Str),
    ],
    extensible: None,
};

/// Static schema lookup for a kind.
pub fn schema(kind: Kind) -> &'static KindSchema {
    match kind {
        Kind::Loop => &LOOP,
        Kind::Node => &NODE,
        Kind::Splitter | Kind::Mixer => &EMPTY,
        Kind::Pump => &PUMP,
        Kind::Boiler => &BOILER,
        Kind::Chiller => &CHILLER,
        Kind::CoolingTower => &COOLING_TOWER,
        Kind::CoilHeating => &COIL_HEATING,
        Kind::CoilCooling => &COIL_COOLING,
        Kind::Pipe => &PIPE,
        Kind::HeatExchanger => &HEAT_EXCHANGER,
        Kind::AvailabilityManager => &AVAILABILITY_MANAGER,
        Kind::AvailabilityManagerList => &AVAILABILITY_MANAGER_LIST,
        Kind::Sizing => &SIZING,
        Kind::Schedule => &SCHEDULE,
        Kind::Curve => &CURVE,
        Kind::Material => &MATERIAL,
        Kind::Construction => &CONSTRUCTION,
        Kind::StandardsInformation => &STANDARDS_INFORMATION,
    }
}

/// Well-known fixed-field indices for `Kind::Loop`.
pub mod loop_fields {
    pub const FLUID_TYPE: usize = 0;
    pub const SUPPLY_INLET_NODE: usize = 1;
    pub const SUPPLY_OUTLET_NODE: usize = 2;
    pub const DEMAND_INLET_NODE: usize = 3;
    pub const DEMAND_OUTLET_NODE: usize = 4;
    pub const SUPPLY_SPLITTER: usize = 5;
    pub const SUPPLY_MIXER: usize = 6;
    pub const DEMAND_SPLITTER: usize = 7;
    pub const DEMAND_MIXER: usize = 8;
}

/// Well-known fixed-field indices for `Kind::Node`.
pub mod node_fields {
    pub const FLUID_TYPE: usize = 0;
}

/// Well-known fixed-field indices for `Kind::Sizing`.
pub mod sizing_fields {
    pub const LOOP: usize = 0;
    pub const DESIGN_EXIT_TEMPERATURE: usize = 1;
    pub const DESIGN_TEMPERATURE_DIFFERENCE: usize = 2;
    pub const SIZING_OPTION: usize = 3;
}

/// Well-known fixed-field indices for `Kind::StandardsInformation`.
pub mod standards_fields {
    pub const CONSTRUCTION: usize = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_index_lookup() {
        let s = schema(Kind::Loop);
        assert_eq!(s.field_index("Fluid Type"), Some(loop_fields::FLUID_TYPE));
        assert_eq!(
            s.field_index("Demand Mixer"),
            Some(loop_fields::DEMAND_MIXER)
        );
        assert_eq!(s.field_index("No Such Field"), None);
    }

    #[test]
    fn type_checking() {
        let spec = non_neg("Rated Flow Rate", FieldType::Double);
        assert!(spec.accepts(&FieldValue::Double(1.0)));
        assert!(spec.accepts(&FieldValue::Empty));
        assert!(!spec.accepts(&FieldValue::Double(-1.0)));
        assert!(!spec.accepts(&FieldValue::Str("x".into())));

        let plain = data("Design Exit Temperature", FieldType::Double);
        assert!(plain.accepts(&FieldValue::Double(-5.0)));
    }

    #[test]
    fn every_kind_has_a_schema() {
        // Spot-check shape expectations the loop layer relies on.
        assert_eq!(schema(Kind::Loop).fixed.len(), 9);
        assert!(schema(Kind::AvailabilityManagerList).extensible.is_some());
        assert!(schema(Kind::Construction).extensible.is_some());
        assert!(schema(Kind::Splitter).fixed.is_empty());
    }
}
