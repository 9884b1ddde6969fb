//! Entity records: the uniform storage unit of the object graph.

use hn_core::{Handle, Kind, PortIndex};
use serde::{Deserialize, Serialize};

/// One stored field value.
///
/// `Ref` fields are the forward-reference edges of the graph; everything else
/// is opaque data passed through to the sizing/persistence collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Empty,
    Double(f64),
    Int(i64),
    Bool(bool),
    Str(String),
    Ref(Handle),
}

impl FieldValue {
    /// The referenced handle, if this is a `Ref` field.
    pub fn as_ref_handle(&self) -> Option<Handle> {
        match self {
            FieldValue::Ref(h) => Some(*h),
            _ => None,
        }
    }

    /// The stored number, if this is a `Double` field.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            FieldValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// The stored string, if this is a `Str` field.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// One end of a port-to-port connection, stored symmetrically on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortEnd {
    pub entity: Handle,
    pub port: PortIndex,
}

/// Stored state of one entity.
///
/// `fields` holds the fixed schema prefix followed by the extensible tail
/// (repeated fields), so a field index addresses the same slot the
/// persistence layer serializes.
#[derive(Debug, Clone)]
pub(crate) struct EntityRecord {
    pub(crate) kind: Kind,
    pub(crate) name: Option<String>,
    pub(crate) fields: Vec<FieldValue>,
    pub(crate) ports: Vec<Option<PortEnd>>,
    pub(crate) parent: Option<Handle>,
    pub(crate) children: Vec<Handle>,
}

impl EntityRecord {
    pub(crate) fn new(kind: Kind, fixed_len: usize) -> Self {
        Self {
            kind,
            name: None,
            fields: vec![FieldValue::Empty; fixed_len],
            ports: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Iterate the handles this record's `Ref` fields point at.
    pub(crate) fn ref_targets(&self) -> impl Iterator<Item = Handle> + '_ {
        self.fields.iter().filter_map(FieldValue::as_ref_handle)
    }
}
