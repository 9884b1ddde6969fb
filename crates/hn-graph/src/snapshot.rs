//! Enumeration snapshots for the persistence and GUI collaborators.
//!
//! The core guarantees enumerability and kind-distinguishability, not any
//! particular file format: every entity can be rendered as a row of named
//! field values in stable document order, and the translation layer owns
//! whatever it writes to disk.

use serde::Serialize;

use hn_core::Handle;

use crate::entity::FieldValue;
use crate::graph::Graph;
use crate::schema::schema;

/// One named field value of a snapshot row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSnapshot {
    pub name: String,
    pub value: FieldValue,
}

/// One entity rendered for enumeration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSnapshot {
    pub handle: u64,
    pub kind: &'static str,
    pub name: Option<String>,
    pub fields: Vec<FieldSnapshot>,
    pub parent: Option<u64>,
    pub children: Vec<u64>,
}

impl Graph {
    /// Render one entity, or `None` for dangling handles.
    pub fn snapshot_object(&self, handle: Handle) -> Option<ObjectSnapshot> {
        let kind = self.kind_of(handle)?;
        let kind_schema = schema(kind);
        let mut fields = Vec::with_capacity(self.field_count(handle));
        for (i, spec) in kind_schema.fixed.iter().enumerate() {
            fields.push(FieldSnapshot {
                name: spec.name.to_owned(),
                value: self.field(handle, i).cloned().unwrap_or(FieldValue::Empty),
            });
        }
        if let Some(spec) = kind_schema.extensible {
            let fixed = kind_schema.fixed.len();
            for i in fixed..self.field_count(handle) {
                fields.push(FieldSnapshot {
                    name: format!("{} {}", spec.name, i - fixed + 1),
                    value: self.field(handle, i).cloned().unwrap_or(FieldValue::Empty),
                });
            }
        }
        Some(ObjectSnapshot {
            handle: handle.raw(),
            kind: kind.tag(),
            name: self.name_of(handle).map(str::to_owned),
            fields,
            parent: self.parent(handle).map(Handle::raw),
            children: self.children(handle).iter().map(|c| c.raw()).collect(),
        })
    }

    /// Render every entity in document order.
    pub fn snapshot(&self) -> Vec<ObjectSnapshot> {
        self.objects()
            .iter()
            .filter_map(|h| self.snapshot_object(*h))
            .collect()
    }
}
