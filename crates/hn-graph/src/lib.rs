//! hn-graph: object graph and resource lifecycle for hydronet.
//!
//! Provides:
//! - Entity registry with stable handles and cascade removal
//! - Per-kind field schema tables with generic dispatch
//! - Forward/back reference tracking
//! - Resource lifecycle: use counts, explicit purge, reachability
//! - Clone/copy engine with resource deduplication
//! - Enumeration snapshots for the persistence/GUI collaborators
//!
//! # Example
//!
//! ```
//! use hn_core::Kind;
//! use hn_graph::{FieldValue, Graph};
//!
//! let mut graph = Graph::new();
//! let material = graph.add_object_named(Kind::Material, "Brick");
//! let construction = graph.add_object_named(Kind::Construction, "Wall");
//! assert!(graph.push_extensible_ref(construction, material));
//!
//! assert_eq!(graph.direct_use_count(material, hn_graph::RefScope::AllReferences), 1);
//! assert_eq!(graph.field_named(material, "Thickness"), Some(&FieldValue::Empty));
//! ```

pub mod clone;
pub mod entity;
pub mod graph;
pub mod resource;
pub mod schema;
pub mod snapshot;

// Re-exports for ergonomics
pub use entity::{FieldValue, PortEnd};
pub use graph::Graph;
pub use resource::RefScope;
pub use schema::{FieldSpec, FieldType, KindSchema, schema};
pub use snapshot::{FieldSnapshot, ObjectSnapshot};
