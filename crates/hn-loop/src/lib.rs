//! hn-loop: loop topology for hydronet.
//!
//! Provides:
//! - Node-mediated wiring (`connect`, `disconnect`, `insert_component`)
//! - Component families and placement roles
//! - Loop construction with fixed boundary nodes
//! - Branch & splitter/mixer topology operations
//! - Availability-manager priority list and sizing record per loop
//! - Ordered traversals and invariant validation
//!
//! # Example
//!
//! ```
//! use hn_core::{FluidType, Kind};
//! use hn_graph::Graph;
//! use hn_loop::{builder, controller, topology, traverse, LoopSide};
//!
//! let mut graph = Graph::new();
//! let loop_h = builder::create_loop(&mut graph, "Chilled Water Loop", FluidType::Water);
//!
//! let chiller = graph.add_object_named(Kind::Chiller, "Chiller 1");
//! assert!(topology::add_branch_for_component(
//!     &mut graph,
//!     loop_h,
//!     LoopSide::Supply,
//!     chiller
//! ));
//! assert!(traverse::supply_components(&graph, loop_h).contains(&chiller));
//! assert!(controller::sizing_record(&graph, loop_h).is_some());
//! ```

pub mod builder;
pub mod controller;
pub mod families;
pub mod topology;
pub mod traverse;
pub mod validate;
pub mod wiring;

// Re-exports for ergonomics
pub use builder::LoopSide;
pub use families::{ComponentFamily, PlacementRole, ports};
