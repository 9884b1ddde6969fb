//! Per-loop control records: the availability-manager priority list and the
//! sizing record.
//!
//! The list is the extensible reference tail of an `AvailabilityManagerList`
//! entity owned by the loop; rank is position, so the 1..N dense ordering is
//! structural rather than stored. Managers become owned children of the list
//! while attached (they go with the loop) and are detached intact by the
//! removal calls.

use hn_core::{Handle, Kind};
use hn_graph::Graph;
use hn_graph::schema::sizing_fields;

/// The loop's availability-manager list entity.
pub fn availability_manager_list(graph: &Graph, loop_h: Handle) -> Option<Handle> {
    graph
        .children(loop_h)
        .into_iter()
        .find(|c| graph.kind_of(*c) == Some(Kind::AvailabilityManagerList))
}

/// Attached managers in priority order (rank 1 first).
pub fn availability_managers(graph: &Graph, loop_h: Handle) -> Vec<Handle> {
    match availability_manager_list(graph, loop_h) {
        Some(list) => graph.extensible_refs(list),
        None => Vec::new(),
    }
}

/// 1-based rank of an attached manager.
pub fn priority(graph: &Graph, loop_h: Handle, manager: Handle) -> Option<usize> {
    availability_managers(graph, loop_h)
        .iter()
        .position(|m| *m == manager)
        .map(|p| p + 1)
}

/// Append a manager at the lowest priority (rank N+1).
///
/// Rejected when `manager` is not an AvailabilityManager, is already on this
/// loop, or is still attached somewhere else.
pub fn add_availability_manager(graph: &mut Graph, loop_h: Handle, manager: Handle) -> bool {
    let count = availability_managers(graph, loop_h).len();
    add_availability_manager_at(graph, loop_h, manager, count + 1)
}

/// Insert a manager at a 1-based rank, shifting later ranks down.
///
/// The rank is clamped into `[1, N+1]`.
pub fn add_availability_manager_at(
    graph: &mut Graph,
    loop_h: Handle,
    manager: Handle,
    rank: usize,
) -> bool {
    if graph.kind_of(manager) != Some(Kind::AvailabilityManager) {
        return false;
    }
    if graph.parent(manager).is_some() {
        return false;
    }
    let Some(list) = availability_manager_list(graph, loop_h) else {
        return false;
    };
    let count = graph.extensible_len(list);
    let rank = rank.clamp(1, count + 1);
    if !graph.insert_extensible_ref(list, rank - 1, manager) {
        return false;
    }
    graph.adopt(list, manager);
    true
}

/// Move an attached manager to a new 1-based rank, clamped into `[1, N]`,
/// re-splicing the rest contiguously.
pub fn set_priority(graph: &mut Graph, loop_h: Handle, manager: Handle, rank: usize) -> bool {
    let Some(list) = availability_manager_list(graph, loop_h) else {
        return false;
    };
    let managers = graph.extensible_refs(list);
    let Some(position) = managers.iter().position(|m| *m == manager) else {
        return false;
    };
    let rank = rank.clamp(1, managers.len());
    graph.remove_extensible(list, position);
    graph.insert_extensible_ref(list, rank - 1, manager)
}

/// Detach a manager from the loop, re-indexing the remainder contiguously.
/// The manager entity survives, orphaned, for the caller to reuse or remove.
pub fn remove_availability_manager(graph: &mut Graph, loop_h: Handle, manager: Handle) -> bool {
    let Some(list) = availability_manager_list(graph, loop_h) else {
        return false;
    };
    let Some(position) = graph
        .extensible_refs(list)
        .iter()
        .position(|m| *m == manager)
    else {
        return false;
    };
    graph.remove_extensible(list, position);
    graph.orphan(manager);
    true
}

/// Detach the manager holding a 1-based rank. Returns it.
pub fn remove_availability_manager_at(
    graph: &mut Graph,
    loop_h: Handle,
    rank: usize,
) -> Option<Handle> {
    let list = availability_manager_list(graph, loop_h)?;
    let managers = graph.extensible_refs(list);
    if rank == 0 || rank > managers.len() {
        return None;
    }
    let manager = graph.remove_extensible(list, rank - 1)?;
    graph.orphan(manager);
    Some(manager)
}

/// Detach every manager, returning them in their former priority order.
pub fn reset_availability_managers(graph: &mut Graph, loop_h: Handle) -> Vec<Handle> {
    let Some(list) = availability_manager_list(graph, loop_h) else {
        return Vec::new();
    };
    let managers = graph.extensible_refs(list);
    for manager in &managers {
        remove_availability_manager(graph, loop_h, *manager);
    }
    managers
}

/// The loop's sizing record, found through its back reference.
pub fn sizing_record(graph: &Graph, loop_h: Handle) -> Option<Handle> {
    graph.back_references(loop_h).into_iter().find(|source| {
        graph.kind_of(*source) == Some(Kind::Sizing)
            && graph.reference(*source, sizing_fields::LOOP) == Some(loop_h)
    })
}
