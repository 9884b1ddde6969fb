//! Clone/copy engine with resource deduplication.
//!
//! Cloning is plan/apply: the source subtree and every reachable resource
//! subtree are first copied into an owned [`CopyPlan`], then the plan is
//! instantiated against the destination. The split lets one engine serve
//! same-graph and cross-graph clones, and means equality checks during
//! deduplication only ever read the destination plus the plan.
//!
//! Rules:
//! - the root's owned subtree is always duplicated and reparented, never
//!   shared; references internal to it are remapped to the clones
//! - a referenced resource reuses a field-for-field-equal destination
//!   resource when one exists, and is otherwise cloned exactly once per call
//! - loop/node placement (ports) is never cloned, and other references that
//!   leave the subtree are cleared: a cloned component starts detached

use std::collections::{HashMap, HashSet};

use hn_core::{Handle, Kind};

use crate::entity::FieldValue;
use crate::graph::Graph;
use crate::schema::schema;

#[derive(Debug, Clone)]
struct PlannedEntity {
    src: Handle,
    kind: Kind,
    name: Option<String>,
    /// Raw field copy; `Ref` targets are still source-graph handles.
    fields: Vec<FieldValue>,
    /// Index of the owning parent within the same subtree.
    parent: Option<usize>,
}

#[derive(Debug, Clone, Default)]
struct PlannedSubtree {
    /// Pre-order: parents before their children.
    entities: Vec<PlannedEntity>,
    index_of: HashMap<Handle, usize>,
}

#[derive(Debug, Default)]
struct CopyPlan {
    root: PlannedSubtree,
    /// One planned subtree per distinct source resource referenced from the
    /// root subtree or from another planned resource.
    resources: Vec<PlannedSubtree>,
    resource_index: HashMap<Handle, usize>,
}

impl Graph {
    /// Deep-copy `root` within this graph.
    ///
    /// Returns the new root handle, or `None` if `root` is dangling.
    pub fn clone_object(&mut self, root: Handle) -> Option<Handle> {
        let plan = CopyPlan::build(self, root)?;
        Some(apply(&plan, self))
    }

    /// Deep-copy `root` into `dest`, which may be empty or populated but
    /// must be a different graph instance (same-graph cloning goes through
    /// [`Graph::clone_object`]).
    pub fn clone_object_into(&self, root: Handle, dest: &mut Graph) -> Option<Handle> {
        let plan = CopyPlan::build(self, root)?;
        Some(apply(&plan, dest))
    }
}

impl CopyPlan {
    fn build(graph: &Graph, root: Handle) -> Option<CopyPlan> {
        if !graph.contains(root) {
            return None;
        }
        let mut plan = CopyPlan {
            root: plan_subtree(graph, root),
            ..CopyPlan::default()
        };

        // Breadth-first over resource reference edges; each source resource
        // is planned at most once no matter how many references reach it.
        let mut worklist = resource_targets_of(graph, &plan.root);
        let mut cursor = 0;
        while cursor < worklist.len() {
            let res = worklist[cursor];
            cursor += 1;
            if plan.resource_index.contains_key(&res) {
                continue;
            }
            let sub = plan_subtree(graph, res);
            plan.resource_index.insert(res, plan.resources.len());
            for further in resource_targets_of(graph, &sub) {
                if !plan.resource_index.contains_key(&further) && !worklist.contains(&further) {
                    worklist.push(further);
                }
            }
            plan.resources.push(sub);
        }
        Some(plan)
    }
}

fn plan_subtree(graph: &Graph, root: Handle) -> PlannedSubtree {
    let handles = graph.subtree(root);
    let mut sub = PlannedSubtree::default();
    for (i, h) in handles.iter().enumerate() {
        sub.index_of.insert(*h, i);
    }
    for h in handles {
        let parent = graph
            .parent(h)
            .and_then(|p| sub.index_of.get(&p).copied());
        sub.entities.push(PlannedEntity {
            src: h,
            kind: graph.kind_of(h).expect("subtree member is live"),
            name: graph.name_of(h).map(str::to_owned),
            fields: (0..graph.field_count(h))
                .map(|i| graph.field(h, i).expect("in range").clone())
                .collect(),
            parent,
        });
    }
    sub
}

/// Resources referenced from inside `sub` but planned outside it, in
/// first-reference order.
fn resource_targets_of(graph: &Graph, sub: &PlannedSubtree) -> Vec<Handle> {
    let mut out = Vec::new();
    for pe in &sub.entities {
        for target in pe.fields.iter().filter_map(FieldValue::as_ref_handle) {
            if sub.index_of.contains_key(&target) {
                continue;
            }
            if graph.kind_of(target).is_some_and(|k| k.is_resource()) && !out.contains(&target) {
                out.push(target);
            }
        }
    }
    out
}

fn apply(plan: &CopyPlan, dest: &mut Graph) -> Handle {
    let mut resolved: Vec<Option<Handle>> = vec![None; plan.resources.len()];
    instantiate_subtree(plan, &plan.root, dest, &mut resolved, None)
}

/// Create the subtree's entities in `dest` and fill their fields, resolving
/// references through the plan. When instantiating a planned resource its
/// memo slot is published before fields are filled so reference cycles
/// between resources terminate.
fn instantiate_subtree(
    plan: &CopyPlan,
    sub: &PlannedSubtree,
    dest: &mut Graph,
    resolved: &mut Vec<Option<Handle>>,
    memo_slot: Option<usize>,
) -> Handle {
    let mut new_handles = Vec::with_capacity(sub.entities.len());
    for pe in &sub.entities {
        let h = dest.add_object(pe.kind);
        if let Some(name) = &pe.name {
            dest.set_name(h, name.clone());
        }
        new_handles.push(h);
    }
    if let Some(slot) = memo_slot {
        resolved[slot] = Some(new_handles[0]);
    }
    for (i, pe) in sub.entities.iter().enumerate() {
        if let Some(p) = pe.parent {
            dest.adopt(new_handles[p], new_handles[i]);
        }
    }
    for (i, pe) in sub.entities.iter().enumerate() {
        let fixed_len = schema(pe.kind).fixed.len();
        for (fi, value) in pe.fields.iter().enumerate() {
            match value {
                FieldValue::Empty => {}
                FieldValue::Ref(target) => {
                    let new_target = if let Some(j) = sub.index_of.get(target) {
                        Some(new_handles[*j])
                    } else if let Some(r) = plan.resource_index.get(target) {
                        Some(resolve_resource(plan, *r, dest, resolved))
                    } else {
                        // placement or other outward reference: cleared
                        None
                    };
                    if let Some(nt) = new_target {
                        if fi < fixed_len {
                            dest.set_reference(new_handles[i], fi, nt);
                        } else {
                            dest.push_extensible_ref(new_handles[i], nt);
                        }
                    }
                }
                data => {
                    if fi < fixed_len {
                        dest.set_field(new_handles[i], fi, data.clone());
                    }
                }
            }
        }
    }
    new_handles[0]
}

/// Destination handle for a planned resource: a field-for-field-equal
/// destination resource if one exists (searched in document order),
/// otherwise a fresh clone, made at most once per call.
fn resolve_resource(
    plan: &CopyPlan,
    index: usize,
    dest: &mut Graph,
    resolved: &mut Vec<Option<Handle>>,
) -> Handle {
    if let Some(h) = resolved[index] {
        return h;
    }
    let sub = &plan.resources[index];
    for candidate in dest.objects_of_kind(sub.entities[0].kind) {
        let mut assumed = HashSet::new();
        if planned_equal(plan, sub, 0, dest, candidate, &mut assumed) {
            resolved[index] = Some(candidate);
            return candidate;
        }
    }
    instantiate_subtree(plan, sub, dest, resolved, Some(index))
}

/// Structural equality between a planned entity and a destination entity:
/// kind, name, data fields, then recursion through resource references and
/// owned children. `assumed` carries (source handle, destination handle)
/// pairs already on the comparison stack; revisiting one is coinductively
/// treated as equal so reference cycles terminate.
fn planned_equal(
    plan: &CopyPlan,
    sub: &PlannedSubtree,
    pe_idx: usize,
    dest: &Graph,
    dest_h: Handle,
    assumed: &mut HashSet<(Handle, Handle)>,
) -> bool {
    let pe = &sub.entities[pe_idx];
    if !assumed.insert((pe.src, dest_h)) {
        return true;
    }
    if dest.kind_of(dest_h) != Some(pe.kind) {
        return false;
    }
    if dest.name_of(dest_h) != pe.name.as_deref() {
        return false;
    }

    // Compare against what instantiating the plan would produce: outward
    // non-resource refs become Empty in fixed slots and vanish from the
    // extensible tail.
    let fixed_len = schema(pe.kind).fixed.len();
    let mut dest_i = 0;
    for (fi, value) in pe.fields.iter().enumerate() {
        let matched = match value {
            FieldValue::Ref(target) => {
                if let Some(j) = sub.index_of.get(target) {
                    match dest.field(dest_h, dest_i).and_then(FieldValue::as_ref_handle) {
                        Some(d) => planned_equal(plan, sub, *j, dest, d, assumed),
                        None => false,
                    }
                } else if let Some(r) = plan.resource_index.get(target) {
                    match dest.field(dest_h, dest_i).and_then(FieldValue::as_ref_handle) {
                        Some(d) => planned_equal(plan, &plan.resources[*r], 0, dest, d, assumed),
                        None => false,
                    }
                } else if fi < fixed_len {
                    dest.field(dest_h, dest_i) == Some(&FieldValue::Empty)
                } else {
                    // dropped extensible slot: consumes no destination field
                    continue;
                }
            }
            data => dest.field(dest_h, dest_i) == Some(data),
        };
        if !matched {
            return false;
        }
        dest_i += 1;
    }
    if dest.field_count(dest_h) != dest_i {
        return false;
    }

    // children, pairwise in adoption order
    let planned_children: Vec<usize> = sub
        .entities
        .iter()
        .enumerate()
        .filter(|(_, e)| e.parent == Some(pe_idx))
        .map(|(i, _)| i)
        .collect();
    let dest_children = dest.children(dest_h);
    if planned_children.len() != dest_children.len() {
        return false;
    }
    planned_children
        .iter()
        .zip(dest_children.iter())
        .all(|(p, d)| planned_equal(plan, sub, *p, dest, *d, assumed))
}
