//! Resource lifecycle: use counting, explicit purge, reachability.
//!
//! Resources are shared by reference and owned by nobody, so their lifetime
//! is governed by usage counts derived from the back-reference index. Nothing
//! here runs automatically: purging is an explicit, idempotent pass.

use std::collections::{BTreeSet, HashSet, VecDeque};

use hn_core::Handle;

use crate::graph::Graph;

/// Which back references participate in a use count.
///
/// Replaces a historical `excludeChildren` boolean; both semantics remain
/// because call sites depend on each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefScope {
    /// Count every distinct referencing entity.
    #[default]
    AllReferences,
    /// Skip referencing entities that are owned descendants of the resource
    /// itself (a child record pointing back at its owner is bookkeeping, not
    /// use).
    ExcludeOwningParent,
}

impl Graph {
    /// Distinct entities referencing `resource`.
    ///
    /// Returns 0 for dangling handles and for entities that are not
    /// resources.
    pub fn direct_use_count(&self, resource: Handle, scope: RefScope) -> usize {
        if !self
            .kind_of(resource)
            .is_some_and(|k| k.is_resource())
        {
            return 0;
        }
        self.back_references(resource)
            .into_iter()
            .filter(|source| self.counts_for(resource, *source, scope))
            .count()
    }

    /// Use count with resource referencers passed through.
    ///
    /// A referencing entity that is itself a resource contributes its own
    /// effective use count (recursively) instead of 1; non-resource
    /// referencers contribute 1 each. Reference cycles between resources
    /// contribute nothing on revisit.
    pub fn effective_use_count(&self, resource: Handle, scope: RefScope) -> usize {
        let mut visiting = HashSet::new();
        self.effective_use_count_inner(resource, scope, &mut visiting)
    }

    fn effective_use_count_inner(
        &self,
        resource: Handle,
        scope: RefScope,
        visiting: &mut HashSet<Handle>,
    ) -> usize {
        if !self
            .kind_of(resource)
            .is_some_and(|k| k.is_resource())
        {
            return 0;
        }
        if !visiting.insert(resource) {
            return 0;
        }
        let mut count = 0;
        for source in self.back_references(resource) {
            if !self.counts_for(resource, source, scope) {
                continue;
            }
            if self.kind_of(source).is_some_and(|k| k.is_resource()) {
                count += self.effective_use_count_inner(source, scope, visiting);
            } else {
                count += 1;
            }
        }
        visiting.remove(&resource);
        count
    }

    fn counts_for(&self, resource: Handle, source: Handle, scope: RefScope) -> bool {
        match scope {
            RefScope::AllReferences => true,
            RefScope::ExcludeOwningParent => !self.is_descendant_of(source, resource),
        }
    }

    /// Delete every resource with no remaining use, cascading transitively
    /// within this one pass: a resource that becomes unused only because
    /// another resource was just purged goes in the same call.
    ///
    /// Counts with [`RefScope::ExcludeOwningParent`] so a resource is not
    /// kept alive by its own children's back references. Idempotent: a second
    /// call with no intervening edits removes nothing. Returns the removed
    /// handles.
    pub fn purge_unused(&mut self) -> Vec<Handle> {
        let mut removed = Vec::new();
        loop {
            let unused: Vec<Handle> = self
                .objects()
                .iter()
                .copied()
                .filter(|h| {
                    self.kind_of(*h).is_some_and(|k| k.is_resource())
                        && self.direct_use_count(*h, RefScope::ExcludeOwningParent) == 0
                })
                .collect();
            if unused.is_empty() {
                break;
            }
            for handle in unused {
                // an earlier cascade in this round may have taken it already
                if self.contains(handle) {
                    removed.extend(self.remove_object(handle));
                }
            }
        }
        tracing::debug!(count = removed.len(), "purged unused resources");
        removed
    }

    /// Resources reachable from `root` over resource reference edges.
    ///
    /// Breadth-first and deduplicated by handle: an entity's edge set is the
    /// resources referenced by it or by anything in its owned subtree; from
    /// each reached resource the walk continues the same way. `root` itself
    /// is not part of the result.
    pub fn collect_reachable_resources(&self, root: Handle) -> Vec<Handle> {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(root);
        seen.insert(root);
        while let Some(current) = queue.pop_front() {
            for member in self.subtree(current) {
                for target in self.forward_references(member) {
                    if self.kind_of(target).is_some_and(|k| k.is_resource())
                        && seen.insert(target)
                    {
                        out.push(target);
                        queue.push_back(target);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::FieldValue;
    use hn_core::Kind;

    #[test]
    fn direct_count_is_distinct_sources() {
        let mut g = Graph::new();
        let schedule = g.add_object(Kind::Schedule);
        let coil = g.add_object(Kind::CoilHeating);
        let pump = g.add_object(Kind::Pump);
        g.set_field_named(coil, "Availability Schedule", FieldValue::Ref(schedule));
        g.set_field_named(pump, "Availability Schedule", FieldValue::Ref(schedule));
        assert_eq!(g.direct_use_count(schedule, RefScope::AllReferences), 2);

        // non-resources always count 0
        assert_eq!(g.direct_use_count(pump, RefScope::AllReferences), 0);
    }

    #[test]
    fn effective_count_passes_through_resources() {
        let mut g = Graph::new();
        let material = g.add_object(Kind::Material);
        let construction = g.add_object(Kind::Construction);
        g.push_extensible_ref(construction, material);

        // construction unused: the material has a direct user but no
        // effective one
        assert_eq!(g.direct_use_count(material, RefScope::AllReferences), 1);
        assert_eq!(g.effective_use_count(material, RefScope::AllReferences), 0);

        // three non-resource users of the construction flow through
        for _ in 0..3 {
            let info = g.add_object(Kind::StandardsInformation);
            g.set_field_named(info, "Construction", FieldValue::Ref(construction));
        }
        assert_eq!(g.effective_use_count(material, RefScope::AllReferences), 3);
        assert_eq!(g.direct_use_count(material, RefScope::AllReferences), 1);
    }

    #[test]
    fn own_child_back_reference_is_scoped_out() {
        let mut g = Graph::new();
        let construction = g.add_object(Kind::Construction);
        let info = g.add_object(Kind::StandardsInformation);
        g.adopt(construction, info);
        g.set_field_named(info, "Construction", FieldValue::Ref(construction));

        assert_eq!(
            g.direct_use_count(construction, RefScope::AllReferences),
            1
        );
        assert_eq!(
            g.direct_use_count(construction, RefScope::ExcludeOwningParent),
            0
        );
    }

    #[test]
    fn purge_cascades_in_one_pass() {
        let mut g = Graph::new();
        let material = g.add_object(Kind::Material);
        let construction = g.add_object(Kind::Construction);
        g.push_extensible_ref(construction, material);

        // construction unused -> goes; material then unused -> same pass
        let removed = g.purge_unused();
        assert_eq!(removed.len(), 2);
        assert!(!g.contains(construction));
        assert!(!g.contains(material));

        // idempotent
        assert!(g.purge_unused().is_empty());
    }

    #[test]
    fn purge_keeps_used_resources() {
        let mut g = Graph::new();
        let curve = g.add_object(Kind::Curve);
        let pump = g.add_object(Kind::Pump);
        g.set_field_named(pump, "Pump Curve", FieldValue::Ref(curve));

        assert!(g.purge_unused().is_empty());
        assert!(g.contains(curve));
    }

    #[test]
    fn reachable_resources_bfs_dedup() {
        let mut g = Graph::new();
        let material = g.add_object(Kind::Material);
        let c1 = g.add_object(Kind::Construction);
        let c2 = g.add_object(Kind::Construction);
        g.push_extensible_ref(c1, material);
        g.push_extensible_ref(c2, material);

        let info = g.add_object(Kind::StandardsInformation);
        let root = g.add_object(Kind::Pump);
        let curve = g.add_object(Kind::Curve);
        g.set_field_named(root, "Pump Curve", FieldValue::Ref(curve));
        g.adopt(root, info);
        // the child references a construction; subtree edges count
        g.set_field_named(info, "Construction", FieldValue::Ref(c1));

        let reached = g.collect_reachable_resources(root);
        assert_eq!(reached, vec![curve, c1, material]);
        assert!(!reached.contains(&c2));
    }
}
