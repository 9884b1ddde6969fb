//! The object graph: entity registry, references, ownership, ports.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use hn_core::{FieldIndex, Handle, Kind, PortIndex};

use crate::entity::{EntityRecord, FieldValue, PortEnd};
use crate::schema::schema;

/// A mutable graph of entities.
///
/// The graph owns every entity, assigns stable never-reused handles, and
/// maintains the reverse-reference index alongside every field write so
/// back-reference queries and use counting stay O(sources).
///
/// Structural edits are plain synchronous calls; legality questions return
/// booleans and a failed call leaves the graph untouched. Lookups of removed
/// or unknown handles resolve to `None`.
#[derive(Debug, Default)]
pub struct Graph {
    entities: HashMap<Handle, EntityRecord>,
    /// Stable document order for enumeration and deterministic traversal.
    order: Vec<Handle>,
    /// target -> source -> number of referencing field slots.
    back_refs: HashMap<Handle, BTreeMap<Handle, usize>>,
    next_raw: u64,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the graph holds no entities.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // ---------------------------------------------------------------- create

    /// Add a new entity of `kind`, returning its handle.
    ///
    /// Fields start empty at the kind's fixed schema length.
    pub fn add_object(&mut self, kind: Kind) -> Handle {
        self.next_raw += 1;
        let handle = Handle::from_raw(self.next_raw).expect("counter starts at 1");
        let record = EntityRecord::new(kind, schema(kind).fixed.len());
        self.entities.insert(handle, record);
        self.order.push(handle);
        handle
    }

    /// Add a new named entity of `kind`.
    pub fn add_object_named(&mut self, kind: Kind, name: impl Into<String>) -> Handle {
        let handle = self.add_object(kind);
        self.record_mut(handle).name = Some(name.into());
        handle
    }

    // ---------------------------------------------------------------- lookup

    /// Whether `handle` resolves to a live entity.
    pub fn contains(&self, handle: Handle) -> bool {
        self.entities.contains_key(&handle)
    }

    /// Kind of a live entity (`None` for dangling handles).
    pub fn kind_of(&self, handle: Handle) -> Option<Kind> {
        self.entities.get(&handle).map(|r| r.kind)
    }

    /// Name of a live entity, if set.
    pub fn name_of(&self, handle: Handle) -> Option<&str> {
        self.entities.get(&handle)?.name.as_deref()
    }

    /// Rename an entity. Returns false for dangling handles.
    pub fn set_name(&mut self, handle: Handle, name: impl Into<String>) -> bool {
        match self.entities.get_mut(&handle) {
            Some(record) => {
                record.name = Some(name.into());
                true
            }
            None => false,
        }
    }

    /// All live handles in stable document (insertion) order.
    pub fn objects(&self) -> &[Handle] {
        &self.order
    }

    /// Live handles of one kind, in document order.
    pub fn objects_of_kind(&self, kind: Kind) -> Vec<Handle> {
        self.order
            .iter()
            .copied()
            .filter(|h| self.kind_of(*h) == Some(kind))
            .collect()
    }

    fn record(&self, handle: Handle) -> &EntityRecord {
        self.entities.get(&handle).expect("live handle")
    }

    fn record_mut(&mut self, handle: Handle) -> &mut EntityRecord {
        self.entities.get_mut(&handle).expect("live handle")
    }

    // ---------------------------------------------------------------- fields

    /// Read a field by index (fixed or extensible region).
    pub fn field(&self, handle: Handle, index: FieldIndex) -> Option<&FieldValue> {
        self.entities.get(&handle)?.fields.get(index)
    }

    /// Total stored fields: fixed schema prefix plus extensible tail.
    pub fn field_count(&self, handle: Handle) -> usize {
        match self.entities.get(&handle) {
            Some(record) => record.fields.len(),
            None => 0,
        }
    }

    /// Read a fixed field by schema name.
    pub fn field_named(&self, handle: Handle, name: &str) -> Option<&FieldValue> {
        let kind = self.kind_of(handle)?;
        let index = schema(kind).field_index(name)?;
        self.field(handle, index)
    }

    /// Write a fixed field, type-checked against the schema.
    ///
    /// Fails (returning false, mutating nothing) for dangling handles,
    /// out-of-range indices, type mismatches, negative values in
    /// non-negative slots, and `Ref` values whose target is not live in this
    /// graph.
    pub fn set_field(&mut self, handle: Handle, index: FieldIndex, value: FieldValue) -> bool {
        let Some(kind) = self.kind_of(handle) else {
            return false;
        };
        let fixed = schema(kind).fixed;
        let Some(spec) = fixed.get(index) else {
            return false;
        };
        if !spec.accepts(&value) {
            return false;
        }
        if let FieldValue::Ref(target) = value {
            if !self.contains(target) {
                return false;
            }
        }

        let old = std::mem::replace(&mut self.record_mut(handle).fields[index], value);
        if let FieldValue::Ref(old_target) = old {
            self.note_ref_removed(handle, old_target);
        }
        if let Some(FieldValue::Ref(new_target)) = self.field(handle, index).cloned() {
            self.note_ref_added(handle, new_target);
        }
        true
    }

    /// Write a fixed field by schema name.
    pub fn set_field_named(&mut self, handle: Handle, name: &str, value: FieldValue) -> bool {
        let Some(kind) = self.kind_of(handle) else {
            return false;
        };
        match schema(kind).field_index(name) {
            Some(index) => self.set_field(handle, index, value),
            None => false,
        }
    }

    /// Point a fixed `Ref` field at `target`.
    pub fn set_reference(&mut self, handle: Handle, index: FieldIndex, target: Handle) -> bool {
        self.set_field(handle, index, FieldValue::Ref(target))
    }

    /// Clear a fixed field back to `Empty`.
    pub fn clear_field(&mut self, handle: Handle, index: FieldIndex) -> bool {
        self.set_field(handle, index, FieldValue::Empty)
    }

    /// Handle stored in a fixed `Ref` field, if the field is set and live.
    pub fn reference(&self, handle: Handle, index: FieldIndex) -> Option<Handle> {
        self.field(handle, index)?.as_ref_handle()
    }

    // ------------------------------------------------------------ extensible

    fn fixed_len(&self, handle: Handle) -> Option<usize> {
        Some(schema(self.kind_of(handle)?).fixed.len())
    }

    /// Number of occupied extensible slots.
    pub fn extensible_len(&self, handle: Handle) -> usize {
        match self.fixed_len(handle) {
            Some(fixed) => self.record(handle).fields.len() - fixed,
            None => 0,
        }
    }

    /// The extensible tail as reference handles, in order.
    ///
    /// Only reference-typed extensible schemas exist in this vocabulary.
    pub fn extensible_refs(&self, handle: Handle) -> Vec<Handle> {
        let Some(fixed) = self.fixed_len(handle) else {
            return Vec::new();
        };
        self.record(handle).fields[fixed..]
            .iter()
            .filter_map(FieldValue::as_ref_handle)
            .collect()
    }

    /// Append a reference to the extensible tail.
    pub fn push_extensible_ref(&mut self, handle: Handle, target: Handle) -> bool {
        let len = self.extensible_len(handle);
        self.insert_extensible_ref(handle, len, target)
    }

    /// Insert a reference at 0-based `position` in the extensible tail,
    /// shifting later slots. Fails unless the kind declares an extensible
    /// reference field, `position <= len`, and `target` is live.
    pub fn insert_extensible_ref(
        &mut self,
        handle: Handle,
        position: usize,
        target: Handle,
    ) -> bool {
        let Some(kind) = self.kind_of(handle) else {
            return false;
        };
        let Some(spec) = schema(kind).extensible else {
            return false;
        };
        if !spec.accepts(&FieldValue::Ref(target)) || !self.contains(target) {
            return false;
        }
        let fixed = schema(kind).fixed.len();
        let len = self.record(handle).fields.len() - fixed;
        if position > len {
            return false;
        }
        self.record_mut(handle)
            .fields
            .insert(fixed + position, FieldValue::Ref(target));
        self.note_ref_added(handle, target);
        true
    }

    /// Remove the extensible slot at `position`, splicing the tail so no
    /// hole remains. Returns the handle that occupied the slot.
    pub fn remove_extensible(&mut self, handle: Handle, position: usize) -> Option<Handle> {
        let fixed = self.fixed_len(handle)?;
        let len = self.record(handle).fields.len() - fixed;
        if position >= len {
            return None;
        }
        let removed = self.record_mut(handle).fields.remove(fixed + position);
        let target = removed.as_ref_handle()?;
        self.note_ref_removed(handle, target);
        Some(target)
    }

    // ------------------------------------------------------------ references

    fn note_ref_added(&mut self, source: Handle, target: Handle) {
        *self
            .back_refs
            .entry(target)
            .or_default()
            .entry(source)
            .or_insert(0) += 1;
    }

    fn note_ref_removed(&mut self, source: Handle, target: Handle) {
        if let Some(sources) = self.back_refs.get_mut(&target) {
            if let Some(count) = sources.get_mut(&source) {
                *count -= 1;
                if *count == 0 {
                    sources.remove(&source);
                }
            }
            if sources.is_empty() {
                self.back_refs.remove(&target);
            }
        }
    }

    /// Handles this entity's `Ref` fields point at (ordered, deduplicated).
    pub fn forward_references(&self, handle: Handle) -> BTreeSet<Handle> {
        match self.entities.get(&handle) {
            Some(record) => record.ref_targets().collect(),
            None => BTreeSet::new(),
        }
    }

    /// Handles whose `Ref` fields point at this entity (ordered,
    /// deduplicated).
    pub fn back_references(&self, handle: Handle) -> BTreeSet<Handle> {
        match self.back_refs.get(&handle) {
            Some(sources) => sources.keys().copied().collect(),
            None => BTreeSet::new(),
        }
    }

    // ------------------------------------------------------------- ownership

    /// Parent of an owned entity.
    pub fn parent(&self, handle: Handle) -> Option<Handle> {
        self.entities.get(&handle)?.parent
    }

    /// Owned children, in adoption order.
    pub fn children(&self, handle: Handle) -> Vec<Handle> {
        match self.entities.get(&handle) {
            Some(record) => record.children.clone(),
            None => Vec::new(),
        }
    }

    /// Make `child` an owned child of `parent`, destroyed with it.
    ///
    /// Fails if either is dangling, `child` already has a parent, `child`
    /// is a resource (resources are shared, never owned), or adoption would
    /// create an ownership cycle.
    pub fn adopt(&mut self, parent: Handle, child: Handle) -> bool {
        if !self.contains(parent) || !self.contains(child) || parent == child {
            return false;
        }
        if self.record(child).parent.is_some() {
            return false;
        }
        if self.record(child).kind.is_resource() {
            return false;
        }
        if self.is_descendant_of(parent, child) {
            return false;
        }
        self.record_mut(child).parent = Some(parent);
        self.record_mut(parent).children.push(child);
        true
    }

    /// Detach `child` from its parent without removing it.
    pub fn orphan(&mut self, child: Handle) -> bool {
        let Some(parent) = self.parent(child) else {
            return false;
        };
        self.record_mut(parent).children.retain(|c| *c != child);
        self.record_mut(child).parent = None;
        true
    }

    /// Whether `handle` sits in the ownership subtree rooted at `ancestor`
    /// (the root itself does not count).
    pub fn is_descendant_of(&self, handle: Handle, ancestor: Handle) -> bool {
        let mut cursor = self.parent(handle);
        while let Some(p) = cursor {
            if p == ancestor {
                return true;
            }
            cursor = self.parent(p);
        }
        false
    }

    /// The ownership subtree rooted at `handle`, depth-first pre-order
    /// (root first).
    pub fn subtree(&self, handle: Handle) -> Vec<Handle> {
        let mut out = Vec::new();
        let mut stack = vec![handle];
        while let Some(h) = stack.pop() {
            if !self.contains(h) {
                continue;
            }
            out.push(h);
            // reversed so children pop in adoption order
            for child in self.record(h).children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    // ----------------------------------------------------------------- ports

    /// Number of port slots currently allocated on an entity.
    pub fn port_count(&self, handle: Handle) -> usize {
        match self.entities.get(&handle) {
            Some(record) => record.ports.len(),
            None => 0,
        }
    }

    /// The far end connected to `(handle, port)`, if occupied.
    pub fn occupant(&self, handle: Handle, port: PortIndex) -> Option<PortEnd> {
        self.entities.get(&handle)?.ports.get(port).copied()?
    }

    /// First unoccupied port index at or after `start`.
    pub fn first_free_port_from(&self, handle: Handle, start: PortIndex) -> PortIndex {
        let Some(record) = self.entities.get(&handle) else {
            return start;
        };
        (start..record.ports.len())
            .find(|p| record.ports[*p].is_none())
            .unwrap_or(record.ports.len().max(start))
    }

    /// Occupy two ports with each other. Fails if either entity is dangling
    /// or either port already has an occupant; on failure nothing changes.
    ///
    /// This is the raw primitive; the loop layer's `wiring::connect` adds the
    /// node-mediation rule and is what callers normally want.
    pub fn attach_ports(
        &mut self,
        a: Handle,
        port_a: PortIndex,
        b: Handle,
        port_b: PortIndex,
    ) -> bool {
        if !self.contains(a) || !self.contains(b) {
            return false;
        }
        if a == b {
            return false;
        }
        if self.occupant(a, port_a).is_some() || self.occupant(b, port_b).is_some() {
            return false;
        }
        self.ensure_port(a, port_a);
        self.ensure_port(b, port_b);
        self.record_mut(a).ports[port_a] = Some(PortEnd {
            entity: b,
            port: port_b,
        });
        self.record_mut(b).ports[port_b] = Some(PortEnd {
            entity: a,
            port: port_a,
        });
        true
    }

    /// Clear a port and its mirror on the far end.
    pub fn detach_port(&mut self, handle: Handle, port: PortIndex) -> bool {
        let Some(far) = self.occupant(handle, port) else {
            return false;
        };
        self.record_mut(handle).ports[port] = None;
        if let Some(record) = self.entities.get_mut(&far.entity) {
            if let Some(slot) = record.ports.get_mut(far.port) {
                *slot = None;
            }
        }
        true
    }

    fn ensure_port(&mut self, handle: Handle, port: PortIndex) {
        let ports = &mut self.record_mut(handle).ports;
        if ports.len() <= port {
            ports.resize(port + 1, None);
        }
    }

    /// Splice unoccupied port slots at or after `start` out of an entity's
    /// port list, shifting later occupants down and fixing their mirrored
    /// indices. Keeps splitter/mixer branch ports dense after a removal.
    pub fn compact_ports_from(&mut self, handle: Handle, start: PortIndex) {
        if !self.contains(handle) {
            return;
        }
        let mut write = start;
        for read in start..self.record(handle).ports.len() {
            if let Some(end) = self.record(handle).ports[read] {
                if read != write {
                    self.record_mut(handle).ports[read] = None;
                    self.record_mut(handle).ports[write] = Some(end);
                    // fix the mirror
                    if let Some(far) = self.entities.get_mut(&end.entity) {
                        if let Some(slot) = far.ports.get_mut(end.port) {
                            *slot = Some(PortEnd {
                                entity: handle,
                                port: write,
                            });
                        }
                    }
                }
                write += 1;
            }
        }
        self.record_mut(handle).ports.truncate(write);
    }

    // --------------------------------------------------------------- removal

    /// Remove an entity, cascading depth-first into its owned children.
    ///
    /// All ports are detached; every surviving reference to a removed entity
    /// is cleared (fixed fields) or spliced out (extensible slots), so later
    /// lookups of the removed handles resolve to `None` and no dense list is
    /// left with a hole. Returns the removed handles, children first.
    pub fn remove_object(&mut self, handle: Handle) -> Vec<Handle> {
        if !self.contains(handle) {
            return Vec::new();
        }
        // post-order: children before their parents
        let mut doomed = self.subtree(handle);
        doomed.reverse();

        // detach from an owning parent outside the doomed set
        if let Some(parent) = self.parent(handle) {
            self.record_mut(parent).children.retain(|c| *c != handle);
        }

        for h in &doomed {
            let h = *h;
            // ports
            for port in 0..self.port_count(h) {
                self.detach_port(h, port);
            }
            // incoming references
            let sources: Vec<Handle> = self.back_references(h).into_iter().collect();
            for source in sources {
                self.clear_references_to(source, h);
            }
            // outgoing references
            let targets: Vec<Handle> = self.record(h).ref_targets().collect();
            for target in targets {
                self.note_ref_removed(h, target);
            }
            self.entities.remove(&h);
        }
        let removed: std::collections::HashSet<Handle> = doomed.iter().copied().collect();
        self.order.retain(|h| !removed.contains(h));
        tracing::debug!(root = %handle, count = doomed.len(), "removed object cascade");
        doomed
    }

    /// Drop every reference `source` holds to `target`: fixed fields become
    /// `Empty`, extensible slots are spliced out.
    fn clear_references_to(&mut self, source: Handle, target: Handle) {
        let Some(kind) = self.kind_of(source) else {
            return;
        };
        let fixed = schema(kind).fixed.len();
        let record = self.record_mut(source);
        let mut removed_slots = 0usize;
        let mut index = 0usize;
        while index < record.fields.len() {
            if record.fields[index].as_ref_handle() == Some(target) {
                if index < fixed {
                    record.fields[index] = FieldValue::Empty;
                    index += 1;
                } else {
                    record.fields.remove(index);
                }
                removed_slots += 1;
            } else {
                index += 1;
            }
        }
        for _ in 0..removed_slots {
            self.note_ref_removed(source, target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_lookup() {
        let mut g = Graph::new();
        let pump = g.add_object_named(Kind::Pump, "CHW Pump");
        assert!(g.contains(pump));
        assert_eq!(g.kind_of(pump), Some(Kind::Pump));
        assert_eq!(g.name_of(pump), Some("CHW Pump"));
        assert_eq!(g.objects(), &[pump]);

        let dangling = Handle::from_raw(999).unwrap();
        assert_eq!(g.kind_of(dangling), None);
        assert_eq!(g.name_of(dangling), None);
    }

    #[test]
    fn handles_are_never_reused() {
        let mut g = Graph::new();
        let a = g.add_object(Kind::Pipe);
        g.remove_object(a);
        let b = g.add_object(Kind::Pipe);
        assert_ne!(a, b);
        assert!(!g.contains(a));
    }

    #[test]
    fn field_type_checks() {
        let mut g = Graph::new();
        let pump = g.add_object(Kind::Pump);
        assert!(g.set_field_named(pump, "Rated Flow Rate", FieldValue::Double(0.05)));
        // negative write rejected on a non-negative slot
        assert!(!g.set_field_named(pump, "Rated Flow Rate", FieldValue::Double(-1.0)));
        assert_eq!(
            g.field_named(pump, "Rated Flow Rate"),
            Some(&FieldValue::Double(0.05))
        );
        // wrong type rejected
        assert!(!g.set_field_named(pump, "Rated Flow Rate", FieldValue::Str("big".into())));
    }

    #[test]
    fn reference_fields_maintain_back_refs() {
        let mut g = Graph::new();
        let curve = g.add_object(Kind::Curve);
        let pump = g.add_object(Kind::Pump);
        assert!(g.set_field_named(pump, "Pump Curve", FieldValue::Ref(curve)));

        assert!(g.forward_references(pump).contains(&curve));
        assert!(g.back_references(curve).contains(&pump));

        assert!(g.set_field_named(pump, "Pump Curve", FieldValue::Empty));
        assert!(g.back_references(curve).is_empty());
    }

    #[test]
    fn dangling_ref_write_rejected() {
        let mut g = Graph::new();
        let pump = g.add_object(Kind::Pump);
        let ghost = Handle::from_raw(404).unwrap();
        assert!(!g.set_field_named(pump, "Pump Curve", FieldValue::Ref(ghost)));
    }

    #[test]
    fn extensible_tail_splices() {
        let mut g = Graph::new();
        let c = g.add_object(Kind::Construction);
        let m1 = g.add_object(Kind::Material);
        let m2 = g.add_object(Kind::Material);
        let m3 = g.add_object(Kind::Material);
        assert!(g.push_extensible_ref(c, m1));
        assert!(g.push_extensible_ref(c, m3));
        assert!(g.insert_extensible_ref(c, 1, m2));
        assert_eq!(g.extensible_refs(c), vec![m1, m2, m3]);

        assert_eq!(g.remove_extensible(c, 1), Some(m2));
        assert_eq!(g.extensible_refs(c), vec![m1, m3]);
        assert!(g.back_references(m2).is_empty());

        // a pump has no extensible tail
        let pump = g.add_object(Kind::Pump);
        assert!(!g.push_extensible_ref(pump, m1));
    }

    #[test]
    fn adopt_and_cascade_remove() {
        let mut g = Graph::new();
        let construction = g.add_object(Kind::Construction);
        let info = g.add_object(Kind::StandardsInformation);
        assert!(g.adopt(construction, info));
        assert_eq!(g.parent(info), Some(construction));
        assert_eq!(g.children(construction), vec![info]);

        // resources can't be owned
        let material = g.add_object(Kind::Material);
        assert!(!g.adopt(construction, material));

        let removed = g.remove_object(construction);
        assert_eq!(removed, vec![info, construction]);
        assert!(!g.contains(info));
    }

    #[test]
    fn removal_clears_incoming_references() {
        let mut g = Graph::new();
        let curve = g.add_object(Kind::Curve);
        let pump = g.add_object(Kind::Pump);
        g.set_field_named(pump, "Pump Curve", FieldValue::Ref(curve));

        g.remove_object(curve);
        assert_eq!(g.field_named(pump, "Pump Curve"), Some(&FieldValue::Empty));
        assert!(g.forward_references(pump).is_empty());
    }

    #[test]
    fn removal_splices_extensible_references() {
        let mut g = Graph::new();
        let c = g.add_object(Kind::Construction);
        let m1 = g.add_object(Kind::Material);
        let m2 = g.add_object(Kind::Material);
        g.push_extensible_ref(c, m1);
        g.push_extensible_ref(c, m2);

        g.remove_object(m1);
        // no hole: m2 moved down
        assert_eq!(g.extensible_refs(c), vec![m2]);
        assert_eq!(g.extensible_len(c), 1);
    }

    #[test]
    fn ports_attach_detach() {
        let mut g = Graph::new();
        let pump = g.add_object(Kind::Pump);
        let node = g.add_object(Kind::Node);
        assert!(g.attach_ports(pump, 1, node, 0));
        assert_eq!(
            g.occupant(pump, 1),
            Some(PortEnd {
                entity: node,
                port: 0
            })
        );
        // occupied ports refuse a second connection
        let other = g.add_object(Kind::Node);
        assert!(!g.attach_ports(pump, 1, other, 0));

        assert!(g.detach_port(node, 0));
        assert_eq!(g.occupant(pump, 1), None);
        assert_eq!(g.occupant(node, 0), None);
    }

    #[test]
    fn port_compaction_fixes_mirrors() {
        let mut g = Graph::new();
        let splitter = g.add_object(Kind::Splitter);
        let n1 = g.add_object(Kind::Node);
        let n2 = g.add_object(Kind::Node);
        let n3 = g.add_object(Kind::Node);
        assert!(g.attach_ports(splitter, 1, n1, 0));
        assert!(g.attach_ports(splitter, 2, n2, 0));
        assert!(g.attach_ports(splitter, 3, n3, 0));

        g.detach_port(splitter, 2);
        g.compact_ports_from(splitter, 1);
        assert_eq!(g.port_count(splitter), 3);
        assert_eq!(g.occupant(splitter, 2).unwrap().entity, n3);
        // the moved node's mirror now points at port 2
        assert_eq!(g.occupant(n3, 0).unwrap().port, 2);
    }
}
