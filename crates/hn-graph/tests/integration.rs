//! Integration tests for hn-graph: lifecycle, use counts, clone scenarios.

use hn_core::{Handle, Kind};
use hn_graph::{FieldValue, Graph, RefScope};

/// Build the three-object fixture: a Construction owning one
/// StandardsInformation child and referencing one shared Material.
fn construction_fixture(g: &mut Graph) -> (Handle, Handle, Handle) {
    let material = g.add_object_named(Kind::Material, "Brick");
    g.set_field_named(material, "Thickness", FieldValue::Double(0.1));
    g.set_field_named(material, "Conductivity", FieldValue::Double(0.6));

    let construction = g.add_object_named(Kind::Construction, "Exterior Wall");
    g.push_extensible_ref(construction, material);

    let info = g.add_object_named(Kind::StandardsInformation, "Exterior Wall Standards");
    g.adopt(construction, info);
    g.set_field_named(info, "Construction", FieldValue::Ref(construction));

    (construction, info, material)
}

#[test]
fn worked_clone_scenario() {
    // M1: 3 objects
    let mut m1 = Graph::new();
    let (construction, _info, _material) = construction_fixture(&mut m1);
    assert_eq!(m1.len(), 3);

    // Clone into the same model: StandardsInformation duplicated (now 2),
    // Material reused (still 1) -> 5 objects total.
    m1.clone_object(construction).unwrap();
    assert_eq!(m1.len(), 5);
    assert_eq!(m1.objects_of_kind(Kind::StandardsInformation).len(), 2);
    assert_eq!(m1.objects_of_kind(Kind::Material).len(), 1);

    // Clone into a fresh empty model: 3 objects result.
    let mut m2 = Graph::new();
    let c_in_m2 = m1.clone_object_into(construction, &mut m2).unwrap();
    assert_eq!(m2.len(), 3);

    // Clone again into M2 unchanged: Material reused, 3 -> 5.
    m1.clone_object_into(construction, &mut m2).unwrap();
    assert_eq!(m2.len(), 5);
    assert_eq!(m2.objects_of_kind(Kind::Material).len(), 1);

    // Mutate the Material in M2, clone a third time: new Material, 5 -> 8.
    let m2_material = m2.extensible_refs(c_in_m2)[0];
    m2.set_field_named(m2_material, "Thickness", FieldValue::Double(0.3));
    m1.clone_object_into(construction, &mut m2).unwrap();
    assert_eq!(m2.len(), 8);
    assert_eq!(m2.objects_of_kind(Kind::Material).len(), 2);
}

#[test]
fn clone_round_trip_into_fresh_graph() {
    let mut m1 = Graph::new();
    let (construction, info, material) = construction_fixture(&mut m1);

    let mut m2 = Graph::new();
    let c2 = m1.clone_object_into(construction, &mut m2).unwrap();

    // new handles, same shape
    assert_eq!(m2.children(c2).len(), 1);
    let info2 = m2.children(c2)[0];
    assert_ne!(info2, info);
    assert_eq!(m2.kind_of(info2), Some(Kind::StandardsInformation));

    // field-equal resource values under fresh handles
    let material2 = m2.extensible_refs(c2)[0];
    assert_ne!(material2, material);
    assert_eq!(
        m2.field_named(material2, "Thickness"),
        Some(&FieldValue::Double(0.1))
    );
    assert_eq!(
        m2.field_named(material2, "Conductivity"),
        Some(&FieldValue::Double(0.6))
    );
}

#[test]
fn effective_count_tracks_consumer_replacement() {
    // Replacing a single non-resource consumer of R with a resource consumer
    // that itself has k non-resource consumers moves effectiveUseCount(R)
    // from 1 to k while directUseCount(R) stays 1.
    let mut g = Graph::new();
    let r = g.add_object_named(Kind::Material, "R");

    // one non-resource consumer referencing R directly
    let consumer = g.add_object(Kind::StandardsInformation);
    g.set_field_named(consumer, "Construction", FieldValue::Ref(r));
    assert_eq!(g.direct_use_count(r, RefScope::AllReferences), 1);
    assert_eq!(g.effective_use_count(r, RefScope::AllReferences), 1);

    // swap the consumer for a resource (a construction layering R) with
    // k = 3 non-resource consumers of its own
    g.set_field_named(consumer, "Construction", FieldValue::Empty);
    g.remove_object(consumer);
    let via = g.add_object_named(Kind::Construction, "Via");
    g.push_extensible_ref(via, r);
    for _ in 0..3 {
        let user = g.add_object(Kind::StandardsInformation);
        g.set_field_named(user, "Construction", FieldValue::Ref(via));
    }

    assert_eq!(g.direct_use_count(r, RefScope::AllReferences), 1);
    assert_eq!(g.effective_use_count(r, RefScope::AllReferences), 3);
}

#[test]
fn purge_is_idempotent_and_transitive() {
    let mut g = Graph::new();
    let (construction, _info, material) = construction_fixture(&mut g);

    // a second, used material survives
    let used = g.add_object_named(Kind::Material, "Plaster");
    let wall2 = g.add_object_named(Kind::Construction, "Interior Wall");
    g.push_extensible_ref(wall2, used);
    let user = g.add_object(Kind::StandardsInformation);
    g.set_field_named(user, "Construction", FieldValue::Ref(wall2));

    let removed = g.purge_unused();
    // unused construction + its owned child + the brick it alone referenced
    assert_eq!(removed.len(), 3);
    assert!(!g.contains(construction));
    assert!(!g.contains(material));
    assert!(g.contains(wall2));
    assert!(g.contains(used));

    // second call with no edits removes nothing
    assert!(g.purge_unused().is_empty());
}

#[test]
fn dangling_lookups_resolve_to_none() {
    let mut g = Graph::new();
    let pump = g.add_object(Kind::Pump);
    let curve = g.add_object(Kind::Curve);
    g.set_field_named(pump, "Pump Curve", FieldValue::Ref(curve));

    g.remove_object(curve);
    assert_eq!(g.kind_of(curve), None);
    assert_eq!(g.field_named(pump, "Pump Curve"), Some(&FieldValue::Empty));
    assert!(g.forward_references(pump).is_empty());
    assert!(g.back_references(curve).is_empty());
    assert!(g.snapshot_object(curve).is_none());
}

#[test]
fn deletion_cascades_depth_first() {
    let mut g = Graph::new();
    let root = g.add_object_named(Kind::Construction, "Root");
    let child = g.add_object(Kind::StandardsInformation);
    g.adopt(root, child);

    // a resource referenced by the child is untouched by the cascade
    let material = g.add_object(Kind::Material);
    g.push_extensible_ref(root, material);

    let removed = g.remove_object(root);
    assert_eq!(removed, vec![child, root]);
    assert!(g.contains(material));
    assert_eq!(g.len(), 1);
}
