//! Tests for mudlark-core: containment, topology, social edges, deletion, serialization

use mudlark_core::*;

fn container() -> ObjectData {
    ObjectData {
        is_container: true,
        is_gettable: true,
        ..Default::default()
    }
}

/// Two connected rooms and an agent carrying a sword and a hat, still
/// under construction.
fn small_world_builder() -> (GraphBuilder, NodeId, NodeId, NodeId, NodeId) {
    let mut b = GraphBuilder::new();
    let hall = b.room("hall", "A long hall.", GridLocation::new(0, 0, 0)).unwrap();
    let yard = b.room("yard", "A muddy yard.", GridLocation::new(0, -1, 0)).unwrap();
    b.connect(&hall, &yard, "the south", "the north").unwrap();
    let bob = b.agent("bob", "A farmer.", AgentData::default(), &hall).unwrap();
    b.object(
        "sword",
        "Sharp.",
        ObjectData { is_gettable: true, is_weapon: true, ..Default::default() },
        &bob,
    )
    .unwrap();
    let hat = b
        .object(
            "hat",
            "Floppy.",
            ObjectData { is_gettable: true, is_wearable: true, ..Default::default() },
            &bob,
        )
        .unwrap();
    (b, hall, yard, bob, hat)
}

/// `small_world_builder` finished, with the hat worn.
fn small_world() -> (Graph, NodeId, NodeId, NodeId) {
    let (b, hall, yard, bob, hat) = small_world_builder();
    let mut g = b.finish().unwrap();
    g.object_mut(&hat).unwrap().equipped = Some(EquipSlot::Worn);
    (g, hall, yard, bob)
}

// ===========================================================================
// Containment
// ===========================================================================

#[test]
fn get_room_walks_to_enclosing_room() {
    let (g, hall, _, bob) = small_world();
    let sword = g.find_in(g.node(&bob).unwrap().contained_nodes.keys(), "sword").unwrap();
    assert_eq!(g.get_room(&sword).unwrap(), Some(hall.clone()));
    assert_eq!(g.get_room(&bob).unwrap(), Some(hall));
}

#[test]
fn get_room_returns_none_in_the_void() {
    let mut g = Graph::new();
    let pebble = g.add_object("pebble", "", ObjectData::default());
    assert_eq!(g.get_room(&pebble).unwrap(), None);
    assert_eq!(g.get_room(&void_id()).unwrap(), None);
}

#[test]
fn get_room_terminates_on_self_loop() {
    let mut g = Graph::new();
    let bag = g.add_object("bag", "", container());
    g.node_mut(&bag).unwrap().container_node = Some(Edge::to(&bag));
    let err = g.get_room(&bag).unwrap_err();
    assert!(err.is_invariant());
}

#[test]
fn capacity_invariant_holds_over_operation_sequences() {
    let mut g = Graph::new();
    let chest = g.add_object("chest", "", container());
    let initial = g.node(&chest).unwrap().contain_size;
    let items: Vec<NodeId> = (0..8)
        .map(|i| {
            let id = g.add_object(&format!("gem {}", i), "", ObjectData::default());
            g.node_mut(&id).unwrap().size = (i % 3) + 1;
            id
        })
        .collect();

    for round in 0..4 {
        for (i, item) in items.iter().enumerate() {
            let inside = g.node(item).unwrap().container() == Some(&chest);
            if (i + round) % 2 == 0 && !inside {
                let _ = g.add_contained(&chest, item);
            } else if inside {
                g.remove_contained(&chest, item).unwrap();
            }
            let held: u32 = g
                .contents(&chest)
                .unwrap()
                .iter()
                .map(|c| g.node(c).unwrap().size)
                .sum();
            assert!(held <= initial);
            assert_eq!(held + g.node(&chest).unwrap().contain_size, initial);
        }
    }
}

#[test]
fn move_to_is_atomic_on_capacity_failure() {
    let (mut g, hall, _, bob) = small_world();
    let boulder = g.add_object("boulder", "", ObjectData::default());
    g.move_to(&boulder, &hall).unwrap();
    g.node_mut(&boulder).unwrap().size = 100;
    let before = g.clone();
    let err = g.move_to(&boulder, &bob).unwrap_err();
    assert!(matches!(err, Error::Capacity { .. }));
    assert_eq!(g, before);
}

#[test]
fn builder_force_move_ignores_capacity() {
    let mut b = GraphBuilder::new();
    let shed = b.room("shed", "", GridLocation::new(0, 0, 0)).unwrap();
    let pouch = b.object("pouch", "", container(), &shed).unwrap();
    let anvil = b.object("anvil", "", ObjectData::default(), &shed).unwrap();
    b.node_mut(&anvil).unwrap().size = 40;
    b.force_move_to(&anvil, &pouch).unwrap();
    let g = b.finish().unwrap();
    assert_eq!(g.node(&anvil).unwrap().container(), Some(&pouch));
    assert_eq!(g.node(&pouch).unwrap().contain_size, 0);
    g.validate().unwrap();
}

// ===========================================================================
// Room topology
// ===========================================================================

#[test]
fn paths_are_directed_with_their_own_labels() {
    let (g, hall, yard, _) = small_world();
    assert_eq!(g.path(&hall, &yard).unwrap().label, "the south");
    assert_eq!(g.path(&yard, &hall).unwrap().label, "the north");
    assert_eq!(g.find_path(&hall, "south").unwrap().target_id, yard);
    assert_eq!(g.find_path(&hall, "yard").unwrap().target_id, yard);
    assert!(g.find_path(&hall, "north").is_none());
}

#[test]
fn remove_neighbor_requires_existing_path() {
    let (mut g, hall, yard, _) = small_world();
    g.remove_neighbor(&hall, &yard).unwrap();
    assert!(g.remove_neighbor(&hall, &yard).is_err());
    // The reverse direction is untouched.
    assert!(g.path(&yard, &hall).is_some());
}

#[test]
fn rooms_within_uses_grid_distance() {
    let mut b = GraphBuilder::new();
    let a = b.room("a", "", GridLocation::new(0, 0, 0)).unwrap();
    let near = b.room("b", "", GridLocation::new(1, 1, 0)).unwrap();
    let far = b.room("c", "", GridLocation::new(5, 0, 0)).unwrap();
    let g = b.finish().unwrap();
    assert_eq!(g.room_distance(&a, &far).unwrap(), 5);
    let within = g.rooms_within(&a, 2).unwrap();
    assert!(within.contains(&a));
    assert!(within.contains(&near));
    assert!(!within.contains(&far));
}

#[test]
fn lock_path_locks_both_directions() {
    let (mut b, hall, yard, bob, _) = small_world_builder();
    let key = b.object("key", "", ObjectData::default(), &bob).unwrap();
    b.lock_path(&hall, &yard, &key, true).unwrap();
    let g = b.finish().unwrap();
    assert!(g.path(&hall, &yard).unwrap().is_locked());
    assert!(g.path(&yard, &hall).unwrap().is_locked());
}

// ===========================================================================
// Follow / block
// ===========================================================================

#[test]
fn follow_edges_keep_back_references() {
    let (mut g, hall, _, bob) = small_world();
    let ann = g.add_agent("ann", "");
    g.move_to(&ann, &hall).unwrap();
    g.set_following(&ann, Some(&bob)).unwrap();
    assert!(g.agent(&bob).unwrap().followed_by.contains(&ann));
    g.set_following(&ann, None).unwrap();
    assert!(g.agent(&bob).unwrap().followed_by.is_empty());
    assert!(g.set_following(&ann, Some(&ann)).is_err());
}

#[test]
fn stale_edges_are_severed_after_moving_apart() {
    let (mut g, hall, yard, bob) = small_world();
    let ann = g.add_agent("ann", "");
    g.move_to(&ann, &hall).unwrap();
    g.set_blocking(&ann, Some(&bob)).unwrap();
    g.set_following(&bob, Some(&ann)).unwrap();
    g.move_to(&bob, &yard).unwrap();
    g.sever_stale_edges(&bob).unwrap();
    assert!(g.agent(&bob).unwrap().following.is_none());
    assert!(g.agent(&bob).unwrap().blocked_by.is_empty());
    assert!(g.agent(&ann).unwrap().blocking.is_none());
}

// ===========================================================================
// Deletion and death
// ===========================================================================

#[test]
fn delete_room_cascades() {
    let (mut g, hall, yard, bob) = small_world();
    let count = g.len();
    let deleted = g.delete_node(&hall).unwrap();
    // hall, bob, sword, hat
    assert_eq!(deleted.len(), 4);
    assert_eq!(g.len(), count - 4);
    assert!(g.get(&bob).is_none());
    assert!(g.path(&yard, &hall).is_none());
    g.validate().unwrap();
}

#[test]
fn delete_key_removes_locks() {
    let (mut b, hall, yard, bob, _) = small_world_builder();
    let key = b.object("key", "", ObjectData::default(), &bob).unwrap();
    b.lock_path(&hall, &yard, &key, true).unwrap();
    let mut g = b.finish().unwrap();
    g.delete_node(&key).unwrap();
    assert!(!g.path(&hall, &yard).unwrap().is_locked());
    assert!(g.delete_node(&void_id()).is_err());
}

#[test]
fn agent_die_leaves_corpse_with_contents() {
    let (mut g, hall, _, bob) = small_world();
    let held = g.contents(&bob).unwrap();
    let corpse = g.agent_die(&bob).unwrap();
    assert_eq!(corpse.as_str(), format!("{}__dead__", bob));
    assert!(g.get(&bob).is_none());
    let node = g.node(&corpse).unwrap();
    assert_eq!(node.name, "bob's corpse");
    assert!(node.as_object().unwrap().is_container);
    assert_eq!(node.container(), Some(&hall));
    assert_eq!(g.contents(&corpse).unwrap(), held);
    for item in &held {
        assert!(g.object(item).unwrap().equipped.is_none());
    }
    g.validate().unwrap();
}

// ===========================================================================
// Serialization
// ===========================================================================

#[test]
fn graph_json_round_trip() {
    let (g, _, _, _) = small_world();
    let json = g.to_json().unwrap();
    let back = Graph::from_json(&json).unwrap();
    assert_eq!(back, g);
    assert_eq!(back.to_json().unwrap(), json);
}

#[test]
fn graph_json_shape() {
    let (g, hall, _, bob) = small_world();
    let v = g.to_value().unwrap();
    assert!(v["nodes"].is_object());
    assert!(v["rooms"].as_array().unwrap().iter().any(|r| r == hall.as_str()));
    let agent = &v["nodes"][bob.as_str()];
    assert_eq!(agent["node_type"], "agent");
    assert_eq!(agent["container_node"]["target_id"], hall.as_str());
}

#[test]
fn from_json_rejects_broken_back_references() {
    let (g, hall, _, bob) = small_world();
    let mut v = g.to_value().unwrap();
    v["nodes"][hall.as_str()]["contained_nodes"]
        .as_object_mut()
        .unwrap()
        .remove(bob.as_str());
    let err = Graph::from_value(v).unwrap_err();
    assert!(err.is_invariant());
}
