use futures::executor::block_on;
use traygraph_core::{
    move_focus, FocusDirection, FocusOutcome, FocusPath, InMemoryTrayStore, Tray, TrayService,
};

fn node(id: &str, children: &[&str], parents: &[&str]) -> Tray {
    let mut tray = Tray::with_id(id, id);
    tray.children = children.iter().map(|c| c.to_string()).collect();
    tray.parents = parents.iter().map(|p| p.to_string()).collect();
    tray
}

fn path(ids: &[&str]) -> FocusPath {
    FocusPath::new(ids.iter().map(|id| id.to_string()).collect())
}

fn siblings_store() -> InMemoryTrayStore {
    InMemoryTrayStore::with_trays([
        node("r", &["a", "b", "c"], &[]),
        node("a", &["a1"], &["r"]),
        node("b", &[], &["r"]),
        node("c", &[], &["r"]),
        node("a1", &[], &["a"]),
    ])
}

fn step(store: &InMemoryTrayStore, from: &[&str], direction: FocusDirection) -> FocusOutcome {
    block_on(move_focus(store, &path(from), direction))
}

#[test]
fn down_moves_to_next_sibling_and_stops_at_last() {
    let store = siblings_store();
    assert_eq!(
        step(&store, &["r", "a"], FocusDirection::Down),
        FocusOutcome::Moved(path(&["r", "b"]))
    );
    assert_eq!(
        step(&store, &["r", "c"], FocusDirection::Down),
        FocusOutcome::Unchanged
    );
}

#[test]
fn up_moves_to_previous_sibling_and_stops_at_first() {
    let store = siblings_store();
    assert_eq!(
        step(&store, &["r", "c"], FocusDirection::Up),
        FocusOutcome::Moved(path(&["r", "b"]))
    );
    assert_eq!(
        step(&store, &["r", "a"], FocusDirection::Up),
        FocusOutcome::Unchanged
    );
}

#[test]
fn left_pops_to_viewing_parent_and_stays_at_root() {
    let store = siblings_store();
    assert_eq!(
        step(&store, &["r", "a", "a1"], FocusDirection::Left),
        FocusOutcome::Moved(path(&["r", "a"]))
    );
    assert_eq!(step(&store, &["r"], FocusDirection::Left), FocusOutcome::Unchanged);
}

#[test]
fn right_descends_to_first_acknowledging_child() {
    let store = InMemoryTrayStore::with_trays([
        node("r", &["stale", "ok"], &[]),
        node("stale", &[], &[]),
        node("ok", &[], &["r"]),
    ]);
    assert_eq!(
        step(&store, &["r"], FocusDirection::Right),
        FocusOutcome::Moved(path(&["r", "ok"]))
    );
    assert_eq!(
        step(&store, &["r", "ok"], FocusDirection::Right),
        FocusOutcome::Unchanged
    );
}

#[test]
fn right_on_folded_tray_requires_unfold() {
    let mut r = node("r", &["a"], &[]);
    r.folded = true;
    let store = InMemoryTrayStore::with_trays([r, node("a", &[], &["r"])]);
    assert_eq!(
        step(&store, &["r"], FocusDirection::Right),
        FocusOutcome::NeedsUnfold
    );

    let service = TrayService::new(&store);
    let moved = block_on(service.move_focus_unfolding(&path(&["r"]), FocusDirection::Right))
        .unwrap();
    assert_eq!(moved, path(&["r", "a"]));
    assert!(!store.get("r").unwrap().folded);
}

#[test]
fn vertical_moves_skip_siblings_that_do_not_acknowledge_parent() {
    let store = InMemoryTrayStore::with_trays([
        node("r", &["a", "broken", "missing", "c"], &[]),
        node("a", &[], &["r"]),
        node("broken", &[], &["elsewhere"]),
        node("c", &[], &["r"]),
    ]);
    assert_eq!(
        step(&store, &["r", "a"], FocusDirection::Down),
        FocusOutcome::Moved(path(&["r", "c"]))
    );
    assert_eq!(
        step(&store, &["r", "c"], FocusDirection::Up),
        FocusOutcome::Moved(path(&["r", "a"]))
    );
}

#[test]
fn implicit_children_are_navigable() {
    let mut r = node("r", &["a"], &[]);
    r.watched = vec!["w".to_string()];
    let store = InMemoryTrayStore::with_trays([r, node("a", &[], &["r"]), node("w", &[], &[])]);

    assert_eq!(
        step(&store, &["r", "a"], FocusDirection::Down),
        FocusOutcome::Moved(path(&["r", "w"]))
    );
}

#[test]
fn same_tray_under_two_parents_uses_viewing_context() {
    let store = InMemoryTrayStore::with_trays([
        node("r", &["p1", "p2"], &[]),
        node("p1", &["shared", "x"], &["r"]),
        node("p2", &["y", "shared"], &["r"]),
        node("shared", &[], &["p1", "p2"]),
        node("x", &[], &["p1"]),
        node("y", &[], &["p2"]),
    ]);
    assert_eq!(
        step(&store, &["r", "p1", "shared"], FocusDirection::Down),
        FocusOutcome::Moved(path(&["r", "p1", "x"]))
    );
    assert_eq!(
        step(&store, &["r", "p2", "shared"], FocusDirection::Up),
        FocusOutcome::Moved(path(&["r", "p2", "y"]))
    );
}

#[test]
fn missing_nodes_degrade_without_failing() {
    let store = InMemoryTrayStore::with_trays([node("r", &["a"], &[]), node("a", &[], &["r"])]);
    assert_eq!(
        step(&store, &["ghost", "a"], FocusDirection::Down),
        FocusOutcome::Unchanged
    );
    assert_eq!(
        step(&store, &["r", "detached"], FocusDirection::Down),
        FocusOutcome::Moved(path(&["r"]))
    );
    assert_eq!(
        step(&store, &["ghost"], FocusDirection::Right),
        FocusOutcome::Unchanged
    );
}
