use futures::executor::block_on;
use traygraph_core::{
    FocusDirection, FocusOutcome, FocusPath, InMemoryTrayStore, Tray, TrayService,
};

fn watcher() -> Tray {
    let mut x = Tray::with_id("x", "inbox");
    x.watch_tags = vec!["work".to_string()];
    x
}

fn tagged(id: &str, tag: &str) -> Tray {
    let mut tray = Tray::with_id(id, id);
    tray.tags = vec![tag.to_string()];
    tray
}

#[test]
fn watcher_adopts_tagged_tray_exactly_once() {
    let store = InMemoryTrayStore::with_trays([watcher(), tagged("y", "work")]);
    let service = TrayService::new(&store);

    block_on(service.load_tray("y")).unwrap();
    let x = block_on(service.load_tray("x")).unwrap().unwrap();

    assert_eq!(x.effective_children(), vec!["y".to_string()]);
    assert!(x.children.is_empty());
    assert_eq!(store.get("x").unwrap().watched, vec!["y".to_string()]);

    store.reset_save_count();
    let again = block_on(service.load_tray("x")).unwrap().unwrap();
    assert_eq!(again.effective_children(), vec!["y".to_string()]);
    assert_eq!(store.save_count(), 0);
}

#[test]
fn observing_a_newly_tagged_tray_refreshes_known_watchers() {
    let store = InMemoryTrayStore::with_trays([watcher(), tagged("y", "work")]);
    let service = TrayService::new(&store);

    block_on(service.load_tray("x")).unwrap();
    assert!(store.get("x").unwrap().watched.is_empty());

    block_on(service.load_tray("y")).unwrap();
    assert_eq!(store.get("x").unwrap().watched, vec!["y".to_string()]);
}

#[test]
fn tag_edits_add_and_remove_implicit_children() {
    let store = InMemoryTrayStore::with_trays([watcher(), Tray::with_id("y", "y")]);
    let service = TrayService::new(&store);
    block_on(service.load_tray("x")).unwrap();

    block_on(service.set_tags_from_input("y", "Work, home")).unwrap();
    assert_eq!(
        store.get("y").unwrap().tags,
        vec!["work".to_string(), "home".to_string()]
    );
    assert_eq!(store.get("x").unwrap().watched, vec!["y".to_string()]);

    block_on(service.set_tags("y", ["home"])).unwrap();
    assert!(store.get("x").unwrap().watched.is_empty());
}

#[test]
fn changing_watch_tags_recomputes_on_save() {
    let store = InMemoryTrayStore::with_trays([
        watcher(),
        tagged("w", "work"),
        tagged("h", "home"),
    ]);
    let service = TrayService::new(&store);
    block_on(service.load_tray("w")).unwrap();
    block_on(service.load_tray("h")).unwrap();

    let x = block_on(service.set_watch_tags_from_input("x", "home")).unwrap();

    assert_eq!(x.watched, vec!["h".to_string()]);
    assert_eq!(store.get("x").unwrap().watch_tags, vec!["home".to_string()]);
}

#[test]
fn explicit_child_is_not_duplicated_as_implicit() {
    let mut x = watcher();
    x.children = vec!["y".to_string()];
    let mut y = tagged("y", "work");
    y.parents = vec!["x".to_string()];
    let store = InMemoryTrayStore::with_trays([x, y]);
    let service = TrayService::new(&store);

    block_on(service.load_tray("y")).unwrap();
    let x = block_on(service.load_tray("x")).unwrap().unwrap();

    assert_eq!(x.effective_children(), vec!["y".to_string()]);
    assert!(x.watched.is_empty());
}

#[test]
fn watcher_never_adopts_itself() {
    let mut x = watcher();
    x.tags = vec!["work".to_string()];
    let store = InMemoryTrayStore::with_trays([x]);
    let service = TrayService::new(&store);

    let x = block_on(service.load_tray("x")).unwrap().unwrap();
    assert!(x.effective_children().is_empty());
}

#[test]
fn fresh_session_keeps_persisted_implicit_children() {
    let mut x = watcher();
    x.watched = vec!["y".to_string()];
    let store = InMemoryTrayStore::with_trays([x, tagged("y", "work")]);
    let service = TrayService::new(&store);

    let loaded = block_on(service.load_tray("x")).unwrap().unwrap();

    assert_eq!(loaded.watched, vec!["y".to_string()]);
    assert_eq!(store.get("x").unwrap().watched, vec!["y".to_string()]);
    assert_eq!(store.save_count(), 0);

    let root = FocusPath::new(vec!["x".to_string()]);
    assert_eq!(
        block_on(service.move_focus(&root, FocusDirection::Right)),
        FocusOutcome::Moved(FocusPath::new(vec!["x".to_string(), "y".to_string()]))
    );
}

#[test]
fn persisted_implicit_child_is_dropped_once_seen_without_tag() {
    let mut x = watcher();
    x.watched = vec!["y".to_string()];
    let store = InMemoryTrayStore::with_trays([x, tagged("y", "home")]);
    let service = TrayService::new(&store);

    block_on(service.load_tray("x")).unwrap();
    assert_eq!(store.get("x").unwrap().watched, vec!["y".to_string()]);

    block_on(service.load_tray("y")).unwrap();
    let x = block_on(service.load_tray("x")).unwrap().unwrap();
    assert!(x.watched.is_empty());
    assert!(store.get("x").unwrap().watched.is_empty());
}
