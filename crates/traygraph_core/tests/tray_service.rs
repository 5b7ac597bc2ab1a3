use async_trait::async_trait;
use futures::executor::block_on;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use traygraph_core::db::open_db_in_memory;
use traygraph_core::{
    ChildrenLoad, InMemoryTrayStore, LayoutAxis, MemoryClipboard, SqliteTrayStore, StoreResult,
    Tray, TrayGraphConfig, TrayService, TrayServiceError, TrayStore,
};

fn node(id: &str, children: &[&str], parents: &[&str]) -> Tray {
    let mut tray = Tray::with_id(id, id.to_uppercase());
    tray.children = children.iter().map(|c| c.to_string()).collect();
    tray.parents = parents.iter().map(|p| p.to_string()).collect();
    tray
}

#[test]
fn open_root_creates_configured_root_once() {
    let store = InMemoryTrayStore::new();
    let service = TrayService::new(&store);

    let root = block_on(service.open_root()).unwrap();
    assert_eq!(root.id, "root-tray-uuid");
    assert_eq!(root.name, "Root Tray");
    assert_eq!(store.save_count(), 1);

    block_on(service.open_root()).unwrap();
    assert_eq!(store.save_count(), 1);
}

#[test]
fn add_child_prepends_editable_child_and_unfolds_parent() {
    let mut p = node("p", &["old"], &[]);
    p.folded = true;
    let store = InMemoryTrayStore::with_trays([p, node("old", &[], &["p"])]);
    let config = TrayGraphConfig {
        default_layout_axis: LayoutAxis::Row,
        ..TrayGraphConfig::default()
    };
    let service = TrayService::with_config(&store, config);

    let attached = block_on(service.add_child("p")).unwrap();

    assert!(attached.child.editing_start);
    assert!(attached.child.name.is_empty());
    assert_eq!(attached.child.layout_axis, LayoutAxis::Row);
    assert_eq!(attached.child.parents, vec!["p".to_string()]);
    let p = store.get("p").unwrap();
    assert_eq!(p.children, vec![attached.child.id.clone(), "old".to_string()]);
    assert!(!p.folded);

    let renamed = block_on(service.rename(&attached.child.id, "Groceries")).unwrap();
    assert_eq!(renamed.name, "Groceries");
    assert!(!renamed.editing_start);
}

#[test]
fn add_child_to_missing_parent_is_not_found() {
    let store = InMemoryTrayStore::new();
    let service = TrayService::new(&store);
    let err = block_on(service.add_child("ghost")).unwrap_err();
    assert!(matches!(err, TrayServiceError::TrayNotFound(id) if id == "ghost"));
    assert_eq!(store.save_count(), 0);
}

#[test]
fn presentation_edits_touch_last_modified() {
    let mut a = node("a", &[], &[]);
    a.last_modified = 0;
    let store = InMemoryTrayStore::with_trays([a]);
    let service = TrayService::new(&store);

    let folded = block_on(service.toggle_fold("a")).unwrap();
    assert!(folded.folded);
    assert!(folded.last_modified > 0);
    assert!(!block_on(service.set_folded("a", false)).unwrap().folded);
    assert_eq!(
        block_on(service.toggle_layout_axis("a")).unwrap().layout_axis,
        LayoutAxis::Row
    );
    let with_meta =
        block_on(service.set_metadata_entry("a", "color", serde_json::json!("#ff0000"))).unwrap();
    assert_eq!(with_meta.metadata["color"], "#ff0000");
    assert_eq!(store.get("a").unwrap().metadata["color"], "#ff0000");
}

#[test]
fn link_and_unlink_keep_edges_mirrored() {
    let store = InMemoryTrayStore::with_trays([
        node("p1", &["c"], &[]),
        node("p2", &[], &[]),
        node("c", &[], &["p1"]),
    ]);
    let service = TrayService::new(&store);

    block_on(service.link_existing("p2", "c")).unwrap();
    assert_eq!(store.get("p2").unwrap().children, vec!["c".to_string()]);
    assert_eq!(
        store.get("c").unwrap().parents,
        vec!["p1".to_string(), "p2".to_string()]
    );

    store.reset_save_count();
    block_on(service.link_existing("p2", "c")).unwrap();
    assert_eq!(store.save_count(), 0);

    block_on(service.unlink("p1", "c")).unwrap();
    assert!(store.get("p1").unwrap().children.is_empty());
    assert_eq!(store.get("c").unwrap().parents, vec!["p2".to_string()]);
    assert!(store.get("c").is_some());

    let err = block_on(service.link_existing("c", "c")).unwrap_err();
    assert!(matches!(err, TrayServiceError::SelfLink(_)));
}

#[test]
fn repair_through_service_fixes_partial_write() {
    let store = InMemoryTrayStore::with_trays([node("a", &["b"], &[]), node("b", &[], &[])]);
    let service = TrayService::new(&store);

    let report = block_on(service.repair("a")).unwrap();

    assert_eq!(report.children_fixed, 1);
    assert_eq!(store.get("b").unwrap().parents, vec!["a".to_string()]);
}

#[test]
fn copy_subtree_then_paste_creates_fresh_copy() {
    let store = InMemoryTrayStore::with_trays([
        node("src", &["kid"], &[]),
        node("kid", &[], &["src"]),
        node("dest", &[], &[]),
    ]);
    let service = TrayService::new(&store);
    let clipboard = MemoryClipboard::new();

    assert_eq!(block_on(service.copy_subtree("src", &clipboard)).unwrap(), 2);
    let outcome = block_on(service.paste_subtree("dest", &clipboard)).unwrap();

    assert_eq!(outcome.written.len(), 2);
    assert_ne!(outcome.root.id, "src");
    assert_eq!(
        store.get("dest").unwrap().children,
        vec![outcome.root.id.clone()]
    );
    assert_eq!(store.len(), 5);
}

#[test]
fn copy_tray_then_paste_reference_links_original() {
    let store = InMemoryTrayStore::with_trays([
        node("shared", &[], &["a"]),
        node("a", &["shared"], &[]),
        node("b", &[], &[]),
    ]);
    let service = TrayService::new(&store);
    let clipboard = MemoryClipboard::new();

    block_on(service.copy_tray("shared", &clipboard)).unwrap();
    let outcome = block_on(service.paste_reference("b", &clipboard)).unwrap();

    assert_eq!(outcome.root.id, "shared");
    assert_eq!(store.get("b").unwrap().children, vec!["shared".to_string()]);
    assert_eq!(
        store.get("shared").unwrap().parents,
        vec!["a".to_string(), "b".to_string()]
    );
    assert_eq!(store.len(), 3);
}

#[test]
fn pasting_garbage_reports_transplant_error() {
    let store = InMemoryTrayStore::with_trays([node("dest", &[], &[])]);
    let service = TrayService::new(&store);
    let clipboard = MemoryClipboard::with_text("hello");

    let err = block_on(service.paste_subtree("dest", &clipboard)).unwrap_err();
    assert!(matches!(err, TrayServiceError::Transplant(_)));
    assert_eq!(store.save_count(), 0);
}

#[test]
fn markdown_round_trips_through_clipboard() {
    let store = InMemoryTrayStore::with_trays([node("dest", &["existing"], &[])]);
    let service = TrayService::new(&store);
    let clipboard = MemoryClipboard::with_text("- Plan\n  - Buy milk\n  - Call Bob\n- Later");

    let written = block_on(service.paste_markdown("dest", &clipboard)).unwrap();
    assert_eq!(written.len(), 4);

    let dest = store.get("dest").unwrap();
    assert_eq!(
        dest.children,
        vec![
            written[0].id.clone(),
            written[3].id.clone(),
            "existing".to_string()
        ]
    );
    assert_eq!(
        store.get(&written[0].id).unwrap().parents,
        vec!["dest".to_string()]
    );

    let outline = block_on(service.copy_markdown(&written[0].id, &clipboard)).unwrap();
    assert_eq!(outline, "- Plan\n  - Buy milk\n  - Call Bob");
    assert_eq!(clipboard.contents(), outline);
}

#[test]
fn markdown_without_items_writes_nothing() {
    let store = InMemoryTrayStore::with_trays([node("dest", &[], &[])]);
    let service = TrayService::new(&store);

    let written = block_on(service.import_markdown("dest", "just prose\n\n")).unwrap();
    assert!(written.is_empty());
    assert_eq!(store.save_count(), 0);
}

#[test]
fn load_children_returns_effective_children_in_order() {
    let mut p = node("p", &["b", "missing"], &[]);
    p.watched = vec!["w".to_string()];
    let store = InMemoryTrayStore::with_trays([
        p.clone(),
        node("b", &[], &["p"]),
        node("w", &[], &[]),
    ]);
    let service = TrayService::new(&store);

    let ChildrenLoad::Fresh(children) = block_on(service.load_children(&p)).unwrap() else {
        panic!("load should not be stale");
    };
    let ids: Vec<&str> = children.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "w"]);
}

#[test]
fn load_children_superseded_by_concurrent_edit_is_stale() {
    let store = YieldingStore::new(InMemoryTrayStore::with_trays([
        node("p", &["c"], &[]),
        node("c", &[], &["p"]),
    ]));
    let service = TrayService::new(&store);
    let snapshot = store.inner.get("p").unwrap();
    let before = service.children_generation("p");

    let (load, added) = block_on(async {
        futures::join!(service.load_children(&snapshot), service.add_child("p"))
    });

    assert!(added.is_ok());
    assert_eq!(load.unwrap(), ChildrenLoad::Stale);
    assert!(service.children_generation("p") > before);
}

#[test]
fn rebuild_tag_index_scans_sqlite_store() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTrayStore::try_new(&conn).unwrap();
    let mut tagged = node("t", &[], &[]);
    tagged.tags = vec!["work".to_string()];
    block_on(store.save_tray(&tagged)).unwrap();
    block_on(store.save_tray(&node("u", &[], &[]))).unwrap();

    let service = TrayService::new(store);
    assert!(service.tagged_ids("work").is_empty());

    assert_eq!(block_on(service.rebuild_tag_index()).unwrap(), 2);
    assert_eq!(service.tagged_ids("work"), vec!["t".to_string()]);
}

/// Store whose loads suspend once before completing.
struct YieldingStore {
    inner: InMemoryTrayStore,
}

impl YieldingStore {
    fn new(inner: InMemoryTrayStore) -> Self {
        Self { inner }
    }
}

#[async_trait(?Send)]
impl TrayStore for YieldingStore {
    async fn load_tray(&self, id: &str) -> StoreResult<Option<Tray>> {
        if id == "c" {
            YieldOnce(false).await;
        }
        self.inner.load_tray(id).await
    }

    async fn save_tray(&self, tray: &Tray) -> StoreResult<()> {
        self.inner.save_tray(tray).await
    }
}

struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            return Poll::Ready(());
        }
        self.0 = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
