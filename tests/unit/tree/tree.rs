use super::*;
use crate::test_support::{create_runtime, id, MapProvider};
use std::sync::atomic::{AtomicBool, Ordering};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn sample_tree() -> (Tree, Arc<MapProvider>) {
    let provider = Arc::new(MapProvider::sample());
    let tree = Tree::new(provider.clone(), TreeConfig::default());
    (tree, provider)
}

fn children_of(tree: &Tree, node: &str) -> Vec<String> {
    tree.get_node(&id(node))
        .map(|n| n.children().iter().map(|c| c.to_string()).collect())
        .unwrap_or_default()
}

#[test]
fn test_set_root_resolves_children() {
    let rt = create_runtime();
    rt.block_on(async {
        let (tree, _) = sample_tree();
        let refreshed = tree
            .set_root(Some(TreeNode::composite("root")))
            .await
            .unwrap();

        assert_eq!(refreshed.unwrap().id, id("root"));
        assert_eq!(children_of(&tree, "root"), vec!["dir1", "dir2"]);
        assert_eq!(tree.resolution(&id("root")), Resolution::Resolved);
        assert_eq!(tree.resolution(&id("dir1")), Resolution::Unresolved);
        let dir1 = tree.get_node(&id("dir1")).unwrap();
        assert_eq!(dir1.parent(), Some(&id("root")));
    });
}

#[test]
fn test_set_root_installs_before_refresh_completes() {
    let (tree, _) = sample_tree();
    let pending = tree.set_root(Some(TreeNode::composite("root")));
    assert_eq!(tree.root().unwrap().id, id("root"));
    assert!(tree.root().unwrap().children().is_empty());
    drop(pending);
}

#[test]
fn test_refresh_rejects_leaf_and_unknown_nodes() {
    let rt = create_runtime();
    rt.block_on(async {
        let (tree, provider) = sample_tree();
        tree.set_root(Some(TreeNode::composite("root"))).await.unwrap();
        tree.refresh(Some(&id("dir1")), None).await.unwrap();
        let calls = provider.calls();

        assert!(tree.refresh(Some(&id("file1")), None).await.unwrap().is_none());
        assert!(tree.refresh(Some(&id("nope")), None).await.unwrap().is_none());
        assert_eq!(provider.calls(), calls);
    });
}

#[test]
fn test_provider_failure_propagates_and_keeps_store() {
    let rt = create_runtime();
    rt.block_on(async {
        let (tree, provider) = sample_tree();
        tree.set_root(Some(TreeNode::composite("root"))).await.unwrap();
        tree.refresh(Some(&id("dir1")), None).await.unwrap();

        provider.set_failing("dir1", true);
        let result = tree.refresh(Some(&id("dir1")), None).await;

        assert!(matches!(result, Err(TreeError::Resolve { .. })));
        assert_eq!(children_of(&tree, "dir1"), vec!["file1", "file2"]);
        assert_eq!(tree.resolution(&id("dir1")), Resolution::Resolved);
        assert!(!tree.get_node(&id("dir1")).unwrap().is_busy());
    });
}

#[test]
fn test_cancelled_refresh_leaves_store_untouched() {
    let rt = create_runtime();
    rt.block_on(async {
        let (tree, provider) = sample_tree();
        tree.set_root(Some(TreeNode::composite("root"))).await.unwrap();
        provider.set_delay("dir1", ms(100));

        let token = CancellationToken::new();
        let pending = tokio::spawn(tree.refresh(Some(&id("dir1")), Some(token.clone())));
        tokio::time::sleep(ms(50)).await;
        token.cancel();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(TreeError::Cancelled)));
        assert!(children_of(&tree, "dir1").is_empty());
        assert_eq!(tree.resolution(&id("dir1")), Resolution::Unresolved);

        let cancelled = CancellationToken::new();
        cancelled.cancel();
        let result = tree.refresh(Some(&id("dir1")), Some(cancelled)).await;
        assert!(result.unwrap_err().is_cancelled());
    });
}

#[test]
fn test_stale_refresh_is_discarded_after_root_change() {
    let rt = create_runtime();
    rt.block_on(async {
        let (tree, provider) = sample_tree();
        tree.set_root(Some(TreeNode::composite("root"))).await.unwrap();
        provider.set_delay("dir1", ms(100));

        let pending = tokio::spawn(tree.refresh(Some(&id("dir1")), None));
        tokio::time::sleep(ms(10)).await;
        provider.set_children("other", vec![TreeNode::leaf("x")]);
        tree.set_root(Some(TreeNode::composite("other"))).await.unwrap();

        assert!(pending.await.unwrap().unwrap().is_none());
        assert!(tree.get_node(&id("file1")).is_none());
        assert_eq!(children_of(&tree, "other"), vec!["x"]);
    });
}

#[test]
fn test_stale_refresh_does_not_fire_changed() {
    let rt = create_runtime();
    rt.block_on(async {
        let (tree, provider) = sample_tree();
        tree.set_root(Some(TreeNode::composite("root"))).await.unwrap();
        provider.set_delay("dir1", ms(100));

        let pending = tokio::spawn(tree.refresh(Some(&id("dir1")), None));
        tokio::time::sleep(ms(10)).await;
        tree.set_root(Some(TreeNode::composite("other"))).await.unwrap();

        let fired = Arc::new(Mutex::new(0));
        let counter = fired.clone();
        let _sub = tree
            .on_changed()
            .subscribe(move |_| *counter.lock().unwrap() += 1);

        assert!(pending.await.unwrap().unwrap().is_none());
        assert_eq!(*fired.lock().unwrap(), 0);
    });
}

#[test]
fn test_refresh_preserves_matching_children() {
    let rt = create_runtime();
    rt.block_on(async {
        let (tree, provider) = sample_tree();
        tree.set_root(Some(TreeNode::composite("root"))).await.unwrap();
        tree.update_node(&id("dir1"), |n| {
            n.set_selected(true);
            n.set_expanded(true);
        });

        provider.set_children(
            "root",
            vec![
                TreeNode::expandable("dir1").selectable().with_name("DIR1"),
                TreeNode::expandable("dir3").selectable(),
            ],
        );
        tree.refresh_all().await.unwrap();

        let dir1 = tree.get_node(&id("dir1")).unwrap();
        assert!(dir1.selected());
        assert!(dir1.expanded());
        assert_eq!(dir1.name.as_deref(), Some("DIR1"));
        assert!(!tree.get_node(&id("dir3")).unwrap().selected());
        assert!(tree.get_node(&id("dir2")).is_none());
    });
}

#[test]
fn test_busy_is_reference_counted() {
    let rt = create_runtime();
    rt.block_on(async {
        let (tree, _) = sample_tree();
        tree.set_root(Some(TreeNode::composite("root"))).await.unwrap();

        let observed = Arc::new(Mutex::new(Vec::new()));
        let o = observed.clone();
        let _sub = tree
            .on_did_change_busy()
            .subscribe(move |node| o.lock().unwrap().push(node.busy()));

        let a = CancellationToken::new();
        let b = CancellationToken::new();
        tree.mark_as_busy(&id("dir1"), ms(800), a.clone());
        tree.mark_as_busy(&id("dir1"), ms(800), b.clone());

        tokio::time::sleep(ms(400)).await;
        b.cancel();
        tokio::time::sleep(ms(500)).await;
        assert_eq!(tree.get_node(&id("dir1")).unwrap().busy(), 1);

        a.cancel();
        tokio::time::sleep(ms(1)).await;
        assert_eq!(tree.get_node(&id("dir1")).unwrap().busy(), 0);
        assert_eq!(*observed.lock().unwrap(), vec![1, 0]);
    });
}

#[test]
fn test_overlapping_busy_markers_release_last() {
    let rt = create_runtime();
    rt.block_on(async {
        let (tree, _) = sample_tree();
        tree.set_root(Some(TreeNode::composite("root"))).await.unwrap();

        let a = CancellationToken::new();
        let b = CancellationToken::new();
        tree.mark_as_busy(&id("dir2"), ms(10), a.clone());
        tree.mark_as_busy(&id("dir2"), ms(20), b.clone());
        tokio::time::sleep(ms(30)).await;
        assert_eq!(tree.get_node(&id("dir2")).unwrap().busy(), 2);

        a.cancel();
        tokio::time::sleep(ms(1)).await;
        assert!(tree.get_node(&id("dir2")).unwrap().is_busy());

        b.cancel();
        tokio::time::sleep(ms(1)).await;
        assert!(!tree.get_node(&id("dir2")).unwrap().is_busy());
    });
}

#[test]
fn test_slow_refresh_marks_busy() {
    let rt = create_runtime();
    rt.block_on(async {
        let (tree, provider) = sample_tree();
        tree.set_root(Some(TreeNode::composite("root"))).await.unwrap();
        provider.set_delay("dir1", ms(1000));

        let pending = tokio::spawn(tree.refresh(Some(&id("dir1")), None));
        tokio::time::sleep(ms(900)).await;
        assert!(tree.get_node(&id("dir1")).unwrap().is_busy());

        pending.await.unwrap().unwrap();
        tokio::time::sleep(ms(1)).await;
        assert!(!tree.get_node(&id("dir1")).unwrap().is_busy());
    });
}

#[test]
fn test_busy_marker_of_replaced_root_does_not_release_new_one() {
    let rt = create_runtime();
    rt.block_on(async {
        let (tree, provider) = sample_tree();
        provider.set_delay("root", ms(2000));

        let first = tokio::spawn(tree.set_root(Some(TreeNode::composite("root"))));
        tokio::time::sleep(ms(900)).await;
        assert!(tree.root().unwrap().is_busy());

        tokio::time::sleep(ms(100)).await;
        let second = tokio::spawn(tree.set_root(Some(TreeNode::composite("root"))));
        assert!(!tree.root().unwrap().is_busy());

        // The first refresh ends at t=2000 and releases its marker; the
        // second one keeps resolving until t=3000.
        tokio::time::sleep(ms(1100)).await;
        assert!(first.is_finished());
        assert!(tree.root().unwrap().is_busy());
        assert_eq!(tree.root().unwrap().busy(), 1);

        assert!(second.await.unwrap().unwrap().is_some());
        tokio::time::sleep(ms(1)).await;
        assert!(!tree.root().unwrap().is_busy());
    });
}

#[test]
fn test_node_refreshed_listeners_finish_before_changed() {
    let rt = create_runtime();
    rt.block_on(async {
        let (tree, _) = sample_tree();
        let finished = Arc::new(AtomicBool::new(false));
        let seen_on_change = Arc::new(Mutex::new(Vec::new()));

        let f = finished.clone();
        let _refreshed = tree.on_node_refreshed().subscribe(move |event| {
            f.store(false, Ordering::SeqCst);
            let f = f.clone();
            event.wait_until(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                f.store(true, Ordering::SeqCst);
            });
        });
        let f = finished.clone();
        let s = seen_on_change.clone();
        let _changed = tree
            .on_changed()
            .subscribe(move |_| s.lock().unwrap().push(f.load(Ordering::SeqCst)));

        tree.set_root(Some(TreeNode::composite("root"))).await.unwrap();

        // set_root fires once before refreshing, the refresh fires once after.
        assert_eq!(*seen_on_change.lock().unwrap(), vec![false, true]);
    });
}

#[test]
fn test_mark_as_checked_fires_update() {
    let rt = create_runtime();
    rt.block_on(async {
        let (tree, _) = sample_tree();
        tree.set_root(Some(TreeNode::composite("root"))).await.unwrap();

        let updated = Arc::new(Mutex::new(Vec::new()));
        let u = updated.clone();
        let _sub = tree.on_did_update().subscribe(move |nodes| {
            u.lock()
                .unwrap()
                .extend(nodes.iter().map(|n| n.checkbox.clone().unwrap().checked));
        });

        tree.mark_as_checked(&id("dir2"), true);
        tree.mark_as_checked(&id("missing"), true);

        assert_eq!(*updated.lock().unwrap(), vec![true]);
        assert!(tree.get_node(&id("dir2")).unwrap().checkbox.unwrap().checked);
    });
}

#[test]
fn test_validate_node_follows_current_store() {
    let rt = create_runtime();
    rt.block_on(async {
        let (tree, _) = sample_tree();
        tree.set_root(Some(TreeNode::composite("root"))).await.unwrap();
        let stale = tree.get_node(&id("dir2")).unwrap();

        tree.set_root(Some(TreeNode::composite("elsewhere"))).await.unwrap();
        assert!(tree.validate_node(&stale).is_none());
    });
}
