use super::*;
use crate::config::TreeConfig;
use crate::test_support::{create_runtime, id, MapProvider};

#[test]
fn test_focus_changes_fire_once() {
    let rt = create_runtime();
    rt.block_on(async {
        let tree = Tree::new(Arc::new(MapProvider::sample()), TreeConfig::default());
        tree.set_root(Some(TreeNode::composite("root")))
            .await
            .unwrap();
        let focus = FocusService::new(tree);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let _sub = focus.on_did_change_focus().subscribe(move |node| {
            sink.lock()
                .unwrap()
                .push(node.as_ref().map(|n| n.id.to_string()));
        });

        focus.set_focus(Some(&id("dir1")));
        focus.set_focus(Some(&id("dir1")));
        focus.set_focus(Some(&id("missing")));
        focus.set_focus(None);

        assert_eq!(
            *events.lock().unwrap(),
            vec![Some("dir1".to_string()), None]
        );
        assert!(focus.focused_node().is_none());
    });
}

#[test]
fn test_focus_drops_removed_node() {
    let rt = create_runtime();
    rt.block_on(async {
        let provider = Arc::new(MapProvider::sample());
        let tree = Tree::new(provider.clone(), TreeConfig::default());
        tree.set_root(Some(TreeNode::composite("root")))
            .await
            .unwrap();
        let focus = FocusService::new(tree.clone());
        focus.set_focus(Some(&id("dir2")));
        assert!(focus.has_focus(&id("dir2")));

        provider.set_children("root", vec![TreeNode::expandable("dir1")]);
        tree.refresh(None, None).await.unwrap();

        assert_eq!(focus.focused_id(), None);
    });
}
