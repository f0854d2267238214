use super::*;
use crate::config::TreeConfig;
use crate::services::DefaultLabelProvider;
use crate::test_support::{create_runtime, id, MapProvider};
use std::sync::Mutex;

async fn sample_model() -> (TreeModel, Arc<MapProvider>) {
    let provider = Arc::new(MapProvider::sample());
    let tree = Tree::new(provider.clone(), TreeConfig::default());
    let model = TreeModel::new(tree, Arc::new(DefaultLabelProvider));
    model
        .set_root(Some(TreeNode::composite("root")))
        .await
        .unwrap();
    (model, provider)
}

fn name(node: Option<TreeNode>) -> String {
    node.map(|n| n.id.to_string()).unwrap_or_default()
}

#[test]
fn test_next_selectable_skips_collapsed_subtree() {
    let rt = create_runtime();
    rt.block_on(async {
        let (model, _) = sample_model().await;
        model.refresh(Some(&id("dir1"))).await.unwrap();

        assert_eq!(name(model.get_next_selectable_node(Some(&id("dir1")))), "dir2");
        model.expand_node(&id("dir1")).await.unwrap();
        assert_eq!(name(model.get_next_selectable_node(Some(&id("dir1")))), "file1");
        assert_eq!(name(model.get_prev_selectable_node(Some(&id("dir2")))), "file2");
        assert_eq!(name(model.get_prev_selectable_node(Some(&id("dir1")))), "");
    });
}

#[test]
fn test_selection_moves_focus() {
    let rt = create_runtime();
    rt.block_on(async {
        let (model, _) = sample_model().await;
        assert!(model.select_node(&id("dir2")));
        assert_eq!(name(model.focused_node()), "dir2");

        assert!(!model.select_node(&id("root")));
        assert_eq!(name(model.focused_node()), "dir2");
    });
}

#[test]
fn test_select_next_without_focus_starts_at_top() {
    let rt = create_runtime();
    rt.block_on(async {
        let (model, _) = sample_model().await;

        assert_eq!(name(model.select_next_node(SelectionType::Default)), "dir1");
        assert_eq!(name(model.select_next_node(SelectionType::Default)), "dir2");
        assert!(model.select_next_node(SelectionType::Default).is_none());
        assert_eq!(model.selection().selected_ids(), vec![id("dir2")]);
    });
}

#[test]
fn test_select_prev_without_focus_starts_at_bottom() {
    let rt = create_runtime();
    rt.block_on(async {
        let (model, _) = sample_model().await;
        assert_eq!(name(model.select_prev_node(SelectionType::Default)), "dir2");
        assert_eq!(name(model.select_prev_node(SelectionType::Default)), "dir1");
    });
}

#[test]
fn test_fallback_follows_configured_traversal() {
    let rt = create_runtime();
    rt.block_on(async {
        let config = TreeConfig {
            prune_collapsed: false,
            ..TreeConfig::default()
        };
        let provider = Arc::new(MapProvider::sample());
        provider.set_children("dir2", vec![TreeNode::leaf("file3").selectable()]);
        let model = TreeModel::new(Tree::new(provider, config), Arc::new(DefaultLabelProvider));
        model
            .set_root(Some(TreeNode::composite("root")))
            .await
            .unwrap();
        model.refresh(Some(&id("dir2"))).await.unwrap();
        assert!(!model.expansion().is_expanded(&id("dir2")));

        // Walking back from dir2 and starting from nothing agree.
        assert_eq!(name(model.get_prev_selectable_node(None)), "file3");
        assert_eq!(
            name(model.get_next_selectable_node(Some(&id("dir2")))),
            "file3"
        );
    });
}

#[test]
fn test_select_next_focuses_unselectable_nodes() {
    let rt = create_runtime();
    rt.block_on(async {
        let (model, provider) = sample_model().await;
        provider.set_children("dir1", vec![TreeNode::leaf("plain")]);
        model.expand_node(&id("dir1")).await.unwrap();
        model.select_node(&id("dir1"));

        assert_eq!(name(model.select_next()), "plain");
        assert_eq!(name(model.focused_node()), "plain");
        assert_eq!(model.selection().selected_ids(), vec![id("dir1")]);

        assert_eq!(name(model.select_next()), "dir2");
        assert_eq!(model.selection().selected_ids(), vec![id("dir2")]);
        assert_eq!(name(model.select_prev()), "plain");
    });
}

#[test]
fn test_filtered_navigation_cycles_matches() {
    let rt = create_runtime();
    rt.block_on(async {
        let (model, _) = sample_model().await;
        model.expand_node(&id("dir1")).await.unwrap();
        model.search().filter("file");

        assert_eq!(name(model.get_next_selectable_node(None)), "file1");
        model.select_node(&id("file1"));
        assert_eq!(name(model.get_next_selectable_node(None)), "file2");
        model.select_node(&id("file2"));
        assert_eq!(name(model.get_next_selectable_node(None)), "file1");
        assert_eq!(name(model.get_prev_selectable_node(None)), "file1");
    });
}

#[test]
fn test_select_parent() {
    let rt = create_runtime();
    rt.block_on(async {
        let (model, _) = sample_model().await;
        model.expand_node(&id("dir1")).await.unwrap();
        model.select_node(&id("file2"));

        assert_eq!(name(model.select_parent()), "dir1");
        assert_eq!(model.selection().selected_ids(), vec![id("dir1")]);
        // The root is not selectable.
        assert!(model.select_parent().is_none());
    });
}

#[test]
fn test_open_node_toggles_and_notifies() {
    let rt = create_runtime();
    rt.block_on(async {
        let (model, _) = sample_model().await;
        let opened = Arc::new(Mutex::new(Vec::new()));
        let sink = opened.clone();
        let _sub = model
            .on_open_node()
            .subscribe(move |node| sink.lock().unwrap().push(node.id.to_string()));

        model.open_node(Some(&id("dir1"))).await.unwrap();
        assert!(model.expansion().is_expanded(&id("dir1")));

        model.select_node(&id("file1"));
        model.open_node(None).await.unwrap();
        assert!(model.expansion().is_expanded(&id("dir1")));

        assert_eq!(*opened.lock().unwrap(), vec!["dir1", "file1"]);
    });
}

#[test]
fn test_changes_are_forwarded() {
    let rt = create_runtime();
    rt.block_on(async {
        let (model, _) = sample_model().await;
        let count = Arc::new(Mutex::new(0));
        let counter = count.clone();
        let _sub = model
            .on_changed()
            .subscribe(move |_| *counter.lock().unwrap() += 1);

        model.expand_node(&id("dir1")).await.unwrap();
        let after_expand = *count.lock().unwrap();
        // Refresh of dir1 plus the expansion itself.
        assert_eq!(after_expand, 2);

        model.select_node(&id("dir2"));
        // Selection and focus.
        assert_eq!(*count.lock().unwrap(), after_expand + 2);
    });
}

#[test]
fn test_collapse_all_defaults_to_root() {
    let rt = create_runtime();
    rt.block_on(async {
        let (model, _) = sample_model().await;
        model.expand_node(&id("dir1")).await.unwrap();
        model.expand_node(&id("dir2")).await.unwrap();

        assert!(model.collapse_all(None));
        assert!(!model.expansion().is_expanded(&id("dir1")));
        assert!(!model.expansion().is_expanded(&id("dir2")));
    });
}

#[test]
fn test_navigation_history() {
    let rt = create_runtime();
    rt.block_on(async {
        let (model, _) = sample_model().await;
        assert!(!model.can_navigate_backward());

        model.navigate_to(&id("dir1")).await.unwrap();
        assert_eq!(name(model.root()), "dir1");
        assert!(model.expansion().is_expanded(&id("dir1")));
        assert!(model.get_node(&id("file1")).is_some());
        assert!(model.can_navigate_backward());
        assert!(!model.can_navigate_forward());

        model.navigate_backward().await.unwrap();
        assert_eq!(name(model.root()), "root");
        assert_eq!(model.selection().selected_ids(), vec![id("dir1")]);
        assert!(model.can_navigate_forward());

        model.navigate_forward().await.unwrap();
        assert_eq!(name(model.root()), "dir1");
        assert!(model.navigate_forward().await.unwrap().is_none());
    });
}

#[test]
fn test_navigate_to_detached_node() {
    let rt = create_runtime();
    rt.block_on(async {
        let (model, provider) = sample_model().await;
        provider.set_children("elsewhere", vec![TreeNode::leaf("x").selectable()]);

        let root = model
            .navigate_to_node(TreeNode::expandable("elsewhere").selectable())
            .await
            .unwrap();

        assert_eq!(name(root), "elsewhere");
        assert!(model.get_node(&id("x")).is_some());
        assert_eq!(model.navigation().len(), 2);
    });
}

#[test]
fn test_navigate_to_unknown_node() {
    let rt = create_runtime();
    rt.block_on(async {
        let (model, _) = sample_model().await;
        assert!(model.navigate_to(&id("nope")).await.unwrap().is_none());
        assert!(model.navigation().is_empty());
    });
}

#[test]
fn test_state_round_trip_through_json() {
    let rt = create_runtime();
    rt.block_on(async {
        let (model, _) = sample_model().await;
        model.expand_node(&id("dir1")).await.unwrap();
        model.select_node(&id("file2"));
        let json = serde_json::to_string(&model.store_state()).unwrap();

        model.set_root(None).await.unwrap();
        assert!(model.root().is_none());

        let state: TreeModelState = serde_json::from_str(&json).unwrap();
        model.restore_state(state).await.unwrap();

        assert!(model.expansion().is_expanded(&id("dir1")));
        assert_eq!(model.selection().selected_ids(), vec![id("file2")]);
        assert!(model.get_node(&id("file2")).unwrap().selected());
    });
}
