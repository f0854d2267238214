use super::*;
use crate::config::TreeConfig;
use crate::models::TreeNode;
use crate::services::label::DefaultLabelProvider;
use crate::test_support::{create_runtime, id, MapProvider};

#[test]
fn test_fuzzy_match_ranges() {
    assert_eq!(fuzzy_match("fl", "file1", false), Some(vec![0..1, 2..3]));
    assert_eq!(fuzzy_match("fil", "file1", false), Some(vec![0..3]));
    assert_eq!(fuzzy_match("FI", "file1", false), Some(vec![0..2]));
    assert_eq!(fuzzy_match("FI", "file1", true), None);
    assert_eq!(fuzzy_match("xyz", "file1", false), None);
    assert_eq!(fuzzy_match("", "file1", false), None);
}

#[test]
fn test_fuzzy_match_counts_chars_not_bytes() {
    assert_eq!(fuzzy_match("文件", "源文件", false), Some(vec![1..3]));
}

async fn search() -> (Tree, Arc<MapProvider>, TreeSearch) {
    let provider = Arc::new(MapProvider::sample());
    let tree = Tree::new(provider.clone(), TreeConfig::default());
    tree.set_root(Some(TreeNode::composite("root").hidden()))
        .await
        .unwrap();
    tree.refresh(Some(&id("dir1")), None).await.unwrap();
    let search = TreeSearch::new(tree.clone(), Arc::new(DefaultLabelProvider));
    (tree, provider, search)
}

#[test]
fn test_filter_matches_loaded_nodes() {
    let rt = create_runtime();
    rt.block_on(async {
        let (_, _, search) = search().await;
        assert!(!search.is_active());
        assert!(search.passes_filter(&id("dir1")));

        let filtered = search.filter("fe");
        assert_eq!(filtered, vec![id("file1"), id("file2")]);
        assert!(search.is_active());
        assert!(!search.passes_filter(&id("dir1")));
        assert_eq!(search.match_ranges(&id("file1")), Some(vec![0..1, 3..4]));

        search.filter("");
        assert!(!search.is_active());
        assert!(search.filtered_nodes().is_empty());
    });
}

#[test]
fn test_filter_skips_hidden_nodes() {
    let rt = create_runtime();
    rt.block_on(async {
        let (_, _, search) = search().await;
        assert!(search.filter("root").is_empty());
    });
}

#[test]
fn test_filter_follows_tree_changes() {
    let rt = create_runtime();
    rt.block_on(async {
        let (tree, provider, search) = search().await;
        search.filter("file");
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let _sub = search
            .on_filtered_nodes_changed()
            .subscribe(move |ids| sink.lock().unwrap().push(ids.len()));

        provider.set_children("dir1", vec![TreeNode::leaf("file1")]);
        tree.refresh(Some(&id("dir1")), None).await.unwrap();

        assert_eq!(search.filtered_nodes(), vec![id("file1")]);
        assert_eq!(*events.lock().unwrap(), vec![1]);
    });
}
