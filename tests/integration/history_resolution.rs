use chrono::{Duration, Utc};
use pathmark::config::HistoryConfig;
use pathmark::history::{
    ListPathsOptions, MemoryHistoryStore, PathHistory, PathHistoryStore, PathResolver, Resolution,
};
use pathmark::tree::{MemoryTree, Node, TreeStore, ROOT_ID};
use pathmark::types::NodeId;
use std::sync::Arc;

struct Site {
    tree: Arc<MemoryTree>,
    store: Arc<MemoryHistoryStore>,
    history: Arc<PathHistory>,
    resolver: PathResolver,
}

fn site() -> Site {
    let tree = Arc::new(MemoryTree::new());
    let store = Arc::new(MemoryHistoryStore::new());
    let config = HistoryConfig::default();
    let history = Arc::new(PathHistory::new(store.clone(), tree.clone(), config.clone()));
    tree.subscribe(&history);
    let resolver = PathResolver::new(store.clone(), tree.clone(), &config);
    Site {
        tree,
        store,
        history,
        resolver,
    }
}

fn add(site: &Site, parent: NodeId, name: &str) -> NodeId {
    let created = Utc::now() - Duration::days(30);
    site.tree
        .insert(Node::new(parent, created).with_name(name))
        .unwrap()
}

fn found(resolution: Resolution) -> Option<NodeId> {
    match resolution {
        Resolution::Found { node, .. } => node.id,
        _ => None,
    }
}

#[test]
fn recorded_path_resolves_directly() {
    let site = site();
    let blog = add(&site, ROOT_ID, "blog");
    let post = add(&site, blog, "new-post");

    site.history
        .record_old_path(post, "/blog/old-post", None)
        .unwrap();
    assert_eq!(found(site.resolver.resolve("/blog/old-post").unwrap()), Some(post));
}

#[test]
fn moved_ancestor_redirects_children() {
    let site = site();
    let blog = add(&site, ROOT_ID, "blog");
    let post = add(&site, blog, "old-post");

    site.tree.rename(blog, "news").unwrap();

    assert_eq!(site.store.get("/blog").unwrap().map(|r| r.node_id), Some(blog));
    assert!(site.store.get("/blog/old-post").unwrap().is_none());

    let redirect = site.resolver.resolve_path("/blog/old-post").unwrap().unwrap();
    assert_eq!(redirect.node_id, post);
    assert_eq!(redirect.location, "/news/old-post");
}

#[test]
fn renamed_then_moved_node_keeps_all_former_paths() {
    let site = site();
    let blog = add(&site, ROOT_ID, "blog");
    let archive = add(&site, ROOT_ID, "archive");
    let post = add(&site, blog, "draft");

    site.tree.rename(post, "final").unwrap();
    site.tree.move_to(post, archive).unwrap();

    assert_eq!(
        site.history
            .list_path_strings(post, &ListPathsOptions::default())
            .unwrap(),
        vec!["/blog/draft", "/blog/final"]
    );
    for former in ["/blog/draft", "/blog/final"] {
        let redirect = site.resolver.resolve_path(former).unwrap().unwrap();
        assert_eq!(redirect.location, "/archive/final");
    }
}

#[test]
fn moving_back_drops_the_record_for_the_live_path() {
    let site = site();
    let blog = add(&site, ROOT_ID, "blog");
    let news = add(&site, ROOT_ID, "news");
    let post = add(&site, blog, "post");

    site.tree.move_to(post, news).unwrap();
    site.tree.move_to(post, blog).unwrap();

    assert!(site.store.get("/blog/post").unwrap().is_none());
    assert_eq!(
        site.history
            .list_path_strings(post, &ListPathsOptions::default())
            .unwrap(),
        vec!["/news/post"]
    );
}

#[test]
fn eleven_segment_path_without_history_is_not_found() {
    let site = site();
    let path = "/s1/s2/s3/s4/s5/s6/s7/s8/s9/s10/s11";
    assert_eq!(site.resolver.resolve(path).unwrap(), Resolution::NotFound);
}

#[test]
fn deleting_a_node_forgets_its_former_paths() {
    let site = site();
    let page = add(&site, ROOT_ID, "page");
    let child = add(&site, page, "child");
    site.tree.rename(page, "renamed").unwrap();
    site.history
        .record_old_path(child, "/legacy/child", None)
        .unwrap();

    site.tree.delete(page).unwrap();

    assert!(site.store.is_empty());
    assert_eq!(site.resolver.resolve("/page").unwrap(), Resolution::NotFound);
    assert_eq!(site.resolver.resolve("/legacy/child").unwrap(), Resolution::NotFound);
}

#[test]
fn taking_over_a_path_replaces_its_record() {
    let site = site();
    let a = add(&site, ROOT_ID, "a");
    let b = add(&site, ROOT_ID, "b");

    site.tree.rename(a, "a-renamed").unwrap();
    // b takes over "a", then leaves it again
    site.tree.rename(b, "a").unwrap();
    site.tree.rename(b, "b").unwrap();

    // "/a" was dropped when b lived there, then recorded for b
    assert_eq!(site.store.get("/a").unwrap().map(|r| r.node_id), Some(b));
    assert_eq!(site.resolver.resolve_path("/a").unwrap().unwrap().location, "/b");
}
