use chrono::{Duration, Utc};
use pathmark::config::HistoryConfig;
use pathmark::history::{HistoryRecord, PathHistory, PathHistoryStore, PathResolver, SledHistoryStore};
use pathmark::tree::{MemoryTree, Node, TreeStore, ROOT_ID};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn records_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("history");
    {
        let store = SledHistoryStore::open(&db_path).unwrap();
        store
            .insert(&HistoryRecord {
                path: "/blog/old".to_string(),
                node_id: 7,
                language_id: 1012,
                created: Utc::now(),
            })
            .unwrap();
        store.flush().unwrap();
    }

    let store = SledHistoryStore::open(&db_path).unwrap();
    let record = store.get("/blog/old").unwrap().unwrap();
    assert_eq!(record.node_id, 7);
    assert_eq!(record.language_id, 1012);
    assert_eq!(store.records_for(7).unwrap().len(), 1);
}

#[test]
fn sled_store_backs_recorder_and_resolver() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(SledHistoryStore::open(&temp.path().join("history")).unwrap());
    let tree = Arc::new(MemoryTree::new());
    let history = Arc::new(PathHistory::new(
        store.clone(),
        tree.clone(),
        HistoryConfig::default(),
    ));
    tree.subscribe(&history);

    let created = Utc::now() - Duration::hours(1);
    let docs = tree
        .insert(Node::new(ROOT_ID, created).with_name("docs"))
        .unwrap();
    let guide = tree
        .insert(Node::new(docs, created).with_name("guide"))
        .unwrap();
    tree.rename(docs, "manual").unwrap();

    let resolver = PathResolver::new(store.clone(), tree.clone(), &HistoryConfig::default());
    let redirect = resolver.resolve_path("/docs/guide").unwrap().unwrap();
    assert_eq!(redirect.node_id, guide);
    assert_eq!(redirect.location, "/manual/guide");

    tree.delete(docs).unwrap();
    assert!(store.all().unwrap().is_empty());
}

#[test]
fn concurrent_inserts_of_one_path_have_a_single_winner() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(SledHistoryStore::open(&temp.path().join("history")).unwrap());

    let handles: Vec<_> = (0..8u64)
        .map(|node_id| {
            let store = store.clone();
            std::thread::spawn(move || {
                store
                    .insert(&HistoryRecord {
                        path: "/contested".to_string(),
                        node_id,
                        language_id: 0,
                        created: Utc::now(),
                    })
                    .is_ok()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(store.all().unwrap().len(), 1);
}
