use chrono::{TimeZone, Utc};
use pathmark::clock::FixedClock;
use pathmark::config::NamingConfig;
use pathmark::naming::{NameScope, NameService, RandomNameOptions};
use pathmark::tree::{MemoryTree, Node, TreeStore, ROOT_ID};
use std::sync::Arc;

fn service(tree: &Arc<MemoryTree>) -> NameService {
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap());
    NameService::new(tree.clone(), NamingConfig::default()).with_clock(Arc::new(clock))
}

#[test]
fn titled_siblings_get_numbered_names() {
    let tree = Arc::new(MemoryTree::new());
    let names = service(&tree);

    let mut created = Vec::new();
    for _ in 0..3 {
        let node = Node::new(ROOT_ID, Utc::now()).with_title("Annual Report");
        let id = names.insert_unique(node).unwrap();
        created.push(tree.get(id).unwrap().unwrap().name);
    }
    assert_eq!(created, vec!["annual-report", "annual-report-1", "annual-report-2"]);
}

#[test]
fn same_title_under_different_parents_is_not_renumbered() {
    let tree = Arc::new(MemoryTree::new());
    let names = service(&tree);
    let a = names
        .insert_unique(Node::new(ROOT_ID, Utc::now()).with_name("a"))
        .unwrap();
    let b = names
        .insert_unique(Node::new(ROOT_ID, Utc::now()).with_name("b"))
        .unwrap();

    let under_a = names
        .insert_unique(Node::new(a, Utc::now()).with_title("Contact"))
        .unwrap();
    let under_b = names
        .insert_unique(Node::new(b, Utc::now()).with_title("Contact"))
        .unwrap();
    assert_eq!(tree.path_of(under_a, None).unwrap().unwrap(), "/a/contact");
    assert_eq!(tree.path_of(under_b, None).unwrap().unwrap(), "/b/contact");
}

#[test]
fn untitled_nodes_in_one_second_get_stamp_then_counter() {
    let tree = Arc::new(MemoryTree::new());
    let names = service(&tree);

    let first = names.insert_unique(Node::new(ROOT_ID, Utc::now())).unwrap();
    let second = names.insert_unique(Node::new(ROOT_ID, Utc::now())).unwrap();
    let third = names.insert_unique(Node::new(ROOT_ID, Utc::now())).unwrap();

    let name = |id| tree.get(id).unwrap().unwrap().name;
    assert_eq!(name(first), "untitled-0240506070809");
    assert_eq!(name(second), "untitled-0240506070809-1");
    assert_eq!(name(third), "untitled-0240506070809-2");
}

#[test]
fn child_name_format_drives_template_names() {
    let tree = Arc::new(MemoryTree::new());
    let names = service(&tree);
    let products = names
        .insert_unique(
            Node::new(ROOT_ID, Utc::now())
                .with_name("products")
                .with_child_name_format("{sku}-{title}"),
        )
        .unwrap();

    let id = names
        .insert_unique(
            Node::new(products, Utc::now())
                .with_title("Blue Chair")
                .with_field("sku", "BC 100"),
        )
        .unwrap();
    assert_eq!(
        tree.path_of(id, None).unwrap().unwrap(),
        "/products/bc-100-blue-chair"
    );
}

#[test]
fn zero_padded_counters_keep_their_width() {
    let tree = Arc::new(MemoryTree::new());
    let names = service(&tree);
    for name in ["page-009", "page-010"] {
        names
            .insert_unique(Node::new(ROOT_ID, Utc::now()).with_name(name))
            .unwrap();
    }
    let scope = NameScope {
        parent: Some(ROOT_ID),
        ..NameScope::default()
    };
    assert_eq!(names.uniquify("page-009", None, &scope).unwrap(), "page-011");
}

#[test]
fn random_names_avoid_existing_siblings() {
    let tree = Arc::new(MemoryTree::new());
    let names = service(&tree);
    let options = RandomNameOptions {
        length: Some(1),
        charset: pathmark::naming::RandomCharset::Numeric,
        scope: NameScope {
            parent: Some(ROOT_ID),
            ..NameScope::default()
        },
        ..RandomNameOptions::default()
    };

    for _ in 0..10 {
        let name = names.unique_random_name(&options).unwrap();
        tree.insert(Node::new(ROOT_ID, Utc::now()).with_name(name))
            .unwrap();
    }
    // all ten single digits are now taken
    assert!(names.unique_random_name(&options).is_err());
}
