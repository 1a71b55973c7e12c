use pathmark::config::PathmarkConfig;
use pathmark::error::{ApiError, ErrorKind};
use pathmark::tooling::cli::{CliContext, Commands, HistoryCommands};
use pathmark::tree::TreeStore;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn config() -> PathmarkConfig {
    let mut config = PathmarkConfig::default();
    config.storage.history_path = PathBuf::from(".pathmark-test/history");
    config.history.min_age_secs = 0;
    config
}

fn context(workspace: &Path) -> CliContext {
    CliContext::with_config(workspace.to_path_buf(), config()).unwrap()
}

fn name(parent: u64, title: &str, create: bool) -> Commands {
    Commands::Name {
        parent,
        title: Some(title.to_string()),
        format: None,
        fields: Vec::new(),
        create,
    }
}

#[test]
fn init_writes_config_and_tree() {
    let temp = TempDir::new().unwrap();
    let cli = context(temp.path());

    let output = cli.execute(&Commands::Init { force: false }).unwrap();
    assert!(output.contains("pathmark.toml"));
    assert!(temp.path().join("pathmark.toml").exists());
    assert!(temp.path().join("tree.json").exists());

    let again = cli.execute(&Commands::Init { force: false }).unwrap();
    assert!(again.contains("already initialized"));
}

#[test]
fn name_previews_and_creates_unique_names() {
    let temp = TempDir::new().unwrap();
    let cli = context(temp.path());

    assert_eq!(cli.execute(&name(1, "Hello World", false)).unwrap(), "hello-world");
    let created = cli.execute(&name(1, "Hello World", true)).unwrap();
    assert!(created.ends_with("/hello-world"));
    assert_eq!(cli.execute(&name(1, "Hello World", false)).unwrap(), "hello-world-1");

    // a fresh context sees the saved tree; the history database allows one opener
    drop(cli);
    let reopened = context(temp.path());
    assert!(reopened.tree().find_by_path("/hello-world", None).unwrap().is_some());
}

#[test]
fn name_rejects_unknown_parent_and_bad_fields() {
    let temp = TempDir::new().unwrap();
    let cli = context(temp.path());

    assert!(cli.execute(&name(42, "Orphan", false)).is_err());
    let bad_field = Commands::Name {
        parent: 1,
        title: None,
        format: Some("sku".to_string()),
        fields: vec!["sku".to_string()],
        create: false,
    };
    assert!(cli.execute(&bad_field).is_err());
}

#[test]
fn rename_records_history_and_resolve_redirects() {
    let temp = TempDir::new().unwrap();
    {
        let cli = context(temp.path());
        cli.execute(&name(1, "Blog", true)).unwrap();
        cli.execute(&Commands::Name {
            parent: 2,
            title: Some("First Post".to_string()),
            format: None,
            fields: Vec::new(),
            create: true,
        })
        .unwrap();
        cli.execute(&Commands::Rename {
            id: 2,
            name: "News".to_string(),
            language: None,
        })
        .unwrap();
    }

    let cli = context(temp.path());
    let listed = cli
        .execute(&Commands::History {
            command: HistoryCommands::List {
                id: 2,
                language: None,
                format: "json".to_string(),
            },
        })
        .unwrap();
    let records: serde_json::Value = serde_json::from_str(&listed).unwrap();
    assert_eq!(records[0]["path"], "/blog");

    let resolved = cli
        .execute(&Commands::Resolve {
            path: "/blog/first-post".to_string(),
            format: "json".to_string(),
        })
        .unwrap();
    let redirect: serde_json::Value = serde_json::from_str(&resolved).unwrap();
    assert_eq!(redirect["location"], "/news/first-post");
    assert_eq!(redirect["node_id"], 3);

    assert!(cli
        .execute(&Commands::Resolve {
            path: "/nowhere".to_string(),
            format: "text".to_string(),
        })
        .is_err());
}

#[test]
fn history_record_and_purge() {
    let temp = TempDir::new().unwrap();
    let cli = context(temp.path());
    cli.execute(&name(1, "Page", true)).unwrap();

    let recorded = cli
        .execute(&Commands::History {
            command: HistoryCommands::Record {
                id: 2,
                path: "/Old Page".to_string(),
                language: None,
            },
        })
        .unwrap();
    assert!(recorded.starts_with("Recorded"));

    let text = cli
        .execute(&Commands::Resolve {
            path: "/old-page".to_string(),
            format: "text".to_string(),
        })
        .unwrap();
    assert_eq!(text, "/old-page -> /page (node 2)");

    let purged = cli
        .execute(&Commands::History {
            command: HistoryCommands::Purge { id: 2 },
        })
        .unwrap();
    assert_eq!(purged, "Removed 1 history record(s)");
}

#[test]
fn delete_purges_history_and_rejects_bad_format() {
    let temp = TempDir::new().unwrap();
    let cli = context(temp.path());
    cli.execute(&name(1, "Temp", true)).unwrap();
    cli.execute(&Commands::Rename {
        id: 2,
        name: "Temporary".to_string(),
        language: None,
    })
    .unwrap();

    assert_eq!(
        cli.execute(&Commands::Delete { id: 2 }).unwrap(),
        "Deleted 1 node(s)"
    );
    assert!(cli
        .execute(&Commands::Resolve {
            path: "/temp".to_string(),
            format: "text".to_string(),
        })
        .is_err());
    assert!(cli.execute(&Commands::Tree { format: "xml".to_string() }).is_err());
}

#[test]
fn resolve_reports_history_loops_as_exhausted() {
    let temp = TempDir::new().unwrap();
    let mut config = config();
    config.history.max_segments = 3;
    let cli = CliContext::with_config(temp.path().to_path_buf(), config).unwrap();
    cli.execute(&name(1, "Alpha", true)).unwrap();
    cli.execute(&name(1, "Gamma", true)).unwrap();

    // /x/r/s -> /alpha/r/s -> /gamma/s -> /alpha/s -> ... never lands live
    for (id, path) in [(3, "/alpha/r"), (2, "/gamma"), (2, "/x")] {
        cli.execute(&Commands::History {
            command: HistoryCommands::Record {
                id,
                path: path.to_string(),
                language: None,
            },
        })
        .unwrap();
    }

    let err = cli
        .execute(&Commands::Resolve {
            path: "/x/r/s".to_string(),
            format: "text".to_string(),
        })
        .unwrap_err();
    assert!(matches!(&err, ApiError::ResolutionExhausted(path) if path == "/x/r/s"));
    assert_eq!(err.kind(), ErrorKind::Exhausted);

    // an unknown path is still a plain miss
    let missing = cli
        .execute(&Commands::Resolve {
            path: "/nowhere".to_string(),
            format: "text".to_string(),
        })
        .unwrap_err();
    assert!(matches!(missing, ApiError::PathNotFound(_)));
}
