//! CLI Tooling
//!
//! Command-line interface over a workspace: a JSON tree snapshot
//! (`tree.json`) and a sled path history database. Tree mutations go through
//! [`MemoryTree`], whose events keep the history current.

use crate::config::{ConfigLoader, PathmarkConfig, StoragePaths};
use crate::error::{ApiError, StorageError};
use crate::history::{
    HistoryRecord, ListPathsOptions, PathHistory, PathResolver, Redirect, SledHistoryStore,
};
use crate::language::{LanguageProvider, StaticLanguages};
use crate::naming::{NameScope, NameService};
use crate::sanitize::{DefaultSanitizer, NameSanitizer};
use crate::tree::{MemoryTree, Node, TreeSnapshot, TreeStore};
use crate::types::{LanguageId, NodeId, DEFAULT_LANGUAGE};
use chrono::Utc;
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Pathmark CLI - node naming and path history
#[derive(Parser)]
#[command(name = "pathmark")]
#[command(about = "Unique node names and former-path redirects for a content tree")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default pathmark.toml and an empty tree
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
    /// Generate a unique name for a new node
    Name {
        /// Parent node id
        #[arg(long)]
        parent: NodeId,
        #[arg(long)]
        title: Option<String>,
        /// Name format (defaults to the parent's child format, then title)
        #[arg(long)]
        format: Option<String>,
        /// Extra field values, as key=value
        #[arg(long = "field")]
        fields: Vec<String>,
        /// Persist the node under the generated name
        #[arg(long)]
        create: bool,
    },
    /// Rename a node
    Rename {
        id: NodeId,
        name: String,
        /// Rename the name in this language instead of the default name
        #[arg(long)]
        language: Option<LanguageId>,
    },
    /// Move a node under a new parent
    Move { id: NodeId, parent: NodeId },
    /// Move a node to the trash
    Trash { id: NodeId },
    /// Permanently delete a node and its descendants
    Delete { id: NodeId },
    /// List the tree
    Tree {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Path history commands
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Resolve a former path to a node's current location
    Resolve {
        path: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// Former paths of a node, oldest first
    List {
        id: NodeId,
        #[arg(long)]
        language: Option<LanguageId>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Record a former path by hand
    Record {
        id: NodeId,
        path: String,
        #[arg(long)]
        language: Option<LanguageId>,
    },
    /// Forget every former path of a node
    Purge { id: NodeId },
}

/// CLI context for a workspace
pub struct CliContext {
    workspace_root: PathBuf,
    config: PathmarkConfig,
    paths: StoragePaths,
    tree: Arc<MemoryTree>,
    history_store: Arc<SledHistoryStore>,
    history: Arc<PathHistory>,
    resolver: PathResolver,
    names: NameService,
    sanitizer: Arc<dyn NameSanitizer>,
}

impl CliContext {
    /// Load configuration for a workspace, from `config_path` when given.
    pub fn load_config(
        workspace_root: &std::path::Path,
        config_path: Option<&std::path::Path>,
    ) -> Result<PathmarkConfig, ApiError> {
        match config_path {
            Some(path) => ConfigLoader::load_from_file(path),
            None => ConfigLoader::load(workspace_root),
        }
    }

    /// Create a new CLI context
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = Self::load_config(&workspace_root, config_path.as_deref())?;
        Self::with_config(workspace_root, config)
    }

    pub fn with_config(workspace_root: PathBuf, config: PathmarkConfig) -> Result<Self, ApiError> {
        let paths = config.storage.resolve_paths(&workspace_root)?;
        let languages: Option<Arc<dyn LanguageProvider>> = if config.languages.is_empty() {
            None
        } else {
            Some(Arc::new(StaticLanguages::new(config.languages.clone())))
        };

        let snapshot = TreeSnapshot::load(&paths.tree)?;
        let mut tree = MemoryTree::from_snapshot(snapshot)?;
        if let Some(provider) = &languages {
            tree = tree.with_language_columns(provider.alternate_languages().into_iter().map(|l| l.id));
        }
        let tree = Arc::new(tree);

        let history_store = Arc::new(SledHistoryStore::open(&paths.history)?);
        let sanitizer: Arc<dyn NameSanitizer> =
            Arc::new(DefaultSanitizer::new(config.naming.max_length));
        let charset = config.naming.charset;

        let mut history = PathHistory::new(
            history_store.clone(),
            tree.clone(),
            config.history.clone(),
        )
        .with_sanitizer(sanitizer.clone(), charset);
        let mut names = NameService::new(tree.clone(), config.naming.clone())
            .with_sanitizer(sanitizer.clone());
        if let Some(provider) = &languages {
            history = history.with_languages(provider.clone());
            names = names.with_languages(provider.clone());
        }
        let history = Arc::new(history);
        tree.subscribe(&history);

        let resolver = PathResolver::new(history_store.clone(), tree.clone(), &config.history)
            .with_sanitizer(sanitizer.clone(), charset);

        Ok(Self {
            workspace_root,
            config,
            paths,
            tree,
            history_store,
            history,
            resolver,
            names,
            sanitizer,
        })
    }

    pub fn config(&self) -> &PathmarkConfig {
        &self.config
    }

    pub fn tree(&self) -> &Arc<MemoryTree> {
        &self.tree
    }

    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Init { force } => self.handle_init(*force),
            Commands::Name {
                parent,
                title,
                format,
                fields,
                create,
            } => self.handle_name(*parent, title.as_deref(), format.as_deref(), fields, *create),
            Commands::Rename { id, name, language } => self.handle_rename(*id, name, *language),
            Commands::Move { id, parent } => {
                self.tree.move_to(*id, *parent)?;
                self.persist()?;
                Ok(format!("Moved node {} to {}", id, self.live_path(*id, None)?))
            }
            Commands::Trash { id } => {
                self.tree.trash(*id)?;
                self.persist()?;
                Ok(format!("Trashed node {}", id))
            }
            Commands::Delete { id } => {
                let removed = self.tree.delete(*id)?;
                self.persist()?;
                Ok(format!("Deleted {} node(s)", removed.len()))
            }
            Commands::Tree { format } => self.handle_tree(format),
            Commands::History { command } => self.handle_history_command(command),
            Commands::Resolve { path, format } => self.handle_resolve(path, format),
        }
    }

    fn handle_init(&self, force: bool) -> Result<String, ApiError> {
        let config_path = crate::config::sources::workspace_file::path_for(&self.workspace_root);
        let mut written = Vec::new();
        if force || !config_path.exists() {
            std::fs::write(&config_path, self.config.to_toml()?).map_err(StorageError::from)?;
            written.push(config_path.display().to_string());
        }
        if force || !self.paths.tree.exists() {
            let empty = MemoryTree::new().snapshot();
            empty.save(&self.paths.tree)?;
            written.push(self.paths.tree.display().to_string());
        }
        if written.is_empty() {
            return Ok("Workspace already initialized. Use --force to overwrite.".to_string());
        }
        info!(files = written.len(), "Initialized workspace");
        Ok(format!("Initialized:\n  {}", written.join("\n  ")))
    }

    fn handle_name(
        &self,
        parent: NodeId,
        title: Option<&str>,
        format: Option<&str>,
        fields: &[String],
        create: bool,
    ) -> Result<String, ApiError> {
        if self.tree.get(parent)?.is_none() {
            return Err(ApiError::NodeNotFound(parent));
        }
        let mut node = Node::new(parent, Utc::now());
        if let Some(title) = title {
            node = node.with_title(title);
        }
        for field in fields {
            let (key, value) = field.split_once('=').ok_or_else(|| {
                ApiError::InvalidInput(format!("field {:?} is not key=value", field))
            })?;
            node = node.with_field(key.trim(), value);
        }

        self.names.assign_new_name(&mut node, format)?;
        if !create {
            return Ok(node.name);
        }
        let id = self.names.insert_unique(node)?;
        self.persist()?;
        Ok(format!("Created node {} at {}", id, self.live_path(id, None)?))
    }

    fn handle_rename(
        &self,
        id: NodeId,
        name: &str,
        language: Option<LanguageId>,
    ) -> Result<String, ApiError> {
        let node = self.tree.get(id)?.ok_or(ApiError::NodeNotFound(id))?;
        let language = language.filter(|l| *l != DEFAULT_LANGUAGE);
        let sanitized = self.sanitizer.page_name(name, self.config.naming.charset);
        if sanitized.is_empty() {
            return Err(ApiError::InvalidInput(format!("{:?} is not a usable name", name)));
        }
        let scope = match language {
            Some(l) => NameScope::siblings_of(&node).with_language(l),
            None => NameScope::siblings_of(&node),
        };
        let unique = self.names.uniquify(&sanitized, Some(&node), &scope)?;
        match language {
            Some(l) => self.tree.rename_language(id, l, &unique)?,
            None => self.tree.rename(id, &unique)?,
        }
        self.persist()?;
        Ok(format!("Renamed node {} to {}", id, self.live_path(id, language)?))
    }

    fn handle_tree(&self, format: &str) -> Result<String, ApiError> {
        let mut rows = Vec::new();
        for node in self.tree.snapshot().nodes {
            let id = match node.id {
                Some(id) => id,
                None => continue,
            };
            rows.push((id, self.live_path(id, None)?, node.trashed));
        }
        rows.sort_by(|a, b| a.1.cmp(&b.1));

        match format {
            "json" => {
                let nodes: Vec<_> = rows
                    .iter()
                    .map(|(id, path, trashed)| json!({ "id": id, "path": path, "trashed": trashed }))
                    .collect();
                to_json(&nodes)
            }
            "text" => {
                if rows.is_empty() {
                    return Ok("Tree is empty.".to_string());
                }
                let mut table = Table::new();
                table.load_preset(UTF8_BORDERS_ONLY);
                table.set_header(vec!["Id", "Path", "Trashed"]);
                for (id, path, trashed) in rows {
                    table.add_row(vec![
                        id.to_string(),
                        path,
                        if trashed { "yes" } else { "" }.to_string(),
                    ]);
                }
                Ok(table.to_string())
            }
            other => Err(invalid_format(other)),
        }
    }

    fn handle_history_command(&self, command: &HistoryCommands) -> Result<String, ApiError> {
        match command {
            HistoryCommands::List {
                id,
                language,
                format,
            } => {
                let records = self.history.list_paths(
                    *id,
                    &ListPathsOptions {
                        language: *language,
                    },
                )?;
                match format.as_str() {
                    "json" => to_json(&records),
                    "text" => Ok(format_history_text(*id, &records)),
                    other => Err(invalid_format(other)),
                }
            }
            HistoryCommands::Record { id, path, language } => {
                if self.tree.get(*id)?.is_none() {
                    return Err(ApiError::NodeNotFound(*id));
                }
                let kept = self.history.record_old_path(*id, path, *language)?;
                self.history_store.flush()?;
                Ok(if kept {
                    format!("Recorded {} for node {}", path, id)
                } else {
                    format!("Not recorded: {} is taken or is the node's live path", path)
                })
            }
            HistoryCommands::Purge { id } => {
                let removed = self.history.purge(*id)?;
                self.history_store.flush()?;
                Ok(format!("Removed {} history record(s)", removed))
            }
        }
    }

    /// Live paths win; history is only consulted when nothing lives at `path`.
    fn handle_resolve(&self, path: &str, format: &str) -> Result<String, ApiError> {
        let live = match self.tree.find_by_path(path, None)? {
            Some(Node { id: Some(id), .. }) if !self.tree.is_in_trash(id)? => Some(Redirect {
                node_id: id,
                language: None,
                location: self.live_path(id, None)?,
            }),
            _ => None,
        };
        let redirect = match live {
            Some(redirect) => redirect,
            None => self
                .resolver
                .resolve_path(path)?
                .ok_or_else(|| ApiError::PathNotFound(path.to_string()))?,
        };
        match format {
            "json" => to_json(&redirect),
            "text" => Ok(format!(
                "{} -> {} (node {})",
                path, redirect.location, redirect.node_id
            )),
            other => Err(invalid_format(other)),
        }
    }

    fn live_path(&self, id: NodeId, language: Option<LanguageId>) -> Result<String, ApiError> {
        self.tree
            .path_of(id, language)?
            .ok_or(ApiError::NodeNotFound(id))
    }

    fn persist(&self) -> Result<(), ApiError> {
        self.tree.snapshot().save(&self.paths.tree)?;
        self.history_store.flush()?;
        Ok(())
    }
}

fn format_history_text(id: NodeId, records: &[HistoryRecord]) -> String {
    if records.is_empty() {
        return format!("No path history for node {}.", id);
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Path", "Language", "Recorded"]);
    for record in records {
        table.add_row(vec![
            record.path.clone(),
            record.language_id.to_string(),
            record.created.to_rfc3339(),
        ]);
    }
    table.to_string()
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::InvalidInput(format!("Failed to render JSON: {}", e)))
}

fn invalid_format(format: &str) -> ApiError {
    ApiError::InvalidInput(format!(
        "Invalid format: {} (must be 'text' or 'json')",
        format
    ))
}
