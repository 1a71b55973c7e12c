//! Unique name assignment
//!
//! [`NameService`] turns a format into a candidate name and renumbers it until
//! no other node in scope uses it. Each existence check is its own storage
//! query, so two writers can still race to the same name; [`NameService::insert_unique`]
//! recovers from the storage layer's duplicate rejection by renumbering.

use super::codec::NameCodec;
use super::format::{self, FormatInterpreter, RandomNames};
use super::random::RandomNameOptions;
use crate::clock::{Clock, SystemClock};
use crate::config::NamingConfig;
use crate::error::{NamingError, StorageError};
use crate::language::LanguageProvider;
use crate::sanitize::{DefaultSanitizer, NameSanitizer};
use crate::tree::{NameColumn, Node, TreeStore};
use crate::types::{LanguageId, NodeId, DEFAULT_LANGUAGE};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Where a name has to be unique
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameScope {
    /// Node allowed to hold the name already (the node being named)
    pub exclude: Option<NodeId>,
    /// Restrict to children of this node; `None` means tree-wide
    pub parent: Option<NodeId>,
    /// Pin the check to one language's name column
    pub language: Option<LanguageId>,
}

impl NameScope {
    /// Siblings of `node`, excluding the node itself.
    pub fn siblings_of(node: &Node) -> Self {
        Self {
            exclude: node.id,
            parent: node.parent,
            language: None,
        }
    }

    pub fn with_language(mut self, language: LanguageId) -> Self {
        self.language = Some(language);
        self
    }
}

pub struct NameService {
    tree: Arc<dyn TreeStore>,
    languages: Option<Arc<dyn LanguageProvider>>,
    sanitizer: Arc<dyn NameSanitizer>,
    clock: Arc<dyn Clock>,
    config: NamingConfig,
    codec: NameCodec,
}

impl NameService {
    pub fn new(tree: Arc<dyn TreeStore>, config: NamingConfig) -> Self {
        Self {
            tree,
            languages: None,
            sanitizer: Arc::new(DefaultSanitizer::new(config.max_length)),
            clock: Arc::new(SystemClock),
            codec: NameCodec::from_config(&config),
            config,
        }
    }

    pub fn with_languages(mut self, languages: Arc<dyn LanguageProvider>) -> Self {
        self.languages = Some(languages);
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn NameSanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn codec(&self) -> &NameCodec {
        &self.codec
    }

    pub fn config(&self) -> &NamingConfig {
        &self.config
    }

    pub fn interpreter(&self) -> FormatInterpreter<'_> {
        FormatInterpreter::new(
            &self.config,
            self.sanitizer.as_ref(),
            self.clock.as_ref(),
            self,
        )
    }

    /// True for the untitled placeholder and its numbered or stamped variants.
    ///
    /// Accepted forms: `untitled`, `untitled-N`, `untitled-0<stamp>` and
    /// `untitled-0<stamp>-N`.
    pub fn is_untitled(&self, name: &str) -> bool {
        let untitled = self.config.untitled.as_str();
        if name == untitled {
            return true;
        }
        match self.codec.suffix(name) {
            Some(suffix) if suffix.prefix == untitled => true,
            Some(suffix) => self
                .codec
                .suffix(suffix.prefix)
                .map_or(false, |stamp| stamp.is_stamp() && stamp.prefix == untitled),
            None => false,
        }
    }

    /// Format to use for `node` when the caller gives none.
    ///
    /// `parent` overrides the stored parent (useful before the node is placed).
    pub fn default_format(
        &self,
        node: &Node,
        parent: Option<&Node>,
        fallback: &str,
    ) -> Result<String, NamingError> {
        if parent.is_some() {
            return Ok(format::default_format(node, parent, fallback));
        }
        let stored = match node.parent {
            Some(id) => Some(self.tree.get(id)?.ok_or(NamingError::NodeNotFound(id))?),
            None => None,
        };
        Ok(format::default_format(node, stored.as_ref(), fallback))
    }

    /// Give a new node its name. Returns `None` when the node already has a
    /// real (non-placeholder) name.
    pub fn assign_new_name(
        &self,
        node: &mut Node,
        format: Option<&str>,
    ) -> Result<Option<String>, NamingError> {
        if !node.name.is_empty() && !self.is_untitled(&node.name) {
            return Ok(None);
        }
        let format = match format.map(str::trim).filter(|f| !f.is_empty()) {
            Some(f) => f.to_string(),
            None => self.default_format(node, None, "untitled-time")?,
        };
        let candidate = self.interpreter().resolve(node, &format)?;
        let name = self.uniquify(&candidate, Some(node), &NameScope::siblings_of(node))?;
        debug!(format = %format, name = %name, "Assigned node name");
        node.name = name.clone();
        Ok(Some(name))
    }

    /// Give `node` a name in a non-default language's name column.
    pub fn assign_language_name(
        &self,
        node: &mut Node,
        language: LanguageId,
        format: Option<&str>,
    ) -> Result<Option<String>, NamingError> {
        let existing = node.language_names.get(&language);
        if existing.map_or(false, |n| !n.is_empty() && !self.is_untitled(n)) {
            return Ok(None);
        }
        let format = match format.map(str::trim).filter(|f| !f.is_empty()) {
            Some(f) => f.to_string(),
            None => self.default_format(node, None, "untitled-time")?,
        };
        let candidate = self.interpreter().resolve_in(node, &format, Some(language))?;
        let scope = NameScope::siblings_of(node).with_language(language);
        let name = self.uniquify(&candidate, Some(node), &scope)?;
        node.language_names.insert(language, name.clone());
        Ok(Some(name))
    }

    /// Renumber `name` until nothing else in `scope` uses it.
    ///
    /// An empty name is first derived from `node`'s default format.
    pub fn uniquify(
        &self,
        name: &str,
        node: Option<&Node>,
        scope: &NameScope,
    ) -> Result<String, NamingError> {
        let mut name = name.trim().to_string();
        if name.is_empty() {
            name = self.derive_name(node, scope.language)?;
        }
        name = self.codec.truncate(&name, self.config.max_length);

        let mut attempts = 0;
        while self.exists_in_scope(&name, scope)? {
            attempts += 1;
            if attempts >= self.config.max_attempts {
                error!(
                    attempts,
                    last = %name,
                    parent = ?scope.parent,
                    "Unique name search exhausted"
                );
                return Err(NamingError::Exhausted {
                    attempts,
                    last: name,
                });
            }
            name = self.codec.increment(&name, None);
        }
        Ok(name)
    }

    fn derive_name(
        &self,
        node: Option<&Node>,
        language: Option<LanguageId>,
    ) -> Result<String, NamingError> {
        let interpreter = self.interpreter();
        let derived = match node {
            Some(node) => {
                let fallback = if node.is_persisted() {
                    "random"
                } else {
                    "untitled-time"
                };
                let format = self.default_format(node, None, fallback)?;
                interpreter.resolve_in(node, &format, language)?
            }
            None => String::new(),
        };
        if derived.is_empty() {
            return Ok(interpreter.sanitize(&interpreter.untitled_time()));
        }
        Ok(derived)
    }

    /// Whether any node other than `scope.exclude` already uses `name`.
    ///
    /// Without a pinned language every active language's name column is
    /// checked as well.
    pub fn exists_in_scope(&self, name: &str, scope: &NameScope) -> Result<bool, NamingError> {
        for column in self.columns_for(scope.language) {
            if self.count_in_column(name, column, scope)? > 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn columns_for(&self, language: Option<LanguageId>) -> Vec<NameColumn> {
        match (language, &self.languages) {
            (Some(l), Some(provider)) if !provider.is_default(l) => vec![NameColumn::Language(l)],
            (Some(l), None) if l != DEFAULT_LANGUAGE => vec![NameColumn::Language(l)],
            (Some(_), _) => vec![NameColumn::Default],
            (None, Some(provider)) => std::iter::once(NameColumn::Default)
                .chain(
                    provider
                        .alternate_languages()
                        .into_iter()
                        .map(|l| NameColumn::Language(l.id)),
                )
                .collect(),
            (None, None) => vec![NameColumn::Default],
        }
    }

    fn count_in_column(
        &self,
        name: &str,
        column: NameColumn,
        scope: &NameScope,
    ) -> Result<usize, NamingError> {
        match self
            .tree
            .count_named(name, column, scope.parent, scope.exclude)
        {
            Ok(count) => Ok(count),
            Err(StorageError::SchemaMismatch(detail)) => {
                warn!(
                    column = ?column,
                    detail = %detail,
                    "Name column missing, upgrading schema and treating lookup as no match"
                );
                self.tree.upgrade_schema(column)?;
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Random name unique in `options.scope` (unless confirmation is off).
    pub fn unique_random_name(&self, options: &RandomNameOptions) -> Result<String, NamingError> {
        let mut rng = rand::thread_rng();
        let mut last = String::new();
        for _ in 0..self.config.max_attempts {
            let candidate = options.generate(&mut rng);
            if !options.confirm || !self.exists_in_scope(&candidate, &options.scope)? {
                return Ok(candidate);
            }
            last = candidate;
        }
        error!(last = %last, "Random name search exhausted");
        Err(NamingError::Exhausted {
            attempts: self.config.max_attempts,
            last,
        })
    }

    /// Persist `node`, naming it first when needed.
    ///
    /// A duplicate rejection from storage means another writer took the name
    /// between the check and the insert; the name is renumbered and retried.
    pub fn insert_unique(&self, mut node: Node) -> Result<NodeId, NamingError> {
        if node.name.is_empty() {
            self.assign_new_name(&mut node, None)?;
        }
        self.uniquify_all(&mut node)?;

        for attempt in 1..=self.config.max_attempts {
            match self.tree.insert(node.clone()) {
                Ok(id) => return Ok(id),
                Err(StorageError::Duplicate(detail)) => {
                    debug!(attempt, name = %node.name, detail = %detail, "Name taken at insert, renumbering");
                    node.name = self.codec.increment(&node.name, None);
                    self.uniquify_all(&mut node)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(NamingError::Exhausted {
            attempts: self.config.max_attempts,
            last: node.name,
        })
    }

    fn uniquify_all(&self, node: &mut Node) -> Result<(), NamingError> {
        let scope = NameScope::siblings_of(node);
        node.name = self.uniquify(&node.name, Some(node), &scope)?;
        let languages: Vec<LanguageId> = node.language_names.keys().copied().collect();
        for language in languages {
            let current = node.language_names[&language].clone();
            if current.is_empty() {
                continue;
            }
            let unique = self.uniquify(&current, Some(node), &scope.with_language(language))?;
            node.language_names.insert(language, unique);
        }
        Ok(())
    }
}

impl RandomNames for NameService {
    fn random_name(&self, scope: &NameScope) -> Result<String, NamingError> {
        let options = RandomNameOptions {
            min_length: self.config.random_min_length,
            scope: *scope,
            ..RandomNameOptions::default()
        };
        self.unique_random_name(&options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::language::{Language, StaticLanguages};
    use crate::tree::{MemoryTree, ROOT_ID};
    use chrono::{TimeZone, Utc};

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2023, 10, 19, 12, 0, 0).unwrap()))
    }

    fn service(tree: &Arc<MemoryTree>) -> NameService {
        NameService::new(tree.clone(), NamingConfig::default()).with_clock(clock())
    }

    fn add(tree: &MemoryTree, parent: NodeId, name: &str) -> NodeId {
        tree.insert(Node::new(parent, Utc::now()).with_name(name)).unwrap()
    }

    #[test]
    fn test_uniquify_increments_past_existing_names() {
        let tree = Arc::new(MemoryTree::new());
        add(&tree, ROOT_ID, "about");
        add(&tree, ROOT_ID, "about-1");
        let names = service(&tree);

        let scope = NameScope {
            parent: Some(ROOT_ID),
            ..NameScope::default()
        };
        assert_eq!(names.uniquify("about", None, &scope).unwrap(), "about-2");
        assert_eq!(names.uniquify("contact", None, &scope).unwrap(), "contact");
        assert!(!names.exists_in_scope("about-2", &scope).unwrap());
    }

    #[test]
    fn test_uniquify_ignores_excluded_node_and_other_parents() {
        let tree = Arc::new(MemoryTree::new());
        let about = add(&tree, ROOT_ID, "about");
        let blog = add(&tree, ROOT_ID, "blog");
        let names = service(&tree);

        let own = NameScope {
            exclude: Some(about),
            parent: Some(ROOT_ID),
            language: None,
        };
        assert_eq!(names.uniquify("about", None, &own).unwrap(), "about");

        let other = NameScope {
            parent: Some(blog),
            ..NameScope::default()
        };
        assert_eq!(names.uniquify("about", None, &other).unwrap(), "about");

        let global = NameScope::default();
        assert_eq!(names.uniquify("about", None, &global).unwrap(), "about-1");
    }

    #[test]
    fn test_uniquify_reports_exhaustion() {
        let tree = Arc::new(MemoryTree::new());
        for name in ["page", "page-1", "page-2", "page-3"] {
            add(&tree, ROOT_ID, name);
        }
        let config = NamingConfig {
            max_attempts: 3,
            ..NamingConfig::default()
        };
        let names = NameService::new(tree.clone(), config);
        let scope = NameScope {
            parent: Some(ROOT_ID),
            ..NameScope::default()
        };
        let err = names.uniquify("page", None, &scope).unwrap_err();
        assert!(matches!(err, NamingError::Exhausted { attempts: 3, .. }));
    }

    #[test]
    fn test_assign_new_name_uses_title_and_skips_named_nodes() {
        let tree = Arc::new(MemoryTree::new());
        add(&tree, ROOT_ID, "hello-world");
        let names = service(&tree);

        let mut node = Node::new(ROOT_ID, Utc::now()).with_title("Hello World");
        assert_eq!(
            names.assign_new_name(&mut node, None).unwrap().as_deref(),
            Some("hello-world-1")
        );
        assert_eq!(node.name, "hello-world-1");

        let mut named = Node::new(ROOT_ID, Utc::now())
            .with_name("keep-me")
            .with_title("Other");
        assert_eq!(names.assign_new_name(&mut named, None).unwrap(), None);
        assert_eq!(named.name, "keep-me");

        let mut placeholder = Node::new(ROOT_ID, Utc::now())
            .with_name("untitled-3")
            .with_title("Real Title");
        assert_eq!(
            names.assign_new_name(&mut placeholder, None).unwrap().as_deref(),
            Some("real-title")
        );
    }

    #[test]
    fn test_assign_new_name_uses_parent_child_format() {
        let tree = Arc::new(MemoryTree::new());
        let blog = tree
            .insert(
                Node::new(ROOT_ID, Utc::now())
                    .with_name("blog")
                    .with_child_name_format("date:%Y-%m-%d"),
            )
            .unwrap();
        let names = service(&tree);

        let mut post = Node::new(blog, Utc::now()).with_title("Ignored");
        names.assign_new_name(&mut post, None).unwrap();
        assert_eq!(post.name, "2023-10-19");
    }

    #[test]
    fn test_untitled_time_collisions_append_counter() {
        let tree = Arc::new(MemoryTree::new());
        let names = service(&tree);

        let first = names
            .insert_unique(Node::new(ROOT_ID, Utc::now()))
            .unwrap();
        let second = names
            .insert_unique(Node::new(ROOT_ID, Utc::now()))
            .unwrap();

        let first = tree.get(first).unwrap().unwrap().name;
        let second = tree.get(second).unwrap().unwrap().name;
        assert_eq!(first, "untitled-0231019120000");
        assert_eq!(second, "untitled-0231019120000-1");
    }

    #[test]
    fn test_uniquify_empty_name_for_persisted_node_is_random() {
        let tree = Arc::new(MemoryTree::new());
        let id = add(&tree, ROOT_ID, "x");
        let node = tree.get(id).unwrap().unwrap();
        let names = service(&tree);

        let name = names
            .uniquify("", Some(&node), &NameScope::siblings_of(&node))
            .unwrap();
        assert!((6..=12).contains(&name.len()));
        assert!(name.bytes().all(|b| b.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_language_columns_are_checked_together() {
        let tree = Arc::new(MemoryTree::new().with_language_columns([1012]));
        tree.insert(
            Node::new(ROOT_ID, Utc::now())
                .with_name("about")
                .with_language_name(1012, "ueber-uns"),
        )
        .unwrap();
        let languages = Arc::new(StaticLanguages::new(vec![
            Language { id: 1, name: "default".into(), is_default: true },
            Language { id: 1012, name: "de".into(), is_default: false },
        ]));
        let names = service(&tree).with_languages(languages);
        let siblings = NameScope {
            parent: Some(ROOT_ID),
            ..NameScope::default()
        };

        // unpinned: the German column counts too
        assert!(names.exists_in_scope("ueber-uns", &siblings).unwrap());
        // pinned to the default language: only the default column
        assert!(!names.exists_in_scope("ueber-uns", &siblings.with_language(1)).unwrap());
        // pinned to German
        assert!(names.exists_in_scope("ueber-uns", &siblings.with_language(1012)).unwrap());
        assert!(!names.exists_in_scope("about", &siblings.with_language(1012)).unwrap());
    }

    #[test]
    fn test_missing_language_column_is_upgraded() {
        let tree = Arc::new(MemoryTree::new());
        let languages = Arc::new(StaticLanguages::new(vec![
            Language { id: 1, name: "default".into(), is_default: true },
            Language { id: 1013, name: "fi".into(), is_default: false },
        ]));
        let names = service(&tree).with_languages(languages);

        let scope = NameScope::default().with_language(1013);
        assert!(!names.exists_in_scope("anything", &scope).unwrap());
        assert_eq!(
            tree.count_named("anything", NameColumn::Language(1013), None, None).unwrap(),
            0
        );
    }

    #[test]
    fn test_assign_language_name() {
        let tree = Arc::new(MemoryTree::new().with_language_columns([1012]));
        tree.insert(
            Node::new(ROOT_ID, Utc::now())
                .with_name("contact")
                .with_language_name(1012, "kontakt"),
        )
        .unwrap();
        let names = service(&tree);

        let mut node = Node::new(ROOT_ID, Utc::now())
            .with_title("Contact")
            .with_language_field(1012, "title", "Kontakt");
        names.assign_new_name(&mut node, None).unwrap();
        names.assign_language_name(&mut node, 1012, None).unwrap();
        assert_eq!(node.name, "contact-1");
        assert_eq!(node.language_names.get(&1012).map(String::as_str), Some("kontakt-1"));
    }

    #[test]
    fn test_is_untitled() {
        let tree = Arc::new(MemoryTree::new());
        let names = service(&tree);
        assert!(names.is_untitled("untitled"));
        assert!(names.is_untitled("untitled-0231019120000"));
        assert!(names.is_untitled("untitled-3"));
        assert!(names.is_untitled("untitled-0231019120000-2"));
        assert!(!names.is_untitled("untitledness"));
        assert!(!names.is_untitled("about"));
        assert!(!names.is_untitled("untitled-project"));
        assert!(!names.is_untitled("untitled-project-2"));
        assert!(!names.is_untitled("untitled-42-2"));
    }

    #[test]
    fn test_assign_new_name_keeps_names_starting_with_untitled() {
        let tree = Arc::new(MemoryTree::new());
        let names = service(&tree);

        let mut node = Node::new(ROOT_ID, Utc::now())
            .with_name("untitled-project")
            .with_title("Launch Plan");
        assert_eq!(names.assign_new_name(&mut node, None).unwrap(), None);
        assert_eq!(node.name, "untitled-project");
    }

    #[test]
    fn test_default_format_reports_missing_parent() {
        let tree = Arc::new(MemoryTree::new());
        let names = service(&tree);

        let orphan = Node::new(404, Utc::now()).with_title("Orphan");
        let err = names.default_format(&orphan, None, "title").unwrap_err();
        assert!(matches!(err, NamingError::NodeNotFound(404)));
    }

    /// Tree whose existence checks always miss, so the first insert loses the
    /// race the way a concurrent writer would make it.
    struct RacingTree {
        inner: MemoryTree,
        lost_first: std::sync::atomic::AtomicBool,
    }

    impl TreeStore for RacingTree {
        fn get(&self, id: NodeId) -> Result<Option<Node>, StorageError> {
            self.inner.get(id)
        }

        fn find_by_path(
            &self,
            path: &str,
            language: Option<LanguageId>,
        ) -> Result<Option<Node>, StorageError> {
            self.inner.find_by_path(path, language)
        }

        fn path_of(
            &self,
            id: NodeId,
            language: Option<LanguageId>,
        ) -> Result<Option<String>, StorageError> {
            self.inner.path_of(id, language)
        }

        fn children_of(&self, id: NodeId) -> Result<Vec<Node>, StorageError> {
            self.inner.children_of(id)
        }

        fn is_in_trash(&self, id: NodeId) -> Result<bool, StorageError> {
            self.inner.is_in_trash(id)
        }

        fn count_named(
            &self,
            _name: &str,
            _column: NameColumn,
            _parent: Option<NodeId>,
            _exclude: Option<NodeId>,
        ) -> Result<usize, StorageError> {
            Ok(0)
        }

        fn upgrade_schema(&self, column: NameColumn) -> Result<(), StorageError> {
            self.inner.upgrade_schema(column)
        }

        fn insert(&self, node: Node) -> Result<NodeId, StorageError> {
            use std::sync::atomic::Ordering;
            if !self.lost_first.swap(true, Ordering::SeqCst) {
                return Err(StorageError::Duplicate(node.name));
            }
            self.inner.insert(node)
        }
    }

    #[test]
    fn test_insert_unique_renumbers_after_duplicate_at_commit() {
        let tree = Arc::new(RacingTree {
            inner: MemoryTree::new(),
            lost_first: std::sync::atomic::AtomicBool::new(false),
        });
        let names = NameService::new(tree.clone(), NamingConfig::default()).with_clock(clock());

        let id = names
            .insert_unique(Node::new(ROOT_ID, Utc::now()).with_name("race"))
            .unwrap();
        assert_eq!(tree.get(id).unwrap().unwrap().name, "race-1");
    }
}
