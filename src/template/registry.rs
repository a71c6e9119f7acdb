//! Template engine: definition resolution and shared services

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use tracing::debug;

use super::capability::CapabilitySet;
use super::continuation::Continuation;
use super::definition::{DefinitionBuilder, TemplateDefinition};
use super::instance::TemplateInstance;
use crate::config::EngineConfig;
use crate::error::TemplateError;
use crate::options::{Format, Options};
use crate::text::{FileReader, FsReader, PlaceholderRenderer, TextRenderer};

/// Callback run once when the definition at its path is resolved
pub type Initializer = Rc<dyn Fn(&mut DefinitionBuilder<'_>) -> Result<(), TemplateError>>;

enum Slot {
    Ready(Rc<TemplateDefinition>),
    /// Resolution failed; later lookups fail with the same message
    Poisoned(String),
}

struct EngineInner {
    config: EngineConfig,
    renderer: Rc<dyn TextRenderer>,
    reader: Rc<dyn FileReader>,
    initializers: HashMap<String, Initializer>,
    capabilities: HashMap<Format, CapabilitySet>,
    extra: CapabilitySet,
    definitions: RefCell<HashMap<String, Slot>>,
    /// Paths currently being resolved, outermost first
    resolving: RefCell<Vec<String>>,
}

/// Shared handle to a template engine
///
/// Resolves logical paths to [`TemplateDefinition`]s (memoized per path) and
/// holds the services every instance renders with.
#[derive(Clone)]
pub struct Engine {
    inner: Rc<EngineInner>,
}

/// Builder for [`Engine`]
pub struct EngineBuilder {
    config: EngineConfig,
    renderer: Rc<dyn TextRenderer>,
    reader: Rc<dyn FileReader>,
    initializers: HashMap<String, Initializer>,
    capabilities: HashMap<Format, CapabilitySet>,
    extra: CapabilitySet,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            renderer: Rc::new(PlaceholderRenderer),
            reader: Rc::new(FsReader),
            initializers: HashMap::new(),
            capabilities: HashMap::new(),
            extra: CapabilitySet::new(),
        }
    }

    /// Replace the renderer used for section template files
    pub fn with_text_renderer(mut self, renderer: impl TextRenderer + 'static) -> Self {
        self.renderer = Rc::new(renderer);
        self
    }

    /// Replace the reader used to load section template files
    pub fn with_file_reader(mut self, reader: impl FileReader + 'static) -> Self {
        self.reader = Rc::new(reader);
        self
    }

    /// Register an initializer for the definition at `path`
    ///
    /// Runs after the automatic parent and the extension manifest are applied.
    pub fn initializer<F>(mut self, path: impl Into<String>, init: F) -> Self
    where
        F: Fn(&mut DefinitionBuilder<'_>) -> Result<(), TemplateError> + 'static,
    {
        self.initializers.insert(path.into(), Rc::new(init));
        self
    }

    /// Add an operation to the capability set selected by `format`
    pub fn capability<F>(mut self, format: Format, name: impl Into<String>, op: F) -> Self
    where
        F: Fn(&mut TemplateInstance, &mut Continuation<'_>) -> Result<String, TemplateError>
            + 'static,
    {
        self.capabilities.entry(format).or_default().insert(name, op);
        self
    }

    /// Add an operation mixed into every instance
    pub fn extra_operation<F>(mut self, name: impl Into<String>, op: F) -> Self
    where
        F: Fn(&mut TemplateInstance, &mut Continuation<'_>) -> Result<String, TemplateError>
            + 'static,
    {
        self.extra.insert(name, op);
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            inner: Rc::new(EngineInner {
                config: self.config,
                renderer: self.renderer,
                reader: self.reader,
                initializers: self.initializers,
                capabilities: self.capabilities,
                extra: self.extra,
                definitions: RefCell::new(HashMap::new()),
                resolving: RefCell::new(Vec::new()),
            }),
        }
    }
}

impl Engine {
    /// Create an engine with the default renderer and reader
    pub fn new(config: EngineConfig) -> Self {
        EngineBuilder::new(config).build()
    }

    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn text_renderer(&self) -> Rc<dyn TextRenderer> {
        Rc::clone(&self.inner.renderer)
    }

    pub fn file_reader(&self) -> Rc<dyn FileReader> {
        Rc::clone(&self.inner.reader)
    }

    /// The capability set for `format`, if any operations were registered
    pub fn capabilities(&self, format: Format) -> Option<&CapabilitySet> {
        self.inner.capabilities.get(&format)
    }

    pub fn extra_operations(&self) -> &CapabilitySet {
        &self.inner.extra
    }

    /// Find the directory backing `path` in the first template root containing it
    pub fn locate(&self, path: &str) -> Result<PathBuf, TemplateError> {
        self.inner
            .config
            .template_paths
            .iter()
            .map(|root| root.join(path))
            .find(|dir| dir.is_dir())
            .ok_or_else(|| TemplateError::UnknownTemplate {
                path: path.to_string(),
            })
    }

    /// Resolve the definition for a logical path
    ///
    /// Memoized: every call for the same path returns the same definition,
    /// or the same failure if resolution failed.
    pub fn template(&self, path: &str) -> Result<Rc<TemplateDefinition>, TemplateError> {
        if let Some(found) = self.lookup(path) {
            return found;
        }
        let location = self.locate(path)?;
        self.load(path, location)
    }

    /// Resolve the definition for `path`, backed by `location` if not yet loaded
    pub fn template_at(
        &self,
        path: &str,
        location: PathBuf,
    ) -> Result<Rc<TemplateDefinition>, TemplateError> {
        if let Some(found) = self.lookup(path) {
            return found;
        }
        self.load(path, location)
    }

    /// Whether `path` has been resolved successfully
    pub fn is_loaded(&self, path: &str) -> bool {
        matches!(
            self.inner.definitions.borrow().get(path),
            Some(Slot::Ready(_))
        )
    }

    /// Create a render session for the definition at `path`
    pub fn create(&self, path: &str, options: Options) -> Result<TemplateInstance, TemplateError> {
        self.template(path)?.create(self, options)
    }

    /// Render the definition at `path` with `options`
    pub fn run(&self, path: &str, options: Options) -> Result<String, TemplateError> {
        self.template(path)?.run(self, options)
    }

    fn lookup(&self, path: &str) -> Option<Result<Rc<TemplateDefinition>, TemplateError>> {
        let definitions = self.inner.definitions.borrow();
        definitions.get(path).map(|slot| match slot {
            Slot::Ready(def) => Ok(Rc::clone(def)),
            Slot::Poisoned(message) => Err(TemplateError::DefinitionLoad {
                path: path.to_string(),
                message: message.clone(),
            }),
        })
    }

    fn load(&self, path: &str, location: PathBuf) -> Result<Rc<TemplateDefinition>, TemplateError> {
        {
            let mut resolving = self.inner.resolving.borrow_mut();
            if resolving.iter().any(|p| p == path) {
                let mut chain = resolving.clone();
                chain.push(path.to_string());
                return Err(TemplateError::CircularMixin {
                    chain: chain.join(" -> "),
                });
            }
            resolving.push(path.to_string());
        }

        let result = self.build_definition(path, location);
        self.inner.resolving.borrow_mut().pop();

        let mut definitions = self.inner.definitions.borrow_mut();
        match result {
            Ok(def) => {
                let def = Rc::new(def);
                definitions.insert(path.to_string(), Slot::Ready(Rc::clone(&def)));
                Ok(def)
            }
            Err(err) => {
                let message = err.to_string();
                definitions.insert(path.to_string(), Slot::Poisoned(message.clone()));
                Err(TemplateError::DefinitionLoad {
                    path: path.to_string(),
                    message,
                })
            }
        }
    }

    fn build_definition(
        &self,
        path: &str,
        location: PathBuf,
    ) -> Result<TemplateDefinition, TemplateError> {
        debug!(path, location = %location.display(), "loading template definition");
        let mut builder = DefinitionBuilder::new(self, path, location);
        builder.include_parent()?;
        builder.load_manifest(&self.inner.config.manifest)?;
        if let Some(init) = self.inner.initializers.get(path).cloned() {
            init(&mut builder)?;
        }
        Ok(builder.build())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut loaded: Vec<String> = self.inner.definitions.borrow().keys().cloned().collect();
        loaded.sort_unstable();
        f.debug_struct("Engine")
            .field("config", &self.inner.config)
            .field("loaded", &loaded)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn engine_with_dirs(dirs: &[&str]) -> (tempfile::TempDir, Engine) {
        let root = tempfile::tempdir().unwrap();
        for dir in dirs {
            fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        let engine = Engine::new(EngineConfig::new().with_template_path(root.path()));
        (root, engine)
    }

    #[test]
    fn test_template_is_memoized() {
        let (_root, engine) = engine_with_dirs(&["a"]);
        let first = engine.template("a").expect("Should resolve");
        let second = engine.template("a").expect("Should resolve");
        assert!(Rc::ptr_eq(&first, &second));
        assert!(engine.is_loaded("a"));
    }

    #[test]
    fn test_unknown_template() {
        let (_root, engine) = engine_with_dirs(&[]);
        let result = engine.template("missing");
        assert!(matches!(result, Err(TemplateError::UnknownTemplate { .. })));
        assert!(!engine.is_loaded("missing"));
    }

    #[test]
    fn test_parent_is_composed_automatically() {
        let (root, engine) = engine_with_dirs(&["x/y/z"]);
        let def = engine.template("x/y/z").expect("Should resolve");

        assert_eq!(def.mixins().len(), 1);
        assert_eq!(def.mixins()[0].path(), "x/y");
        assert!(def.includes("x"));
        assert_eq!(
            def.search_paths(),
            &[
                root.path().join("x/y/z"),
                root.path().join("x/y"),
                root.path().join("x"),
            ]
        );
    }

    #[test]
    fn test_first_root_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::create_dir_all(first.path().join("a")).unwrap();
        fs::create_dir_all(second.path().join("a")).unwrap();
        fs::create_dir_all(second.path().join("b")).unwrap();

        let engine = Engine::new(
            EngineConfig::new()
                .with_template_path(first.path())
                .with_template_path(second.path()),
        );
        assert_eq!(engine.locate("a").unwrap(), first.path().join("a"));
        assert_eq!(engine.locate("b").unwrap(), second.path().join("b"));
    }

    #[test]
    fn test_initializer_runs_once() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("t")).unwrap();
        let count = Rc::new(std::cell::Cell::new(0));
        let seen = Rc::clone(&count);
        let engine = Engine::builder(EngineConfig::new().with_template_path(root.path()))
            .initializer("t", move |_| {
                seen.set(seen.get() + 1);
                Ok(())
            })
            .build();

        engine.template("t").unwrap();
        engine.template("t").unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_failed_initializer_poisons_path() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("bad")).unwrap();
        let count = Rc::new(std::cell::Cell::new(0));
        let seen = Rc::clone(&count);
        let engine = Engine::builder(EngineConfig::new().with_template_path(root.path()))
            .initializer("bad", move |_| {
                seen.set(seen.get() + 1);
                Err(TemplateError::operation("init", "boom"))
            })
            .build();

        let first = engine.template("bad").unwrap_err();
        let second = engine.template("bad").unwrap_err();
        assert!(matches!(first, TemplateError::DefinitionLoad { .. }));
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(count.get(), 1, "failed initializer must not be retried");
        assert!(!engine.is_loaded("bad"));
    }

    #[test]
    fn test_circular_mixins_are_rejected() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("a")).unwrap();
        fs::create_dir_all(root.path().join("b")).unwrap();
        let engine = Engine::builder(EngineConfig::new().with_template_path(root.path()))
            .initializer("a", |def| def.add_mixin("b"))
            .initializer("b", |def| def.add_mixin("a"))
            .build();

        let err = engine.template("a").unwrap_err();
        assert!(matches!(err, TemplateError::DefinitionLoad { .. }));
        assert!(err.to_string().contains("a -> b -> a"), "got: {}", err);
    }

    #[test]
    fn test_explicit_mixin_takes_priority_over_parent() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("base/child")).unwrap();
        fs::create_dir_all(root.path().join("shared")).unwrap();
        let engine = Engine::builder(EngineConfig::new().with_template_path(root.path()))
            .initializer("base/child", |def| def.add_mixin("shared"))
            .build();

        let def = engine.template("base/child").unwrap();
        let mixins: Vec<&str> = def.mixins().iter().map(|m| m.path()).collect();
        assert_eq!(mixins, vec!["shared", "base"]);
        assert_eq!(def.search_paths()[1], root.path().join("shared"));
    }

    #[test]
    fn test_later_explicit_mixin_wins() {
        let root = tempfile::tempdir().unwrap();
        for dir in ["first", "second", "page"] {
            fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        fs::write(root.path().join("first/style.css"), "first").unwrap();
        fs::write(root.path().join("second/style.css"), "second").unwrap();
        fs::write(
            root.path().join("page/setup.toml"),
            "mixins = [\"first\", \"second\"]\n",
        )
        .unwrap();
        let engine = Engine::new(EngineConfig::new().with_template_path(root.path()));

        let def = engine.template("page").unwrap();
        let mixins: Vec<&str> = def.mixins().iter().map(|m| m.path()).collect();
        assert_eq!(mixins, vec!["second", "first"]);
        assert_eq!(
            def.find_file("style.css"),
            Some(root.path().join("second/style.css"))
        );

        let inst = engine.create("page", Options::new()).unwrap();
        assert_eq!(inst.file("style.css").unwrap(), "second");
    }
}
