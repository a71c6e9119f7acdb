//! Template definitions and their composition

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Deserialize;

use super::capability::{InitHook, Operation};
use super::continuation::Continuation;
use super::instance::TemplateInstance;
use super::path::find_file;
use super::registry::Engine;
use super::section::SectionList;
use crate::error::TemplateError;
use crate::options::Options;

/// The immutable, composition-aware record for one template kind
///
/// A definition at `a/b` composes in the definition at `a` automatically.
/// Further mixins come from the extension manifest or a registered
/// initializer; a mixin declared later takes priority over earlier ones.
pub struct TemplateDefinition {
    path: String,
    location: PathBuf,
    mixins: Vec<Rc<TemplateDefinition>>,
    operations: HashMap<String, Operation>,
    init: Option<InitHook>,
    search_paths: OnceCell<Vec<PathBuf>>,
}

impl TemplateDefinition {
    /// Logical path, e.g. `class/header`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Directory backing this definition
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Composed definitions, highest priority first
    pub fn mixins(&self) -> &[Rc<TemplateDefinition>] {
        &self.mixins
    }

    /// This definition's location followed by the locations of all mixins
    ///
    /// Flattened depth-first and de-duplicated, keeping the first occurrence.
    pub fn search_paths(&self) -> &[PathBuf] {
        self.search_paths.get_or_init(|| {
            let mut paths = vec![self.location.clone()];
            for mixin in &self.mixins {
                for path in mixin.search_paths() {
                    if !paths.contains(path) {
                        paths.push(path.clone());
                    }
                }
            }
            paths
        })
    }

    /// Find `name` in the first search path directory that contains it
    pub fn find_file(&self, name: &str) -> Option<PathBuf> {
        find_file(self.search_paths(), name)
    }

    /// Look up a custom operation on this definition or its mixins
    pub fn operation(&self, name: &str) -> Option<Operation> {
        self.operations
            .get(name)
            .cloned()
            .or_else(|| self.mixins.iter().find_map(|m| m.operation(name)))
    }

    /// The section tree builder, inherited from mixins when not set here
    pub fn init_hook(&self) -> Option<InitHook> {
        self.init
            .clone()
            .or_else(|| self.mixins.iter().find_map(|m| m.init_hook()))
    }

    /// Whether this definition is, or transitively composes, `path`
    pub fn includes(&self, path: &str) -> bool {
        self.path == path || self.mixins.iter().any(|m| m.includes(path))
    }

    /// Create a render session for this definition
    pub fn create(
        self: &Rc<Self>,
        engine: &Engine,
        options: Options,
    ) -> Result<TemplateInstance, TemplateError> {
        TemplateInstance::new(engine.clone(), Rc::clone(self), options)
    }

    /// Create an instance and render its top-level section tree
    pub fn run(
        self: &Rc<Self>,
        engine: &Engine,
        options: Options,
    ) -> Result<String, TemplateError> {
        self.create(engine, options)?.render()
    }
}

impl PartialEq for TemplateDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl fmt::Debug for TemplateDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ops: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        ops.sort_unstable();
        f.debug_struct("TemplateDefinition")
            .field("path", &self.path)
            .field("location", &self.location)
            .field(
                "mixins",
                &self.mixins.iter().map(|m| m.path()).collect::<Vec<_>>(),
            )
            .field("operations", &ops)
            .finish()
    }
}

/// Per-definition extension manifest, e.g. `setup.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    mixins: Vec<String>,
    sections: Option<Vec<toml::Value>>,
}

/// Mutable view of a definition while it is being resolved
///
/// Handed to initializers registered with
/// [`EngineBuilder::initializer`](super::registry::EngineBuilder::initializer).
pub struct DefinitionBuilder<'a> {
    engine: &'a Engine,
    path: String,
    location: PathBuf,
    mixins: Vec<Rc<TemplateDefinition>>,
    operations: HashMap<String, Operation>,
    init: Option<InitHook>,
}

impl<'a> DefinitionBuilder<'a> {
    pub(crate) fn new(engine: &'a Engine, path: &str, location: PathBuf) -> Self {
        Self {
            engine,
            path: path.to_string(),
            location,
            mixins: Vec::new(),
            operations: HashMap::new(),
            init: None,
        }
    }

    pub fn engine(&self) -> &'a Engine {
        self.engine
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Compose in the definition at `path`, ahead of all current mixins
    pub fn add_mixin(&mut self, path: &str) -> Result<(), TemplateError> {
        let def = self.engine.template(path)?;
        self.add_mixin_definition(def);
        Ok(())
    }

    /// Compose in an already resolved definition, ahead of all current mixins
    pub fn add_mixin_definition(&mut self, def: Rc<TemplateDefinition>) {
        if !self.mixins.iter().any(|m| Rc::ptr_eq(m, &def)) {
            self.mixins.insert(0, def);
        }
    }

    /// Add a custom render operation for sections named `name`
    pub fn register_operation<F>(&mut self, name: impl Into<String>, op: F)
    where
        F: Fn(&mut TemplateInstance, &mut Continuation<'_>) -> Result<String, TemplateError>
            + 'static,
    {
        self.operations.insert(name.into(), Rc::new(op));
    }

    /// Override the section tree builder
    pub fn set_init<F>(&mut self, init: F)
    where
        F: Fn(&mut TemplateInstance) -> Result<(), TemplateError> + 'static,
    {
        self.init = Some(Rc::new(init));
    }

    /// Use a fixed section tree for every instance
    pub fn set_sections(&mut self, sections: SectionList) {
        self.set_init(move |inst| inst.set_sections(sections.clone()));
    }

    /// Compose in the parent path's definition, e.g. `a` for `a/b`
    pub(crate) fn include_parent(&mut self) -> Result<(), TemplateError> {
        let Some((parent, _)) = self.path.rsplit_once('/') else {
            return Ok(());
        };
        let location = self
            .location
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.location.clone());
        let def = self.engine.template_at(parent, location)?;
        self.mixins.push(def);
        Ok(())
    }

    /// Evaluate the optional extension manifest in this definition's directory
    pub(crate) fn load_manifest(&mut self, filename: &str) -> Result<(), TemplateError> {
        let file = self.location.join(filename);
        if !file.is_file() {
            return Ok(());
        }

        let content = std::fs::read_to_string(&file).map_err(|source| TemplateError::Io {
            path: file.clone(),
            source,
        })?;
        let manifest: Manifest =
            toml::from_str(&content).map_err(|e| TemplateError::DefinitionLoad {
                path: self.path.clone(),
                message: format!("{}: {}", file.display(), e),
            })?;

        for mixin in &manifest.mixins {
            self.add_mixin(mixin)?;
        }

        if let Some(values) = manifest.sections {
            SectionList::check_toml(&self.path, &values)?;
            // Nested templates resolve per instance, so a parent may list its own children
            let path = self.path.clone();
            self.set_init(move |inst| {
                let engine = inst.engine().clone();
                let sections = SectionList::from_toml(&path, &values, &mut |target: &str| {
                    engine.template(target)
                })?;
                inst.set_sections(sections)
            });
        }
        Ok(())
    }

    pub(crate) fn build(self) -> TemplateDefinition {
        TemplateDefinition {
            path: self.path,
            location: self.location,
            mixins: self.mixins,
            operations: self.operations,
            init: self.init,
            search_paths: OnceCell::new(),
        }
    }
}
