//! Template instances: per-render configuration, cursor and caches

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use toml::Value;
use tracing::trace;

use super::definition::TemplateDefinition;
use super::engine::RenderAction;
use super::registry::Engine;
use super::section::{SectionId, SectionList};
use crate::error::TemplateError;
use crate::options::{Format, Options, FORMAT_KEY, TEMPLATE_KEY};

/// A section template file loaded for this instance
#[derive(Debug, Clone)]
pub struct CachedFile {
    pub path: PathBuf,
    pub text: Rc<str>,
}

/// Saved traversal cursor
pub(crate) struct Cursor {
    section: Option<SectionId>,
    subsections: Option<SectionList>,
}

/// A live render session created from a definition and a configuration
pub struct TemplateInstance {
    engine: Engine,
    definition: Rc<TemplateDefinition>,
    options: Options,
    format: Option<Format>,
    sections: SectionList,
    pub(crate) section: Option<SectionId>,
    pub(crate) subsections: Option<SectionList>,
    files: HashMap<String, CachedFile>,
    pub(crate) actions: HashMap<String, RenderAction>,
}

impl TemplateInstance {
    /// Create an instance and run its section tree builder
    ///
    /// `options` are applied on top of the engine's default options. The
    /// `format` option selects at most one capability set for the instance's
    /// lifetime.
    pub fn new(
        engine: Engine,
        definition: Rc<TemplateDefinition>,
        options: Options,
    ) -> Result<Self, TemplateError> {
        let defaults = engine.config().options.clone();
        let mut inst = Self {
            engine,
            definition,
            options: Options::new(),
            format: None,
            sections: SectionList::new(),
            section: None,
            subsections: None,
            files: HashMap::new(),
            actions: HashMap::new(),
        };
        inst.add_options(&defaults.merge(&options));
        inst.format = inst.options.format();

        if let Some(init) = inst.definition.init_hook() {
            init(&mut inst)?;
        }
        Ok(inst)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn definition(&self) -> &Rc<TemplateDefinition> {
        &self.definition
    }

    /// The configuration currently in effect
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// The capability format chosen when the instance was created
    pub fn format(&self) -> Option<Format> {
        self.format
    }

    /// The top-level section tree
    pub fn sections(&self) -> &SectionList {
        &self.sections
    }

    /// Replace the top-level section tree
    pub fn set_sections(&mut self, sections: SectionList) -> Result<(), TemplateError> {
        sections.validate(self.definition.path())?;
        self.sections = sections;
        Ok(())
    }

    /// The section currently being rendered
    pub fn section(&self) -> Option<&SectionId> {
        self.section.as_ref()
    }

    /// Subsections of the section currently being rendered
    pub fn subsections(&self) -> Option<&SectionList> {
        self.subsections.as_ref()
    }

    /// Merge `overrides` into the configuration persistently
    pub fn add_options(&mut self, overrides: &Options) {
        let merged = self.options.merge(overrides);
        self.install_options(merged);
    }

    /// Run `body` with `overrides` merged into the configuration
    ///
    /// The previous configuration is restored when `body` returns, whether it
    /// succeeded or failed. Without overrides `body` runs unchanged.
    pub fn with_options<T, F>(
        &mut self,
        overrides: Option<&Options>,
        body: F,
    ) -> Result<T, TemplateError>
    where
        F: FnOnce(&mut Self) -> Result<T, TemplateError>,
    {
        let Some(overrides) = overrides else {
            return body(self);
        };
        let saved = self.options.clone();
        self.install_options(saved.merge(overrides));
        let result = body(self);
        self.install_options(saved);
        result
    }

    fn install_options(&mut self, options: Options) {
        trace!(keys = options.len(), "installing options");
        self.options = options;
    }

    pub(crate) fn save_cursor(&self) -> Cursor {
        Cursor {
            section: self.section.clone(),
            subsections: self.subsections.clone(),
        }
    }

    pub(crate) fn restore_cursor(&mut self, cursor: Cursor) {
        self.section = cursor.section;
        self.subsections = cursor.subsections;
    }

    /// Resolve a template path relative to this instance's configuration
    ///
    /// The `template` option is prepended and the `format` option appended,
    /// so `["class"]` with `template = "default"` and `format = "html"`
    /// resolves `default/class/html`.
    pub fn template(&self, path: &[&str]) -> Result<Rc<TemplateDefinition>, TemplateError> {
        let mut segments: Vec<&str> = Vec::with_capacity(path.len() + 2);
        if let Some(prefix) = self.options.get_str(TEMPLATE_KEY) {
            segments.push(prefix);
        }
        segments.extend_from_slice(path);
        if let Some(format) = self.options.get_str(FORMAT_KEY) {
            segments.push(format);
        }
        self.engine.template(&segments.join("/"))
    }

    /// Read a file found anywhere in the definition's search path
    pub fn file(&self, basename: &str) -> Result<String, TemplateError> {
        let path = self
            .definition
            .find_file(basename)
            .ok_or_else(|| TemplateError::MissingExplicitFile {
                file: basename.to_string(),
                template: self.definition.path().to_string(),
            })?;
        self.engine
            .file_reader()
            .read(&path)
            .map_err(|source| TemplateError::Io { path, source })
    }

    /// Resolved path of a section file loaded by this instance
    pub fn cached_path(&self, section: &str) -> Option<&Path> {
        self.files.get(section).map(|f| f.path.as_path())
    }

    /// The file backing `section`, loaded once per instance
    pub(crate) fn cached_file(&mut self, section: &str) -> Result<CachedFile, TemplateError> {
        if let Some(file) = self.files.get(section) {
            trace!(section, "template file cache hit");
            return Ok(file.clone());
        }

        let name = self.engine.config().file_for(section);
        let path = self
            .definition
            .find_file(&name)
            .ok_or_else(|| TemplateError::MissingFile {
                section: section.to_string(),
                template: self.definition.path().to_string(),
            })?;
        let text = self
            .engine
            .file_reader()
            .read(&path)
            .map_err(|source| TemplateError::Io {
                path: path.clone(),
                source,
            })?;

        let file = CachedFile {
            path,
            text: Rc::from(text),
        };
        self.files.insert(section.to_string(), file.clone());
        Ok(file)
    }
}

impl fmt::Debug for TemplateInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Template({}) [section=", self.definition.path())?;
        if let Some(section) = &self.section {
            write!(f, "{:?}", section)?;
        }
        f.write_str("]")
    }
}
