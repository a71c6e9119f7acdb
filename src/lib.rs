//! Template Composer - hierarchical template composition and rendering
//!
//! Output is assembled from a tree of named sections. Each section is
//! rendered by a custom operation, a template file looked up along a
//! composed search path, or a nested template, and may expose subsections
//! that its renderer renders zero or more times through a continuation.
//!
//! # Example
//!
//! ```rust
//! use template_composer::{Engine, EngineConfig, Options, SectionList};
//!
//! let root = tempfile::tempdir().unwrap();
//! std::fs::create_dir_all(root.path().join("greeting")).unwrap();
//!
//! let engine = Engine::builder(EngineConfig::new().with_template_path(root.path()))
//!     .initializer("greeting", |def| {
//!         def.register_operation("hello", |inst, _| {
//!             Ok(format!("Hello, {}!", inst.options().get_str("name").unwrap_or("world")))
//!         });
//!         def.set_sections(SectionList::new().section("hello"));
//!         Ok(())
//!     })
//!     .build();
//!
//! let out = engine.run("greeting", Options::new().with("name", "Ada")).unwrap();
//! assert_eq!(out, "Hello, Ada!");
//! ```

pub mod config;
pub mod error;
pub mod options;
pub mod template;
pub mod text;

pub use config::{ConfigError, EngineConfig};
pub use error::TemplateError;
pub use options::{Format, Options};
pub use template::{
    CapabilitySet, Continuation, DefinitionBuilder, Engine, EngineBuilder, RenderAction,
    SectionEntry, SectionId, SectionList, TemplateDefinition, TemplateInstance,
};
pub use text::{Bindings, FileReader, FsReader, PlaceholderRenderer, Resume, TextRenderer};

/// Render the template at `path` with a default engine for `config`
///
/// # Example
///
/// ```rust
/// use template_composer::{render, EngineConfig, Options};
///
/// let root = tempfile::tempdir().unwrap();
/// let dir = root.path().join("doc");
/// std::fs::create_dir_all(&dir).unwrap();
/// std::fs::write(dir.join("setup.toml"), "sections = [\"title\"]\n").unwrap();
/// std::fs::write(dir.join("title.tpl"), "# {{ title }}").unwrap();
///
/// let config = EngineConfig::new().with_template_path(root.path());
/// let out = render(config, "doc", Options::new().with("title", "Guide")).unwrap();
/// assert_eq!(out, "# Guide");
/// ```
pub fn render(config: EngineConfig, path: &str, options: Options) -> Result<String, TemplateError> {
    Engine::new(config).run(path, options)
}
