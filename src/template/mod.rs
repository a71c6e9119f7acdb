//! Hierarchical template composition
//!
//! A [`TemplateDefinition`] describes one template kind: its logical path,
//! the directory backing it and the definitions composed into it. A
//! [`TemplateInstance`] renders a definition's [`SectionList`] section by
//! section; each section is rendered by a custom [`Operation`], a template
//! file found along the definition's search path, or a nested template.
//!
//! # Example
//!
//! ```text
//! templates/
//!   class/
//!     setup.toml        sections = ["header", ["title", "docstring"], "footer"]
//!     header.tpl        <h1>{{ yield }}</h1>{{ yield }}
//!     title.tpl         {{ name }}
//!     ...
//! ```

mod capability;
mod continuation;
mod definition;
mod engine;
mod instance;
mod path;
mod registry;
mod section;

pub use capability::{CapabilitySet, InitHook, Operation};
pub use continuation::{Continuation, OuterBlock};
pub use definition::{DefinitionBuilder, TemplateDefinition};
pub use engine::RenderAction;
pub use instance::{CachedFile, TemplateInstance};
pub use path::find_file;
pub use registry::{Engine, EngineBuilder, Initializer};
pub use section::{SectionEntry, SectionId, SectionList};
