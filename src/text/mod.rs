//! Text rendering capabilities
//!
//! Section template files are loaded through a [`FileReader`] and rendered by
//! a [`TextRenderer`]. Both are injected into the engine; the defaults are
//! [`FsReader`] and the minimal [`PlaceholderRenderer`].

mod lexer;
mod placeholder;

use std::io;
use std::path::Path;

use crate::error::TemplateError;
use crate::options::Options;
use crate::template::SectionList;

pub use placeholder::PlaceholderRenderer;

/// Loads the raw text of a resolved template file
pub trait FileReader {
    fn read(&self, path: &Path) -> io::Result<String>;
}

/// Reads template files from the filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsReader;

impl FileReader for FsReader {
    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// State of the running instance visible to a template file
#[derive(Debug, Clone, Copy)]
pub struct Bindings<'a> {
    /// Logical path of the template being rendered
    pub template: &'a str,
    /// Name of the section the file backs
    pub section: &'a str,
    /// Resolved path of the file, for error reporting
    pub file: &'a Path,
    /// Current configuration
    pub options: &'a Options,
    /// Subsections a `yield` would render, if the section has any
    pub subsections: Option<&'a SectionList>,
}

/// Handle for rendering the current section's subsections from a template file
pub trait Resume {
    /// Render the next subsection
    fn resume(&mut self, overrides: Option<&Options>) -> Result<String, TemplateError>;

    /// Render all subsections
    fn resume_all(&mut self, overrides: Option<&Options>) -> Result<String, TemplateError>;
}

/// Renders template text against a binding context
pub trait TextRenderer {
    /// Render `text`; malformed input fails with [`TemplateError::Syntax`]
    fn render(
        &self,
        text: &str,
        bindings: &Bindings<'_>,
        resume: &mut dyn Resume,
    ) -> Result<String, TemplateError>;
}
