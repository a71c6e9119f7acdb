//! Error types for template resolution and rendering

use std::path::PathBuf;

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    /// A name-like section resolved to no file anywhere in the search path
    #[error("no template for section '{section}' in {template}")]
    MissingFile { section: String, template: String },

    /// An explicit file lookup found nothing
    #[error("no file for '{file}' in {template}")]
    MissingExplicitFile { file: String, template: String },

    /// Malformed template text, raised by the text renderer
    #[error("{}:{line}: {message}", .file.display())]
    Syntax {
        file: PathBuf,
        line: usize,
        /// Byte offset of the offending tag within the file
        offset: usize,
        message: String,
    },

    /// Malformed section tree entry
    #[error("invalid section entry at {position} in {template}: {message}")]
    InvalidSectionEntry {
        template: String,
        position: String,
        message: String,
    },

    /// The definition's extension manifest or initializer failed
    #[error("failed to load template definition '{path}': {message}")]
    DefinitionLoad { path: String, message: String },

    /// No template root contains the logical path
    #[error("template not found: {path}")]
    UnknownTemplate { path: String },

    /// Explicit mixins refer back to a definition still being loaded
    #[error("circular template composition detected: {chain}")]
    CircularMixin { chain: String },

    #[error("error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failure raised by a custom render operation
    #[error("section '{section}' failed: {message}")]
    Operation { section: String, message: String },
}

impl TemplateError {
    /// Build an operation failure for the given section
    pub fn operation(section: impl Into<String>, message: impl Into<String>) -> Self {
        TemplateError::Operation {
            section: section.into(),
            message: message.into(),
        }
    }

    /// Format the error, with source context when it is a syntax error
    ///
    /// `source` must be the text of the file named by the error.
    pub fn report(&self, source: &str) -> String {
        let TemplateError::Syntax {
            file,
            offset,
            message,
            ..
        } = self
        else {
            return self.to_string();
        };

        let filename = file.display().to_string();
        // `offset` is a byte offset; ariadne spans count chars
        let start = source
            .char_indices()
            .take_while(|(i, _)| *i < *offset)
            .count();
        let end = (start + 2).min(source.chars().count());
        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename.as_str(), start)
            .with_message(message)
            .with_label(
                Label::new((filename.as_str(), start..end))
                    .with_message(message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename.as_str(), Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}
