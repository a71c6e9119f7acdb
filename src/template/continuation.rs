//! The continuation handed to section renderers

use tracing::debug;

use super::instance::TemplateInstance;
use super::section::{SectionEntry, SectionList};
use crate::error::TemplateError;
use crate::options::Options;
use crate::text::Resume;

/// A caller-supplied block forwarded unchanged through every nested run
pub type OuterBlock =
    dyn Fn(&mut TemplateInstance, Option<&Options>) -> Result<String, TemplateError>;

/// Renders the subsections of the section currently being rendered
///
/// Each [`resume`](Continuation::resume) renders the next subsection only;
/// a renderer that never resumes skips its subsections entirely.
pub struct Continuation<'a> {
    subsections: Option<SectionList>,
    /// Index of the next subsection to render
    index: usize,
    calls: usize,
    outer: Option<&'a OuterBlock>,
}

impl<'a> Continuation<'a> {
    pub(crate) fn new(subsections: Option<SectionList>, outer: Option<&'a OuterBlock>) -> Self {
        Self {
            subsections,
            index: 0,
            calls: 0,
            outer,
        }
    }

    pub fn subsections(&self) -> Option<&SectionList> {
        self.subsections.as_ref()
    }

    /// Number of times this continuation has been resumed
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Render the next subsection with `overrides` applied
    ///
    /// Returns an empty string once every subsection has been rendered.
    pub fn resume(
        &mut self,
        instance: &mut TemplateInstance,
        overrides: Option<&Options>,
    ) -> Result<String, TemplateError> {
        self.calls += 1;
        debug!(index = self.index, "resuming subsection of {:?}", instance);

        let cursor = instance.save_cursor();
        let result = instance.run(
            overrides,
            self.subsections.clone(),
            self.index,
            true,
            self.outer,
        );
        instance.restore_cursor(cursor);
        let text = result?;

        self.index += 1;
        if let Some(list) = &self.subsections {
            // Subtrees of the subsection just rendered are not positions of their own
            while list.get(self.index).is_some_and(SectionEntry::is_subtree) {
                self.index += 1;
            }
        }
        Ok(text)
    }

    /// Render all subsections with `overrides` applied
    pub fn resume_all(
        &mut self,
        instance: &mut TemplateInstance,
        overrides: Option<&Options>,
    ) -> Result<String, TemplateError> {
        self.calls += 1;
        debug!("yielding all subsections of {:?}", instance);

        let cursor = instance.save_cursor();
        let result = instance.run(overrides, self.subsections.clone(), 0, false, self.outer);
        instance.restore_cursor(cursor);
        result
    }

    /// Invoke the block supplied by the top-level caller, if any
    pub fn call_outer(
        &self,
        instance: &mut TemplateInstance,
        overrides: Option<&Options>,
    ) -> Result<String, TemplateError> {
        match self.outer {
            Some(outer) => outer(instance, overrides),
            None => Ok(String::new()),
        }
    }
}

/// Exposes a continuation to a template file being rendered
pub(crate) struct ResumeSection<'i, 'c, 'a> {
    pub(crate) instance: &'i mut TemplateInstance,
    pub(crate) continuation: &'c mut Continuation<'a>,
}

impl Resume for ResumeSection<'_, '_, '_> {
    fn resume(&mut self, overrides: Option<&Options>) -> Result<String, TemplateError> {
        self.continuation.resume(self.instance, overrides)
    }

    fn resume_all(&mut self, overrides: Option<&Options>) -> Result<String, TemplateError> {
        self.continuation.resume_all(self.instance, overrides)
    }
}
