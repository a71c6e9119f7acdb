//! Composition: walking section trees and dispatching sections
//!
//! `run` renders a section list in order. Each section is dispatched to a
//! [`RenderAction`] together with a [`Continuation`] over the section's
//! subsections; the action decides whether, when and how often the
//! subsections are rendered.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::capability::Operation;
use super::continuation::{Continuation, OuterBlock, ResumeSection};
use super::definition::TemplateDefinition;
use super::instance::TemplateInstance;
use super::section::{SectionEntry, SectionId, SectionList};
use crate::error::TemplateError;
use crate::options::Options;
use crate::text::Bindings;

/// How a section is rendered
#[derive(Clone)]
pub enum RenderAction {
    /// A custom operation with the section's name
    Operation(Operation),
    /// The template file `<name>.<ext>` found along the search path
    File(String),
    /// A fresh instance of another definition
    Template(Rc<TemplateDefinition>),
    /// An existing instance's own section tree
    Instance(Rc<RefCell<TemplateInstance>>),
}

impl fmt::Debug for RenderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderAction::Operation(_) => f.write_str("Operation"),
            RenderAction::File(name) => write!(f, "File({})", name),
            RenderAction::Template(def) => write!(f, "Template({})", def.path()),
            RenderAction::Instance(_) => f.write_str("Instance"),
        }
    }
}

impl TemplateInstance {
    /// Render the top-level section tree
    pub fn render(&mut self) -> Result<String, TemplateError> {
        let sections = self.sections().clone();
        self.run(None, Some(sections), 0, false, None)
    }

    /// Render the top-level section tree with a caller-supplied block
    ///
    /// Operations reach the block through [`Continuation::call_outer`].
    pub fn render_with(&mut self, outer: &OuterBlock) -> Result<String, TemplateError> {
        let sections = self.sections().clone();
        self.run(None, Some(sections), 0, false, Some(outer))
    }

    /// Render `sections` starting at `start_at`
    ///
    /// `overrides` apply for the duration of the call only. With
    /// `break_first` only the first renderable entry is rendered. Subtree
    /// entries are never dispatched; each belongs to the section before it.
    pub fn run(
        &mut self,
        overrides: Option<&Options>,
        sections: Option<SectionList>,
        start_at: usize,
        break_first: bool,
        outer: Option<&OuterBlock>,
    ) -> Result<String, TemplateError> {
        let Some(sections) = sections else {
            return Ok(String::new());
        };

        self.with_options(overrides, |inst| {
            let mut out = String::new();
            for (index, entry) in sections.entries().iter().enumerate().skip(start_at) {
                let SectionEntry::Section(id) = entry else {
                    continue;
                };
                let subsections = sections.subtree_at(index + 1);
                inst.section = Some(id.clone());
                inst.subsections = subsections.clone();

                let mut continuation = Continuation::new(subsections, outer);
                out.push_str(&inst.render_section(id, &mut continuation)?);
                if break_first {
                    break;
                }
            }
            Ok(out)
        })
    }

    /// Render the file backing `section`, exposing `continuation` to its markup
    pub fn render_file(
        &mut self,
        section: &str,
        continuation: &mut Continuation<'_>,
    ) -> Result<String, TemplateError> {
        let file = self.cached_file(section)?;
        let definition = Rc::clone(self.definition());
        let options = self.options().clone();
        let subsections = continuation.subsections().cloned();
        let renderer = self.engine().text_renderer();
        let bindings = Bindings {
            template: definition.path(),
            section,
            file: &file.path,
            options: &options,
            subsections: subsections.as_ref(),
        };
        let mut resume = ResumeSection {
            instance: self,
            continuation,
        };
        renderer.render(&file.text, &bindings, &mut resume)
    }

    /// The render action for `id`; named actions are resolved once per instance
    ///
    /// Operations win over files: engine-wide extra operations first, then the
    /// instance's format capability set, then the definition and its mixins.
    pub fn action_for(&mut self, id: &SectionId) -> RenderAction {
        let name = match id {
            SectionId::Name(name) => name,
            SectionId::Template(def) => return RenderAction::Template(Rc::clone(def)),
            SectionId::Instance(inst) => return RenderAction::Instance(Rc::clone(inst)),
        };
        if let Some(action) = self.actions.get(name) {
            return action.clone();
        }

        let engine = self.engine();
        let action = engine
            .extra_operations()
            .get(name)
            .cloned()
            .or_else(|| {
                self.format()
                    .and_then(|format| engine.capabilities(format))
                    .and_then(|set| set.get(name).cloned())
            })
            .or_else(|| self.definition().operation(name))
            .map(RenderAction::Operation)
            .unwrap_or_else(|| RenderAction::File(name.clone()));

        self.actions.insert(name.clone(), action.clone());
        action
    }

    fn render_section(
        &mut self,
        id: &SectionId,
        continuation: &mut Continuation<'_>,
    ) -> Result<String, TemplateError> {
        debug!("Templates: inside {:?}", self);
        match self.action_for(id) {
            RenderAction::Operation(op) => op(self, continuation),
            RenderAction::File(name) => self.render_file(&name, continuation),
            RenderAction::Template(def) => def.run(self.engine(), self.options().clone()),
            RenderAction::Instance(inst) => {
                let options = self.options().clone();
                let mut nested = inst.try_borrow_mut().map_err(|_| {
                    TemplateError::InvalidSectionEntry {
                        template: self.definition().path().to_string(),
                        position: format!("{:?}", id),
                        message: "nested instance is already rendering".to_string(),
                    }
                })?;
                let sections = nested.sections().clone();
                nested.run(Some(&options), Some(sections), 0, false, None)
            }
        }
    }
}
