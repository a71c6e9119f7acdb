//! Custom render operations and capability sets

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::continuation::Continuation;
use super::instance::TemplateInstance;
use crate::error::TemplateError;

/// A custom render action for a named section
///
/// Receives the running instance and the continuation controlling the
/// section's subsections; returns the section's text.
pub type Operation =
    Rc<dyn Fn(&mut TemplateInstance, &mut Continuation<'_>) -> Result<String, TemplateError>>;

/// Section tree builder, run once when an instance is created
pub type InitHook = Rc<dyn Fn(&mut TemplateInstance) -> Result<(), TemplateError>>;

/// A named set of operations mixed into an instance
#[derive(Clone, Default)]
pub struct CapabilitySet {
    operations: HashMap<String, Operation>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, op: F)
    where
        F: Fn(&mut TemplateInstance, &mut Continuation<'_>) -> Result<String, TemplateError>
            + 'static,
    {
        self.operations.insert(name.into(), Rc::new(op));
    }

    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_set().entries(names).finish()
    }
}
