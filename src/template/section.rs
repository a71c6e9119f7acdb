//! Section trees
//!
//! A [`SectionList`] is a flat, ordered list of entries. An entry is either a
//! section identifier or a subtree; a subtree belongs to the section directly
//! before it and is only rendered when that section's renderer resumes its
//! continuation.
//!
//! ```text
//! header, [name, children], footer
//! ```
//!
//! Here `name` and `children` are subsections of `header`. A subtree directly
//! following another subtree is a placeholder: it is never rendered and is
//! skipped when a continuation advances through its list.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use toml::Value;

use super::definition::TemplateDefinition;
use super::instance::TemplateInstance;
use crate::error::TemplateError;

const LEADING_SUBTREE: &str = "subtree has no governing section";

/// Identifier of a single section
#[derive(Clone)]
pub enum SectionId {
    /// Rendered by a custom operation of that name, or from `<name>.<ext>`
    Name(String),
    /// Rendered by running a fresh instance of the definition
    Template(Rc<TemplateDefinition>),
    /// Rendered by running an existing instance's own section tree
    Instance(Rc<RefCell<TemplateInstance>>),
}

impl SectionId {
    pub fn name(&self) -> Option<&str> {
        match self {
            SectionId::Name(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Debug for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionId::Name(name) => write!(f, "{}", name),
            SectionId::Template(def) => write!(f, "T({})", def.path()),
            SectionId::Instance(inst) => match inst.try_borrow() {
                Ok(inst) => write!(f, "{:?}", inst),
                Err(_) => f.write_str("Template(<running>)"),
            },
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<&str> for SectionId {
    fn from(name: &str) -> Self {
        SectionId::Name(name.to_string())
    }
}

impl From<String> for SectionId {
    fn from(name: String) -> Self {
        SectionId::Name(name)
    }
}

impl From<Rc<TemplateDefinition>> for SectionId {
    fn from(def: Rc<TemplateDefinition>) -> Self {
        SectionId::Template(def)
    }
}

impl From<&Rc<TemplateDefinition>> for SectionId {
    fn from(def: &Rc<TemplateDefinition>) -> Self {
        SectionId::Template(Rc::clone(def))
    }
}

impl From<Rc<RefCell<TemplateInstance>>> for SectionId {
    fn from(inst: Rc<RefCell<TemplateInstance>>) -> Self {
        SectionId::Instance(inst)
    }
}

/// One entry of a section list
#[derive(Debug, Clone)]
pub enum SectionEntry {
    Section(SectionId),
    Subtree(SectionList),
}

impl SectionEntry {
    pub fn is_subtree(&self) -> bool {
        matches!(self, SectionEntry::Subtree(_))
    }
}

/// Ordered, cheaply clonable list of section entries
#[derive(Clone, Default)]
pub struct SectionList(Rc<Vec<SectionEntry>>);

impl SectionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section
    pub fn section(mut self, id: impl Into<SectionId>) -> Self {
        Rc::make_mut(&mut self.0).push(SectionEntry::Section(id.into()));
        self
    }

    /// Append a section together with its subsections
    pub fn nested(self, id: impl Into<SectionId>, subsections: SectionList) -> Self {
        self.section(id).subtree(subsections)
    }

    /// Append a bare subtree entry
    pub fn subtree(mut self, subsections: SectionList) -> Self {
        Rc::make_mut(&mut self.0).push(SectionEntry::Subtree(subsections));
        self
    }

    pub fn entries(&self) -> &[SectionEntry] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&SectionEntry> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The subtree at `index`, if that entry is a subtree
    pub fn subtree_at(&self, index: usize) -> Option<SectionList> {
        match self.0.get(index) {
            Some(SectionEntry::Subtree(list)) => Some(list.clone()),
            _ => None,
        }
    }

    /// Check that every subtree has a governing section
    ///
    /// A subtree as the first entry of a list has no section to belong to.
    pub fn validate(&self, template: &str) -> Result<(), TemplateError> {
        self.validate_at(template, "")
    }

    fn validate_at(&self, template: &str, prefix: &str) -> Result<(), TemplateError> {
        for (index, entry) in self.0.iter().enumerate() {
            let SectionEntry::Subtree(list) = entry else {
                continue;
            };
            let position = format!("{}{}", prefix, index);
            if index == 0 {
                return Err(invalid_entry(template, position, LEADING_SUBTREE));
            }
            list.validate_at(template, &format!("{}.", position))?;
        }
        Ok(())
    }

    /// Check the shape of TOML section values without resolving templates
    ///
    /// Catches unsupported entries and leading subtrees when a manifest is
    /// loaded; nested templates are only resolved by [`from_toml`](Self::from_toml).
    pub fn check_toml(template: &str, values: &[Value]) -> Result<(), TemplateError> {
        Self::check_toml_at(template, values, "")
    }

    fn check_toml_at(
        template: &str,
        values: &[Value],
        prefix: &str,
    ) -> Result<(), TemplateError> {
        for (index, value) in values.iter().enumerate() {
            let position = format!("{}{}", prefix, index);
            match value {
                Value::Array(_) if index == 0 => {
                    return Err(invalid_entry(template, position, LEADING_SUBTREE));
                }
                Value::Array(items) => {
                    Self::check_toml_at(template, items, &format!("{}.", position))?;
                }
                other => {
                    if let Err(message) = toml_entry_kind(other) {
                        return Err(invalid_entry(template, position, message));
                    }
                }
            }
        }
        Ok(())
    }

    /// Decode a list from TOML values
    ///
    /// Strings are section names, arrays are subtrees and `{ template = "path" }`
    /// tables name nested templates, resolved through `resolve`.
    pub fn from_toml<F>(
        template: &str,
        values: &[Value],
        resolve: &mut F,
    ) -> Result<SectionList, TemplateError>
    where
        F: FnMut(&str) -> Result<Rc<TemplateDefinition>, TemplateError>,
    {
        let mut list = SectionList::new();
        for (index, value) in values.iter().enumerate() {
            list = match value {
                Value::Array(items) => list.subtree(Self::from_toml(template, items, resolve)?),
                other => match toml_entry_kind(other) {
                    Ok(TomlEntry::Name(name)) => list.section(name),
                    Ok(TomlEntry::Template(path)) => list.section(resolve(path)?),
                    Err(msg) => return Err(invalid_entry(template, index.to_string(), msg)),
                },
            };
        }
        Ok(list)
    }
}

enum TomlEntry<'v> {
    Name(&'v str),
    Template(&'v str),
}

/// Classify a non-array TOML section entry
fn toml_entry_kind(value: &Value) -> Result<TomlEntry<'_>, String> {
    match value {
        Value::String(name) => Ok(TomlEntry::Name(name)),
        Value::Table(table) => table
            .get("template")
            .and_then(Value::as_str)
            .map(TomlEntry::Template)
            .ok_or_else(|| "table entries need a `template` key".to_string()),
        other => Err(format!("unsupported {} entry", other.type_str())),
    }
}

fn invalid_entry(template: &str, position: String, message: impl Into<String>) -> TemplateError {
    TemplateError::InvalidSectionEntry {
        template: template.to_string(),
        position,
        message: message.into(),
    }
}

impl fmt::Debug for SectionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for entry in self.0.iter() {
            match entry {
                SectionEntry::Section(id) => list.entry(id),
                SectionEntry::Subtree(sub) => list.entry(sub),
            };
        }
        list.finish()
    }
}

impl From<Vec<SectionEntry>> for SectionList {
    fn from(entries: Vec<SectionEntry>) -> Self {
        Self(Rc::new(entries))
    }
}
