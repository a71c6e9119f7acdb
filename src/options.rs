//! Render configuration snapshots
//!
//! An [`Options`] value is an immutable mapping of option name to TOML value.
//! Installed snapshots are shared behind an `Rc` and never mutated; applying
//! overrides always produces a new snapshot.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use toml::{Table, Value};

/// Option key selecting the output-format capability set
pub const FORMAT_KEY: &str = "format";

/// Option key prepended to paths resolved through a template instance
pub const TEMPLATE_KEY: &str = "template";

/// Output format selected by the `format` option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Html,
    Text,
    Graph,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Html => "html",
            Format::Text => "text",
            Format::Graph => "graph",
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" => Ok(Format::Html),
            "text" => Ok(Format::Text),
            "graph" => Ok(Format::Graph),
            other => Err(format!("unrecognized format: {}", other)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable configuration snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options(Rc<Table>);

impl Options {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: Table) -> Self {
        Self(Rc::new(table))
    }

    /// Parse a snapshot from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let table: Table = toml::from_str(content)?;
        Ok(Self::from_table(table))
    }

    /// Return a copy of this snapshot with `key` set to `value`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Rc::make_mut(&mut self.0).insert(key.into(), value.into());
        self
    }

    /// Merge `overrides` on top of this snapshot; overrides win on collision
    pub fn merge(&self, overrides: &Options) -> Options {
        if overrides.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return overrides.clone();
        }
        let mut table = (*self.0).clone();
        for (key, value) in overrides.iter() {
            table.insert(key.clone(), value.clone());
        }
        Self::from_table(table)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a dotted key (`a.b.c`), descending into nested tables
    pub fn lookup(&self, dotted: &str) -> Option<&Value> {
        let mut parts = dotted.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.as_table()?.get(part)?;
        }
        Some(current)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// The capability format selected by the `format` key, if recognized
    pub fn format(&self) -> Option<Format> {
        self.get_str(FORMAT_KEY).and_then(|s| s.parse().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether both handles point at the same installed snapshot
    pub fn ptr_eq(&self, other: &Options) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Table> for Options {
    fn from(table: Table) -> Self {
        Self::from_table(table)
    }
}

/// Render an option value as text
///
/// Strings are emitted without quotes; other values use their TOML form.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Datetime(d) => d.to_string(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(", "),
        Value::Table(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overrides_win() {
        let base = Options::new().with("a", 1).with("b", "x");
        let merged = base.merge(&Options::new().with("b", "y"));

        assert_eq!(merged.get("a"), Some(&Value::Integer(1)));
        assert_eq!(merged.get_str("b"), Some("y"));
        // the base snapshot is untouched
        assert_eq!(base.get_str("b"), Some("x"));
    }

    #[test]
    fn test_with_does_not_mutate_shared_snapshot() {
        let base = Options::new().with("a", 1);
        let shared = base.clone();
        let changed = base.with("a", 2);

        assert_eq!(shared.get("a"), Some(&Value::Integer(1)));
        assert_eq!(changed.get("a"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_format_exact_match() {
        assert_eq!(Options::new().with("format", "html").format(), Some(Format::Html));
        assert_eq!(Options::new().with("format", "graph").format(), Some(Format::Graph));
        assert_eq!(Options::new().with("format", "HTML").format(), None);
        assert_eq!(Options::new().with("format", "pdf").format(), None);
        assert_eq!(Options::new().format(), None);
    }

    #[test]
    fn test_lookup_dotted() {
        let opts = Options::from_toml_str("[owner]\nname = \"Ada\"\n").unwrap();
        assert_eq!(opts.lookup("owner.name").and_then(Value::as_str), Some("Ada"));
        assert!(opts.lookup("owner.missing").is_none());
        assert!(opts.lookup("nobody").is_none());
    }

    #[test]
    fn test_stringify_values() {
        assert_eq!(stringify(&Value::String("hi".into())), "hi");
        assert_eq!(stringify(&Value::Integer(3)), "3");
        assert_eq!(stringify(&Value::Boolean(true)), "true");
        assert_eq!(
            stringify(&Value::Array(vec![Value::Integer(1), Value::Integer(2)])),
            "1, 2"
        );
    }
}
