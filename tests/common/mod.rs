//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::cell::Cell;
use std::fs;
use std::io;
use std::path::Path;
use std::rc::Rc;

use tempfile::TempDir;
use template_composer::{Continuation, EngineConfig, FileReader, TemplateError, TemplateInstance};

/// A template root on disk
pub struct Fixture {
    root: TempDir,
}

impl Fixture {
    /// Create a root containing `files` (relative path, content)
    pub fn new(files: &[(&str, &str)]) -> Self {
        let root = tempfile::tempdir().expect("Should create temp dir");
        for (path, content) in files {
            let full = root.path().join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).expect("Should create dirs");
            }
            fs::write(&full, content).expect("Should write file");
        }
        Self { root }
    }

    /// Create empty template directories
    pub fn with_dirs(self, dirs: &[&str]) -> Self {
        for dir in dirs {
            fs::create_dir_all(self.root.path().join(dir)).expect("Should create dir");
        }
        self
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig::new().with_template_path(self.root.path())
    }
}

/// File reader counting how often it is asked to read
#[derive(Clone, Default)]
pub struct CountingReader {
    reads: Rc<Cell<usize>>,
}

impl CountingReader {
    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl FileReader for CountingReader {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.reads.set(self.reads.get() + 1);
        fs::read_to_string(path)
    }
}

/// Operation emitting fixed text and never resuming its continuation
pub fn emit(
    text: &'static str,
) -> impl Fn(&mut TemplateInstance, &mut Continuation<'_>) -> Result<String, TemplateError> {
    move |_, _| Ok(text.to_string())
}

/// Operation emitting the value of an option
pub fn option(
    key: &'static str,
) -> impl Fn(&mut TemplateInstance, &mut Continuation<'_>) -> Result<String, TemplateError> {
    move |inst, _| Ok(inst.options().get_str(key).unwrap_or("-").to_string())
}
