//! Class output visitors
//!
//! Writers hand every generated class to a [`ClassOutputVisitor`] together with
//! the names of the source elements it originates from. Service descriptors are
//! collected separately and flushed by [`ClassOutputVisitor::finish`].

use crate::error::WriterResult;
use beanforge_bytecode::{ClassDef, ClassFileWriter};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Destination for generated classes and service descriptors
pub trait ClassOutputVisitor {
    /// Open a byte sink for the class `name`
    fn visit_class<'a>(&'a mut self, name: &str, originating: &[String]) -> WriterResult<Box<dyn Write + 'a>>;

    /// Register `implementation` as a provider of `service`
    fn visit_service_descriptor(&mut self, service: &str, implementation: &str, originating: &[String]);

    /// Flush pending service descriptors
    fn finish(&mut self) -> WriterResult<()>;

    /// Write the encoded bytes of one class
    fn write_class(&mut self, name: &str, originating: &[String], bytes: &[u8]) -> WriterResult<()> {
        let mut sink = self.visit_class(name, originating)?;
        sink.write_all(bytes)?;
        sink.flush()?;
        Ok(())
    }
}

/// Encode a class and its inner types and write them all to `visitor`
pub fn write_class_def(
    visitor: &mut dyn ClassOutputVisitor,
    class: &ClassDef,
    originating: &[String],
) -> WriterResult<()> {
    for (name, bytes) in ClassFileWriter::write_all(class)? {
        log::trace!("Writing class {} ({} bytes)", name, bytes.len());
        visitor.write_class(&name, originating, &bytes)?;
    }
    Ok(())
}

// ===== In memory =====

/// Keeps every class and service registration in memory
#[derive(Debug, Default)]
pub struct InMemoryClassOutput {
    classes: BTreeMap<String, Vec<u8>>,
    originating: BTreeMap<String, Vec<String>>,
    services: BTreeMap<String, BTreeSet<String>>,
    finished: bool,
}

impl InMemoryClassOutput {
    /// Create an empty output
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of a written class
    pub fn class_bytes(&self, name: &str) -> Option<&[u8]> {
        self.classes.get(name).map(Vec::as_slice)
    }

    /// Names of all written classes, sorted
    pub fn class_names(&self) -> Vec<&str> {
        self.classes.keys().map(String::as_str).collect()
    }

    /// Originating elements recorded for a class
    pub fn originating_elements(&self, name: &str) -> &[String] {
        self.originating.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Implementations registered for a service
    pub fn service_implementations(&self, service: &str) -> Vec<&str> {
        self.services
            .get(service)
            .map(|s| s.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether `finish` was called
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl ClassOutputVisitor for InMemoryClassOutput {
    fn visit_class<'a>(&'a mut self, name: &str, originating: &[String]) -> WriterResult<Box<dyn Write + 'a>> {
        self.originating.insert(name.to_string(), originating.to_vec());
        let sink = self.classes.entry(name.to_string()).or_default();
        sink.clear();
        Ok(Box::new(sink))
    }

    fn visit_service_descriptor(&mut self, service: &str, implementation: &str, _originating: &[String]) {
        self.services
            .entry(service.to_string())
            .or_default()
            .insert(implementation.to_string());
    }

    fn finish(&mut self) -> WriterResult<()> {
        self.finished = true;
        Ok(())
    }
}

// ===== Directory =====

/// Writes `pkg/Name.class` files under a root directory and
/// `META-INF/services/<service>` files on finish
#[derive(Debug)]
pub struct DirectoryClassOutput {
    root: PathBuf,
    services: BTreeMap<String, BTreeSet<String>>,
}

impl DirectoryClassOutput {
    /// Output rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            services: BTreeMap::new(),
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a class is written to
    pub fn class_path(&self, name: &str) -> PathBuf {
        let mut path = self.root.clone();
        let mut segments: Vec<&str> = name.split('.').collect();
        let file = segments.pop().unwrap_or(name);
        for segment in segments {
            path.push(segment);
        }
        path.push(format!("{}.class", file));
        path
    }
}

impl ClassOutputVisitor for DirectoryClassOutput {
    fn visit_class<'a>(&'a mut self, name: &str, _originating: &[String]) -> WriterResult<Box<dyn Write + 'a>> {
        let path = self.class_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Box::new(fs::File::create(path)?))
    }

    fn visit_service_descriptor(&mut self, service: &str, implementation: &str, _originating: &[String]) {
        self.services
            .entry(service.to_string())
            .or_default()
            .insert(implementation.to_string());
    }

    fn finish(&mut self) -> WriterResult<()> {
        if self.services.is_empty() {
            return Ok(());
        }
        let dir = self.root.join("META-INF").join("services");
        fs::create_dir_all(&dir)?;
        for (service, implementations) in std::mem::take(&mut self.services) {
            let path = dir.join(&service);
            let mut all: BTreeSet<String> = match fs::read_to_string(&path) {
                Ok(existing) => existing
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.starts_with('#'))
                    .map(str::to_string)
                    .collect(),
                Err(_) => BTreeSet::new(),
            };
            all.extend(implementations);
            let mut content = String::new();
            for implementation in &all {
                content.push_str(implementation);
                content.push('\n');
            }
            fs::write(&path, content)?;
            log::debug!("Wrote {} provider(s) for service {}", all.len(), service);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_output() {
        let mut output = InMemoryClassOutput::new();
        output.write_class("a.B", &["a.Source".to_string()], &[1, 2, 3]).unwrap();
        output.write_class("a.B", &[], &[4]).unwrap();
        output.visit_service_descriptor("svc.S", "a.B", &[]);
        output.visit_service_descriptor("svc.S", "a.B", &[]);
        output.finish().unwrap();

        assert_eq!(output.class_bytes("a.B"), Some(&[4u8][..]));
        assert_eq!(output.service_implementations("svc.S"), vec!["a.B"]);
        assert!(output.is_finished());
    }

    #[test]
    fn test_class_path() {
        let output = DirectoryClassOutput::new("/out");
        assert_eq!(output.class_path("a.b.$C$Definition"), PathBuf::from("/out/a/b/$C$Definition.class"));
        assert_eq!(output.class_path("Top"), PathBuf::from("/out/Top.class"));
    }
}
