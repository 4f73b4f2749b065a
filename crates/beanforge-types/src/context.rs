//! Diagnostic channel between the writers and the front end

use crate::element::ClassElement;
use rustc_hash::FxHashMap;
use std::fmt;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fails the build once processing completes
    Error,
    /// Informational
    Warning,
}

/// A message attributed to an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// Message text
    pub message: String,
    /// Name of the element the message is about
    pub element: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.element {
            Some(e) => write!(f, "{}: {} [{}]", level, self.message, e),
            None => write!(f, "{}: {}", level, self.message),
        }
    }
}

/// Services the front end offers to the writers
///
/// User-facing problems are reported through `fail` so the front end can keep
/// processing other types and report every error at the end.
pub trait VisitorContext {
    /// Report an error against an element
    fn fail(&mut self, message: &str, element: Option<&str>);

    /// Report a warning against an element
    fn warn(&mut self, message: &str, element: Option<&str>);

    /// Processor options as a key-value map
    fn options(&self) -> &FxHashMap<String, String>;

    /// Look up a type on the compilation classpath
    fn class_element(&self, name: &str) -> Option<&ClassElement>;
}

/// [`VisitorContext`] that stores every diagnostic in memory
#[derive(Debug, Default)]
pub struct CollectingVisitorContext {
    diagnostics: Vec<Diagnostic>,
    options: FxHashMap<String, String>,
    classes: FxHashMap<String, ClassElement>,
}

impl CollectingVisitorContext {
    /// Empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a processor option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Make a type resolvable through [`VisitorContext::class_element`]
    pub fn with_class(mut self, element: ClassElement) -> Self {
        self.classes.insert(element.name.clone(), element);
        self
    }

    /// Every diagnostic in report order
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Error diagnostics only
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect()
    }

    /// Whether any error was reported
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    fn push(&mut self, severity: Severity, message: &str, element: Option<&str>) {
        self.diagnostics.push(Diagnostic {
            severity,
            message: message.to_string(),
            element: element.map(str::to_string),
        });
    }
}

impl VisitorContext for CollectingVisitorContext {
    fn fail(&mut self, message: &str, element: Option<&str>) {
        self.push(Severity::Error, message, element);
    }

    fn warn(&mut self, message: &str, element: Option<&str>) {
        self.push(Severity::Warning, message, element);
    }

    fn options(&self) -> &FxHashMap<String, String> {
        &self.options
    }

    fn class_element(&self, name: &str) -> Option<&ClassElement> {
        self.classes.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_diagnostics_in_order() {
        let mut ctx = CollectingVisitorContext::new();
        ctx.warn("first", None);
        ctx.fail("second", Some("a.B"));
        assert_eq!(ctx.diagnostics().len(), 2);
        assert!(ctx.has_errors());
        assert_eq!(ctx.errors()[0].to_string(), "error: second [a.B]");
    }

    #[test]
    fn test_class_lookup() {
        let ctx = CollectingVisitorContext::new()
            .with_class(ClassElement::of("a.B"))
            .with_option("k", "v");
        assert!(ctx.class_element("a.B").is_some());
        assert!(ctx.class_element("a.C").is_none());
        assert_eq!(ctx.options().get("k").map(String::as_str), Some("v"));
    }
}
