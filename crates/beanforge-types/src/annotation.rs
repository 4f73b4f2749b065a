//! Annotation metadata as handed over by a front end
//!
//! The generator treats metadata as a queryable value: it never merges or
//! evaluates annotations itself. Members and maps are kept in sorted
//! containers so the serialized form is stable, which the metadata cache
//! relies on.

use crate::error::ElementError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Annotation that lists the interceptor bindings of an element
pub const INTERCEPTOR_BINDING_DEFINITIONS: &str = "io.beanforge.aop.InterceptorBindingDefinitions";

/// Prefix marking an evaluated expression inside a string member
pub const EXPRESSION_PREFIX: &str = "#{";

/// Kind of an interceptor binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterceptorKind {
    /// Method interception
    Around,
    /// Constructor interception
    AroundConstruct,
    /// Introduction advice on abstract members
    Introduction,
    /// Post-construct interception
    PostConstruct,
    /// Pre-destroy interception
    PreDestroy,
}

impl InterceptorKind {
    /// Name used in generated code
    pub fn name(self) -> &'static str {
        match self {
            InterceptorKind::Around => "AROUND",
            InterceptorKind::AroundConstruct => "AROUND_CONSTRUCT",
            InterceptorKind::Introduction => "INTRODUCTION",
            InterceptorKind::PostConstruct => "POST_CONSTRUCT",
            InterceptorKind::PreDestroy => "PRE_DESTROY",
        }
    }

    /// Parse a kind name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "AROUND" => Some(InterceptorKind::Around),
            "AROUND_CONSTRUCT" => Some(InterceptorKind::AroundConstruct),
            "INTRODUCTION" => Some(InterceptorKind::Introduction),
            "POST_CONSTRUCT" => Some(InterceptorKind::PostConstruct),
            "PRE_DESTROY" => Some(InterceptorKind::PreDestroy),
            _ => None,
        }
    }
}

/// Value of an annotation member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationValue {
    /// String
    String(String),
    /// Boolean
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// Double
    Double(f64),
    /// String array
    Strings(Vec<String>),
    /// Class reference by name
    Class(String),
    /// Class array
    Classes(Vec<String>),
    /// Enum constant name
    Enum(String),
    /// Nested annotation
    Annotation(Box<AnnotationEntry>),
    /// Nested annotation array
    Annotations(Vec<AnnotationEntry>),
}

impl AnnotationValue {
    /// Single string form of the value, if it has one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnnotationValue::String(s) | AnnotationValue::Class(s) | AnnotationValue::Enum(s) => Some(s),
            AnnotationValue::Strings(v) | AnnotationValue::Classes(v) => v.first().map(String::as_str),
            _ => None,
        }
    }

    /// All string forms of the value
    pub fn as_strings(&self) -> Vec<String> {
        match self {
            AnnotationValue::String(s) | AnnotationValue::Class(s) | AnnotationValue::Enum(s) => vec![s.clone()],
            AnnotationValue::Strings(v) | AnnotationValue::Classes(v) => v.clone(),
            _ => Vec::new(),
        }
    }

    /// Nested annotations held by the value
    pub fn as_annotations(&self) -> Vec<&AnnotationEntry> {
        match self {
            AnnotationValue::Annotation(a) => vec![a.as_ref()],
            AnnotationValue::Annotations(v) => v.iter().collect(),
            _ => Vec::new(),
        }
    }

    fn collect_expressions(&self, out: &mut Vec<String>) {
        match self {
            AnnotationValue::String(s) if is_expression(s) => out.push(s.clone()),
            AnnotationValue::Strings(v) => out.extend(v.iter().filter(|s| is_expression(s)).cloned()),
            _ => {
                for nested in self.as_annotations() {
                    nested.collect_expressions(out);
                }
            }
        }
    }
}

fn is_expression(value: &str) -> bool {
    value.trim_start().starts_with(EXPRESSION_PREFIX) && value.trim_end().ends_with('}')
}

/// One annotation with its member values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationEntry {
    /// Annotation type name
    pub name: String,
    /// Member values by name
    #[serde(default)]
    pub values: BTreeMap<String, AnnotationValue>,
}

impl AnnotationEntry {
    /// Annotation without members
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    /// Add a member value
    pub fn with(mut self, member: impl Into<String>, value: AnnotationValue) -> Self {
        self.values.insert(member.into(), value);
        self
    }

    /// Member value
    pub fn value(&self, member: &str) -> Option<&AnnotationValue> {
        self.values.get(member)
    }

    /// Member value as a string
    pub fn string_value(&self, member: &str) -> Option<String> {
        self.value(member).and_then(|v| v.as_str()).map(str::to_string)
    }

    /// Member value as a boolean
    pub fn bool_value(&self, member: &str) -> Option<bool> {
        match self.value(member) {
            Some(AnnotationValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    fn collect_expressions(&self, out: &mut Vec<String>) {
        for value in self.values.values() {
            value.collect_expressions(out);
        }
    }
}

/// Annotation metadata of one element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationMetadata {
    /// Annotations declared directly on the element
    #[serde(default)]
    pub declared: Vec<AnnotationEntry>,
    /// Annotations inherited from supertypes or overridden members
    #[serde(default)]
    pub inherited: Vec<AnnotationEntry>,
    /// Stereotype name to the names of annotations carrying it
    #[serde(default)]
    pub stereotypes: BTreeMap<String, Vec<String>>,
    /// Member defaults per annotation name
    #[serde(default)]
    pub defaults: BTreeMap<String, BTreeMap<String, AnnotationValue>>,
    /// Repeatable annotation name to its container annotation name
    #[serde(default)]
    pub repeatable: BTreeMap<String, String>,
}

impl AnnotationMetadata {
    /// Metadata with no annotations
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse metadata from its JSON form
    pub fn from_json(json: &str) -> Result<Self, ElementError> {
        serde_json::from_str(json).map_err(|e| ElementError::InvalidMetadata { message: e.to_string() })
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, ElementError> {
        serde_json::to_string(self).map_err(|e| ElementError::InvalidMetadata { message: e.to_string() })
    }

    // ===== Construction =====

    /// Add a declared annotation
    pub fn declare(mut self, entry: AnnotationEntry) -> Self {
        self.declared.push(entry);
        self
    }

    /// Add an inherited annotation
    pub fn inherit(mut self, entry: AnnotationEntry) -> Self {
        self.inherited.push(entry);
        self
    }

    /// Record that `annotation` carries `stereotype`
    pub fn stereotype(mut self, stereotype: impl Into<String>, annotation: impl Into<String>) -> Self {
        let names = self.stereotypes.entry(stereotype.into()).or_default();
        let annotation = annotation.into();
        if !names.contains(&annotation) {
            names.push(annotation);
        }
        self
    }

    /// Record member defaults of an annotation
    pub fn with_defaults(
        mut self,
        annotation: impl Into<String>,
        defaults: impl IntoIterator<Item = (String, AnnotationValue)>,
    ) -> Self {
        self.defaults.entry(annotation.into()).or_default().extend(defaults);
        self
    }

    /// Record the container of a repeatable annotation
    pub fn with_repeatable(mut self, annotation: impl Into<String>, container: impl Into<String>) -> Self {
        self.repeatable.insert(annotation.into(), container.into());
        self
    }

    // ===== Queries =====

    /// Whether there are no annotations at all
    pub fn is_empty(&self) -> bool {
        self.declared.is_empty() && self.inherited.is_empty() && self.stereotypes.is_empty()
    }

    fn all(&self) -> impl Iterator<Item = &AnnotationEntry> {
        self.declared.iter().chain(self.inherited.iter())
    }

    /// Names of all annotations, declared first
    pub fn annotation_names(&self) -> Vec<&str> {
        self.all().map(|a| a.name.as_str()).collect()
    }

    /// Whether the annotation is present, declared or inherited
    pub fn has_annotation(&self, name: &str) -> bool {
        self.all().any(|a| a.name == name)
    }

    /// Whether the annotation is declared directly
    pub fn has_declared_annotation(&self, name: &str) -> bool {
        self.declared.iter().any(|a| a.name == name)
    }

    /// Whether the annotation is present directly or as a stereotype
    pub fn has_stereotype(&self, name: &str) -> bool {
        self.has_annotation(name)
            || self
                .stereotypes
                .get(name)
                .map_or(false, |names| names.iter().any(|n| self.has_annotation(n)))
    }

    /// Whether the stereotype comes from a declared annotation
    pub fn has_declared_stereotype(&self, name: &str) -> bool {
        self.has_declared_annotation(name)
            || self
                .stereotypes
                .get(name)
                .map_or(false, |names| names.iter().any(|n| self.has_declared_annotation(n)))
    }

    /// First occurrence of the annotation
    pub fn find_annotation(&self, name: &str) -> Option<&AnnotationEntry> {
        self.all().find(|a| a.name == name)
    }

    /// Every occurrence of a repeatable annotation, including those held by its container
    pub fn repeated(&self, name: &str) -> Vec<&AnnotationEntry> {
        let mut out: Vec<&AnnotationEntry> = self.all().filter(|a| a.name == name).collect();
        if let Some(container) = self.find_repeatable_container(name) {
            for c in self.all().filter(|a| a.name == container) {
                if let Some(v) = c.value("value") {
                    out.extend(v.as_annotations());
                }
            }
        }
        out
    }

    /// Member value, falling back to the recorded default
    pub fn value(&self, annotation: &str, member: &str) -> Option<&AnnotationValue> {
        self.find_annotation(annotation)
            .and_then(|a| a.value(member))
            .or_else(|| self.defaults.get(annotation).and_then(|d| d.get(member)))
    }

    /// Member value as a string
    pub fn string_value(&self, annotation: &str, member: &str) -> Option<String> {
        self.value(annotation, member).and_then(|v| v.as_str()).map(str::to_string)
    }

    /// Member value as a list of strings
    pub fn string_values(&self, annotation: &str, member: &str) -> Vec<String> {
        self.value(annotation, member).map(AnnotationValue::as_strings).unwrap_or_default()
    }

    /// Member value as a boolean
    pub fn bool_value(&self, annotation: &str, member: &str) -> Option<bool> {
        match self.value(annotation, member) {
            Some(AnnotationValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Member value as an integer
    pub fn int_value(&self, annotation: &str, member: &str) -> Option<i64> {
        match self.value(annotation, member) {
            Some(AnnotationValue::Int(i)) => Some(*i as i64),
            Some(AnnotationValue::Long(l)) => Some(*l),
            _ => None,
        }
    }

    /// Whether the member is explicitly set on the annotation
    pub fn is_present(&self, annotation: &str, member: &str) -> bool {
        self.find_annotation(annotation).map_or(false, |a| a.values.contains_key(member))
    }

    /// Present annotations that carry `stereotype`
    pub fn annotation_names_by_stereotype(&self, stereotype: &str) -> Vec<String> {
        self.stereotypes
            .get(stereotype)
            .map(|names| names.iter().filter(|n| self.has_annotation(n)).cloned().collect())
            .unwrap_or_default()
    }

    /// Declared annotations that carry `stereotype`
    pub fn declared_annotation_names_by_stereotype(&self, stereotype: &str) -> Vec<String> {
        self.stereotypes
            .get(stereotype)
            .map(|names| names.iter().filter(|n| self.has_declared_annotation(n)).cloned().collect())
            .unwrap_or_default()
    }

    /// Container annotation of a repeatable annotation
    pub fn find_repeatable_container(&self, name: &str) -> Option<&str> {
        self.repeatable.get(name).map(String::as_str)
    }

    /// Interceptor bindings as `(binding annotation, kind)` pairs
    pub fn interceptor_bindings(&self) -> Vec<(Option<String>, InterceptorKind)> {
        let mut out = Vec::new();
        for definitions in self.all().filter(|a| a.name == INTERCEPTOR_BINDING_DEFINITIONS) {
            let Some(value) = definitions.value("value") else {
                continue;
            };
            for binding in value.as_annotations() {
                let kind = binding
                    .string_value("kind")
                    .and_then(|k| InterceptorKind::from_name(&k))
                    .unwrap_or(InterceptorKind::Around);
                out.push((binding.string_value("value"), kind));
            }
        }
        out
    }

    /// Distinct binding kinds
    pub fn interceptor_binding_kinds(&self) -> Vec<InterceptorKind> {
        let mut kinds = Vec::new();
        for (_, kind) in self.interceptor_bindings() {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }

    /// Whether a binding of `kind` is present
    pub fn has_interceptor_binding(&self, kind: InterceptorKind) -> bool {
        self.interceptor_bindings().iter().any(|(_, k)| *k == kind)
    }

    /// Evaluated expressions (`#{...}`) found in member values, in declaration order
    pub fn evaluated_expressions(&self) -> Vec<String> {
        let mut out = Vec::new();
        for a in self.all() {
            a.collect_expressions(&mut out);
        }
        out
    }

    /// Whether any member value is an evaluated expression
    pub fn has_evaluated_expressions(&self) -> bool {
        !self.evaluated_expressions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMED: &str = "jakarta.inject.Named";
    const QUALIFIER: &str = "jakarta.inject.Qualifier";

    fn named(value: &str) -> AnnotationMetadata {
        AnnotationMetadata::empty()
            .declare(AnnotationEntry::new(NAMED).with("value", AnnotationValue::String(value.into())))
            .stereotype(QUALIFIER, NAMED)
    }

    #[test]
    fn test_stereotype_queries() {
        let meta = named("primary-db");
        assert!(meta.has_annotation(NAMED));
        assert!(meta.has_stereotype(QUALIFIER));
        assert!(meta.has_declared_stereotype(QUALIFIER));
        assert_eq!(meta.annotation_names_by_stereotype(QUALIFIER), vec![NAMED.to_string()]);
        assert_eq!(meta.string_value(NAMED, "value").as_deref(), Some("primary-db"));
    }

    #[test]
    fn test_inherited_stereotype_is_not_declared() {
        let meta = AnnotationMetadata::empty()
            .inherit(AnnotationEntry::new(NAMED))
            .stereotype(QUALIFIER, NAMED);
        assert!(meta.has_stereotype(QUALIFIER));
        assert!(!meta.has_declared_stereotype(QUALIFIER));
    }

    #[test]
    fn test_defaults_fill_missing_members() {
        let meta = AnnotationMetadata::empty()
            .declare(AnnotationEntry::new("jakarta.inject.Inject"))
            .with_defaults("jakarta.inject.Inject", [("required".to_string(), AnnotationValue::Bool(true))]);
        assert_eq!(meta.bool_value("jakarta.inject.Inject", "required"), Some(true));
        assert!(!meta.is_present("jakarta.inject.Inject", "required"));
    }

    #[test]
    fn test_interceptor_bindings() {
        let binding = AnnotationEntry::new("io.beanforge.aop.InterceptorBinding")
            .with("value", AnnotationValue::Class("a.Logged".into()))
            .with("kind", AnnotationValue::Enum("AROUND_CONSTRUCT".into()));
        let meta = AnnotationMetadata::empty().declare(
            AnnotationEntry::new(INTERCEPTOR_BINDING_DEFINITIONS)
                .with("value", AnnotationValue::Annotations(vec![binding])),
        );
        assert!(meta.has_interceptor_binding(InterceptorKind::AroundConstruct));
        assert!(!meta.has_interceptor_binding(InterceptorKind::Around));
        assert_eq!(meta.interceptor_binding_kinds(), vec![InterceptorKind::AroundConstruct]);
    }

    #[test]
    fn test_repeated_reads_container() {
        let requires = |p: &str| {
            AnnotationEntry::new("io.beanforge.context.Requires").with("property", AnnotationValue::String(p.into()))
        };
        let meta = AnnotationMetadata::empty()
            .declare(
                AnnotationEntry::new("io.beanforge.context.Requirements")
                    .with("value", AnnotationValue::Annotations(vec![requires("a"), requires("b")])),
            )
            .with_repeatable("io.beanforge.context.Requires", "io.beanforge.context.Requirements");
        assert_eq!(meta.repeated("io.beanforge.context.Requires").len(), 2);
    }

    #[test]
    fn test_evaluated_expressions() {
        let meta = AnnotationMetadata::empty().declare(
            AnnotationEntry::new("io.beanforge.context.Value")
                .with("value", AnnotationValue::String("#{ env['port'] }".into())),
        );
        assert!(meta.has_evaluated_expressions());
        assert!(!named("x").has_evaluated_expressions());
    }

    #[test]
    fn test_json_form() {
        let json = r#"{"declared":[{"name":"jakarta.inject.Named","values":{"value":{"string":"db"}}}]}"#;
        let meta = AnnotationMetadata::from_json(json).unwrap();
        assert_eq!(meta.string_value(NAMED, "value").as_deref(), Some("db"));
        assert!(AnnotationMetadata::from_json("{").is_err());
        let again = AnnotationMetadata::from_json(&meta.to_json().unwrap()).unwrap();
        assert_eq!(again, meta);
    }
}
