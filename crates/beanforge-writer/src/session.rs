//! Build session
//!
//! State shared by every writer of one compilation unit: collected annotation
//! defaults, the metadata expression cache, load-class helpers per generated
//! class and the evaluated-expression registry. Writers receive the session by
//! `&mut`; `finish` flushes what is pending and `reset` starts over.

use crate::error::{WriterError, WriterResult};
use crate::gen_utils::{class, type_of};
use crate::metadata::{LoadClassRegistry, MetadataContext};
use crate::options::WriterOptions;
use crate::output::{write_class_def, ClassOutputVisitor};
use crate::runtime;
use beanforge_bytecode::{
    modifiers, AnnotationDef, ClassDef, Constant, ExpressionDef, MethodDef, MethodRef, StatementDef, TypeDef,
};
use beanforge_types::{AnnotationMetadata, AnnotationValue};
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Package of session-level generated classes
pub const GENERATED_PACKAGE: &str = "io.beanforge.generated";

/// One registered evaluated expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatedExpressionDef {
    /// Expression text, including the `#{` `}` delimiters
    pub expression: String,
    /// Generated class evaluating it
    pub class_name: String,
    /// Element the expression was found on
    pub originating: String,
}

/// Caches and registries of one compilation unit
#[derive(Debug, Default)]
pub struct BuildSession {
    options: WriterOptions,
    defaults: BTreeMap<String, BTreeMap<String, AnnotationValue>>,
    repeatable: BTreeMap<String, String>,
    metadata_cache: FxHashMap<String, ExpressionDef>,
    load_classes: FxHashMap<String, LoadClassRegistry>,
    expressions: Vec<EvaluatedExpressionDef>,
    expression_classes: FxHashMap<String, String>,
    expression_counters: FxHashMap<String, usize>,
    written_expressions: usize,
    defaults_classes: usize,
}

impl BuildSession {
    /// Start a session
    pub fn new(options: WriterOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Writer options
    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    // ===== Annotation metadata =====

    /// Expression building `meta` inside the class `owner`
    ///
    /// Results are cached per owner by a digest of the metadata's JSON form.
    pub fn annotation_metadata_expression(&mut self, owner: &str, meta: &AnnotationMetadata) -> WriterResult<ExpressionDef> {
        self.contribute_defaults(meta);
        let json = meta
            .to_json()
            .map_err(|e| WriterError::illegal_argument(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(owner.as_bytes());
        hasher.update([0u8]);
        hasher.update(json.as_bytes());
        let key = format!("{}:{:x}", owner, hasher.finalize());
        if let Some(cached) = self.metadata_cache.get(&key) {
            log::trace!("Annotation metadata cache hit for {}", owner);
            return Ok(cached.clone());
        }
        let expression = {
            let mut context = MetadataContext {
                owner,
                load_classes: self.load_classes.entry(owner.to_string()).or_default(),
                expressions: &self.expression_classes,
            };
            context.metadata(meta)
        };
        self.metadata_cache.insert(key, expression.clone());
        Ok(expression)
    }

    /// Expression for a single annotation member value inside `owner`
    pub fn annotation_value_expression(
        &mut self,
        owner: &str,
        annotation: &str,
        member: &str,
        value: &AnnotationValue,
    ) -> ExpressionDef {
        let mut context = MetadataContext {
            owner,
            load_classes: self.load_classes.entry(owner.to_string()).or_default(),
            expressions: &self.expression_classes,
        };
        context.value(annotation, member, value)
    }

    /// Call of the load-class helper of `class_name` inside `owner`
    pub fn load_class_reference(&mut self, owner: &str, class_name: &str) -> ExpressionDef {
        self.load_classes
            .entry(owner.to_string())
            .or_default()
            .reference(owner, class_name)
    }

    /// Remove and return the load-class helpers registered for `owner`
    pub fn take_load_class_methods(&mut self, owner: &str) -> Vec<MethodDef> {
        let prefix = format!("{}:", owner);
        self.metadata_cache.retain(|k, _| !k.starts_with(&prefix));
        self.load_classes
            .remove(owner)
            .map(|r| r.methods())
            .unwrap_or_default()
    }

    /// Add the member defaults and repeatable containers of `meta` to the session
    pub fn contribute_defaults(&mut self, meta: &AnnotationMetadata) {
        for (annotation, members) in &meta.defaults {
            self.defaults
                .entry(annotation.clone())
                .or_default()
                .extend(members.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        for (annotation, container) in &meta.repeatable {
            self.repeatable.insert(annotation.clone(), container.clone());
        }
    }

    /// Defaults collected so far
    pub fn annotation_defaults(&self) -> &BTreeMap<String, BTreeMap<String, AnnotationValue>> {
        &self.defaults
    }

    // ===== Evaluated expressions =====

    /// Register the evaluated expressions found in `meta`, returning their class names
    pub fn process_evaluated_expressions(&mut self, meta: &AnnotationMetadata, originating: &str) -> Vec<String> {
        let mut names = Vec::new();
        for expression in meta.evaluated_expressions() {
            if let Some(existing) = self.expression_classes.get(&expression) {
                names.push(existing.clone());
                continue;
            }
            let counter = self.expression_counters.entry(originating.to_string()).or_default();
            let class_name = format!("{}$Expr{}", originating, *counter);
            *counter += 1;
            log::debug!("Registered evaluated expression {} as {}", expression, class_name);
            self.expression_classes.insert(expression.clone(), class_name.clone());
            self.expressions.push(EvaluatedExpressionDef {
                expression,
                class_name: class_name.clone(),
                originating: originating.to_string(),
            });
            names.push(class_name);
        }
        names
    }

    /// Registered expressions
    pub fn evaluated_expressions(&self) -> &[EvaluatedExpressionDef] {
        &self.expressions
    }

    /// Write the expression classes registered since the last call
    pub fn write_evaluated_expressions(&mut self, visitor: &mut dyn ClassOutputVisitor) -> WriterResult<()> {
        for def in &self.expressions[self.written_expressions..] {
            let class_def = expression_class(def);
            write_class_def(visitor, &class_def, std::slice::from_ref(&def.originating))?;
        }
        self.written_expressions = self.expressions.len();
        Ok(())
    }

    // ===== Lifecycle =====

    /// Clear every cache and registry
    pub fn reset(&mut self) {
        log::debug!(
            "Resetting build session ({} cached metadata, {} expressions)",
            self.metadata_cache.len(),
            self.expressions.len()
        );
        self.defaults.clear();
        self.repeatable.clear();
        self.metadata_cache.clear();
        self.load_classes.clear();
        self.expressions.clear();
        self.expression_classes.clear();
        self.expression_counters.clear();
        self.written_expressions = 0;
    }

    /// Write pending expression classes and the annotation defaults class, then reset
    pub fn finish(&mut self, visitor: &mut dyn ClassOutputVisitor) -> WriterResult<()> {
        self.write_evaluated_expressions(visitor)?;
        if !self.defaults.is_empty() || !self.repeatable.is_empty() {
            let name = if self.defaults_classes == 0 {
                format!("{}.$AnnotationDefaultValues", GENERATED_PACKAGE)
            } else {
                format!("{}.$AnnotationDefaultValues{}", GENERATED_PACKAGE, self.defaults_classes)
            };
            self.defaults_classes += 1;
            let class_def = self.defaults_class(&name);
            write_class_def(visitor, &class_def, &[])?;
            visitor.visit_service_descriptor(runtime::ANNOTATION_DEFAULT_VALUES, &name, &[]);
        }
        self.reset();
        Ok(())
    }

    fn defaults_class(&mut self, name: &str) -> ClassDef {
        let mut registry = LoadClassRegistry::default();
        let statement = {
            let mut context = MetadataContext {
                owner: name,
                load_classes: &mut registry,
                expressions: &self.expression_classes,
            };
            context.register_defaults(&self.defaults, &self.repeatable)
        };
        let mut builder = ClassDef::builder(name);
        builder
            .add_modifiers(modifiers::FINAL | modifiers::SYNTHETIC)
            .add_interface(class(runtime::ANNOTATION_DEFAULT_VALUES))
            .add_annotation(AnnotationDef::of(runtime::GENERATED))
            .add_static_statement(statement)
            .add_method(default_constructor(modifiers::PUBLIC, None));
        for method in registry.methods() {
            builder.add_method(method);
        }
        builder.build()
    }
}

/// `public <init>() { super(); }` for a class extending `superclass` (Object when `None`)
pub(crate) fn default_constructor(modifier_bits: u16, superclass: Option<&str>) -> MethodDef {
    let super_ctor = MethodRef::constructor(superclass.unwrap_or(runtime::OBJECT), vec![]);
    MethodDef::constructor()
        .add_modifiers(modifier_bits)
        .build(StatementDef::multi(vec![
            ExpressionDef::invoke_super(super_ctor, vec![]).statement(),
            StatementDef::return_void(),
        ]))
}

fn expression_class(def: &EvaluatedExpressionDef) -> ClassDef {
    let context_type = type_of(runtime::EXPRESSION_EVALUATION_CONTEXT);
    let mut builder = ClassDef::builder(def.class_name.clone());
    builder
        .add_modifiers(modifiers::FINAL | modifiers::SYNTHETIC)
        .superclass(class(runtime::EVALUATED_EXPRESSION))
        .add_annotation(AnnotationDef::of(runtime::GENERATED).with_value("expression", Constant::String(def.expression.clone())))
        .add_method(
            MethodDef::constructor()
                .add_modifiers(modifiers::PUBLIC)
                .add_parameter("initialAnnotationValue", TypeDef::object())
                .build_with(|params| {
                    StatementDef::multi(vec![
                        ExpressionDef::invoke_super(
                            MethodRef::constructor(runtime::EVALUATED_EXPRESSION, vec![TypeDef::object()]),
                            vec![params[0].clone()],
                        )
                        .statement(),
                        StatementDef::return_void(),
                    ])
                }),
        )
        .add_method(
            MethodDef::builder("doEvaluate")
                .add_modifiers(modifiers::PROTECTED)
                .add_parameter("ctx", context_type)
                .returns(TypeDef::object())
                .build_with(|params| {
                    params[0]
                        .clone()
                        .invoke(
                            MethodRef::interface(
                                runtime::EXPRESSION_EVALUATION_CONTEXT,
                                "evaluate",
                                vec![TypeDef::string()],
                                TypeDef::object(),
                            ),
                            vec![ExpressionDef::string(def.expression.clone())],
                        )
                        .returning()
                }),
        );
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::InMemoryClassOutput;
    use beanforge_types::AnnotationEntry;

    fn meta_with_expression() -> AnnotationMetadata {
        AnnotationMetadata::empty()
            .declare(AnnotationEntry::new("a.Ann").with("value", AnnotationValue::String("#{ env['x'] }".into())))
            .with_defaults("a.Ann", vec![("enabled".to_string(), AnnotationValue::Bool(true))])
    }

    #[test]
    fn test_metadata_expression_is_cached() {
        let mut session = BuildSession::new(WriterOptions::default());
        let meta = AnnotationMetadata::empty().declare(AnnotationEntry::new("a.Ann"));
        let first = session.annotation_metadata_expression("a.Owner", &meta).unwrap();
        let second = session.annotation_metadata_expression("a.Owner", &meta).unwrap();
        assert_eq!(first, second);
        assert_eq!(session.metadata_cache.len(), 1);
        session.annotation_metadata_expression("a.Other", &meta).unwrap();
        assert_eq!(session.metadata_cache.len(), 2);
    }

    #[test]
    fn test_expression_names_per_originating() {
        let mut session = BuildSession::new(WriterOptions::default());
        let names = session.process_evaluated_expressions(&meta_with_expression(), "a.Bean");
        assert_eq!(names, vec!["a.Bean$Expr0".to_string()]);
        let again = session.process_evaluated_expressions(&meta_with_expression(), "a.Bean");
        assert_eq!(again, names);
        assert_eq!(session.evaluated_expressions().len(), 1);
    }

    #[test]
    fn test_finish_writes_and_resets() {
        let mut session = BuildSession::new(WriterOptions::default());
        let meta = meta_with_expression();
        session.process_evaluated_expressions(&meta, "a.Bean");
        session.annotation_metadata_expression("a.Owner", &meta).unwrap();

        let mut output = InMemoryClassOutput::new();
        session.finish(&mut output).unwrap();

        assert!(output.class_bytes("a.Bean$Expr0").is_some());
        assert!(output.class_bytes("io.beanforge.generated.$AnnotationDefaultValues").is_some());
        assert_eq!(
            output.service_implementations(runtime::ANNOTATION_DEFAULT_VALUES),
            vec!["io.beanforge.generated.$AnnotationDefaultValues"]
        );
        assert!(session.annotation_defaults().is_empty());
        assert!(session.evaluated_expressions().is_empty());
    }
}
