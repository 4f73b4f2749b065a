//! Annotation metadata as generated code
//!
//! Metadata is materialized as a `DefaultAnnotationMetadata` constructor call.
//! Class values go through per-class `$beanforge_load_class_value_<n>` helpers so
//! a missing class degrades to a name-only `AnnotationClassValue` at runtime.

use crate::gen_utils::{class, string_list_of, string_map_of, type_of};
use crate::runtime;
use beanforge_bytecode::{
    modifiers, ClassTypeDef, ExpressionDef, FieldRef, MethodDef, MethodRef, StatementDef, TypeDef,
};
use beanforge_types::{AnnotationEntry, AnnotationMetadata, AnnotationValue};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

const LOAD_CLASS_PREFIX: &str = "$beanforge_load_class_value_";

/// `AnnotationMetadata.EMPTY_METADATA`
pub fn empty_metadata() -> ExpressionDef {
    ExpressionDef::static_field(FieldRef::new(
        runtime::ANNOTATION_METADATA,
        "EMPTY_METADATA",
        type_of(runtime::ANNOTATION_METADATA),
    ))
}

/// Load-class helper methods of one generated class
#[derive(Debug, Clone, Default)]
pub struct LoadClassRegistry {
    classes: Vec<String>,
}

impl LoadClassRegistry {
    /// Call of the helper loading `class_name`, registering it on first use
    pub fn reference(&mut self, owner: &str, class_name: &str) -> ExpressionDef {
        let index = match self.classes.iter().position(|c| c == class_name) {
            Some(i) => i,
            None => {
                self.classes.push(class_name.to_string());
                self.classes.len() - 1
            }
        };
        ExpressionDef::invoke_static(
            MethodRef::new(owner, format!("{}{}", LOAD_CLASS_PREFIX, index), vec![], type_of(runtime::ANNOTATION_CLASS_VALUE)),
            vec![],
        )
    }

    /// Whether no helper was registered
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Helper method definitions, in registration order
    pub fn methods(&self) -> Vec<MethodDef> {
        let value_type = type_of(runtime::ANNOTATION_CLASS_VALUE);
        self.classes
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let by_class = ExpressionDef::new_instance(
                    MethodRef::constructor(runtime::ANNOTATION_CLASS_VALUE, vec![TypeDef::class()]),
                    vec![ExpressionDef::class_literal(TypeDef::of(name))],
                );
                let by_name = ExpressionDef::new_instance(
                    MethodRef::constructor(runtime::ANNOTATION_CLASS_VALUE, vec![TypeDef::string()]),
                    vec![ExpressionDef::string(name.clone())],
                );
                MethodDef::builder(format!("{}{}", LOAD_CLASS_PREFIX, i))
                    .add_modifiers(modifiers::PRIVATE | modifiers::STATIC | modifiers::FINAL)
                    .returns(value_type.clone())
                    .build(StatementDef::try_catch(
                        by_class.returning(),
                        class(runtime::THROWABLE),
                        "e",
                        by_name.returning(),
                    ))
            })
            .collect()
    }
}

/// Inputs shared while one metadata expression is built
pub struct MetadataContext<'a> {
    /// Class the expression is emitted into
    pub owner: &'a str,
    /// Load-class helpers of `owner`
    pub load_classes: &'a mut LoadClassRegistry,
    /// Evaluated expression text to its generated class
    pub expressions: &'a FxHashMap<String, String>,
}

impl MetadataContext<'_> {
    /// `new DefaultAnnotationMetadata(...)` for `meta`
    pub fn metadata(&mut self, meta: &AnnotationMetadata) -> ExpressionDef {
        if meta.is_empty() {
            return empty_metadata();
        }
        let declared = self.annotations_map(meta.declared.iter());
        let all = self.annotations_map(meta.declared.iter().chain(meta.inherited.iter()));

        let mut declared_stereotypes = Vec::new();
        let mut all_stereotypes = Vec::new();
        let mut by_stereotype = Vec::new();
        for stereotype in meta.stereotypes.keys() {
            let present = meta.annotation_names_by_stereotype(stereotype);
            if present.is_empty() {
                continue;
            }
            if !meta.has_annotation(stereotype) {
                all_stereotypes.push((stereotype.clone(), self.stereotype_values(meta, stereotype)));
                if meta.has_declared_stereotype(stereotype) {
                    declared_stereotypes.push((stereotype.clone(), self.stereotype_values(meta, stereotype)));
                }
            }
            by_stereotype.push((stereotype.clone(), string_list_of(&present)));
        }

        let map = type_of(runtime::MAP);
        ExpressionDef::new_instance(
            MethodRef::constructor(
                runtime::DEFAULT_ANNOTATION_METADATA,
                vec![map.clone(), map.clone(), map.clone(), map.clone(), map, TypeDef::boolean(), TypeDef::boolean()],
            ),
            vec![
                declared,
                string_map_of(declared_stereotypes),
                string_map_of(all_stereotypes),
                all,
                string_map_of(by_stereotype),
                ExpressionDef::bool(false),
                ExpressionDef::bool(meta.has_evaluated_expressions()),
            ],
        )
    }

    fn stereotype_values(&mut self, meta: &AnnotationMetadata, stereotype: &str) -> ExpressionDef {
        match meta.defaults.get(stereotype) {
            Some(defaults) => self.values_map(stereotype, defaults),
            None => string_map_of(Vec::new()),
        }
    }

    fn annotations_map<'e>(&mut self, entries: impl Iterator<Item = &'e AnnotationEntry>) -> ExpressionDef {
        let mut merged: BTreeMap<&str, &AnnotationEntry> = BTreeMap::new();
        for entry in entries {
            merged.entry(entry.name.as_str()).or_insert(entry);
        }
        let items = merged
            .into_iter()
            .map(|(name, entry)| (name.to_string(), self.values_map(name, &entry.values)))
            .collect();
        string_map_of(items)
    }

    fn values_map(&mut self, annotation: &str, values: &BTreeMap<String, AnnotationValue>) -> ExpressionDef {
        let items = values
            .iter()
            .map(|(member, value)| (member.clone(), self.value(annotation, member, value)))
            .collect();
        string_map_of(items)
    }

    /// Expression for one annotation member value
    pub fn value(&mut self, annotation: &str, member: &str, value: &AnnotationValue) -> ExpressionDef {
        match value {
            AnnotationValue::String(s) => match self.expressions.get(s) {
                Some(class_name) => ExpressionDef::new_instance(
                    MethodRef::constructor(
                        runtime::EVALUATED_EXPRESSION_REFERENCE,
                        vec![TypeDef::object(), TypeDef::string(), TypeDef::string(), TypeDef::string()],
                    ),
                    vec![
                        ExpressionDef::string(s.clone()),
                        ExpressionDef::string(annotation),
                        ExpressionDef::string(member),
                        ExpressionDef::string(class_name.clone()),
                    ],
                ),
                None => ExpressionDef::string(s.clone()),
            },
            AnnotationValue::Bool(b) => boxed(ExpressionDef::bool(*b), TypeDef::boolean()),
            AnnotationValue::Int(i) => boxed(ExpressionDef::int(*i), TypeDef::int()),
            AnnotationValue::Long(l) => boxed(ExpressionDef::long(*l), TypeDef::of("long")),
            AnnotationValue::Double(d) => boxed(ExpressionDef::double(*d), TypeDef::of("double")),
            AnnotationValue::Enum(e) => ExpressionDef::string(e.clone()),
            AnnotationValue::Strings(items) => {
                ExpressionDef::new_array(TypeDef::string(), items.iter().map(ExpressionDef::string).collect())
            }
            AnnotationValue::Class(name) => self.load_classes.reference(self.owner, name),
            AnnotationValue::Classes(names) => {
                let items = names
                    .iter()
                    .map(|n| self.load_classes.reference(self.owner, n))
                    .collect();
                ExpressionDef::new_array(type_of(runtime::ANNOTATION_CLASS_VALUE), items)
            }
            AnnotationValue::Annotation(nested) => self.nested_annotation(nested),
            AnnotationValue::Annotations(nested) => {
                let items = nested.iter().map(|n| self.nested_annotation(n)).collect();
                ExpressionDef::new_array(type_of(runtime::ANNOTATION_VALUE), items)
            }
        }
    }

    fn nested_annotation(&mut self, entry: &AnnotationEntry) -> ExpressionDef {
        let values = self.values_map(&entry.name, &entry.values);
        ExpressionDef::new_instance(
            MethodRef::constructor(
                runtime::ANNOTATION_VALUE,
                vec![TypeDef::string(), type_of(runtime::MAP), type_of(runtime::ANNOTATION_DEFAULT_VALUES_PROVIDER)],
            ),
            vec![
                ExpressionDef::string(entry.name.clone()),
                values,
                ExpressionDef::static_field(FieldRef::new(
                    runtime::ANNOTATION_METADATA_SUPPORT,
                    "ANNOTATION_DEFAULT_VALUES_PROVIDER",
                    type_of(runtime::ANNOTATION_DEFAULT_VALUES_PROVIDER),
                )),
            ],
        )
    }

    /// Statements registering annotation defaults and repeatable containers
    pub fn register_defaults(
        &mut self,
        defaults: &BTreeMap<String, BTreeMap<String, AnnotationValue>>,
        repeatable: &BTreeMap<String, String>,
    ) -> StatementDef {
        let class_value = type_of(runtime::ANNOTATION_CLASS_VALUE);
        let mut statements = Vec::new();
        for (annotation, members) in defaults {
            let reference = self.load_classes.reference(self.owner, annotation);
            let call = if members.is_empty() {
                ExpressionDef::invoke_static(
                    MethodRef::new(runtime::DEFAULT_ANNOTATION_METADATA, "registerAnnotationType", vec![class_value.clone()], TypeDef::Void),
                    vec![reference],
                )
            } else {
                let values = self.values_map(annotation, members);
                ExpressionDef::invoke_static(
                    MethodRef::new(
                        runtime::DEFAULT_ANNOTATION_METADATA,
                        "registerAnnotationDefaults",
                        vec![class_value.clone(), type_of(runtime::MAP)],
                        TypeDef::Void,
                    ),
                    vec![reference, values],
                )
            };
            statements.push(call.statement());
        }
        if !repeatable.is_empty() {
            let items = repeatable
                .iter()
                .map(|(a, c)| (a.clone(), ExpressionDef::string(c.clone())))
                .collect();
            statements.push(
                ExpressionDef::invoke_static(
                    MethodRef::new(
                        runtime::DEFAULT_ANNOTATION_METADATA,
                        "registerRepeatableAnnotations",
                        vec![type_of(runtime::MAP)],
                        TypeDef::Void,
                    ),
                    vec![string_map_of(items)],
                )
                .statement(),
            );
        }
        StatementDef::multi(statements)
    }
}

fn boxed(value: ExpressionDef, primitive: TypeDef) -> ExpressionDef {
    value.cast(primitive.boxed())
}

/// `getAnnotationMetadata()` returning the given static field, or the empty metadata
pub fn get_annotation_metadata_method(field: Option<FieldRef>) -> MethodDef {
    let value = match field {
        Some(f) => ExpressionDef::static_field(f),
        None => empty_metadata(),
    };
    MethodDef::builder("getAnnotationMetadata")
        .add_modifiers(modifiers::PUBLIC)
        .returns(type_of(runtime::ANNOTATION_METADATA))
        .build(value.returning())
}

/// Type of the `$ANNOTATION_METADATA` field
pub fn metadata_type() -> ClassTypeDef {
    class(runtime::ANNOTATION_METADATA)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beanforge_bytecode::PrettyPrint;

    fn context<'a>(registry: &'a mut LoadClassRegistry, expressions: &'a FxHashMap<String, String>) -> MetadataContext<'a> {
        MetadataContext {
            owner: "a.$B$Definition",
            load_classes: registry,
            expressions,
        }
    }

    #[test]
    fn test_empty_metadata() {
        let mut registry = LoadClassRegistry::default();
        let expressions = FxHashMap::default();
        let expr = context(&mut registry, &expressions).metadata(&AnnotationMetadata::empty());
        assert_eq!(expr.pretty_print(), "AnnotationMetadata.EMPTY_METADATA");
    }

    #[test]
    fn test_class_values_share_helpers() {
        let mut registry = LoadClassRegistry::default();
        let expressions = FxHashMap::default();
        let meta = AnnotationMetadata::empty().declare(
            AnnotationEntry::new("a.Ann")
                .with("type", AnnotationValue::Class("a.C".into()))
                .with("others", AnnotationValue::Classes(vec!["a.C".into(), "a.D".into()])),
        );
        let text = context(&mut registry, &expressions).metadata(&meta).pretty_print();
        assert!(text.contains("$beanforge_load_class_value_0()"));
        assert!(text.contains("$beanforge_load_class_value_1()"));
        let methods = registry.methods();
        assert_eq!(methods.len(), 2);
        assert!(methods[0].pretty_print().contains("catch (java.lang.Throwable e)"));
    }

    #[test]
    fn test_stereotypes_and_expressions() {
        let mut registry = LoadClassRegistry::default();
        let mut expressions = FxHashMap::default();
        expressions.insert("#{ 1 + 1 }".to_string(), "a.B$Expr0".to_string());
        let meta = AnnotationMetadata::empty()
            .declare(AnnotationEntry::new("a.Named").with("value", AnnotationValue::String("#{ 1 + 1 }".into())))
            .stereotype("jakarta.inject.Qualifier", "a.Named");
        let text = context(&mut registry, &expressions).metadata(&meta).pretty_print();
        assert!(text.contains("\"jakarta.inject.Qualifier\", List.of(new java.lang.String[]{\"a.Named\"})"));
        assert!(text.contains("new EvaluatedExpressionReference(\"#{ 1 + 1 }\", \"a.Named\", \"value\", \"a.B$Expr0\")"));
        assert!(text.ends_with("false, true)"));
    }
}
