//! Records of visited injection points
//!
//! Visits are recorded as plain data and replayed once, in order, when the
//! definition is finalized. Indices into the reference arrays are assigned at
//! visit time and never change afterwards.

use crate::runtime;
use beanforge_types::{ClassElement, FieldElement, MethodElement, ParameterElement};

/// Method recorded in `$INJECTION_METHODS`
#[derive(Debug, Clone)]
pub(crate) struct MethodVisitData {
    pub method: MethodElement,
    pub requires_reflection: bool,
    pub post_construct: bool,
    pub pre_destroy: bool,
}

/// Field recorded in `$INJECTION_FIELDS`
#[derive(Debug, Clone)]
pub(crate) struct FieldVisitData {
    pub field: FieldElement,
    pub requires_reflection: bool,
}

/// Property of another bean checked by `checkIfShouldLoad`
#[derive(Debug, Clone)]
pub(crate) struct AnnotationVisitData {
    pub property: String,
    pub getter: MethodElement,
    pub required_value: Option<String>,
    pub not_equals_value: Option<String>,
}

/// Beans whose properties are checked, in `$ANNOTATION_INJECTIONS` order
#[derive(Debug, Clone)]
pub(crate) struct AnnotationInjection {
    pub bean_type: ClassElement,
    pub points: Vec<AnnotationVisitData>,
}

/// How the bean instance is produced
#[derive(Debug, Clone)]
pub(crate) enum BuildMethodDefinition {
    Constructor {
        constructor: MethodElement,
        requires_reflection: bool,
    },
    FactoryMethod {
        factory: ClassElement,
        method: MethodElement,
    },
    FactoryField {
        factory: ClassElement,
        field: FieldElement,
    },
}

impl BuildMethodDefinition {
    pub fn parameters(&self) -> &[ParameterElement] {
        match self {
            BuildMethodDefinition::Constructor { constructor, .. } => &constructor.parameters,
            BuildMethodDefinition::FactoryMethod { method, .. } => &method.parameters,
            BuildMethodDefinition::FactoryField { .. } => &[],
        }
    }

    pub fn has_inject_scope(&self) -> bool {
        has_inject_scope(self.parameters())
    }

    /// Whether any parameter is supplied by the caller of `doInstantiate`
    pub fn is_parametrized(&self) -> bool {
        self.parameters()
            .iter()
            .any(|p| p.annotation_metadata.has_declared_annotation(runtime::PARAMETER))
    }
}

/// One call of a post-construct or pre-destroy method
#[derive(Debug, Clone)]
pub(crate) struct InjectMethodPoint {
    pub method: MethodElement,
    pub requires_reflection: bool,
    pub method_index: usize,
}

/// Post-construct or pre-destroy calls
#[derive(Debug, Clone, Default)]
pub(crate) struct LifecycleDefinition {
    pub points: Vec<InjectMethodPoint>,
    pub intercepted: bool,
}

impl LifecycleDefinition {
    pub fn has_inject_scope(&self) -> bool {
        self.points.iter().any(|p| has_inject_scope(&p.method.parameters))
    }
}

/// Source of a configuration builder instance
#[derive(Debug, Clone)]
pub enum ConfigBuilderSource {
    /// Builder held in a field of the bean
    Field(FieldElement),
    /// Builder returned by a getter of the bean
    Getter(MethodElement),
}

/// One builder method fed from configuration
#[derive(Debug, Clone)]
pub enum ConfigBuilderPoint {
    /// `builder.method(value)`, or `builder.method()` when `parameter` is `None` and the flag is set
    Method {
        /// Configuration path of the value
        path: String,
        /// Builder method name
        method_name: String,
        /// Parameter type
        parameter: Option<ClassElement>,
        /// Declared return type of the builder method
        return_type: ClassElement,
    },
    /// `builder.method(duration.toMillis(), TimeUnit.MILLISECONDS)`
    Duration {
        /// Configuration path of the value
        path: String,
        /// Builder method name
        method_name: String,
        /// Declared return type of the builder method
        return_type: ClassElement,
    },
}

/// Builder of a configuration properties bean with its points
#[derive(Debug, Clone)]
pub(crate) struct ConfigBuilder {
    pub source: ConfigBuilderSource,
    pub builder_type: ClassElement,
    pub points: Vec<ConfigBuilderPoint>,
}

/// Deferred injection step replayed into `inject`
#[derive(Debug, Clone)]
pub(crate) enum InjectCommand {
    /// Setter fed from a configuration value
    SetterValue {
        setter: MethodElement,
        optional: bool,
        method_index: Option<usize>,
    },
    /// Field holding a bean
    InjectField { field_index: usize },
    /// Field fed from a configuration value
    FieldValue { field_index: usize, optional: bool },
    /// Injection method, setters of plain beans included
    InjectMethod { method_index: usize },
    /// Configuration builder
    ConfigBuilder(ConfigBuilder),
}

fn has_inject_scope(parameters: &[ParameterElement]) -> bool {
    parameters
        .iter()
        .any(|p| p.annotation_metadata.has_declared_annotation(runtime::INJECT_SCOPE))
}

impl InjectCommand {
    /// Whether the step resolves beans scoped to the injection
    pub fn has_inject_scope(&self, fields: &[FieldVisitData], methods: &[MethodVisitData]) -> bool {
        match self {
            InjectCommand::SetterValue { setter, .. } => has_inject_scope(&setter.parameters),
            InjectCommand::InjectField { field_index } | InjectCommand::FieldValue { field_index, .. } => fields
                .get(*field_index)
                .map_or(false, |f| f.field.annotation_metadata.has_declared_annotation(runtime::INJECT_SCOPE)),
            InjectCommand::InjectMethod { method_index } => methods
                .get(*method_index)
                .map_or(false, |m| has_inject_scope(&m.method.parameters)),
            InjectCommand::ConfigBuilder(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beanforge_types::{AnnotationEntry, AnnotationMetadata};

    fn scoped(name: &str) -> ParameterElement {
        ParameterElement::new(name, ClassElement::of("a.Dep"))
            .with_annotation_metadata(AnnotationMetadata::empty().declare(AnnotationEntry::new(runtime::INJECT_SCOPE)))
    }

    #[test]
    fn test_inject_scope_detection() {
        let method = MethodElement::new("a.Bean", "init", ClassElement::of("void")).with_parameter(scoped("dep"));
        let methods = vec![MethodVisitData {
            method: method.clone(),
            requires_reflection: false,
            post_construct: false,
            pre_destroy: false,
        }];
        assert!(InjectCommand::InjectMethod { method_index: 0 }.has_inject_scope(&[], &methods));
        assert!(!InjectCommand::InjectField { field_index: 0 }.has_inject_scope(&[], &methods));

        let lifecycle = LifecycleDefinition {
            points: vec![InjectMethodPoint {
                method,
                requires_reflection: false,
                method_index: 0,
            }],
            intercepted: false,
        };
        assert!(lifecycle.has_inject_scope());
    }

    #[test]
    fn test_parametrized_build() {
        let param = ParameterElement::new("name", ClassElement::of(runtime::STRING))
            .with_annotation_metadata(AnnotationMetadata::empty().declare(AnnotationEntry::new(runtime::PARAMETER)));
        let build = BuildMethodDefinition::Constructor {
            constructor: MethodElement::constructor("a.Bean", vec![param]),
            requires_reflection: false,
        };
        assert!(build.is_parametrized());
        assert_eq!(build.parameters().len(), 1);
    }
}
