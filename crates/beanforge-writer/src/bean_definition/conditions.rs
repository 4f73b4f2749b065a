//! `@Requires` translation into runtime conditions

use crate::gen_utils::{string_array, type_of};
use crate::runtime;
use beanforge_bytecode::{ExpressionDef, FieldRef, MethodRef, TypeDef};
use beanforge_types::{AnnotationEntry, AnnotationMetadata};

/// How a property condition compares the property value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyMode {
    /// Property is present
    Contains,
    /// Property equals the value
    Equals,
    /// Property differs from the value
    NotEquals,
    /// Property matches the pattern
    Pattern,
}

impl PropertyMode {
    fn name(self) -> &'static str {
        match self {
            PropertyMode::Contains => "CONTAINS",
            PropertyMode::Equals => "EQUALS",
            PropertyMode::NotEquals => "NOT_EQUALS",
            PropertyMode::Pattern => "PATTERN",
        }
    }
}

/// One requirement of a bean
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Property test
    Property {
        /// Property name
        property: String,
        /// Compared value or pattern
        value: Option<String>,
        /// Value assumed when the property is missing
        default_value: Option<String>,
        /// Comparison
        mode: PropertyMode,
    },
    /// Property must be absent
    MissingProperty(String),
    /// One of the environments is active
    Environment(Vec<String>),
    /// None of the environments is active
    NotEnvironment(Vec<String>),
    /// Classes are on the classpath
    Classes(Vec<String>),
    /// Classes are not on the classpath
    MissingClasses(Vec<String>),
    /// Configuration package is present, optionally in a minimum version
    Configuration {
        /// Configuration name
        name: String,
        /// Minimum version
        version: Option<String>,
    },
    /// Current OS is one of the families
    Os(Vec<String>),
    /// Current OS is none of the families
    NotOs(Vec<String>),
    /// SDK in a minimum version
    Sdk {
        /// SDK constant
        sdk: String,
        /// Minimum version
        version: String,
    },
    /// Resources exist
    Resources(Vec<String>),
    /// Beans of the types exist
    Beans(Vec<String>),
    /// No beans of the types exist
    MissingBeans(Vec<String>),
    /// Entities of the types are registered
    Entities(Vec<String>),
    /// User condition class
    Custom(String),
    /// Requirement holding evaluated expressions
    Dynamic,
}

impl Condition {
    /// Whether the condition only needs the environment and can run before the context starts
    pub fn is_pre_start(&self) -> bool {
        !matches!(
            self,
            Condition::Beans(_)
                | Condition::MissingBeans(_)
                | Condition::Entities(_)
                | Condition::Custom(_)
                | Condition::Dynamic
        )
    }

    fn class_name(&self) -> String {
        let simple = match self {
            Condition::Property { .. } => "MatchesPropertyCondition",
            Condition::MissingProperty(_) => "MatchesAbsenceOfPropertyCondition",
            Condition::Environment(_) => "MatchesEnvironmentCondition",
            Condition::NotEnvironment(_) => "MatchesNotEnvironmentCondition",
            Condition::Classes(_) => "MatchesPresenceOfClassesCondition",
            Condition::MissingClasses(_) => "MatchesAbsenceOfClassesCondition",
            Condition::Configuration { .. } => "MatchesConfigurationCondition",
            Condition::Os(_) => "MatchesCurrentOsCondition",
            Condition::NotOs(_) => "MatchesCurrentNotOsCondition",
            Condition::Sdk { .. } => "MatchesSdkCondition",
            Condition::Resources(_) => "MatchesPresenceOfResourcesCondition",
            Condition::Beans(_) => "MatchesPresenceOfBeansCondition",
            Condition::MissingBeans(_) => "MatchesAbsenceOfBeansCondition",
            Condition::Entities(_) => "MatchesPresenceOfEntitiesCondition",
            Condition::Custom(_) => "MatchesCustomCondition",
            Condition::Dynamic => "MatchesDynamicCondition",
        };
        format!("{}.{}", runtime::CONDITIONS_PACKAGE, simple)
    }

    /// `new Matches...Condition(...)`; `metadata` is the definition's annotation metadata
    pub(crate) fn expression(&self, metadata: &ExpressionDef) -> ExpressionDef {
        let (params, args): (Vec<TypeDef>, Vec<ExpressionDef>) = match self {
            Condition::Property {
                property,
                value,
                default_value,
                mode,
            } => {
                let mode_type = format!("{}$Condition", self.class_name());
                (
                    vec![TypeDef::string(), TypeDef::string(), TypeDef::string(), type_of(&mode_type)],
                    vec![
                        ExpressionDef::string(property.clone()),
                        ExpressionDef::string_or_null(value.as_deref()),
                        ExpressionDef::string_or_null(default_value.as_deref()),
                        ExpressionDef::static_field(FieldRef::new(mode_type.clone(), mode.name(), type_of(&mode_type))),
                    ],
                )
            }
            Condition::MissingProperty(property) => (vec![TypeDef::string()], vec![ExpressionDef::string(property.clone())]),
            Condition::Environment(names) | Condition::NotEnvironment(names) | Condition::Resources(names) => {
                (vec![TypeDef::string().array()], vec![string_array(names)])
            }
            Condition::Classes(names)
            | Condition::MissingClasses(names)
            | Condition::Beans(names)
            | Condition::MissingBeans(names)
            | Condition::Entities(names) => (
                vec![type_of(runtime::ANNOTATION_CLASS_VALUE).array()],
                vec![ExpressionDef::new_array(
                    type_of(runtime::ANNOTATION_CLASS_VALUE),
                    names.iter().map(|n| class_value(n)).collect(),
                )],
            ),
            Condition::Configuration { name, version } => (
                vec![TypeDef::string(), TypeDef::string()],
                vec![ExpressionDef::string(name.clone()), ExpressionDef::string_or_null(version.as_deref())],
            ),
            Condition::Os(families) | Condition::NotOs(families) => {
                let family = type_of(runtime::OS_FAMILY);
                let constants = families
                    .iter()
                    .map(|f| ExpressionDef::static_field(FieldRef::new(runtime::OS_FAMILY, f.clone(), family.clone())))
                    .collect();
                let set = ExpressionDef::invoke_static(
                    MethodRef::new(
                        runtime::COLLECTION_UTILS,
                        "enumSet",
                        vec![TypeDef::object().array()],
                        type_of(runtime::SET),
                    ),
                    vec![ExpressionDef::new_array(family, constants)],
                );
                (vec![type_of(runtime::SET)], vec![set])
            }
            Condition::Sdk { sdk, version } => {
                let sdk_type = format!("{}$Sdk", runtime::REQUIRES);
                (
                    vec![type_of(&sdk_type), TypeDef::string()],
                    vec![
                        ExpressionDef::static_field(FieldRef::new(sdk_type.clone(), sdk.clone(), type_of(&sdk_type))),
                        ExpressionDef::string(version.clone()),
                    ],
                )
            }
            Condition::Custom(class_name) => (
                vec![type_of(runtime::ANNOTATION_CLASS_VALUE)],
                vec![class_value(class_name)],
            ),
            Condition::Dynamic => (vec![type_of(runtime::ANNOTATION_METADATA)], vec![metadata.clone()]),
        };
        ExpressionDef::new_instance(MethodRef::constructor(self.class_name(), params), args)
    }
}

fn class_value(name: &str) -> ExpressionDef {
    ExpressionDef::new_instance(
        MethodRef::constructor(runtime::ANNOTATION_CLASS_VALUE, vec![TypeDef::string()]),
        vec![ExpressionDef::string(name)],
    )
}

fn strings(entry: &AnnotationEntry, member: &str) -> Vec<String> {
    entry.value(member).map(|v| v.as_strings()).unwrap_or_default()
}

/// Conditions of one `@Requires`, in member order
fn entry_conditions(entry: &AnnotationEntry) -> Vec<Condition> {
    let mut out = Vec::new();
    if let Some(property) = entry.string_value("property").filter(|p| !p.is_empty()) {
        let (mode, value) = if let Some(v) = entry.string_value("value") {
            (PropertyMode::Equals, Some(v))
        } else if let Some(v) = entry.string_value("notEquals") {
            (PropertyMode::NotEquals, Some(v))
        } else if let Some(v) = entry.string_value("pattern") {
            (PropertyMode::Pattern, Some(v))
        } else {
            (PropertyMode::Contains, None)
        };
        out.push(Condition::Property {
            property,
            value,
            default_value: entry.string_value("defaultValue"),
            mode,
        });
    }
    if let Some(missing) = entry.string_value("missingProperty").filter(|p| !p.is_empty()) {
        out.push(Condition::MissingProperty(missing));
    }
    let env = strings(entry, "env");
    if !env.is_empty() {
        out.push(Condition::Environment(env));
    }
    let not_env = strings(entry, "notEnv");
    if !not_env.is_empty() {
        out.push(Condition::NotEnvironment(not_env));
    }
    let classes = strings(entry, "classes");
    if !classes.is_empty() {
        out.push(Condition::Classes(classes));
    }
    let missing_classes = strings(entry, "missingClasses");
    if !missing_classes.is_empty() {
        out.push(Condition::MissingClasses(missing_classes));
    }
    let version = entry.string_value("version");
    if let Some(name) = entry.string_value("configuration").filter(|c| !c.is_empty()) {
        out.push(Condition::Configuration {
            name,
            version: version.clone(),
        });
    }
    let os = strings(entry, "os");
    if !os.is_empty() {
        out.push(Condition::Os(os));
    }
    let not_os = strings(entry, "notOs");
    if !not_os.is_empty() {
        out.push(Condition::NotOs(not_os));
    }
    if let (Some(sdk), Some(version)) = (entry.string_value("sdk"), version) {
        out.push(Condition::Sdk { sdk, version });
    }
    let resources = strings(entry, "resources");
    if !resources.is_empty() {
        out.push(Condition::Resources(resources));
    }
    // a bean paired with a beanProperty is checked by checkIfShouldLoad instead
    let beans = strings(entry, "beans");
    if !beans.is_empty() && entry.string_value("beanProperty").is_none() {
        out.push(Condition::Beans(beans));
    }
    let missing_beans = strings(entry, "missingBeans");
    if !missing_beans.is_empty() {
        out.push(Condition::MissingBeans(missing_beans));
    }
    let entities = strings(entry, "entities");
    if !entities.is_empty() {
        out.push(Condition::Entities(entities));
    }
    if let Some(custom) = entry.string_value("condition") {
        out.push(Condition::Custom(custom));
    }
    out
}

/// Conditions of every `@Requires`, split into pre-start and post-start lists
pub fn conditions_from_requires(meta: &AnnotationMetadata) -> (Vec<Condition>, Vec<Condition>) {
    let mut pre = Vec::new();
    let mut post = Vec::new();
    for entry in meta.repeated(runtime::REQUIRES) {
        let mut expressions = Vec::new();
        for value in entry.values.values() {
            expressions.extend(
                value
                    .as_strings()
                    .into_iter()
                    .filter(|s| s.trim_start().starts_with(beanforge_types::annotation::EXPRESSION_PREFIX)),
            );
        }
        if !expressions.is_empty() {
            if !post.contains(&Condition::Dynamic) {
                post.push(Condition::Dynamic);
            }
            continue;
        }
        for condition in entry_conditions(entry) {
            if condition.is_pre_start() {
                pre.push(condition);
            } else {
                post.push(condition);
            }
        }
    }
    (pre, post)
}

/// Whether a `@Requires` names both a bean and one of its properties
pub fn requires_bean_property(meta: &AnnotationMetadata) -> bool {
    meta.repeated(runtime::REQUIRES)
        .iter()
        .any(|r| r.value("bean").is_some() && r.string_value("beanProperty").is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beanforge_bytecode::PrettyPrint;
    use beanforge_types::AnnotationValue;

    fn requires(members: &[(&str, AnnotationValue)]) -> AnnotationMetadata {
        let mut entry = AnnotationEntry::new(runtime::REQUIRES);
        for (name, value) in members {
            entry = entry.with(*name, value.clone());
        }
        AnnotationMetadata::empty().declare(entry)
    }

    #[test]
    fn test_split_pre_and_post() {
        let meta = requires(&[
            ("property", AnnotationValue::String("app.enabled".into())),
            ("value", AnnotationValue::String("true".into())),
            ("beans", AnnotationValue::Classes(vec!["a.DataSource".into()])),
            ("env", AnnotationValue::Strings(vec!["test".into()])),
        ]);
        let (pre, post) = conditions_from_requires(&meta);
        assert_eq!(pre.len(), 2);
        assert_eq!(
            pre[0],
            Condition::Property {
                property: "app.enabled".into(),
                value: Some("true".into()),
                default_value: None,
                mode: PropertyMode::Equals,
            }
        );
        assert_eq!(pre[1], Condition::Environment(vec!["test".into()]));
        assert_eq!(post, vec![Condition::Beans(vec!["a.DataSource".into()])]);
    }

    #[test]
    fn test_expression_requirement_is_dynamic() {
        let meta = requires(&[("value", AnnotationValue::String("#{ env['x'] }".into()))]);
        let (pre, post) = conditions_from_requires(&meta);
        assert!(pre.is_empty());
        assert_eq!(post, vec![Condition::Dynamic]);
    }

    #[test]
    fn test_condition_expressions() {
        let metadata = ExpressionDef::local("metadata", type_of(runtime::ANNOTATION_METADATA));
        let missing = Condition::MissingProperty("a.b".into()).expression(&metadata);
        assert_eq!(missing.pretty_print(), "new MatchesAbsenceOfPropertyCondition(\"a.b\")");
        let os = Condition::Os(vec!["LINUX".into()]).expression(&metadata).pretty_print();
        assert!(os.contains("CollectionUtils.enumSet("));
        assert!(os.contains("OperatingSystem$Family.LINUX"));
    }

    #[test]
    fn test_bean_property_requirement() {
        let meta = requires(&[
            ("bean", AnnotationValue::Class("a.Config".into())),
            ("beanProperty", AnnotationValue::String("enabled".into())),
        ]);
        assert!(requires_bean_property(&meta));
        assert!(!requires_bean_property(&AnnotationMetadata::empty()));
    }
}
