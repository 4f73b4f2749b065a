//! Dispatch table builder
//!
//! Collects dispatch targets and writes the index-addressed `dispatch`,
//! `dispatchOne` and `getTargetMethodByIndex` switches. Indices are assigned in
//! insertion order and never change; callers keep them as stable handles.

use crate::error::{WriterError, WriterResult};
use crate::gen_utils::{class_array, erased_type, method_ref, parameter_types, type_of};
use crate::method_gen::invoke_kotlin_default_method;
use crate::runtime;
use beanforge_bytecode::{modifiers, ClassTypeDef, ExpressionDef, FieldRef, MethodDef, MethodRef, StatementDef, SwitchKey, TypeDef};
use beanforge_types::{FieldElement, MethodElement};

/// Name of the `$interceptable` flag field of an executable-methods class
pub const INTERCEPTABLE_FIELD: &str = "$interceptable";

/// How one member is invoked or accessed
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchTarget {
    /// Direct call, static or virtual
    Method {
        /// Target method
        method: MethodElement,
        /// Dispatched with a single value instead of an argument array
        one_dispatch: bool,
    },
    /// Field read
    FieldGet {
        /// Target field
        field: FieldElement,
    },
    /// Field write
    FieldSet {
        /// Target field
        field: FieldElement,
    },
    /// Reflective call through the accessible method at this target's index
    MethodReflection {
        /// Target method
        method: MethodElement,
        /// Index handed to `getAccessibleTargetMethodByIndex`
        index: usize,
        /// Dispatched with a single value instead of an argument array
        one_dispatch: bool,
    },
    /// Call of the Kotlin `$default` overload
    KotlinMethodWithDefaults {
        /// Target method
        method: MethodElement,
        /// Dispatched with a single value instead of an argument array
        one_dispatch: bool,
    },
    /// Intercepted method; bridges to the proxy when the target is one
    Interceptable {
        /// Dispatch used when the target is not the proxy
        inner: Box<DispatchTarget>,
        /// Proxy class generated for the bean
        proxy_class: String,
        /// Bridge method on the proxy calling the unadvised method
        bridge: String,
    },
}

impl DispatchTarget {
    /// Whether `dispatchOne` handles this target
    pub fn supports_dispatch_one(&self) -> bool {
        match self {
            DispatchTarget::Method { one_dispatch, .. }
            | DispatchTarget::MethodReflection { one_dispatch, .. }
            | DispatchTarget::KotlinMethodWithDefaults { one_dispatch, .. } => *one_dispatch,
            DispatchTarget::FieldGet { .. } | DispatchTarget::FieldSet { .. } => true,
            DispatchTarget::Interceptable { .. } => false,
        }
    }

    /// Whether `dispatch` handles this target
    pub fn supports_dispatch_multi(&self) -> bool {
        match self {
            DispatchTarget::Method { one_dispatch, .. }
            | DispatchTarget::MethodReflection { one_dispatch, .. }
            | DispatchTarget::KotlinMethodWithDefaults { one_dispatch, .. } => !*one_dispatch,
            DispatchTarget::FieldGet { .. } | DispatchTarget::FieldSet { .. } => false,
            DispatchTarget::Interceptable { .. } => true,
        }
    }

    /// Method behind the target, `None` for fields
    pub fn method(&self) -> Option<&MethodElement> {
        match self {
            DispatchTarget::Method { method, .. }
            | DispatchTarget::MethodReflection { method, .. }
            | DispatchTarget::KotlinMethodWithDefaults { method, .. } => Some(method),
            DispatchTarget::Interceptable { inner, .. } => inner.method(),
            DispatchTarget::FieldGet { .. } | DispatchTarget::FieldSet { .. } => None,
        }
    }

    /// Declaring type of the member
    pub fn declaring_type(&self) -> &str {
        match self {
            DispatchTarget::FieldGet { field } | DispatchTarget::FieldSet { field } => &field.declaring_type,
            DispatchTarget::Interceptable { inner, .. } => inner.declaring_type(),
            DispatchTarget::Method { method, .. }
            | DispatchTarget::MethodReflection { method, .. }
            | DispatchTarget::KotlinMethodWithDefaults { method, .. } => &method.declaring_type,
        }
    }

    fn dispatch_one(&self, owner: &str, target: ExpressionDef, value: ExpressionDef) -> WriterResult<StatementDef> {
        match self {
            DispatchTarget::FieldGet { field } => {
                let ty = erased_type(&field.ty);
                let read = if field.reflection_required {
                    ExpressionDef::invoke_static(
                        MethodRef::new(
                            runtime::REFLECTION_UTILS,
                            "getField",
                            vec![TypeDef::class(), TypeDef::string(), TypeDef::object()],
                            TypeDef::object(),
                        ),
                        vec![
                            ExpressionDef::class_literal(type_of(&field.declaring_type)),
                            ExpressionDef::string(field.name.clone()),
                            target,
                        ],
                    )
                } else {
                    let field_ref = FieldRef::new(field.declaring_type.clone(), field.name.clone(), ty.clone());
                    target.cast(type_of(&field.declaring_type)).field(field_ref)
                };
                Ok(return_object(read, &ty))
            }
            DispatchTarget::FieldSet { field } => {
                let ty = erased_type(&field.ty);
                let write = if field.reflection_required {
                    ExpressionDef::invoke_static(
                        MethodRef::new(
                            runtime::REFLECTION_UTILS,
                            "setField",
                            vec![TypeDef::class(), TypeDef::string(), TypeDef::object(), TypeDef::object()],
                            TypeDef::Void,
                        ),
                        vec![
                            ExpressionDef::class_literal(type_of(&field.declaring_type)),
                            ExpressionDef::string(field.name.clone()),
                            target,
                            value,
                        ],
                    )
                    .statement()
                } else {
                    let field_ref = FieldRef::new(field.declaring_type.clone(), field.name.clone(), ty.clone());
                    target
                        .cast(type_of(&field.declaring_type))
                        .put_field(field_ref, value.cast(ty))
                };
                Ok(StatementDef::multi(vec![write, ExpressionDef::null().returning()]))
            }
            DispatchTarget::Method { method, .. } => {
                let args = match method.parameters.first() {
                    Some(p) => vec![value.cast(erased_type(&p.ty))],
                    None => vec![],
                };
                Ok(return_invocation(invoke_method(method, target, args), method))
            }
            DispatchTarget::MethodReflection { method, index, .. } => {
                let args = if method.parameters.is_empty() { vec![] } else { vec![value] };
                Ok(invoke_accessible(owner, method, *index, target, ExpressionDef::new_array(TypeDef::object(), args))
                    .returning())
            }
            DispatchTarget::KotlinMethodWithDefaults { method, .. } => {
                let values = if method.parameters.is_empty() { vec![] } else { vec![value] };
                let has_values: Vec<ExpressionDef> = values.iter().map(|v| v.clone().is_non_null()).collect();
                let call = invoke_kotlin_default_method(method, target, values, Some(&has_values));
                Ok(return_invocation(call, method))
            }
            other => Err(WriterError::illegal_state(format!(
                "Dispatch target of {} does not support single value dispatch",
                other.declaring_type()
            ))),
        }
    }

    fn dispatch_multi(&self, owner: &str, target: ExpressionDef, args: ExpressionDef) -> WriterResult<StatementDef> {
        match self {
            DispatchTarget::Method { method, .. } => {
                let values = array_values(method, &args);
                Ok(return_invocation(invoke_method(method, target, values), method))
            }
            DispatchTarget::MethodReflection { method, index, .. } => {
                Ok(invoke_accessible(owner, method, *index, target, args).returning())
            }
            DispatchTarget::KotlinMethodWithDefaults { method, .. } => {
                let values: Vec<ExpressionDef> = (0..method.parameters.len())
                    .map(|i| args.clone().array_element(i))
                    .collect();
                let has_values: Vec<ExpressionDef> = values.iter().map(|v| v.clone().is_non_null()).collect();
                let call = invoke_kotlin_default_method(method, target, values, Some(&has_values));
                Ok(return_invocation(call, method))
            }
            DispatchTarget::Interceptable { inner, proxy_class, bridge } => {
                let method = inner.method().ok_or_else(|| {
                    WriterError::illegal_state("Intercepted dispatch target requires a method")
                })?;
                let proxy = type_of(proxy_class);
                let interceptable = ExpressionDef::this()
                    .field(FieldRef::new(owner, INTERCEPTABLE_FIELD, TypeDef::boolean()))
                    .and(target.clone().instance_of(ClassTypeDef::of(proxy_class.clone())));
                let bridge_ref = MethodRef::new(
                    proxy_class.clone(),
                    bridge.clone(),
                    parameter_types(method),
                    erased_type(&method.return_type),
                );
                let values = array_values(method, &args);
                let bridged = return_invocation(target.clone().cast(proxy).invoke(bridge_ref, values), method);
                let fallback = inner.dispatch_multi(owner, target, args)?;
                Ok(interceptable.if_else(bridged, fallback))
            }
            other => Err(WriterError::illegal_state(format!(
                "Dispatch target of {} does not support argument array dispatch",
                other.declaring_type()
            ))),
        }
    }
}

/// `ReflectionUtils.invokeMethod` on the accessible method at `index`
fn invoke_accessible(owner: &str, method: &MethodElement, index: usize, target: ExpressionDef, args: ExpressionDef) -> ExpressionDef {
    let receiver = if method.is_static { ExpressionDef::null() } else { target };
    let accessible = ExpressionDef::this().invoke(
        MethodRef::new(owner, "getAccessibleTargetMethodByIndex", vec![TypeDef::int()], type_of(runtime::METHOD)),
        vec![ExpressionDef::int(index as i32)],
    );
    ExpressionDef::invoke_static(
        MethodRef::new(
            runtime::REFLECTION_UTILS,
            "invokeMethod",
            vec![TypeDef::object(), type_of(runtime::METHOD), TypeDef::object().array()],
            TypeDef::object(),
        ),
        vec![receiver, accessible, args],
    )
}

fn array_values(method: &MethodElement, args: &ExpressionDef) -> Vec<ExpressionDef> {
    method
        .parameters
        .iter()
        .enumerate()
        .map(|(i, p)| args.clone().array_element(i).cast(erased_type(&p.ty)))
        .collect()
}

fn invoke_method(method: &MethodElement, target: ExpressionDef, args: Vec<ExpressionDef>) -> ExpressionDef {
    let reference = method_ref(method);
    if method.is_static {
        ExpressionDef::invoke_static(reference, args)
    } else {
        target.cast(type_of(&method.declaring_type)).invoke(reference, args)
    }
}

fn return_object(value: ExpressionDef, ty: &TypeDef) -> StatementDef {
    if ty.is_primitive() {
        value.cast(ty.boxed()).returning()
    } else {
        value.returning()
    }
}

/// Return the invocation result, `null` for void methods
fn return_invocation(call: ExpressionDef, method: &MethodElement) -> StatementDef {
    let ret = erased_type(&method.return_type);
    if ret.is_void() && !method.is_suspend {
        StatementDef::multi(vec![call.statement(), ExpressionDef::null().returning()])
    } else {
        return_object(call, &ret)
    }
}

/// Ordered dispatch targets of one generated class
#[derive(Debug, Clone)]
pub struct DispatchWriter {
    owner: String,
    targets: Vec<DispatchTarget>,
}

impl DispatchWriter {
    /// Writer for the class `owner`
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            targets: Vec::new(),
        }
    }

    /// Add a target, returning its index
    pub fn add_dispatch_target(&mut self, target: DispatchTarget) -> usize {
        self.targets.push(target);
        self.targets.len() - 1
    }

    /// Add a method dispatched with an argument array
    pub fn add_method(&mut self, method: &MethodElement) -> WriterResult<usize> {
        self.add_method_with(method, false)
    }

    /// Add a method, choosing single-value dispatch when `one_dispatch` is set
    pub fn add_method_with(&mut self, method: &MethodElement, one_dispatch: bool) -> WriterResult<usize> {
        let index = self.targets.len();
        let target = if method.reflection_required {
            if method.has_parameters_with_defaults() {
                return Err(WriterError::illegal_state(format!(
                    "Kotlin default parameters of {}.{} cannot be combined with reflective access",
                    method.declaring_type, method.name
                )));
            }
            DispatchTarget::MethodReflection {
                method: method.clone(),
                index,
                one_dispatch,
            }
        } else if method.has_parameters_with_defaults() {
            DispatchTarget::KotlinMethodWithDefaults {
                method: method.clone(),
                one_dispatch,
            }
        } else {
            DispatchTarget::Method {
                method: method.clone(),
                one_dispatch,
            }
        };
        Ok(self.add_dispatch_target(target))
    }

    /// Add an intercepted method whose proxy exposes `bridge`
    pub fn add_intercepted_method(&mut self, method: &MethodElement, proxy_class: &str, bridge: &str) -> WriterResult<usize> {
        let index = self.targets.len();
        let inner = if method.reflection_required {
            DispatchTarget::MethodReflection {
                method: method.clone(),
                index,
                one_dispatch: false,
            }
        } else if method.has_parameters_with_defaults() {
            DispatchTarget::KotlinMethodWithDefaults {
                method: method.clone(),
                one_dispatch: false,
            }
        } else {
            DispatchTarget::Method {
                method: method.clone(),
                one_dispatch: false,
            }
        };
        Ok(self.add_dispatch_target(DispatchTarget::Interceptable {
            inner: Box::new(inner),
            proxy_class: proxy_class.to_string(),
            bridge: bridge.to_string(),
        }))
    }

    /// Add a field write
    pub fn add_set_field(&mut self, field: &FieldElement) -> usize {
        self.add_dispatch_target(DispatchTarget::FieldSet { field: field.clone() })
    }

    /// Add a field read
    pub fn add_get_field(&mut self, field: &FieldElement) -> usize {
        self.add_dispatch_target(DispatchTarget::FieldGet { field: field.clone() })
    }

    /// Targets in index order
    pub fn targets(&self) -> &[DispatchTarget] {
        &self.targets
    }

    /// Whether any target bridges to a proxy
    pub fn has_interceptable_method(&self) -> bool {
        self.targets
            .iter()
            .any(|t| matches!(t, DispatchTarget::Interceptable { .. }))
    }

    fn unknown_index(&self, index: ExpressionDef) -> StatementDef {
        ExpressionDef::this()
            .invoke(
                MethodRef::new(
                    self.owner.clone(),
                    "unknownDispatchAtIndexException",
                    vec![TypeDef::int()],
                    type_of("java.lang.RuntimeException"),
                ),
                vec![index],
            )
            .do_throw()
    }

    /// `dispatch`, `dispatchOne` and `getTargetMethodByIndex`, each only when a target needs it
    pub fn build_methods(&self) -> WriterResult<Vec<MethodDef>> {
        log::debug!("Building dispatch table of {} with {} target(s)", self.owner, self.targets.len());
        let mut methods = Vec::new();

        if self.targets.iter().any(DispatchTarget::supports_dispatch_multi) {
            let builder = MethodDef::builder("dispatch")
                .add_modifiers(modifiers::PROTECTED | modifiers::FINAL)
                .add_parameter("index", TypeDef::int())
                .add_parameter("target", TypeDef::object())
                .add_parameter("args", TypeDef::object().array())
                .returns(TypeDef::object());
            let params = builder.params();
            let mut cases = Vec::new();
            for (i, target) in self.targets.iter().enumerate() {
                if target.supports_dispatch_multi() {
                    cases.push((
                        SwitchKey::Int(i as i32),
                        target.dispatch_multi(&self.owner, params[1].clone(), params[2].clone())?,
                    ));
                }
            }
            methods.push(builder.build(self.switch_body(params[0].clone(), cases)));
        }

        if self.targets.iter().any(DispatchTarget::supports_dispatch_one) {
            let builder = MethodDef::builder("dispatchOne")
                .add_modifiers(modifiers::PROTECTED | modifiers::FINAL)
                .add_parameter("index", TypeDef::int())
                .add_parameter("target", TypeDef::object())
                .add_parameter("value", TypeDef::object())
                .returns(TypeDef::object());
            let params = builder.params();
            let mut cases = Vec::new();
            for (i, target) in self.targets.iter().enumerate() {
                if target.supports_dispatch_one() {
                    cases.push((
                        SwitchKey::Int(i as i32),
                        target.dispatch_one(&self.owner, params[1].clone(), params[2].clone())?,
                    ));
                }
            }
            methods.push(builder.build(self.switch_body(params[0].clone(), cases)));
        }

        if self.targets.iter().any(|t| t.method().is_some()) {
            let builder = MethodDef::builder("getTargetMethodByIndex")
                .add_modifiers(modifiers::PROTECTED | modifiers::FINAL)
                .add_parameter("index", TypeDef::int())
                .returns(type_of(runtime::METHOD));
            let params = builder.params();
            let cases = self
                .targets
                .iter()
                .enumerate()
                .filter_map(|(i, t)| t.method().map(|m| (SwitchKey::Int(i as i32), required_method(m).returning())))
                .collect();
            methods.push(builder.build(self.switch_body(params[0].clone(), cases)));
        }
        Ok(methods)
    }

    fn switch_body(&self, index: ExpressionDef, cases: Vec<(SwitchKey, StatementDef)>) -> StatementDef {
        StatementDef::multi(vec![
            StatementDef::switch(index.clone(), cases, Some(self.unknown_index(index))),
            ExpressionDef::null().returning(),
        ])
    }
}

/// `ReflectionUtils.getRequiredMethod(Decl.class, "name", new Class[]{...})`
pub fn required_method(method: &MethodElement) -> ExpressionDef {
    let types = parameter_types(method);
    let classes = if types.is_empty() {
        ExpressionDef::static_field(FieldRef::new(runtime::REFLECTION_UTILS, "EMPTY_CLASS_ARRAY", TypeDef::class().array()))
    } else {
        class_array(&types)
    };
    ExpressionDef::invoke_static(
        MethodRef::new(
            runtime::REFLECTION_UTILS,
            "getRequiredMethod",
            vec![TypeDef::class(), TypeDef::string(), TypeDef::class().array()],
            type_of(runtime::METHOD),
        ),
        vec![
            ExpressionDef::class_literal(type_of(&method.declaring_type)),
            ExpressionDef::string(method.name.clone()),
            classes,
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use beanforge_bytecode::PrettyPrint;
    use beanforge_types::{ClassElement, ParameterElement};

    fn greet() -> MethodElement {
        MethodElement::new("a.Greeter", "greet", ClassElement::of("java.lang.String"))
            .with_parameter(ParameterElement::new("name", ClassElement::of("java.lang.String")))
    }

    #[test]
    fn test_indices_follow_insertion_order() {
        let mut writer = DispatchWriter::new("a.$Greeter$Definition$Exec");
        let field = FieldElement::new("a.Greeter", "count", ClassElement::of("int"));
        assert_eq!(writer.add_method(&greet()).unwrap(), 0);
        assert_eq!(writer.add_set_field(&field), 1);
        assert_eq!(writer.add_get_field(&field), 2);
        assert_eq!(writer.add_intercepted_method(&greet(), "a.$Greeter$Definition$Intercepted", "$$access$$greet").unwrap(), 3);
        assert_eq!(writer.targets()[1], DispatchTarget::FieldSet { field });
        assert!(writer.has_interceptable_method());
    }

    #[test]
    fn test_dispatch_methods() {
        let mut writer = DispatchWriter::new("a.Exec");
        writer.add_method(&greet()).unwrap();
        writer.add_set_field(&FieldElement::new("a.Greeter", "count", ClassElement::of("int")));
        let methods = writer.build_methods().unwrap();
        let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["dispatch", "dispatchOne", "getTargetMethodByIndex"]);

        let dispatch = methods[0].pretty_print();
        assert!(dispatch.contains("case 0:"));
        assert!(dispatch.contains("return ((a.Greeter) arg1).greet(((java.lang.String) arg2[0]));"));
        assert!(dispatch.contains("throw this.unknownDispatchAtIndexException(arg0);"));

        let dispatch_one = methods[1].pretty_print();
        assert!(dispatch_one.contains("case 1:"));
        assert!(dispatch_one.contains("((a.Greeter) arg1).count = ((int) arg2);"));

        let lookup = methods[2].pretty_print();
        assert!(lookup.contains("ReflectionUtils.getRequiredMethod(a.Greeter.class, \"greet\", new java.lang.Class[]{java.lang.String.class})"));
        assert!(!lookup.contains("case 1:"));
    }

    #[test]
    fn test_void_method_returns_null() {
        let mut writer = DispatchWriter::new("a.Exec");
        writer
            .add_method(&MethodElement::new("a.Greeter", "reset", ClassElement::of("void")))
            .unwrap();
        let methods = writer.build_methods().unwrap();
        assert!(methods[0].pretty_print().contains("((a.Greeter) arg1).reset();\n      return null;"));
        assert!(methods[1].pretty_print().contains("ReflectionUtils.EMPTY_CLASS_ARRAY"));
    }

    #[test]
    fn test_reflective_method_with_defaults_is_rejected() {
        let mut method = MethodElement::new("a.Greeter", "greet", ClassElement::of("void"))
            .with_parameter(ParameterElement::new("name", ClassElement::of("java.lang.String")).with_default());
        method.reflection_required = true;
        let mut writer = DispatchWriter::new("a.Exec");
        assert!(writer.add_method(&method).is_err());
        assert!(writer.targets().is_empty());
    }

    #[test]
    fn test_kotlin_defaults_single_value_dispatch() {
        let method = MethodElement::new("a.Greeter", "greet", ClassElement::of("java.lang.String"))
            .with_parameter(ParameterElement::new("name", ClassElement::of("java.lang.String")).with_default());
        let mut writer = DispatchWriter::new("a.Exec");
        writer.add_method_with(&method, true).unwrap();
        assert!(writer.targets()[0].supports_dispatch_one());
        assert!(!writer.targets()[0].supports_dispatch_multi());

        let methods = writer.build_methods().unwrap();
        let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["dispatchOne", "getTargetMethodByIndex"]);
        let body = methods[0].body.as_ref().unwrap();
        assert!(body.invokes("greet$default"));
    }

    #[test]
    fn test_kotlin_defaults_array_dispatch_by_default() {
        let method = MethodElement::new("a.Greeter", "greet", ClassElement::of("java.lang.String"))
            .with_parameter(ParameterElement::new("name", ClassElement::of("java.lang.String")).with_default());
        let mut writer = DispatchWriter::new("a.Exec");
        writer.add_method(&method).unwrap();
        assert!(matches!(
            writer.targets()[0],
            DispatchTarget::KotlinMethodWithDefaults { one_dispatch: false, .. }
        ));
        let methods = writer.build_methods().unwrap();
        assert_eq!(methods[0].name, "dispatch");
        assert!(methods[0].body.as_ref().unwrap().invokes("greet$default"));
    }

    #[test]
    fn test_interceptable_dispatch_bridges_to_proxy() {
        let mut writer = DispatchWriter::new("a.Exec");
        writer.add_intercepted_method(&greet(), "a.Proxy", "$$access$$greet").unwrap();
        let text = writer.build_methods().unwrap()[0].pretty_print();
        assert!(text.contains("if ((this.$interceptable && arg1 instanceof Proxy))"));
        assert!(text.contains("return ((a.Proxy) arg1).$$access$$greet(((java.lang.String) arg2[0]));"));
        assert!(text.contains("} else {"));
    }
}
