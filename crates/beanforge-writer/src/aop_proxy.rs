//! AOP proxy writer
//!
//! Produces `<definition>$Intercepted`, a subclass (or interface
//! implementation) whose advised methods run through a method interceptor
//! chain, plus the bean definition of the proxy itself.
//!
//! Four target strategies exist. Without a proxy target the proxy is the bean
//! and reaches the original code through `$$access$$` bridges. With a proxy
//! target the real bean is resolved from the context either eagerly, behind a
//! read-write lock (hotswap), on every call (lazy) or once under a monitor
//! (cached lazy).

use crate::argument::ArgumentBuilder;
use crate::bean_definition::{BeanDefinitionWriter, BeanProducer};
use crate::error::{WriterError, WriterResult};
use crate::gen_utils::{class, erased_type, method_ref, parameter_types, type_of};
use crate::method_gen::mask_words;
use crate::output::{write_class_def, ClassOutputVisitor};
use crate::runtime;
use crate::session::BuildSession;
use beanforge_bytecode::{
    modifiers, AnnotationDef, ClassDef, ClassDefBuilder, ClassTypeDef, ExpressionDef, FieldDef, FieldRef, MethodDef,
    MethodRef, StatementDef, TypeDef,
};
use beanforge_types::annotation::INTERCEPTOR_BINDING_DEFINITIONS;
use beanforge_types::{
    AnnotationEntry, AnnotationMetadata, AnnotationValue, ClassElement, FieldElement, InterceptorKind, MethodElement,
    ParameterElement, VisitorContext,
};
use rustc_hash::FxHashSet;

/// Suffix of proxy classes
pub const PROXY_SUFFIX: &str = "$Intercepted";

/// Parameters appended to the proxied constructor
pub const ADDITIONAL_PARAMETERS_COUNT: usize = 5;

const FIELD_INTERCEPTORS: &str = "$interceptors";
const FIELD_PROXY_METHODS: &str = "$proxyMethods";
const FIELD_TARGET: &str = "$target";
const FIELD_PROXY_BEAN_DEFINITION: &str = "$proxyBeanDefinition";
const FIELD_BEAN_QUALIFIER: &str = "$beanQualifier";
const FIELD_BEAN_RESOLUTION_CONTEXT: &str = "$beanResolutionContext";
const FIELD_BEAN_LOCATOR: &str = "$beanLocator";
const FIELD_READ_WRITE_LOCK: &str = "$target_rwl";
const FIELD_READ_LOCK: &str = "$target_rl";
const FIELD_WRITE_LOCK: &str = "$target_wl";
const BRIDGE_PREFIX: &str = "$$access$$";

/// `@Around` members controlling how the proxied bean is held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxySettings {
    /// Proxy a separately resolved target instead of subclassing the bean
    pub proxy_target: bool,
    /// Allow the target to be swapped at runtime
    pub hotswap: bool,
    /// Resolve the target on first use
    pub lazy: bool,
    /// Keep the lazily resolved target
    pub cacheable_lazy_target: bool,
}

impl ProxySettings {
    /// Settings declared by `@Around` in `meta`
    pub fn from_metadata(meta: &AnnotationMetadata) -> Self {
        let flag = |member: &str| meta.bool_value(runtime::AROUND, member).unwrap_or(false);
        Self {
            proxy_target: flag("proxyTarget"),
            hotswap: flag("hotswap"),
            lazy: flag("lazy"),
            cacheable_lazy_target: flag("cacheableLazyTarget"),
        }
    }
}

/// How the proxy reaches the instance it advises
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStrategy {
    /// The proxy is the bean
    SelfTarget,
    /// Target resolved in the constructor and held in a final field
    Eager,
    /// Target held in a mutable field guarded by a read-write lock
    Hotswap,
    /// Target resolved on every call
    Lazy,
    /// Target resolved once with double-checked locking
    CachedLazy,
}

impl TargetStrategy {
    fn resolve(settings: ProxySettings, proxy_target: bool) -> Self {
        if !proxy_target {
            TargetStrategy::SelfTarget
        } else if settings.lazy {
            if settings.cacheable_lazy_target {
                TargetStrategy::CachedLazy
            } else {
                TargetStrategy::Lazy
            }
        } else if settings.hotswap {
            TargetStrategy::Hotswap
        } else {
            TargetStrategy::Eager
        }
    }
}

/// Method routed through the interceptor chain, in `$proxyMethods` order
#[derive(Debug, Clone)]
struct ProxiedMethod {
    name: String,
    parameter_types: Vec<TypeDef>,
    method_index: usize,
    introduction: bool,
}

/// Constructor of the proxy class derived from the proxied one
#[derive(Debug)]
struct ProxyConstructor {
    declared: usize,
    /// Constructor seen by the proxy's bean definition
    visible: MethodElement,
    /// Parameters of the generated constructor, Kotlin masks included
    parameters: Vec<ParameterElement>,
    /// `(type, parameter index)` passed on to the super constructor
    super_binding: Vec<(TypeDef, usize)>,
}

impl ProxyConstructor {
    fn new(declared: &MethodElement, proxy_name: &str, bindings: &[AnnotationEntry]) -> Self {
        let interceptors_type = ClassElement::of(runtime::LIST).with_type_argument(
            "E",
            ClassElement::of(runtime::BEAN_REGISTRATION).with_type_argument("T", ClassElement::of(runtime::INTERCEPTOR)),
        );
        let binding_qualifier = AnnotationEntry::new(runtime::INTERCEPTOR_BINDING_QUALIFIER)
            .with("value", AnnotationValue::Annotations(bindings.to_vec()));

        let mut parameters = declared.parameters.clone();
        let mut super_binding: Vec<(TypeDef, usize)> =
            parameters.iter().enumerate().map(|(i, p)| (erased_type(&p.ty), i)).collect();
        parameters.extend([
            ParameterElement::new("$beanResolutionContext", ClassElement::of(runtime::BEAN_RESOLUTION_CONTEXT)),
            ParameterElement::new("$beanContext", ClassElement::of(runtime::BEAN_CONTEXT)),
            ParameterElement::new("$qualifier", ClassElement::of(runtime::QUALIFIER_TYPE)).with_annotation_metadata(
                AnnotationMetadata::empty().declare(AnnotationEntry::new(runtime::NULLABLE)),
            ),
            ParameterElement::new("$interceptors", interceptors_type)
                .with_annotation_metadata(AnnotationMetadata::empty().declare(binding_qualifier)),
            ParameterElement::new("$interceptorRegistry", ClassElement::of(runtime::INTERCEPTOR_REGISTRY)),
        ]);

        let mut visible = MethodElement::constructor(proxy_name, parameters.clone())
            .with_annotation_metadata(declared.annotation_metadata.clone());
        visible.reflection_required = declared.reflection_required;

        // Masks cover the appended parameters too; the super constructor only takes its own words.
        if declared.has_parameters_with_defaults() {
            for word in 0..mask_words(parameters.len()) {
                if word < mask_words(declared.parameters.len()) {
                    super_binding.push((TypeDef::int(), parameters.len()));
                }
                parameters.push(ParameterElement::new(format!("mask{}", word), ClassElement::of("int")));
            }
            super_binding.push((type_of(runtime::KOTLIN_DEFAULT_CONSTRUCTOR_MARKER), parameters.len()));
            parameters.push(ParameterElement::new(
                "marker",
                ClassElement::of(runtime::KOTLIN_DEFAULT_CONSTRUCTOR_MARKER),
            ));
        }

        Self {
            declared: declared.parameters.len(),
            visible,
            parameters,
            super_binding,
        }
    }

    fn resolution_context(&self) -> usize {
        self.declared
    }

    fn bean_context(&self) -> usize {
        self.declared + 1
    }

    fn qualifier(&self) -> usize {
        self.declared + 2
    }

    fn interceptors(&self) -> usize {
        self.declared + 3
    }

    fn interceptor_registry(&self) -> usize {
        self.declared + 4
    }

    fn builder(&self) -> beanforge_bytecode::MethodDefBuilder {
        let mut builder = MethodDef::constructor().add_modifiers(modifiers::PUBLIC);
        for p in &self.parameters {
            builder = builder.add_parameter(p.name.clone(), erased_type(&p.ty));
        }
        builder
    }
}

/// Writer of one proxy class and its bean definition
#[derive(Debug)]
pub struct AopProxyWriter {
    proxy_name: String,
    target: ClassElement,
    parent: Option<BeanDefinitionWriter>,
    definition: BeanDefinitionWriter,
    strategy: TargetStrategy,
    is_interface: bool,
    is_introduction: bool,
    implement_interface: bool,
    interfaces: Vec<ClassElement>,
    interceptor_bindings: Vec<AnnotationEntry>,
    originating: Vec<String>,
    constructor: Option<(MethodElement, bool)>,
    proxied_methods: Vec<ProxiedMethod>,
    proxied_keys: FxHashSet<String>,
    proxy_method_count: usize,
    builder: ClassDefBuilder,
    class_def: Option<ClassDef>,
}

impl AopProxyWriter {
    /// Proxy for the bean of `parent`
    ///
    /// The proxy takes ownership of the parent definition: executable methods
    /// of advised methods are registered on it and it is finalized and written
    /// together with the proxy.
    pub fn new(
        mut parent: BeanDefinitionWriter,
        settings: ProxySettings,
        interceptor_bindings: &[AnnotationEntry],
        context: &mut dyn VisitorContext,
    ) -> WriterResult<Self> {
        let target = parent.bean_type().clone();
        let is_interface = target.is_interface;
        let is_proxy_target = settings.proxy_target || is_interface;
        parent.set_proxied_bean(true, is_proxy_target);

        let proxy_name = format!("{}{}", parent.class_name(), PROXY_SUFFIX);
        let originating = parent.originating_elements().to_vec();
        let mut definition =
            proxy_definition(&proxy_name, &target, parent.annotation_metadata(), originating.clone(), context)?;
        definition.set_requires_method_processing(parent.requires_method_processing());
        definition.set_intercepted_type(target.name.clone());

        let strategy = TargetStrategy::resolve(settings, is_proxy_target);
        log::debug!("Writing proxy {} for {} ({:?})", proxy_name, target.name, strategy);
        let mut writer = Self::with_parts(proxy_name, target, Some(parent), definition, strategy, originating);
        writer.is_interface = is_interface;
        writer.visit_interceptor_binding(interceptor_bindings);
        writer.add_target_field();
        Ok(writer)
    }

    /// Introduction proxy implementing abstract members of `target` and `interfaces`
    ///
    /// With `implement_interface` false the target interface itself is not
    /// implemented and at least one entry of `interfaces` is required.
    pub fn new_introduction(
        target: &ClassElement,
        implement_interface: bool,
        interfaces: Vec<ClassElement>,
        originating: Vec<String>,
        interceptor_bindings: &[AnnotationEntry],
        context: &mut dyn VisitorContext,
    ) -> WriterResult<Self> {
        if !implement_interface && interfaces.is_empty() {
            return Err(WriterError::illegal_argument(
                "If implement_interface is false at least one interface must be provided",
            ));
        }
        let proxy_name = format!("{}{}", target.name, PROXY_SUFFIX);
        let mut definition = proxy_definition(
            &proxy_name,
            target,
            &target.annotation_metadata,
            originating.clone(),
            context,
        )?;
        if !target.is_interface || implement_interface {
            definition.set_intercepted_type(target.name.clone());
        }
        log::debug!("Writing introduction proxy {} for {}", proxy_name, target.name);

        let mut writer = Self::with_parts(
            proxy_name,
            target.clone(),
            None,
            definition,
            TargetStrategy::SelfTarget,
            originating,
        );
        writer.is_interface = target.is_interface;
        writer.is_introduction = true;
        writer.implement_interface = implement_interface;
        writer.interfaces = interfaces;
        writer.visit_interceptor_binding(interceptor_bindings);
        Ok(writer)
    }

    fn with_parts(
        proxy_name: String,
        target: ClassElement,
        parent: Option<BeanDefinitionWriter>,
        definition: BeanDefinitionWriter,
        strategy: TargetStrategy,
        originating: Vec<String>,
    ) -> Self {
        let mut builder = ClassDef::builder(proxy_name.clone());
        builder
            .add_modifiers(modifiers::SYNTHETIC)
            .add_field(
                FieldDef::builder(FIELD_INTERCEPTORS, interceptors_type())
                    .add_modifiers(modifiers::PRIVATE | modifiers::FINAL)
                    .build(),
            )
            .add_field(
                FieldDef::builder(FIELD_PROXY_METHODS, type_of(runtime::EXECUTABLE_METHOD).array())
                    .add_modifiers(modifiers::PRIVATE | modifiers::FINAL)
                    .build(),
            );
        Self {
            proxy_name,
            target,
            parent,
            definition,
            strategy,
            is_interface: false,
            is_introduction: false,
            implement_interface: true,
            interfaces: Vec::new(),
            interceptor_bindings: Vec::new(),
            originating,
            constructor: None,
            proxied_methods: Vec::new(),
            proxied_keys: FxHashSet::default(),
            proxy_method_count: 0,
            builder,
            class_def: None,
        }
    }

    fn add_target_field(&mut self) {
        let bits = match self.strategy {
            TargetStrategy::Eager => modifiers::PRIVATE | modifiers::FINAL,
            TargetStrategy::Hotswap | TargetStrategy::CachedLazy => modifiers::PRIVATE,
            TargetStrategy::SelfTarget | TargetStrategy::Lazy => return,
        };
        let field = FieldDef::builder(FIELD_TARGET, type_of(&self.target.name))
            .add_modifiers(bits)
            .build();
        self.builder.add_field(field);
    }

    // ===== Accessors =====

    /// Generated proxy class name
    pub fn proxy_class_name(&self) -> &str {
        &self.proxy_name
    }

    /// Type being proxied
    pub fn target_type(&self) -> &ClassElement {
        &self.target
    }

    /// Target strategy in use
    pub fn strategy(&self) -> TargetStrategy {
        self.strategy
    }

    /// Whether a separately resolved target is proxied
    pub fn is_proxy_target(&self) -> bool {
        self.strategy != TargetStrategy::SelfTarget
    }

    /// Bean definition of the proxy
    pub fn definition(&self) -> &BeanDefinitionWriter {
        &self.definition
    }

    /// Definition of the proxied bean, absent for introductions
    pub fn parent(&self) -> Option<&BeanDefinitionWriter> {
        self.parent.as_ref()
    }

    /// Mutable definition of the proxied bean, for visits that belong to it
    pub fn parent_mut(&mut self) -> Option<&mut BeanDefinitionWriter> {
        self.parent.as_mut()
    }

    /// Interceptor bindings the proxy resolves interceptors with
    pub fn interceptor_bindings(&self) -> &[AnnotationEntry] {
        &self.interceptor_bindings
    }

    /// Finalized proxy class
    pub fn class_def(&self) -> Option<&ClassDef> {
        self.class_def.as_ref()
    }

    fn ensure_open(&self) -> WriterResult<()> {
        if self.class_def.is_some() {
            return Err(WriterError::illegal_state(format!("Proxy {} is already finalized", self.proxy_name)));
        }
        Ok(())
    }

    // ===== Bindings and constructor =====

    /// Add interceptor bindings; entries without a binding annotation are ignored
    pub fn visit_interceptor_binding(&mut self, bindings: &[AnnotationEntry]) {
        for binding in bindings {
            if binding.string_value("value").is_some() && !self.interceptor_bindings.contains(binding) {
                self.interceptor_bindings.push(binding.clone());
            }
        }
    }

    /// Constructor of the proxied type; its `AROUND_CONSTRUCT` bindings are added
    pub fn visit_bean_definition_constructor(&mut self, constructor: &MethodElement, requires_reflection: bool) -> WriterResult<()> {
        self.ensure_open()?;
        let bindings = bindings_of_kind(&constructor.annotation_metadata, InterceptorKind::AroundConstruct);
        self.visit_interceptor_binding(&bindings);
        self.constructor = Some((constructor.clone(), requires_reflection));
        Ok(())
    }

    /// No-argument constructor carrying `annotation_metadata`
    pub fn visit_default_constructor(&mut self, annotation_metadata: &AnnotationMetadata) -> WriterResult<()> {
        self.ensure_open()?;
        let constructor = MethodElement::constructor(self.proxy_name.clone(), Vec::new())
            .with_annotation_metadata(annotation_metadata.clone());
        self.constructor = Some((constructor, false));
        Ok(())
    }

    // ===== Proxied methods =====

    /// Abstract method implemented through introduction advice
    pub fn visit_introduction_method(&mut self, declaring_bean: &ClassElement, method: &MethodElement) -> WriterResult<()> {
        self.visit_around_method(declaring_bean, method)
    }

    /// Method advised by around interceptors
    ///
    /// A method already overridden in `bean_type` with a different erased
    /// signature is delegated to `super` without interception. Structurally
    /// identical methods are proxied once.
    pub fn visit_around_method(&mut self, bean_type: &ClassElement, method: &MethodElement) -> WriterResult<()> {
        self.ensure_open()?;
        if let Some(overridden_by) = bean_type.methods.iter().find(|m| m.name == method.name && m.overrides(method)) {
            let key = signature_key(&method.name, method.parameters.iter().map(|p| &p.ty));
            let overridden_key = signature_key(&overridden_by.name, method.parameters.iter().map(|p| p.generic_type()));
            if key != overridden_key {
                let target = method_ref(overridden_by);
                let is_void = method.return_type.is_void();
                self.builder.add_method(
                    MethodDef::override_of(&method_ref(method))
                        .build_with(|params| finish_call(ExpressionDef::invoke_super(target, params.to_vec()), is_void)),
                );
                return Ok(());
            }
        }

        let return_type = if method.is_suspend { TypeDef::object() } else { erased_type(&method.return_type) };
        let key = format!(
            "{}:{}",
            signature_key(&method.name, method.parameters.iter().map(|p| &p.ty)),
            return_type.descriptor()
        );
        if !self.proxied_keys.insert(key) {
            log::trace!("Method {} of {} is already proxied", method.name, self.proxy_name);
            return Ok(());
        }

        let bridge = if self.strategy == TargetStrategy::SelfTarget && (!method.is_abstract || method.is_default) {
            let name = format!("{}{}", BRIDGE_PREFIX, method.name);
            let original = MethodRef::new(
                method.declaring_type.clone(),
                method.name.clone(),
                parameter_types(method),
                return_type.clone(),
            );
            let mut bridge = MethodDef::builder(name.clone())
                .add_modifiers(modifiers::PUBLIC)
                .returns(return_type.clone());
            for p in &method.parameters {
                bridge = bridge.add_parameter(p.name.clone(), erased_type(&p.ty));
            }
            let is_void = return_type.is_void();
            self.builder
                .add_method(bridge.build_with(|params| finish_call(ExpressionDef::invoke_super(original, params.to_vec()), is_void)));
            Some(name)
        } else {
            None
        };

        let proxy_name = self.proxy_name.clone();
        let intercepted = bridge.as_deref().map(|b| (proxy_name.as_str(), b));
        let method_index = match self.parent.as_mut() {
            Some(parent) => parent.visit_executable_method(method, intercepted)?,
            None => self.definition.visit_executable_method(method, intercepted)?,
        };

        let index = self.proxied_methods.len();
        self.proxied_methods.push(ProxiedMethod {
            name: method.name.clone(),
            parameter_types: method.parameters.iter().map(|p| erased_type(p.generic_type())).collect(),
            method_index,
            introduction: self.is_introduction && method.is_abstract && !method.is_default,
        });
        let override_method = self.method_override(method, index);
        self.builder.add_method(override_method);
        self.proxy_method_count += 1;
        Ok(())
    }

    fn method_override(&self, method: &MethodElement, index: usize) -> MethodDef {
        let this = ExpressionDef::this();
        let target = match self.strategy {
            TargetStrategy::SelfTarget => this.clone(),
            TargetStrategy::Eager => this.clone().field(self.target_field()),
            TargetStrategy::Hotswap | TargetStrategy::Lazy | TargetStrategy::CachedLazy => {
                this.clone().invoke(intercepted_target_ref(&self.proxy_name), vec![])
            }
        };
        let interceptors = this.clone().field(self.interceptors_field()).array_element(index);
        let executable = this.field(self.proxy_methods_field()).array_element(index);
        let is_void = method.return_type.is_void() && !method.is_suspend;
        let return_type = if method.is_suspend { TypeDef::object() } else { erased_type(&method.return_type) };

        MethodDef::override_of(&method_ref(method)).build_with(|params| {
            let mut chain_params = vec![
                type_of(runtime::INTERCEPTOR).array(),
                TypeDef::object(),
                type_of(runtime::EXECUTABLE_METHOD),
            ];
            let mut chain_args = vec![interceptors, target, executable];
            if !params.is_empty() {
                chain_params.push(TypeDef::object().array());
                chain_args.push(ExpressionDef::new_array(TypeDef::object(), params.to_vec()));
            }
            let proceed =
                ExpressionDef::new_instance(MethodRef::constructor(runtime::METHOD_INTERCEPTOR_CHAIN, chain_params), chain_args)
                    .invoke(MethodRef::new(runtime::INTERCEPTOR_CHAIN, "proceed", vec![], TypeDef::object()), vec![]);
            if is_void {
                finish_call(proceed, true)
            } else if return_type == TypeDef::object() {
                proceed.returning()
            } else {
                proceed.cast(return_type).returning()
            }
        })
    }

    // ===== Forwarded visits =====

    /// Field injected on the proxy
    pub fn visit_field_injection_point(&mut self, field: &FieldElement, requires_reflection: bool) -> WriterResult<usize> {
        self.definition.visit_field_injection_point(field, requires_reflection)
    }

    /// Field fed from configuration on the proxy
    pub fn visit_field_value(
        &mut self,
        field: &FieldElement,
        requires_reflection: bool,
        optional: bool,
        context: &mut dyn VisitorContext,
    ) -> WriterResult<Option<usize>> {
        self.definition.visit_field_value(field, requires_reflection, optional, context)
    }

    /// Method injected on the proxy
    pub fn visit_method_injection_point(&mut self, method: &MethodElement, requires_reflection: bool) -> WriterResult<usize> {
        self.definition.visit_method_injection_point(method, requires_reflection)
    }

    /// Setter fed from configuration on the proxy
    pub fn visit_setter_value(
        &mut self,
        setter: &MethodElement,
        requires_reflection: bool,
        optional: bool,
        context: &mut dyn VisitorContext,
    ) -> WriterResult<Option<usize>> {
        self.definition.visit_setter_value(setter, requires_reflection, optional, context)
    }

    /// Post-construct method of the proxy
    pub fn visit_post_construct_method(&mut self, method: &MethodElement, requires_reflection: bool) -> WriterResult<Option<usize>> {
        self.definition.visit_post_construct_method(method, requires_reflection)
    }

    /// Pre-destroy method of the proxy
    pub fn visit_pre_destroy_method(&mut self, method: &MethodElement, requires_reflection: bool) -> WriterResult<Option<usize>> {
        self.definition.visit_pre_destroy_method(method, requires_reflection)
    }

    /// Executable method of the proxy definition
    pub fn visit_executable_method(&mut self, method: &MethodElement) -> WriterResult<usize> {
        self.definition.visit_executable_method(method, None)
    }

    /// Bean property deciding whether the proxy loads
    pub fn visit_annotation_member_property_injection_point(
        &mut self,
        member_bean_type: &ClassElement,
        property: &str,
        required_value: Option<&str>,
        not_equals_value: Option<&str>,
        context: &mut dyn VisitorContext,
    ) -> WriterResult<()> {
        self.definition.visit_annotation_member_property_injection_point(
            member_bean_type,
            property,
            required_value,
            not_equals_value,
            context,
        )
    }

    /// Type arguments of the proxied bean's supertypes
    pub fn visit_type_arguments(&mut self, type_arguments: Vec<(String, Vec<(String, ClassElement)>)>) -> WriterResult<()> {
        self.definition.visit_type_arguments(type_arguments)
    }

    /// Extend the definition `name` instead of the abstract base
    pub fn visit_super_bean_definition(&mut self, name: impl Into<String>) {
        self.definition.visit_super_bean_definition(name);
    }

    /// Configuration builder held in `field`
    pub fn visit_config_builder_field(&mut self, builder_type: &ClassElement, field: &FieldElement) -> WriterResult<()> {
        self.definition.visit_config_builder_field(builder_type, field)
    }

    /// Configuration builder returned by `getter`
    pub fn visit_config_builder_method(&mut self, builder_type: &ClassElement, getter: &MethodElement) -> WriterResult<()> {
        self.definition.visit_config_builder_method(builder_type, getter)
    }

    /// Builder method fed from `path`
    pub fn visit_config_builder_method_point(
        &mut self,
        path: &str,
        method_name: &str,
        parameter: Option<&ClassElement>,
        return_type: &ClassElement,
    ) -> WriterResult<()> {
        self.definition
            .visit_config_builder_method_point(path, method_name, parameter, return_type)
    }

    /// Builder method taking a duration
    pub fn visit_config_builder_duration_method(&mut self, path: &str, method_name: &str, return_type: &ClassElement) -> WriterResult<()> {
        self.definition
            .visit_config_builder_duration_method(path, method_name, return_type)
    }

    /// Close the current configuration builder
    pub fn visit_config_builder_end(&mut self) -> WriterResult<()> {
        self.definition.visit_config_builder_end()
    }

    // ===== Finalization =====

    /// Assemble the proxy class and finalize both definitions
    pub fn visit_bean_definition_end(&mut self, session: &mut BuildSession) -> WriterResult<()> {
        self.ensure_open()?;
        let Some((declared, requires_reflection)) = self.constructor.clone() else {
            return Err(WriterError::illegal_state(
                "The method visit_bean_definition_constructor(..) should be called at least once",
            ));
        };

        let target_type = class(&self.target.name);
        if !self.is_interface {
            self.builder.superclass(target_type.clone());
        }
        let mut interfaces: Vec<ClassTypeDef> = self.interfaces.iter().map(|i| class(&i.name)).collect();
        if self.is_interface && self.implement_interface {
            interfaces.push(target_type);
        }
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        for interface in interfaces {
            self.builder.add_interface(interface);
        }
        self.builder.add_annotation(AnnotationDef::of(runtime::GENERATED));

        let constructor = ProxyConstructor::new(&declared, &self.proxy_name, &self.interceptor_bindings);

        if self.strategy == TargetStrategy::SelfTarget {
            if let Some(parent) = &self.parent {
                for (method, reflection) in parent.post_construct_methods() {
                    self.definition.visit_post_construct_method(&method, reflection)?;
                }
            }
        }
        self.definition
            .visit_bean_definition_constructor(&constructor.visible, requires_reflection)?;
        if let Some(parent) = &self.parent {
            self.definition
                .generate_proxy_reference(parent.class_name(), parent.bean_type().name.clone());
        }

        let proxy_constructor = if self.strategy == TargetStrategy::SelfTarget {
            self.builder.add_interface(class(if self.is_introduction {
                runtime::INTRODUCED
            } else {
                runtime::INTERCEPTED
            }));
            self.self_target_constructor(&constructor)?
        } else {
            self.proxy_target_constructor(session, &constructor)?
        };
        self.builder.add_method(proxy_constructor);

        if let Some(parent) = self.parent.as_mut() {
            if !parent.is_finalized() {
                parent.visit_bean_definition_end(session)?;
            }
        }
        self.definition.visit_bean_definition_end(session)?;

        for method in session.take_load_class_methods(&self.proxy_name) {
            self.builder.add_method(method);
        }
        let class_def = self.builder.build();
        log::debug!(
            "Finalized proxy {} with {} proxied method(s)",
            self.proxy_name,
            self.proxied_methods.len()
        );
        self.class_def = Some(class_def);
        Ok(())
    }

    fn super_constructor_call(&self, constructor: &ProxyConstructor, params: &[ExpressionDef]) -> StatementDef {
        if self.is_interface {
            return ExpressionDef::invoke_super(MethodRef::constructor(runtime::OBJECT, vec![]), vec![]).statement();
        }
        let (types, values): (Vec<TypeDef>, Vec<ExpressionDef>) = constructor
            .super_binding
            .iter()
            .map(|(ty, i)| (ty.clone(), params[*i].clone()))
            .unzip();
        ExpressionDef::invoke_super(MethodRef::constructor(self.target.name.clone(), types), values).statement()
    }

    fn self_target_constructor(&self, constructor: &ProxyConstructor) -> WriterResult<MethodDef> {
        let builder = constructor.builder();
        let params = builder.params();
        let mut body = vec![self.super_constructor_call(constructor, &params)];

        if !self.proxied_methods.is_empty() {
            let exec = self
                .parent
                .as_ref()
                .unwrap_or(&self.definition)
                .executable_methods()
                .ok_or_else(|| {
                    WriterError::illegal_state(format!("Proxy {} has methods but no executable methods", self.proxy_name))
                })?;
            let exec_type = type_of(exec.class_name());
            let instance = if exec.has_interceptable_method() {
                ExpressionDef::new_instance(
                    MethodRef::constructor(exec.class_name(), vec![TypeDef::boolean()]),
                    vec![ExpressionDef::bool(true)],
                )
            } else {
                ExpressionDef::new_instance(MethodRef::constructor(exec.class_name(), vec![]), vec![])
            };
            let by_index = MethodRef::new(
                exec.class_name(),
                "getExecutableMethodByIndex",
                vec![TypeDef::int()],
                type_of(runtime::EXECUTABLE_METHOD),
            );
            body.push(instance.new_local("executableMethods", exec_type, |methods| {
                let references = self
                    .proxied_methods
                    .iter()
                    .map(|m| methods.clone().invoke(by_index.clone(), vec![ExpressionDef::int(m.method_index as i32)]))
                    .collect();
                StatementDef::multi(vec![
                    self.assign_proxy_methods(references),
                    self.assign_interceptors(constructor, &params),
                ])
            }));
        }
        body.push(StatementDef::return_void());
        Ok(builder.build(StatementDef::multi(body)))
    }

    fn proxy_target_constructor(&mut self, session: &mut BuildSession, constructor: &ProxyConstructor) -> WriterResult<MethodDef> {
        if self.proxied_methods.len() != self.proxy_method_count {
            return Err(WriterError::illegal_state(format!(
                "Expected proxy methods count to match actual methods for {}",
                self.proxy_name
            )));
        }
        let target_argument = ArgumentBuilder::new(session, &self.proxy_name).argument(
            self.target.simple_name(),
            &self.target,
            &AnnotationMetadata::empty(),
        )?;
        let this = ExpressionDef::this();
        let owner = self.proxy_name.clone();
        let target_type = type_of(&self.target.name);
        let bean_definition_type = type_of(runtime::BEAN_DEFINITION);
        let qualifier_type = type_of(runtime::QUALIFIER_TYPE);
        let proxy_definition = FieldRef::new(owner.clone(), FIELD_PROXY_BEAN_DEFINITION, bean_definition_type.clone());
        let qualifier = FieldRef::new(owner.clone(), FIELD_BEAN_QUALIFIER, qualifier_type.clone());
        let resolution_context = FieldRef::new(owner.clone(), FIELD_BEAN_RESOLUTION_CONTEXT, type_of(runtime::BEAN_RESOLUTION_CONTEXT));
        let locator = FieldRef::new(owner.clone(), FIELD_BEAN_LOCATOR, type_of(runtime::BEAN_LOCATOR));

        self.builder
            .add_field(
                FieldDef::builder(FIELD_PROXY_BEAN_DEFINITION, bean_definition_type)
                    .add_modifiers(modifiers::PRIVATE | modifiers::FINAL)
                    .build(),
            )
            .add_field(
                FieldDef::builder(FIELD_BEAN_QUALIFIER, qualifier_type.clone())
                    .add_modifiers(modifiers::PRIVATE)
                    .build(),
            )
            .add_method(
                MethodDef::builder("withQualifier")
                    .add_modifiers(modifiers::PUBLIC)
                    .add_parameter("qualifier", qualifier_type)
                    .build_with(|params| {
                        StatementDef::multi(vec![
                            ExpressionDef::this().put_field(qualifier.clone(), params[0].clone()),
                            StatementDef::return_void(),
                        ])
                    }),
            );

        let builder = constructor.builder();
        let params = builder.params();
        let res = params[constructor.resolution_context()].clone();
        let ctx = params[constructor.bean_context()].clone();
        let qualifier_param = params[constructor.qualifier()].clone();

        let mut body = vec![
            self.super_constructor_call(constructor, &params),
            this.clone().put_field(
                proxy_definition.clone(),
                ctx.clone().invoke(
                    MethodRef::interface(
                        runtime::BEAN_CONTEXT,
                        "getProxyTargetBeanDefinition",
                        vec![type_of(runtime::ARGUMENT), type_of(runtime::QUALIFIER_TYPE)],
                        type_of(runtime::BEAN_DEFINITION),
                    ),
                    vec![target_argument.clone(), qualifier_param.clone()],
                ),
            ),
            this.clone().put_field(qualifier.clone(), qualifier_param.clone()),
        ];

        let resolve_target = |resolution: ExpressionDef, locator_value: ExpressionDef, qualifier_value: ExpressionDef| {
            locator_value
                .cast(type_of(runtime::DEFAULT_BEAN_CONTEXT))
                .invoke(
                    MethodRef::new(
                        runtime::DEFAULT_BEAN_CONTEXT,
                        "getProxyTargetBean",
                        vec![
                            type_of(runtime::BEAN_RESOLUTION_CONTEXT),
                            type_of(runtime::BEAN_DEFINITION),
                            type_of(runtime::ARGUMENT),
                            type_of(runtime::QUALIFIER_TYPE),
                        ],
                        TypeDef::object(),
                    ),
                    vec![
                        resolution,
                        ExpressionDef::this().field(proxy_definition.clone()),
                        target_argument.clone(),
                        qualifier_value,
                    ],
                )
        };

        let target_field = self.target_field();
        match self.strategy {
            TargetStrategy::Lazy | TargetStrategy::CachedLazy => {
                self.builder
                    .add_interface(class(runtime::INTERCEPTED_PROXY))
                    .add_field(
                        FieldDef::builder(FIELD_BEAN_RESOLUTION_CONTEXT, type_of(runtime::BEAN_RESOLUTION_CONTEXT))
                            .add_modifiers(modifiers::PRIVATE)
                            .build(),
                    )
                    .add_field(
                        FieldDef::builder(FIELD_BEAN_LOCATOR, type_of(runtime::BEAN_LOCATOR))
                            .add_modifiers(modifiers::PRIVATE | modifiers::FINAL)
                            .build(),
                    );
                let resolved = resolve_target(
                    this.clone().field(resolution_context.clone()),
                    this.clone().field(locator.clone()),
                    this.clone().field(qualifier.clone()),
                );
                if self.strategy == TargetStrategy::CachedLazy {
                    self.builder
                        .add_method(cached_lazy_target_method(&owner, target_field.clone(), resolution_context.clone(), resolved))
                        .add_method(has_cached_target_method(target_field.clone()));
                } else {
                    self.builder.add_method(
                        MethodDef::builder("interceptedTarget")
                            .add_modifiers(modifiers::PUBLIC)
                            .returns(TypeDef::object())
                            .build(resolved.returning()),
                    );
                }
                body.push(this.clone().put_field(locator, ctx.clone()));
                body.push(this.clone().put_field(
                    resolution_context,
                    res.clone().invoke(
                        MethodRef::interface(runtime::BEAN_RESOLUTION_CONTEXT, "copy", vec![], type_of(runtime::BEAN_RESOLUTION_CONTEXT)),
                        vec![],
                    ),
                ));
            }
            TargetStrategy::Hotswap | TargetStrategy::Eager => {
                if self.strategy == TargetStrategy::Hotswap {
                    self.add_hotswap_members(target_field.clone());
                } else {
                    self.builder
                        .add_interface(ClassTypeDef::parameterized(runtime::INTERCEPTED_PROXY, vec![target_type.clone()]))
                        .add_method(
                            MethodDef::builder("interceptedTarget")
                                .add_modifiers(modifiers::PUBLIC)
                                .returns(TypeDef::object())
                                .build(ExpressionDef::this().field(target_field.clone()).returning()),
                        );
                }
                body.push(this.clone().put_field(
                    target_field,
                    resolve_target(res.clone(), ctx.clone(), qualifier_param).cast(target_type),
                ));
            }
            TargetStrategy::SelfTarget => {
                return Err(WriterError::illegal_state(format!("Proxy {} has no proxy target", self.proxy_name)));
            }
        }

        let required_method = MethodRef::interface(
            runtime::BEAN_DEFINITION,
            "getRequiredMethod",
            vec![TypeDef::string(), TypeDef::class().array()],
            type_of(runtime::EXECUTABLE_METHOD),
        );
        let references = self
            .proxied_methods
            .iter()
            .map(|m| {
                this.clone().field(proxy_definition.clone()).invoke(
                    required_method.clone(),
                    vec![
                        ExpressionDef::string(m.name.clone()),
                        ExpressionDef::new_array(
                            TypeDef::class(),
                            m.parameter_types.iter().map(|t| ExpressionDef::class_literal(t.clone())).collect(),
                        ),
                    ],
                )
            })
            .collect();
        body.push(self.assign_proxy_methods(references));
        body.push(self.assign_interceptors(constructor, &params));
        body.push(StatementDef::return_void());
        Ok(builder.build(StatementDef::multi(body)))
    }

    fn add_hotswap_members(&mut self, target_field: FieldRef) {
        let owner = self.proxy_name.clone();
        let lock_type = type_of(runtime::LOCK);
        let rw_lock = FieldRef::new(owner.clone(), FIELD_READ_WRITE_LOCK, type_of(runtime::READ_WRITE_LOCK));
        let read_lock = FieldRef::new(owner.clone(), FIELD_READ_LOCK, lock_type.clone());
        let write_lock = FieldRef::new(owner, FIELD_WRITE_LOCK, lock_type.clone());
        let lock_of = |name: &str| {
            ExpressionDef::this()
                .field(rw_lock.clone())
                .invoke(MethodRef::new(runtime::READ_WRITE_LOCK, name, vec![], lock_type.clone()), vec![])
        };

        self.builder
            .add_interface(ClassTypeDef::parameterized(
                runtime::HOTSWAPPABLE_INTERCEPTED_PROXY,
                vec![type_of(&self.target.name)],
            ))
            .add_field(
                FieldDef::builder(FIELD_READ_WRITE_LOCK, type_of(runtime::READ_WRITE_LOCK))
                    .add_modifiers(modifiers::PRIVATE | modifiers::FINAL)
                    .initializer(ExpressionDef::new_instance(MethodRef::constructor(runtime::READ_WRITE_LOCK, vec![]), vec![]))
                    .build(),
            )
            .add_field(
                FieldDef::builder(FIELD_READ_LOCK, lock_type.clone())
                    .add_modifiers(modifiers::PRIVATE | modifiers::FINAL)
                    .initializer(lock_of("readLock"))
                    .build(),
            )
            .add_field(
                FieldDef::builder(FIELD_WRITE_LOCK, lock_type.clone())
                    .add_modifiers(modifiers::PRIVATE | modifiers::FINAL)
                    .initializer(lock_of("writeLock"))
                    .build(),
            )
            .add_method(swap_method(&self.target.name, target_field.clone(), write_lock))
            .add_method(
                MethodDef::builder("interceptedTarget")
                    .add_modifiers(modifiers::PUBLIC)
                    .returns(TypeDef::object())
                    .build(StatementDef::multi(vec![
                        lock_call(read_lock.clone(), "lock"),
                        StatementDef::try_finally(
                            ExpressionDef::this().field(target_field).returning(),
                            lock_call(read_lock, "unlock"),
                        ),
                    ])),
            );
    }

    fn assign_proxy_methods(&self, references: Vec<ExpressionDef>) -> StatementDef {
        ExpressionDef::this().put_field(
            self.proxy_methods_field(),
            ExpressionDef::new_array(type_of(runtime::EXECUTABLE_METHOD), references),
        )
    }

    fn assign_interceptors(&self, constructor: &ProxyConstructor, params: &[ExpressionDef]) -> StatementDef {
        let registry = params[constructor.interceptor_registry()].clone();
        let interceptors = params[constructor.interceptors()].clone();
        let resolved = self
            .proxied_methods
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let name = if m.introduction {
                    "resolveIntroductionInterceptors"
                } else {
                    "resolveAroundInterceptors"
                };
                ExpressionDef::invoke_static(
                    MethodRef::new(
                        runtime::INTERCEPTOR_CHAIN,
                        name,
                        vec![
                            type_of(runtime::INTERCEPTOR_REGISTRY),
                            type_of(runtime::EXECUTABLE_METHOD),
                            type_of(runtime::LIST),
                        ],
                        type_of(runtime::INTERCEPTOR).array(),
                    ),
                    vec![
                        registry.clone(),
                        ExpressionDef::this().field(self.proxy_methods_field()).array_element(i),
                        interceptors.clone(),
                    ],
                )
            })
            .collect();
        ExpressionDef::this().put_field(
            self.interceptors_field(),
            ExpressionDef::new_array(type_of(runtime::INTERCEPTOR).array(), resolved),
        )
    }

    fn target_field(&self) -> FieldRef {
        FieldRef::new(self.proxy_name.clone(), FIELD_TARGET, type_of(&self.target.name))
    }

    fn interceptors_field(&self) -> FieldRef {
        FieldRef::new(self.proxy_name.clone(), FIELD_INTERCEPTORS, interceptors_type())
    }

    fn proxy_methods_field(&self) -> FieldRef {
        FieldRef::new(
            self.proxy_name.clone(),
            FIELD_PROXY_METHODS,
            type_of(runtime::EXECUTABLE_METHOD).array(),
        )
    }

    // ===== Output =====

    /// Encoded proxy class
    pub fn to_byte_array(&self) -> WriterResult<Vec<u8>> {
        let class_def = self
            .class_def
            .as_ref()
            .ok_or_else(|| WriterError::illegal_state("Proxy not finalized. Call visit_bean_definition_end() first."))?;
        Ok(beanforge_bytecode::ClassFileWriter::write(class_def)?)
    }

    /// Write the proxied definition, the proxy definition and the proxy class
    pub fn accept(&self, visitor: &mut dyn ClassOutputVisitor, session: &mut BuildSession) -> WriterResult<()> {
        let class_def = self
            .class_def
            .as_ref()
            .ok_or_else(|| WriterError::illegal_state("Proxy not finalized. Call visit_bean_definition_end() first."))?;
        if let Some(parent) = &self.parent {
            parent.accept(visitor, session)?;
        }
        self.definition.accept(visitor, session)?;
        write_class_def(visitor, class_def, &self.originating)
    }
}

/// Definition writer for the proxy class, assignable to everything the target is
fn proxy_definition(
    proxy_name: &str,
    target: &ClassElement,
    meta: &AnnotationMetadata,
    originating: Vec<String>,
    context: &mut dyn VisitorContext,
) -> WriterResult<BeanDefinitionWriter> {
    let element = ClassElement::of(proxy_name)
        .with_supertypes(std::iter::once(target.name.clone()).chain(target.supertypes.iter().cloned()))
        .with_annotation_metadata(meta.clone());
    BeanDefinitionWriter::new(BeanProducer::Class(element), originating, None, context)
}

/// `Interceptor[][]`
fn interceptors_type() -> TypeDef {
    type_of(runtime::INTERCEPTOR).array().array()
}

fn intercepted_target_ref(owner: &str) -> MethodRef {
    MethodRef::new(owner, "interceptedTarget", vec![], TypeDef::object())
}

fn lock_call(lock: FieldRef, name: &str) -> StatementDef {
    ExpressionDef::this()
        .field(lock)
        .invoke(MethodRef::interface(runtime::LOCK, name, vec![], TypeDef::Void), vec![])
        .statement()
}

fn finish_call(call: ExpressionDef, is_void: bool) -> StatementDef {
    if is_void {
        StatementDef::multi(vec![call.statement(), StatementDef::return_void()])
    } else {
        call.returning()
    }
}

/// `swap(Object)`: replace the target under the write lock and return the previous one
fn swap_method(target_type: &str, target_field: FieldRef, write_lock: FieldRef) -> MethodDef {
    let ty = type_of(target_type);
    MethodDef::builder("swap")
        .add_modifiers(modifiers::PUBLIC)
        .add_parameter("newTarget", TypeDef::object())
        .returns(TypeDef::object())
        .build_with(|params| {
            let new_target = params[0].clone().cast(ty.clone());
            StatementDef::multi(vec![
                lock_call(write_lock.clone(), "lock"),
                StatementDef::try_finally(
                    ExpressionDef::this().field(target_field.clone()).new_local("target", ty, |previous| {
                        StatementDef::multi(vec![
                            ExpressionDef::this().put_field(target_field, new_target),
                            previous.returning(),
                        ])
                    }),
                    lock_call(write_lock, "unlock"),
                ),
            ])
        })
}

/// Double-checked `interceptedTarget()` that drops the resolution context once resolved
fn cached_lazy_target_method(
    owner: &str,
    target_field: FieldRef,
    resolution_context: FieldRef,
    resolved: ExpressionDef,
) -> MethodDef {
    let ty = target_field.ty.clone();
    let field = ExpressionDef::this().field(target_field.clone());
    let local = ExpressionDef::local("target", ty.clone());
    let body = StatementDef::multi(vec![
        StatementDef::DefineLocal {
            name: "target".into(),
            ty: ty.clone(),
            value: field.clone(),
        },
        local.clone().is_null().if_true(StatementDef::synchronized(
            ExpressionDef::this(),
            StatementDef::multi(vec![
                StatementDef::assign("target", field.clone()),
                local.is_null().if_true(StatementDef::multi(vec![
                    ExpressionDef::this().put_field(target_field, resolved.cast(ty)),
                    ExpressionDef::this().put_field(resolution_context, ExpressionDef::null()),
                ])),
            ]),
        )),
        field.returning(),
    ]);
    log::trace!("Generated cached lazy target lookup for {}", owner);
    MethodDef::builder("interceptedTarget")
        .add_modifiers(modifiers::PUBLIC)
        .returns(TypeDef::object())
        .build(body)
}

fn has_cached_target_method(target_field: FieldRef) -> MethodDef {
    MethodDef::builder("hasCachedInterceptedTarget")
        .add_modifiers(modifiers::PUBLIC)
        .returns(TypeDef::boolean())
        .build(ExpressionDef::this().field(target_field).is_non_null().returning())
}

/// Name followed by comma-separated parameter type names, arrays as `[]`
fn signature_key<'a>(name: &str, types: impl Iterator<Item = &'a ClassElement>) -> String {
    let types: Vec<String> = types
        .map(|t| format!("{}{}", t.name, "[]".repeat(t.array_dimensions as usize)))
        .collect();
    format!("{}{}", name, types.join(","))
}

/// Binding entries of `kind` declared through `@InterceptorBindingDefinitions`
fn bindings_of_kind(meta: &AnnotationMetadata, kind: InterceptorKind) -> Vec<AnnotationEntry> {
    let Some(value) = meta.value(INTERCEPTOR_BINDING_DEFINITIONS, "value") else {
        return Vec::new();
    };
    value
        .as_annotations()
        .into_iter()
        .filter(|binding| {
            binding
                .string_value("kind")
                .and_then(|k| InterceptorKind::from_name(&k))
                .unwrap_or(InterceptorKind::Around)
                == kind
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use beanforge_types::CollectingVisitorContext;

    fn binding(annotation: &str, kind: &str) -> AnnotationEntry {
        AnnotationEntry::new(runtime::INTERCEPTOR_BINDING)
            .with("value", AnnotationValue::String(annotation.into()))
            .with("kind", AnnotationValue::Enum(kind.into()))
    }

    fn parent(context: &mut CollectingVisitorContext) -> BeanDefinitionWriter {
        let bean = ClassElement::of("app.Service");
        BeanDefinitionWriter::new(BeanProducer::Class(bean.clone()), vec![bean.name], None, context).expect("parent")
    }

    #[test]
    fn test_strategy_resolution() {
        let lazy = ProxySettings {
            proxy_target: true,
            lazy: true,
            hotswap: true,
            ..ProxySettings::default()
        };
        assert_eq!(TargetStrategy::resolve(lazy, true), TargetStrategy::Lazy);
        let cached = ProxySettings {
            cacheable_lazy_target: true,
            ..lazy
        };
        assert_eq!(TargetStrategy::resolve(cached, true), TargetStrategy::CachedLazy);
        assert_eq!(TargetStrategy::resolve(cached, false), TargetStrategy::SelfTarget);
        let hotswap = ProxySettings {
            proxy_target: true,
            hotswap: true,
            ..ProxySettings::default()
        };
        assert_eq!(TargetStrategy::resolve(hotswap, true), TargetStrategy::Hotswap);
        assert_eq!(TargetStrategy::resolve(ProxySettings::default(), true), TargetStrategy::Eager);
    }

    #[test]
    fn test_settings_from_around() {
        let meta = AnnotationMetadata::empty().declare(
            AnnotationEntry::new(runtime::AROUND)
                .with("proxyTarget", AnnotationValue::Bool(true))
                .with("lazy", AnnotationValue::Bool(true)),
        );
        let settings = ProxySettings::from_metadata(&meta);
        assert!(settings.proxy_target && settings.lazy);
        assert!(!settings.hotswap && !settings.cacheable_lazy_target);
    }

    #[test]
    fn test_proxy_names_and_bindings() {
        let mut context = CollectingVisitorContext::new();
        let around = binding("app.Logged", "AROUND");
        let writer = AopProxyWriter::new(
            parent(&mut context),
            ProxySettings::default(),
            &[around.clone(), around, AnnotationEntry::new(runtime::INTERCEPTOR_BINDING)],
            &mut context,
        )
        .expect("proxy");
        assert_eq!(writer.proxy_class_name(), "app.$Service$Definition$Intercepted");
        assert_eq!(writer.definition().class_name(), "app.$Service$Definition$Intercepted$Definition");
        assert_eq!(writer.interceptor_bindings().len(), 1);
        assert!(!writer.is_proxy_target());
        assert_eq!(writer.definition().intercepted_type(), Some("app.Service"));
    }

    #[test]
    fn test_around_construct_bindings_are_recorded() {
        let mut context = CollectingVisitorContext::new();
        let mut writer = AopProxyWriter::new(parent(&mut context), ProxySettings::default(), &[], &mut context).expect("proxy");
        let meta = AnnotationMetadata::empty().declare(AnnotationEntry::new(INTERCEPTOR_BINDING_DEFINITIONS).with(
            "value",
            AnnotationValue::Annotations(vec![
                binding("app.Created", "AROUND_CONSTRUCT"),
                binding("app.Logged", "AROUND"),
            ]),
        ));
        let ctor = MethodElement::constructor("app.Service", Vec::new()).with_annotation_metadata(meta);
        writer.visit_bean_definition_constructor(&ctor, false).expect("ctor");
        assert_eq!(writer.interceptor_bindings().len(), 1);
        assert_eq!(writer.interceptor_bindings()[0].string_value("value").as_deref(), Some("app.Created"));
    }

    #[test]
    fn test_introduction_requires_an_interface() {
        let mut context = CollectingVisitorContext::new();
        let target = ClassElement::of("app.Client").interface();
        let err = AopProxyWriter::new_introduction(&target, false, Vec::new(), Vec::new(), &[], &mut context)
            .expect_err("no interfaces");
        assert!(matches!(err, WriterError::IllegalArgument { .. }));
        let writer = AopProxyWriter::new_introduction(&target, true, Vec::new(), Vec::new(), &[], &mut context)
            .expect("introduction");
        assert_eq!(writer.proxy_class_name(), "app.Client$Intercepted");
    }

    #[test]
    fn test_end_without_constructor() {
        let mut context = CollectingVisitorContext::new();
        let mut session = BuildSession::new(Default::default());
        let mut writer = AopProxyWriter::new(parent(&mut context), ProxySettings::default(), &[], &mut context).expect("proxy");
        let err = writer.visit_bean_definition_end(&mut session).expect_err("no constructor");
        assert!(err.to_string().contains("should be called at least once"));
    }

    #[test]
    fn test_signature_key_flattens_arrays() {
        let ty = ClassElement::of("java.lang.String").to_array();
        assert_eq!(signature_key("join", [&ty, &ClassElement::of("int")].into_iter()), "joinjava.lang.String[],int");
    }
}
