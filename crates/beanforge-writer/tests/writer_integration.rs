//! End-to-end tests for bean definition and proxy generation

use beanforge_bytecode::{ClassFile, ExpressionDef, StatementDef};
use beanforge_types::annotation::INTERCEPTOR_BINDING_DEFINITIONS;
use beanforge_types::{
    AnnotationEntry, AnnotationMetadata, AnnotationValue, ClassElement, CollectingVisitorContext, FieldElement,
    InterceptorKind, MethodElement, ParameterElement,
};
use beanforge_writer::{
    runtime, AopProxyWriter, BeanDefinitionWriter, BeanProducer, BuildSession, ClassOutputVisitor,
    DirectoryClassOutput, InMemoryClassOutput, ProxySettings, TargetStrategy, WriterError, WriterOptions,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn singleton_meta() -> AnnotationMetadata {
    AnnotationMetadata::empty()
        .declare(AnnotationEntry::new(runtime::SINGLETON))
        .stereotype(runtime::SCOPE, runtime::SINGLETON)
}

fn binding(annotation: &str, kind: &str) -> AnnotationEntry {
    AnnotationEntry::new(runtime::INTERCEPTOR_BINDING)
        .with("value", AnnotationValue::String(annotation.into()))
        .with("kind", AnnotationValue::Enum(kind.into()))
}

fn bindings_meta(meta: AnnotationMetadata, bindings: Vec<AnnotationEntry>) -> AnnotationMetadata {
    meta.declare(AnnotationEntry::new(INTERCEPTOR_BINDING_DEFINITIONS).with("value", AnnotationValue::Annotations(bindings)))
}

fn around(members: &[(&str, bool)]) -> AnnotationMetadata {
    let mut entry = AnnotationEntry::new(runtime::AROUND);
    for (member, value) in members {
        entry = entry.with(*member, AnnotationValue::Bool(*value));
    }
    bindings_meta(singleton_meta().declare(entry), vec![binding("app.Logged", "AROUND")])
}

fn definition(bean: &ClassElement, context: &mut CollectingVisitorContext) -> BeanDefinitionWriter {
    BeanDefinitionWriter::new(BeanProducer::Class(bean.clone()), vec![bean.name.clone()], None, context)
        .expect("Failed to create definition writer")
}

fn greet(owner: &str) -> MethodElement {
    MethodElement::new(owner, "greet", ClassElement::of("java.lang.String"))
        .with_parameter(ParameterElement::new("name", ClassElement::of("java.lang.String")))
}

fn proxy(settings: ProxySettings, meta: AnnotationMetadata) -> (AopProxyWriter, ClassElement, BuildSession) {
    init_logging();
    let mut context = CollectingVisitorContext::new();
    let bean = ClassElement::of("app.Service")
        .with_method(greet("app.Service"))
        .with_annotation_metadata(meta);
    let mut parent = definition(&bean, &mut context);
    parent.visit_default_constructor().expect("parent constructor");
    let mut writer =
        AopProxyWriter::new(parent, settings, &[binding("app.Logged", "AROUND")], &mut context).expect("proxy writer");
    writer
        .visit_default_constructor(&AnnotationMetadata::empty())
        .expect("proxy constructor");
    writer.visit_around_method(&bean, &greet("app.Service")).expect("around method");
    (writer, bean, BuildSession::new(WriterOptions::default()))
}

// ===== Bean definitions =====

#[test]
fn test_plain_singleton_definition() {
    init_logging();
    let mut context = CollectingVisitorContext::new();
    let bean = ClassElement::of("app.Engine").with_annotation_metadata(singleton_meta());
    let mut def = definition(&bean, &mut context);
    let ctor = MethodElement::constructor(
        "app.Engine",
        vec![
            ParameterElement::new("a", ClassElement::of("app.Dep")),
            ParameterElement::new("b", ClassElement::of("app.Other")),
        ],
    );
    def.visit_bean_definition_constructor(&ctor, false).expect("constructor");

    assert!(def.to_byte_array().is_err());

    let mut session = BuildSession::new(WriterOptions::default());
    def.visit_bean_definition_end(&mut session).expect("end");
    let class = def.class_def().expect("class def");
    let instantiate = class.find_method("instantiate").expect("instantiate");
    assert!(instantiate
        .body
        .as_ref()
        .is_some_and(|b| b.invokes("getBeanForConstructorArgument")));
    assert!(class.find_method("inject").is_none());
    assert!(!class.implements(runtime::INITIALIZING_BEAN_DEFINITION));
    assert!(!class.implements(runtime::DISPOSABLE_BEAN_DEFINITION));

    let bytes = def.to_byte_array().expect("bytes");
    let decoded = ClassFile::decode(&bytes).expect("decode");
    assert_eq!(decoded.name, "app/$Engine$Definition");

    let mut output = InMemoryClassOutput::new();
    def.accept(&mut output, &mut session).expect("accept");
    session.finish(&mut output).expect("finish");
    output.finish().expect("flush");
    assert!(output.class_bytes("app.$Engine$Definition").is_some());
    assert_eq!(output.originating_elements("app.$Engine$Definition"), ["app.Engine".to_string()]);
    assert_eq!(
        output.service_implementations(runtime::BEAN_DEFINITION_REFERENCE),
        vec!["app.$Engine$Definition"]
    );
    assert!(output.is_finished());
}

#[test]
fn test_visits_after_end_are_rejected() {
    let mut context = CollectingVisitorContext::new();
    let bean = ClassElement::of("app.Engine").with_annotation_metadata(singleton_meta());
    let mut def = definition(&bean, &mut context);
    def.visit_default_constructor().expect("constructor");
    let mut session = BuildSession::new(WriterOptions::default());
    def.visit_bean_definition_end(&mut session).expect("end");
    let err = def
        .visit_executable_method(&greet("app.Engine"), None)
        .expect_err("finalized");
    assert!(matches!(err, WriterError::IllegalState { .. }));
}

#[test]
fn test_intercepted_post_construct() {
    let mut context = CollectingVisitorContext::new();
    let meta = bindings_meta(singleton_meta(), vec![binding("app.Audited", "POST_CONSTRUCT")]);
    let bean = ClassElement::of("app.Engine").with_annotation_metadata(meta);
    let mut def = definition(&bean, &mut context);
    def.visit_default_constructor().expect("constructor");
    let init = MethodElement::new("app.Engine", "init", ClassElement::of("void"));
    assert_eq!(def.visit_post_construct_method(&init, false).expect("post construct"), Some(0));

    let mut session = BuildSession::new(WriterOptions::default());
    def.visit_bean_definition_end(&mut session).expect("end");
    let class = def.class_def().expect("class def");
    assert!(class.implements(runtime::INITIALIZING_BEAN_DEFINITION));
    assert!(class.find_method("initialize$intercepted").is_some());
    let initialize = class.find_method("initialize").expect("initialize");
    assert!(initialize.body.as_ref().is_some_and(|b| b.invokes("initialize")));
    assert!(class
        .find_inner_type("app.$Engine$Definition$InitializeInterceptor")
        .is_some());
}

#[test]
fn test_proxy_target_constructor_is_intercepted_once() {
    let meta = bindings_meta(
        singleton_meta().declare(AnnotationEntry::new(runtime::AROUND).with("proxyTarget", AnnotationValue::Bool(true))),
        vec![binding("app.Logged", "AROUND"), binding("app.Created", "AROUND_CONSTRUCT")],
    );
    let (mut writer, _, mut session) = proxy(ProxySettings::from_metadata(&meta), meta);
    writer.visit_bean_definition_end(&mut session).expect("end");

    let parent = writer.parent().and_then(|p| p.class_def()).expect("parent definition");
    let proxy_definition = writer.definition().class_def().expect("proxy definition");
    assert!(parent
        .find_inner_type("app.$Service$Definition$ConstructorInterceptor")
        .is_some());
    assert!(proxy_definition.inner_types.is_empty());
}

#[test]
fn test_intercepted_factory_field() {
    init_logging();
    let mut context = CollectingVisitorContext::new();
    let meta = bindings_meta(
        singleton_meta().declare(AnnotationEntry::new(runtime::AROUND).with("proxyTarget", AnnotationValue::Bool(true))),
        vec![binding("app.Logged", "AROUND"), binding("app.Created", "AROUND_CONSTRUCT")],
    );
    let factory = ClassElement::of("app.Clients");
    let field = FieldElement::new("app.Clients", "client", ClassElement::of("app.Client")).with_annotation_metadata(meta);
    let mut def = BeanDefinitionWriter::new(
        BeanProducer::FactoryField {
            factory: factory.clone(),
            field: field.clone(),
        },
        vec![factory.name.clone()],
        Some("0"),
        &mut context,
    )
    .expect("factory field writer");
    def.visit_bean_factory_field(&factory, &field).expect("factory field");
    assert!(def.is_intercepted_lifecycle(InterceptorKind::AroundConstruct));

    let mut session = BuildSession::new(WriterOptions::default());
    def.visit_bean_definition_end(&mut session).expect("end");
    let class = def.class_def().expect("class def");
    let instantiate = class.find_method("instantiate").and_then(|m| m.body.as_ref()).expect("instantiate");
    assert!(instantiate.invokes("getBean"));
    assert!(instantiate.invokes("instantiate"));

    let interceptor = class
        .find_inner_type(&format!("{}$ConstructorInterceptor", def.class_name()))
        .expect("constructor interceptor");
    assert!(interceptor.find_field("$factory").is_some());
    let created = interceptor
        .find_method("instantiate")
        .and_then(|m| m.body.as_ref())
        .expect("interceptor instantiate");
    assert!(matches!(
        created,
        StatementDef::Return(Some(ExpressionDef::Field { field, .. })) if field.name == "client"
    ));
}

#[test]
fn test_executable_method_expression_class_is_written() {
    init_logging();
    let mut context = CollectingVisitorContext::new();
    let bean = ClassElement::of("app.Engine").with_annotation_metadata(singleton_meta());
    let mut def = definition(&bean, &mut context);
    def.visit_default_constructor().expect("constructor");
    let start = MethodElement::new("app.Engine", "start", ClassElement::of("void")).with_annotation_metadata(
        AnnotationMetadata::empty().declare(
            AnnotationEntry::new("app.Guarded").with("value", AnnotationValue::String("#{ env['x'] == 1 }".into())),
        ),
    );
    def.visit_executable_method(&start, None).expect("executable method");

    let mut session = BuildSession::new(WriterOptions::default());
    def.visit_bean_definition_end(&mut session).expect("end");
    assert_eq!(session.evaluated_expressions().len(), 1);

    let mut output = InMemoryClassOutput::new();
    def.accept(&mut output, &mut session).expect("accept");
    session.finish(&mut output).expect("finish");
    assert!(output.class_bytes("app.$Engine$Definition$Expr0").is_some());
}

// ===== Proxies =====

#[test]
fn test_self_target_proxy() {
    let (mut writer, bean, mut session) = proxy(ProxySettings::default(), around(&[]));
    assert_eq!(writer.strategy(), TargetStrategy::SelfTarget);

    // Structurally identical methods are proxied once
    writer.visit_around_method(&bean, &greet("app.Service")).expect("duplicate");
    writer.visit_bean_definition_end(&mut session).expect("end");

    let class = writer.class_def().expect("class def");
    assert_eq!(class.name, "app.$Service$Definition$Intercepted");
    assert_eq!(class.superclass.as_ref().map(|s| s.name.as_str()), Some("app.Service"));
    assert!(class.implements(runtime::INTERCEPTED));
    assert!(class.find_method("$$access$$greet").is_some());
    assert_eq!(class.methods_named("greet").len(), 1);
    assert!(class.find_field("$target").is_none());

    let ctor = class.find_method("<init>").expect("constructor");
    assert_eq!(ctor.parameters.len(), 5);
    let body = ctor.body.as_ref().expect("constructor body");
    assert!(body.invokes("getExecutableMethodByIndex"));
    assert!(body.invokes("resolveAroundInterceptors"));
    assert!(body.writes_field("$interceptors"));
    assert!(body.writes_field("$proxyMethods"));

    let proxy_definition = writer.definition().class_def().expect("proxy definition");
    assert!(proxy_definition.implements(runtime::PROXY_BEAN_DEFINITION));
    let instantiate = proxy_definition.find_method("instantiate").expect("instantiate");
    assert!(instantiate
        .body
        .as_ref()
        .is_some_and(|b| b.invokes("getBeanRegistrationsForConstructorArgument")));

    let mut output = InMemoryClassOutput::new();
    writer.accept(&mut output, &mut session).expect("accept");
    for name in [
        "app.$Service$Definition",
        "app.$Service$Definition$Exec",
        "app.$Service$Definition$Intercepted",
        "app.$Service$Definition$Intercepted$Definition",
    ] {
        assert!(output.class_bytes(name).is_some(), "missing {}", name);
    }
    let services = output.service_implementations(runtime::BEAN_DEFINITION_REFERENCE);
    assert!(services.contains(&"app.$Service$Definition"));
    assert!(services.contains(&"app.$Service$Definition$Intercepted$Definition"));
}

#[test]
fn test_eager_proxy_target() {
    let settings = ProxySettings {
        proxy_target: true,
        ..ProxySettings::default()
    };
    let (mut writer, _, mut session) = proxy(settings, around(&[("proxyTarget", true)]));
    writer.visit_bean_definition_end(&mut session).expect("end");

    let class = writer.class_def().expect("class def");
    assert!(class.implements(runtime::INTERCEPTED_PROXY));
    assert!(class.find_method("$$access$$greet").is_none());
    assert!(class.find_method("withQualifier").is_some());
    assert!(class.find_field("$proxyBeanDefinition").is_some());
    let target = class.find_field("$target").expect("target field");
    assert!(target.is_final());

    let body = class.find_method("<init>").and_then(|c| c.body.as_ref()).expect("constructor body");
    assert!(body.invokes("getProxyTargetBeanDefinition"));
    assert!(body.invokes("getProxyTargetBean"));
    assert!(body.invokes("getRequiredMethod"));
}

#[test]
fn test_hotswap_proxy() {
    let settings = ProxySettings::from_metadata(&around(&[("proxyTarget", true), ("hotswap", true)]));
    let (mut writer, _, mut session) = proxy(settings, around(&[("proxyTarget", true), ("hotswap", true)]));
    assert_eq!(writer.strategy(), TargetStrategy::Hotswap);
    writer.visit_bean_definition_end(&mut session).expect("end");

    let class = writer.class_def().expect("class def");
    assert!(class.implements(runtime::HOTSWAPPABLE_INTERCEPTED_PROXY));
    for field in ["$target_rwl", "$target_rl", "$target_wl"] {
        let lock = class.find_field(field).expect(field);
        assert!(lock.initializer.is_some());
    }
    assert!(!class.find_field("$target").expect("target").is_final());

    let swap = class.find_method("swap").and_then(|m| m.body.as_ref()).expect("swap");
    assert!(swap.invokes("lock"));
    assert!(swap.invokes("unlock"));
    assert!(swap.writes_field("$target"));
    let target = class
        .find_method("interceptedTarget")
        .and_then(|m| m.body.as_ref())
        .expect("interceptedTarget");
    assert!(target.invokes("unlock"));
}

#[test]
fn test_cached_lazy_proxy() {
    let meta = around(&[("proxyTarget", true), ("lazy", true), ("cacheableLazyTarget", true)]);
    let (mut writer, _, mut session) = proxy(ProxySettings::from_metadata(&meta), meta);
    assert_eq!(writer.strategy(), TargetStrategy::CachedLazy);
    writer.visit_bean_definition_end(&mut session).expect("end");

    let class = writer.class_def().expect("class def");
    assert!(class.find_field("$beanLocator").is_some());
    assert!(class.find_field("$beanResolutionContext").is_some());
    assert!(class.find_method("hasCachedInterceptedTarget").is_some());
    let target = class
        .find_method("interceptedTarget")
        .and_then(|m| m.body.as_ref())
        .expect("interceptedTarget");
    assert!(target.writes_field("$target"));
    assert!(target.writes_field("$beanResolutionContext"));
}

#[test]
fn test_plain_lazy_proxy_resolves_every_call() {
    let meta = around(&[("proxyTarget", true), ("lazy", true)]);
    let (mut writer, _, mut session) = proxy(ProxySettings::from_metadata(&meta), meta);
    writer.visit_bean_definition_end(&mut session).expect("end");
    let class = writer.class_def().expect("class def");
    assert!(class.find_field("$target").is_none());
    assert!(class.find_method("hasCachedInterceptedTarget").is_none());
}

#[test]
fn test_introduction_proxy() {
    init_logging();
    let mut context = CollectingVisitorContext::new();
    let client = ClassElement::of("app.Client").interface().with_annotation_metadata(singleton_meta());
    let mut fetch = MethodElement::new("app.Client", "fetch", ClassElement::of("java.lang.String"));
    fetch.is_abstract = true;

    let mut writer = AopProxyWriter::new_introduction(
        &client,
        true,
        Vec::new(),
        vec![client.name.clone()],
        &[binding("app.Remote", "INTRODUCTION")],
        &mut context,
    )
    .expect("introduction");
    writer
        .visit_default_constructor(&AnnotationMetadata::empty())
        .expect("constructor");
    writer.visit_introduction_method(&client, &fetch).expect("method");
    let mut session = BuildSession::new(WriterOptions::default());
    writer.visit_bean_definition_end(&mut session).expect("end");

    let class = writer.class_def().expect("class def");
    assert!(class.superclass.as_ref().map_or(true, |s| s.name == runtime::OBJECT));
    assert!(class.implements("app.Client"));
    assert!(class.implements(runtime::INTRODUCED));
    assert!(class.find_method("$$access$$fetch").is_none());
    let ctor = class.find_method("<init>").and_then(|c| c.body.as_ref()).expect("constructor body");
    assert!(ctor.invokes("resolveIntroductionInterceptors"));
}

#[test]
fn test_proxy_directory_output() {
    let (mut writer, _, mut session) = proxy(ProxySettings::default(), around(&[]));
    writer.visit_bean_definition_end(&mut session).expect("end");

    let dir = tempfile::tempdir().expect("temp dir");
    let mut output = DirectoryClassOutput::new(dir.path());
    writer.accept(&mut output, &mut session).expect("accept");
    output.finish().expect("finish");

    let proxy_file = output.class_path("app.$Service$Definition$Intercepted");
    assert!(proxy_file.exists());
    let bytes = std::fs::read(&proxy_file).expect("read class");
    assert_eq!(ClassFile::decode(&bytes).expect("decode").name, "app/$Service$Definition$Intercepted");

    let services = std::fs::read_to_string(
        dir.path()
            .join("META-INF")
            .join("services")
            .join(runtime::BEAN_DEFINITION_REFERENCE),
    )
    .expect("service file");
    assert!(services.lines().any(|l| l == "app.$Service$Definition$Intercepted$Definition"));
}
