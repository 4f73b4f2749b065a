//! Names of runtime types referenced by generated classes

#![allow(missing_docs)]

// ===== Core =====

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";
pub const CLASS: &str = "java.lang.Class";
pub const THROWABLE: &str = "java.lang.Throwable";
pub const ILLEGAL_STATE_EXCEPTION: &str = "java.lang.IllegalStateException";
pub const OBJECTS: &str = "java.util.Objects";
pub const MAP: &str = "java.util.Map";
pub const MAP_ENTRY: &str = "java.util.Map$Entry";
pub const LIST: &str = "java.util.List";
pub const SET: &str = "java.util.Set";
pub const OPTIONAL: &str = "java.util.Optional";
pub const COLLECTION: &str = "java.util.Collection";
pub const STREAM: &str = "java.util.stream.Stream";
pub const DURATION: &str = "java.time.Duration";
pub const METHOD: &str = "java.lang.reflect.Method";
pub const READ_WRITE_LOCK: &str = "java.util.concurrent.locks.ReentrantReadWriteLock";
pub const LOCK: &str = "java.util.concurrent.locks.Lock";
pub const TIME_UNIT: &str = "java.util.concurrent.TimeUnit";
pub const NO_SUCH_METHOD_ERROR: &str = "java.lang.NoSuchMethodError";
pub const CHAR_SEQUENCE: &str = "java.lang.CharSequence";
pub const COLLECTIONS: &str = "java.util.Collections";
pub const ARRAYS: &str = "java.util.Arrays";
pub const HASH_SET: &str = "java.util.HashSet";
pub const MAP_TYPES: [&str; 4] = ["java.util.Map", "java.util.HashMap", "java.util.LinkedHashMap", "java.util.TreeMap"];
pub const KOTLIN_DEFAULT_CONSTRUCTOR_MARKER: &str = "kotlin.jvm.internal.DefaultConstructorMarker";

// ===== Annotations =====

pub const GENERATED: &str = "io.beanforge.core.annotation.Generated";
pub const REQUIRES: &str = "io.beanforge.context.annotation.Requires";
pub const BEAN: &str = "io.beanforge.context.annotation.Bean";
pub const CONTEXT: &str = "io.beanforge.context.annotation.Context";
pub const PRIMARY: &str = "io.beanforge.context.annotation.Primary";
pub const ANY: &str = "io.beanforge.context.annotation.Any";
pub const PARAMETER: &str = "io.beanforge.context.annotation.Parameter";
pub const PROPERTY: &str = "io.beanforge.context.annotation.Property";
pub const VALUE: &str = "io.beanforge.context.annotation.Value";
pub const EACH_PROPERTY: &str = "io.beanforge.context.annotation.EachProperty";
pub const EACH_BEAN: &str = "io.beanforge.context.annotation.EachBean";
pub const CONFIGURATION_READER: &str = "io.beanforge.context.annotation.ConfigurationReader";
pub const CONFIGURATION_PROPERTIES: &str = "io.beanforge.context.annotation.ConfigurationProperties";
pub const NULLABLE: &str = "io.beanforge.core.annotation.Nullable";
pub const NON_NULL: &str = "io.beanforge.core.annotation.NonNull";
pub const AROUND: &str = "io.beanforge.aop.Around";
pub const INTERCEPTOR_BEAN: &str = "io.beanforge.aop.InterceptorBean";
pub const ORDER: &str = "io.beanforge.core.order.Order";
pub const NAMED: &str = "jakarta.inject.Named";
pub const QUALIFIER: &str = "jakarta.inject.Qualifier";
pub const SCOPE: &str = "jakarta.inject.Scope";
pub const SINGLETON: &str = "jakarta.inject.Singleton";
pub const PROVIDER: &str = "jakarta.inject.Provider";
pub const INJECT_SCOPE: &str = "io.beanforge.context.annotation.InjectScope";
pub const INJECT: &str = "jakarta.inject.Inject";
pub const TYPE: &str = "io.beanforge.context.annotation.Type";
pub const FACTORY: &str = "io.beanforge.context.annotation.Factory";
pub const INTERCEPTOR_BINDING_QUALIFIER: &str = "io.beanforge.inject.qualifiers.InterceptorBindingQualifier";

// ===== Runtime types =====

pub const ARGUMENT: &str = "io.beanforge.core.type.Argument";
pub const ANNOTATION_METADATA: &str = "io.beanforge.core.annotation.AnnotationMetadata";
pub const DEFAULT_ANNOTATION_METADATA: &str = "io.beanforge.inject.annotation.DefaultAnnotationMetadata";
pub const ANNOTATION_METADATA_SUPPORT: &str = "io.beanforge.inject.annotation.AnnotationMetadataSupport";
pub const ANNOTATION_CLASS_VALUE: &str = "io.beanforge.core.annotation.AnnotationClassValue";
pub const ANNOTATION_VALUE: &str = "io.beanforge.core.annotation.AnnotationValue";
pub const ANNOTATION_DEFAULT_VALUES_PROVIDER: &str = "io.beanforge.core.annotation.AnnotationDefaultValuesProvider";
pub const REFLECTION_UTILS: &str = "io.beanforge.core.reflect.ReflectionUtils";
pub const INSTANTIATION_UTILS: &str = "io.beanforge.core.reflect.InstantiationUtils";
pub const COLLECTION_UTILS: &str = "io.beanforge.core.util.CollectionUtils";

pub const BEAN_DEFINITION: &str = "io.beanforge.inject.BeanDefinition";
pub const BEAN_DEFINITION_REFERENCE: &str = "io.beanforge.inject.BeanDefinitionReference";
pub const BEAN_RESOLUTION_CONTEXT: &str = "io.beanforge.context.BeanResolutionContext";
pub const BEAN_CONTEXT: &str = "io.beanforge.context.BeanContext";
pub const DEFAULT_BEAN_CONTEXT: &str = "io.beanforge.context.DefaultBeanContext";
pub const BEAN_REGISTRATION: &str = "io.beanforge.context.BeanRegistration";
pub const CONVERSION_SERVICE: &str = "io.beanforge.core.convert.ConversionService";
pub const CONFIGURATION_PATH: &str = "io.beanforge.context.ConfigurationPath";
pub const QUALIFIER_TYPE: &str = "io.beanforge.context.Qualifier";
pub const QUALIFIERS: &str = "io.beanforge.inject.qualifiers.Qualifiers";
pub const ANY_QUALIFIER: &str = "io.beanforge.inject.qualifiers.AnyQualifier";
pub const INITIALIZING_BEAN_DEFINITION: &str = "io.beanforge.inject.InitializingBeanDefinition";
pub const DISPOSABLE_BEAN_DEFINITION: &str = "io.beanforge.inject.DisposableBeanDefinition";
pub const PARAMETRIZED_INSTANTIATABLE_BEAN_DEFINITION: &str =
    "io.beanforge.inject.ParametrizedInstantiatableBeanDefinition";
pub const PROXY_BEAN_DEFINITION: &str = "io.beanforge.inject.ProxyBeanDefinition";
pub const EXECUTABLE_METHOD: &str = "io.beanforge.inject.ExecutableMethod";
pub const EXECUTABLE_METHODS_DEFINITION: &str = "io.beanforge.inject.ExecutableMethodsDefinition";
pub const ABSTRACT_INITIALIZABLE_BEAN_DEFINITION: &str =
    "io.beanforge.context.AbstractInitializableBeanDefinitionAndReference";
pub const METHOD_REFERENCE: &str = "io.beanforge.context.AbstractInitializableBeanDefinition$MethodReference";
pub const FIELD_REFERENCE: &str = "io.beanforge.context.AbstractInitializableBeanDefinition$FieldReference";
pub const ANNOTATION_REFERENCE: &str =
    "io.beanforge.context.AbstractInitializableBeanDefinition$AnnotationReference";
pub const METHOD_OR_FIELD_REFERENCE: &str =
    "io.beanforge.context.AbstractInitializableBeanDefinition$MethodOrFieldReference";
pub const PRECALCULATED_INFO: &str =
    "io.beanforge.context.AbstractInitializableBeanDefinition$PrecalculatedInfo";
pub const ABSTRACT_EXECUTABLE_METHODS_DEFINITION: &str =
    "io.beanforge.context.AbstractExecutableMethodsDefinition";
pub const EXECUTABLE_METHOD_REFERENCE: &str =
    "io.beanforge.context.AbstractExecutableMethodsDefinition$MethodReference";
pub const ABSTRACT_EXECUTABLE_METHOD: &str = "io.beanforge.context.AbstractExecutableMethod";
pub const ABSTRACT_BEAN_DEFINITION_BEAN_CONSTRUCTOR: &str =
    "io.beanforge.context.AbstractBeanDefinitionBeanConstructor";
pub const CONDITION: &str = "io.beanforge.context.condition.Condition";
pub const CONDITIONS_PACKAGE: &str = "io.beanforge.context.condition";
pub const OS_FAMILY: &str = "io.beanforge.context.condition.OperatingSystem$Family";
pub const EVALUATED_EXPRESSION: &str = "io.beanforge.context.expressions.AbstractEvaluatedExpression";
pub const EVALUATED_EXPRESSION_REFERENCE: &str = "io.beanforge.context.expressions.EvaluatedExpressionReference";
pub const ANNOTATION_DEFAULT_VALUES: &str = "io.beanforge.inject.annotation.AnnotationDefaultValues";
pub const EXPRESSION_EVALUATION_CONTEXT: &str = "io.beanforge.context.expressions.ExpressionEvaluationContext";

// ===== AOP =====

pub const INTERCEPTOR: &str = "io.beanforge.aop.Interceptor";
pub const INTERCEPTED: &str = "io.beanforge.aop.Intercepted";
pub const INTERCEPTED_PROXY: &str = "io.beanforge.aop.InterceptedProxy";
pub const HOTSWAPPABLE_INTERCEPTED_PROXY: &str = "io.beanforge.aop.HotSwappableInterceptedProxy";
pub const INTRODUCTION: &str = "io.beanforge.aop.Introduction";
pub const INTERCEPTOR_CHAIN: &str = "io.beanforge.aop.chain.InterceptorChain";
pub const METHOD_INTERCEPTOR_CHAIN: &str = "io.beanforge.aop.chain.MethodInterceptorChain";
pub const CONSTRUCTOR_INTERCEPTOR_CHAIN: &str = "io.beanforge.aop.chain.ConstructorInterceptorChain";
pub const INTERCEPTOR_REGISTRY: &str = "io.beanforge.aop.InterceptorRegistry";
pub const INTERCEPTOR_KIND: &str = "io.beanforge.aop.InterceptorKind";
pub const INTERCEPTOR_BINDING: &str = "io.beanforge.aop.InterceptorBinding";
pub const INTRODUCED: &str = "io.beanforge.aop.Introduced";
pub const BEAN_LOCATOR: &str = "io.beanforge.context.BeanLocator";
