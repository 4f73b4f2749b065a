//! Beanforge Writers
//!
//! Turns visited bean candidates into class files: a bean definition per
//! bean, an executable methods companion for its runtime-invocable methods,
//! and an `$Intercepted` proxy for beans advised by interceptors.
//!
//! Writers follow a visitor protocol. The front end creates a writer, feeds it
//! the constructor, injection points, lifecycle and executable methods, calls
//! `visit_bean_definition_end` and finally `accept` with a
//! [`ClassOutputVisitor`]. State shared by every writer of one compilation
//! round lives in [`BuildSession`].

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod options;
pub mod runtime;
pub mod gen_utils;
pub mod output;
pub mod metadata;
pub mod session;
pub mod argument;
pub mod method_gen;
pub mod dispatch;
pub mod executable_methods;
pub mod bean_definition;
pub mod aop_proxy;

pub use aop_proxy::{AopProxyWriter, ProxySettings, TargetStrategy, PROXY_SUFFIX};
pub use bean_definition::{BeanDefinitionWriter, BeanProducer};
pub use error::{WriterError, WriterResult};
pub use executable_methods::ExecutableMethodsDefinitionWriter;
pub use options::WriterOptions;
pub use output::{ClassOutputVisitor, DirectoryClassOutput, InMemoryClassOutput};
pub use session::BuildSession;
