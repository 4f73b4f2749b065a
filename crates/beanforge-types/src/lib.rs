//! Beanforge Element Model
//!
//! Classes, methods, fields, parameters and annotation metadata as supplied
//! by a front end, plus the diagnostic channel used to report user errors.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod annotation;
pub mod element;
pub mod context;
pub mod error;

pub use annotation::{AnnotationEntry, AnnotationMetadata, AnnotationValue, InterceptorKind};
pub use element::{ClassElement, FieldElement, MethodElement, ParameterElement};
pub use context::{CollectingVisitorContext, Diagnostic, Severity, VisitorContext};
pub use error::ElementError;
