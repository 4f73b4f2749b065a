//! Beanforge Class Model
//!
//! This crate provides the class, method, statement and expression model
//! that bean-definition writers build, plus the binary class file format
//! those classes are serialized to.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod types;
pub mod expr;
pub mod stmt;
pub mod class;
pub mod encoder;
pub mod class_file;
pub mod pretty;

pub use types::{method_descriptor, ClassTypeDef, PrimitiveType, TypeDef};
pub use expr::{Constant, ExpressionDef, FieldRef, InvokeKind, MethodRef};
pub use stmt::{CatchDef, StatementDef, SwitchKey};
pub use class::{modifiers, AnnotationDef, ClassDef, ClassDefBuilder, FieldDef, MethodDef, MethodDefBuilder, ParameterDef};
pub use encoder::{ClassCursor, ClassBuffer, DecodeError};
pub use class_file::{ClassFile, ClassFileError, ClassFileWriter, FieldInfo, MethodInfo};
pub use pretty::PrettyPrint;
