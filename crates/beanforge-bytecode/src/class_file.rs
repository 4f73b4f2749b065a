//! Binary class file format
//!
//! Layout:
//! - Header: magic `BFCL` (4 bytes) + version (u32) + flags (u32) + checksum (u32)
//! - String pool: count (u32) + length-prefixed UTF-8 entries
//! - Class skeleton: names, fields and methods referencing the pool by u16 index
//! - Method bodies: tag-encoded statement trees, length-prefixed so readers can skip them
//!
//! The checksum is the CRC32 of everything after the 16 byte header.

use crate::class::{AnnotationDef, ClassDef, FieldDef, MethodDef};
use crate::encoder::{ClassCursor, ClassBuffer, DecodeError};
use crate::expr::{Constant, ExpressionDef, FieldRef, InvokeKind, MethodRef};
use crate::stmt::{StatementDef, SwitchKey};
use crate::types::{ClassTypeDef, PrimitiveType, TypeDef};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Magic number of class files: "BFCL"
pub const MAGIC: [u8; 4] = *b"BFCL";

/// Current format version
pub const VERSION: u32 = 1;

/// Size of the fixed header
pub const HEADER_SIZE: usize = 16;

/// Maximum number of pooled strings
pub const MAX_CONSTANTS: usize = 65535;

/// Class file flags
pub mod flags {
    /// Class has a static initializer
    pub const HAS_STATIC_INITIALIZER: u32 = 1 << 0;
    /// Class declares nested types
    pub const HAS_INNER_TYPES: u32 = 1 << 1;
}

/// Node tags of encoded bodies
mod tag {
    pub const NULL: u8 = 0x01;
    pub const BOOL: u8 = 0x02;
    pub const INT: u8 = 0x03;
    pub const LONG: u8 = 0x04;
    pub const DOUBLE: u8 = 0x05;
    pub const STRING: u8 = 0x06;
    pub const TYPE: u8 = 0x07;
    pub const THIS: u8 = 0x10;
    pub const PARAM: u8 = 0x11;
    pub const LOCAL: u8 = 0x12;
    pub const STATIC_FIELD: u8 = 0x13;
    pub const FIELD: u8 = 0x14;
    pub const INVOKE_STATIC: u8 = 0x15;
    pub const INVOKE: u8 = 0x16;
    pub const NEW: u8 = 0x17;
    pub const NEW_ARRAY: u8 = 0x18;
    pub const ARRAY_ELEMENT: u8 = 0x19;
    pub const CAST: u8 = 0x1a;
    pub const INSTANCE_OF: u8 = 0x1b;
    pub const IS_NULL: u8 = 0x1c;
    pub const IS_NON_NULL: u8 = 0x1d;
    pub const EQUALS: u8 = 0x1e;
    pub const AND: u8 = 0x1f;
    pub const OR: u8 = 0x20;
    pub const NOT: u8 = 0x21;
    pub const CONDITIONAL: u8 = 0x22;
    pub const BIT_OR: u8 = 0x23;
    pub const MULTI: u8 = 0x40;
    pub const EXPRESSION: u8 = 0x41;
    pub const RETURN: u8 = 0x42;
    pub const THROW: u8 = 0x43;
    pub const DEFINE_LOCAL: u8 = 0x44;
    pub const ASSIGN: u8 = 0x45;
    pub const PUT_FIELD: u8 = 0x46;
    pub const PUT_STATIC: u8 = 0x47;
    pub const IF: u8 = 0x48;
    pub const SWITCH: u8 = 0x49;
    pub const TRY: u8 = 0x4a;
    pub const SYNCHRONIZED: u8 = 0x4b;
}

/// Class file encoding/decoding errors
#[derive(Debug, Error, PartialEq)]
pub enum ClassFileError {
    /// Decode error
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Invalid magic number
    #[error("Invalid magic number: expected BFCL, got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported version
    #[error("Unsupported version: {0} (current: {VERSION})")]
    UnsupportedVersion(u32),

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// Stored checksum
        expected: u32,
        /// Checksum of the payload
        actual: u32,
    },

    /// String pool overflow
    #[error("Too many constants (max 65535)")]
    TooManyConstants,

    /// Pool index out of range
    #[error("Invalid string pool index {0}")]
    InvalidStringIndex(u16),

    /// Malformed type descriptor
    #[error("Invalid type descriptor '{0}'")]
    InvalidDescriptor(String),
}

/// Deduplicating string pool
#[derive(Debug, Default)]
struct StringPool {
    strings: Vec<String>,
    index: FxHashMap<String, u16>,
}

impl StringPool {
    fn intern(&mut self, s: &str) -> Result<u16, ClassFileError> {
        if let Some(&index) = self.index.get(s) {
            return Ok(index);
        }
        if self.strings.len() >= MAX_CONSTANTS {
            return Err(ClassFileError::TooManyConstants);
        }
        let index = self.strings.len() as u16;
        self.index.insert(s.to_string(), index);
        self.strings.push(s.to_string());
        Ok(index)
    }
}

/// Serializes [`ClassDef`]s into class files
#[derive(Debug, Default)]
pub struct ClassFileWriter {
    pool: StringPool,
    body: ClassBuffer,
}

impl ClassFileWriter {
    /// Encode a single class. Nested types are listed by name only.
    pub fn write(class: &ClassDef) -> Result<Vec<u8>, ClassFileError> {
        let mut writer = ClassFileWriter::default();
        writer.write_class(class)?;
        Ok(writer.finish(class))
    }

    /// Encode a class and, recursively, all of its nested types
    pub fn write_all(class: &ClassDef) -> Result<Vec<(String, Vec<u8>)>, ClassFileError> {
        let mut out = vec![(class.name.clone(), ClassFileWriter::write(class)?)];
        for inner in &class.inner_types {
            out.extend(ClassFileWriter::write_all(inner)?);
        }
        Ok(out)
    }

    fn finish(self, class: &ClassDef) -> Vec<u8> {
        let mut class_flags = 0;
        if class.static_initializer.is_some() {
            class_flags |= flags::HAS_STATIC_INITIALIZER;
        }
        if !class.inner_types.is_empty() {
            class_flags |= flags::HAS_INNER_TYPES;
        }

        let mut out = ClassBuffer::with_capacity(HEADER_SIZE + self.body.len() * 2);
        out.put_bytes(&MAGIC);
        out.put_u32(VERSION);
        out.put_u32(class_flags);
        let checksum_offset = out.reserve_slot();

        out.put_u32(self.pool.strings.len() as u32);
        for s in &self.pool.strings {
            out.put_str(s);
        }
        out.put_bytes(self.body.as_bytes());

        let checksum = crc32fast::hash(&out.as_bytes()[HEADER_SIZE..]);
        out.fill_slot(checksum_offset, checksum);
        out.into_bytes()
    }

    fn string(&mut self, s: &str) -> Result<(), ClassFileError> {
        let index = self.pool.intern(s)?;
        self.body.put_u16(index);
        Ok(())
    }

    fn ty(&mut self, ty: &TypeDef) -> Result<(), ClassFileError> {
        self.string(&ty.descriptor())
    }

    fn write_class(&mut self, class: &ClassDef) -> Result<(), ClassFileError> {
        self.string(&class.this_type().internal_name())?;
        self.body.put_u16(class.modifiers);
        match &class.superclass {
            Some(s) => {
                self.body.put_u8(1);
                self.string(&s.internal_name())?;
            }
            None => self.body.put_u8(0),
        }

        self.body.put_u16(class.interfaces.len() as u16);
        for i in &class.interfaces {
            self.string(&i.internal_name())?;
        }
        self.write_annotations(&class.annotations)?;

        self.body.put_u16(class.fields.len() as u16);
        for f in &class.fields {
            self.write_field(f)?;
        }

        self.body.put_u16(class.methods.len() as u16);
        for m in &class.methods {
            self.write_method(m)?;
        }

        match &class.static_initializer {
            Some(s) => self.write_code(s)?,
            None => self.body.put_u32(0),
        }

        self.body.put_u16(class.inner_types.len() as u16);
        for inner in &class.inner_types {
            self.string(&inner.this_type().internal_name())?;
        }
        Ok(())
    }

    fn write_annotations(&mut self, annotations: &[AnnotationDef]) -> Result<(), ClassFileError> {
        self.body.put_u16(annotations.len() as u16);
        for a in annotations {
            self.string(&a.ty.internal_name())?;
            self.body.put_u16(a.values.len() as u16);
            for (name, value) in &a.values {
                self.string(name)?;
                self.write_constant(value)?;
            }
        }
        Ok(())
    }

    fn write_field(&mut self, field: &FieldDef) -> Result<(), ClassFileError> {
        self.string(&field.name)?;
        self.ty(&field.ty)?;
        self.body.put_u16(field.modifiers);
        match &field.initializer {
            Some(init) => {
                let slot = self.body.reserve_slot();
                let start = self.body.len();
                self.write_expression(init)?;
                let len = self.body.len() - start;
                self.body.fill_slot(slot, len as u32);
            }
            None => self.body.put_u32(0),
        }
        Ok(())
    }

    fn write_method(&mut self, method: &MethodDef) -> Result<(), ClassFileError> {
        self.string(&method.name)?;
        self.string(&method.descriptor())?;
        self.body.put_u16(method.modifiers);
        self.body.put_u8(method.parameters.len() as u8);
        for p in &method.parameters {
            self.string(&p.name)?;
            self.write_annotations(&p.annotations)?;
        }
        self.write_annotations(&method.annotations)?;
        match &method.body {
            Some(body) => self.write_code(body),
            None => {
                self.body.put_u32(0);
                Ok(())
            }
        }
    }

    fn write_code(&mut self, statement: &StatementDef) -> Result<(), ClassFileError> {
        let slot = self.body.reserve_slot();
        let start = self.body.len();
        self.write_statement(statement)?;
        let len = self.body.len() - start;
        self.body.fill_slot(slot, len as u32);
        Ok(())
    }

    // ===== Expressions =====

    fn write_constant(&mut self, constant: &Constant) -> Result<(), ClassFileError> {
        match constant {
            Constant::Null => self.body.put_u8(tag::NULL),
            Constant::Bool(b) => {
                self.body.put_u8(tag::BOOL);
                self.body.put_u8(*b as u8);
            }
            Constant::Int(v) => {
                self.body.put_u8(tag::INT);
                self.body.put_i32(*v);
            }
            Constant::Long(v) => {
                self.body.put_u8(tag::LONG);
                self.body.put_i64(*v);
            }
            Constant::Double(v) => {
                self.body.put_u8(tag::DOUBLE);
                self.body.put_f64(*v);
            }
            Constant::String(s) => {
                self.body.put_u8(tag::STRING);
                self.string(s)?;
            }
            Constant::Type(t) => {
                self.body.put_u8(tag::TYPE);
                self.ty(t)?;
            }
        }
        Ok(())
    }

    fn write_method_ref(&mut self, method: &MethodRef) -> Result<(), ClassFileError> {
        self.string(&method.owner.internal_name())?;
        self.string(&method.name)?;
        self.string(&method.descriptor())?;
        self.body.put_u8(method.interface as u8);
        Ok(())
    }

    fn write_field_ref(&mut self, field: &FieldRef) -> Result<(), ClassFileError> {
        self.string(&field.owner.internal_name())?;
        self.string(&field.name)?;
        self.ty(&field.ty)
    }

    fn write_expressions(&mut self, items: &[ExpressionDef]) -> Result<(), ClassFileError> {
        self.body.put_u16(items.len() as u16);
        for item in items {
            self.write_expression(item)?;
        }
        Ok(())
    }

    fn write_expression(&mut self, expr: &ExpressionDef) -> Result<(), ClassFileError> {
        match expr {
            ExpressionDef::Constant(c) => self.write_constant(c)?,
            ExpressionDef::This => self.body.put_u8(tag::THIS),
            ExpressionDef::Param { index, ty } => {
                self.body.put_u8(tag::PARAM);
                self.body.put_u16(*index as u16);
                self.ty(ty)?;
            }
            ExpressionDef::Local { name, ty } => {
                self.body.put_u8(tag::LOCAL);
                self.string(name)?;
                self.ty(ty)?;
            }
            ExpressionDef::StaticField(field) => {
                self.body.put_u8(tag::STATIC_FIELD);
                self.write_field_ref(field)?;
            }
            ExpressionDef::Field { instance, field } => {
                self.body.put_u8(tag::FIELD);
                self.write_expression(instance)?;
                self.write_field_ref(field)?;
            }
            ExpressionDef::InvokeStatic { method, args } => {
                self.body.put_u8(tag::INVOKE_STATIC);
                self.write_method_ref(method)?;
                self.write_expressions(args)?;
            }
            ExpressionDef::Invoke {
                kind,
                instance,
                method,
                args,
            } => {
                self.body.put_u8(tag::INVOKE);
                self.body.put_u8(match kind {
                    InvokeKind::Virtual => 0,
                    InvokeKind::Interface => 1,
                    InvokeKind::Special => 2,
                });
                self.write_expression(instance)?;
                self.write_method_ref(method)?;
                self.write_expressions(args)?;
            }
            ExpressionDef::New { constructor, args } => {
                self.body.put_u8(tag::NEW);
                self.write_method_ref(constructor)?;
                self.write_expressions(args)?;
            }
            ExpressionDef::NewArray { component, items } => {
                self.body.put_u8(tag::NEW_ARRAY);
                self.ty(component)?;
                self.write_expressions(items)?;
            }
            ExpressionDef::ArrayElement { array, index } => {
                self.body.put_u8(tag::ARRAY_ELEMENT);
                self.write_expression(array)?;
                self.body.put_u32(*index as u32);
            }
            ExpressionDef::Cast { value, ty } => {
                self.body.put_u8(tag::CAST);
                self.write_expression(value)?;
                self.ty(ty)?;
            }
            ExpressionDef::InstanceOf { value, ty } => {
                self.body.put_u8(tag::INSTANCE_OF);
                self.write_expression(value)?;
                self.string(&ty.internal_name())?;
            }
            ExpressionDef::IsNull(v) => {
                self.body.put_u8(tag::IS_NULL);
                self.write_expression(v)?;
            }
            ExpressionDef::IsNonNull(v) => {
                self.body.put_u8(tag::IS_NON_NULL);
                self.write_expression(v)?;
            }
            ExpressionDef::Not(v) => {
                self.body.put_u8(tag::NOT);
                self.write_expression(v)?;
            }
            ExpressionDef::Equals(l, r)
            | ExpressionDef::And(l, r)
            | ExpressionDef::Or(l, r)
            | ExpressionDef::BitOr(l, r) => {
                self.body.put_u8(match expr {
                    ExpressionDef::Equals(..) => tag::EQUALS,
                    ExpressionDef::And(..) => tag::AND,
                    ExpressionDef::Or(..) => tag::OR,
                    _ => tag::BIT_OR,
                });
                self.write_expression(l)?;
                self.write_expression(r)?;
            }
            ExpressionDef::Conditional {
                condition,
                if_true,
                if_false,
            } => {
                self.body.put_u8(tag::CONDITIONAL);
                self.write_expression(condition)?;
                self.write_expression(if_true)?;
                self.write_expression(if_false)?;
            }
        }
        Ok(())
    }

    // ===== Statements =====

    fn write_optional(&mut self, statement: Option<&StatementDef>) -> Result<(), ClassFileError> {
        match statement {
            Some(s) => {
                self.body.put_u8(1);
                self.write_statement(s)
            }
            None => {
                self.body.put_u8(0);
                Ok(())
            }
        }
    }

    fn write_statement(&mut self, statement: &StatementDef) -> Result<(), ClassFileError> {
        match statement {
            StatementDef::Multi(items) => {
                self.body.put_u8(tag::MULTI);
                self.body.put_u32(items.len() as u32);
                for s in items {
                    self.write_statement(s)?;
                }
            }
            StatementDef::Expression(e) => {
                self.body.put_u8(tag::EXPRESSION);
                self.write_expression(e)?;
            }
            StatementDef::Return(value) => {
                self.body.put_u8(tag::RETURN);
                match value {
                    Some(v) => {
                        self.body.put_u8(1);
                        self.write_expression(v)?;
                    }
                    None => self.body.put_u8(0),
                }
            }
            StatementDef::Throw(e) => {
                self.body.put_u8(tag::THROW);
                self.write_expression(e)?;
            }
            StatementDef::DefineLocal { name, ty, value } => {
                self.body.put_u8(tag::DEFINE_LOCAL);
                self.string(name)?;
                self.ty(ty)?;
                self.write_expression(value)?;
            }
            StatementDef::Assign { name, value } => {
                self.body.put_u8(tag::ASSIGN);
                self.string(name)?;
                self.write_expression(value)?;
            }
            StatementDef::PutField {
                instance,
                field,
                value,
            } => {
                self.body.put_u8(tag::PUT_FIELD);
                self.write_expression(instance)?;
                self.write_field_ref(field)?;
                self.write_expression(value)?;
            }
            StatementDef::PutStatic { field, value } => {
                self.body.put_u8(tag::PUT_STATIC);
                self.write_field_ref(field)?;
                self.write_expression(value)?;
            }
            StatementDef::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.body.put_u8(tag::IF);
                self.write_expression(condition)?;
                self.write_statement(then_branch)?;
                self.write_optional(else_branch.as_deref())?;
            }
            StatementDef::Switch { value, cases, default } => {
                self.body.put_u8(tag::SWITCH);
                self.write_expression(value)?;
                self.body.put_u32(cases.len() as u32);
                for (key, body) in cases {
                    match key {
                        SwitchKey::Int(i) => {
                            self.body.put_u8(0);
                            self.body.put_i32(*i);
                        }
                        SwitchKey::String(s) => {
                            self.body.put_u8(1);
                            self.string(s)?;
                        }
                    }
                    self.write_statement(body)?;
                }
                self.write_optional(default.as_deref())?;
            }
            StatementDef::Try {
                body,
                catches,
                finally,
            } => {
                self.body.put_u8(tag::TRY);
                self.write_statement(body)?;
                self.body.put_u16(catches.len() as u16);
                for c in catches {
                    self.string(&c.exception.internal_name())?;
                    self.string(&c.local)?;
                    self.write_statement(&c.body)?;
                }
                self.write_optional(finally.as_deref())?;
            }
            StatementDef::Synchronized { monitor, body } => {
                self.body.put_u8(tag::SYNCHRONIZED);
                self.write_expression(monitor)?;
                self.write_statement(body)?;
            }
        }
        Ok(())
    }
}

/// Decoded annotation
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationInfo {
    /// Internal name of the annotation type
    pub ty: String,
    /// Member values
    pub values: Vec<(String, Constant)>,
}

/// Decoded field entry
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// JVM descriptor
    pub descriptor: String,
    /// Modifier bits
    pub modifiers: u16,
    /// Whether the field carries an initializer
    pub has_initializer: bool,
}

/// Decoded method entry. The body stays encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    /// Method name
    pub name: String,
    /// JVM descriptor
    pub descriptor: String,
    /// Modifier bits
    pub modifiers: u16,
    /// Parameter names
    pub parameter_names: Vec<String>,
    /// Method annotations
    pub annotations: Vec<AnnotationInfo>,
    /// Encoded body, empty for abstract methods
    pub code: Vec<u8>,
}

/// Class skeleton read back from a class file
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    /// Header flags
    pub flags: u32,
    /// Internal name
    pub name: String,
    /// Modifier bits
    pub modifiers: u16,
    /// Internal name of the superclass
    pub superclass: Option<String>,
    /// Internal names of implemented interfaces
    pub interfaces: Vec<String>,
    /// Class annotations
    pub annotations: Vec<AnnotationInfo>,
    /// Fields
    pub fields: Vec<FieldInfo>,
    /// Methods
    pub methods: Vec<MethodInfo>,
    /// Encoded static initializer, empty when absent
    pub static_initializer: Vec<u8>,
    /// Internal names of nested types
    pub inner_types: Vec<String>,
}

impl ClassFile {
    /// Decode and validate a class file
    pub fn decode(data: &[u8]) -> Result<Self, ClassFileError> {
        let mut reader = ClassCursor::new(data);

        let magic = reader.next_bytes(4)?;
        let magic = [magic[0], magic[1], magic[2], magic[3]];
        if magic != MAGIC {
            return Err(ClassFileError::InvalidMagic(magic));
        }

        let version = reader.next_u32()?;
        if version != VERSION {
            return Err(ClassFileError::UnsupportedVersion(version));
        }

        let flags = reader.next_u32()?;
        let stored_checksum = reader.next_u32()?;

        let calculated_checksum = crc32fast::hash(&data[HEADER_SIZE..]);
        if stored_checksum != calculated_checksum {
            return Err(ClassFileError::ChecksumMismatch {
                expected: stored_checksum,
                actual: calculated_checksum,
            });
        }

        let count = reader.next_u32()? as usize;
        let mut pool = Vec::with_capacity(count.min(MAX_CONSTANTS));
        for _ in 0..count {
            pool.push(reader.next_str()?);
        }

        let mut decoder = SkeletonReader { reader, pool };
        decoder.read_class(flags)
    }

    /// Method by name and descriptor
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// Methods with the given name
    pub fn methods_named(&self, name: &str) -> Vec<&MethodInfo> {
        self.methods.iter().filter(|m| m.name == name).collect()
    }

    /// Field by name
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

struct SkeletonReader<'a> {
    reader: ClassCursor<'a>,
    pool: Vec<String>,
}

impl SkeletonReader<'_> {
    fn string(&mut self) -> Result<String, ClassFileError> {
        let index = self.reader.next_u16()?;
        self.pool
            .get(index as usize)
            .cloned()
            .ok_or(ClassFileError::InvalidStringIndex(index))
    }

    fn code(&mut self) -> Result<Vec<u8>, ClassFileError> {
        let len = self.reader.next_u32()? as usize;
        Ok(self.reader.next_bytes(len)?)
    }

    fn read_class(&mut self, flags: u32) -> Result<ClassFile, ClassFileError> {
        let name = self.string()?;
        let modifiers = self.reader.next_u16()?;
        let superclass = match self.reader.next_u8()? {
            0 => None,
            _ => Some(self.string()?),
        };

        let interface_count = self.reader.next_u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(self.string()?);
        }
        let annotations = self.read_annotations()?;

        let field_count = self.reader.next_u16()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let name = self.string()?;
            let descriptor = self.string()?;
            let modifiers = self.reader.next_u16()?;
            let initializer = self.code()?;
            fields.push(FieldInfo {
                name,
                descriptor,
                modifiers,
                has_initializer: !initializer.is_empty(),
            });
        }

        let method_count = self.reader.next_u16()?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            let name = self.string()?;
            let descriptor = self.string()?;
            let modifiers = self.reader.next_u16()?;
            let param_count = self.reader.next_u8()?;
            let mut parameter_names = Vec::with_capacity(param_count as usize);
            for _ in 0..param_count {
                parameter_names.push(self.string()?);
                self.read_annotations()?;
            }
            let annotations = self.read_annotations()?;
            let code = self.code()?;
            methods.push(MethodInfo {
                name,
                descriptor,
                modifiers,
                parameter_names,
                annotations,
                code,
            });
        }

        let static_initializer = self.code()?;

        let inner_count = self.reader.next_u16()?;
        let mut inner_types = Vec::with_capacity(inner_count as usize);
        for _ in 0..inner_count {
            inner_types.push(self.string()?);
        }

        Ok(ClassFile {
            flags,
            name,
            modifiers,
            superclass,
            interfaces,
            annotations,
            fields,
            methods,
            static_initializer,
            inner_types,
        })
    }

    fn read_annotations(&mut self) -> Result<Vec<AnnotationInfo>, ClassFileError> {
        let count = self.reader.next_u16()?;
        let mut out = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let ty = self.string()?;
            let value_count = self.reader.next_u16()?;
            let mut values = Vec::with_capacity(value_count as usize);
            for _ in 0..value_count {
                let name = self.string()?;
                let value = self.read_constant()?;
                values.push((name, value));
            }
            out.push(AnnotationInfo { ty, values });
        }
        Ok(out)
    }

    fn read_constant(&mut self) -> Result<Constant, ClassFileError> {
        let position = self.reader.position();
        let constant = match self.reader.next_u8()? {
            tag::NULL => Constant::Null,
            tag::BOOL => Constant::Bool(self.reader.next_u8()? != 0),
            tag::INT => Constant::Int(self.reader.next_i32()?),
            tag::LONG => Constant::Long(self.reader.next_i64()?),
            tag::DOUBLE => Constant::Double(self.reader.next_f64()?),
            tag::STRING => Constant::String(self.string()?),
            tag::TYPE => {
                let descriptor = self.string()?;
                Constant::Type(parse_descriptor(&descriptor)?)
            }
            other => return Err(DecodeError::InvalidTag(other, position).into()),
        };
        Ok(constant)
    }
}

/// Parse a JVM field descriptor back into a [`TypeDef`]
pub fn parse_descriptor(descriptor: &str) -> Result<TypeDef, ClassFileError> {
    let invalid = || ClassFileError::InvalidDescriptor(descriptor.to_string());
    let dimensions = descriptor.chars().take_while(|c| *c == '[').count();
    let rest = &descriptor[dimensions..];
    let base = match rest {
        "V" => TypeDef::Void,
        "Z" => PrimitiveType::Boolean.into(),
        "B" => PrimitiveType::Byte.into(),
        "S" => PrimitiveType::Short.into(),
        "C" => PrimitiveType::Char.into(),
        "I" => PrimitiveType::Int.into(),
        "J" => PrimitiveType::Long.into(),
        "F" => PrimitiveType::Float.into(),
        "D" => PrimitiveType::Double.into(),
        _ if rest.len() > 2 && rest.starts_with('L') && rest.ends_with(';') => {
            TypeDef::Class(ClassTypeDef::of(rest[1..rest.len() - 1].replace('/', ".")))
        }
        _ => return Err(invalid()),
    };
    Ok(base.array_of(dimensions as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::modifiers;

    fn sample() -> ClassDef {
        let mut builder = ClassDef::builder("com.example.$Foo$Definition");
        builder
            .superclass(ClassTypeDef::of("io.beanforge.context.AbstractInitializableBeanDefinition"))
            .add_interface(ClassTypeDef::of("io.beanforge.inject.BeanFactory"))
            .add_field(
                FieldDef::builder("$CONSTRUCTOR", TypeDef::object())
                    .add_modifiers(modifiers::PRIVATE | modifiers::STATIC | modifiers::FINAL)
                    .build(),
            )
            .add_method(
                MethodDef::builder("isSingleton")
                    .add_modifiers(modifiers::PUBLIC)
                    .returns(TypeDef::boolean())
                    .build(ExpressionDef::bool(true).returning()),
            );
        builder.build()
    }

    #[test]
    fn test_encode_decode_skeleton() {
        let bytes = ClassFileWriter::write(&sample()).unwrap();
        assert_eq!(&bytes[0..4], b"BFCL");

        let file = ClassFile::decode(&bytes).unwrap();
        assert_eq!(file.name, "com/example/$Foo$Definition");
        assert_eq!(
            file.superclass.as_deref(),
            Some("io/beanforge/context/AbstractInitializableBeanDefinition")
        );
        assert_eq!(file.interfaces, vec!["io/beanforge/inject/BeanFactory"]);
        assert_eq!(file.field("$CONSTRUCTOR").unwrap().descriptor, "Ljava/lang/Object;");
        let m = file.method("isSingleton", "()Z").unwrap();
        assert!(!m.code.is_empty());
        assert_eq!(file.flags, 0);
    }

    #[test]
    fn test_checksum_validation() {
        let mut bytes = ClassFileWriter::write(&sample()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(
            ClassFile::decode(&bytes),
            Err(ClassFileError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes = ClassFileWriter::write(&sample()).unwrap();
        bytes[0] = b'X';
        assert_eq!(
            ClassFile::decode(&bytes),
            Err(ClassFileError::InvalidMagic(*b"XFCL"))
        );
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = ClassFileWriter::write(&sample()).unwrap();
        bytes[4] = 9;
        assert_eq!(ClassFile::decode(&bytes), Err(ClassFileError::UnsupportedVersion(9)));
    }

    #[test]
    fn test_string_pool_overflow() {
        let mut pool = StringPool::default();
        for i in 0..MAX_CONSTANTS {
            pool.intern(&i.to_string()).unwrap();
        }
        assert_eq!(pool.intern("0"), Ok(0));
        assert_eq!(pool.intern("one-more"), Err(ClassFileError::TooManyConstants));
    }

    #[test]
    fn test_parse_descriptor() {
        assert_eq!(parse_descriptor("I").unwrap(), TypeDef::int());
        assert_eq!(parse_descriptor("[Ljava/lang/String;").unwrap(), TypeDef::string().array());
        assert!(parse_descriptor("Q").is_err());
    }
}
