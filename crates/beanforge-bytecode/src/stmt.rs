//! Statement nodes

use crate::expr::{ExpressionDef, FieldRef};
use crate::types::{ClassTypeDef, TypeDef};

/// Case label of a switch statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SwitchKey {
    /// Integer label
    Int(i32),
    /// String label
    String(String),
}

/// A catch clause
#[derive(Debug, Clone, PartialEq)]
pub struct CatchDef {
    /// Caught exception type
    pub exception: ClassTypeDef,
    /// Name of the local holding the exception
    pub local: String,
    /// Handler body
    pub body: StatementDef,
}

/// A statement in a method body
#[derive(Debug, Clone, PartialEq)]
pub enum StatementDef {
    /// Sequence of statements
    Multi(Vec<StatementDef>),
    /// Expression evaluated for its side effects
    Expression(ExpressionDef),
    /// Return, with a value unless the method is void
    Return(Option<ExpressionDef>),
    /// Throw an exception
    Throw(ExpressionDef),
    /// Define and initialize a local variable
    DefineLocal {
        /// Variable name
        name: String,
        /// Variable type
        ty: TypeDef,
        /// Initial value
        value: ExpressionDef,
    },
    /// Assign an existing local variable
    Assign {
        /// Variable name
        name: String,
        /// New value
        value: ExpressionDef,
    },
    /// Instance field write
    PutField {
        /// Owning instance
        instance: ExpressionDef,
        /// Field reference
        field: FieldRef,
        /// New value
        value: ExpressionDef,
    },
    /// Static field write
    PutStatic {
        /// Field reference
        field: FieldRef,
        /// New value
        value: ExpressionDef,
    },
    /// Conditional execution
    If {
        /// Condition
        condition: ExpressionDef,
        /// Executed when true
        then_branch: Box<StatementDef>,
        /// Executed when false
        else_branch: Option<Box<StatementDef>>,
    },
    /// Switch over an int or string value
    Switch {
        /// Switched value
        value: ExpressionDef,
        /// Cases in declaration order
        cases: Vec<(SwitchKey, StatementDef)>,
        /// Fallback
        default: Option<Box<StatementDef>>,
    },
    /// Try with catch clauses and an optional finally block
    Try {
        /// Guarded body
        body: Box<StatementDef>,
        /// Catch clauses
        catches: Vec<CatchDef>,
        /// Always executed
        finally: Option<Box<StatementDef>>,
    },
    /// Block holding a monitor
    Synchronized {
        /// Monitor object
        monitor: ExpressionDef,
        /// Body
        body: Box<StatementDef>,
    },
}

impl StatementDef {
    /// Sequence of statements, flattening nested sequences
    pub fn multi(statements: Vec<StatementDef>) -> Self {
        let mut flat = Vec::with_capacity(statements.len());
        for s in statements {
            match s {
                StatementDef::Multi(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        StatementDef::Multi(flat)
    }

    /// No-op
    pub fn empty() -> Self {
        StatementDef::Multi(Vec::new())
    }

    /// Whether this statement does nothing
    pub fn is_empty(&self) -> bool {
        matches!(self, StatementDef::Multi(s) if s.iter().all(|s| s.is_empty()))
    }

    /// `return;`
    pub fn return_void() -> Self {
        StatementDef::Return(None)
    }

    /// `Owner.field = value;`
    pub fn put_static(field: FieldRef, value: ExpressionDef) -> Self {
        StatementDef::PutStatic { field, value }
    }

    /// `name = value;`
    pub fn assign(name: impl Into<String>, value: ExpressionDef) -> Self {
        StatementDef::Assign {
            name: name.into(),
            value,
        }
    }

    /// Switch statement
    pub fn switch(value: ExpressionDef, cases: Vec<(SwitchKey, StatementDef)>, default: Option<StatementDef>) -> Self {
        StatementDef::Switch {
            value,
            cases,
            default: default.map(Box::new),
        }
    }

    /// `try { body } finally { finally }`
    pub fn try_finally(body: StatementDef, finally: StatementDef) -> Self {
        StatementDef::Try {
            body: Box::new(body),
            catches: Vec::new(),
            finally: Some(Box::new(finally)),
        }
    }

    /// `try { body } catch (exception local) { handler }`
    pub fn try_catch(body: StatementDef, exception: ClassTypeDef, local: &str, handler: StatementDef) -> Self {
        StatementDef::Try {
            body: Box::new(body),
            catches: vec![CatchDef {
                exception,
                local: local.to_string(),
                body: handler,
            }],
            finally: None,
        }
    }

    /// `synchronized (monitor) { body }`
    pub fn synchronized(monitor: ExpressionDef, body: StatementDef) -> Self {
        StatementDef::Synchronized {
            monitor,
            body: Box::new(body),
        }
    }

    /// Nested statements
    pub fn children(&self) -> Vec<&StatementDef> {
        match self {
            StatementDef::Multi(s) => s.iter().collect(),
            StatementDef::If {
                then_branch,
                else_branch,
                ..
            } => {
                let mut out = vec![then_branch.as_ref()];
                if let Some(e) = else_branch {
                    out.push(e.as_ref());
                }
                out
            }
            StatementDef::Switch { cases, default, .. } => {
                let mut out: Vec<&StatementDef> = cases.iter().map(|(_, s)| s).collect();
                if let Some(d) = default {
                    out.push(d.as_ref());
                }
                out
            }
            StatementDef::Try {
                body,
                catches,
                finally,
            } => {
                let mut out = vec![body.as_ref()];
                out.extend(catches.iter().map(|c| &c.body));
                if let Some(f) = finally {
                    out.push(f.as_ref());
                }
                out
            }
            StatementDef::Synchronized { body, .. } => vec![body.as_ref()],
            _ => Vec::new(),
        }
    }

    /// Expressions directly owned by this statement
    pub fn expressions(&self) -> Vec<&ExpressionDef> {
        match self {
            StatementDef::Expression(e) | StatementDef::Throw(e) => vec![e],
            StatementDef::Return(Some(e)) => vec![e],
            StatementDef::DefineLocal { value, .. }
            | StatementDef::Assign { value, .. }
            | StatementDef::PutStatic { value, .. } => vec![value],
            StatementDef::PutField { instance, value, .. } => vec![instance, value],
            StatementDef::If { condition, .. } => vec![condition],
            StatementDef::Switch { value, .. } => vec![value],
            StatementDef::Synchronized { monitor, .. } => vec![monitor],
            _ => Vec::new(),
        }
    }

    /// Whether this statement or any nested one satisfies `predicate`
    pub fn any(&self, predicate: &dyn Fn(&StatementDef) -> bool) -> bool {
        predicate(self) || self.children().into_iter().any(|c| c.any(predicate))
    }

    /// Whether a method or constructor named `name` is invoked anywhere
    pub fn invokes(&self, name: &str) -> bool {
        self.expressions().into_iter().any(|e| e.invokes(name))
            || self.children().into_iter().any(|c| c.invokes(name))
    }

    /// Whether a field named `name` is written anywhere
    pub fn writes_field(&self, name: &str) -> bool {
        self.any(&|s| match s {
            StatementDef::PutField { field, .. } | StatementDef::PutStatic { field, .. } => field.name == name,
            _ => false,
        })
    }
}

impl From<ExpressionDef> for StatementDef {
    fn from(value: ExpressionDef) -> Self {
        StatementDef::Expression(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::MethodRef;

    #[test]
    fn test_multi_flattens_nested_sequences() {
        let s = StatementDef::multi(vec![
            StatementDef::multi(vec![StatementDef::return_void()]),
            StatementDef::empty(),
        ]);
        match s {
            StatementDef::Multi(inner) => assert_eq!(inner.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_is_empty() {
        assert!(StatementDef::empty().is_empty());
        assert!(!StatementDef::return_void().is_empty());
    }

    #[test]
    fn test_invokes_searches_try_finally() {
        let unlock = ExpressionDef::this()
            .invoke(MethodRef::interface("java.util.concurrent.locks.Lock", "unlock", vec![], TypeDef::Void), vec![])
            .statement();
        let s = StatementDef::try_finally(StatementDef::return_void(), unlock);
        assert!(s.invokes("unlock"));
        assert!(!s.invokes("lock"));
    }

    #[test]
    fn test_writes_field() {
        let f = FieldRef::new("a.B", "$target", TypeDef::object());
        let s = ExpressionDef::this().if_true(ExpressionDef::this().put_field(f, ExpressionDef::null()));
        assert!(s.writes_field("$target"));
        assert!(!s.writes_field("$other"));
    }
}
