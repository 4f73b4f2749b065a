//! Pretty-printing for generated classes
//!
//! Renders Java-like source for debugging and snapshot-style assertions.

use crate::class::{modifiers, ClassDef, FieldDef, MethodDef};
use crate::expr::{Constant, ExpressionDef, InvokeKind};
use crate::stmt::{StatementDef, SwitchKey};
use std::fmt::Write;

/// Trait for pretty-printing generated constructs
pub trait PrettyPrint {
    /// Render as Java-like source
    fn pretty_print(&self) -> String;
}

fn modifier_keywords(bits: u16) -> String {
    let mut out = String::new();
    for (bit, word) in [
        (modifiers::PUBLIC, "public "),
        (modifiers::PRIVATE, "private "),
        (modifiers::PROTECTED, "protected "),
        (modifiers::STATIC, "static "),
        (modifiers::FINAL, "final "),
        (modifiers::SYNCHRONIZED, "synchronized "),
        (modifiers::VOLATILE, "volatile "),
        (modifiers::ABSTRACT, "abstract "),
    ] {
        if bits & bit != 0 {
            out.push_str(word);
        }
    }
    out
}

impl PrettyPrint for ClassDef {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        for a in &self.annotations {
            writeln!(output, "@{}", a.ty).unwrap();
        }
        let kind = if self.modifiers & modifiers::INTERFACE != 0 {
            "interface"
        } else {
            "class"
        };
        write!(output, "{}{} {}", modifier_keywords(self.modifiers), kind, self.name).unwrap();
        if let Some(s) = &self.superclass {
            write!(output, " extends {}", s).unwrap();
        }
        if !self.interfaces.is_empty() {
            let names: Vec<String> = self.interfaces.iter().map(|i| i.to_string()).collect();
            write!(output, " implements {}", names.join(", ")).unwrap();
        }
        writeln!(output, " {{").unwrap();

        for f in &self.fields {
            writeln!(output, "  {}", f.pretty_print()).unwrap();
        }
        if let Some(init) = &self.static_initializer {
            writeln!(output).unwrap();
            writeln!(output, "  static {{").unwrap();
            print_statement(&mut output, init, 4);
            writeln!(output, "  }}").unwrap();
        }
        for m in &self.methods {
            writeln!(output).unwrap();
            for line in m.pretty_print().lines() {
                writeln!(output, "  {}", line).unwrap();
            }
        }
        for inner in &self.inner_types {
            writeln!(output).unwrap();
            for line in inner.pretty_print().lines() {
                writeln!(output, "  {}", line).unwrap();
            }
        }
        writeln!(output, "}}").unwrap();
        output
    }
}

impl PrettyPrint for FieldDef {
    fn pretty_print(&self) -> String {
        let mut output = format!("{}{} {}", modifier_keywords(self.modifiers), self.ty, self.name);
        if let Some(init) = &self.initializer {
            write!(output, " = {}", init.pretty_print()).unwrap();
        }
        output.push(';');
        output
    }
}

impl PrettyPrint for MethodDef {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        for a in &self.annotations {
            writeln!(output, "@{}", a.ty).unwrap();
        }
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| format!("{} {}", p.ty, p.name))
            .collect();
        let name = if self.is_constructor() { "<init>".to_string() } else { format!("{} {}", self.return_type, self.name) };
        write!(output, "{}{}({})", modifier_keywords(self.modifiers), name, params.join(", ")).unwrap();
        match &self.body {
            Some(body) => {
                writeln!(output, " {{").unwrap();
                print_statement(&mut output, body, 2);
                writeln!(output, "}}").unwrap();
            }
            None => writeln!(output, ";").unwrap(),
        }
        output
    }
}

impl PrettyPrint for StatementDef {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        print_statement(&mut output, self, 0);
        output
    }
}

fn print_block(output: &mut String, statement: &StatementDef, indent: usize) {
    writeln!(output, " {{").unwrap();
    print_statement(output, statement, indent + 2);
    write!(output, "{}}}", " ".repeat(indent)).unwrap();
}

fn print_statement(output: &mut String, statement: &StatementDef, indent: usize) {
    let pad = " ".repeat(indent);
    match statement {
        StatementDef::Multi(items) => {
            for s in items {
                print_statement(output, s, indent);
            }
        }
        StatementDef::Expression(e) => writeln!(output, "{}{};", pad, e.pretty_print()).unwrap(),
        StatementDef::Return(None) => writeln!(output, "{}return;", pad).unwrap(),
        StatementDef::Return(Some(e)) => writeln!(output, "{}return {};", pad, e.pretty_print()).unwrap(),
        StatementDef::Throw(e) => writeln!(output, "{}throw {};", pad, e.pretty_print()).unwrap(),
        StatementDef::DefineLocal { name, ty, value } => {
            writeln!(output, "{}{} {} = {};", pad, ty, name, value.pretty_print()).unwrap()
        }
        StatementDef::Assign { name, value } => {
            writeln!(output, "{}{} = {};", pad, name, value.pretty_print()).unwrap()
        }
        StatementDef::PutField { instance, field, value } => writeln!(
            output,
            "{}{}.{} = {};",
            pad,
            instance.pretty_print(),
            field.name,
            value.pretty_print()
        )
        .unwrap(),
        StatementDef::PutStatic { field, value } => writeln!(
            output,
            "{}{}.{} = {};",
            pad,
            field.owner.simple_name(),
            field.name,
            value.pretty_print()
        )
        .unwrap(),
        StatementDef::If {
            condition,
            then_branch,
            else_branch,
        } => {
            write!(output, "{}if ({})", pad, condition.pretty_print()).unwrap();
            print_block(output, then_branch, indent);
            if let Some(e) = else_branch {
                write!(output, " else").unwrap();
                print_block(output, e, indent);
            }
            writeln!(output).unwrap();
        }
        StatementDef::Switch { value, cases, default } => {
            writeln!(output, "{}switch ({}) {{", pad, value.pretty_print()).unwrap();
            for (key, body) in cases {
                match key {
                    SwitchKey::Int(i) => writeln!(output, "{}  case {}:", pad, i).unwrap(),
                    SwitchKey::String(s) => writeln!(output, "{}  case {:?}:", pad, s).unwrap(),
                }
                print_statement(output, body, indent + 4);
            }
            if let Some(d) = default {
                writeln!(output, "{}  default:", pad).unwrap();
                print_statement(output, d, indent + 4);
            }
            writeln!(output, "{}}}", pad).unwrap();
        }
        StatementDef::Try {
            body,
            catches,
            finally,
        } => {
            write!(output, "{}try", pad).unwrap();
            print_block(output, body, indent);
            for c in catches {
                write!(output, " catch ({} {})", c.exception, c.local).unwrap();
                print_block(output, &c.body, indent);
            }
            if let Some(f) = finally {
                write!(output, " finally").unwrap();
                print_block(output, f, indent);
            }
            writeln!(output).unwrap();
        }
        StatementDef::Synchronized { monitor, body } => {
            write!(output, "{}synchronized ({})", pad, monitor.pretty_print()).unwrap();
            print_block(output, body, indent);
            writeln!(output).unwrap();
        }
    }
}

fn join(items: &[ExpressionDef]) -> String {
    items
        .iter()
        .map(|e| e.pretty_print())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PrettyPrint for ExpressionDef {
    fn pretty_print(&self) -> String {
        match self {
            ExpressionDef::Constant(c) => match c {
                Constant::Null => "null".to_string(),
                Constant::Bool(b) => b.to_string(),
                Constant::Int(i) => i.to_string(),
                Constant::Long(l) => format!("{}L", l),
                Constant::Double(d) => format!("{:?}", d),
                Constant::String(s) => format!("{:?}", s),
                Constant::Type(t) => format!("{}.class", t),
            },
            ExpressionDef::This => "this".to_string(),
            ExpressionDef::Param { index, .. } => format!("arg{}", index),
            ExpressionDef::Local { name, .. } => name.clone(),
            ExpressionDef::StaticField(f) => format!("{}.{}", f.owner.simple_name(), f.name),
            ExpressionDef::Field { instance, field } => format!("{}.{}", instance.pretty_print(), field.name),
            ExpressionDef::InvokeStatic { method, args } => {
                format!("{}.{}({})", method.owner.simple_name(), method.name, join(args))
            }
            ExpressionDef::Invoke {
                kind,
                instance,
                method,
                args,
            } => {
                let receiver = match (kind, instance.as_ref()) {
                    (InvokeKind::Special, ExpressionDef::This) if method.is_constructor() => {
                        return format!("super({})", join(args));
                    }
                    (InvokeKind::Special, ExpressionDef::This) => "super".to_string(),
                    _ => instance.pretty_print(),
                };
                format!("{}.{}({})", receiver, method.name, join(args))
            }
            ExpressionDef::New { constructor, args } => {
                format!("new {}({})", constructor.owner.simple_name(), join(args))
            }
            ExpressionDef::NewArray { component, items } => {
                format!("new {}[]{{{}}}", component, join(items))
            }
            ExpressionDef::ArrayElement { array, index } => format!("{}[{}]", array.pretty_print(), index),
            ExpressionDef::Cast { value, ty } => format!("(({}) {})", ty, value.pretty_print()),
            ExpressionDef::InstanceOf { value, ty } => {
                format!("{} instanceof {}", value.pretty_print(), ty.simple_name())
            }
            ExpressionDef::IsNull(v) => format!("{} == null", v.pretty_print()),
            ExpressionDef::IsNonNull(v) => format!("{} != null", v.pretty_print()),
            ExpressionDef::Equals(l, r) => format!("{} == {}", l.pretty_print(), r.pretty_print()),
            ExpressionDef::And(l, r) => format!("({} && {})", l.pretty_print(), r.pretty_print()),
            ExpressionDef::Or(l, r) => format!("({} || {})", l.pretty_print(), r.pretty_print()),
            ExpressionDef::Not(v) => format!("!{}", v.pretty_print()),
            ExpressionDef::BitOr(l, r) => format!("({} | {})", l.pretty_print(), r.pretty_print()),
            ExpressionDef::Conditional {
                condition,
                if_true,
                if_false,
            } => format!(
                "{} ? {} : {}",
                condition.pretty_print(),
                if_true.pretty_print(),
                if_false.pretty_print()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{FieldRef, MethodRef};
    use crate::types::TypeDef;

    #[test]
    fn test_pretty_print_statement() {
        let target = FieldRef::new("a.Proxy", "$target", TypeDef::object());
        let s = ExpressionDef::this()
            .field(target.clone())
            .is_null()
            .if_true(ExpressionDef::this().put_field(target, ExpressionDef::null()));
        let text = s.pretty_print();
        assert!(text.contains("if (this.$target == null)"));
        assert!(text.contains("this.$target = null;"));
    }

    #[test]
    fn test_pretty_print_super_constructor() {
        let ctor = MethodRef::constructor("a.Base", vec![TypeDef::boolean()]);
        let call = ExpressionDef::invoke_super(ctor, vec![ExpressionDef::bool(false)]);
        assert_eq!(call.pretty_print(), "super(false)");
    }

    #[test]
    fn test_pretty_print_method() {
        let m = MethodDef::builder("getOrder")
            .add_modifiers(modifiers::PUBLIC)
            .returns(TypeDef::int())
            .build(ExpressionDef::int(3).returning());
        assert_eq!(m.pretty_print(), "public int getOrder() {\n  return 3;\n}\n");
    }
}
