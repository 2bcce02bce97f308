//! Target-language emitters.
//!
//! Pass 2 walks the tree and asks a [`Target`] for every fragment, so the
//! tree walk and the surface syntax of the output stay independent. Operator
//! hooks return `None` for operators the target cannot express; the caller
//! turns that into an [`UnsupportedOperator`](crate::CodegenError) error.

use tether_types::ast::{BinOp, CmpOp, UnaryOp};

/// A source-text emitter for one target language.
pub trait Target {
    /// Short identifier, used in logs.
    fn name(&self) -> &'static str;

    // ── Items ──
    fn function(&self, name: &str, params: &[String], body: &[String]) -> String;
    /// A function rendered as a class member.
    fn method(&self, name: &str, params: &[String], body: &[String]) -> String;
    fn class(&self, name: &str, members: &[String]) -> String;

    // ── Statements ──
    /// The declaration form of a binding target (`let x`).
    fn declare(&self, binding: &str) -> String;
    fn assign(&self, target: &str, value: &str) -> String;
    fn add_assign(&self, target: &str, value: &str) -> String;
    /// An `if` with zero or more `else if` branches. `branches` is non-empty.
    fn if_chain(&self, branches: &[(String, Vec<String>)], orelse: Option<&[String]>) -> String;
    /// Iterate the values of a sequence.
    fn for_values(&self, binding: &str, iterable: &str, body: &[String]) -> String;
    /// Iterate the keys of a mapping.
    fn for_keys(&self, binding: &str, object: &str, body: &[String]) -> String;
    /// Iterate the key/value pairs of a mapping.
    fn for_entries(&self, binding: &str, object: &str, body: &[String]) -> String;
    fn while_loop(&self, condition: &str, body: &[String]) -> String;
    fn return_stmt(&self, value: Option<&str>) -> String;
    fn delete(&self, target: &str) -> String;
    fn pass(&self) -> String;
    fn expr_stmt(&self, expr: &str) -> String;

    // ── Expressions ──
    fn int(&self, value: i64) -> String;
    fn float(&self, value: f64) -> String;
    fn string(&self, value: &str) -> String;
    fn boolean(&self, value: bool) -> String;
    fn null(&self) -> String;
    fn list(&self, items: &[String]) -> String;
    fn dict(&self, entries: &[(String, String)]) -> String;
    /// A destructuring pattern binding several names at once.
    fn destructure(&self, names: &[String]) -> String;
    fn attribute(&self, value: &str, attr: &str) -> String;
    fn subscript(&self, value: &str, index: &str) -> String;
    fn call(&self, callee: &str, args: &[String]) -> String;
    /// A call that constructs a new instance of `callee`.
    fn construct(&self, callee: &str, args: &[String]) -> String;
    fn spread(&self, value: &str) -> String;
    fn binary(&self, left: &str, op: BinOp, right: &str) -> Option<String>;
    fn compare(&self, left: &str, op: CmpOp, right: &str) -> Option<String>;
    fn unary(&self, op: UnaryOp, operand: &str) -> Option<String>;
    fn ternary(&self, test: &str, body: &str, orelse: &str) -> String;
    fn lambda(&self, params: &[String], body: &str) -> String;
}

/// Tab-indent every line of every statement, braces included.
pub fn block(body: &[String]) -> String {
    let mut out = String::from("{\n");
    for stmt in body {
        for line in stmt.lines() {
            out.push('\t');
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push('}');
    out
}

// ══════════════════════════════════════════════════════════════════════════════
// JavaScript
// ══════════════════════════════════════════════════════════════════════════════

/// Emits ES2015+ JavaScript.
///
/// Binary and comparison expressions are always parenthesized, so operator
/// precedence never has to be reconstructed. Simple statements end in `;`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaScript;

impl JavaScript {
    fn binary_symbol(op: BinOp) -> Option<&'static str> {
        Some(match op {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitAnd => "&",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::FloorDiv | BinOp::LShift | BinOp::RShift => return None,
        })
    }

    fn compare_symbol(op: CmpOp) -> Option<&'static str> {
        Some(match op {
            CmpOp::Eq => "===",
            CmpOp::NotEq => "!==",
            CmpOp::Less => "<",
            CmpOp::Greater => ">",
            CmpOp::LessEq => "<=",
            CmpOp::GreaterEq => ">=",
            CmpOp::In | CmpOp::NotIn | CmpOp::Is | CmpOp::IsNot => return None,
        })
    }

    fn signature(name: &str, params: &[String], body: &[String]) -> String {
        format!("{name}({}) {}", params.join(", "), block(body))
    }
}

impl Target for JavaScript {
    fn name(&self) -> &'static str {
        "javascript"
    }

    fn function(&self, name: &str, params: &[String], body: &[String]) -> String {
        format!("function {}", Self::signature(name, params, body))
    }

    fn method(&self, name: &str, params: &[String], body: &[String]) -> String {
        Self::signature(name, params, body)
    }

    fn class(&self, name: &str, members: &[String]) -> String {
        format!("class {name} {}", block(members))
    }

    fn declare(&self, binding: &str) -> String {
        format!("let {binding}")
    }

    fn assign(&self, target: &str, value: &str) -> String {
        format!("{target} = {value};")
    }

    fn add_assign(&self, target: &str, value: &str) -> String {
        format!("{target} += {value};")
    }

    fn if_chain(&self, branches: &[(String, Vec<String>)], orelse: Option<&[String]>) -> String {
        let mut out = String::new();
        for (i, (condition, body)) in branches.iter().enumerate() {
            if i > 0 {
                out.push_str(" else ");
            }
            out.push_str(&format!("if ({condition}) {}", block(body)));
        }
        if let Some(body) = orelse {
            out.push_str(&format!(" else {}", block(body)));
        }
        out
    }

    fn for_values(&self, binding: &str, iterable: &str, body: &[String]) -> String {
        format!("for ({binding} of {iterable}) {}", block(body))
    }

    fn for_keys(&self, binding: &str, object: &str, body: &[String]) -> String {
        format!("for ({binding} in {object}) {}", block(body))
    }

    fn for_entries(&self, binding: &str, object: &str, body: &[String]) -> String {
        format!("for ({binding} of Object.entries({object})) {}", block(body))
    }

    fn while_loop(&self, condition: &str, body: &[String]) -> String {
        format!("while ({condition}) {}", block(body))
    }

    fn return_stmt(&self, value: Option<&str>) -> String {
        match value {
            Some(value) => format!("return {value};"),
            None => "return;".to_string(),
        }
    }

    fn delete(&self, target: &str) -> String {
        format!("delete {target};")
    }

    fn pass(&self) -> String {
        "// pass".to_string()
    }

    fn expr_stmt(&self, expr: &str) -> String {
        format!("{expr};")
    }

    fn int(&self, value: i64) -> String {
        value.to_string()
    }

    fn float(&self, value: f64) -> String {
        if value.is_infinite() {
            "Infinity".to_string()
        } else {
            value.to_string()
        }
    }

    fn string(&self, value: &str) -> String {
        // A JSON string literal is a valid JS string literal.
        serde_json::Value::String(value.to_string()).to_string()
    }

    fn boolean(&self, value: bool) -> String {
        value.to_string()
    }

    fn null(&self) -> String {
        "null".to_string()
    }

    fn list(&self, items: &[String]) -> String {
        format!("[{}]", items.join(", "))
    }

    fn dict(&self, entries: &[(String, String)]) -> String {
        let entries: Vec<String> = entries
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect();
        format!("{{{}}}", entries.join(", "))
    }

    fn destructure(&self, names: &[String]) -> String {
        format!("[{}]", names.join(", "))
    }

    fn attribute(&self, value: &str, attr: &str) -> String {
        format!("{value}.{attr}")
    }

    fn subscript(&self, value: &str, index: &str) -> String {
        format!("{value}[{index}]")
    }

    fn call(&self, callee: &str, args: &[String]) -> String {
        format!("{callee}({})", args.join(", "))
    }

    fn construct(&self, callee: &str, args: &[String]) -> String {
        format!("new {}", self.call(callee, args))
    }

    fn spread(&self, value: &str) -> String {
        format!("...{value}")
    }

    fn binary(&self, left: &str, op: BinOp, right: &str) -> Option<String> {
        let symbol = Self::binary_symbol(op)?;
        // A unary operand on the left of `**` is a syntax error unparenthesized.
        if op == BinOp::Pow && left.starts_with(&['-', '+', '!', '~'][..]) {
            return Some(format!("(({left}) ** {right})"));
        }
        Some(format!("({left} {symbol} {right})"))
    }

    fn compare(&self, left: &str, op: CmpOp, right: &str) -> Option<String> {
        Self::compare_symbol(op).map(|symbol| format!("({left} {symbol} {right})"))
    }

    fn unary(&self, op: UnaryOp, operand: &str) -> Option<String> {
        let symbol = match op {
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
            UnaryOp::Not => "!",
            UnaryOp::Invert => "~",
        };
        // `- -x` must not become the decrement operator.
        if operand.starts_with('-') || operand.starts_with('+') {
            Some(format!("{symbol}({operand})"))
        } else {
            Some(format!("{symbol}{operand}"))
        }
    }

    fn ternary(&self, test: &str, body: &str, orelse: &str) -> String {
        format!("({test} ? {body} : {orelse})")
    }

    fn lambda(&self, params: &[String], body: &str) -> String {
        // An object literal body would parse as a block.
        if body.starts_with('{') {
            format!("({}) => ({body})", params.join(", "))
        } else {
            format!("({}) => {body}", params.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_indents_nested_lines() {
        let inner = block(&["x;".to_string()]);
        let outer = block(&[format!("if (a) {inner}")]);
        assert_eq!(outer, "{\n\tif (a) {\n\t\tx;\n\t}\n}");
    }

    #[test]
    fn empty_block() {
        assert_eq!(block(&[]), "{\n}");
    }

    #[test]
    fn unsupported_operators_have_no_rendering() {
        let js = JavaScript;
        assert_eq!(js.binary("a", BinOp::FloorDiv, "b"), None);
        assert_eq!(js.binary("a", BinOp::LShift, "b"), None);
        assert_eq!(js.compare("a", CmpOp::In, "b"), None);
        assert_eq!(js.compare("a", CmpOp::Is, "b"), None);
    }

    #[test]
    fn unary_base_of_power_is_parenthesized() {
        let js = JavaScript;
        assert_eq!(js.binary("-x", BinOp::Pow, "2").as_deref(), Some("((-x) ** 2)"));
        assert_eq!(js.binary("x", BinOp::Pow, "2").as_deref(), Some("(x ** 2)"));
    }

    #[test]
    fn string_literals_are_escaped() {
        let js = JavaScript;
        assert_eq!(js.string("say \"hi\"\n"), r#""say \"hi\"\n""#);
    }

    #[test]
    fn nested_negation_keeps_operands_apart() {
        let js = JavaScript;
        let inner = js.unary(UnaryOp::Neg, "x").unwrap_or_default();
        assert_eq!(js.unary(UnaryOp::Neg, &inner).as_deref(), Some("-(-x)"));
        assert_eq!(js.unary(UnaryOp::Not, "(a && b)").as_deref(), Some("!(a && b)"));
    }

    #[test]
    fn lambda_returning_object_is_wrapped() {
        let js = JavaScript;
        assert_eq!(js.lambda(&["a".into()], "{\"k\": a}"), "(a) => ({\"k\": a})");
        assert_eq!(js.lambda(&[], "1"), "() => 1");
    }

    #[test]
    fn float_rendering() {
        let js = JavaScript;
        assert_eq!(js.float(1.5), "1.5");
        assert_eq!(js.float(f64::INFINITY), "Infinity");
    }
}
