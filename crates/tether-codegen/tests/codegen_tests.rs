//! Code generator tests.
//!
//! Covers: function and class rendering, declaration placement across
//! scopes, loop forms, operators and literals, replacements, and rejection
//! of everything outside the translatable subset.

use tether_codegen::{
    analyze, translate, CodegenError, ItemKind, JavaScript, Replacements, TranslatedItem,
};
use tether_lexer::Lexer;
use tether_parser::Parser;
use tether_types::ast::Module;
use tether_types::{ErrorCode, SourceFile};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn src(lines: &[&str]) -> String {
    lines.join("\n")
}

fn module(source: &str) -> Module {
    let sf = SourceFile::new("view.py", source);
    let lex = Lexer::new(&sf).lex();
    let result = Parser::new(lex.tokens, &sf).parse();
    if result.errors.has_errors() {
        panic!("unexpected parse errors:\n{}", result.errors);
    }
    result.module.expect("no module returned")
}

fn translate_with(source: &str, replacements: &Replacements) -> Result<Vec<TranslatedItem>, CodegenError> {
    translate(&module(source), replacements, &JavaScript)
}

/// Translate and return the single item's source.
fn js(source: &str) -> String {
    match translate_with(source, &Replacements::default()) {
        Ok(mut items) => {
            assert_eq!(items.len(), 1, "expected one item");
            items.remove(0).source
        }
        Err(e) => panic!("unexpected codegen error: {e}"),
    }
}

fn err(source: &str) -> CodegenError {
    match translate_with(source, &Replacements::default()) {
        Ok(items) => panic!("expected an error, got {items:?}"),
        Err(e) => e,
    }
}

/// Wrap body lines in `def f(<params>):`.
fn in_function(params: &str, body: &[&str]) -> String {
    let mut lines = vec![format!("def f({params}):")];
    lines.extend(body.iter().map(|line| format!("    {line}")));
    lines.join("\n")
}

// ─────────────────────────────────────────────────────────────────────
// Items
// ─────────────────────────────────────────────────────────────────────

#[test]
fn function_with_locals() {
    let source = src(&[
        "def greet(name):",
        "    message = \"hi \" + name",
        "    return message",
    ]);
    assert_eq!(
        js(&source),
        "function greet(name) {\n\tlet message = (\"hi \" + name);\n\treturn message;\n}"
    );
}

#[test]
fn class_methods_drop_function_keyword() {
    let source = src(&[
        "class View:",
        "    def constructor():",
        "        this.node = document.createElement(\"div\")",
        "    def handle(change):",
        "        pass",
    ]);
    assert_eq!(
        js(&source),
        "class View {\n\tconstructor() {\n\t\tthis.node = document.createElement(\"div\");\n\t}\n\thandle(change) {\n\t\t// pass\n\t}\n}"
    );
}

#[test]
fn item_metadata() {
    let source = src(&[
        "class Counter:",
        "    def constructor(start, step):",
        "        this.value = start",
        "def helper(a, b):",
        "    return a",
    ]);
    let items = translate_with(&source, &Replacements::default()).expect("translates");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].kind, ItemKind::Class);
    assert_eq!(items[0].name, "Counter");
    assert_eq!(items[0].params, vec!["start", "step"]);
    assert_eq!(items[1].kind, ItemKind::Function);
    assert_eq!(items[1].name, "helper");
    assert_eq!(items[1].params, vec!["a", "b"]);
}

#[test]
fn nested_function_is_not_redeclared() {
    let source = in_function(
        "",
        &["def inner(x):", "    return x", "inner = 1"],
    );
    assert_eq!(
        js(&source),
        "function f() {\n\tfunction inner(x) {\n\t\treturn x;\n\t}\n\tinner = 1;\n}"
    );
}

#[test]
fn module_level_statement_rejected() {
    let e = err("x = 1");
    assert!(matches!(e, CodegenError::UnsupportedNode { node: "Assign", .. }));
}

#[test]
fn class_body_only_holds_methods() {
    let e = err(&src(&["class View:", "    size = 3"]));
    assert!(matches!(e, CodegenError::UnsupportedNode { node: "Assign", .. }));
}

#[test]
fn decorators_and_bases_rejected() {
    let e = err(&src(&["@cached", "def f():", "    pass"]));
    assert!(matches!(e, CodegenError::UnsupportedNode { node: "FunctionDef", .. }));

    let e = err(&src(&["class View(Base):", "    pass"]));
    assert!(matches!(e, CodegenError::UnsupportedNode { node: "ClassDef", .. }));
}

#[test]
fn default_parameters_rejected() {
    let e = err(&in_function("a=1", &["pass"]));
    assert!(matches!(e, CodegenError::UnsupportedNode { node: "arguments", .. }));
}

// ─────────────────────────────────────────────────────────────────────
// Declarations
// ─────────────────────────────────────────────────────────────────────

#[test]
fn branch_local_names_are_declared_in_each_branch() {
    let source = in_function(
        "flag",
        &["if flag:", "    x = 1", "else:", "    x = 2", "x = 3"],
    );
    assert_eq!(
        js(&source),
        "function f(flag) {\n\tif (flag) {\n\t\tlet x = 1;\n\t} else {\n\t\tlet x = 2;\n\t}\n\tlet x = 3;\n}"
    );
}

#[test]
fn enclosing_binding_is_never_redeclared() {
    let source = in_function(
        "flag",
        &["total = 0", "if flag:", "    total = 1", "return total"],
    );
    assert_eq!(
        js(&source),
        "function f(flag) {\n\tlet total = 0;\n\tif (flag) {\n\t\ttotal = 1;\n\t}\n\treturn total;\n}"
    );
}

#[test]
fn parameters_count_as_bound() {
    let source = in_function("a", &["a = 2"]);
    assert_eq!(js(&source), "function f(a) {\n\ta = 2;\n}");
}

#[test]
fn second_assignment_is_plain() {
    let source = in_function("", &["x = 1", "x = 2"]);
    assert_eq!(js(&source), "function f() {\n\tlet x = 1;\n\tx = 2;\n}");
}

#[test]
fn sibling_branches_do_not_leak() {
    let source = in_function(
        "a",
        &[
            "if a:",
            "    y = 1",
            "elif a == 2:",
            "    y = 2",
            "else:",
            "    y = 3",
        ],
    );
    assert_eq!(js(&source).matches("let y").count(), 3);
}

#[test]
fn loop_variable_reassigned_in_body_declared_once() {
    let source = in_function("xs", &["for x in xs:", "    x = x + 1"]);
    let out = js(&source);
    assert_eq!(
        out,
        "function f(xs) {\n\tfor (let x of xs) {\n\t\tx = (x + 1);\n\t}\n}"
    );
    assert_eq!(out.matches("let x").count(), 1);
}

#[test]
fn bound_loop_variable_is_plain() {
    let source = in_function("xs", &["x = 0", "for x in xs:", "    pass"]);
    assert!(js(&source).contains("for (x of xs) {"));
}

#[test]
fn analyze_marks_only_new_bindings() {
    let m = module(&in_function(
        "a",
        &["a = 1", "b = 2", "b = 3", "for c in a:", "    pass"],
    ));
    let declarations = analyze(&m, &Replacements::default()).expect("analyzes");
    assert_eq!(declarations.len(), 2);
}

#[test]
fn mixed_pair_target_rejected() {
    let source = in_function(
        "obj",
        &["k = 1", "for k, v in obj.items():", "    pass"],
    );
    let e = err(&source);
    assert!(matches!(e, CodegenError::MixedDeclaration { .. }));
    assert_eq!(e.code(), ErrorCode::MIXED_DECLARATION);
}

// ─────────────────────────────────────────────────────────────────────
// Control flow
// ─────────────────────────────────────────────────────────────────────

#[test]
fn items_loops() {
    let source = in_function(
        "obj",
        &[
            "for k in obj.items():",
            "    pass",
            "for k, v in obj.items():",
            "    pass",
        ],
    );
    assert_eq!(
        js(&source),
        "function f(obj) {\n\tfor (let k in obj) {\n\t\t// pass\n\t}\n\tfor (let [k, v] of Object.entries(obj)) {\n\t\t// pass\n\t}\n}"
    );
}

#[test]
fn pair_loop_over_sequence_destructures() {
    let source = in_function("pairs", &["for a, b in pairs:", "    pass"]);
    assert!(js(&source).contains("for (let [a, b] of pairs) {"));
}

#[test]
fn elif_chain() {
    let source = in_function(
        "a",
        &[
            "if a == 1:",
            "    return \"one\"",
            "elif a == 2:",
            "    return \"two\"",
            "else:",
            "    return \"many\"",
        ],
    );
    assert_eq!(
        js(&source),
        "function f(a) {\n\tif ((a === 1)) {\n\t\treturn \"one\";\n\t} else if ((a === 2)) {\n\t\treturn \"two\";\n\t} else {\n\t\treturn \"many\";\n\t}\n}"
    );
}

#[test]
fn while_loop_and_add_assign() {
    let source = in_function("", &["i = 0", "while i < 3:", "    i += 1", "return"]);
    assert_eq!(
        js(&source),
        "function f() {\n\tlet i = 0;\n\twhile ((i < 3)) {\n\t\ti += 1;\n\t}\n\treturn;\n}"
    );
}

#[test]
fn loop_else_rejected() {
    let source = in_function("xs", &["for x in xs:", "    pass", "else:", "    pass"]);
    assert!(matches!(err(&source), CodegenError::UnsupportedNode { node: "For", .. }));
}

#[test]
fn other_augmented_operators_rejected() {
    let e = err(&in_function("x", &["x -= 1"]));
    assert!(matches!(e, CodegenError::UnsupportedOperator { op: "-=", .. }));
}

#[test]
fn delete_statement() {
    let source = in_function("d", &["del d[\"a\"]"]);
    assert_eq!(js(&source), "function f(d) {\n\tdelete d[\"a\"];\n}");
}

#[test]
fn unsupported_statement_named() {
    let source = in_function(
        "",
        &["try:", "    pass", "except Exception:", "    pass"],
    );
    let e = err(&source);
    assert!(matches!(e, CodegenError::UnsupportedNode { node: "Try", .. }));
    assert!(e.to_string().contains("'Try' nodes are not supported"));
}

// ─────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn capitalized_callee_constructs() {
    let source = in_function("rest", &["w = Widget(1, *rest)", "render(w)"]);
    assert_eq!(
        js(&source),
        "function f(rest) {\n\tlet w = new Widget(1, ...rest);\n\trender(w);\n}"
    );
}

#[test]
fn method_call_on_capitalized_attribute_is_plain() {
    let source = in_function("", &["Math.max(1, 2)"]);
    assert!(js(&source).contains("\tMath.max(1, 2);"));
}

#[test]
fn logical_and_comparison_operators() {
    let source = in_function("a, b, c", &["return not a and b == c or b != c"]);
    assert!(js(&source).contains("return ((!a && (b === c)) || (b !== c));"));
}

#[test]
fn ternary_and_lambda() {
    let source = in_function("", &["pick = lambda a, b: a if a > b else b"]);
    assert!(js(&source).contains("let pick = (a, b) => ((a > b) ? a : b);"));
}

#[test]
fn literals() {
    let source = in_function(
        "",
        &["d = {\"a\": 1, 2: None, \"ok\": [True, False, 1.5]}"],
    );
    assert!(js(&source).contains("let d = {\"a\": 1, 2: null, \"ok\": [true, false, 1.5]};"));
}

#[test]
fn single_quoted_strings_become_json_literals() {
    let source = in_function("", &["s = 'it\\'s \"here\"'"]);
    assert!(js(&source).contains(r#"let s = "it's \"here\"";"#));
}

#[test]
fn unary_and_arithmetic() {
    let source = in_function("x", &["y = -x ** 2 % 3 - ~x"]);
    assert!(js(&source).contains("let y = ((-(x ** 2) % 3) - ~x);"));
}

#[test]
fn slice_fails_with_descriptive_error() {
    let e = err(&in_function("xs", &["return xs[1:2]"]));
    assert!(matches!(e, CodegenError::UnsupportedNode { node: "Slice", .. }));
    assert_eq!(e.code(), ErrorCode::UNSUPPORTED_NODE);
    let message = e.to_string();
    assert!(message.contains("'Slice'"), "{message}");
    assert!(message.contains(".slice(...)"), "{message}");
}

#[test]
fn error_maps_to_source_diagnostic() {
    let source = in_function("xs", &["return xs[1:2]"]);
    let e = err(&source);
    let sf = SourceFile::new("view.py", source.as_str());
    let diagnostic = e.to_source_error(&sf);
    assert_eq!(diagnostic.code, ErrorCode::UNSUPPORTED_NODE);
    assert_eq!(diagnostic.span.start_line, 2);
    assert_eq!(diagnostic.source_line, "    return xs[1:2]");
    assert!(diagnostic.suggestion.is_some());
}

#[test]
fn failure_produces_no_partial_output() {
    let source = src(&["def ok():", "    pass", "def bad(xs):", "    return xs[1:]"]);
    assert!(translate_with(&source, &Replacements::default()).is_err());
}

#[test]
fn unsupported_expressions_named() {
    let cases = [
        ("return a, b", "Tuple"),
        ("return a < b < c", "Compare"),
        ("return [x for x in a]", "ListComp"),
        ("f(x=1)", "keyword"),
    ];
    for (line, node) in cases {
        let e = err(&in_function("a, b, c", &[line]));
        match e {
            CodegenError::UnsupportedNode { node: got, .. } => assert_eq!(got, node, "{line}"),
            other => panic!("{line}: expected unsupported node, got {other:?}"),
        }
    }
}

#[test]
fn unsupported_operators_named() {
    let cases = [
        ("return a // b", "//"),
        ("return a << b", "<<"),
        ("return a in b", "in"),
        ("return a is None", "is"),
    ];
    for (line, op) in cases {
        let e = err(&in_function("a, b", &[line]));
        match e {
            CodegenError::UnsupportedOperator { op: got, .. } => assert_eq!(got, op, "{line}"),
            other => panic!("{line}: expected unsupported operator, got {other:?}"),
        }
    }
}

#[test]
fn non_literal_dict_key_rejected() {
    let e = err(&in_function("k", &["d = {k: 1}"]));
    assert!(matches!(e, CodegenError::UnsupportedKey { node: "Name", .. }));
}

#[test]
fn tuple_assignment_target_rejected() {
    let e = err(&in_function("", &["a, b = 1, 2"]));
    assert!(matches!(e, CodegenError::UnsupportedTarget { node: "Tuple", .. }));
}

// ─────────────────────────────────────────────────────────────────────
// Replacements
// ─────────────────────────────────────────────────────────────────────

#[test]
fn replacement_renders_text_and_is_never_declared() {
    let table = Replacements::default()
        .with("doc", "window.document")
        .with("state", "this.state");
    let source = in_function("", &["state = {}", "state.body = doc.body"]);
    let items = translate_with(&source, &table).expect("translates");
    assert_eq!(
        items[0].source,
        "function f() {\n\tthis.state = {};\n\tthis.state.body = window.document.body;\n}"
    );
}

#[test]
fn default_replacements_pass_through() {
    let source = in_function("v", &["if v != undefined:", "    this.v = v"]);
    assert!(js(&source).contains("if ((v !== undefined)) {\n\t\tthis.v = v;"));
}

#[test]
fn without_replacements_names_are_declared() {
    let source = in_function("", &["this = 1"]);
    let items = translate_with(&source, &Replacements::empty()).expect("translates");
    assert!(items[0].source.contains("let this = 1;"));
}
