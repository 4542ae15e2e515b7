use yapl_compiler::{
    Analysis, CompileOptions, Compiler, DiagnosticKind, Expression, ExpressionKind, Feature,
    Program, SemanticChecker, SourceFile, OBJECT,
};

fn parse(source: &str) -> Program {
    let mut compiler = Compiler::new(CompileOptions::default());
    compiler
        .parse(&SourceFile::from_text(source))
        .expect("program should parse")
}

fn check(source: &str) -> (Program, Analysis) {
    let program = parse(source);
    let analysis = yapl_compiler::analyze(&program);
    (program, analysis)
}

fn kinds(analysis: &Analysis) -> Vec<DiagnosticKind> {
    analysis
        .diagnostics
        .entries()
        .iter()
        .map(|diagnostic| diagnostic.kind)
        .collect()
}

fn method_body<'a>(program: &'a Program, class: &str, method: &str) -> &'a Expression {
    program
        .classes
        .iter()
        .filter(|declaration| declaration.name == class)
        .flat_map(|declaration| declaration.features.iter())
        .find_map(|feature| match feature {
            Feature::Method(declaration) if declaration.name == method => Some(&declaration.body),
            _ => None,
        })
        .expect("method should exist")
}

fn body_type<'a>(
    program: &Program,
    analysis: &'a Analysis,
    class: &str,
    method: &str,
) -> Option<&'a str> {
    analysis
        .annotations
        .type_of(method_body(program, class, method).id)
}

#[test]
fn accepts_a_well_typed_program() {
    let source = r#"
class Main {
  io: IO <- new IO;
  main(): Object { io.out_string("hello") };
};
"#;
    let (program, analysis) = check(source);
    assert!(analysis.diagnostics.is_empty(), "{:?}", kinds(&analysis));
    assert_eq!(body_type(&program, &analysis, "Main", "main"), Some("IO"));

    let mut compiler = Compiler::new(CompileOptions::default());
    assert!(compiler.compile(&SourceFile::from_text(source)).is_ok());
}

#[test]
fn compile_fails_on_semantic_errors_but_keeps_diagnostics() {
    let mut compiler = Compiler::new(CompileOptions::default());
    let result = compiler.compile(&SourceFile::from_text(
        "class Main { main(): Int { \"a\" + 1 }; };",
    ));
    let error = result.expect_err("type errors should fail compilation");
    assert_eq!(error.to_string(), "Semantic analysis failed");
    assert_eq!(
        compiler.diagnostics().count_of(DiagnosticKind::TypeMismatch),
        1
    );
}

#[test]
fn boolean_operand_is_coerced_in_arithmetic() {
    let (program, analysis) = check("class Main { main(): Int { true + 1 }; };");
    assert!(analysis.diagnostics.is_empty());
    assert_eq!(body_type(&program, &analysis, "Main", "main"), Some("Int"));
}

#[test]
fn only_one_boolean_operand_is_coerced() {
    let (_, analysis) = check("class Main { main(): Int { true + false }; };");
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::TypeMismatch]);
}

#[test]
fn string_arithmetic_names_both_types() {
    let (program, analysis) = check("class Main { main(): Int { \"a\" + 1 }; };");
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::TypeMismatch]);
    let message = &analysis.diagnostics.entries()[0].message;
    assert!(message.contains("String") && message.contains("Int"), "{message}");

    let body = method_body(&program, "Main", "main");
    let annotation = analysis.annotations.get(body.id).expect("annotated");
    assert!(annotation.has_error);
    assert_eq!(annotation.ty.as_deref(), Some("Int"));
    let ExpressionKind::Binary(binary) = &body.kind else {
        panic!("expected a binary expression");
    };
    let left = analysis.annotations.get(binary.left.id).expect("annotated");
    assert!(!left.has_error);
}

#[test]
fn missing_main_is_reported_once() {
    let (program, analysis) = check("class Foo { x: Int <- 1; };");
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::InvalidProgramEntry]);

    let Feature::Attribute(attribute) = &program.classes[0].features[0] else {
        panic!("expected an attribute");
    };
    let initializer = attribute.initializer.as_ref().expect("initializer");
    assert_eq!(analysis.annotations.type_of(initializer.id), Some("Int"));
}

#[test]
fn main_with_a_parent_is_still_checked() {
    let source = r#"
class Main inherits IO {
  main(): Object { out_string(1) };
};
"#;
    let (program, analysis) = check(source);
    assert_eq!(
        analysis.diagnostics.count_of(DiagnosticKind::InvalidProgramEntry),
        1
    );
    assert_eq!(analysis.diagnostics.count_of(DiagnosticKind::TypeMismatch), 1);
    assert_eq!(body_type(&program, &analysis, "Main", "main"), Some("Main"));
}

#[test]
fn arity_mismatch_keeps_the_declared_return_type() {
    let source = r#"
class Main {
  add(a: Int, b: Int): Int { a + b };
  main(): Int { add(1) };
};
"#;
    let (program, analysis) = check(source);
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::ArityMismatch]);
    assert_eq!(body_type(&program, &analysis, "Main", "main"), Some("Int"));
}

#[test]
fn conditional_joins_branch_types() {
    let (program, analysis) =
        check("class Main { main(): Object { if 1 then 2 else \"x\" fi }; };");
    assert!(analysis.diagnostics.is_empty());
    assert_eq!(body_type(&program, &analysis, "Main", "main"), Some(OBJECT));

    let source = r#"
class A {};
class B inherits A {};
class C inherits A {};
class Main { main(): A { if true then new B else new C fi }; };
"#;
    let (program, analysis) = check(source);
    assert!(analysis.diagnostics.is_empty(), "{:?}", kinds(&analysis));
    assert_eq!(body_type(&program, &analysis, "Main", "main"), Some("A"));
}

#[test]
fn undeclared_identifier_has_no_type() {
    let (program, analysis) = check("class Main { main(): Int { y }; };");
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::UndefinedSymbol]);
    assert_eq!(body_type(&program, &analysis, "Main", "main"), None);
}

#[test]
fn unresolved_receiver_causes_no_follow_on_errors() {
    let (program, analysis) = check("class Main { main(): Int { y.foo() + 1 }; };");
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::UndefinedSymbol]);
    assert_eq!(body_type(&program, &analysis, "Main", "main"), Some("Int"));
}

#[test]
fn forward_parent_references_resolve() {
    let source = r#"
class Main { main(): Int { (new B).value() }; };
class B inherits A {};
class A { value(): Int { 1 }; };
"#;
    let (program, analysis) = check(source);
    assert!(analysis.diagnostics.is_empty(), "{:?}", kinds(&analysis));
    assert_eq!(body_type(&program, &analysis, "Main", "main"), Some("Int"));
    assert!(analysis.types.is_subtype("B", "A"));
}

#[test]
fn inheritance_cycles_are_broken_at_the_root() {
    let source = r#"
class Main { main(): Int { 1 }; };
class A inherits B {};
class B inherits A {};
"#;
    let (_, analysis) = check(source);
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::InheritanceCycle]);
    assert!(analysis.types.is_subtype("A", OBJECT));
    assert!(analysis.types.is_subtype("B", OBJECT));
}

#[test]
fn unknown_parent_falls_back_to_object() {
    let source = r#"
class Main { main(): Int { 1 }; };
class Foo inherits Bar {};
"#;
    let (_, analysis) = check(source);
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::UnknownParentClass]);
    assert_eq!(analysis.types.parent_of("Foo"), Some(OBJECT));
}

#[test]
fn duplicate_and_builtin_class_names_are_rejected() {
    let source = r#"
class Main { main(): Int { 1 }; };
class Main { other(): Int { 2 }; };
class Int {};
"#;
    let (_, analysis) = check(source);
    assert_eq!(
        kinds(&analysis),
        vec![DiagnosticKind::DuplicateClass, DiagnosticKind::DuplicateClass]
    );
    assert!(analysis.scopes.find_method("Main", "other").is_none());
    assert!(analysis.scopes.find_method("Main", "main").is_some());
}

#[test]
fn duplicate_features_and_formals_are_rejected() {
    let source = r#"
class Main {
  x: Int;
  x: String;
  f(a: Int, a: Int): Int { a };
  main(): Int { 1 };
};
"#;
    let (_, analysis) = check(source);
    assert_eq!(
        kinds(&analysis),
        vec![DiagnosticKind::DuplicateSymbol, DiagnosticKind::DuplicateSymbol]
    );
}

#[test]
fn undefined_methods_are_reported() {
    let source = r#"
class Main {
  main(): Object { { missing(); (new Main).absent(1); } };
};
"#;
    let (_, analysis) = check(source);
    assert_eq!(
        kinds(&analysis),
        vec![DiagnosticKind::UndefinedMethod, DiagnosticKind::UndefinedMethod]
    );
}

#[test]
fn static_dispatch_requires_an_ancestor() {
    let source = r#"
class A { f(): Int { 1 }; };
class B { f(): Int { 2 }; };
class C inherits A {};
class Main {
  main(): Int { (new A)@B.f() };
  ok(): Int { (new C)@A.f() };
};
"#;
    let (_, analysis) = check(source);
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::StaticDispatchViolation]);
}

#[test]
fn incomparable_operands_yield_object() {
    let (program, analysis) = check("class Main { main(): Object { 1 < \"a\" }; };");
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::IncomparableTypes]);
    assert_eq!(body_type(&program, &analysis, "Main", "main"), Some(OBJECT));
}

#[test]
fn unary_and_condition_operands_are_validated() {
    let source = r#"
class Main {
  main(): Object {
    {
      ~"a";
      not 1;
      while "x" loop 1 pool;
      if isvoid 3 then 1 else 2 fi;
    }
  };
};
"#;
    let (_, analysis) = check(source);
    assert_eq!(
        kinds(&analysis),
        vec![DiagnosticKind::InvalidOperandType; 3]
    );
}

#[test]
fn let_initializers_are_checked_before_the_binding_is_visible() {
    let (program, analysis) = check("class Main { main(): Int { let x: Int <- \"a\" in x }; };");
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::TypeMismatch]);
    assert_eq!(body_type(&program, &analysis, "Main", "main"), Some("Int"));

    let (_, analysis) = check("class Main { main(): Int { let x: Int <- x in x }; };");
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::UndefinedSymbol]);

    let (program, analysis) =
        check("class Main { main(): String { let x: Int <- 1 in let x: String <- \"s\" in x }; };");
    assert!(analysis.diagnostics.is_empty());
    assert_eq!(body_type(&program, &analysis, "Main", "main"), Some("String"));
}

#[test]
fn assignments_check_targets_and_values() {
    let source = r#"
class Main {
  count: Int;
  main(): Object { { count <- "s"; z <- 1; } };
};
"#;
    let (program, analysis) = check(source);
    assert_eq!(
        kinds(&analysis),
        vec![DiagnosticKind::TypeMismatch, DiagnosticKind::UndefinedSymbol]
    );
    assert_eq!(body_type(&program, &analysis, "Main", "main"), Some("Int"));
}

#[test]
fn return_type_must_conform() {
    let (_, analysis) = check("class Main { main(): Int { \"text\" }; };");
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::TypeMismatch]);
}

#[test]
fn self_type_methods_return_the_receiver_type() {
    let source = r#"
class A { me(): SELF_TYPE { self }; };
class B inherits A {};
class Main {
  main(): B { (new B).me() };
  cloned(): B { (new B).copy() };
  fresh(): Main { new SELF_TYPE };
};
"#;
    let (program, analysis) = check(source);
    assert!(analysis.diagnostics.is_empty(), "{:?}", kinds(&analysis));
    assert_eq!(body_type(&program, &analysis, "Main", "main"), Some("B"));
    assert_eq!(body_type(&program, &analysis, "Main", "cloned"), Some("B"));
    assert_eq!(body_type(&program, &analysis, "A", "me"), Some("A"));
}

#[test]
fn builtin_string_methods_chain() {
    let (program, analysis) =
        check("class Main { main(): Int { \"abc\".substr(0, 1).concat(\"d\").length() }; };");
    assert!(analysis.diagnostics.is_empty(), "{:?}", kinds(&analysis));
    assert_eq!(body_type(&program, &analysis, "Main", "main"), Some("Int"));
}

#[test]
fn inherited_attributes_are_visible() {
    let source = r#"
class Counter { count: Int <- 0; };
class Main inherits Counter { main(): Int { count + 1 }; };
"#;
    let (_, analysis) = check(source);
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::InvalidProgramEntry]);
}

#[test]
fn every_expression_is_annotated_once_and_scopes_balance() {
    let source = r#"
class Main {
  total: Int <- 0;
  main(): Object {
    let i: Int <- 0 in {
      while i < 3 loop { total <- total + i; i <- i + 1; } pool;
      if total = 3 then "yes" else missing fi;
    }
  };
};
"#;
    let (program, analysis) = check(source);
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::UndefinedSymbol]);
    assert_eq!(analysis.annotations.len(), program.expression_count);
    assert_eq!(analysis.scopes.current(), analysis.scopes.root());
}

#[test]
fn checking_a_node_twice_reports_once() {
    let program = parse("class Main { main(): Int { \"a\" + 1 }; };");
    let mut checker = SemanticChecker::new();
    checker.check_program(&program);
    let before = checker.diagnostics().len();
    let annotated = checker.annotations().len();

    let body = method_body(&program, "Main", "main");
    assert_eq!(checker.check_expression(body).as_deref(), Some("Int"));
    assert_eq!(checker.diagnostics().len(), before);
    assert_eq!(checker.annotations().len(), annotated);
}

#[test]
fn every_bad_dispatch_argument_is_reported() {
    let source = r#"
class Main {
  g(a: Int, b: String): Int { a };
  main(): Int { (new Main).g("x", 2) };
  unqualified(): Int { g("x", 2) };
  qualified(): Int { (new Main)@Main.g("x", 2) };
};
"#;
    let (program, analysis) = check(source);
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::TypeMismatch; 6]);
    let messages: Vec<&str> = analysis
        .diagnostics
        .entries()
        .iter()
        .map(|diagnostic| diagnostic.message.as_str())
        .collect();
    assert!(messages[0].contains("'Int'") && messages[0].contains("'String'"));
    assert!(messages[1].contains("'String'") && messages[1].contains("'Int'"));

    for method in ["main", "unqualified", "qualified"] {
        let body = method_body(&program, "Main", method);
        let annotation = analysis.annotations.get(body.id).expect("annotated");
        assert!(annotation.has_error, "{method}");
        assert_eq!(annotation.ty.as_deref(), Some("Int"), "{method}");
    }
}

#[test]
fn attribute_initializers_must_conform() {
    let source = r#"
class A {};
class B inherits A {};
class Main {
  x: Int <- "s";
  a: A <- new B;
  main(): Int { 1 };
};
"#;
    let (program, analysis) = check(source);
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::TypeMismatch]);
    assert!(analysis.diagnostics.entries()[0].message.contains("'x'"));

    let main = program
        .classes
        .iter()
        .find(|declaration| declaration.name == "Main")
        .expect("Main class");
    let initializer_type = |index: usize| {
        let Feature::Attribute(attribute) = &main.features[index] else {
            panic!("expected an attribute");
        };
        let initializer = attribute.initializer.as_ref().expect("initializer");
        analysis.annotations.type_of(initializer.id)
    };
    assert_eq!(initializer_type(0), Some("String"));
    assert_eq!(initializer_type(1), Some("B"));
}

#[test]
fn let_cannot_rebind_self() {
    let source = "class Main { main(): Object { let self: Int <- 1 in self }; };";
    let (program, analysis) = check(source);
    assert_eq!(kinds(&analysis), vec![DiagnosticKind::DuplicateSymbol]);
    assert!(
        analysis.diagnostics.entries()[0]
            .message
            .contains("let binding 'self'"),
        "{:?}",
        analysis.diagnostics.entries()
    );

    let body = method_body(&program, "Main", "main");
    let ExpressionKind::Let(let_expr) = &body.kind else {
        panic!("expected a let expression");
    };
    assert_eq!(analysis.annotations.type_of(let_expr.body.id), Some("Main"));
    let initializer = let_expr.bindings[0].initializer.as_ref().expect("initializer");
    assert_eq!(analysis.annotations.type_of(initializer.id), Some("Int"));
    assert!(analysis.annotations.get(body.id).expect("annotated").has_error);
    assert_eq!(analysis.scopes.current(), analysis.scopes.root());
}
