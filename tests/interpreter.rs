use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::resolver::Resolver;
use rox::scanner::Scanner;

/// Run a whole program through the full pipeline, capturing stdout and the
/// runtime error, if any.
fn run(source: &str) -> (String, Option<String>) {
    let tokens = Scanner::new(source.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("source should scan cleanly");

    let statements = Parser::new(tokens)
        .parse_program()
        .expect("source should parse");

    let mut interpreter = Interpreter::new();
    Resolver::new(&mut interpreter)
        .resolve(&statements)
        .expect("source should resolve");

    let mut out = Vec::new();
    let error = interpreter
        .interpret(&statements, &mut out)
        .err()
        .map(|e| e.to_string());

    (String::from_utf8(out).expect("output should be UTF-8"), error)
}

fn run_ok(source: &str) -> String {
    let (out, error) = run(source);
    assert_eq!(error, None, "unexpected runtime error (stdout: {:?})", out);
    out
}

fn run_err(source: &str) -> String {
    run(source).1.expect("program should raise a runtime error")
}

/// The `evaluate` command path: a single expression, no resolver.
fn eval(source: &str) -> String {
    let tokens = Scanner::new(source.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("source should scan cleanly");

    let expr = Parser::new(tokens)
        .parse_expression()
        .expect("source should parse");

    let mut out = Vec::new();
    Interpreter::new()
        .evaluate_expression(&expr, &mut out)
        .expect("expression should evaluate")
        .to_string()
}

// ─────────────────────────────────────────────────────────────────────────
// Expressions and values
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn arithmetic_precedence() {
    assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
}

#[test]
fn number_formatting() {
    assert_eq!(run_ok("print 3.14;"), "3.14\n");
    assert_eq!(run_ok("print 10.0;"), "10\n");
    assert_eq!(run_ok("print -0.5;"), "-0.5\n");
    assert_eq!(run_ok("print 2 / 3;"), "0.6666666666666666\n");
}

#[test]
fn division_by_zero_follows_ieee754() {
    assert_eq!(run_ok("print 1 / 0;"), "inf\n");
    assert_eq!(run_ok("print -1 / 0;"), "-inf\n");
    // NaN compares unequal to itself.
    assert_eq!(run_ok("print 0 / 0 == 0 / 0;"), "false\n");
}

#[test]
fn string_concatenation() {
    assert_eq!(run_ok("print \"foo\" + \"bar\";"), "foobar\n");
}

#[test]
fn truthiness() {
    // Only nil and false are falsey; 0 and "" are truthy.
    assert_eq!(run_ok("if (0) print \"t\"; else print \"f\";"), "t\n");
    assert_eq!(run_ok("if (\"\") print \"t\"; else print \"f\";"), "t\n");
    assert_eq!(run_ok("if (nil) print \"t\"; else print \"f\";"), "f\n");
    assert_eq!(run_ok("if (false) print \"t\"; else print \"f\";"), "f\n");
    assert_eq!(run_ok("print !nil;"), "true\n");
}

#[test]
fn logical_operators_return_operand_values() {
    assert_eq!(run_ok("print \"hi\" or 2;"), "hi\n");
    assert_eq!(run_ok("print nil or \"yes\";"), "yes\n");
    assert_eq!(run_ok("print nil and 1;"), "nil\n");
    assert_eq!(run_ok("print 1 and 2;"), "2\n");
}

#[test]
fn logical_operators_short_circuit() {
    assert_eq!(
        run_ok("fun boom() { print \"boom\"; } true or boom(); false and boom();"),
        ""
    );
}

#[test]
fn equality_is_structural_for_primitives() {
    assert_eq!(run_ok("print 1 == 1;"), "true\n");
    assert_eq!(run_ok("print \"a\" == \"a\";"), "true\n");
    assert_eq!(run_ok("print nil == nil;"), "true\n");
    assert_eq!(run_ok("print 1 == \"1\";"), "false\n");
    assert_eq!(run_ok("print nil == false;"), "false\n");
}

#[test]
fn assignment_yields_the_assigned_value() {
    assert_eq!(run_ok("var x; print x = 3;"), "3\n");
}

#[test]
fn evaluate_single_expression() {
    assert_eq!(eval("1 + 2 * 3"), "7");
    assert_eq!(eval("\"a\" + \"b\""), "ab");
    assert_eq!(eval("!nil"), "true");
    assert_eq!(eval("echo(42)"), "42");
}

// ─────────────────────────────────────────────────────────────────────────
// Runtime errors
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn adding_string_and_number_fails() {
    assert_eq!(
        run_err("print \"a\" + 1;"),
        "Operands must be two numbers or two strings.\n[line 1]"
    );
}

#[test]
fn comparison_requires_numbers() {
    assert_eq!(run_err("print 1 < \"2\";"), "Operands must be numbers.\n[line 1]");
}

#[test]
fn unary_minus_requires_a_number() {
    assert_eq!(run_err("print -\"a\";"), "Operand must be a number.\n[line 1]");
}

#[test]
fn undefined_variable() {
    assert_eq!(run_err("print x;"), "Undefined variable 'x'.\n[line 1]");
}

#[test]
fn undefined_assignment_target() {
    assert_eq!(run_err("x = 1;"), "Undefined variable 'x'.\n[line 1]");
}

#[test]
fn runtime_error_carries_the_offending_line() {
    assert_eq!(
        run_err("var a = 1;\nvar b = 2;\nprint a + \"s\";"),
        "Operands must be two numbers or two strings.\n[line 3]"
    );
}

#[test]
fn output_before_a_runtime_error_is_kept() {
    let (out, error) = run("print 1;\nprint \"a\" + 1;");
    assert_eq!(out, "1\n");
    assert!(error.is_some());
}

#[test]
fn calling_a_non_callable_fails() {
    assert_eq!(
        run_err("\"not a fn\"();"),
        "Can only call functions and classes.\n[line 1]"
    );
}

#[test]
fn arity_mismatch() {
    assert_eq!(
        run_err("fun f(a, b) {} f(1);"),
        "Expected 2 arguments but got 1.\n[line 1]"
    );
}

// ─────────────────────────────────────────────────────────────────────────
// Variables, scopes, control flow
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn uninitialized_variable_is_nil() {
    assert_eq!(run_ok("var x; print x;"), "nil\n");
}

#[test]
fn blocks_shadow_and_restore() {
    assert_eq!(
        run_ok("var a = \"outer\"; { var a = \"inner\"; print a; } print a;"),
        "inner\nouter\n"
    );
}

#[test]
fn while_loop() {
    assert_eq!(
        run_ok("var i = 0; var sum = 0; while (i < 5) { sum = sum + i; i = i + 1; } print sum;"),
        "10\n"
    );
}

#[test]
fn for_loop() {
    assert_eq!(run_ok("for (var i = 0; i < 3; i = i + 1) print i;"), "0\n1\n2\n");
}

#[test]
fn for_loop_without_increment() {
    assert_eq!(
        run_ok("var i = 0; for (; i < 2;) { print i; i = i + 1; }"),
        "0\n1\n"
    );
}

// ─────────────────────────────────────────────────────────────────────────
// Functions and closures
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn function_values_print_by_name() {
    assert_eq!(run_ok("fun f() {} print f;"), "<fn f>\n");
    assert_eq!(run_ok("print clock;"), "<native fn clock>\n");
}

#[test]
fn falling_off_a_function_returns_nil() {
    assert_eq!(run_ok("fun f() {} print f();"), "nil\n");
    assert_eq!(run_ok("fun f() { return; } print f();"), "nil\n");
}

#[test]
fn return_unwinds_through_nested_blocks_and_loops() {
    assert_eq!(
        run_ok(
            "fun f() { while (true) { { return \"done\"; } } print \"unreachable\"; } print f();"
        ),
        "done\n"
    );
}

#[test]
fn recursion() {
    assert_eq!(
        run_ok("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);"),
        "55\n"
    );
}

#[test]
fn closure_captures_its_defining_scope() {
    assert_eq!(
        run_ok(
            "fun make() { var i = 0; fun inc() { i = i + 1; return i; } return inc; }\n\
             var c = make(); print c(); print c(); print c();"
        ),
        "1\n2\n3\n"
    );
}

#[test]
fn closures_share_a_captured_environment() {
    assert_eq!(
        run_ok(
            "var inc; var get;\n\
             fun setup() {\n\
               var n = 0;\n\
               fun i() { n = n + 1; }\n\
               fun g() { return n; }\n\
               inc = i; get = g;\n\
             }\n\
             setup(); inc(); inc(); print get();"
        ),
        "2\n"
    );
}

#[test]
fn resolver_disambiguates_shadowing() {
    // Both calls observe the binding active when `show` was declared.
    assert_eq!(
        run_ok(
            "var a = \"global\";\n\
             { fun show() { print a; } show(); var a = \"local\"; show(); }"
        ),
        "global\nglobal\n"
    );
}

#[test]
fn free_variables_bind_to_the_defining_scope_not_the_caller() {
    assert_eq!(
        run_ok(
            "var x = \"captured\";\n\
             fun f() { print x; }\n\
             fun g() { var x = \"caller\"; f(); }\n\
             g();"
        ),
        "captured\n"
    );
}

#[test]
fn natives() {
    assert_eq!(run_ok("print echo(\"back\");"), "back\n");
    assert_eq!(run_ok("print echo(nil);"), "nil\n");
    // clock returns whole seconds since the epoch.
    assert_eq!(run_ok("var t = clock(); print t > 0; print t == echo(t);"), "true\ntrue\n");
    assert_eq!(run_err("clock(1);"), "Expected 0 arguments but got 1.\n[line 1]");
}

// ─────────────────────────────────────────────────────────────────────────
// Classes, instances, inheritance
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn class_and_instance_display() {
    assert_eq!(run_ok("class A {} print A; print A();"), "A\n<A instance>\n");
}

#[test]
fn fields_are_set_and_read() {
    assert_eq!(
        run_ok("class Box {} var b = Box(); b.value = 7; print b.value;"),
        "7\n"
    );
}

#[test]
fn methods_see_this() {
    assert_eq!(
        run_ok(
            "class Cake { taste() { print \"yum: \" + this.flavor; } }\n\
             var c = Cake(); c.flavor = \"chocolate\"; c.taste();"
        ),
        "yum: chocolate\n"
    );
}

#[test]
fn extracted_methods_stay_bound() {
    assert_eq!(
        run_ok(
            "class Speaker { speak() { print this.word; } }\n\
             var s = Speaker(); s.word = \"hi\";\n\
             var m = s.speak; m();"
        ),
        "hi\n"
    );
}

#[test]
fn extracting_twice_binds_the_same_instance() {
    assert_eq!(
        run_ok(
            "class C { me() { return this; } }\n\
             var c = C();\n\
             var m1 = c.me; var m2 = c.me;\n\
             print m1() == m2(); print m1() == c;"
        ),
        "true\ntrue\n"
    );
}

#[test]
fn initializer_runs_on_construction() {
    assert_eq!(
        run_ok("class P { init(n) { this.n = n; } } print P(4).n;"),
        "4\n"
    );
}

#[test]
fn initializer_always_returns_the_instance() {
    assert_eq!(
        run_ok(
            "class P { init() { this.n = 1; } }\n\
             var p = P();\n\
             print p.init() == p;"
        ),
        "true\n"
    );
}

#[test]
fn constructor_arity_comes_from_init() {
    assert_eq!(
        run_err("class P { init(a, b) {} } P(1);"),
        "Expected 2 arguments but got 1.\n[line 1]"
    );
    assert_eq!(run_err("class Q {} Q(1);"), "Expected 0 arguments but got 1.\n[line 1]");
}

#[test]
fn fields_shadow_methods() {
    assert_eq!(
        run_ok(
            "class C { f() { return \"method\"; } }\n\
             var c = C();\n\
             fun field() { return \"field\"; }\n\
             c.f = field;\n\
             print c.f();"
        ),
        "field\n"
    );
}

#[test]
fn undefined_property() {
    assert_eq!(
        run_err("class A {} print A().missing;"),
        "Undefined property 'missing'.\n[line 1]"
    );
}

#[test]
fn property_access_requires_an_instance() {
    assert_eq!(run_err("var a = 1; print a.b;"), "Only instances have properties.\n[line 1]");
    assert_eq!(run_err("var a = 1; a.b = 2;"), "Only instances have fields.\n[line 1]");
}

#[test]
fn two_variables_share_one_instance() {
    assert_eq!(
        run_ok(
            "class A {} var x = A(); var y = x;\n\
             y.n = 9; print x.n; print x == y;"
        ),
        "9\ntrue\n"
    );
}

#[test]
fn inherited_methods() {
    assert_eq!(
        run_ok(
            "class A { greet() { print \"hello\"; } }\n\
             class B < A {}\n\
             B().greet();"
        ),
        "hello\n"
    );
}

#[test]
fn super_calls_the_superclass_method() {
    assert_eq!(
        run_ok(
            "class A { greet() { print \"A\"; } }\n\
             class B < A { greet() { super.greet(); print \"B\"; } }\n\
             B().greet();"
        ),
        "A\nB\n"
    );
}

#[test]
fn super_dispatches_through_a_chain() {
    assert_eq!(
        run_ok(
            "class A { name() { return \"A\"; } }\n\
             class B < A {}\n\
             class C < B { name() { return super.name() + \"C\"; } }\n\
             print C().name();"
        ),
        "AC\n"
    );
}

#[test]
fn super_method_binds_this_to_the_subclass_instance() {
    assert_eq!(
        run_ok(
            "class A { who() { return this.tag; } }\n\
             class B < A { who() { return super.who(); } }\n\
             var b = B(); b.tag = \"b\"; print b.who();"
        ),
        "b\n"
    );
}

#[test]
fn inherited_initializer() {
    assert_eq!(
        run_ok(
            "class A { init(n) { this.n = n; } }\n\
             class B < A {}\n\
             print B(3).n;"
        ),
        "3\n"
    );
}

#[test]
fn superclass_must_be_a_class() {
    assert_eq!(
        run_err("var NotAClass = 1; class B < NotAClass {}"),
        "Superclass must be a class.\n[line 1]"
    );
}

#[test]
fn undefined_super_method() {
    assert_eq!(
        run_err(
            "class A {}\n\
             class B < A { f() { super.missing(); } }\n\
             B().f();"
        ),
        "Undefined property 'missing'.\n[line 2]"
    );
}
