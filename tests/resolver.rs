use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::resolver::Resolver;
use rox::scanner::Scanner;

fn resolve_errors(source: &str) -> Vec<String> {
    let tokens = Scanner::new(source.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("source should scan cleanly");

    let statements = Parser::new(tokens)
        .parse_program()
        .expect("source should parse");

    let mut interpreter = Interpreter::new();

    match Resolver::new(&mut interpreter).resolve(&statements) {
        Ok(()) => Vec::new(),
        Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
    }
}

#[test]
fn duplicate_local_declaration_is_an_error() {
    assert_eq!(
        resolve_errors("{ var x = 1; var x = 2; }"),
        vec!["[line 1] Error at 'x': Already a variable with this name in this scope."]
    );
}

#[test]
fn duplicate_top_level_declaration_is_legal() {
    assert_eq!(
        resolve_errors("var x = 1; var x = 2;"),
        Vec::<String>::new()
    );
}

#[test]
fn duplicate_parameter_is_an_error() {
    assert_eq!(
        resolve_errors("fun f(a, a) {}"),
        vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
    );
}

#[test]
fn reading_a_local_in_its_own_initializer_is_an_error() {
    assert_eq!(
        resolve_errors("{ var a = a; }"),
        vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
    );
}

#[test]
fn top_level_return_is_an_error() {
    assert_eq!(
        resolve_errors("return 1;"),
        vec!["[line 1] Error at 'return': Can't return from top-level code."]
    );
}

#[test]
fn return_inside_a_function_is_legal() {
    assert_eq!(
        resolve_errors("fun f() { return 1; }"),
        Vec::<String>::new()
    );
}

#[test]
fn returning_a_value_from_an_initializer_is_an_error() {
    assert_eq!(
        resolve_errors("class A { init() { return 1; } }"),
        vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
    );
}

#[test]
fn bare_return_in_an_initializer_is_legal() {
    assert_eq!(
        resolve_errors("class A { init() { return; } }"),
        Vec::<String>::new()
    );
}

#[test]
fn this_outside_a_class_is_an_error() {
    assert_eq!(
        resolve_errors("print this;"),
        vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
    );

    assert_eq!(
        resolve_errors("fun f() { return this; }"),
        vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
    );
}

#[test]
fn super_outside_a_class_is_an_error() {
    assert_eq!(
        resolve_errors("fun f() { super.g(); }"),
        vec!["[line 1] Error at 'super': Can't use 'super' outside of a class."]
    );
}

#[test]
fn super_without_a_superclass_is_an_error() {
    assert_eq!(
        resolve_errors("class A { f() { super.f(); } }"),
        vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
    );
}

#[test]
fn super_in_a_subclass_is_legal() {
    assert_eq!(
        resolve_errors("class A { f() {} } class B < A { f() { super.f(); } }"),
        Vec::<String>::new()
    );
}

#[test]
fn class_inheriting_from_itself_is_an_error() {
    assert_eq!(
        resolve_errors("class A < A {}"),
        vec!["[line 1] Error at 'A': A class can't inherit from itself."]
    );
}

#[test]
fn all_errors_are_collected() {
    let errors = resolve_errors("return 1;\nprint this;\n{ var x; var x; }");
    assert_eq!(errors.len(), 3);
    assert!(errors[0].contains("[line 1]"));
    assert!(errors[1].contains("[line 2]"));
    assert!(errors[2].contains("[line 3]"));
}
