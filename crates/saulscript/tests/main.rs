use std::{cell::RefCell, rc::Rc};

use pretty_assertions::assert_eq;
use saulscript::{Context, Error, Script, Value};

fn run(source: &str) -> Context {
    let mut ctx = Context::new();
    ctx.execute(source).unwrap();
    ctx
}

fn run_err(source: &str) -> Error {
    let mut ctx = Context::new();
    ctx.execute(source).unwrap_err()
}

#[test]
fn multiplication_binds_before_addition() {
    let ctx = run("x = 1 + 2 * 3\n");
    assert_eq!(ctx.get("x"), Some(&Value::from(7)));
}

#[test]
fn exponent_is_right_associative() {
    let ctx = run("x = 2 ** 3 ** 2\n");
    assert_eq!(ctx.get("x"), Some(&Value::from(512)));
}

#[test]
fn unary_minus_binds_like_exponent() {
    let ctx = run("x = -2 ** 2\n");
    assert_eq!(ctx.get("x"), Some(&Value::from(-4)));
}

#[test]
fn if_takes_the_then_branch() {
    let ctx = run("x = 0\nif 1 < 2\n  x = 10\nelse\n  x = 20\nend if\n");
    assert_eq!(ctx.get("x"), Some(&Value::from(10)));
}

#[test]
fn if_takes_the_else_branch() {
    let ctx = run("x = 0\nif 2 < 1\n  x = 10\nelse\n  x = 20\nend if\n");
    assert_eq!(ctx.get("x"), Some(&Value::from(20)));
}

#[test]
fn for_sums_a_list() {
    let ctx = run("t = 0\nfor i in [1,2,3,4]\n  t = t + i\nend for\n");
    assert_eq!(ctx.get("t"), Some(&Value::from(10)));
    // the loop variable is bound in the enclosing context and survives
    assert_eq!(ctx.get("i"), Some(&Value::from(4)));
}

#[test]
fn function_call_returns_a_value() {
    let ctx = run("adder = function(a,b){ return a + b }\nr = adder(40,2)\n");
    assert_eq!(ctx.get("r"), Some(&Value::from(42)));
}

#[test]
fn dot_notation_reads_a_member() {
    let ctx = run("d = { k: 5 }\nr = d.k\n");
    assert_eq!(ctx.get("r"), Some(&Value::from(5)));
}

#[test]
fn subscript_assignment_overwrites_a_member() {
    let ctx = run("d = { a: 1 }\nd[\"a\"] = 9\n");
    let Some(Value::Map(entries)) = ctx.get("d") else {
        panic!("expected a dictionary");
    };
    assert_eq!(entries.get("a"), Some(&Value::from(9)));
}

#[test]
fn subscript_assignment_inserts_a_missing_member() {
    let ctx = run("d = { a: 1 }\nd['b'] = 2\n");
    let Some(Value::Map(entries)) = ctx.get("d") else {
        panic!("expected a dictionary");
    };
    assert_eq!(entries.get("a"), Some(&Value::from(1)));
    assert_eq!(entries.get("b"), Some(&Value::from(2)));
}

#[test]
fn subscript_reads_lists_and_dictionaries() {
    let ctx = run("l = [10, 20, 30]\na = l[1]\nd = { k: 'v' }\nb = d['k']\n");
    assert_eq!(ctx.get("a"), Some(&Value::from(20)));
    assert_eq!(ctx.get("b"), Some(&Value::from("v")));
}

#[test]
fn list_subscript_assignment_replaces_in_range() {
    let ctx = run("l = [1, 2, 3]\nl[0] = 9\n");
    assert_eq!(
        ctx.get("l"),
        Some(&Value::List(vec![Value::from(9), Value::from(2), Value::from(3)]))
    );
}

#[test]
fn division_produces_fractions() {
    let ctx = run("x = 10 / 4\n");
    assert_eq!(ctx.get("x").unwrap().to_string(), "2.5");
}

#[test]
fn string_and_list_addition_concatenate() {
    let ctx = run("s = 'foo' + 'bar'\nl = [1] + [2, 3]\n");
    assert_eq!(ctx.get("s"), Some(&Value::from("foobar")));
    assert_eq!(
        ctx.get("l"),
        Some(&Value::List(vec![Value::from(1), Value::from(2), Value::from(3)]))
    );
}

#[test]
fn comparisons_cover_numbers_and_strings() {
    let ctx = run("a = 1 < 2\nb = 'x' < 'y'\nc = 2 >= 3\nd = 1.5 == 1.50\n");
    assert_eq!(ctx.get("a"), Some(&Value::Bool(true)));
    assert_eq!(ctx.get("b"), Some(&Value::Bool(true)));
    assert_eq!(ctx.get("c"), Some(&Value::Bool(false)));
    assert_eq!(ctx.get("d"), Some(&Value::Bool(true)));
}

#[test]
fn equality_across_types_is_false_not_an_error() {
    let ctx = run("x = 1 == 'one'\n");
    assert_eq!(ctx.get("x"), Some(&Value::Bool(false)));
}

#[test]
fn while_counts_down() {
    let ctx = run("n = 5\nwhile n > 0\n  n = n - 1\nend while\n");
    assert_eq!(ctx.get("n"), Some(&Value::from(0)));
}

#[test]
fn recursion_sees_the_callers_bindings() {
    let source = "fact = function(n) {\n  if n < 2\n    return 1\n  end if\n  return n * fact(n - 1)\n}\nr = fact(5)\n";
    let ctx = run(source);
    assert_eq!(ctx.get("r"), Some(&Value::from(120)));
}

#[test]
fn return_deep_inside_a_function_exits_it() {
    let source = "f = function(x) {\n  while true\n    if x > 1\n      return 'big'\n    end if\n    return 'small'\n  end while\n}\nr = f(5)\n";
    let ctx = run(source);
    assert_eq!(ctx.get("r"), Some(&Value::from("big")));
}

#[test]
fn callee_assignments_stay_local() {
    let source = "x = 1\nf = function() {\n  x = 99\n  return x\n}\nr = f()\n";
    let ctx = run(source);
    assert_eq!(ctx.get("x"), Some(&Value::from(1)));
    assert_eq!(ctx.get("r"), Some(&Value::from(99)));
}

#[test]
fn argument_expressions_see_caller_scope() {
    let source = "y = 40\nid = function(a) { return a }\nr = id(y + 2)\n";
    let ctx = run(source);
    assert_eq!(ctx.get("r"), Some(&Value::from(42)));
}

#[test]
fn function_without_return_yields_none() {
    let ctx = run("f = function() { x = 1 }\nr = f()\n");
    assert_eq!(ctx.get("r"), Some(&Value::None));
}

#[test]
fn bare_return_yields_none() {
    let ctx = run("f = function() { return\n}\nr = f()\n");
    assert_eq!(ctx.get("r"), Some(&Value::None));
}

#[test]
fn chained_assignment_binds_none_to_the_outer_name() {
    let ctx = run("x = y = 2\n");
    assert_eq!(ctx.get("y"), Some(&Value::from(2)));
    assert_eq!(ctx.get("x"), Some(&Value::None));
}

#[test]
fn top_level_return_lands_in_the_return_slot() {
    let ctx = run("x = 1\nreturn x + 41\n");
    assert_eq!(ctx.return_value(), &Value::from(42));
}

#[test]
fn statements_after_a_top_level_return_do_not_run() {
    let ctx = run("return 1\nx = 5\n");
    assert_eq!(ctx.return_value(), &Value::from(1));
    assert_eq!(ctx.get("x"), None);
}

#[test]
fn dictionary_keys_keep_insertion_order_and_overwrite() {
    let ctx = run("d = { a: 1\n      b: 2\n      a: 3 }\n");
    let Some(Value::Map(entries)) = ctx.get("d") else {
        panic!("expected a dictionary");
    };
    let keys: Vec<_> = entries.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["a", "b"]);
    assert_eq!(entries.get("a"), Some(&Value::from(3)));
}

#[test]
fn number_and_string_dictionary_keys_are_textual() {
    let ctx = run("d = { 1: 'one'\n      'two': 2 }\nr = d['1']\n");
    assert_eq!(ctx.get("r"), Some(&Value::from("one")));
}

#[test]
fn bound_values_are_visible_to_the_script() {
    let mut ctx = Context::new();
    ctx.bind_value("base", Value::from(40));
    ctx.execute("r = base + 2\n").unwrap();
    assert_eq!(ctx.get("r"), Some(&Value::from(42)));
}

#[test]
fn native_functions_receive_reduced_arguments() {
    let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let mut ctx = Context::new();
    ctx.bind_function("tell", move |args| {
        for arg in args {
            log.borrow_mut().push(arg.to_string());
        }
        Ok(Value::Bool(true))
    });
    ctx.execute("x = 20\ntell(x * 2 + 2, 'done')\n").unwrap();
    assert_eq!(*seen.borrow(), vec!["42".to_owned(), "done".to_owned()]);
}

#[test]
fn native_function_results_flow_back() {
    let mut ctx = Context::new();
    ctx.bind_function("double", |args| {
        let Some(Value::Number(n)) = args.first() else {
            return Err(Error::Runtime {
                line: 0,
                message: "double requires a number".to_owned(),
            });
        };
        Ok(Value::Number(n + n))
    });
    ctx.execute("r = double(21)\n").unwrap();
    assert_eq!(ctx.get("r"), Some(&Value::from(42)));
}

#[test]
fn a_compiled_script_can_run_repeatedly() {
    let script = Script::compile("x = 1 + 2\n").unwrap();

    let mut ctx = Context::new();
    script.run(&mut ctx).unwrap();
    assert_eq!(ctx.get("x"), Some(&Value::from(3)));

    let mut ctx = Context::new();
    script.run(&mut ctx).unwrap();
    assert_eq!(ctx.get("x"), Some(&Value::from(3)));
}

#[test]
fn execution_is_deterministic() {
    let source = "t = 0\nfor i in [1,2,3]\n  t = t + i * i\nend for\n";
    let a = run(source);
    let b = run(source);
    assert_eq!(a.get("t"), b.get("t"));
    assert_eq!(a.operations_counted(), b.operations_counted());
}

#[test]
fn unknown_variable_is_an_object_resolution_error() {
    let err = run_err("x = missing + 1\n");
    assert_eq!(
        err,
        Error::ObjectResolution {
            line: 1,
            name: "missing".to_owned(),
        }
    );
}

#[test]
fn missing_dot_member_is_an_object_resolution_error() {
    let err = run_err("d = { a: 1 }\nr = d.b\n");
    assert_eq!(
        err,
        Error::ObjectResolution {
            line: 2,
            name: "b".to_owned(),
        }
    );
}

#[test]
fn dot_on_a_non_dictionary_is_a_runtime_error() {
    let err = run_err("x = 5\nr = x.k\n");
    assert!(matches!(err, Error::Runtime { line: 2, .. }));
}

#[test]
fn invoking_a_non_callable_is_a_runtime_error() {
    let err = run_err("x = 5\nr = x(1)\n");
    assert!(matches!(err, Error::Runtime { line: 1, .. } | Error::Runtime { line: 2, .. }));
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let err = run_err("x = 1 / 0\n");
    assert!(matches!(err, Error::Runtime { line: 1, .. }));
}

#[test]
fn list_subscript_out_of_range_is_a_runtime_error() {
    let err = run_err("l = [1]\nx = l[5]\n");
    assert!(matches!(err, Error::Runtime { line: 2, .. }));
}

#[test]
fn for_over_a_non_list_is_a_runtime_error() {
    let err = run_err("for i in 5\nend for\n");
    assert!(matches!(err, Error::Runtime { line: 1, .. }));
}

#[test]
fn too_few_arguments_is_a_runtime_error() {
    let err = run_err("f = function(a, b) { return a }\nr = f(1)\n");
    let Error::Runtime { message, .. } = err else {
        panic!("expected a runtime error");
    };
    assert_eq!(message, "Not enough arguments supplied.");
}

#[test]
fn fractional_exponent_is_a_runtime_error() {
    let err = run_err("x = 2 ** 0.5\n");
    assert!(matches!(err, Error::Runtime { line: 1, .. }));
}

#[test]
fn final_context_displays_bindings() {
    let ctx = run("x = 7\ns = 'hi'\n");
    assert_eq!(ctx.to_string(), "{x = 7, s = 'hi'}");
}
