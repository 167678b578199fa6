mod common;

use common::{captured_config, CapturedWriter};
use rstest::rstest;
use wati::ast::{Func, Index, Instruction, ValueType};
use wati::runtime::{Config, Interpreter, RuntimeError, Value};
use wati::validate::{validate, ValidationError};
use wati::{wat, Error};

fn interpret(source: &str, function: &str, args: &[i32]) -> (Result<Option<i32>, RuntimeError>, Vec<i32>) {
    let module = wat::parse_str(source).unwrap();
    let mut interpreter = Interpreter::new(&module, Config::new()).unwrap();
    let result = interpreter.execute_function(function, args);
    let stack = interpreter.stack().iter().map(Value::as_i32).collect();
    (result, stack)
}

#[test]
fn constant_function_through_export() {
    let source = r#"(module (func $f (result i32) (i32.const 42)) (export "f" (func $f)))"#;
    let module = wat::parse_str(source).unwrap();

    assert_eq!(
        module.functions,
        vec![Func {
            name: Some("$f".to_string()),
            results: vec![ValueType::I32],
            body: vec![Instruction::I32Const(42)],
            ..Func::default()
        }]
    );
    assert_eq!(module.exports.len(), 1);
    assert_eq!(module.exports[0].name, "f");
    assert_eq!(module.exports[0].func, Index::Named("$f".to_string()));

    assert!(validate(&module).is_ok());
    assert_eq!(wati::run(source, "f", &[]).unwrap(), Some(42));
    assert_eq!(wati::run(source, "$f", &[]).unwrap(), Some(42));
}

#[test]
fn dangling_export_fails_validation() {
    let source = r#"(module (func $f (result i32) (i32.const 42)) (export "g" (func $nope)))"#;
    let module = wat::parse_str(source).unwrap();
    let errors = validate(&module).unwrap_err();
    assert_eq!(
        errors.first(),
        Some(&ValidationError::UndefinedExport {
            export: "g".to_string(),
            func: "$nope".to_string(),
        })
    );
    assert!(matches!(wati::run(source, "$f", &[]), Err(Error::Validation(_))));
}

#[test]
fn bare_add_underflows_at_runtime_and_in_validation() {
    let source = "(module (func $f (i32.add)))";
    let (result, _) = interpret(source, "$f", &[]);
    assert_eq!(result, Err(RuntimeError::StackUnderflow));

    let module = wat::parse_str(source).unwrap();
    let errors = validate(&module).unwrap_err();
    assert!(matches!(
        errors.first(),
        Some(ValidationError::StackUnderflow { needed: 2, found: 0, .. })
    ));
}

#[test]
fn memory_name_without_sigil_fails_validation() {
    let module = wat::parse_str("(module (memory bad 1))").unwrap();
    let errors = validate(&module).unwrap_err();
    assert_eq!(
        errors.first(),
        Some(&ValidationError::MissingSigil {
            kind: "memory",
            name: "bad".to_string(),
        })
    );
}

#[test]
fn subtraction_leaves_difference() {
    let (result, stack) = interpret("(module (func $f i32.const 7 i32.const 3 i32.sub))", "$f", &[]);
    assert_eq!(result, Ok(None));
    assert_eq!(stack, vec![4]);
}

#[test]
fn local_round_trip() {
    let source = "(module (func $f (local $x i32) i32.const 5 local.set $x local.get $x))";
    let (result, stack) = interpret(source, "$f", &[]);
    assert_eq!(result, Ok(None));
    assert_eq!(stack, vec![5]);
}

#[rstest]
#[case("i32.add")]
#[case("i32.sub")]
#[case("i32.mul")]
#[case("i32.div_s")]
#[case("i32.ge_u")]
#[case("i32.gt_s")]
#[case("i32.lt_s")]
#[case("i32.lt_u")]
fn binary_op_needs_two_operands(#[case] op: &str) {
    for pushes in ["", "i32.const 1"] {
        let source = format!("(module (func $f {} {}))", pushes, op);
        let module = wat::parse_str(&source).unwrap();
        let errors = validate(&module).unwrap_err();
        assert!(
            matches!(errors.first(), Some(ValidationError::StackUnderflow { needed: 2, .. })),
            "{}: {}",
            source,
            errors
        );
    }
}

#[rstest]
#[case::add("i32.add", 7, 3, 10)]
#[case::add_wraps("i32.add", i32::MAX, 1, i32::MIN)]
#[case::sub("i32.sub", 3, 7, -4)]
#[case::mul_wraps("i32.mul", 0x10000, 0x10000, 0)]
#[case::div_truncates("i32.div_s", -7, 2, -3)]
#[case::div_overflow_wraps("i32.div_s", i32::MIN, -1, i32::MIN)]
#[case::ge_u_unsigned("i32.ge_u", -1, 1, 1)]
#[case::gt_s("i32.gt_s", -1, 1, 0)]
#[case::lt_s("i32.lt_s", -1, 1, 1)]
#[case::lt_u("i32.lt_u", -1, 1, 0)]
fn binary_semantics(#[case] op: &str, #[case] a: i32, #[case] b: i32, #[case] expected: i32) {
    let source = format!(
        "(module (func $f (param $a i32) (param $b i32) (result i32) ({} (local.get $a) (local.get $b))))",
        op
    );
    assert_eq!(wati::run(&source, "$f", &[a, b]).unwrap(), Some(expected));
}

#[rstest]
#[case(0, 32)]
#[case(1, 31)]
#[case(-1, 0)]
#[case(0x8000, 16)]
fn count_leading_zeros(#[case] input: i32, #[case] expected: i32) {
    let source = "(module (func $f (param i32) (result i32) local.get 0 i32.clz))";
    assert_eq!(wati::run(source, "$f", &[input]).unwrap(), Some(expected));
}

#[test]
fn print_then_reparse_is_identity() {
    let source = r#"
        (module
          (memory $m 2)
          (global $g (mut i32) (i32.const -1))
          (func $abs (export "abs") (param $x i32) (result i32)
            (if $neg (i32.lt_s (local.get $x) (i32.const 0))
              (then (return (i32.sub (i32.const 0) (local.get $x)))))
            local.get $x)
          (func $sum (param $n i32) (result i32) (local $acc i32)
            block $exit
              loop $top
                local.get $n
                i32.const 0
                i32.gt_s
                br_if 1
                local.get $acc
                local.get $n
                i32.add
                local.set $acc
                (local.set $n (i32.sub (local.get $n) (i32.const 1)))
                br $top
              end
            end
            local.get $acc)
          (export "sum" (func $sum)))
    "#;
    let module = wat::parse_str(source).unwrap();
    let printed = module.to_string();
    let tokens = wat::tokenize(&printed).unwrap();
    assert_eq!(wat::parse(&tokens).unwrap(), module);
}

#[test]
fn else_arm_runs_when_condition_is_zero() {
    let source = r#"
        (module
          (func $pick (param $c i32) (result i32)
            (if (local.get $c)
              (then (i32.const 10))
              (else (i32.const 20)))))
    "#;
    assert_eq!(wati::run(source, "$pick", &[1]).unwrap(), Some(10));
    assert_eq!(wati::run(source, "$pick", &[0]).unwrap(), Some(20));
}

#[test]
fn log_writes_to_configured_sink() {
    let source = r#"
        (module
          (func $main
            (call $log (i32.const 3))
            (call $log (i32.add (i32.const 40) (i32.const 2)))))
    "#;
    let (config, log) = captured_config();
    wati::run_with(source, "$main", &[], config).unwrap();
    assert_eq!(log.contents(), "log: 3\nlog: 42\n");
}

#[test]
fn trace_lists_executed_instructions() {
    let source = "(module (func $f (result i32) (i32.add (i32.const 1) (i32.const 2))))";
    let trace = CapturedWriter::new();
    let config = Config::new().with_trace(true).with_trace_sink(trace.clone());
    wati::run_with(source, "$f", &[], config).unwrap();

    let lines: Vec<String> = trace.contents().lines().map(str::to_string).collect();
    assert_eq!(lines, vec!["$f i32.const []", "$f i32.const [1]", "$f i32.add [1, 2]"]);
}

#[test]
fn infinite_loop_exhausts_fuel() {
    let source = "(module (func $spin (loop $l (br $l))))";
    let config = Config::new().with_fuel(Some(1_000));
    let result = wati::run_with(source, "$spin", &[], config);
    assert!(matches!(result, Err(Error::Runtime(RuntimeError::FuelExhausted))));
}

#[test]
fn unbounded_recursion_overflows_call_stack() {
    let source = "(module (func $down (call $down)))";
    let config = Config::new().with_max_call_depth(64);
    let result = wati::run_with(source, "$down", &[], config);
    assert!(matches!(result, Err(Error::Runtime(RuntimeError::CallStackOverflow))));
}

#[test]
fn default_depth_limit_stops_recursion_through_blocks() {
    let source = r#"
        (module
          (func $r (param $n i32) (result i32)
            (block
              (block
                (block
                  (if (i32.gt_s (local.get $n) (i32.const 0))
                    (then (return (call $r (i32.sub (local.get $n) (i32.const 1)))))))))
            (i32.const 0)))
    "#;
    let module = wat::parse_str(source).unwrap();
    let mut interpreter = Interpreter::new(&module, Config::new()).unwrap();
    assert_eq!(
        interpreter.execute_function("$r", &[100_000]),
        Err(RuntimeError::CallStackOverflow)
    );
    assert_eq!(interpreter.call_depth(), 0);
    assert_eq!(interpreter.execute_function("$r", &[10]), Ok(Some(0)));
}

#[test]
fn failed_call_restores_caller_state() {
    let source = r#"
        (module
          (func $div (param $d i32) (result i32)
            (i32.div_s (i32.const 12) (local.get $d)))
          (func $mid (param $d i32) (result i32)
            (i32.add (i32.const 1) (call $div (local.get $d))))
          (func $main (param $d i32) (result i32)
            (i32.const 5)
            (call $mid (local.get $d))
            i32.add))
    "#;
    let module = wat::parse_str(source).unwrap();
    let mut interpreter = Interpreter::new(&module, Config::new()).unwrap();

    assert_eq!(interpreter.execute_function("$main", &[0]), Err(RuntimeError::DivisionByZero));
    assert_eq!(interpreter.call_depth(), 0);
    assert_eq!(interpreter.stack(), &[Value::I32(5)]);

    assert_eq!(interpreter.execute_function("$main", &[4]), Ok(Some(9)));
    assert_eq!(interpreter.call_depth(), 0);
}

#[test]
fn block_comment_closes_at_first_terminator() {
    let source = "(module (; old (; note ;) (func $f (result i32) (i32.const 1)))";
    assert_eq!(wati::run(source, "$f", &[]).unwrap(), Some(1));
}

#[test]
fn argument_count_is_checked() {
    let source = "(module (func $f (param i32) (result i32) local.get 0))";
    let result = wati::run(source, "$f", &[]);
    assert!(matches!(
        result,
        Err(Error::Runtime(RuntimeError::ArgumentCount { expected: 1, actual: 0, .. }))
    ));
}

#[test]
fn globals_persist_across_calls() {
    let source = r#"
        (module
          (global $count (mut i32) (i32.const 0))
          (func $bump (result i32)
            (global.set $count (i32.add (global.get $count) (i32.const 1)))
            global.get $count))
    "#;
    let module = wat::parse_str(source).unwrap();
    let mut interpreter = Interpreter::new(&module, Config::new()).unwrap();
    assert_eq!(interpreter.execute_function("$bump", &[]), Ok(Some(1)));
    assert_eq!(interpreter.execute_function("$bump", &[]), Ok(Some(2)));
    assert_eq!(
        interpreter.global(&Index::Named("$count".to_string())),
        Ok(Value::I32(2))
    );
    assert_eq!(interpreter.call_depth(), 0);
}

#[test]
fn callee_does_not_see_caller_stack() {
    let source = r#"
        (module
          (func $peek (result i32) (i32.add))
          (func $main (result i32) (i32.const 1) (i32.const 2) (call $peek)))
    "#;
    let module = wat::parse_str(source).unwrap();
    let mut interpreter = Interpreter::new(&module, Config::new()).unwrap();
    assert_eq!(interpreter.execute_function("$main", &[]), Err(RuntimeError::StackUnderflow));
}

#[rstest]
#[case::undefined_function("(module (func $f (call $missing)))", RuntimeError::UndefinedFunction("$missing".to_string()))]
#[case::undefined_local("(module (func $f (local.get $x)))", RuntimeError::UndefinedLocal("$x".to_string()))]
#[case::undefined_global("(module (func $f (global.get $g)))", RuntimeError::UndefinedGlobal("$g".to_string()))]
#[case::undefined_label("(module (func $f (br $out)))", RuntimeError::UndefinedLabel("$out".to_string()))]
#[case::division_by_zero("(module (func $f (i32.div_s (i32.const 1) (i32.const 0))))", RuntimeError::DivisionByZero)]
#[case::no_memory(
    "(module (func $f (i32.load (i32.const 0))))",
    RuntimeError::OutOfBounds { address: 0, size: 4, len: 0 }
)]
#[case::past_the_end(
    "(module (memory 1) (func $f (i32.store (i32.const 65533) (i32.const 1))))",
    RuntimeError::OutOfBounds { address: 65533, size: 4, len: 65536 }
)]
fn runtime_errors(#[case] source: &str, #[case] expected: RuntimeError) {
    let (result, _) = interpret(source, "$f", &[]);
    assert_eq!(result, Err(expected));
}

#[rstest]
#[case::illegal_character("(module {)", "illegal character")]
#[case::unterminated_string("(module (export \"f", "unterminated string")]
#[case::unterminated_comment("(module (; never closed", "unterminated block comment")]
#[case::out_of_order("(module (func (result i32) (param i32)))", "declared after")]
#[case::missing_paren("(module (func $f", "expected")]
fn front_end_errors(#[case] source: &str, #[case] message: &str) {
    let error = wat::parse_str(source).unwrap_err();
    assert!(error.to_string().contains(message), "{}", error);
}

#[test]
fn validation_collects_every_violation() {
    let source = r#"
        (module
          (func $a (i32.add))
          (func $b (local x i32) (call $nowhere))
          (export "c" (func $c)))
    "#;
    let module = wat::parse_str(source).unwrap();
    let errors = validate(&module).unwrap_err();
    assert_eq!(errors.len(), 4, "{}", errors);
}
