//! Runs every `tests/fixtures/*.wat` module against the expectations in its
//! header comments:
//!
//! ```text
//! ;; assert_return: <function> <args…> => <i32 | none>
//! ;; assert_trap: <function> <args…> => <message substring>
//! ;; assert_invalid: <validation message>
//! ```
//!
//! Assertions run in file order on a single interpreter, so global and memory
//! state carries from one to the next.

mod common;

use std::fs;
use std::path::PathBuf;

use rstest::rstest;
use wati::runtime::{Config, Interpreter};
use wati::{validate, wat};

#[derive(Debug)]
enum Assertion {
    Return {
        function: String,
        args: Vec<i32>,
        expected: Option<i32>,
    },
    Trap {
        function: String,
        args: Vec<i32>,
        message: String,
    },
    Invalid(String),
}

fn parse_call(text: &str) -> (String, Vec<i32>) {
    let mut words = text.split_whitespace();
    let function = words.next().expect("assertion names a function").to_string();
    let args = words
        .map(|w| wat::parse_i32(w).unwrap_or_else(|| panic!("bad argument {:?}", w)))
        .collect();
    (function, args)
}

fn assertions(source: &str) -> Vec<Assertion> {
    source
        .lines()
        .filter_map(|line| line.trim().strip_prefix(";;"))
        .filter_map(|comment| {
            let (kind, rest) = comment.trim().split_once(':')?;
            let rest = rest.trim();
            let assertion = match kind {
                "assert_return" => {
                    let (call, expected) = rest.split_once("=>").expect("assert_return needs '=>'");
                    let (function, args) = parse_call(call);
                    let expected = match expected.trim() {
                        "none" => None,
                        value => Some(wat::parse_i32(value).expect("expected value is an i32")),
                    };
                    Assertion::Return {
                        function,
                        args,
                        expected,
                    }
                }
                "assert_trap" => {
                    let (call, message) = rest.split_once("=>").expect("assert_trap needs '=>'");
                    let (function, args) = parse_call(call);
                    Assertion::Trap {
                        function,
                        args,
                        message: message.trim().to_lowercase(),
                    }
                }
                "assert_invalid" => Assertion::Invalid(rest.to_string()),
                _ => return None,
            };
            Some(assertion)
        })
        .collect()
}

fn run_fixture(path: &PathBuf) {
    let source = fs::read_to_string(path).unwrap();
    let assertions = assertions(&source);
    assert!(!assertions.is_empty(), "{} has no assertions", path.display());

    let module = wat::parse_str(&source).unwrap_or_else(|e| panic!("{}: {}", path.display(), e));

    let expected_invalid: Vec<&String> = assertions
        .iter()
        .filter_map(|a| match a {
            Assertion::Invalid(message) => Some(message),
            _ => None,
        })
        .collect();
    match validate::validate(&module) {
        Ok(()) => assert!(
            expected_invalid.is_empty(),
            "{}: expected validation to fail",
            path.display()
        ),
        Err(errors) => {
            let reported: Vec<String> = errors.errors().iter().map(|e| e.to_string()).collect();
            let expected: Vec<String> = expected_invalid.into_iter().cloned().collect();
            assert_eq!(reported, expected, "{}", path.display());
            return;
        }
    }

    let config = Config::new().with_fuel(Some(1_000_000)).with_max_call_depth(200);
    let mut interpreter = Interpreter::new(&module, config).unwrap();

    for assertion in assertions {
        match assertion {
            Assertion::Return {
                function,
                args,
                expected,
            } => {
                let result = interpreter.execute_function(&function, &args);
                assert_eq!(
                    result,
                    Ok(expected),
                    "{}: {} {:?}",
                    path.display(),
                    function,
                    args
                );
            }
            Assertion::Trap {
                function,
                args,
                message,
            } => match interpreter.execute_function(&function, &args) {
                Err(e) => assert!(
                    e.to_string().to_lowercase().contains(&message),
                    "{}: {} {:?}: expected '{}', got '{}'",
                    path.display(),
                    function,
                    args,
                    message,
                    e
                ),
                Ok(value) => panic!(
                    "{}: {} {:?}: expected trap '{}', returned {:?}",
                    path.display(),
                    function,
                    args,
                    message,
                    value
                ),
            },
            Assertion::Invalid(_) => {}
        }
    }
}

#[rstest]
fn test_fixture(#[files("tests/fixtures/*.wat")] path: PathBuf) {
    run_fixture(&path);
}

#[rstest]
fn test_fixture_round_trip(#[files("tests/fixtures/*.wat")] path: PathBuf) {
    let source = fs::read_to_string(&path).unwrap();
    let module = wat::parse_str(&source).unwrap();
    let printed = module.to_string();
    let reparsed = wat::parse_str(&printed).unwrap_or_else(|e| panic!("{}\n{}", e, printed));
    assert_eq!(reparsed, module, "{}", path.display());
}

#[test]
fn log_fixture_output() {
    let source = r#"
        (module
          (func $countdown (param $n i32)
            (loop $l
              (call $log (local.get $n))
              (local.set $n (i32.sub (local.get $n) (i32.const 1)))
              (br_if $l (i32.gt_s (local.get $n) (i32.const 0))))))
    "#;
    let module = wat::parse_str(source).unwrap();
    validate::validate(&module).unwrap();
    let (config, log) = common::captured_config();
    let mut interpreter = Interpreter::new(&module, config).unwrap();
    assert_eq!(interpreter.execute_function("$countdown", &[3]), Ok(None));
    assert_eq!(log.contents(), "log: 3\nlog: 2\nlog: 1\n");
}
