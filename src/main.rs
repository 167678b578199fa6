//! Command-line driver: parse, validate and run a `.wat` file.

use std::env;
use std::fs;
use std::process;

use serde_json::json;
use wati::ast::Module;
use wati::runtime::{Config, Interpreter};
use wati::{validate, wat};

const USAGE: &str = "\
usage: wati <file.wat> [options]

options:
  --validate               validate only, do not run
  --no-validate            run without validating first
  --ast [debug|json|wat]   print the parsed module and exit (default: debug)
  --invoke <name>          function to run: $name, export name or position
                           (default: first export, else first function)
  --args \"1 2 3\"           i32 arguments for the function
  --output text|json|quiet how to report the result (default: text)
  --trace                  print each executed instruction to stderr
  --fuel <n>               instruction budget, 0 for unlimited";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AstFormat {
    Debug,
    Json,
    Wat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Text,
    Json,
    Quiet,
}

#[derive(Debug)]
struct Options {
    path: String,
    validate_only: bool,
    skip_validation: bool,
    ast: Option<AstFormat>,
    invoke: Option<String>,
    args: Vec<i32>,
    output: Output,
    trace: bool,
    fuel: Option<u64>,
}

fn main() {
    let options = match parse_args(env::args().skip(1).collect()) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{}\n\n{}", message, USAGE);
            process::exit(1);
        }
    };

    if let Err(message) = run(&options) {
        if options.output == Output::Json {
            println!("{}", json!({ "ok": false, "error": message }));
        } else {
            eprintln!("{}", message);
        }
        process::exit(1);
    }
}

fn parse_args(args: Vec<String>) -> Result<Options, String> {
    let mut path = None;
    let mut options = Options {
        path: String::new(),
        validate_only: false,
        skip_validation: false,
        ast: None,
        invoke: None,
        args: Vec::new(),
        output: Output::Text,
        trace: false,
        fuel: Some(wati::runtime::config::DEFAULT_FUEL),
    };

    let mut iter = args.into_iter().peekable();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--validate" => options.validate_only = true,
            "--no-validate" => options.skip_validation = true,
            "--trace" => options.trace = true,
            "--ast" => {
                let format = match iter.peek().map(String::as_str) {
                    Some("debug") => Some(AstFormat::Debug),
                    Some("json") => Some(AstFormat::Json),
                    Some("wat") => Some(AstFormat::Wat),
                    _ => None,
                };
                if format.is_some() {
                    iter.next();
                }
                options.ast = Some(format.unwrap_or(AstFormat::Debug));
            }
            "--invoke" => options.invoke = Some(value(&mut iter, "--invoke")?),
            "--args" => {
                let list = value(&mut iter, "--args")?;
                options.args = list
                    .split_whitespace()
                    .map(|a| wat::parse_i32(a).ok_or_else(|| format!("invalid i32 argument: {}", a)))
                    .collect::<Result<_, _>>()?;
            }
            "--output" => {
                options.output = match value(&mut iter, "--output")?.as_str() {
                    "text" => Output::Text,
                    "json" => Output::Json,
                    "quiet" => Output::Quiet,
                    other => return Err(format!("unknown output mode: {}", other)),
                }
            }
            "--fuel" => {
                let text = value(&mut iter, "--fuel")?;
                let fuel: u64 = text.parse().map_err(|_| format!("invalid fuel: {}", text))?;
                options.fuel = (fuel != 0).then_some(fuel);
            }
            "-h" | "--help" => return Err("wati: run WebAssembly text modules".to_string()),
            flag if flag.starts_with("--") => return Err(format!("unknown option: {}", flag)),
            _ if path.is_none() => path = Some(arg),
            _ => return Err(format!("unexpected argument: {}", arg)),
        }
    }

    if options.validate_only && options.skip_validation {
        return Err("--validate and --no-validate conflict".to_string());
    }
    options.path = path.ok_or("missing input file")?;
    Ok(options)
}

fn value(iter: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    iter.next().ok_or_else(|| format!("{} needs a value", flag))
}

fn run(options: &Options) -> Result<(), String> {
    let source = fs::read_to_string(&options.path).map_err(|e| format!("couldn't read {}: {}", options.path, e))?;
    let module = wat::parse_str(&source).map_err(|e| e.to_string())?;

    if let Some(format) = options.ast {
        return print_ast(&module, format);
    }

    if !options.skip_validation {
        validate::validate(&module).map_err(|e| wati::Error::from(e).to_string())?;
    }
    if options.validate_only {
        match options.output {
            Output::Text => println!("{}: valid", options.path),
            Output::Json => println!("{}", json!({ "ok": true, "valid": true })),
            Output::Quiet => {}
        }
        return Ok(());
    }

    let function = match &options.invoke {
        Some(name) => name.clone(),
        None => module
            .default_entry()
            .map(|position| position.to_string())
            .ok_or("module has no functions to run")?,
    };

    let config = Config::new().with_fuel(options.fuel).with_trace(options.trace);
    let mut interpreter = Interpreter::new(&module, config).map_err(|e| wati::Error::from(e).to_string())?;
    let result = interpreter
        .execute_function(&function, &options.args)
        .map_err(|e| wati::Error::from(e).to_string())?;

    match options.output {
        Output::Text => {
            if let Some(value) = result {
                println!("{}", value);
            }
        }
        Output::Json => println!(
            "{}",
            json!({
                "ok": true,
                "function": function,
                "result": result,
                "stack": interpreter.stack(),
            })
        ),
        Output::Quiet => {}
    }
    Ok(())
}

fn print_ast(module: &Module, format: AstFormat) -> Result<(), String> {
    match format {
        AstFormat::Debug => println!("{:#?}", module),
        AstFormat::Json => {
            let text = serde_json::to_string_pretty(module).map_err(|e| e.to_string())?;
            println!("{}", text);
        }
        AstFormat::Wat => println!("{}", module),
    }
    Ok(())
}
