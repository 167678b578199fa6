#![no_main]

use libfuzzer_sys::fuzz_target;

use wati::runtime::{Config, Interpreter};
use wati::wat;

fuzz_target!(|data: &[u8]| {
    let source = String::from_utf8_lossy(data);
    let module = match wat::parse_str(&source) {
        Ok(m) => m,
        Err(_) => return,
    };
    if module.memories.iter().any(|m| m.pages > 16) {
        return;
    }

    // Validation is optional for the interpreter, so run unvalidated modules
    // too. Fuel and a shallow call limit keep every run short.
    let config = Config::new()
        .with_fuel(Some(10_000))
        .with_max_call_depth(64)
        .with_log(std::io::sink());
    let mut interpreter = match Interpreter::new(&module, config) {
        Ok(i) => i,
        Err(_) => return,
    };

    for (position, func) in module.functions.iter().enumerate() {
        let args = vec![1; func.params.len()];
        let _ = interpreter.execute_function(&position.to_string(), &args);
    }
});
