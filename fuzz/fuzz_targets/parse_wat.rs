#![no_main]

use libfuzzer_sys::fuzz_target;

use wati::{validate, wat};

fuzz_target!(|data: &[u8]| {
    // Invalid UTF-8 becomes replacement characters, which the lexer rejects
    let source = String::from_utf8_lossy(data);

    // Errors are fine, panics are not
    if let Ok(module) = wat::parse_str(&source) {
        let _ = validate::validate(&module);
    }
});
