#![no_main]

use libfuzzer_sys::fuzz_target;

use wati::wat;

fuzz_target!(|data: &[u8]| {
    let source = String::from_utf8_lossy(data);
    let module = match wat::parse_str(&source) {
        Ok(m) => m,
        Err(_) => return,
    };

    let printed = module.to_string();
    let reparsed = wat::parse_str(&printed).unwrap_or_else(|e| panic!("printed module does not parse: {}\n{}", e, printed));
    assert_eq!(reparsed, module, "printed module differs:\n{}", printed);
});
