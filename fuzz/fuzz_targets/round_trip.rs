#![no_main]

use libfuzzer_sys::fuzz_target;
use md_playground::{EquivalenceMode, Parser, SerializeConfig};

// A document rebuilt from its own rendering must render the same way again.
fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let config = SerializeConfig {
        equivalence: EquivalenceMode::Exact,
        prefer_raw_source: false,
    };
    let once = Parser::parse(&input).serialize_with_config(&config);
    let twice = Parser::parse(&once).serialize_with_config(&config);
    assert_eq!(once, twice);
});
