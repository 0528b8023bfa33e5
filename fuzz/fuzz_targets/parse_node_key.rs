#![no_main]

use causeway_core::NodeKey;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(key) = text.parse::<NodeKey>() {
        // Display must round-trip through FromStr.
        let again: NodeKey = key.to_string().parse().expect("display form parses");
        assert_eq!(again, key);
    }
});
