//! Fuzz target for labeling configuration compilation.
//!
//! This fuzzer feeds arbitrary text to the compiler and binder, checking
//! for panics, crashes, or hangs.

#![no_main]

use labelcraft::config::ElementRegistry;
use labelcraft::tree::ElementTree;
use libfuzzer_sys::fuzz_target;
use serde_json::json;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let task = json!({"items": [1, 2, 3], "text": "hello", "image": "a.png"});
    let _ = ElementTree::compile(text, Some(&task), &ElementRegistry::standard());
});
