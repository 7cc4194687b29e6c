//! Fuzz target: pre-alert command payloads
//!
//! Payloads arrive from the broker unauthenticated. Verifies:
//! - `parse_prealert` never panics
//! - a parsed ttl is whole seconds, saturated at `u32::MAX`
//!
//! cargo fuzz run fuzz_prealert_command

#![no_main]

use libfuzzer_sys::fuzz_target;
use pirnode::app::commands::{parse_prealert, PrealertCommand};

fuzz_target!(|data: &[u8]| {
    if let Ok(PrealertCommand::Start { ttl_ms: Some(ttl) }) = parse_prealert(data) {
        assert!(ttl % 1000 == 0 || ttl == u32::MAX, "ttl {ttl} ms is not whole seconds");
    }
});
