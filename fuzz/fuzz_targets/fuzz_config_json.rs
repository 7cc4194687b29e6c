//! Fuzz target: `NodeConfig::from_json`
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use pirnode::config::NodeConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(cfg) = NodeConfig::from_json(data) {
        assert!(cfg.validate().is_ok());
        // Every accepted prefix yields well-formed topics.
        let topics = cfg.topics();
        assert!(topics.prealert_cmd.starts_with(cfg.topic_prefix.as_str()));
    }
});
