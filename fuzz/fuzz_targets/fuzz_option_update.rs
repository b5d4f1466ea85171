//! Fuzz target: option update validation
//!
//! Input is read as `key=value&key=value` text.  Checks that:
//! - validation never panics on arbitrary keys and values
//! - a rejected update leaves the options untouched
//! - an accepted update leaves every option in range
//!
//! cargo fuzz run fuzz_option_update

#![no_main]

use garagectl::config::Options;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let pairs: Vec<(&str, &str)> = text
        .split('&')
        .filter_map(|kv| kv.split_once('='))
        .collect();

    let mut options = Options::default();
    let before = options.clone();
    match options.validate_update(&pairs) {
        Ok(update) => {
            options.apply(update);
            assert!(options.is_well_formed());
        }
        Err(_) => assert_eq!(options, before),
    }
});
