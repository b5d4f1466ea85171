//! Fuzz target: door debounce
//!
//! Each input bit is one open/closed sample.  Checks that:
//! - `classify` of the register always agrees with `sample`
//! - a transition is never reported on two consecutive samples
//!
//! cargo fuzz run fuzz_door_history

#![no_main]

use garagectl::door::debounce::{classify, DoorHistory};
use garagectl::door::DoorEvent;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut history = DoorHistory::new();
    let mut previous = None;

    for byte in data {
        for bit in 0..8 {
            let event = history.sample(byte & (1 << bit) != 0);
            assert_eq!(event, classify(history.bits()));

            if event.is_transition() {
                assert!(
                    !previous.is_some_and(DoorEvent::is_transition),
                    "{event:?} right after another transition"
                );
            }
            previous = Some(event);
        }
    }
});
