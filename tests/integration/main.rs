//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one area of the
//! controller against mock or simulated adapters.  Everything runs on
//! the host with no real hardware.

mod board_tests;
mod lifecycle_tests;
mod mock_hw;
mod pipeline_tests;
