//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host (x86_64) with no
//! real hardware required.

mod command_flow_tests;
mod mock_hw;
mod mqtt_flow_tests;
mod provisioning_flow_tests;
