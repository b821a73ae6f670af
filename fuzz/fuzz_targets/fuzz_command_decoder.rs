//! Fuzz target: `decode_command`
//!
//! Drives arbitrary MQTT payloads into the command decoder and asserts
//! that it never panics and that every accepted command names a usable
//! actuator line.
//!
//! cargo fuzz run fuzz_command_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use lockerbox::app::commands::AppCommand;
use lockerbox::pins::is_actuator_gpio;
use lockerbox::rpc::codec::decode_command;

fuzz_target!(|data: &[u8]| {
    match decode_command(data) {
        Ok(AppCommand::OpenLocker { locker_id, channel }) => {
            assert!(is_actuator_gpio(channel));
            assert!(!locker_id.is_empty(), "accepted an empty locker id");
            assert!(!locker_id.contains(['/', '+', '#']), "id would break the topic");
        }
        Ok(AppCommand::CloseLocker { channel }) => assert!(is_actuator_gpio(channel)),
        Err(_) => {}
    }
});
