#![no_main]
use cart_core::protocol::{self, Command};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    match data.parse::<Command>() {
        Ok(cmd) => {
            // Anything accepted must print as a line that parses again.
            let line = cmd.to_string();
            assert!(line.parse::<Command>().is_ok(), "reprint of {data:?} rejected: {line:?}");
        }
        Err(_) => {
            let reply = protocol::nak(data);
            assert!(reply.ends_with(';'));
        }
    }
});
