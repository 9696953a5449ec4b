#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use sluice_zmtp::codec::ZmtpDecoder;
use sluice_zmtp::command::{parse_command, parse_error, parse_ready};
use sluice_zmtp::greeting::{ZmtpGreeting, GREETING_SIZE};

fuzz_target!(|data: &[u8]| {
    if data.len() >= GREETING_SIZE {
        let _ = ZmtpGreeting::parse(&data[..GREETING_SIZE]);
    }

    // Feed in uneven chunks so partial headers are exercised.
    let mut decoder = ZmtpDecoder::new();
    for chunk in data.chunks(7) {
        decoder.extend(chunk);
        loop {
            match decoder.decode() {
                Ok(Some(frame)) if frame.is_command() => {
                    if let Ok(cmd) = parse_command(&frame.payload) {
                        let _ = parse_ready(&cmd.data);
                        let _ = parse_error(&cmd.data);
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(_) => return,
            }
        }
    }

    let _ = parse_command(&Bytes::copy_from_slice(data));
});
