#![no_main]

use libfuzzer_sys::fuzz_target;
use mediameta::{Format, ReadConfig};

fuzz_target!(|data: &[u8]| {
    for format in Format::ALL {
        let mut reader = std::io::Cursor::new(data);
        _ = format.read_from(&mut reader, &ReadConfig::DEFAULT);
    }
});
