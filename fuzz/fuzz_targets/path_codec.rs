#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    jsoncompare_fuzz::fuzz_path_codec(data);
});
