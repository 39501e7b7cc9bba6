#![no_main]

use editstream_sse::SseParser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut parser = SseParser::new();
    let mut events = Vec::new();
    for chunk in data.chunks(5) {
        events.extend(parser.push_bytes(chunk));
    }
    events.extend(parser.finish());
    for event in &events {
        assert!(!event.data.is_empty());
    }
});
