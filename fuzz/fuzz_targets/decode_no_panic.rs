#![no_main]
use libfuzzer_sys::fuzz_target;
use mfbf::{BfSink, Decoder};

/// Counts output instead of storing it; run counts reach 2^32-1.
struct Counter(u64);

impl BfSink for Counter {
    fn push(&mut self, _op: u8) {
        self.0 += 1;
    }

    fn push_run(&mut self, _op: u8, count: u32) {
        self.0 += count as u64;
    }
}

fuzz_target!(|mf: &[u8]| {
    // Property: the decoder never panics, whatever the chunking.
    // It may return Ok(_) or a defined Error.
    let mid = mf.len() / 2;
    let mut d = Decoder::new();
    let mut sink = Counter(0);
    if d.feed(&mf[..mid], &mut sink).is_ok() {
        let _ = d.feed(&mf[mid..], &mut sink);
    }
});
