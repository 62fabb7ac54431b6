//! Streaming MF -> BF decoder.
//!
//! All partial state lives in [`Phase`], so input may be split anywhere:
//! inside the magic, the memory size, a run count or a jump address.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::format::{read_u32_be, Header, Nibble, Provenance, SpecialCode, FIELD_LEN};

/// Destination for decoded BF bytes.
pub trait BfSink {
    fn push(&mut self, op: u8);

    fn push_run(&mut self, op: u8, count: u32) {
        for _ in 0..count {
            self.push(op);
        }
    }
}

impl BfSink for Vec<u8> {
    #[inline]
    fn push(&mut self, op: u8) {
        Vec::push(self, op);
    }

    #[inline]
    fn push_run(&mut self, op: u8, count: u32) {
        let len = self.len();
        self.resize(len + count as usize, op);
    }
}

/// Writes the tape allocation prologue for `mem_size` cells:
/// `>`*(m-1) `+[-` `<`*(m-1) `]`.
///
/// The last cell is touched, every cell is left at zero and the pointer is
/// back on cell 0 when the loop exits. A size of 0 is treated as 1.
pub fn prologue<S: BfSink + ?Sized>(mem_size: u32, sink: &mut S) {
    let span = mem_size.saturating_sub(1);
    sink.push_run(b'>', span);
    sink.push(b'+');
    sink.push(b'[');
    sink.push(b'-');
    sink.push_run(b'<', span);
    sink.push(b']');
}

/// Decoder state between two input bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Magic { seen: u8, buf: [u8; 4] },
    MemSize { provenance: Provenance, seen: u8, buf: [u8; 4] },
    Opcode { header: Header },
    /// Collecting the 4-byte field of a run or jump special code.
    Field { header: Header, code: SpecialCode, seen: u8, buf: [u8; 4] },
    /// Terminal; the stored error is returned for every later byte.
    Failed { error: Error },
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Magic { seen: 0, buf: [0; 4] }
    }
}

impl Phase {
    /// Consumes one byte and returns the following phase.
    pub fn step<S: BfSink + ?Sized>(self, byte: u8, sink: &mut S) -> Result<Phase> {
        match self {
            Phase::Magic { seen, mut buf } => {
                buf[seen as usize] = byte;
                let seen = seen + 1;
                if !Provenance::is_magic_prefix(&buf[..seen as usize]) {
                    return Err(Error::InvalidMagic { magic: buf, consumed: seen as usize });
                }
                if (seen as usize) < buf.len() {
                    return Ok(Phase::Magic { seen, buf });
                }
                let provenance = Provenance::from_magic(&buf).unwrap_or_default();
                Ok(Phase::MemSize { provenance, seen: 0, buf: [0; 4] })
            }
            Phase::MemSize { provenance, seen, mut buf } => {
                buf[seen as usize] = byte;
                let seen = seen + 1;
                if (seen as usize) < FIELD_LEN {
                    return Ok(Phase::MemSize { provenance, seen, buf });
                }
                let header = Header { provenance, mem_size: read_u32_be(&buf) };
                tracing::debug!(provenance = ?header.provenance, mem_size = header.mem_size, "parsed MF header");
                prologue(header.mem_size, sink);
                Ok(Phase::Opcode { header })
            }
            Phase::Opcode { header } => Ok(Self::opcode_byte(header, byte, sink)),
            Phase::Field { header, code, seen, mut buf } => {
                buf[seen as usize] = byte;
                let seen = seen + 1;
                if (seen as usize) < FIELD_LEN {
                    return Ok(Phase::Field { header, code, seen, buf });
                }
                match code {
                    SpecialCode::Repeat(op) => sink.push_run(op.to_bf(), read_u32_be(&buf)),
                    // Jump addresses are passed over unchecked.
                    _ => tracing::trace!(?code, address = read_u32_be(&buf), "skipped jump address"),
                }
                Ok(Phase::Opcode { header })
            }
            Phase::Failed { error } => Err(error),
        }
    }

    fn opcode_byte<S: BfSink + ?Sized>(header: Header, byte: u8, sink: &mut S) -> Phase {
        let (high, low) = Nibble::split(byte);
        match high {
            // A special code in the high nibble takes the whole byte.
            Nibble::Special(code) => return Self::special(header, code, sink),
            Nibble::Plain(op) => sink.push(op.to_bf()),
        }
        match low {
            Nibble::Special(code) => Self::special(header, code, sink),
            Nibble::Plain(op) => {
                sink.push(op.to_bf());
                Phase::Opcode { header }
            }
        }
    }

    fn special<S: BfSink + ?Sized>(header: Header, code: SpecialCode, sink: &mut S) -> Phase {
        match code {
            SpecialCode::JumpIfZero => sink.push(b'['),
            SpecialCode::JumpIfNonZero => sink.push(b']'),
            SpecialCode::Reserved => tracing::warn!("reserved special code 7 decoded as no-op"),
            SpecialCode::Repeat(_) | SpecialCode::NoOp => {}
        }
        if code.has_field() {
            Phase::Field { header, code, seen: 0, buf: [0; 4] }
        } else {
            Phase::Opcode { header }
        }
    }
}

/// Resumable MF -> BF decoder. One instance per conversion.
#[derive(Clone, Debug, Default)]
pub struct Decoder {
    phase: Phase,
    consumed: u64,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `chunk`, appending BF to `sink`.
    ///
    /// On error the decoder stays failed; BF already pushed to `sink` is
    /// not taken back.
    pub fn feed<S: BfSink + ?Sized>(&mut self, chunk: &[u8], sink: &mut S) -> Result<usize> {
        for &b in chunk {
            match self.phase.step(b, sink) {
                Ok(next) => self.phase = next,
                Err(error) => {
                    self.phase = Phase::Failed { error };
                    return Err(error);
                }
            }
            self.consumed += 1;
        }
        Ok(chunk.len())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The header, once all 8 header bytes have been read.
    pub fn header(&self) -> Option<Header> {
        match self.phase {
            Phase::Opcode { header } | Phase::Field { header, .. } => Some(header),
            _ => None,
        }
    }

    /// Total bytes accepted so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// True between opcode bytes, i.e. not inside the header or a field.
    pub fn at_boundary(&self) -> bool {
        matches!(self.phase, Phase::Opcode { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Header, Provenance, MAGIC_FROM_BF, MAGIC_NATIVE};
    use alloc::vec;
    use rstest::rstest;

    fn with_header(mem_size: u32, body: &[u8]) -> Vec<u8> {
        let mut v = Header { provenance: Provenance::Native, mem_size }.to_bytes().to_vec();
        v.extend_from_slice(body);
        v
    }

    fn run(mf: &[u8]) -> Result<Vec<u8>> {
        let mut out: Vec<u8> = vec![];
        Decoder::new().feed(mf, &mut out)?;
        Ok(out)
    }

    fn body(mem_size: u32, mf_body: &[u8]) -> Vec<u8> {
        let out = run(&with_header(mem_size, mf_body)).unwrap();
        let mut pro: Vec<u8> = vec![];
        prologue(mem_size, &mut pro);
        assert_eq!(&out[..pro.len()], &pro[..]);
        out[pro.len()..].to_vec()
    }

    #[test]
    fn prologue_shape() {
        let mut p: Vec<u8> = vec![];
        prologue(4, &mut p);
        assert_eq!(p, b">>>+[-<<<]");
        let mut p: Vec<u8> = vec![];
        prologue(1, &mut p);
        assert_eq!(p, b"+[-]");
        let mut z: Vec<u8> = vec![];
        prologue(0, &mut z);
        assert_eq!(z, p);
    }

    #[test]
    fn plain_nibbles_high_first() {
        assert_eq!(body(1, &[0x01, 0x23, 0x67]), b"+-><.,");
    }

    #[test]
    fn both_magics_decode_alike() {
        let mut a = MAGIC_NATIVE.to_vec();
        let mut b = MAGIC_FROM_BF.to_vec();
        for v in [&mut a, &mut b] {
            v.extend_from_slice(&[0, 0, 0, 2, 0x26]);
        }
        assert_eq!(run(&a).unwrap(), run(&b).unwrap());
    }

    #[test]
    fn repeat_with_count() {
        // `+`, then special Repeat(`>`) in the low nibble, count 12.
        let mut expected = b"+".to_vec();
        expected.extend_from_slice(&[b'>'; 12]);
        expected.extend_from_slice(b"<<");
        assert_eq!(body(1, &[0x0A, 0, 0, 0, 12, 0x33]), expected);
        // high nibble special drops the low nibble.
        assert_eq!(body(1, &[0x85, 0, 0, 1, 0]).len(), 256);
    }

    #[test]
    fn jumps_skip_their_address() {
        // `[` in high + filler, address, `]` in high + filler, address.
        let out = body(1, &[0xCE, 0xDE, 0xAD, 0xBE, 0xEF, 0xDE, 0, 0, 0, 0, 0x66]);
        assert_eq!(out, b"[]..");
    }

    #[rstest]
    #[case(0xE2, b"")]
    #[case(0x2E, b">")]
    #[case(0xF2, b"")]
    #[case(0x2F, b">")]
    fn noop_and_reserved(#[case] byte: u8, #[case] expected: &[u8]) {
        assert_eq!(body(1, &[byte]), expected);
    }

    #[rstest]
    #[case(&[0x00], 1)]
    #[case(&[0xFF, 0x00], 2)]
    #[case(&[0xFF, 0x6D, 0x67], 3)]
    #[case(&[0xFF, 0x6D, 0x66, 0xFE], 4)]
    fn invalid_magic(#[case] input: &[u8], #[case] consumed: usize) {
        match run(input) {
            Err(Error::InvalidMagic { consumed: c, .. }) => assert_eq!(c, consumed),
            other => panic!("expected InvalidMagic, got {:?}", other),
        }
    }

    #[test]
    fn failed_decoder_stays_failed() {
        let mut d = Decoder::new();
        let mut out: Vec<u8> = vec![];
        let err = d.feed(&[0x00], &mut out).unwrap_err();
        assert_eq!(d.feed(&MAGIC_NATIVE, &mut out), Err(err));
        assert!(out.is_empty());
    }

    #[test]
    fn header_available_after_eight_bytes() {
        let mf = with_header(0x0001_0000, &[]);
        let mut d = Decoder::new();
        let mut out: Vec<u8> = vec![];
        d.feed(&mf[..7], &mut out).unwrap();
        assert_eq!(d.header(), None);
        assert!(out.is_empty());
        d.feed(&mf[7..], &mut out).unwrap();
        // (24, 16, 8, 0) reassembly: 65536, not 4096.
        assert_eq!(d.header().map(|h| h.mem_size), Some(65536));
        assert!(d.at_boundary());
        assert_eq!(d.consumed(), 8);
    }

    #[test]
    fn byte_at_a_time_matches_whole() {
        let mf = with_header(3, &[0x0A, 0, 0, 0, 11, 0xCE, 0, 0, 0, 0, 0x1D, 0, 0, 0, 0, 0x6E]);
        let whole = run(&mf).unwrap();
        let mut d = Decoder::new();
        let mut split: Vec<u8> = vec![];
        for b in &mf {
            d.feed(core::slice::from_ref(b), &mut split).unwrap();
        }
        assert_eq!(whole, split);
    }

    #[test]
    fn truncated_field_is_tolerated() {
        let mut d = Decoder::new();
        let mut out: Vec<u8> = vec![];
        d.feed(&with_header(1, &[0x88, 0, 0]), &mut out).unwrap();
        assert!(!d.at_boundary());
        assert!(matches!(d.phase(), Phase::Field { seen: 2, .. }));
    }
}
