//! BF -> MF encoder.
//!
//! Output is held in memory until [`Encoder::finish`]: jump addresses are
//! only known once the whole program has been seen.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::format::{write_u32_be, Header, NibblePacker, Opcode, Provenance, SpecialCode, RUN_THRESHOLD};
use crate::resolve::resolve_jumps;

#[derive(Clone, Debug)]
pub struct Encoder {
    /// Header followed by the packed payload.
    buf: Vec<u8>,
    packer: NibblePacker,
    run: Option<(Opcode, u32)>,
}

impl Encoder {
    /// Encoder writing the BF-derived magic.
    pub fn new(mem_size: u32) -> Result<Self> {
        Self::with_provenance(mem_size, Provenance::FromBf)
    }

    pub fn with_provenance(mem_size: u32, provenance: Provenance) -> Result<Self> {
        if mem_size == 0 {
            return Err(Error::InvalidMemorySize(0));
        }
        let header = Header { provenance, mem_size };
        Ok(Self { buf: header.to_bytes().to_vec(), packer: NibblePacker::new(), run: None })
    }

    /// Feeds BF text. Bytes outside `+-><[].,` are ignored.
    pub fn write(&mut self, bf: &[u8]) {
        for &c in bf {
            if let Some(op) = Opcode::from_bf(c) {
                self.push_op(op);
            }
        }
    }

    /// Bytes buffered so far, header and completed payload bytes only.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Flushes the pending run, pads the last half byte and backpatches
    /// jumps. Fails on unbalanced brackets.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.flush_run();
        self.packer.pad(&mut self.buf);
        resolve_jumps(&mut self.buf)?;
        tracing::debug!(len = self.buf.len(), "encoded MF");
        Ok(self.buf)
    }

    fn push_op(&mut self, op: Opcode) {
        if op.is_repeatable() {
            if let Some((last, count)) = &mut self.run {
                if *last == op && *count < u32::MAX {
                    *count += 1;
                    return;
                }
            }
            self.flush_run();
            self.run = Some((op, 1));
            return;
        }

        self.flush_run();
        match op {
            Opcode::JumpIfZero => self.emit_with_field(SpecialCode::JumpIfZero, 0),
            Opcode::JumpIfNonZero => self.emit_with_field(SpecialCode::JumpIfNonZero, 0),
            _ => self.packer.push(op.nibble(), &mut self.buf),
        }
    }

    fn flush_run(&mut self) {
        let Some((op, count)) = self.run.take() else {
            return;
        };
        if count <= RUN_THRESHOLD {
            for _ in 0..count {
                self.packer.push(op.nibble(), &mut self.buf);
            }
        } else {
            self.emit_with_field(SpecialCode::Repeat(op), count);
        }
    }

    /// Special nibble, filler if it landed in a high nibble, then the field
    /// on the next byte boundary.
    fn emit_with_field(&mut self, code: SpecialCode, value: u32) {
        self.packer.push(code.nibble(), &mut self.buf);
        self.packer.pad(&mut self.buf);
        self.buf.extend_from_slice(&write_u32_be(value));
    }
}
