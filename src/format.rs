//! MF wire format: header, opcode nibbles, special codes and the
//! big-endian 4-byte fields that follow some of them.
//!
//! Layout: bytes 0..4 magic, bytes 4..8 big-endian memory size, then a
//! stream of nibbles packed two per byte, high nibble first. A nibble with
//! its top bit set is a special code; codes 0..=5 are followed by a 4-byte
//! field starting on the next byte boundary.

use alloc::vec::Vec;

use crate::error::{Error, Result};

pub const HEADER_LEN: usize = 8;
pub const FIELD_LEN: usize = 4;

/// Longest run still emitted as literal nibbles. At 10 the special nibble
/// plus its 4-byte count is no bigger than the literals.
pub const RUN_THRESHOLD: u32 = 9;

/// Memory size used when the caller has no opinion.
pub const DEFAULT_MEM_SIZE: u32 = 1024;

/// Magic of MF authored directly.
pub const MAGIC_NATIVE: [u8; 4] = [0xFF, 0x6D, 0x66, 0xFD];
/// Magic of MF converted from BF.
pub const MAGIC_FROM_BF: [u8; 4] = [0xFF, 0x6D, 0x68, 0xFD];

/// No-op special code used to pad a half-filled byte.
pub const FILLER: u8 = SPECIAL_BIT | 6;

const SPECIAL_BIT: u8 = 0x8;

#[inline]
pub fn read_u32_be(b: &[u8; 4]) -> u32 {
    (b[0] as u32) << 24 | (b[1] as u32) << 16 | (b[2] as u32) << 8 | b[3] as u32
}

#[inline]
pub fn write_u32_be(v: u32) -> [u8; 4] {
    [(v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8, v as u8]
}

/// The eight BF primitives, discriminant = MF nibble.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    IncCell = 0,
    DecCell = 1,
    MoveRight = 2,
    MoveLeft = 3,
    JumpIfZero = 4,
    JumpIfNonZero = 5,
    Output = 6,
    Input = 7,
}

const BF: &[u8; 8] = b"+-><[].,";

impl Opcode {
    pub const ALL: [Opcode; 8] = [
        Opcode::IncCell,
        Opcode::DecCell,
        Opcode::MoveRight,
        Opcode::MoveLeft,
        Opcode::JumpIfZero,
        Opcode::JumpIfNonZero,
        Opcode::Output,
        Opcode::Input,
    ];

    /// Only the low three bits are looked at.
    #[inline]
    pub fn from_nibble(n: u8) -> Opcode {
        Self::ALL[(n & 0x7) as usize]
    }

    #[inline]
    pub fn nibble(self) -> u8 {
        self as u8
    }

    pub fn from_bf(c: u8) -> Option<Opcode> {
        BF.iter().position(|&b| b == c).map(|i| Self::ALL[i])
    }

    #[inline]
    pub fn to_bf(self) -> u8 {
        BF[self as usize]
    }

    /// `+ - > <`: the opcodes the encoder coalesces into runs.
    #[inline]
    pub fn is_repeatable(self) -> bool {
        (self as u8) < 4
    }
}

/// Three-bit payload of a nibble whose top bit is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpecialCode {
    /// Codes 0..=3: repeat `+ - > <` by the following 4-byte count.
    Repeat(Opcode),
    /// Code 4, followed by a 4-byte address.
    JumpIfZero,
    /// Code 5, followed by a 4-byte address.
    JumpIfNonZero,
    /// Code 6, alignment filler.
    NoOp,
    /// Code 7, reserved. Decoded as a no-op.
    Reserved,
}

impl SpecialCode {
    pub fn from_bits(bits: u8) -> SpecialCode {
        match bits & 0x7 {
            b @ 0..=3 => SpecialCode::Repeat(Opcode::from_nibble(b)),
            4 => SpecialCode::JumpIfZero,
            5 => SpecialCode::JumpIfNonZero,
            6 => SpecialCode::NoOp,
            _ => SpecialCode::Reserved,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            SpecialCode::Repeat(op) => op.nibble() & 0x3,
            SpecialCode::JumpIfZero => 4,
            SpecialCode::JumpIfNonZero => 5,
            SpecialCode::NoOp => 6,
            SpecialCode::Reserved => 7,
        }
    }

    #[inline]
    pub fn nibble(self) -> u8 {
        SPECIAL_BIT | self.bits()
    }

    /// Whether a 4-byte field follows this code.
    #[inline]
    pub fn has_field(self) -> bool {
        self.bits() < 6
    }
}

/// A classified 4-bit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nibble {
    Plain(Opcode),
    Special(SpecialCode),
}

impl Nibble {
    #[inline]
    pub fn classify(n: u8) -> Nibble {
        if n & SPECIAL_BIT == 0 {
            Nibble::Plain(Opcode::from_nibble(n))
        } else {
            Nibble::Special(SpecialCode::from_bits(n))
        }
    }

    #[inline]
    pub fn split(b: u8) -> (Nibble, Nibble) {
        (Nibble::classify(b >> 4), Nibble::classify(b & 0xF))
    }
}

/// Packs 4-bit codes two per byte, first code in the high nibble.
/// Holds at most one pending code between calls.
#[derive(Clone, Copy, Debug, Default)]
pub struct NibblePacker {
    pending: Option<u8>,
}

impl NibblePacker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, nibble: u8, out: &mut Vec<u8>) {
        let nibble = nibble & 0xF;
        match self.pending.take() {
            Some(high) => out.push(high << 4 | nibble),
            None => self.pending = Some(nibble),
        }
    }

    /// True when no half byte is pending.
    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.pending.is_none()
    }

    /// Completes a pending half byte with the no-op filler.
    #[inline]
    pub fn pad(&mut self, out: &mut Vec<u8>) {
        if !self.is_aligned() {
            self.push(FILLER, out);
        }
    }
}

/// Which of the two magics a file carries. Both decode identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Provenance {
    Native,
    #[default]
    FromBf,
}

impl Provenance {
    pub fn magic(self) -> [u8; 4] {
        match self {
            Provenance::Native => MAGIC_NATIVE,
            Provenance::FromBf => MAGIC_FROM_BF,
        }
    }

    pub fn from_magic(magic: &[u8; 4]) -> Option<Provenance> {
        match *magic {
            MAGIC_NATIVE => Some(Provenance::Native),
            MAGIC_FROM_BF => Some(Provenance::FromBf),
            _ => None,
        }
    }

    /// Whether `prefix` can still grow into one of the magics.
    pub(crate) fn is_magic_prefix(prefix: &[u8]) -> bool {
        MAGIC_NATIVE.starts_with(prefix) || MAGIC_FROM_BF.starts_with(prefix)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub provenance: Provenance,
    pub mem_size: u32,
}

impl Header {
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..4].copy_from_slice(&self.provenance.magic());
        out[4..].copy_from_slice(&write_u32_be(self.mem_size));
        out
    }

    pub fn parse(bytes: &[u8]) -> Result<Header> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::TruncatedHeader { len: bytes.len() });
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        let provenance = Provenance::from_magic(&magic).ok_or(Error::InvalidMagic { magic, consumed: 4 })?;
        let mut size = [0u8; 4];
        size.copy_from_slice(&bytes[4..HEADER_LEN]);
        Ok(Header { provenance, mem_size: read_u32_be(&size) })
    }
}
