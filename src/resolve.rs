//! Jump backpatching over a finished MF buffer.
//!
//! Every `[` marker gets the offset just past its `]` marker's address
//! field and vice versa, so an interpreter can jump without searching for
//! the matching bracket. Offsets are absolute, header included.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::format::{write_u32_be, Nibble, SpecialCode, FIELD_LEN, HEADER_LEN};

/// Fills the address fields of all jump markers in `buf` (header + payload).
pub fn resolve_jumps(buf: &mut [u8]) -> Result<()> {
    let mut open: Vec<usize> = Vec::new();
    let mut i = HEADER_LEN;
    let mut pairs = 0usize;

    while i < buf.len() {
        let marker = i;
        i += 1;
        let code = match Nibble::split(buf[marker]) {
            (Nibble::Special(code), _) | (Nibble::Plain(_), Nibble::Special(code)) => code,
            _ => continue,
        };
        if !code.has_field() {
            continue;
        }
        match code {
            SpecialCode::JumpIfZero => open.push(marker),
            SpecialCode::JumpIfNonZero => {
                let start = open.pop().ok_or(Error::UnbalancedBrackets { offset: marker })?;
                let after_close = marker + 1 + FIELD_LEN;
                let after_open = start + 1 + FIELD_LEN;
                patch(buf, start + 1, after_close)?;
                patch(buf, marker + 1, after_open)?;
                tracing::trace!(open = start, close = marker, "backpatched jump pair");
                pairs += 1;
            }
            _ => {}
        }
        i += FIELD_LEN;
    }

    if let Some(&offset) = open.last() {
        return Err(Error::UnbalancedBrackets { offset });
    }
    tracing::debug!(pairs, "resolved jumps");
    Ok(())
}

fn patch(buf: &mut [u8], at: usize, target: usize) -> Result<()> {
    let value = u32::try_from(target).map_err(|_| Error::AddressOverflow { offset: at - 1 })?;
    if let Some(field) = buf.get_mut(at..at + FIELD_LEN) {
        field.copy_from_slice(&write_u32_be(value));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{read_u32_be, Header, Provenance};

    fn mf(body: &[u8]) -> Vec<u8> {
        let mut v = Header { provenance: Provenance::FromBf, mem_size: 1 }.to_bytes().to_vec();
        v.extend_from_slice(body);
        v
    }

    fn field(buf: &[u8], at: usize) -> u32 {
        let mut f = [0u8; 4];
        f.copy_from_slice(&buf[at..at + 4]);
        read_u32_be(&f)
    }

    #[test]
    fn cross_references_pair() {
        // 8: `[`+filler, 13: `]`+filler
        let mut buf = mf(&[0xCE, 0, 0, 0, 0, 0xDE, 0, 0, 0, 0]);
        resolve_jumps(&mut buf).unwrap();
        assert_eq!(field(&buf, 9), 18);
        assert_eq!(field(&buf, 14), 13);
    }

    #[test]
    fn nested_pairs() {
        // [ [ ] ] with markers at 8, 13, 18, 23
        let mut buf = mf(&[0xCE, 0, 0, 0, 0, 0xCE, 0, 0, 0, 0, 0xDE, 0, 0, 0, 0, 0xDE, 0, 0, 0, 0]);
        resolve_jumps(&mut buf).unwrap();
        assert_eq!(field(&buf, 9), 28);
        assert_eq!(field(&buf, 24), 13);
        assert_eq!(field(&buf, 14), 23);
        assert_eq!(field(&buf, 19), 18);
    }

    #[test]
    fn low_nibble_markers() {
        // `+[` at 8, `-]` at 13
        let mut buf = mf(&[0x0C, 0, 0, 0, 0, 0x1D, 0, 0, 0, 0]);
        resolve_jumps(&mut buf).unwrap();
        assert_eq!(field(&buf, 9), 18);
        assert_eq!(field(&buf, 14), 13);
    }

    #[test]
    fn run_counts_are_not_scanned() {
        // Repeat(+) with a count whose bytes look like `]` markers.
        let mut buf = mf(&[0x8E, 0xDD, 0xDD, 0xDD, 0xDD, 0x66]);
        resolve_jumps(&mut buf).unwrap();
        assert_eq!(&buf[9..13], &[0xDD; 4]);
    }

    #[test]
    fn close_without_open() {
        let mut buf = mf(&[0x00, 0xDE, 0, 0, 0, 0]);
        assert_eq!(resolve_jumps(&mut buf), Err(Error::UnbalancedBrackets { offset: 9 }));
    }

    #[test]
    fn open_without_close() {
        let mut buf = mf(&[0xCE, 0, 0, 0, 0, 0xCE, 0, 0, 0, 0]);
        assert_eq!(resolve_jumps(&mut buf), Err(Error::UnbalancedBrackets { offset: 13 }));
    }
}
