#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! MF <-> BF transcoder.
//!
//! BF is the eight-opcode tape language (`+-><[].,`). MF carries the same
//! program as packed nibbles behind an 8-byte header, with runs of
//! `+ - > <` compressed and loop brackets carrying backpatched addresses.
//!
//! ```
//! let mf = mfbf::encode(b"+[->+<]", 4).unwrap();
//! let bf = mfbf::decode(&mf).unwrap();
//! assert!(bf.ends_with(b"+[->+<]"));
//! ```
extern crate alloc;

use alloc::vec::Vec;

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod format;
#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub mod io;
pub mod resolve;

pub use decoder::{prologue, BfSink, Decoder, Phase};
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use format::{Header, Opcode, Provenance, SpecialCode, DEFAULT_MEM_SIZE, MAGIC_FROM_BF, MAGIC_NATIVE};
pub use resolve::resolve_jumps;

/// Decodes a whole MF buffer to BF, allocation prologue included.
///
/// Truncated input is not an error; whatever decoded is returned.
pub fn decode(mf: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(mf.len() * 2);
    Decoder::new().feed(mf, &mut out)?;
    Ok(out)
}

/// Encodes BF text to MF with the BF-derived magic.
pub fn encode(bf: &[u8], mem_size: u32) -> Result<Vec<u8>> {
    let mut enc = Encoder::new(mem_size)?;
    enc.write(bf);
    enc.finish()
}

/// Checks a user supplied memory size: `1..2^32`.
pub fn validate_mem_size(n: u64) -> Result<u32> {
    match u32::try_from(n) {
        Ok(0) | Err(_) => Err(Error::InvalidMemorySize(n)),
        Ok(v) => Ok(v),
    }
}
