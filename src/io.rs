//! `std::io::Write` adapters around [`Decoder`] and [`Encoder`].

use std::io::{self, Write};

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::Error;
use crate::format::Provenance;

fn invalid_data(e: Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

/// Accepts MF bytes and writes the decoded BF to `inner` as it goes.
#[derive(Debug)]
pub struct BfWriter<W: Write> {
    inner: W,
    decoder: Decoder,
    scratch: Vec<u8>,
}

impl<W: Write> BfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, decoder: Decoder::new(), scratch: Vec::new() }
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for BfWriter<W> {
    /// Bytes accepted before a bad magic are reported as written; the
    /// error comes with the next call.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let before = self.decoder.consumed();
        self.scratch.clear();
        let res = self.decoder.feed(buf, &mut self.scratch);
        self.inner.write_all(&self.scratch)?;
        match res {
            Ok(n) => Ok(n),
            Err(e) => {
                let n = (self.decoder.consumed() - before) as usize;
                if n > 0 {
                    Ok(n)
                } else {
                    Err(invalid_data(e))
                }
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Accepts BF bytes; header and payload reach `inner` only on [`close`].
///
/// [`close`]: MfWriter::close
#[derive(Debug)]
pub struct MfWriter<W: Write> {
    inner: W,
    encoder: Encoder,
}

impl<W: Write> MfWriter<W> {
    pub fn new(inner: W, mem_size: u32) -> crate::Result<Self> {
        Self::with_provenance(inner, mem_size, Provenance::FromBf)
    }

    pub fn with_provenance(inner: W, mem_size: u32, provenance: Provenance) -> crate::Result<Self> {
        Ok(Self { inner, encoder: Encoder::with_provenance(mem_size, provenance)? })
    }

    /// Resolves jumps and writes the finished MF. Returns the sink.
    pub fn close(self) -> io::Result<W> {
        let MfWriter { mut inner, encoder } = self;
        let mf = encoder.finish().map_err(invalid_data)?;
        inner.write_all(&mf)?;
        inner.flush()?;
        Ok(inner)
    }
}

impl<W: Write> Write for MfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encoder.write(buf);
        Ok(buf.len())
    }

    /// Nothing is committed before `close`.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
