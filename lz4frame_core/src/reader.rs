use std::io::{self, Read};

use crate::codec::BlockDecompressor;
use crate::error::{FrameError, Result};
use crate::format::{BlockLength, FrameDescriptor, CHECKSUM_SIZE, DESCRIPTOR_SIZE, LENGTH_FIELD_SIZE};
use crate::session::{DecompressSession, SessionState};
use crate::writer::into_io;

/// Sequential frame reader over any [`Read`] source.
///
/// # Open sequence
/// 1. Read the 7-byte descriptor and match it against the table.
/// 2. For every block, read the length field first, then exactly the payload
///    and checksum it announces, and decode.
/// 3. On the end mark, read the trailer and verify the content checksum.
///
/// [`read_block`](Self::read_block) yields one decoded block at a time; the
/// [`Read`] impl serves the same data as a byte stream.
pub struct FrameReader<R: Read, D: BlockDecompressor> {
    inner: R,
    session: DecompressSession<D>,
    /// Raw payload and checksum of the block being decoded.
    wire: Vec<u8>,
    /// Decoded bytes not yet handed out through `Read`.
    decoded: Vec<u8>,
    pos: usize,
}

impl<R: Read, D: BlockDecompressor> FrameReader<R, D> {
    pub fn new(mut inner: R, decompressor: D) -> Result<Self> {
        let mut header = [0u8; DESCRIPTOR_SIZE];
        inner.read_exact(&mut header)?;
        let session = DecompressSession::new(decompressor, &header)?;
        let capacity = session.max_compressed_block_size();
        Ok(Self {
            inner,
            session,
            wire: Vec::with_capacity(capacity),
            decoded: Vec::new(),
            pos: 0,
        })
    }

    pub fn descriptor(&self) -> FrameDescriptor {
        self.session.descriptor()
    }

    pub fn blocks_read(&self) -> u64 {
        self.session.blocks_read()
    }

    pub fn is_finished(&self) -> bool {
        self.session.state() == SessionState::Finished
    }

    /// Decode the next block, or return `None` once the end mark and trailer
    /// have been read and verified.
    pub fn read_block(&mut self) -> Result<Option<Vec<u8>>> {
        let mut out = vec![0u8; self.session.block_size()];
        match self.read_block_into(&mut out)? {
            Some(n) => {
                out.truncate(n);
                Ok(Some(out))
            }
            None => Ok(None),
        }
    }

    fn read_block_into(&mut self, out: &mut [u8]) -> Result<Option<usize>> {
        if self.is_finished() {
            return Ok(None);
        }
        let mut field = [0u8; LENGTH_FIELD_SIZE];
        self.inner.read_exact(&mut field)?;
        let length = BlockLength::from_bytes(field);

        if length == BlockLength::End {
            let trailer_size = self.session.descriptor().trailer_size();
            let mut trailer = [0u8; CHECKSUM_SIZE];
            self.inner.read_exact(&mut trailer[..trailer_size])?;
            self.session.finish(&trailer[..trailer_size])?;
            return Ok(None);
        }

        let block_size = self.session.block_size();
        if length.payload_len() > block_size {
            return Err(FrameError::BlockTooLarge {
                len: length.payload_len(),
                block_size,
            });
        }
        let on_wire = length.payload_len() + self.session.block_header_size() - LENGTH_FIELD_SIZE;
        self.wire.resize(on_wire, 0);
        self.inner.read_exact(&mut self.wire)?;
        let n = self
            .session
            .decompress_block(length.to_field(), &self.wire, out)?;
        Ok(Some(n))
    }

    /// Read and verify the rest of the frame, returning all decoded bytes.
    pub fn decompress_to_end(mut self) -> Result<Vec<u8>> {
        let mut out = self.decoded.split_off(self.pos);
        while let Some(block) = self.read_block()? {
            out.extend_from_slice(&block);
        }
        Ok(out)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read, D: BlockDecompressor> Read for FrameReader<R, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos == self.decoded.len() {
            let mut decoded = std::mem::take(&mut self.decoded);
            self.pos = 0;
            decoded.resize(self.session.block_size(), 0);
            match self.read_block_into(&mut decoded).map_err(into_io)? {
                Some(n) => {
                    decoded.truncate(n);
                    self.decoded = decoded;
                }
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.decoded.len() - self.pos);
        buf[..n].copy_from_slice(&self.decoded[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
