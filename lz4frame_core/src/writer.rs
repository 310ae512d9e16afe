use std::io::{self, Write};
use std::ops::Range;

use crate::codec::BlockCompressor;
use crate::error::{FrameError, Result};
use crate::format::FrameDescriptor;
use crate::session::CompressSession;

/// Streaming frame writer over any [`Write`] sink.
///
/// # Write contract
/// Write any number of arbitrary-sized slices. Data accumulates until a full
/// `block_size` is gathered, then one block is framed and written. Call
/// [`finish`](Self::finish) to emit the trailing partial block, the end mark,
/// and the content checksum.
///
/// # Layout written
/// ```text
/// [DESCRIPTOR: 7 bytes]
/// [BLOCK 0] [BLOCK 1] ... [BLOCK N-1]    ← u32 length, payload, checksum?
/// [END MARK: u32 0] [CONTENT CHECKSUM: u32]?
/// ```
pub struct FrameWriter<W: Write, C: BlockCompressor> {
    inner: W,
    session: CompressSession<C>,
    /// Pending raw bytes not yet framed into a block.
    pending: Vec<u8>,
    /// Reused output buffer for one framed block.
    scratch: Vec<u8>,
    /// Bytes of `scratch` encoded but not yet accepted by `inner`.
    staged: Range<usize>,
    /// Set when encoding failed after the content checksum saw the block.
    poisoned: bool,
}

impl<W: Write, C: BlockCompressor> FrameWriter<W, C> {
    /// Write the descriptor to `inner` and start a frame.
    pub fn new(mut inner: W, session: CompressSession<C>) -> Result<Self> {
        inner.write_all(session.header())?;
        let block_size = session.block_size();
        let scratch = vec![0u8; session.max_compressed_block_size()];
        Ok(Self {
            inner,
            session,
            pending: Vec::with_capacity(block_size),
            scratch,
            staged: 0..0,
            poisoned: false,
        })
    }

    pub fn descriptor(&self) -> FrameDescriptor {
        self.session.descriptor()
    }

    pub fn session(&self) -> &CompressSession<C> {
        &self.session
    }

    pub fn blocks_written(&self) -> u64 {
        self.session.blocks_written()
    }

    fn check_poisoned(&self) -> io::Result<()> {
        if self.poisoned {
            return Err(io::Error::other("frame writer failed while encoding an earlier block"));
        }
        Ok(())
    }

    /// Push the staged block into `inner`, keeping track of partial progress
    /// so a failed sink write can be retried without encoding again.
    fn drain_staged(&mut self) -> io::Result<()> {
        while !self.staged.is_empty() {
            match self.inner.write(&self.scratch[self.staged.clone()]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => self.staged.start += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Encode the pending bytes into `scratch`. An encode error poisons the
    /// writer since the content checksum has already seen the block.
    fn stage_block(&mut self) -> Result<()> {
        match self.session.compress_block(&self.pending, &mut self.scratch) {
            Ok(n) => {
                self.staged = 0..n;
                self.pending.clear();
                Ok(())
            }
            Err(e) => {
                self.poisoned = true;
                Err(e)
            }
        }
    }

    /// Frame the remaining buffered data, write the end mark and content
    /// checksum, and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.check_poisoned()?;
        self.drain_staged()?;
        if !self.pending.is_empty() {
            self.stage_block()?;
            self.drain_staged()?;
        }
        let mut trailer = Vec::with_capacity(8);
        self.session.finish_into(&mut trailer)?;
        self.inner.write_all(&trailer)?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write, C: BlockCompressor> Write for FrameWriter<W, C> {
    /// Accepts at most one block's worth of `buf` per call. An earlier block
    /// the sink refused is retried first; if that fails nothing is taken.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_poisoned()?;
        self.drain_staged()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let block_size = self.session.block_size();
        let take = (block_size - self.pending.len()).min(buf.len());
        self.pending.extend_from_slice(&buf[..take]);
        if self.pending.len() == block_size {
            self.stage_block().map_err(into_io)?;
            // The block is staged and counts as accepted. A sink error here
            // resurfaces on the next call if the retry fails as well.
            if let Err(e) = self.drain_staged() {
                log::warn!("deferring sink error after staging block: {e}");
            }
        }
        Ok(take)
    }

    /// Flushes the staged block and the sink. A partial block stays buffered
    /// so blocks keep their full size.
    fn flush(&mut self) -> io::Result<()> {
        self.check_poisoned()?;
        self.drain_staged()?;
        self.inner.flush()
    }
}

pub(crate) fn into_io(err: FrameError) -> io::Error {
    match err {
        FrameError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}
