use crate::block;
use crate::checksum::ContentChecksum;
use crate::codec::{BlockCompressor, BlockDecompressor};
use crate::error::{FrameError, Result};
use crate::format::{
    BlockLength, FrameDescriptor, SizeClass, CHECKSUM_SIZE, DESCRIPTOR_SIZE, END_MARK,
    LENGTH_FIELD_SIZE,
};

/// Lifecycle of a session. Only forward transitions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Streaming,
    Finished,
}

fn ensure_open(state: SessionState) -> Result<()> {
    if state == SessionState::Finished {
        return Err(FrameError::SessionFinished);
    }
    Ok(())
}

// ── Compression ────────────────────────────────────────────────────────────

/// State for compressing exactly one frame.
///
/// # Usage
/// 1. Write [`header`](Self::header) to the output.
/// 2. Call [`compress_block`](Self::compress_block) for each chunk of at most
///    [`block_size`](Self::block_size) raw bytes, in order.
/// 3. Call [`finish`](Self::finish) once to write the terminator and, if
///    enabled, the content checksum.
///
/// The session owns its compressor for its whole life; nothing else may
/// touch it, so the session is not meant to be shared between threads.
pub struct CompressSession<C> {
    descriptor: FrameDescriptor,
    compressor: C,
    content: Option<ContentChecksum>,
    max_compressed_block_size: usize,
    state: SessionState,
    blocks: u64,
}

impl<C: BlockCompressor> CompressSession<C> {
    pub fn new(
        compressor: C,
        size_class: SizeClass,
        block_checksum: bool,
        content_checksum: bool,
    ) -> Self {
        Self::with_descriptor(
            compressor,
            FrameDescriptor::new(size_class, block_checksum, content_checksum),
        )
    }

    pub fn with_descriptor(compressor: C, descriptor: FrameDescriptor) -> Self {
        let max_compressed_block_size =
            compressor.compress_bound(descriptor.block_size()) + descriptor.block_header_size();
        log::debug!(
            "compress session: backend={} block_size={} block_checksum={} content_checksum={}",
            compressor.name(),
            descriptor.block_size(),
            descriptor.block_checksum(),
            descriptor.content_checksum()
        );
        Self {
            descriptor,
            compressor,
            content: descriptor.content_checksum().then(ContentChecksum::new),
            max_compressed_block_size,
            state: SessionState::Created,
            blocks: 0,
        }
    }

    pub fn descriptor(&self) -> FrameDescriptor {
        self.descriptor
    }

    /// The 7 descriptor bytes that open the frame.
    pub fn header(&self) -> &'static [u8; DESCRIPTOR_SIZE] {
        self.descriptor.bytes()
    }

    pub fn block_size(&self) -> usize {
        self.descriptor.block_size()
    }

    pub fn block_header_size(&self) -> usize {
        self.descriptor.block_header_size()
    }

    /// Destination capacity that always suffices for one full block.
    pub fn max_compressed_block_size(&self) -> usize {
        self.max_compressed_block_size
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn blocks_written(&self) -> u64 {
        self.blocks
    }

    /// Run the block compressor alone, without framing or checksums.
    pub fn compress(&mut self, src: &[u8], dest: &mut [u8]) -> Result<usize> {
        ensure_open(self.state)?;
        self.compressor.compress(src, dest)
    }

    /// Frame one block of at most `block_size` bytes into `dest`.
    ///
    /// Blocks that do not shrink, or whose compressed form does not fit, are
    /// stored raw. `dest` must hold at least `src.len() + block_header_size`
    /// bytes; [`max_compressed_block_size`](Self::max_compressed_block_size)
    /// always works. Returns the bytes written.
    pub fn compress_block(&mut self, src: &[u8], dest: &mut [u8]) -> Result<usize> {
        ensure_open(self.state)?;
        let written = block::encode(
            &mut self.compressor,
            &self.descriptor,
            self.content.as_mut(),
            src,
            dest,
        )?;
        self.state = SessionState::Streaming;
        self.blocks += 1;
        Ok(written)
    }

    /// Like [`compress_block`](Self::compress_block), appending to a growable sink.
    pub fn compress_block_into(&mut self, src: &[u8], dest: &mut Vec<u8>) -> Result<usize> {
        let start = dest.len();
        let capacity = self.max_compressed_block_size.max(src.len() + self.block_header_size());
        dest.resize(start + capacity, 0);
        match self.compress_block(src, &mut dest[start..]) {
            Ok(written) => {
                dest.truncate(start + written);
                Ok(written)
            }
            Err(e) => {
                dest.truncate(start);
                Err(e)
            }
        }
    }

    /// Write the end mark and, if enabled, the content digest.
    ///
    /// Returns 4 or 8. Must be called exactly once; a second call fails with
    /// [`FrameError::SessionFinished`].
    pub fn finish(&mut self, dest: &mut [u8]) -> Result<usize> {
        ensure_open(self.state)?;
        let needed = LENGTH_FIELD_SIZE + self.descriptor.trailer_size();
        if dest.len() < needed {
            return Err(FrameError::DestinationTooSmall {
                needed,
                available: dest.len(),
            });
        }
        dest[..LENGTH_FIELD_SIZE].copy_from_slice(&END_MARK.to_le_bytes());
        if let Some(acc) = &self.content {
            dest[LENGTH_FIELD_SIZE..needed].copy_from_slice(&acc.digest().to_le_bytes());
        }
        self.state = SessionState::Finished;
        log::debug!("compress session finished after {} blocks", self.blocks);
        Ok(needed)
    }

    pub fn finish_into(&mut self, dest: &mut Vec<u8>) -> Result<usize> {
        let mut trailer = [0u8; LENGTH_FIELD_SIZE + CHECKSUM_SIZE];
        let n = self.finish(&mut trailer)?;
        dest.extend_from_slice(&trailer[..n]);
        Ok(n)
    }
}

impl<C> std::fmt::Debug for CompressSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressSession")
            .field("descriptor", &self.descriptor)
            .field("state", &self.state)
            .field("blocks", &self.blocks)
            .finish_non_exhaustive()
    }
}

// ── Decompression ──────────────────────────────────────────────────────────

/// State for decompressing exactly one frame.
///
/// The caller reads the 4-byte length field of each block itself and hands
/// it in together with the bytes that follow it. When the field is zero the
/// block sequence is over and [`finish`](Self::finish) takes the trailer.
pub struct DecompressSession<D> {
    descriptor: FrameDescriptor,
    decompressor: D,
    content: Option<ContentChecksum>,
    state: SessionState,
    blocks: u64,
}

impl<D: BlockDecompressor> DecompressSession<D> {
    /// Recognize `header` and set up a session for that configuration.
    pub fn new(decompressor: D, header: &[u8]) -> Result<Self> {
        let descriptor = FrameDescriptor::recognize(header)?;
        Ok(Self::with_descriptor(decompressor, descriptor))
    }

    pub fn with_descriptor(decompressor: D, descriptor: FrameDescriptor) -> Self {
        log::debug!(
            "decompress session: block_size={} block_checksum={} content_checksum={}",
            descriptor.block_size(),
            descriptor.block_checksum(),
            descriptor.content_checksum()
        );
        Self {
            descriptor,
            decompressor,
            content: descriptor.content_checksum().then(ContentChecksum::new),
            state: SessionState::Created,
            blocks: 0,
        }
    }

    pub fn descriptor(&self) -> FrameDescriptor {
        self.descriptor
    }

    pub fn header(&self) -> &'static [u8; DESCRIPTOR_SIZE] {
        self.descriptor.bytes()
    }

    pub fn block_size(&self) -> usize {
        self.descriptor.block_size()
    }

    pub fn block_header_size(&self) -> usize {
        self.descriptor.block_header_size()
    }

    /// Largest on-wire block: raw payload of `block_size` plus header.
    pub fn max_compressed_block_size(&self) -> usize {
        self.descriptor.block_size() + self.descriptor.block_header_size()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn blocks_read(&self) -> u64 {
        self.blocks
    }

    /// Decode one block into `dest` and return the decompressed length.
    ///
    /// `length_field` is the block's already-read length field; `src` holds
    /// the payload and, if enabled, the block checksum. The checksum is
    /// verified before the payload is trusted.
    pub fn decompress_block(&mut self, length_field: u32, src: &[u8], dest: &mut [u8]) -> Result<usize> {
        ensure_open(self.state)?;
        let produced = block::decode(
            &self.decompressor,
            &self.descriptor,
            self.content.as_mut(),
            BlockLength::from_field(length_field),
            src,
            dest,
        )?;
        self.state = SessionState::Streaming;
        self.blocks += 1;
        Ok(produced)
    }

    /// Verify a block without handing its contents to the caller.
    ///
    /// Used when seeking past blocks. With a content checksum the block is
    /// still decoded into `scratch` so the running digest stays complete.
    pub fn skip_block(&mut self, length_field: u32, src: &[u8], scratch: &mut [u8]) -> Result<()> {
        ensure_open(self.state)?;
        let length = BlockLength::from_field(length_field);
        if self.content.is_some() {
            self.decompress_block(length_field, src, scratch)?;
        } else {
            block::verified_payload(&self.descriptor, length, src)?;
            self.state = SessionState::Streaming;
            self.blocks += 1;
        }
        Ok(())
    }

    /// Check the trailer that follows the end mark.
    ///
    /// `trailer` holds the bytes after the zero length field. Returns how many
    /// of them were consumed: 4 with a content checksum, otherwise 0.
    pub fn finish(&mut self, trailer: &[u8]) -> Result<usize> {
        ensure_open(self.state)?;
        self.state = SessionState::Finished;
        let Some(acc) = &self.content else {
            log::debug!("decompress session finished after {} blocks", self.blocks);
            return Ok(0);
        };
        if trailer.len() < CHECKSUM_SIZE {
            return Err(FrameError::Truncated {
                needed: CHECKSUM_SIZE,
                available: trailer.len(),
            });
        }
        let mut stored = [0u8; CHECKSUM_SIZE];
        stored.copy_from_slice(&trailer[..CHECKSUM_SIZE]);
        let expected = u32::from_le_bytes(stored);
        let actual = acc.digest();
        if expected != actual {
            log::warn!("content checksum mismatch: stored {expected:08x}, computed {actual:08x}");
            return Err(FrameError::ContentChecksumMismatch { expected, actual });
        }
        log::debug!("decompress session finished after {} blocks, content verified", self.blocks);
        Ok(CHECKSUM_SIZE)
    }
}

impl<D> std::fmt::Debug for DecompressSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecompressSession")
            .field("descriptor", &self.descriptor)
            .field("state", &self.state)
            .field("blocks", &self.blocks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::test_backend::{RleCompressor, RleDecompressor};
    use crate::format::LENGTH_MASK;

    /// Split a framed byte stream back into `(length_field, rest)` pairs.
    fn decode_all(session: &mut DecompressSession<RleDecompressor>, mut wire: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; session.block_size()];
        loop {
            let mut field = [0u8; 4];
            field.copy_from_slice(&wire[..4]);
            let field = u32::from_le_bytes(field);
            wire = &wire[4..];
            if field == 0 {
                session.finish(wire)?;
                return Ok(out);
            }
            let n = session.decompress_block(field, wire, &mut buf)?;
            out.extend_from_slice(&buf[..n]);
            wire = &wire[(field & LENGTH_MASK) as usize + session.block_header_size() - 4..];
        }
    }

    fn encode_all(data: &[u8], block_checksum: bool, content_checksum: bool) -> Vec<u8> {
        let mut session =
            CompressSession::new(RleCompressor, SizeClass::Max64KB, block_checksum, content_checksum);
        let mut wire = session.header().to_vec();
        for chunk in data.chunks(session.block_size()) {
            session.compress_block_into(chunk, &mut wire).unwrap();
        }
        session.finish_into(&mut wire).unwrap();
        wire
    }

    #[test]
    fn test_state_transitions() {
        let mut session = CompressSession::new(RleCompressor, SizeClass::Max64KB, false, false);
        assert_eq!(session.state(), SessionState::Created);
        let mut dest = vec![0u8; session.max_compressed_block_size()];
        session.compress_block(b"aaaa", &mut dest).unwrap();
        assert_eq!(session.state(), SessionState::Streaming);
        assert_eq!(session.finish(&mut dest).unwrap(), 4);
        assert_eq!(session.state(), SessionState::Finished);
        assert_eq!(&dest[..4], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_second_finish_fails() {
        let mut session = CompressSession::new(RleCompressor, SizeClass::Max64KB, false, true);
        let mut dest = [0u8; 8];
        assert_eq!(session.finish(&mut dest).unwrap(), 8);
        assert!(matches!(session.finish(&mut dest), Err(FrameError::SessionFinished)));
        assert!(matches!(
            session.compress_block(b"x", &mut [0u8; 64]),
            Err(FrameError::SessionFinished)
        ));

        let header = FrameDescriptor::new(SizeClass::Max64KB, false, false).bytes();
        let mut d = DecompressSession::new(RleDecompressor, header).unwrap();
        assert_eq!(d.finish(&[]).unwrap(), 0);
        assert!(matches!(d.finish(&[]), Err(FrameError::SessionFinished)));
    }

    #[test]
    fn test_empty_frame_with_content_checksum() {
        let wire = encode_all(&[], false, true);
        assert_eq!(wire.len(), 7 + 8);
        let mut d = DecompressSession::new(RleDecompressor, &wire[..7]).unwrap();
        assert!(decode_all(&mut d, &wire[7..]).unwrap().is_empty());
    }

    #[test]
    fn test_round_trip_all_flag_combinations() {
        let data: Vec<u8> = (0..150_000usize).map(|i| (i / 300) as u8).collect();
        for (bc, cc) in [(false, false), (true, false), (false, true), (true, true)] {
            let wire = encode_all(&data, bc, cc);
            let mut d = DecompressSession::new(RleDecompressor, &wire[..7]).unwrap();
            assert_eq!(decode_all(&mut d, &wire[7..]).unwrap(), data, "bc={bc} cc={cc}");
            assert_eq!(d.blocks_read(), 3);
            assert_eq!(d.state(), SessionState::Finished);
        }
    }

    #[test]
    fn test_content_checksum_mismatch_at_finish() {
        let mut d = DecompressSession::new(
            RleDecompressor,
            FrameDescriptor::new(SizeClass::Max64KB, false, true).bytes(),
        )
        .unwrap();
        let mut out = [0u8; 8];
        d.decompress_block(0x8000_0003, b"abc", &mut out).unwrap();
        let wrong = crate::checksum::block_checksum(b"abd").to_le_bytes();
        assert!(matches!(d.finish(&wrong), Err(FrameError::ContentChecksumMismatch { .. })));
    }

    #[test]
    fn test_missing_content_trailer_is_truncated() {
        let header = FrameDescriptor::new(SizeClass::Max64KB, false, true).bytes();
        let mut d = DecompressSession::new(RleDecompressor, header).unwrap();
        assert!(matches!(d.finish(&[1, 2]), Err(FrameError::Truncated { .. })));
    }

    #[test]
    fn test_skip_block_keeps_digest_consistent() {
        let data = vec![5u8; 1000];
        let wire = encode_all(&data, true, true);
        let mut d = DecompressSession::new(RleDecompressor, &wire[..7]).unwrap();
        let mut field = [0u8; 4];
        field.copy_from_slice(&wire[7..11]);
        let field = u32::from_le_bytes(field);
        let mut scratch = vec![0u8; d.block_size()];
        d.skip_block(field, &wire[11..], &mut scratch).unwrap();
        let consumed = (field & LENGTH_MASK) as usize + 4;
        let rest = &wire[11 + consumed..];
        assert_eq!(&rest[..4], &[0, 0, 0, 0]);
        assert_eq!(d.finish(&rest[4..]).unwrap(), 4);
    }

    #[test]
    fn test_invalid_header_rejected() {
        assert!(matches!(
            DecompressSession::new(RleDecompressor, &[0u8; 7]),
            Err(FrameError::InvalidDescriptor)
        ));
    }
}
