use lz4frame_core::{BlockCompressor, FrameError, Result};

/// No-op compressor: every block is stored raw.
///
/// Useful for:
/// - Verifying the framing independently of LZ4.
/// - Data that is already compressed, where LZ4 only burns CPU.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreCompressor;

impl BlockCompressor for StoreCompressor {
    fn name(&self) -> &'static str {
        "store"
    }

    fn compress_bound(&self, len: usize) -> usize {
        len
    }

    fn compress(&mut self, src: &[u8], dest: &mut [u8]) -> Result<usize> {
        Err(FrameError::DestinationTooSmall {
            needed: src.len() + 1,
            available: dest.len(),
        })
    }
}
