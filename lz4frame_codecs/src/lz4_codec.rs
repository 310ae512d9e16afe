use lz4::block::{compress_to_buffer, CompressionMode};
use lz4frame_core::{BlockCompressor, BlockDecompressor, FrameError, Result};

/// Lowest level that selects the high-compression (HC) match finder.
pub const HC_LEVEL_MIN: i32 = 3;

/// Highest HC level; larger levels are clamped.
pub const HC_LEVEL_MAX: i32 = 12;

/// Worst-case LZ4 output size for `len` input bytes.
pub const fn compress_bound(len: usize) -> usize {
    len + len / 255 + 16
}

/// Which LZ4 tier a session compresses with, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressorMode {
    /// Greedy matcher. Larger acceleration is faster and compresses less.
    Fast { acceleration: i32 },
    /// HC matcher at the given level.
    HighEffort { level: i32 },
}

impl CompressorMode {
    /// Levels below [`HC_LEVEL_MIN`] are fast; a negative level `-n` means
    /// acceleration `n + 1`, anything else acceleration 1.
    pub fn for_level(level: i32) -> Self {
        if level < HC_LEVEL_MIN {
            let acceleration = if level < 0 {
                level.saturating_neg().saturating_add(1)
            } else {
                1
            };
            CompressorMode::Fast { acceleration }
        } else {
            CompressorMode::HighEffort {
                level: level.min(HC_LEVEL_MAX),
            }
        }
    }

    fn as_lz4(self) -> CompressionMode {
        match self {
            CompressorMode::Fast { acceleration } => CompressionMode::FAST(acceleration),
            CompressorMode::HighEffort { level } => CompressionMode::HIGHCOMPRESSION(level),
        }
    }
}

/// LZ4 block compressor.
///
/// Each block is compressed independently with no dictionary carried over,
/// so every block of the frame decodes on its own.
///
/// Holds no working state of its own: `lz4::block` exposes no entry point that
/// takes caller-owned state, so liblz4 sets up its match tables per call (on
/// the heap for the HC matcher).
#[derive(Debug, Clone)]
pub struct Lz4Compressor {
    mode: CompressorMode,
}

impl Lz4Compressor {
    pub fn new(mode: CompressorMode) -> Self {
        Self { mode }
    }

    pub fn for_level(level: i32) -> Self {
        Self::new(CompressorMode::for_level(level))
    }

    pub fn mode(&self) -> CompressorMode {
        self.mode
    }
}

impl BlockCompressor for Lz4Compressor {
    fn name(&self) -> &'static str {
        match self.mode {
            CompressorMode::Fast { .. } => "lz4",
            CompressorMode::HighEffort { .. } => "lz4hc",
        }
    }

    fn compress_bound(&self, len: usize) -> usize {
        compress_bound(len)
    }

    fn compress(&mut self, src: &[u8], dest: &mut [u8]) -> Result<usize> {
        // LZ4 writes at most dest.len() bytes and reports failure when the
        // output would not fit.
        compress_to_buffer(src, Some(self.mode.as_lz4()), false, dest).map_err(|_| {
            FrameError::DestinationTooSmall {
                needed: compress_bound(src.len()),
                available: dest.len(),
            }
        })
    }
}

/// Safe, bounded LZ4 block decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Decompressor;

impl BlockDecompressor for Lz4Decompressor {
    fn decompress(&self, src: &[u8], dest: &mut [u8]) -> Result<usize> {
        lz4_flex::block::decompress_into(src, dest)
            .map_err(|e| FrameError::DecompressionFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_selects_mode() {
        assert_eq!(CompressorMode::for_level(-4), CompressorMode::Fast { acceleration: 5 });
        assert_eq!(CompressorMode::for_level(-1), CompressorMode::Fast { acceleration: 2 });
        assert_eq!(CompressorMode::for_level(0), CompressorMode::Fast { acceleration: 1 });
        assert_eq!(CompressorMode::for_level(2), CompressorMode::Fast { acceleration: 1 });
        assert_eq!(CompressorMode::for_level(3), CompressorMode::HighEffort { level: 3 });
        assert_eq!(CompressorMode::for_level(9), CompressorMode::HighEffort { level: 9 });
        assert_eq!(CompressorMode::for_level(40), CompressorMode::HighEffort { level: 12 });
        assert!(matches!(
            CompressorMode::for_level(i32::MIN),
            CompressorMode::Fast { acceleration: i32::MAX }
        ));
    }

    #[test]
    fn test_block_round_trip_both_tiers() {
        let data: Vec<u8> = b"lorem ipsum dolor sit amet "
            .iter()
            .cycle()
            .take(20_000)
            .copied()
            .collect();
        for level in [-8, 1, 3, 9, 12] {
            let mut compressor = Lz4Compressor::for_level(level);
            let mut buf = vec![0u8; compress_bound(data.len())];
            let n = compressor.compress(&data, &mut buf).unwrap();
            assert!(n < data.len() / 4, "level {level}: {n} bytes");
            let mut out = vec![0u8; data.len()];
            let m = Lz4Decompressor.decompress(&buf[..n], &mut out).unwrap();
            assert_eq!(m, data.len());
            assert_eq!(out, data);
        }
    }

    #[test]
    fn test_compress_reports_no_room() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i.wrapping_mul(2654435761) >> 13) as u8).collect();
        let mut tiny = [0u8; 16];
        assert!(matches!(
            Lz4Compressor::for_level(1).compress(&data, &mut tiny),
            Err(FrameError::DestinationTooSmall { .. })
        ));
    }

    #[test]
    fn test_decompress_rejects_overflow_and_garbage() {
        let data = vec![b'z'; 1000];
        let mut buf = vec![0u8; compress_bound(data.len())];
        let n = Lz4Compressor::for_level(1).compress(&data, &mut buf).unwrap();
        let mut small = vec![0u8; 999];
        assert!(matches!(
            Lz4Decompressor.decompress(&buf[..n], &mut small),
            Err(FrameError::DecompressionFailed(_))
        ));
        let mut out = vec![0u8; 1000];
        assert!(Lz4Decompressor.decompress(&[0xff, 0xff, 0xff], &mut out).is_err());
    }
}
