mod lz4_codec;
mod passthrough;

pub use lz4_codec::{
    compress_bound, CompressorMode, Lz4Compressor, Lz4Decompressor, HC_LEVEL_MAX, HC_LEVEL_MIN,
};
pub use passthrough::StoreCompressor;

use anyhow::Context;
use lz4::block::{compress_to_buffer, CompressionMode};
use lz4frame_core::{
    BlockDecompressor, CompressSession, DecompressSession, FrameError, FrameOptions, FrameReader,
    DESCRIPTOR_SIZE,
};

/// Start a compress session with the LZ4 tier that `options.level` selects.
pub fn compress_session(options: &FrameOptions) -> CompressSession<Lz4Compressor> {
    CompressSession::with_descriptor(Lz4Compressor::for_level(options.level), options.descriptor())
}

/// Recognize `header` and start a decompress session for it.
pub fn decompress_session(header: &[u8]) -> lz4frame_core::Result<DecompressSession<Lz4Decompressor>> {
    DecompressSession::new(Lz4Decompressor, header)
}

/// Compress `data` as one complete frame.
pub fn compress_frame(data: &[u8], options: &FrameOptions) -> anyhow::Result<Vec<u8>> {
    let mut session = compress_session(options);
    let blocks = data.len().div_ceil(session.block_size());
    let mut out = Vec::with_capacity(
        DESCRIPTOR_SIZE + compress_bound(data.len()) + blocks * session.block_header_size() + 8,
    );
    out.extend_from_slice(session.header());
    for (idx, chunk) in data.chunks(session.block_size()).enumerate() {
        session
            .compress_block_into(chunk, &mut out)
            .with_context(|| format!("compressing block {idx}"))?;
    }
    session.finish_into(&mut out).context("writing frame trailer")?;
    log::debug!("framed {} bytes into {} ({} blocks)", data.len(), out.len(), blocks);
    Ok(out)
}

/// Decode one complete frame. Bytes after the trailer are an error.
pub fn decompress_frame(frame: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut reader = FrameReader::new(frame, Lz4Decompressor).context("reading frame descriptor")?;
    let mut out = Vec::new();
    while let Some(block) = reader
        .read_block()
        .with_context(|| format!("decoding block {}", reader.blocks_read()))?
    {
        out.extend_from_slice(&block);
    }
    let rest = reader.into_inner();
    if !rest.is_empty() {
        anyhow::bail!("{} trailing bytes after end of frame", rest.len());
    }
    log::debug!("unframed {} bytes into {}", frame.len(), out.len());
    Ok(out)
}

/// Compress `src` as a bare LZ4 block appended to `dest`.
///
/// Levels `<= 0` use the default fast mode, positive levels the HC matcher.
/// On failure `dest` is left as it was.
pub fn compress_appending(dest: &mut Vec<u8>, src: &[u8], level: i32) -> lz4frame_core::Result<usize> {
    let start = dest.len();
    dest.resize(start + compress_bound(src.len()), 0);
    let mode = if level <= 0 {
        CompressionMode::DEFAULT
    } else {
        CompressionMode::HIGHCOMPRESSION(level.min(HC_LEVEL_MAX))
    };
    match compress_to_buffer(src, Some(mode), false, &mut dest[start..]) {
        Ok(n) => {
            dest.truncate(start + n);
            Ok(n)
        }
        Err(e) => {
            dest.truncate(start);
            Err(FrameError::Io(e))
        }
    }
}

/// Decode a bare LZ4 block that must fill `dest` exactly.
pub fn decompress_exact(dest: &mut [u8], src: &[u8]) -> lz4frame_core::Result<()> {
    let n = Lz4Decompressor.decompress(src, dest)?;
    if n != dest.len() {
        return Err(FrameError::DecompressionFailed(format!(
            "block decoded to {} bytes, expected {}",
            n,
            dest.len()
        )));
    }
    Ok(())
}
