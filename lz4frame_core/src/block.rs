//! Single-block encode/decode.
//!
//! On the wire a block is `[u32 length][payload][u32 checksum?]`. The
//! checksum covers exactly the payload bytes as stored (compressed or raw),
//! never the length field.

use crate::checksum::{block_checksum, ContentChecksum};
use crate::codec::{BlockCompressor, BlockDecompressor};
use crate::error::{FrameError, Result};
use crate::format::{BlockLength, FrameDescriptor, CHECKSUM_SIZE, LENGTH_FIELD_SIZE};

#[inline]
fn read_u32_le(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

/// Encode `src` as one block at the start of `dest`; returns bytes written.
pub(crate) fn encode<C: BlockCompressor + ?Sized>(
    compressor: &mut C,
    descriptor: &FrameDescriptor,
    content: Option<&mut ContentChecksum>,
    src: &[u8],
    dest: &mut [u8],
) -> Result<usize> {
    let block_size = descriptor.block_size();
    if src.len() > block_size {
        return Err(FrameError::BlockTooLarge {
            len: src.len(),
            block_size,
        });
    }
    // Room for the raw fallback is the only hard requirement.
    let needed = src.len() + descriptor.block_header_size();
    if dest.len() < needed {
        return Err(FrameError::DestinationTooSmall {
            needed,
            available: dest.len(),
        });
    }

    if let Some(acc) = content {
        acc.update(src);
    }

    let payload_end = dest.len() - descriptor.block_checksum_size();
    let (field, rest) = dest[..payload_end].split_at_mut(LENGTH_FIELD_SIZE);

    let compressed = if src.is_empty() {
        None
    } else {
        match compressor.compress(src, rest) {
            Ok(n) if n < src.len() => Some(n),
            Ok(_) | Err(FrameError::DestinationTooSmall { .. }) => None,
            Err(e) => return Err(e),
        }
    };

    let length = match compressed {
        Some(n) => BlockLength::Compressed(n),
        None => {
            rest[..src.len()].copy_from_slice(src);
            BlockLength::Raw(src.len())
        }
    };
    field.copy_from_slice(&length.to_field().to_le_bytes());
    log::trace!(
        "encoded block: raw={} payload={} stored_raw={}",
        src.len(),
        length.payload_len(),
        length.is_raw()
    );

    let mut written = LENGTH_FIELD_SIZE + length.payload_len();
    if descriptor.block_checksum() {
        let sum = block_checksum(&dest[LENGTH_FIELD_SIZE..written]);
        dest[written..written + CHECKSUM_SIZE].copy_from_slice(&sum.to_le_bytes());
        written += CHECKSUM_SIZE;
    }
    Ok(written)
}

/// Validate the framing of one block and return its payload.
///
/// `src` starts right after the length field and must hold the payload plus
/// the block checksum when one is enabled; anything beyond is ignored.
pub(crate) fn verified_payload<'a>(
    descriptor: &FrameDescriptor,
    length: BlockLength,
    src: &'a [u8],
) -> Result<&'a [u8]> {
    if length == BlockLength::End {
        return Err(FrameError::UnexpectedEndMark);
    }
    let len = length.payload_len();
    let block_size = descriptor.block_size();
    if len > block_size {
        return Err(FrameError::BlockTooLarge { len, block_size });
    }
    let needed = len + descriptor.block_checksum_size();
    if src.len() < needed {
        return Err(FrameError::Truncated {
            needed,
            available: src.len(),
        });
    }

    let payload = &src[..len];
    if descriptor.block_checksum() {
        let expected = read_u32_le(&src[len..needed]);
        let actual = block_checksum(payload);
        if expected != actual {
            log::warn!("block checksum mismatch: stored {expected:08x}, computed {actual:08x}");
            return Err(FrameError::BlockChecksumMismatch { expected, actual });
        }
    }
    Ok(payload)
}

/// Decode one block into `dest`; returns the decompressed length.
pub(crate) fn decode<D: BlockDecompressor + ?Sized>(
    decompressor: &D,
    descriptor: &FrameDescriptor,
    content: Option<&mut ContentChecksum>,
    length: BlockLength,
    src: &[u8],
    dest: &mut [u8],
) -> Result<usize> {
    let payload = verified_payload(descriptor, length, src)?;

    let produced = if length.is_raw() {
        if dest.len() < payload.len() {
            return Err(FrameError::DestinationTooSmall {
                needed: payload.len(),
                available: dest.len(),
            });
        }
        dest[..payload.len()].copy_from_slice(payload);
        payload.len()
    } else {
        decompressor.decompress(payload, dest)?
    };

    if let Some(acc) = content {
        acc.update(&dest[..produced]);
    }
    log::trace!(
        "decoded block: payload={} raw={} stored_raw={}",
        payload.len(),
        produced,
        length.is_raw()
    );
    Ok(produced)
}
