use xxhash_rust::xxh32::{xxh32, Xxh32};
use xxhash_rust::xxh64::xxh64;

const SEED: u32 = 0;

/// xxHash32 of one block's on-wire payload.
#[inline]
pub fn block_checksum(bytes: &[u8]) -> u32 {
    xxh32(bytes, SEED)
}

/// General-purpose 64-bit hash (xxHash64, seed 0).
pub fn hash64(bytes: &[u8]) -> u64 {
    xxh64(bytes, SEED as u64)
}

/// Running xxHash32 over every decompressed byte of a frame.
///
/// Created fresh with each session and never reset mid-stream.
#[derive(Clone)]
pub struct ContentChecksum {
    state: Xxh32,
}

impl ContentChecksum {
    pub fn new() -> Self {
        Self {
            state: Xxh32::new(SEED),
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.state.update(bytes);
    }

    pub fn digest(&self) -> u32 {
        self.state.digest()
    }
}

impl Default for ContentChecksum {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContentChecksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentChecksum")
            .field("digest", &format_args!("{:08x}", self.digest()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streaming_matches_one_shot() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i * 31 % 251) as u8).collect();
        let mut acc = ContentChecksum::new();
        for chunk in data.chunks(777) {
            acc.update(chunk);
        }
        assert_eq!(acc.digest(), block_checksum(&data));
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(block_checksum(b""), 0x02cc_5d05);
        assert_eq!(ContentChecksum::new().digest(), 0x02cc_5d05);
        assert_eq!(hash64(b""), 0xef46_db37_51d8_e999);
    }

    #[test]
    fn test_digest_does_not_consume() {
        let mut acc = ContentChecksum::new();
        acc.update(b"abc");
        assert_eq!(acc.digest(), acc.digest());
    }
}
