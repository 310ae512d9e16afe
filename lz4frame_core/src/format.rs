use crate::error::{FrameError, Result};

/// Frame magic number `0x184D2204`, little-endian.
pub const MAGIC: [u8; 4] = [0x04, 0x22, 0x4d, 0x18];

/// Size of a frame descriptor: magic + FLG + BD + header checksum.
pub const DESCRIPTOR_SIZE: usize = 7;

/// Size of a block length field and of every checksum on the wire.
pub const LENGTH_FIELD_SIZE: usize = 4;
pub const CHECKSUM_SIZE: usize = 4;

/// High bit of a length field: the payload is stored uncompressed.
pub const RAW_BLOCK_FLAG: u32 = 0x8000_0000;
pub const LENGTH_MASK: u32 = 0x7fff_ffff;

/// Length field value that terminates the block sequence.
pub const END_MARK: u32 = 0;

// ── FLG byte ───────────────────────────────────────────────────────────────
// version 01, independent blocks, no content size, no dictionary id.

const FLG_BASE: u8 = 0x60;
const FLG_BLOCK_CHECKSUM: u8 = 0x10;
const FLG_CONTENT_CHECKSUM: u8 = 0x04;

// ── Size classes ───────────────────────────────────────────────────────────

/// Maximum raw bytes per block, as advertised in the descriptor's BD byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SizeClass {
    #[default]
    Max64KB = 0,
    Max256KB = 1,
    Max1MB = 2,
    Max4MB = 3,
}

impl SizeClass {
    pub const ALL: [SizeClass; 4] = [
        SizeClass::Max64KB,
        SizeClass::Max256KB,
        SizeClass::Max1MB,
        SizeClass::Max4MB,
    ];

    pub const fn block_size(self) -> usize {
        match self {
            SizeClass::Max64KB => 64 * 1024,
            SizeClass::Max256KB => 256 * 1024,
            SizeClass::Max1MB => 1024 * 1024,
            SizeClass::Max4MB => 4 * 1024 * 1024,
        }
    }

    /// The BD byte for this class.
    pub const fn marker(self) -> u8 {
        0x40 + ((self as u8) << 4)
    }

    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            0x40 => Some(SizeClass::Max64KB),
            0x50 => Some(SizeClass::Max256KB),
            0x60 => Some(SizeClass::Max1MB),
            0x70 => Some(SizeClass::Max4MB),
            _ => None,
        }
    }
}

// ── Descriptor table ───────────────────────────────────────────────────────

/// Header checksum byte of each descriptor, indexed by
/// `size_class * 4 + block_checksum * 2 + content_checksum`.
///
/// These are the second byte of xxHash32 over FLG and BD, precomputed; they
/// are matched literally and never recomputed.
const HEADER_CHECKSUMS: [u8; 16] = [
    0x82, 0xa7, 0xad, 0xbd, // 64KB
    0xfb, 0x08, 0x84, 0xff, // 256KB
    0x51, 0x85, 0x33, 0xd9, // 1MB
    0x73, 0xb9, 0x72, 0x8e, // 4MB
];

const fn table_index(size_class: SizeClass, block_checksum: bool, content_checksum: bool) -> usize {
    (size_class as usize) * 4 + (block_checksum as usize) * 2 + content_checksum as usize
}

const fn build_descriptor(index: usize) -> [u8; DESCRIPTOR_SIZE] {
    let size_class = SizeClass::ALL[index / 4];
    let mut flg = FLG_BASE;
    if index & 2 != 0 {
        flg |= FLG_BLOCK_CHECKSUM;
    }
    if index & 1 != 0 {
        flg |= FLG_CONTENT_CHECKSUM;
    }
    [
        MAGIC[0],
        MAGIC[1],
        MAGIC[2],
        MAGIC[3],
        flg,
        size_class.marker(),
        HEADER_CHECKSUMS[index],
    ]
}

const fn build_table() -> [[u8; DESCRIPTOR_SIZE]; 16] {
    let mut table = [[0u8; DESCRIPTOR_SIZE]; 16];
    let mut i = 0;
    while i < 16 {
        table[i] = build_descriptor(i);
        i += 1;
    }
    table
}

static DESCRIPTORS: [[u8; DESCRIPTOR_SIZE]; 16] = build_table();

/// One of the 16 legal 7-byte frame headers.
///
/// The value is just the three orthogonal choices; the wire bytes always
/// come from the static table, so two equal descriptors share the same
/// `&'static` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameDescriptor {
    size_class: SizeClass,
    block_checksum: bool,
    content_checksum: bool,
}

impl FrameDescriptor {
    /// Look up the descriptor for a configuration. Never fails.
    pub const fn new(size_class: SizeClass, block_checksum: bool, content_checksum: bool) -> Self {
        Self {
            size_class,
            block_checksum,
            content_checksum,
        }
    }

    /// Match `bytes` against the table.
    ///
    /// Fails with [`FrameError::InvalidDescriptor`] unless `bytes` is exactly
    /// 7 long, starts with [`MAGIC`], and its FLG, BD and checksum bytes equal
    /// one catalogued entry.
    pub fn recognize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != DESCRIPTOR_SIZE || bytes[..4] != MAGIC {
            return Err(FrameError::InvalidDescriptor);
        }
        let size_class = SizeClass::from_marker(bytes[5]).ok_or(FrameError::InvalidDescriptor)?;
        let (block_checksum, content_checksum) = match bytes[4] {
            0x60 => (false, false),
            0x64 => (false, true),
            0x70 => (true, false),
            0x74 => (true, true),
            _ => return Err(FrameError::InvalidDescriptor),
        };
        let index = table_index(size_class, block_checksum, content_checksum);
        if bytes[6] != HEADER_CHECKSUMS[index] {
            return Err(FrameError::InvalidDescriptor);
        }
        Ok(Self::new(size_class, block_checksum, content_checksum))
    }

    /// All 16 legal descriptors in table order.
    pub fn all() -> impl Iterator<Item = FrameDescriptor> {
        (0..16).map(|i| {
            Self::new(SizeClass::ALL[i / 4], i & 2 != 0, i & 1 != 0)
        })
    }

    /// The literal 7 header bytes.
    pub fn bytes(&self) -> &'static [u8; DESCRIPTOR_SIZE] {
        &DESCRIPTORS[table_index(self.size_class, self.block_checksum, self.content_checksum)]
    }

    pub fn size_class(&self) -> SizeClass {
        self.size_class
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.size_class.block_size()
    }

    pub fn block_checksum(&self) -> bool {
        self.block_checksum
    }

    pub fn content_checksum(&self) -> bool {
        self.content_checksum
    }

    /// Length field plus the optional trailing block checksum.
    #[inline]
    pub fn block_header_size(&self) -> usize {
        LENGTH_FIELD_SIZE + self.block_checksum_size()
    }

    #[inline]
    pub(crate) fn block_checksum_size(&self) -> usize {
        if self.block_checksum {
            CHECKSUM_SIZE
        } else {
            0
        }
    }

    /// Bytes following the end mark: the content digest, if enabled.
    pub fn trailer_size(&self) -> usize {
        if self.content_checksum {
            CHECKSUM_SIZE
        } else {
            0
        }
    }
}

// ── Block length field ─────────────────────────────────────────────────────

/// Decoded view of a block's 4-byte length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockLength {
    /// The terminating zero field.
    End,
    Compressed(usize),
    Raw(usize),
}

impl BlockLength {
    pub fn from_field(field: u32) -> Self {
        if field == END_MARK {
            BlockLength::End
        } else if field & RAW_BLOCK_FLAG != 0 {
            BlockLength::Raw((field & LENGTH_MASK) as usize)
        } else {
            BlockLength::Compressed(field as usize)
        }
    }

    pub fn from_bytes(buf: [u8; LENGTH_FIELD_SIZE]) -> Self {
        Self::from_field(u32::from_le_bytes(buf))
    }

    /// The on-wire field. `Raw(0)` keeps its flag so it is never confused
    /// with the end mark.
    pub fn to_field(self) -> u32 {
        match self {
            BlockLength::End => END_MARK,
            BlockLength::Compressed(len) => len as u32,
            BlockLength::Raw(len) => len as u32 | RAW_BLOCK_FLAG,
        }
    }

    /// Payload bytes that follow the field (excluding any block checksum).
    pub fn payload_len(self) -> usize {
        match self {
            BlockLength::End => 0,
            BlockLength::Compressed(len) | BlockLength::Raw(len) => len,
        }
    }

    pub fn is_raw(self) -> bool {
        matches!(self, BlockLength::Raw(_))
    }
}
