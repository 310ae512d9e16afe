use crate::format::{FrameDescriptor, SizeClass};

/// Compression level used when none is given: fast mode, acceleration 1.
pub const DEFAULT_LEVEL: i32 = 1;

/// Everything needed to start compressing a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOptions {
    /// Effort knob for the block compressor. Negative levels trade ratio for
    /// speed; levels from the high-compression threshold up switch backends.
    pub level: i32,
    pub size_class: SizeClass,
    /// Append an xxHash32 of each stored payload.
    pub block_checksum: bool,
    /// Append an xxHash32 of all raw content after the end mark.
    pub content_checksum: bool,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            size_class: SizeClass::Max64KB,
            block_checksum: false,
            content_checksum: true,
        }
    }
}

impl FrameOptions {
    pub fn new(level: i32, size_class: SizeClass) -> Self {
        Self {
            level,
            size_class,
            ..Self::default()
        }
    }

    pub fn with_block_checksum(mut self, enabled: bool) -> Self {
        self.block_checksum = enabled;
        self
    }

    pub fn with_content_checksum(mut self, enabled: bool) -> Self {
        self.content_checksum = enabled;
        self
    }

    pub fn descriptor(&self) -> FrameDescriptor {
        FrameDescriptor::new(self.size_class, self.block_checksum, self.content_checksum)
    }
}
