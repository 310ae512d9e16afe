mod block;
pub mod checksum;
pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod reader;
pub mod session;
pub mod writer;

pub use checksum::{block_checksum, hash64, ContentChecksum};
pub use codec::{BlockCompressor, BlockDecompressor};
pub use config::FrameOptions;
pub use error::{FrameError, Result};
pub use format::{BlockLength, FrameDescriptor, SizeClass, DESCRIPTOR_SIZE, MAGIC};
pub use reader::FrameReader;
pub use session::{CompressSession, DecompressSession, SessionState};
pub use writer::FrameWriter;
