mod byte_window;
mod file_reader;
mod memory_reader;
mod range_reader;
mod s3_reader;

pub use byte_window::{ByteWindow, DEFAULT_PROBE_WINDOW};
pub use file_reader::FileRangeReader;
pub use memory_reader::MemoryRangeReader;
pub use range_reader::{
    read_f32_be, read_f32_le, read_f64_be, read_f64_le, read_u16_be, read_u16_le, read_u32_be,
    read_u32_le, read_u64_be, read_u64_le, ByteOrder, RangeReader,
};
pub use s3_reader::{create_s3_client, S3RangeReader};
