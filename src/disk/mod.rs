pub mod block_device;
pub mod file_disk;
pub mod init;
#[cfg(test)]
pub mod mem_disk;
pub mod types;

pub use block_device::BlockDevice;
pub use file_disk::FileDisk;
pub use types::{Block, BLOCK_SIZE, ZERO_BLOCK};
