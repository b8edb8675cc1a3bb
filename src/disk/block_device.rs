use crate::{disk::types::Block, fs::error::Result};

/// Whole-block access to the backing image. Nothing above this trait ever
/// sees a byte offset.
pub trait BlockDevice: Send + Sync {
    fn read_block(&self, block_id: u64, buf: &mut Block) -> Result<()>;
    fn write_block(&self, block_id: u64, buf: &Block) -> Result<()>;

    /// 镜像中的块总数
    fn block_count(&self) -> u64;

    /// 刷盘
    fn sync(&self) -> Result<()>;
}
