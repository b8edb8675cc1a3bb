use std::sync::Mutex;

use crate::{
    disk::{
        block_device::BlockDevice,
        types::{Block, BLOCK_SIZE},
    },
    fs::error::{FsError, Result},
};

/// 内存磁盘，仅用于测试。
#[derive(Debug)]
pub struct MemDisk {
    blocks: Mutex<Vec<Block>>,
    // 剩余允许成功的写入次数，None 表示不限
    writes_left: Mutex<Option<u64>>,
}

impl MemDisk {
    pub fn new(block_count: u64) -> Self {
        Self {
            blocks: Mutex::new(vec![[0u8; BLOCK_SIZE]; block_count as usize]),
            writes_left: Mutex::new(None),
        }
    }

    /// 再成功写入 `writes` 次之后，所有写入都返回 I/O 错误
    pub fn fail_writes_after(&self, writes: u64) {
        *self.writes_left.lock().unwrap() = Some(writes);
    }

    pub fn raw_block(&self, block_id: u64) -> Block {
        self.blocks.lock().unwrap()[block_id as usize]
    }

    pub fn set_raw_block(&self, block_id: u64, block: Block) {
        self.blocks.lock().unwrap()[block_id as usize] = block;
    }
}

impl BlockDevice for MemDisk {
    fn read_block(&self, block_id: u64, buf: &mut Block) -> Result<()> {
        let blocks = self.blocks.lock().unwrap();
        let block = blocks
            .get(block_id as usize)
            .ok_or(FsError::OutOfRange(block_id))?;
        buf.copy_from_slice(block);
        Ok(())
    }

    fn write_block(&self, block_id: u64, buf: &Block) -> Result<()> {
        if let Some(left) = self.writes_left.lock().unwrap().as_mut() {
            if *left == 0 {
                return Err(FsError::IoFault(std::io::Error::other(
                    "injected write failure",
                )));
            }
            *left -= 1;
        }

        let mut blocks = self.blocks.lock().unwrap();
        let block = blocks
            .get_mut(block_id as usize)
            .ok_or(FsError::OutOfRange(block_id))?;
        block.copy_from_slice(buf);
        Ok(())
    }

    fn block_count(&self) -> u64 {
        self.blocks.lock().unwrap().len() as u64
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }
}
