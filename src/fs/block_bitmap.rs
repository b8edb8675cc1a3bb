use log::debug;

use crate::fs::{
    config::ROOT_BLOCK_ID,
    error::{FsError, Result},
};

/// 内存中的块位图，每个 bit 表示一个块是否被使用。
/// 位图本身不落盘：挂载时从根目录、子目录和文件链重新扫描得到。
#[derive(Debug)]
pub struct BlockBitmap {
    bits: Vec<u8>,
    total_blocks: u64,
    free_blocks: u64,
}

impl BlockBitmap {
    /// 新位图：只有 0 号根目录块被占用
    pub fn new(total_blocks: u64) -> Self {
        let byte_len = total_blocks.div_ceil(8) as usize;
        let mut bitmap = Self {
            bits: vec![0; byte_len],
            total_blocks,
            free_blocks: total_blocks,
        };
        bitmap.mark_used(ROOT_BLOCK_ID);
        bitmap
    }

    /// 首次适配：返回编号最小的空闲块
    pub fn alloc(&mut self) -> Result<u64> {
        for (byte_index, byte) in self.bits.iter_mut().enumerate() {
            if *byte == 0xFF {
                continue;
            }
            for bit in 0..8 {
                let block = (byte_index * 8 + bit) as u64;
                if block >= self.total_blocks {
                    break;
                }
                if *byte & (1 << bit) == 0 {
                    *byte |= 1 << bit;
                    self.free_blocks -= 1;
                    debug!("allocated block {}", block);
                    return Ok(block);
                }
            }
        }
        Err(FsError::DiskFull)
    }

    /// 释放一个块；重复释放或越界都是空操作
    pub fn free(&mut self, block: u64) {
        if block == ROOT_BLOCK_ID || !self.is_used(block) {
            return;
        }

        let (byte_index, mask) = Self::locate(block);
        self.bits[byte_index] &= !mask;
        self.free_blocks += 1;
        debug!("freed block {}", block);
    }

    /// 标记为已用；块原本就已被占用时返回 false（挂载扫描用来发现重复引用）
    pub fn mark_used(&mut self, block: u64) -> bool {
        if block >= self.total_blocks {
            return false;
        }
        let (byte_index, mask) = Self::locate(block);
        if self.bits[byte_index] & mask != 0 {
            return false;
        }
        self.bits[byte_index] |= mask;
        self.free_blocks -= 1;
        true
    }

    pub fn is_used(&self, block: u64) -> bool {
        if block >= self.total_blocks {
            return false;
        }
        let (byte_index, mask) = Self::locate(block);
        self.bits[byte_index] & mask != 0
    }

    pub fn free_blocks(&self) -> u64 {
        self.free_blocks
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    fn locate(block: u64) -> (usize, u8) {
        ((block / 8) as usize, 1 << (block % 8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_block_is_never_handed_out() {
        let mut bitmap = BlockBitmap::new(4);
        assert!(bitmap.is_used(0));
        assert_eq!(bitmap.free_blocks(), 3);
        assert_eq!(bitmap.alloc().unwrap(), 1);

        bitmap.free(0);
        assert!(bitmap.is_used(0));
    }

    #[test]
    fn first_fit_in_ascending_order() {
        let mut bitmap = BlockBitmap::new(20);
        let got: Vec<u64> = (0..10).map(|_| bitmap.alloc().unwrap()).collect();
        assert_eq!(got, (1..=10).collect::<Vec<_>>());

        bitmap.free(7);
        bitmap.free(3);
        assert_eq!(bitmap.alloc().unwrap(), 3);
        assert_eq!(bitmap.alloc().unwrap(), 7);
        assert_eq!(bitmap.alloc().unwrap(), 11);
    }

    #[test]
    fn disk_full_then_free_returns_same_block() {
        // 非 8 的整数倍，确认尾部多余的 bit 不会被分配出去
        let mut bitmap = BlockBitmap::new(13);
        while bitmap.alloc().is_ok() {}
        assert_eq!(bitmap.free_blocks(), 0);
        assert!(matches!(bitmap.alloc(), Err(FsError::DiskFull)));

        bitmap.free(9);
        assert_eq!(bitmap.alloc().unwrap(), 9);
        assert!(matches!(bitmap.alloc(), Err(FsError::DiskFull)));
    }

    #[test]
    fn free_is_idempotent() {
        let mut bitmap = BlockBitmap::new(8);
        let block = bitmap.alloc().unwrap();
        bitmap.free(block);
        bitmap.free(block);
        bitmap.free(1000);
        assert_eq!(bitmap.free_blocks(), 7);
    }

    #[test]
    fn mark_used_reports_duplicates() {
        let mut bitmap = BlockBitmap::new(8);
        assert!(bitmap.mark_used(5));
        assert!(!bitmap.mark_used(5));
        assert!(!bitmap.mark_used(8));
        assert_eq!(bitmap.free_blocks(), 6);
        assert_ne!(bitmap.alloc().unwrap(), 5);
    }
}
