use log::debug;

use crate::{
    disk::{Block, BlockDevice, BLOCK_SIZE, ZERO_BLOCK},
    fs::{
        config::{block_ref, blocks_for, raw_block_ref, BLOCK_REF_LEN, NO_BLOCK, PAYLOAD_SIZE},
        error::{FsError, Result},
        FileSystem,
    },
};

/// 数据块：`next_block: i64` + 载荷
#[derive(Debug, Clone)]
pub struct DataBlock {
    next_block: i64,
    payload: [u8; PAYLOAD_SIZE],
}

impl DataBlock {
    pub fn empty() -> Self {
        Self {
            next_block: NO_BLOCK,
            payload: [0; PAYLOAD_SIZE],
        }
    }

    pub fn from_block(block: &Block) -> Result<Self> {
        let mut reader: &[u8] = &block[..BLOCK_REF_LEN];
        let next_block: i64 = bincode::deserialize_from(&mut reader)?;
        let mut payload = [0u8; PAYLOAD_SIZE];
        payload.copy_from_slice(&block[BLOCK_REF_LEN..]);
        Ok(Self {
            next_block,
            payload,
        })
    }

    pub fn to_block(&self) -> Result<Block> {
        let mut block = [0u8; BLOCK_SIZE];
        let mut writer: &mut [u8] = &mut block[..BLOCK_REF_LEN];
        bincode::serialize_into(&mut writer, &self.next_block)?;
        block[BLOCK_REF_LEN..].copy_from_slice(&self.payload);
        Ok(block)
    }

    pub fn next(&self) -> Option<u64> {
        block_ref(self.next_block)
    }

    pub fn set_next(&mut self, next: Option<u64>) {
        self.next_block = raw_block_ref(next);
    }
}

/// 写入的数据来源：调用方的字节，或扩展文件时的零
enum Fill<'a> {
    Bytes(&'a [u8]),
    Zeros(u64),
}

impl Fill<'_> {
    fn len(&self) -> u64 {
        match self {
            Fill::Bytes(b) => b.len() as u64,
            Fill::Zeros(n) => *n,
        }
    }

    /// 把 `[from, from + dst.len())` 这一段拷进 `dst`
    fn copy_into(&self, from: u64, dst: &mut [u8]) {
        match self {
            Fill::Bytes(b) => {
                let from = from as usize;
                dst.copy_from_slice(&b[from..from + dst.len()]);
            }
            Fill::Zeros(_) => dst.fill(0),
        }
    }
}

impl<D: BlockDevice> FileSystem<D> {
    /// 链上的块号来自磁盘内容，越界说明元数据已损坏
    fn load_data(&self, block_id: u64) -> Result<DataBlock> {
        if block_id >= self.disk.block_count() {
            return Err(FsError::Corrupted(format!(
                "data block {} is outside the image",
                block_id
            )));
        }
        let mut block = ZERO_BLOCK;
        self.disk.read_block(block_id, &mut block)?;
        DataBlock::from_block(&block)
    }

    fn store_data(&self, block_id: u64, data: &DataBlock) -> Result<()> {
        self.disk.write_block(block_id, &data.to_block()?)
    }

    /// 从 `start` 沿 next 指针收集整条链的块号
    pub(crate) fn collect_chain(&self, start: Option<u64>) -> Result<Vec<u64>> {
        let limit = self.disk.block_count() as usize;
        let mut chain = Vec::new();
        let mut next = start;
        while let Some(block) = next {
            if chain.len() >= limit {
                return Err(FsError::Corrupted(format!(
                    "block chain starting at {:?} does not terminate",
                    start
                )));
            }
            chain.push(block);
            next = self.load_data(block)?.next();
        }
        Ok(chain)
    }

    /// 释放整条链，返回释放的块数。先读完整条链再释放，读失败时不释放任何块
    pub(crate) fn free_chain(&mut self, start: Option<u64>) -> Result<usize> {
        let chain = self.collect_chain(start)?;
        for &block in &chain {
            self.bitmap.free(block);
        }
        Ok(chain.len())
    }

    /// 读取文件内容；`offset` 不能超过文件大小，长度截断到文件末尾
    pub fn read_file(
        &self,
        dir_block: u64,
        index: usize,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>> {
        let entry = self.file_entry(dir_block, index)?;
        let size = entry.size();
        if offset > size {
            return Err(FsError::InvalidOffset { offset, size });
        }
        let length = length.min(size - offset);
        let mut out = Vec::with_capacity(length as usize);
        if length == 0 {
            return Ok(out);
        }

        let payload = PAYLOAD_SIZE as u64;
        let mut current = entry.start_block();
        for _ in 0..offset / payload {
            let block = current.ok_or_else(|| short_chain(dir_block, index))?;
            current = self.load_data(block)?.next();
        }

        let mut within = (offset % payload) as usize;
        while (out.len() as u64) < length {
            let block = current.ok_or_else(|| short_chain(dir_block, index))?;
            let data = self.load_data(block)?;
            let take = (PAYLOAD_SIZE - within).min((length - out.len() as u64) as usize);
            out.extend_from_slice(&data.payload[within..within + take]);
            within = 0;
            current = data.next();
        }
        Ok(out)
    }

    /// 写入文件，返回写入的字节数。`offset` 最多等于当前大小（只能追加，不留空洞）
    pub fn write_file(
        &mut self,
        dir_block: u64,
        index: usize,
        offset: u64,
        bytes: &[u8],
    ) -> Result<usize> {
        self.fill(dir_block, index, offset, Fill::Bytes(bytes))?;
        Ok(bytes.len())
    }

    /// 截断或扩展文件。扩展部分补零
    pub fn truncate_file(&mut self, dir_block: u64, index: usize, new_size: u64) -> Result<()> {
        let entry = self.file_entry(dir_block, index)?;
        let size = entry.size();

        if new_size > size {
            debug!(
                "extending file slot {} in block {}: {} -> {}",
                index, dir_block, size, new_size
            );
            return self.fill(dir_block, index, size, Fill::Zeros(new_size - size));
        }
        if new_size == size {
            return Ok(());
        }

        let keep = blocks_for(new_size) as usize;
        let chain = self.collect_chain(entry.start_block())?;
        if chain.len() < keep {
            return Err(short_chain(dir_block, index));
        }

        // 先缩小大小，再断链，最后释放：中途失败最多泄漏块，不会留下悬空指针
        self.update_size(dir_block, index, new_size)?;
        if keep == 0 {
            self.set_start_block(dir_block, index, None)?;
        } else if chain.len() > keep {
            let tail = chain[keep - 1];
            let mut data = self.load_data(tail)?;
            data.set_next(None);
            self.store_data(tail, &data)?;
        }
        for &block in &chain[keep..] {
            self.bitmap.free(block);
        }

        debug!(
            "truncated file slot {} in block {}: {} -> {}, freed {} blocks",
            index,
            dir_block,
            size,
            new_size,
            chain.len() - keep
        );
        Ok(())
    }

    /// 把 `block` 挂到 `prev` 之后；没有 `prev` 时成为文件的第一块
    fn link_block(
        &mut self,
        dir_block: u64,
        index: usize,
        prev: Option<u64>,
        block: u64,
    ) -> Result<()> {
        match prev {
            None => self.set_start_block(dir_block, index, Some(block)),
            Some(prev) => {
                let mut data = self.load_data(prev)?;
                data.set_next(Some(block));
                self.store_data(prev, &data)
            }
        }
    }

    fn fill(&mut self, dir_block: u64, index: usize, offset: u64, src: Fill<'_>) -> Result<()> {
        let entry = self.file_entry(dir_block, index)?;
        let size = entry.size();
        if offset > size {
            return Err(FsError::InvalidOffset { offset, size });
        }
        let len = src.len();
        if len == 0 {
            return Ok(());
        }
        let end = offset
            .checked_add(len)
            .ok_or(FsError::InvalidOffset { offset, size })?;

        let mut chain = self.collect_chain(entry.start_block())?;
        let payload = PAYLOAD_SIZE as u64;
        let first = (offset / payload) as usize;
        let last = ((end - 1) / payload) as usize;
        if first > chain.len() {
            return Err(short_chain(dir_block, index));
        }

        // 整段需要的新块一次性检查，磁盘不够时什么都不写
        let needed = (last + 1).saturating_sub(chain.len()) as u64;
        if needed > self.bitmap.free_blocks() {
            return Err(FsError::DiskFull);
        }

        let mut written = 0u64;
        for block_index in first..=last {
            let block_start = block_index as u64 * payload;
            let lo = offset.max(block_start) - block_start;
            let hi = end.min(block_start + payload) - block_start;
            let (lo, hi) = (lo as usize, hi as usize);

            if let Some(&block) = chain.get(block_index) {
                let mut data = self.load_data(block)?;
                src.copy_into(written, &mut data.payload[lo..hi]);
                self.store_data(block, &data)?;
            } else {
                // 新块：先写内容，再把它挂到链上
                let block = self.bitmap.alloc()?;
                let mut data = DataBlock::empty();
                src.copy_into(written, &mut data.payload[lo..hi]);
                let prev = block_index.checked_sub(1).map(|i| chain[i]);
                let linked = self
                    .store_data(block, &data)
                    .and_then(|_| self.link_block(dir_block, index, prev, block));
                if let Err(e) = linked {
                    self.bitmap.free(block);
                    return Err(e);
                }
                chain.push(block);
            }
            written += (hi - lo) as u64;
        }

        // 大小最后更新
        if end > size {
            self.update_size(dir_block, index, end)?;
        }
        Ok(())
    }
}

fn short_chain(dir_block: u64, index: usize) -> FsError {
    FsError::Corrupted(format!(
        "file slot {} in block {} has fewer blocks than its size",
        index, dir_block
    ))
}
