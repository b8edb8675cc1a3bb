use crate::disk::BLOCK_SIZE;

/// 根目录块固定在 0 号块
pub const ROOT_BLOCK_ID: u64 = 0;

/// 8.3 命名：文件名最多 8 字符，扩展名最多 3 字符
pub const MAX_FILENAME: usize = 8;
pub const MAX_EXTENSION: usize = 3;

// 定长名字字段，末尾留一个 NUL
pub const NAME_FIELD_LEN: usize = MAX_FILENAME + 1;
pub const EXT_FIELD_LEN: usize = MAX_EXTENSION + 1;

/// 块头部的计数字段（i32）
pub const COUNT_FIELD_LEN: usize = 4;

/// 块号字段（i64）与文件大小字段（u64）
pub const BLOCK_REF_LEN: usize = 8;
pub const SIZE_FIELD_LEN: usize = 8;

/// 根目录项：name[9] + start_block(i64) = 17 字节
pub const DIR_ENTRY_SIZE: usize = NAME_FIELD_LEN + BLOCK_REF_LEN;

/// 子目录中的文件项：name[9] + ext[4] + size(u64) + start_block(i64) = 29 字节
pub const FILE_ENTRY_SIZE: usize = NAME_FIELD_LEN + EXT_FIELD_LEN + SIZE_FIELD_LEN + BLOCK_REF_LEN;

/// 根目录最多能容纳的子目录数（512 字节块下为 29）
pub const MAX_DIRS: usize = (BLOCK_SIZE - COUNT_FIELD_LEN) / DIR_ENTRY_SIZE;

/// 每个子目录最多能容纳的文件数（512 字节块下为 17）
pub const MAX_FILES: usize = (BLOCK_SIZE - COUNT_FIELD_LEN) / FILE_ENTRY_SIZE;

/// 数据块中 next_block 之后的有效载荷大小
pub const PAYLOAD_SIZE: usize = BLOCK_SIZE - BLOCK_REF_LEN;

/// 表示“没有块”的哨兵值
pub const NO_BLOCK: i64 = -1;

/// 0 号块永远是根目录，所以任何 <= 0 的块号都解读为“没有块”
pub fn block_ref(raw: i64) -> Option<u64> {
    if raw > 0 {
        Some(raw as u64)
    } else {
        None
    }
}

pub fn raw_block_ref(block: Option<u64>) -> i64 {
    block.map_or(NO_BLOCK, |b| b as i64)
}

/// 容纳 `size` 字节需要的数据块数
pub fn blocks_for(size: u64) -> u64 {
    size.div_ceil(PAYLOAD_SIZE as u64)
}
