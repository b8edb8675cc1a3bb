/// 每个逻辑块（Block）的大小：512 字节
/// 文件系统以“块”为最小读写单位，所有偏移量都是 `block_id * BLOCK_SIZE`。
pub const BLOCK_SIZE: usize = 512;

/// 新建镜像时默认的块总数：5MB / 512B = 10240 块
pub const DEFAULT_BLOCK_COUNT: u64 = 5 * 1024 * 1024 / BLOCK_SIZE as u64;

/// 默认镜像文件名
pub const DEFAULT_IMAGE_PATH: &str = ".disk";

/// 一个逻辑块类型（每块 512 字节的字节数组）
pub type Block = [u8; BLOCK_SIZE];

/// 全零块，格式化和新分配目录块时使用
pub const ZERO_BLOCK: Block = [0; BLOCK_SIZE];
