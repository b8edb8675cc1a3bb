use log::{debug, info, warn};

use crate::{
    disk::{BlockDevice, ZERO_BLOCK},
    fs::{
        block_bitmap::BlockBitmap,
        config::{blocks_for, MAX_DIRS, MAX_FILES, ROOT_BLOCK_ID},
        error::{FsError, Result},
    },
};

pub mod block_bitmap;
pub mod config;
pub mod error;
pub mod file_data;
pub mod name;
pub mod ops;
pub mod path;
pub mod root_dir;
pub mod sub_dir;

/// 磁盘使用情况
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    pub total_blocks: u64,
    pub free_blocks: u64,
    pub directories: usize,
    pub max_directories: usize,
    pub max_files_per_directory: usize,
}

/// 两级平面镜像文件系统：0 号块是根目录，每个子目录占一块，文件是数据块链表
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice> {
    disk: D,             // 底层磁盘，整个生命周期只持有这一个句柄
    bitmap: BlockBitmap, // 内存中的空闲块集合，挂载时重建
}

impl<D: BlockDevice> FileSystem<D> {
    /// 未挂载状态：位图里只有根目录块。使用前调用 `format` 或 `mount`
    pub fn new(disk: D) -> Self {
        let total = disk.block_count();
        Self {
            disk,
            bitmap: BlockBitmap::new(total),
        }
    }

    pub fn device(&self) -> &D {
        &self.disk
    }

    /// 写一个全零的根目录块；全零镜像本身就是一个空文件系统
    pub fn format(&mut self) -> Result<()> {
        if self.disk.block_count() == 0 {
            return Err(FsError::OutOfRange(ROOT_BLOCK_ID));
        }
        self.disk.write_block(ROOT_BLOCK_ID, &ZERO_BLOCK)?;
        self.disk.sync()?;
        self.bitmap = BlockBitmap::new(self.disk.block_count());
        info!("formatted image: {} blocks", self.disk.block_count());
        Ok(())
    }

    pub fn mount(&mut self) -> Result<()> {
        self.mount_with_progress(|_, _| {})
    }

    /// 扫描根目录、每个子目录和每条文件链，重建空闲块集合。
    /// `progress(done, total)` 在每个子目录扫描完后调用
    pub fn mount_with_progress(&mut self, mut progress: impl FnMut(usize, usize)) -> Result<()> {
        let total_blocks = self.disk.block_count();
        let mut bitmap = BlockBitmap::new(total_blocks);
        let root = self.load_root()?;

        let populated = root.populated();
        if populated != root.directory_count() {
            warn!(
                "root directory count is {} but {} slots are in use",
                root.directory_count(),
                populated
            );
        }

        for (done, dir) in root.entries().enumerate() {
            let dir_name = dir.name();
            let dir_block = dir
                .start_block()
                .ok_or_else(|| FsError::Corrupted(format!("directory /{} has no block", dir_name)))?;
            claim(&mut bitmap, dir_block, &dir_name)?;

            let sub = self.load_subdir(dir_block)?;
            if sub.populated() != sub.file_count() {
                warn!(
                    "directory /{} count is {} but {} slots are in use",
                    dir_name,
                    sub.file_count(),
                    sub.populated()
                );
            }

            for file in sub.entries() {
                let path = format!("/{}/{}", dir_name, file.full_name());
                let chain = self.collect_chain(file.start_block())?;
                if (chain.len() as u64) < blocks_for(file.size()) {
                    return Err(FsError::Corrupted(format!(
                        "{} is {} bytes but has only {} blocks",
                        path,
                        file.size(),
                        chain.len()
                    )));
                }
                for block in chain {
                    claim(&mut bitmap, block, &path)?;
                }
            }
            debug!("scanned /{} ({} files)", dir_name, sub.populated());
            progress(done + 1, populated);
        }

        self.bitmap = bitmap;
        info!(
            "mounted: {} directories, {}/{} blocks free",
            populated,
            self.bitmap.free_blocks(),
            total_blocks
        );
        Ok(())
    }

    pub fn sync(&self) -> Result<()> {
        self.disk.sync()
    }

    /// 刷盘并交出底层磁盘
    pub fn unmount(self) -> Result<D> {
        self.disk.sync()?;
        info!("unmounted");
        Ok(self.disk)
    }

    pub fn usage(&self) -> Result<Usage> {
        Ok(Usage {
            total_blocks: self.bitmap.total_blocks(),
            free_blocks: self.bitmap.free_blocks(),
            directories: self.load_root()?.populated(),
            max_directories: MAX_DIRS,
            max_files_per_directory: MAX_FILES,
        })
    }
}

/// 挂载扫描时占用一个块；越界或被第二次引用都算损坏
fn claim(bitmap: &mut BlockBitmap, block: u64, owner: &str) -> Result<()> {
    if block >= bitmap.total_blocks() {
        return Err(FsError::Corrupted(format!(
            "{} references block {} outside the image",
            owner, block
        )));
    }
    if !bitmap.mark_used(block) {
        return Err(FsError::Corrupted(format!(
            "{} references block {} which is already in use",
            owner, block
        )));
    }
    Ok(())
}
