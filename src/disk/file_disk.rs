use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use log::{debug, info, trace};

use crate::{
    disk::{
        block_device::BlockDevice,
        types::{Block, BLOCK_SIZE},
    },
    fs::error::{FsError, Result},
};

/// 以普通文件作为后备存储的磁盘。
/// 句柄在整个进程生命周期内只打开一次，随 `FileDisk` 一起释放。
#[derive(Debug)]
pub struct FileDisk {
    file: Mutex<File>,
    path: PathBuf,
    block_count: u64,
    created: bool,
}

impl FileDisk {
    /// 打开镜像；镜像不存在或不足一个块时，按 `blocks` 个块创建。
    pub fn open(path: impl AsRef<Path>, blocks: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let len = file.metadata()?.len();
        let created = len < BLOCK_SIZE as u64;
        if created {
            if blocks == 0 {
                return Err(FsError::OutOfRange(0));
            }
            info!(
                "allocating image {} ({} blocks of {} bytes)",
                path.display(),
                blocks,
                BLOCK_SIZE
            );
            let len = blocks
                .checked_mul(BLOCK_SIZE as u64)
                .ok_or(FsError::OutOfRange(blocks))?;
            file.set_len(len)?;
        }

        // 尾部不足一个块的字节不参与寻址
        let block_count = file.metadata()?.len() / BLOCK_SIZE as u64;
        debug!("opened image {} with {} blocks", path.display(), block_count);

        Ok(Self {
            file: Mutex::new(file),
            path,
            block_count,
            created,
        })
    }

    /// 本次打开时是否新建了镜像（新镜像需要格式化）
    pub fn created(&self) -> bool {
        self.created
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|_| FsError::IoFault(io::Error::other("disk handle lock poisoned")))
    }

    fn check_range(&self, block_id: u64) -> Result<()> {
        if block_id >= self.block_count {
            return Err(FsError::OutOfRange(block_id));
        }
        Ok(())
    }
}

impl BlockDevice for FileDisk {
    fn read_block(&self, block_id: u64, buf: &mut Block) -> Result<()> {
        self.check_range(block_id)?;
        trace!("read block {}", block_id);
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(block_id * BLOCK_SIZE as u64))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&self, block_id: u64, buf: &Block) -> Result<()> {
        self.check_range(block_id)?;
        trace!("write block {}", block_id);
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(block_id * BLOCK_SIZE as u64))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn block_count(&self) -> u64 {
        self.block_count
    }

    fn sync(&self) -> Result<()> {
        let file = self.lock()?;
        file.sync_all()?;
        Ok(())
    }
}
