use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    disk::{Block, BlockDevice, BLOCK_SIZE, ZERO_BLOCK},
    fs::{
        config::{block_ref, MAX_DIRS, NAME_FIELD_LEN, NO_BLOCK, ROOT_BLOCK_ID},
        error::{FsError, Result},
        name::{from_field, to_field, validate_dir_name},
        FileSystem,
    },
};

/// 根目录中的一项：目录名 + 子目录块号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    name: [u8; NAME_FIELD_LEN],
    start_block: i64,
}

impl DirEntry {
    pub const EMPTY: Self = Self {
        name: [0; NAME_FIELD_LEN],
        start_block: NO_BLOCK,
    };

    pub fn is_used(&self) -> bool {
        self.name[0] != 0
    }

    pub fn name(&self) -> String {
        from_field(&self.name)
    }

    pub fn start_block(&self) -> Option<u64> {
        block_ref(self.start_block)
    }
}

/// 0 号块：`directory_count: i32` + `MAX_DIRS` 个目录项 + 填充
#[derive(Debug, Clone)]
pub struct RootDirectory {
    directory_count: i32,
    directories: [DirEntry; MAX_DIRS],
}

impl RootDirectory {
    pub fn empty() -> Self {
        Self {
            directory_count: 0,
            directories: [DirEntry::EMPTY; MAX_DIRS],
        }
    }

    pub fn from_block(block: &Block) -> Result<Self> {
        let mut reader: &[u8] = &block[..];
        let directory_count: i32 = bincode::deserialize_from(&mut reader)?;
        if directory_count < 0 || directory_count as usize > MAX_DIRS {
            return Err(FsError::Corrupted(format!(
                "root directory count {} out of range",
                directory_count
            )));
        }

        let mut directories = [DirEntry::EMPTY; MAX_DIRS];
        for slot in directories.iter_mut() {
            *slot = bincode::deserialize_from(&mut reader)?;
        }
        Ok(Self {
            directory_count,
            directories,
        })
    }

    pub fn to_block(&self) -> Result<Block> {
        let mut block = [0u8; BLOCK_SIZE];
        let mut writer: &mut [u8] = &mut block[..];
        bincode::serialize_into(&mut writer, &self.directory_count)?;
        for entry in &self.directories {
            bincode::serialize_into(&mut writer, entry)?;
        }
        Ok(block)
    }

    /// 精确匹配（区分大小写）
    pub fn find(&self, name: &str) -> Option<usize> {
        self.directories
            .iter()
            .position(|d| d.is_used() && d.name() == name)
    }

    /// 已占用的目录项，按槽位顺序
    pub fn entries(&self) -> impl Iterator<Item = &DirEntry> {
        self.directories.iter().filter(|d| d.is_used())
    }

    pub fn directory_count(&self) -> usize {
        self.directory_count as usize
    }

    /// 计数字段与实际占用槽位不一致时返回实际数量
    pub fn populated(&self) -> usize {
        self.entries().count()
    }
}

impl<D: BlockDevice> FileSystem<D> {
    pub(crate) fn load_root(&self) -> Result<RootDirectory> {
        let mut block = ZERO_BLOCK;
        self.disk.read_block(ROOT_BLOCK_ID, &mut block)?;
        RootDirectory::from_block(&block)
    }

    fn store_root(&self, root: &RootDirectory) -> Result<()> {
        self.disk.write_block(ROOT_BLOCK_ID, &root.to_block()?)
    }

    /// 按名字查找子目录，返回（槽位，子目录块号）
    pub fn find_directory(&self, name: &str) -> Result<(usize, u64)> {
        let root = self.load_root()?;
        let index = root
            .find(name)
            .ok_or_else(|| FsError::NotFound(format!("/{}", name)))?;
        let block = root.directories[index]
            .start_block()
            .ok_or_else(|| FsError::Corrupted(format!("directory /{} has no block", name)))?;
        Ok((index, block))
    }

    /// 新建子目录：先写好全零的子目录块，再让根目录项指向它
    pub fn insert_directory(&mut self, name: &str) -> Result<usize> {
        validate_dir_name(name)?;
        let mut root = self.load_root()?;
        if root.find(name).is_some() {
            return Err(FsError::AlreadyExists(format!("/{}", name)));
        }
        if root.directory_count() >= MAX_DIRS {
            return Err(FsError::DirectoryTableFull);
        }
        let index = root
            .directories
            .iter()
            .position(|d| !d.is_used())
            .ok_or(FsError::DirectoryTableFull)?;

        let block = self.bitmap.alloc()?;
        if let Err(e) = self.disk.write_block(block, &ZERO_BLOCK) {
            self.bitmap.free(block);
            return Err(e);
        }

        root.directories[index] = DirEntry {
            name: to_field(name),
            start_block: block as i64,
        };
        root.directory_count += 1;
        if let Err(e) = self.store_root(&root) {
            self.bitmap.free(block);
            return Err(e);
        }

        debug!("created directory /{} at block {} (slot {})", name, block, index);
        Ok(index)
    }

    /// 删除空的子目录：先清空根目录项并落盘，再释放子目录块
    pub fn remove_directory_entry(&mut self, name: &str) -> Result<()> {
        let mut root = self.load_root()?;
        let index = root
            .find(name)
            .ok_or_else(|| FsError::NotFound(format!("/{}", name)))?;
        let block = root.directories[index].start_block();

        if let Some(block) = block {
            if self.load_subdir(block)?.populated() > 0 {
                return Err(FsError::DirectoryNotEmpty(format!("/{}", name)));
            }
        }

        root.directories[index] = DirEntry::EMPTY;
        root.directory_count = (root.directory_count - 1).max(0);
        self.store_root(&root)?;

        if let Some(block) = block {
            self.bitmap.free(block);
        }
        debug!("removed directory /{}", name);
        Ok(())
    }
}
