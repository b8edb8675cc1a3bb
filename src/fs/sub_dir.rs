use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    disk::{Block, BlockDevice, BLOCK_SIZE, ZERO_BLOCK},
    fs::{
        config::{block_ref, raw_block_ref, EXT_FIELD_LEN, MAX_FILES, NAME_FIELD_LEN, NO_BLOCK},
        error::{FsError, Result},
        name::{display_name, from_field, to_field, validate_file_name},
        FileSystem,
    },
};

/// 子目录中的一个文件项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    name: [u8; NAME_FIELD_LEN],
    ext: [u8; EXT_FIELD_LEN],
    size: u64,
    start_block: i64,
}

impl FileEntry {
    pub const EMPTY: Self = Self {
        name: [0; NAME_FIELD_LEN],
        ext: [0; EXT_FIELD_LEN],
        size: 0,
        start_block: NO_BLOCK,
    };

    fn new(name: &str, ext: &str) -> Self {
        Self {
            name: to_field(name),
            ext: to_field(ext),
            size: 0,
            start_block: NO_BLOCK,
        }
    }

    pub fn is_used(&self) -> bool {
        self.name[0] != 0
    }

    pub fn name(&self) -> String {
        from_field(&self.name)
    }

    pub fn ext(&self) -> String {
        from_field(&self.ext)
    }

    /// `name.ext`，扩展名为空时只有 `name`
    pub fn full_name(&self) -> String {
        display_name(&self.name(), &self.ext())
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn start_block(&self) -> Option<u64> {
        block_ref(self.start_block)
    }
}

/// 子目录块：`file_count: i32` + `MAX_FILES` 个文件项 + 填充
#[derive(Debug, Clone)]
pub struct SubDirectory {
    file_count: i32,
    files: [FileEntry; MAX_FILES],
}

impl SubDirectory {
    pub fn from_block(block: &Block) -> Result<Self> {
        let mut reader: &[u8] = &block[..];
        let file_count: i32 = bincode::deserialize_from(&mut reader)?;
        if file_count < 0 || file_count as usize > MAX_FILES {
            return Err(FsError::Corrupted(format!(
                "directory file count {} out of range",
                file_count
            )));
        }

        let mut files = [FileEntry::EMPTY; MAX_FILES];
        for slot in files.iter_mut() {
            *slot = bincode::deserialize_from(&mut reader)?;
        }
        Ok(Self { file_count, files })
    }

    pub fn to_block(&self) -> Result<Block> {
        let mut block = [0u8; BLOCK_SIZE];
        let mut writer: &mut [u8] = &mut block[..];
        bincode::serialize_into(&mut writer, &self.file_count)?;
        for entry in &self.files {
            bincode::serialize_into(&mut writer, entry)?;
        }
        Ok(block)
    }

    pub fn find(&self, name: &str, ext: &str) -> Option<usize> {
        self.files
            .iter()
            .position(|f| f.is_used() && f.name() == name && f.ext() == ext)
    }

    pub fn get(&self, index: usize) -> Option<&FileEntry> {
        self.files.get(index).filter(|f| f.is_used())
    }

    pub fn entries(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.iter().filter(|f| f.is_used())
    }

    pub fn file_count(&self) -> usize {
        self.file_count as usize
    }

    pub fn populated(&self) -> usize {
        self.entries().count()
    }
}

impl<D: BlockDevice> FileSystem<D> {
    pub(crate) fn load_subdir(&self, dir_block: u64) -> Result<SubDirectory> {
        let mut block = ZERO_BLOCK;
        self.disk.read_block(dir_block, &mut block)?;
        SubDirectory::from_block(&block)
    }

    fn store_subdir(&self, dir_block: u64, dir: &SubDirectory) -> Result<()> {
        self.disk.write_block(dir_block, &dir.to_block()?)
    }

    pub fn find_file(&self, dir_block: u64, name: &str, ext: &str) -> Result<usize> {
        self.load_subdir(dir_block)?
            .find(name, ext)
            .ok_or_else(|| FsError::NotFound(display_name(name, ext)))
    }

    pub fn file_entry(&self, dir_block: u64, index: usize) -> Result<FileEntry> {
        self.load_subdir(dir_block)?
            .get(index)
            .copied()
            .ok_or_else(|| FsError::NotFound(format!("file slot {} in block {}", index, dir_block)))
    }

    /// 新文件大小为 0，第一次写入前不占数据块
    pub fn insert_file(&mut self, dir_block: u64, name: &str, ext: &str) -> Result<usize> {
        validate_file_name(name, ext)?;
        let mut dir = self.load_subdir(dir_block)?;
        if dir.find(name, ext).is_some() {
            return Err(FsError::AlreadyExists(display_name(name, ext)));
        }
        let full = || FsError::DirectoryFull(display_name(name, ext));
        if dir.file_count() >= MAX_FILES {
            return Err(full());
        }
        let index = dir.files.iter().position(|f| !f.is_used()).ok_or_else(full)?;

        dir.files[index] = FileEntry::new(name, ext);
        dir.file_count += 1;
        self.store_subdir(dir_block, &dir)?;

        debug!(
            "created file {} in block {} (slot {})",
            display_name(name, ext),
            dir_block,
            index
        );
        Ok(index)
    }

    /// 先清空文件项并落盘，再释放整条数据块链
    pub fn remove_file_entry(&mut self, dir_block: u64, name: &str, ext: &str) -> Result<()> {
        let mut dir = self.load_subdir(dir_block)?;
        let index = dir
            .find(name, ext)
            .ok_or_else(|| FsError::NotFound(display_name(name, ext)))?;
        let start = dir.files[index].start_block();

        dir.files[index] = FileEntry::EMPTY;
        dir.file_count = (dir.file_count - 1).max(0);
        self.store_subdir(dir_block, &dir)?;

        let freed = self.free_chain(start)?;
        debug!(
            "removed file {} from block {}, freed {} blocks",
            display_name(name, ext),
            dir_block,
            freed
        );
        Ok(())
    }

    /// 只更新大小；调用方负责事先让数据块链与新大小一致
    pub fn update_size(&mut self, dir_block: u64, index: usize, new_size: u64) -> Result<()> {
        self.modify_entry(dir_block, index, |entry| entry.size = new_size)
    }

    pub(crate) fn set_start_block(
        &mut self,
        dir_block: u64,
        index: usize,
        start: Option<u64>,
    ) -> Result<()> {
        self.modify_entry(dir_block, index, |entry| {
            entry.start_block = raw_block_ref(start)
        })
    }

    fn modify_entry(
        &mut self,
        dir_block: u64,
        index: usize,
        f: impl FnOnce(&mut FileEntry),
    ) -> Result<()> {
        let mut dir = self.load_subdir(dir_block)?;
        match dir.files.get_mut(index) {
            Some(entry) if entry.is_used() => f(entry),
            _ => {
                return Err(FsError::NotFound(format!(
                    "file slot {} in block {}",
                    index, dir_block
                )))
            }
        }
        self.store_subdir(dir_block, &dir)
    }
}
