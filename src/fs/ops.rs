//! 面向宿主层（FUSE 一类）的操作接口：每个操作都只按路径寻址，调用之间不保存句柄状态。

use bitflags::bitflags;
use log::debug;

use crate::{
    disk::BlockDevice,
    fs::{
        error::{FsError, Result},
        path::FsPath,
        FileSystem,
    },
};

bitflags! {
    /// `st_mode` 中的类型位与权限位
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileMode: u32 {
        const S_IFDIR = 0o040000;
        const S_IFREG = 0o100000;

        const OWNER_READ = 0o400;
        const OWNER_WRITE = 0o200;
        const OWNER_EXEC = 0o100;
        const GROUP_READ = 0o040;
        const GROUP_WRITE = 0o020;
        const GROUP_EXEC = 0o010;
        const OTHER_READ = 0o004;
        const OTHER_WRITE = 0o002;
        const OTHER_EXEC = 0o001;
    }
}

impl FileMode {
    /// drwxr-xr-x
    pub fn directory() -> Self {
        Self::S_IFDIR | Self::from_bits_truncate(0o755)
    }

    /// -rw-rw-rw-
    pub fn regular() -> Self {
        Self::S_IFREG | Self::from_bits_truncate(0o666)
    }

    /// `ls -l` 风格的权限串
    pub fn permission_string(&self) -> String {
        let kind = if self.contains(Self::S_IFDIR) { 'd' } else { '-' };
        let bits = [
            (Self::OWNER_READ, 'r'),
            (Self::OWNER_WRITE, 'w'),
            (Self::OWNER_EXEC, 'x'),
            (Self::GROUP_READ, 'r'),
            (Self::GROUP_WRITE, 'w'),
            (Self::GROUP_EXEC, 'x'),
            (Self::OTHER_READ, 'r'),
            (Self::OTHER_WRITE, 'w'),
            (Self::OTHER_EXEC, 'x'),
        ];
        std::iter::once(kind)
            .chain(
                bits.iter()
                    .map(|&(flag, c)| if self.contains(flag) { c } else { '-' }),
            )
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAttr {
    pub kind: FileKind,
    pub size: u64,
    pub mode: FileMode,
    pub nlink: u32,
}

impl FileAttr {
    fn directory() -> Self {
        Self {
            kind: FileKind::Directory,
            size: 0,
            mode: FileMode::directory(),
            nlink: 2,
        }
    }

    fn file(size: u64) -> Self {
        Self {
            kind: FileKind::File,
            size,
            mode: FileMode::regular(),
            nlink: 1,
        }
    }
}

impl<D: BlockDevice> FileSystem<D> {
    pub fn stat(&self, path: &str) -> Result<FileAttr> {
        match FsPath::parse(path)? {
            FsPath::Root => Ok(FileAttr::directory()),
            FsPath::Directory { dir } => {
                self.find_directory(&dir)?;
                Ok(FileAttr::directory())
            }
            FsPath::File { dir, name, ext } => {
                let (_, dir_block) = self.find_directory(&dir)?;
                let index = self
                    .find_file(dir_block, &name, &ext)
                    .map_err(|e| with_path(e, path))?;
                Ok(FileAttr::file(self.file_entry(dir_block, index)?.size()))
            }
        }
    }

    /// `/` 列出子目录名，`/dir` 列出 `name.ext`，均按槽位顺序
    pub fn list_directory(&self, path: &str) -> Result<Vec<String>> {
        match FsPath::parse(path)? {
            FsPath::Root => Ok(self.load_root()?.entries().map(|d| d.name()).collect()),
            FsPath::Directory { dir } => {
                let (_, dir_block) = self.find_directory(&dir)?;
                Ok(self
                    .load_subdir(dir_block)?
                    .entries()
                    .map(|f| f.full_name())
                    .collect())
            }
            FsPath::File { .. } => {
                self.stat(path)?;
                Err(FsError::NotADirectory(path.to_string()))
            }
        }
    }

    pub fn create_directory(&mut self, path: &str) -> Result<()> {
        match FsPath::parse(path)? {
            FsPath::Root => Err(FsError::AlreadyExists(path.to_string())),
            FsPath::Directory { dir } => {
                self.insert_directory(&dir)?;
                debug!("mkdir {}", path);
                Ok(())
            }
            // 不支持嵌套子目录
            FsPath::File { .. } => Err(FsError::UnsupportedPath(path.to_string())),
        }
    }

    pub fn remove_directory(&mut self, path: &str) -> Result<()> {
        match FsPath::parse(path)? {
            FsPath::Root => Err(FsError::UnsupportedPath(path.to_string())),
            FsPath::Directory { dir } => {
                self.remove_directory_entry(&dir)?;
                debug!("rmdir {}", path);
                Ok(())
            }
            FsPath::File { .. } => {
                self.stat(path)?;
                Err(FsError::NotADirectory(path.to_string()))
            }
        }
    }

    /// 文件只能建在子目录里
    pub fn create_file(&mut self, path: &str) -> Result<()> {
        match FsPath::parse(path)? {
            FsPath::File { dir, name, ext } => {
                let (_, dir_block) = self.find_directory(&dir)?;
                self.insert_file(dir_block, &name, &ext)
                    .map_err(|e| with_path(e, path))?;
                debug!("mknod {}", path);
                Ok(())
            }
            _ => Err(FsError::UnsupportedPath(path.to_string())),
        }
    }

    pub fn remove_file(&mut self, path: &str) -> Result<()> {
        let (dir_block, name, ext) = self.file_path(path)?;
        self.remove_file_entry(dir_block, &name, &ext)
            .map_err(|e| with_path(e, path))?;
        debug!("unlink {}", path);
        Ok(())
    }

    pub fn read(&self, path: &str, offset: u64, length: u64) -> Result<Vec<u8>> {
        let (dir_block, index) = self.resolve_file(path)?;
        self.read_file(dir_block, index, offset, length)
    }

    pub fn write(&mut self, path: &str, offset: u64, bytes: &[u8]) -> Result<usize> {
        let (dir_block, index) = self.resolve_file(path)?;
        let written = self.write_file(dir_block, index, offset, bytes)?;
        debug!("write {} bytes to {} at {}", written, path, offset);
        Ok(written)
    }

    pub fn truncate(&mut self, path: &str, new_size: u64) -> Result<()> {
        let (dir_block, index) = self.resolve_file(path)?;
        self.truncate_file(dir_block, index, new_size)
    }

    /// 只检查文件是否存在
    pub fn open(&self, path: &str) -> Result<()> {
        self.resolve_file(path).map(|_| ())
    }

    /// 关闭文件时的回调：确认文件存在，然后刷盘
    pub fn flush(&self, path: &str) -> Result<()> {
        self.resolve_file(path)?;
        self.sync()
    }

    fn file_path(&self, path: &str) -> Result<(u64, String, String)> {
        match FsPath::parse(path)? {
            FsPath::File { dir, name, ext } => {
                let (_, dir_block) = self.find_directory(&dir)?;
                Ok((dir_block, name, ext))
            }
            FsPath::Root => Err(FsError::IsADirectory(path.to_string())),
            FsPath::Directory { dir } => {
                self.find_directory(&dir)?;
                Err(FsError::IsADirectory(path.to_string()))
            }
        }
    }

    fn resolve_file(&self, path: &str) -> Result<(u64, usize)> {
        let (dir_block, name, ext) = self.file_path(path)?;
        let index = self
            .find_file(dir_block, &name, &ext)
            .map_err(|e| with_path(e, path))?;
        Ok((dir_block, index))
    }
}

/// 子目录层只知道 `name.ext`，这里换成完整路径
fn with_path(e: FsError, path: &str) -> FsError {
    match e {
        FsError::NotFound(_) => FsError::NotFound(path.to_string()),
        FsError::AlreadyExists(_) => FsError::AlreadyExists(path.to_string()),
        FsError::DirectoryFull(_) => FsError::DirectoryFull(path.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        disk::mem_disk::MemDisk,
        fs::config::{MAX_DIRS, PAYLOAD_SIZE},
    };

    fn fresh_fs(blocks: u64) -> FileSystem<MemDisk> {
        let mut fs = FileSystem::new(MemDisk::new(blocks));
        fs.format().unwrap();
        fs
    }

    #[test]
    fn root_is_a_directory() {
        let fs = fresh_fs(16);
        let attr = fs.stat("/").unwrap();
        assert_eq!(attr.kind, FileKind::Directory);
        assert_eq!(attr.mode.permission_string(), "drwxr-xr-x");
        assert_eq!(attr.nlink, 2);
        assert!(fs.list_directory("/").unwrap().is_empty());
    }

    #[test]
    fn every_valid_directory_name_round_trips_through_stat() {
        let mut fs = fresh_fs(64);
        for name in ["a", "ab", "docs", "Mixed_1", "abcdefgh"] {
            let path = format!("/{}", name);
            fs.create_directory(&path).unwrap();
            assert_eq!(fs.stat(&path).unwrap().kind, FileKind::Directory);
            assert!(matches!(
                fs.create_directory(&path),
                Err(FsError::AlreadyExists(_))
            ));
        }
        assert_eq!(
            fs.list_directory("/").unwrap(),
            vec!["a", "ab", "docs", "Mixed_1", "abcdefgh"]
        );
    }

    #[test]
    fn long_directory_names_change_nothing() {
        let mut fs = fresh_fs(16);
        for name in ["abcdefghi", "averyveryverylongname"] {
            assert!(matches!(
                fs.create_directory(&format!("/{}", name)),
                Err(FsError::NameTooLong(_))
            ));
        }
        assert_eq!(fs.load_root().unwrap().directory_count(), 0);
        assert_eq!(fs.usage().unwrap().free_blocks, 15);
    }

    #[test]
    fn docs_scenario() {
        let mut fs = fresh_fs(64);
        fs.create_directory("/docs").unwrap();
        fs.create_file("/docs/a.txt").unwrap();
        fs.open("/docs/a.txt").unwrap();

        let bytes: Vec<u8> = (0..600u32).map(|i| (i % 251) as u8).collect();
        assert_eq!(fs.write("/docs/a.txt", 0, &bytes).unwrap(), 600);
        assert_eq!(fs.read("/docs/a.txt", 0, 600).unwrap(), bytes);

        let attr = fs.stat("/docs/a.txt").unwrap();
        assert_eq!(attr.kind, FileKind::File);
        assert_eq!(attr.size, 600);
        assert_eq!(attr.mode.permission_string(), "-rw-rw-rw-");
        assert_eq!(fs.list_directory("/docs").unwrap(), vec!["a.txt"]);
        // 根目录 + 目录块 + 2 个数据块
        assert_eq!(fs.usage().unwrap().free_blocks, 64 - 4);
    }

    #[test]
    fn truncate_then_stat_and_reuse() {
        let mut fs = fresh_fs(64);
        fs.create_directory("/d").unwrap();
        fs.create_file("/d/f.bin").unwrap();
        fs.write("/d/f.bin", 0, &vec![1u8; PAYLOAD_SIZE * 4]).unwrap();
        let free_before = fs.usage().unwrap().free_blocks;

        fs.truncate("/d/f.bin", PAYLOAD_SIZE as u64 + 1).unwrap();
        assert_eq!(fs.stat("/d/f.bin").unwrap().size, PAYLOAD_SIZE as u64 + 1);
        assert_eq!(fs.usage().unwrap().free_blocks, free_before + 2);

        // 块 2..=5 是数据块，截断后 4、5 空出来
        assert_eq!(fs.bitmap.alloc().unwrap(), 4);
    }

    #[test]
    fn remove_directory_requires_it_to_be_empty() {
        let mut fs = fresh_fs(64);
        fs.create_directory("/a").unwrap();
        fs.create_file("/a/x.txt").unwrap();
        assert!(matches!(
            fs.remove_directory("/a"),
            Err(FsError::DirectoryNotEmpty(_))
        ));

        fs.remove_file("/a/x.txt").unwrap();
        fs.remove_directory("/a").unwrap();
        assert!(fs.list_directory("/").unwrap().is_empty());
        assert!(matches!(fs.stat("/a"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn removing_a_file_reclaims_its_blocks() {
        let mut fs = fresh_fs(64);
        fs.create_directory("/a").unwrap();
        fs.create_file("/a/x").unwrap();
        fs.write("/a/x", 0, &[0u8; 2000]).unwrap();
        fs.remove_file("/a/x").unwrap();

        assert_eq!(fs.usage().unwrap().free_blocks, 64 - 2);
        assert!(matches!(fs.stat("/a/x"), Err(FsError::NotFound(_))));
        assert!(matches!(fs.remove_file("/a/x"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn unresolved_paths_are_not_found() {
        let mut fs = fresh_fs(16);
        assert!(matches!(fs.stat("/nope"), Err(FsError::NotFound(_))));
        assert!(matches!(fs.stat("/nope/a.txt"), Err(FsError::NotFound(_))));
        fs.create_directory("/d").unwrap();
        assert!(matches!(fs.stat("/d/a.txt"), Err(FsError::NotFound(_))));
        assert!(matches!(fs.open("/d/a.txt"), Err(FsError::NotFound(_))));
        assert!(matches!(
            fs.read("/d/a.txt", 0, 1),
            Err(FsError::NotFound(_))
        ));
        assert!(matches!(
            fs.create_file("/nope/a.txt"),
            Err(FsError::NotFound(_))
        ));
        // 超长名字不可能被创建，查找时只是找不到
        assert!(matches!(fs.stat("/abcdefghijk"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn nesting_and_misplaced_files_are_unsupported() {
        let mut fs = fresh_fs(16);
        fs.create_directory("/d").unwrap();
        assert!(matches!(
            fs.create_directory("/d/e"),
            Err(FsError::UnsupportedPath(_))
        ));
        assert!(matches!(
            fs.create_file("/top.txt"),
            Err(FsError::UnsupportedPath(_))
        ));
        assert!(matches!(
            fs.stat("/d/e/f.txt"),
            Err(FsError::UnsupportedPath(_))
        ));
        assert!(matches!(fs.stat("relative"), Err(FsError::UnsupportedPath(_))));
    }

    #[test]
    fn operations_on_the_wrong_kind() {
        let mut fs = fresh_fs(16);
        fs.create_directory("/d").unwrap();
        fs.create_file("/d/f.txt").unwrap();

        assert!(matches!(fs.read("/d", 0, 1), Err(FsError::IsADirectory(_))));
        assert!(matches!(fs.write("/", 0, b"x"), Err(FsError::IsADirectory(_))));
        assert!(matches!(fs.open("/d"), Err(FsError::IsADirectory(_))));
        assert!(matches!(
            fs.remove_file("/d"),
            Err(FsError::IsADirectory(_))
        ));
        assert!(matches!(
            fs.remove_directory("/d/f.txt"),
            Err(FsError::NotADirectory(_))
        ));
        assert!(matches!(
            fs.list_directory("/d/f.txt"),
            Err(FsError::NotADirectory(_))
        ));
    }

    #[test]
    fn bad_file_names() {
        let mut fs = fresh_fs(16);
        fs.create_directory("/d").unwrap();
        assert!(matches!(
            fs.create_file("/d/ninechars.txt"),
            Err(FsError::NameTooLong(_))
        ));
        assert!(matches!(
            fs.create_file("/d/a.json"),
            Err(FsError::NameTooLong(_))
        ));
        assert!(matches!(
            fs.create_file("/d/a.b.c"),
            Err(FsError::InvalidName(_))
        ));
        assert!(matches!(
            fs.create_directory("/a.b"),
            Err(FsError::InvalidName(_))
        ));
        // 结尾的 '.' 不会被当成空扩展名
        assert!(matches!(
            fs.create_file("/d/a."),
            Err(FsError::InvalidName(_))
        ));
        fs.create_file("/d/a").unwrap();
        assert!(matches!(fs.stat("/d/a."), Err(FsError::NotFound(_))));
        assert_eq!(fs.list_directory("/d").unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn directory_table_full() {
        let mut fs = fresh_fs(64);
        for i in 0..MAX_DIRS {
            fs.create_directory(&format!("/d{}", i)).unwrap();
        }
        assert!(matches!(
            fs.create_directory("/more"),
            Err(FsError::DirectoryTableFull)
        ));
    }

    #[test]
    fn flush_checks_existence() {
        let mut fs = fresh_fs(16);
        fs.create_directory("/d").unwrap();
        fs.create_file("/d/f").unwrap();
        fs.flush("/d/f").unwrap();
        assert!(matches!(fs.flush("/d/g"), Err(FsError::NotFound(_))));
    }
}
