use thiserror::Error;

/// 文件系统错误类型
#[derive(Debug, Error)]
pub enum FsError {
    #[error("No such file or directory: {0}")]
    NotFound(String),
    #[error("File or directory already exists: {0}")]
    AlreadyExists(String),
    #[error("Name too long (or empty) for 8.3 naming: {0}")]
    NameTooLong(String),
    #[error("Name contains a forbidden character: {0:?}")]
    InvalidName(String),
    #[error("Root directory table is full")]
    DirectoryTableFull,
    #[error("Directory is full: {0}")]
    DirectoryFull(String),
    #[error("Directory is not empty: {0}")]
    DirectoryNotEmpty(String),
    #[error("Disk space is full")]
    DiskFull,
    #[error("Offset {offset} is past the end of a {size}-byte file")]
    InvalidOffset { offset: u64, size: u64 },
    #[error("Unsupported path (only /dir and /dir/name.ext): {0}")]
    UnsupportedPath(String),
    #[error("Expected a file, found a directory: {0}")]
    IsADirectory(String),
    #[error("Expected a directory, found a file: {0}")]
    NotADirectory(String),
    #[error("Block {0} is outside the disk image")]
    OutOfRange(u64),
    #[error("Disk I/O error: {0}")]
    IoFault(#[from] std::io::Error),
    #[error("File system corrupted: {0}")]
    Corrupted(String),
}

impl From<bincode::Error> for FsError {
    fn from(e: bincode::Error) -> Self {
        match *e {
            bincode::ErrorKind::Io(io) => FsError::IoFault(io),
            other => FsError::Corrupted(other.to_string()),
        }
    }
}

// Linux errno values
const EPERM: i32 = 1;
const ENOENT: i32 = 2;
const EIO: i32 = 5;
const EEXIST: i32 = 17;
const ENOTDIR: i32 = 20;
const EISDIR: i32 = 21;
const EINVAL: i32 = 22;
const ENOSPC: i32 = 28;
const ENAMETOOLONG: i32 = 36;
const ENOTEMPTY: i32 = 39;

impl FsError {
    /// 宿主（FUSE 一类）层回给内核的错误码，调用方自行取负
    pub fn errno(&self) -> i32 {
        match self {
            Self::NotFound(_) => ENOENT,
            Self::AlreadyExists(_) => EEXIST,
            Self::NameTooLong(_) => ENAMETOOLONG,
            Self::InvalidName(_) => EINVAL,
            // 根目录满时和 mkdir 的传统返回值一致
            Self::DirectoryTableFull => EPERM,
            Self::DirectoryFull(_) => ENOSPC,
            Self::DirectoryNotEmpty(_) => ENOTEMPTY,
            Self::DiskFull => ENOSPC,
            Self::InvalidOffset { .. } => EINVAL,
            Self::UnsupportedPath(_) => EPERM,
            Self::IsADirectory(_) => EISDIR,
            Self::NotADirectory(_) => ENOTDIR,
            Self::OutOfRange(_) | Self::IoFault(_) | Self::Corrupted(_) => EIO,
        }
    }
}

/// 文件系统统一结果类型
pub type Result<T> = std::result::Result<T, FsError>;
