//! 8.3 名字的校验与定长字段编解码。

use crate::fs::{
    config::{MAX_EXTENSION, MAX_FILENAME},
    error::{FsError, Result},
};

fn has_forbidden_char(s: &str) -> bool {
    s.contains(['/', '\0', '.'])
}

/// 目录名：1~8 字节，不含扩展名
pub fn validate_dir_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_FILENAME {
        return Err(FsError::NameTooLong(name.to_string()));
    }
    if has_forbidden_char(name) {
        return Err(FsError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// 文件名 1~8 字节，扩展名 0~3 字节
pub fn validate_file_name(name: &str, ext: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_FILENAME || ext.len() > MAX_EXTENSION {
        return Err(FsError::NameTooLong(display_name(name, ext)));
    }
    if has_forbidden_char(name) || has_forbidden_char(ext) {
        return Err(FsError::InvalidName(display_name(name, ext)));
    }
    Ok(())
}

pub fn display_name(name: &str, ext: &str) -> String {
    if ext.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", name, ext)
    }
}

/// 写入定长字段，末尾以 NUL 补齐。调用方保证已经过校验
pub fn to_field<const N: usize>(s: &str) -> [u8; N] {
    let mut field = [0u8; N];
    let len = s.len().min(N - 1);
    field[..len].copy_from_slice(&s.as_bytes()[..len]);
    field
}

/// 读出定长字段中第一个 NUL 之前的内容
pub fn from_field(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
