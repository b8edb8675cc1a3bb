use crate::fs::error::{FsError, Result};

/// 两级命名空间中的一条路径：`/`、`/dir` 或 `/dir/name.ext`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsPath {
    Root,
    Directory { dir: String },
    File { dir: String, name: String, ext: String },
}

impl FsPath {
    pub fn parse(path: &str) -> Result<Self> {
        let unsupported = || FsError::UnsupportedPath(path.to_string());

        let rest = path.strip_prefix('/').ok_or_else(unsupported)?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        if rest.is_empty() {
            return Ok(Self::Root);
        }

        let parts: Vec<&str> = rest.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(unsupported());
        }

        match parts.as_slice() {
            [dir] => Ok(Self::Directory {
                dir: dir.to_string(),
            }),
            [dir, file] => {
                // 以第一个 '.' 分隔文件名和扩展名；结尾的 '.' 留在文件名里，交给名字校验拒绝
                let (name, ext) = match file.split_once('.') {
                    Some((name, ext)) if !ext.is_empty() => (name, ext),
                    _ => (*file, ""),
                };
                Ok(Self::File {
                    dir: dir.to_string(),
                    name: name.to_string(),
                    ext: ext.to_string(),
                })
            }
            _ => Err(unsupported()),
        }
    }
}
