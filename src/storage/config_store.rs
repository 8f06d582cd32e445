//! 配置文件的读写后端
//!
//! 编解码只依赖 [`ConfigStore`]，设备和模拟器都使用基于文件系统的 [`FsStore`]。

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("无法打开或创建文件 {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("读取不完整: 需要 {expected} 字节, 实际 {actual} 字节")]
    ShortRead { expected: usize, actual: usize },

    #[error("文件读写失败: {0}")]
    Io(#[from] io::Error),
}

/// 整个文件的读写
pub trait ConfigStore {
    /// 读取全部内容，文件不存在时返回 `Ok(None)`
    fn load(&mut self) -> Result<Option<Vec<u8>>, StorageError>;

    /// 截断并重写整个文件
    fn store(&mut self, bytes: &[u8]) -> Result<(), StorageError>;
}

pub struct FsStore {
    path: PathBuf,
}

impl FsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 创建所在目录后返回存储
    pub fn open_in(folder: &Path, file_name: &str) -> Result<Self, StorageError> {
        fs::create_dir_all(folder).map_err(|source| StorageError::Open {
            path: folder.display().to_string(),
            source,
        })?;
        Ok(Self::new(folder.join(file_name)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_error(&self, source: io::Error) -> StorageError {
        StorageError::Open {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl ConfigStore for FsStore {
    fn load(&mut self) -> Result<Option<Vec<u8>>, StorageError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.open_error(e)),
        };

        let expected = file.metadata()?.len() as usize;
        let mut buf = Vec::with_capacity(expected);
        let actual = file.take(expected as u64).read_to_end(&mut buf)?;
        if actual != expected {
            return Err(StorageError::ShortRead { expected, actual });
        }
        Ok(Some(buf))
    }

    fn store(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let mut file = File::create(&self.path).map_err(|e| self.open_error(e))?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(())
    }
}
