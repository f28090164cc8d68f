use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::{StorageError, SymbolRecord};

/// 二级存储：一个临时 JSON 文件，保存被换出的记录数组。
///
/// 文件在构造时创建并写入 `[]`，每次换出都整体重写；
/// `NamedTempFile` 在 Drop 时删除文件，所以任何退出路径上都不会留下残留。
#[derive(Debug)]
pub struct SecondaryStore {
    file: NamedTempFile,
}

impl SecondaryStore {
    pub fn new() -> Result<Self, StorageError> {
        let file = tempfile::Builder::new()
            .prefix("aigis-symbols-")
            .suffix(".json")
            .tempfile()
            .map_err(StorageError::Create)?;
        let store = Self { file };
        store.write_all(&[])?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    fn path_buf(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }

    /// 读取全部换出的记录，按换出的先后顺序排列。
    pub fn read_all(&self) -> Result<Vec<SymbolRecord>, StorageError> {
        let text = fs::read_to_string(self.path()).map_err(|source| StorageError::Io {
            path: self.path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| StorageError::Corrupt {
            path: self.path_buf(),
            source,
        })
    }

    fn write_all(&self, records: &[SymbolRecord]) -> Result<(), StorageError> {
        let text = serde_json::to_string_pretty(records).map_err(|source| StorageError::Corrupt {
            path: self.path_buf(),
            source,
        })?;
        fs::write(self.path(), text).map_err(|source| StorageError::Io {
            path: self.path_buf(),
            source,
        })
    }

    /// 追加一批换出的记录并重写整个文件。
    /// 同名的旧记录会被新记录替换，保证磁盘上每个键只出现一次。
    pub fn spill(&mut self, spilled: Vec<SymbolRecord>) -> Result<(), StorageError> {
        let mut records = self.read_all()?;
        for record in spilled {
            records.retain(|r| r.identifier != record.identifier);
            records.push(record);
        }
        self.write_all(&records)
    }

    pub fn find(&self, identifier: &str) -> Result<Option<SymbolRecord>, StorageError> {
        Ok(self
            .read_all()?
            .into_iter()
            .find(|r| r.identifier == identifier))
    }
}
