//! 声明表：一个有固定字节预算的驻留内存区，下面垫着一个不限大小的磁盘区。
//!
//! 插入时如果超出预算，先把最早插入的一半（向上取整，至少一条）记录换出到磁盘，
//! 再把新记录放进内存。查找先查内存，再查磁盘。

mod disk;
mod record;


use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use disk::SecondaryStore;
pub use record::{Param, SymbolCategory, SymbolRecord};

/// 默认的驻留内存预算（字节）。
pub const DEFAULT_BUDGET: usize = 100;
/// 每条记录的固定开销，预算检查和统计信息共用同一个值。
pub const ENTRY_OVERHEAD: usize = 10;

/// 二级存储不可用时的致命错误。
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cannot create secondary storage: {0}")]
    Create(#[source] io::Error),

    #[error("cannot access secondary storage {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("secondary storage {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 记录当前所在的存储区。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Residency {
    Memory,
    Disk,
}

impl fmt::Display for Residency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Residency::Memory => f.pad("MEM"),
            Residency::Disk => f.pad("DISK"),
        }
    }
}

/// 内存使用情况的快照。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub resident_bytes: usize,
    pub budget: usize,
    pub resident_count: usize,
    pub secondary_count: usize,
    pub total_count: usize,
}

#[derive(Debug)]
pub struct SymbolTable {
    /// 按插入顺序排列的驻留记录
    memory: Vec<SymbolRecord>,
    resident_bytes: usize,
    budget: usize,
    disk: SecondaryStore,
}

impl SymbolTable {
    pub fn new() -> Result<Self, StorageError> {
        Self::with_budget(DEFAULT_BUDGET)
    }

    pub fn with_budget(budget: usize) -> Result<Self, StorageError> {
        let disk = SecondaryStore::new()?;
        log::debug!(
            "symbol table created, budget {} bytes, secondary storage at {}",
            budget,
            disk.path().display()
        );
        Ok(Self {
            memory: Vec::new(),
            resident_bytes: 0,
            budget,
            disk,
        })
    }

    /// 插入一条记录。同一标识符已经驻留时原地替换。
    ///
    /// 注意：换出只按条数计算。一条本身就超过预算的记录依然会被放进内存，
    /// 不会再触发第二次换出。
    pub fn insert(&mut self, record: SymbolRecord) -> Result<(), StorageError> {
        if let Some(slot) = self
            .memory
            .iter_mut()
            .find(|r| r.identifier == record.identifier)
        {
            *slot = record;
            return Ok(());
        }

        let cost = record.cost();
        if self.resident_bytes + cost > self.budget && !self.memory.is_empty() {
            self.spill()?;
        }
        self.resident_bytes += cost;
        self.memory.push(record);
        Ok(())
    }

    /// 把最早的一半驻留记录换出到磁盘。
    fn spill(&mut self) -> Result<(), StorageError> {
        let count = self.memory.len().div_ceil(2).max(1);
        let spilled: Vec<SymbolRecord> = self.memory.drain(..count).collect();
        log::debug!(
            "spilling {} symbol(s) to secondary storage: {}",
            spilled.len(),
            spilled
                .iter()
                .map(|r| r.identifier.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.disk.spill(spilled)?;
        self.resident_bytes = self.memory.iter().map(SymbolRecord::cost).sum();
        Ok(())
    }

    /// 按标识符查找，先查内存再查磁盘。
    pub fn lookup(&self, identifier: &str) -> Result<Option<SymbolRecord>, StorageError> {
        if let Some(record) = self.memory.iter().find(|r| r.identifier == identifier) {
            log::trace!("lookup `{}`: memory", identifier);
            return Ok(Some(record.clone()));
        }
        let found = self.disk.find(identifier)?;
        log::trace!(
            "lookup `{}`: {}",
            identifier,
            if found.is_some() { "disk" } else { "missing" }
        );
        Ok(found)
    }

    pub fn is_resident(&self, identifier: &str) -> bool {
        self.memory.iter().any(|r| r.identifier == identifier)
    }

    /// 合并两个存储区的完整列表：先是磁盘上的（更早的）记录，再是驻留记录；
    /// 驻留记录会遮蔽磁盘上的同名记录。
    pub fn listing(&self) -> Result<Vec<(SymbolRecord, Residency)>, StorageError> {
        let mut merged: Vec<(SymbolRecord, Residency)> = self
            .disk
            .read_all()?
            .into_iter()
            .filter(|r| !self.is_resident(&r.identifier))
            .map(|r| (r, Residency::Disk))
            .collect();
        merged.extend(self.memory.iter().cloned().map(|r| (r, Residency::Memory)));
        Ok(merged)
    }

    pub fn list(&self) -> Result<Vec<SymbolRecord>, StorageError> {
        Ok(self.listing()?.into_iter().map(|(r, _)| r).collect())
    }

    pub fn stats(&self) -> Result<MemoryStats, StorageError> {
        let secondary_count = self.disk.read_all()?.len();
        let total_count = self.listing()?.len();
        Ok(MemoryStats {
            resident_bytes: self.resident_bytes,
            budget: self.budget,
            resident_count: self.memory.len(),
            secondary_count,
            total_count,
        })
    }

    pub fn resident_bytes(&self) -> usize {
        self.resident_bytes
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// 二级存储文件的位置，随表一起删除。
    pub fn storage_path(&self) -> &Path {
        self.disk.path()
    }
}
