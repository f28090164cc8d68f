//! 编译过程中唯一可能中断编译的错误。
//! 词法、语法、语义问题都作为 `Diagnostic` 数据返回，不会出现在这里。

use std::io;
use thiserror::Error;

use crate::symtab::StorageError;

/// 顶层的编译器错误枚举。
#[derive(Debug, Error)]
pub enum CompilerError {
    /// 符号表的二级存储不可用（磁盘写入失败、数据损坏等）
    #[error("symbol table storage failure: {0}")]
    Storage(#[from] StorageError),

    /// 读取源文件或输出结果失败
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize output: {0}")]
    Serialization(#[from] serde_json::Error),
}
