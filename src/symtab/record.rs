use serde::{Deserialize, Serialize};
use std::fmt;

use super::ENTRY_OVERHEAD;

/// 符号的种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolCategory {
    Variable,
    Parameter,
    Function,
    Model,
    Template,
}

impl fmt::Display for SymbolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolCategory::Variable => "variable",
            SymbolCategory::Parameter => "parameter",
            SymbolCategory::Function => "function",
            SymbolCategory::Model => "model",
            SymbolCategory::Template => "template",
        };
        f.pad(name)
    }
}

/// 函数签名中的一个参数。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// 声明表中的一条记录，同时也是二级存储的持久化格式。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub identifier: String,
    pub category: SymbolCategory,
    #[serde(rename = "type")]
    pub ty: String,
    pub scope: String,
    pub line: usize,
    pub initialized: bool,
    pub references: usize,
    pub size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Param>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
}

impl SymbolRecord {
    pub fn new(
        identifier: impl Into<String>,
        category: SymbolCategory,
        ty: impl Into<String>,
        line: usize,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            category,
            ty: ty.into(),
            scope: "global".to_string(),
            line,
            initialized: false,
            references: 0,
            size: 0,
            params: None,
            return_type: None,
        }
    }

    pub fn initialized(mut self, initialized: bool) -> Self {
        self.initialized = initialized;
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// 附加函数签名：参数列表与返回类型。
    pub fn with_signature(mut self, params: Vec<Param>, return_type: impl Into<String>) -> Self {
        self.params = Some(params);
        self.return_type = Some(return_type.into());
        self
    }

    /// 在驻留内存中占用的字节数：标识符长度加上固定开销。
    pub fn cost(&self) -> usize {
        self.identifier.len() + ENTRY_OVERHEAD
    }
}
