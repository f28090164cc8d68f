// src/analyzer/scope.rs

use std::collections::HashMap;

use crate::symtab::{SymbolCategory, SymbolRecord};
use crate::utils::Span;

/// 作用域在作用域树中的下标。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// 符号在语义符号表中的下标。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(usize);

/// 代表一个独立的作用域，例如一个函数体或一个 while 循环体
#[derive(Debug)]
struct Scope {
    /// 点号连接的完整路径，例如 `global.func_main_1.while_2`
    path: String,
    parent: Option<ScopeId>,
    bindings: HashMap<String, SymbolId>,
}

#[derive(Debug)]
struct Entry {
    record: SymbolRecord,
    /// 来自声明表、还没有被对应的声明认领
    seeded: bool,
    /// 声明所在的源码位置，预置记录在被认领之前没有
    span: Option<Span>,
}

/// 语义符号表：一棵作用域树，每个作用域持有自己的名字绑定和指向父作用域的下标。
///
/// 查找从给定作用域开始逐层向外，直到 `global`。
#[derive(Debug)]
pub struct SemanticTable {
    scopes: Vec<Scope>,
    entries: Vec<Entry>,
}

impl Default for SemanticTable {
    fn default() -> Self {
        Self {
            scopes: vec![Scope {
                path: "global".to_string(),
                parent: None,
                bindings: HashMap::new(),
            }],
            entries: Vec::new(),
        }
    }
}

impl SemanticTable {
    /// 创建一个只包含 `global` 作用域的符号表
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    /// 在 `parent` 下创建一个新的子作用域，路径为 `父路径.segment`。
    pub fn enter(&mut self, parent: ScopeId, segment: &str) -> ScopeId {
        let path = format!("{}.{}", self.scopes[parent.0].path, segment);
        log::trace!("enter scope {}", path);
        self.scopes.push(Scope {
            path,
            parent: Some(parent),
            bindings: HashMap::new(),
        });
        ScopeId(self.scopes.len() - 1)
    }

    pub fn path(&self, scope: ScopeId) -> &str {
        &self.scopes[scope.0].path
    }

    /// 登记一条来自声明表的记录，等待之后的声明认领。
    pub fn seed(&mut self, scope: ScopeId, record: SymbolRecord) {
        let record = record.with_scope(self.path(scope));
        let id = SymbolId(self.entries.len());
        self.scopes[scope.0]
            .bindings
            .insert(record.identifier.clone(), id);
        self.entries.push(Entry {
            record,
            seeded: true,
            span: None,
        });
    }

    /// 在 `scope` 中声明一个符号。
    ///
    /// 同一作用域中已有同名且未被认领的预置记录时，认领它并保留已经累积的引用次数；
    /// 已有同名的普通记录时返回 `Err` 并带上已有记录的下标。
    pub fn declare(&mut self, scope: ScopeId, record: SymbolRecord) -> Result<SymbolId, SymbolId> {
        let record = record.with_scope(self.path(scope));
        if let Some(&existing) = self.scopes[scope.0].bindings.get(&record.identifier) {
            let entry = &mut self.entries[existing.0];
            if !entry.seeded {
                return Err(existing);
            }
            let references = entry.record.references;
            entry.record = record;
            entry.record.references = references;
            entry.seeded = false;
            return Ok(existing);
        }

        let id = SymbolId(self.entries.len());
        self.scopes[scope.0]
            .bindings
            .insert(record.identifier.clone(), id);
        self.entries.push(Entry {
            record,
            seeded: false,
            span: None,
        });
        Ok(id)
    }

    pub fn set_span(&mut self, id: SymbolId, span: Span) {
        self.entries[id.0].span = Some(span);
    }

    /// 符号声明的位置。
    pub fn span(&self, id: SymbolId) -> Option<Span> {
        self.entries[id.0].span
    }

    /// 从 `scope` 开始由内向外查找一个名字。
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.0];
            if let Some(&symbol) = scope.bindings.get(name) {
                log::trace!("resolved `{}` in {}", name, scope.path);
                return Some(symbol);
            }
            current = scope.parent;
        }
        log::trace!("`{}` is not visible from {}", name, self.path(scope));
        None
    }

    pub fn get(&self, id: SymbolId) -> &SymbolRecord {
        &self.entries[id.0].record
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut SymbolRecord {
        &mut self.entries[id.0].record
    }

    /// 所有符号，按登记顺序排列。
    pub fn symbols(&self) -> impl Iterator<Item = &SymbolRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    /// 第一个名为 `identifier` 的符号，不论所在作用域。
    pub fn find(&self, identifier: &str) -> Option<&SymbolRecord> {
        self.symbols().find(|r| r.identifier == identifier)
    }

    /// 指定作用域路径中名为 `identifier` 的符号。
    pub fn find_in(&self, path: &str, identifier: &str) -> Option<&SymbolRecord> {
        self.symbols()
            .find(|r| r.scope == path && r.identifier == identifier)
    }

    /// 全局函数被引用的次数；没有这个全局函数时返回 `None`。
    pub fn function_references(&self, name: &str) -> Option<usize> {
        let id = self.scopes[0].bindings.get(name)?;
        let record = &self.entries[id.0].record;
        (record.category == SymbolCategory::Function).then_some(record.references)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
