// In src/analyzer/mod.rs

// 1. 声明所有模块
mod expression;
mod function;
pub mod scope;
mod semantic_error;
mod statement;
pub mod types;


// 2. 导入依赖
use crate::diagnostics::{Diagnostic, DiagnosticBag, Label};
use crate::parser::ast::{Ast, NodeId, NodeKind};
use crate::symtab::{StorageError, SymbolCategory, SymbolRecord, SymbolTable};
pub use scope::{ScopeId, SemanticTable, SymbolId};
pub use semantic_error::SemanticError;
use types::Type;

/// 语义分析的结果。
#[derive(Debug)]
pub struct Analysis {
    /// 所有语义错误，按类型、声明、初始化、函数的顺序分组排列
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    /// 带有作用域、初始化状态与引用次数的符号表
    pub symbols: SemanticTable,
}

impl Analysis {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// 语义分析的入口：先用声明表预置全局符号，再遍历 AST，最后检查未使用的变量。
///
/// 所有语义问题都作为诊断返回；只有声明表的二级存储读取失败时才返回 `Err`。
pub fn analyze(ast: &Ast, table: &SymbolTable) -> Result<Analysis, StorageError> {
    let mut analyzer = Analyzer::new(ast);
    analyzer.seed(table.list()?);
    analyzer.check_program();
    Ok(analyzer.finish())
}

/// 当前正在分析的函数。
#[derive(Debug, Clone)]
struct FunctionContext {
    name: String,
    return_type: Type,
}

// --- Analyzer 结构体与实现 ---
pub struct Analyzer<'a> {
    ast: &'a Ast,
    table: SemanticTable,
    diagnostics: DiagnosticBag,
    scope: ScopeId,
    /// 作用域段的编号，在一次分析中单调递增
    counter: usize,
    function: Option<FunctionContext>,
}

impl<'a> Analyzer<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        let table = SemanticTable::new();
        let scope = table.global();
        Self {
            ast,
            table,
            diagnostics: DiagnosticBag::new(),
            scope,
            counter: 0,
            function: None,
        }
    }

    /// 第一阶段：用语法分析阶段的声明表预置全局符号。
    fn seed(&mut self, records: Vec<SymbolRecord>) {
        let global = self.table.global();
        for record in records {
            let size = Type::from_name(&record.ty).size();
            let mut record = record.with_size(size);
            record.references = 0;
            self.table.seed(global, record);
        }
        log::debug!("seeded {} symbol(s) from the declaration table", self.table.len());
    }

    /// 第二阶段：遍历程序的顶层语句。
    fn check_program(&mut self) {
        let root = self.ast.root();
        let statements = self.ast.statements(root).to_vec();
        self.check_statements(&statements);
    }

    /// 第三阶段：报告未使用的变量，并把错误按分类排序。
    fn finish(mut self) -> Analysis {
        let unused: Vec<_> = self
            .table
            .symbols()
            .filter(|r| r.category == SymbolCategory::Variable && r.references == 0)
            .map(|r| r.identifier.clone())
            .collect();
        for name in unused {
            self.diagnostics.report(
                SemanticError::UnusedVariable { name }.into_diagnostic(Default::default()),
            );
        }

        let (mut errors, warnings): (Vec<_>, Vec<_>) =
            self.diagnostics.into_iter().partition(Diagnostic::is_error);
        // 稳定排序：同一分类内保持发现顺序
        errors.sort_by_key(Diagnostic::category);

        log::debug!(
            "semantic analysis finished: {} error(s), {} warning(s), {} symbol(s)",
            errors.len(),
            warnings.len(),
            self.table.len()
        );
        Analysis {
            errors,
            warnings,
            symbols: self.table,
        }
    }

    // --- 共用的辅助方法 ---

    fn report(&mut self, error: SemanticError, node: NodeId) {
        let span = self.ast.node(node).span.unwrap_or_default();
        log::trace!("semantic diagnostic at line {}: {}", self.ast.line(node), error);
        self.diagnostics.report(error.into_diagnostic(span));
    }

    /// 进入一个以 `kind_name` 命名的新作用域段，返回之前的作用域以便退出时恢复。
    fn enter_scope(&mut self, name: &str) -> ScopeId {
        self.counter += 1;
        let segment = format!("{}_{}", name, self.counter);
        let previous = self.scope;
        self.scope = self.table.enter(previous, &segment);
        previous
    }

    fn exit_scope(&mut self, previous: ScopeId) {
        log::trace!("exit scope {}", self.table.path(self.scope));
        self.scope = previous;
    }

    /// 在 `scope` 中声明符号，重复声明时报告错误。
    fn declare(&mut self, scope: ScopeId, record: SymbolRecord, node: NodeId) -> Option<SymbolId> {
        let kind = match record.category {
            SymbolCategory::Variable => "Variable",
            SymbolCategory::Parameter => "Parameter",
            SymbolCategory::Function => "Function",
            SymbolCategory::Model => "Model",
            SymbolCategory::Template => "Template",
        };
        let name = record.identifier.clone();
        let span = self.ast.node(node).span.unwrap_or_default();
        match self.table.declare(scope, record) {
            Ok(id) => {
                self.table.set_span(id, span);
                Some(id)
            }
            Err(existing) => {
                let mut diagnostic = SemanticError::Duplicate { kind, name }.into_diagnostic(span);
                if let Some(first) = self.table.span(existing) {
                    diagnostic = diagnostic
                        .with_secondary_label(Label::new(first, "first declared here"));
                }
                log::trace!("semantic diagnostic at line {}: {}", self.ast.line(node), diagnostic);
                self.diagnostics.report(diagnostic);
                None
            }
        }
    }

    /// 查找一个被读取的变量：未声明与未初始化都会报告，找到时增加引用次数。
    fn use_variable(&mut self, name: &str, node: NodeId) -> Type {
        let Some(id) = self.table.resolve(self.scope, name) else {
            self.report(
                SemanticError::Undeclared {
                    name: name.to_string(),
                },
                node,
            );
            return Type::Unknown;
        };
        if !self.table.get(id).initialized {
            self.report(
                SemanticError::Uninitialized {
                    name: name.to_string(),
                },
                node,
            );
        }
        let record = self.table.get_mut(id);
        record.references += 1;
        match record.category {
            SymbolCategory::Function => Type::Function,
            _ => Type::from_name(&record.ty),
        }
    }

    fn is_kind(&self, id: NodeId, kind: NodeKind) -> bool {
        self.ast.kind(id) == kind
    }
}
