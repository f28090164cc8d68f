//! aigis：词法分析、语法分析、语义分析与优化组成的编译器前端。

// 1. 声明所有模块
pub mod analyzer;
pub mod diagnostics;
pub mod lexer;
pub mod optimizer;
pub mod parser;
pub mod regen;
pub mod reporter;
pub mod symtab;
pub mod utils;

#[cfg(test)]
mod test;

// 2. 导入依赖
use analyzer::SemanticTable;
use diagnostics::Diagnostic;
use lexer::Token;
use parser::ast::Ast;
use reporter::CompilerError;
use symtab::{StorageError, SymbolTable, DEFAULT_BUDGET};

/// 一次编译的配置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// 没有语义错误时是否运行优化器
    pub optimize: bool,
    /// 声明表驻留内存的预算（字节）
    pub memory_budget: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            memory_budget: DEFAULT_BUDGET,
        }
    }
}

/// 语义分析加上可选的优化。
#[derive(Debug)]
pub struct ProgramAnalysis {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    /// 优化后的 AST；有语义错误或者没有要求优化时就是原来的 AST
    pub ast: Ast,
    /// 已应用的优化，没有运行优化器时为空
    pub applied: Vec<String>,
    /// 带作用域、初始化状态与引用次数的符号表
    pub symbols: SemanticTable,
}

impl ProgramAnalysis {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// 对已经解析好的程序做语义分析；`optimize` 为真并且没有语义错误时再运行优化器。
///
/// 只有声明表的二级存储不可用时才返回 `Err`。
pub fn analyze_program(
    ast: &Ast,
    table: &SymbolTable,
    optimize: bool,
) -> Result<ProgramAnalysis, StorageError> {
    let analysis = analyzer::analyze(ast, table)?;

    let (ast, applied) = if optimize && !analysis.has_errors() {
        let optimized = optimizer::optimize(ast, Some(&analysis.symbols));
        (optimized.ast, optimized.applied)
    } else {
        (ast.clone(), Vec::new())
    };

    Ok(ProgramAnalysis {
        errors: analysis.errors,
        warnings: analysis.warnings,
        ast,
        applied,
        symbols: analysis.symbols,
    })
}

/// 一次编译的全部结果。
#[derive(Debug)]
pub struct Compilation {
    pub tokens: Vec<Token>,
    /// 无效 Token 的提示，不影响编译
    pub lexical: Vec<Diagnostic>,
    pub syntax: Vec<Diagnostic>,
    /// 语法分析得到的 AST
    pub parsed: Ast,
    /// 语法分析阶段填充的声明表
    pub declarations: SymbolTable,
    pub analysis: ProgramAnalysis,
}

impl Compilation {
    /// 出现了语法错误或语义错误。
    pub fn has_errors(&self) -> bool {
        !self.syntax.is_empty() || self.analysis.has_errors()
    }

    /// 所有诊断，按词法、语法、语义错误、警告的顺序。
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.lexical
            .iter()
            .chain(&self.syntax)
            .chain(&self.analysis.errors)
            .chain(&self.analysis.warnings)
    }
}

/// 编译一段源代码。
///
/// 语法错误不会中断编译：语义分析照常在（可能不完整的）AST 上进行，
/// 所有问题都以诊断的形式返回。只有声明表的二级存储不可用时才返回 `Err`。
pub fn compile(source: &str, options: &CompileOptions) -> Result<Compilation, CompilerError> {
    // 1. 词法分析
    let tokens = lexer::lex(source);
    let lexical = lexer::invalid_token_diagnostics(&tokens);

    // 2. 语法分析，同时填充声明表
    let mut declarations = SymbolTable::with_budget(options.memory_budget)?;
    let parsed = parser::parse(&tokens, &mut declarations)?;

    // 3. 语义分析与优化
    let analysis = analyze_program(&parsed.ast, &declarations, options.optimize)?;

    log::info!(
        "compiled {} tokens: {} syntax error(s), {} semantic error(s), {} warning(s), {} optimization(s)",
        tokens.len(),
        parsed.diagnostics.len(),
        analysis.errors.len(),
        analysis.warnings.len(),
        analysis.applied.len()
    );
    Ok(Compilation {
        tokens,
        lexical,
        syntax: parsed.diagnostics,
        parsed: parsed.ast,
        declarations,
        analysis,
    })
}
