//! src/parser/mod.rs
//!
//! 这个模块是编译器语法分析阶段的公共接口。
//! 它的职责是接收一个 Token 流，并将其转换为一个抽象语法树 (AST)，
//! 同时把全局声明登记到声明表中。

// 声明子模块。`pub mod ast` 使 AST 定义可以被编译器其他部分访问。
pub mod ast;
mod main;
//测试模块
#[cfg(test)]
mod test;

use crate::diagnostics::{Diagnostic, DiagnosticBag};
use crate::lexer::Token;
use crate::symtab::{StorageError, SymbolTable};
use ast::Ast;
use main::{Parse, Parser};

/// 语法分析的结果：AST 加上按出现顺序排列的语法诊断。
#[derive(Debug)]
pub struct ParseOutput {
    pub ast: Ast,
    pub diagnostics: Vec<Diagnostic>,
}

/// 这是 parser 模块唯一的公共入口函数。
///
/// - 输入: Token 序列，以及要填充的声明表。
/// - 输出: 以 `Program` 为根的 AST 与所有语法诊断。
///
/// 语法错误不会让它失败；只有声明表的二级存储不可用时才返回 `Err`。
pub fn parse(tokens: &[Token], table: &mut SymbolTable) -> Result<ParseOutput, StorageError> {
    let mut diagnostics = DiagnosticBag::new();
    let (ast, declarations) = Parser::new(tokens, &mut diagnostics).parse();

    for record in declarations {
        table.insert(record)?;
    }

    log::debug!(
        "parsed {} tokens into {} nodes, {} syntax diagnostic(s)",
        tokens.len(),
        ast.len(),
        diagnostics.len()
    );
    Ok(ParseOutput {
        ast,
        diagnostics: diagnostics.into_vec(),
    })
}
