//! src/optimizer/mod.rs
//!
//! 优化器：在语义分析通过后的 AST 上按固定顺序运行九个改写遍。
//!
//! 每个遍都是写时复制的：节点一旦分配就不再修改，改写时分配新节点并返回新的根。
//! 调用者的树从不被修改。

mod algebra;
mod cse;
mod dce;
mod dead_fn;
mod fold;
mod fusion;
mod hoist;
mod propagate;
mod unroll;

#[cfg(test)]
mod test;

use std::collections::HashSet;

use thiserror::Error;

use crate::analyzer::SemanticTable;
use crate::parser::ast::{Ast, NodeId, NodeKind};

pub use algebra::AlgebraicSimplification;
pub use cse::CommonSubexpressionElimination;
pub use dce::DeadCodeElimination;
pub use dead_fn::DeadFunctionElimination;
pub use fold::ConstantFolding;
pub use fusion::LoopFusion;
pub use hoist::LoopInvariantHoisting;
pub use propagate::ConstantPropagation;
pub use unroll::LoopUnrolling;

// --- 1. 核心抽象 ---

/// 一个节点的改写结果。
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite {
    /// 保持不变
    Keep,
    /// 用另一个节点替换
    Replace(NodeId),
    /// 展开为若干条语句，只在语句序列中有效
    Splice(Vec<NodeId>),
    /// 删除，只在语句序列中有效
    Remove,
}

/// 改写过程中的内部失败。出现时节点保持原样。
#[derive(Debug, Error)]
pub(crate) enum RewriteError {
    #[error("malformed literal '{0}'")]
    MalformedLiteral(String),
    #[error("'{left} {op} {right}' overflows")]
    Overflow {
        left: String,
        op: String,
        right: String,
    },
    #[error("division by zero")]
    DivisionByZero,
}

/// 所有遍共享的可变状态。
pub struct PassContext<'s> {
    pub ast: Ast,
    /// 语义分析得到的符号表，没有时跳过依赖引用次数的遍
    pub symbols: Option<&'s SemanticTable>,
    /// 已应用优化的可读描述，按发生顺序
    pub applied: Vec<String>,
    /// 公共子表达式消除引入的共享节点，压缩时保持共享
    pub shared: HashSet<NodeId>,
}

impl<'s> PassContext<'s> {
    pub fn new(ast: Ast, symbols: Option<&'s SemanticTable>) -> Self {
        Self {
            ast,
            symbols,
            applied: Vec::new(),
            shared: HashSet::new(),
        }
    }

    pub(crate) fn record(&mut self, message: String) {
        log::debug!("{}", message);
        self.applied.push(message);
    }
}

/// 一个整树改写遍。
pub trait Pass {
    fn name(&self) -> &'static str;
    fn run(&self, cx: &mut PassContext<'_>);
}

/// 优化结果：新的 AST 与已应用优化的列表。
#[derive(Debug, Clone)]
pub struct Optimized {
    pub ast: Ast,
    pub applied: Vec<String>,
}

/// 固定顺序的九个遍。
pub fn standard_passes() -> Vec<Box<dyn Pass>> {
    vec![
        Box::new(ConstantFolding),
        Box::new(AlgebraicSimplification),
        Box::new(ConstantPropagation),
        Box::new(CommonSubexpressionElimination),
        Box::new(DeadCodeElimination),
        Box::new(LoopUnrolling),
        Box::new(LoopInvariantHoisting),
        Box::new(LoopFusion),
        Box::new(DeadFunctionElimination),
    ]
}

/// 优化器的入口。在 `ast` 的副本上运行所有遍，最后把结果压缩到一个新的 arena。
pub fn optimize(ast: &Ast, symbols: Option<&SemanticTable>) -> Optimized {
    let mut cx = PassContext::new(ast.clone(), symbols);
    for pass in standard_passes() {
        let before = cx.applied.len();
        pass.run(&mut cx);
        log::trace!("{}: {} rewrite(s)", pass.name(), cx.applied.len() - before);
    }
    log::info!("optimizer applied {} optimization(s)", cx.applied.len());

    Optimized {
        ast: cx.ast.compact(&cx.shared),
        applied: cx.applied,
    }
}

// --- 2. 遍历 ---

/// 自底向上改写整棵树：先改写子节点，再把重建后的节点交给 `f`。
pub(crate) fn rewrite_tree<'s, F>(cx: &mut PassContext<'s>, pass: &'static str, mut f: F)
where
    F: FnMut(&mut PassContext<'s>, NodeId) -> Result<Rewrite, RewriteError>,
{
    let root = cx.ast.root();
    if let Rewrite::Replace(new_root) = walk(cx, pass, root, &mut f) {
        cx.ast.set_root(new_root);
    }
}

fn walk<'s, F>(cx: &mut PassContext<'s>, pass: &'static str, id: NodeId, f: &mut F) -> Rewrite
where
    F: FnMut(&mut PassContext<'s>, NodeId) -> Result<Rewrite, RewriteError>,
{
    let children = cx.ast.children(id).to_vec();
    let sequence_start = cx.ast.sequence_start(id);
    let is_if = cx.ast.kind(id) == NodeKind::If;

    let mut rebuilt = Vec::with_capacity(children.len());
    for (index, &child) in children.iter().enumerate() {
        let in_sequence = sequence_start.is_some_and(|start| index >= start);
        // if 的第三个子节点是 else 分支
        let is_else_slot = is_if && index == 2;
        match walk(cx, pass, child, f) {
            Rewrite::Keep => rebuilt.push(child),
            Rewrite::Replace(new) => rebuilt.push(new),
            Rewrite::Splice(statements) if in_sequence => rebuilt.extend(statements),
            Rewrite::Remove if in_sequence || is_else_slot => {}
            Rewrite::Splice(statements) if is_else_slot => {
                rebuilt.push(cx.ast.alloc(NodeKind::Else, None, statements));
            }
            // 表达式位置不能展开或删除
            Rewrite::Splice(_) | Rewrite::Remove => rebuilt.push(child),
        }
    }

    let current = cx.ast.with_children(id, rebuilt);
    let rewrite = match f(cx, current) {
        Ok(rewrite) => rewrite,
        Err(error) => {
            log::debug!("{}: keeping {}: {}", pass, current, error);
            Rewrite::Keep
        }
    };
    match rewrite {
        Rewrite::Keep if current != id => Rewrite::Replace(current),
        other => other,
    }
}

// --- 3. 共用的辅助函数 ---

/// 数字字面量的数值。
pub(crate) fn number_value(ast: &Ast, id: NodeId) -> Option<f64> {
    if ast.kind(id) != NodeKind::Number {
        return None;
    }
    ast.value(id)?.parse().ok()
}

/// 整数字面量的值；不是数字字面量时返回 `Ok(None)`。
pub(crate) fn int_literal(ast: &Ast, id: NodeId) -> Result<Option<i64>, RewriteError> {
    if ast.kind(id) != NodeKind::Number {
        return Ok(None);
    }
    let text = ast.value(id).unwrap_or_default();
    if text.contains('.') {
        return Ok(None);
    }
    text.parse()
        .map(Some)
        .map_err(|_| RewriteError::MalformedLiteral(text.to_string()))
}

/// 子树不含调用、后缀递增或匿名函数，求值没有副作用。
pub(crate) fn is_pure(ast: &Ast, id: NodeId) -> bool {
    !matches!(
        ast.kind(id),
        NodeKind::Call | NodeKind::IoCall | NodeKind::PostfixIncrement | NodeKind::AnonymousFunction
    ) && ast.children(id).iter().all(|&c| is_pure(ast, c))
}

/// 子树中是否有用户函数调用。
pub(crate) fn contains_call(ast: &Ast, id: NodeId) -> bool {
    ast.kind(id) == NodeKind::Call || ast.children(id).iter().any(|&c| contains_call(ast, c))
}

/// 把子树中名为 `name` 的标识符换成 `replacement` 的新副本，返回改写后的子树。
///
/// 没有出现 `name` 的部分保持原节点。匿名函数内部不替换。
pub(crate) fn substitute(ast: &mut Ast, id: NodeId, name: &str, replacement: NodeId) -> NodeId {
    match ast.kind(id) {
        NodeKind::Identifier if ast.value(id) == Some(name) => {
            let line = ast.line(id);
            let literal = ast.node(replacement).clone();
            ast.push(literal.with_line(line))
        }
        NodeKind::AnonymousFunction => id,
        _ => {
            let children: Vec<NodeId> = ast
                .children(id)
                .to_vec()
                .into_iter()
                .map(|c| substitute(ast, c, name, replacement))
                .collect();
            ast.with_children(id, children)
        }
    }
}
