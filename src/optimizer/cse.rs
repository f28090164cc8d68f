// In src/optimizer/cse.rs

use std::collections::HashMap;

use super::{is_pure, rewrite_tree, Pass, PassContext, Rewrite};
use crate::parser::ast::{Ast, NodeId};
use crate::regen;

/// 公共子表达式消除。
///
/// 结构相同的复合表达式第二次及以后出现时，改为引用第一次出现的节点，
/// 这些节点在压缩后的树中仍然是同一个节点。含有调用的表达式不参与。
pub struct CommonSubexpressionElimination;

impl Pass for CommonSubexpressionElimination {
    fn name(&self) -> &'static str {
        "common subexpression elimination"
    }

    fn run(&self, cx: &mut PassContext<'_>) {
        let mut seen: HashMap<String, NodeId> = HashMap::new();
        rewrite_tree(cx, self.name(), |cx, id| {
            if !cx.ast.kind(id).is_compound_expression() || !is_pure(&cx.ast, id) {
                return Ok(Rewrite::Keep);
            }
            let key = structural_key(&cx.ast, id);
            match seen.get(&key) {
                Some(&first) if first != id => {
                    cx.shared.insert(first);
                    let message = format!(
                        "Common subexpression: {} at line {}",
                        regen::expression(&cx.ast, first),
                        cx.ast.line(id)
                    );
                    cx.record(message);
                    Ok(Rewrite::Replace(first))
                }
                Some(_) => Ok(Rewrite::Keep),
                None => {
                    seen.insert(key, id);
                    Ok(Rewrite::Keep)
                }
            }
        });
    }
}

/// 由种类、载荷与子节点的键递归组成的结构键。
pub(crate) fn structural_key(ast: &Ast, id: NodeId) -> String {
    let node = ast.node(id);
    let children: Vec<String> = node.children.iter().map(|&c| structural_key(ast, c)).collect();
    format!("{}{:?}[{}]", node.kind, node.value, children.join(","))
}
