//! 基于 arena 的 AST。
//!
//! 所有节点存放在 `Ast::nodes` 中，通过 `NodeId` 下标互相引用。节点一旦分配就不再修改：
//! 优化器改写时分配新节点并返回新的根，未改变的子树按下标共享。
//! 公共子表达式消除会让两个位置引用同一个节点，这是树中唯一有意的共享。

use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::utils::Span;

// --- 1. 核心 AST 节点与标识符 ---

/// 节点在 arena 中的下标。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 节点的种类。
///
/// 各种类的子节点布局：
/// - `Program` / `Block` / `Else`：语句序列
/// - `VarDecl`（值为变量名）：`[Modifiers?, Type, 初始值?]`
/// - `FunctionDecl` / `OverrideDecl`（值为函数名）：`[ReturnType, Params, 语句...]`
/// - `AnonymousFunction`：`[Params, 语句...]`
/// - `Param`（值为参数名）：`[Type]`
/// - `Model`（值为模型名）：`[Extends?, 成员...]`
/// - `Template`（值为模板名）：`[Signature...]`；`Signature`：`[Type, Params]`
/// - `FromImport`（值为模块名）：`[Deps]`；`Deps`：`[Dep...]`
/// - `Assignment`（值为 `"x ="` 这种打包后的 `名字 运算符`）：`[表达式]`
/// - `IncrementStmt` / `PostfixIncrement`（值为变量名）：`[Increment]`
/// - `If`：`[条件, Block, (Else | If)?]`
/// - `While`：`[条件, Block]`
/// - `ForRange`（值为循环变量）：`[Variable, 条件, Variable, Increment, Block]`
/// - `ForEach`：`[Type, Variable, 表达式, Block]`
/// - `TryCatch`：`[Block, Catch]`；`Catch`（值为错误名）：语句序列
/// - `Return`：`[表达式?]`
/// - `Call` / `IoCall`（值为函数名）：参数序列
/// - `Operation` / `RelationalOp`（值为运算符）：`[左, 右]`
/// - `LogicalOp`（值为运算符）：`[左, 右]`，`!`/`not` 为 `[操作数]`
/// - `UnaryOp`（值为 `+`/`-`）：`[操作数]`
/// - `IndexAccess`（值为被索引的名字）：`[下标]`
/// - `List`：元素序列；`KeyValue`：`[键, 值]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    Program,
    VarDecl,
    Modifiers,
    Type,
    FunctionDecl,
    OverrideDecl,
    ReturnType,
    Params,
    Param,
    AnonymousFunction,
    Model,
    Extends,
    Template,
    Signature,
    Import,
    FromImport,
    Deps,
    Dep,
    Assignment,
    IncrementStmt,
    If,
    Block,
    Else,
    While,
    ForRange,
    ForEach,
    Variable,
    Increment,
    TryCatch,
    Catch,
    Throw,
    Return,
    Call,
    IoCall,
    Operation,
    LogicalOp,
    RelationalOp,
    UnaryOp,
    Identifier,
    Number,
    Str,
    Boolean,
    IndexAccess,
    PostfixIncrement,
    List,
    KeyValue,
    ErrorExpr,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl NodeKind {
    pub fn is_literal(self) -> bool {
        matches!(self, NodeKind::Number | NodeKind::Str | NodeKind::Boolean)
    }

    /// 参与公共子表达式消除的复合表达式。函数调用可能有副作用，不在其中。
    pub fn is_compound_expression(self) -> bool {
        matches!(
            self,
            NodeKind::Operation
                | NodeKind::LogicalOp
                | NodeKind::RelationalOp
                | NodeKind::UnaryOp
                | NodeKind::IndexAccess
                | NodeKind::List
                | NodeKind::KeyValue
        )
    }

    pub fn is_function(self) -> bool {
        matches!(self, NodeKind::FunctionDecl | NodeKind::OverrideDecl)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// 标量载荷：运算符、标识符名、字面量文本等
    pub value: Option<String>,
    pub children: Vec<NodeId>,
    pub span: Option<Span>,
    /// 节点首个 Token 所在的行，优化器新建的节点为 0
    pub line: usize,
}

impl Node {
    pub fn new(kind: NodeKind, value: Option<String>, children: Vec<NodeId>) -> Self {
        Self {
            kind,
            value,
            children,
            span: None,
            line: 0,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }
}

/// 调试与展示用的嵌套结构：`{"tag", "value", "children"}`。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub tag: NodeKind,
    pub value: Option<String>,
    pub children: Vec<TreeNode>,
}

// --- 2. Arena ---

#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Ast {
    fn default() -> Self {
        let mut ast = Ast {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        ast.root = ast.alloc(NodeKind::Program, None, Vec::new());
        ast
    }
}

impl Ast {
    /// 一棵只有空 `Program` 根的树。
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn alloc(&mut self, kind: NodeKind, value: Option<String>, children: Vec<NodeId>) -> NodeId {
        self.push(Node::new(kind, value, children))
    }

    /// 分配一个没有子节点的叶子。
    pub fn leaf(&mut self, kind: NodeKind, value: impl Into<String>) -> NodeId {
        self.alloc(kind, Some(value.into()), Vec::new())
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    pub fn line(&self, id: NodeId) -> usize {
        self.nodes[id.0].line
    }

    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].value.as_deref()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id.0].children.get(index).copied()
    }

    /// 第一个指定种类的子节点。
    pub fn child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id).iter().copied().find(|&c| self.kind(c) == kind)
    }

    /// 写时复制：分配一个与 `id` 相同、但子节点替换为 `children` 的新节点。
    /// 子节点没有变化时直接返回原节点。
    pub fn with_children(&mut self, id: NodeId, children: Vec<NodeId>) -> NodeId {
        if self.children(id) == children.as_slice() {
            return id;
        }
        let mut node = self.node(id).clone();
        node.children = children;
        self.push(node)
    }

    // --- 3. 语句序列 ---

    /// 节点中语句序列开始的子节点下标；不是语句容器时返回 `None`。
    pub fn sequence_start(&self, id: NodeId) -> Option<usize> {
        match self.kind(id) {
            NodeKind::Program | NodeKind::Block | NodeKind::Else | NodeKind::Catch => Some(0),
            NodeKind::FunctionDecl | NodeKind::OverrideDecl => Some(2),
            NodeKind::AnonymousFunction => Some(1),
            NodeKind::Model => Some(match self.child(id, 0) {
                Some(first) if self.kind(first) == NodeKind::Extends => 1,
                _ => 0,
            }),
            _ => None,
        }
    }

    /// 语句容器中的语句。
    pub fn statements(&self, id: NodeId) -> &[NodeId] {
        match self.sequence_start(id) {
            Some(start) => self.children(id).get(start..).unwrap_or(&[]),
            None => &[],
        }
    }

    /// 用新的语句列表替换容器的语句部分，保留前面的头部子节点。
    pub fn with_statements(&mut self, id: NodeId, statements: Vec<NodeId>) -> NodeId {
        let start = self.sequence_start(id).unwrap_or(0);
        let mut children: Vec<NodeId> = self.children(id).iter().take(start).copied().collect();
        children.extend(statements);
        self.with_children(id, children)
    }

    // --- 4. 结构辅助 ---

    /// 把 `Assignment` 的打包载荷拆成 `(名字, 运算符)`。
    pub fn assignment_parts(&self, id: NodeId) -> Option<(&str, &str)> {
        if self.kind(id) != NodeKind::Assignment {
            return None;
        }
        self.value(id)?.rsplit_once(' ')
    }

    /// 变量声明的各部分：`(修饰符, 类型文本, 初始值)`。
    pub fn var_decl_parts(&self, id: NodeId) -> Option<(Vec<&str>, &str, Option<NodeId>)> {
        if self.kind(id) != NodeKind::VarDecl {
            return None;
        }
        let mut modifiers = Vec::new();
        let mut ty = None;
        let mut init = None;
        for &child in self.children(id) {
            match self.kind(child) {
                NodeKind::Modifiers => {
                    modifiers = self
                        .value(child)
                        .map(|v| v.split(',').filter(|m| !m.is_empty()).collect())
                        .unwrap_or_default();
                }
                NodeKind::Type if ty.is_none() => ty = self.value(child),
                _ => init = Some(child),
            }
        }
        Some((modifiers, ty.unwrap_or(""), init))
    }

    /// 递增语句或后缀递增的运算符（`++`、`--`、`**`）。
    pub fn increment_op(&self, id: NodeId) -> Option<&str> {
        let op = self.child_of_kind(id, NodeKind::Increment)?;
        self.value(op)
    }

    /// 字面量判断：布尔 `false` 与数字 0 视为假。
    pub fn literal_truth(&self, id: NodeId) -> Option<bool> {
        let value = self.value(id)?;
        match self.kind(id) {
            NodeKind::Boolean => Some(value == "true"),
            NodeKind::Number => value.parse::<f64>().ok().map(|n| n != 0.0),
            _ => None,
        }
    }

    /// 两棵子树在种类、载荷与子节点上逐一相同。
    pub fn structurally_equal(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }
        let (na, nb) = (self.node(a), self.node(b));
        na.kind == nb.kind
            && na.value == nb.value
            && na.children.len() == nb.children.len()
            && na
                .children
                .iter()
                .zip(&nb.children)
                .all(|(&x, &y)| self.structurally_equal(x, y))
    }

    /// 子树中被读取或写入的所有名字。
    pub fn referenced_names(&self, id: NodeId) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_names(id, &mut names, false);
        names
    }

    /// 子树中被写入（声明、赋值、递增）的名字。
    pub fn written_names(&self, id: NodeId) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_names(id, &mut names, true);
        names
    }

    fn collect_names(&self, id: NodeId, names: &mut BTreeSet<String>, writes_only: bool) {
        let node = self.node(id);
        let name = match node.kind {
            NodeKind::Assignment => self.assignment_parts(id).map(|(name, _)| name),
            NodeKind::VarDecl
            | NodeKind::IncrementStmt
            | NodeKind::PostfixIncrement
            | NodeKind::ForRange => node.value.as_deref(),
            // for-each 每轮都会写入元素变量
            NodeKind::ForEach => node.children.get(1).and_then(|&v| self.value(v)),
            NodeKind::Identifier | NodeKind::IndexAccess | NodeKind::Variable if !writes_only => {
                node.value.as_deref()
            }
            _ => None,
        };
        if let Some(name) = name {
            names.insert(name.to_string());
        }
        for &child in &node.children {
            self.collect_names(child, names, writes_only);
        }
    }

    /// 每个节点被多少个父节点引用（只统计从根可达的部分）。
    pub fn parent_counts(&self) -> HashMap<NodeId, usize> {
        let mut counts = HashMap::new();
        let mut visited = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            for &child in self.children(id) {
                *counts.entry(child).or_insert(0) += 1;
                stack.push(child);
            }
        }
        counts
    }

    // --- 5. 压缩与序列化 ---

    /// 把从根可达的节点复制到一个新的 arena 中，丢弃改写过程留下的无用节点。
    ///
    /// `shared` 中的节点只复制一次，所有引用它的位置指向同一个新节点；
    /// 其余节点在每个出现的位置各复制一份。
    pub fn compact(&self, shared: &HashSet<NodeId>) -> Ast {
        let mut out = Ast {
            nodes: Vec::with_capacity(self.nodes.len()),
            root: NodeId(0),
        };
        let mut memo = HashMap::new();
        out.root = self.copy_into(self.root, &mut out, shared, &mut memo);
        out
    }

    fn copy_into(
        &self,
        id: NodeId,
        out: &mut Ast,
        shared: &HashSet<NodeId>,
        memo: &mut HashMap<NodeId, NodeId>,
    ) -> NodeId {
        if let Some(&copied) = memo.get(&id) {
            return copied;
        }
        let node = self.node(id);
        let children = node
            .children
            .iter()
            .map(|&c| self.copy_into(c, out, shared, memo))
            .collect();
        let copied = out.push(Node {
            kind: node.kind,
            value: node.value.clone(),
            children,
            span: node.span,
            line: node.line,
        });
        if shared.contains(&id) {
            memo.insert(id, copied);
        }
        copied
    }

    pub fn to_tree(&self, id: NodeId) -> TreeNode {
        let node = self.node(id);
        TreeNode {
            tag: node.kind,
            value: node.value.clone(),
            children: node.children.iter().map(|&c| self.to_tree(c)).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_tree(self.root))
    }
}
