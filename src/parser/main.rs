//! 递归下降解析器。
//! 将 Token 流转换为 arena 形式的抽象语法树 (AST)，同时收集声明表记录。
//!
//! 解析器从不失败：缺失的 Token 会产生一条带位置的诊断，然后继续解析。

use super::ast::*;
use crate::analyzer::types::Type;
use crate::diagnostics::codes::{self, ErrorCode};
use crate::diagnostics::{Diagnostic, DiagnosticBag, Label};
use crate::lexer::*;
use crate::symtab::{Param, SymbolCategory, SymbolRecord};
use crate::utils::{Position, Span};

// --- 1. 主解析器结构体 ---

/// 解析器结构体，持有解析过程所需的全部状态。
pub struct Parser<'a> {
    /// 从 Lexer 获取的 Token 流的引用。
    tokens: &'a [Token],
    /// 诊断信息收集器，用于报告所有解析错误。
    diagnostics: &'a mut DiagnosticBag,
    /// 指向当前待处理 Token 的指针（在 tokens 切片中的索引）。
    current: usize,
    ast: Ast,
    /// 解析过程中发现的全局声明，按出现顺序排列。
    declarations: Vec<SymbolRecord>,
    /// 当前所在的代码块嵌套深度，0 表示顶层。
    depth: usize,
}

// --- 2. Trait 定义：用于组织解析逻辑 ---

/// `Parse` Trait 是解析器的总入口。
pub trait Parse {
    /// 消耗解析器并启动整个解析过程，返回以 `Program` 为根的 AST 与声明记录。
    fn parse(self) -> (Ast, Vec<SymbolRecord>);
}

/// `DeclarationParser` Trait 负责解析各类声明。
trait DeclarationParser {
    /// 解析一个变量声明，例如 `const int x = 1;`。
    fn parse_variable_declaration(&mut self) -> Option<NodeId>;
    /// 解析一个具名函数声明。`member` 为真时表示模型成员，不进入声明表。
    fn parse_function_declaration(&mut self, member: bool, is_override: bool) -> Option<NodeId>;
    /// 解析匿名函数 `function (params) { ... }`。
    fn parse_anonymous_function(&mut self) -> NodeId;
    /// 解析参数列表（不含括号）。
    fn parse_params(&mut self) -> NodeId;
    /// 解析 `model Name [extends Base] { ... }`。
    fn parse_model(&mut self) -> NodeId;
    /// 解析 `template Name { 签名; ... }`。
    fn parse_template(&mut self) -> NodeId;
    /// 解析 `import m;` 或 `from m import a, b;`。
    fn parse_import(&mut self) -> NodeId;
}

/// `StatementParser` Trait 负责解析各类语句。
trait StatementParser {
    /// 解析任意类型的语句；无法识别时报告错误并返回 `None`。
    fn parse_statement(&mut self) -> Option<NodeId>;
    /// 解析语句，直到遇到 `}` 或输入结束。
    fn parse_statement_list(&mut self) -> Vec<NodeId>;
    /// 解析一个 `{ ... }` 代码体，返回其中的语句。
    fn parse_body(&mut self) -> Vec<NodeId>;
    /// 以标识符开头的语句：递增、调用、赋值或用户类型声明。
    fn parse_identifier_statement(&mut self) -> Option<NodeId>;
    /// 解析赋值语句 `x = e` 或 `x += e`。
    fn parse_assignment(&mut self) -> Option<NodeId>;
    /// 解析 `if` 语句（包括 `else if` 链）。
    fn parse_if_statement(&mut self) -> NodeId;
    /// 解析 `while` 语句。
    fn parse_while_statement(&mut self) -> NodeId;
    /// 解析 `for` 语句的两种形式。
    fn parse_for_statement(&mut self) -> NodeId;
    /// 解析 `try { } catch (e) { }`。
    fn parse_try_statement(&mut self) -> NodeId;
    /// 解析 `throw e;`。
    fn parse_throw_statement(&mut self) -> NodeId;
    /// 解析 `return` 语句。
    fn parse_return_statement(&mut self) -> NodeId;
}

/// `ExpressionParser` Trait 负责解析各类表达式，按优先级从低到高。
trait ExpressionParser {
    /// 解析表达式的主入口。
    fn parse_expression(&mut self) -> NodeId;
    /// `&& || and or AND OR`
    fn parse_logical(&mut self) -> NodeId;
    /// `== != is is not`
    fn parse_equality(&mut self) -> NodeId;
    /// `< > <= >=`
    fn parse_relational(&mut self) -> NodeId;
    /// `+ -`
    fn parse_additive(&mut self) -> NodeId;
    /// `* / %`
    fn parse_multiplicative(&mut self) -> NodeId;
    /// 前缀 `! not NOT + -`
    fn parse_unary(&mut self) -> NodeId;
    /// 解析原子表达式（字面量、标识符、调用、括号表达式、列表等）。
    fn parse_primary(&mut self) -> NodeId;
    /// 解析 `( ... )` 中的调用参数。
    fn parse_call_arguments(&mut self) -> Vec<NodeId>;
    /// 解析 `{a, b}` 或 `{k: v}` 列表字面量。
    fn parse_list(&mut self) -> NodeId;
}

/// `TypeParser` Trait 负责解析类型规范。
trait TypeParser {
    /// 解析一个类型（例如 `int`, `int[]`, `mapInt<string>`, `Point`），返回其文本。
    fn parse_type(&mut self) -> Option<String>;
    /// 不消费 Token，计算从 `pos` 开始的类型占用多少个 Token。
    fn type_len_at(&self, pos: usize) -> Option<usize>;
    /// 当前位置是否是 `类型 标识符 (` 形式的函数声明。
    fn is_function_declaration(&self) -> bool;
    /// 当前位置是否是 `类型 标识符` 形式的声明。
    fn is_declaration(&self) -> bool;
}

/// `Util` Trait 提供了解析过程中常用的一系列辅助函数。
trait Util {
    // --- Token 流操作 ---
    /// 查看当前的 Token。
    fn peek(&self) -> Option<&Token>;
    /// 查看当前位置之后第 `offset` 个 Token 的种类。
    fn peek_kind_at(&self, offset: usize) -> Option<TokenKind>;
    /// 检查是否已到达 Token 流的末尾。
    fn is_at_end(&self) -> bool;
    /// 消费当前 Token 并返回它，同时前移指针。
    fn advance(&mut self) -> Option<Token>;
    /// 检查当前 Token 是否是指定的类型。
    fn check(&self, kind: TokenKind) -> bool;
    /// 检查当前 Token 的种类与文本。
    fn check_text(&self, kind: TokenKind, text: &str) -> bool;
    fn check_keyword(&self, keyword: Keyword) -> bool;
    /// 如果当前 Token 是指定类型，则消费它并返回 `true`。
    fn match_token(&mut self, kind: TokenKind) -> bool;
    fn match_keyword(&mut self, keyword: Keyword) -> bool;
    /// 消费一个指定类型的 Token，如果不是预期类型则报告错误。
    fn consume(&mut self, kind: TokenKind, expected: &str) -> Option<Token>;
    fn consume_keyword(&mut self, keyword: Keyword) -> Option<Token>;
    /// 分号是可选的：存在时消费掉。
    fn skip_semicolon(&mut self);

    // --- 错误报告 ---
    /// 在当前位置报告一个语法错误。
    fn error(&mut self, code: &'static ErrorCode, message: String);
    /// 当前位置；输入结束时为最后一个 Token 之后的位置。
    fn here(&self) -> (Position, Span);

    // --- 节点构造 ---
    /// 分配一个节点，span 覆盖从 `start` 号 Token 到上一个被消费的 Token。
    fn finish(&mut self, start: usize, kind: NodeKind, value: Option<String>, children: Vec<NodeId>) -> NodeId;
}

// --- 3. 基础实现 ---

impl<'a> Parser<'a> {
    /// 创建一个新的解析器实例。
    pub fn new(tokens: &'a [Token], diagnostics: &'a mut DiagnosticBag) -> Self {
        Parser {
            tokens,
            diagnostics,
            current: 0,
            ast: Ast::new(),
            declarations: Vec::new(),
            depth: 0,
        }
    }

    fn declare(&mut self, record: SymbolRecord) {
        log::trace!("declaration `{}` ({})", record.identifier, record.category);
        self.declarations.push(record);
    }
}

impl<'a> Parse for Parser<'a> {
    fn parse(mut self) -> (Ast, Vec<SymbolRecord>) {
        let mut body = Vec::new();
        while !self.is_at_end() {
            let before = self.current;
            if let Some(statement) = self.parse_statement() {
                body.push(statement);
            }
            // 没有消费任何 Token 时强制前进一个，保证循环终止
            if self.current == before {
                self.advance();
            }
        }
        let root = self.finish(0, NodeKind::Program, None, body);
        self.ast.set_root(root);
        (self.ast, self.declarations)
    }
}

impl<'a> DeclarationParser for Parser<'a> {
    fn parse_variable_declaration(&mut self) -> Option<NodeId> {
        let start = self.current;
        let mut modifiers = Vec::new();
        while let Some(TokenKind::Keyword(keyword)) = self.peek().map(|t| t.kind) {
            if !keyword.is_modifier() {
                break;
            }
            modifiers.push(keyword.as_str());
            self.advance();
        }

        let Some(ty) = self.parse_type() else {
            self.error(&codes::E0101_EXPECTED_TOKEN, "expected a data type".to_string());
            return None;
        };
        let name = self.consume(TokenKind::Identifier, "identifier");

        let init = if self.match_token(TokenKind::Assign) {
            Some(if self.check(TokenKind::LBrace) {
                self.parse_list()
            } else {
                self.parse_expression()
            })
        } else {
            None
        };
        self.skip_semicolon();

        let is_global = modifiers.contains(&"global");
        if let Some(name) = &name {
            if self.depth == 0 || is_global {
                let record = SymbolRecord::new(&name.text, SymbolCategory::Variable, &ty, name.line)
                    .initialized(init.is_some())
                    .with_size(Type::from_name(&ty).size());
                self.declare(record);
            }
        }

        let mut children = Vec::new();
        if !modifiers.is_empty() {
            children.push(self.ast.leaf(NodeKind::Modifiers, modifiers.join(",")));
        }
        children.push(self.ast.leaf(NodeKind::Type, ty));
        children.extend(init);
        Some(self.finish(start, NodeKind::VarDecl, name.map(|t| t.text), children))
    }

    fn parse_function_declaration(&mut self, member: bool, is_override: bool) -> Option<NodeId> {
        let start = self.current;
        let return_type = if self.match_keyword(Keyword::Function) {
            "void".to_string()
        } else {
            match self.parse_type() {
                Some(ty) => ty,
                None => {
                    self.error(&codes::E0101_EXPECTED_TOKEN, "expected a return type".to_string());
                    return None;
                }
            }
        };
        let name = self.consume(TokenKind::Identifier, "identifier");
        self.consume(TokenKind::LParen, "(");
        let params = self.parse_params();
        self.consume(TokenKind::RParen, ")");
        let body = self.parse_body();

        if let (Some(name), false) = (&name, member) {
            let signature = self
                .ast
                .children(params)
                .iter()
                .map(|&p| Param {
                    name: self.ast.value(p).unwrap_or_default().to_string(),
                    ty: self
                        .ast
                        .child(p, 0)
                        .and_then(|t| self.ast.value(t))
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect();
            let record = SymbolRecord::new(&name.text, SymbolCategory::Function, &return_type, name.line)
                .initialized(true)
                .with_size(Type::from_name(&return_type).size())
                .with_signature(signature, &return_type);
            self.declare(record);
        }

        let return_node = self.ast.leaf(NodeKind::ReturnType, return_type);
        let mut children = vec![return_node, params];
        children.extend(body);
        let kind = if is_override {
            NodeKind::OverrideDecl
        } else {
            NodeKind::FunctionDecl
        };
        Some(self.finish(start, kind, name.map(|t| t.text), children))
    }

    fn parse_anonymous_function(&mut self) -> NodeId {
        let start = self.current;
        self.consume_keyword(Keyword::Function);
        self.consume(TokenKind::LParen, "(");
        let params = self.parse_params();
        self.consume(TokenKind::RParen, ")");
        let mut children = vec![params];
        children.extend(self.parse_body());
        self.finish(start, NodeKind::AnonymousFunction, None, children)
    }

    fn parse_params(&mut self) -> NodeId {
        let start = self.current;
        let mut params = Vec::new();
        while !self.is_at_end() && !self.check(TokenKind::RParen) {
            let param_start = self.current;
            let Some(ty) = self.parse_type() else {
                self.error(&codes::E0101_EXPECTED_TOKEN, "expected a parameter type".to_string());
                break;
            };
            let name = self.consume(TokenKind::Identifier, "identifier");
            let ty_node = self.ast.leaf(NodeKind::Type, ty);
            params.push(self.finish(param_start, NodeKind::Param, name.map(|t| t.text), vec![ty_node]));
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        self.finish(start, NodeKind::Params, None, params)
    }

    fn parse_model(&mut self) -> NodeId {
        let start = self.current;
        self.consume_keyword(Keyword::Model);
        let name = self.consume(TokenKind::Identifier, "identifier");

        let mut children = Vec::new();
        if self.match_keyword(Keyword::Extends) {
            let extends_start = self.current;
            let base = self.consume(TokenKind::Identifier, "identifier");
            children.push(self.finish(extends_start, NodeKind::Extends, base.map(|t| t.text), Vec::new()));
        }

        self.consume(TokenKind::LBrace, "{");
        self.depth += 1;
        while !self.is_at_end() && !self.check(TokenKind::RBrace) {
            let before = self.current;
            let is_override = self.match_keyword(Keyword::Override);
            let member = match self.peek().map(|t| t.kind) {
                Some(TokenKind::Keyword(k)) if k.is_io_builtin() => Some(self.parse_primary()),
                Some(TokenKind::Keyword(Keyword::Function)) => {
                    self.parse_function_declaration(true, is_override)
                }
                Some(TokenKind::Keyword(k)) if k.is_modifier() => self.parse_variable_declaration(),
                Some(TokenKind::Keyword(k)) if k.is_primitive_type() || k.is_map_type() => {
                    if self.is_function_declaration() {
                        self.parse_function_declaration(true, is_override)
                    } else {
                        self.parse_variable_declaration()
                    }
                }
                Some(TokenKind::Identifier) if self.is_function_declaration() => {
                    self.parse_function_declaration(true, is_override)
                }
                Some(TokenKind::Identifier) => self.parse_variable_declaration(),
                _ => {
                    let found = self.peek().map_or("EOF".to_string(), |t| t.text.clone());
                    self.error(
                        &codes::E0100_SYNTAX_ERROR,
                        format!("unexpected member in model: '{}'", found),
                    );
                    self.advance();
                    None
                }
            };
            if matches!(member, Some(m) if self.ast.kind(m) == NodeKind::IoCall) {
                self.skip_semicolon();
            }
            children.extend(member);
            if self.current == before {
                self.advance();
            }
        }
        self.depth -= 1;
        self.consume(TokenKind::RBrace, "}");

        if let Some(name) = &name {
            let record = SymbolRecord::new(&name.text, SymbolCategory::Model, "model", name.line)
                .initialized(true)
                .with_size(Type::from_name("model").size());
            self.declare(record);
        }
        self.finish(start, NodeKind::Model, name.map(|t| t.text), children)
    }

    fn parse_template(&mut self) -> NodeId {
        let start = self.current;
        self.consume_keyword(Keyword::Template);
        let name = self.consume(TokenKind::Identifier, "identifier");
        self.consume(TokenKind::LBrace, "{");

        let mut signatures = Vec::new();
        while !self.is_at_end() && !self.check(TokenKind::RBrace) {
            let before = self.current;
            let Some(ty) = self.parse_type() else {
                self.error(&codes::E0101_EXPECTED_TOKEN, "expected a data type".to_string());
                self.advance();
                continue;
            };
            let function_name = self.consume(TokenKind::Identifier, "identifier");
            self.consume(TokenKind::LParen, "(");
            let params = self.parse_params();
            self.consume(TokenKind::RParen, ")");
            self.consume(TokenKind::Semicolon, ";");
            let ty_node = self.ast.leaf(NodeKind::Type, ty);
            signatures.push(self.finish(
                before,
                NodeKind::Signature,
                function_name.map(|t| t.text),
                vec![ty_node, params],
            ));
            if self.current == before {
                self.advance();
            }
        }
        self.consume(TokenKind::RBrace, "}");

        if let Some(name) = &name {
            let record = SymbolRecord::new(&name.text, SymbolCategory::Template, "template", name.line)
                .initialized(true)
                .with_size(Type::from_name("template").size());
            self.declare(record);
        }
        self.finish(start, NodeKind::Template, name.map(|t| t.text), signatures)
    }

    fn parse_import(&mut self) -> NodeId {
        let start = self.current;
        if self.match_keyword(Keyword::Import) {
            let module = self.consume(TokenKind::Identifier, "identifier");
            self.skip_semicolon();
            return self.finish(start, NodeKind::Import, module.map(|t| t.text), Vec::new());
        }

        self.consume_keyword(Keyword::From);
        let module = self.consume(TokenKind::Identifier, "identifier");
        self.consume_keyword(Keyword::Import);
        let deps_start = self.current;
        let mut deps = Vec::new();
        loop {
            let dep_start = self.current;
            if let Some(dep) = self.consume(TokenKind::Identifier, "identifier") {
                deps.push(self.finish(dep_start, NodeKind::Dep, Some(dep.text), Vec::new()));
            }
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        self.skip_semicolon();
        let deps = self.finish(deps_start, NodeKind::Deps, None, deps);
        self.finish(start, NodeKind::FromImport, module.map(|t| t.text), vec![deps])
    }
}

impl<'a> StatementParser for Parser<'a> {
    fn parse_statement(&mut self) -> Option<NodeId> {
        let token = self.peek()?.clone();
        match token.kind {
            TokenKind::Identifier => self.parse_identifier_statement(),
            TokenKind::Keyword(keyword) => match keyword {
                k if k.is_io_builtin() => {
                    let call = self.parse_primary();
                    self.skip_semicolon();
                    Some(call)
                }
                Keyword::If => Some(self.parse_if_statement()),
                Keyword::While => Some(self.parse_while_statement()),
                Keyword::For => Some(self.parse_for_statement()),
                Keyword::Try => Some(self.parse_try_statement()),
                Keyword::Throw => Some(self.parse_throw_statement()),
                Keyword::Return => Some(self.parse_return_statement()),
                Keyword::Function if self.peek_kind_at(1) == Some(TokenKind::LParen) => {
                    let function = self.parse_anonymous_function();
                    self.skip_semicolon();
                    Some(function)
                }
                Keyword::Function => self.parse_function_declaration(false, false),
                Keyword::Model => Some(self.parse_model()),
                Keyword::Template => Some(self.parse_template()),
                Keyword::Import | Keyword::From => Some(self.parse_import()),
                k if k.is_modifier() || k.is_map_type() => self.parse_variable_declaration(),
                k if k.is_primitive_type() => {
                    if self.is_function_declaration() {
                        self.parse_function_declaration(false, false)
                    } else {
                        self.parse_variable_declaration()
                    }
                }
                _ => {
                    self.error(
                        &codes::E0100_SYNTAX_ERROR,
                        format!("unexpected statement: '{}'", token.text),
                    );
                    self.advance();
                    None
                }
            },
            _ => {
                self.error(
                    &codes::E0100_SYNTAX_ERROR,
                    format!("unexpected statement: '{}'", token.text),
                );
                self.advance();
                None
            }
        }
    }

    fn parse_statement_list(&mut self) -> Vec<NodeId> {
        let mut statements = Vec::new();
        while !self.is_at_end() && !self.check(TokenKind::RBrace) {
            let before = self.current;
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            if self.current == before {
                self.advance();
            }
        }
        statements
    }

    fn parse_body(&mut self) -> Vec<NodeId> {
        self.consume(TokenKind::LBrace, "{");
        self.depth += 1;
        let statements = self.parse_statement_list();
        self.depth -= 1;
        self.consume(TokenKind::RBrace, "}");
        statements
    }

    fn parse_identifier_statement(&mut self) -> Option<NodeId> {
        let start = self.current;
        match self.peek_kind_at(1) {
            Some(TokenKind::Increment) => {
                let name = self.advance().map(|t| t.text);
                let op_start = self.current;
                let op = self.advance().map(|t| t.text);
                let op = self.finish(op_start, NodeKind::Increment, op, Vec::new());
                self.skip_semicolon();
                Some(self.finish(start, NodeKind::IncrementStmt, name, vec![op]))
            }
            Some(TokenKind::LParen) => {
                let call = self.parse_primary();
                self.skip_semicolon();
                Some(call)
            }
            _ if self.is_function_declaration() => self.parse_function_declaration(false, false),
            _ if self.is_declaration() => self.parse_variable_declaration(),
            _ => self.parse_assignment(),
        }
    }

    fn parse_assignment(&mut self) -> Option<NodeId> {
        let start = self.current;
        let name = self.consume(TokenKind::Identifier, "identifier")?;
        let operator = match self.peek() {
            Some(t) if matches!(t.kind, TokenKind::Assign | TokenKind::CompoundAssign) => t.text.clone(),
            _ => {
                self.error(
                    &codes::E0101_EXPECTED_TOKEN,
                    "expected an assignment operator ('=', '+=', '-=', '*=', '/=')".to_string(),
                );
                return None;
            }
        };
        self.advance();
        let value = if self.check(TokenKind::LBrace) {
            self.parse_list()
        } else {
            self.parse_expression()
        };
        self.skip_semicolon();
        Some(self.finish(
            start,
            NodeKind::Assignment,
            Some(format!("{} {}", name.text, operator)),
            vec![value],
        ))
    }

    fn parse_if_statement(&mut self) -> NodeId {
        let start = self.current;
        self.consume_keyword(Keyword::If);
        let condition = self.parse_expression();
        let block_start = self.current;
        let body = self.parse_body();
        let block = self.finish(block_start, NodeKind::Block, None, body);

        let mut children = vec![condition, block];
        if self.match_keyword(Keyword::Else) {
            if self.check_keyword(Keyword::If) {
                children.push(self.parse_if_statement());
            } else {
                let else_start = self.current;
                let body = self.parse_body();
                children.push(self.finish(else_start, NodeKind::Else, None, body));
            }
        }
        self.finish(start, NodeKind::If, None, children)
    }

    fn parse_while_statement(&mut self) -> NodeId {
        let start = self.current;
        self.consume_keyword(Keyword::While);
        let condition = self.parse_expression();
        let block_start = self.current;
        let body = self.parse_body();
        let block = self.finish(block_start, NodeKind::Block, None, body);
        self.finish(start, NodeKind::While, None, vec![condition, block])
    }

    fn parse_for_statement(&mut self) -> NodeId {
        let start = self.current;
        self.consume_keyword(Keyword::For);
        let parenthesized = self.match_token(TokenKind::LParen);

        let is_range = self.check(TokenKind::Identifier)
            && self.peek_kind_at(1) == Some(TokenKind::Semicolon);

        let (kind, value, mut children) = if is_range {
            // for i; 条件; i++
            let var_start = self.current;
            let first = self.consume(TokenKind::Identifier, "identifier").map(|t| t.text);
            let first_node = self.finish(var_start, NodeKind::Variable, first.clone(), Vec::new());
            self.consume(TokenKind::Semicolon, ";");
            let condition = self.parse_expression();
            self.consume(TokenKind::Semicolon, ";");
            let second_start = self.current;
            let second = self.consume(TokenKind::Identifier, "identifier").map(|t| t.text);
            let second_node = self.finish(second_start, NodeKind::Variable, second, Vec::new());
            let op_start = self.current;
            let op = self.consume(TokenKind::Increment, "++").map(|t| t.text);
            let op_node = self.finish(op_start, NodeKind::Increment, op, Vec::new());
            (
                NodeKind::ForRange,
                first,
                vec![first_node, condition, second_node, op_node],
            )
        } else {
            // for T x in 表达式
            let type_start = self.current;
            let ty = self.parse_type();
            if ty.is_none() {
                self.error(&codes::E0101_EXPECTED_TOKEN, "expected a data type".to_string());
            }
            let ty_node = self.finish(type_start, NodeKind::Type, ty, Vec::new());
            let var_start = self.current;
            let var = self.consume(TokenKind::Identifier, "identifier").map(|t| t.text);
            let var_node = self.finish(var_start, NodeKind::Variable, var, Vec::new());
            self.consume_keyword(Keyword::In);
            let iterable = self.parse_expression();
            (NodeKind::ForEach, None, vec![ty_node, var_node, iterable])
        };

        if parenthesized {
            self.consume(TokenKind::RParen, ")");
        }
        let block_start = self.current;
        let body = self.parse_body();
        children.push(self.finish(block_start, NodeKind::Block, None, body));
        self.finish(start, kind, value, children)
    }

    fn parse_try_statement(&mut self) -> NodeId {
        let start = self.current;
        self.consume_keyword(Keyword::Try);
        let block_start = self.current;
        let body = self.parse_body();
        let block = self.finish(block_start, NodeKind::Block, None, body);

        let catch_start = self.current;
        self.consume_keyword(Keyword::Catch);
        self.consume(TokenKind::LParen, "(");
        // 可选的 `error` 类型名：catch (error e)
        if self.check(TokenKind::Identifier) && self.peek_kind_at(1) == Some(TokenKind::Identifier) {
            self.advance();
        }
        let name = self.consume(TokenKind::Identifier, "identifier").map(|t| t.text);
        self.consume(TokenKind::RParen, ")");
        let handler = self.parse_body();
        let catch = self.finish(catch_start, NodeKind::Catch, name, handler);
        self.finish(start, NodeKind::TryCatch, None, vec![block, catch])
    }

    fn parse_throw_statement(&mut self) -> NodeId {
        let start = self.current;
        self.consume_keyword(Keyword::Throw);
        let name = self.consume(TokenKind::Identifier, "identifier").map(|t| t.text);
        self.skip_semicolon();
        self.finish(start, NodeKind::Throw, name, Vec::new())
    }

    fn parse_return_statement(&mut self) -> NodeId {
        let start = self.current;
        self.consume_keyword(Keyword::Return);
        let mut children = Vec::new();
        if !self.is_at_end() && !self.check(TokenKind::Semicolon) && !self.check(TokenKind::RBrace) {
            children.push(self.parse_expression());
        }
        self.skip_semicolon();
        self.finish(start, NodeKind::Return, None, children)
    }
}

impl<'a> ExpressionParser for Parser<'a> {
    fn parse_expression(&mut self) -> NodeId {
        self.parse_logical()
    }

    fn parse_logical(&mut self) -> NodeId {
        let start = self.current;
        let mut left = self.parse_equality();
        loop {
            let op = match self.peek() {
                Some(t) if t.kind == TokenKind::Logical && t.text != "!" => t.text.clone(),
                Some(t)
                    if matches!(
                        t.kind,
                        TokenKind::Keyword(Keyword::And | Keyword::Or | Keyword::AndUpper | Keyword::OrUpper)
                    ) =>
                {
                    t.text.clone()
                }
                _ => break,
            };
            self.advance();
            let right = self.parse_equality();
            left = self.finish(start, NodeKind::LogicalOp, Some(op), vec![left, right]);
        }
        left
    }

    fn parse_equality(&mut self) -> NodeId {
        let start = self.current;
        let mut left = self.parse_relational();
        loop {
            let op = match self.peek() {
                Some(t) if t.kind == TokenKind::Relational && (t.text == "==" || t.text == "!=") => {
                    t.text.clone()
                }
                Some(t) if matches!(t.kind, TokenKind::Keyword(Keyword::Is | Keyword::IsNot)) => {
                    t.text.clone()
                }
                _ => break,
            };
            self.advance();
            let right = self.parse_relational();
            left = self.finish(start, NodeKind::RelationalOp, Some(op), vec![left, right]);
        }
        left
    }

    fn parse_relational(&mut self) -> NodeId {
        let start = self.current;
        let mut left = self.parse_additive();
        while let Some(t) = self.peek() {
            if t.kind != TokenKind::Relational || !matches!(t.text.as_str(), "<" | ">" | "<=" | ">=") {
                break;
            }
            let op = t.text.clone();
            self.advance();
            let right = self.parse_additive();
            left = self.finish(start, NodeKind::RelationalOp, Some(op), vec![left, right]);
        }
        left
    }

    fn parse_additive(&mut self) -> NodeId {
        let start = self.current;
        let mut left = self.parse_multiplicative();
        while self.check_text(TokenKind::Arithmetic, "+") || self.check_text(TokenKind::Arithmetic, "-") {
            let op = self.advance().map(|t| t.text);
            let right = self.parse_multiplicative();
            left = self.finish(start, NodeKind::Operation, op, vec![left, right]);
        }
        left
    }

    fn parse_multiplicative(&mut self) -> NodeId {
        let start = self.current;
        let mut left = self.parse_unary();
        while ["*", "/", "%"]
            .iter()
            .any(|op| self.check_text(TokenKind::Arithmetic, op))
        {
            let op = self.advance().map(|t| t.text);
            let right = self.parse_unary();
            left = self.finish(start, NodeKind::Operation, op, vec![left, right]);
        }
        left
    }

    fn parse_unary(&mut self) -> NodeId {
        let start = self.current;
        let (kind, op) = match self.peek() {
            Some(t) if t.is(TokenKind::Logical, "!") => (NodeKind::LogicalOp, "!"),
            Some(t) if matches!(t.kind, TokenKind::Keyword(Keyword::Not | Keyword::NotUpper)) => {
                (NodeKind::LogicalOp, "not")
            }
            Some(t) if t.is(TokenKind::Arithmetic, "+") => (NodeKind::UnaryOp, "+"),
            Some(t) if t.is(TokenKind::Arithmetic, "-") => (NodeKind::UnaryOp, "-"),
            _ => return self.parse_primary(),
        };
        self.advance();
        let operand = self.parse_unary();
        self.finish(start, kind, Some(op.to_string()), vec![operand])
    }

    fn parse_primary(&mut self) -> NodeId {
        let start = self.current;
        let Some(token) = self.peek().cloned() else {
            self.error(
                &codes::E0103_UNEXPECTED_END,
                "unexpected end of input, expected an expression".to_string(),
            );
            return self.ast.leaf(NodeKind::ErrorExpr, "EOF");
        };

        match token.kind {
            TokenKind::Number => {
                self.advance();
                self.finish(start, NodeKind::Number, Some(token.text), Vec::new())
            }
            TokenKind::Str => {
                self.advance();
                self.finish(start, NodeKind::Str, Some(token.text), Vec::new())
            }
            TokenKind::Keyword(Keyword::True | Keyword::False) => {
                self.advance();
                self.finish(start, NodeKind::Boolean, Some(token.text), Vec::new())
            }
            TokenKind::Keyword(k) if k.is_io_builtin() => {
                self.advance();
                let args = self.parse_call_arguments();
                self.finish(start, NodeKind::IoCall, Some(token.text), args)
            }
            TokenKind::Keyword(Keyword::Function) => self.parse_anonymous_function(),
            TokenKind::Identifier => {
                self.advance();
                match self.peek_kind_at(0) {
                    Some(TokenKind::LParen) => {
                        let args = self.parse_call_arguments();
                        self.finish(start, NodeKind::Call, Some(token.text), args)
                    }
                    Some(TokenKind::LBracket) => {
                        self.advance();
                        let index = self.parse_expression();
                        self.consume(TokenKind::RBracket, "]");
                        self.finish(start, NodeKind::IndexAccess, Some(token.text), vec![index])
                    }
                    Some(TokenKind::Increment) => {
                        let op_start = self.current;
                        let op = self.advance().map(|t| t.text);
                        let op = self.finish(op_start, NodeKind::Increment, op, Vec::new());
                        self.finish(start, NodeKind::PostfixIncrement, Some(token.text), vec![op])
                    }
                    _ => self.finish(start, NodeKind::Identifier, Some(token.text), Vec::new()),
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression();
                self.consume(TokenKind::RParen, ")");
                inner
            }
            TokenKind::LBrace => self.parse_list(),
            _ => {
                self.error(
                    &codes::E0102_EXPECTED_EXPRESSION,
                    format!("invalid expression near '{}'", token.text),
                );
                self.advance();
                self.finish(start, NodeKind::ErrorExpr, Some(token.text), Vec::new())
            }
        }
    }

    fn parse_call_arguments(&mut self) -> Vec<NodeId> {
        self.consume(TokenKind::LParen, "(");
        let mut args = Vec::new();
        while !self.is_at_end() && !self.check(TokenKind::RParen) {
            args.push(self.parse_expression());
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RParen, ")");
        args
    }

    fn parse_list(&mut self) -> NodeId {
        let start = self.current;
        self.consume(TokenKind::LBrace, "{");
        let mut items = Vec::new();
        while !self.is_at_end() && !self.check(TokenKind::RBrace) {
            let item_start = self.current;
            let first = self.parse_expression();
            if self.match_token(TokenKind::Colon) {
                let second = self.parse_expression();
                items.push(self.finish(item_start, NodeKind::KeyValue, None, vec![first, second]));
            } else {
                items.push(first);
            }
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RBrace, "}");
        self.finish(start, NodeKind::List, None, items)
    }
}

impl<'a> TypeParser for Parser<'a> {
    fn parse_type(&mut self) -> Option<String> {
        let token = self.peek()?.clone();
        let base = match token.kind {
            TokenKind::Keyword(k) if k.is_primitive_type() => {
                self.advance();
                token.text
            }
            TokenKind::Keyword(k) if k.is_map_type() => {
                self.advance();
                if self.check_text(TokenKind::Relational, "<") {
                    self.advance();
                    let inner = self.parse_type();
                    if inner.is_none() {
                        self.error(&codes::E0101_EXPECTED_TOKEN, "expected a data type".to_string());
                    }
                    self.consume(TokenKind::Relational, ">");
                    format!("{}<{}>", token.text, inner.unwrap_or_default())
                } else if matches!(
                    self.peek().map(|t| t.kind),
                    Some(TokenKind::Keyword(k)) if k.is_primitive_type() || k.is_map_type()
                ) {
                    // 旧写法 `mapInt string`
                    let inner = self.parse_type().unwrap_or_default();
                    format!("{}<{}>", token.text, inner)
                } else {
                    token.text
                }
            }
            TokenKind::Identifier => {
                self.advance();
                token.text
            }
            _ => return None,
        };

        if self.check(TokenKind::LBracket) && self.peek_kind_at(1) == Some(TokenKind::RBracket) {
            self.advance();
            self.advance();
            return Some(format!("{}[]", base));
        }
        Some(base)
    }

    fn type_len_at(&self, pos: usize) -> Option<usize> {
        let token = self.tokens.get(pos)?;
        let mut len = match token.kind {
            TokenKind::Keyword(k) if k.is_primitive_type() => 1,
            TokenKind::Identifier => 1,
            TokenKind::Keyword(k) if k.is_map_type() => match self.tokens.get(pos + 1) {
                Some(t) if t.is(TokenKind::Relational, "<") => {
                    let inner = self.type_len_at(pos + 2)?;
                    let close = self.tokens.get(pos + 2 + inner)?;
                    if !close.is(TokenKind::Relational, ">") {
                        return None;
                    }
                    inner + 3
                }
                Some(t) if matches!(t.kind, TokenKind::Keyword(k) if k.is_primitive_type() || k.is_map_type()) => {
                    1 + self.type_len_at(pos + 1)?
                }
                _ => 1,
            },
            _ => return None,
        };
        let open = self.tokens.get(pos + len).map(|t| t.kind);
        let close = self.tokens.get(pos + len + 1).map(|t| t.kind);
        if open == Some(TokenKind::LBracket) && close == Some(TokenKind::RBracket) {
            len += 2;
        }
        Some(len)
    }

    fn is_function_declaration(&self) -> bool {
        let Some(len) = self.type_len_at(self.current) else {
            return false;
        };
        self.peek_kind_at(len) == Some(TokenKind::Identifier)
            && self.peek_kind_at(len + 1) == Some(TokenKind::LParen)
    }

    fn is_declaration(&self) -> bool {
        let Some(len) = self.type_len_at(self.current) else {
            return false;
        };
        self.peek_kind_at(len) == Some(TokenKind::Identifier)
    }
}

impl<'a> Util for Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<TokenKind> {
        self.tokens.get(self.current + offset).map(|t| t.kind)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.current).cloned();
        if token.is_some() {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn check_text(&self, kind: TokenKind, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is(kind, text))
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.check(TokenKind::Keyword(keyword))
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_keyword(&mut self, keyword: Keyword) -> bool {
        self.match_token(TokenKind::Keyword(keyword))
    }

    fn consume(&mut self, kind: TokenKind, expected: &str) -> Option<Token> {
        if self.check(kind) {
            return self.advance();
        }
        let found = self.peek().map_or("EOF".to_string(), |t| t.text.clone());
        let code = if self.is_at_end() {
            &codes::E0103_UNEXPECTED_END
        } else {
            &codes::E0101_EXPECTED_TOKEN
        };
        self.error(code, format!("expected '{}' but found '{}'", expected, found));
        None
    }

    fn consume_keyword(&mut self, keyword: Keyword) -> Option<Token> {
        self.consume(TokenKind::Keyword(keyword), keyword.as_str())
    }

    fn skip_semicolon(&mut self) {
        self.match_token(TokenKind::Semicolon);
    }

    fn error(&mut self, code: &'static ErrorCode, message: String) {
        let (position, span) = self.here();
        let diagnostic = Diagnostic::new(code, Label::new(span, message.clone()))
            .with_position(position)
            .with_dynamic_message(message)
            .with_note(code.explanation);
        self.diagnostics.report(diagnostic);
    }

    fn here(&self) -> (Position, Span) {
        if let Some(token) = self.peek() {
            return (token.position(), token.span);
        }
        match self.tokens.last() {
            Some(last) => (
                Position::new(last.line, last.column + last.text.chars().count()),
                Span::new(last.span.end, last.span.end),
            ),
            None => (Position::new(1, 1), Span::default()),
        }
    }

    fn finish(&mut self, start: usize, kind: NodeKind, value: Option<String>, children: Vec<NodeId>) -> NodeId {
        let first = self.tokens.get(start);
        let last = self
            .current
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span);
        let mut node = Node::new(kind, value, children);
        if let (Some(first), Some(last)) = (first, last) {
            if self.current > start {
                node = node.with_span(first.span.to(last)).with_line(first.line);
            }
        }
        self.ast.push(node)
    }
}
